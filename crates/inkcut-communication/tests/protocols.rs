use inkcut_communication::{
    CammProtocol, DmplConfig, DmplMode, DmplProtocol, GCodeConfig, GCodeProtocol, GpglProtocol,
    HpglConfig, HpglProtocol, Link, Protocol, StreamMode, TestTransport, TestTransportHandle,
    ToolLiftMode,
};

fn test_link(protocol: impl Protocol + 'static) -> (Link, TestTransportHandle) {
    let transport = TestTransport::new();
    let handle = transport.handle();
    (Link::new(Box::new(transport), Box::new(protocol)), handle)
}

fn writes(handle: &TestTransportHandle) -> Vec<String> {
    handle
        .writes()
        .into_iter()
        .map(|w| String::from_utf8(w).unwrap())
        .collect()
}

#[tokio::test]
async fn test_hpgl_commands() {
    let (mut link, handle) = test_link(HpglProtocol::default());
    link.open().await.unwrap();
    link.set_pen(1).await.unwrap();
    link.set_velocity(20.0).await.unwrap();
    link.set_force(40.5).await.unwrap();
    link.move_to(0.0, 0.0, 0, true).await.unwrap();
    link.move_to(45.0, 9.0, 1, true).await.unwrap();
    link.finish().await.unwrap();
    link.close().await.unwrap();

    assert_eq!(
        writes(&handle),
        vec!["IN;", "SP1;", "VS20;", "FS40; ", "PU0,0;", "PD510,102;", "IN;"]
    );
}

#[tokio::test]
async fn test_hpgl_swapped_axes() {
    let (mut link, handle) = test_link(HpglProtocol::new(HpglConfig { swap_xy: true }));
    link.open().await.unwrap();
    link.move_to(45.0, 9.0, 1, true).await.unwrap();
    assert_eq!(writes(&handle)[1], "PD102,510;");
}

#[tokio::test]
async fn test_camm_commands() {
    let (mut link, handle) = test_link(CammProtocol);
    link.open().await.unwrap();
    link.set_force(40.0).await.unwrap();
    link.set_velocity(20.0).await.unwrap();
    link.set_pen(2).await.unwrap();
    link.move_to(3.0, 4.0, 0, true).await.unwrap();
    link.move_to(10.7, 5.2, 1, true).await.unwrap();
    link.finish().await.unwrap();

    assert_eq!(
        writes(&handle),
        vec!["IN;", "FS40;", "VS20;", "SP2;", "M3,4;", "D10,5;"]
    );
}

#[tokio::test]
async fn test_gpgl_commands() {
    let (mut link, handle) = test_link(GpglProtocol);
    link.open().await.unwrap();
    link.set_velocity(20.0).await.unwrap();
    link.set_force(40.0).await.unwrap();
    link.move_to(3.0, 4.0, 0, true).await.unwrap();
    link.move_to(10.0, 5.0, 1, true).await.unwrap();
    assert!(link.set_pen(1).await.unwrap_err().is_unsupported());

    assert_eq!(writes(&handle), vec!["H", "!20", "*40", "M3,4;", "D10,5;"]);
}

#[tokio::test]
async fn test_dmpl_modes() {
    let (mut link, handle) = test_link(DmplProtocol::default());
    link.open().await.unwrap();
    link.set_pen(1).await.unwrap();
    link.set_velocity(20.0).await.unwrap();
    link.set_force(40.0).await.unwrap();
    link.move_to(0.0, 0.0, 0, true).await.unwrap();
    link.move_to(10.0, 5.0, 1, true).await.unwrap();
    assert_eq!(
        writes(&handle),
        vec![" ;:H A L0 ", "P1 ", "V20 ", "BP40 ", "U0,0 ", "D10,5 "]
    );

    let (mut link, handle) = test_link(DmplProtocol::new(DmplConfig { mode: DmplMode::Ec1 }));
    link.open().await.unwrap();
    link.move_to(10.0, 1.0, 1, true).await.unwrap();
    assert_eq!(writes(&handle), vec![" ;:H A L0 EC1 ", "D111,11 "]);
}

#[tokio::test]
async fn test_gcode_plain_streaming() {
    let (mut link, handle) = test_link(GCodeProtocol::default());
    link.open().await.unwrap();
    link.move_to(0.0, 0.0, 0, true).await.unwrap();
    link.move_to(10.4, 5.6, 1, true).await.unwrap();
    link.finish().await.unwrap();
    assert!(link.set_force(40.0).await.unwrap_err().is_unsupported());

    assert_eq!(
        writes(&handle),
        vec![
            "G28; Return to home\nG98; Return to initial z\nG90; Use absolute coordinates\n",
            "G00 X0 Y0\n",
            "G01 X10 Y6\n",
            "G28; Return to home\n",
            "G98; Return to initial z\n",
        ]
    );
}

#[tokio::test]
async fn test_gcode_z_lift() {
    let (mut link, handle) = test_link(GCodeProtocol::new(GCodeConfig {
        use_builtin: false,
        lift_mode: ToolLiftMode::Z,
        precision: 2,
        lower_z: -0.5,
        upper_z: 2.0,
        ..Default::default()
    }));
    link.open().await.unwrap();
    link.move_to(1.0, 2.0, 1, true).await.unwrap();
    link.move_to(3.0, 4.0, 0, true).await.unwrap();

    assert_eq!(
        writes(&handle),
        vec!["G01 X1.00 Y2.00 Z-0.50\n", "G00 X3.00 Y4.00 Z2.00\n"]
    );
}

#[tokio::test]
async fn test_gcode_custom_lift_only_on_transitions() {
    let (mut link, handle) = test_link(GCodeProtocol::new(GCodeConfig {
        use_builtin: false,
        lift_mode: ToolLiftMode::Custom,
        lift_gcode: "M3 S0".to_string(),
        lower_gcode: "M3 S90".to_string(),
        ..Default::default()
    }));
    link.open().await.unwrap();
    link.move_to(0.0, 0.0, 0, true).await.unwrap();
    link.move_to(1.0, 1.0, 1, true).await.unwrap();
    link.move_to(2.0, 2.0, 1, true).await.unwrap();
    link.move_to(3.0, 3.0, 0, true).await.unwrap();

    assert_eq!(
        writes(&handle),
        vec![
            "M3 S0\n",
            "G00 X0 Y0\n",
            "M3 S90\n",
            "G01 X1 Y1\n",
            "G01 X2 Y2\n",
            "M3 S0\n",
            "G00 X3 Y3\n",
        ]
    );
}

#[tokio::test]
async fn test_gcode_ok_mode_on_spooling_transport_does_not_wait() {
    let transport = TestTransport::new().spooling(true);
    let handle = transport.handle();
    let protocol = GCodeProtocol::new(GCodeConfig {
        stream_mode: StreamMode::Ok,
        use_builtin: false,
        ..Default::default()
    });
    let mut link = Link::new(Box::new(transport), Box::new(protocol));
    link.open().await.unwrap();
    link.move_to(1.0, 1.0, 1, true).await.unwrap();
    link.move_to(2.0, 2.0, 1, true).await.unwrap();
    assert_eq!(handle.written_string(), "G01 X1 Y1\nG01 X2 Y2\n");
}
