use inkcut_communication::{GCodeConfig, GCodeProtocol, Link, StreamMode, TestTransport};
use std::time::Duration;

fn ok_mode_link(use_builtin: bool) -> (Link, inkcut_communication::TestTransportHandle) {
    let transport = TestTransport::new();
    let handle = transport.handle();
    let protocol = GCodeProtocol::new(GCodeConfig {
        stream_mode: StreamMode::Ok,
        use_builtin,
        ..Default::default()
    });
    (Link::new(Box::new(transport), Box::new(protocol)), handle)
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

#[tokio::test(start_paused = true)]
async fn test_second_move_waits_for_ok() {
    let (mut link, handle) = ok_mode_link(false);
    link.open().await.unwrap();

    let task = tokio::spawn(async move {
        link.move_to(1.0, 1.0, 1, true).await?;
        link.move_to(2.0, 2.0, 1, true).await?;
        Ok::<_, inkcut_core::Error>(link)
    });

    settle().await;
    assert_eq!(handle.writes(), vec![b"G01 X1 Y1\n".to_vec()]);

    // Half an acknowledgement does not release the next line
    handle.feed(b"o");
    settle().await;
    assert_eq!(handle.write_count(), 1);

    handle.feed(b"k\n");
    settle().await;
    assert_eq!(handle.write_count(), 2);
    assert_eq!(handle.writes()[1], b"G01 X2 Y2\n".to_vec());
    assert!(!task.is_finished());

    handle.feed(b"ok\n");
    let link = task.await.unwrap().unwrap();
    assert!(link.is_connected());
    assert_eq!(handle.write_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_builtin_block_sent_line_by_line() {
    let (mut link, handle) = ok_mode_link(true);
    let task = tokio::spawn(async move {
        link.open().await?;
        Ok::<_, inkcut_core::Error>(link)
    });

    for expected in [
        "G28; Return to home\n",
        "G98; Return to initial z\n",
        "G90; Use absolute coordinates\n",
    ] {
        settle().await;
        assert_eq!(handle.writes().last().unwrap(), expected.as_bytes());
        handle.feed(b"ok\n");
    }
    task.await.unwrap().unwrap();
    assert_eq!(handle.write_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_drop_while_waiting_for_ok() {
    let (mut link, handle) = ok_mode_link(false);
    link.open().await.unwrap();

    let task = tokio::spawn(async move { link.move_to(1.0, 1.0, 1, true).await });
    settle().await;
    handle.drop_connection();

    let err = task.await.unwrap().unwrap_err();
    assert!(err.is_connection_error());
}
