use anyhow::Context;
use clap::{Parser, Subcommand};
use inkcut::communication::list_ports;
use inkcut::{init_logging, DeviceEvent, DeviceProfile, Job, JobFile, JobStatus};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "inkcut", version, about = "Send cut jobs to a vinyl cutter or plotter")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Cut a job described by a JSON file
    Run {
        /// Job file with the path model and job options
        #[arg(value_name = "JOB")]
        job: PathBuf,

        /// Device profile (default: <config dir>/inkcut/device.toml)
        #[arg(long, value_name = "PATH")]
        profile: Option<PathBuf>,

        /// Stream to an in-memory transport instead of the device
        #[arg(long)]
        test: bool,
    },

    /// List serial ports
    Ports,

    /// Write a default device profile
    InitProfile {
        #[arg(value_name = "PATH")]
        path: Option<PathBuf>,
    },
}

fn profile_path(path: Option<PathBuf>) -> anyhow::Result<PathBuf> {
    match path {
        Some(path) => Ok(path),
        None => DeviceProfile::default_path().context("no configuration directory on this system"),
    }
}

async fn run(job_path: &Path, profile: Option<PathBuf>, test: bool) -> anyhow::Result<()> {
    let profile_path = profile_path(profile)?;
    let profile = DeviceProfile::load_from_file(&profile_path)
        .with_context(|| format!("loading profile {}", profile_path.display()))?;
    let content = std::fs::read_to_string(job_path)
        .with_context(|| format!("reading job {}", job_path.display()))?;
    let file: JobFile = serde_json::from_str(&content)
        .with_context(|| format!("parsing job {}", job_path.display()))?;

    let job: Job = file.into();
    let info = job.info.clone();
    let device = profile.build_device()?;
    let mut events = device.subscribe();
    let progress = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            if let DeviceEvent::JobProgress { progress, .. } = event {
                tracing::info!("{}%", progress);
            }
        }
    });

    tracing::info!("Running {} on '{}'", job, profile.name);
    device.submit(job, test).await?;
    progress.abort();

    let state = info.snapshot();
    tracing::info!(
        "Job {} after {:.1}s, {:.0} px",
        state.status,
        info.duration().num_milliseconds() as f64 / 1000.0,
        state.length
    );
    if state.status != JobStatus::Complete {
        anyhow::bail!("job ended with status {}", state.status);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging()?;
    let cli = Cli::parse();

    match cli.command {
        Command::Run { job, profile, test } => run(&job, profile, test).await,
        Command::Ports => {
            for port in list_ports()? {
                println!("{}\t{}", port.port_name, port.description);
            }
            Ok(())
        }
        Command::InitProfile { path } => {
            let path = profile_path(path)?;
            DeviceProfile::default().save_to_file(&path)?;
            println!("{}", path.display());
            Ok(())
        }
    }
}
