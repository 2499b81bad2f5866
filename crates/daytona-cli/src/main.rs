mod cmd;

use std::fmt;
use std::process::ExitCode;
use std::time::Instant;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

struct Elapsed(Instant);

impl FormatTime for Elapsed {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> fmt::Result {
        let d = self.0.elapsed();
        let total_secs = d.as_secs();
        let mins = total_secs / 60;
        let secs = total_secs % 60;
        let millis = d.subsec_millis();
        write!(w, "[{mins:02}:{secs:02}:{millis:03}]")
    }
}

#[derive(Parser)]
#[command(name = "daytona", version)]
struct Cli {
    #[command(flatten)]
    conn: cmd::ConnectionArgs,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show sandbox state, resources and placement
    Info(cmd::SandboxArg),
    /// Start a sandbox and wait until it is running
    Start(cmd::LifecycleArgs),
    /// Stop a sandbox and wait until it is stopped
    Stop(cmd::LifecycleArgs),
    /// Wait for a sandbox to reach a state without changing it
    Wait(cmd::WaitArgs),
    /// Move a stopped sandbox to object storage
    Archive(cmd::SandboxArg),
    /// Delete a sandbox
    Delete(cmd::SandboxArg),
    /// Replace the labels of a sandbox
    Labels(cmd::LabelsArgs),
    /// Set the idle auto-stop interval in minutes (0 disables)
    Autostop(cmd::AutostopArgs),
    /// Print the preview URL for a port
    Preview(cmd::PreviewArgs),
    /// Print the sandbox user's root directory
    RootDir(cmd::SandboxArg),
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_timer(Elapsed(Instant::now()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let daytona = match cmd::connect(&cli.conn).await {
        Ok(d) => d,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        Command::Info(args) => cmd::run_info(&daytona, args).await,
        Command::Start(args) => cmd::run_start(&daytona, args).await,
        Command::Stop(args) => cmd::run_stop(&daytona, args).await,
        Command::Wait(args) => cmd::run_wait(&daytona, args).await,
        Command::Archive(args) => cmd::run_archive(&daytona, args).await,
        Command::Delete(args) => cmd::run_delete(&daytona, args).await,
        Command::Labels(args) => cmd::run_labels(&daytona, args).await,
        Command::Autostop(args) => cmd::run_autostop(&daytona, args).await,
        Command::Preview(args) => cmd::run_preview(&daytona, args).await,
        Command::RootDir(args) => cmd::run_root_dir(&daytona, args).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
