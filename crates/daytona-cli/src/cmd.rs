use std::path::PathBuf;

use clap::{Args, ValueEnum};
use daytona_sdk::config::{self, DEFAULT_API_URL, DEFAULT_TARGET};
use daytona_sdk::{Daytona, DaytonaConfig, DaytonaError, Result};
use tracing::info;

#[derive(Args)]
pub struct ConnectionArgs {
    /// YAML config file (api_key, api_url, target); overrides the flags below
    #[arg(long, global = true, env = "DAYTONA_CONFIG")]
    pub config: Option<PathBuf>,
    #[arg(long, global = true, env = "DAYTONA_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,
    #[arg(long, global = true, env = "DAYTONA_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,
    #[arg(long, global = true, env = "DAYTONA_TARGET", default_value = DEFAULT_TARGET)]
    pub target: String,
}

#[derive(Args)]
pub struct SandboxArg {
    /// Sandbox id
    pub id: String,
}

#[derive(Args)]
pub struct LifecycleArgs {
    /// Sandbox id
    pub id: String,
    /// Seconds to wait; 0 waits indefinitely
    #[arg(long, default_value_t = 60.0, allow_negative_numbers = true)]
    pub timeout: f64,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum TargetState {
    Started,
    Stopped,
}

#[derive(Args)]
pub struct WaitArgs {
    /// Sandbox id
    pub id: String,
    #[arg(long, value_enum, default_value = "started")]
    pub state: TargetState,
    /// Seconds to wait; 0 waits indefinitely
    #[arg(long, default_value_t = 60.0, allow_negative_numbers = true)]
    pub timeout: f64,
}

#[derive(Args)]
pub struct LabelsArgs {
    /// Sandbox id
    pub id: String,
    /// Labels as KEY=VALUE
    #[arg(value_parser = parse_label, required = true)]
    pub labels: Vec<(String, String)>,
}

#[derive(Args)]
pub struct AutostopArgs {
    /// Sandbox id
    pub id: String,
    #[arg(allow_negative_numbers = true)]
    pub minutes: i64,
}

#[derive(Args)]
pub struct PreviewArgs {
    /// Sandbox id
    pub id: String,
    pub port: u16,
}

fn parse_label(raw: &str) -> std::result::Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got `{raw}`")),
    }
}

/// Resolve connection settings (config file first, then flags/env) and
/// build a client.
pub async fn connect(args: &ConnectionArgs) -> Result<Daytona> {
    let config = match &args.config {
        Some(path) => config::load(path).await?,
        None => {
            let api_key = args.api_key.clone().ok_or_else(|| {
                DaytonaError::Config(
                    "API key is required (pass --api-key or set DAYTONA_API_KEY)".to_string(),
                )
            })?;
            DaytonaConfig {
                api_key,
                api_url: args.api_url.clone(),
                target: args.target.clone(),
            }
        }
    };
    Daytona::new(&config)
}

pub async fn run_info(daytona: &Daytona, args: SandboxArg) -> Result<()> {
    let info = daytona.get(&args.id).await?.info().await?;
    println!("id:        {}", info.id);
    println!("state:     {}", info.state.as_deref().unwrap_or("-"));
    if let Some(reason) = info.error_reason.as_deref().filter(|r| !r.is_empty()) {
        println!("error:     {reason}");
    }
    println!("target:    {}", info.target);
    println!(
        "resources: {} CPU, {} RAM, {} disk{}",
        info.resources.cpu,
        info.resources.memory,
        info.resources.disk,
        info.resources
            .gpu
            .as_deref()
            .map(|g| format!(", {g} GPU"))
            .unwrap_or_default()
    );
    if let Some(minutes) = info.auto_stop_interval {
        println!("autostop:  {minutes}m");
    }
    if !info.created.is_empty() {
        println!("created:   {}", info.created);
    }
    Ok(())
}

pub async fn run_start(daytona: &Daytona, args: LifecycleArgs) -> Result<()> {
    let sandbox = daytona.get(&args.id).await?;
    sandbox.start(Some(args.timeout)).await?;
    info!(sandbox_id = %args.id, "sandbox started");
    Ok(())
}

pub async fn run_stop(daytona: &Daytona, args: LifecycleArgs) -> Result<()> {
    let sandbox = daytona.get(&args.id).await?;
    sandbox.stop(Some(args.timeout)).await?;
    info!(sandbox_id = %args.id, "sandbox stopped");
    Ok(())
}

pub async fn run_wait(daytona: &Daytona, args: WaitArgs) -> Result<()> {
    let sandbox = daytona.get(&args.id).await?;
    match args.state {
        TargetState::Started => sandbox.wait_for_sandbox_start(Some(args.timeout)).await,
        TargetState::Stopped => sandbox.wait_for_sandbox_stop(Some(args.timeout)).await,
    }
}

pub async fn run_archive(daytona: &Daytona, args: SandboxArg) -> Result<()> {
    daytona.get(&args.id).await?.archive().await?;
    info!(sandbox_id = %args.id, "archive requested");
    Ok(())
}

pub async fn run_delete(daytona: &Daytona, args: SandboxArg) -> Result<()> {
    daytona.get(&args.id).await?.delete().await?;
    info!(sandbox_id = %args.id, "sandbox deleted");
    Ok(())
}

pub async fn run_labels(daytona: &Daytona, args: LabelsArgs) -> Result<()> {
    let labels = daytona.get(&args.id).await?.set_labels(args.labels).await?;
    let json = serde_json::to_string_pretty(&labels)
        .map_err(|e| DaytonaError::Config(format!("serialize labels: {e}")))?;
    println!("{json}");
    Ok(())
}

pub async fn run_autostop(daytona: &Daytona, args: AutostopArgs) -> Result<()> {
    let mut sandbox = daytona.get(&args.id).await?;
    sandbox.set_autostop_interval(args.minutes).await
}

pub async fn run_preview(daytona: &Daytona, args: PreviewArgs) -> Result<()> {
    let link = daytona.get(&args.id).await?.get_preview_link(args.port).await?;
    println!("url:   {}", link.url);
    println!("token: {}", link.token);
    Ok(())
}

pub async fn run_root_dir(daytona: &Daytona, args: SandboxArg) -> Result<()> {
    println!("{}", daytona.get(&args.id).await?.get_user_root_dir().await?);
    Ok(())
}
