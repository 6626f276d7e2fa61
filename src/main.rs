use anyhow::Result;
use clap::Parser;
use deep_research_rs::{cli, launch};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Args::parse();
    let (config, task) = args.into_config_and_task()?;

    // RUST_LOG 优先，其次由 --verbose 决定日志级别
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if config.verbose {
            EnvFilter::new("deep_research_rs=debug")
        } else {
            EnvFilter::new("deep_research_rs=info")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    launch(&config, task).await
}
