use anyhow::{Context, Result};
use financial_anomaly::{RunConfig, analyze, render};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn main() -> Result<()> {
    // Setup logging; stdout carries only the report
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to install tracing subscriber")?;

    let config = RunConfig::default();

    // 1. Generate the network and detect anomalies
    let (network, report) = analyze(&config).context("failed to build financial network")?;

    // 2. Report
    println!("{report}");

    // 3. Visualize
    render(
        &network,
        &report.high_degree,
        &report.long_paths,
        &config.render,
    )
    .context("failed to render financial network")?;

    Ok(())
}
