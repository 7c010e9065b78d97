use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use prepflow::cli::{Cli, Command};
use prepflow::config::PrepflowConfig;
use prepflow::transport::JobTransport;
use prepflow::ui::{self, RunProgress};
use prepflow::{Orchestrator, PrepflowError, Source};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "prepflow=debug" } else { "prepflow=warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut config = match &cli.config {
        Some(path) => PrepflowConfig::load_from(path)?,
        None => PrepflowConfig::load()?,
    };
    cli.apply_overrides(&mut config);
    config.validate()?;

    let client = config.http_client()?;
    tracing::debug!(base_url = client.base_url(), project_id = %config.project_id, "Configured");

    match cli.command {
        Command::Process { kind, source, name } => {
            let orchestrator = Orchestrator::new(Arc::new(client), config.orchestrator_settings());
            process(orchestrator, Source::new(kind.into(), source, name)).await
        }
        Command::Status { job_id } => {
            let report = client.fetch_status(&job_id).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Command::Artifacts => {
            let listing = client.list_artifacts(&config.project_id).await?;
            for artifact in &listing.artifacts {
                println!(
                    "{}  {:<12} {}",
                    artifact.id,
                    artifact.artifact_type,
                    artifact.created_at.as_deref().unwrap_or("-")
                );
            }
            println!("{} artifacts, {} edges", listing.artifacts.len(), listing.edges.len());
            Ok(())
        }
    }
}

async fn process(orchestrator: Orchestrator, source: Source) -> Result<()> {
    let progress = RunProgress::start(&source.display_name);
    let mut updates = orchestrator.subscribe();

    let runner = orchestrator.clone();
    let mut run = tokio::spawn(async move { runner.run(source).await });

    let outcome = loop {
        tokio::select! {
            joined = &mut run => break joined?,
            changed = updates.changed() => {
                if changed.is_err() {
                    break (&mut run).await?;
                }
                progress.render(&updates.borrow_and_update());
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted, cancelling run");
                orchestrator.cancel();
            }
        }
    };

    let state = orchestrator.snapshot();
    progress.finish(&state);
    ui::print_snapshot(&state);

    match outcome {
        Ok(_) | Err(PrepflowError::Cancelled) => Ok(()),
        Err(e) => Err(e.into()),
    }
}
