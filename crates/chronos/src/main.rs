use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use chronos::ade::{AdeConfig, Extraction, Extractor, TimetableConfig};
use chronos::batch::{self, BatchOptions, Promotions};
use chronos::logging::setup_logging;
use chronos::server::create_router;
use chronos::types::ServerState;
use clap::Parser;
use tracing::{error, info};

use crate::cli::{Args, Command};

mod cli;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    setup_logging(&args.log_level);

    info!(version = env!("CARGO_PKG_VERSION"), "starting chronos");

    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            error!(error = ?e, "chronos failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> anyhow::Result<ExitCode> {
    let config = match &args.config {
        Some(path) => TimetableConfig::load_from_file(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => TimetableConfig::builtin(),
    };

    let mut ade = AdeConfig::default();
    if let Some(base_url) = args.base_url {
        ade.base_url = base_url;
    }

    match args.command {
        Command::Fetch {
            group,
            promo,
            weeks,
            date,
            output,
        } => {
            let extractor = Extractor::new(ade, &config)?;
            let job = Extraction {
                weeks,
                reference_label: date,
                ..Extraction::new(promo, group)
            };
            let ics = extractor.fetch_calendar(&job).await?.to_ics();

            match output {
                Some(path) => {
                    batch::write_atomic(&path, ics.as_bytes())
                        .await
                        .with_context(|| format!("writing {}", path.display()))?;
                    info!(path = %path.display(), "Calendar written");
                }
                None => print!("{ics}"),
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Build {
            output_dir,
            workers,
            weeks,
        } => {
            let extractor = Extractor::new(ade, &config)?;
            let options = BatchOptions {
                output_dir,
                workers,
                weeks,
            };
            let report =
                batch::run_batch(&extractor, &config.plan(), Promotions::current(), &options)
                    .await?;

            for (group, e) in &report.failed {
                error!(group = %group, error = %e, "Group failed");
            }
            Ok(if report.is_success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Command::Serve { output_dir, bind } => {
            let state = Arc::new(ServerState {
                output_dir,
                plan: config.plan(),
            });
            let app = create_router(state);

            let listener = tokio::net::TcpListener::bind(bind)
                .await
                .with_context(|| format!("binding {bind}"))?;
            info!(addr = %bind, "Serving calendars");

            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
    }
    info!("Shutting down");
}
