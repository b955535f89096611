use std::path::Path;

use clap::Parser;
use serde::Serialize;
use serde::de::DeserializeOwned;

mod cli;
mod container;
mod diagnosis;
mod docker;
mod drift;
mod error;
mod logs;
mod messages;
mod stats;

use cli::{Args, Command};
use container::ContainerState;
use diagnosis::engine::{DiagnosisEngine, DiagnosisInput};
use diagnosis::thresholds::Thresholds;
use diagnosis::types::DiagnosisReport;
use error::Error;
use messages::MessageCatalog;
use stats::ContainerStats;

#[tokio::main]
async fn main() {
    env_logger::init();
    let args = Args::parse();
    if let Err(e) = run(args).await {
        log::error!("{e}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), Error> {
    let thresholds: Thresholds = load_yaml_or_default(args.thresholds.as_deref())?;
    thresholds.validate()?;
    let catalog: MessageCatalog = load_yaml_or_default(args.messages.as_deref())?;

    match args.command {
        Command::List { all, filters } => {
            print_report(&docker::list_containers(all, &filters).await?)
        }
        Command::Stats { container } => {
            let detail = docker::inspect_container(&container).await?;
            let raw = docker::container_stats(&container).await?;
            print_report(&ContainerStats::from_raw(&raw, &detail.info.id, &detail.info.name))
        }
        Command::Logs {
            container,
            tail,
            since,
            until,
            timestamps,
            no_mask,
        } => {
            let window = docker::LogWindow { since, until };
            let entries = docker::container_logs(&container, tail, timestamps, window).await?;
            let entries = if no_mask {
                entries
            } else {
                logs::mask_entries(&entries)
            };
            print_report(&entries)
        }
        Command::Demux {
            file,
            timestamps,
            no_mask,
        } => {
            let buffer = std::fs::read(&file).map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => {
                    Error::NotFound(format!("log capture {}", file.display()))
                }
                _ => Error::Internal(e.to_string()),
            })?;
            let entries = logs::parse_log_stream(&buffer, timestamps);
            let entries = if no_mask {
                entries
            } else {
                logs::mask_entries(&entries)
            };
            print_report(&entries)
        }
        Command::Diagnose { container, tail } => {
            let engine = DiagnosisEngine::new(thresholds, catalog);
            let report = diagnose(&container, tail, &engine).await?;
            print_report(&report)
        }
        Command::Drift {
            compose_file,
            project,
        } => {
            let compose = drift::load_compose_file(&compose_file)?;
            let containers = docker::list_containers(true, &[]).await?;
            let report = drift::detect_drift(
                &compose,
                &compose_file.display().to_string(),
                &containers,
                project.as_deref(),
                &catalog,
            );
            print_report(&report)
        }
        Command::Health => print_report(&docker::health_check().await),
    }
}

async fn diagnose(
    container: &str,
    tail: u32,
    engine: &DiagnosisEngine,
) -> Result<DiagnosisReport, Error> {
    let detail = docker::inspect_container(container).await?;

    let stats = if detail.info.state == ContainerState::Running {
        match docker::container_stats(container).await {
            Ok(raw) => Some(ContainerStats::from_raw(&raw, &detail.info.id, &detail.info.name)),
            Err(e) => {
                log::warn!("stats unavailable for {}: {e}", detail.info.name);
                None
            }
        }
    } else {
        None
    };

    let entries =
        match docker::container_logs(container, tail, false, docker::LogWindow::default()).await {
            Ok(entries) => entries,
            Err(e) => {
                log::warn!("logs unavailable for {}: {e}", detail.info.name);
                Vec::new()
            }
        };

    let result = engine.diagnose(&DiagnosisInput {
        stats: stats.as_ref(),
        logs: &entries,
        restart_count: detail.restart_count,
        exit_code: detail.exit_code,
    });

    log::info!("diagnosis complete for container {}", detail.info.name);
    Ok(engine.report(&detail, result))
}

fn load_yaml_or_default<T>(path: Option<&Path>) -> Result<T, Error>
where
    T: DeserializeOwned + Default,
{
    let Some(path) = path else {
        return Ok(T::default());
    };
    if !path.exists() {
        return Err(Error::NotFound(format!("config file {}", path.display())));
    }
    let content = std::fs::read_to_string(path).map_err(|e| Error::Internal(e.to_string()))?;
    serde_yaml::from_str(&content)
        .map_err(|e| Error::Parse(format!("config file {}: {e}", path.display())))
}

fn print_report<T: Serialize>(value: &T) -> Result<(), Error> {
    let rendered =
        serde_json::to_string_pretty(value).map_err(|e| Error::Internal(e.to_string()))?;
    println!("{rendered}");
    Ok(())
}
