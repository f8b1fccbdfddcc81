use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use crossbeam_channel::Receiver;
use owo_colors::OwoColorize;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use dubflow::capability::{HttpGateway, LocalBlobStore};
use dubflow::cli::{Cli, Commands, ConfigAction};
use dubflow::config::Config;
use dubflow::observability::{TracingConfig, init_tracing};
use dubflow::output::{format_event, format_report};
use dubflow::pipeline::{Capabilities, Orchestrator, PipelineConfig, PipelineEvent, RunReport};
use dubflow::trigger::notification::decode_key;
use dubflow::trigger::{ListenSummary, ListenerConfig, Notification, TriggerListener};

/// Notifications buffered between stdin and the listener.
const NOTIFICATION_BUFFER: usize = 64;

/// Finished reports waiting to be printed.
const REPORT_BUFFER: usize = 16;

/// Progress events buffered for the verbose printer; overflow is dropped.
const EVENT_BUFFER: usize = 256;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(TracingConfig {
        json_format: cli.json_logs,
        verbosity: cli.verbose,
        quiet: cli.quiet,
    });
    tracing::debug!(version = %dubflow::version_string(), "dubflow starting");

    match cli.command {
        Commands::Run {
            bucket,
            key,
            event_time,
            timeout,
            json,
        } => {
            let config = load_config(cli.config.as_deref())?;
            let show_progress = cli.verbose > 0 && !cli.quiet;
            let report =
                handle_run(config, &bucket, &key, event_time, timeout, show_progress).await?;
            print_report(&report, json);
            if !report.is_success() {
                std::process::exit(1);
            }
        }
        Commands::Listen { json } => {
            let config = load_config(cli.config.as_deref())?;
            let show_progress = cli.verbose > 0 && !cli.quiet;
            let summary = handle_listen(config, show_progress, json).await?;
            if summary.failed > 0 {
                std::process::exit(1);
            }
        }
        Commands::Config { action } => {
            handle_config_command(action, cli.config.as_deref())?;
        }
        Commands::Completions { shell } => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "dubflow",
                &mut std::io::stdout(),
            );
        }
    }

    Ok(())
}

fn load_config(custom_path: Option<&Path>) -> Result<Config> {
    let config = if let Some(path) = custom_path {
        // Load from custom path
        Config::load(path)?
    } else {
        // Try default path, fall back to defaults
        Config::load_or_default(&Config::default_path())?
    };

    // Apply environment variable overrides
    let config = config.with_env_overrides();
    config.validate()?;
    Ok(config)
}

/// Wire the real adapters: local blob store plus the HTTP service gateway.
fn build_orchestrator(config: &Config, show_progress: bool) -> Result<Orchestrator> {
    let blob_store = Arc::new(
        LocalBlobStore::new(config.storage.root.clone())
            .context("Failed to open the blob store")?,
    );
    let gateway = Arc::new(HttpGateway::from_config(&config.services)?);
    tracing::debug!(
        storage = %config.storage.root.display(),
        services = gateway.base_url(),
        "capabilities ready"
    );

    let mut pipeline_config = PipelineConfig::from_section(&config.pipeline);
    if show_progress {
        let (tx, rx) = crossbeam_channel::bounded(EVENT_BUFFER);
        spawn_event_printer(rx);
        pipeline_config = pipeline_config.with_event_sender(tx);
    }

    Ok(Orchestrator::new(
        pipeline_config,
        Capabilities {
            blob_store,
            speech_to_text: gateway.clone(),
            translator: gateway.clone(),
            synthesizer: gateway,
        },
    ))
}

/// Print pipeline events to stderr until every sender is dropped.
fn spawn_event_printer(rx: Receiver<PipelineEvent>) {
    let color = std::io::stderr().is_terminal();
    std::thread::spawn(move || {
        for event in rx.iter() {
            let line = format_event(&event);
            if color {
                eprintln!("{}", line.dimmed());
            } else {
                eprintln!("{line}");
            }
        }
    });
}

async fn handle_run(
    config: Config,
    bucket: &str,
    key: &str,
    event_time: Option<String>,
    timeout: Option<Duration>,
    show_progress: bool,
) -> Result<RunReport> {
    let orchestrator = build_orchestrator(&config, show_progress)?;

    let mut notification = Notification::new(bucket, &decode_key(key)?);
    notification.event_time = event_time;

    let mut listener_config = ListenerConfig::from_config(&config);
    if let Some(timeout) = timeout {
        listener_config.run_timeout = timeout;
    }

    let ctx = listener_config.context_for(&notification);
    Ok(orchestrator.run(ctx).await)
}

/// Feed stdin notifications to the listener, printing each report as its
/// run finishes.
async fn handle_listen(
    config: Config,
    show_progress: bool,
    json: bool,
) -> Result<ListenSummary> {
    let orchestrator = Arc::new(build_orchestrator(&config, show_progress)?);
    let listener = TriggerListener::new(orchestrator, ListenerConfig::from_config(&config));

    let (tx, rx) = mpsc::channel(NOTIFICATION_BUFFER);
    let (report_tx, mut report_rx) = mpsc::channel(REPORT_BUFFER);
    let listening = tokio::spawn(listener.listen(rx, report_tx));
    let printing = tokio::spawn(async move {
        while let Some(report) = report_rx.recv().await {
            print_report(&report, json);
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match Notification::parse(line) {
            Ok(notifications) => {
                for notification in notifications {
                    tx.send(notification)
                        .await
                        .context("Trigger listener stopped early")?;
                }
            }
            Err(e) => tracing::warn!(error = %e, "skipping notification"),
        }
    }
    drop(tx);

    let summary = listening.await.context("Trigger listener panicked")?;
    printing.await.context("Report printer panicked")?;
    Ok(summary)
}

fn print_report(report: &RunReport, json: bool) {
    if json {
        println!("{}", report.to_json());
    } else {
        print!(
            "{}",
            format_report(report, std::io::stdout().is_terminal())
        );
    }
}

fn handle_config_command(action: ConfigAction, custom_path: Option<&Path>) -> Result<()> {
    let config_path = custom_path
        .map(PathBuf::from)
        .unwrap_or_else(Config::default_path);

    match action {
        ConfigAction::Show => {
            let mut config = Config::load_or_default(&config_path)?.with_env_overrides();
            if config.services.api_key.is_some() {
                config.services.api_key = Some("********".to_string());
            }
            print!(
                "{}",
                toml::to_string_pretty(&config).context("Failed to render configuration")?
            );
        }
        ConfigAction::Path => {
            println!("{}", config_path.display());
        }
    }
    Ok(())
}
