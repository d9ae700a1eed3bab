mod config;

use clap::{Args, Parser};
use config::{Config, ConfigError, MetricsConfig};
use metrics_exporter_statsd::StatsdBuilder;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const METRICS_PREFIX: &str = "dinger";

#[derive(Parser)]
#[command(name = "dinger", about = "Relays hookbot events to chat and serves recent dings")]
enum CliCommand {
    /// Run the relay
    Run(ConfigArgs),
    /// Load and validate the configuration, then exit
    CheckConfig(ConfigArgs),
}

#[derive(Args)]
struct ConfigArgs {
    /// YAML config file. The environment is used when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
}

impl ConfigArgs {
    fn load(&self) -> Result<Config, ConfigError> {
        match &self.config {
            Some(path) => Config::from_file(path),
            None => Config::from_env(),
        }
    }
}

fn main() -> ExitCode {
    let cli = CliCommand::parse();
    init_logging();

    match cli {
        CliCommand::Run(args) => {
            let config = match args.load() {
                Ok(config) => config,
                Err(err) => {
                    tracing::error!("Invalid configuration: {err}");
                    return ExitCode::FAILURE;
                }
            };
            run(config)
        }
        CliCommand::CheckConfig(args) => match args.load() {
            Ok(config) => {
                println!("{config:#?}");
                ExitCode::SUCCESS
            }
            Err(err) => {
                eprintln!("Invalid configuration: {err}");
                ExitCode::FAILURE
            }
        },
    }
}

fn run(config: Config) -> ExitCode {
    // Dropping the guard flushes pending events, so it must outlive the runtime.
    let _sentry = config.common.logging.as_ref().map(|logging| {
        sentry::init((
            logging.sentry_dsn.as_str(),
            sentry::ClientOptions {
                release: sentry::release_name!(),
                ..Default::default()
            },
        ))
    });

    if let Some(metrics) = &config.common.metrics {
        init_metrics(metrics);
    }

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(err) => {
            tracing::error!("Failed to start runtime: {err}");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!("Starting dinger");
    match rt.block_on(relay::run(config.relay)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("Relay stopped: {err}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .with(sentry::integrations::tracing::layer())
        .init();
}

/// Metrics are best effort: a broken statsd setup is logged and the relay
/// runs without them.
fn init_metrics(config: &MetricsConfig) {
    let recorder = match StatsdBuilder::from(config.statsd_host.clone(), config.statsd_port)
        .build(Some(METRICS_PREFIX))
    {
        Ok(recorder) => recorder,
        Err(err) => {
            tracing::warn!("Failed to set up statsd exporter: {err}");
            return;
        }
    };

    if metrics::set_global_recorder(recorder).is_err() {
        tracing::warn!("A metrics recorder is already installed");
        return;
    }
    shared::metrics_defs::describe_all(relay::metrics_defs::ALL_METRICS);
}
