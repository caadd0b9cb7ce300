use crate::app::Args;
use anyhow::{anyhow, Result};
use clap::Parser;
use jsonnet_config::LogConfig;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

/// Log files larger than this are removed on startup.
const MAX_LOG_FILE_SIZE: u64 = 8 * 1024 * 1024;

const LOG_PATH_ENV: &str = "JSONNET_PREVIEW_LOG_PATH";

/// Starts a RPC service using stdio.
#[derive(Parser, Debug, Clone)]
pub struct Rpc;

impl Rpc {
    pub async fn run(&self, args: Args) -> Result<()> {
        let (config, config_err) =
            jsonnet_config::load_config_on_startup(args.config_file.clone());

        let maybe_log = log_path(
            args.log,
            std::env::var_os(LOG_PATH_ENV).map(PathBuf::from),
            &config.log,
        );

        // Keeps the non-blocking writer alive until the server exits.
        let _guard = match maybe_log {
            Some(log_path) => Some(init_logging(&log_path, &config.log)?),
            None => None,
        };

        if let Some(config_file) = jsonnet_config::config_file() {
            tracing::debug!(?config_file, "Config loaded");
        }

        jsonnet_server::start(config.preview.clone(), config_err).await;

        Ok(())
    }
}

/// Log file given by `--log`, then the environment, then the config file.
fn log_path(
    cli_log: Option<PathBuf>,
    env_log: Option<PathBuf>,
    log_config: &LogConfig,
) -> Option<PathBuf> {
    cli_log
        .or(env_log)
        .or_else(|| log_config.log_file.as_ref().map(PathBuf::from))
}

fn init_logging(
    log_path: &Path,
    log_config: &LogConfig,
) -> Result<tracing_appender::non_blocking::WorkerGuard> {
    if let Ok(metadata) = std::fs::metadata(log_path) {
        if log_path.is_file() && metadata.len() > MAX_LOG_FILE_SIZE {
            std::fs::remove_file(log_path)?;
        }
    }

    let file_name = log_path
        .file_name()
        .ok_or_else(|| anyhow!("no file name in {log_path:?}"))?;

    let directory = log_path
        .parent()
        .ok_or_else(|| anyhow!("{log_path:?} has no parent"))?;

    let file_appender = tracing_appender::rolling::never(directory, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let max_level = log_config
        .max_level
        .parse()
        .unwrap_or(tracing::Level::DEBUG);

    let builder = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(max_level)
        .with_line_number(true)
        .with_writer(non_blocking)
        .with_ansi(std::io::stdout().is_terminal());

    if log_config.log_target.is_empty() {
        tracing::subscriber::set_global_default(builder.finish())?;
    } else {
        let env_filter = tracing_subscriber::EnvFilter::try_new(&log_config.log_target)?;
        tracing::subscriber::set_global_default(builder.with_env_filter(env_filter).finish())?;
    }

    Ok(guard)
}
