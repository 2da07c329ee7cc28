//! 日志系统配置模块
//! 支持结构化日志、日志级别配置和按日轮转的文件输出

use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::{non_blocking, non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{
    fmt::{self, time::ChronoUtc},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Registry,
};

use crate::config::LoggingConfig;

const LOG_FILE_NAME: &str = "token-transfer.log";

/// 初始化日志系统
///
/// 启用文件日志时返回后台写线程的 guard，调用方需持有到进程退出，否则缓冲日志会丢失。
pub fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    // RUST_LOG 优先于配置
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let json = config.format == "json";

    if !config.enable_file_logging {
        // 仅控制台日志
        let installed = if json {
            Registry::default()
                .with(filter)
                .with(fmt::layer().json().with_timer(ChronoUtc::rfc_3339()))
                .try_init()
        } else {
            Registry::default()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_timer(ChronoUtc::rfc_3339())
                        .with_ansi(true),
                )
                .try_init()
        };
        installed.context("failed to install tracing subscriber")?;
        return Ok(None);
    }

    let log_dir = log_dir(config);
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("failed to create log directory {}", log_dir.display()))?;

    let (writer, guard) = non_blocking(rolling::daily(log_dir, LOG_FILE_NAME));

    let installed = if json {
        // 文件与控制台均为 JSON
        Registry::default()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_writer(writer)
                    .with_timer(ChronoUtc::rfc_3339()),
            )
            .with(fmt::layer().json().with_timer(ChronoUtc::rfc_3339()))
            .try_init()
    } else {
        Registry::default()
            .with(filter)
            .with(
                fmt::layer()
                    .with_writer(writer)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(false),
            )
            .with(
                fmt::layer()
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(true),
            )
            .try_init()
    };
    installed.context("failed to install tracing subscriber")?;

    Ok(Some(guard))
}

fn log_dir(config: &LoggingConfig) -> &Path {
    config
        .log_file_path
        .as_deref()
        .map(Path::new)
        .and_then(Path::parent)
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("./logs"))
}
