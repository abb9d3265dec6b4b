//! Tracing setup: console output by default, JSON lines when a log file is
//! requested.

use std::fs;
use std::path::Path;

use anyhow::Result;

pub fn init_tracing(log_file: Option<&Path>) -> Result<()> {
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info,osmon=info".into());
    match log_file {
        Some(path) => {
            if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                fs::create_dir_all(dir)?;
            }
            let file_name = path
                .file_name()
                .map(|f| f.to_os_string())
                .unwrap_or_else(|| "osmon.log".into());
            let appender =
                tracing_appender::rolling::never(path.parent().unwrap_or(Path::new(".")), file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            // The guard must outlive the process or buffered lines are lost.
            Box::leak(Box::new(guard));
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(writer)
                .json()
                .flatten_event(true)
                .init();
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(env_filter).init();
        }
    }
    Ok(())
}
