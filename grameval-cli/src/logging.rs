//! Subscriber setup for the `grameval` binary

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

fn filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Per-run log file inside `log_dir`
pub fn log_file_path(log_dir: &Path, name: &str) -> PathBuf {
    log_dir.join(format!("{}_grammar-analysis.log", name))
}

/// Log to stderr, or append to the run's log file when `log_dir` is given.
pub fn init(log_dir: Option<&Path>, name: &str) -> std::io::Result<()> {
    let builder = tracing_subscriber::fmt().with_env_filter(filter()).with_target(false);
    match log_dir {
        Some(dir) => {
            fs::create_dir_all(dir)?;
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(log_file_path(dir, name))?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).init();
        }
        None => builder.with_writer(std::io::stderr).init(),
    }
    Ok(())
}
