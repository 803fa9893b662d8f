//! Tracing initialization and subscriber setup.

use super::file_writer::FileWriter;
use crate::Config;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Name of the log file inside the data directory.
pub const LOG_FILE_NAME: &str = "fzfui.log";

/// Installs the global subscriber writing to `<data dir>/fzfui.log`.
///
/// Level resolution: `config.log_level`, then `RUST_LOG` (as captured in the
/// config), then `"warn"`.
///
/// Logging never goes to stdout or stderr: stdout of a hidden sub-command is
/// parsed by the finder as directives. If the data directory cannot be
/// created, tracing stays disabled. Calling this more than once is harmless.
///
/// # Example
///
/// ```rust
/// use fzfui::observability::init_tracing;
/// use fzfui::Config;
///
/// let config = Config {
///     log_level: Some("debug".to_string()),
///     data_dir: Some(std::env::temp_dir().join("fzfui-doc").display().to_string()),
///     ..Default::default()
/// };
/// init_tracing(&config);
/// tracing::debug!("tracing is now active");
/// ```
pub fn init_tracing(config: &Config) {
    let level = config.log_level.as_deref().unwrap_or("warn");

    let data_dir = config.data_dir();
    if std::fs::create_dir_all(&data_dir).is_err() {
        return;
    }

    let layer = fmt::layer()
        .with_ansi(false)
        .with_target(false)
        .with_writer(FileWriter::new(data_dir.join(LOG_FILE_NAME)));

    let _ = tracing_subscriber::registry()
        .with(EnvFilter::new(level))
        .with(layer)
        .try_init();
}
