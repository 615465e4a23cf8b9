// Defaults for the chat front end and the static log column table.

use std::collections::HashMap;

pub const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";
pub const DEFAULT_MODEL: &str = "deepseek:1.5b";
pub const DEFAULT_LOG_FILE: &str = "chat_logs.txt";
pub const DEFAULT_PORT: u16 = 8501;
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Number of log lines shown under "Recent Logs".
pub const RECENT_LOG_LINES: usize = 5;

/// Width used for fields that have no entry in [`FIELD_WIDTHS`].
pub const DEFAULT_FIELD_WIDTH: usize = 100;
pub const FIELD_SEPARATOR: &str = " | ";
pub const ELLIPSIS: &str = "...";
pub const NO_RESPONSE_PLACEHOLDER: &str = "No response received";
pub const NO_LOGS_MESSAGE: &str = "No logs available yet.";

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const LOG_ID_LEN: usize = 8;

lazy_static::lazy_static! {
    /// Column widths for the well-known log fields.
    pub static ref FIELD_WIDTHS: HashMap<&'static str, usize> = HashMap::from([
        ("timestamp", 20),
        ("log_id", 10),
        ("user_input", 50),
        ("response", 80),
        ("model", 15),
        ("duration_ms", 10),
    ]);
}
