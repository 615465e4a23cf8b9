pub mod chat;
pub mod constants;
pub mod formatter;
pub mod log_sink;
pub mod ollama;
pub mod web_server;

pub use chat::{ChatMessage, ChatService, ChatSession, Role, TurnOutcome};
pub use formatter::{FieldValue, FormatError, LogData, LogEntry, LogFormatter};
pub use log_sink::LogSink;
pub use ollama::OllamaClient;
