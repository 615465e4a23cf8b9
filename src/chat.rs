// Chat history and the per-turn flow: ask the model, record the exchange,
// append one log line.

use std::io;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::formatter::{LogData, LogFormatter};
use crate::log_sink::LogSink;
use crate::ollama::OllamaClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Ordered conversation history; messages are only ever appended.
#[derive(Debug, Default)]
pub struct ChatSession {
    messages: Vec<ChatMessage>,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Result of one submitted message as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    Reply(String),
    /// The model call failed; holds the `Error: ...` text that was also logged.
    Failed(String),
}

pub struct ChatService {
    client: OllamaClient,
    formatter: LogFormatter,
    sink: LogSink,
    model: String,
    send_history: bool,
}

impl ChatService {
    pub fn new(client: OllamaClient, sink: LogSink, model: impl Into<String>) -> Self {
        Self {
            client,
            formatter: LogFormatter::default(),
            sink,
            model: model.into(),
            send_history: false,
        }
    }

    pub fn with_formatter(mut self, formatter: LogFormatter) -> Self {
        self.formatter = formatter;
        self
    }

    /// Send the whole session history instead of only the latest message.
    pub fn with_history(mut self, send_history: bool) -> Self {
        self.send_history = send_history;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn sink(&self) -> &LogSink {
        &self.sink
    }

    /// Runs one turn. Model failures become [`TurnOutcome::Failed`] and are
    /// logged with a zero duration; only a failed log write is returned as an
    /// error.
    #[instrument(skip_all, fields(model = %self.model))]
    pub async fn submit(&self, session: &mut ChatSession, user_input: &str) -> io::Result<TurnOutcome> {
        let started = Instant::now();
        session.push(ChatMessage::user(user_input));

        let request = if self.send_history {
            session.messages().to_vec()
        } else {
            vec![ChatMessage::user(user_input)]
        };

        let (outcome, response, duration_ms) = match self.client.chat(&self.model, &request).await {
            Ok(reply) => {
                let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
                info!(duration_ms, "Model replied");
                session.push(ChatMessage::assistant(reply.clone()));
                (TurnOutcome::Reply(reply.clone()), reply, duration_ms)
            }
            Err(e) => {
                let message = format!("Error: {:#}", e);
                warn!(error = %message, "Model call failed");
                (TurnOutcome::Failed(message.clone()), message, 0)
            }
        };

        let log_data = LogData::new()
            .with("user_input", user_input)
            .with("response", response)
            .with("model", self.model.as_str())
            .with("duration_ms", duration_ms);
        self.sink.append(&self.formatter.create_log_entry(&log_data))?;

        Ok(outcome)
    }
}
