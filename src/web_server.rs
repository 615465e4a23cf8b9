use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    serve, Form, Router,
};
use minijinja::{path_loader, Environment};
use minijinja_autoreload::AutoReloader;
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::Mutex;
use tower::ServiceBuilder;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::{error, info, warn};

use crate::chat::{ChatService, ChatSession, TurnOutcome};
use crate::constants::{NO_LOGS_MESSAGE, RECENT_LOG_LINES};

#[derive(Debug, Clone)]
pub struct WebConfig {
    pub addr: SocketAddr,
    pub templates_dir: PathBuf,
    pub static_dir: PathBuf,
    pub title: String,
}

// Shared application state
#[derive(Clone)]
struct AppState {
    templates: Arc<AutoReloader>,
    service: Arc<ChatService>,
    // One conversation per server; the lock is held for a whole turn so
    // turns and their log lines never interleave.
    session: Arc<Mutex<ChatSession>>,
    title: Arc<str>,
}

#[derive(Debug, Error)]
enum WebError {
    #[error("Failed to write chat log: {0}")]
    LogWrite(#[from] std::io::Error),
    #[error("Failed to render template: {0}")]
    Template(#[from] minijinja::Error),
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        error!("Request failed: {}", self);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Html(format!("Internal Server Error: {}", self)),
        )
            .into_response()
    }
}

#[derive(Debug, Deserialize)]
struct ChatForm {
    #[serde(default)]
    message: String,
}

// Minijinja Environment setup
fn create_minijinja_env(templates_dir: &Path) -> AutoReloader {
    let dir = templates_dir.to_path_buf();
    AutoReloader::new(move |notifier| {
        let mut env = Environment::new();
        env.set_loader(path_loader(dir.clone()));
        // Watch the templates directory for changes
        notifier.watch_path(dir.as_path(), true);
        Ok(env)
    })
}

fn render_page(
    state: &AppState,
    session: &ChatSession,
    error: Option<&str>,
) -> Result<Html<String>, WebError> {
    // Read-back problems only cost the "Recent Logs" panel.
    let logs = state
        .service
        .sink()
        .recent(RECENT_LOG_LINES)
        .unwrap_or_else(|e| {
            warn!("Failed to read chat log: {}", e);
            None
        });

    let env = state.templates.acquire_env()?;
    let tmpl = env.get_template("index.html")?;
    let html = tmpl.render(minijinja::context! {
        title => &*state.title,
        model => state.service.model(),
        messages => session.messages(),
        logs => logs,
        no_logs_message => NO_LOGS_MESSAGE,
        error => error,
    })?;
    Ok(Html(html))
}

async fn index_handler(State(state): State<AppState>) -> Result<Html<String>, WebError> {
    let session = state.session.lock().await;
    render_page(&state, &session, None)
}

async fn chat_handler(
    State(state): State<AppState>,
    Form(form): Form<ChatForm>,
) -> Result<Html<String>, WebError> {
    let mut session = state.session.lock().await;
    let mut error = None;

    if form.message.trim().is_empty() {
        info!("Ignoring empty chat submission");
    } else if let TurnOutcome::Failed(message) =
        state.service.submit(&mut session, &form.message).await?
    {
        error = Some(message);
    }

    render_page(&state, &session, error.as_deref())
}

/// Builds the application router.
pub fn router(config: &WebConfig, service: ChatService) -> Router {
    let state = AppState {
        templates: Arc::new(create_minijinja_env(&config.templates_dir)),
        service: Arc::new(service),
        session: Arc::new(Mutex::new(ChatSession::new())),
        title: Arc::from(config.title.as_str()),
    };

    Router::new()
        .route("/", get(index_handler))
        .route("/chat", post(chat_handler))
        .nest_service("/static", ServeDir::new(&config.static_dir))
        .with_state(state)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http())) // Add request logging
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl-C: {}", e);
        return;
    }
    info!("Ctrl-C received, initiating shutdown...");
}

pub async fn start_web_server(config: WebConfig, service: ChatService) -> Result<()> {
    let app = router(&config, service);

    // Bind using tokio::net::TcpListener
    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .context(format!("Failed to bind to address {}", config.addr))?;
    info!("Web server listening on http://{}", config.addr);

    serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Web server failed")?;

    Ok(())
}
