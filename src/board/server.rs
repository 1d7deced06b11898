use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    Router,
    extract::{Request, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::api::{self, ApiError, AppState, SharedState};
use super::composer;
use super::db::{DbHandle, TaskflowDb};
use super::session::{AuthState, Navigation, Route, guard};
use super::store::LocalStore;
use super::ws;

/// Configuration for the board server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub dev_mode: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3141,
            db_path: PathBuf::from(".taskflow/taskflow.db"),
            dev_mode: false,
        }
    }
}

/// Build the full application router: JSON API, realtime channel and the
/// guarded HTML pages.
pub fn build_router(state: SharedState) -> Router {
    api::api_router()
        .route("/ws", get(ws::ws_handler))
        .route("/", get(page))
        .route("/auth", get(page))
        .route("/dashboard", get(page))
        .route("/project/{id}", get(page))
        .fallback(not_found)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "Not found")
}

async fn page(State(state): State<SharedState>, req: Request) -> Response {
    let Some(route) = Route::parse(req.uri().path()) else {
        return (StatusCode::NOT_FOUND, "Not found").into_response();
    };
    let (parts, _) = req.into_parts();
    let user = match api::resolve_user(&parts, &state).await {
        Ok(user) => user,
        Err(e) => return e.into_response(),
    };
    let auth = AuthState::from(user);
    match guard(route, &auth) {
        Navigation::Redirect(to) => Redirect::to(&to.path()).into_response(),
        // Auth is resolved before the guard runs on the server.
        Navigation::Wait => StatusCode::NO_CONTENT.into_response(),
        Navigation::Render => match render_page(&state, route, &auth).await {
            Ok(html) => Html(html).into_response(),
            Err(e) => e.into_response(),
        },
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn layout(title: &str, body: &str) -> String {
    format!(
        "<!doctype html>\n<html><head><meta charset=\"utf-8\"><title>{} · TaskFlow</title></head>\n<body>\n{}</body></html>\n",
        escape(title),
        body
    )
}

async fn render_page(state: &AppState, route: Route, auth: &AuthState) -> Result<String, ApiError> {
    let store = &state.store;
    let html = match route {
        Route::Landing => layout(
            "Welcome",
            "<h1>TaskFlow</h1>\n<p>Track projects and tickets on a shared board.</p>\n<a href=\"/auth\">Get started</a>\n",
        ),
        Route::Auth => layout(
            "Sign in",
            "<h1>Sign in</h1>\n<p>Send your profile id in the <code>x-user-id</code> header.</p>\n",
        ),
        Route::Dashboard => {
            let projects = store
                .list_projects()
                .await
                .map_err(|e| ApiError::Internal(format!("{:#}", e)))?;
            let mut body = String::from("<h1>Projects</h1>\n");
            if let Some(user) = auth.user() {
                let _ = writeln!(body, "<p>Signed in as {}</p>", escape(user.display_name()));
            }
            if projects.is_empty() {
                body.push_str("<p>No projects yet</p>\n");
            } else {
                body.push_str("<ul>\n");
                for p in &projects {
                    let _ = writeln!(
                        body,
                        "<li><a href=\"{}\">{}</a></li>",
                        Route::Project(p.id).path(),
                        escape(&p.name)
                    );
                }
                body.push_str("</ul>\n");
            }
            layout("Dashboard", &body)
        }
        Route::Project(id) => {
            let board = composer::load_board(store.as_ref(), id).await?;
            let project = board.project;
            let mut body = format!("<h1>{}</h1>\n", escape(&project.name));
            for col in board.columns {
                let _ = writeln!(
                    body,
                    "<section id=\"{}\"><h2>{} ({})</h2><ul>",
                    col.status, col.title, col.count
                );
                for t in &col.tickets {
                    let _ = writeln!(body, "<li id=\"{}\">{}</li>", t.id, escape(&t.title));
                }
                body.push_str("</ul></section>\n");
            }
            layout(&project.name, &body)
        }
    };
    Ok(html)
}

/// Start the board server.
pub async fn start_server(config: ServerConfig) -> Result<()> {
    if let Some(parent) = config.db_path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create database directory")?;
    }

    let db = TaskflowDb::new(&config.db_path).context("Failed to initialize board database")?;
    let store = LocalStore::new(DbHandle::new(db)).into_shared();
    let state = Arc::new(AppState::new(store));

    let mut app = build_router(state);

    if config.dev_mode {
        app = app.layer(CorsLayer::permissive());
    }

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    let local_addr = listener.local_addr()?;
    tracing::info!(addr = %local_addr, db = %config.db_path.display(), "server listening");
    println!("TaskFlow running at http://{}", local_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for Ctrl+C");
        return;
    }
    tracing::info!("shutting down");
}
