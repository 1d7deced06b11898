use std::str::FromStr;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{FromRequestParts, Path, State},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::composer;
use super::drag::DragController;
use super::forms::{ProjectForm, TicketForm};
use super::models::*;
use super::propagator::{Propagation, UpdatePropagator};
use super::store::RemoteStore;
use crate::errors::TaskflowError;

/// Header carrying the acting user's profile id.
pub const USER_HEADER: &str = "x-user-id";

// ── Shared application state ──────────────────────────────────────────

pub struct AppState {
    pub store: Arc<dyn RemoteStore>,
    pub propagator: UpdatePropagator,
}

impl AppState {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self {
            propagator: UpdatePropagator::new(store.clone()),
            store,
        }
    }
}

pub type SharedState = Arc<AppState>;

// ── Request payload types ─────────────────────────────────────────────

#[derive(Deserialize)]
pub struct CreateProfileRequest {
    pub email: String,
    pub full_name: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateProjectRequest {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateTicketRequest {
    pub title: String,
    pub description: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateTicketRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
}

#[derive(Deserialize)]
pub struct DropTicketRequest {
    /// Id of the element the ticket was released over, if any.
    pub over: Option<String>,
}

#[derive(Serialize)]
pub struct DropResponse {
    pub moved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub propagation: Option<Propagation>,
}

// ── Error handling ────────────────────────────────────────────────────

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Unauthorized(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(serde_json::json!({"error": message}))).into_response()
    }
}

impl From<TaskflowError> for ApiError {
    fn from(err: TaskflowError) -> Self {
        let msg = err.to_string();
        match err {
            e if e.is_not_found() => ApiError::NotFound(msg),
            TaskflowError::MissingField { .. } | TaskflowError::InvalidStatus { .. } => {
                ApiError::BadRequest(msg)
            }
            TaskflowError::Unauthenticated => ApiError::Unauthorized(msg),
            e => {
                tracing::error!(error = %e, "request failed");
                ApiError::Internal(msg)
            }
        }
    }
}

fn store_err(err: anyhow::Error) -> ApiError {
    TaskflowError::from_store(err).into()
}

// ── Acting user ───────────────────────────────────────────────────────

/// Resolve the `x-user-id` header to a profile. A missing, malformed or
/// unknown id is `None`.
pub async fn resolve_user(parts: &Parts, state: &AppState) -> Result<Option<Profile>, ApiError> {
    let Some(raw) = parts.headers.get(USER_HEADER) else {
        return Ok(None);
    };
    let Some(id) = raw.to_str().ok().and_then(|s| Uuid::parse_str(s.trim()).ok()) else {
        return Ok(None);
    };
    state.store.get_profile(id).await.map_err(store_err)
}

/// The signed-in profile. Rejects with 401 when absent.
pub struct CurrentUser(pub Profile);

impl FromRequestParts<SharedState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        match resolve_user(parts, state).await? {
            Some(profile) => Ok(CurrentUser(profile)),
            None => Err(TaskflowError::Unauthenticated.into()),
        }
    }
}

// ── Router ────────────────────────────────────────────────────────────

pub fn api_router() -> Router<SharedState> {
    Router::new()
        .route("/api/profiles", post(create_profile))
        .route("/api/me", get(me))
        .route("/api/projects", get(list_projects).post(create_project))
        .route("/api/projects/{id}", get(get_project))
        .route("/api/projects/{id}/board", get(get_board))
        .route(
            "/api/projects/{id}/tickets",
            get(list_tickets).post(create_ticket),
        )
        .route("/api/tickets/{id}", patch(update_ticket))
        .route("/api/tickets/{id}/drop", post(drop_ticket))
        .route("/api/notifications", get(list_notifications))
        .route("/health", get(health_check))
}

// ── Handlers ──────────────────────────────────────────────────────────

async fn health_check() -> &'static str {
    "ok"
}

async fn create_profile(
    State(state): State<SharedState>,
    Json(req): Json<CreateProfileRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = req.email.trim();
    if email.is_empty() {
        return Err(TaskflowError::MissingField { field: "email" }.into());
    }
    let profile = state
        .store
        .upsert_profile(email, req.full_name.as_deref())
        .await
        .map_err(store_err)?;
    Ok((StatusCode::CREATED, Json(profile)))
}

async fn me(CurrentUser(profile): CurrentUser) -> Json<Profile> {
    Json(profile)
}

async fn list_projects(
    State(state): State<SharedState>,
    _user: CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    let projects = state.store.list_projects().await.map_err(store_err)?;
    Ok(Json(projects))
}

async fn create_project(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<CreateProjectRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let mut form = ProjectForm {
        open: true,
        name: req.name,
        description: req.description.unwrap_or_default(),
    };
    let project = form.submit(state.store.as_ref(), &user).await?;
    Ok((StatusCode::CREATED, Json(project)))
}

async fn fetch_project(state: &AppState, id: Uuid) -> Result<Project, ApiError> {
    state
        .store
        .get_project(id)
        .await
        .map_err(store_err)?
        .ok_or_else(|| TaskflowError::ProjectNotFound { id }.into())
}

async fn get_project(
    State(state): State<SharedState>,
    _user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(fetch_project(&state, id).await?))
}

async fn get_board(
    State(state): State<SharedState>,
    _user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(composer::load_board(state.store.as_ref(), id).await?))
}

async fn list_tickets(
    State(state): State<SharedState>,
    _user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    fetch_project(&state, id).await?;
    let tickets = state.store.list_tickets(id).await.map_err(store_err)?;
    Ok(Json(tickets))
}

async fn create_ticket(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Path(project_id): Path<Uuid>,
    Json(req): Json<CreateTicketRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let mut form = TicketForm::new(project_id);
    form.open();
    form.title = req.title;
    form.description = req.description.unwrap_or_default();
    let ticket = form.submit(state.store.as_ref(), &user).await?;
    Ok((StatusCode::CREATED, Json(ticket)))
}

/// Load a ticket and its project's current list, which the propagator
/// uses to address the notification.
async fn ticket_with_siblings(state: &AppState, id: Uuid) -> Result<(Ticket, Vec<Ticket>), ApiError> {
    let ticket = state
        .store
        .get_ticket(id)
        .await
        .map_err(store_err)?
        .ok_or(TaskflowError::TicketNotFound { id })?;
    let tickets = state
        .store
        .list_tickets(ticket.project_id)
        .await
        .map_err(store_err)?;
    Ok((ticket, tickets))
}

async fn update_ticket(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateTicketRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let status = match req.status {
        Some(s) => Some(
            TicketStatus::from_str(&s).map_err(|_| TaskflowError::InvalidStatus { value: s })?,
        ),
        None => None,
    };
    let patch = TicketPatch {
        title: req.title,
        description: req.description,
        status,
    };
    if patch.is_empty() {
        return Err(ApiError::BadRequest("No fields to update".into()));
    }
    let (_, tickets) = ticket_with_siblings(&state, id).await?;
    let outcome = state.propagator.propagate(&user, id, patch, &tickets).await?;
    Ok(Json(outcome))
}

async fn drop_ticket(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<DropTicketRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (_, tickets) = ticket_with_siblings(&state, id).await?;
    let mut drag = DragController::new();
    drag.drag_start(id, &tickets);
    let Some(intent) = drag.drag_end(req.over.as_deref(), &tickets) else {
        return Ok(Json(DropResponse {
            moved: false,
            propagation: None,
        }));
    };
    let outcome = state
        .propagator
        .propagate(&user, intent.ticket_id, intent.patch(), &tickets)
        .await?;
    Ok(Json(DropResponse {
        moved: true,
        propagation: Some(outcome),
    }))
}

async fn list_notifications(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    let notifications = state
        .store
        .list_notifications(user.id)
        .await
        .map_err(store_err)?;
    Ok(Json(notifications))
}
