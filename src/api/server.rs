//! API Server Module
//!
//! This module exposes the form as a small HTTP/JSON API. A respondent opens a
//! session with the link they were given, adds synthesis records to it, and
//! finally submits the whole list as one batch.

use crate::{
    AccessGrant, LinkParams, Respondent, SubmissionReceipt, SynthesisRecord,
    batch::BatchSubmitter,
    config::Config,
    error::AppError,
    link::LinkValidator,
    session::{SessionHandle, SessionStore},
};
use axum::{
    Json, Router,
    extract::{FromRequest, FromRequestParts, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Shared application state that is accessible across all request handlers
///
/// - `validator`: Checks signed links before a session is opened
/// - `sessions`: Per-respondent synthesis lists
/// - `submitter`: Sends lists to the sheet store
#[derive(Clone)]
pub struct AppState {
    validator: Arc<LinkValidator>,
    sessions: SessionStore,
    submitter: BatchSubmitter,
}

impl AppState {
    pub fn new(validator: LinkValidator, sessions: SessionStore, submitter: BatchSubmitter) -> Self {
        Self {
            validator: Arc::new(validator),
            sessions,
            submitter,
        }
    }
}

/// The main API server struct
pub struct Server {
    config: Config,
    state: AppState,
}

impl Server {
    pub fn new(config: Config, state: AppState) -> Self {
        Self { config, state }
    }

    /// Build the router with every form route attached to `state`
    pub fn router(state: AppState) -> Router {
        Router::new()
            .route("/sessions", post(open_session))
            .route("/sessions/:id", get(show_session).delete(end_session))
            .route("/sessions/:id/records", post(add_record).delete(clear_records))
            .route("/sessions/:id/submit", post(submit))
            .with_state(state)
    }

    /// Bind to the configured address and serve until the process stops
    pub async fn start(self) -> anyhow::Result<()> {
        let app = Self::router(self.state);

        let addr = format!("{}:{}", self.config.api.host, self.config.api.port);
        info!("API server listening on {}", addr);

        let listener = tokio::net::TcpListener::bind(&addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}

/// JSON body whose rejections use the `{ "error": ... }` envelope
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct JsonBody<T>(pub T);

/// Path parameters whose rejections use the `{ "error": ... }` envelope
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct Path<T>(pub T);

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionOpened {
    pub session_id: Uuid,
    pub organization: String,
    pub signed: bool,
}

/// A record as shown back to the respondent, date already formatted
#[derive(Debug, Serialize, Deserialize)]
pub struct RecordView {
    pub meeting_date: String,
    pub synthesis: String,
}

impl From<&SynthesisRecord> for RecordView {
    fn from(record: &SynthesisRecord) -> Self {
        Self {
            meeting_date: record.formatted_date(),
            synthesis: record.synthesis.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionView {
    pub session_id: Uuid,
    pub organization: String,
    pub opened_at: DateTime<Utc>,
    pub records: Vec<RecordView>,
}

#[derive(Debug, Deserialize)]
pub struct NewRecord {
    pub meeting_date: NaiveDate,
    #[serde(default)]
    pub synthesis: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RecordAdded {
    pub listed: usize,
}

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub respondent: Respondent,
}

async fn find_session(state: &AppState, id: &Uuid) -> Result<SessionHandle, AppError> {
    state.sessions.get(id).await.ok_or_else(|| {
        warn!("Unknown session {}", id);
        AppError::SessionNotFound
    })
}

/// Check the link and open a session bound to its organization
///
/// A refused link opens nothing, so no other route is reachable for it.
async fn open_session(
    State(state): State<AppState>,
    Query(params): Query<LinkParams>,
) -> Result<(StatusCode, Json<SessionOpened>), AppError> {
    let AccessGrant {
        organization,
        signed,
    } = state.validator.validate(&params, Utc::now().timestamp())?;

    let (session_id, _) = state.sessions.create(organization.clone()).await?;
    info!(
        "Opened session {} for organization {:?} (signed link: {})",
        session_id, organization, signed
    );

    Ok((
        StatusCode::CREATED,
        Json(SessionOpened {
            session_id,
            organization,
            signed,
        }),
    ))
}

async fn show_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    let handle = find_session(&state, &id).await?;
    let session = handle.lock().await;

    Ok(Json(SessionView {
        session_id: session.id,
        organization: session.organization.clone(),
        opened_at: session.created_at,
        records: session.records.records().iter().map(RecordView::from).collect(),
    }))
}

async fn add_record(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    JsonBody(record): JsonBody<NewRecord>,
) -> Result<(StatusCode, Json<RecordAdded>), AppError> {
    let handle = find_session(&state, &id).await?;
    let mut session = handle.lock().await;

    let listed = session
        .records
        .add(record.meeting_date, &record.synthesis)
        .map_err(|e| {
            warn!("Session {}: record refused: {}", id, e);
            e
        })?;

    info!("Session {}: record added, {} listed", id, listed);
    Ok((StatusCode::CREATED, Json(RecordAdded { listed })))
}

async fn clear_records(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let handle = find_session(&state, &id).await?;
    handle.lock().await.records.clear();

    info!("Session {}: list cleared", id);
    Ok(StatusCode::NO_CONTENT)
}

/// Send the whole list; the session stays locked until the store answers
async fn submit(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    JsonBody(request): JsonBody<SubmitRequest>,
) -> Result<Json<SubmissionReceipt>, AppError> {
    let handle = find_session(&state, &id).await?;
    let mut session = handle.lock().await;
    let session = &mut *session;

    let receipt = state
        .submitter
        .submit(&session.organization, &mut session.records, &request.respondent)
        .await?;

    Ok(Json(receipt))
}

async fn end_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if !state.sessions.remove(&id).await {
        return Err(AppError::SessionNotFound);
    }

    info!("Session {} ended", id);
    Ok(StatusCode::NO_CONTENT)
}
