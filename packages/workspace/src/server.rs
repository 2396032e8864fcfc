//! JSON API over the console state
//!
//! Every handler that talks to the store runs its work in a spawned task.
//! A client that disconnects mid-request drops only the wait for the
//! answer; the store call and the bookkeeping after it still complete.
//!
//! Section commits run split-phase: the sections lock is released while
//! the store write is in flight, so other sections stay editable and
//! savable.

use crate::state::{ConsoleState, Overview, StateError};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch, post, put},
    Json, Router,
};
use contentdesk_common::{CollectionKind, EntityId, FieldPath, LeadKind, Record, SectionId};
use contentdesk_editor::{
    CanonicalValue, DeleteToken, Draft, EditController, EditorError, FlagUpdate, GatewayError,
    Mutation, PersistenceGateway, Phase, SessionKey, StatusMessage,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::future::Future;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

#[derive(Clone)]
pub struct AppState {
    console: Arc<ConsoleState>,
}

impl AppState {
    pub fn new(console: ConsoleState) -> Self {
        Self {
            console: Arc::new(console),
        }
    }

    pub fn console(&self) -> Arc<ConsoleState> {
        self.console.clone()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/overview", get(overview))
        .route("/api/status", get(status))
        .route("/api/sections", get(list_sections))
        .route("/api/sections/:id", get(get_section))
        .route("/api/sections/:id/edit", post(begin_edit))
        .route("/api/sections/:id/cancel", post(cancel_edit))
        .route("/api/sections/:id/draft", post(apply_mutation))
        .route("/api/sections/:id/commit", post(commit))
        .route("/api/collections/:kind", get(list_entities).post(create_entity))
        .route("/api/collections/:kind/template", get(get_template).post(apply_template))
        .route("/api/collections/:kind/:id", patch(patch_entity))
        .route("/api/collections/:kind/:id/flags", post(toggle_flags))
        .route("/api/collections/:kind/:id/delete", post(request_delete))
        .route("/api/collections/:kind/deletes/:token/confirm", post(confirm_delete))
        .route("/api/collections/:kind/deletes/:token/abort", post(abort_delete))
        .route("/api/leads/:kind", get(list_leads))
        .route("/api/leads/:kind/:id/status", put(update_lead_status))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

/// Bind `addr` and serve until the process is stopped
pub async fn serve(addr: &str, state: AppState) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "API listening");
    axum::serve(listener, router(state)).await
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug)]
pub struct ApiError(StateError);

impl<E: Into<StateError>> From<E> for ApiError {
    fn from(error: E) -> Self {
        ApiError(error.into())
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        let gateway_status = |error: &GatewayError| match error {
            GatewayError::Transport(_) => StatusCode::BAD_GATEWAY,
            GatewayError::Conflict { .. } => StatusCode::CONFLICT,
            GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
        };

        match &self.0 {
            StateError::UnknownLead(_) => StatusCode::NOT_FOUND,
            StateError::Interrupted(_) => StatusCode::INTERNAL_SERVER_ERROR,
            StateError::Gateway(error) => gateway_status(error),
            StateError::Editor(error) => match error {
                EditorError::UnknownSection(_)
                | EditorError::UnknownCollection(_)
                | EditorError::UnknownEntity(_)
                | EditorError::UnknownToken(_)
                | EditorError::NoSession(_) => StatusCode::NOT_FOUND,
                EditorError::SessionBusy(_)
                | EditorError::DraftInProgress(_)
                | EditorError::Conflict(_) => StatusCode::CONFLICT,
                EditorError::NotAnArray(_) | EditorError::Path(_) => StatusCode::UNPROCESSABLE_ENTITY,
                EditorError::Gateway(error) => gateway_status(error),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(error = %self.0, "request failed");
        }
        (status, Json(ErrorBody { error: self.0.to_string() })).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Run `work` to completion even if the request that started it is dropped
async fn detached<T, F>(work: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: Future<Output = Result<T, ApiError>> + Send + 'static,
{
    tokio::spawn(work)
        .await
        .map_err(|error| ApiError(StateError::Interrupted(error.to_string())))?
}

// ============================================================================
// Sections
// ============================================================================

#[derive(Debug, Default, Deserialize)]
struct FocusQuery {
    field: Option<FieldPath>,
}

impl FocusQuery {
    fn key(self, id: String) -> SessionKey {
        match self.field {
            Some(field) => SessionKey::field(id, field),
            None => SessionKey::section(id),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SectionView {
    id: SectionId,
    label: String,
    version: u64,
    value: Value,
    phase: Phase,
    draft: Option<Draft>,
    last_error: Option<String>,
}

fn section_view(controller: &EditController, key: &SessionKey) -> Result<SectionView, ApiError> {
    let spec = controller.registry().section(&key.section)?;
    let canonical = controller.canonical(&key.section)?;
    let session = controller.session(key);

    Ok(SectionView {
        id: spec.id.clone(),
        label: spec.label.clone(),
        version: canonical.version,
        value: key.scope(&canonical.value),
        phase: controller.phase(key),
        draft: session.map(|s| s.draft().clone()),
        last_error: session.and_then(|s| s.last_error().map(str::to_string)),
    })
}

async fn list_sections(State(state): State<AppState>) -> ApiResult<Vec<SectionView>> {
    let controller = state.console.sections().lock().await;
    let views = controller
        .registry()
        .sections()
        .map(|spec| section_view(&controller, &SessionKey::section(spec.id.clone())))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(views))
}

async fn get_section(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(focus): Query<FocusQuery>,
) -> ApiResult<SectionView> {
    let controller = state.console.sections().lock().await;
    Ok(Json(section_view(&controller, &focus.key(id))?))
}

#[derive(Debug, Default, Deserialize)]
struct BeginRequest {
    #[serde(default)]
    discard: bool,
}

async fn begin_edit(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(focus): Query<FocusQuery>,
    body: Option<Json<BeginRequest>>,
) -> ApiResult<Draft> {
    let discard = body.map(|Json(request)| request.discard).unwrap_or_default();
    let key = focus.key(id);

    let mut controller = state.console.sections().lock().await;
    let draft = if discard {
        controller.begin_edit_discarding(key)?
    } else {
        controller.begin_edit(key)?
    };
    Ok(Json(draft.clone()))
}

async fn cancel_edit(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(focus): Query<FocusQuery>,
) -> Result<StatusCode, ApiError> {
    state.console.sections().lock().await.cancel(&focus.key(id))?;
    Ok(StatusCode::NO_CONTENT)
}

async fn apply_mutation(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(focus): Query<FocusQuery>,
    Json(mutation): Json<Mutation>,
) -> ApiResult<Draft> {
    let mut controller = state.console.sections().lock().await;
    let draft = controller.apply(&focus.key(id), &mutation)?;
    Ok(Json(draft.clone()))
}

async fn commit(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(focus): Query<FocusQuery>,
) -> ApiResult<CanonicalValue> {
    let console = state.console();
    let key = focus.key(id);

    let saved = detached(async move {
        let ticket = console.sections().lock().await.begin_commit(&key)?;

        let result = console
            .gateway()
            .write_section(&ticket.endpoint, ticket.payload.clone(), Some(ticket.expected_version))
            .await;

        let saved = console.sections().lock().await.finish_commit(ticket, result)?;
        Ok::<_, ApiError>(saved)
    })
    .await?;
    Ok(Json(saved))
}

// ============================================================================
// Collections
// ============================================================================

async fn list_entities(
    State(state): State<AppState>,
    Path(kind): Path<CollectionKind>,
) -> ApiResult<Vec<Record>> {
    let collection = state.console.collection(kind)?.lock().await;
    Ok(Json(collection.entities().to_vec()))
}

/// Create from the posted body, or from the collection's form if the body
/// is absent
async fn create_entity(
    State(state): State<AppState>,
    Path(kind): Path<CollectionKind>,
    body: Option<Json<Value>>,
) -> Result<(StatusCode, Json<Record>), ApiError> {
    let console = state.console();
    let record = detached(async move {
        let mut collection = console.collection(kind)?.lock().await;
        let record = match body {
            Some(Json(template)) => collection.create(template).await?,
            None => collection.create_from_template().await?,
        };
        Ok::<_, ApiError>(record)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(record)))
}

async fn get_template(
    State(state): State<AppState>,
    Path(kind): Path<CollectionKind>,
) -> ApiResult<Value> {
    let collection = state.console.collection(kind)?.lock().await;
    Ok(Json(collection.template().clone()))
}

async fn apply_template(
    State(state): State<AppState>,
    Path(kind): Path<CollectionKind>,
    Json(mutation): Json<Mutation>,
) -> ApiResult<Value> {
    let mut collection = state.console.collection(kind)?.lock().await;
    let template = collection.apply_template(&mutation)?;
    Ok(Json(template.clone()))
}

async fn patch_entity(
    State(state): State<AppState>,
    Path((kind, id)): Path<(CollectionKind, EntityId)>,
    Json(fields): Json<Map<String, Value>>,
) -> ApiResult<Record> {
    let console = state.console();
    let record = detached(async move {
        let mut collection = console.collection(kind)?.lock().await;
        Ok::<_, ApiError>(collection.patch(&id, fields).await?)
    })
    .await?;
    Ok(Json(record))
}

async fn toggle_flags(
    State(state): State<AppState>,
    Path((kind, id)): Path<(CollectionKind, EntityId)>,
    Json(flags): Json<FlagUpdate>,
) -> ApiResult<Record> {
    let console = state.console();
    let record = detached(async move {
        let mut collection = console.collection(kind)?.lock().await;
        Ok::<_, ApiError>(collection.toggle_flags(&id, &flags).await?)
    })
    .await?;
    Ok(Json(record))
}

#[derive(Debug, Serialize)]
struct DeleteRequested {
    token: DeleteToken,
    id: EntityId,
}

async fn request_delete(
    State(state): State<AppState>,
    Path((kind, id)): Path<(CollectionKind, EntityId)>,
) -> ApiResult<DeleteRequested> {
    let token = state.console.collection(kind)?.lock().await.request_delete(&id)?;
    Ok(Json(DeleteRequested { token, id }))
}

async fn confirm_delete(
    State(state): State<AppState>,
    Path((kind, token)): Path<(CollectionKind, DeleteToken)>,
) -> ApiResult<EntityId> {
    let console = state.console();
    let id = detached(async move {
        let mut collection = console.collection(kind)?.lock().await;
        Ok::<_, ApiError>(collection.confirm_delete(token).await?)
    })
    .await?;
    Ok(Json(id))
}

async fn abort_delete(
    State(state): State<AppState>,
    Path((kind, token)): Path<(CollectionKind, DeleteToken)>,
) -> ApiResult<EntityId> {
    let id = state.console.collection(kind)?.lock().await.abort_delete(token)?;
    Ok(Json(id))
}

// ============================================================================
// Leads, overview, status
// ============================================================================

async fn list_leads(State(state): State<AppState>, Path(kind): Path<LeadKind>) -> ApiResult<Vec<Record>> {
    let board = state.console.leads(kind).lock().await;
    Ok(Json(board.records().to_vec()))
}

#[derive(Debug, Deserialize)]
struct StatusUpdate {
    status: String,
}

async fn update_lead_status(
    State(state): State<AppState>,
    Path((kind, id)): Path<(LeadKind, EntityId)>,
    Json(update): Json<StatusUpdate>,
) -> ApiResult<Record> {
    let console = state.console();
    let record = detached(async move {
        let mut board = console.leads(kind).lock().await;
        Ok::<_, ApiError>(board.update_status(&id, &update.status).await?)
    })
    .await?;
    Ok(Json(record))
}

async fn overview(State(state): State<AppState>) -> Json<Overview> {
    Json(state.console.overview().await)
}

async fn status(State(state): State<AppState>) -> Json<Option<StatusMessage>> {
    Json(state.console.notifier().current())
}
