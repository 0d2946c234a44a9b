use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use apasnap_core::{
    derive_view, full_screen_url, thumbnail_url, GallerySnapshot, GpsEnricher, MediaFilter,
    MediaItem, MediaType, SortKey, ViewOptions,
};

use crate::error::ApiError;
use crate::state::{AppState, LoadStats, Session};

#[derive(Debug, Default, Deserialize)]
pub struct CreateSessionRequest {
    pub proxy_enabled: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct LoadRequest {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct ProxyRequest {
    pub enabled: bool,
}

/// View overrides, shared by `PUT .../view` bodies and `GET .../items` queries.
#[derive(Debug, Default, Deserialize)]
pub struct ViewParams {
    pub query: Option<String>,
    #[serde(rename = "type")]
    pub media_type: Option<String>,
    pub sort: Option<String>,
}

impl ViewParams {
    fn apply(self, mut view: ViewOptions) -> Result<ViewOptions, ApiError> {
        if let Some(query) = self.query {
            view.query = query;
        }
        if let Some(t) = self.media_type {
            view.media_filter = t.parse::<MediaFilter>().map_err(ApiError::BadRequest)?;
        }
        if let Some(s) = self.sort {
            view.sort = s.parse::<SortKey>().map_err(ApiError::BadRequest)?;
        }
        Ok(view)
    }
}

#[derive(Serialize)]
pub struct SessionSummary {
    pub id: Uuid,
    pub created_at: String,
    pub enriching: bool,
    #[serde(flatten)]
    pub gallery: GallerySnapshot,
}

/// A media item together with its delivery URLs.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemView {
    #[serde(flatten)]
    pub item: MediaItem,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_screen_url: Option<String>,
}

impl From<MediaItem> for ItemView {
    fn from(item: MediaItem) -> Self {
        let (thumbnail_url, full_screen_url) = if item.media_type == MediaType::Image {
            (Some(thumbnail_url(&item.url)), Some(full_screen_url(&item.url)))
        } else {
            (None, None)
        };
        Self {
            item,
            thumbnail_url,
            full_screen_url,
        }
    }
}

#[derive(Serialize)]
pub struct ItemsResponse {
    pub total: usize,
    pub count: usize,
    pub view: ViewOptions,
    pub items: Vec<ItemView>,
}

impl ItemsResponse {
    fn new(all: &[MediaItem], view: ViewOptions) -> Self {
        let items: Vec<ItemView> = derive_view(all, &view).into_iter().map(ItemView::from).collect();
        Self {
            total: all.len(),
            count: items.len(),
            view,
            items,
        }
    }
}

#[derive(Serialize)]
pub struct LoadResponse {
    pub url: String,
    pub manifest_mode: bool,
    pub used_proxy: bool,
    pub transport: String,
    #[serde(flatten)]
    pub items: ItemsResponse,
}

#[derive(Serialize)]
pub struct EnrichResponse {
    pub message: String,
    pub pending: usize,
}

#[derive(Serialize)]
pub struct DeleteSessionResponse {
    pub message: String,
    pub id: Uuid,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/sessions", post(create_session).get(list_sessions))
        .route("/sessions/{id}", get(get_session).delete(delete_session))
        .route("/sessions/{id}/load", post(load_gallery))
        .route("/sessions/{id}/reset", post(reset_session))
        .route("/sessions/{id}/demo", post(load_demo))
        .route("/sessions/{id}/proxy", put(set_proxy))
        .route("/sessions/{id}/view", put(set_view))
        .route("/sessions/{id}/items", get(get_items))
        .route("/sessions/{id}/enrich", post(start_enrichment))
}

fn parse_session_id(id: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(id).map_err(|_| ApiError::BadRequest(format!("Invalid session ID: {}", id)))
}

fn get_session_arc(state: &AppState, id: &str) -> Result<Arc<Session>, ApiError> {
    let id = parse_session_id(id)?;
    let session = state
        .sessions
        .get(&id)
        .map(|r| Arc::clone(r.value()))
        .ok_or_else(|| ApiError::NotFound(format!("Session {} not found", id)))?;
    session.touch();
    Ok(session)
}

async fn summarize(session: &Session) -> SessionSummary {
    let gallery = session.gallery.read().await.snapshot();
    SessionSummary {
        id: session.id(),
        created_at: session.created_at().to_rfc3339(),
        enriching: session.is_enriching(),
        gallery,
    }
}

/// POST /api/v1/sessions
async fn create_session(
    State(state): State<AppState>,
    Json(body): Json<CreateSessionRequest>,
) -> impl IntoResponse {
    let session = Arc::new(Session::new(state.new_gallery_state(body.proxy_enabled)));
    state.sessions.insert(session.id(), Arc::clone(&session));
    info!(session = %session.id(), "Session created");

    (StatusCode::CREATED, Json(summarize(&session).await))
}

/// GET /api/v1/sessions
async fn list_sessions(State(state): State<AppState>) -> Json<Vec<SessionSummary>> {
    let sessions: Vec<Arc<Session>> = state
        .sessions
        .iter()
        .map(|e| Arc::clone(e.value()))
        .collect();

    let mut summaries = Vec::with_capacity(sessions.len());
    for session in &sessions {
        summaries.push(summarize(session).await);
    }
    summaries.sort_by(|a, b| a.created_at.cmp(&b.created_at));
    Json(summaries)
}

/// GET /api/v1/sessions/:id
async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionSummary>, ApiError> {
    let session = get_session_arc(&state, &id)?;
    Ok(Json(summarize(&session).await))
}

/// DELETE /api/v1/sessions/:id
async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteSessionResponse>, ApiError> {
    let id = parse_session_id(&id)?;
    state
        .sessions
        .remove(&id)
        .ok_or_else(|| ApiError::NotFound(format!("Session {} not found", id)))?;

    Ok(Json(DeleteSessionResponse {
        message: "Session deleted".into(),
        id,
    }))
}

/// POST /api/v1/sessions/:id/load
async fn load_gallery(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<LoadRequest>,
) -> Result<Json<LoadResponse>, ApiError> {
    let session = get_session_arc(&state, &id)?;

    let (ticket, mode) = {
        let mut gallery = session.gallery.write().await;
        let ticket = gallery.begin_load();
        (ticket, gallery.mode())
    };
    LoadStats::incr(&state.stats.started);
    debug!(session = %session.id(), url = %body.url, %mode, "Load started");

    let result = state.gallery.load(&body.url, mode).await;
    let outcome = match &result {
        Ok(loaded) => Ok((
            loaded.url.clone(),
            loaded.manifest_mode,
            loaded.used_proxy,
            loaded.transport.clone(),
        )),
        Err(e) => Err(e.clone()),
    };

    let mut gallery = session.gallery.write().await;
    if !gallery.finish_load(ticket, result) {
        LoadStats::incr(&state.stats.superseded);
        info!(session = %session.id(), url = %body.url, "Load superseded, result discarded");
        return Err(ApiError::Conflict(
            "Load was superseded by a newer request".into(),
        ));
    }

    match outcome {
        Ok((url, manifest_mode, used_proxy, transport)) => {
            LoadStats::incr(&state.stats.succeeded);
            Ok(Json(LoadResponse {
                url,
                manifest_mode,
                used_proxy,
                transport,
                items: ItemsResponse::new(gallery.items(), gallery.view.clone()),
            }))
        }
        Err(e) => {
            LoadStats::incr(&state.stats.failed);
            Err(e.into())
        }
    }
}

/// POST /api/v1/sessions/:id/reset
async fn reset_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionSummary>, ApiError> {
    let session = get_session_arc(&state, &id)?;
    session.gallery.write().await.reset();
    Ok(Json(summarize(&session).await))
}

/// POST /api/v1/sessions/:id/demo
async fn load_demo(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ItemsResponse>, ApiError> {
    let session = get_session_arc(&state, &id)?;
    let mut gallery = session.gallery.write().await;
    gallery.load_demo();
    Ok(Json(ItemsResponse::new(gallery.items(), gallery.view.clone())))
}

/// PUT /api/v1/sessions/:id/proxy
async fn set_proxy(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<ProxyRequest>,
) -> Result<Json<SessionSummary>, ApiError> {
    let session = get_session_arc(&state, &id)?;
    session.gallery.write().await.set_proxy_enabled(body.enabled);
    Ok(Json(summarize(&session).await))
}

/// PUT /api/v1/sessions/:id/view
async fn set_view(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<ViewParams>,
) -> Result<Json<ItemsResponse>, ApiError> {
    let session = get_session_arc(&state, &id)?;
    let mut gallery = session.gallery.write().await;
    gallery.view = body.apply(gallery.view.clone())?;
    Ok(Json(ItemsResponse::new(gallery.items(), gallery.view.clone())))
}

/// GET /api/v1/sessions/:id/items
async fn get_items(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<ViewParams>,
) -> Result<Json<ItemsResponse>, ApiError> {
    let session = get_session_arc(&state, &id)?;
    let gallery = session.gallery.read().await;
    let view = params.apply(gallery.view.clone())?;
    Ok(Json(ItemsResponse::new(gallery.items(), view)))
}

/// POST /api/v1/sessions/:id/enrich
async fn start_enrichment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let session = get_session_arc(&state, &id)?;

    let (ticket, mode, pending) = {
        let gallery = session.gallery.read().await;
        let pending: Vec<MediaItem> = gallery
            .items()
            .iter()
            .filter(|i| i.media_type == MediaType::Image && i.has_checked_exif != Some(true))
            .cloned()
            .collect();
        (gallery.ticket(), gallery.mode(), pending)
    };

    if pending.is_empty() {
        return Ok((
            StatusCode::OK,
            Json(EnrichResponse {
                message: "Nothing to enrich".into(),
                pending: 0,
            }),
        ));
    }
    if !session.try_start_enrichment() {
        return Err(ApiError::Conflict("Enrichment already running".into()));
    }

    let count = pending.len();
    let enricher = GpsEnricher::from_strategy(state.gallery.strategy(), mode);
    let stats = Arc::clone(&state.stats);
    let task_session = Arc::clone(&session);

    tokio::spawn(async move {
        for item in &pending {
            let enriched = enricher.enrich(item).await;
            {
                let mut gallery = task_session.gallery.write().await;
                if !gallery.is_current(ticket) {
                    debug!(session = %task_session.id(), "Collection replaced, stopping enrichment");
                    break;
                }
                gallery.apply_enrichment(ticket, &enriched);
            }
            if enriched.has_gps() {
                LoadStats::incr(&stats.items_enriched);
            }
        }
        task_session.finish_enrichment();
        debug!(session = %task_session.id(), "Enrichment finished");
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(EnrichResponse {
            message: "Enrichment started".into(),
            pending: count,
        }),
    ))
}
