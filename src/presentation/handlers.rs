// HTTP request handlers
use crate::application::dispatcher::DispatchReport;
use crate::application::session_service::{SessionError, SessionId};
use crate::application::widget_registry::{RendererVariant, ResolvedWidget};
use crate::domain::traffic::{legend_entries, CongestionSite, LatLng, RoadSegment};
use crate::domain::transit::PlanRequest;
use crate::domain::view::{NavEvent, NavigationError, ViewState};
use crate::domain::widget::WidgetKind;
use crate::infrastructure::render_plan::{PageManifest, RenderInstruction, RenderPlanBuilder};
use crate::presentation::app_state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .route("/widgets", get(list_widgets))
        .route("/widgets/defects", get(widget_defects))
        .route("/widgets/:id", get(get_widget))
        .route("/traffic", get(traffic_map))
        .route("/render", post(render_page))
        .route("/stations", get(list_stations))
        .route("/sessions", post(create_session))
        .route("/sessions/:id", get(get_session).delete(delete_session))
        .route("/sessions/:id/events", post(post_event))
        .route("/sessions/:id/journeys", post(plan_journey))
        .with_state(state)
}

impl IntoResponse for SessionError {
    fn into_response(self) -> Response {
        let status = match &self {
            SessionError::NotFound(_) => StatusCode::NOT_FOUND,
            SessionError::Navigation(NavigationError::UnknownModule(_)) => StatusCode::UNPROCESSABLE_ENTITY,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[derive(Serialize)]
struct WidgetSummary<'a> {
    id: &'a str,
    kind: WidgetKind,
    variant: RendererVariant,
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<&'a str>,
}

#[derive(Serialize)]
struct ColoredSite<'a> {
    #[serde(flatten)]
    site: &'a CongestionSite,
    color: &'static str,
}

#[derive(Serialize)]
struct ColoredRoad<'a> {
    #[serde(flatten)]
    road: &'a RoadSegment,
    color: &'static str,
}

#[derive(Serialize)]
struct LegendRow {
    label: String,
    color: &'static str,
}

#[derive(Serialize)]
struct TrafficView<'a> {
    center: LatLng,
    zoom: u8,
    tile_url: &'a str,
    attribution: &'a str,
    sites: Vec<ColoredSite<'a>>,
    roads: Vec<ColoredRoad<'a>>,
    legend: Vec<LegendRow>,
}

#[derive(Serialize)]
struct RenderResponse {
    report: DispatchReport,
    instructions: Vec<RenderInstruction>,
}

#[derive(Serialize)]
struct SessionCreated {
    id: SessionId,
    state: ViewState,
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Resolved widgets in declared order
pub async fn list_widgets(State(state): State<Arc<AppState>>) -> Response {
    let widgets: Vec<WidgetSummary> = state
        .registry
        .iter()
        .map(|w| WidgetSummary {
            id: &w.id,
            kind: w.spec.kind,
            variant: w.variant,
            title: w.spec.title.as_deref(),
        })
        .collect();
    Json(widgets).into_response()
}

pub async fn get_widget(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<ResolvedWidget>, StatusCode> {
    state
        .registry
        .resolved(&id)
        .cloned()
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

pub async fn widget_defects(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.registry.defects())
}

/// Congestion sites and roads with their classified colors, plus the legend
pub async fn traffic_map(State(state): State<Arc<AppState>>) -> Response {
    let traffic = &state.traffic;
    let view = TrafficView {
        center: traffic.center,
        zoom: traffic.zoom,
        tile_url: &traffic.tile_url,
        attribution: &traffic.attribution,
        sites: traffic
            .sites
            .iter()
            .map(|site| ColoredSite {
                site,
                color: site.color().hex(),
            })
            .collect(),
        roads: traffic
            .roads
            .iter()
            .map(|road| ColoredRoad {
                road,
                color: road.color().hex(),
            })
            .collect(),
        legend: legend_entries()
            .into_iter()
            .map(|entry| LegendRow {
                label: entry.label,
                color: entry.color.hex(),
            })
            .collect(),
    };
    Json(view).into_response()
}

/// Dispatch the registry against the reported page and return the render plan
pub async fn render_page(
    State(state): State<Arc<AppState>>,
    Json(manifest): Json<PageManifest>,
) -> impl IntoResponse {
    let mut builder = RenderPlanBuilder::for_manifest(&manifest);
    let report = state.dispatcher.dispatch(&manifest, &mut builder);

    tracing::debug!(
        "Rendered {} widgets, skipped {}, failed {}",
        report.rendered.len(),
        report.skipped.len(),
        report.failed.len()
    );

    Json(RenderResponse {
        report,
        instructions: builder.into_instructions(),
    })
}

pub async fn list_stations(State(state): State<Arc<AppState>>) -> Response {
    Json(state.network.stations()).into_response()
}

pub async fn create_session(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let (id, view) = state.sessions.create().await;
    (StatusCode::CREATED, Json(SessionCreated { id, state: view }))
}

pub async fn get_session(
    Path(id): Path<SessionId>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<ViewState>, SessionError> {
    Ok(Json(state.sessions.state(id).await?))
}

pub async fn delete_session(
    Path(id): Path<SessionId>,
    State(state): State<Arc<AppState>>,
) -> Result<StatusCode, SessionError> {
    state.sessions.dispose(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn post_event(
    Path(id): Path<SessionId>,
    State(state): State<Arc<AppState>>,
    Json(event): Json<NavEvent>,
) -> Result<Json<ViewState>, SessionError> {
    Ok(Json(state.sessions.apply(id, event).await?))
}

/// Accepts the request and returns the loading view; results land after the delay
pub async fn plan_journey(
    Path(id): Path<SessionId>,
    State(state): State<Arc<AppState>>,
    Json(request): Json<PlanRequest>,
) -> Result<(StatusCode, Json<ViewState>), SessionError> {
    let view = state.sessions.plan_journey(id, request).await?;
    Ok((StatusCode::ACCEPTED, Json(view)))
}
