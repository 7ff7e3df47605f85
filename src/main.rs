// Main entry point - Dependency injection and server setup
mod domain;
mod application;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use chrono::Timelike;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::application::dispatcher::Dispatcher;
use crate::application::journey_planner::JourneyPlanner;
use crate::application::session_service::SessionService;
use crate::application::widget_registry::{RendererVariant, WidgetRegistry};
use crate::infrastructure::config::{
    load_network_config, load_server_config, load_traffic_config, load_widgets_config, PlannerSettings,
};
use crate::infrastructure::simulated_planner::SimulatedPlanner;
use crate::infrastructure::traffic_conditions::TrafficConditions;
use crate::infrastructure::transit_network::{NetworkPlanner, TransitNetwork};
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::router;

fn build_planner(settings: &PlannerSettings, network: Arc<TransitNetwork>) -> anyhow::Result<Arc<dyn JourneyPlanner>> {
    match settings.mode.as_str() {
        "simulated" => Ok(Arc::new(SimulatedPlanner::new())),
        "network" => {
            let planner = NetworkPlanner::new(network, settings.transfer_penalty_minutes);
            if !settings.consider_traffic {
                return Ok(Arc::new(planner));
            }

            let interval = Duration::from_secs(settings.traffic_update_secs);
            let hour = chrono::Local::now().hour();
            Ok(Arc::new(planner.with_traffic(|edges| {
                TrafficConditions::new(edges, hour, interval, StdRng::from_entropy())
            })))
        }
        other => anyhow::bail!("unknown planner mode '{}'", other),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let server_config = load_server_config().context("loading config/server")?;
    let catalog = load_widgets_config()?.into_catalog()?;
    let traffic = Arc::new(load_traffic_config()?.into_map()?);
    let (stations, routes) = load_network_config()?.into_parts()?;

    // Resolve renderer variants once
    let enabled: &[RendererVariant] = if server_config.dashboard.enhanced_widgets {
        &[RendererVariant::Enhanced, RendererVariant::Basic]
    } else {
        &[RendererVariant::Basic]
    };
    let registry = Arc::new(WidgetRegistry::resolve(catalog, enabled));
    let defects = registry.defects();
    if !defects.is_empty() {
        tracing::warn!("{} widget series do not match their category labels", defects.len());
    }

    let network = Arc::new(TransitNetwork::new(stations, &routes));
    tracing::info!(
        "Loaded {} widgets, {} stations, {} route legs",
        registry.len(),
        network.stations().len(),
        network.edge_count()
    );

    // Create services (application layer)
    let planner_settings = &server_config.planner;
    let planner = build_planner(planner_settings, network.clone())?;
    let sessions = SessionService::new(
        planner,
        server_config.dashboard.modules.clone(),
        Duration::from_millis(planner_settings.delay_ms),
        planner_settings.alternatives,
    );

    // Create application state
    let state = Arc::new(AppState {
        dispatcher: Dispatcher::new(registry.clone(), traffic.clone()),
        registry,
        traffic,
        network,
        sessions,
    });

    // Build router (presentation layer)
    let app = router(state)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr: SocketAddr = server_config
        .server
        .bind
        .parse()
        .with_context(|| format!("invalid bind address '{}'", server_config.server.bind))?;
    tracing::info!("Starting transit-analytics service on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app).await?;

    Ok(())
}
