// Application state for HTTP handlers
use crate::application::dispatcher::Dispatcher;
use crate::application::session_service::SessionService;
use crate::application::widget_registry::WidgetRegistry;
use crate::domain::traffic::TrafficMap;
use crate::infrastructure::transit_network::TransitNetwork;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<WidgetRegistry>,
    pub traffic: Arc<TrafficMap>,
    pub network: Arc<TransitNetwork>,
    pub dispatcher: Dispatcher,
    pub sessions: SessionService,
}
