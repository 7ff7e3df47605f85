// View state for a single dashboard page view
use super::transit::JourneyPlan;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const SCROLLED_THRESHOLD: f64 = 50.0;

#[derive(Debug, Error, PartialEq)]
pub enum NavigationError {
    #[error("unknown module '{0}'")]
    UnknownModule(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionPhase {
    Idle,
    Active,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub theme: String,
    pub data_refresh_secs: u32,
    pub notifications: bool,
    pub analytics_consent: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: "light".to_string(),
            data_refresh_secs: 60,
            notifications: true,
            analytics_consent: true,
        }
    }
}

/// Route planner panels. A panel is visible when it holds a value.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlannerPanel {
    pub loading: bool,
    pub results: Option<JourneyPlan>,
    pub error: Option<String>,
    pub alternatives: Vec<JourneyPlan>,
}

impl PlannerPanel {
    pub fn start_loading(&mut self) {
        *self = PlannerPanel {
            loading: true,
            ..PlannerPanel::default()
        };
    }

    pub fn show_results(&mut self, plan: JourneyPlan, alternatives: Vec<JourneyPlan>) {
        *self = PlannerPanel {
            results: Some(plan),
            alternatives,
            ..PlannerPanel::default()
        };
    }

    pub fn show_error(&mut self, message: String) {
        *self = PlannerPanel {
            error: Some(message),
            ..PlannerPanel::default()
        };
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewState {
    pub active_module: String,
    pub modules: Vec<String>,
    pub menu_open: bool,
    pub header_scrolled: bool,
    pub transition: TransitionPhase,
    pub planner: PlannerPanel,
    pub settings: Settings,
}

impl ViewState {
    /// The first module is active on load
    pub fn new(modules: Vec<String>) -> Self {
        let active_module = modules.first().cloned().unwrap_or_default();
        Self {
            active_module,
            modules,
            menu_open: false,
            header_scrolled: false,
            transition: TransitionPhase::Idle,
            planner: PlannerPanel::default(),
            settings: Settings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NavEvent {
    Scrolled { y: f64 },
    ToggleMenu,
    Navigate { module: String },
    TransitionFinished,
    SaveSettings { settings: Settings },
    ResetSettings,
}

/// Apply a navigation event. On error the state is left untouched.
pub fn navigate(state: &mut ViewState, event: NavEvent) -> Result<(), NavigationError> {
    match event {
        NavEvent::Scrolled { y } => {
            state.header_scrolled = y > SCROLLED_THRESHOLD;
        }
        NavEvent::ToggleMenu => {
            state.menu_open = !state.menu_open;
        }
        NavEvent::Navigate { module } => {
            if !state.modules.contains(&module) {
                return Err(NavigationError::UnknownModule(module));
            }
            state.transition = TransitionPhase::Active;
            state.active_module = module;
            state.menu_open = false;
        }
        NavEvent::TransitionFinished => {
            state.transition = TransitionPhase::Idle;
        }
        NavEvent::SaveSettings { settings } => {
            state.settings = settings;
        }
        NavEvent::ResetSettings => {
            state.settings = Settings::default();
        }
    }
    Ok(())
}
