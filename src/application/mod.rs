// Application layer - registry, dispatch, sessions and planning
pub mod dispatcher;
pub mod journey_planner;
pub mod session_service;
pub mod task;
pub mod widget_registry;
