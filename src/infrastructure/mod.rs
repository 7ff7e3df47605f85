// Infrastructure layer - configuration, planners and render plan adapters
pub mod config;
pub mod render_plan;
pub mod simulated_planner;
pub mod traffic_conditions;
pub mod transit_network;
