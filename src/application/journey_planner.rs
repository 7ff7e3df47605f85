// Journey planner trait for the route planner panel
use crate::domain::transit::{JourneyPlan, PlanRequest};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum PlanError {
    #[error("Origin and destination cannot be the same")]
    SameStation,
    #[error("Unknown station '{0}'")]
    UnknownStation(String),
    #[error("No route found between {origin} and {destination}")]
    NoRoute { origin: String, destination: String },
}

#[async_trait]
pub trait JourneyPlanner: Send + Sync {
    /// Best journey for the request
    async fn plan(&self, request: &PlanRequest) -> Result<JourneyPlan, PlanError>;

    /// Up to `count` journeys other than `primary`, best first
    async fn alternatives(&self, request: &PlanRequest, primary: &JourneyPlan, count: usize) -> Vec<JourneyPlan>;
}
