// Simulated journey planner - randomized figures for the demo page
use crate::application::journey_planner::{JourneyPlanner, PlanError};
use crate::domain::transit::{JourneyPlan, PlanRequest, RouteSegment, RouteType};
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;

/// Stops and routes used for the transfer legs of simulated journeys
const PRIMARY_TRANSFER: (&str, &str) = ("Central Station", "305B");
const ALTERNATIVE_TRANSFER: (&str, &str) = ("South Station", "205D");

struct Draft {
    title: String,
    first_route: String,
    transfer: (&'static str, &'static str),
    time_minutes: f64,
    distance_km: f64,
    fare: u32,
    transfers: u32,
}

pub struct SimulatedPlanner {
    rng: Mutex<StdRng>,
}

impl SimulatedPlanner {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    fn with_rng<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut rng)
    }
}

impl Default for SimulatedPlanner {
    fn default() -> Self {
        Self::new()
    }
}

/// One decimal place, as shown on the results card
fn tenths(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn build(request: &PlanRequest, draft: Draft) -> JourneyPlan {
    let origin = request.origin.trim();
    let destination = request.destination.trim();
    let (hub, second_route) = draft.transfer;

    let mut steps = vec![format!("Take Route {} from {}", draft.first_route, origin)];
    let mut segments = vec![RouteSegment {
        route_id: draft.first_route.clone(),
        start: origin.to_string(),
        route_type: RouteType::Regular,
    }];
    let mut path = vec![origin.to_string()];

    for _ in 0..draft.transfers {
        steps.push(format!("Transfer at {}", hub));
        steps.push(format!("Take Route {} to {}", second_route, destination));
        segments.push(RouteSegment {
            route_id: second_route.to_string(),
            start: hub.to_string(),
            route_type: RouteType::Regular,
        });
        path.push(hub.to_string());
    }

    path.push(destination.to_string());
    steps.push(JourneyPlan::arrival_step(destination));

    JourneyPlan {
        title: draft.title,
        path,
        coordinates: Vec::new(),
        time_minutes: draft.time_minutes,
        distance_km: draft.distance_km,
        fare: draft.fare,
        transfers: draft.transfers,
        steps,
        segments,
        traffic_multipliers: Vec::new(),
    }
}

#[async_trait]
impl JourneyPlanner for SimulatedPlanner {
    async fn plan(&self, request: &PlanRequest) -> Result<JourneyPlan, PlanError> {
        if request.is_round_trip() {
            return Err(PlanError::SameStation);
        }

        let draft = self.with_rng(|rng| Draft {
            title: JourneyPlan::title_for(request.origin.trim(), request.destination.trim()),
            first_route: "500A".to_string(),
            transfer: PRIMARY_TRANSFER,
            time_minutes: rng.gen_range(15..=75) as f64,
            distance_km: tenths(rng.gen_range(5.0..25.0)),
            fare: rng.gen_range(10..=60),
            transfers: rng.gen_range(0..=3),
        });

        Ok(build(request, draft))
    }

    /// Variations on the primary: slower, slightly longer, a little cheaper
    async fn alternatives(&self, request: &PlanRequest, primary: &JourneyPlan, count: usize) -> Vec<JourneyPlan> {
        if request.is_round_trip() {
            return Vec::new();
        }

        (0..count)
            .map(|i| {
                let draft = self.with_rng(|rng| Draft {
                    title: format!(
                        "Alternative Route {}: {}",
                        i + 1,
                        JourneyPlan::title_for(request.origin.trim(), request.destination.trim())
                    ),
                    first_route: format!("{}C", 300 + i),
                    transfer: ALTERNATIVE_TRANSFER,
                    time_minutes: primary.time_minutes + rng.gen_range(5..=20) as f64,
                    distance_km: tenths(primary.distance_km + rng.gen_range(0.0..3.0)),
                    fare: primary.fare.saturating_sub(rng.gen_range(0..=10)),
                    transfers: rng.gen_range(0..=2),
                });
                build(request, draft)
            })
            .collect()
    }
}
