// Transit network domain models
use super::traffic::LatLng;
use geo::{Distance, HaversineMeasure, Point};
use serde::{Deserialize, Serialize};

const EARTH_RADIUS_M: f64 = 6_371_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteType {
    Regular,
    Express,
    Premium,
}

impl RouteType {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "regular" => Some(RouteType::Regular),
            "express" => Some(RouteType::Express),
            "premium" => Some(RouteType::Premium),
            _ => None,
        }
    }

    /// Average speed in km/h
    pub fn speed_kmh(&self) -> f64 {
        match self {
            RouteType::Express => 30.0,
            RouteType::Regular | RouteType::Premium => 20.0,
        }
    }

    /// Fare for one uninterrupted ride, rounded to the nearest rupee with
    /// ties going to the even rupee.
    /// The first 2 km are covered by the base fare.
    pub fn fare(&self, distance_km: f64) -> u32 {
        let (base, per_km) = match self {
            RouteType::Regular => (5.0, 1.5),
            RouteType::Express => (10.0, 2.0),
            RouteType::Premium => (15.0, 2.5),
        };
        let fare: f64 = base + (distance_km - 2.0).max(0.0) * per_km;
        fare.round_ties_even() as u32
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Station {
    pub name: String,
    pub position: LatLng,
}

impl Station {
    pub fn new(name: String, position: LatLng) -> Self {
        Self { name, position }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransitRoute {
    pub id: String,
    pub route_type: RouteType,
    pub stops: Vec<String>,
}

impl From<LatLng> for Point<f64> {
    fn from(position: LatLng) -> Self {
        Point::new(position.lng, position.lat)
    }
}

/// Great-circle distance in kilometres on a 6371 km sphere
pub fn haversine_km(a: LatLng, b: LatLng) -> f64 {
    HaversineMeasure::new(EARTH_RADIUS_M).distance(Point::from(a), Point::from(b)) / 1000.0
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlanRequest {
    pub origin: String,
    pub destination: String,
    #[serde(default)]
    pub show_alternatives: bool,
}

impl PlanRequest {
    pub fn new(origin: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            destination: destination.into(),
            show_alternatives: false,
        }
    }

    pub fn with_alternatives(mut self) -> Self {
        self.show_alternatives = true;
        self
    }

    pub fn is_round_trip(&self) -> bool {
        self.origin.trim() == self.destination.trim()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteSegment {
    pub route_id: String,
    pub start: String,
    pub route_type: RouteType,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JourneyPlan {
    pub title: String,
    pub path: Vec<String>,
    pub coordinates: Vec<LatLng>,
    pub time_minutes: f64,
    pub distance_km: f64,
    pub fare: u32,
    pub transfers: u32,
    pub steps: Vec<String>,
    pub segments: Vec<RouteSegment>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub traffic_multipliers: Vec<f64>,
}

impl JourneyPlan {
    pub fn arrival_step(destination: &str) -> String {
        format!("Arrive at {}", destination)
    }

    pub fn title_for(origin: &str, destination: &str) -> String {
        format!("{} → {}", origin, destination)
    }
}
