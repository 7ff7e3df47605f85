// Transit network graph and the network-backed journey planner
use crate::application::journey_planner::{JourneyPlanner, PlanError};
use crate::domain::transit::{
    haversine_km, JourneyPlan, PlanRequest, RouteSegment, RouteType, Station, TransitRoute,
};
use crate::infrastructure::traffic_conditions::TrafficConditions;
use async_trait::async_trait;
use chrono::Timelike;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Instant;

const MAJOR_HUBS: usize = 5;
const FALLBACK_SPEED_KMH: f64 = 20.0;

#[derive(Debug, Clone)]
struct Edge {
    to: usize,
    route_id: String,
    route_type: RouteType,
    distance_km: f64,
    time_minutes: f64,
}

/// Directed multigraph of stations; every pair of consecutive stops on a
/// route contributes one edge.
#[derive(Debug, Clone)]
pub struct TransitNetwork {
    stations: Vec<Station>,
    index: HashMap<String, usize>,
    edges: Vec<Vec<Edge>>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Visit {
    cost: f64,
    node: usize,
}

impl Eq for Visit {}

impl Ord for Visit {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed for a min-heap
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| self.node.cmp(&other.node))
    }
}

impl PartialOrd for Visit {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl TransitNetwork {
    /// Routes must only reference known stations
    pub fn new(stations: Vec<Station>, routes: &[TransitRoute]) -> Self {
        let index: HashMap<String, usize> = stations
            .iter()
            .enumerate()
            .map(|(i, s)| (s.name.clone(), i))
            .collect();
        let mut edges = vec![Vec::new(); stations.len()];

        for route in routes {
            for pair in route.stops.windows(2) {
                let (Some(&from), Some(&to)) = (index.get(&pair[0]), index.get(&pair[1])) else {
                    tracing::warn!("Route {} references an unknown stop, skipping leg", route.id);
                    continue;
                };
                let distance_km = haversine_km(stations[from].position, stations[to].position);
                edges[from].push(Edge {
                    to,
                    route_id: route.id.clone(),
                    route_type: route.route_type,
                    distance_km,
                    time_minutes: distance_km / route.route_type.speed_kmh() * 60.0,
                });
            }
        }

        Self {
            stations,
            index,
            edges,
        }
    }

    pub fn stations(&self) -> &[Station] {
        &self.stations
    }

    pub fn edge_count(&self) -> usize {
        self.edges.iter().map(Vec::len).sum()
    }

    fn edge_pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.edges
            .iter()
            .enumerate()
            .flat_map(|(from, out)| out.iter().map(move |e| (from, e.to)))
    }

    /// Stations ordered by total degree, highest first
    pub fn major_hubs(&self, top_n: usize) -> Vec<(String, usize)> {
        let mut degree = vec![0usize; self.stations.len()];
        for (from, to) in self.edge_pairs() {
            degree[from] += 1;
            degree[to] += 1;
        }

        let mut ranked: Vec<(usize, usize)> = degree.into_iter().enumerate().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked
            .into_iter()
            .take(top_n)
            .map(|(i, d)| (self.stations[i].name.clone(), d))
            .collect()
    }

    /// Exact name, then the first station containing the query, then the
    /// station sharing the most words with it.
    pub fn resolve(&self, query: &str) -> Option<usize> {
        let query = query.trim();
        if let Some(&i) = self.index.get(query) {
            return Some(i);
        }

        let needle = query.to_lowercase();
        if needle.is_empty() {
            return None;
        }
        if let Some(i) = self
            .stations
            .iter()
            .position(|s| s.name.to_lowercase().contains(&needle))
        {
            return Some(i);
        }

        let words: HashSet<&str> = needle.split_whitespace().collect();
        let mut best: Option<(usize, usize)> = None;
        for (i, station) in self.stations.iter().enumerate() {
            let name = station.name.to_lowercase();
            let shared = name.split_whitespace().filter(|w| words.contains(w)).count();
            if shared > 0 && best.is_none_or(|(_, score)| shared > score) {
                best = Some((i, shared));
            }
        }
        best.map(|(i, _)| i)
    }

    fn serves(&self, from: usize, to: usize, route_id: &str) -> bool {
        self.edges[from].iter().any(|e| e.to == to && e.route_id == route_id)
    }

    /// Consecutive legs of `path`, starting at leg `start`, that `route_id` covers
    fn run_length(&self, path: &[usize], start: usize, route_id: &str) -> usize {
        path[start..]
            .windows(2)
            .take_while(|pair| self.serves(pair[0], pair[1], route_id))
            .count()
    }

    /// Fastest edge for leg `leg` of `path`. Among equally fast edges, stay on
    /// the current route, otherwise take the one that rides furthest.
    fn leg_edge(&self, path: &[usize], leg: usize, current_route: Option<&str>) -> Option<&Edge> {
        let (from, to) = (path[leg], path[leg + 1]);
        let candidates: Vec<&Edge> = self.edges[from].iter().filter(|e| e.to == to).collect();
        let fastest = candidates
            .iter()
            .map(|e| e.time_minutes)
            .min_by(|a, b| a.total_cmp(b))?;
        let tied = candidates.into_iter().filter(|e| e.time_minutes == fastest);

        let mut best: Option<(&Edge, usize)> = None;
        for edge in tied {
            if current_route == Some(edge.route_id.as_str()) {
                return Some(edge);
            }
            let run = self.run_length(path, leg, &edge.route_id);
            if best.is_none_or(|(_, longest)| run > longest) {
                best = Some((edge, run));
            }
        }
        best.map(|(edge, _)| edge)
    }

    /// Dijkstra over base travel time
    pub fn shortest_path(&self, from: usize, to: usize) -> Option<Vec<usize>> {
        let mut best = vec![f64::INFINITY; self.stations.len()];
        let mut previous: Vec<Option<usize>> = vec![None; self.stations.len()];
        let mut heap = BinaryHeap::new();

        best[from] = 0.0;
        heap.push(Visit { cost: 0.0, node: from });

        while let Some(Visit { cost, node }) = heap.pop() {
            if node == to {
                break;
            }
            if cost > best[node] {
                continue;
            }
            for edge in &self.edges[node] {
                let next = cost + edge.time_minutes;
                if next < best[edge.to] {
                    best[edge.to] = next;
                    previous[edge.to] = Some(node);
                    heap.push(Visit {
                        cost: next,
                        node: edge.to,
                    });
                }
            }
        }

        if best[to].is_infinite() {
            return None;
        }

        let mut path = vec![to];
        let mut current = to;
        while let Some(prev) = previous[current] {
            path.push(prev);
            current = prev;
        }
        path.reverse();
        Some(path)
    }

    /// Shortest paths forced through each of the given waypoints in order
    fn path_via(&self, from: usize, waypoints: &[usize], to: usize) -> Option<Vec<usize>> {
        let mut path = vec![from];
        let mut current = from;
        for &next in waypoints.iter().chain(std::iter::once(&to)) {
            let leg = self.shortest_path(current, next)?;
            path.extend_from_slice(&leg[1..]);
            current = next;
        }
        Some(path)
    }

    fn describe(&self, path: &[usize], transfer_penalty: f64, traffic: Option<&TrafficConditions>) -> JourneyPlan {
        let mut time_minutes = 0.0;
        let mut distance_km = 0.0;
        let mut fare = 0;
        let mut steps = Vec::new();
        let mut segments: Vec<RouteSegment> = Vec::new();
        let mut multipliers = Vec::new();

        let mut current_route: Option<String> = None;
        let mut route_type = RouteType::Regular;
        let mut segment_distance = 0.0;

        for leg in 0..path.len().saturating_sub(1) {
            let (u, v) = (path[leg], path[leg + 1]);
            let from_name = &self.stations[u].name;

            let (route_id, leg_type, leg_distance, base_time) = match self.leg_edge(path, leg, current_route.as_deref()) {
                Some(edge) => (edge.route_id.clone(), edge.route_type, edge.distance_km, edge.time_minutes),
                None => {
                    let d = haversine_km(self.stations[u].position, self.stations[v].position);
                    ("Unknown".to_string(), RouteType::Regular, d, d / FALLBACK_SPEED_KMH * 60.0)
                }
            };

            if current_route.as_deref() != Some(route_id.as_str()) {
                if current_route.is_some() {
                    steps.push(format!("Transfer at {} (Time: {:.1} mins)", from_name, time_minutes));
                    time_minutes += transfer_penalty;
                    fare += route_type.fare(segment_distance);
                    segment_distance = 0.0;
                }
                steps.push(format!("Take Route {} from {}", route_id, from_name));
                segments.push(RouteSegment {
                    route_id: route_id.clone(),
                    start: from_name.clone(),
                    route_type: leg_type,
                });
                current_route = Some(route_id);
                route_type = leg_type;
            }

            let multiplier = traffic.map_or(1.0, |t| t.multiplier(u, v));
            if traffic.is_some() {
                multipliers.push(multiplier);
            }

            distance_km += leg_distance;
            segment_distance += leg_distance;
            time_minutes += base_time * multiplier;
        }

        if segment_distance > 0.0 {
            fare += route_type.fare(segment_distance);
        }

        let origin = &self.stations[path[0]].name;
        let destination = &self.stations[path[path.len() - 1]].name;
        steps.push(JourneyPlan::arrival_step(destination));

        JourneyPlan {
            title: JourneyPlan::title_for(origin, destination),
            path: path.iter().map(|&i| self.stations[i].name.clone()).collect(),
            coordinates: path.iter().map(|&i| self.stations[i].position).collect(),
            time_minutes,
            distance_km,
            fare,
            transfers: segments.len().saturating_sub(1) as u32,
            steps,
            segments,
            traffic_multipliers: multipliers,
        }
    }
}

pub struct NetworkPlanner {
    network: Arc<TransitNetwork>,
    traffic: Option<Mutex<TrafficConditions>>,
    transfer_penalty: f64,
}

impl NetworkPlanner {
    pub fn new(network: Arc<TransitNetwork>, transfer_penalty: f64) -> Self {
        Self {
            network,
            traffic: None,
            transfer_penalty,
        }
    }

    /// Seed traffic conditions from the network's edges
    pub fn with_traffic(mut self, build: impl FnOnce(Vec<(usize, usize)>) -> TrafficConditions) -> Self {
        let edges = self.network.edge_pairs().collect();
        self.traffic = Some(Mutex::new(build(edges)));
        self
    }

    fn endpoints(&self, request: &PlanRequest) -> Result<(usize, usize), PlanError> {
        let origin = self
            .network
            .resolve(&request.origin)
            .ok_or_else(|| PlanError::UnknownStation(request.origin.clone()))?;
        let destination = self
            .network
            .resolve(&request.destination)
            .ok_or_else(|| PlanError::UnknownStation(request.destination.clone()))?;

        if origin == destination {
            return Err(PlanError::SameStation);
        }
        Ok((origin, destination))
    }

    fn describe(&self, path: &[usize]) -> JourneyPlan {
        match &self.traffic {
            Some(traffic) => {
                let mut conditions = traffic.lock().unwrap_or_else(|e| e.into_inner());
                conditions.refresh(Instant::now(), chrono::Local::now().hour());
                self.network.describe(path, self.transfer_penalty, Some(&conditions))
            }
            None => self.network.describe(path, self.transfer_penalty, None),
        }
    }
}

#[async_trait]
impl JourneyPlanner for NetworkPlanner {
    async fn plan(&self, request: &PlanRequest) -> Result<JourneyPlan, PlanError> {
        let (origin, destination) = self.endpoints(request)?;

        let path = self
            .network
            .shortest_path(origin, destination)
            .ok_or_else(|| PlanError::NoRoute {
                origin: self.network.stations[origin].name.clone(),
                destination: self.network.stations[destination].name.clone(),
            })?;

        tracing::debug!("Direct path {} -> {} has {} stops", origin, destination, path.len());
        Ok(self.describe(&path))
    }

    /// Routes forced through one or two major hubs
    async fn alternatives(&self, request: &PlanRequest, primary: &JourneyPlan, count: usize) -> Vec<JourneyPlan> {
        let Ok((origin, destination)) = self.endpoints(request) else {
            return Vec::new();
        };

        let hubs: Vec<usize> = self
            .network
            .major_hubs(MAJOR_HUBS)
            .iter()
            .filter_map(|(name, _)| self.network.index.get(name).copied())
            .filter(|&h| h != origin && h != destination)
            .collect();

        let mut candidates: Vec<Vec<usize>> = hubs.iter().map(|&h| vec![h]).collect();
        for &first in &hubs {
            for &second in &hubs {
                if first != second {
                    candidates.push(vec![first, second]);
                }
            }
        }

        let mut seen: HashSet<Vec<usize>> = HashSet::new();
        let mut plans: Vec<JourneyPlan> = candidates
            .iter()
            .filter_map(|waypoints| self.network.path_via(origin, waypoints, destination))
            .filter(|path| {
                let unique: HashSet<usize> = path.iter().copied().collect();
                unique.len() == path.len()
            })
            .filter(|path| seen.insert(path.clone()))
            .map(|path| self.describe(&path))
            .filter(|plan| plan.path != primary.path)
            .collect();

        plans.sort_by(|a, b| a.time_minutes.total_cmp(&b.time_minutes));
        plans.truncate(count);
        plans
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::traffic::LatLng;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::time::Duration;

    fn station(name: &str, lat: f64, lng: f64) -> Station {
        Station::new(name.to_string(), LatLng::new(lat, lng))
    }

    fn route(id: &str, route_type: RouteType, stops: &[&str]) -> TransitRoute {
        TransitRoute {
            id: id.to_string(),
            route_type,
            stops: stops.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn network() -> TransitNetwork {
        let stations = vec![
            station("Majestic", 12.9767, 77.5713),
            station("MG Road", 12.9747, 77.6080),
            station("Indiranagar", 12.9784, 77.6408),
            station("Hebbal", 13.0358, 77.5920),
            station("Silk Board", 12.9170, 77.6226),
            station("Electronic City", 12.8399, 77.6770),
            station("Whitefield", 12.9698, 77.7500),
            station("Kengeri", 12.8987, 77.4877),
            station("Yelahanka", 13.1004, 77.5963),
        ];
        let routes = vec![
            route("500A", RouteType::Regular, &["Majestic", "MG Road", "Indiranagar", "Whitefield"]),
            route("500B", RouteType::Regular, &["Majestic", "Silk Board", "Electronic City"]),
            route("501", RouteType::Regular, &["Majestic", "MG Road", "Hebbal"]),
            route("503", RouteType::Regular, &["Whitefield", "Indiranagar", "MG Road", "Hebbal"]),
            route("509", RouteType::Regular, &["Hebbal", "Kengeri"]),
            route("Express1", RouteType::Express, &["Majestic", "Electronic City"]),
            route("Express3", RouteType::Express, &["Majestic", "Hebbal"]),
        ];
        TransitNetwork::new(stations, &routes)
    }

    fn planner() -> NetworkPlanner {
        NetworkPlanner::new(Arc::new(network()), 10.0)
    }

    fn ids(net: &TransitNetwork, names: &[&str]) -> Vec<usize> {
        names.iter().map(|n| net.resolve(n).unwrap()).collect()
    }

    #[test]
    fn test_edges_follow_route_direction() {
        let net = network();
        assert_eq!(net.edge_count(), 3 + 2 + 2 + 3 + 1 + 1 + 1);

        let p = ids(&net, &["Majestic", "Kengeri", "Yelahanka"]);
        assert!(net.shortest_path(p[0], p[1]).is_some());
        assert!(net.shortest_path(p[1], p[0]).is_none());
        assert!(net.shortest_path(p[0], p[2]).is_none());
    }

    #[test]
    fn test_express_edge_is_faster() {
        let net = network();
        let path = ids(&net, &["Majestic", "Electronic City"]);
        assert_eq!(net.shortest_path(path[0], path[1]).unwrap(), path);
    }

    #[test]
    fn test_major_hubs_ranked_by_degree() {
        let hubs = network().major_hubs(2);
        assert_eq!(hubs[0], ("MG Road".to_string(), 6));
        assert_eq!(hubs[1], ("Majestic".to_string(), 5));
    }

    #[test]
    fn test_resolve_closest_station() {
        let net = network();
        assert_eq!(net.resolve("hebbal"), net.resolve("Hebbal"));
        assert_eq!(net.resolve("silk"), net.resolve("Silk Board"));
        assert_eq!(net.resolve("Electronik City"), net.resolve("Electronic City"));
        assert_eq!(net.resolve("Whitfield"), None);
        assert_eq!(net.resolve("Airport"), None);
        assert_eq!(net.resolve("  "), None);
    }

    #[tokio::test]
    async fn test_direct_plan_single_route() {
        let plan = planner().plan(&PlanRequest::new("Majestic", "Whitefield")).await.unwrap();

        assert_eq!(plan.path, vec!["Majestic", "MG Road", "Indiranagar", "Whitefield"]);
        assert_eq!(plan.transfers, 0);
        assert_eq!(
            plan.steps,
            vec!["Take Route 500A from Majestic".to_string(), "Arrive at Whitefield".to_string()]
        );
        assert_eq!(plan.fare, RouteType::Regular.fare(plan.distance_km));
        assert!((plan.time_minutes - plan.distance_km / 20.0 * 60.0).abs() < 1e-9);
        assert_eq!(plan.title, "Majestic → Whitefield");
        assert!(plan.traffic_multipliers.is_empty());
    }

    #[tokio::test]
    async fn test_parallel_routes_do_not_force_a_transfer() {
        // MG Road -> Hebbal is served by both 501 and 503
        let plan = planner().plan(&PlanRequest::new("Indiranagar", "Hebbal")).await.unwrap();
        assert_eq!(plan.path, vec!["Indiranagar", "MG Road", "Hebbal"]);
        assert_eq!(plan.transfers, 0);
        assert_eq!(plan.steps[0], "Take Route 503 from Indiranagar");
    }

    #[tokio::test]
    async fn test_transfer_adds_penalty_and_splits_fare() {
        let plan = planner().plan(&PlanRequest::new("Majestic", "Kengeri")).await.unwrap();

        assert_eq!(plan.path, vec!["Majestic", "Hebbal", "Kengeri"]);
        assert_eq!(plan.transfers, 1);
        assert_eq!(plan.steps[0], "Take Route Express3 from Majestic");
        assert!(plan.steps[1].starts_with("Transfer at Hebbal (Time: "));
        assert_eq!(plan.steps[2], "Take Route 509 from Hebbal");
        assert_eq!(plan.steps[3], "Arrive at Kengeri");

        let net = network();
        let p = ids(&net, &["Majestic", "Hebbal", "Kengeri"]);
        let first = haversine_km(net.stations[p[0]].position, net.stations[p[1]].position);
        let second = haversine_km(net.stations[p[1]].position, net.stations[p[2]].position);

        assert_eq!(plan.fare, RouteType::Express.fare(first) + RouteType::Regular.fare(second));
        let expected = first / 30.0 * 60.0 + 10.0 + second / 20.0 * 60.0;
        assert!((plan.time_minutes - expected).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_no_route() {
        let err = planner().plan(&PlanRequest::new("Whitefield", "Silk Board")).await.unwrap_err();
        assert_eq!(
            err,
            PlanError::NoRoute {
                origin: "Whitefield".to_string(),
                destination: "Silk Board".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_misspelled_station_resolves() {
        let plan = planner().plan(&PlanRequest::new("Majestic", "Electronik City")).await.unwrap();
        assert_eq!(plan.path.last().unwrap(), "Electronic City");
        assert_eq!(plan.steps.last().unwrap(), "Arrive at Electronic City");
    }

    #[tokio::test]
    async fn test_unknown_and_same_station() {
        let err = planner().plan(&PlanRequest::new("Majestic", "Airport")).await.unwrap_err();
        assert_eq!(err, PlanError::UnknownStation("Airport".to_string()));

        let err = planner().plan(&PlanRequest::new("Majestic", "majestic")).await.unwrap_err();
        assert_eq!(err, PlanError::SameStation);
    }

    #[tokio::test]
    async fn test_alternatives_go_through_hubs() {
        let planner = planner();
        let request = PlanRequest::new("Majestic", "Hebbal");
        let primary = planner.plan(&request).await.unwrap();
        assert_eq!(primary.path, vec!["Majestic", "Hebbal"]);

        let alternatives = planner.alternatives(&request, &primary, 2).await;
        assert_eq!(alternatives.len(), 1);
        assert_eq!(alternatives[0].path, vec!["Majestic", "MG Road", "Hebbal"]);
        assert_eq!(alternatives[0].steps[0], "Take Route 501 from Majestic");
        assert_eq!(alternatives[0].transfers, 0);
    }

    #[tokio::test]
    async fn test_traffic_multipliers_applied() {
        let planner = NetworkPlanner::new(Arc::new(network()), 10.0).with_traffic(|edges| {
            TrafficConditions::new(edges, 9, Duration::from_secs(300), StdRng::seed_from_u64(11))
        });

        let plan = planner.plan(&PlanRequest::new("Majestic", "Whitefield")).await.unwrap();
        assert_eq!(plan.traffic_multipliers.len(), 3);
        let base = plan.distance_km / 20.0 * 60.0;
        assert!(plan.time_minutes > base, "peak traffic should slow the trip");
    }
}
