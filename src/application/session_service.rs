// Session service - per page view state, navigation and route planning
use crate::application::journey_planner::{JourneyPlanner, PlanError};
use crate::application::task::CancellableTask;
use crate::domain::transit::{JourneyPlan, PlanRequest};
use crate::domain::view::{navigate, NavEvent, NavigationError, ViewState};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};

pub type SessionId = u64;

#[derive(Debug, Error, PartialEq)]
pub enum SessionError {
    #[error("session {0} not found")]
    NotFound(SessionId),
    #[error(transparent)]
    Navigation(#[from] NavigationError),
}

struct ViewSlot {
    state: ViewState,
    disposed: bool,
    /// Bumped by every planner request; only the latest may write results
    generation: u64,
}

struct Session {
    view: Arc<Mutex<ViewSlot>>,
    pending: Option<CancellableTask>,
}

#[derive(Clone)]
pub struct SessionService {
    sessions: Arc<RwLock<HashMap<SessionId, Session>>>,
    next_id: Arc<AtomicU64>,
    planner: Arc<dyn JourneyPlanner>,
    modules: Vec<String>,
    delay: Duration,
    alternatives: usize,
}

impl SessionService {
    pub fn new(planner: Arc<dyn JourneyPlanner>, modules: Vec<String>, delay: Duration, alternatives: usize) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            next_id: Arc::new(AtomicU64::new(1)),
            planner,
            modules,
            delay,
            alternatives,
        }
    }

    pub async fn create(&self) -> (SessionId, ViewState) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let state = ViewState::new(self.modules.clone());
        let session = Session {
            view: Arc::new(Mutex::new(ViewSlot {
                state: state.clone(),
                disposed: false,
                generation: 0,
            })),
            pending: None,
        };

        self.sessions.write().await.insert(id, session);
        tracing::debug!("Created view session {}", id);
        (id, state)
    }

    pub async fn state(&self, id: SessionId) -> Result<ViewState, SessionError> {
        let view = self.view(id).await?;
        let slot = view.lock().await;
        Ok(slot.state.clone())
    }

    pub async fn apply(&self, id: SessionId, event: NavEvent) -> Result<ViewState, SessionError> {
        let view = self.view(id).await?;
        let mut slot = view.lock().await;
        navigate(&mut slot.state, event)?;
        Ok(slot.state.clone())
    }

    /// Show the loading panel now and fill in the result after the delay.
    /// A newer request for the same view replaces the pending one.
    pub async fn plan_journey(&self, id: SessionId, request: PlanRequest) -> Result<ViewState, SessionError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(&id).ok_or(SessionError::NotFound(id))?;

        let (snapshot, generation) = {
            let mut slot = session.view.lock().await;
            slot.generation += 1;
            slot.state.planner.start_loading();
            (slot.state.clone(), slot.generation)
        };

        let view = session.view.clone();
        let planner = self.planner.clone();
        let alternatives = self.alternatives;

        tracing::debug!(
            "Session {} planning {} -> {}",
            id, request.origin, request.destination
        );

        let task = CancellableTask::spawn_after(self.delay, async move {
            let outcome = resolve_plan(planner.as_ref(), &request, alternatives).await;

            let mut slot = view.lock().await;
            if slot.disposed {
                tracing::debug!("Dropping planner result for disposed view");
                return;
            }
            if slot.generation != generation {
                tracing::debug!("Dropping superseded planner result");
                return;
            }
            match outcome {
                Ok((plan, alternatives)) => slot.state.planner.show_results(plan, alternatives),
                Err(e) => slot.state.planner.show_error(e.to_string()),
            }
        });

        if let Some(mut previous) = session.pending.replace(task) {
            if !previous.is_finished() {
                tracing::debug!("Session {} superseded a pending journey request", id);
            }
            previous.cancel();
        }

        Ok(snapshot)
    }

    /// Tear down a view. Its pending planner work is cancelled and can no
    /// longer write to the view.
    pub async fn dispose(&self, id: SessionId) -> Result<(), SessionError> {
        let session = self
            .sessions
            .write()
            .await
            .remove(&id)
            .ok_or(SessionError::NotFound(id))?;

        session.view.lock().await.disposed = true;
        drop(session);
        tracing::debug!("Disposed view session {}", id);
        Ok(())
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    async fn view(&self, id: SessionId) -> Result<Arc<Mutex<ViewSlot>>, SessionError> {
        self.sessions
            .read()
            .await
            .get(&id)
            .map(|s| s.view.clone())
            .ok_or(SessionError::NotFound(id))
    }
}

async fn resolve_plan(
    planner: &dyn JourneyPlanner,
    request: &PlanRequest,
    alternatives: usize,
) -> Result<(JourneyPlan, Vec<JourneyPlan>), PlanError> {
    if request.is_round_trip() {
        return Err(PlanError::SameStation);
    }

    let plan = planner.plan(request).await?;
    let others = if request.show_alternatives {
        planner.alternatives(request, &plan, alternatives).await
    } else {
        Vec::new()
    };
    Ok((plan, others))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    const DELAY: Duration = Duration::from_millis(1500);

    #[derive(Default)]
    struct StubPlanner {
        calls: AtomicUsize,
    }

    fn stub_plan(request: &PlanRequest, route: &str) -> JourneyPlan {
        JourneyPlan {
            title: JourneyPlan::title_for(&request.origin, &request.destination),
            path: vec![request.origin.clone(), request.destination.clone()],
            coordinates: vec![],
            time_minutes: 30.0,
            distance_km: 8.0,
            fare: 14,
            transfers: 0,
            steps: vec![
                format!("Take Route {} from {}", route, request.origin),
                JourneyPlan::arrival_step(&request.destination),
            ],
            segments: vec![],
            traffic_multipliers: vec![],
        }
    }

    #[async_trait]
    impl JourneyPlanner for StubPlanner {
        async fn plan(&self, request: &PlanRequest) -> Result<JourneyPlan, PlanError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if request.destination == "Airport" {
                return Err(PlanError::UnknownStation("Airport".to_string()));
            }
            Ok(stub_plan(request, "500A"))
        }

        async fn alternatives(&self, request: &PlanRequest, _primary: &JourneyPlan, count: usize) -> Vec<JourneyPlan> {
            (0..count).map(|i| stub_plan(request, &format!("30{}C", i))).collect()
        }
    }

    fn service() -> (SessionService, Arc<StubPlanner>) {
        let planner = Arc::new(StubPlanner::default());
        let service = SessionService::new(
            planner.clone(),
            vec!["dashboard".to_string(), "route-planner".to_string()],
            DELAY,
            2,
        );
        (service, planner)
    }

    async fn after_delay() {
        tokio::time::sleep(DELAY + Duration::from_millis(10)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_origin_and_destination_shows_error() {
        let (service, planner) = service();
        let (id, _) = service.create().await;

        let loading = service.plan_journey(id, PlanRequest::new("Majestic", "Majestic")).await.unwrap();
        assert!(loading.planner.loading);

        after_delay().await;
        let state = service.state(id).await.unwrap();
        assert!(state.planner.results.is_none());
        assert_eq!(
            state.planner.error.as_deref(),
            Some("Origin and destination cannot be the same")
        );
        assert!(!state.planner.loading);
        assert_eq!(planner.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_results_appear_after_delay() {
        let (service, _) = service();
        let (id, _) = service.create().await;

        service
            .plan_journey(id, PlanRequest::new("Majestic", "Hebbal").with_alternatives())
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(1000)).await;
        let state = service.state(id).await.unwrap();
        assert!(state.planner.loading);
        assert!(state.planner.results.is_none());

        after_delay().await;
        let state = service.state(id).await.unwrap();
        let plan = state.planner.results.expect("results should be visible");
        assert!(state.planner.error.is_none());
        assert_eq!(plan.steps.last().map(String::as_str), Some("Arrive at Hebbal"));
        assert_eq!(state.planner.alternatives.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_planner_failure_shows_error() {
        let (service, _) = service();
        let (id, _) = service.create().await;

        service.plan_journey(id, PlanRequest::new("Majestic", "Airport")).await.unwrap();
        after_delay().await;

        let state = service.state(id).await.unwrap();
        assert_eq!(state.planner.error.as_deref(), Some("Unknown station 'Airport'"));
        assert!(state.planner.results.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_newer_request_replaces_pending() {
        let (service, planner) = service();
        let (id, _) = service.create().await;

        service.plan_journey(id, PlanRequest::new("Majestic", "Hebbal")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(500)).await;
        service.plan_journey(id, PlanRequest::new("Majestic", "Whitefield")).await.unwrap();

        after_delay().await;
        let state = service.state(id).await.unwrap();
        assert_eq!(state.planner.results.unwrap().title, "Majestic → Whitefield");
        assert_eq!(planner.calls.load(Ordering::SeqCst), 1);
    }

    /// Answers after a second of work so a newer request can arrive mid-plan
    struct SlowPlanner;

    #[async_trait]
    impl JourneyPlanner for SlowPlanner {
        async fn plan(&self, request: &PlanRequest) -> Result<JourneyPlan, PlanError> {
            tokio::time::sleep(Duration::from_millis(1000)).await;
            Ok(stub_plan(request, "500A"))
        }

        async fn alternatives(&self, _request: &PlanRequest, _primary: &JourneyPlan, _count: usize) -> Vec<JourneyPlan> {
            Vec::new()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_superseded_request_in_flight_is_discarded() {
        let service = SessionService::new(Arc::new(SlowPlanner), vec!["route-planner".to_string()], DELAY, 2);
        let (id, _) = service.create().await;

        // The first request is inside the planner by the time the second arrives
        service.plan_journey(id, PlanRequest::new("Majestic", "Hebbal")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(2000)).await;
        service.plan_journey(id, PlanRequest::new("Majestic", "Whitefield")).await.unwrap();

        tokio::time::sleep(Duration::from_millis(600)).await;
        let state = service.state(id).await.unwrap();
        assert!(state.planner.loading);
        assert!(state.planner.results.is_none());

        tokio::time::sleep(Duration::from_millis(3000)).await;
        let state = service.state(id).await.unwrap();
        assert!(!state.planner.loading);
        assert_eq!(state.planner.results.unwrap().title, "Majestic → Whitefield");
    }

    #[tokio::test(start_paused = true)]
    async fn test_disposed_view_is_not_updated() {
        let (service, planner) = service();
        let (id, _) = service.create().await;

        service.plan_journey(id, PlanRequest::new("Majestic", "Hebbal")).await.unwrap();
        service.dispose(id).await.unwrap();

        after_delay().await;
        assert_eq!(planner.calls.load(Ordering::SeqCst), 0);
        assert_eq!(service.state(id).await, Err(SessionError::NotFound(id)));
        assert_eq!(service.len().await, 0);
    }

    #[tokio::test]
    async fn test_navigation_through_session() {
        let (service, _) = service();
        let (id, state) = service.create().await;
        assert_eq!(state.active_module, "dashboard");

        let state = service
            .apply(id, NavEvent::Navigate { module: "route-planner".to_string() })
            .await
            .unwrap();
        assert_eq!(state.active_module, "route-planner");

        let err = service
            .apply(id, NavEvent::Navigate { module: "billing".to_string() })
            .await
            .unwrap_err();
        assert_eq!(err, SessionError::Navigation(NavigationError::UnknownModule("billing".to_string())));

        assert_eq!(service.apply(99, NavEvent::ToggleMenu).await, Err(SessionError::NotFound(99)));
    }
}
