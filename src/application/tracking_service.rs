// Tracking service - One polling cycle over the whole fleet, and the poller that repeats it
use crate::application::direction_resolver::DirectionResolver;
use crate::application::telemetry_source::TelemetrySource;
use crate::application::vehicle_repository::VehicleRepository;
use crate::domain::error::SenseError;
use crate::domain::route::Route;
use crate::domain::vehicle::Vehicle;
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::{watch, OnceCell};

/// Itineraries fetched successfully, kept across cycles.
#[derive(Default)]
pub struct RouteCache {
    known: Mutex<HashMap<String, Arc<Route>>>,
}

impl RouteCache {
    fn lookup(&self, line_id: &str) -> Option<Arc<Route>> {
        let known = self.known.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        known.get(line_id).cloned()
    }

    fn remember(&self, line_id: &str, route: Arc<Route>) {
        let mut known = self.known.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        known.insert(line_id.to_string(), route);
    }
}

/// Route lookups of a single cycle. Each line is resolved at most once per
/// cycle, misses and failures included; concurrent lookups of the same line
/// share that resolution.
struct CycleRoutes<'a> {
    cache: &'a RouteCache,
    slots: Mutex<HashMap<String, Arc<OnceCell<Option<Arc<Route>>>>>>,
}

impl<'a> CycleRoutes<'a> {
    fn new(cache: &'a RouteCache) -> Self {
        Self {
            cache,
            slots: Mutex::new(HashMap::new()),
        }
    }

    async fn get(&self, line_id: &str, source: &dyn TelemetrySource) -> Option<Arc<Route>> {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            slots.entry(line_id.to_string()).or_default().clone()
        };

        let route = slot
            .get_or_init(|| async {
                if let Some(route) = self.cache.lookup(line_id) {
                    return Some(route);
                }
                match source.fetch_route(line_id).await {
                    Ok(Some(route)) => {
                        let route = Arc::new(route);
                        self.cache.remember(line_id, route.clone());
                        Some(route)
                    }
                    Ok(None) => {
                        let e = SenseError::MissingRouteData {
                            line_id: line_id.to_string(),
                        };
                        tracing::warn!(line_id, error = %e, "route unavailable this cycle");
                        None
                    }
                    Err(e) => {
                        tracing::warn!(line_id, error = %e, "route fetch failed");
                        None
                    }
                }
            })
            .await
            .clone();
        route
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub received: usize,
    pub new_history_entries: usize,
}

pub struct TrackingService {
    source: Arc<dyn TelemetrySource>,
    resolver: Arc<dyn DirectionResolver>,
    repository: Arc<dyn VehicleRepository>,
    routes: RouteCache,
    workers: usize,
}

impl TrackingService {
    pub fn new(
        source: Arc<dyn TelemetrySource>,
        resolver: Arc<dyn DirectionResolver>,
        repository: Arc<dyn VehicleRepository>,
        workers: usize,
    ) -> Self {
        Self {
            source,
            resolver,
            repository,
            routes: RouteCache::default(),
            workers: workers.max(1),
        }
    }

    /// Fetches the current snapshot, infers every vehicle's sense and stores
    /// the results. An empty snapshot is a successful, empty cycle.
    pub async fn run_cycle(&self) -> anyhow::Result<CycleReport> {
        let vehicles = self.source.fetch_current_positions().await;
        if vehicles.is_empty() {
            tracing::info!("no vehicles to process this cycle");
            return Ok(CycleReport::default());
        }

        let received = vehicles.len();
        let routes = CycleRoutes::new(&self.routes);
        let processed: Vec<Vehicle> = futures::stream::iter(vehicles)
            .map(|vehicle| self.process_vehicle(vehicle, &routes))
            .buffer_unordered(self.workers)
            .collect()
            .await;

        self.repository.upsert_all(&processed).await?;

        let mut new_history_entries = 0;
        for vehicle in &processed {
            match self.repository.record_history(vehicle).await {
                Ok(true) => new_history_entries += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(vehicle_id = %vehicle.id, line_id = %vehicle.line_id, error = %e, "history entry not recorded");
                }
            }
        }

        Ok(CycleReport {
            received,
            new_history_entries,
        })
    }

    async fn process_vehicle(&self, vehicle: Vehicle, routes: &CycleRoutes<'_>) -> Vehicle {
        if !vehicle.has_line() {
            tracing::debug!(vehicle_id = %vehicle.id, "vehicle reported without a line");
            return vehicle;
        }

        let route = routes.get(&vehicle.line_id, self.source.as_ref()).await;
        self.resolver.infer(vehicle, route.as_deref()).await
    }
}

/// Runs cycles back to back, `interval` apart, until `shutdown` flips to true.
/// A cycle in flight when shutdown arrives is abandoned.
pub async fn run_poller(service: Arc<TrackingService>, interval: Duration, mut shutdown: watch::Receiver<bool>) {
    tracing::info!(interval_ms = interval.as_millis() as u64, "starting poller");

    loop {
        let started = Instant::now();
        tokio::select! {
            result = service.run_cycle() => match result {
                Ok(report) => tracing::info!(
                    count = report.received,
                    new_history = report.new_history_entries,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "cycle complete"
                ),
                Err(e) => tracing::error!(error = %e, "cycle failed"),
            },
            _ = shutdown.changed() => break,
        }

        if *shutdown.borrow() {
            break;
        }

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = shutdown.changed() => break,
        }
    }

    tracing::info!("poller stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::direction_resolver::GeometricResolver;
    use crate::domain::spot::RouteSpot;
    use crate::domain::vehicle::{BLANK_LINE, UNAVAILABLE_SENSE, UNKNOWN_SENSE};
    use crate::infrastructure::memory_repository::MemoryVehicleRepository;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeSource {
        vehicles: Vec<Vehicle>,
        routes: HashMap<String, Route>,
        route_fetches: AtomicUsize,
    }

    #[async_trait]
    impl TelemetrySource for FakeSource {
        async fn fetch_current_positions(&self) -> Vec<Vehicle> {
            self.vehicles.clone()
        }

        async fn fetch_route(&self, line_id: &str) -> anyhow::Result<Option<Route>> {
            self.route_fetches.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            if line_id == "broken" {
                anyhow::bail!("provider returned 503");
            }
            Ok(self.routes.get(line_id).cloned())
        }
    }

    fn vehicle(id: &str, line: &str, latitude: f64) -> Vehicle {
        Vehicle::new(
            id.to_string(),
            line.to_string(),
            20.0,
            0.0,
            latitude,
            0.0,
            "2017-01-15T10:23:00".to_string(),
        )
    }

    fn source(vehicles: Vec<Vehicle>) -> Arc<FakeSource> {
        let route = Route::new(
            "100".to_string(),
            "Downtown X Airport".to_string(),
            vec![RouteSpot::new(0.0, 0.0, false), RouteSpot::new(10.0, 0.0, true)],
        );
        Arc::new(FakeSource {
            vehicles,
            routes: HashMap::from([("100".to_string(), route)]),
            route_fetches: AtomicUsize::new(0),
        })
    }

    fn service(source: Arc<FakeSource>, repository: Arc<MemoryVehicleRepository>) -> TrackingService {
        TrackingService::new(source, Arc::new(GeometricResolver), repository, 4)
    }

    #[tokio::test]
    async fn test_cycle_resolves_every_vehicle() {
        let source = source(vec![
            vehicle("A1", "100", 1.0),
            vehicle("A2", "100", 9.0),
            vehicle("B1", "200", 1.0),
            vehicle("C1", "", 1.0),
            vehicle("D1", "broken", 1.0),
        ]);
        let repository = Arc::new(MemoryVehicleRepository::new());
        let report = service(source.clone(), repository.clone()).run_cycle().await.unwrap();

        assert_eq!(report.received, 5);
        assert_eq!(report.new_history_entries, 5);

        let sense_of = |id: &str| {
            let repository = repository.clone();
            let id = id.to_string();
            async move { repository.get(&id).await.unwrap().unwrap().sense }
        };
        assert_eq!(sense_of("A1").await, "Downtown X Airport");
        assert_eq!(sense_of("A2").await, "Airport X Downtown");
        assert_eq!(sense_of("B1").await, UNAVAILABLE_SENSE);
        assert_eq!(sense_of("C1").await, UNKNOWN_SENSE);
        assert_eq!(sense_of("D1").await, UNAVAILABLE_SENSE);

        let blank = repository.get("C1").await.unwrap().unwrap();
        assert_eq!(blank.line_id, BLANK_LINE);
    }

    #[tokio::test]
    async fn test_route_fetched_once_per_line() {
        let source = source(vec![
            vehicle("A1", "100", 1.0),
            vehicle("A2", "100", 2.0),
            vehicle("A3", "100", 3.0),
        ]);
        let service = service(source.clone(), Arc::new(MemoryVehicleRepository::new()));

        service.run_cycle().await.unwrap();
        service.run_cycle().await.unwrap();
        assert_eq!(source.route_fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_routes_are_retried() {
        let source = source(vec![vehicle("B1", "200", 1.0)]);
        let service = service(source.clone(), Arc::new(MemoryVehicleRepository::new()));

        service.run_cycle().await.unwrap();
        service.run_cycle().await.unwrap();
        assert_eq!(source.route_fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_unavailable_lines_fetched_once_per_cycle() {
        let source = source(vec![
            vehicle("B1", "200", 1.0),
            vehicle("B2", "200", 2.0),
            vehicle("B3", "200", 3.0),
            vehicle("D1", "broken", 1.0),
            vehicle("D2", "broken", 2.0),
        ]);
        let repository = Arc::new(MemoryVehicleRepository::new());
        let service = service(source.clone(), repository.clone());

        service.run_cycle().await.unwrap();
        assert_eq!(source.route_fetches.load(Ordering::SeqCst), 2);
        for id in ["B1", "B2", "B3", "D1", "D2"] {
            let vehicle = repository.get(id).await.unwrap().unwrap();
            assert_eq!(vehicle.sense, UNAVAILABLE_SENSE);
        }

        // misses are not carried into the next cycle
        service.run_cycle().await.unwrap();
        assert_eq!(source.route_fetches.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_repeated_state_is_not_duplicated() {
        let source = source(vec![vehicle("A1", "100", 1.0)]);
        let service = service(source, Arc::new(MemoryVehicleRepository::new()));

        assert_eq!(service.run_cycle().await.unwrap().new_history_entries, 1);
        assert_eq!(service.run_cycle().await.unwrap().new_history_entries, 0);
    }

    #[tokio::test]
    async fn test_empty_snapshot_is_success() {
        let service = service(source(Vec::new()), Arc::new(MemoryVehicleRepository::new()));
        assert_eq!(service.run_cycle().await.unwrap(), CycleReport::default());
    }

    #[tokio::test]
    async fn test_poller_stops_on_shutdown() {
        let service = Arc::new(service(
            source(vec![vehicle("A1", "100", 1.0)]),
            Arc::new(MemoryVehicleRepository::new()),
        ));
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(run_poller(service, Duration::from_secs(60), rx));

        tokio::time::sleep(Duration::from_millis(50)).await;
        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("poller did not stop")
            .unwrap();
    }
}
