//! The compute engine: one request in, one response out.

use std::time::Instant;

use chrono::Utc;
use geo::Point;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::domain::{
    FailureReason, IsochroneBand, Mode, SamplePoint, StationRef, TripResult, push_unique,
};
use crate::isochrone::IsochroneExtractor;
use crate::persistence::{PersistenceGateway, RecordKey, RecordMetadata};
use crate::planner::LegPlanner;
use crate::routing::{RoutingBackend, RoutingContext, RoutingOrchestrator, TimeConstraint};
use crate::sampling::{NetworkSampler, RadialConfig, RadialSampler};
use crate::spatial::{PoiIndex, StudyArea};
use crate::stations::StationDirectory;

use super::cancel::CancelToken;
use super::config::EngineConfig;
use super::error::ComputeError;
use super::pool::run_bounded;
use super::registry::InFlightRegistry;
use super::request::{ComputeRequest, Target};
use super::response::ComputeResponse;
use super::task::{TaskEvent, TaskLog, TaskState};

type Resolved = Vec<(SamplePoint, TripResult)>;

enum Outcome {
    Skipped,
    Computed {
        bands: Vec<IsochroneBand>,
        used_modes: Vec<String>,
        station_names: Vec<String>,
    },
}

/// Runs computations: sampling, leg planning, routing, extraction and
/// persistence.
///
/// All services are owned by the engine and shared by every computation;
/// an identical computation already running is refused.
pub struct Engine<B, P> {
    orchestrator: RoutingOrchestrator<B>,
    index: PoiIndex,
    area: StudyArea,
    stations: StationDirectory,
    store: P,
    registry: InFlightRegistry,
    config: EngineConfig,
    /// Street junctions of the walking network, for adaptive sampling.
    junctions: Vec<Point<f64>>,
}

impl<B: RoutingBackend, P: PersistenceGateway> Engine<B, P> {
    pub fn new(
        orchestrator: RoutingOrchestrator<B>,
        index: PoiIndex,
        area: StudyArea,
        stations: StationDirectory,
        store: P,
        config: EngineConfig,
    ) -> Self {
        let junctions = orchestrator.walk().junctions();
        Self {
            orchestrator,
            index,
            area,
            stations,
            store,
            registry: InFlightRegistry::new(),
            config,
            junctions,
        }
    }

    pub fn orchestrator(&self) -> &RoutingOrchestrator<B> {
        &self.orchestrator
    }

    pub fn store(&self) -> &P {
        &self.store
    }

    pub fn stations(&self) -> &StationDirectory {
        &self.stations
    }

    /// Running computations, for cancellation.
    pub fn registry(&self) -> &InFlightRegistry {
        &self.registry
    }

    /// Run `request` to completion.
    pub async fn compute(&self, request: ComputeRequest) -> ComputeResponse {
        self.compute_with_cancel(request, CancelToken::new()).await
    }

    /// Run `request`, stopping early once `cancel` fires.
    pub async fn compute_with_cancel(
        &self,
        request: ComputeRequest,
        cancel: CancelToken,
    ) -> ComputeResponse {
        let started = Instant::now();
        let (mode, strategy) = (request.mode, request.strategy());
        let station = request.station().map(str::to_string);
        info!(%mode, %strategy, station = ?station, "computation started");

        let outcome = match self.registry.begin(request.computation_key(), cancel.clone()) {
            Ok(_guard) => {
                let outcome = self.run(&request, &cancel).await;
                if !matches!(outcome, Ok(Outcome::Skipped)) {
                    self.save_cache().await;
                }
                outcome
            }
            Err(e) => Err(e.into()),
        };

        let runtime = started.elapsed();
        match outcome {
            Ok(Outcome::Skipped) => {
                info!(%mode, %strategy, "stored isochrones reused");
                ComputeResponse::skipped(mode, strategy, station, runtime)
            }
            Ok(Outcome::Computed {
                bands,
                used_modes,
                station_names,
            }) => {
                info!(%mode, %strategy, bands = bands.len(), ?runtime, "computation finished");
                ComputeResponse::success(mode, strategy, station, runtime, bands)
                    .with_trip_details(used_modes, station_names)
            }
            Err(e) if e.is_reason() => {
                warn!(%mode, %strategy, reason = %e, "computation failed");
                ComputeResponse::failed_reason(mode, strategy, station, runtime, e.to_string())
            }
            Err(e) => {
                warn!(%mode, %strategy, error = %e, "computation failed");
                ComputeResponse::failed_error(mode, strategy, station, runtime, e.to_string())
            }
        }
    }

    /// Snapshot the trip cache, if configured. Write failures are logged.
    async fn save_cache(&self) {
        let Some(path) = &self.config.cache_snapshot else {
            return;
        };
        if let Err(e) = self.orchestrator.cache().save_snapshot(path).await {
            warn!(error = %e, "failed to save trip cache");
        }
    }

    async fn run(&self, request: &ComputeRequest, cancel: &CancelToken) -> Result<Outcome, ComputeError> {
        let mode = request.mode;
        let bucket = self
            .orchestrator
            .cache()
            .config()
            .time_bucket(request.timestamp);
        let key = RecordKey::new(
            mode,
            request.strategy(),
            request.station().map(str::to_string),
            bucket,
        );

        if !request.force_update {
            match self.store.exists(&key).await {
                Ok(true) => return Ok(Outcome::Skipped),
                Ok(false) => {}
                Err(e) => warn!(error = %e, "duplicate check failed, computing anyway"),
            }
        }

        let extractor = IsochroneExtractor::new(&self.area, &self.config.isochrone);
        let (bands, results, used_modes, station_names) = match &request.target {
            Target::Network => {
                // Origins travel to their nearest stop and must arrive in time.
                let ctx = RoutingContext::new(
                    request.timestamp,
                    TimeConstraint::ArriveBy(request.arrival_time),
                )
                .forced(request.force_update);
                let (bands, results) = self.network(mode, &extractor, &ctx, cancel).await?;
                (bands, results, Vec::new(), Vec::new())
            }
            Target::Point {
                station,
                performance,
            } => {
                let station = self.stations.resolve(station)?;
                // Trips leave the station at the requested time.
                let ctx = RoutingContext::new(
                    request.timestamp,
                    TimeConstraint::DepartAt(request.arrival_time),
                )
                .forced(request.force_update);
                let (bands, results) = self
                    .point(mode, &station, *performance, &extractor, &ctx, cancel)
                    .await?;

                let mut used_modes = Vec::new();
                let mut station_names = Vec::new();
                for (_, result) in results.iter().filter(|(_, r)| r.success) {
                    push_unique(&mut used_modes, &result.used_modes);
                    push_unique(&mut station_names, &result.station_names);
                }
                (bands, results, used_modes, station_names)
            }
        };

        let metadata = RecordMetadata {
            key,
            computed_at: Utc::now(),
            arrival_time: request.arrival_time,
            samples: results.len(),
            successful: results.iter().filter(|(_, r)| r.success).count(),
            used_modes: used_modes.clone(),
            station_names: station_names.clone(),
        };
        self.store.save(&bands, &metadata).await?;

        Ok(Outcome::Computed {
            bands,
            used_modes,
            station_names,
        })
    }

    async fn network(
        &self,
        mode: Mode,
        extractor: &IsochroneExtractor<'_>,
        ctx: &RoutingContext,
        cancel: &CancelToken,
    ) -> Result<(Vec<IsochroneBand>, Resolved), ComputeError> {
        let sampler =
            NetworkSampler::new(&self.area, &self.config.sampling).with_junctions(&self.junctions);
        let mut results = self.resolve_all(mode, sampler.sample(), false, ctx, cancel).await?;
        let mut bands = extractor.network(mode, &results)?;

        if self.config.refine {
            let existing: Vec<SamplePoint> = results.iter().map(|(s, _)| s.clone()).collect();
            let extra = sampler.refine(&bands, &existing);
            if !extra.is_empty() {
                debug!(%mode, extra = extra.len(), "refining network isochrones");
                results.extend(self.resolve_all(mode, extra, false, ctx, cancel).await?);
                bands = extractor.network(mode, &results)?;
            }
        }
        Ok((bands, results))
    }

    async fn point(
        &self,
        mode: Mode,
        station: &StationRef,
        performance: bool,
        extractor: &IsochroneExtractor<'_>,
        ctx: &RoutingContext,
        cancel: &CancelToken,
    ) -> Result<(Vec<IsochroneBand>, Resolved), ComputeError> {
        let radial = RadialConfig::for_mode(mode, performance);
        let samples = RadialSampler::new(&self.area, self.config.sampling.seed).sample(station, &radial);
        let results = self.resolve_all(mode, samples, performance, ctx, cancel).await?;
        let bands = extractor.point(mode, station, radial.max_radius_m, &results)?;
        Ok((bands, results))
    }

    /// Plan and resolve every sample on the worker pool.
    ///
    /// `direct` asks for one multimodal trip per sample instead of explicit
    /// legs.
    async fn resolve_all(
        &self,
        mode: Mode,
        samples: Vec<SamplePoint>,
        direct: bool,
        ctx: &RoutingContext,
        cancel: &CancelToken,
    ) -> Result<Resolved, ComputeError> {
        let total = samples.len();
        let planner = LegPlanner::new(&self.index)
            .with_walk(self.orchestrator.walk(), self.config.max_candidates);
        let (tx, mut rx) = mpsc::unbounded_channel::<TaskEvent>();

        let resolved = run_bounded(samples, self.config.concurrency, cancel, |task, sample| {
            let tx = tx.clone();
            let planner = &planner;
            async move {
                let observe = move |state: TaskState| {
                    let _ = tx.send(TaskEvent { task, state });
                };
                observe(TaskState::Pending);

                let plan = if direct {
                    planner.plan_direct(mode, &sample)
                } else {
                    planner.plan(mode, &sample)
                };
                let result = match plan {
                    Ok(plan) => self.orchestrator.resolve(&plan, ctx, &observe).await,
                    Err(e) => {
                        if e.is_no_candidate() {
                            debug!(%mode, error = %e, "sample dropped");
                        } else {
                            warn!(%mode, error = %e, "sample could not be planned");
                        }
                        let reason = e.failure();
                        observe(TaskState::Failed(reason.clone()));
                        TripResult::failed(reason)
                    }
                };
                (sample, result)
            }
        })
        .await;
        drop(tx);

        let mut log = TaskLog::new();
        while let Ok(event) = rx.try_recv() {
            log.record(event);
        }
        let summary = log.summary();
        info!(
            %mode,
            samples = total,
            started = resolved.len(),
            resolved = summary.resolved,
            failed = summary.failed,
            retries = summary.retries,
            "samples resolved"
        );

        if cancel.is_cancelled() {
            return Err(ComputeError::Cancelled);
        }

        let results: Resolved = resolved.into_iter().map(|(_, pair)| pair).collect();
        if all_rate_limited(&results) {
            return Err(ComputeError::RateLimitExceeded);
        }
        Ok(results)
    }
}

/// No sample succeeded and every sample that reached the routing API was
/// refused by its rate limit.
fn all_rate_limited(results: &[(SamplePoint, TripResult)]) -> bool {
    let mut limited = 0;
    for (_, result) in results {
        match &result.failure {
            None => return false,
            Some(FailureReason::RateLimited) => limited += 1,
            Some(FailureReason::NoCandidate) => {}
            Some(_) => return false,
        }
    }
    limited > 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use geo::{BooleanOps, MultiPolygon, Point, Polygon, polygon};

    use crate::cache::{CacheConfig, TripCache};
    use crate::compute::response::Status;
    use crate::domain::{LocalProjection, Poi, PoiCategory, PoiId, Strategy};
    use crate::isochrone::IsochroneConfig;
    use crate::persistence::MemoryStore;
    use crate::routing::{MockRouter, RetryPolicy, WalkPricer};
    use crate::sampling::SamplingConfig;
    use crate::spatial::SpatialConfig;
    use crate::stations::StationRecord;

    const HB: (f64, f64) = (8.5402, 47.3782);

    fn proj() -> LocalProjection {
        LocalProjection::new(Point::new(HB.0, HB.1))
    }

    fn area() -> StudyArea {
        let metric: Polygon<f64> = polygon![
            (x: -3_000.0, y: -3_000.0),
            (x: 3_000.0, y: -3_000.0),
            (x: 3_000.0, y: 3_000.0),
            (x: -3_000.0, y: 3_000.0),
        ];
        let boundary = proj().polygons_to_geographic(&MultiPolygon::new(vec![metric]));
        StudyArea::new(&boundary, &MultiPolygon::new(vec![]), proj()).unwrap()
    }

    fn stations() -> StationDirectory {
        let stadelhofen = proj().to_geographic(Point::new(800.0, -1_200.0));
        StationDirectory::new(vec![
            StationRecord {
                name: "Zürich HB".into(),
                lon: HB.0,
                lat: HB.1,
            },
            StationRecord {
                name: "Zürich Stadelhofen".into(),
                lon: stadelhofen.x(),
                lat: stadelhofen.y(),
            },
        ])
        .unwrap()
    }

    /// Bike rental every 500 m, bike parking every 1 km, plus the stops.
    fn index(stations: &StationDirectory) -> PoiIndex {
        let mut pois = Vec::new();
        for i in -5..=5 {
            for j in -5..=5 {
                let at = proj().to_geographic(Point::new(i as f64 * 500.0, j as f64 * 500.0));
                let id = PoiId(pois.len() as u64);
                pois.push(Poi::new(id, at, PoiCategory::Rental, [Mode::BicycleRental]));
                if i % 2 == 0 && j % 2 == 0 {
                    let id = PoiId(pois.len() as u64);
                    pois.push(Poi::new(id, at, PoiCategory::Parking, [Mode::Cycle]));
                }
            }
        }
        pois.extend(stations.stops(pois.len() as u64));
        PoiIndex::build(pois, proj(), SpatialConfig::default())
    }

    fn config() -> EngineConfig {
        EngineConfig::default()
            .with_concurrency(8)
            .with_sampling(
                SamplingConfig::default()
                    .with_density(1_000.0, 20)
                    .with_refinement(10, 10),
            )
            .with_isochrone(IsochroneConfig::default().with_cell_size(200.0))
    }

    fn engine_with(
        mock: MockRouter,
        cache: TripCache,
        retry: RetryPolicy,
        config: EngineConfig,
    ) -> Engine<MockRouter, MemoryStore> {
        let stations = stations();
        let index = index(&stations);
        let orchestrator =
            RoutingOrchestrator::new(mock, cache, WalkPricer::straight_line(proj()), retry);
        Engine::new(orchestrator, index, area(), stations, MemoryStore::new(), config)
    }

    fn engine(mock: MockRouter) -> Engine<MockRouter, MemoryStore> {
        engine_with(
            mock,
            TripCache::new(CacheConfig::default()),
            RetryPolicy::immediate(3),
            config(),
        )
    }

    #[tokio::test]
    async fn performance_point_isochrones_at_zurich_hb() {
        let mock = MockRouter::new();
        let engine = engine(mock.clone());
        let request = ComputeRequest::point(Mode::BicycleRental, "Zürich HB", true, Utc::now());

        let response = engine.compute(request).await;

        assert!(matches!(response.status, Status::Success | Status::Skipped));
        assert_eq!(response.strategy, Strategy::Point);
        assert_eq!(response.station.as_deref(), Some("Zürich HB"));
        assert!(response.runtime < 5.0);
        assert!(
            response.used_modes.iter().any(|m| m == "cycle" || m == "walk"),
            "used modes: {:?}",
            response.used_modes
        );
        assert!(!response.bands.is_empty());
        assert!(mock.calls() > 0);
    }

    #[tokio::test]
    async fn second_identical_request_is_skipped() {
        let mock = MockRouter::new();
        let engine = engine(mock.clone());
        let now = Utc::now();

        let first = engine
            .compute(ComputeRequest::point(Mode::BicycleRental, "Zürich HB", true, now))
            .await;
        assert_eq!(first.status, Status::Success);
        let calls = mock.calls();

        let second = engine
            .compute(ComputeRequest::point(Mode::BicycleRental, "Zürich HB", true, now))
            .await;
        assert_eq!(second.status, Status::Skipped);
        assert_eq!(mock.calls(), calls);
    }

    #[tokio::test]
    async fn cached_trips_are_not_requested_again() {
        let mock = MockRouter::new();
        let cache = TripCache::new(CacheConfig::default());
        let now = Utc::now();
        let request = ComputeRequest::point(Mode::BicycleRental, "Zürich HB", false, now);

        let first = engine_with(mock.clone(), cache.clone(), RetryPolicy::immediate(3), config());
        assert!(first.compute(request.clone()).await.is_success());
        let calls = mock.calls();
        assert!(calls > 0);

        // fresh store, shared cache
        let second = engine_with(mock.clone(), cache, RetryPolicy::immediate(3), config());
        let response = second.compute(request).await;
        assert!(response.is_success());
        assert_eq!(mock.calls(), calls);
    }

    #[tokio::test]
    async fn trips_survive_restart_through_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = dir.path().join("trip_cache.json");
        let mock = MockRouter::new();
        let request = ComputeRequest::point(Mode::BicycleRental, "Zürich HB", true, Utc::now());

        let first = engine_with(
            mock.clone(),
            TripCache::new(CacheConfig::default()),
            RetryPolicy::immediate(3),
            config().with_cache_snapshot(&snapshot),
        );
        assert!(first.compute(request.clone()).await.is_success());
        let calls = mock.calls();

        // new process: empty cache and store, warmed from disk
        let cache = TripCache::new(CacheConfig::default());
        assert!(cache.load_snapshot(&snapshot).await.unwrap() > 0);
        let second = engine_with(mock.clone(), cache, RetryPolicy::immediate(3), config());
        assert!(second.compute(request).await.is_success());
        assert_eq!(mock.calls(), calls);
    }

    #[tokio::test]
    async fn unknown_station_fails() {
        let engine = engine(MockRouter::new());
        let response = engine
            .compute(ComputeRequest::point(Mode::Walk, "Bern", false, Utc::now()))
            .await;
        assert_eq!(response.status, Status::Failed);
        assert_eq!(response.error.as_deref(), Some("unknown station: Bern"));
    }

    #[tokio::test]
    async fn no_usable_pois_is_insufficient() {
        let mock = MockRouter::new();
        let engine = engine(mock.clone());
        let response = engine
            .compute(ComputeRequest::point(Mode::EscooterRental, "Zürich HB", false, Utc::now()))
            .await;

        assert_eq!(response.status, Status::Failed);
        let reason = response.reason.unwrap();
        assert!(reason.starts_with("insufficient samples for escooter_rental (point)"), "{reason}");
        assert_eq!(mock.calls(), 0);
    }

    #[tokio::test]
    async fn rate_limited_everywhere_fails_computation() {
        let engine = engine_with(
            MockRouter::new().always_rate_limited(),
            TripCache::new(CacheConfig::default()),
            RetryPolicy::immediate(1),
            config(),
        );
        let response = engine
            .compute(ComputeRequest::point(Mode::BicycleRental, "Zürich HB", true, Utc::now()))
            .await;

        assert_eq!(response.status, Status::Failed);
        assert_eq!(response.error.as_deref(), Some("Rate limit exceeded"));
        assert!(engine.store().is_empty().await);
    }

    #[tokio::test]
    async fn cancelled_network_computation() {
        let mock = MockRouter::new().with_delay(Duration::from_millis(20));
        let engine = engine_with(
            mock.clone(),
            TripCache::new(CacheConfig::default()),
            RetryPolicy::immediate(3),
            config().with_concurrency(2),
        );
        let request = ComputeRequest::network(Mode::Cycle, Utc::now());
        let key = request.computation_key();

        let cancel_soon = async {
            tokio::time::sleep(Duration::from_millis(60)).await;
            assert!(engine.registry().cancel(&key));
        };
        let (response, ()) = tokio::join!(engine.compute(request), cancel_soon);

        assert_eq!(response.status, Status::Failed);
        assert_eq!(response.reason.as_deref(), Some("cancelled"));
        assert!(engine.registry().is_empty());
        assert!(engine.store().is_empty().await);

        // only trips that finished were cached
        let cache = engine.orchestrator().cache();
        cache.sync().await;
        assert!(cache.entry_count() <= mock.calls() as u64);
        assert!(mock.calls() < 20);
    }

    #[tokio::test]
    async fn concurrent_duplicate_is_rejected() {
        let engine = engine(MockRouter::new().with_delay(Duration::from_millis(10)));
        let now = Utc::now();
        let request = ComputeRequest::point(Mode::BicycleRental, "Zürich HB", true, now);

        let (a, b) = tokio::join!(engine.compute(request.clone()), engine.compute(request));
        let statuses = [a.status, b.status];
        assert!(statuses.contains(&Status::Success));
        assert!(statuses.contains(&Status::Failed));
        let rejected = if a.status == Status::Failed { a } else { b };
        assert_eq!(
            rejected.error.as_deref(),
            Some("computation already in progress for bicycle_rental (point)")
        );
    }

    #[tokio::test]
    async fn network_walk_isochrones_are_deterministic() {
        let run = || async {
            let mock = MockRouter::new();
            let engine = engine(mock.clone());
            let response = engine
                .compute(ComputeRequest::network(Mode::Walk, Utc::now()))
                .await;
            assert_eq!(mock.calls(), 0);
            response
        };

        let a = run().await;
        let b = run().await;
        assert_eq!(a.status, Status::Success);
        assert!(a.used_modes.is_empty());
        assert!(a.bands.len() >= 2);
        assert_eq!(a.bands, b.bands);

        for (i, x) in a.bands.iter().enumerate() {
            for y in &a.bands[i + 1..] {
                let overlap = proj()
                    .polygons_to_metric(&x.polygon)
                    .intersection(&proj().polygons_to_metric(&y.polygon));
                use geo::Area;
                assert!(overlap.unsigned_area() < 10.0);
            }
        }
    }

    #[test]
    fn rate_limit_detection() {
        let sample = SamplePoint::network(Point::new(HB.0, HB.1));
        let limited = (sample.clone(), TripResult::failed(FailureReason::RateLimited));
        let no_poi = (sample.clone(), TripResult::failed(FailureReason::NoCandidate));
        let ok = (sample, TripResult::resolved(60.0, vec![], vec![]));

        assert!(all_rate_limited(&[limited.clone(), no_poi.clone()]));
        assert!(!all_rate_limited(&[limited, ok]));
        assert!(!all_rate_limited(&[no_poi]));
        assert!(!all_rate_limited(&[]));
    }
}
