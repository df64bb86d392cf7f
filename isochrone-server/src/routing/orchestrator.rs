//! Routing orchestrator: resolves trip plans into travel times.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::cache::{CacheKey, TripCache};
use crate::compute::TaskState;
use crate::domain::{FailureReason, Mode, TripPlan, TripResult};

use super::RoutingBackend;
use super::backoff::RetryPolicy;
use super::decode::TripResponse;
use super::error::RoutingError;
use super::request::{TimeConstraint, TripQuery};
use super::walk::WalkPricer;

/// Per-computation routing parameters shared by all of its tasks.
#[derive(Debug, Clone)]
pub struct RoutingContext {
    /// Anchor of the cache time bucket.
    pub timestamp: DateTime<Utc>,
    pub time: TimeConstraint,
    /// Re-resolve instead of reading cached results.
    pub force_update: bool,
    /// Keys already refreshed by this computation when forcing.
    refreshed: Arc<Mutex<HashSet<CacheKey>>>,
}

impl RoutingContext {
    pub fn new(timestamp: DateTime<Utc>, time: TimeConstraint) -> Self {
        Self {
            timestamp,
            time,
            force_update: false,
            refreshed: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Bypass cached results, refreshing each key once.
    pub fn forced(mut self, force_update: bool) -> Self {
        self.force_update = force_update;
        self
    }
}

/// Resolves trip plans against the cache, the local walk pricer and the
/// routing backend.
///
/// Resolution is idempotent for identical plans within a time bucket: the
/// first resolution of a key is cached and concurrent resolutions of the
/// same key share one backend round.
pub struct RoutingOrchestrator<B> {
    backend: B,
    cache: TripCache,
    walk: WalkPricer,
    retry: RetryPolicy,
}

impl<B: RoutingBackend> RoutingOrchestrator<B> {
    pub fn new(backend: B, cache: TripCache, walk: WalkPricer, retry: RetryPolicy) -> Self {
        Self {
            backend,
            cache,
            walk,
            retry,
        }
    }

    pub fn cache(&self) -> &TripCache {
        &self.cache
    }

    pub fn walk(&self) -> &WalkPricer {
        &self.walk
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Resolve `plan`, reporting state changes through `observe`.
    ///
    /// Never fails: per-trip problems come back as a failed `TripResult`.
    pub async fn resolve(
        &self,
        plan: &TripPlan,
        ctx: &RoutingContext,
        observe: &(dyn Fn(TaskState) + Send + Sync),
    ) -> TripResult {
        let key = self.cache.key_for(plan, ctx.timestamp);

        if ctx.force_update {
            let mut refreshed = ctx.refreshed.lock().await;
            if refreshed.insert(key) {
                self.cache.invalidate(&key).await;
            }
        } else if let Some(hit) = self.cache.get(&key).await {
            debug!(mode = %plan.mode(), "trip cache hit");
            observe(TaskState::Resolved);
            return hit;
        }

        observe(TaskState::InFlight);
        let outcome = self
            .cache
            .get_or_resolve(key, self.resolve_uncached(plan, ctx, observe))
            .await
            .map_err(|e| (*e).clone());

        match outcome {
            Ok(result) => {
                observe(TaskState::Resolved);
                result
            }
            Err(reason) => {
                debug!(mode = %plan.mode(), %reason, "trip not resolved");
                observe(TaskState::Failed(reason.clone()));
                TripResult::failed(reason)
            }
        }
    }

    async fn resolve_uncached(
        &self,
        plan: &TripPlan,
        ctx: &RoutingContext,
        observe: &(dyn Fn(TaskState) + Send + Sync),
    ) -> Result<TripResult, FailureReason> {
        let mut result = TripResult::resolved(0.0, Vec::new(), Vec::new());

        for leg in plan.legs() {
            if leg.is_walk() {
                let secs = self.walk.duration_secs(leg.from(), leg.to());
                result.absorb(secs, &[Mode::Walk.as_str().to_string()], &[]);
                continue;
            }
            if let Some(secs) = self.walk.short_leg_secs(leg.from(), leg.to()) {
                result.absorb(secs, &[leg.mode().vehicle().as_str().to_string()], &[]);
                continue;
            }

            let query = TripQuery::new(leg.from(), leg.to(), leg.mode(), ctx.time, ctx.timestamp);
            let response = self.call_with_retry(&query, observe).await?;
            result.absorb(
                response.duration_secs,
                &response.used_modes,
                &response.station_names,
            );
        }

        Ok(result)
    }

    async fn call_with_retry(
        &self,
        query: &TripQuery,
        observe: &(dyn Fn(TaskState) + Send + Sync),
    ) -> Result<TripResponse, FailureReason> {
        let mut retry = 0;
        loop {
            match self.backend.trip(query).await {
                Ok(response) => return Ok(response),
                Err(RoutingError::RateLimited) => {
                    retry += 1;
                    let Some(delay) = self.retry.delay_for(retry) else {
                        warn!(mode = %query.mode, retries = retry - 1, "rate limit retries exhausted");
                        return Err(FailureReason::RateLimited);
                    };
                    debug!(retry, ?delay, "rate limited, backing off");
                    observe(TaskState::Retrying { attempt: retry });
                    tokio::time::sleep(delay).await;
                }
                Err(RoutingError::NoTripFound) => return Err(FailureReason::NoTrip),
                Err(e) => {
                    warn!(mode = %query.mode, error = %e, "routing request failed");
                    return Err(FailureReason::ExternalApi(e.to_string()));
                }
            }
        }
    }
}
