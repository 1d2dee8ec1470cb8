//! Remote corporation-number checks with a scoped, time-bounded cache
//!
//! Each distinct 9-character number is looked up at most once per cache
//! window. Callers asking for a number whose lookup is still running join
//! the same request instead of issuing another one. Settled answers are
//! reused until they are older than the configured TTL; failed lookups are
//! dropped so the next trigger retries.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures_util::future::{BoxFuture, FutureExt, Shared};
use onboarding_api::{ApiConfig, ApiError, CorporationValidation, OnboardingApi};
use tokio::time::{timeout, Instant};
use tracing::{debug, warn};

use crate::validation::is_lookup_candidate;

pub const INVALID_CORPORATION_MESSAGE: &str = "Invalid corporation number";

/// Result of one lookup, keyed by the exact number that was checked
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    Valid,
    /// The service answered and rejected the number
    Invalid { message: Option<String> },
    /// The lookup itself failed (network, timeout, remote error)
    Failed { message: Option<String> },
}

impl CheckOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, CheckOutcome::Valid)
    }

    /// Field error this outcome produces, if any
    pub fn error_message(&self) -> Option<String> {
        match self {
            CheckOutcome::Valid => None,
            CheckOutcome::Invalid { message } | CheckOutcome::Failed { message } => Some(
                message
                    .as_deref()
                    .filter(|m| !m.is_empty())
                    .unwrap_or(INVALID_CORPORATION_MESSAGE)
                    .to_string(),
            ),
        }
    }

    fn from_response(response: Result<CorporationValidation, ApiError>) -> Self {
        match response {
            Ok(validation) if validation.valid => CheckOutcome::Valid,
            Ok(validation) => CheckOutcome::Invalid { message: validation.message },
            Err(err) => CheckOutcome::Failed {
                message: err.remote_message().map(str::to_string),
            },
        }
    }

    fn is_retained(&self) -> bool {
        !matches!(self, CheckOutcome::Failed { .. })
    }
}

type SharedCheck = Shared<BoxFuture<'static, CheckOutcome>>;

/// A lookup that has been issued but possibly not answered yet
#[derive(Clone)]
pub struct PendingCheck {
    key: String,
    future: SharedCheck,
}

impl PendingCheck {
    /// The exact number this lookup was issued for
    pub fn key(&self) -> &str {
        &self.key
    }

    pub async fn outcome(self) -> CheckOutcome {
        self.future.await
    }
}

impl std::fmt::Debug for PendingCheck {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingCheck").field("key", &self.key).finish()
    }
}

/// What `CorporationChecker::check` did for a number
#[derive(Debug, Clone)]
pub enum Lookup {
    /// Not a 9-character candidate; nothing was sent
    Skipped,
    /// Answered from the cache
    Ready(CheckOutcome),
    /// A request is running (newly issued or joined)
    Pending(PendingCheck),
}

enum CacheEntry {
    InFlight { future: SharedCheck, generation: u64 },
    Settled { outcome: CheckOutcome, settled_at: Instant },
}

/// Lookup answers keyed by exact corporation number
pub struct CorporationCache {
    ttl: Duration,
    entries: HashMap<String, CacheEntry>,
    next_generation: u64,
}

impl CorporationCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
            next_generation: 0,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Settled answer for `key`, if still fresh
    pub fn settled(&mut self, key: &str) -> Option<CheckOutcome> {
        match self.live_entry(key, Instant::now()) {
            Some(CacheEntry::Settled { outcome, .. }) => Some(outcome.clone()),
            _ => None,
        }
    }

    /// Forget everything known about `key`
    pub fn invalidate(&mut self, key: &str) {
        self.entries.remove(key);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Drop settled entries older than the TTL, returning how many were dropped
    pub fn purge_expired(&mut self) -> usize {
        let now = Instant::now();
        let ttl = self.ttl;
        let before = self.entries.len();
        self.entries.retain(|_, entry| match entry {
            CacheEntry::Settled { settled_at, .. } => now.duration_since(*settled_at) < ttl,
            CacheEntry::InFlight { .. } => true,
        });
        before - self.entries.len()
    }

    fn live_entry(&mut self, key: &str, now: Instant) -> Option<&CacheEntry> {
        let expired = matches!(
            self.entries.get(key),
            Some(CacheEntry::Settled { settled_at, .. }) if now.duration_since(*settled_at) >= self.ttl
        );
        if expired {
            debug!("Corporation lookup for {} expired", key);
            self.entries.remove(key);
            return None;
        }
        self.entries.get(key)
    }

    fn begin(&mut self, key: &str, future: SharedCheck) -> u64 {
        let generation = self.next_generation;
        self.next_generation += 1;
        self.entries
            .insert(key.to_string(), CacheEntry::InFlight { future, generation });
        generation
    }

    /// Record the answer for the request started as `generation`.
    /// Entries replaced or invalidated since then are left alone.
    fn settle(&mut self, key: &str, generation: u64, outcome: &CheckOutcome) {
        let current = matches!(
            self.entries.get(key),
            Some(CacheEntry::InFlight { generation: g, .. }) if *g == generation
        );
        if !current {
            return;
        }
        if outcome.is_retained() {
            self.entries.insert(
                key.to_string(),
                CacheEntry::Settled {
                    outcome: outcome.clone(),
                    settled_at: Instant::now(),
                },
            );
        } else {
            self.entries.remove(key);
        }
    }
}

/// Issues and de-duplicates corporation-number lookups
pub struct CorporationChecker<A: OnboardingApi> {
    api: Arc<A>,
    cache: Arc<Mutex<CorporationCache>>,
    request_timeout: Duration,
}

impl<A: OnboardingApi> CorporationChecker<A> {
    pub fn new(api: Arc<A>, config: &ApiConfig) -> Self {
        Self {
            api,
            cache: Arc::new(Mutex::new(CorporationCache::new(config.corporation_cache_ttl()))),
            request_timeout: config.request_timeout(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CorporationCache> {
        lock_cache(&self.cache)
    }

    /// Look up `number`, reusing a fresh or running lookup for the same key.
    ///
    /// Numbers that are not exactly 9 characters never reach the network.
    /// Must be called from within a tokio runtime.
    pub fn check(&self, number: &str) -> Lookup {
        if !is_lookup_candidate(number) {
            return Lookup::Skipped;
        }

        let mut cache = self.lock();
        let purged = cache.purge_expired();
        if purged > 0 {
            debug!("Purged {} expired corporation lookups", purged);
        }
        match cache.live_entry(number, Instant::now()) {
            Some(CacheEntry::Settled { outcome, .. }) => {
                debug!("Corporation lookup for {} served from cache", number);
                return Lookup::Ready(outcome.clone());
            }
            Some(CacheEntry::InFlight { future, .. }) => {
                debug!("Joining running corporation lookup for {}", number);
                return Lookup::Pending(PendingCheck {
                    key: number.to_string(),
                    future: future.clone(),
                });
            }
            None => {}
        }

        debug!("Starting corporation lookup for {}", number);
        let generation = cache.next_generation;
        let api = self.api.clone();
        let shared_cache = self.cache.clone();
        let key = number.to_string();
        let request_timeout = self.request_timeout;

        // The cache lock is held until the entry is in place, so the task
        // cannot settle before `begin` records it.
        let handle = tokio::spawn(async move {
            let response = match timeout(request_timeout, api.validate_corporation_number(&key)).await {
                Ok(response) => response,
                Err(_) => Err(ApiError::Timeout),
            };
            if let Err(err) = &response {
                warn!("Corporation lookup for {} failed: {}", key, err);
            }
            let outcome = CheckOutcome::from_response(response);
            lock_cache(&shared_cache).settle(&key, generation, &outcome);
            outcome
        });

        let future = async move {
            handle.await.unwrap_or_else(|err| {
                warn!("Corporation lookup task ended abnormally: {}", err);
                CheckOutcome::Failed { message: None }
            })
        }
        .boxed()
        .shared();

        let started = cache.begin(number, future.clone());
        debug_assert_eq!(started, generation);

        Lookup::Pending(PendingCheck {
            key: number.to_string(),
            future,
        })
    }

    /// Fresh settled answer for `number`, without issuing anything
    pub fn cached(&self, number: &str) -> Option<CheckOutcome> {
        self.lock().settled(number)
    }

    pub fn purge_expired(&self) -> usize {
        let purged = self.lock().purge_expired();
        if purged > 0 {
            debug!("Purged {} expired corporation lookups", purged);
        }
        purged
    }

    pub fn invalidate(&self, number: &str) {
        self.lock().invalidate(number);
    }

    pub fn cache_len(&self) -> usize {
        self.lock().len()
    }
}

fn lock_cache(cache: &Mutex<CorporationCache>) -> MutexGuard<'_, CorporationCache> {
    cache.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use onboarding_api::ProfileDetails;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    #[derive(Default)]
    struct CountingApi {
        calls: AtomicUsize,
        gate: Option<Arc<Notify>>,
    }

    #[async_trait]
    impl OnboardingApi for CountingApi {
        async fn validate_corporation_number(&self, number: &str) -> Result<CorporationValidation, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            match number {
                "123456789" => Ok(CorporationValidation::valid(number)),
                "500000000" => Err(ApiError::Rejected { status: 500, message: None }),
                "404000000" => Err(ApiError::Rejected {
                    status: 404,
                    message: Some("Error validating corporation number".to_string()),
                }),
                "000000000" => std::future::pending::<Result<CorporationValidation, ApiError>>().await,
                _ => Ok(CorporationValidation {
                    valid: false,
                    corporation_number: Some(number.to_string()),
                    message: None,
                }),
            }
        }

        async fn submit_profile(&self, _profile: &ProfileDetails) -> Result<(), ApiError> {
            Ok(())
        }
    }

    fn checker(api: Arc<CountingApi>) -> CorporationChecker<CountingApi> {
        CorporationChecker::new(api, &ApiConfig::default())
    }

    async fn resolve(lookup: Lookup) -> CheckOutcome {
        match lookup {
            Lookup::Ready(outcome) => outcome,
            Lookup::Pending(pending) => pending.outcome().await,
            Lookup::Skipped => panic!("lookup was skipped"),
        }
    }

    #[test]
    fn test_error_message_fallback() {
        assert_eq!(CheckOutcome::Valid.error_message(), None);
        assert_eq!(
            CheckOutcome::Invalid { message: None }.error_message().as_deref(),
            Some(INVALID_CORPORATION_MESSAGE)
        );
        assert_eq!(
            CheckOutcome::Failed { message: Some(String::new()) }.error_message().as_deref(),
            Some(INVALID_CORPORATION_MESSAGE)
        );
        assert_eq!(
            CheckOutcome::Failed { message: Some("Lookup unavailable".to_string()) }
                .error_message()
                .as_deref(),
            Some("Lookup unavailable")
        );
    }

    #[tokio::test]
    async fn test_short_numbers_never_reach_the_network() {
        let api = Arc::new(CountingApi::default());
        let checker = checker(api.clone());

        for number in ["", "1", "12345", "12345678", "1234567890"] {
            assert!(matches!(checker.check(number), Lookup::Skipped));
        }
        tokio::task::yield_now().await;
        assert_eq!(api.calls.load(Ordering::SeqCst), 0);
        assert_eq!(checker.cache_len(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_checks_share_one_request() {
        let gate = Arc::new(Notify::new());
        let api = Arc::new(CountingApi { gate: Some(gate.clone()), ..Default::default() });
        let checker = checker(api.clone());

        let first = checker.check("123456789");
        let second = checker.check("123456789");
        assert!(matches!(first, Lookup::Pending(_)));
        assert!(matches!(second, Lookup::Pending(_)));

        gate.notify_one();
        let (a, b) = tokio::join!(resolve(first), resolve(second));
        assert_eq!(a, CheckOutcome::Valid);
        assert_eq!(b, CheckOutcome::Valid);
        assert_eq!(api.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_settled_answer_is_reused() {
        let api = Arc::new(CountingApi::default());
        let checker = checker(api.clone());

        assert_eq!(resolve(checker.check("123456789")).await, CheckOutcome::Valid);
        match checker.check("123456789") {
            Lookup::Ready(outcome) => assert_eq!(outcome, CheckOutcome::Valid),
            other => panic!("expected cache hit, got {:?}", other),
        }
        assert_eq!(checker.cached("123456789"), Some(CheckOutcome::Valid));
        assert_eq!(api.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_rejections_are_retained() {
        let api = Arc::new(CountingApi::default());
        let checker = checker(api.clone());

        let outcome = resolve(checker.check("111111111")).await;
        assert_eq!(outcome, CheckOutcome::Invalid { message: None });
        assert!(matches!(checker.check("111111111"), Lookup::Ready(_)));
        assert_eq!(api.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failures_are_not_retained() {
        let api = Arc::new(CountingApi::default());
        let checker = checker(api.clone());

        let outcome = resolve(checker.check("404000000")).await;
        assert_eq!(
            outcome.error_message().as_deref(),
            Some("Error validating corporation number")
        );
        assert_eq!(checker.cached("404000000"), None);

        let retry = resolve(checker.check("500000000")).await;
        assert_eq!(retry.error_message().as_deref(), Some(INVALID_CORPORATION_MESSAGE));
        resolve(checker.check("404000000")).await;
        assert_eq!(api.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire_after_ttl() {
        let api = Arc::new(CountingApi::default());
        let checker = checker(api.clone());

        resolve(checker.check("123456789")).await;
        tokio::time::advance(Duration::from_secs(299)).await;
        assert!(matches!(checker.check("123456789"), Lookup::Ready(_)));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(checker.cached("123456789"), None);
        resolve(checker.check("123456789")).await;
        assert_eq!(api.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired_keeps_running_lookups() {
        let api = Arc::new(CountingApi::default());
        let checker = checker(api.clone());

        resolve(checker.check("123456789")).await;
        let pending = checker.check("000000000");
        assert!(matches!(pending, Lookup::Pending(_)));
        assert_eq!(checker.cache_len(), 2);

        tokio::time::advance(Duration::from_secs(301)).await;
        assert_eq!(checker.purge_expired(), 1);
        assert_eq!(checker.cached("123456789"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_check_evicts_expired_numbers() {
        let api = Arc::new(CountingApi::default());
        let checker = checker(api.clone());

        for i in 0..50 {
            resolve(checker.check(&format!("1000000{:02}", i))).await;
        }
        assert_eq!(checker.cache_len(), 50);

        tokio::time::advance(Duration::from_secs(3600)).await;
        resolve(checker.check("200000000")).await;
        assert_eq!(checker.cache_len(), 1);
        assert_eq!(checker.cached("100000000"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_lookup_times_out() {
        let api = Arc::new(CountingApi::default());
        let checker = checker(api.clone());

        let outcome = resolve(checker.check("000000000")).await;
        assert_eq!(outcome, CheckOutcome::Failed { message: None });
        assert_eq!(checker.cache_len(), 0);
    }

    #[tokio::test]
    async fn test_invalidate_discards_running_answer() {
        let gate = Arc::new(Notify::new());
        let api = Arc::new(CountingApi { gate: Some(gate.clone()), ..Default::default() });
        let checker = checker(api.clone());

        let pending = checker.check("123456789");
        checker.invalidate("123456789");
        gate.notify_one();
        assert_eq!(resolve(pending).await, CheckOutcome::Valid);
        assert_eq!(checker.cached("123456789"), None);
    }
}
