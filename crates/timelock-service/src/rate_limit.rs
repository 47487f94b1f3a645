//! Per-caller request rate limits.
//!
//! Two tiers: a strict one in front of lock creation (key generation is
//! expensive) and a relaxed one for info and release lookups. Each tier keeps
//! a fixed window counter per caller key. A caller's window opens with its
//! first request and admits at most `limit` requests until it closes.

use crate::clock::{Clock, SystemClock};
use dashmap::DashMap;
use std::{sync::Arc, time::Duration};
use tokio::task::JoinHandle;
use tracing::debug;

/// Length of one counting window.
pub const WINDOW: Duration = Duration::from_secs(60);

/// Endpoint classes with separate quotas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointClass {
    /// Lock creation
    Create,
    /// Lock info and release
    Query,
}

/// Outcome of an admission check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    Allowed { limit: u32, remaining: u32 },
    Denied { limit: u32, retry_after: Duration },
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started_at: i64,
    count: u32,
}

/// Fixed window counters for one tier, keyed by caller.
#[derive(Debug)]
struct WindowLimiter {
    limit: u32,
    window_ms: i64,
    windows: DashMap<String, Window>,
}

impl WindowLimiter {
    fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit: limit.max(1),
            window_ms: i64::try_from(window.as_millis()).unwrap_or(i64::MAX),
            windows: DashMap::new(),
        }
    }

    fn check(&self, caller: &str, now: i64) -> Admission {
        let mut entry = self.windows.entry(caller.to_owned()).or_insert(Window {
            started_at: now,
            count: 0,
        });

        if now.saturating_sub(entry.started_at) >= self.window_ms {
            *entry = Window {
                started_at: now,
                count: 0,
            };
        }

        if entry.count >= self.limit {
            let closes_at = entry.started_at.saturating_add(self.window_ms);
            let wait_ms = u64::try_from(closes_at.saturating_sub(now)).unwrap_or(0);
            return Admission::Denied {
                limit: self.limit,
                retry_after: Duration::from_millis(wait_ms),
            };
        }

        entry.count += 1;
        Admission::Allowed {
            limit: self.limit,
            remaining: self.limit - entry.count,
        }
    }

    fn retain_open(&self, now: i64) {
        self.windows
            .retain(|_, w| now.saturating_sub(w.started_at) < self.window_ms);
        self.windows.shrink_to_fit();
    }

    fn len(&self) -> usize {
        self.windows.len()
    }
}

/// Rate governor shared across requests.
#[derive(Clone)]
pub struct RateGovernor {
    create: Arc<WindowLimiter>,
    query: Arc<WindowLimiter>,
    clock: Arc<dyn Clock>,
}

impl RateGovernor {
    /// Create a governor with the given per-minute quotas.
    pub fn new(create_per_minute: u32, query_per_minute: u32) -> Self {
        Self {
            create: Arc::new(WindowLimiter::new(create_per_minute, WINDOW)),
            query: Arc::new(WindowLimiter::new(query_per_minute, WINDOW)),
            clock: Arc::new(SystemClock),
        }
    }

    /// Create a permissive governor for testing.
    pub fn permissive() -> Self {
        Self::new(1000, 1000)
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn limiter(&self, class: EndpointClass) -> &WindowLimiter {
        match class {
            EndpointClass::Create => &self.create,
            EndpointClass::Query => &self.query,
        }
    }

    /// Count one request from `caller` against the quota of `class`.
    pub fn admit(&self, caller: &str, class: EndpointClass) -> Admission {
        self.limiter(class).check(caller, self.clock.now_ms())
    }

    /// Drop state for callers whose window has closed.
    pub fn retain_recent(&self) {
        let now = self.clock.now_ms();
        self.create.retain_open(now);
        self.query.retain_open(now);
    }

    /// Number of caller keys currently tracked across both tiers.
    pub fn tracked_callers(&self) -> usize {
        self.create.len() + self.query.len()
    }

    /// Periodically reclaim idle caller entries.
    pub fn spawn_cleanup(&self, every: Duration) -> JoinHandle<()> {
        let governor = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            // The first tick completes immediately
            interval.tick().await;
            loop {
                interval.tick().await;
                let before = governor.tracked_callers();
                governor.retain_recent();
                debug!(
                    before,
                    after = governor.tracked_callers(),
                    "Reclaimed idle rate limit entries"
                );
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn governor_at(create: u32, query: u32, clock: &ManualClock) -> RateGovernor {
        RateGovernor::new(create, query).with_clock(Arc::new(clock.clone()))
    }

    #[test]
    fn test_create_tier_denies_21st_request() {
        let clock = ManualClock::new(1_000_000);
        let governor = governor_at(20, 60, &clock);

        for i in 0..20 {
            assert!(
                matches!(
                    governor.admit("10.0.0.1", EndpointClass::Create),
                    Admission::Allowed { .. }
                ),
                "request {} should be allowed",
                i + 1
            );
        }

        clock.advance(10_000);
        match governor.admit("10.0.0.1", EndpointClass::Create) {
            Admission::Denied { limit, retry_after } => {
                assert_eq!(limit, 20);
                assert_eq!(retry_after, Duration::from_secs(50));
            }
            other => panic!("expected denial, got {:?}", other),
        }
    }

    #[test]
    fn test_no_extra_requests_inside_window() {
        let clock = ManualClock::new(1_000_000);
        let governor = governor_at(20, 60, &clock);

        for _ in 0..20 {
            governor.admit("c", EndpointClass::Create);
        }

        // Well past 60s / 20, still inside the window
        for _ in 0..19 {
            clock.advance(3_100);
            assert!(matches!(
                governor.admit("c", EndpointClass::Create),
                Admission::Denied { .. }
            ));
        }
    }

    #[test]
    fn test_window_reopens_after_a_minute() {
        let clock = ManualClock::new(1_000_000);
        let governor = governor_at(2, 60, &clock);

        governor.admit("a", EndpointClass::Create);
        governor.admit("a", EndpointClass::Create);

        clock.advance(59_999);
        assert!(matches!(
            governor.admit("a", EndpointClass::Create),
            Admission::Denied { .. }
        ));

        clock.advance(1);
        assert_eq!(
            governor.admit("a", EndpointClass::Create),
            Admission::Allowed { limit: 2, remaining: 1 }
        );
    }

    #[test]
    fn test_remaining_counts_down() {
        let governor = RateGovernor::new(3, 60);

        assert_eq!(
            governor.admit("a", EndpointClass::Create),
            Admission::Allowed { limit: 3, remaining: 2 }
        );
        assert_eq!(
            governor.admit("a", EndpointClass::Create),
            Admission::Allowed { limit: 3, remaining: 1 }
        );
    }

    #[test]
    fn test_callers_are_independent() {
        let governor = RateGovernor::new(1, 1);

        assert!(matches!(
            governor.admit("a", EndpointClass::Create),
            Admission::Allowed { .. }
        ));
        assert!(matches!(
            governor.admit("a", EndpointClass::Create),
            Admission::Denied { .. }
        ));
        assert!(matches!(
            governor.admit("b", EndpointClass::Create),
            Admission::Allowed { .. }
        ));
    }

    #[test]
    fn test_tiers_are_independent() {
        let governor = RateGovernor::new(1, 60);

        assert!(matches!(
            governor.admit("a", EndpointClass::Create),
            Admission::Allowed { .. }
        ));
        assert!(matches!(
            governor.admit("a", EndpointClass::Create),
            Admission::Denied { .. }
        ));

        for _ in 0..60 {
            assert!(matches!(
                governor.admit("a", EndpointClass::Query),
                Admission::Allowed { .. }
            ));
        }
        assert!(matches!(
            governor.admit("a", EndpointClass::Query),
            Admission::Denied { .. }
        ));
    }

    #[test]
    fn test_tracked_callers() {
        let governor = RateGovernor::permissive();
        governor.admit("a", EndpointClass::Create);
        governor.admit("b", EndpointClass::Query);
        assert_eq!(governor.tracked_callers(), 2);
    }

    #[test]
    fn test_retain_recent_drops_closed_windows() {
        let clock = ManualClock::new(0);
        let governor = governor_at(5, 5, &clock);

        governor.admit("old", EndpointClass::Create);
        clock.advance(30_000);
        governor.admit("new", EndpointClass::Query);
        clock.advance(30_000);

        governor.retain_recent();
        assert_eq!(governor.tracked_callers(), 1);
    }
}
