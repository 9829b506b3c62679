//! Wall-clock sources and elapsed-time accounting.
//!
//! Elapsed time is recomputed from timestamps on every read, never summed
//! from ticks, so a missed or late tick cannot introduce drift.

use std::cell::Cell;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Source of "now" for the engine.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Hand-driven clock. Clones share the same instant.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }

    pub fn advance_secs(&self, secs: i64) {
        self.advance(Duration::seconds(secs));
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = to;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Elapsed seconds since start, excluding paused intervals.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ElapsedClock {
    started_at: Option<DateTime<Utc>>,
    paused_at: Option<DateTime<Utc>>,
    /// Sum of completed paused intervals, in milliseconds.
    paused_total_ms: i64,
    /// Set once the session ends.
    #[serde(default)]
    frozen_secs: Option<u64>,
    /// Highest value read so far; reads never go below it.
    #[serde(default)]
    high_water_secs: Cell<u64>,
}

impl ElapsedClock {
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn is_paused(&self) -> bool {
        self.paused_at.is_some()
    }

    pub fn paused_total(&self) -> Duration {
        Duration::milliseconds(self.paused_total_ms)
    }

    pub fn start(&mut self, now: DateTime<Utc>) {
        *self = Self {
            started_at: Some(now),
            ..Self::default()
        };
    }

    pub fn pause(&mut self, now: DateTime<Utc>) {
        if self.paused_at.is_none() {
            self.observe(now);
            self.paused_at = Some(now);
        }
    }

    pub fn resume(&mut self, now: DateTime<Utc>) {
        if let Some(paused_at) = self.paused_at.take() {
            let paused = (now - paused_at).num_milliseconds();
            if paused < 0 {
                tracing::warn!(paused_ms = paused, "wall clock moved backwards during pause");
            }
            self.paused_total_ms = self.paused_total_ms.saturating_add(paused.max(0));
        }
    }

    /// Freezes the value for good.
    pub fn freeze(&mut self, now: DateTime<Utc>) -> u64 {
        let secs = self.elapsed_secs(now);
        self.frozen_secs = Some(secs);
        secs
    }

    /// Same as [`ElapsedClock::elapsed_secs`]; kept for call sites that read
    /// on every tick.
    pub fn observe(&mut self, now: DateTime<Utc>) -> u64 {
        self.elapsed_secs(now)
    }

    pub fn elapsed_secs(&self, now: DateTime<Utc>) -> u64 {
        if let Some(frozen) = self.frozen_secs {
            return frozen;
        }
        let Some(started_at) = self.started_at else {
            return 0;
        };
        let reference = self.paused_at.unwrap_or(now);
        let ms = (reference - started_at).num_milliseconds() - self.paused_total_ms;
        let measured = (ms.max(0) / 1000) as u64;
        let high_water = self.high_water_secs.get();
        if measured < high_water {
            tracing::warn!(measured, held = high_water, "wall clock moved backwards; holding elapsed");
            return high_water;
        }
        // Every read ratchets, so a clock stepping backwards cannot lower it.
        self.high_water_secs.set(measured);
        measured
    }
}

/// Formats seconds as `MM:SS`.
pub fn format_clock(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_started_reads_zero() {
        let clock = ElapsedClock::default();
        assert_eq!(clock.elapsed_secs(Utc::now()), 0);
    }

    #[test]
    fn excludes_paused_interval() {
        let manual = ManualClock::default();
        let mut clock = ElapsedClock::default();
        clock.start(manual.now());
        manual.advance_secs(10);
        clock.pause(manual.now());
        manual.advance_secs(5);
        assert_eq!(clock.elapsed_secs(manual.now()), 10);
        clock.resume(manual.now());
        manual.advance_secs(5);
        assert_eq!(clock.elapsed_secs(manual.now()), 15);
        assert_eq!(clock.paused_total(), Duration::seconds(5));
    }

    #[test]
    fn floors_partial_seconds() {
        let manual = ManualClock::default();
        let mut clock = ElapsedClock::default();
        clock.start(manual.now());
        manual.advance(Duration::milliseconds(2_999));
        assert_eq!(clock.elapsed_secs(manual.now()), 2);
    }

    #[test]
    fn freeze_holds_value() {
        let manual = ManualClock::default();
        let mut clock = ElapsedClock::default();
        clock.start(manual.now());
        manual.advance_secs(42);
        assert_eq!(clock.freeze(manual.now()), 42);
        manual.advance_secs(100);
        assert_eq!(clock.elapsed_secs(manual.now()), 42);
    }

    #[test]
    fn never_goes_backwards_when_wall_clock_regresses() {
        let manual = ManualClock::default();
        let mut clock = ElapsedClock::default();
        clock.start(manual.now());
        manual.advance_secs(30);
        clock.observe(manual.now());
        manual.advance_secs(-20);
        assert_eq!(clock.elapsed_secs(manual.now()), 30);
    }

    #[test]
    fn warns_while_holding_a_regressed_reading() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use tracing_subscriber::layer::{Context, SubscriberExt};
        use tracing_subscriber::Layer;

        struct WarnCounter(Arc<AtomicUsize>);

        impl<S: tracing::Subscriber> Layer<S> for WarnCounter {
            fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
                if *event.metadata().level() == tracing::Level::WARN {
                    self.0.fetch_add(1, Ordering::SeqCst);
                }
            }
        }

        let warnings = Arc::new(AtomicUsize::new(0));
        let subscriber = tracing_subscriber::registry().with(WarnCounter(warnings.clone()));
        tracing::subscriber::with_default(subscriber, || {
            let manual = ManualClock::default();
            let mut clock = ElapsedClock::default();
            clock.start(manual.now());
            manual.advance_secs(30);
            assert_eq!(clock.elapsed_secs(manual.now()), 30);
            assert_eq!(warnings.load(Ordering::SeqCst), 0);

            manual.advance_secs(-20);
            assert_eq!(clock.elapsed_secs(manual.now()), 30);
            assert_eq!(warnings.load(Ordering::SeqCst), 1);

            manual.advance_secs(25);
            assert_eq!(clock.elapsed_secs(manual.now()), 35);
            assert_eq!(warnings.load(Ordering::SeqCst), 1);
        });
    }

    #[test]
    fn resume_with_regressed_clock_adds_no_pause() {
        let manual = ManualClock::default();
        let mut clock = ElapsedClock::default();
        clock.start(manual.now());
        manual.advance_secs(10);
        clock.pause(manual.now());
        manual.advance_secs(-3);
        clock.resume(manual.now());
        assert_eq!(clock.paused_total(), Duration::zero());
    }

    #[test]
    fn formats_minutes_and_seconds() {
        assert_eq!(format_clock(0), "00:00");
        assert_eq!(format_clock(75), "01:15");
        assert_eq!(format_clock(3600), "60:00");
    }
}
