//! Authoritative song time.
//!
//! [`SyncClock`] reads the playback position from a [`MediaTransport`] and
//! adds a manual offset. A [`TimeProvider`] supplies wall-clock instants so
//! the clock can keep a pause-compensated reference start, which is what the
//! drift measurement compares the transport against.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// External media transport owning playback.
pub trait MediaTransport {
    fn current_position_millis(&self) -> i64;
    fn play(&mut self);
    fn pause(&mut self);
    fn seek(&mut self, position_ms: i64);
}

/// Source of wall-clock time in microseconds from an arbitrary epoch.
pub trait TimeProvider {
    fn now_us(&self) -> i64;
}

/// Wall clock backed by [`Instant`].
#[derive(Debug, Clone)]
pub struct SystemTimeProvider {
    origin: Instant,
}

impl SystemTimeProvider {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemTimeProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeProvider for SystemTimeProvider {
    fn now_us(&self) -> i64 {
        self.origin.elapsed().as_micros() as i64
    }
}

/// Manually driven wall clock. Clones share the same reading.
#[derive(Debug, Clone, Default)]
pub struct MockTimeProvider {
    current_us: Arc<AtomicI64>,
}

impl MockTimeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_time(&self, us: i64) {
        self.current_us.store(us, Ordering::SeqCst);
    }

    pub fn advance(&self, delta_us: i64) {
        self.current_us.fetch_add(delta_us, Ordering::SeqCst);
    }
}

impl TimeProvider for MockTimeProvider {
    fn now_us(&self) -> i64 {
        self.current_us.load(Ordering::SeqCst)
    }
}

/// Deterministic transport whose position only moves when advanced. Clones
/// share state, so a host can keep one copy while the session owns another.
#[derive(Debug, Clone, Default)]
pub struct SimulatedTransport {
    position_ms: Arc<AtomicI64>,
    playing: Arc<AtomicBool>,
}

impl SimulatedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }

    /// Moves the playhead forward if the transport is playing.
    pub fn advance_millis(&self, delta_ms: i64) {
        if self.is_playing() {
            self.position_ms.fetch_add(delta_ms, Ordering::SeqCst);
        }
    }
}

impl MediaTransport for SimulatedTransport {
    fn current_position_millis(&self) -> i64 {
        self.position_ms.load(Ordering::SeqCst)
    }

    fn play(&mut self) {
        self.playing.store(true, Ordering::SeqCst);
    }

    fn pause(&mut self) {
        self.playing.store(false, Ordering::SeqCst);
    }

    fn seek(&mut self, position_ms: i64) {
        self.position_ms.store(position_ms.max(0), Ordering::SeqCst);
    }
}

/// Song clock combining transport position with a drift-correction offset.
///
/// While paused, [`SyncClock::now`] returns `0.0`. That reading is a
/// quiescent marker, not elapsed time.
#[derive(Debug)]
pub struct SyncClock<T, P = SystemTimeProvider> {
    transport: T,
    time: P,
    start_us: i64,
    pause_us: i64,
    paused: bool,
    offset_ms: i64,
}

impl<T: MediaTransport> SyncClock<T, SystemTimeProvider> {
    pub fn new(transport: T) -> Self {
        Self::with_time_provider(transport, SystemTimeProvider::new())
    }
}

impl<T: MediaTransport, P: TimeProvider> SyncClock<T, P> {
    pub fn with_time_provider(transport: T, time: P) -> Self {
        Self {
            transport,
            time,
            start_us: 0,
            pause_us: 0,
            paused: true,
            offset_ms: 0,
        }
    }

    /// Begins timekeeping from zero elapsed.
    pub fn start(&mut self) {
        self.start_us = self.time.now_us();
        self.pause_us = 0;
        self.paused = false;
    }

    pub fn pause(&mut self) {
        if !self.paused {
            self.pause_us = self.time.now_us();
            self.paused = true;
        }
    }

    /// Shifts the reference start forward by the paused span so elapsed time
    /// does not count the pause.
    pub fn resume(&mut self) {
        if self.paused {
            let paused_for = self.time.now_us() - self.pause_us;
            self.start_us += paused_for;
            self.paused = false;
        }
    }

    /// Back to the just-constructed state: paused with no offset.
    pub fn reset(&mut self) {
        self.start_us = 0;
        self.pause_us = 0;
        self.paused = true;
        self.offset_ms = 0;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Song time in seconds, or `0.0` while paused.
    pub fn now(&self) -> f64 {
        self.now_millis() as f64 / 1000.0
    }

    /// Song time in whole milliseconds, or `0` while paused.
    pub fn now_millis(&self) -> i64 {
        if self.paused {
            0
        } else {
            self.transport.current_position_millis() + self.offset_ms
        }
    }

    pub fn adjust_offset(&mut self, delta_ms: i64) {
        self.offset_ms += delta_ms;
    }

    pub fn set_offset(&mut self, offset_ms: i64) {
        self.offset_ms = offset_ms;
    }

    pub fn offset(&self) -> i64 {
        self.offset_ms
    }

    /// Wall-clock time since [`SyncClock::start`], excluding paused spans.
    pub fn wall_elapsed_millis(&self) -> i64 {
        let reference = if self.paused {
            self.pause_us
        } else {
            self.time.now_us()
        };
        (reference - self.start_us).max(0) / 1000
    }

    /// How far the offset-corrected transport position runs ahead of the
    /// wall clock. Negative when audio lags. `0` while paused.
    pub fn drift_ms(&self) -> i64 {
        if self.paused {
            return 0;
        }
        self.now_millis() - self.wall_elapsed_millis()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestClock = SyncClock<SimulatedTransport, MockTimeProvider>;

    fn clock() -> (TestClock, SimulatedTransport, MockTimeProvider) {
        let transport = SimulatedTransport::new();
        let time = MockTimeProvider::new();
        let clock = SyncClock::with_time_provider(transport.clone(), time.clone());
        (clock, transport, time)
    }

    #[test]
    fn reads_transport_plus_offset() {
        let (mut clock, mut transport, _) = clock();
        transport.play();
        clock.start();
        transport.seek(1_500);

        assert_eq!(clock.now(), 1.5);
        clock.adjust_offset(20);
        clock.adjust_offset(30);
        assert_eq!(clock.offset(), 50);
        assert_eq!(clock.now_millis(), 1_550);
        assert!((clock.now() - 1.55).abs() < 1e-9);

        clock.set_offset(-100);
        assert_eq!(clock.now_millis(), 1_400);
    }

    #[test]
    fn paused_clock_reads_zero() {
        let (mut clock, mut transport, _) = clock();
        transport.seek(2_000);
        assert!(clock.is_paused());
        assert_eq!(clock.now(), 0.0);

        clock.start();
        assert_eq!(clock.now(), 2.0);
        clock.pause();
        assert_eq!(clock.now(), 0.0);
        assert_eq!(clock.now_millis(), 0);
    }

    #[test]
    fn pause_span_is_excluded_from_wall_time() {
        let (mut clock, _, time) = clock();
        clock.start();
        time.advance(1_000_000);
        clock.pause();
        clock.pause();
        time.advance(5_000_000);
        assert_eq!(clock.wall_elapsed_millis(), 1_000);

        clock.resume();
        assert_eq!(clock.wall_elapsed_millis(), 1_000);
        time.advance(500_000);
        assert_eq!(clock.wall_elapsed_millis(), 1_500);
    }

    #[test]
    fn resume_without_pause_is_ignored() {
        let (mut clock, _, time) = clock();
        clock.start();
        time.advance(2_000_000);
        clock.resume();
        assert_eq!(clock.wall_elapsed_millis(), 2_000);
    }

    #[test]
    fn drift_compares_transport_with_wall_clock() {
        let (mut clock, mut transport, time) = clock();
        transport.play();
        clock.start();
        time.advance(1_000_000);
        transport.advance_millis(960);
        assert_eq!(clock.drift_ms(), -40);

        clock.adjust_offset(40);
        assert_eq!(clock.drift_ms(), 0);
    }

    #[test]
    fn reset_restores_initial_state() {
        let (mut clock, mut transport, _) = clock();
        transport.seek(3_000);
        clock.start();
        clock.set_offset(25);
        clock.reset();

        assert!(clock.is_paused());
        assert_eq!(clock.offset(), 0);
        assert_eq!(clock.now(), 0.0);
    }

    #[test]
    fn simulated_transport_only_moves_while_playing() {
        let mut transport = SimulatedTransport::new();
        transport.advance_millis(100);
        assert_eq!(transport.current_position_millis(), 0);
        transport.play();
        transport.advance_millis(100);
        transport.pause();
        transport.advance_millis(100);
        assert_eq!(transport.current_position_millis(), 100);
    }
}
