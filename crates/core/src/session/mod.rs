use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{info, warn};

use crate::chart::{parse_chart, LaneId, NoteSpec};
use crate::clock::{MediaTransport, SyncClock, SystemTimeProvider, TimeProvider};
use crate::effects::EffectSink;
use crate::judge::{Judgment, JudgmentEngine, OutcomeEvent};
use crate::score::ScoreState;
use crate::timeline::NoteTimeline;
use crate::{Result, RhythmError, SessionConfig};

/// State for one play: the clock, the chart timeline and the judgment engine,
/// driven together from a single execution context.
pub struct Session<T, P = SystemTimeProvider> {
    config: SessionConfig,
    clock: SyncClock<T, P>,
    timeline: NoteTimeline,
    engine: JudgmentEngine,
}

impl<T: MediaTransport> Session<T, SystemTimeProvider> {
    pub fn new(config: SessionConfig, transport: T) -> Result<Self> {
        Self::with_time_provider(config, transport, SystemTimeProvider::new())
    }
}

impl<T: MediaTransport, P: TimeProvider> Session<T, P> {
    pub fn with_time_provider(config: SessionConfig, transport: T, time: P) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            engine: JudgmentEngine::new(config.windows),
            clock: SyncClock::with_time_provider(transport, time),
            timeline: NoteTimeline::new(),
            config,
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn clock(&self) -> &SyncClock<T, P> {
        &self.clock
    }

    /// Access for drift correction and transport control.
    pub fn clock_mut(&mut self) -> &mut SyncClock<T, P> {
        &mut self.clock
    }

    pub fn timeline(&self) -> &NoteTimeline {
        &self.timeline
    }

    pub fn engine(&self) -> &JudgmentEngine {
        &self.engine
    }

    pub fn score(&self) -> &ScoreState {
        self.engine.score()
    }

    /// Replaces the chart. A malformed chart leaves the session untouched.
    pub fn load_chart(&mut self, specs: &[NoteSpec]) -> Result<()> {
        self.timeline.load(specs)?;
        self.engine.reset();
        info!(notes = specs.len(), "chart loaded");
        Ok(())
    }

    pub fn load_chart_json(&mut self, json: &str) -> Result<()> {
        let specs = parse_chart(json)?;
        self.load_chart(&specs)
    }

    /// Rewinds everything to the top of the chart and starts playback.
    pub fn start(&mut self) {
        self.clock.reset();
        self.timeline.reset();
        self.engine.reset();
        self.clock.set_offset(self.config.offset_ms);
        let transport = self.clock.transport_mut();
        transport.seek(0);
        transport.play();
        self.clock.start();
        info!(offset_ms = self.config.offset_ms, "session started");
    }

    pub fn restart(&mut self) {
        self.start();
    }

    /// Held notes stay held across a pause.
    pub fn pause(&mut self) {
        if self.clock.is_paused() {
            return;
        }
        self.clock.transport_mut().pause();
        self.clock.pause();
        info!(holds = self.engine.holding_lanes().count(), "session paused");
    }

    pub fn resume(&mut self) {
        if !self.clock.is_paused() {
            return;
        }
        self.clock.transport_mut().play();
        self.clock.resume();
        info!("session resumed");
    }

    pub fn is_paused(&self) -> bool {
        self.clock.is_paused()
    }

    pub fn now(&self) -> f64 {
        self.clock.now()
    }

    /// One fixed-rate step: admit upcoming notes, then expire stale ones.
    /// Does nothing while paused. Returns the number of judgment transitions.
    pub fn tick(&mut self, effects: &mut dyn EffectSink) -> usize {
        if self.clock.is_paused() {
            return 0;
        }
        let now = self.clock.now();
        self.timeline.advance(now, self.config.spawn_lookahead);
        self.engine.tick(now, &mut self.timeline, effects)
    }

    pub fn press(&mut self, lane_id: LaneId, effects: &mut dyn EffectSink) -> Judgment {
        if self.clock.is_paused() {
            warn!(lane_id, "press ignored while paused");
            return Judgment::None;
        }
        let now = self.clock.now();
        self.engine.on_press(lane_id, now, &mut self.timeline, effects)
    }

    pub fn release(&mut self, lane_id: LaneId, effects: &mut dyn EffectSink) -> Judgment {
        if self.clock.is_paused() {
            warn!(lane_id, "release ignored while paused");
            return Judgment::None;
        }
        let now = self.clock.now();
        self.engine.on_release(lane_id, now, &mut self.timeline, effects)
    }

    pub fn drain_outcomes(&mut self) -> Vec<OutcomeEvent> {
        self.engine.drain_outcomes()
    }

    /// True once every note has been admitted and resolved.
    pub fn is_finished(&self) -> bool {
        self.timeline.is_exhausted()
    }

    pub fn into_handle(self) -> SessionHandle<T, P> {
        SessionHandle {
            shared: Arc::new(Mutex::new(self)),
        }
    }
}

impl<T, P> fmt::Debug for Session<T, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("notes", &self.timeline.len())
            .field("active", &self.timeline.active_ids().len())
            .field("score", self.engine.score())
            .finish()
    }
}

/// Shared, lock-serialized view over a [`Session`], for hosts that deliver
/// input on a different thread from the tick loop.
pub struct SessionHandle<T, P = SystemTimeProvider> {
    shared: Arc<Mutex<Session<T, P>>>,
}

impl<T: MediaTransport, P: TimeProvider> SessionHandle<T, P> {
    pub fn lock(&self) -> Result<MutexGuard<'_, Session<T, P>>> {
        self.shared
            .lock()
            .map_err(|_| RhythmError::msg("session state has been poisoned"))
    }

    pub fn tick(&self, effects: &mut dyn EffectSink) -> Result<usize> {
        Ok(self.lock()?.tick(effects))
    }

    pub fn press(&self, lane_id: LaneId, effects: &mut dyn EffectSink) -> Result<Judgment> {
        Ok(self.lock()?.press(lane_id, effects))
    }

    pub fn release(&self, lane_id: LaneId, effects: &mut dyn EffectSink) -> Result<Judgment> {
        Ok(self.lock()?.release(lane_id, effects))
    }

    pub fn score(&self) -> Result<ScoreState> {
        Ok(self.lock()?.score().clone())
    }
}

impl<T, P> Clone for SessionHandle<T, P> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T, P> fmt::Debug for SessionHandle<T, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionHandle").finish()
    }
}
