use serde::Serialize;

use crate::chart::LaneId;

/// Receiver of fire-once presentation side effects. Nothing it does feeds
/// back into judgment.
pub trait EffectSink {
    fn trigger_hit_effect(&mut self, _lane_id: LaneId) {}
    fn trigger_miss_effect(&mut self, _lane_id: LaneId) {}
    fn complete_hold(&mut self, _lane_id: LaneId) {}
    fn play_cue(&mut self, _cue: SoundCue) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SoundCue {
    Perfect,
    Good,
    Miss,
    HoldStart,
    HoldEnd,
}

/// Sink that drops every effect.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullEffects;

impl EffectSink for NullEffects {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Effect {
    Hit(LaneId),
    Miss(LaneId),
    HoldComplete(LaneId),
    Cue(SoundCue),
}

/// Sink that records every effect in call order.
#[derive(Debug, Default, Clone)]
pub struct EffectLog {
    effects: Vec<Effect>,
}

impl EffectLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn effects(&self) -> &[Effect] {
        &self.effects
    }

    pub fn count(&self, effect: Effect) -> usize {
        self.effects.iter().filter(|e| **e == effect).count()
    }

    pub fn clear(&mut self) {
        self.effects.clear();
    }
}

impl EffectSink for EffectLog {
    fn trigger_hit_effect(&mut self, lane_id: LaneId) {
        self.effects.push(Effect::Hit(lane_id));
    }

    fn trigger_miss_effect(&mut self, lane_id: LaneId) {
        self.effects.push(Effect::Miss(lane_id));
    }

    fn complete_hold(&mut self, lane_id: LaneId) {
        self.effects.push(Effect::HoldComplete(lane_id));
    }

    fn play_cue(&mut self, cue: SoundCue) {
        self.effects.push(Effect::Cue(cue));
    }
}
