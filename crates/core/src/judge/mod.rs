//! Input and time to judgment outcomes.
//!
//! Per-note state machine driven here:
//!
//! - `Pending` + press on a tap: `Hit` (perfect or good) or `Missed`.
//! - `Pending` + press on a hold: `Holding`, no score yet.
//! - `Holding` + release: `Hit` or `Missed`, graded on how close the held
//!   time came to the hold duration.
//! - `Holding` held past its duration: forced perfect `Hit` on the next tick.
//! - `Pending` later than the miss window on a tick: `Missed`.
//!
//! Every transition goes through this engine, which is what keeps a note from
//! being resolved twice.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::chart::{seconds_to_millis, LaneId, Note, NoteKind, Resolution};
use crate::config::JudgmentWindows;
use crate::effects::{EffectSink, SoundCue};
use crate::score::ScoreState;
use crate::timeline::{NoteId, NoteTimeline};

pub const PERFECT_TAP_POINTS: u64 = 200;
pub const GOOD_TAP_POINTS: u64 = 100;
pub const PERFECT_HOLD_POINTS: u64 = 100;
pub const GOOD_HOLD_POINTS: u64 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Judgment {
    Perfect,
    Good,
    Miss,
    /// A hold was accepted and is being tracked. Not a score event.
    Holding,
    /// Nothing was judged.
    None,
}

impl Judgment {
    pub fn is_scored(self) -> bool {
        matches!(self, Judgment::Perfect | Judgment::Good | Judgment::Miss)
    }
}

impl JudgmentWindows {
    /// Grades a timing difference in seconds. Both edges are inclusive at
    /// millisecond resolution.
    pub fn classify(&self, diff: f64) -> Judgment {
        let diff_ms = seconds_to_millis(diff).abs();
        if diff_ms <= seconds_to_millis(self.perfect) {
            Judgment::Perfect
        } else if diff_ms <= seconds_to_millis(self.good) {
            Judgment::Good
        } else {
            Judgment::Miss
        }
    }
}

/// Record published on the outcome stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutcomeEvent {
    pub result: Judgment,
    pub lane_id: LaneId,
    /// Clock reading in seconds at the transition.
    pub timestamp: f64,
    pub score: u64,
    pub combo: u32,
}

#[derive(Debug, Default)]
pub struct JudgmentEngine {
    windows: JudgmentWindows,
    score: ScoreState,
    /// Lane to the note held in it. One hold per lane.
    holds: BTreeMap<LaneId, NoteId>,
    outcomes: Vec<OutcomeEvent>,
}

impl JudgmentEngine {
    pub fn new(windows: JudgmentWindows) -> Self {
        Self {
            windows,
            ..Self::default()
        }
    }

    pub fn windows(&self) -> &JudgmentWindows {
        &self.windows
    }

    pub fn score(&self) -> &ScoreState {
        &self.score
    }

    pub fn is_holding(&self, lane_id: LaneId) -> bool {
        self.holds.contains_key(&lane_id)
    }

    pub fn holding_lanes(&self) -> impl Iterator<Item = LaneId> + '_ {
        self.holds.keys().copied()
    }

    /// Outcomes published since the last drain, oldest first.
    pub fn pending_outcomes(&self) -> &[OutcomeEvent] {
        &self.outcomes
    }

    pub fn drain_outcomes(&mut self) -> Vec<OutcomeEvent> {
        std::mem::take(&mut self.outcomes)
    }

    /// Judges a press in `lane_id` against the nearest unresolved note.
    pub fn on_press(
        &mut self,
        lane_id: LaneId,
        now: f64,
        timeline: &mut NoteTimeline,
        effects: &mut dyn EffectSink,
    ) -> Judgment {
        let Some(id) = timeline.best_candidate(lane_id, now) else {
            debug!(lane_id, now, "press with no eligible note");
            return Judgment::None;
        };
        let Some(note) = timeline.note_mut(id) else {
            return Judgment::None;
        };
        if !note.is_unresolved() {
            return Judgment::None;
        }

        match note.kind {
            NoteKind::Hold => {
                if self.holds.contains_key(&lane_id) {
                    debug!(lane_id, now, "press ignored, lane already holding");
                    return Judgment::None;
                }
                note.resolution = Resolution::Holding;
                note.hold_started_at = Some(now);
                self.holds.insert(lane_id, id);
                effects.play_cue(SoundCue::HoldStart);
                debug!(lane_id, note_time = note.target_time, now, "hold started");
                self.publish(Judgment::Holding, lane_id, now);
                Judgment::Holding
            }
            NoteKind::Tap => {
                let diff = (now - note.target_time).abs();
                let result = self.windows.classify(diff);
                debug!(
                    lane_id,
                    note_time = note.target_time,
                    now,
                    diff,
                    ?result,
                    "tap judged"
                );
                match result {
                    Judgment::Perfect => {
                        effects.trigger_hit_effect(lane_id);
                        self.award(note, Judgment::Perfect, PERFECT_TAP_POINTS, 2);
                        effects.play_cue(SoundCue::Perfect);
                    }
                    Judgment::Good => {
                        effects.trigger_hit_effect(lane_id);
                        self.award(note, Judgment::Good, GOOD_TAP_POINTS, 1);
                        effects.play_cue(SoundCue::Good);
                    }
                    _ => {
                        effects.trigger_miss_effect(lane_id);
                        self.fail(note);
                        effects.play_cue(SoundCue::Miss);
                    }
                }
                self.publish(result, lane_id, now);
                result
            }
        }
    }

    /// Ends the hold in `lane_id`, grading the held time against the hold
    /// duration. A release with no hold in the lane does nothing.
    pub fn on_release(
        &mut self,
        lane_id: LaneId,
        now: f64,
        timeline: &mut NoteTimeline,
        effects: &mut dyn EffectSink,
    ) -> Judgment {
        let Some(id) = self.holds.remove(&lane_id) else {
            return Judgment::None;
        };
        let Some(note) = timeline.note_mut(id) else {
            return Judgment::None;
        };
        if !note.is_holding() {
            return Judgment::None;
        }

        let held = now - note.hold_started_at.unwrap_or(now);
        let diff = (held - note.hold_duration).abs();
        let result = self.windows.classify(diff);
        debug!(
            lane_id,
            held,
            expected = note.hold_duration,
            diff,
            ?result,
            "hold released"
        );

        match result {
            Judgment::Perfect => {
                effects.complete_hold(lane_id);
                self.award(note, Judgment::Perfect, PERFECT_HOLD_POINTS, 1);
                effects.play_cue(SoundCue::Perfect);
            }
            Judgment::Good => {
                effects.complete_hold(lane_id);
                self.award(note, Judgment::Good, GOOD_HOLD_POINTS, 1);
                effects.play_cue(SoundCue::Good);
            }
            _ => {
                effects.trigger_miss_effect(lane_id);
                self.fail(note);
                effects.play_cue(SoundCue::Miss);
            }
        }
        effects.play_cue(SoundCue::HoldEnd);
        self.publish(result, lane_id, now);
        result
    }

    /// Expires unanswered notes past the miss window and completes holds
    /// held beyond their duration. Returns the number of transitions.
    pub fn tick(
        &mut self,
        now: f64,
        timeline: &mut NoteTimeline,
        effects: &mut dyn EffectSink,
    ) -> usize {
        let miss_ms = seconds_to_millis(self.windows.miss);
        let expired: Vec<NoteId> = timeline
            .active_notes()
            .filter(|(_, note)| {
                note.is_unresolved() && seconds_to_millis(now - note.target_time) > miss_ms
            })
            .map(|(id, _)| id)
            .collect();

        let mut transitions = 0;
        for id in expired {
            let Some(note) = timeline.note_mut(id) else {
                continue;
            };
            let lane_id = note.lane_id;
            debug!(lane_id, note_time = note.target_time, now, "note expired");
            effects.trigger_miss_effect(lane_id);
            self.fail(note);
            effects.play_cue(SoundCue::Miss);
            self.publish(Judgment::Miss, lane_id, now);
            transitions += 1;
        }

        let completed: Vec<(LaneId, NoteId)> = self
            .holds
            .iter()
            .filter(|(_, id)| {
                timeline.note(**id).is_some_and(|note| {
                    note.hold_started_at.is_some_and(|started| {
                        seconds_to_millis(now - started) > seconds_to_millis(note.hold_duration)
                    })
                })
            })
            .map(|(lane, id)| (*lane, *id))
            .collect();

        for (lane_id, id) in completed {
            self.holds.remove(&lane_id);
            let Some(note) = timeline.note_mut(id) else {
                continue;
            };
            if !note.is_holding() {
                continue;
            }
            debug!(lane_id, now, "hold completed");
            effects.complete_hold(lane_id);
            self.award(note, Judgment::Perfect, PERFECT_HOLD_POINTS, 1);
            effects.play_cue(SoundCue::Perfect);
            self.publish(Judgment::Perfect, lane_id, now);
            transitions += 1;
        }

        transitions
    }

    /// Zeroes the score and forgets every hold.
    pub fn reset(&mut self) {
        self.score.reset();
        self.holds.clear();
        self.outcomes.clear();
    }

    fn award(&mut self, note: &mut Note, result: Judgment, points: u64, combo: u32) {
        note.resolution = Resolution::Hit;
        match result {
            Judgment::Perfect => self.score.perfect_count += 1,
            _ => self.score.good_count += 1,
        }
        self.score.add_score(points);
        self.score.add_combo(combo);
    }

    fn fail(&mut self, note: &mut Note) {
        note.resolution = Resolution::Missed;
        self.score.miss_count += 1;
        self.score.break_combo();
    }

    fn publish(&mut self, result: Judgment, lane_id: LaneId, now: f64) {
        self.outcomes.push(OutcomeEvent {
            result,
            lane_id,
            timestamp: now,
            score: self.score.score,
            combo: self.score.combo,
        });
    }
}
