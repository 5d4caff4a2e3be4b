use tracing::debug;

use crate::chart::{
    parse_chart, seconds_to_millis, LaneId, Note, NoteKind, NoteSpec, Resolution,
};
use crate::Result;

/// Index of a note in the loaded chart.
pub type NoteId = usize;

/// Owns the chart and the working set of notes eligible for judgment.
///
/// Notes are admitted through a monotonic cursor over the time-sorted chart,
/// so earlier notes are never scanned again. The timeline only retires notes
/// that are already resolved. Expiring unanswered notes is the judgment
/// engine's job.
#[derive(Debug, Default)]
pub struct NoteTimeline {
    notes: Vec<Note>,
    active: Vec<NoteId>,
    next_note: usize,
}

impl NoteTimeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the chart. On error the current chart and working set are
    /// left as they were.
    pub fn load(&mut self, specs: &[NoteSpec]) -> Result<()> {
        for (index, spec) in specs.iter().enumerate() {
            spec.validate(index)?;
        }

        let mut notes: Vec<Note> = specs.iter().map(Note::from).collect();
        notes.sort_by(|a, b| a.target_time.total_cmp(&b.target_time));

        self.notes = notes;
        self.next_note = 0;
        self.active.clear();
        debug!(notes = self.notes.len(), "chart loaded into timeline");
        Ok(())
    }

    pub fn load_json(&mut self, json: &str) -> Result<()> {
        let specs = parse_chart(json)?;
        self.load(&specs)
    }

    /// Admits every note whose target lies within `spawn_lookahead` of `now`,
    /// then drops resolved notes from the working set. Returns the number of
    /// notes admitted.
    pub fn advance(&mut self, now: f64, spawn_lookahead: f64) -> usize {
        let mut admitted = 0;
        while let Some(note) = self.notes.get(self.next_note) {
            if note.target_time - now <= spawn_lookahead {
                self.active.push(self.next_note);
                self.next_note += 1;
                admitted += 1;
            } else {
                break;
            }
        }

        let notes = &self.notes;
        self.active.retain(|id| !is_retired(&notes[*id], now));
        admitted
    }

    pub fn active_ids(&self) -> &[NoteId] {
        &self.active
    }

    /// Active notes paired with their ids, in admission order.
    pub fn active_notes(&self) -> impl Iterator<Item = (NoteId, &Note)> + '_ {
        self.active.iter().map(move |id| (*id, &self.notes[*id]))
    }

    /// Owned copy of the working set for renderers.
    pub fn active_snapshot(&self) -> Vec<Note> {
        self.active.iter().map(|id| self.notes[*id].clone()).collect()
    }

    /// The unresolved active note in `lane_id` closest to `now`. Ties go to
    /// the note admitted first.
    pub fn best_candidate(&self, lane_id: LaneId, now: f64) -> Option<NoteId> {
        self.active_notes()
            .filter(|(_, note)| note.lane_id == lane_id && note.is_unresolved())
            .min_by(|(_, a), (_, b)| {
                (a.target_time - now)
                    .abs()
                    .total_cmp(&(b.target_time - now).abs())
            })
            .map(|(id, _)| id)
    }

    pub fn note(&self, id: NoteId) -> Option<&Note> {
        self.notes.get(id)
    }

    pub(crate) fn note_mut(&mut self, id: NoteId) -> Option<&mut Note> {
        self.notes.get_mut(id)
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// True once every note has been admitted and retired.
    pub fn is_exhausted(&self) -> bool {
        self.next_note >= self.notes.len() && self.active.is_empty()
    }

    /// Rewinds to the start of the chart without reloading it.
    pub fn reset(&mut self) {
        self.next_note = 0;
        self.active.clear();
        for note in &mut self.notes {
            note.reset();
        }
    }
}

fn is_retired(note: &Note, now: f64) -> bool {
    match (note.kind, note.resolution) {
        (_, Resolution::Missed) => true,
        (NoteKind::Tap, Resolution::Hit) => true,
        // Keep a hit hold on screen until its tail has elapsed.
        (NoteKind::Hold, Resolution::Hit) => note.hold_started_at.is_none_or(|started| {
            seconds_to_millis(now - started) >= seconds_to_millis(note.hold_duration)
        }),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timeline(specs: &[NoteSpec]) -> NoteTimeline {
        let mut timeline = NoteTimeline::new();
        timeline.load(specs).unwrap();
        timeline
    }

    #[test]
    fn load_sorts_by_target_time() {
        let timeline = timeline(&[
            NoteSpec::tap(3.0, 1),
            NoteSpec::tap(1.0, 2),
            NoteSpec::hold(2.0, 3, 1.0),
        ]);

        let times: Vec<f64> = timeline.notes().iter().map(|n| n.target_time).collect();
        assert_eq!(times, vec![1.0, 2.0, 3.0]);
        assert!(timeline.active_ids().is_empty());
    }

    #[test]
    fn admits_within_lookahead_only() {
        let mut timeline = timeline(&[NoteSpec::tap(1.0, 1), NoteSpec::tap(2.0, 1)]);

        assert_eq!(timeline.advance(0.5, 0.3), 0);
        assert_eq!(timeline.advance(0.75, 0.3), 1);
        assert_eq!(timeline.active_ids(), &[0]);
        assert_eq!(timeline.advance(1.75, 0.3), 1);
        assert_eq!(timeline.active_ids(), &[0, 1]);
        assert_eq!(timeline.advance(1.8, 0.3), 0);
    }

    #[test]
    fn retires_hit_taps_and_missed_notes() {
        let mut timeline = timeline(&[
            NoteSpec::tap(1.0, 1),
            NoteSpec::tap(1.1, 2),
            NoteSpec::tap(1.2, 3),
        ]);
        timeline.advance(1.0, 0.3);
        timeline.note_mut(0).unwrap().resolution = Resolution::Hit;
        timeline.note_mut(1).unwrap().resolution = Resolution::Missed;

        timeline.advance(1.0, 0.3);
        assert_eq!(timeline.active_ids(), &[2]);
    }

    #[test]
    fn hit_hold_stays_until_tail_elapses() {
        let mut timeline = timeline(&[NoteSpec::hold(2.0, 3, 1.5)]);
        timeline.advance(2.0, 0.3);
        {
            let note = timeline.note_mut(0).unwrap();
            note.resolution = Resolution::Holding;
            note.hold_started_at = Some(2.0);
        }

        timeline.advance(3.0, 0.3);
        assert_eq!(timeline.active_ids(), &[0]);

        timeline.note_mut(0).unwrap().resolution = Resolution::Hit;
        timeline.advance(3.2, 0.3);
        assert_eq!(timeline.active_ids(), &[0]);
        timeline.advance(3.5, 0.3);
        assert!(timeline.active_ids().is_empty());
        assert!(timeline.is_exhausted());
    }

    #[test]
    fn unresolved_notes_are_never_expired_here() {
        let mut timeline = timeline(&[NoteSpec::tap(1.0, 1)]);
        timeline.advance(1.0, 0.3);
        timeline.advance(10.0, 0.3);
        assert_eq!(timeline.active_ids(), &[0]);
        assert_eq!(timeline.note(0).unwrap().resolution, Resolution::Pending);
    }

    #[test]
    fn best_candidate_prefers_nearest_unresolved_note() {
        let mut timeline = timeline(&[
            NoteSpec::tap(1.0, 1),
            NoteSpec::tap(1.2, 1),
            NoteSpec::tap(1.1, 2),
        ]);
        timeline.advance(1.0, 0.3);

        // Sorted ids: 0 = 1.0 lane 1, 1 = 1.1 lane 2, 2 = 1.2 lane 1.
        assert_eq!(timeline.best_candidate(1, 1.15), Some(2));
        assert_eq!(timeline.best_candidate(1, 1.0), Some(0));
        assert_eq!(timeline.best_candidate(2, 1.0), Some(1));
        assert_eq!(timeline.best_candidate(4, 1.0), None);

        timeline.note_mut(2).unwrap().resolution = Resolution::Hit;
        assert_eq!(timeline.best_candidate(1, 1.15), Some(0));
    }

    #[test]
    fn best_candidate_tie_goes_to_earlier_admission() {
        let mut timeline = timeline(&[NoteSpec::tap(1.0, 1), NoteSpec::tap(1.5, 1)]);
        timeline.advance(1.25, 0.3);
        assert_eq!(timeline.best_candidate(1, 1.25), Some(0));
    }

    #[test]
    fn failed_load_keeps_previous_chart() {
        let mut timeline = timeline(&[NoteSpec::tap(1.0, 1)]);
        timeline.advance(1.0, 0.3);

        let err = timeline
            .load(&[NoteSpec::tap(2.0, 1), NoteSpec::hold(3.0, 1, -1.0)])
            .unwrap_err();
        assert!(err.is_chart_format());
        assert_eq!(timeline.len(), 1);
        assert_eq!(timeline.active_ids(), &[0]);
    }

    #[test]
    fn reset_rewinds_without_reloading() {
        let mut timeline = timeline(&[NoteSpec::tap(1.0, 1), NoteSpec::hold(1.2, 2, 1.0)]);
        timeline.advance(1.0, 0.3);
        timeline.note_mut(0).unwrap().resolution = Resolution::Hit;
        {
            let hold = timeline.note_mut(1).unwrap();
            hold.resolution = Resolution::Holding;
            hold.hold_started_at = Some(1.2);
        }

        timeline.reset();

        assert_eq!(timeline.len(), 2);
        assert!(timeline.active_ids().is_empty());
        assert!(timeline
            .notes()
            .iter()
            .all(|n| n.resolution == Resolution::Pending && n.hold_started_at.is_none()));
        assert_eq!(timeline.advance(1.0, 0.3), 2);
    }

    #[test]
    fn loads_from_json() {
        let mut timeline = NoteTimeline::new();
        timeline
            .load_json(r#"[{ "time": 1.0, "lane_id": 1, "type": "tap", "hold_duration": 0 }]"#)
            .unwrap();
        assert_eq!(timeline.len(), 1);
        assert_eq!(timeline.active_snapshot().len(), 0);
    }
}
