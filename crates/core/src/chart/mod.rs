//! Chart records and the note state they turn into.
//!
//! A chart arrives as a JSON array of records:
//!
//! ```json
//! [{ "time": 1.0, "lane_id": 1, "type": "tap" },
//!  { "time": 2.0, "lane_id": 3, "type": "hold", "hold_duration": 1.5 }]
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Result, RhythmError};

pub type LaneId = u32;

/// Seconds to the nearest whole millisecond, the resolution of the song
/// clock. Timing comparisons go through this so decimal times land on the
/// side of a window edge they are written on.
pub fn seconds_to_millis(seconds: f64) -> i64 {
    (seconds * 1000.0).round() as i64
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteKind {
    Tap,
    Hold,
}

impl NoteKind {
    /// `"hold"` in any letter case is a hold; every other string is a tap.
    pub fn parse_lenient(value: &str) -> Self {
        if value.eq_ignore_ascii_case("hold") {
            NoteKind::Hold
        } else {
            NoteKind::Tap
        }
    }
}

/// Judgment state of a note. `Hit` and `Missed` are terminal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resolution {
    #[default]
    Pending,
    Holding,
    Hit,
    Missed,
}

impl Resolution {
    pub fn is_terminal(self) -> bool {
        matches!(self, Resolution::Hit | Resolution::Missed)
    }
}

/// Validated chart record.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteSpec {
    pub time: f64,
    pub lane_id: LaneId,
    pub kind: NoteKind,
    pub hold_duration: f64,
}

impl NoteSpec {
    pub fn tap(time: f64, lane_id: LaneId) -> Self {
        Self {
            time,
            lane_id,
            kind: NoteKind::Tap,
            hold_duration: 0.0,
        }
    }

    pub fn hold(time: f64, lane_id: LaneId, hold_duration: f64) -> Self {
        Self {
            time,
            lane_id,
            kind: NoteKind::Hold,
            hold_duration,
        }
    }

    /// Checks the values that the wire format cannot express as types.
    pub fn validate(&self, index: usize) -> Result<()> {
        if !self.time.is_finite() || self.time < 0.0 {
            return Err(RhythmError::chart_record(
                index,
                format!("time must be a non-negative number, got {}", self.time),
            ));
        }
        if !self.hold_duration.is_finite() || self.hold_duration < 0.0 {
            return Err(RhythmError::chart_record(
                index,
                format!("negative or invalid hold_duration {}", self.hold_duration),
            ));
        }
        Ok(())
    }

    /// Time at which the note stops being relevant for display.
    pub fn end_time(&self) -> f64 {
        match self.kind {
            NoteKind::Tap => self.time,
            NoteKind::Hold => self.time + self.hold_duration,
        }
    }
}

/// Record as it appears on the wire. Required fields are optional here so a
/// missing one can be reported with its record index.
#[derive(Debug, Deserialize)]
struct RawNoteRecord {
    time: Option<f64>,
    #[serde(alias = "pad_id")]
    lane_id: Option<LaneId>,
    #[serde(rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    hold_duration: Option<f64>,
}

impl RawNoteRecord {
    fn into_spec(self, index: usize) -> Result<NoteSpec> {
        let missing =
            |field: &str| RhythmError::chart_record(index, format!("missing field `{field}`"));

        let spec = NoteSpec {
            time: self.time.ok_or_else(|| missing("time"))?,
            lane_id: self.lane_id.ok_or_else(|| missing("lane_id"))?,
            kind: NoteKind::parse_lenient(&self.kind.ok_or_else(|| missing("type"))?),
            hold_duration: self.hold_duration.unwrap_or(0.0),
        };
        spec.validate(index)?;
        Ok(spec)
    }
}

/// Decodes and validates a chart document. Nothing is returned unless every
/// record is well formed.
pub fn parse_chart(json: &str) -> Result<Vec<NoteSpec>> {
    let values: Vec<serde_json::Value> = serde_json::from_str(json).map_err(|err| {
        RhythmError::chart_document(format!("expected an array of notes: {err}"))
    })?;

    values
        .into_iter()
        .enumerate()
        .map(|(index, value)| {
            let raw: RawNoteRecord = serde_json::from_value(value)
                .map_err(|err| RhythmError::chart_record(index, err.to_string()))?;
            raw.into_spec(index)
        })
        .collect()
}

/// A chart note together with its mutable judgment state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Note {
    pub target_time: f64,
    pub lane_id: LaneId,
    pub kind: NoteKind,
    pub hold_duration: f64,
    pub resolution: Resolution,
    pub hold_started_at: Option<f64>,
}

impl Note {
    pub fn is_unresolved(&self) -> bool {
        self.resolution == Resolution::Pending
    }

    pub fn is_holding(&self) -> bool {
        self.resolution == Resolution::Holding
    }

    pub fn reset(&mut self) {
        self.resolution = Resolution::Pending;
        self.hold_started_at = None;
    }
}

impl From<&NoteSpec> for Note {
    fn from(spec: &NoteSpec) -> Self {
        Self {
            target_time: spec.time,
            lane_id: spec.lane_id,
            kind: spec.kind,
            hold_duration: match spec.kind {
                NoteKind::Tap => 0.0,
                NoteKind::Hold => spec.hold_duration,
            },
            resolution: Resolution::Pending,
            hold_started_at: None,
        }
    }
}

/// Aggregate description of a chart, used for reporting.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChartSummary {
    pub total_notes: usize,
    pub taps: usize,
    pub holds: usize,
    pub notes_per_lane: BTreeMap<LaneId, usize>,
    pub first_note_time: Option<f64>,
    pub last_note_time: Option<f64>,
    /// Latest moment any note, hold tails included, is still in play.
    pub end_time: Option<f64>,
}

impl ChartSummary {
    pub fn from_specs(specs: &[NoteSpec]) -> Self {
        let mut summary = Self::default();
        for spec in specs {
            summary.total_notes += 1;
            match spec.kind {
                NoteKind::Tap => summary.taps += 1,
                NoteKind::Hold => summary.holds += 1,
            }
            *summary.notes_per_lane.entry(spec.lane_id).or_default() += 1;
            let end = spec.end_time();
            summary.first_note_time = Some(
                summary
                    .first_note_time
                    .map_or(spec.time, |t| t.min(spec.time)),
            );
            summary.last_note_time = Some(
                summary
                    .last_note_time
                    .map_or(spec.time, |t| t.max(spec.time)),
            );
            summary.end_time = Some(summary.end_time.map_or(end, |t| t.max(end)));
        }
        summary
    }

    /// Lanes referenced by the chart that fall outside `1..=lane_count`.
    pub fn lanes_outside(&self, lane_count: u32) -> Vec<LaneId> {
        self.notes_per_lane
            .keys()
            .copied()
            .filter(|lane| *lane == 0 || *lane > lane_count)
            .collect()
    }
}
