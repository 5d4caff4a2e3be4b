use serde::{Deserialize, Serialize};

use crate::chart::{LaneId, NoteKind, NoteSpec};
use crate::{Result, RhythmError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputAction {
    Press,
    Release,
}

/// One scripted pad event at a song time in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputEvent {
    pub time: f64,
    #[serde(alias = "pad_id")]
    pub lane_id: LaneId,
    pub action: InputAction,
}

impl InputEvent {
    pub fn press(time: f64, lane_id: LaneId) -> Self {
        Self {
            time,
            lane_id,
            action: InputAction::Press,
        }
    }

    pub fn release(time: f64, lane_id: LaneId) -> Self {
        Self {
            time,
            lane_id,
            action: InputAction::Release,
        }
    }
}

/// Decodes a JSON array of input events and orders it by time. Events at the
/// same time keep their document order.
pub fn parse_script(json: &str) -> Result<Vec<InputEvent>> {
    let mut events: Vec<InputEvent> = serde_json::from_str(json)?;
    if let Some(bad) = events.iter().find(|event| !event.time.is_finite()) {
        return Err(RhythmError::msg(format!(
            "input event on lane {} has an invalid time",
            bad.lane_id
        )));
    }
    events.sort_by(|a, b| a.time.total_cmp(&b.time));
    Ok(events)
}

/// Script that presses every note on time and releases holds at the end of
/// their duration. Taps get no release, so a tap inside a hold in the same
/// lane cannot cut the hold short.
pub fn autoplay(chart: &[NoteSpec]) -> Vec<InputEvent> {
    let mut events = Vec::with_capacity(chart.len() * 2);
    for note in chart {
        events.push(InputEvent::press(note.time, note.lane_id));
        if note.kind == NoteKind::Hold {
            events.push(InputEvent::release(note.end_time(), note.lane_id));
        }
    }
    events.sort_by(|a, b| a.time.total_cmp(&b.time));
    events
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_orders_script() {
        let events = parse_script(
            r#"[
                { "time": 3.5, "lane_id": 3, "action": "release" },
                { "time": 1.05, "pad_id": 1, "action": "press" },
                { "time": 2.0, "lane_id": 3, "action": "press" }
            ]"#,
        )
        .unwrap();

        assert_eq!(
            events,
            vec![
                InputEvent::press(1.05, 1),
                InputEvent::press(2.0, 3),
                InputEvent::release(3.5, 3),
            ]
        );
    }

    #[test]
    fn rejects_unknown_actions() {
        let err =
            parse_script(r#"[{ "time": 1.0, "lane_id": 1, "action": "wiggle" }]"#).unwrap_err();
        assert!(matches!(err, RhythmError::Json(_)));
    }

    #[test]
    fn autoplay_presses_on_time_and_releases_holds_at_tail() {
        let events = autoplay(&[NoteSpec::hold(2.0, 3, 1.5), NoteSpec::tap(1.0, 1)]);

        assert_eq!(
            events,
            vec![
                InputEvent::press(1.0, 1),
                InputEvent::press(2.0, 3),
                InputEvent::release(3.5, 3),
            ]
        );
    }

    #[test]
    fn autoplay_tap_inside_hold_leaves_hold_running() {
        let events = autoplay(&[NoteSpec::hold(1.0, 2, 2.0), NoteSpec::tap(2.0, 2)]);

        assert_eq!(
            events,
            vec![
                InputEvent::press(1.0, 2),
                InputEvent::press(2.0, 2),
                InputEvent::release(3.0, 2),
            ]
        );
    }
}
