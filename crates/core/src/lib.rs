//! Timing-judgment core for a lane-based rhythm game.
//!
//! Three pieces cooperate on one logical timeline. [`SyncClock`] turns the
//! media transport's playback position into song time. [`NoteTimeline`]
//! admits chart notes into a working set as they approach. [`JudgmentEngine`]
//! turns presses, releases and ticks into judgments and score. [`Session`]
//! owns all three and is the object a host drives.

pub mod chart;
pub mod clock;
pub mod config;
pub mod effects;
pub mod error;
pub mod input;
pub mod judge;
pub mod score;
pub mod session;
pub mod timeline;

pub use chart::{parse_chart, ChartSummary, LaneId, Note, NoteKind, NoteSpec, Resolution};
pub use clock::{
    MediaTransport, MockTimeProvider, SimulatedTransport, SyncClock, SystemTimeProvider,
    TimeProvider,
};
pub use config::{JudgmentWindows, SessionConfig};
pub use effects::{Effect, EffectLog, EffectSink, NullEffects, SoundCue};
pub use error::{Result, RhythmError};
pub use input::{autoplay, parse_script, InputAction, InputEvent};
pub use judge::{Judgment, JudgmentEngine, OutcomeEvent};
pub use score::ScoreState;
pub use session::{Session, SessionHandle};
pub use timeline::{NoteId, NoteTimeline};
