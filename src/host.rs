use crate::error::Result;
use crate::evaluate::{BlockResult, SummaryResult};
use crate::geometry::{Point2, Point3};
use crate::record::EventRecord;
use crate::sequence::TrialSpec;

/// Per-tick pointer observation supplied by the input collaborator.
/// `button_down` is a level, not an edge; `timestamp_ns` must be monotonic
/// within a session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrialSample {
    pub canvas: Point2,
    pub world: Point3,
    pub button_down: bool,
    pub timestamp_ns: u64,
}

/// Visual host for targets and cursor. Rendering is entirely the host's
/// concern; the runner only reports transitions and never consults return
/// values.
pub trait Presentation {
    fn show_target(&mut self, spec: &TrialSpec);
    fn hide_target(&mut self, spec: &TrialSpec);
    fn set_cursor(&mut self, position: Point2);
}

/// Pull-based pointer source, queried once per tick.
pub trait InputSource {
    fn sample(&mut self) -> TrialSample;
}

pub trait AudioFeedback {
    fn play(&mut self);
}

/// Receives immutable structured records and owns their serialization and
/// persistence. The runner tolerates any error returned from here; failed
/// writes never disturb in-memory aggregation.
pub trait LogSink {
    fn log_event(&mut self, record: &EventRecord) -> Result<()>;
    fn log_movement(&mut self, record: &EventRecord) -> Result<()>;
    fn log_block(&mut self, result: &BlockResult) -> Result<()>;
    fn log_summary(&mut self, result: &SummaryResult) -> Result<()>;
}

/// No-op collaborators for headless sessions and tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullPresentation;

impl Presentation for NullPresentation {
    fn show_target(&mut self, _spec: &TrialSpec) {}
    fn hide_target(&mut self, _spec: &TrialSpec) {}
    fn set_cursor(&mut self, _position: Point2) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullAudio;

impl AudioFeedback for NullAudio {
    fn play(&mut self) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl LogSink for NullSink {
    fn log_event(&mut self, _record: &EventRecord) -> Result<()> {
        Ok(())
    }
    fn log_movement(&mut self, _record: &EventRecord) -> Result<()> {
        Ok(())
    }
    fn log_block(&mut self, _result: &BlockResult) -> Result<()> {
        Ok(())
    }
    fn log_summary(&mut self, _result: &SummaryResult) -> Result<()> {
        Ok(())
    }
}
