pub mod config;
pub mod error;
pub mod evaluate;
pub mod export;
pub mod geometry;
pub mod host;
pub mod platform;
pub mod record;
pub mod runner;
pub mod select;
pub mod sequence;
pub mod sim;

pub use config::{InputConfig, InputMode, LoggingConfig, TaskConfig};
pub use error::{FittsError, Result};
pub use evaluate::{
    BlockResult, EvaluationEngine, Regression, SummaryResult, TrialRecord, linear_regression,
};
pub use export::CsvLogSink;
pub use geometry::{HitTest, Point2, Point3, hit_test};
pub use host::{
    AudioFeedback, InputSource, LogSink, NullAudio, NullPresentation, NullSink, Presentation,
    TrialSample,
};
pub use record::{EventRecord, SessionMeta};
pub use runner::{RunnerOptions, RunnerState, SelectionEvent, TrialRunner};
pub use select::{Attempt, SelectionArbiter, SelectionMethod};
pub use sequence::{PlanParams, SessionPlan, TaskKind, TrialSpec};
pub use sim::SimulatedPointer;
