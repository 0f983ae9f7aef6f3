use crate::geometry::{Point2, Point3};
use crate::select::SelectionMethod;
use crate::sequence::TaskKind;

/// Session-constant descriptors stamped into every persisted row.
#[derive(Debug, Clone)]
pub struct SessionMeta {
    pub subject_id: u32,
    pub condition: String,
    pub task: String,
    pub group: String,
    pub task_kind: TaskKind,
    pub selection_method: SelectionMethod,
    pub repetitions: usize,
    pub trials_per_condition: usize,
}

/// One row of the event or movement log: the observable state of a single
/// tick or selection attempt.
#[derive(Debug, Clone)]
pub struct EventRecord {
    pub repetition: usize,
    pub amplitude: f64,
    pub width: f64,
    /// Overall index of the current target within the session plan.
    pub target_index: usize,
    pub target_name: String,
    pub nominal_id: f64,
    pub trial_duration_s: f64,
    pub last_target: Point2,
    pub current_target: Point2,
    pub mouse: Point2,
    pub distance: f64,
    pub target_size: f64,
    pub button_down: bool,
    pub hovered: bool,
    pub last_target_world: Point3,
    pub current_target_world: Point3,
    pub mouse_world: Point3,
}
