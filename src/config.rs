use crate::error::{FittsError, Result};
use crate::record::SessionMeta;
use crate::runner::RunnerOptions;
use crate::select::SelectionMethod;
use crate::sequence::{
    MAX_TRIALS_PER_CONDITION, MIN_TRIALS_PER_CONDITION, PlanParams, TaskKind,
};
use serde::{Deserialize, Serialize};
use std::{
    env,
    path::{Path, PathBuf},
};

pub const ENV_OUTPUT_DIR: &str = "FITTS_TASK_OUTPUT_DIR";

/// Full session configuration, loaded from a TOML file with the original
/// task defaults filled in for anything omitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskConfig {
    pub subject_id: u32,
    pub condition: String,
    pub task: String,
    pub group: String,
    pub task_type: TaskKind,
    pub selection_method: SelectionMethod,
    pub dwell_time_ms: u64,
    /// Read through `trials_per_condition()`, which forces the value odd
    /// and clamps it to the supported range.
    number_of_trials: usize,
    pub number_of_repetitions: usize,
    pub amplitudes: Vec<f64>,
    pub widths: Vec<f64>,
    pub randomize_conditions: bool,
    pub audio_feedback: bool,
    pub input: InputConfig,
    pub logging: LoggingConfig,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            subject_id: 0,
            condition: String::new(),
            task: String::new(),
            group: String::new(),
            task_type: TaskKind::default(),
            selection_method: SelectionMethod::default(),
            dwell_time_ms: 0,
            number_of_trials: 15,
            number_of_repetitions: 1,
            amplitudes: vec![100.0, 300.0, 500.0],
            widths: vec![20.0, 40.0, 80.0],
            randomize_conditions: true,
            audio_feedback: true,
            input: InputConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InputMode {
    #[default]
    Simulated,
    Device,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub mode: InputMode,
    pub simulation_seed: u64,
    /// Screen position of the canvas origin, used by the live device
    /// adapter to map OS pointer coordinates into the canvas frame.
    pub canvas_origin_x: f64,
    pub canvas_origin_y: f64,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            mode: InputMode::Simulated,
            simulation_seed: 0,
            canvas_origin_x: 0.0,
            canvas_origin_y: 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub save_events: bool,
    pub events_dir: PathBuf,
    pub save_movements: bool,
    pub movements_dir: PathBuf,
    pub save_evaluation: bool,
    pub evaluation_dir: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            save_events: true,
            events_dir: PathBuf::from("results/events"),
            save_movements: false,
            movements_dir: PathBuf::from("results/movements"),
            save_evaluation: true,
            evaluation_dir: PathBuf::from("results/evaluation"),
        }
    }
}

impl TaskConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            FittsError::Config(format!(
                "Failed to read config file '{}': {e}",
                path.display()
            ))
        })?;

        let mut config: TaskConfig = toml::from_str(&content)?;
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Re-roots all log directories under `FITTS_TASK_OUTPUT_DIR` when the
    /// variable is set and non-empty.
    pub fn apply_env(&mut self) -> Result<()> {
        if let Ok(dir) = env::var(ENV_OUTPUT_DIR)
            && !dir.trim().is_empty()
        {
            let root = PathBuf::from(dir);
            if root.exists() && !root.is_dir() {
                return Err(FittsError::Config(format!(
                    "Output path is not a directory: {}",
                    root.display()
                )));
            }
            self.logging.events_dir = root.join("events");
            self.logging.movements_dir = root.join("movements");
            self.logging.evaluation_dir = root.join("evaluation");
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.amplitudes.is_empty() {
            return Err(FittsError::InvalidParameter(
                "amplitudes must not be empty".to_string(),
            ));
        }
        if self.widths.is_empty() {
            return Err(FittsError::InvalidParameter(
                "widths must not be empty".to_string(),
            ));
        }
        if let Some(&a) = self.amplitudes.iter().find(|&&a| a <= 0.0) {
            return Err(FittsError::InvalidParameter(format!(
                "amplitudes must be positive, got {a}"
            )));
        }
        if let Some(&w) = self.widths.iter().find(|&&w| w <= 0.0) {
            return Err(FittsError::InvalidParameter(format!(
                "widths must be positive, got {w}"
            )));
        }
        if self.number_of_repetitions == 0 {
            return Err(FittsError::InvalidParameter(
                "number_of_repetitions must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Trial count per condition, forced odd and clamped to [3, 53].
    pub fn trials_per_condition(&self) -> usize {
        clamp_trials(self.number_of_trials)
    }

    pub fn set_number_of_trials(&mut self, n: usize) {
        self.number_of_trials = clamp_trials(n);
    }

    pub fn plan_params(&self) -> PlanParams {
        PlanParams {
            amplitudes: self.amplitudes.clone(),
            widths: self.widths.clone(),
            repetitions: self.number_of_repetitions,
            trials_per_condition: self.trials_per_condition(),
            task: self.task_type,
            randomize: self.randomize_conditions,
            seed: self.subject_id as u64,
        }
    }

    pub fn session_meta(&self) -> SessionMeta {
        SessionMeta {
            subject_id: self.subject_id,
            condition: self.condition.clone(),
            task: self.task.clone(),
            group: self.group.clone(),
            task_kind: self.task_type,
            selection_method: self.selection_method,
            repetitions: self.number_of_repetitions,
            trials_per_condition: self.trials_per_condition(),
        }
    }

    pub fn runner_options(&self) -> RunnerOptions {
        RunnerOptions {
            save_events: self.logging.save_events,
            save_movements: self.logging.save_movements,
            save_evaluation: self.logging.save_evaluation,
            audio_feedback: self.audio_feedback,
        }
    }
}

fn clamp_trials(n: usize) -> usize {
    (n | 1).clamp(MIN_TRIALS_PER_CONDITION, MAX_TRIALS_PER_CONDITION)
}
