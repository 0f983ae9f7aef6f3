use crate::error::{FittsError, Result};
use crate::geometry::Point2;
use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};

pub const MIN_TRIALS_PER_CONDITION: usize = 3;
pub const MAX_TRIALS_PER_CONDITION: usize = 53;

// Baseline of the reciprocal tapping strip on the canvas.
const STRIP_BASELINE_Y: f64 = 0.5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskKind {
    #[default]
    OneDimensional,
    TwoDimensional,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::OneDimensional => "OneDimensional",
            TaskKind::TwoDimensional => "TwoDimensional",
        }
    }
}

/// One target in the session plan. Built once, never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialSpec {
    pub repetition: usize,
    pub amplitude: f64,
    pub width: f64,
    /// Index of this target within its condition block.
    pub index_in_condition: usize,
    /// Condition key shared by all targets of one block,
    /// e.g. `Target-0-100-20`.
    pub condition: String,
    pub position: Point2,
}

impl TrialSpec {
    /// Unique display name, e.g. `Target-0-100-20_4`.
    pub fn name(&self) -> String {
        format!("{}_{}", self.condition, self.index_in_condition)
    }

    /// Nominal index of difficulty of this trial's condition, log2(A/W + 1).
    pub fn nominal_id(&self) -> f64 {
        (self.amplitude / self.width + 1.0).log2()
    }
}

#[derive(Debug, Clone)]
pub struct PlanParams {
    pub amplitudes: Vec<f64>,
    pub widths: Vec<f64>,
    pub repetitions: usize,
    /// Must be odd and within [3, 53]; the config layer clamps before
    /// handing the value over, `build` re-validates.
    pub trials_per_condition: usize,
    pub task: TaskKind,
    pub randomize: bool,
    /// Subject identifier; drives the condition shuffle.
    pub seed: u64,
}

/// The full ordered target sequence for a session.
#[derive(Debug, Clone, Default)]
pub struct SessionPlan {
    trials: Vec<TrialSpec>,
}

impl SessionPlan {
    /// Expands the amplitude x width product into a flat trial sequence,
    /// one block of `trials_per_condition` targets per condition per
    /// repetition. With `randomize`, block order within each repetition is
    /// permuted by a Fisher-Yates shuffle seeded from `seed`, so the plan
    /// is a pure function of the parameters.
    pub fn build(params: &PlanParams) -> Result<Self> {
        validate(params)?;

        let n = params.trials_per_condition;
        let capacity = params.repetitions * params.amplitudes.len() * params.widths.len() * n;
        let mut trials = Vec::with_capacity(capacity);

        for repetition in 0..params.repetitions {
            let mut conditions: Vec<(f64, f64)> = params
                .amplitudes
                .iter()
                .flat_map(|&a| params.widths.iter().map(move |&w| (a, w)))
                .collect();
            if params.randomize {
                shuffle(&mut conditions, params.seed);
            }

            for (amplitude, width) in conditions {
                let condition = condition_key(repetition, amplitude, width);
                for index in 0..n {
                    trials.push(TrialSpec {
                        repetition,
                        amplitude,
                        width,
                        index_in_condition: index,
                        condition: condition.clone(),
                        position: target_position(params.task, amplitude, index, n),
                    });
                }
            }
        }

        Ok(Self { trials })
    }

    pub fn len(&self) -> usize {
        self.trials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trials.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&TrialSpec> {
        self.trials.get(index)
    }

    pub fn trials(&self) -> &[TrialSpec] {
        &self.trials
    }

    /// True when trial `index` is the last target of its condition block.
    pub fn is_block_end(&self, index: usize) -> bool {
        match (self.trials.get(index), self.trials.get(index + 1)) {
            (Some(current), Some(next)) => current.condition != next.condition,
            (Some(_), None) => true,
            _ => false,
        }
    }
}

fn validate(params: &PlanParams) -> Result<()> {
    if params.amplitudes.is_empty() {
        return Err(FittsError::InvalidParameter(
            "amplitudes must not be empty".to_string(),
        ));
    }
    if params.widths.is_empty() {
        return Err(FittsError::InvalidParameter(
            "widths must not be empty".to_string(),
        ));
    }
    if let Some(&a) = params.amplitudes.iter().find(|&&a| a <= 0.0) {
        return Err(FittsError::InvalidParameter(format!(
            "amplitudes must be positive, got {a}"
        )));
    }
    if let Some(&w) = params.widths.iter().find(|&&w| w <= 0.0) {
        return Err(FittsError::InvalidParameter(format!(
            "widths must be positive, got {w}"
        )));
    }
    if params.repetitions == 0 {
        return Err(FittsError::InvalidParameter(
            "at least one repetition is required".to_string(),
        ));
    }
    let n = params.trials_per_condition;
    if !(MIN_TRIALS_PER_CONDITION..=MAX_TRIALS_PER_CONDITION).contains(&n) || n % 2 == 0 {
        return Err(FittsError::InvalidParameter(format!(
            "trials_per_condition must be odd and within [{MIN_TRIALS_PER_CONDITION}, {MAX_TRIALS_PER_CONDITION}], got {n}"
        )));
    }
    Ok(())
}

// Fisher-Yates with a fresh generator per call: every repetition receives
// the same permutation for a given seed.
fn shuffle<T>(items: &mut [T], seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    for i in (1..items.len()).rev() {
        let j = rng.random_range(0..=i);
        items.swap(i, j);
    }
}

fn target_position(task: TaskKind, amplitude: f64, index: usize, trials_per_condition: usize) -> Point2 {
    match task {
        TaskKind::OneDimensional => {
            let side = if index % 2 == 0 { 1.0 } else { -1.0 };
            Point2::new(side * amplitude / 2.0, STRIP_BASELINE_Y)
        }
        TaskKind::TwoDimensional => {
            // Every-other-point visiting order around the ring: consecutive
            // targets land roughly diametrically opposed.
            let step = (360.0 / trials_per_condition as f64) / 2.0 + 180.0;
            let angle = (index as f64 * step + 180.0).to_radians();
            let radius = amplitude / 2.0;
            Point2::new(angle.cos() * radius, angle.sin() * radius)
        }
    }
}

fn condition_key(repetition: usize, amplitude: f64, width: f64) -> String {
    format!(
        "Target-{}-{}-{}",
        repetition,
        fmt_value(amplitude),
        fmt_value(width)
    )
}

/// Integral values print without a fractional part, e.g. `100` not `100.0`.
pub(crate) fn fmt_value(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 {
        format!("{}", v as i64)
    } else {
        format!("{v}")
    }
}
