use crate::geometry::Point2;
use log::warn;

/// Width of the normal distribution capturing 96% of selection endpoints.
pub const EFFECTIVE_WIDTH_FACTOR: f64 = 4.133;

/// One selection attempt within a condition block. Non-error records carry
/// the kinematics of a completed trial; error records (mouse button misses)
/// only feed the error tally.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrialRecord {
    /// Pointer position when the trial began.
    pub from: Point2,
    /// Center of the target.
    pub to: Point2,
    /// Pointer position at the attempt.
    pub select: Point2,
    pub duration_s: f64,
    pub was_error: bool,
}

/// Aggregate metrics over one condition block.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockResult {
    pub condition: String,
    pub amplitude: f64,
    pub width: f64,
    /// log2(A/W + 1) of the nominal condition, rounded to 2 decimals.
    pub nominal_id: f64,
    pub effective_amplitude: f64,
    pub effective_width: f64,
    pub effective_id: f64,
    pub mean_time_s: f64,
    pub error_count: usize,
    pub error_rate: f64,
    pub throughput: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Regression {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
}

impl Regression {
    pub fn equation(&self) -> String {
        format!("y = {:.8}x + {:.8}", self.slope, self.intercept)
    }
}

/// Session-level aggregate over all block results.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryResult {
    pub nominal_id: f64,
    pub mean_time_s: f64,
    pub mean_error_rate: f64,
    pub mean_throughput: f64,
    pub regression: Regression,
}

/// Accumulates block results and closes the session with the across-block
/// regression of movement time on effective difficulty. Holds only scalar
/// aggregates, never raw trials.
#[derive(Debug, Default)]
pub struct EvaluationEngine {
    blocks: Vec<BlockResult>,
}

impl EvaluationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn blocks(&self) -> &[BlockResult] {
        &self.blocks
    }

    /// Computes the effective-width metrics for one closed block and
    /// accumulates the result.
    ///
    /// Per non-error record the selection endpoint is projected onto the
    /// movement axis via the law of cosines: with side lengths
    /// a = |from-to|, b = |select-to|, c = |from-select|, the signed
    /// deviation is dx = (c^2 - b^2 - a^2) / 2a and the effective amplitude
    /// of the movement is a + dx.
    ///
    /// Degenerate blocks (fewer than two selections) collapse the endpoint
    /// spread to zero and propagate infinite difficulty; the sentinel
    /// values are kept rather than failing.
    pub fn evaluate_block(
        &mut self,
        condition: &str,
        amplitude: f64,
        width: f64,
        records: &[TrialRecord],
    ) -> BlockResult {
        let mut dxs = Vec::with_capacity(records.len());
        let mut aes = Vec::with_capacity(records.len());
        let mut times = Vec::with_capacity(records.len());

        for record in records.iter().filter(|r| !r.was_error) {
            let a = record.from.distance(record.to);
            let b = record.select.distance(record.to);
            let c = record.from.distance(record.select);
            let dx = (c * c - b * b - a * a) / (2.0 * a);
            dxs.push(dx);
            aes.push(a + dx);
            times.push(record.duration_s);
        }

        if dxs.len() < 2 {
            warn!(
                "condition {condition}: only {} selections, endpoint spread is degenerate",
                dxs.len()
            );
        }

        let effective_width = EFFECTIVE_WIDTH_FACTOR * std_dev(&dxs);
        let effective_amplitude = mean(&aes);
        let mean_time_s = mean(&times);
        let error_count = records.iter().filter(|r| r.was_error).count();
        let error_rate = error_count as f64 / records.len() as f64;
        let effective_id = (effective_amplitude / effective_width + 1.0).log2();
        let throughput = effective_id / mean_time_s;

        let result = BlockResult {
            condition: condition.to_string(),
            amplitude,
            width,
            nominal_id: round2((amplitude / width + 1.0).log2()),
            effective_amplitude,
            effective_width,
            effective_id,
            mean_time_s,
            error_count,
            error_rate,
            throughput,
        };
        self.blocks.push(result.clone());
        result
    }

    /// Closes the session: arithmetic means across blocks plus the ordinary
    /// least squares regression of mean time on effective difficulty.
    pub fn finalize(&self) -> SummaryResult {
        let ids: Vec<f64> = self.blocks.iter().map(|b| b.effective_id).collect();
        let times: Vec<f64> = self.blocks.iter().map(|b| b.mean_time_s).collect();
        let errors: Vec<f64> = self.blocks.iter().map(|b| b.error_rate).collect();
        let throughputs: Vec<f64> = self.blocks.iter().map(|b| b.throughput).collect();
        let nominals: Vec<f64> = self.blocks.iter().map(|b| b.nominal_id).collect();

        SummaryResult {
            nominal_id: mean(&nominals),
            mean_time_s: mean(&times),
            mean_error_rate: mean(&errors),
            mean_throughput: mean(&throughputs),
            regression: linear_regression(&ids, &times),
        }
    }

    pub fn reset(&mut self) {
        self.blocks.clear();
    }
}

/// Arithmetic mean; NaN for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (divide by N); zero for fewer than two
/// values.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let sum_sq: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
    (sum_sq / values.len() as f64).sqrt()
}

/// Ordinary least squares fit of y on x. Degenerate inputs (fewer than two
/// points, or all x identical) report NaN throughout.
pub fn linear_regression(xs: &[f64], ys: &[f64]) -> Regression {
    debug_assert_eq!(xs.len(), ys.len());
    let n = xs.len() as f64;
    let sum_x: f64 = xs.iter().sum();
    let sum_y: f64 = ys.iter().sum();
    let sum_xx: f64 = xs.iter().map(|x| x * x).sum();
    let sum_xy: f64 = xs.iter().zip(ys).map(|(x, y)| x * y).sum();

    let denominator = n * sum_xx - sum_x * sum_x;
    if xs.len() < 2 || denominator == 0.0 {
        warn!("regression is degenerate over {} blocks", xs.len());
        return Regression {
            slope: f64::NAN,
            intercept: f64::NAN,
            r_squared: f64::NAN,
        };
    }

    let slope = (n * sum_xy - sum_x * sum_y) / denominator;
    let intercept = (sum_y - slope * sum_x) / n;

    let mean_y = sum_y / n;
    let ss_tot: f64 = ys.iter().map(|y| (y - mean_y) * (y - mean_y)).sum();
    let ss_res: f64 = xs
        .iter()
        .zip(ys)
        .map(|(x, y)| {
            let predicted = slope * x + intercept;
            (y - predicted) * (y - predicted)
        })
        .sum();
    let r_squared = 1.0 - ss_res / ss_tot;

    Regression {
        slope,
        intercept,
        r_squared,
    }
}

pub(crate) fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
