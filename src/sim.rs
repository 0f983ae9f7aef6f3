use crate::geometry::Point2;
use crate::host::{InputSource, TrialSample};
use crate::select::SelectionMethod;
use rand::{Rng, SeedableRng, rngs::StdRng};

// Host cadence of the original task, ~90 Hz.
const TICK_NS: u64 = 11_000_000;

/// Deterministic synthetic participant for headless sessions.
///
/// Each tick the pointer closes a fixed fraction of the gap to the current
/// goal with seeded jitter, then settles inside the target and selects:
/// a single press under the mouse button method, motionless hover under
/// dwell. The clock advances a fixed 11 ms per sample, so a run is fully
/// reproducible for a given seed.
pub struct SimulatedPointer {
    rng: StdRng,
    method: SelectionMethod,
    pointer: Point2,
    goal: Point2,
    goal_half_width: f64,
    now_ns: u64,
    pressed_last_tick: bool,
}

impl SimulatedPointer {
    pub fn new(seed: u64, method: SelectionMethod) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            method,
            pointer: Point2::default(),
            goal: Point2::default(),
            goal_half_width: 1.0,
            now_ns: 0,
            pressed_last_tick: false,
        }
    }

    /// Points the participant at the current target.
    pub fn set_goal(&mut self, center: Point2, width: f64) {
        self.goal = center;
        self.goal_half_width = width / 2.0;
    }
}

impl InputSource for SimulatedPointer {
    fn sample(&mut self) -> TrialSample {
        self.now_ns += TICK_NS;

        // Settled well inside the tolerance radius; works for discs and,
        // near the strip baseline, for 1D rectangles.
        let settled = self.pointer.distance(self.goal) <= self.goal_half_width * 0.9;
        if !settled {
            let jitter = self.goal_half_width * 0.1;
            self.pointer.x +=
                (self.goal.x - self.pointer.x) * 0.4 + self.rng.random_range(-jitter..=jitter);
            self.pointer.y +=
                (self.goal.y - self.pointer.y) * 0.4 + self.rng.random_range(-jitter..=jitter);
        }

        let settled = self.pointer.distance(self.goal) <= self.goal_half_width * 0.9;
        let button_down = match self.method {
            SelectionMethod::MouseButton => settled && !self.pressed_last_tick,
            SelectionMethod::DwellTime => false,
        };
        self.pressed_last_tick = button_down;

        TrialSample {
            canvas: self.pointer,
            world: self.pointer.into(),
            button_down,
            timestamp_ns: self.now_ns,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_reproduces_the_trajectory() {
        let mut a = SimulatedPointer::new(5, SelectionMethod::MouseButton);
        let mut b = SimulatedPointer::new(5, SelectionMethod::MouseButton);
        a.set_goal(Point2::new(100.0, 50.0), 20.0);
        b.set_goal(Point2::new(100.0, 50.0), 20.0);

        for _ in 0..50 {
            assert_eq!(a.sample(), b.sample());
        }
    }

    #[test]
    fn test_pointer_reaches_and_presses_the_goal() {
        let mut sim = SimulatedPointer::new(1, SelectionMethod::MouseButton);
        sim.set_goal(Point2::new(200.0, 0.0), 40.0);

        let mut pressed_at = None;
        for tick in 0..200 {
            let sample = sim.sample();
            if sample.button_down {
                pressed_at = Some((tick, sample.canvas));
                break;
            }
        }
        let (_, position) = pressed_at.expect("pointer never settled");
        assert!(position.distance(Point2::new(200.0, 0.0)) <= 20.0);
    }

    #[test]
    fn test_dwell_mode_never_presses() {
        let mut sim = SimulatedPointer::new(2, SelectionMethod::DwellTime);
        sim.set_goal(Point2::new(50.0, 0.0), 20.0);

        for _ in 0..100 {
            assert!(!sim.sample().button_down);
        }
    }

    #[test]
    fn test_clock_advances_per_sample() {
        let mut sim = SimulatedPointer::new(3, SelectionMethod::MouseButton);
        let first = sim.sample().timestamp_ns;
        let second = sim.sample().timestamp_ns;
        assert_eq!(second - first, TICK_NS);
    }
}
