use crate::evaluate::{EvaluationEngine, SummaryResult, TrialRecord, round2};
use crate::geometry::{self, HitTest, Point2, Point3};
use crate::host::{AudioFeedback, LogSink, Presentation, TrialSample};
use crate::record::{EventRecord, SessionMeta};
use crate::select::SelectionArbiter;
use crate::sequence::{SessionPlan, TrialSpec};
use log::{debug, info, warn};

/// Reported to the host when a target is successfully selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionEvent {
    pub target_index: usize,
    /// True when this selection exhausted the plan.
    pub session_complete: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerState {
    Presenting(usize),
    Ended,
}

/// Emission switches for a session. Evaluation always runs in memory; the
/// flags only gate what reaches the log sink.
#[derive(Debug, Clone, Copy)]
pub struct RunnerOptions {
    pub save_events: bool,
    pub save_movements: bool,
    pub save_evaluation: bool,
    pub audio_feedback: bool,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            save_events: true,
            save_movements: false,
            save_evaluation: true,
            audio_feedback: true,
        }
    }
}

/// Walks the session plan one sampled frame at a time.
///
/// Each `on_sample` call hit-tests the pointer against the current target,
/// asks the arbiter whether a selection attempt occurred and appends the
/// attempt to the active block buffer. A hit advances the plan; crossing a
/// condition boundary first closes the block through the evaluation engine.
/// At most one block of raw records is held at any time.
pub struct TrialRunner<P, A, L> {
    plan: SessionPlan,
    meta: SessionMeta,
    options: RunnerOptions,
    arbiter: SelectionArbiter,
    engine: EvaluationEngine,
    presenter: P,
    audio: A,
    sink: L,
    state: RunnerState,
    trial_start_ns: Option<u64>,
    origin: Point2,
    origin_world: Point3,
    last_index: Option<usize>,
    records: Vec<TrialRecord>,
    summary: Option<SummaryResult>,
}

impl<P, A, L> TrialRunner<P, A, L>
where
    P: Presentation,
    A: AudioFeedback,
    L: LogSink,
{
    pub fn new(
        plan: SessionPlan,
        meta: SessionMeta,
        arbiter: SelectionArbiter,
        options: RunnerOptions,
        presenter: P,
        audio: A,
        sink: L,
    ) -> Self {
        let state = if plan.is_empty() {
            RunnerState::Ended
        } else {
            RunnerState::Presenting(0)
        };
        let mut runner = Self {
            plan,
            meta,
            options,
            arbiter,
            engine: EvaluationEngine::new(),
            presenter,
            audio,
            sink,
            state,
            trial_start_ns: None,
            origin: Point2::default(),
            origin_world: Point3::default(),
            last_index: None,
            records: Vec::new(),
            summary: None,
        };
        runner.present_first_target();
        runner
    }

    pub fn state(&self) -> RunnerState {
        self.state
    }

    pub fn current_target(&self) -> Option<&TrialSpec> {
        match self.state {
            RunnerState::Presenting(index) => self.plan.get(index),
            RunnerState::Ended => None,
        }
    }

    pub fn plan(&self) -> &SessionPlan {
        &self.plan
    }

    pub fn summary(&self) -> Option<&SummaryResult> {
        self.summary.as_ref()
    }

    pub fn evaluation(&self) -> &EvaluationEngine {
        &self.engine
    }

    pub fn sink(&self) -> &L {
        &self.sink
    }

    /// Processes one sampled frame. Returns the selection event when this
    /// sample selected the current target; misses and plain movement return
    /// `None`.
    pub fn on_sample(&mut self, sample: TrialSample) -> Option<SelectionEvent> {
        let RunnerState::Presenting(index) = self.state else {
            return None;
        };
        let spec = self.plan.trials()[index].clone();

        let hit = geometry::hit_test(sample.canvas, &spec, self.meta.task_kind);
        self.presenter.set_cursor(sample.canvas);

        let trial_start = *self.trial_start_ns.get_or_insert(sample.timestamp_ns);
        let duration_s = sample.timestamp_ns.saturating_sub(trial_start) as f64 / 1e9;

        if self.options.save_movements {
            let record = self.event_record(index, &spec, &sample, &hit, duration_s);
            if let Err(e) = self.sink.log_movement(&record) {
                warn!("Movement log write failed: {e}");
            }
        }

        let attempt = self
            .arbiter
            .observe(hit.hit, sample.button_down, sample.timestamp_ns)?;

        self.records.push(TrialRecord {
            from: self.origin,
            to: spec.position,
            select: sample.canvas,
            duration_s,
            was_error: !attempt.hit,
        });

        if self.options.save_events {
            let record = self.event_record(index, &spec, &sample, &hit, duration_s);
            if let Err(e) = self.sink.log_event(&record) {
                warn!("Event log write failed: {e}");
            }
        }

        if !attempt.hit {
            return None;
        }

        if self.plan.is_block_end(index) {
            let result =
                self.engine
                    .evaluate_block(&spec.condition, spec.amplitude, spec.width, &self.records);
            debug!(
                "Block {} closed: We {:.3}, IDe {:.3}, TP {:.3}",
                result.condition, result.effective_width, result.effective_id, result.throughput
            );
            if self.options.save_evaluation
                && let Err(e) = self.sink.log_block(&result)
            {
                warn!("Evaluation log write failed: {e}");
            }
            self.records.clear();
        }

        self.advance(index, &sample);
        Some(SelectionEvent {
            target_index: index,
            session_complete: self.state == RunnerState::Ended,
        })
    }

    /// Restarts the session from the first target, clearing every buffer
    /// and the summary accumulator. Safe to call from any state.
    pub fn reset(&mut self) {
        self.records.clear();
        self.engine.reset();
        self.arbiter.reset();
        self.summary = None;
        self.trial_start_ns = None;
        self.origin = Point2::default();
        self.origin_world = Point3::default();
        self.last_index = None;
        self.state = if self.plan.is_empty() {
            RunnerState::Ended
        } else {
            RunnerState::Presenting(0)
        };
        self.present_first_target();
    }

    fn present_first_target(&mut self) {
        if let Some(spec) = self.plan.trials().first().cloned() {
            self.presenter.show_target(&spec);
        }
    }

    fn advance(&mut self, index: usize, sample: &TrialSample) {
        self.origin = sample.canvas;
        self.origin_world = sample.world;
        self.last_index = Some(index);

        let next = index + 1;
        if next >= self.plan.len() {
            self.finish(index);
            return;
        }

        self.trial_start_ns = Some(sample.timestamp_ns);
        self.state = RunnerState::Presenting(next);
        let spec = self.plan.trials()[next].clone();
        self.presenter.show_target(&spec);
        if self.options.audio_feedback {
            self.audio.play();
        }
    }

    fn finish(&mut self, last_index: usize) {
        let summary = self.engine.finalize();
        if self.options.save_evaluation
            && let Err(e) = self.sink.log_summary(&summary)
        {
            warn!("Summary log write failed: {e}");
        }
        info!(
            "Session complete: {} trials over {} blocks",
            self.plan.len(),
            self.engine.blocks().len()
        );

        let spec = self.plan.trials()[last_index].clone();
        self.presenter.hide_target(&spec);
        self.summary = Some(summary);
        self.state = RunnerState::Ended;
    }

    fn event_record(
        &self,
        index: usize,
        spec: &TrialSpec,
        sample: &TrialSample,
        hit: &HitTest,
        duration_s: f64,
    ) -> EventRecord {
        let last_target = self
            .last_index
            .map(|i| self.plan.trials()[i].position)
            .unwrap_or_default();

        EventRecord {
            repetition: spec.repetition,
            amplitude: spec.amplitude,
            width: spec.width,
            target_index: index,
            target_name: spec.name(),
            nominal_id: round2(spec.nominal_id()),
            trial_duration_s: duration_s,
            last_target,
            current_target: spec.position,
            mouse: sample.canvas,
            distance: hit.distance,
            target_size: hit.required_width,
            button_down: sample.button_down,
            hovered: hit.hit,
            last_target_world: last_target.into(),
            current_target_world: spec.position.into(),
            mouse_world: sample.world,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FittsError, Result};
    use crate::evaluate::BlockResult;
    use crate::select::SelectionMethod;
    use crate::sequence::{PlanParams, TaskKind};

    #[derive(Default)]
    struct RecordingSink {
        pub events: Vec<EventRecord>,
        pub movements: Vec<EventRecord>,
        pub blocks: Vec<BlockResult>,
        pub summaries: Vec<SummaryResult>,
    }

    impl LogSink for RecordingSink {
        fn log_event(&mut self, record: &EventRecord) -> Result<()> {
            self.events.push(record.clone());
            Ok(())
        }
        fn log_movement(&mut self, record: &EventRecord) -> Result<()> {
            self.movements.push(record.clone());
            Ok(())
        }
        fn log_block(&mut self, result: &BlockResult) -> Result<()> {
            self.blocks.push(result.clone());
            Ok(())
        }
        fn log_summary(&mut self, result: &SummaryResult) -> Result<()> {
            self.summaries.push(result.clone());
            Ok(())
        }
    }

    #[derive(Default)]
    struct FailingSink;

    impl LogSink for FailingSink {
        fn log_event(&mut self, _record: &EventRecord) -> Result<()> {
            Err(FittsError::Config("sink down".to_string()))
        }
        fn log_movement(&mut self, _record: &EventRecord) -> Result<()> {
            Err(FittsError::Config("sink down".to_string()))
        }
        fn log_block(&mut self, _result: &BlockResult) -> Result<()> {
            Err(FittsError::Config("sink down".to_string()))
        }
        fn log_summary(&mut self, _result: &SummaryResult) -> Result<()> {
            Err(FittsError::Config("sink down".to_string()))
        }
    }

    #[derive(Default)]
    struct CountingPresenter {
        shown: Vec<String>,
        hidden: Vec<String>,
        cursor_updates: usize,
    }

    impl Presentation for CountingPresenter {
        fn show_target(&mut self, spec: &TrialSpec) {
            self.shown.push(spec.name());
        }
        fn hide_target(&mut self, spec: &TrialSpec) {
            self.hidden.push(spec.name());
        }
        fn set_cursor(&mut self, _position: Point2) {
            self.cursor_updates += 1;
        }
    }

    #[derive(Default)]
    struct CountingAudio {
        plays: usize,
    }

    impl AudioFeedback for CountingAudio {
        fn play(&mut self) {
            self.plays += 1;
        }
    }

    fn meta(method: SelectionMethod) -> SessionMeta {
        SessionMeta {
            subject_id: 1,
            condition: "test".to_string(),
            task: "pointing".to_string(),
            group: "A".to_string(),
            task_kind: TaskKind::OneDimensional,
            selection_method: method,
            repetitions: 1,
            trials_per_condition: 3,
        }
    }

    // Two conditions of three 1D trials each, all targets at x = +-50:
    // Target-0-100-20 then Target-0-100-40.
    fn plan() -> SessionPlan {
        SessionPlan::build(&PlanParams {
            amplitudes: vec![100.0],
            widths: vec![20.0, 40.0],
            repetitions: 1,
            trials_per_condition: 3,
            task: TaskKind::OneDimensional,
            randomize: false,
            seed: 0,
        })
        .unwrap()
    }

    fn sample(x: f64, y: f64, button_down: bool, t_ms: u64) -> TrialSample {
        TrialSample {
            canvas: Point2::new(x, y),
            world: Point3::new(x, y, 0.0),
            button_down,
            timestamp_ns: t_ms * 1_000_000,
        }
    }

    // A full press-release pair; the arbiter only fires on the down edge.
    fn click<P: Presentation, A: AudioFeedback, L: LogSink>(
        runner: &mut TrialRunner<P, A, L>,
        x: f64,
        y: f64,
        t_ms: u64,
    ) -> Option<SelectionEvent> {
        let event = runner.on_sample(sample(x, y, true, t_ms));
        runner.on_sample(sample(x, y, false, t_ms + 1));
        event
    }

    fn click_runner(
        options: RunnerOptions,
    ) -> TrialRunner<CountingPresenter, CountingAudio, RecordingSink> {
        TrialRunner::new(
            plan(),
            meta(SelectionMethod::MouseButton),
            SelectionArbiter::new(SelectionMethod::MouseButton, 0),
            options,
            CountingPresenter::default(),
            CountingAudio::default(),
            RecordingSink::default(),
        )
    }

    #[test]
    fn test_click_session_runs_to_completion() {
        let mut runner = click_runner(RunnerOptions::default());

        // Condition 1: targets at +50, -50, +50 (width 20).
        assert!(click(&mut runner, 50.0, 0.5, 100).is_some());
        assert!(runner.on_sample(sample(-50.0, 0.5, false, 150)).is_none());
        assert!(click(&mut runner, -50.0, 0.5, 200).is_some());
        assert!(click(&mut runner, 50.0, 0.5, 300).is_some());

        // Condition 2: targets at +50, -50, +50 (width 40).
        assert!(click(&mut runner, 50.0, 0.5, 400).is_some());
        assert!(click(&mut runner, -50.0, 0.5, 500).is_some());
        let last = click(&mut runner, 50.0, 0.5, 600).unwrap();
        assert!(last.session_complete);

        assert_eq!(runner.state(), RunnerState::Ended);
        assert_eq!(runner.sink().blocks.len(), 2);
        assert_eq!(runner.sink().summaries.len(), 1);
        assert!(runner.summary().is_some());
        // Six selections, six event rows.
        assert_eq!(runner.sink().events.len(), 6);
        // The last target is hidden when the session ends.
        assert_eq!(runner.presenter.hidden, vec!["Target-0-100-40_2"]);
    }

    #[test]
    fn test_misses_are_logged_but_do_not_advance() {
        let mut runner = click_runner(RunnerOptions::default());

        // A press far away from the first target.
        assert!(click(&mut runner, 0.0, 400.0, 50).is_none());
        assert_eq!(runner.state(), RunnerState::Presenting(0));
        assert_eq!(runner.sink().events.len(), 1);
        assert!(!runner.sink().events[0].hovered);

        // Finish the first block: the miss shows up in the error tally.
        click(&mut runner, 50.0, 0.5, 100);
        click(&mut runner, -50.0, 0.5, 200);
        click(&mut runner, 50.0, 0.5, 300);

        let block = &runner.sink().blocks[0];
        assert_eq!(block.error_count, 1);
        assert!((block.error_rate - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_trial_timing_derives_from_sample_timestamps() {
        let mut runner = click_runner(RunnerOptions::default());

        // First sample opens the trial clock at t=100ms, selection at
        // t=350ms.
        runner.on_sample(sample(0.0, 0.5, false, 100));
        click(&mut runner, 50.0, 0.5, 350);
        assert!((runner.sink().events[0].trial_duration_s - 0.25).abs() < 1e-12);

        // Next trial's clock starts at the previous selection.
        click(&mut runner, -50.0, 0.5, 450);
        assert!((runner.sink().events[1].trial_duration_s - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_block_records_kinematics_from_trial_origin() {
        let mut runner = click_runner(RunnerOptions::default());

        click(&mut runner, 50.0, 0.5, 100);
        click(&mut runner, -50.0, 0.5, 200);
        click(&mut runner, 50.0, 0.5, 300);

        let block = &runner.sink().blocks[0];
        // Selections land exactly on the centers: no endpoint spread.
        assert_eq!(block.effective_width, 0.0);
        assert!((block.effective_amplitude - 100.0).abs() < 1e-9);
        assert_eq!(block.nominal_id, 2.58);
    }

    #[test]
    fn test_dwell_session_counts_no_errors() {
        let mut runner = TrialRunner::new(
            plan(),
            meta(SelectionMethod::DwellTime),
            SelectionArbiter::new(SelectionMethod::DwellTime, 100),
            RunnerOptions::default(),
            CountingPresenter::default(),
            CountingAudio::default(),
            RecordingSink::default(),
        );

        let mut t_ms = 0;
        for x in [50.0, -50.0, 50.0] {
            loop {
                t_ms += 50;
                if runner.on_sample(sample(x, 0.5, false, t_ms)).is_some() {
                    break;
                }
                assert!(t_ms < 10_000);
            }
        }
        let block = &runner.sink().blocks[0];
        assert_eq!(block.error_count, 0);
        assert_eq!(block.error_rate, 0.0);
    }

    #[test]
    fn test_presentation_and_audio_collaborators() {
        let mut runner = click_runner(RunnerOptions::default());

        click(&mut runner, 50.0, 0.5, 100);
        click(&mut runner, -50.0, 0.5, 200);

        // Initial target plus the two advanced to.
        assert_eq!(runner.presenter.shown.len(), 3);
        assert_eq!(runner.presenter.shown[0], "Target-0-100-20_0");
        // One cursor update per sample, two samples per click.
        assert_eq!(runner.presenter.cursor_updates, 4);
        // No beep for the first presentation.
        assert_eq!(runner.audio.plays, 2);
    }

    #[test]
    fn test_sink_failures_do_not_disturb_aggregation() {
        let mut runner = TrialRunner::new(
            plan(),
            meta(SelectionMethod::MouseButton),
            SelectionArbiter::new(SelectionMethod::MouseButton, 0),
            RunnerOptions::default(),
            CountingPresenter::default(),
            CountingAudio::default(),
            FailingSink,
        );

        for (x, t) in [(50.0, 100), (-50.0, 200), (50.0, 300)] {
            click(&mut runner, x, 0.5, t);
        }
        assert_eq!(runner.evaluation().blocks().len(), 1);
        assert_eq!(runner.state(), RunnerState::Presenting(3));
    }

    #[test]
    fn test_save_flags_gate_emission_not_evaluation() {
        let options = RunnerOptions {
            save_events: false,
            save_movements: false,
            save_evaluation: false,
            audio_feedback: false,
        };
        let mut runner = click_runner(options);

        for (x, t) in [(50.0, 100), (-50.0, 200), (50.0, 300)] {
            click(&mut runner, x, 0.5, t);
        }
        assert!(runner.sink().events.is_empty());
        assert!(runner.sink().blocks.is_empty());
        assert_eq!(runner.evaluation().blocks().len(), 1);
    }

    #[test]
    fn test_movement_rows_are_emitted_every_tick() {
        let options = RunnerOptions {
            save_movements: true,
            ..RunnerOptions::default()
        };
        let mut runner = click_runner(options);

        runner.on_sample(sample(10.0, 0.5, false, 10));
        runner.on_sample(sample(30.0, 0.5, false, 20));
        runner.on_sample(sample(50.0, 0.5, true, 30));
        assert_eq!(runner.sink().movements.len(), 3);
        assert_eq!(runner.sink().events.len(), 1);
    }

    #[test]
    fn test_reset_restarts_from_the_first_target() {
        let mut runner = click_runner(RunnerOptions::default());

        click(&mut runner, 50.0, 0.5, 100);
        click(&mut runner, -50.0, 0.5, 200);
        runner.reset();

        assert_eq!(runner.state(), RunnerState::Presenting(0));
        assert!(runner.evaluation().blocks().is_empty());
        assert!(runner.summary().is_none());

        // The session can run to completion after a reset.
        let times = [100, 200, 300, 400, 500, 600];
        let xs = [50.0, -50.0, 50.0, 50.0, -50.0, 50.0];
        let mut last = None;
        for (&x, &t) in xs.iter().zip(&times) {
            last = click(&mut runner, x, 0.5, t);
        }
        assert_eq!(
            last,
            Some(SelectionEvent {
                target_index: 5,
                session_complete: true
            })
        );

        // Reset is idempotent and valid from the ended state.
        runner.reset();
        runner.reset();
        assert_eq!(runner.state(), RunnerState::Presenting(0));
    }

    #[test]
    fn test_ended_runner_ignores_samples() {
        let mut runner = click_runner(RunnerOptions::default());
        let times = [100, 200, 300, 400, 500, 600];
        let xs = [50.0, -50.0, 50.0, 50.0, -50.0, 50.0];
        for (&x, &t) in xs.iter().zip(&times) {
            click(&mut runner, x, 0.5, t);
        }
        assert_eq!(runner.state(), RunnerState::Ended);

        assert!(runner.on_sample(sample(50.0, 0.5, true, 700)).is_none());
        assert_eq!(runner.sink().summaries.len(), 1);
    }

    #[test]
    fn test_event_record_fields() {
        let mut runner = click_runner(RunnerOptions::default());

        click(&mut runner, 50.0, 0.5, 100);
        click(&mut runner, -49.0, 1.0, 200);

        let second = &runner.sink().events[1];
        assert_eq!(second.target_index, 1);
        assert_eq!(second.target_name, "Target-0-100-20_1");
        assert_eq!(second.amplitude, 100.0);
        assert_eq!(second.width, 20.0);
        assert_eq!(second.last_target, Point2::new(50.0, 0.5));
        assert_eq!(second.current_target, Point2::new(-50.0, 0.5));
        assert_eq!(second.mouse, Point2::new(-49.0, 1.0));
        assert_eq!(second.target_size, 10.0);
        assert!(second.button_down);
        assert!(second.hovered);
        assert_eq!(second.current_target_world, Point3::new(-50.0, 0.5, 0.0));
    }
}
