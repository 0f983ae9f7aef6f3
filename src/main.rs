use anyhow::Result;
use fitts_task::config::{InputMode, TaskConfig};
use fitts_task::export::CsvLogSink;
use fitts_task::host::{AudioFeedback, InputSource, LogSink, NullAudio, NullPresentation, Presentation};
use fitts_task::platform;
use fitts_task::runner::{RunnerState, TrialRunner};
use fitts_task::select::SelectionArbiter;
use fitts_task::sequence::SessionPlan;
use fitts_task::sim::SimulatedPointer;
use log::{info, warn};
use std::{env, path::Path, thread, time::Duration};

const ENV_CONFIG_PATH: &str = "FITTS_TASK_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "FittsTask.toml";

// Host cadence for the live loop, ~90 Hz.
const TICK: Duration = Duration::from_millis(11);

fn main() -> Result<()> {
    // Initialize logger - defaults to RUST_LOG if set, otherwise INFO
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();

    let config = load_config()?;
    info!("Fitts task starting for subject {}", config.subject_id);

    let plan = SessionPlan::build(&config.plan_params())?;
    info!(
        "Session plan: {} trials ({} amplitudes x {} widths x {} repetitions, {} trials each)",
        plan.len(),
        config.amplitudes.len(),
        config.widths.len(),
        config.number_of_repetitions,
        config.trials_per_condition(),
    );

    let sink = CsvLogSink::create(config.session_meta(), &config.logging)?;
    for path in sink.paths() {
        info!("Logging to: {}", path.display());
    }

    let arbiter = SelectionArbiter::new(config.selection_method, config.dwell_time_ms);
    let mut runner = TrialRunner::new(
        plan,
        config.session_meta(),
        arbiter,
        config.runner_options(),
        NullPresentation,
        NullAudio,
        sink,
    );

    match config.input.mode {
        InputMode::Simulated => run_simulated(&mut runner, &config),
        InputMode::Device => run_device(&mut runner, &config)?,
    }

    match runner.summary() {
        Some(summary) => {
            info!("Mean time: {:.8} s", summary.mean_time_s);
            info!("Mean error rate: {:.8}", summary.mean_error_rate);
            info!("Mean throughput: {:.8} bits/s", summary.mean_throughput);
            info!(
                "Regression: {}, fit {:.8}",
                summary.regression.equation(),
                summary.regression.r_squared
            );
        }
        None => warn!("Session ended without a summary"),
    }

    Ok(())
}

fn load_config() -> Result<TaskConfig> {
    if let Ok(path) = env::var(ENV_CONFIG_PATH) {
        return Ok(TaskConfig::load_from_file(Path::new(&path))?);
    }
    if Path::new(DEFAULT_CONFIG_PATH).exists() {
        return Ok(TaskConfig::load_from_file(Path::new(DEFAULT_CONFIG_PATH))?);
    }

    info!("No config file found, using defaults");
    let mut config = TaskConfig::default();
    config.apply_env()?;
    config.validate()?;
    Ok(config)
}

fn run_simulated<P, A, L>(runner: &mut TrialRunner<P, A, L>, config: &TaskConfig)
where
    P: Presentation,
    A: AudioFeedback,
    L: LogSink,
{
    let mut input = SimulatedPointer::new(config.input.simulation_seed, config.selection_method);

    // Generous cap so a mis-parameterized simulation cannot spin forever.
    let mut remaining_ticks = runner.plan().len() as u64 * 100_000;
    while let RunnerState::Presenting(_) = runner.state() {
        if let Some(target) = runner.current_target() {
            input.set_goal(target.position, target.width);
        }
        let sample = input.sample();
        runner.on_sample(sample);

        remaining_ticks -= 1;
        if remaining_ticks == 0 {
            warn!("Simulation tick cap reached, aborting session");
            break;
        }
    }
}

#[cfg(any(target_os = "macos", target_os = "windows", target_os = "linux"))]
fn run_device<P, A, L>(runner: &mut TrialRunner<P, A, L>, config: &TaskConfig) -> Result<()>
where
    P: Presentation,
    A: AudioFeedback,
    L: LogSink,
{
    platform::setup_exit_handler()?;
    info!("Live session: press Ctrl+C to stop, 'S' to restart");

    let mut input = platform::DeviceInput::new(&config.input);

    while !platform::should_exit() {
        if input.restart_requested() {
            info!("Restarting session");
            runner.reset();
        }

        let sample = input.sample();
        runner.on_sample(sample);
        if runner.state() == RunnerState::Ended {
            break;
        }
        thread::sleep(TICK);
    }
    Ok(())
}

#[cfg(not(any(target_os = "macos", target_os = "windows", target_os = "linux")))]
fn run_device<P, A, L>(_runner: &mut TrialRunner<P, A, L>, _config: &TaskConfig) -> Result<()>
where
    P: Presentation,
    A: AudioFeedback,
    L: LogSink,
{
    Err(fitts_task::error::FittsError::PlatformNotSupported.into())
}
