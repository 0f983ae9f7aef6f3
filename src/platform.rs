#[cfg(any(target_os = "macos", target_os = "windows", target_os = "linux"))]
use crate::config::InputConfig;
use crate::error::Result;
#[cfg(any(target_os = "macos", target_os = "windows", target_os = "linux"))]
use crate::geometry::Point2;
#[cfg(any(target_os = "macos", target_os = "windows", target_os = "linux"))]
use crate::host::{InputSource, TrialSample};
#[cfg(any(target_os = "macos", target_os = "windows", target_os = "linux"))]
use device_query::{DeviceQuery, DeviceState, Keycode};
use std::sync::{
    Mutex, OnceLock,
    atomic::{AtomicBool, Ordering},
};
#[cfg(any(target_os = "macos", target_os = "windows", target_os = "linux"))]
use std::time::Instant;

// Global flag for graceful shutdown
static SHOULD_EXIT: AtomicBool = AtomicBool::new(false);
static EXIT_HANDLER_STATE: OnceLock<Mutex<bool>> = OnceLock::new();

fn inner_setup() -> Result<()> {
    #[cfg(unix)]
    {
        use signal_hook::{
            consts::{SIGHUP, SIGINT, SIGTERM},
            iterator::Signals,
        };
        use std::thread::Builder;

        let mut signals = Signals::new([SIGINT, SIGTERM, SIGHUP]).map_err(|e| {
            crate::error::FittsError::SignalHandling {
                source: Box::new(e),
            }
        })?;

        Builder::new()
            .name("signal-listener".into())
            .spawn(move || {
                if let Some(sig) = signals.forever().next() {
                    log::info!("Received signal: {sig}");
                    SHOULD_EXIT.store(true, Ordering::Relaxed);
                }
            })
            .expect("spawn signal-listener thread");
    }

    #[cfg(windows)]
    {
        ctrlc::set_handler(|| {
            SHOULD_EXIT.store(true, Ordering::Relaxed);
        })?;
    }

    Ok(())
}

pub fn setup_exit_handler() -> Result<()> {
    let m = EXIT_HANDLER_STATE.get_or_init(|| Mutex::new(false));
    let mut inited = m.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

    if *inited {
        return Ok(());
    }

    inner_setup()?;
    *inited = true;
    Ok(())
}

#[inline]
pub fn should_exit() -> bool {
    SHOULD_EXIT.load(Ordering::Relaxed)
}

/// Live pointer source polling the OS cursor. Screen coordinates are
/// shifted by the configured canvas origin (the canvas frame has its
/// origin at the screen position given in the config, y pointing up);
/// timestamps come from a monotonic clock started at construction.
#[cfg(any(target_os = "macos", target_os = "windows", target_os = "linux"))]
pub struct DeviceInput {
    device: DeviceState,
    origin: Point2,
    started: Instant,
    restart_was_down: bool,
}

#[cfg(any(target_os = "macos", target_os = "windows", target_os = "linux"))]
impl DeviceInput {
    pub fn new(input: &InputConfig) -> Self {
        Self {
            device: DeviceState::new(),
            origin: Point2::new(input.canvas_origin_x, input.canvas_origin_y),
            started: Instant::now(),
            restart_was_down: false,
        }
    }

    /// Edge-detected poll of the session restart key ('S').
    pub fn restart_requested(&mut self) -> bool {
        let down = self.device.get_keys().contains(&Keycode::S);
        let edge = down && !self.restart_was_down;
        self.restart_was_down = down;
        edge
    }
}

#[cfg(any(target_os = "macos", target_os = "windows", target_os = "linux"))]
impl InputSource for DeviceInput {
    fn sample(&mut self) -> TrialSample {
        let mouse = self.device.get_mouse();
        let canvas = Point2::new(
            mouse.coords.0 as f64 - self.origin.x,
            self.origin.y - mouse.coords.1 as f64,
        );
        // device_query indexes buttons from 1; index 1 is the left button.
        let button_down = mouse.button_pressed.get(1).copied().unwrap_or(false);

        TrialSample {
            canvas,
            world: canvas.into(),
            button_down,
            timestamp_ns: self.started.elapsed().as_nanos() as u64,
        }
    }
}
