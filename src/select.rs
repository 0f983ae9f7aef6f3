use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionMethod {
    #[default]
    MouseButton,
    DwellTime,
}

impl SelectionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            SelectionMethod::MouseButton => "MouseButton",
            SelectionMethod::DwellTime => "DwellTime",
        }
    }
}

/// A selection attempt. Under the mouse button method every button-down
/// edge is an attempt, hit or miss; dwell attempts are always hits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attempt {
    pub hit: bool,
}

/// Decides when a hover observation becomes a selection attempt.
///
/// Button state arrives as a level; the arbiter performs its own edge
/// detection. The dwell timer requires uninterrupted hover: any hover loss
/// discards accumulated time.
#[derive(Debug)]
pub struct SelectionArbiter {
    method: SelectionMethod,
    dwell_ns: u64,
    hover_since: Option<u64>,
    button_was_down: bool,
}

impl SelectionArbiter {
    pub fn new(method: SelectionMethod, dwell_ms: u64) -> Self {
        Self {
            method,
            dwell_ns: dwell_ms * 1_000_000,
            hover_since: None,
            button_was_down: false,
        }
    }

    pub fn method(&self) -> SelectionMethod {
        self.method
    }

    pub fn observe(&mut self, hovered: bool, button_down: bool, now_ns: u64) -> Option<Attempt> {
        match self.method {
            SelectionMethod::MouseButton => {
                let edge = button_down && !self.button_was_down;
                self.button_was_down = button_down;
                edge.then_some(Attempt { hit: hovered })
            }
            SelectionMethod::DwellTime => {
                self.button_was_down = button_down;
                if !hovered {
                    self.hover_since = None;
                    return None;
                }
                match self.hover_since {
                    None => {
                        self.hover_since = Some(now_ns);
                        None
                    }
                    Some(start) if now_ns.saturating_sub(start) >= self.dwell_ns => {
                        self.hover_since = None;
                        Some(Attempt { hit: true })
                    }
                    Some(_) => None,
                }
            }
        }
    }

    pub fn reset(&mut self) {
        self.hover_since = None;
        self.button_was_down = false;
    }
}
