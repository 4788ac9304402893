//! Bounded grow/shrink of the chat window

use crate::config::WindowConfig;

/// Window dimensions
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowSize {
    pub width: f64,
    pub height: f64,
}

impl WindowSize {
    fn scaled(self, factor: f64) -> Self {
        Self {
            width: self.width * factor,
            height: self.height * factor,
        }
    }
}

/// Tracks the window size within `[default, default * (1 + step)^max]`
///
/// Each grow multiplies the current size by `1 + step`; each shrink by
/// `1 - step`, never going below the default size.
#[derive(Debug, Clone)]
pub struct ResizeController {
    default: WindowSize,
    step: f64,
    max_steps: u32,
    steps: u32,
    size: WindowSize,
}

impl ResizeController {
    pub fn new(config: &WindowConfig) -> Self {
        let default = WindowSize {
            width: config.default_width,
            height: config.default_height,
        };
        Self {
            default,
            step: config.resize_step,
            max_steps: config.max_resizes,
            steps: 0,
            size: default,
        }
    }

    /// Enlarge by one step
    ///
    /// Returns false once the maximum step count is reached.
    pub fn grow(&mut self) -> bool {
        if self.steps >= self.max_steps {
            return false;
        }
        self.steps += 1;
        self.size = self.size.scaled(1.0 + self.step);
        true
    }

    /// Reduce by one step
    ///
    /// Returns false when already at the default size.
    pub fn shrink(&mut self) -> bool {
        if self.steps == 0 {
            return false;
        }
        self.steps -= 1;
        let next = self.size.scaled(1.0 - self.step);
        self.size = if self.steps == 0 {
            self.default
        } else {
            WindowSize {
                width: next.width.max(self.default.width),
                height: next.height.max(self.default.height),
            }
        };
        true
    }

    /// Return to the default size
    pub fn reset(&mut self) {
        self.steps = 0;
        self.size = self.default;
    }

    pub fn size(&self) -> WindowSize {
        self.size
    }

    /// Number of grow steps currently applied
    pub fn steps(&self) -> u32 {
        self.steps
    }

    pub fn can_grow(&self) -> bool {
        self.steps < self.max_steps
    }

    pub fn can_shrink(&self) -> bool {
        self.steps > 0
    }
}
