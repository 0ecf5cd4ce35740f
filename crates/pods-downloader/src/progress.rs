//! Terminal spinners for narrated download steps.

use console::style;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::sync::Mutex;
use std::time::Duration;

use crate::narrator::{ActionLevel, Narrator};

/// Narrator that renders each running step as a spinner
pub struct ProgressNarrator {
    multi: MultiProgress,
    enabled: bool,
    active: Mutex<Vec<(String, ProgressBar)>>,
}

impl ProgressNarrator {
    /// Create a new progress narrator
    pub fn new(enabled: bool) -> Self {
        Self {
            multi: MultiProgress::new(),
            enabled,
            active: Mutex::new(Vec::new()),
        }
    }

    /// Check if progress is enabled
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn create_spinner(&self, level: ActionLevel, message: &str) -> ProgressBar {
        if !self.enabled {
            return ProgressBar::hidden();
        }

        let template = match level {
            ActionLevel::Action => "{spinner:.green} {msg}",
            ActionLevel::SubAction => "  {spinner:.green} {msg}",
        };

        let pb = self.multi.add(ProgressBar::new_spinner());
        if let Ok(spinner_style) = ProgressStyle::default_spinner().template(template) {
            pb.set_style(spinner_style);
        }
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }

    /// Number of steps currently shown
    pub fn active_steps(&self) -> usize {
        self.active.lock().map(|a| a.len()).unwrap_or(0)
    }
}

impl Default for ProgressNarrator {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Narrator for ProgressNarrator {
    fn begin(&self, level: ActionLevel, message: &str) {
        let pb = self.create_spinner(level, message);
        if let Ok(mut active) = self.active.lock() {
            active.push((message.to_string(), pb));
        }
    }

    fn end(&self, _level: ActionLevel, message: &str, succeeded: bool) {
        let Ok(mut active) = self.active.lock() else {
            return;
        };
        let Some(index) = active.iter().rposition(|(m, _)| m == message) else {
            return;
        };
        let (_, pb) = active.remove(index);

        let mark = if succeeded {
            style("✔").green()
        } else {
            style("✘").red()
        };
        pb.finish_with_message(format!("{} {}", mark, message));
    }

    fn message(&self, message: &str) {
        if self.enabled {
            let _ = self.multi.println(message);
        }
    }
}
