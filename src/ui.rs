// src/ui.rs

//! Per-stage terminal spinners, rendered via `indicatif`.
//!
//! Spinners draw to stderr and stay invisible when stderr is not a terminal.
//! Anything printed to stdout while a spinner is active goes through
//! [`StageSpinner::print_line`] so the two don't tear each other apart.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use crate::types::Stage;

const TICK: Duration = Duration::from_millis(100);

pub struct StageSpinner {
    bar: ProgressBar,
    stage: Stage,
}

impl StageSpinner {
    /// Start a spinner for `stage`; `visible = false` never draws anything.
    pub fn start(stage: Stage, visible: bool) -> Self {
        let bar = if visible {
            let bar = ProgressBar::new_spinner();
            bar.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.cyan} {msg}")
                    .expect("progress bar template is a valid static string"),
            );
            bar.enable_steady_tick(TICK);
            bar
        } else {
            ProgressBar::hidden()
        };
        bar.set_message(stage.progress_message());

        Self { bar, stage }
    }

    /// Print a line to stdout with the spinner out of the way.
    pub fn print_line(&self, line: &str) {
        self.bar.suspend(|| println!("{line}"));
    }

    pub fn succeed(self) {
        self.bar
            .finish_with_message(format!("✔ {}", self.stage.progress_message()));
    }

    pub fn fail(self) {
        self.bar
            .abandon_with_message(format!("✖ {}", self.stage.progress_message()));
    }
}
