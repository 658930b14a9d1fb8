use std::sync::Arc;
use std::time::{Duration, Instant};

use indicatif::{HumanDuration, ProgressBar, ProgressDrawTarget, ProgressStyle};

pub struct Progress {
    enabled: bool,
    start: Instant,
    stage: ProgressBar,
}

impl Progress {
    pub fn new(enabled: bool) -> Arc<Self> {
        let start = Instant::now();

        if !enabled {
            return Arc::new(Self {
                enabled: false,
                start,
                stage: ProgressBar::hidden(),
            });
        }

        let stage = ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr());
        // Template is static; a parse failure would only lose the styling.
        if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}  [{elapsed_precise}]") {
            stage.set_style(style);
        }
        stage.enable_steady_tick(Duration::from_millis(80));
        stage.set_message("starting");

        Arc::new(Self {
            enabled: true,
            start,
            stage,
        })
    }

    pub fn set_stage(&self, msg: impl Into<String>) {
        if !self.enabled {
            return;
        }
        self.stage.set_message(msg.into());
    }

    /// Print a line above the spinner without tearing it.
    pub fn println(&self, msg: impl AsRef<str>) {
        if self.enabled {
            self.stage.println(msg);
        }
    }

    pub fn finish(&self) {
        if !self.enabled {
            return;
        }
        self.println(format!("Done in {}", HumanDuration(self.start.elapsed())));
        self.stage.finish_and_clear();
    }
}
