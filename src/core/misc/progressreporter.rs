use indicatif::*;

/// Percentage bar for one frame's render progress.
pub struct ProgressReporter {
    pb: ProgressBar,
}

fn style(title: &str) -> ProgressStyle {
    let template = format!("{{spinner:.bold.green}} {}: ", title)
        + "[{wide_bar:.cyan}] {pos:>3}% ({elapsed_precise}) {msg}";
    return ProgressStyle::with_template(&template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▇▆▅▄▃▂▁  ");
}

impl ProgressReporter {
    pub fn new(total_work: usize, title: &str) -> Self {
        let pb = ProgressBar::new(total_work as u64);
        pb.set_style(style(title));
        pb.tick();
        ProgressReporter { pb }
    }

    /// Bar that draws nothing, for tests and non-interactive runs.
    pub fn hidden() -> Self {
        ProgressReporter {
            pb: ProgressBar::hidden(),
        }
    }

    pub fn update(&self, num: usize) {
        if num != 0 {
            self.pb.inc(num as u64);
        }
    }

    pub fn set_position(&self, pos: usize) {
        self.pb.set_position(pos as u64);
    }

    pub fn position(&self) -> usize {
        self.pb.position() as usize
    }

    pub fn set_message(&self, msg: String) {
        self.pb.set_message(msg);
    }

    pub fn println(&self, msg: &str) {
        self.pb.println(msg);
    }

    /// Restarts the bar for a new frame or pass.
    pub fn reset(&self, title: &str) {
        self.pb.set_style(style(title));
        self.pb.reset();
    }

    pub fn done(&self) {
        self.pb.finish();
    }
}
