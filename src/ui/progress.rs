use crate::ui::output::format_duration;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::time::{Duration, Instant};

pub struct ProgressManager {
    multi_progress: MultiProgress,
    enabled: bool,
}

impl ProgressManager {
    pub fn new(enabled: bool) -> Self {
        Self {
            multi_progress: MultiProgress::new(),
            enabled,
        }
    }

    pub fn create_entry_progress(&self, total_entries: u64, label: &str) -> ProgressBar {
        if !self.enabled {
            return ProgressBar::hidden();
        }

        let pb = self.multi_progress.add(ProgressBar::new(total_entries));
        pb.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>5}/{len:5} {prefix} {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
        );
        pb.set_prefix(label.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }

    pub fn create_spinner(&self, message: &str) -> ProgressBar {
        if !self.enabled {
            return ProgressBar::hidden();
        }

        let pb = self.multi_progress.add(ProgressBar::new_spinner());
        pb.enable_steady_tick(Duration::from_millis(100));
        pb.set_style(
            ProgressStyle::with_template("{spinner:.green} {msg} ({elapsed})")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        pb.set_message(message.to_string());
        pb
    }

    pub fn suspend<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        if self.enabled {
            self.multi_progress.suspend(f)
        } else {
            f()
        }
    }

    pub fn clear(&self) {
        if self.enabled {
            self.multi_progress.clear().ok();
        }
    }
}

/// Progress display for one tool run. A run may announce several phases;
/// each `start` replaces the previous bar.
pub struct RunProgress<'a> {
    manager: &'a ProgressManager,
    current: Option<ProgressBar>,
    label: String,
    start_time: Instant,
}

impl<'a> RunProgress<'a> {
    pub fn new(manager: &'a ProgressManager) -> Self {
        Self {
            manager,
            current: None,
            label: String::new(),
            start_time: Instant::now(),
        }
    }

    pub fn start(&mut self, label: &str, total: u64) {
        self.finish_current();
        let bar = if total == 0 {
            self.manager.create_spinner(label)
        } else {
            self.manager.create_entry_progress(total, label)
        };
        self.current = Some(bar);
        self.label = label.to_string();
        self.start_time = Instant::now();
    }

    pub fn advance(&self, entry: &str) {
        if let Some(bar) = &self.current {
            bar.set_message(entry.to_string());
            bar.inc(1);
        }
    }

    fn finish_current(&mut self) {
        if let Some(bar) = self.current.take() {
            bar.finish_with_message(format!(
                "{} ({})",
                self.label,
                format_duration(self.start_time.elapsed())
            ));
        }
    }

    pub fn finish(mut self) {
        self.finish_current();
    }

    pub fn abandon(mut self, message: &str) {
        if let Some(bar) = self.current.take() {
            bar.abandon_with_message(message.to_string());
        }
    }
}
