use std::{
    sync::{Arc, LazyLock},
    time::Duration,
};

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use nu_ansi_term::Color::Cyan;

use crate::utils::{progress_enabled, Colored};

/// Resolution of fractional download progress.
const FRACTION_STEPS: u64 = 1000;

/// Shared MultiProgress instance for suspend/stop from other modules.
static MULTI: LazyLock<Arc<MultiProgress>> = LazyLock::new(|| Arc::new(MultiProgress::new()));

/// Pause progress display, run the closure, then resume.
pub fn suspend<F: FnOnce()>(f: F) {
    MULTI.suspend(f);
}

/// Stop and clear all progress bars.
pub fn stop() {
    MULTI.clear().ok();
}

fn download_style() -> ProgressStyle {
    ProgressStyle::with_template(
        "{spinner:.cyan} {prefix}  {wide_bar:.cyan/dim}  {percent:>3}%  {elapsed}",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("━━─")
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

fn add_bar(pb: ProgressBar) -> ProgressBar {
    if progress_enabled() {
        MULTI.add(pb)
    } else {
        MULTI.add(ProgressBar::hidden())
    }
}

/// Create a download bar driven by completed fractions.
pub fn create_download_job(prefix: &str) -> ProgressBar {
    let pb = add_bar(ProgressBar::new(FRACTION_STEPS));
    pb.set_style(download_style());
    pb.set_prefix(Colored(Cyan, prefix).to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Create a spinner job.
pub fn create_spinner_job(message: &str) -> ProgressBar {
    let pb = add_bar(ProgressBar::new_spinner());
    pb.set_style(spinner_style());
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Moves a download bar to `fraction`, finishing it at `1.0`.
pub fn handle_download_progress(fraction: f64, pb: &ProgressBar) {
    let position = (fraction.clamp(0.0, 1.0) * FRACTION_STEPS as f64).round() as u64;
    pb.set_position(position);
    if position >= FRACTION_STEPS {
        pb.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_download_progress() {
        let pb = ProgressBar::hidden();
        pb.set_length(FRACTION_STEPS);

        handle_download_progress(0.25, &pb);
        assert_eq!(pb.position(), 250);
        assert!(!pb.is_finished());

        handle_download_progress(1.0, &pb);
        assert_eq!(pb.position(), FRACTION_STEPS);
        assert!(pb.is_finished());
    }
}
