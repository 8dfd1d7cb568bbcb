use std::{
    fmt::Display,
    future::Future,
    sync::{LazyLock, PoisonError, RwLock},
};

use lodestone_core::LodestoneResult;
use miette::IntoDiagnostic;
use nu_ansi_term::Color;

pub struct Icons;

impl Icons {
    pub const ARROW: &str = "→";
    pub const CHECK: &str = "✓";
    pub const CROSS: &str = "✗";
    pub const DISABLED: &str = "○";
    pub const PACKAGE: &str = "📦";
    pub const WARNING: &str = "⚠";
}

pub static COLOR: LazyLock<RwLock<bool>> = LazyLock::new(|| RwLock::new(true));
pub static PROGRESS: LazyLock<RwLock<bool>> = LazyLock::new(|| RwLock::new(true));
pub static JSON: LazyLock<RwLock<bool>> = LazyLock::new(|| RwLock::new(false));

fn flag(lock: &RwLock<bool>) -> bool {
    *lock.read().unwrap_or_else(PoisonError::into_inner)
}

pub fn set_flag(lock: &RwLock<bool>, value: bool) {
    *lock.write().unwrap_or_else(PoisonError::into_inner) = value;
}

pub fn progress_enabled() -> bool {
    flag(&PROGRESS) && !json_output()
}

pub fn json_output() -> bool {
    flag(&JSON)
}

pub fn term_width() -> usize {
    terminal_size::terminal_size()
        .map(|(w, _)| w.0 as usize)
        .unwrap_or(80)
}

pub struct Colored<T: Display>(pub Color, pub T);

impl<T: Display> Display for Colored<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if flag(&COLOR) {
            write!(f, "{}", self.0.prefix())?;
            self.1.fmt(f)?;
            write!(f, "{}", self.0.suffix())
        } else {
            self.1.fmt(f)
        }
    }
}

/// Human-readable age of a sync timestamp.
pub fn format_age(last_updated: u64, now: u64) -> String {
    if last_updated == 0 {
        return "never".to_string();
    }

    let secs = now.saturating_sub(last_updated);
    match secs {
        0..=59 => "just now".to_string(),
        60..=3599 => format!("{}m ago", secs / 60),
        3600..=86_399 => format!("{}h ago", secs / 3600),
        _ => format!("{}d ago", secs / 86_400),
    }
}

/// Runs a blocking manager operation on the blocking thread pool.
pub fn blocking<T, F>(op: F) -> impl Future<Output = miette::Result<T>>
where
    F: FnOnce() -> LodestoneResult<T> + Send + 'static,
    T: Send + 'static,
{
    async move {
        let result = tokio::task::spawn_blocking(op).await.into_diagnostic()?;
        Ok(result?)
    }
}
