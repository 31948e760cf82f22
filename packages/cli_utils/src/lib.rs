#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Terminal plumbing for the bikeshare binaries.
//!
//! [`init_logger`] installs `pretty_env_logger` behind
//! `indicatif-log-bridge`, so log lines print above the progress bars
//! instead of through them. [`IndicatifProgress`] renders the library's
//! [`ProgressCallback`] updates.

use std::sync::Arc;
use std::time::Duration;

use bikeshare_source::progress::ProgressCallback;
use indicatif::{ProgressBar, ProgressStyle};

pub use indicatif::MultiProgress;

/// [`ProgressCallback`] backed by an `indicatif` bar.
pub struct IndicatifProgress {
    bar: ProgressBar,
    /// Applied once the total is known.
    sized_style: ProgressStyle,
}

impl IndicatifProgress {
    /// Row progress for an import. Spins until a file reports its row
    /// count, then shows a bar with rate and ETA.
    #[must_use]
    pub fn rows_bar(multi: &MultiProgress, message: &str) -> Arc<dyn ProgressCallback> {
        let bar = multi.add(ProgressBar::new_spinner());
        bar.enable_steady_tick(Duration::from_millis(120));
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message(message.to_string());

        let sized_style = ProgressStyle::with_template(
            "  {msg} {wide_bar:.cyan/dim} {human_pos}/{human_len} rows {per_sec} [{eta}]",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-");

        Arc::new(Self { bar, sized_style })
    }

    /// Month progress for archive downloads.
    #[must_use]
    pub fn months_bar(multi: &MultiProgress, message: &str) -> Arc<dyn ProgressCallback> {
        let bar = multi.add(ProgressBar::new(0));
        let sized_style = ProgressStyle::with_template(
            "{msg} {wide_bar:.green/dim} {pos}/{len} months [{elapsed_precise}]",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-");
        bar.set_style(sized_style.clone());
        bar.set_message(message.to_string());

        Arc::new(Self { bar, sized_style })
    }

    /// A bar that draws nothing.
    #[must_use]
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
            sized_style: ProgressStyle::default_bar(),
        }
    }

    /// Current position.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.bar.position()
    }
}

impl ProgressCallback for IndicatifProgress {
    fn set_total(&self, total: u64) {
        self.bar.set_length(total);
        self.bar.set_position(0);
        self.bar.set_style(self.sized_style.clone());
    }

    fn inc(&self, delta: u64) {
        self.bar.inc(delta);
    }

    fn set_message(&self, msg: String) {
        self.bar.set_message(msg);
    }

    fn finish(&self, msg: String) {
        self.bar.finish_with_message(msg);
    }
}

/// Installs the global logger (level from `RUST_LOG`) routed through
/// `indicatif-log-bridge`. Returns the [`MultiProgress`] every bar must be
/// added to.
#[must_use]
pub fn init_logger() -> MultiProgress {
    let multi = MultiProgress::new();

    let logger = pretty_env_logger::formatted_builder()
        .parse_env("RUST_LOG")
        .build();
    let level = logger.filter();

    // Already set in tests.
    indicatif_log_bridge::LogWrapper::new(multi.clone(), logger)
        .try_init()
        .ok();
    log::set_max_level(level);

    multi
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_total_resets_position() {
        let progress = IndicatifProgress::hidden();
        progress.inc(5);
        progress.set_total(100);
        assert_eq!(progress.position(), 0);
        progress.inc(40);
        assert_eq!(progress.position(), 40);
        progress.finish("done".to_string());
    }
}
