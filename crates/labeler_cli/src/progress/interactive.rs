use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use console::style;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use labeler::download::DownloadProgress;

/// Consolidated progress state to avoid multiple mutex locks.
#[derive(Default)]
struct ProgressState {
    /// One spinner per repository, following label pagination.
    repo_bars: HashMap<String, ProgressBar>,
    /// Point lookups for the repository currently being resolved.
    resolve_bar: Option<ProgressBar>,
}

/// Interactive progress reporter using indicatif.
pub struct InteractiveReporter {
    multi: MultiProgress,
    state: Mutex<ProgressState>,
}

impl InteractiveReporter {
    pub fn new() -> Self {
        Self::with_multi(MultiProgress::new())
    }

    /// A reporter that draws nothing.
    #[cfg(test)]
    pub fn hidden() -> Self {
        Self::with_multi(MultiProgress::with_draw_target(indicatif::ProgressDrawTarget::hidden()))
    }

    fn with_multi(multi: MultiProgress) -> Self {
        Self {
            multi,
            state: Mutex::new(ProgressState::default()),
        }
    }

    fn note(&self, message: String) {
        if self.multi.println(&message).is_err() {
            eprintln!("{}", message);
        }
    }

    pub fn handle(&self, event: DownloadProgress) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());

        match event {
            DownloadProgress::RepositoryStarted {
                repository,
                index,
                total,
            } => {
                let bar = self.multi.add(ProgressBar::new_spinner());
                bar.set_style(Self::spinner_style());
                bar.enable_steady_tick(Duration::from_millis(100));
                bar.set_prefix(format!("[{}/{}] {}", index, total, repository));
                bar.set_message("Fetching labels...");
                state.repo_bars.insert(repository, bar);
            }

            DownloadProgress::LabelsFetched {
                repository,
                total,
                of_interest,
            } => {
                if let Some(bar) = state.repo_bars.get(&repository) {
                    bar.set_message(format!("{} of {} labels of interest", of_interest, total));
                }
            }

            DownloadProgress::FetchingLabel {
                repository,
                label,
                kind,
                expected,
            } => {
                if let Some(bar) = state.repo_bars.get(&repository) {
                    bar.set_message(format!("{} {}: 0/{}", label, kind, expected));
                }
            }

            DownloadProgress::FetchedPage {
                repository,
                label,
                kind,
                page,
                total_so_far,
                ..
            } => {
                if let Some(bar) = state.repo_bars.get(&repository) {
                    bar.set_message(format!(
                        "{} {}: {} (page {})",
                        label, kind, total_so_far, page
                    ));
                }
            }

            DownloadProgress::EmptyPageRetry {
                repository,
                label,
                kind,
                page,
                attempt,
                ..
            } => {
                if let Some(bar) = state.repo_bars.get(&repository) {
                    bar.set_message(format!(
                        "{} {}: empty page {}, retry {}",
                        label, kind, page, attempt
                    ));
                }
            }

            DownloadProgress::PaginationStopped {
                repository,
                label,
                kind,
                retrieved,
                expected,
                reason,
            } => {
                self.note(format!(
                    "{} {}: taking {} of {} {} for '{}' ({})",
                    style("!").yellow(),
                    repository,
                    retrieved,
                    expected,
                    kind,
                    label,
                    reason
                ));
            }

            DownloadProgress::LabelComplete { .. } => {}

            DownloadProgress::ResolvingMissing {
                repository,
                missing_issues,
                missing_pull_requests,
                candidates,
            } => {
                if let Some(bar) = state.repo_bars.get(&repository) {
                    bar.set_message(format!(
                        "{} issues and {} pull requests missing",
                        missing_issues, missing_pull_requests
                    ));
                }
                let bar = self.multi.add(ProgressBar::new(candidates as u64));
                bar.set_style(Self::bar_style());
                bar.set_prefix(format!("{:>12}", "resolve"));
                bar.set_message(repository);
                state.resolve_bar = Some(bar);
            }

            DownloadProgress::ResolveProgress { processed, .. } => {
                if let Some(ref bar) = state.resolve_bar {
                    bar.set_position(processed as u64);
                }
            }

            DownloadProgress::RateLimitBackoff {
                number,
                retry_after_ms,
                ..
            } => {
                if let Some(ref bar) = state.resolve_bar {
                    bar.set_message(format!(
                        "rate limited at #{}, waiting {}s",
                        number,
                        retry_after_ms / 1000
                    ));
                }
            }

            DownloadProgress::ItemSkipped { .. } => {}

            DownloadProgress::ResolveComplete {
                resolved,
                not_found,
                failed,
                ..
            } => {
                if let Some(bar) = state.resolve_bar.take() {
                    bar.finish_with_message(format!(
                        "{} resolved, {} not found, {} failed",
                        resolved, not_found, failed
                    ));
                }
            }

            DownloadProgress::RepositoryComplete {
                repository,
                entries,
            } => {
                if let Some(bar) = state.repo_bars.get(&repository) {
                    bar.set_style(Self::done_style());
                    bar.finish_with_message(format!("{} entries in corpus", entries));
                }
            }

            DownloadProgress::Interrupted => {
                self.note(format!(
                    "{} Interrupted, writing partial corpus",
                    style("!").yellow()
                ));
            }

            DownloadProgress::Warning { message } => {
                self.note(format!("{} {}", style("!").yellow(), message));
            }

            _ => {}
        }
    }

    pub fn finish(&self) {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        for bar in state.repo_bars.values() {
            if !bar.is_finished() {
                bar.finish();
            }
        }
        if let Some(ref pb) = state.resolve_bar
            && !pb.is_finished()
        {
            pb.finish();
        }
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{prefix:.bold.cyan} {spinner:.green} {msg}")
            .expect("Invalid template")
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
    }

    fn done_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{prefix:.bold.cyan} {msg:.green}")
            .expect("Invalid template")
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{prefix:.bold.cyan} [{bar:40.cyan/blue}] {pos:>4}/{len:4} {msg}")
            .expect("Invalid template")
            .progress_chars("█▓░")
    }
}

impl Default for InteractiveReporter {
    fn default() -> Self {
        Self::new()
    }
}
