//! Download pipeline for a repository group.
//!
//! The group is downloaded in two passes. The bulk pass, per repository:
//!
//! 1. fetch label totals and keep the labels of interest
//! 2. page through every such label, issues first, then pull requests
//! 3. compare what arrived with the totals
//!
//! If the shortfall summed over the whole group is above zero, the resolve
//! pass then looks up candidates one by one in every repository of the group.
//!
//! All bulk entries are merged into the corpus before any resolved one, so the
//! bulk version of an item wins on overlap. Everything runs sequentially
//! against a single request budget.
//!
//! # Example
//!
//! ```ignore
//! use labeler::corpus::Corpus;
//! use labeler::download::{DownloadOptions, PipelineController};
//!
//! let controller = PipelineController::new(&client, DownloadOptions::default(), output);
//! let mut corpus = Corpus::new();
//! let report = controller.run(&repos, &mut corpus, None).await?;
//! println!("{} entries", report.entries);
//! ```

use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::corpus::Corpus;
use crate::platform::{ItemKind, PlatformClient};
use crate::repository::RepositoryRef;

use super::paginate::{fetch_by_label, to_corpus};
use super::progress::{DownloadProgress, ProgressCallback, emit};
use super::reconcile::Reconciliation;
use super::resolve::{candidates, interest_set, resolve};
use super::types::{DownloadOptions, DownloadReport, PipelineError, RepositoryReport};

/// Check everything that must hold before the first request is made.
pub fn check_preconditions(
    token: &str,
    repos: &[RepositoryRef],
    output: &Path,
) -> Result<(), PipelineError> {
    if token.trim().is_empty() {
        return Err(PipelineError::MissingToken);
    }
    if repos.is_empty() {
        return Err(PipelineError::NoRepositories);
    }
    check_output(output)
}

/// The directory that will hold `output` must exist and be writable.
pub fn check_output(output: &Path) -> Result<(), PipelineError> {
    let dir = output
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));

    let unusable = |reason: &str| PipelineError::OutputDirectory {
        path: dir.to_path_buf(),
        reason: reason.to_string(),
    };

    let metadata = std::fs::metadata(dir).map_err(|e| unusable(&e.to_string()))?;
    if !metadata.is_dir() {
        return Err(unusable("not a directory"));
    }
    if metadata.permissions().readonly() {
        return Err(unusable("read-only"));
    }
    Ok(())
}

/// Bulk pass for one repository: label totals, then every label of interest.
///
/// Shortfalls are added to `group` as well as to the returned report.
#[tracing::instrument(skip_all, fields(repo = %repo))]
pub async fn fetch_repository<C: PlatformClient + ?Sized>(
    client: &C,
    repo: &RepositoryRef,
    options: &DownloadOptions,
    corpus: &mut Corpus,
    group: &mut Reconciliation,
    on_progress: Option<&ProgressCallback>,
) -> Result<RepositoryReport, PipelineError> {
    let mut report = RepositoryReport {
        repository: repo.to_string(),
        ..Default::default()
    };

    let labels = client
        .label_counts(repo)
        .await
        .map_err(|source| PipelineError::Platform {
            repository: repo.to_string(),
            source,
        })?;
    let of_interest = options.filter.select(&labels)?;
    report.labels_of_interest = of_interest.len();

    tracing::info!(
        total = labels.len(),
        of_interest = of_interest.len(),
        "Fetched labels"
    );
    emit(
        on_progress,
        DownloadProgress::LabelsFetched {
            repository: repo.to_string(),
            total: labels.len(),
            of_interest: of_interest.len(),
        },
    );

    let mut bulk = Corpus::new();
    let mut recon = Reconciliation::default();

    'kinds: for kind in ItemKind::ALL {
        for label in &of_interest {
            if options.shutdown_requested() {
                break 'kinds;
            }

            let expected = label.count(kind);
            if expected == 0 {
                continue;
            }

            let fetch =
                fetch_by_label(client, repo, &label.name, kind, expected, options, on_progress)
                    .await;
            let retrieved = fetch.retrieved();
            let missing = recon.record(kind, expected, retrieved);

            if !fetch.complete {
                report.incomplete_labels.push((label.name.clone(), kind));
            }

            tracing::info!(
                label = %label.name,
                %kind,
                retrieved,
                expected,
                missing,
                "Label complete"
            );
            emit(
                on_progress,
                DownloadProgress::LabelComplete {
                    repository: repo.to_string(),
                    label: label.name.clone(),
                    kind,
                    retrieved,
                    expected,
                    missing,
                },
            );

            bulk.merge(to_corpus(repo, &label.name, kind, &fetch.items));
        }
    }

    report.bulk_entries = corpus.merge(bulk);
    report.missing_issues = recon.missing_issues;
    report.missing_pull_requests = recon.missing_pull_requests;
    group.absorb(recon);

    Ok(report)
}

/// Resolve pass for one repository: look up every item of interest the
/// corpus does not hold yet and merge what comes back.
///
/// `report` supplies the shortfall for logging and receives the stats.
#[tracing::instrument(skip_all, fields(repo = %repo))]
pub async fn resolve_repository<C: PlatformClient + ?Sized>(
    client: &C,
    repo: &RepositoryRef,
    options: &DownloadOptions,
    corpus: &mut Corpus,
    report: &mut RepositoryReport,
    on_progress: Option<&ProgressCallback>,
) -> Result<(), PipelineError> {
    let issues = client
        .list_issues(repo)
        .await
        .map_err(|source| PipelineError::Platform {
            repository: repo.to_string(),
            source,
        })?;
    let interest = interest_set(repo, &issues, &options.filter, on_progress)?;
    let skip = corpus.numbers_for(repo);
    let candidates = candidates(&skip, &interest);

    tracing::info!(
        missing_issues = report.missing_issues,
        missing_pull_requests = report.missing_pull_requests,
        candidates = candidates.len(),
        "Resolving missing items"
    );
    emit(
        on_progress,
        DownloadProgress::ResolvingMissing {
            repository: repo.to_string(),
            missing_issues: report.missing_issues,
            missing_pull_requests: report.missing_pull_requests,
            candidates: candidates.len(),
        },
    );

    let (resolved, stats) = resolve(
        client,
        repo,
        &skip,
        &interest,
        &candidates,
        options,
        on_progress,
    )
    .await?;
    corpus.merge(resolved);
    report.resolve = Some(stats);
    Ok(())
}

/// Download every repository of the group into `corpus`.
///
/// The bulk pass runs over the whole group first. If any repository came up
/// short, the resolve pass then runs over every repository of the group, so
/// all bulk entries are merged before any resolved one. A platform error ends
/// the run; whatever was already merged stays in `corpus`.
#[tracing::instrument(skip_all, fields(repo_count = repos.len()))]
pub async fn download_repositories<C: PlatformClient + ?Sized>(
    client: &C,
    repos: &[RepositoryRef],
    options: &DownloadOptions,
    corpus: &mut Corpus,
    on_progress: Option<&ProgressCallback>,
) -> Result<DownloadReport, PipelineError> {
    let start = Instant::now();
    let mut report = DownloadReport::default();
    let mut group = Reconciliation::default();

    for (index, repo) in repos.iter().enumerate() {
        if options.shutdown_requested() {
            break;
        }

        emit(
            on_progress,
            DownloadProgress::RepositoryStarted {
                repository: repo.to_string(),
                index: index + 1,
                total: repos.len(),
            },
        );

        let repo_report =
            fetch_repository(client, repo, options, corpus, &mut group, on_progress).await?;
        report.repositories.push(repo_report);
    }

    tracing::info!(
        missing_issues = group.missing_issues,
        missing_pull_requests = group.missing_pull_requests,
        "Bulk pass complete"
    );

    if group.needs_resolution() {
        for (repo, repo_report) in repos.iter().zip(report.repositories.iter_mut()) {
            if options.shutdown_requested() {
                break;
            }
            resolve_repository(client, repo, options, corpus, repo_report, on_progress).await?;
        }
    }

    for repo in repos.iter().take(report.repositories.len()) {
        emit(
            on_progress,
            DownloadProgress::RepositoryComplete {
                repository: repo.to_string(),
                entries: corpus.numbers_for(repo).len(),
            },
        );
    }

    if options.shutdown_requested() {
        tracing::warn!("Download interrupted");
        emit(on_progress, DownloadProgress::Interrupted);
        report.interrupted = true;
    }

    report.entries = corpus.len();
    report.elapsed = start.elapsed();
    Ok(report)
}

/// Runs the download for a repository group and writes the corpus.
///
/// The corpus is written whether the download succeeds, fails or is
/// interrupted.
pub struct PipelineController<'a, C: ?Sized> {
    client: &'a C,
    options: DownloadOptions,
    output: PathBuf,
}

impl<'a, C: PlatformClient + ?Sized> PipelineController<'a, C> {
    pub fn new(client: &'a C, options: DownloadOptions, output: impl Into<PathBuf>) -> Self {
        Self {
            client,
            options,
            output: output.into(),
        }
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    pub fn options(&self) -> &DownloadOptions {
        &self.options
    }

    /// Download `repos` into `corpus`, then write `corpus` to the output path.
    ///
    /// `corpus` may already hold seed entries; they keep precedence over
    /// anything downloaded.
    pub async fn run(
        &self,
        repos: &[RepositoryRef],
        corpus: &mut Corpus,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<DownloadReport, PipelineError> {
        if repos.is_empty() {
            return Err(PipelineError::NoRepositories);
        }
        check_output(&self.output)?;

        let outcome =
            download_repositories(self.client, repos, &self.options, corpus, on_progress).await;

        let saved = corpus.save(&self.output);
        match (outcome, saved) {
            (Ok(report), Ok(())) => {
                tracing::info!(
                    entries = corpus.len(),
                    path = %self.output.display(),
                    "Wrote corpus"
                );
                Ok(report)
            }
            (Err(e), Ok(())) => {
                tracing::warn!(
                    entries = corpus.len(),
                    path = %self.output.display(),
                    "Wrote partial corpus after failure"
                );
                Err(e)
            }
            (Err(e), Err(save_err)) => {
                tracing::error!(error = %save_err, "Failed to write partial corpus");
                Err(e)
            }
            (Ok(_), Err(save_err)) => Err(save_err.into()),
        }
    }
}
