//! Integration tests for the download pipeline.
//!
//! A scripted client stands in for GitHub so the whole flow runs offline:
//! label totals, label pagination, reconciliation, point lookups and the
//! final write.
//!
//! Key scenarios tested:
//! - Bulk pagination alone covers every expected item
//! - A shortfall is recovered through the issue listing and point lookups
//! - A shortfall in one repository triggers lookups across the whole group
//! - An item under two labels of interest keeps the first label's entry
//! - Seed entries win over downloaded ones
//! - The controller writes a reloadable corpus, even after a failure

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use labeler::corpus::{Corpus, CorpusLine, HEADER, Record, TrainingItem};
use labeler::download::{DownloadOptions, PipelineController, PipelineError, download_repositories};
use labeler::platform::{
    BulkItem, IssueDetail, IssueSummary, ItemKind, ItemLabel, ItemPage, LabelSummary, Lookup,
    PlatformClient, PlatformError, RateLimitInfo, Result,
};
use labeler::repository::RepositoryRef;

const SERVICE: &str = "e99695";

fn created(number: u64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_600_000_000 + number as i64 * 60, 0)
        .unwrap()
}

fn bulk_item(number: u64) -> BulkItem {
    BulkItem {
        number,
        author: Some("octocat".to_string()),
        title: format!("Item {number}"),
        body: Some("Body".to_string()),
        created_at: created(number),
        files: Vec::new(),
        files_truncated: false,
    }
}

fn page(numbers: &[u64], next: Option<&str>, total: u64) -> ItemPage {
    ItemPage {
        items: numbers.iter().copied().map(bulk_item).collect(),
        has_next_page: next.is_some(),
        end_cursor: next.map(str::to_string),
        total_count: total,
    }
}

fn bug_label() -> ItemLabel {
    ItemLabel {
        name: "bug".to_string(),
        color: SERVICE.to_string(),
    }
}

fn summary(number: u64) -> IssueSummary {
    summary_in("octo/widgets", number)
}

fn summary_in(repo: &str, number: u64) -> IssueSummary {
    IssueSummary {
        number,
        html_url: format!("https://github.com/{repo}/issues/{number}"),
        labels: vec![bug_label()],
    }
}

fn detail(number: u64) -> IssueDetail {
    IssueDetail {
        number,
        author: Some("hubot".to_string()),
        title: format!("Resolved {number}"),
        body: None,
        created_at: created(number),
        is_pull_request: false,
        labels: vec![bug_label()],
    }
}

/// Scripted stand-in for the GitHub API.
///
/// Every repository shares the label totals. Pages are scripted per
/// repository, and the issue listing only returns summaries whose URL points
/// into the requested repository.
#[derive(Default)]
struct TestClient {
    labels: Vec<LabelSummary>,
    pages: Mutex<HashMap<(String, String, ItemKind), VecDeque<ItemPage>>>,
    issues: Vec<IssueSummary>,
    details: HashMap<u64, IssueDetail>,
    fail_labels: bool,
    requested_labels: Mutex<Vec<String>>,
    calls: Mutex<Vec<String>>,
    fetched: Mutex<Vec<u64>>,
}

impl TestClient {
    fn with_pages(self, label: &str, kind: ItemKind, pages: Vec<ItemPage>) -> Self {
        self.with_repo_pages("octo/widgets", label, kind, pages)
    }

    fn with_repo_pages(
        mut self,
        repo: &str,
        label: &str,
        kind: ItemKind,
        pages: Vec<ItemPage>,
    ) -> Self {
        self.pages
            .get_mut()
            .unwrap()
            .insert((repo.to_string(), label.to_string(), kind), pages.into());
        self
    }

    /// Page and listing requests in the order they were made.
    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn listed(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| c.strip_prefix("list ").map(str::to_string))
            .collect()
    }

    fn fetched(&self) -> Vec<u64> {
        self.fetched.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn requested_labels(&self) -> Vec<String> {
        self.requested_labels
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl PlatformClient for TestClient {
    async fn get_rate_limit(&self) -> Result<RateLimitInfo> {
        Ok(RateLimitInfo {
            limit: 5000,
            remaining: 5000,
            reset_at: Utc::now(),
        })
    }

    async fn label_counts(&self, repo: &RepositoryRef) -> Result<Vec<LabelSummary>> {
        if self.fail_labels {
            return Err(PlatformError::not_found(repo.to_string()));
        }
        Ok(self.labels.clone())
    }

    async fn items_page(
        &self,
        repo: &RepositoryRef,
        label: &str,
        kind: ItemKind,
        _page_size: u32,
        _after: Option<&str>,
    ) -> Result<Option<ItemPage>> {
        self.requested_labels
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(label.to_string());
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(format!("page {repo}"));
        Ok(self
            .pages
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get_mut(&(repo.to_string(), label.to_string(), kind))
            .and_then(VecDeque::pop_front))
    }

    async fn list_issues(&self, repo: &RepositoryRef) -> Result<Vec<IssueSummary>> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(format!("list {repo}"));
        let prefix = format!("https://github.com/{repo}/issues/");
        Ok(self
            .issues
            .iter()
            .filter(|i| i.html_url.starts_with(&prefix))
            .cloned()
            .collect())
    }

    async fn fetch_item(&self, _repo: &RepositoryRef, number: u64) -> Lookup<IssueDetail> {
        self.fetched
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(number);
        match self.details.get(&number) {
            Some(detail) => Lookup::Found(detail.clone()),
            None => Lookup::NotFound,
        }
    }

    async fn pull_request_files(&self, _repo: &RepositoryRef, _number: u64) -> Lookup<Vec<String>> {
        Lookup::Found(Vec::new())
    }
}

fn labels(issues: u64) -> Vec<LabelSummary> {
    vec![
        LabelSummary {
            name: "bug".to_string(),
            color: SERVICE.to_string(),
            issue_count: issues,
            pull_request_count: 0,
        },
        LabelSummary {
            name: "question".to_string(),
            color: "00ff00".to_string(),
            issue_count: 40,
            pull_request_count: 2,
        },
    ]
}

fn widgets() -> Vec<RepositoryRef> {
    vec![RepositoryRef::parse("octo/widgets").unwrap()]
}

// ─── Bulk Path ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_bulk_path_covers_expected_count() {
    let client = TestClient {
        labels: labels(3),
        ..Default::default()
    }
    .with_pages(
        "bug",
        ItemKind::Issue,
        vec![page(&[1, 2], Some("abc"), 3), page(&[3], None, 3)],
    );

    let mut corpus = Corpus::new();
    let report = download_repositories(
        &client,
        &widgets(),
        &DownloadOptions::default(),
        &mut corpus,
        None,
    )
    .await
    .unwrap();

    assert_eq!(corpus.len(), 3);
    assert_eq!(report.entries, 3);
    assert_eq!(report.missing_issues(), 0);
    assert_eq!(report.missing_pull_requests(), 0);
    assert!(report.repositories[0].resolve.is_none());
    assert!(client.listed().is_empty());
    assert!(client.fetched().is_empty());

    // Labels outside the interest filter are never paginated.
    assert!(client.requested_labels().iter().all(|l| l == "bug"));

    let numbers: Vec<u64> = corpus.iter().map(|(k, _)| k.identifier).collect();
    assert_eq!(numbers, vec![1, 2, 3]);
    for (_, line) in corpus.iter() {
        assert!(line.as_str().contains("\tbug\t"));
        assert!(!line.is_pull_request());
    }
}

// ─── Resolution Path ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_shortfall_resolved_by_point_lookups() {
    let client = TestClient {
        labels: labels(5),
        issues: (10..=14).map(summary).collect(),
        details: HashMap::from([(13, detail(13))]),
        ..Default::default()
    }
    .with_pages("bug", ItemKind::Issue, vec![page(&[10, 11, 12], None, 5)]);

    let mut corpus = Corpus::new();
    let report = download_repositories(
        &client,
        &widgets(),
        &DownloadOptions::default(),
        &mut corpus,
        None,
    )
    .await
    .unwrap();

    assert_eq!(report.missing_issues(), 2);
    assert_eq!(client.listed(), vec!["octo/widgets"]);
    // Items already retrieved in bulk are never looked up again.
    assert_eq!(client.fetched(), vec![13, 14]);

    let stats = report.repositories[0].resolve.clone().unwrap();
    assert_eq!(stats.candidates, 2);
    assert_eq!(stats.resolved, 1);
    assert_eq!(stats.not_found, 1);

    assert_eq!(corpus.len(), 4);
    let numbers: Vec<u64> = corpus.iter().map(|(k, _)| k.identifier).collect();
    assert_eq!(numbers, vec![10, 11, 12, 13]);
    let key = TrainingItem::new(created(13), 13, "widgets");
    assert!(corpus.get(&key).unwrap().as_str().contains("Resolved 13"));
}

#[tokio::test]
async fn test_group_shortfall_resolves_every_repository() {
    // widgets is complete in bulk, gadgets is one short.
    let client = TestClient {
        labels: labels(2),
        issues: vec![
            summary_in("octo/widgets", 1),
            summary_in("octo/widgets", 2),
            summary_in("octo/widgets", 3),
            summary_in("octo/gadgets", 10),
            summary_in("octo/gadgets", 11),
        ],
        details: HashMap::from([(3, detail(3)), (11, detail(11))]),
        ..Default::default()
    }
    .with_repo_pages("octo/widgets", "bug", ItemKind::Issue, vec![page(&[1, 2], None, 2)])
    .with_repo_pages("octo/gadgets", "bug", ItemKind::Issue, vec![page(&[10], None, 2)]);

    let repos = vec![
        RepositoryRef::parse("octo/widgets").unwrap(),
        RepositoryRef::parse("octo/gadgets").unwrap(),
    ];
    let mut corpus = Corpus::new();
    let report = download_repositories(
        &client,
        &repos,
        &DownloadOptions::default(),
        &mut corpus,
        None,
    )
    .await
    .unwrap();

    // Every bulk request precedes the first listing.
    assert_eq!(
        client.calls(),
        vec![
            "page octo/widgets",
            "page octo/gadgets",
            "list octo/widgets",
            "list octo/gadgets",
        ]
    );
    assert_eq!(client.fetched(), vec![3, 11]);

    assert_eq!(report.repositories[0].missing_issues, 0);
    assert_eq!(report.repositories[1].missing_issues, 1);
    assert_eq!(report.missing_issues(), 1);
    assert_eq!(report.repositories[0].resolve.clone().unwrap().resolved, 1);
    assert_eq!(report.repositories[1].resolve.clone().unwrap().resolved, 1);

    assert_eq!(corpus.len(), 5);
    assert!(
        corpus
            .get(&TrainingItem::new(created(3), 3, "widgets"))
            .is_some()
    );
    assert!(
        corpus
            .get(&TrainingItem::new(created(11), 11, "gadgets"))
            .is_some()
    );
}

// ─── Overlapping Labels ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_item_under_two_labels_keeps_first_label() {
    let client = TestClient {
        labels: vec![
            LabelSummary {
                name: "bug".to_string(),
                color: SERVICE.to_string(),
                issue_count: 2,
                pull_request_count: 0,
            },
            LabelSummary {
                name: "Service/Storage".to_string(),
                color: SERVICE.to_string(),
                issue_count: 1,
                pull_request_count: 0,
            },
        ],
        ..Default::default()
    }
    .with_pages("bug", ItemKind::Issue, vec![page(&[1, 2], None, 2)])
    .with_pages("Service/Storage", ItemKind::Issue, vec![page(&[1], None, 1)]);

    let mut corpus = Corpus::new();
    let report = download_repositories(
        &client,
        &widgets(),
        &DownloadOptions::default(),
        &mut corpus,
        None,
    )
    .await
    .unwrap();

    assert_eq!(client.requested_labels(), vec!["bug", "Service/Storage"]);
    assert_eq!(report.missing_issues(), 0);
    assert_eq!(report.repositories[0].bulk_entries, 2);
    assert!(client.listed().is_empty());

    assert_eq!(corpus.len(), 2);
    let line = corpus
        .get(&TrainingItem::new(created(1), 1, "widgets"))
        .unwrap();
    assert!(line.as_str().contains("\tbug\t"));
    assert!(!line.as_str().contains("Service/Storage"));
}

// ─── Seeds and Output ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_seed_entries_take_precedence() {
    let client = TestClient {
        labels: labels(2),
        ..Default::default()
    }
    .with_pages("bug", ItemKind::Issue, vec![page(&[1, 2], None, 2)]);

    let seed_key = TrainingItem::new(created(1), 1, "widgets");
    let seed_line = CorpusLine::new(
        &seed_key,
        &Record {
            label: "bug",
            title: "Seeded title",
            body: None,
            author: None,
            files: None,
        },
    );
    let mut corpus = Corpus::new();
    corpus.insert(seed_key.clone(), seed_line.clone());

    download_repositories(
        &client,
        &widgets(),
        &DownloadOptions::default(),
        &mut corpus,
        None,
    )
    .await
    .unwrap();

    assert_eq!(corpus.len(), 2);
    assert_eq!(corpus.get(&seed_key), Some(&seed_line));
}

#[tokio::test]
async fn test_controller_writes_reloadable_corpus() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("widgets.tsv");
    let client = TestClient {
        labels: labels(3),
        ..Default::default()
    }
    .with_pages("bug", ItemKind::Issue, vec![page(&[3, 1, 2], None, 3)]);

    let controller = PipelineController::new(&client, DownloadOptions::default(), &output);
    let mut corpus = Corpus::new();
    let report = controller.run(&widgets(), &mut corpus, None).await.unwrap();
    assert_eq!(report.entries, 3);

    let contents = std::fs::read_to_string(&output).unwrap();
    let mut lines = contents.lines();
    assert_eq!(lines.next(), Some(HEADER));
    assert_eq!(lines.count(), 3);

    let reloaded = Corpus::load(&output).unwrap();
    assert_eq!(reloaded, corpus);
}

#[tokio::test]
async fn test_controller_flushes_after_failure() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.tsv");
    let client = TestClient {
        fail_labels: true,
        ..Default::default()
    };

    let seed_key = TrainingItem::new(created(9), 9, "widgets");
    let mut corpus = Corpus::new();
    corpus.insert(
        seed_key.clone(),
        CorpusLine::new(
            &seed_key,
            &Record {
                label: "bug",
                title: "Kept",
                body: None,
                author: None,
                files: None,
            },
        ),
    );

    let controller = PipelineController::new(&client, DownloadOptions::default(), &output);
    let err = controller.run(&widgets(), &mut corpus, None).await.unwrap_err();
    assert!(matches!(err, PipelineError::Platform { .. }));

    let reloaded = Corpus::load(&output).unwrap();
    assert_eq!(reloaded.len(), 1);
    assert!(reloaded.get(&seed_key).is_some());
}
