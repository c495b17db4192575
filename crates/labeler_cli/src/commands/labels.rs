use clap::Args;
use labeler::github::GitHubClient;
use labeler::platform::LabelSummary;
use labeler::{FilterError, InterestFilter, MatchMode, PlatformClient, RepositoryRef};

use crate::commands::limits::OutputFormat;
use crate::commands::require_token;
use crate::config::Config;

#[derive(Debug, Args)]
pub(crate) struct LabelsArgs {
    /// Repository to inspect, as owner/name
    #[arg(value_name = "OWNER/NAME")]
    pub repo: String,

    /// Also list labels that are not of interest
    #[arg(short, long)]
    pub all: bool,

    /// Whether a label must match every label type or any of them
    #[arg(long = "match", value_name = "MODE")]
    pub match_mode: Option<MatchMode>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    pub output: OutputFormat,
}

/// Handle the labels command.
pub(crate) async fn handle_labels(
    args: LabelsArgs,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let repo = RepositoryRef::parse(&args.repo)
        .map_err(|e| format!("Invalid repository '{}': {}", args.repo, e))?;
    let token = require_token(config)?;
    let client = GitHubClient::new(&token)?;

    let labels = client.label_counts(&repo).await?;
    let filter = config.labels.filter(args.match_mode);
    let rows = label_rows(&labels, &filter, args.all)?;

    tracing::debug!(
        repo = %repo,
        total = labels.len(),
        shown = rows.len(),
        "Listed labels"
    );
    LabelDisplay::print_many(rows, args.output)?;
    Ok(())
}

/// A label with its counts and interest verdict.
#[derive(Debug, Clone, serde::Serialize, tabled::Tabled)]
pub(crate) struct LabelDisplay {
    #[tabled(rename = "Label")]
    pub name: String,
    #[tabled(rename = "Color")]
    pub color: String,
    #[tabled(rename = "Issues")]
    pub issues: u64,
    #[tabled(rename = "Pull Requests")]
    pub pull_requests: u64,
    #[tabled(rename = "Interest")]
    pub interest: bool,
}

impl LabelDisplay {
    pub(crate) fn print_many(items: Vec<Self>, format: OutputFormat) -> serde_json::Result<()> {
        match format {
            OutputFormat::Table => {
                if items.is_empty() {
                    println!("No labels of interest.");
                    return Ok(());
                }
                let mut table = tabled::Table::new(items);
                table.with(tabled::settings::Style::rounded());
                println!("{}", table);
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&items)?);
            }
        }
        Ok(())
    }
}

/// Classify `labels`, dropping uninteresting ones unless `all` is set.
pub(crate) fn label_rows(
    labels: &[LabelSummary],
    filter: &InterestFilter,
    all: bool,
) -> Result<Vec<LabelDisplay>, FilterError> {
    let mut rows = Vec::with_capacity(labels.len());
    for label in labels {
        let interest = filter.accept(label)?;
        if interest || all {
            rows.push(LabelDisplay {
                name: label.name.clone(),
                color: label.color.clone(),
                issues: label.issue_count,
                pull_requests: label.pull_request_count,
                interest,
            });
        }
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use labeler::LabelType;

    fn label(name: &str, color: &str, issues: u64, prs: u64) -> LabelSummary {
        LabelSummary {
            name: name.to_string(),
            color: color.to_string(),
            issue_count: issues,
            pull_request_count: prs,
        }
    }

    fn filter() -> InterestFilter {
        InterestFilter::any_type(vec![LabelType::new("Service", "e99695")])
    }

    #[test]
    fn label_rows_keeps_only_interest_by_default() {
        let labels = vec![
            label("Service/Storage", "e99695", 12, 3),
            label("question", "d876e3", 40, 0),
        ];

        let rows = label_rows(&labels, &filter(), false).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "Service/Storage");
        assert_eq!(rows[0].pull_requests, 3);
        assert!(rows[0].interest);
    }

    #[test]
    fn label_rows_with_all_marks_rejected_labels() {
        let labels = vec![
            label("Service/Storage", "e99695", 12, 3),
            label("question", "d876e3", 40, 0),
        ];

        let rows = label_rows(&labels, &filter(), true).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(!rows[1].interest);
    }

    #[test]
    fn print_many_handles_empty_and_json() {
        LabelDisplay::print_many(Vec::new(), OutputFormat::Table).unwrap();
        let rows = label_rows(&[label("Service/Web", "e99695", 1, 1)], &filter(), false).unwrap();
        LabelDisplay::print_many(rows, OutputFormat::Json).unwrap();
    }
}
