//! Conversions from octocrab REST models to platform types.

use octocrab::models::issues::Issue;

use crate::platform::{IssueDetail, IssueSummary, ItemLabel};

fn to_item_labels(labels: &[octocrab::models::Label]) -> Vec<ItemLabel> {
    labels
        .iter()
        .map(|l| ItemLabel {
            name: l.name.clone(),
            color: l.color.clone(),
        })
        .collect()
}

/// Convert a listed issue (or pull request) into a summary.
pub fn to_issue_summary(issue: &Issue) -> IssueSummary {
    IssueSummary {
        number: issue.number,
        html_url: issue.html_url.to_string(),
        labels: to_item_labels(&issue.labels),
    }
}

/// Convert a single fetched issue into full detail.
pub fn to_issue_detail(issue: Issue) -> IssueDetail {
    let author = Some(issue.user.login).filter(|login| !login.is_empty());
    IssueDetail {
        number: issue.number,
        author,
        is_pull_request: issue.pull_request.is_some(),
        labels: to_item_labels(&issue.labels),
        title: issue.title,
        body: issue.body,
        created_at: issue.created_at,
    }
}
