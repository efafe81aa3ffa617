//! Keeps a single signed status comment and the release-file label in sync on
//! a pull request.
//!
//! Every call is best effort: failed requests are logged and the flow carries
//! on, so a flaky API never fails the surrounding CI job.

use tracing::{debug, error, info, warn};

use crate::{
    github::{ApiError, PullRequestApi},
    types::{IssueComment, Label, LabelSet, PullRequestEvent},
};

/// Appended to every comment this check posts.
pub const SIGNATURE: &str = "<!-- action-check: release-file -->";

/// Logins allowed to own the status comment.
pub const BOT_LOGINS: [&str; 2] = ["github-actions[bot]", "botberry"];

pub const RELEASE_FILE_LABEL: &str = "bot:has-release-file";

pub fn is_release_check_comment(comment: &IssueComment) -> bool {
    BOT_LOGINS.contains(&comment.user.login.as_str()) && comment.body.contains(SIGNATURE)
}

fn log_failure(action: &str, url: &str, err: &ApiError) {
    match err {
        ApiError::Status { status, body } => {
            error!(%status, url, body = body.as_str(), "failed to {action}")
        }
        err => error!(url, error = %err, "failed to {action}"),
    }
}

/// Creates the status comment, or edits the existing one in place.
pub async fn add_or_edit_comment<A>(api: &A, event: &PullRequestEvent, comment: &str)
where
    A: PullRequestApi + Sync,
{
    let comments_link = event.comments_link();

    let current_comments = match api.list_comments(comments_link).await {
        Ok(comments) => comments,
        Err(err) => {
            // Without the current comments a create could duplicate the
            // status comment.
            log_failure("list comments", comments_link, &err);
            warn!("skipping status comment update");
            return;
        }
    };

    let body = format!("{comment}{SIGNATURE}");
    let previous = current_comments.iter().find(|c| is_release_check_comment(c));

    match previous {
        Some(previous) => {
            debug!(url = previous.url.as_str(), "found previous status comment");
            match api.update_comment(&previous.url, &body).await {
                Ok(()) => info!(url = previous.url.as_str(), "updated status comment"),
                Err(err) => log_failure("update comment", &previous.url, &err),
            }
        }
        None => match api.create_comment(comments_link, &body).await {
            Ok(()) => info!(url = comments_link, "created status comment"),
            Err(err) => log_failure("create comment", comments_link, &err),
        },
    }
}

/// Adds or removes the release-file label so it matches
/// `has_valid_release_file`. `labels` is updated after each successful call.
pub async fn update_labels<A>(
    api: &A,
    event: &PullRequestEvent,
    labels: &mut LabelSet,
    has_valid_release_file: bool,
) where
    A: PullRequestApi + Sync,
{
    let managed = vec![RELEASE_FILE_LABEL.to_string()];
    let (labels_to_add, labels_to_remove) = if has_valid_release_file {
        (managed, Vec::new())
    } else {
        (Vec::new(), managed)
    };

    if !labels.is_superset(labels_to_add.iter().map(String::as_str)) {
        match event.labels_link() {
            Ok(labels_url) => match api.add_labels(labels_url.as_str(), &labels_to_add).await {
                Ok(current) => {
                    info!(labels = ?labels_to_add, "added labels");
                    for label in current {
                        labels.insert(label);
                    }
                    for name in &labels_to_add {
                        if !labels.contains(name) {
                            labels.insert(Label {
                                name: name.clone(),
                                url: format!("{}/{}", labels_url, name),
                            });
                        }
                    }
                }
                Err(err) => log_failure("add labels", labels_url.as_str(), &err),
            },
            Err(err) => error!(
                issue_url = event.pull_request.issue_url.as_str(),
                error = %err,
                "invalid issue URL"
            ),
        }
    }

    if !labels.is_superset(labels_to_remove.iter().map(String::as_str)) {
        return;
    }

    for name in &labels_to_remove {
        let Some(url) = labels.url_of(name).map(str::to_string) else {
            continue;
        };
        match api.remove_label(&url).await {
            Ok(()) => {
                info!(label = name.as_str(), "removed label");
                labels.remove(name);
            }
            Err(err) => log_failure("remove label", &url, &err),
        }
    }
}
