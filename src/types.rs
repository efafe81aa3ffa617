use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Pull request webhook payload, as delivered in `GITHUB_EVENT_PATH`.
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestEvent {
    pub pull_request: PullRequestPayload,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestPayload {
    #[serde(rename = "_links")]
    pub links: PullRequestLinks,
    pub issue_url: String,
    #[serde(default)]
    pub labels: Vec<Label>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestLinks {
    pub comments: Link,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Link {
    pub href: String,
}

/// A label attached to an issue or pull request. `url` is the address the
/// label is deleted through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IssueComment {
    pub url: String,
    pub body: String,
    pub user: CommentUser,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommentUser {
    pub login: String,
}

impl PullRequestEvent {
    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }

    pub fn comments_link(&self) -> &str {
        &self.pull_request.links.comments.href
    }

    /// The issue labels endpoint, `issue_url` + `/labels`.
    pub fn labels_link(&self) -> Result<url::Url, url::ParseError> {
        let base = format!("{}/", self.pull_request.issue_url.trim_end_matches('/'));
        url::Url::parse(&base)?.join("labels")
    }

    pub fn label_set(&self) -> LabelSet {
        LabelSet::from_labels(self.pull_request.labels.iter().cloned())
    }
}

/// Current labels of a pull request, keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSet {
    urls_by_name: BTreeMap<String, String>,
}

impl LabelSet {
    pub fn from_labels(labels: impl IntoIterator<Item = Label>) -> Self {
        Self {
            urls_by_name: labels.into_iter().map(|l| (l.name, l.url)).collect(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.urls_by_name.contains_key(name)
    }

    pub fn is_superset<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> bool {
        names.into_iter().all(|name| self.contains(name))
    }

    pub fn url_of(&self, name: &str) -> Option<&str> {
        self.urls_by_name.get(name).map(String::as_str)
    }

    pub fn insert(&mut self, label: Label) {
        self.urls_by_name.insert(label.name, label.url);
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.urls_by_name.remove(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.urls_by_name.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.urls_by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls_by_name.is_empty()
    }
}
