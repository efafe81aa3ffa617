use std::{fmt, path::Path, str::FromStr, sync::LazyLock};

use regex::Regex;
use thiserror::Error;

static RELEASE_TYPE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[Rr]elease [Tt]ype:\s*(?P<kind>\S+)\s*$").expect("valid release type regex")
});

pub const EXAMPLE_RELEASE_FILE: &str = "Release type: patch\n\nDescription of the changes, ideally with some examples, if adding a new feature.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseType {
    Major,
    Minor,
    Patch,
}

impl ReleaseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReleaseType::Major => "major",
            ReleaseType::Minor => "minor",
            ReleaseType::Patch => "patch",
        }
    }
}

impl fmt::Display for ReleaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReleaseType {
    type Err = ReleaseFileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "major" => Ok(ReleaseType::Major),
            "minor" => Ok(ReleaseType::Minor),
            "patch" => Ok(ReleaseType::Patch),
            other => Err(ReleaseFileError::UnknownReleaseType(other.to_string())),
        }
    }
}

#[derive(Debug, Error)]
pub enum ReleaseFileError {
    #[error("release file not found")]
    Missing,
    #[error("failed to read release file: {0}")]
    Io(#[from] std::io::Error),
    #[error("first line must be `Release type: <major|minor|patch>`")]
    MissingReleaseType,
    #[error("unknown release type '{0}', expected major, minor or patch")]
    UnknownReleaseType(String),
    #[error("changelog is empty")]
    EmptyChangelog,
}

/// A parsed `RELEASE.md`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseFile {
    pub release_type: ReleaseType,
    pub changelog: String,
}

impl ReleaseFile {
    pub fn parse(text: &str) -> Result<Self, ReleaseFileError> {
        let (first_line, rest) = text.split_once('\n').unwrap_or((text, ""));

        let captures = RELEASE_TYPE_LINE
            .captures(first_line.trim_end_matches('\r'))
            .ok_or(ReleaseFileError::MissingReleaseType)?;
        let release_type = captures["kind"].parse()?;

        let changelog = rest.trim();
        if changelog.is_empty() {
            return Err(ReleaseFileError::EmptyChangelog);
        }

        Ok(Self {
            release_type,
            changelog: changelog.to_string(),
        })
    }

    pub fn from_path(path: &Path) -> Result<Self, ReleaseFileError> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::parse(&text),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(ReleaseFileError::Missing)
            }
            Err(err) => Err(err.into()),
        }
    }
}

/// Body of the status comment for the given release file check outcome.
pub fn render_comment(release_file: &Result<ReleaseFile, ReleaseFileError>) -> String {
    match release_file {
        Ok(release) => format!(
            "Thanks for adding the `RELEASE.md` file!\n\n\
             Here's a preview of the changelog ({release_type} release):\n\n\
             ---\n\n{changelog}\n\n---\n",
            release_type = release.release_type,
            changelog = release.changelog,
        ),
        Err(ReleaseFileError::Missing) => format!(
            "Thanks for the contribution!\n\n\
             This pull request is missing a `RELEASE.md` file. Please add one at the \
             repository root so a release can be published once it is merged. \
             It should look like this:\n\n\
             ```markdown\n{EXAMPLE_RELEASE_FILE}\n```\n"
        ),
        Err(err) => format!(
            "Thanks for the contribution!\n\n\
             The `RELEASE.md` file in this pull request is not valid: {err}.\n\n\
             It should look like this:\n\n\
             ```markdown\n{EXAMPLE_RELEASE_FILE}\n```\n"
        ),
    }
}
