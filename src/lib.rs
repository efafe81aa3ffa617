//! gqlkit: GraphQL client code generation and a pull request release-file
//! check.
//!
//! The codegen half resolves plugins by reference, builds typed models for a
//! query against a schema and hands them to each plugin to render. The
//! release-check half reports on a pull request's `RELEASE.md` through a
//! single bot comment and a label.

pub mod cli;
pub mod codegen;
pub mod entrypoint;
pub mod github;
pub mod registry;
pub mod release_check;
pub mod release_file;
pub mod types;

pub use cli::{CliError, parse_args, run_codegen};
pub use github::{ApiError, GitHub, PullRequestApi};
pub use registry::{PluginError, PluginRegistry, PluginType};
pub use release_check::{add_or_edit_comment, update_labels};
pub use release_file::{ReleaseFile, ReleaseFileError, ReleaseType, render_comment};
pub use types::{IssueComment, Label, LabelSet, PullRequestEvent};
