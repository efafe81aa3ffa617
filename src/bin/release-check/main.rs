use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use gqlkit::{
    GitHub, PullRequestApi, PullRequestEvent, ReleaseFile, add_or_edit_comment,
    entrypoint::{exit_with_clap_error, init_tracing},
    github::DryRun,
    render_comment, update_labels,
};

const BUILD_INFO_HUMAN: &str = env!("BUILD_INFO_HUMAN");

#[derive(Parser, Debug)]
#[command(
    name = "release-check",
    about = "Report on a pull request's release file with a bot comment and label"
)]
#[command(long_version = BUILD_INFO_HUMAN)]
struct Args {
    /// Pull request webhook payload
    #[arg(long, env = "GITHUB_EVENT_PATH", value_name = "FILE")]
    event_path: PathBuf,

    /// Release file to check
    #[arg(long, env = "RELEASE_FILE", default_value = "RELEASE.md", value_name = "FILE")]
    release_file: PathBuf,

    /// Log the calls that would change the pull request instead of making them
    #[arg(long, env = "RELEASE_CHECK_DRY_RUN")]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("info");

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => exit_with_clap_error(&err),
    };

    let raw = std::fs::read_to_string(&args.event_path)
        .with_context(|| format!("Failed to read event payload {}", args.event_path.display()))?;
    let event = PullRequestEvent::from_json(&raw).context("Failed to parse event payload")?;

    let release_file = ReleaseFile::from_path(&args.release_file);
    match &release_file {
        Ok(release) => info!(release_type = %release.release_type, "release file is valid"),
        Err(err) => info!(error = %err, "release file is not valid"),
    }
    let comment = render_comment(&release_file);

    let github = GitHub::from_env()?;
    if args.dry_run {
        run(&DryRun(github), &event, &comment, release_file.is_ok()).await;
    } else {
        run(&github, &event, &comment, release_file.is_ok()).await;
    }

    Ok(())
}

async fn run<A>(api: &A, event: &PullRequestEvent, comment: &str, has_valid_release_file: bool)
where
    A: PullRequestApi + Sync,
{
    add_or_edit_comment(api, event, comment).await;

    let mut labels = event.label_set();
    update_labels(api, event, &mut labels, has_valid_release_file).await;
}
