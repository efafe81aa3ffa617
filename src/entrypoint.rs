//! Process setup shared by the `gqlkit` and `release-check` binaries.

use clap::error::ErrorKind;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Installs a stderr subscriber filtered by `RUST_LOG`, falling back to
/// `default_filter`.
pub fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

/// Help and version requests succeed; anything else clap rejects is a usage
/// error.
pub fn clap_exit_code(clap_err: &clap::Error) -> i32 {
    match clap_err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
        _ => 2,
    }
}

/// Prints a clap error to stdout or stderr according to its exit code and
/// exits.
pub fn exit_with_clap_error(clap_err: &clap::Error) -> ! {
    let code = clap_exit_code(clap_err);
    if code == 0 {
        print!("{clap_err}");
    } else {
        eprint!("{clap_err}");
    }
    std::process::exit(code);
}
