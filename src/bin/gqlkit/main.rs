use gqlkit::{
    PluginRegistry,
    cli::{Command, parse_args},
    entrypoint::{exit_with_clap_error, init_tracing},
    run_codegen,
};

fn main() -> anyhow::Result<()> {
    init_tracing("warn");

    let cli = match parse_args(std::env::args()) {
        Ok(cli) => cli,
        Err(err) => {
            if let Some(clap_err) = err.downcast_ref::<clap::Error>() {
                exit_with_clap_error(clap_err);
            } else {
                return Err(err);
            }
        }
    };

    let registry = PluginRegistry::builtin();

    match cli.command {
        Command::Codegen(args) => match run_codegen(&args, &registry) {
            Ok(_) => Ok(()),
            Err(err) if err.is_usage() => {
                eprintln!("Error: {err}");
                std::process::exit(2);
            }
            Err(err) => Err(err.into()),
        },
    }
}
