use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
};

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use thiserror::Error;
use tracing::debug;

use crate::{
    codegen::{
        CodegenError, CodegenResult, PluginContext, QueryCodegen, Schema,
        plugins::console_plugin_type,
    },
    registry::{PluginError, PluginRegistry, PluginType},
};

const BUILD_INFO_HUMAN: &str = env!("BUILD_INFO_HUMAN");

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Plugin(#[from] PluginError),
    #[error(transparent)]
    Codegen(#[from] CodegenError),
    #[error("Some of the selected plugins do not allow working with multiple query files.")]
    MultipleQueriesUnsupported { plugins: Vec<String> },
    #[error("query file {} does not exist", .0.display())]
    QueryNotFound(PathBuf),
}

impl CliError {
    /// Errors caused by how the command was invoked rather than by what it
    /// was asked to process.
    pub fn is_usage(&self) -> bool {
        matches!(
            self,
            CliError::MultipleQueriesUnsupported { .. } | CliError::QueryNotFound(_)
        )
    }
}

#[derive(Parser, Debug)]
#[command(name = "gqlkit", about = "GraphQL tooling: generate client types from queries")]
#[command(long_version = BUILD_INFO_HUMAN)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate code from a query
    Codegen(CodegenArgs),
}

#[derive(Args, Debug, Clone)]
pub struct CodegenArgs {
    /// Plugin to run, by short name, module path or module:symbol (can specify multiple)
    #[arg(short = 'p', long = "plugins", value_name = "PLUGIN", required = true)]
    pub plugins: Vec<String>,

    /// Replace the console plugin that reports progress and writes files
    #[arg(long = "cli-plugin", value_name = "PLUGIN")]
    pub cli_plugin: Option<String>,

    /// Output directory
    #[arg(short = 'o', long = "output-dir", default_value = ".", value_name = "DIR")]
    pub output_dir: PathBuf,

    /// Schema to resolve queries against
    #[arg(long, value_name = "MODULE[:SYMBOL]")]
    pub schema: String,

    /// Query files, one operation each
    #[arg(value_name = "QUERY", required = true, value_parser = existing_file)]
    pub query: Vec<PathBuf>,

    /// Look for the schema module in the specified directory
    #[arg(long = "app-dir", default_value = ".", value_name = "DIR")]
    pub app_dir: PathBuf,
}

fn existing_file(value: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(value);
    if path.exists() {
        Ok(path)
    } else {
        Err(format!("path '{value}' does not exist"))
    }
}

pub fn parse_args<I, T>(args: I) -> Result<Cli>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Ok(Cli::try_parse_from(args)?)
}

/// Output file stems for a multi-query run: the query file stem, with a
/// numeric suffix when an earlier query already took it.
fn output_stems(queries: &[PathBuf]) -> Vec<String> {
    let mut used = HashSet::new();

    queries
        .iter()
        .map(|query| {
            let stem = query
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "types".to_string());
            let mut candidate = stem.clone();
            let mut suffix = 1;
            while used.contains(&candidate) {
                suffix += 1;
                candidate = format!("{stem}_{suffix}");
            }
            used.insert(candidate.clone());
            candidate
        })
        .collect()
}

fn check_multiplicity(plugin_types: &[PluginType], query_count: usize) -> Result<(), CliError> {
    if query_count <= 1 {
        return Ok(());
    }

    let rejecting: Vec<String> = plugin_types
        .iter()
        .filter(|p| !p.is_builtin() && !p.allows_multiple())
        .map(|p| p.name().to_string())
        .collect();

    if rejecting.is_empty() {
        Ok(())
    } else {
        Err(CliError::MultipleQueriesUnsupported { plugins: rejecting })
    }
}

fn read_query(query: &Path) -> Result<String, CliError> {
    if !query.is_file() {
        return Err(CliError::QueryNotFound(query.to_path_buf()));
    }
    fs::read_to_string(query).map_err(|source| {
        CliError::Codegen(CodegenError::Io {
            path: query.to_path_buf(),
            source,
        })
    })
}

/// Runs `gqlkit codegen`: every query file is generated with its own fresh
/// set of plugin instances, the console plugin last.
pub fn run_codegen(
    args: &CodegenArgs,
    registry: &PluginRegistry,
) -> Result<Vec<CodegenResult>, CliError> {
    let schema = Schema::load(&args.schema, &args.app_dir)?;

    let console_type = match &args.cli_plugin {
        Some(reference) => registry.load_plugin(reference)?,
        None => console_plugin_type(),
    };
    let plugin_types = registry.load_plugins(&args.plugins)?;

    check_multiplicity(&plugin_types, args.query.len())?;

    let stems = (args.query.len() > 1).then(|| output_stems(&args.query));
    let mut results = Vec::with_capacity(args.query.len());

    for (index, query) in args.query.iter().enumerate() {
        let source = read_query(query)?;
        let context = PluginContext {
            query: query.clone(),
            output_dir: args.output_dir.clone(),
            plugins: plugin_types.iter().map(|p| p.name().to_string()).collect(),
        };

        let mut plugins = Vec::with_capacity(plugin_types.len() + 1);
        for plugin_type in &plugin_types {
            let mut plugin = plugin_type.instantiate(&context);
            if let (Some(stems), true) = (&stems, plugin_type.is_builtin()) {
                plugin.set_output_file_stem(&stems[index]);
            }
            plugins.push(plugin);
        }
        plugins.push(console_type.instantiate(&context));

        debug!(
            query = %query.display(),
            plugins = plugins.len(),
            "running codegen"
        );
        results.push(QueryCodegen::new(&schema, plugins).run(&source)?);
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_codegen_options() {
        let dir = tempfile::tempdir().unwrap();
        let query = dir.path().join("query.graphql");
        fs::write(&query, "query A { a }").unwrap();

        let cli = parse_args([
            "gqlkit",
            "codegen",
            "--schema",
            "app.schema:schema",
            "-p",
            "python",
            "--plugins",
            "typescript",
            "-o",
            "out",
            query.to_str().unwrap(),
        ])
        .unwrap();

        let Command::Codegen(args) = cli.command;
        assert_eq!(args.plugins, vec!["python", "typescript"]);
        assert_eq!(args.schema, "app.schema:schema");
        assert_eq!(args.output_dir, PathBuf::from("out"));
        assert_eq!(args.app_dir, PathBuf::from("."));
        assert_eq!(args.cli_plugin, None);
        assert_eq!(args.query, vec![query]);
    }

    #[test]
    fn plugins_and_schema_are_required() {
        let dir = tempfile::tempdir().unwrap();
        let query = dir.path().join("query.graphql");
        fs::write(&query, "query A { a }").unwrap();
        let query = query.to_str().unwrap();

        assert!(parse_args(["gqlkit", "codegen", "--schema", "app", query]).is_err());
        assert!(parse_args(["gqlkit", "codegen", "-p", "python", query]).is_err());
        assert!(parse_args(["gqlkit", "codegen", "-p", "python", "--schema", "app"]).is_err());
    }

    #[test]
    fn missing_query_file_is_rejected() {
        let err = parse_args([
            "gqlkit",
            "codegen",
            "-p",
            "python",
            "--schema",
            "app",
            "/definitely/not/here.graphql",
        ])
        .unwrap_err();
        let clap_err = err.downcast_ref::<clap::Error>().unwrap();
        assert_eq!(clap_err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn stems_follow_query_file_names() {
        let stems = output_stems(&[
            PathBuf::from("queries/user.graphql"),
            PathBuf::from("queries/posts.graphql"),
        ]);
        assert_eq!(stems, vec!["user", "posts"]);
    }

    #[test]
    fn duplicate_stems_get_numeric_suffix() {
        let stems = output_stems(&[
            PathBuf::from("a/user.graphql"),
            PathBuf::from("b/user.graphql"),
            PathBuf::from("c/user_2.graphql"),
            PathBuf::from("d/user.graphql"),
        ]);
        assert_eq!(stems, vec!["user", "user_2", "user_2_2", "user_3"]);
    }
}
