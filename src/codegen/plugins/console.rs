use std::path::{Path, PathBuf};

use colored::Colorize;

use crate::codegen::{CodegenError, CodegenResult, PluginContext, QueryCodegenPlugin};

const EXPERIMENTAL_WARNING: &str = "The codegen is experimental. Please report any bug you find.\n";

/// Reports progress on stdout and writes the generated files once the run
/// ends. Always runs last.
pub struct ConsolePlugin {
    query: PathBuf,
    output_dir: PathBuf,
    plugins: Vec<String>,
}

impl ConsolePlugin {
    pub fn new(context: &PluginContext) -> Self {
        Self {
            query: context.query.clone(),
            output_dir: context.output_dir.clone(),
            plugins: context.plugins.clone(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

impl QueryCodegenPlugin for ConsolePlugin {
    fn name(&self) -> &str {
        "ConsolePlugin"
    }

    fn query(&self) -> &Path {
        &self.query
    }

    fn on_start(&mut self) -> Result<(), CodegenError> {
        println!("{}", EXPERIMENTAL_WARNING.yellow().bold());
        println!(
            "{}",
            format!(
                "Generating code for {} using {} plugin(s)",
                self.query.display(),
                self.plugins.join(", ")
            )
            .green()
        );
        Ok(())
    }

    fn on_end(&mut self, result: &CodegenResult) -> Result<(), CodegenError> {
        std::fs::create_dir_all(&self.output_dir).map_err(|source| CodegenError::Io {
            path: self.output_dir.clone(),
            source,
        })?;
        result.write(&self.output_dir)?;

        println!(
            "{}",
            format!(
                "Generated {} files in {}",
                result.files.len(),
                self.output_dir.display()
            )
            .green()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::CodegenFile;

    #[test]
    fn on_end_creates_output_dir_and_writes_files() {
        let dir = tempfile::tempdir().unwrap();
        let output_dir = dir.path().join("out").join("deeper");
        let mut plugin = ConsolePlugin::new(&PluginContext {
            query: "q.graphql".into(),
            output_dir: output_dir.clone(),
            plugins: vec!["PythonPlugin".into()],
        });

        plugin.on_start().unwrap();
        plugin
            .on_end(&CodegenResult {
                files: vec![CodegenFile {
                    path: "types.py".into(),
                    content: "class A:\n    pass\n".into(),
                }],
            })
            .unwrap();

        assert!(output_dir.join("types.py").is_file());
    }

    #[test]
    fn empty_result_still_creates_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let output_dir = dir.path().join("out");
        let mut plugin = ConsolePlugin::new(&PluginContext {
            query: "q.graphql".into(),
            output_dir: output_dir.clone(),
            plugins: vec![],
        });

        plugin.on_end(&CodegenResult::default()).unwrap();
        assert!(output_dir.is_dir());
    }
}
