//! Query code generation: a schema, one operation, and a set of plugins that
//! turn the operation's types into files.

pub mod plugins;
mod query;
pub mod schema;
pub mod types;

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use thiserror::Error;
use tracing::debug;

pub use schema::Schema;
pub use types::{
    BuiltinScalar, FieldType, GraphQLEnum, GraphQLField, GraphQLObjectType, GraphQLOperation,
    GraphQLScalar, GraphQLType, GraphQLUnion, OperationKind,
};

#[derive(Debug, Error)]
pub enum CodegenError {
    #[error("invalid schema locator '{0}', expected module[:symbol]")]
    InvalidSchemaLocator(String),
    #[error("schema '{locator}' not found in {}", .app_dir.display())]
    SchemaNotFound { locator: String, app_dir: PathBuf },
    #[error("failed to parse schema: {0}")]
    SchemaParse(#[source] async_graphql_parser::Error),
    #[error("failed to parse query: {0}")]
    QueryParse(#[source] async_graphql_parser::Error),
    #[error("no operation found in query")]
    NoOperation,
    #[error("operations must have a name")]
    AnonymousOperation,
    #[error("only one operation per query file is supported, found {0}")]
    MultipleOperations(usize),
    #[error("schema has no {0} type")]
    MissingRootType(OperationKind),
    #[error("unknown type '{0}'")]
    UnknownType(String),
    #[error("type '{type_name}' has no field '{field}'")]
    UnknownField { type_name: String, field: String },
    #[error("field '{type_name}.{field}' needs a selection set")]
    MissingSelection { type_name: String, field: String },
    #[error("unknown fragment '{0}'")]
    UnknownFragment(String),
    #[error("fragment on '{condition}' can never apply to '{parent}'")]
    InvalidFragment { condition: String, parent: String },
    #[error("fragments on abstract type '{0}' inside another abstract type are not supported")]
    UnsupportedFragment(String),
    #[error("'{0}' cannot be used as a variable type")]
    InvalidInputType(String),
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A generated file, relative to the output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodegenFile {
    pub path: PathBuf,
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodegenResult {
    pub files: Vec<CodegenFile>,
}

impl CodegenResult {
    /// Writes every file under `directory`, creating parent directories.
    pub fn write(&self, directory: &Path) -> Result<(), CodegenError> {
        for file in &self.files {
            let path = directory.join(&file.path);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).map_err(|source| CodegenError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
            debug!(path = %path.display(), "writing generated file");
            fs::write(&path, &file.content).map_err(|source| CodegenError::Io {
                path: path.clone(),
                source,
            })?;
        }
        Ok(())
    }
}

/// What a plugin is constructed with. Only console plugins look at
/// `output_dir` and `plugins`.
#[derive(Debug, Clone, Default)]
pub struct PluginContext {
    pub query: PathBuf,
    pub output_dir: PathBuf,
    /// Names of the generation plugins running alongside.
    pub plugins: Vec<String>,
}

impl PluginContext {
    pub fn new(query: impl Into<PathBuf>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }
}

/// A code generation plugin. One instance serves exactly one query file.
pub trait QueryCodegenPlugin {
    fn name(&self) -> &str;

    fn query(&self) -> &Path;

    fn on_start(&mut self) -> Result<(), CodegenError> {
        Ok(())
    }

    fn on_end(&mut self, _result: &CodegenResult) -> Result<(), CodegenError> {
        Ok(())
    }

    fn generate_code(
        &self,
        _types: &[GraphQLType],
        _operation: &GraphQLOperation,
    ) -> Vec<CodegenFile> {
        Vec::new()
    }

    /// Replaces the default output file name with `<stem>.<ext>`. Plugins
    /// that emit no files ignore it.
    fn set_output_file_stem(&mut self, _stem: &str) {}
}

pub struct QueryCodegen<'s> {
    schema: &'s Schema,
    plugins: Vec<Box<dyn QueryCodegenPlugin>>,
}

impl<'s> QueryCodegen<'s> {
    pub fn new(schema: &'s Schema, plugins: Vec<Box<dyn QueryCodegenPlugin>>) -> Self {
        Self { schema, plugins }
    }

    pub fn run(&mut self, source: &str) -> Result<CodegenResult, CodegenError> {
        for plugin in &mut self.plugins {
            plugin.on_start()?;
        }

        let document = async_graphql_parser::parse_query(source).map_err(CodegenError::QueryParse)?;
        let (types, operation) = query::build(self.schema, &document)?;

        let mut result = CodegenResult::default();
        for plugin in &self.plugins {
            result.files.extend(plugin.generate_code(&types, &operation));
        }

        for plugin in &mut self.plugins {
            plugin.on_end(&result)?;
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use super::*;

    #[derive(Default)]
    struct Trace {
        events: Vec<String>,
    }

    struct Recorder {
        query: PathBuf,
        trace: Rc<RefCell<Trace>>,
    }

    impl QueryCodegenPlugin for Recorder {
        fn name(&self) -> &str {
            "Recorder"
        }

        fn query(&self) -> &Path {
            &self.query
        }

        fn on_start(&mut self) -> Result<(), CodegenError> {
            self.trace.borrow_mut().events.push("start".into());
            Ok(())
        }

        fn on_end(&mut self, result: &CodegenResult) -> Result<(), CodegenError> {
            self.trace
                .borrow_mut()
                .events
                .push(format!("end:{}", result.files.len()));
            Ok(())
        }

        fn generate_code(
            &self,
            types: &[GraphQLType],
            operation: &GraphQLOperation,
        ) -> Vec<CodegenFile> {
            self.trace
                .borrow_mut()
                .events
                .push(format!("generate:{}:{}", operation.name, types.len()));
            vec![CodegenFile {
                path: "out.txt".into(),
                content: operation.result_type.clone(),
            }]
        }
    }

    #[test]
    fn run_drives_plugin_lifecycle_in_order() {
        let schema = Schema::parse("type Query { ok: Boolean }").unwrap();
        let trace = Rc::new(RefCell::new(Trace::default()));
        let plugin = Recorder {
            query: "q.graphql".into(),
            trace: trace.clone(),
        };

        let result = QueryCodegen::new(&schema, vec![Box::new(plugin)])
            .run("query Ok { ok }")
            .unwrap();

        assert_eq!(result.files.len(), 1);
        assert_eq!(result.files[0].content, "OkResult");
        assert_eq!(
            trace.borrow().events,
            vec!["start", "generate:Ok:1", "end:1"]
        );
    }

    #[test]
    fn parse_errors_surface_after_start() {
        let schema = Schema::parse("type Query { ok: Boolean }").unwrap();
        let trace = Rc::new(RefCell::new(Trace::default()));
        let plugin = Recorder {
            query: "q.graphql".into(),
            trace: trace.clone(),
        };

        let err = QueryCodegen::new(&schema, vec![Box::new(plugin)])
            .run("query {")
            .unwrap_err();
        assert!(matches!(err, CodegenError::QueryParse(_)));
        assert_eq!(trace.borrow().events, vec!["start"]);
    }

    #[test]
    fn result_write_creates_nested_directories() {
        let dir = tempfile::tempdir().unwrap();
        let result = CodegenResult {
            files: vec![CodegenFile {
                path: PathBuf::from("nested").join("types.py"),
                content: "x".into(),
            }],
        };
        result.write(&dir.path().join("out")).unwrap();
        let written = fs::read_to_string(dir.path().join("out/nested/types.py")).unwrap();
        assert_eq!(written, "x");
    }
}
