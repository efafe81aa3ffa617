//! Resolution of plugin references to plugin types.
//!
//! A reference is a short built-in name (`python`), a module path
//! (`my.plugins`) or an explicit `module:symbol`. Modules are registered up
//! front; looking one up stands in for importing it.

use std::{fmt, sync::Arc};

use thiserror::Error;
use tracing::debug;

use crate::codegen::{PluginContext, QueryCodegenPlugin, plugins};

/// Module exporting the plugin base capability and the generator.
pub const CODEGEN_MODULE: &str = "gqlkit.codegen";

/// Namespace searched for short plugin names.
pub const BUILTIN_NAMESPACE: &str = "gqlkit.codegen.plugins";

type Constructor = dyn Fn(&PluginContext) -> Box<dyn QueryCodegenPlugin> + Send + Sync;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PluginError {
    #[error("Plugin {0} not found")]
    NotFound(String),
    /// An explicit `module:symbol` reference named something that is not a
    /// concrete plugin.
    #[error("{module}:{symbol} is not a codegen plugin")]
    NotAPlugin { module: String, symbol: String },
}

/// A constructible plugin, resolved from a reference but not yet
/// instantiated.
#[derive(Clone)]
pub struct PluginType {
    name: String,
    builtin: bool,
    allows_multiple: bool,
    constructor: Arc<Constructor>,
}

impl PluginType {
    pub fn new<F>(name: impl Into<String>, constructor: F) -> Self
    where
        F: Fn(&PluginContext) -> Box<dyn QueryCodegenPlugin> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            builtin: false,
            allows_multiple: false,
            constructor: Arc::new(constructor),
        }
    }

    /// Declares that one process may run this plugin over several query
    /// files.
    pub fn with_allows_multiple(mut self, allows_multiple: bool) -> Self {
        self.allows_multiple = allows_multiple;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the type was registered under [`BUILTIN_NAMESPACE`].
    pub fn is_builtin(&self) -> bool {
        self.builtin
    }

    pub fn allows_multiple(&self) -> bool {
        self.allows_multiple
    }

    pub fn instantiate(&self, context: &PluginContext) -> Box<dyn QueryCodegenPlugin> {
        (self.constructor)(context)
    }
}

impl fmt::Debug for PluginType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginType")
            .field("name", &self.name)
            .field("builtin", &self.builtin)
            .field("allows_multiple", &self.allows_multiple)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub enum Symbol {
    Plugin(PluginType),
    /// The plugin capability itself; never resolves as a plugin.
    PluginBase,
    Other,
}

impl Symbol {
    fn as_plugin(&self) -> Option<&PluginType> {
        match self {
            Symbol::Plugin(plugin) => Some(plugin),
            Symbol::PluginBase | Symbol::Other => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PluginModule {
    path: String,
    exports: Option<Vec<String>>,
    symbols: Vec<(String, Symbol)>,
}

impl PluginModule {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            exports: None,
            symbols: Vec::new(),
        }
    }

    pub fn symbol(mut self, name: impl Into<String>, symbol: Symbol) -> Self {
        self.symbols.push((name.into(), symbol));
        self
    }

    /// Restricts module-wide searches to these names.
    pub fn exports<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exports = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    fn get(&self, name: &str) -> Option<&Symbol> {
        self.symbols
            .iter()
            .find(|(symbol_name, _)| symbol_name == name)
            .map(|(_, symbol)| symbol)
    }

    /// First exported concrete plugin, in declaration order.
    fn find_plugin(&self) -> Option<&PluginType> {
        self.symbols
            .iter()
            .filter(|(name, _)| !name.starts_with("__"))
            .filter(|(name, _)| {
                self.exports
                    .as_ref()
                    .is_none_or(|exports| exports.iter().any(|e| e == name))
            })
            .find_map(|(_, symbol)| symbol.as_plugin())
    }
}

/// Registered plugin modules, searched in registration order.
#[derive(Debug, Clone, Default)]
pub struct PluginRegistry {
    modules: Vec<PluginModule>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the modules that ship with the crate.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for module in plugins::builtin_modules() {
            registry.register(module);
        }
        registry
    }

    /// Adds `module`, replacing any module registered under the same path.
    pub fn register(&mut self, mut module: PluginModule) {
        let builtin = module
            .path
            .strip_prefix(BUILTIN_NAMESPACE)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('.'));
        for (_, symbol) in &mut module.symbols {
            if let Symbol::Plugin(plugin) = symbol {
                plugin.builtin = builtin;
            }
        }

        match self.modules.iter_mut().find(|m| m.path == module.path) {
            Some(existing) => *existing = module,
            None => self.modules.push(module),
        }
    }

    fn module(&self, path: &str) -> Option<&PluginModule> {
        self.modules.iter().find(|m| m.path == path)
    }

    /// Looks up a single reference without any fallback. An unknown module
    /// is `Ok(None)`.
    pub fn import_plugin(&self, plugin: &str) -> Result<Option<PluginType>, PluginError> {
        let (module_name, symbol_name) = match plugin.split_once(':') {
            Some((module, symbol)) => (module, Some(symbol)),
            None => (plugin, None),
        };

        let Some(module) = self.module(module_name) else {
            debug!(module = module_name, "no such plugin module");
            return Ok(None);
        };

        match symbol_name {
            Some(symbol_name) => module
                .get(symbol_name)
                .and_then(Symbol::as_plugin)
                .cloned()
                .map(Some)
                .ok_or_else(|| PluginError::NotAPlugin {
                    module: module_name.to_string(),
                    symbol: symbol_name.to_string(),
                }),
            None => Ok(module.find_plugin().cloned()),
        }
    }

    /// Resolves a reference, retrying short names under the built-in
    /// namespace.
    pub fn load_plugin(&self, plugin_path: &str) -> Result<PluginType, PluginError> {
        let mut plugin = self.import_plugin(plugin_path)?;

        if plugin.is_none() && !plugin_path.contains('.') {
            plugin = self.import_plugin(&format!("{BUILTIN_NAMESPACE}.{plugin_path}"))?;
        }

        let plugin = plugin.ok_or_else(|| PluginError::NotFound(plugin_path.to_string()))?;
        debug!(reference = plugin_path, plugin = plugin.name(), "resolved plugin");
        Ok(plugin)
    }

    pub fn load_plugins<S: AsRef<str>>(
        &self,
        plugins: &[S],
    ) -> Result<Vec<PluginType>, PluginError> {
        plugins.iter().map(|p| self.load_plugin(p.as_ref())).collect()
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;

    struct Dummy(std::path::PathBuf, &'static str);

    impl QueryCodegenPlugin for Dummy {
        fn name(&self) -> &str {
            self.1
        }

        fn query(&self) -> &Path {
            &self.0
        }
    }

    fn dummy(name: &'static str) -> PluginType {
        PluginType::new(name, move |context| {
            Box::new(Dummy(context.query.clone(), name))
        })
    }

    #[test]
    fn short_name_falls_back_to_builtin_namespace() {
        let registry = PluginRegistry::builtin();
        assert_eq!(
            registry
                .import_plugin("python")
                .unwrap()
                .map(|p| p.name().to_string()),
            None
        );

        let plugin = registry.load_plugin("python").unwrap();
        assert_eq!(plugin.name(), "PythonPlugin");
        assert!(plugin.is_builtin());

        let plugin = registry.load_plugin("typescript").unwrap();
        assert_eq!(plugin.name(), "TypeScriptPlugin");
    }

    #[test]
    fn full_module_path_resolves_without_fallback() {
        let registry = PluginRegistry::builtin();
        let plugin = registry
            .load_plugin("gqlkit.codegen.plugins.typescript")
            .unwrap();
        assert_eq!(plugin.name(), "TypeScriptPlugin");
    }

    #[test]
    fn dotted_names_do_not_fall_back() {
        let registry = PluginRegistry::builtin();
        assert_eq!(
            registry.load_plugin("missing.python").unwrap_err(),
            PluginError::NotFound("missing.python".into())
        );
    }

    #[test]
    fn unknown_plugin_names_the_reference() {
        let err = PluginRegistry::builtin().load_plugin("cobol").unwrap_err();
        assert_eq!(err.to_string(), "Plugin cobol not found");
    }

    #[test]
    fn base_capability_is_never_a_plugin() {
        let registry = PluginRegistry::builtin();
        assert_eq!(
            registry
                .import_plugin(CODEGEN_MODULE)
                .unwrap()
                .map(|p| p.name().to_string()),
            None
        );
        assert_eq!(
            registry
                .load_plugin("gqlkit.codegen:QueryCodegenPlugin")
                .unwrap_err(),
            PluginError::NotAPlugin {
                module: CODEGEN_MODULE.into(),
                symbol: "QueryCodegenPlugin".into(),
            }
        );
    }

    #[test]
    fn explicit_symbol_must_be_a_plugin() {
        let mut registry = PluginRegistry::new();
        registry.register(
            PluginModule::new("acme")
                .symbol("helper", Symbol::Other)
                .symbol("AcmePlugin", Symbol::Plugin(dummy("AcmePlugin"))),
        );

        assert_eq!(registry.load_plugin("acme:AcmePlugin").unwrap().name(), "AcmePlugin");
        assert!(matches!(
            registry.load_plugin("acme:helper"),
            Err(PluginError::NotAPlugin { .. })
        ));
        assert!(matches!(
            registry.load_plugin("acme:missing"),
            Err(PluginError::NotAPlugin { .. })
        ));
    }

    #[test]
    fn module_search_respects_exports_and_order() {
        let mut registry = PluginRegistry::new();
        registry.register(
            PluginModule::new("acme")
                .symbol("First", Symbol::Plugin(dummy("First")))
                .symbol("Second", Symbol::Plugin(dummy("Second"))),
        );
        registry.register(
            PluginModule::new("acme.exported")
                .symbol("First", Symbol::Plugin(dummy("First")))
                .symbol("Second", Symbol::Plugin(dummy("Second")))
                .exports(["Second"]),
        );

        assert_eq!(registry.load_plugin("acme").unwrap().name(), "First");
        assert_eq!(registry.load_plugin("acme.exported").unwrap().name(), "Second");
        assert!(!registry.load_plugin("acme").unwrap().is_builtin());
    }

    #[test]
    fn dunder_symbols_are_skipped() {
        let mut registry = PluginRegistry::new();
        registry.register(
            PluginModule::new("acme")
                .symbol("__hidden", Symbol::Plugin(dummy("Hidden")))
                .symbol("Visible", Symbol::Plugin(dummy("Visible"))),
        );
        assert_eq!(registry.load_plugin("acme").unwrap().name(), "Visible");
    }

    #[test]
    fn modules_under_builtin_namespace_are_builtin() {
        let mut registry = PluginRegistry::builtin();
        registry.register(
            PluginModule::new(format!("{BUILTIN_NAMESPACE}.extra"))
                .symbol("Extra", Symbol::Plugin(dummy("Extra"))),
        );
        registry.register(
            PluginModule::new("gqlkit.codegen.pluginsish")
                .symbol("Lookalike", Symbol::Plugin(dummy("Lookalike"))),
        );

        assert!(registry.load_plugin("extra").unwrap().is_builtin());
        assert!(!registry
            .load_plugin("gqlkit.codegen.pluginsish")
            .unwrap()
            .is_builtin());
    }

    #[test]
    fn load_plugins_keeps_order() {
        let names: Vec<String> = PluginRegistry::builtin()
            .load_plugins(&["typescript", "python"])
            .unwrap()
            .iter()
            .map(|p| p.name().to_string())
            .collect();
        assert_eq!(names, vec!["TypeScriptPlugin", "PythonPlugin"]);
    }
}
