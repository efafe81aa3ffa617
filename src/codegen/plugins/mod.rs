//! Built-in plugins and the modules they are registered under.

mod console;
mod python;
mod typescript;

pub use console::ConsolePlugin;
pub use python::PythonPlugin;
pub use typescript::TypeScriptPlugin;

use crate::registry::{BUILTIN_NAMESPACE, CODEGEN_MODULE, PluginModule, PluginType, Symbol};

pub fn console_plugin_type() -> PluginType {
    PluginType::new("ConsolePlugin", |context| Box::new(ConsolePlugin::new(context)))
        .with_allows_multiple(true)
}

/// Modules shipped with the crate, in registration order.
pub fn builtin_modules() -> Vec<PluginModule> {
    vec![
        PluginModule::new(CODEGEN_MODULE)
            .symbol("QueryCodegenPlugin", Symbol::PluginBase)
            .symbol("QueryCodegen", Symbol::Other)
            .symbol("CodegenResult", Symbol::Other),
        PluginModule::new(format!("{BUILTIN_NAMESPACE}.python"))
            .symbol("QueryCodegenPlugin", Symbol::PluginBase)
            .symbol(
                "PythonPlugin",
                Symbol::Plugin(PluginType::new("PythonPlugin", |context| {
                    Box::new(PythonPlugin::new(context))
                })),
            )
            .exports(["PythonPlugin"]),
        PluginModule::new(format!("{BUILTIN_NAMESPACE}.typescript"))
            .symbol("QueryCodegenPlugin", Symbol::PluginBase)
            .symbol(
                "TypeScriptPlugin",
                Symbol::Plugin(PluginType::new("TypeScriptPlugin", |context| {
                    Box::new(TypeScriptPlugin::new(context))
                })),
            )
            .exports(["TypeScriptPlugin"]),
        PluginModule::new(format!("{BUILTIN_NAMESPACE}.console"))
            .symbol("ConsolePlugin", Symbol::Plugin(console_plugin_type())),
    ]
}
