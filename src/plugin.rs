//! Plugin architecture for extending the compiler.
//!
//! Plugins can register extra optimization passes and extra dialect
//! amenders. This provides an extension point without modifying the
//! built-in pipeline or dialects. `QueryProvider::from_config_with_plugins`
//! composes a loaded registry into a provider.
use std::sync::Arc;

use anyhow::{bail, Result};
use tracing::info;

use crate::dialect::{
    Amender, BooleanStyle, FunctionInfo, LimitStyle, ReturningStyle, SqlDialect,
};
use crate::error::CompileError;
use crate::ir::{AggregateKind, DataType, JoinKind, SqlFunction, Value};
use crate::optimizer::{OptimizationPass, Optimizer};

/// Trait that all compiler plugins must implement.
///
/// A plugin registers its capabilities with the `PluginRegistry`
/// during initialization.
///
/// # Example
///
/// ```ignore
/// struct MyPlugin;
///
/// impl QueryPlugin for MyPlugin {
///     fn name(&self) -> &str { "my-plugin" }
///     fn version(&self) -> &str { "0.1.0" }
///     fn register(&self, registry: &mut PluginRegistry) -> Result<()> {
///         registry.add_optimization_pass(Box::new(MyPass));
///         Ok(())
///     }
/// }
/// ```
pub trait QueryPlugin: Send + Sync {
    /// Unique plugin identifier.
    fn name(&self) -> &str;

    fn version(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    /// Register plugin capabilities with the registry.
    fn register(&self, registry: &mut PluginRegistry) -> Result<()>;
}

/// Central registry for all plugin-provided capabilities.
#[derive(Default)]
pub struct PluginRegistry {
    optimization_passes: Vec<Box<dyn OptimizationPass>>,
    amenders: Vec<Arc<dyn Amender>>,
    loaded_plugins: Vec<PluginInfo>,
}

#[derive(Debug, Clone)]
pub struct PluginInfo {
    pub name: String,
    pub version: String,
    pub description: String,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_optimization_pass(&mut self, pass: Box<dyn OptimizationPass>) {
        self.optimization_passes.push(pass);
    }

    /// Register an amender run after the dialect's own amenders.
    pub fn add_amender(&mut self, amender: Arc<dyn Amender>) {
        self.amenders.push(amender);
    }

    /// Load and initialize a plugin. A plugin name can be loaded once; a
    /// plugin whose registration fails leaves nothing behind.
    pub fn load_plugin(&mut self, plugin: Box<dyn QueryPlugin>) -> Result<()> {
        if self.loaded_plugins.iter().any(|p| p.name == plugin.name()) {
            bail!("plugin {} is already loaded", plugin.name());
        }
        let info = PluginInfo {
            name: plugin.name().to_string(),
            version: plugin.version().to_string(),
            description: plugin.description().to_string(),
        };

        let passes = self.optimization_passes.len();
        let amenders = self.amenders.len();
        if let Err(e) = plugin.register(self) {
            self.optimization_passes.truncate(passes);
            self.amenders.truncate(amenders);
            return Err(e.context(format!("registering plugin {}", info.name)));
        }
        info!(plugin = %info.name, version = %info.version, "plugin loaded");
        self.loaded_plugins.push(info);
        Ok(())
    }

    /// Take ownership of all optimization passes (for building an optimizer).
    pub fn take_optimization_passes(&mut self) -> Vec<Box<dyn OptimizationPass>> {
        std::mem::take(&mut self.optimization_passes)
    }

    pub fn amenders(&self) -> &[Arc<dyn Amender>] {
        &self.amenders
    }

    pub fn loaded_plugins(&self) -> &[PluginInfo] {
        &self.loaded_plugins
    }

    /// Append the registered passes to `optimizer`.
    pub fn install_passes(&mut self, optimizer: &mut Optimizer) {
        for pass in self.take_optimization_passes() {
            optimizer.add_pass(pass);
        }
    }

    /// `dialect` with the registered amenders appended to its own.
    pub fn extend_dialect(&self, dialect: Arc<dyn SqlDialect>) -> Arc<dyn SqlDialect> {
        if self.amenders.is_empty() {
            return dialect;
        }
        Arc::new(ExtendedDialect {
            inner: dialect,
            extra: self.amenders.clone(),
        })
    }
}

/// A dialect with extra amenders; every spelling question goes to `inner`.
struct ExtendedDialect {
    inner: Arc<dyn SqlDialect>,
    extra: Vec<Arc<dyn Amender>>,
}

impl SqlDialect for ExtendedDialect {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn quote_ident(&self, ident: &str) -> String {
        self.inner.quote_ident(ident)
    }

    fn quote_string(&self, s: &str) -> String {
        self.inner.quote_string(s)
    }

    fn parameter_marker(&self, index: usize) -> String {
        self.inner.parameter_marker(index)
    }

    fn limit_style(&self) -> LimitStyle {
        self.inner.limit_style()
    }

    fn unbounded_limit(&self) -> Option<&'static str> {
        self.inner.unbounded_limit()
    }

    fn boolean_style(&self) -> BooleanStyle {
        self.inner.boolean_style()
    }

    fn returning_style(&self) -> ReturningStyle {
        self.inner.returning_style()
    }

    fn function(&self, function: &SqlFunction) -> Option<FunctionInfo> {
        self.inner.function(function)
    }

    fn aggregate_name(&self, kind: AggregateKind) -> &'static str {
        self.inner.aggregate_name(kind)
    }

    fn join_keyword(&self, kind: JoinKind) -> Option<&'static str> {
        self.inner.join_keyword(kind)
    }

    fn for_update_clause(&self) -> Option<&'static str> {
        self.inner.for_update_clause()
    }

    fn type_name(&self, data_type: &DataType) -> Result<String, CompileError> {
        self.inner.type_name(data_type)
    }

    fn auto_increment(&self) -> &'static str {
        self.inner.auto_increment()
    }

    fn supports_native_enums(&self) -> bool {
        self.inner.supports_native_enums()
    }

    fn supports_clustered_indexes(&self) -> bool {
        self.inner.supports_clustered_indexes()
    }

    fn create_table_guard(&self, table: &str) -> Option<String> {
        self.inner.create_table_guard(table)
    }

    fn create_index_guard(&self, table: &str, index: &str) -> Option<String> {
        self.inner.create_index_guard(table, index)
    }

    fn delete_prefix(&self, table: &str, alias: Option<&str>) -> String {
        self.inner.delete_prefix(table, alias)
    }

    fn emit_boolean(&self, value: bool) -> String {
        self.inner.emit_boolean(value)
    }

    fn emit_binary(&self, bytes: &[u8]) -> String {
        self.inner.emit_binary(bytes)
    }

    fn literal(&self, value: &Value) -> Result<String, CompileError> {
        self.inner.literal(value)
    }

    fn amenders(&self) -> Vec<Arc<dyn Amender>> {
        let mut amenders = self.inner.amenders();
        amenders.extend(self.extra.iter().cloned());
        amenders
    }
}
