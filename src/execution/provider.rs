use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::cache::ShapeCache;
use crate::config::CompilerConfig;
use crate::dialect::{self, SqlDialect};
use crate::error::{CompileError, QueryResult};
use crate::ir::{substitute_constants, DataType, Node, ShapeKey, Value};
use crate::optimizer::Optimizer;
use crate::plugin::PluginRegistry;
use crate::projection::{
    read_typed, CompiledPlan, DynamicObjectFactory, Materialized, NestedExecutor, ObjectFactory,
    PlanKey, Projector,
};
use crate::sql::{self, SqlCommand};

use super::cardinality::Cardinality;
use super::context::ExecutionContext;
use super::enumerator::RowEnumerator;
use super::BoundQuery;

pub type PlanCache = ShapeCache<PlanKey, CompiledPlan>;

/// A query compiled and bound for one execution.
pub struct PreparedQuery {
    pub plan: Arc<CompiledPlan>,
    pub command: SqlCommand,
}

/// Drives a bound query through the pipeline: optimize, amend for the
/// dialect, key by shape, substitute constants, resolve or compile the plan,
/// bind, and execute against the context.
pub struct QueryProvider {
    dialect: Arc<dyn SqlDialect>,
    optimizer: Arc<Optimizer>,
    plans: Arc<PlanCache>,
    context: Arc<dyn ExecutionContext>,
    factory: Arc<dyn ObjectFactory>,
    optimize: bool,
    log_sql: bool,
}

impl QueryProvider {
    pub fn new(dialect: Arc<dyn SqlDialect>, context: Arc<dyn ExecutionContext>) -> Self {
        Self {
            dialect,
            optimizer: Arc::new(Optimizer::with_defaults()),
            plans: Arc::new(ShapeCache::new("plans", CompilerConfig::DEFAULT_PLAN_CACHE_CAPACITY)),
            context,
            factory: Arc::new(DynamicObjectFactory),
            optimize: true,
            log_sql: false,
        }
    }

    pub fn from_config(config: &CompilerConfig, context: Arc<dyn ExecutionContext>) -> Self {
        Self::from_config_with_plugins(config, context, &mut PluginRegistry::new())
    }

    /// `from_config` with the registry's passes appended to the pipeline and
    /// its amenders run after the dialect's own. The passes move out of
    /// `plugins`.
    pub fn from_config_with_plugins(
        config: &CompilerConfig,
        context: Arc<dyn ExecutionContext>,
        plugins: &mut PluginRegistry,
    ) -> Self {
        let mut optimizer = config.optimizer();
        plugins.install_passes(&mut optimizer);
        if !plugins.loaded_plugins().is_empty() {
            debug!(
                plugins = plugins.loaded_plugins().len(),
                amenders = plugins.amenders().len(),
                "composing plugins into provider"
            );
        }
        Self::new(plugins.extend_dialect(config.dialect()), context)
            .with_optimizer(Arc::new(optimizer))
            .with_plan_cache(Arc::new(ShapeCache::new("plans", config.plan_cache_capacity)))
            .with_log_sql(config.log_sql)
    }

    pub fn with_optimizer(mut self, optimizer: Arc<Optimizer>) -> Self {
        self.optimizer = optimizer;
        self
    }

    /// Share a plan cache between providers of the same dialect.
    pub fn with_plan_cache(mut self, plans: Arc<PlanCache>) -> Self {
        self.plans = plans;
        self
    }

    pub fn with_factory(mut self, factory: Arc<dyn ObjectFactory>) -> Self {
        self.factory = factory;
        self
    }

    pub fn with_optimization(mut self, optimize: bool) -> Self {
        self.optimize = optimize;
        self
    }

    pub fn with_log_sql(mut self, log_sql: bool) -> Self {
        self.log_sql = log_sql;
        self
    }

    pub fn dialect(&self) -> &dyn SqlDialect {
        self.dialect.as_ref()
    }

    pub fn plan_cache(&self) -> &PlanCache {
        &self.plans
    }

    /// Compile (or fetch) the plan for `query` and bind its parameters.
    pub fn prepare(&self, query: &BoundQuery) -> QueryResult<PreparedQuery> {
        let optimized = if self.optimize {
            self.optimizer.optimize(&query.root)
        } else {
            query.root.clone()
        };
        let amended = dialect::amend(self.dialect.as_ref(), &optimized);
        let key = PlanKey::new(ShapeKey::new(amended.clone()), query.projection.as_ref());
        let (substituted, values) = substitute_constants(&amended);

        let plan = self.plans.get_or_compile(&key, |_| self.compile(query, &substituted))?;
        let command = plan.command.bind(&values, &query.parameters)?;
        if self.log_sql {
            debug!(
                dialect = self.dialect.name(),
                sql = %command.text,
                parameters = command.parameters.len(),
                "prepared command"
            );
        }
        Ok(PreparedQuery { plan, command })
    }

    fn compile(&self, query: &BoundQuery, substituted: &Node) -> Result<CompiledPlan, CompileError> {
        let command = sql::format(self.dialect.as_ref(), substituted)?;
        let projector = Projector::compile(query.projection.as_ref(), substituted)?;
        debug!(
            dialect = self.dialect.name(),
            sql = %command.command_text,
            "compiled plan"
        );
        Ok(CompiledPlan {
            command,
            projector,
            element_type: query.element_type.clone(),
        })
    }

    /// Execute and stream the projected rows.
    pub fn execute(&self, query: &BoundQuery) -> QueryResult<RowEnumerator<'_>> {
        let prepared = self.prepare(query)?;
        let values = query
            .projection
            .as_ref()
            .map(|p| p.values())
            .unwrap_or_default();
        let reader = self.context.execute_reader(&prepared.command)?;
        Ok(RowEnumerator::new(
            reader,
            prepared.plan,
            values,
            query.arguments.clone(),
            self.factory.as_ref(),
            self,
        ))
    }

    /// Execute under a cardinality contract.
    pub fn execute_with(
        &self,
        query: &BoundQuery,
        cardinality: Cardinality,
    ) -> QueryResult<Vec<Materialized>> {
        cardinality.apply(self.execute(query)?)
    }

    pub fn execute_list(&self, query: &BoundQuery) -> QueryResult<Vec<Materialized>> {
        self.execute_with(query, Cardinality::Many)
    }

    pub fn first(&self, query: &BoundQuery) -> QueryResult<Materialized> {
        let mut rows = self.execute_with(query, Cardinality::First)?;
        Ok(rows.remove(0))
    }

    pub fn first_or_default(&self, query: &BoundQuery) -> QueryResult<Option<Materialized>> {
        Ok(self.execute_with(query, Cardinality::FirstOrDefault)?.pop())
    }

    pub fn single(&self, query: &BoundQuery) -> QueryResult<Materialized> {
        let mut rows = self.execute_with(query, Cardinality::Single)?;
        Ok(rows.remove(0))
    }

    pub fn single_or_default(&self, query: &BoundQuery) -> QueryResult<Option<Materialized>> {
        Ok(self.execute_with(query, Cardinality::SingleOrDefault)?.pop())
    }

    /// Execute a query producing one value, such as `COUNT(*)`.
    pub fn execute_scalar(&self, query: &BoundQuery) -> QueryResult<Value> {
        let prepared = self.prepare(query)?;
        let value = self.context.execute_scalar(&prepared.command)?;
        match &query.element_type {
            DataType::Void | DataType::Unknown => Ok(value),
            element_type => read_typed(&value, element_type),
        }
    }
}

impl NestedExecutor for QueryProvider {
    fn execute_nested(
        &self,
        query: &BoundQuery,
        parameters: &HashMap<String, Value>,
    ) -> QueryResult<Vec<Materialized>> {
        let correlated = BoundQuery {
            parameters: parameters.clone(),
            ..query.clone()
        };
        self.execute_list(&correlated)
    }
}
