mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};

use sqlweave::config::CompilerConfig;
use sqlweave::dialect::{Amender, DialectKind, SqliteDialect};
use sqlweave::execution::{BoundQuery, PersistenceCommands, QueryProvider};
use sqlweave::ir::*;
use sqlweave::optimizer::OptimizationPass;
use sqlweave::plugin::{PluginRegistry, QueryPlugin};
use sqlweave::projection::{FieldProjection, Materialized, ProjectionExpr};
use sqlweave::QueryError;

use common::*;

fn provider(context: Arc<ScriptedContext>) -> QueryProvider {
    QueryProvider::from_config(&CompilerConfig::default(), context)
}

fn ids(rows: &[i64]) -> Arc<ScriptedContext> {
    Arc::new(ScriptedContext::new(
        &["id"],
        rows.iter().map(|id| vec![Value::Int64(*id)]).collect(),
    ))
}

// ---------------------------------------------------------------------------
// Plan cache
// ---------------------------------------------------------------------------

#[test]
fn concurrent_executions_compile_once() {
    let provider = provider(ids(&[]));
    let barrier = Barrier::new(8);

    let plans: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let provider = &provider;
                let barrier = &barrier;
                scope.spawn(move || {
                    barrier.wait();
                    provider
                        .prepare(&BoundQuery::new(users_older_than(20 + i)))
                        .unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let stats = provider.plan_cache().stats();
    assert_eq!(stats.compiles, 1);
    assert_eq!(stats.entries, 1);
    assert!(plans.iter().all(|p| Arc::ptr_eq(&p.plan, &plans[0].plan)));

    // each execution still binds its own value
    let mut ages: Vec<Value> = plans
        .iter()
        .map(|p| p.command.parameters[0].value.clone())
        .collect();
    ages.sort_by_key(|v| match v {
        Value::Int32(i) => *i,
        _ => i32::MAX,
    });
    assert_eq!(ages, (20..28).map(Value::Int32).collect::<Vec<_>>());
}

#[test]
fn shapes_do_not_share_plans() {
    let provider = provider(ids(&[]));
    provider.prepare(&BoundQuery::new(users_older_than(1))).unwrap();
    provider.prepare(&BoundQuery::new(user_ids_named("ann"))).unwrap();
    provider.prepare(&BoundQuery::new(user_ids_named("bob"))).unwrap();
    assert_eq!(provider.plan_cache().stats().compiles, 2);
}

// ---------------------------------------------------------------------------
// Cardinality
// ---------------------------------------------------------------------------

#[test]
fn single_enforces_exactly_one_row() {
    let query = BoundQuery::new(user_ids_named("ann"));

    let none = provider(ids(&[]));
    assert!(matches!(none.single(&query), Err(QueryError::NoRows)));
    assert_eq!(none.single_or_default(&query).unwrap(), None);

    let one = provider(ids(&[7]));
    assert_eq!(
        one.single(&query).unwrap(),
        Materialized::Value(Value::Int64(7))
    );

    let two = provider(ids(&[7, 8]));
    assert!(matches!(two.single(&query), Err(QueryError::MultipleResults)));
    assert!(matches!(
        two.single_or_default(&query),
        Err(QueryError::MultipleResults)
    ));
    assert_eq!(
        two.first(&query).unwrap(),
        Materialized::Value(Value::Int64(7))
    );
}

#[test]
fn first_over_nothing_has_no_rows() {
    let provider = provider(ids(&[]));
    let query = BoundQuery::new(user_ids_named("ann"));
    assert!(matches!(provider.first(&query), Err(QueryError::NoRows)));
    assert_eq!(provider.first_or_default(&query).unwrap(), None);
    assert!(provider.execute_list(&query).unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Reader lifetime
// ---------------------------------------------------------------------------

#[test]
fn reader_closed_after_completion() {
    let context = ids(&[1, 2, 3]);
    let provider = provider(Arc::clone(&context));
    let rows = provider
        .execute_list(&BoundQuery::new(user_ids_named("ann")))
        .unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(context.opened(), 1);
    assert_eq!(context.closed(), 1);
}

#[test]
fn reader_closed_on_early_drop() {
    let context = ids(&[1, 2, 3]);
    let provider = provider(Arc::clone(&context));
    {
        let mut rows = provider
            .execute(&BoundQuery::new(user_ids_named("ann")))
            .unwrap();
        assert!(rows.next().is_some());
        assert!(rows.is_open());
    }
    assert_eq!(context.closed(), 1);
}

#[test]
fn reader_closed_on_error() {
    let context = Arc::new(
        ScriptedContext::new(&["id"], vec![vec![Value::Int64(1)], vec![Value::Int64(2)]])
            .failing_after(1),
    );
    let provider = provider(Arc::clone(&context));
    let mut rows = provider
        .execute(&BoundQuery::new(user_ids_named("ann")))
        .unwrap();
    assert!(rows.next().unwrap().is_ok());
    let err = rows.next().unwrap().unwrap_err();
    assert!(!rows.is_open());
    assert_eq!(context.closed(), 1);

    // the context's error comes through untouched
    let QueryError::Execution(inner) = err else {
        panic!("expected an execution error");
    };
    assert_eq!(inner.to_string(), "connection reset");

    assert!(rows.next().is_none());
    drop(rows);
    assert_eq!(context.closed(), 1);
}

// ---------------------------------------------------------------------------
// Projection
// ---------------------------------------------------------------------------

#[test]
fn entity_projection_with_constant() {
    let context = Arc::new(ScriptedContext::new(
        &["id", "name"],
        vec![vec![Value::Int64(1), Value::from("ann")]],
    ));
    let provider = provider(Arc::clone(&context));
    let query = |tag: &str| {
        BoundQuery::new(users_older_than(30)).with_projection(
            ProjectionExpr::entity(
                "User",
                vec![
                    FieldProjection::new("Id", ProjectionExpr::column("id", DataType::Int64)),
                    FieldProjection::new("Name", ProjectionExpr::column("name", DataType::Text)),
                    FieldProjection::new("Tag", ProjectionExpr::Constant(Value::from(tag))),
                ],
            ),
            DataType::Entity("User".into()),
        )
    };

    let first = provider.single(&query("a")).unwrap();
    let second = provider.single(&query("b")).unwrap();
    let first = first.as_object().unwrap();
    assert_eq!(first.entity, "User");
    assert_eq!(first.field("Name"), Some(&Materialized::Value(Value::from("ann"))));
    assert_eq!(first.field("Tag"), Some(&Materialized::Value(Value::from("a"))));
    assert_eq!(
        second.as_object().unwrap().field("Tag"),
        Some(&Materialized::Value(Value::from("b")))
    );
    assert_eq!(provider.plan_cache().stats().compiles, 1);
}

#[test]
fn scalar_is_read_as_the_element_type() {
    let context = Arc::new(ScriptedContext::new(&["count"], vec![vec![Value::Int32(4)]]));
    let provider = provider(context);
    let count: Node = SelectNode::new(
        "s0",
        vec![ColumnDeclaration::new(
            "count",
            Node::aggregate(AggregateKind::LongCount, None, DataType::Int64),
        )],
        Some(users()),
    )
    .into();
    let mut query = BoundQuery::new(count);
    query.element_type = DataType::Int64;
    assert_eq!(provider.execute_scalar(&query).unwrap(), Value::Int64(4));
}

#[test]
fn configured_dialect_drives_the_text() {
    let config = CompilerConfig {
        dialect: DialectKind::SqlServer,
        ..Default::default()
    };
    let context = ids(&[1]);
    let provider = QueryProvider::from_config(&config, context.clone());
    provider
        .execute_list(&BoundQuery::new(user_ids_named("ann")))
        .unwrap();
    let command = context.last_command().unwrap();
    assert_eq!(
        command.text,
        "SELECT [t0].[id] FROM [users] AS [t0] WHERE [t0].[name] = @p0"
    );
    assert_eq!(command.parameters[0].value, Value::from("ann"));
}

// ---------------------------------------------------------------------------
// Plugins
// ---------------------------------------------------------------------------

struct CountingPass(Arc<AtomicUsize>);

impl OptimizationPass for CountingPass {
    fn name(&self) -> &str {
        "counting"
    }

    fn transform(&self, node: &Node) -> Node {
        self.0.fetch_add(1, Ordering::SeqCst);
        node.clone()
    }
}

struct DistinctRoot;

impl Amender for DistinctRoot {
    fn name(&self) -> &str {
        "distinct_root"
    }

    fn amend(&self, node: &Node) -> Node {
        match node.as_select() {
            Some(select) if !select.distinct => {
                Node::from(select.as_ref().clone().with_distinct(true))
            }
            _ => node.clone(),
        }
    }
}

struct AuditPlugin(Arc<AtomicUsize>);

impl QueryPlugin for AuditPlugin {
    fn name(&self) -> &str {
        "audit"
    }

    fn version(&self) -> &str {
        "1.0.0"
    }

    fn register(&self, registry: &mut PluginRegistry) -> anyhow::Result<()> {
        registry.add_optimization_pass(Box::new(CountingPass(Arc::clone(&self.0))));
        registry.add_amender(Arc::new(DistinctRoot));
        Ok(())
    }
}

#[test]
fn plugins_join_the_provider_pipeline() {
    let runs = Arc::new(AtomicUsize::new(0));
    let mut plugins = PluginRegistry::new();
    plugins
        .load_plugin(Box::new(AuditPlugin(Arc::clone(&runs))))
        .unwrap();

    let context = ids(&[1]);
    let provider = QueryProvider::from_config_with_plugins(
        &CompilerConfig::default(),
        context.clone(),
        &mut plugins,
    );
    assert!(plugins.take_optimization_passes().is_empty());

    provider
        .execute_list(&BoundQuery::new(user_ids_named("ann")))
        .unwrap();
    assert!(runs.load(Ordering::SeqCst) > 0);
    assert!(context.last_command().unwrap().text.starts_with("SELECT DISTINCT "));
}

#[test]
fn no_plugins_leaves_the_dialect_alone() {
    let context = ids(&[1]);
    let provider = QueryProvider::from_config(&CompilerConfig::default(), context.clone());
    provider
        .execute_list(&BoundQuery::new(user_ids_named("ann")))
        .unwrap();
    assert!(!context.last_command().unwrap().text.contains("DISTINCT"));
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

fn account() -> EntityType {
    EntityType::new("Account", "accounts")
        .with_property(PropertyDef::new("Id", DataType::Int64).primary_key().identity().column("id"))
        .with_property(PropertyDef::new("Owner", DataType::Text).column("owner"))
        .with_property(PropertyDef::new("Balance", DataType::Decimal).column("balance"))
}

#[test]
fn sqlite_persistence_round() {
    let context = ids(&[99]);
    let commands = PersistenceCommands::new(Arc::new(SqliteDialect), context.clone(), 16);
    let account = account();

    let outcome = commands
        .insert(&account, &[("Owner".into(), Value::from("ann"))])
        .unwrap();
    assert_eq!(outcome.generated_key, Some(Value::Int64(99)));
    assert_eq!(
        context.last_command().unwrap().text,
        "INSERT INTO \"accounts\" (\"owner\") VALUES (?) RETURNING \"id\""
    );

    let key = [("Id".to_string(), Value::Int64(99))];
    assert_eq!(commands.update(&account, &key, &[]).unwrap(), 0);
    let changed = [("Balance".to_string(), Value::Decimal("10.50".into()))];
    assert_eq!(commands.update(&account, &key, &changed).unwrap(), 1);
    let update = context.last_command().unwrap();
    assert_eq!(
        update.text,
        "UPDATE \"accounts\" SET \"balance\" = ? WHERE \"id\" = ?"
    );
    assert_eq!(update.parameters[1].value, Value::Int64(99));

    assert_eq!(commands.delete(&account, &key).unwrap(), 1);
    assert_eq!(commands.cache_stats().entries, 3);
}
