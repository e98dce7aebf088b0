mod common;

use proptest::prelude::*;
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;
use sqlweave::dialect::{amend, PostgresDialect, SqlServerDialect};
use sqlweave::ir::compare::{self, CompareFlags};
use sqlweave::ir::*;
use sqlweave::optimizer::{ObjectOperandComparison, OptimizationPass, Optimizer};
use sqlweave::sql::{format, ParameterSource};

use common::*;

fn optimize(node: &Node) -> Node {
    Optimizer::with_defaults().optimize(node)
}

// ---------------------------------------------------------------------------
// Optimizer
// ---------------------------------------------------------------------------

fn predicate() -> impl Strategy<Value = Node> {
    let comparison = (
        prop::sample::select(vec!["a", "b", "c"]),
        prop::sample::select(vec![BinaryOp::Eq, BinaryOp::NotEq, BinaryOp::Gt, BinaryOp::Lt]),
        -3i32..3,
    )
        .prop_map(|(name, op, value)| {
            Node::binary(op, Node::column("t0", name, DataType::Int32), Node::constant(value))
        });
    let folded = (-3i32..3, -3i32..3)
        .prop_map(|(l, r)| Node::equal(Node::constant(l), Node::constant(r)));
    let leaf = prop_oneof![
        comparison,
        folded,
        any::<bool>().prop_map(|b| Node::constant(b)),
        Just(Node::column("t0", "flag", DataType::Boolean)),
    ];
    leaf.prop_recursive(3, 24, 2, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone()).prop_map(|(l, r)| Node::and(l, r)),
            (inner.clone(), inner.clone()).prop_map(|(l, r)| Node::or(l, r)),
            inner.prop_map(Node::logical_not),
        ]
    })
}

fn query() -> impl Strategy<Value = Node> {
    (predicate(), any::<bool>()).prop_map(|(filter, wrapped)| {
        let inner: Node = SelectNode::new("s1", vec![], Some(users()))
            .with_where(filter)
            .into();
        if wrapped {
            SelectNode::new("s0", vec![], Some(inner)).into()
        } else {
            inner
        }
    })
}

proptest! {
    #[test]
    fn optimizing_twice_changes_nothing(node in query()) {
        let once = optimize(&node);
        let twice = optimize(&once);
        prop_assert_eq!(&once, &twice);
    }

    #[test]
    fn literal_values_never_change_the_shape(a in any::<i32>(), b in any::<i32>()) {
        let (x, y) = (users_older_than(a), users_older_than(b));
        prop_assert!(compare::equals(&x, &y, CompareFlags::IGNORE_CONSTANTS));
        prop_assert_eq!(
            compare::hash(&x, CompareFlags::IGNORE_CONSTANTS),
            compare::hash(&y, CompareFlags::IGNORE_CONSTANTS)
        );
        prop_assert_eq!(ShapeKey::new(x), ShapeKey::new(y));
    }
}

/// Names a select exposes, looking through `*` to its sources.
fn result_columns(node: &Node) -> Vec<String> {
    match node {
        Node::Select(s) if s.projects_star() => {
            let mut names = s.from.as_ref().map(result_columns).unwrap_or_default();
            names.extend(s.columns.iter().filter(|c| !c.is_wildcard()).map(|c| c.name.clone()));
            names
        }
        Node::Select(s) => s.columns.iter().map(|c| c.name.clone()).collect(),
        Node::Join(j) => [result_columns(&j.left), result_columns(&j.right)].concat(),
        Node::Table(t) => vec![format!("{}.*", t.name)],
        _ => Vec::new(),
    }
}

fn user_column(name: &str) -> ColumnDeclaration {
    let data_type = match name {
        "id" => DataType::Int64,
        "name" => DataType::Text,
        _ => DataType::Int32,
    };
    column(name, data_type)
}

fn parent_over(source: Node, parent: usize, first: &str) -> Node {
    let columns = match parent {
        0 => vec![],
        1 => vec![ColumnDeclaration::wildcard()],
        _ => vec![ColumnDeclaration::new(first, Node::column("s1", first, DataType::Int32))],
    };
    SelectNode::new("s0", columns, Some(source)).into()
}

proptest! {
    #[test]
    fn optimizing_keeps_the_result_columns(
        picked in prop::sample::subsequence(vec!["id", "name", "age"], 1..=3),
        parent in 0..3usize,
        filtered in any::<bool>(),
    ) {
        let mut source = SelectNode::new(
            "s1",
            picked.iter().map(|name| user_column(name)).collect(),
            Some(users()),
        );
        if filtered {
            source = source.with_where(Node::unary(
                UnaryOp::IsNotNull,
                Node::column("t0", picked[0], DataType::Int32),
            ));
        }
        let node = parent_over(source.into(), parent, picked[0]);
        prop_assert_eq!(result_columns(&optimize(&node)), result_columns(&node));
    }
}

#[test]
fn star_over_explicit_source_keeps_every_column() {
    let source = SelectNode::new(
        "s1",
        vec![user_column("id"), user_column("name"), user_column("age")],
        Some(users()),
    );
    let node: Node = SelectNode::new("s0", vec![], Some(source.into())).into();
    let optimized = optimize(&node);
    assert_eq!(result_columns(&optimized), vec!["id", "name", "age"]);

    let text = format(&PostgresDialect, &optimized).unwrap().command_text;
    for column in ["\"t0\".\"id\"", "\"t0\".\"name\"", "\"t0\".\"age\""] {
        assert!(text.contains(column), "{} lost {}", text, column);
    }
}

#[test]
fn star_over_join_of_sources_keeps_every_column() {
    let orders = SelectNode::new(
        "s2",
        vec![
            ColumnDeclaration::new("user_id", Node::column("t1", "user_id", DataType::Int64)),
            ColumnDeclaration::new("total", Node::column("t1", "total", DataType::Decimal)),
        ],
        Some(Node::table("orders", "t1")),
    );
    let people = SelectNode::new(
        "s1",
        vec![user_column("id"), user_column("name"), user_column("age")],
        Some(users()),
    );
    let join: Node = JoinNode::new(
        JoinKind::Inner,
        people.into(),
        orders.into(),
        Some(Node::equal(
            Node::column("s1", "id", DataType::Int64),
            Node::column("s2", "user_id", DataType::Int64),
        )),
    )
    .unwrap()
    .into();

    for columns in [vec![], vec![ColumnDeclaration::wildcard()]] {
        let node: Node = SelectNode::new("s0", columns, Some(join.clone())).into();
        assert_eq!(
            result_columns(&optimize(&node)),
            vec!["id", "name", "age", "user_id", "total"]
        );
    }
}

#[test]
fn different_shapes_never_share_a_key() {
    let older = users_older_than(30);
    let named = user_ids_named("ann");
    assert!(!compare::equals(&older, &named, CompareFlags::IGNORE_CONSTANTS));
    assert_ne!(ShapeKey::new(older.clone()), ShapeKey::new(named));

    // a null literal is part of the shape
    let null_filter: Node = SelectNode::new("s0", vec![column("id", DataType::Int64)], Some(users()))
        .with_where(Node::equal(
            Node::column("t0", "name", DataType::Text),
            Node::null(DataType::Text),
        ))
        .into();
    assert_ne!(ShapeKey::new(null_filter), ShapeKey::new(user_ids_named("ann")));
    // and without ignoring constants values matter
    assert!(!compare::equals(&older, &users_older_than(31), CompareFlags::empty()));
}

#[test]
fn redundant_subquery_is_removed() {
    let inner = SelectNode::new("inner", vec![], Some(Node::table("T", "t0")));
    let node: Node = SelectNode::new("s0", vec![], Some(inner.into())).into();
    let result = format(&PostgresDialect, &optimize(&node)).unwrap();
    assert_eq!(result.command_text, "SELECT * FROM \"T\" AS \"t0\"");
}

#[test]
fn object_operands_compare_by_key() {
    let customer = |alias: &str, keys: &[&str]| {
        Node::object_reference(
            "Customer",
            keys.iter()
                .map(|k| KeyBinding::new(*k, Node::column(alias, *k, DataType::Int64)))
                .collect(),
        )
    };

    let single = ObjectOperandComparison.transform(&Node::equal(
        customer("a", &["Id"]),
        customer("b", &["Id"]),
    ));
    assert_eq!(
        single,
        Node::equal(
            Node::column("a", "Id", DataType::Int64),
            Node::column("b", "Id", DataType::Int64)
        )
    );
    assert_eq!(
        format(&PostgresDialect, &single).unwrap().command_text,
        "\"a\".\"Id\" = \"b\".\"Id\""
    );

    let composite = ObjectOperandComparison.transform(&Node::equal(
        customer("a", &["Region", "Number"]),
        customer("b", &["Region", "Number"]),
    ));
    assert_eq!(
        composite,
        Node::and(
            Node::equal(
                Node::column("a", "Region", DataType::Int64),
                Node::column("b", "Region", DataType::Int64)
            ),
            Node::equal(
                Node::column("a", "Number", DataType::Int64),
                Node::column("b", "Number", DataType::Int64)
            ),
        )
    );
}

// ---------------------------------------------------------------------------
// Dialects and formatting
// ---------------------------------------------------------------------------

#[test]
fn formatting_is_deterministic() {
    let node = optimize(&users_older_than(21));
    let first = format(&PostgresDialect, &node).unwrap();
    let second = format(&PostgresDialect, &node).unwrap();
    let rebuilt = format(&PostgresDialect, &optimize(&users_older_than(21))).unwrap();
    assert_eq!(first, second);
    assert_eq!(first, rebuilt);
}

#[test]
fn skip_and_take_page_by_row_number() {
    let paged: Node = SelectNode::new("s0", vec![column("name", DataType::Text)], Some(users()))
        .with_skip(Node::constant(5i32))
        .with_take(Node::constant(10i32))
        .into();
    let dialect = SqlServerDialect::new(false);
    let result = format(&dialect, &amend(&dialect, &paged)).unwrap();

    assert!(result
        .command_text
        .contains("ROW_NUMBER() OVER (ORDER BY [t0].[name]) AS [__rownum]"));
    assert!(result
        .command_text
        .contains("WHERE ([s0_inner].[__rownum] > @p0) AND ([s0_inner].[__rownum] <= @p1)"));
    let sources: Vec<&ParameterSource> = result.parameters.iter().map(|p| &p.source).collect();
    assert_eq!(
        sources,
        vec![
            &ParameterSource::Literal(Value::Int32(5)),
            &ParameterSource::Literal(Value::Int32(15))
        ]
    );
}

#[test]
fn distinct_pages_are_deduplicated_before_numbering() {
    let paged: Node = SelectNode::new("s0", vec![column("name", DataType::Text)], Some(users()))
        .with_distinct(true)
        .with_skip(Node::constant(5i32))
        .with_take(Node::constant(10i32))
        .into();
    let dialect = SqlServerDialect::new(false);
    let text = format(&dialect, &amend(&dialect, &paged)).unwrap().command_text;

    assert!(text.contains("SELECT DISTINCT [t0].[name] FROM [users] AS [t0]"), "{}", text);
    assert!(text.contains("ROW_NUMBER() OVER (ORDER BY [s0_distinct].[name]) AS [__rownum]"));
    assert_eq!(text.matches("DISTINCT").count(), 1);
}

#[test]
fn literal_columns_stay_out_of_the_row_number_window() {
    let paged: Node = SelectNode::new(
        "s0",
        vec![
            ColumnDeclaration::new("kind", Node::constant("user")),
            column("name", DataType::Text),
        ],
        Some(users()),
    )
    .with_skip(Node::constant(5i32))
    .into();
    let dialect = SqlServerDialect::new(false);
    let text = format(&dialect, &amend(&dialect, &paged)).unwrap().command_text;
    assert!(text.contains("ROW_NUMBER() OVER (ORDER BY [t0].[name]) AS [__rownum]"), "{}", text);
}

#[test]
fn bit_columns_are_never_bare_predicates() {
    let active = Node::column("t0", "active", DataType::Boolean);
    let node: Node = SelectNode::new("s0", vec![column("id", DataType::Int64)], Some(users()))
        .with_where(Node::and(
            active.clone(),
            Node::logical_not(active),
        ))
        .into();
    let dialect = SqlServerDialect::new(false);
    let result = format(&dialect, &amend(&dialect, &node)).unwrap();
    let text = &result.command_text;

    let after_where = &text[text.find("WHERE").unwrap()..];
    assert!(after_where.contains("[t0].[active] = @p0"));
    assert!(after_where.contains("NOT ([t0].[active] = @p1)"));
    assert!(!after_where.contains("[t0].[active])"));
    assert!(!text.ends_with("[t0].[active]"));
}

fn reparse(node: &Node) -> Vec<sqlparser::ast::Statement> {
    let text = format(&PostgresDialect, &optimize(node)).unwrap().command_text;
    Parser::parse_sql(&PostgreSqlDialect {}, &text)
        .unwrap_or_else(|e| panic!("{} did not parse: {}", text, e))
}

#[test]
fn postgres_output_parses() {
    let joined = SelectNode::new(
        "s0",
        vec![
            column("name", DataType::Text),
            ColumnDeclaration::new(
                "orders",
                Node::aggregate(AggregateKind::Count, None, DataType::Int32),
            ),
        ],
        Some(Node::from(
            JoinNode::new(
                JoinKind::Left,
                users(),
                Node::table("orders", "t1"),
                Some(Node::equal(
                    Node::column("t0", "id", DataType::Int64),
                    Node::column("t1", "user_id", DataType::Int64),
                )),
            )
            .unwrap(),
        )),
    )
    .with_group_by(vec![Node::column("t0", "name", DataType::Text)])
    .with_order_by(vec![OrderBy::desc(Node::column("t0", "name", DataType::Text))])
    .with_skip(Node::constant(20i32))
    .with_take(Node::constant(10i32));

    let starts_with = SelectNode::new("s0", vec![column("id", DataType::Int64)], Some(users()))
        .with_where(Node::function(
            SqlFunction::StartsWith,
            vec![
                Node::column("t0", "name", DataType::Text),
                Node::constant("An"),
            ],
            DataType::Boolean,
        ));

    for node in [
        users_older_than(18),
        user_ids_named("O'Brien"),
        joined.into(),
        starts_with.into(),
    ] {
        assert_eq!(reparse(&node).len(), 1);
    }
}
