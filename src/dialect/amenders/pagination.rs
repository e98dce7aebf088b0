use std::sync::Arc;

use crate::ir::visitor::transform_up;
use crate::ir::{
    BinaryOp, ColumnDeclaration, DataType, Node, OrderBy, OverNode, SelectNode, SqlFunction, Value,
};

use super::Amender;

/// Name of the row number column added to the inner select.
pub const ROW_NUMBER_COLUMN: &str = "__rownum";

/// Rewrites `skip` for dialects without `OFFSET`.
///
/// ```text
/// SELECT cols FROM src ORDER BY o  (skip s, take t)
/// =>
/// SELECT a_inner.cols FROM (
///     SELECT cols, ROW_NUMBER() OVER (ORDER BY o) AS __rownum FROM src
/// ) AS a_inner
/// WHERE __rownum > s AND __rownum <= s + t
/// ORDER BY __rownum
/// ```
///
/// The outer select keeps the original alias so references from enclosing
/// queries and the projector stay valid. A `take` without `skip` is left
/// for the formatter's `TOP`.
///
/// A DISTINCT select is first moved into its own `a_distinct` source, since
/// `__rownum` is unique per row and would defeat the DISTINCT. Without an
/// ORDER BY the window orders by the declared columns that are not
/// literals, parameters or subqueries, else by `(SELECT NULL)`.
pub struct RowNumberPagination;

impl Amender for RowNumberPagination {
    fn name(&self) -> &str {
        "row_number_pagination"
    }

    fn amend(&self, node: &Node) -> Node {
        transform_up(node, |n| {
            let select = n.as_select()?;
            let skip = select.skip.as_ref()?;
            Some(paginate(select, skip).into())
        })
    }
}

fn paginate(select: &SelectNode, skip: &Node) -> SelectNode {
    if select.distinct {
        return paginate(&over_distinct(select), skip);
    }
    let inner_alias = format!("{}_inner", select.alias);
    let explicit: Vec<&ColumnDeclaration> =
        select.columns.iter().filter(|c| !c.is_wildcard()).collect();

    let orderable: Vec<OrderBy> = explicit
        .iter()
        .filter(|c| can_order_window(&c.expression))
        .map(|c| OrderBy::asc(c.expression.clone()))
        .collect();
    let window_order = if !select.order_by.is_empty() {
        select.order_by.clone()
    } else if !orderable.is_empty() {
        orderable
    } else {
        vec![OrderBy::asc(select_null())]
    };
    let row_number = Node::Over(Arc::new(OverNode {
        source: Node::function(SqlFunction::RowNumber, vec![], DataType::Int64),
        order_by: window_order,
    }));

    let mut inner_columns = if select.columns.is_empty() {
        vec![ColumnDeclaration::wildcard()]
    } else {
        select.columns.clone()
    };
    inner_columns.push(ColumnDeclaration::new(ROW_NUMBER_COLUMN, row_number));
    let inner = SelectNode {
        alias: inner_alias.clone(),
        columns: inner_columns,
        from: select.from.clone(),
        where_: select.where_.clone(),
        order_by: Vec::new(),
        group_by: select.group_by.clone(),
        distinct: false,
        skip: None,
        take: None,
        for_update: select.for_update,
        data_type: select.data_type.clone(),
    };

    let row_number_ref = Node::column(inner_alias.clone(), ROW_NUMBER_COLUMN, DataType::Int64);
    let lower = Node::binary(BinaryOp::Gt, row_number_ref.clone(), skip.clone());
    let predicate = match &select.take {
        Some(take) => Node::and(
            lower,
            Node::binary(BinaryOp::LtEq, row_number_ref.clone(), upper_bound(skip, take)),
        ),
        None => lower,
    };

    let outer_columns = if select.columns.iter().any(ColumnDeclaration::is_wildcard) {
        Vec::new()
    } else {
        explicit
            .iter()
            .map(|c| {
                ColumnDeclaration::new(
                    c.name.clone(),
                    Node::column(inner_alias.clone(), c.name.clone(), c.expression.data_type()),
                )
            })
            .collect()
    };

    SelectNode {
        alias: select.alias.clone(),
        columns: outer_columns,
        from: Some(inner.into()),
        where_: Some(predicate),
        order_by: vec![OrderBy::asc(row_number_ref)],
        group_by: Vec::new(),
        distinct: false,
        skip: None,
        take: None,
        for_update: false,
        data_type: select.data_type.clone(),
    }
}

/// Splits a DISTINCT select in two: a `SELECT DISTINCT` source aliased
/// `{alias}_distinct`, and a plain select over it carrying the paging and an
/// ORDER BY restated against the source's columns.
fn over_distinct(select: &SelectNode) -> SelectNode {
    let distinct_alias = format!("{}_distinct", select.alias);
    let star = select.projects_star();
    let source = SelectNode {
        alias: distinct_alias.clone(),
        columns: select.columns.clone(),
        from: select.from.clone(),
        where_: select.where_.clone(),
        order_by: Vec::new(),
        group_by: select.group_by.clone(),
        distinct: true,
        skip: None,
        take: None,
        for_update: select.for_update,
        data_type: select.data_type.clone(),
    };

    let columns = if star {
        Vec::new()
    } else {
        select
            .columns
            .iter()
            .map(|c| {
                ColumnDeclaration::new(
                    c.name.clone(),
                    Node::column(distinct_alias.clone(), c.name.clone(), c.expression.data_type()),
                )
            })
            .collect()
    };

    // DISTINCT only allows ordering by projected columns
    let order_by = select
        .order_by
        .iter()
        .filter_map(|o| {
            let declared = select.columns.iter().find(|c| c.expression == o.expression);
            let name = match (declared, &o.expression) {
                (Some(c), _) => c.name.clone(),
                (None, Node::Column(c)) if star => c.name.clone(),
                _ => return None,
            };
            Some(OrderBy {
                expression: Node::column(distinct_alias.clone(), name, o.expression.data_type()),
                direction: o.direction,
            })
        })
        .collect();

    SelectNode {
        alias: select.alias.clone(),
        columns,
        from: Some(source.into()),
        where_: None,
        order_by,
        group_by: Vec::new(),
        distinct: false,
        skip: select.skip.clone(),
        take: select.take.clone(),
        for_update: false,
        data_type: select.data_type.clone(),
    }
}

/// Literals, parameters and subqueries are rejected in a window ORDER BY.
fn can_order_window(expression: &Node) -> bool {
    !matches!(
        expression,
        Node::Constant(_)
            | Node::ConstantPlaceholder(_)
            | Node::Parameter(_)
            | Node::Subquery(_)
            | Node::AggregateSubquery(_)
    )
}

/// `(SELECT NULL)`, the "any order" window ordering.
fn select_null() -> Node {
    Node::scalar_subquery(SelectNode::new(
        "",
        vec![ColumnDeclaration::new("", Node::null(DataType::Unknown))],
        None,
    ))
}

/// `skip + take`, folded when both are integer literals.
fn upper_bound(skip: &Node, take: &Node) -> Node {
    if let (Some(s), Some(t)) = (skip.as_constant(), take.as_constant()) {
        if let Some(sum) = s.as_i64().zip(t.as_i64()).and_then(|(a, b)| a.checked_add(b)) {
            return match (t, i32::try_from(sum)) {
                (Value::Int32(_), Ok(narrow)) => Node::constant(narrow),
                _ => Node::constant(sum),
            };
        }
    }
    Node::binary(BinaryOp::Add, skip.clone(), take.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::OrderDirection;

    fn users(columns: Vec<ColumnDeclaration>) -> SelectNode {
        SelectNode::new("s0", columns, Some(Node::table("users", "t0")))
    }

    fn name_column() -> ColumnDeclaration {
        ColumnDeclaration::new("name", Node::column("t0", "name", DataType::Text))
    }

    #[test]
    fn test_skip_and_take_become_row_number_filter() {
        let node: Node = users(vec![name_column()])
            .with_skip(Node::constant(5i32))
            .with_take(Node::constant(10i32))
            .into();
        let out = RowNumberPagination.amend(&node);
        let outer = out.as_select().unwrap();
        assert_eq!(outer.alias, "s0");
        assert!(outer.skip.is_none() && outer.take.is_none());
        assert_eq!(outer.columns[0].expression, Node::column("s0_inner", "name", DataType::Text));

        let rownum = Node::column("s0_inner", ROW_NUMBER_COLUMN, DataType::Int64);
        let expected = Node::and(
            Node::binary(BinaryOp::Gt, rownum.clone(), Node::constant(5i32)),
            Node::binary(BinaryOp::LtEq, rownum, Node::constant(15i32)),
        );
        assert_eq!(outer.where_.as_ref().unwrap(), &expected);

        let inner = outer.from.as_ref().and_then(Node::as_select).unwrap();
        assert_eq!(inner.columns.len(), 2);
        let Node::Over(over) = &inner.columns[1].expression else {
            panic!("expected window");
        };
        // synthesized from the declared column
        assert_eq!(over.order_by[0].expression, Node::column("t0", "name", DataType::Text));
    }

    #[test]
    fn test_existing_order_moves_into_window() {
        let order = vec![OrderBy::desc(Node::column("t0", "age", DataType::Int32))];
        let node: Node = users(vec![name_column()])
            .with_order_by(order)
            .with_skip(Node::placeholder(0, DataType::Int32))
            .into();
        let out = RowNumberPagination.amend(&node);
        let outer = out.as_select().unwrap();
        let inner = outer.from.as_ref().and_then(Node::as_select).unwrap();
        assert!(inner.order_by.is_empty());
        let Node::Over(over) = &inner.columns[1].expression else {
            panic!("expected window");
        };
        assert_eq!(over.order_by[0].expression, Node::column("t0", "age", DataType::Int32));
        let Some(Node::Binary(filter)) = &outer.where_ else {
            panic!("expected lower bound only");
        };
        assert_eq!(filter.op, BinaryOp::Gt);
    }

    #[test]
    fn test_star_select_orders_by_select_null() {
        let node: Node = users(vec![]).with_skip(Node::constant(1i32)).into();
        let out = RowNumberPagination.amend(&node);
        let outer = out.as_select().unwrap();
        assert!(outer.columns.is_empty());
        let inner = outer.from.as_ref().and_then(Node::as_select).unwrap();
        assert!(inner.columns[0].is_wildcard());
        let Node::Over(over) = &inner.columns[1].expression else {
            panic!("expected window");
        };
        assert!(matches!(over.order_by[0].expression, Node::Subquery(_)));
    }

    #[test]
    fn test_take_only_untouched() {
        let node: Node = users(vec![name_column()]).with_take(Node::constant(3i32)).into();
        assert!(Node::same(&RowNumberPagination.amend(&node), &node));
    }

    fn window_of(select: &SelectNode) -> &OverNode {
        match &select.columns.last().unwrap().expression {
            Node::Over(over) => over,
            _ => panic!("expected window"),
        }
    }

    #[test]
    fn test_distinct_is_applied_before_numbering() {
        let node: Node = users(vec![name_column()])
            .with_distinct(true)
            .with_order_by(vec![OrderBy::desc(Node::column("t0", "name", DataType::Text))])
            .with_skip(Node::constant(5i32))
            .with_take(Node::constant(10i32))
            .into();
        let out = RowNumberPagination.amend(&node);
        let outer = out.as_select().unwrap();
        assert_eq!(outer.alias, "s0");
        assert!(!outer.distinct);

        let numbered = outer.from.as_ref().and_then(Node::as_select).unwrap();
        assert!(!numbered.distinct);
        assert_eq!(
            numbered.columns[0].expression,
            Node::column("s0_distinct", "name", DataType::Text)
        );
        let over = window_of(numbered);
        assert_eq!(over.order_by[0].expression, Node::column("s0_distinct", "name", DataType::Text));
        assert_eq!(over.order_by[0].direction, OrderDirection::Descending);

        let distinct = numbered.from.as_ref().and_then(Node::as_select).unwrap();
        assert_eq!(distinct.alias, "s0_distinct");
        assert!(distinct.distinct);
        assert_eq!(distinct.columns.len(), 1);
        assert_eq!(distinct.columns[0].expression, name_column().expression);
        assert!(distinct.columns.iter().all(|c| c.name != ROW_NUMBER_COLUMN));
    }

    #[test]
    fn test_distinct_drops_order_outside_the_projection() {
        let node: Node = users(vec![name_column()])
            .with_distinct(true)
            .with_order_by(vec![OrderBy::asc(Node::column("t0", "age", DataType::Int32))])
            .with_skip(Node::constant(1i32))
            .into();
        let out = RowNumberPagination.amend(&node);
        let numbered = out.as_select().unwrap().from.as_ref().and_then(Node::as_select).unwrap();
        let over = window_of(numbered);
        assert_eq!(over.order_by.len(), 1);
        assert_eq!(over.order_by[0].expression, Node::column("s0_distinct", "name", DataType::Text));
    }

    #[test]
    fn test_distinct_star_keeps_star_projection() {
        let node: Node = users(vec![]).with_distinct(true).with_skip(Node::constant(2i32)).into();
        let out = RowNumberPagination.amend(&node);
        let outer = out.as_select().unwrap();
        assert!(outer.columns.is_empty());
        let numbered = outer.from.as_ref().and_then(Node::as_select).unwrap();
        assert!(numbered.columns[0].is_wildcard());
        let distinct = numbered.from.as_ref().and_then(Node::as_select).unwrap();
        assert!(distinct.distinct && distinct.columns.is_empty());
    }

    #[test]
    fn test_literal_columns_are_left_out_of_window_order() {
        let node: Node = users(vec![
            ColumnDeclaration::new("tag", Node::constant("x")),
            ColumnDeclaration::new("slot", Node::placeholder(0, DataType::Int32)),
            name_column(),
        ])
        .with_skip(Node::constant(5i32))
        .into();
        let out = RowNumberPagination.amend(&node);
        let inner = out.as_select().unwrap().from.as_ref().and_then(Node::as_select).unwrap();
        let over = window_of(inner);
        assert_eq!(over.order_by.len(), 1);
        assert_eq!(over.order_by[0].expression, Node::column("t0", "name", DataType::Text));
    }

    #[test]
    fn test_only_literal_columns_order_by_select_null() {
        let node: Node = users(vec![ColumnDeclaration::new("one", Node::constant(1i32))])
            .with_skip(Node::constant(5i32))
            .into();
        let out = RowNumberPagination.amend(&node);
        let inner = out.as_select().unwrap().from.as_ref().and_then(Node::as_select).unwrap();
        let over = window_of(inner);
        assert_eq!(over.order_by.len(), 1);
        assert!(matches!(over.order_by[0].expression, Node::Subquery(_)));
    }

    #[test]
    fn test_non_literal_bounds_are_added() {
        let skip = Node::parameter("skip", DataType::Int32);
        let take = Node::constant(10i32);
        assert!(matches!(upper_bound(&skip, &take), Node::Binary(_)));
    }
}
