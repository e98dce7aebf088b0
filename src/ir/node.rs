//! The SQL intermediate representation.
//!
//! A [`Node`] is a closed sum type over every kind the compiler knows.
//! Each variant holds its payload behind an `Arc`: cloning a node is a
//! reference-count bump, and a rewrite that leaves a subtree alone hands
//! back the very same `Arc`. [`Node::same`] (pointer identity) is therefore
//! the cheap "did anything change" test every pass relies on.
//!
//! Nodes are immutable. The `change_*` methods on payloads return the
//! receiver itself when the argument is identical by reference, and a
//! freshly allocated payload otherwise.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::function::SqlFunction;
use super::types::DataType;
use super::value::Value;
use crate::error::CompileError;

/// An IR node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Node {
    // Query nodes
    Table(Arc<TableNode>),
    Select(Arc<SelectNode>),
    Join(Arc<JoinNode>),
    Column(Arc<ColumnNode>),
    Aggregate(Arc<AggregateNode>),
    AggregateSubquery(Arc<AggregateSubqueryNode>),
    Subquery(Arc<SubqueryNode>),
    FunctionCall(Arc<FunctionCallNode>),
    Constant(Arc<ConstantNode>),
    ConstantPlaceholder(Arc<PlaceholderNode>),
    Parameter(Arc<ParameterNode>),
    Over(Arc<OverNode>),
    Binary(Arc<BinaryNode>),
    Unary(Arc<UnaryNode>),
    Conditional(Arc<ConditionalNode>),
    Tuple(Arc<TupleNode>),
    ObjectReference(Arc<ObjectReferenceNode>),
    // Statement and DDL nodes
    InsertInto(Arc<InsertIntoNode>),
    Update(Arc<UpdateNode>),
    Delete(Arc<DeleteNode>),
    CreateTable(Arc<CreateTableNode>),
    AlterTable(Arc<AlterTableNode>),
    ColumnDefinition(Arc<ColumnDefinitionNode>),
    Constraint(Arc<ConstraintNode>),
    ConstraintAction(Arc<ConstraintActionNode>),
    CreateIndex(Arc<CreateIndexNode>),
    EnumDefinition(Arc<EnumDefinitionNode>),
    SetCommand(Arc<SetCommandNode>),
    StatementList(Arc<StatementListNode>),
}

/// Kind tag of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Table,
    Select,
    Join,
    Column,
    Aggregate,
    AggregateSubquery,
    Subquery,
    FunctionCall,
    Constant,
    ConstantPlaceholder,
    Parameter,
    Over,
    Binary,
    Unary,
    Conditional,
    Tuple,
    ObjectReference,
    InsertInto,
    Update,
    Delete,
    CreateTable,
    AlterTable,
    ColumnDefinition,
    Constraint,
    ConstraintAction,
    CreateIndex,
    EnumDefinition,
    SetCommand,
    StatementList,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl Node {
    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Table(_) => NodeKind::Table,
            Node::Select(_) => NodeKind::Select,
            Node::Join(_) => NodeKind::Join,
            Node::Column(_) => NodeKind::Column,
            Node::Aggregate(_) => NodeKind::Aggregate,
            Node::AggregateSubquery(_) => NodeKind::AggregateSubquery,
            Node::Subquery(_) => NodeKind::Subquery,
            Node::FunctionCall(_) => NodeKind::FunctionCall,
            Node::Constant(_) => NodeKind::Constant,
            Node::ConstantPlaceholder(_) => NodeKind::ConstantPlaceholder,
            Node::Parameter(_) => NodeKind::Parameter,
            Node::Over(_) => NodeKind::Over,
            Node::Binary(_) => NodeKind::Binary,
            Node::Unary(_) => NodeKind::Unary,
            Node::Conditional(_) => NodeKind::Conditional,
            Node::Tuple(_) => NodeKind::Tuple,
            Node::ObjectReference(_) => NodeKind::ObjectReference,
            Node::InsertInto(_) => NodeKind::InsertInto,
            Node::Update(_) => NodeKind::Update,
            Node::Delete(_) => NodeKind::Delete,
            Node::CreateTable(_) => NodeKind::CreateTable,
            Node::AlterTable(_) => NodeKind::AlterTable,
            Node::ColumnDefinition(_) => NodeKind::ColumnDefinition,
            Node::Constraint(_) => NodeKind::Constraint,
            Node::ConstraintAction(_) => NodeKind::ConstraintAction,
            Node::CreateIndex(_) => NodeKind::CreateIndex,
            Node::EnumDefinition(_) => NodeKind::EnumDefinition,
            Node::SetCommand(_) => NodeKind::SetCommand,
            Node::StatementList(_) => NodeKind::StatementList,
        }
    }

    /// The semantic result type. Statements and DDL are `Void`.
    pub fn data_type(&self) -> DataType {
        match self {
            Node::Table(n) => n.data_type.clone(),
            Node::Select(n) => n.data_type.clone(),
            Node::Join(n) => DataType::Tuple(vec![n.left.data_type(), n.right.data_type()]),
            Node::Column(n) => n.data_type.clone(),
            Node::Aggregate(n) => n.data_type.clone(),
            Node::AggregateSubquery(n) => n.data_type.clone(),
            Node::Subquery(n) => n.data_type.clone(),
            Node::FunctionCall(n) => n.data_type.clone(),
            Node::Constant(n) => n.data_type.clone(),
            Node::ConstantPlaceholder(n) => n.data_type.clone(),
            Node::Parameter(n) => n.data_type.clone(),
            Node::Over(n) => n.source.data_type(),
            Node::Binary(n) => n.data_type.clone(),
            Node::Unary(n) => n.data_type.clone(),
            Node::Conditional(n) => n.data_type.clone(),
            Node::Tuple(n) => DataType::Tuple(n.elements.iter().map(Node::data_type).collect()),
            Node::ObjectReference(n) => DataType::Entity(n.entity.clone()),
            Node::InsertInto(_)
            | Node::Update(_)
            | Node::Delete(_)
            | Node::CreateTable(_)
            | Node::AlterTable(_)
            | Node::ColumnDefinition(_)
            | Node::Constraint(_)
            | Node::ConstraintAction(_)
            | Node::CreateIndex(_)
            | Node::EnumDefinition(_)
            | Node::SetCommand(_)
            | Node::StatementList(_) => DataType::Void,
        }
    }

    /// Reference identity: true iff both nodes share one payload allocation.
    pub fn same(a: &Node, b: &Node) -> bool {
        match (a, b) {
            (Node::Table(a), Node::Table(b)) => Arc::ptr_eq(a, b),
            (Node::Select(a), Node::Select(b)) => Arc::ptr_eq(a, b),
            (Node::Join(a), Node::Join(b)) => Arc::ptr_eq(a, b),
            (Node::Column(a), Node::Column(b)) => Arc::ptr_eq(a, b),
            (Node::Aggregate(a), Node::Aggregate(b)) => Arc::ptr_eq(a, b),
            (Node::AggregateSubquery(a), Node::AggregateSubquery(b)) => Arc::ptr_eq(a, b),
            (Node::Subquery(a), Node::Subquery(b)) => Arc::ptr_eq(a, b),
            (Node::FunctionCall(a), Node::FunctionCall(b)) => Arc::ptr_eq(a, b),
            (Node::Constant(a), Node::Constant(b)) => Arc::ptr_eq(a, b),
            (Node::ConstantPlaceholder(a), Node::ConstantPlaceholder(b)) => Arc::ptr_eq(a, b),
            (Node::Parameter(a), Node::Parameter(b)) => Arc::ptr_eq(a, b),
            (Node::Over(a), Node::Over(b)) => Arc::ptr_eq(a, b),
            (Node::Binary(a), Node::Binary(b)) => Arc::ptr_eq(a, b),
            (Node::Unary(a), Node::Unary(b)) => Arc::ptr_eq(a, b),
            (Node::Conditional(a), Node::Conditional(b)) => Arc::ptr_eq(a, b),
            (Node::Tuple(a), Node::Tuple(b)) => Arc::ptr_eq(a, b),
            (Node::ObjectReference(a), Node::ObjectReference(b)) => Arc::ptr_eq(a, b),
            (Node::InsertInto(a), Node::InsertInto(b)) => Arc::ptr_eq(a, b),
            (Node::Update(a), Node::Update(b)) => Arc::ptr_eq(a, b),
            (Node::Delete(a), Node::Delete(b)) => Arc::ptr_eq(a, b),
            (Node::CreateTable(a), Node::CreateTable(b)) => Arc::ptr_eq(a, b),
            (Node::AlterTable(a), Node::AlterTable(b)) => Arc::ptr_eq(a, b),
            (Node::ColumnDefinition(a), Node::ColumnDefinition(b)) => Arc::ptr_eq(a, b),
            (Node::Constraint(a), Node::Constraint(b)) => Arc::ptr_eq(a, b),
            (Node::ConstraintAction(a), Node::ConstraintAction(b)) => Arc::ptr_eq(a, b),
            (Node::CreateIndex(a), Node::CreateIndex(b)) => Arc::ptr_eq(a, b),
            (Node::EnumDefinition(a), Node::EnumDefinition(b)) => Arc::ptr_eq(a, b),
            (Node::SetCommand(a), Node::SetCommand(b)) => Arc::ptr_eq(a, b),
            (Node::StatementList(a), Node::StatementList(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    // ----- accessors -------------------------------------------------------

    pub fn as_select(&self) -> Option<&Arc<SelectNode>> {
        match self {
            Node::Select(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_column(&self) -> Option<&Arc<ColumnNode>> {
        match self {
            Node::Column(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_constant(&self) -> Option<&Value> {
        match self {
            Node::Constant(c) => Some(&c.value),
            _ => None,
        }
    }

    /// `Some(b)` if the node is a boolean literal.
    pub fn as_bool_constant(&self) -> Option<bool> {
        self.as_constant().and_then(Value::as_bool)
    }

    pub fn is_constant(&self) -> bool {
        matches!(self, Node::Constant(_))
    }

    /// True for nodes that are valid only as the source of a `FROM` clause.
    pub fn is_source(&self) -> bool {
        matches!(self, Node::Table(_) | Node::Select(_) | Node::Join(_))
    }

    /// True for nodes that are already a SQL predicate (as opposed to a value
    /// that merely has a boolean type).
    pub fn is_predicate(&self) -> bool {
        match self {
            Node::Binary(b) => b.op.is_comparison() || b.op.is_logical(),
            Node::Unary(u) => matches!(
                u.op,
                UnaryOp::Not | UnaryOp::IsNull | UnaryOp::IsNotNull
            ),
            Node::FunctionCall(f) => f.function.is_predicate(),
            Node::Subquery(s) => matches!(s.kind, SubqueryKind::Exists | SubqueryKind::In),
            _ => false,
        }
    }

    // ----- constructors ----------------------------------------------------

    pub fn table(name: impl Into<String>, alias: impl Into<String>) -> Node {
        Node::Table(Arc::new(TableNode {
            name: name.into(),
            alias: alias.into(),
            data_type: DataType::Unknown,
        }))
    }

    pub fn column(alias: impl Into<String>, name: impl Into<String>, data_type: DataType) -> Node {
        Node::Column(Arc::new(ColumnNode {
            select_alias: alias.into(),
            name: name.into(),
            data_type,
        }))
    }

    pub fn constant(value: impl Into<Value>) -> Node {
        let value = value.into();
        let data_type = value.data_type();
        Node::Constant(Arc::new(ConstantNode { value, data_type }))
    }

    pub fn typed_constant(value: Value, data_type: DataType) -> Node {
        Node::Constant(Arc::new(ConstantNode { value, data_type }))
    }

    pub fn null(data_type: DataType) -> Node {
        Node::typed_constant(Value::Null, data_type)
    }

    pub fn placeholder(index: usize, data_type: DataType) -> Node {
        Node::ConstantPlaceholder(Arc::new(PlaceholderNode { index, data_type }))
    }

    pub fn parameter(name: impl Into<String>, data_type: DataType) -> Node {
        Node::Parameter(Arc::new(ParameterNode {
            name: name.into(),
            data_type,
        }))
    }

    /// Build a binary node, inferring its result type from the operator.
    pub fn binary(op: BinaryOp, left: Node, right: Node) -> Node {
        let data_type = if op.is_comparison() || op.is_logical() {
            DataType::Boolean
        } else {
            left.data_type()
        };
        Node::Binary(Arc::new(BinaryNode {
            op,
            left,
            right,
            data_type,
        }))
    }

    pub fn equal(left: Node, right: Node) -> Node {
        Node::binary(BinaryOp::Eq, left, right)
    }

    pub fn and(left: Node, right: Node) -> Node {
        Node::binary(BinaryOp::And, left, right)
    }

    pub fn or(left: Node, right: Node) -> Node {
        Node::binary(BinaryOp::Or, left, right)
    }

    /// Left-deep conjunction; `None` for an empty input.
    pub fn and_all(items: impl IntoIterator<Item = Node>) -> Option<Node> {
        items.into_iter().reduce(Node::and)
    }

    /// Left-deep disjunction; `None` for an empty input.
    pub fn or_all(items: impl IntoIterator<Item = Node>) -> Option<Node> {
        items.into_iter().reduce(Node::or)
    }

    pub fn unary(op: UnaryOp, operand: Node) -> Node {
        let data_type = match op {
            UnaryOp::Negate => operand.data_type(),
            UnaryOp::Not | UnaryOp::IsNull | UnaryOp::IsNotNull => DataType::Boolean,
        };
        Node::Unary(Arc::new(UnaryNode {
            op,
            operand,
            data_type,
        }))
    }

    pub fn logical_not(operand: Node) -> Node {
        Node::unary(UnaryOp::Not, operand)
    }

    pub fn function(function: SqlFunction, arguments: Vec<Node>, data_type: DataType) -> Node {
        Node::FunctionCall(Arc::new(FunctionCallNode {
            function,
            arguments,
            data_type,
        }))
    }

    pub fn aggregate(kind: AggregateKind, argument: Option<Node>, data_type: DataType) -> Node {
        Node::Aggregate(Arc::new(AggregateNode {
            kind,
            argument,
            distinct: false,
            data_type,
        }))
    }

    pub fn conditional(branches: Vec<WhenClause>, default: Option<Node>, data_type: DataType) -> Node {
        Node::Conditional(Arc::new(ConditionalNode {
            branches,
            default,
            data_type,
        }))
    }

    pub fn tuple(elements: Vec<Node>) -> Node {
        Node::Tuple(Arc::new(TupleNode { elements }))
    }

    pub fn object_reference(entity: impl Into<String>, keys: Vec<KeyBinding>) -> Node {
        Node::ObjectReference(Arc::new(ObjectReferenceNode {
            entity: entity.into(),
            keys,
        }))
    }

    pub fn scalar_subquery(select: SelectNode) -> Node {
        let data_type = select
            .columns
            .first()
            .map(|c| c.expression.data_type())
            .unwrap_or(DataType::Unknown);
        Node::Subquery(Arc::new(SubqueryNode {
            kind: SubqueryKind::Scalar,
            operand: None,
            select: Node::Select(Arc::new(select)),
            data_type,
        }))
    }

    pub fn exists(select: SelectNode) -> Node {
        Node::Subquery(Arc::new(SubqueryNode {
            kind: SubqueryKind::Exists,
            operand: None,
            select: Node::Select(Arc::new(select)),
            data_type: DataType::Boolean,
        }))
    }

    pub fn statement_list(statements: Vec<Node>) -> Node {
        Node::StatementList(Arc::new(StatementListNode { statements }))
    }
}

impl From<SelectNode> for Node {
    fn from(select: SelectNode) -> Self {
        Node::Select(Arc::new(select))
    }
}

impl From<JoinNode> for Node {
    fn from(join: JoinNode) -> Self {
        Node::Join(Arc::new(join))
    }
}

/// Structural equality with constants and placeholders compared exactly.
impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        super::compare::equals(self, other, super::compare::CompareFlags::empty())
    }
}

impl Eq for Node {}

pub(crate) fn same_opt(a: &Option<Node>, b: &Option<Node>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => Node::same(a, b),
        (None, None) => true,
        _ => false,
    }
}

pub(crate) fn same_all(a: &[Node], b: &[Node]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(a, b)| Node::same(a, b))
}

// ---------------------------------------------------------------------------
// Query payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableNode {
    pub name: String,
    pub alias: String,
    #[serde(default)]
    pub data_type: DataType,
}

/// One projected column of a `Select`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnDeclaration {
    pub name: String,
    pub expression: Node,
}

impl ColumnDeclaration {
    pub const WILDCARD: &'static str = "*";

    pub fn new(name: impl Into<String>, expression: Node) -> Self {
        Self {
            name: name.into(),
            expression,
        }
    }

    /// `*` alongside explicit columns, e.g. `SELECT *, ROW_NUMBER() ...`.
    pub fn wildcard() -> Self {
        Self::new(Self::WILDCARD, Node::column("", Self::WILDCARD, DataType::Unknown))
    }

    pub fn is_wildcard(&self) -> bool {
        self.name == Self::WILDCARD
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderDirection {
    #[default]
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderBy {
    pub expression: Node,
    #[serde(default)]
    pub direction: OrderDirection,
}

impl OrderBy {
    pub fn asc(expression: Node) -> Self {
        Self {
            expression,
            direction: OrderDirection::Ascending,
        }
    }

    pub fn desc(expression: Node) -> Self {
        Self {
            expression,
            direction: OrderDirection::Descending,
        }
    }
}

/// `SELECT` with every clause the compiler models.
///
/// An empty column list formats as `*`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectNode {
    pub alias: String,
    #[serde(default)]
    pub columns: Vec<ColumnDeclaration>,
    #[serde(default)]
    pub from: Option<Node>,
    #[serde(default, rename = "where")]
    pub where_: Option<Node>,
    #[serde(default)]
    pub order_by: Vec<OrderBy>,
    #[serde(default)]
    pub group_by: Vec<Node>,
    #[serde(default)]
    pub distinct: bool,
    #[serde(default)]
    pub skip: Option<Node>,
    #[serde(default)]
    pub take: Option<Node>,
    #[serde(default)]
    pub for_update: bool,
    #[serde(default)]
    pub data_type: DataType,
}

impl SelectNode {
    pub fn new(alias: impl Into<String>, columns: Vec<ColumnDeclaration>, from: Option<Node>) -> Self {
        Self {
            alias: alias.into(),
            columns,
            from,
            where_: None,
            order_by: Vec::new(),
            group_by: Vec::new(),
            distinct: false,
            skip: None,
            take: None,
            for_update: false,
            data_type: DataType::Unknown,
        }
    }

    pub fn with_where(mut self, predicate: Node) -> Self {
        self.where_ = Some(predicate);
        self
    }

    pub fn with_order_by(mut self, order_by: Vec<OrderBy>) -> Self {
        self.order_by = order_by;
        self
    }

    pub fn with_group_by(mut self, group_by: Vec<Node>) -> Self {
        self.group_by = group_by;
        self
    }

    pub fn with_distinct(mut self, distinct: bool) -> Self {
        self.distinct = distinct;
        self
    }

    pub fn with_skip(mut self, skip: Node) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn with_take(mut self, take: Node) -> Self {
        self.take = Some(take);
        self
    }

    pub fn with_data_type(mut self, data_type: DataType) -> Self {
        self.data_type = data_type;
        self
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDeclaration> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// `Column` node referencing one of this select's columns.
    pub fn column_ref(&self, name: &str) -> Option<Node> {
        self.column(name)
            .map(|c| Node::column(self.alias.clone(), name, c.expression.data_type()))
    }

    /// `SELECT *`: no declared columns, or a wildcard among them.
    pub fn projects_star(&self) -> bool {
        self.columns.is_empty() || self.columns.iter().any(ColumnDeclaration::is_wildcard)
    }

    /// A select that neither filters, groups, orders, nor limits.
    pub fn is_plain(&self) -> bool {
        self.where_.is_none()
            && self.group_by.is_empty()
            && self.order_by.is_empty()
            && !self.distinct
            && self.skip.is_none()
            && self.take.is_none()
            && !self.for_update
    }

    pub fn change_columns(self: &Arc<Self>, columns: Vec<ColumnDeclaration>) -> Arc<Self> {
        let same = columns.len() == self.columns.len()
            && columns
                .iter()
                .zip(&self.columns)
                .all(|(a, b)| a.name == b.name && Node::same(&a.expression, &b.expression));
        if same {
            return Arc::clone(self);
        }
        Arc::new(SelectNode {
            columns,
            ..(**self).clone()
        })
    }

    pub fn change_from(self: &Arc<Self>, from: Option<Node>) -> Arc<Self> {
        if same_opt(&self.from, &from) {
            return Arc::clone(self);
        }
        Arc::new(SelectNode {
            from,
            ..(**self).clone()
        })
    }

    pub fn change_where(self: &Arc<Self>, where_: Option<Node>) -> Arc<Self> {
        if same_opt(&self.where_, &where_) {
            return Arc::clone(self);
        }
        Arc::new(SelectNode {
            where_,
            ..(**self).clone()
        })
    }

    pub fn change_order_by(self: &Arc<Self>, order_by: Vec<OrderBy>) -> Arc<Self> {
        let same = order_by.len() == self.order_by.len()
            && order_by.iter().zip(&self.order_by).all(|(a, b)| {
                a.direction == b.direction && Node::same(&a.expression, &b.expression)
            });
        if same {
            return Arc::clone(self);
        }
        Arc::new(SelectNode {
            order_by,
            ..(**self).clone()
        })
    }

    pub fn change_group_by(self: &Arc<Self>, group_by: Vec<Node>) -> Arc<Self> {
        if same_all(&self.group_by, &group_by) {
            return Arc::clone(self);
        }
        Arc::new(SelectNode {
            group_by,
            ..(**self).clone()
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Full,
    Cross,
    CrossApply,
    OuterApply,
}

impl JoinKind {
    /// Kinds that are complete without an `ON` condition.
    pub fn allows_missing_condition(self) -> bool {
        matches!(self, JoinKind::Cross | JoinKind::CrossApply | JoinKind::OuterApply)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinNode {
    pub kind: JoinKind,
    pub left: Node,
    pub right: Node,
    #[serde(default)]
    pub condition: Option<Node>,
}

impl JoinNode {
    pub fn new(kind: JoinKind, left: Node, right: Node, condition: Option<Node>) -> Result<Self, CompileError> {
        if condition.is_none() && !kind.allows_missing_condition() {
            return Err(CompileError::InvalidNode(format!(
                "{:?} join requires a condition",
                kind
            )));
        }
        Ok(Self {
            kind,
            left,
            right,
            condition,
        })
    }

    pub fn change(self: &Arc<Self>, left: Node, right: Node, condition: Option<Node>) -> Arc<Self> {
        if Node::same(&self.left, &left)
            && Node::same(&self.right, &right)
            && same_opt(&self.condition, &condition)
        {
            return Arc::clone(self);
        }
        Arc::new(JoinNode {
            kind: self.kind,
            left,
            right,
            condition,
        })
    }
}

/// Reference to a column of a `Select` (or table) by owning alias and name.
///
/// Two columns are equal iff alias and name match; the type does not take part.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnNode {
    pub select_alias: String,
    pub name: String,
    #[serde(default)]
    pub data_type: DataType,
}

impl ColumnNode {
    pub fn aliased_name(&self) -> String {
        format!("{}.{}", self.select_alias, self.name)
    }
}

impl PartialEq for ColumnNode {
    fn eq(&self, other: &Self) -> bool {
        self.select_alias == other.select_alias && self.name == other.name
    }
}

impl Eq for ColumnNode {}

impl Hash for ColumnNode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.select_alias.hash(state);
        self.name.hash(state);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AggregateKind {
    Count,
    LongCount,
    Sum,
    Min,
    Max,
    Average,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateNode {
    pub kind: AggregateKind,
    #[serde(default)]
    pub argument: Option<Node>,
    #[serde(default)]
    pub distinct: bool,
    pub data_type: DataType,
}

/// An aggregate over a group, carried in both of its possible forms.
///
/// `aggregate_in_group_select` is valid inside the grouped select named by
/// `group_by_alias`; `aggregate_as_subquery` is the equivalent correlated
/// scalar subquery usable anywhere.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateSubqueryNode {
    pub group_by_alias: String,
    pub aggregate_in_group_select: Node,
    pub aggregate_as_subquery: Node,
    pub data_type: DataType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubqueryKind {
    Scalar,
    Exists,
    /// `operand IN (select)`
    In,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubqueryNode {
    pub kind: SubqueryKind,
    #[serde(default)]
    pub operand: Option<Node>,
    pub select: Node,
    pub data_type: DataType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionCallNode {
    pub function: SqlFunction,
    pub arguments: Vec<Node>,
    pub data_type: DataType,
}

impl FunctionCallNode {
    pub fn change_arguments(self: &Arc<Self>, arguments: Vec<Node>) -> Arc<Self> {
        if same_all(&self.arguments, &arguments) {
            return Arc::clone(self);
        }
        Arc::new(FunctionCallNode {
            function: self.function.clone(),
            arguments,
            data_type: self.data_type.clone(),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstantNode {
    pub value: Value,
    pub data_type: DataType,
}

/// Stand-in for a literal: an index into a side array of values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceholderNode {
    pub index: usize,
    pub data_type: DataType,
}

/// A value supplied by name at execution time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterNode {
    pub name: String,
    pub data_type: DataType,
}

/// `source OVER (ORDER BY ...)`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverNode {
    pub source: Node,
    pub order_by: Vec<OrderBy>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
}

impl BinaryOp {
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::NotEq | BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq
        )
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }

    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            BinaryOp::Add | BinaryOp::Subtract | BinaryOp::Multiply | BinaryOp::Divide | BinaryOp::Modulo
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinaryNode {
    pub op: BinaryOp,
    pub left: Node,
    pub right: Node,
    pub data_type: DataType,
}

impl BinaryNode {
    pub fn change(self: &Arc<Self>, left: Node, right: Node) -> Arc<Self> {
        if Node::same(&self.left, &left) && Node::same(&self.right, &right) {
            return Arc::clone(self);
        }
        Arc::new(BinaryNode {
            op: self.op,
            left,
            right,
            data_type: self.data_type.clone(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    Not,
    Negate,
    IsNull,
    IsNotNull,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnaryNode {
    pub op: UnaryOp,
    pub operand: Node,
    pub data_type: DataType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhenClause {
    pub condition: Node,
    pub result: Node,
}

impl WhenClause {
    pub fn new(condition: Node, result: Node) -> Self {
        Self { condition, result }
    }
}

/// `CASE WHEN ... THEN ... [ELSE ...] END`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionalNode {
    pub branches: Vec<WhenClause>,
    #[serde(default)]
    pub default: Option<Node>,
    pub data_type: DataType,
}

/// A synthesized tuple constructor (composite keys, multi-field group-by).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TupleNode {
    pub elements: Vec<Node>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyBinding {
    pub property: String,
    pub expression: Node,
}

impl KeyBinding {
    pub fn new(property: impl Into<String>, expression: Node) -> Self {
        Self {
            property: property.into(),
            expression,
        }
    }
}

/// An entity-valued operand, represented by the expressions of its primary key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectReferenceNode {
    pub entity: String,
    pub keys: Vec<KeyBinding>,
}

// ---------------------------------------------------------------------------
// Statement and DDL payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsertIntoNode {
    pub table: String,
    pub columns: Vec<String>,
    pub values: Vec<Node>,
    /// Columns whose database-assigned values are read back.
    #[serde(default)]
    pub returning: Vec<String>,
    /// Explicit value written into an identity column.
    #[serde(default)]
    pub requires_identity_insert: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    pub column: String,
    pub value: Node,
}

impl Assignment {
    pub fn new(column: impl Into<String>, value: Node) -> Self {
        Self {
            column: column.into(),
            value,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateNode {
    pub table: String,
    pub assignments: Vec<Assignment>,
    #[serde(default, rename = "where")]
    pub where_: Option<Node>,
    #[serde(default)]
    pub requires_identity_insert: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteNode {
    pub table: String,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default, rename = "where")]
    pub where_: Option<Node>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTableNode {
    pub table: String,
    #[serde(default)]
    pub if_not_exists: bool,
    /// `ColumnDefinition` nodes.
    pub columns: Vec<Node>,
    /// Table-level `Constraint` nodes.
    #[serde(default)]
    pub constraints: Vec<Node>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlterTableNode {
    pub table: String,
    /// `ConstraintAction` nodes.
    pub actions: Vec<Node>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnDefinitionNode {
    pub name: String,
    pub data_type: DataType,
    /// Column-level `Constraint` nodes.
    #[serde(default)]
    pub constraints: Vec<Node>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReferentialAction {
    NoAction,
    Cascade,
    SetNull,
    Restrict,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ConstraintKind {
    PrimaryKey {
        columns: Vec<String>,
        /// `None` leaves the choice to the database.
        #[serde(default)]
        clustered: Option<bool>,
    },
    Unique {
        columns: Vec<String>,
    },
    ForeignKey {
        columns: Vec<String>,
        referenced_table: String,
        referenced_columns: Vec<String>,
        on_delete: ReferentialAction,
        on_update: ReferentialAction,
    },
    NotNull,
    AutoIncrement,
    Default(Node),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstraintNode {
    #[serde(default)]
    pub name: Option<String>,
    pub kind: ConstraintKind,
}

impl ConstraintNode {
    pub fn unnamed(kind: ConstraintKind) -> Node {
        Node::Constraint(Arc::new(ConstraintNode { name: None, kind }))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConstraintActionType {
    Add,
    Drop,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstraintActionNode {
    pub action: ConstraintActionType,
    pub constraint: Node,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexedColumn {
    pub name: String,
    #[serde(default)]
    pub descending: bool,
}

impl IndexedColumn {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            descending: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateIndexNode {
    pub name: String,
    pub table: String,
    pub columns: Vec<IndexedColumn>,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub clustered: bool,
    #[serde(default)]
    pub if_not_exists: bool,
    /// Filter predicate over bare column names (alias-less `Column` nodes).
    #[serde(default, rename = "where")]
    pub where_: Option<Node>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnumDefinitionNode {
    pub name: String,
    pub labels: Vec<String>,
}

/// A session `SET` command, e.g. `SET IDENTITY_INSERT t ON`.
///
/// Arguments are rendered inline, never as parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetCommandNode {
    pub name: String,
    pub arguments: Vec<Node>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatementListNode {
    pub statements: Vec<Node>,
}
