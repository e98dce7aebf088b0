//! IR → SQL text.
//!
//! A recursive descent over the tree that writes the command text for one
//! dialect and records a parameter slot for every literal, placeholder and
//! named parameter it meets, in the order their markers appear. Literals are
//! only written inline where a parameter isn't allowed: `SET` arguments,
//! column defaults and index filters. `NULL` is always written inline.

use crate::dialect::{FunctionInfo, LimitStyle, ReturningStyle, SqlDialect};
use crate::error::CompileError;
use crate::ir::*;

use super::command::{CommandParameter, FormatResult, ParameterSource};

/// Format a tree for `dialect`.
pub fn format(dialect: &dyn SqlDialect, node: &Node) -> Result<FormatResult, CompileError> {
    SqlFormatter::new(dialect).format(node)
}

pub struct SqlFormatter<'a> {
    dialect: &'a dyn SqlDialect,
    parameters: Vec<CommandParameter>,
    inline: bool,
    /// Aliases of the selects being formatted, innermost last.
    scopes: Vec<String>,
}

impl<'a> SqlFormatter<'a> {
    pub fn new(dialect: &'a dyn SqlDialect) -> Self {
        Self {
            dialect,
            parameters: Vec::new(),
            inline: false,
            scopes: Vec::new(),
        }
    }

    pub fn format(mut self, node: &Node) -> Result<FormatResult, CompileError> {
        let command_text = self.statement(node)?;
        Ok(FormatResult {
            command_text,
            parameters: self.parameters,
        })
    }

    fn quote(&self, ident: &str) -> String {
        self.dialect.quote_ident(ident)
    }

    fn quote_list<'s>(&self, idents: impl IntoIterator<Item = &'s String>) -> String {
        idents
            .into_iter()
            .map(|i| self.quote(i))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn parameter(&mut self, source: ParameterSource, data_type: DataType) -> String {
        let marker = self.dialect.parameter_marker(self.parameters.len());
        self.parameters.push(CommandParameter { source, data_type });
        marker
    }

    fn inline<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        let saved = self.inline;
        self.inline = true;
        let out = f(self);
        self.inline = saved;
        out
    }

    // ----- statements ------------------------------------------------------

    fn statement(&mut self, node: &Node) -> Result<String, CompileError> {
        match node {
            Node::Select(s) => self.select(s),
            Node::InsertInto(i) => self.insert(i),
            Node::Update(u) => self.update(u),
            Node::Delete(d) => self.delete(d),
            Node::CreateTable(t) => self.create_table(t),
            Node::AlterTable(a) => self.alter_table(a),
            Node::CreateIndex(i) => self.create_index(i),
            Node::EnumDefinition(e) => self.enum_definition(e),
            Node::SetCommand(s) => self.set_command(s),
            Node::StatementList(l) => {
                let mut statements = Vec::with_capacity(l.statements.len());
                for statement in &l.statements {
                    let text = self.statement(statement)?;
                    if !text.is_empty() {
                        statements.push(text);
                    }
                }
                Ok(statements.join("; "))
            }
            other => self.expr(other),
        }
    }

    fn select(&mut self, select: &SelectNode) -> Result<String, CompileError> {
        self.scopes.push(select.alias.clone());
        let out = self.select_body(select);
        self.scopes.pop();
        out
    }

    fn select_body(&mut self, select: &SelectNode) -> Result<String, CompileError> {
        let mut parts = Vec::new();
        let style = self.dialect.limit_style();

        // SELECT [DISTINCT] [TOP]
        let mut select_clause = String::from("SELECT ");
        if select.distinct {
            select_clause.push_str("DISTINCT ");
        }
        if let (Some(take), None, false) = (&select.take, &select.skip, style == LimitStyle::LimitOffset) {
            select_clause.push_str(&format!("TOP ({}) ", self.expr(take)?));
        }

        if select.columns.is_empty() {
            select_clause.push('*');
        } else {
            let mut items = Vec::with_capacity(select.columns.len());
            for column in &select.columns {
                items.push(self.column_declaration(column)?);
            }
            select_clause.push_str(&items.join(", "));
        }
        parts.push(select_clause);

        // FROM
        if let Some(from) = &select.from {
            parts.push(format!("FROM {}", self.source(from)?));
        }

        // WHERE
        if let Some(filter) = &select.where_ {
            parts.push(format!("WHERE {}", self.expr(filter)?));
        }

        // GROUP BY
        if !select.group_by.is_empty() {
            let groups = self.expr_list(&select.group_by)?;
            parts.push(format!("GROUP BY {}", groups));
        }

        // ORDER BY
        if !select.order_by.is_empty() {
            parts.push(format!("ORDER BY {}", self.order_by(&select.order_by)?));
        } else if select.skip.is_some() && style != LimitStyle::LimitOffset {
            // OFFSET needs an ORDER BY here
            parts.push("ORDER BY (SELECT NULL)".to_string());
        }

        // LIMIT / OFFSET
        match style {
            LimitStyle::LimitOffset => {
                if let Some(take) = &select.take {
                    parts.push(format!("LIMIT {}", self.expr(take)?));
                } else if let (Some(_), Some(unbounded)) = (&select.skip, self.dialect.unbounded_limit()) {
                    parts.push(format!("LIMIT {}", unbounded));
                }
                if let Some(skip) = &select.skip {
                    parts.push(format!("OFFSET {}", self.expr(skip)?));
                }
            }
            LimitStyle::OffsetFetch | LimitStyle::RowNumber => {
                if let Some(skip) = &select.skip {
                    parts.push(format!("OFFSET {} ROWS", self.expr(skip)?));
                    if let Some(take) = &select.take {
                        parts.push(format!("FETCH NEXT {} ROWS ONLY", self.expr(take)?));
                    }
                }
            }
        }

        if select.for_update {
            if let Some(clause) = self.dialect.for_update_clause() {
                parts.push(clause.to_string());
            }
        }

        Ok(parts.join(" "))
    }

    fn column_declaration(&mut self, column: &ColumnDeclaration) -> Result<String, CompileError> {
        if column.is_wildcard() {
            return Ok("*".to_string());
        }
        let expr = self.expr(&column.expression)?;
        match &column.expression {
            _ if column.name.is_empty() => Ok(expr),
            Node::Column(c) if c.name == column.name => Ok(expr),
            _ => Ok(format!("{} AS {}", expr, self.quote(&column.name))),
        }
    }

    fn source(&mut self, node: &Node) -> Result<String, CompileError> {
        match node {
            Node::Table(t) => Ok(format!("{} AS {}", self.quote(&t.name), self.quote(&t.alias))),
            Node::Select(s) => Ok(format!("({}) AS {}", self.select(s)?, self.quote(&s.alias))),
            Node::Join(j) => self.join(j),
            other => Err(CompileError::UnsupportedNode { kind: other.kind() }),
        }
    }

    fn join(&mut self, join: &JoinNode) -> Result<String, CompileError> {
        let keyword = self
            .dialect
            .join_keyword(join.kind)
            .ok_or(CompileError::UnsupportedNode { kind: NodeKind::Join })?;
        let left = self.source(&join.left)?;
        let right = match &join.right {
            Node::Join(_) => format!("({})", self.source(&join.right)?),
            other => self.source(other)?,
        };
        let mut s = format!("{} {} {}", left, keyword, right);
        match &join.condition {
            Some(condition) => s.push_str(&format!(" ON {}", self.expr(condition)?)),
            // LEFT JOIN LATERAL still needs a condition
            None if join.kind == JoinKind::OuterApply && keyword.starts_with("LEFT") => {
                s.push_str(" ON TRUE")
            }
            None => {}
        }
        Ok(s)
    }

    fn insert(&mut self, insert: &InsertIntoNode) -> Result<String, CompileError> {
        if insert.columns.len() != insert.values.len() {
            return Err(CompileError::InvalidNode(format!(
                "insert into {} has {} columns and {} values",
                insert.table,
                insert.columns.len(),
                insert.values.len()
            )));
        }
        let mut parts = vec![format!("INSERT INTO {}", self.quote(&insert.table))];
        if !insert.columns.is_empty() {
            parts.push(format!("({})", self.quote_list(&insert.columns)));
        }
        let style = self.dialect.returning_style();
        if !insert.returning.is_empty() && style == ReturningStyle::Output {
            let outputs: Vec<String> = insert
                .returning
                .iter()
                .map(|c| format!("INSERTED.{}", self.quote(c)))
                .collect();
            parts.push(format!("OUTPUT {}", outputs.join(", ")));
        }
        if insert.values.is_empty() {
            parts.push("DEFAULT VALUES".to_string());
        } else {
            parts.push(format!("VALUES ({})", self.expr_list(&insert.values)?));
        }
        if !insert.returning.is_empty() && style == ReturningStyle::Returning {
            parts.push(format!("RETURNING {}", self.quote_list(&insert.returning)));
        }
        Ok(parts.join(" "))
    }

    fn update(&mut self, update: &UpdateNode) -> Result<String, CompileError> {
        if update.assignments.is_empty() {
            return Err(CompileError::InvalidNode(format!(
                "update of {} assigns nothing",
                update.table
            )));
        }
        let mut assignments = Vec::with_capacity(update.assignments.len());
        for assignment in &update.assignments {
            let value = self.expr(&assignment.value)?;
            assignments.push(format!("{} = {}", self.quote(&assignment.column), value));
        }
        let mut parts = vec![
            format!("UPDATE {}", self.quote(&update.table)),
            format!("SET {}", assignments.join(", ")),
        ];
        if let Some(filter) = &update.where_ {
            parts.push(format!("WHERE {}", self.expr(filter)?));
        }
        Ok(parts.join(" "))
    }

    fn delete(&mut self, delete: &DeleteNode) -> Result<String, CompileError> {
        let mut parts = vec![self.dialect.delete_prefix(&delete.table, delete.alias.as_deref())];
        if let Some(filter) = &delete.where_ {
            parts.push(format!("WHERE {}", self.expr(filter)?));
        }
        Ok(parts.join(" "))
    }

    // ----- DDL -------------------------------------------------------------

    fn create_table(&mut self, table: &CreateTableNode) -> Result<String, CompileError> {
        let mut parts = Vec::new();
        let guard = table
            .if_not_exists
            .then(|| self.dialect.create_table_guard(&table.table))
            .flatten();
        match guard {
            Some(guard) => {
                parts.push(guard);
                parts.push("CREATE TABLE".to_string());
            }
            None if table.if_not_exists => parts.push("CREATE TABLE IF NOT EXISTS".to_string()),
            None => parts.push("CREATE TABLE".to_string()),
        }
        parts.push(self.quote(&table.table));

        let mut definitions = Vec::new();
        for column in &table.columns {
            let Node::ColumnDefinition(c) = column else {
                return Err(CompileError::UnsupportedNode { kind: column.kind() });
            };
            definitions.push(self.column_definition(c)?);
        }
        for constraint in &table.constraints {
            definitions.push(self.constraint_node(constraint)?);
        }
        parts.push(format!("({})", definitions.join(", ")));
        Ok(parts.join(" "))
    }

    fn column_definition(&mut self, column: &ColumnDefinitionNode) -> Result<String, CompileError> {
        let mut parts = vec![self.quote(&column.name), self.dialect.type_name(&column.data_type)?];
        for constraint in &column.constraints {
            parts.push(self.constraint_node(constraint)?);
        }
        Ok(parts.join(" "))
    }

    fn constraint_node(&mut self, node: &Node) -> Result<String, CompileError> {
        match node {
            Node::Constraint(c) => self.constraint(c),
            other => Err(CompileError::UnsupportedNode { kind: other.kind() }),
        }
    }

    fn constraint(&mut self, constraint: &ConstraintNode) -> Result<String, CompileError> {
        let body = match &constraint.kind {
            ConstraintKind::PrimaryKey { columns, clustered } => {
                let mut s = String::from("PRIMARY KEY");
                if let (Some(clustered), true) = (clustered, self.dialect.supports_clustered_indexes()) {
                    s.push_str(if *clustered { " CLUSTERED" } else { " NONCLUSTERED" });
                }
                if !columns.is_empty() {
                    s.push_str(&format!(" ({})", self.quote_list(columns)));
                }
                s
            }
            ConstraintKind::Unique { columns } if columns.is_empty() => "UNIQUE".to_string(),
            ConstraintKind::Unique { columns } => format!("UNIQUE ({})", self.quote_list(columns)),
            ConstraintKind::ForeignKey {
                columns,
                referenced_table,
                referenced_columns,
                on_delete,
                on_update,
            } => {
                let mut s = String::new();
                if !columns.is_empty() {
                    s.push_str(&format!("FOREIGN KEY ({}) ", self.quote_list(columns)));
                }
                s.push_str(&format!(
                    "REFERENCES {} ({})",
                    self.quote(referenced_table),
                    self.quote_list(referenced_columns)
                ));
                if let Some(action) = referential_action(*on_delete) {
                    s.push_str(&format!(" ON DELETE {}", action));
                }
                if let Some(action) = referential_action(*on_update) {
                    s.push_str(&format!(" ON UPDATE {}", action));
                }
                s
            }
            ConstraintKind::NotNull => "NOT NULL".to_string(),
            ConstraintKind::AutoIncrement => self.dialect.auto_increment().to_string(),
            ConstraintKind::Default(value) => {
                format!("DEFAULT {}", self.inline(|f| f.expr(value))?)
            }
        };
        Ok(match &constraint.name {
            Some(name) => format!("CONSTRAINT {} {}", self.quote(name), body),
            None => body,
        })
    }

    fn alter_table(&mut self, alter: &AlterTableNode) -> Result<String, CompileError> {
        let table = self.quote(&alter.table);
        let mut statements = Vec::with_capacity(alter.actions.len());
        for action in &alter.actions {
            let Node::ConstraintAction(a) = action else {
                return Err(CompileError::UnsupportedNode { kind: action.kind() });
            };
            let clause = match a.action {
                ConstraintActionType::Add => format!("ADD {}", self.constraint_node(&a.constraint)?),
                ConstraintActionType::Drop => {
                    let name = match &a.constraint {
                        Node::Constraint(c) => c.name.clone(),
                        _ => None,
                    }
                    .ok_or_else(|| {
                        CompileError::InvalidNode("only named constraints can be dropped".into())
                    })?;
                    format!("DROP CONSTRAINT {}", self.quote(&name))
                }
            };
            statements.push(format!("ALTER TABLE {} {}", table, clause));
        }
        Ok(statements.join("; "))
    }

    fn create_index(&mut self, index: &CreateIndexNode) -> Result<String, CompileError> {
        let mut parts = Vec::new();
        let guard = index
            .if_not_exists
            .then(|| self.dialect.create_index_guard(&index.table, &index.name))
            .flatten();
        let native_if_not_exists = index.if_not_exists && guard.is_none();
        if let Some(guard) = guard {
            parts.push(guard);
        }
        let mut create = String::from("CREATE ");
        if index.unique {
            create.push_str("UNIQUE ");
        }
        if index.clustered && self.dialect.supports_clustered_indexes() {
            create.push_str("CLUSTERED ");
        }
        create.push_str("INDEX");
        if native_if_not_exists {
            create.push_str(" IF NOT EXISTS");
        }
        parts.push(create);
        parts.push(self.quote(&index.name));

        let columns: Vec<String> = index
            .columns
            .iter()
            .map(|c| {
                let name = self.quote(&c.name);
                if c.descending {
                    format!("{} DESC", name)
                } else {
                    name
                }
            })
            .collect();
        parts.push(format!("ON {} ({})", self.quote(&index.table), columns.join(", ")));
        if let Some(filter) = &index.where_ {
            parts.push(format!("WHERE {}", self.inline(|f| f.expr(filter))?));
        }
        Ok(parts.join(" "))
    }

    fn enum_definition(&mut self, definition: &EnumDefinitionNode) -> Result<String, CompileError> {
        if !self.dialect.supports_native_enums() {
            return Err(CompileError::UnsupportedNode {
                kind: NodeKind::EnumDefinition,
            });
        }
        let labels: Vec<String> = definition
            .labels
            .iter()
            .map(|l| self.dialect.quote_string(l))
            .collect();
        Ok(format!(
            "CREATE TYPE {} AS ENUM ({})",
            self.quote(&definition.name),
            labels.join(", ")
        ))
    }

    /// `SET NAME arg ...`: text arguments are object names, booleans are
    /// `ON`/`OFF`.
    fn set_command(&mut self, set: &SetCommandNode) -> Result<String, CompileError> {
        let mut parts = vec![format!("SET {}", set.name)];
        for argument in &set.arguments {
            let text = match argument.as_constant() {
                Some(Value::Text(name)) => self.quote(name),
                Some(Value::Bool(on)) => if *on { "ON" } else { "OFF" }.to_string(),
                _ => self.inline(|f| f.expr(argument))?,
            };
            parts.push(text);
        }
        Ok(parts.join(" "))
    }

    // ----- expressions -----------------------------------------------------

    fn expr_list(&mut self, nodes: &[Node]) -> Result<String, CompileError> {
        let mut items = Vec::with_capacity(nodes.len());
        for node in nodes {
            items.push(self.expr(node)?);
        }
        Ok(items.join(", "))
    }

    fn order_by(&mut self, items: &[OrderBy]) -> Result<String, CompileError> {
        let mut orders = Vec::with_capacity(items.len());
        for item in items {
            let expr = self.expr(&item.expression)?;
            orders.push(match item.direction {
                OrderDirection::Ascending => expr,
                OrderDirection::Descending => format!("{} DESC", expr),
            });
        }
        Ok(orders.join(", "))
    }

    /// An operand of an operator, parenthesized when it is itself an
    /// operator expression.
    fn operand(&mut self, node: &Node) -> Result<String, CompileError> {
        let expr = self.expr(node)?;
        Ok(match node {
            Node::Binary(_) | Node::Unary(_) => format!("({})", expr),
            Node::FunctionCall(call)
                if self.dialect.function(&call.function).is_some_and(|i| i.is_operator)
                    || call.function == SqlFunction::In =>
            {
                format!("({})", expr)
            }
            _ => expr,
        })
    }

    fn expr(&mut self, node: &Node) -> Result<String, CompileError> {
        match node {
            Node::Column(c) => Ok(self.column(c)),
            Node::Constant(c) => {
                if self.inline || c.value.is_null() {
                    self.dialect.literal(&c.value)
                } else {
                    Ok(self.parameter(ParameterSource::Literal(c.value.clone()), c.data_type.clone()))
                }
            }
            Node::ConstantPlaceholder(p) => {
                Ok(self.parameter(ParameterSource::Placeholder(p.index), p.data_type.clone()))
            }
            Node::Parameter(p) => {
                Ok(self.parameter(ParameterSource::Named(p.name.clone()), p.data_type.clone()))
            }
            Node::Binary(b) => self.binary(b),
            Node::Unary(u) => {
                let operand = self.operand(&u.operand)?;
                Ok(match u.op {
                    UnaryOp::Not => format!("NOT {}", operand),
                    UnaryOp::Negate => format!("-{}", operand),
                    UnaryOp::IsNull => format!("{} IS NULL", operand),
                    UnaryOp::IsNotNull => format!("{} IS NOT NULL", operand),
                })
            }
            Node::FunctionCall(call) => self.function(call),
            Node::Aggregate(a) => {
                let name = self.dialect.aggregate_name(a.kind);
                let argument = match &a.argument {
                    Some(argument) => self.expr(argument)?,
                    None => "*".to_string(),
                };
                let distinct = if a.distinct { "DISTINCT " } else { "" };
                Ok(format!("{}({}{})", name, distinct, argument))
            }
            Node::AggregateSubquery(a) => {
                if self.scopes.last() == Some(&a.group_by_alias) {
                    self.expr(&a.aggregate_in_group_select)
                } else {
                    self.expr(&a.aggregate_as_subquery)
                }
            }
            Node::Subquery(s) => {
                let Node::Select(select) = &s.select else {
                    return Err(CompileError::UnsupportedNode { kind: s.select.kind() });
                };
                match s.kind {
                    SubqueryKind::Scalar => Ok(format!("({})", self.select(select)?)),
                    SubqueryKind::Exists => Ok(format!("EXISTS ({})", self.select(select)?)),
                    SubqueryKind::In => {
                        let operand = s.operand.as_ref().ok_or_else(|| {
                            CompileError::InvalidNode("IN subquery without operand".into())
                        })?;
                        let operand = self.operand(operand)?;
                        Ok(format!("{} IN ({})", operand, self.select(select)?))
                    }
                }
            }
            Node::Select(s) => Ok(format!("({})", self.select(s)?)),
            Node::Over(o) => {
                let source = self.expr(&o.source)?;
                if o.order_by.is_empty() {
                    Ok(format!("{} OVER ()", source))
                } else {
                    Ok(format!("{} OVER (ORDER BY {})", source, self.order_by(&o.order_by)?))
                }
            }
            Node::Conditional(c) => {
                let mut s = String::from("CASE");
                for branch in &c.branches {
                    let condition = self.expr(&branch.condition)?;
                    let result = self.expr(&branch.result)?;
                    s.push_str(&format!(" WHEN {} THEN {}", condition, result));
                }
                if let Some(default) = &c.default {
                    s.push_str(&format!(" ELSE {}", self.expr(default)?));
                }
                s.push_str(" END");
                Ok(s)
            }
            other => Err(CompileError::UnsupportedNode { kind: other.kind() }),
        }
    }

    fn column(&self, column: &ColumnNode) -> String {
        let name = if column.name == ColumnDeclaration::WILDCARD {
            column.name.clone()
        } else {
            self.quote(&column.name)
        };
        if column.select_alias.is_empty() {
            name
        } else {
            format!("{}.{}", self.quote(&column.select_alias), name)
        }
    }

    fn binary(&mut self, binary: &BinaryNode) -> Result<String, CompileError> {
        // x = NULL is never true; write the test the caller meant
        if matches!(binary.op, BinaryOp::Eq | BinaryOp::NotEq) {
            let null_side = match (binary.left.as_constant(), binary.right.as_constant()) {
                (_, Some(Value::Null)) => Some(&binary.left),
                (Some(Value::Null), _) => Some(&binary.right),
                _ => None,
            };
            if let Some(operand) = null_side {
                let operand = self.operand(operand)?;
                let test = if binary.op == BinaryOp::Eq { "IS NULL" } else { "IS NOT NULL" };
                return Ok(format!("{} {}", operand, test));
            }
        }
        let left = self.operand(&binary.left)?;
        let right = self.operand(&binary.right)?;
        Ok(format!("{} {} {}", left, binary_operator(binary.op), right))
    }

    fn function(&mut self, call: &FunctionCallNode) -> Result<String, CompileError> {
        match &call.function {
            SqlFunction::In => {
                let [operand, items @ ..] = call.arguments.as_slice() else {
                    return Err(CompileError::InvalidNode("IN without operand".into()));
                };
                if items.is_empty() {
                    return Err(CompileError::InvalidNode("IN without items".into()));
                }
                let operand = self.operand(operand)?;
                Ok(format!("{} IN ({})", operand, self.expr_list(items)?))
            }
            SqlFunction::Cast => {
                let [argument] = call.arguments.as_slice() else {
                    return Err(CompileError::InvalidNode("CAST takes one argument".into()));
                };
                let argument = self.expr(argument)?;
                let target = self.dialect.type_name(&call.data_type)?;
                Ok(format!("CAST({} AS {})", argument, target))
            }
            function => {
                let info = self.dialect.function(function).ok_or_else(|| {
                    CompileError::UnsupportedFunction {
                        function: function.clone(),
                        dialect: self.dialect.name(),
                    }
                })?;
                self.function_call(&info, &call.arguments)
            }
        }
    }

    fn function_call(&mut self, info: &FunctionInfo, arguments: &[Node]) -> Result<String, CompileError> {
        if !info.is_operator {
            let args = self.expr_list(arguments)?;
            return Ok(format!("{}({}{}{})", info.name, info.arg_prefix, args, info.arg_suffix));
        }
        let [first, rest @ ..] = arguments else {
            return Err(CompileError::InvalidNode(format!(
                "operator {} without operands",
                info.name
            )));
        };
        let mut s = self.operand(first)?;
        for argument in rest {
            let operand = self.operand(argument)?;
            s.push_str(&format!(" {} {}{}{}", info.name, info.arg_prefix, operand, info.arg_suffix));
        }
        Ok(s)
    }
}

fn binary_operator(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Eq => "=",
        BinaryOp::NotEq => "<>",
        BinaryOp::Lt => "<",
        BinaryOp::LtEq => "<=",
        BinaryOp::Gt => ">",
        BinaryOp::GtEq => ">=",
        BinaryOp::And => "AND",
        BinaryOp::Or => "OR",
        BinaryOp::Add => "+",
        BinaryOp::Subtract => "-",
        BinaryOp::Multiply => "*",
        BinaryOp::Divide => "/",
        BinaryOp::Modulo => "%",
    }
}

fn referential_action(action: ReferentialAction) -> Option<&'static str> {
    match action {
        ReferentialAction::NoAction => None,
        ReferentialAction::Cascade => Some("CASCADE"),
        ReferentialAction::SetNull => Some("SET NULL"),
        ReferentialAction::Restrict => Some("RESTRICT"),
    }
}
