//! INSERT / UPDATE / DELETE commands for mapped entities.
//!
//! Commands are built as IR, amended for the dialect and formatted once per
//! entity, operation and set of touched properties. Property values always
//! travel as named parameters, so the cached text is reused for every
//! entity instance with the same change shape.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::cache::{CacheStats, ShapeCache};
use crate::dialect::{self, SqlDialect};
use crate::error::{CompileError, QueryResult};
use crate::ir::{
    Assignment, DeleteNode, EntityType, InsertIntoNode, Node, PropertyDef, UpdateNode, Value,
};
use crate::sql::{self, FormatResult, SqlCommand};

use super::context::ExecutionContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PersistenceOperation {
    Insert,
    Update,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CommandKey {
    entity: String,
    operation: PersistenceOperation,
    properties: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsertOutcome {
    pub rows_affected: u64,
    /// Key assigned by the database to an identity column.
    pub generated_key: Option<Value>,
}

pub struct PersistenceCommands {
    dialect: Arc<dyn SqlDialect>,
    context: Arc<dyn ExecutionContext>,
    commands: ShapeCache<CommandKey, FormatResult>,
    log_sql: bool,
}

fn key_parameter(property: &PropertyDef) -> String {
    format!("original.{}", property.name)
}

fn property<'e>(entity: &'e EntityType, name: &str) -> Result<&'e PropertyDef, CompileError> {
    entity
        .property(name)
        .ok_or_else(|| CompileError::InvalidNode(format!("{} has no property {}", entity.name, name)))
}

fn key_filter(entity: &EntityType) -> Result<Node, CompileError> {
    Node::and_all(entity.primary_key().map(|p| {
        Node::equal(
            Node::column("", p.column.clone(), p.data_type.clone()),
            Node::parameter(key_parameter(p), p.data_type.clone()),
        )
    }))
    .ok_or_else(|| CompileError::InvalidNode(format!("{} has no primary key", entity.name)))
}

impl PersistenceCommands {
    pub fn new(
        dialect: Arc<dyn SqlDialect>,
        context: Arc<dyn ExecutionContext>,
        capacity: usize,
    ) -> Self {
        Self {
            dialect,
            context,
            commands: ShapeCache::new("commands", capacity),
            log_sql: false,
        }
    }

    pub fn with_log_sql(mut self, log_sql: bool) -> Self {
        self.log_sql = log_sql;
        self
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.commands.stats()
    }

    fn cached(
        &self,
        key: CommandKey,
        build: impl FnOnce() -> Result<Node, CompileError>,
    ) -> Result<Arc<FormatResult>, CompileError> {
        self.commands.get_or_compile(&key, |key| {
            let node = dialect::amend(self.dialect.as_ref(), &build()?);
            let command = sql::format(self.dialect.as_ref(), &node)?;
            debug!(
                entity = %key.entity,
                operation = ?key.operation,
                sql = %command.command_text,
                "compiled persistence command"
            );
            Ok(command)
        })
    }

    fn bind(&self, command: &FormatResult, named: &HashMap<String, Value>) -> Result<SqlCommand, CompileError> {
        let command = command.bind(&[], named)?;
        if self.log_sql {
            debug!(sql = %command.text, parameters = command.parameters.len(), "persistence command");
        }
        Ok(command)
    }

    /// The INSERT for `values`, keyed by property name.
    ///
    /// When the entity has an identity column and `values` doesn't set it,
    /// the generated key is returned by the command. Setting it explicitly
    /// marks the insert as needing identity insertion.
    pub fn insert_command(
        &self,
        entity: &EntityType,
        values: &[(String, Value)],
    ) -> QueryResult<(SqlCommand, bool)> {
        let mut named = HashMap::with_capacity(values.len());
        let mut properties = Vec::with_capacity(values.len());
        for (name, value) in values {
            let p = property(entity, name)?;
            named.insert(p.name.clone(), value.clone());
            properties.push(p);
        }
        let identity = entity.identity_property();
        let explicit_identity = identity.is_some_and(|id| properties.iter().any(|p| p.name == id.name));
        let returning: Vec<String> = match identity {
            Some(id) if !explicit_identity => vec![id.column.clone()],
            _ => Vec::new(),
        };

        let key = CommandKey {
            entity: entity.name.clone(),
            operation: PersistenceOperation::Insert,
            properties: properties.iter().map(|p| p.name.clone()).collect(),
        };
        let command = self.cached(key, || {
            Ok(Node::InsertInto(Arc::new(InsertIntoNode {
                table: entity.table.clone(),
                columns: properties.iter().map(|p| p.column.clone()).collect(),
                values: properties
                    .iter()
                    .map(|p| Node::parameter(p.name.clone(), p.data_type.clone()))
                    .collect(),
                returning: returning.clone(),
                requires_identity_insert: explicit_identity,
            })))
        })?;
        Ok((self.bind(&command, &named)?, !returning.is_empty()))
    }

    pub fn insert(&self, entity: &EntityType, values: &[(String, Value)]) -> QueryResult<InsertOutcome> {
        let (command, returns_key) = self.insert_command(entity, values)?;
        if returns_key {
            let generated_key = self.context.execute_scalar(&command)?;
            return Ok(InsertOutcome {
                rows_affected: 1,
                generated_key: Some(generated_key),
            });
        }
        Ok(InsertOutcome {
            rows_affected: self.context.execute_non_query(&command)?,
            generated_key: None,
        })
    }

    /// The UPDATE of `changed` properties for the row with primary key `key`.
    /// `None` when nothing changed.
    pub fn update_command(
        &self,
        entity: &EntityType,
        key: &[(String, Value)],
        changed: &[(String, Value)],
    ) -> QueryResult<Option<SqlCommand>> {
        if changed.is_empty() {
            return Ok(None);
        }
        let mut named = self.key_values(entity, key)?;
        let mut properties = Vec::with_capacity(changed.len());
        for (name, value) in changed {
            let p = property(entity, name)?;
            named.insert(p.name.clone(), value.clone());
            properties.push(p);
        }

        let cache_key = CommandKey {
            entity: entity.name.clone(),
            operation: PersistenceOperation::Update,
            properties: properties.iter().map(|p| p.name.clone()).collect(),
        };
        let command = self.cached(cache_key, || {
            Ok(Node::Update(Arc::new(UpdateNode {
                table: entity.table.clone(),
                assignments: properties
                    .iter()
                    .map(|p| Assignment::new(p.column.clone(), Node::parameter(p.name.clone(), p.data_type.clone())))
                    .collect(),
                where_: Some(key_filter(entity)?),
                requires_identity_insert: false,
            })))
        })?;
        Ok(Some(self.bind(&command, &named)?))
    }

    pub fn update(
        &self,
        entity: &EntityType,
        key: &[(String, Value)],
        changed: &[(String, Value)],
    ) -> QueryResult<u64> {
        match self.update_command(entity, key, changed)? {
            Some(command) => Ok(self.context.execute_non_query(&command)?),
            None => Ok(0),
        }
    }

    pub fn delete_command(&self, entity: &EntityType, key: &[(String, Value)]) -> QueryResult<SqlCommand> {
        let named = self.key_values(entity, key)?;
        let cache_key = CommandKey {
            entity: entity.name.clone(),
            operation: PersistenceOperation::Delete,
            properties: Vec::new(),
        };
        let command = self.cached(cache_key, || {
            Ok(Node::Delete(Arc::new(DeleteNode {
                table: entity.table.clone(),
                alias: None,
                where_: Some(key_filter(entity)?),
            })))
        })?;
        Ok(self.bind(&command, &named)?)
    }

    pub fn delete(&self, entity: &EntityType, key: &[(String, Value)]) -> QueryResult<u64> {
        let command = self.delete_command(entity, key)?;
        Ok(self.context.execute_non_query(&command)?)
    }

    fn key_values(
        &self,
        entity: &EntityType,
        key: &[(String, Value)],
    ) -> Result<HashMap<String, Value>, CompileError> {
        let mut named = HashMap::with_capacity(key.len());
        for (name, value) in key {
            let p = property(entity, name)?;
            if !p.primary_key {
                return Err(CompileError::InvalidNode(format!(
                    "{}.{} is not part of the primary key",
                    entity.name, name
                )));
            }
            named.insert(key_parameter(p), value.clone());
        }
        Ok(named)
    }
}
