//! Statement execution over the in-memory catalog
//!
//! A query runs as a pipeline of rows: every MATCH pattern extends the rows
//! with new bindings, WHERE drops rows whose predicate is not true, the
//! update clause mutates the catalog once per row and RETURN projects the
//! surviving rows.

use super::ast::*;
use super::catalog::{cast, Catalog, NodeTable, RelRow, RelTable, Table};
use super::{EngineError, EngineResult, NativeResult};
use crate::value::{LogicalType, NativeValue, NodeVal, RelVal};
use indexmap::IndexMap;
use std::cmp::Ordering;

/// Named statement parameters
pub type Params = IndexMap<String, NativeValue>;

#[derive(Debug, Clone, PartialEq)]
enum Binding {
    Node { table: String, key: String },
    Rel { table: String, offset: u64 },
    Value(NativeValue),
}

type Row = IndexMap<String, Binding>;

/// Rendered primary key value used to address node rows
pub(crate) fn key_of(value: &NativeValue) -> String {
    value.to_string()
}

fn anonymous(scope: char, pattern: usize, position: usize) -> String {
    format!("#{}{}_{}", scope, pattern, position)
}

fn message(text: String) -> NativeResult {
    NativeResult {
        columns: vec!["result".to_string()],
        column_types: vec![LogicalType::String],
        rows: vec![vec![NativeValue::String(text)]],
    }
}

/// Executor for statements that leave the catalog untouched
pub struct QueryExecutor<'a> {
    catalog: &'a Catalog,
    params: &'a Params,
}

impl<'a> QueryExecutor<'a> {
    pub fn new(catalog: &'a Catalog, params: &'a Params) -> Self {
        Self { catalog, params }
    }

    pub fn execute(&self, command: &Command) -> EngineResult<NativeResult> {
        match command {
            Command::Call { procedure, returns } => self.call(procedure, returns.as_ref()),
            Command::Query(query) if query.update.is_none() => {
                let rows = self.match_rows(&query.patterns, query.filter.as_ref())?;
                self.project(rows, query.returns.as_ref())
            }
            _ => Err(EngineError::Binder(
                "Cannot execute a write statement with a read-only executor".to_string(),
            )),
        }
    }

    fn call(&self, procedure: &Procedure, returns: Option<&ReturnClause>) -> EngineResult<NativeResult> {
        let (columns, rows): (Vec<&str>, Vec<Vec<NativeValue>>) = match procedure {
            Procedure::ShowTables => (
                vec!["name", "type", "comment"],
                self.catalog
                    .tables()
                    .map(|t| {
                        let kind = match t {
                            Table::Node(_) => "NODE",
                            Table::Rel(_) => "REL",
                        };
                        vec![
                            NativeValue::String(t.name().to_string()),
                            NativeValue::String(kind.to_string()),
                            NativeValue::String(String::new()),
                        ]
                    })
                    .collect(),
            ),
            Procedure::TableInfo(arg) => {
                let name = self.table_argument(arg)?;
                let table = self
                    .catalog
                    .table(&name)
                    .ok_or_else(|| EngineError::Binder(format!("Table {} does not exist", name)))?;
                let primary_key = match table {
                    Table::Node(n) => Some(n.primary_key.as_str()),
                    Table::Rel(_) => None,
                };
                (
                    vec!["property_id", "name", "type", "primary_key"],
                    table
                        .columns()
                        .iter()
                        .enumerate()
                        .map(|(idx, c)| {
                            vec![
                                NativeValue::Int64(idx as i64),
                                NativeValue::String(c.name.clone()),
                                NativeValue::String(c.ty.to_string()),
                                NativeValue::Bool(primary_key == Some(c.name.as_str())),
                            ]
                        })
                        .collect(),
                )
            }
            Procedure::ShowConnection(arg) => {
                let name = self.table_argument(arg)?;
                let rel = self.catalog.rel_table(&name)?;
                (
                    vec!["source_table", "destination_table"],
                    vec![vec![
                        NativeValue::String(rel.from.clone()),
                        NativeValue::String(rel.to.clone()),
                    ]],
                )
            }
        };

        let Some(returns) = returns else {
            return Ok(NativeResult::from_rows(
                columns.into_iter().map(String::from).collect(),
                rows,
            ));
        };
        let rows = rows
            .into_iter()
            .map(|values| {
                columns
                    .iter()
                    .zip(values)
                    .map(|(c, v)| (c.to_string(), Binding::Value(v)))
                    .collect::<Row>()
            })
            .collect();
        self.project(rows, Some(returns))
    }

    fn table_argument(&self, arg: &Expr) -> EngineResult<String> {
        match self.eval(arg, &Row::new())? {
            NativeValue::String(name) => Ok(name),
            other => Err(EngineError::Binder(format!(
                "Expected a table name, got {}",
                other.logical_type()
            ))),
        }
    }

    // ---- Matching ----

    fn match_rows(&self, patterns: &[Pattern], filter: Option<&Expr>) -> EngineResult<Vec<Row>> {
        let mut rows = vec![Row::new()];
        for (idx, pattern) in patterns.iter().enumerate() {
            let mut next = Vec::new();
            for row in &rows {
                next.extend(self.match_pattern(idx, pattern, row)?);
            }
            rows = next;
        }

        match filter {
            None => Ok(rows),
            Some(predicate) => {
                let mut kept = Vec::with_capacity(rows.len());
                for row in rows {
                    if self.eval(predicate, &row)? == NativeValue::Bool(true) {
                        kept.push(row);
                    }
                }
                Ok(kept)
            }
        }
    }

    fn match_pattern(&self, idx: usize, pattern: &Pattern, row: &Row) -> EngineResult<Vec<Row>> {
        let start_var = pattern
            .start
            .variable
            .clone()
            .unwrap_or_else(|| anonymous('m', idx, 0));

        let mut partial: Vec<(Row, (String, String))> = Vec::new();
        for (table, key) in self.node_candidates(&pattern.start, &start_var, row)? {
            let mut extended = row.clone();
            extended.insert(
                start_var.clone(),
                Binding::Node {
                    table: table.clone(),
                    key: key.clone(),
                },
            );
            partial.push((extended, (table, key)));
        }

        for (step, (rel, node)) in pattern.steps.iter().enumerate() {
            let rel_var = rel
                .variable
                .clone()
                .unwrap_or_else(|| anonymous('r', idx, step + 1));
            let node_var = node
                .variable
                .clone()
                .unwrap_or_else(|| anonymous('m', idx, step + 1));

            let mut next = Vec::new();
            for (current, (table, key)) in &partial {
                for (rel_binding, other) in self.expand(table, key, rel, &rel_var, current)? {
                    if !self.node_fits(&other.0, &other.1, node, &node_var, current)? {
                        continue;
                    }
                    let mut extended = current.clone();
                    extended.insert(rel_var.clone(), rel_binding);
                    extended.insert(
                        node_var.clone(),
                        Binding::Node {
                            table: other.0.clone(),
                            key: other.1.clone(),
                        },
                    );
                    next.push((extended, other));
                }
            }
            partial = next;
        }

        Ok(partial.into_iter().map(|(row, _)| row).collect())
    }

    fn node_candidates(&self, pattern: &NodePattern, var: &str, row: &Row) -> EngineResult<Vec<(String, String)>> {
        if let Some(bound) = row.get(var) {
            return match bound {
                Binding::Node { table, key } => {
                    let fits = self.node_matches(table, key, pattern, row)?;
                    Ok(if fits { vec![(table.clone(), key.clone())] } else { vec![] })
                }
                _ => Err(EngineError::Binder(format!("Variable {} is not a node", var))),
            };
        }

        let tables: Vec<&NodeTable> = match &pattern.label {
            Some(label) => vec![self.catalog.node_table(label)?],
            None => self.catalog.node_tables().collect(),
        };

        let mut out = Vec::new();
        for table in tables {
            let pk_filter = pattern.properties.iter().find(|(k, _)| *k == table.primary_key);
            if let Some((_, expr)) = pk_filter {
                let pk_type = &table.columns[table.primary_key_index()].ty;
                let Ok(pk) = cast(self.eval(expr, row)?, pk_type) else {
                    continue;
                };
                let key = key_of(&pk);
                if table.rows.contains_key(&key) && self.node_matches(&table.name, &key, pattern, row)? {
                    out.push((table.name.clone(), key));
                }
                continue;
            }
            for key in table.rows.keys() {
                if self.node_matches(&table.name, key, pattern, row)? {
                    out.push((table.name.clone(), key.clone()));
                }
            }
        }
        Ok(out)
    }

    fn node_fits(&self, table: &str, key: &str, pattern: &NodePattern, var: &str, row: &Row) -> EngineResult<bool> {
        if let Some(bound) = row.get(var) {
            let same = matches!(bound, Binding::Node { table: t, key: k } if t == table && k == key);
            if !same {
                return Ok(false);
            }
        }
        self.node_matches(table, key, pattern, row)
    }

    fn node_matches(&self, table: &str, key: &str, pattern: &NodePattern, row: &Row) -> EngineResult<bool> {
        if pattern.label.as_deref().is_some_and(|label| label != table) {
            return Ok(false);
        }
        let node = self.catalog.node_table(table)?;
        let Some(values) = node.rows.get(key) else {
            return Ok(false);
        };
        for (prop, expr) in &pattern.properties {
            let Some(idx) = node.column_index(prop) else {
                return Ok(false);
            };
            if !self.property_equals(&values[idx], expr, row)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn rel_matches(&self, rel: &RelTable, row_values: &RelRow, pattern: &RelPattern, row: &Row) -> EngineResult<bool> {
        for (prop, expr) in &pattern.properties {
            let Some(idx) = rel.column_index(prop) else {
                return Ok(false);
            };
            if !self.property_equals(&row_values.values[idx], expr, row)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn property_equals(&self, stored: &NativeValue, expr: &Expr, row: &Row) -> EngineResult<bool> {
        let expected = self.eval(expr, row)?;
        if stored.is_null() || expected.is_null() {
            return Ok(false);
        }
        Ok(values_equal(stored, &expected))
    }

    /// Follow one relationship step away from the node `(table, key)`
    fn expand(
        &self,
        table: &str,
        key: &str,
        pattern: &RelPattern,
        var: &str,
        row: &Row,
    ) -> EngineResult<Vec<(Binding, (String, String))>> {
        let rels: Vec<&RelTable> = match &pattern.label {
            Some(label) => vec![self.catalog.rel_table(label)?],
            None => self.catalog.rel_tables().collect(),
        };
        let bound = row.get(var);

        let mut out = Vec::new();
        for rel in rels {
            for (offset, rel_row) in &rel.rows {
                let binding = Binding::Rel {
                    table: rel.name.clone(),
                    offset: *offset,
                };
                if bound.is_some_and(|b| *b != binding) {
                    continue;
                }
                let outgoing = rel.from == table && rel_row.src == key;
                let incoming = rel.to == table && rel_row.dst == key;
                let other = match pattern.direction {
                    Direction::Outgoing if outgoing => (rel.to.clone(), rel_row.dst.clone()),
                    Direction::Incoming if incoming => (rel.from.clone(), rel_row.src.clone()),
                    Direction::Either if outgoing => (rel.to.clone(), rel_row.dst.clone()),
                    Direction::Either if incoming => (rel.from.clone(), rel_row.src.clone()),
                    _ => continue,
                };
                if self.rel_matches(rel, rel_row, pattern, row)? {
                    out.push((binding, other));
                }
            }
        }
        Ok(out)
    }

    // ---- Projection ----

    fn project(&self, rows: Vec<Row>, returns: Option<&ReturnClause>) -> EngineResult<NativeResult> {
        let Some(returns) = returns else {
            return Ok(NativeResult::default());
        };

        let take = returns.limit.unwrap_or(usize::MAX);
        let mut out = Vec::new();
        for row in rows.iter().take(take) {
            let values = returns
                .items
                .iter()
                .map(|item| self.eval(&item.expr, row))
                .collect::<EngineResult<Vec<_>>>()?;
            out.push(values);
        }
        Ok(NativeResult::from_rows(
            returns.items.iter().map(|i| i.name.clone()).collect(),
            out,
        ))
    }

    // ---- Expressions ----

    fn eval(&self, expr: &Expr, row: &Row) -> EngineResult<NativeValue> {
        match expr {
            Expr::Literal(v) => Ok(v.clone()),
            Expr::Parameter(name) => self
                .params
                .get(name)
                .cloned()
                .ok_or_else(|| EngineError::MissingParameter(name.clone())),
            Expr::Variable(name) => {
                let binding = row
                    .get(name)
                    .ok_or_else(|| EngineError::Binder(format!("Variable {} is not in scope", name)))?;
                Ok(self.materialize(binding))
            }
            Expr::Property(var, key) => {
                let binding = row
                    .get(var)
                    .ok_or_else(|| EngineError::Binder(format!("Variable {} is not in scope", var)))?;
                Ok(self.property_of(binding, key))
            }
            Expr::List(items) => {
                let items = items
                    .iter()
                    .map(|i| self.eval(i, row))
                    .collect::<EngineResult<Vec<_>>>()?;
                let ty = items
                    .iter()
                    .find(|v| !v.is_null())
                    .map(|v| v.logical_type())
                    .unwrap_or(LogicalType::Any);
                Ok(NativeValue::List(ty, items))
            }
            Expr::Map(pairs) => {
                let fields = pairs
                    .iter()
                    .map(|(k, e)| Ok((k.clone(), self.eval(e, row)?)))
                    .collect::<EngineResult<Vec<_>>>()?;
                Ok(NativeValue::Struct(fields))
            }
            Expr::Not(inner) => match self.eval(inner, row)? {
                NativeValue::Bool(b) => Ok(NativeValue::Bool(!b)),
                v if v.is_null() => Ok(NativeValue::Null(LogicalType::Bool)),
                other => Err(EngineError::Binder(format!(
                    "NOT expects a BOOL, got {}",
                    other.logical_type()
                ))),
            },
            Expr::Binary { left, op, right } => {
                let left = self.eval(left, row)?;
                let right = self.eval(right, row)?;
                evaluate_binary(*op, &left, &right)
            }
        }
    }

    fn materialize(&self, binding: &Binding) -> NativeValue {
        match binding {
            Binding::Value(v) => v.clone(),
            Binding::Node { table, key } => {
                let node = self.catalog.node_table(table).ok();
                match node.and_then(|n| n.rows.get(key).map(|values| (n, values))) {
                    Some((n, values)) => NativeValue::Node(NodeVal {
                        id: key.clone(),
                        label: n.name.clone(),
                        properties: n
                            .columns
                            .iter()
                            .zip(values)
                            .map(|(c, v)| (c.name.clone(), v.clone()))
                            .collect(),
                    }),
                    None => NativeValue::Null(LogicalType::Node),
                }
            }
            Binding::Rel { table, offset } => {
                let rel = self.catalog.rel_table(table).ok();
                match rel.and_then(|r| r.rows.get(offset).map(|row| (r, row))) {
                    Some((r, row)) => NativeValue::Rel(RelVal {
                        id: r.rel_id(*offset),
                        label: r.name.clone(),
                        src: row.src.clone(),
                        dst: row.dst.clone(),
                        properties: r
                            .columns
                            .iter()
                            .zip(&row.values)
                            .map(|(c, v)| (c.name.clone(), v.clone()))
                            .collect(),
                    }),
                    None => NativeValue::Null(LogicalType::Rel),
                }
            }
        }
    }

    fn property_of(&self, binding: &Binding, key: &str) -> NativeValue {
        let missing = NativeValue::Null(LogicalType::Any);
        match binding {
            Binding::Node { table, key: pk } => self
                .catalog
                .node_table(table)
                .ok()
                .and_then(|n| Some(n.rows.get(pk)?.get(n.column_index(key)?)?.clone()))
                .unwrap_or(missing),
            Binding::Rel { table, offset } => self
                .catalog
                .rel_table(table)
                .ok()
                .and_then(|r| Some(r.rows.get(offset)?.values.get(r.column_index(key)?)?.clone()))
                .unwrap_or(missing),
            Binding::Value(NativeValue::Struct(fields)) => fields
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
                .unwrap_or(missing),
            Binding::Value(_) => missing,
        }
    }
}

/// Executor for DDL and updating queries
pub struct MutQueryExecutor<'a> {
    catalog: &'a mut Catalog,
    params: &'a Params,
}

enum Assignment {
    Node { table: String, key: String, column: usize, value: NativeValue },
    Rel { table: String, offset: u64, column: usize, value: NativeValue },
}

impl<'a> MutQueryExecutor<'a> {
    pub fn new(catalog: &'a mut Catalog, params: &'a Params) -> Self {
        Self { catalog, params }
    }

    fn reader(&self) -> QueryExecutor<'_> {
        QueryExecutor::new(&*self.catalog, self.params)
    }

    pub fn execute(&mut self, command: &Command) -> EngineResult<NativeResult> {
        match command {
            Command::CreateNodeTable {
                name,
                columns,
                primary_key,
            } => {
                self.catalog.create_node_table(name, columns.clone(), primary_key)?;
                Ok(message(format!("Table {} has been created.", name)))
            }
            Command::CreateRelTable { name, from, to, columns } => {
                self.catalog.create_rel_table(name, from, to, columns.clone())?;
                Ok(message(format!("Table {} has been created.", name)))
            }
            Command::DropTable { name } => {
                self.catalog.drop_table(name)?;
                Ok(message(format!("Table {} has been dropped.", name)))
            }
            Command::AlterTable { name, action } => {
                let text = match action {
                    AlterAction::AddColumn(column) => {
                        self.catalog.add_column(name, column.clone())?;
                        format!("Property {} has been added to table {}.", column.name, name)
                    }
                    AlterAction::DropColumn(column) => {
                        self.catalog.drop_column(name, column)?;
                        format!("Property {} has been dropped from table {}.", column, name)
                    }
                    AlterAction::RenameTable(to) => {
                        self.catalog.rename_table(name, to)?;
                        format!("Table {} has been renamed to {}.", name, to)
                    }
                };
                Ok(message(text))
            }
            Command::Query(query) => self.run_query(query),
            Command::Call { .. } => self.reader().execute(command),
        }
    }

    fn run_query(&mut self, query: &QueryCommand) -> EngineResult<NativeResult> {
        let mut rows = self.reader().match_rows(&query.patterns, query.filter.as_ref())?;

        match &query.update {
            None => {}
            Some(UpdateClause::Create(patterns)) => {
                for row in &mut rows {
                    for (idx, pattern) in patterns.iter().enumerate() {
                        self.create_pattern(idx, pattern, row)?;
                    }
                }
            }
            Some(UpdateClause::Set(items)) => {
                let mut assignments = Vec::new();
                for row in &rows {
                    for item in items {
                        assignments.push(self.assignment(item, row)?);
                    }
                }
                for assignment in assignments {
                    self.assign(assignment)?;
                }
            }
            Some(UpdateClause::Delete { detach, variables }) => {
                let mut targets: Vec<Binding> = Vec::new();
                for row in &rows {
                    for var in variables {
                        let binding = row
                            .get(var)
                            .ok_or_else(|| EngineError::Binder(format!("Variable {} is not in scope", var)))?;
                        if !targets.contains(binding) {
                            targets.push(binding.clone());
                        }
                    }
                }
                // rels first so that DELETE n, r succeeds without DETACH
                targets.sort_by_key(|b| !matches!(b, Binding::Rel { .. }));
                for target in targets {
                    self.delete(target, *detach)?;
                }
            }
        }

        self.reader().project(rows, query.returns.as_ref())
    }

    fn create_pattern(&mut self, idx: usize, pattern: &Pattern, row: &mut Row) -> EngineResult<()> {
        let start_var = pattern
            .start
            .variable
            .clone()
            .unwrap_or_else(|| anonymous('c', idx, 0));
        let mut left = self.create_or_bind(&pattern.start, &start_var, row)?;

        for (step, (rel, node)) in pattern.steps.iter().enumerate() {
            let node_var = node
                .variable
                .clone()
                .unwrap_or_else(|| anonymous('c', idx, step + 1));
            let right = self.create_or_bind(node, &node_var, row)?;

            let (src, dst) = match rel.direction {
                Direction::Outgoing => (&left, &right),
                Direction::Incoming => (&right, &left),
                Direction::Either => {
                    return Err(EngineError::Binder(
                        "Only directed relationships can be created".to_string(),
                    ))
                }
            };
            let binding = self.create_rel(rel, src, dst, row)?;
            if let Some(var) = &rel.variable {
                row.insert(var.clone(), binding);
            }
            left = right;
        }
        Ok(())
    }

    /// Reuse a bound node variable, or insert a new node for the pattern
    fn create_or_bind(&mut self, pattern: &NodePattern, var: &str, row: &mut Row) -> EngineResult<(String, String)> {
        if let Some(bound) = row.get(var) {
            if pattern.label.is_some() || !pattern.properties.is_empty() {
                return Err(EngineError::Binder(format!("Variable {} is already declared", var)));
            }
            return match bound {
                Binding::Node { table, key } => Ok((table.clone(), key.clone())),
                _ => Err(EngineError::Binder(format!("Variable {} is not a node", var))),
            };
        }

        let label = pattern
            .label
            .as_ref()
            .ok_or_else(|| EngineError::Binder(format!("Create node {} expects a table name", var)))?;

        let mut values = {
            let table = self.catalog.node_table(label)?;
            table
                .columns
                .iter()
                .map(|c| NativeValue::Null(c.ty.clone()))
                .collect::<Vec<_>>()
        };
        for (prop, expr) in &pattern.properties {
            let value = self.reader().eval(expr, row)?;
            let table = self.catalog.node_table(label)?;
            let idx = table
                .column_index(prop)
                .ok_or_else(|| EngineError::Binder(format!("Cannot find property {} for {}", prop, var)))?;
            values[idx] = cast(value, &table.columns[idx].ty)?;
        }

        let table = self.catalog.node_table_mut(label)?;
        let pk = &values[table.primary_key_index()];
        if pk.is_null() {
            return Err(EngineError::Constraint(format!(
                "Found NULL, which violates the non-null constraint of the primary key column {}",
                table.primary_key
            )));
        }
        let key = key_of(pk);
        if table.rows.contains_key(&key) {
            return Err(EngineError::Constraint(format!(
                "Found duplicated primary key value {}, which violates the uniqueness constraint of the primary key column",
                key
            )));
        }
        table.rows.insert(key.clone(), values);

        row.insert(
            var.to_string(),
            Binding::Node {
                table: label.clone(),
                key: key.clone(),
            },
        );
        Ok((label.clone(), key))
    }

    fn create_rel(
        &mut self,
        pattern: &RelPattern,
        src: &(String, String),
        dst: &(String, String),
        row: &Row,
    ) -> EngineResult<Binding> {
        let label = pattern
            .label
            .as_ref()
            .ok_or_else(|| EngineError::Binder("Create relationship expects a table name".to_string()))?;

        let mut values = {
            let rel = self.catalog.rel_table(label)?;
            if rel.from != src.0 || rel.to != dst.0 {
                return Err(EngineError::Binder(format!(
                    "Relationship {} connects {} to {}, not {} to {}",
                    label, rel.from, rel.to, src.0, dst.0
                )));
            }
            rel.columns
                .iter()
                .map(|c| NativeValue::Null(c.ty.clone()))
                .collect::<Vec<_>>()
        };
        for (prop, expr) in &pattern.properties {
            let value = self.reader().eval(expr, row)?;
            let rel = self.catalog.rel_table(label)?;
            let idx = rel
                .column_index(prop)
                .ok_or_else(|| EngineError::Binder(format!("Cannot find property {} for {}", prop, label)))?;
            values[idx] = cast(value, &rel.columns[idx].ty)?;
        }

        let rel = self.catalog.rel_table_mut(label)?;
        let offset = rel.next_offset;
        rel.next_offset += 1;
        rel.rows.insert(
            offset,
            RelRow {
                src: src.1.clone(),
                dst: dst.1.clone(),
                values,
            },
        );
        Ok(Binding::Rel {
            table: label.clone(),
            offset,
        })
    }

    fn assignment(&self, item: &SetItem, row: &Row) -> EngineResult<Assignment> {
        let binding = row
            .get(&item.variable)
            .ok_or_else(|| EngineError::Binder(format!("Variable {} is not in scope", item.variable)))?;
        let value = self.reader().eval(&item.value, row)?;
        let unknown = || EngineError::Binder(format!("Cannot find property {} for {}", item.key, item.variable));

        match binding {
            Binding::Node { table, key } => {
                let node = self.catalog.node_table(table)?;
                if item.key == node.primary_key {
                    return Err(EngineError::Binder(format!(
                        "Cannot set property {} because it is the primary key of {}",
                        item.key, table
                    )));
                }
                let column = node.column_index(&item.key).ok_or_else(unknown)?;
                Ok(Assignment::Node {
                    table: table.clone(),
                    key: key.clone(),
                    column,
                    value: cast(value, &node.columns[column].ty)?,
                })
            }
            Binding::Rel { table, offset } => {
                let rel = self.catalog.rel_table(table)?;
                let column = rel.column_index(&item.key).ok_or_else(unknown)?;
                Ok(Assignment::Rel {
                    table: table.clone(),
                    offset: *offset,
                    column,
                    value: cast(value, &rel.columns[column].ty)?,
                })
            }
            Binding::Value(_) => Err(EngineError::Binder(format!(
                "Variable {} is not a node or relationship",
                item.variable
            ))),
        }
    }

    fn assign(&mut self, assignment: Assignment) -> EngineResult<()> {
        match assignment {
            Assignment::Node { table, key, column, value } => {
                if let Some(values) = self.catalog.node_table_mut(&table)?.rows.get_mut(&key) {
                    values[column] = value;
                }
            }
            Assignment::Rel { table, offset, column, value } => {
                if let Some(row) = self.catalog.rel_table_mut(&table)?.rows.get_mut(&offset) {
                    row.values[column] = value;
                }
            }
        }
        Ok(())
    }

    fn delete(&mut self, target: Binding, detach: bool) -> EngineResult<()> {
        match target {
            Binding::Rel { table, offset } => {
                self.catalog.rel_table_mut(&table)?.rows.remove(&offset);
                Ok(())
            }
            Binding::Node { table, key } => {
                let attached: Vec<(String, u64)> = self
                    .catalog
                    .rel_tables()
                    .flat_map(|rel| {
                        rel.rows
                            .iter()
                            .filter(|(_, r)| (rel.from == table && r.src == key) || (rel.to == table && r.dst == key))
                            .map(|(offset, _)| (rel.name.clone(), *offset))
                            .collect::<Vec<_>>()
                    })
                    .collect();

                if !attached.is_empty() && !detach {
                    return Err(EngineError::Constraint(format!(
                        "Node {} in table {} has connected edges and cannot be deleted; use DETACH DELETE",
                        key, table
                    )));
                }
                for (rel, offset) in attached {
                    self.catalog.rel_table_mut(&rel)?.rows.remove(&offset);
                }
                self.catalog.node_table_mut(&table)?.rows.shift_remove(&key);
                Ok(())
            }
            Binding::Value(_) => Err(EngineError::Binder(
                "Only nodes and relationships can be deleted".to_string(),
            )),
        }
    }
}

fn values_equal(a: &NativeValue, b: &NativeValue) -> bool {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        return x == y;
    }
    if a.is_numeric() && b.is_numeric() {
        return a.as_f64() == b.as_f64();
    }
    match (a, b) {
        (NativeValue::Date(d), NativeValue::Timestamp(t)) | (NativeValue::Timestamp(t), NativeValue::Date(d)) => {
            d.and_time(chrono::NaiveTime::MIN) == *t
        }
        (NativeValue::List(_, x), NativeValue::List(_, y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(l, r)| values_equal(l, r))
        }
        _ => a == b,
    }
}

fn compare_values(a: &NativeValue, b: &NativeValue) -> Option<Ordering> {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        return Some(x.cmp(&y));
    }
    if a.is_numeric() && b.is_numeric() {
        return a.as_f64()?.partial_cmp(&b.as_f64()?);
    }
    match (a, b) {
        (NativeValue::String(x), NativeValue::String(y)) => Some(x.cmp(y)),
        (NativeValue::Bool(x), NativeValue::Bool(y)) => Some(x.cmp(y)),
        (NativeValue::Date(x), NativeValue::Date(y)) => Some(x.cmp(y)),
        (NativeValue::Timestamp(x), NativeValue::Timestamp(y)) => Some(x.cmp(y)),
        (NativeValue::Date(x), NativeValue::Timestamp(y)) => Some(x.and_time(chrono::NaiveTime::MIN).cmp(y)),
        (NativeValue::Timestamp(x), NativeValue::Date(y)) => Some(x.cmp(&y.and_time(chrono::NaiveTime::MIN))),
        _ => None,
    }
}

fn evaluate_binary(op: BinaryOp, left: &NativeValue, right: &NativeValue) -> EngineResult<NativeValue> {
    let null = NativeValue::Null(LogicalType::Bool);
    match op {
        BinaryOp::And | BinaryOp::Or => {
            let as_logic = |v: &NativeValue| -> EngineResult<Option<bool>> {
                match v {
                    NativeValue::Bool(b) => Ok(Some(*b)),
                    v if v.is_null() => Ok(None),
                    other => Err(EngineError::Binder(format!(
                        "Logical operator expects BOOL, got {}",
                        other.logical_type()
                    ))),
                }
            };
            let (l, r) = (as_logic(left)?, as_logic(right)?);
            let result = match op {
                BinaryOp::And => match (l, r) {
                    (Some(false), _) | (_, Some(false)) => Some(false),
                    (Some(true), Some(true)) => Some(true),
                    _ => None,
                },
                _ => match (l, r) {
                    (Some(true), _) | (_, Some(true)) => Some(true),
                    (Some(false), Some(false)) => Some(false),
                    _ => None,
                },
            };
            Ok(result.map(NativeValue::Bool).unwrap_or(null))
        }
        _ if left.is_null() || right.is_null() => Ok(null),
        BinaryOp::Eq => Ok(NativeValue::Bool(values_equal(left, right))),
        BinaryOp::Ne => Ok(NativeValue::Bool(!values_equal(left, right))),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ordering = compare_values(left, right).ok_or_else(|| {
                EngineError::Binder(format!(
                    "Cannot compare {} with {}",
                    left.logical_type(),
                    right.logical_type()
                ))
            })?;
            let result = match op {
                BinaryOp::Lt => ordering == Ordering::Less,
                BinaryOp::Le => ordering != Ordering::Greater,
                BinaryOp::Gt => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            };
            Ok(NativeValue::Bool(result))
        }
    }
}
