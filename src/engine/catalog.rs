//! Tables of the embedded engine and their on-disk snapshot

use super::ast::ColumnDef;
use super::{EngineError, EngineResult};
use crate::value::codec::{parse_date, parse_timestamp};
use crate::value::{Interval, LogicalType, NativeValue};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

const SNAPSHOT_MAGIC: [u8; 4] = *b"NGDB";
const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub ty: LogicalType,
}

impl From<ColumnDef> for Column {
    fn from(def: ColumnDef) -> Self {
        Column {
            name: def.name,
            ty: def.ty,
        }
    }
}

/// Node table; rows are keyed by the rendered primary key value
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeTable {
    pub id: u64,
    pub name: String,
    pub columns: Vec<Column>,
    pub primary_key: String,
    pub rows: IndexMap<String, Vec<NativeValue>>,
}

impl NodeTable {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn primary_key_index(&self) -> usize {
        self.column_index(&self.primary_key).unwrap_or(0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelRow {
    pub src: String,
    pub dst: String,
    pub values: Vec<NativeValue>,
}

/// Relationship table bound to one source and one destination node table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelTable {
    pub id: u64,
    pub name: String,
    pub from: String,
    pub to: String,
    pub columns: Vec<Column>,
    pub rows: BTreeMap<u64, RelRow>,
    pub next_offset: u64,
}

impl RelTable {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Identity of a rel: its `id` column when present and set, else `table:offset`
    pub fn rel_id(&self, offset: u64) -> String {
        let from_column = self.column_index("id").and_then(|idx| {
            self.rows
                .get(&offset)
                .and_then(|row| row.values.get(idx))
                .filter(|v| !v.is_null())
                .map(|v| v.to_string())
        });
        from_column.unwrap_or_else(|| format!("{}:{}", self.name, offset))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Table {
    Node(NodeTable),
    Rel(RelTable),
}

impl Table {
    pub fn name(&self) -> &str {
        match self {
            Table::Node(t) => &t.name,
            Table::Rel(t) => &t.name,
        }
    }

    pub fn columns(&self) -> &[Column] {
        match self {
            Table::Node(t) => &t.columns,
            Table::Rel(t) => &t.columns,
        }
    }
}

/// All tables of one database
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    tables: IndexMap<String, Table>,
    next_table_id: u64,
}

#[derive(Serialize, Deserialize)]
struct Snapshot {
    magic: [u8; 4],
    version: u32,
    catalog: Catalog,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.values()
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    pub fn node_table(&self, name: &str) -> EngineResult<&NodeTable> {
        match self.tables.get(name) {
            Some(Table::Node(t)) => Ok(t),
            Some(Table::Rel(_)) => Err(EngineError::Binder(format!("{} is not a node table", name))),
            None => Err(EngineError::Binder(format!("Table {} does not exist", name))),
        }
    }

    pub fn node_table_mut(&mut self, name: &str) -> EngineResult<&mut NodeTable> {
        match self.tables.get_mut(name) {
            Some(Table::Node(t)) => Ok(t),
            Some(Table::Rel(_)) => Err(EngineError::Binder(format!("{} is not a node table", name))),
            None => Err(EngineError::Binder(format!("Table {} does not exist", name))),
        }
    }

    pub fn rel_table(&self, name: &str) -> EngineResult<&RelTable> {
        match self.tables.get(name) {
            Some(Table::Rel(t)) => Ok(t),
            Some(Table::Node(_)) => Err(EngineError::Binder(format!("{} is not a rel table", name))),
            None => Err(EngineError::Binder(format!("Table {} does not exist", name))),
        }
    }

    pub fn rel_table_mut(&mut self, name: &str) -> EngineResult<&mut RelTable> {
        match self.tables.get_mut(name) {
            Some(Table::Rel(t)) => Ok(t),
            Some(Table::Node(_)) => Err(EngineError::Binder(format!("{} is not a rel table", name))),
            None => Err(EngineError::Binder(format!("Table {} does not exist", name))),
        }
    }

    pub fn node_tables(&self) -> impl Iterator<Item = &NodeTable> {
        self.tables.values().filter_map(|t| match t {
            Table::Node(n) => Some(n),
            Table::Rel(_) => None,
        })
    }

    pub fn rel_tables(&self) -> impl Iterator<Item = &RelTable> {
        self.tables.values().filter_map(|t| match t {
            Table::Rel(r) => Some(r),
            Table::Node(_) => None,
        })
    }

    fn ensure_free(&self, name: &str) -> EngineResult<()> {
        if self.tables.contains_key(name) {
            return Err(EngineError::Catalog(format!("Table {} already exists", name)));
        }
        Ok(())
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_table_id;
        self.next_table_id += 1;
        id
    }

    pub fn create_node_table(&mut self, name: &str, columns: Vec<ColumnDef>, primary_key: &str) -> EngineResult<()> {
        self.ensure_free(name)?;
        let columns = distinct_columns(name, columns)?;
        let pk = columns
            .iter()
            .find(|c| c.name == primary_key)
            .ok_or_else(|| EngineError::Catalog(format!("Primary key {} is not a column of {}", primary_key, name)))?;
        if !pk.ty.is_key_type() {
            return Err(EngineError::Catalog(format!("{} cannot be a primary key type", pk.ty)));
        }

        let id = self.next_id();
        self.tables.insert(
            name.to_string(),
            Table::Node(NodeTable {
                id,
                name: name.to_string(),
                columns,
                primary_key: primary_key.to_string(),
                rows: IndexMap::new(),
            }),
        );
        Ok(())
    }

    pub fn create_rel_table(&mut self, name: &str, from: &str, to: &str, columns: Vec<ColumnDef>) -> EngineResult<()> {
        self.ensure_free(name)?;
        for endpoint in [from, to] {
            if !matches!(self.tables.get(endpoint), Some(Table::Node(_))) {
                return Err(EngineError::Catalog(format!("Node table {} does not exist", endpoint)));
            }
        }
        let columns = distinct_columns(name, columns)?;

        let id = self.next_id();
        self.tables.insert(
            name.to_string(),
            Table::Rel(RelTable {
                id,
                name: name.to_string(),
                from: from.to_string(),
                to: to.to_string(),
                columns,
                rows: BTreeMap::new(),
                next_offset: 0,
            }),
        );
        Ok(())
    }

    pub fn drop_table(&mut self, name: &str) -> EngineResult<()> {
        match self.tables.get(name) {
            None => return Err(EngineError::Catalog(format!("Table {} does not exist", name))),
            Some(Table::Node(_)) => {
                if let Some(rel) = self.rel_tables().find(|r| r.from == name || r.to == name) {
                    return Err(EngineError::Catalog(format!(
                        "Cannot drop node table {} because rel table {} references it",
                        name, rel.name
                    )));
                }
            }
            Some(Table::Rel(_)) => {}
        }
        self.tables.shift_remove(name);
        Ok(())
    }

    pub fn add_column(&mut self, table: &str, column: ColumnDef) -> EngineResult<()> {
        let column = Column::from(column);
        match self.tables.get_mut(table) {
            None => Err(EngineError::Catalog(format!("Table {} does not exist", table))),
            Some(t) => {
                if t.columns().iter().any(|c| c.name == column.name) {
                    return Err(EngineError::Catalog(format!(
                        "Column {} already exists in {}",
                        column.name, table
                    )));
                }
                let null = NativeValue::Null(column.ty.clone());
                match t {
                    Table::Node(n) => {
                        n.columns.push(column);
                        n.rows.values_mut().for_each(|row| row.push(null.clone()));
                    }
                    Table::Rel(r) => {
                        r.columns.push(column);
                        r.rows.values_mut().for_each(|row| row.values.push(null.clone()));
                    }
                }
                Ok(())
            }
        }
    }

    pub fn drop_column(&mut self, table: &str, column: &str) -> EngineResult<()> {
        match self.tables.get_mut(table) {
            None => Err(EngineError::Catalog(format!("Table {} does not exist", table))),
            Some(Table::Node(n)) => {
                if n.primary_key == column {
                    return Err(EngineError::Catalog(format!("Cannot drop primary key {}", column)));
                }
                let idx = n
                    .column_index(column)
                    .ok_or_else(|| EngineError::Catalog(format!("Column {} does not exist in {}", column, table)))?;
                n.columns.remove(idx);
                n.rows.values_mut().for_each(|row| {
                    row.remove(idx);
                });
                Ok(())
            }
            Some(Table::Rel(r)) => {
                let idx = r
                    .column_index(column)
                    .ok_or_else(|| EngineError::Catalog(format!("Column {} does not exist in {}", column, table)))?;
                r.columns.remove(idx);
                r.rows.values_mut().for_each(|row| {
                    row.values.remove(idx);
                });
                Ok(())
            }
        }
    }

    pub fn rename_table(&mut self, table: &str, new_name: &str) -> EngineResult<()> {
        if table == new_name {
            return Ok(());
        }
        self.ensure_free(new_name)?;
        let idx = self
            .tables
            .get_index_of(table)
            .ok_or_else(|| EngineError::Catalog(format!("Table {} does not exist", table)))?;

        let (_, mut t) = self
            .tables
            .shift_remove_index(idx)
            .ok_or_else(|| EngineError::Catalog(format!("Table {} does not exist", table)))?;
        match &mut t {
            Table::Node(n) => n.name = new_name.to_string(),
            Table::Rel(r) => r.name = new_name.to_string(),
        }
        let is_node = matches!(t, Table::Node(_));
        self.tables.insert(new_name.to_string(), t);
        let last = self.tables.len() - 1;
        self.tables.move_index(last, idx);

        if is_node {
            for other in self.tables.values_mut() {
                if let Table::Rel(r) = other {
                    if r.from == table {
                        r.from = new_name.to_string();
                    }
                    if r.to == table {
                        r.to = new_name.to_string();
                    }
                }
            }
        }
        Ok(())
    }

    /// Load a snapshot written by [`Catalog::save`]
    pub fn load(path: &Path) -> EngineResult<Catalog> {
        let file = File::open(path)?;
        let snapshot: Snapshot = bincode::deserialize_from(BufReader::new(file))?;
        if snapshot.magic != SNAPSHOT_MAGIC || snapshot.version != SNAPSHOT_VERSION {
            return Err(EngineError::Connection(format!(
                "{} is not a database file (version {})",
                path.display(),
                snapshot.version
            )));
        }
        Ok(snapshot.catalog)
    }

    /// Write the whole catalog to `path`, replacing it atomically
    pub fn save(&self, path: &Path) -> EngineResult<()> {
        let tmp = path.with_extension("tmp");
        {
            let mut writer = BufWriter::new(File::create(&tmp)?);
            let snapshot = Snapshot {
                magic: SNAPSHOT_MAGIC,
                version: SNAPSHOT_VERSION,
                catalog: self.clone(),
            };
            bincode::serialize_into(&mut writer, &snapshot)?;
            writer.flush()?;
        }
        std::fs::rename(&tmp, path)?;
        Ok(())
    }
}

fn distinct_columns(table: &str, defs: Vec<ColumnDef>) -> EngineResult<Vec<Column>> {
    let mut columns: Vec<Column> = Vec::with_capacity(defs.len());
    for def in defs {
        if columns.iter().any(|c| c.name == def.name) {
            return Err(EngineError::Catalog(format!("Duplicate column {} in {}", def.name, table)));
        }
        columns.push(def.into());
    }
    Ok(columns)
}

/// Cast a value to a column type
pub fn cast(value: NativeValue, ty: &LogicalType) -> EngineResult<NativeValue> {
    let fail = |v: &NativeValue| EngineError::Cast(format!("Cannot cast {} value '{}' to {}", v.logical_type(), v, ty));

    if let NativeValue::Null(_) = value {
        return Ok(NativeValue::Null(ty.clone()));
    }
    if *ty == LogicalType::Any || value.logical_type() == *ty {
        return Ok(value);
    }

    let converted = match (ty, &value) {
        (LogicalType::Int8, v) => v.as_i64().and_then(|i| i8::try_from(i).ok()).map(NativeValue::Int8),
        (LogicalType::Int16, v) => v.as_i64().and_then(|i| i16::try_from(i).ok()).map(NativeValue::Int16),
        (LogicalType::Int32, v) => v.as_i64().and_then(|i| i32::try_from(i).ok()).map(NativeValue::Int32),
        (LogicalType::Int64, v) => v.as_i64().map(NativeValue::Int64),
        (LogicalType::Int128, v) => v.as_i64().map(|i| NativeValue::Int128(i as i128)),
        (LogicalType::UInt8, v) => v.as_i64().and_then(|i| u8::try_from(i).ok()).map(NativeValue::UInt8),
        (LogicalType::UInt16, v) => v.as_i64().and_then(|i| u16::try_from(i).ok()).map(NativeValue::UInt16),
        (LogicalType::UInt32, v) => v.as_i64().and_then(|i| u32::try_from(i).ok()).map(NativeValue::UInt32),
        (LogicalType::UInt64, v) => v.as_i64().and_then(|i| u64::try_from(i).ok()).map(NativeValue::UInt64),
        (LogicalType::Double, v) if v.is_numeric() => v.as_f64().map(NativeValue::Double),
        (LogicalType::Float, v) if v.is_numeric() => v.as_f64().map(|f| NativeValue::Float(f as f32)),
        (LogicalType::Decimal, v) if v.is_numeric() => Some(NativeValue::Decimal(v.to_string())),
        (LogicalType::Date, NativeValue::String(s)) => parse_date(s).map(NativeValue::Date),
        (LogicalType::Date, NativeValue::Timestamp(ts)) => Some(NativeValue::Date(ts.date())),
        (LogicalType::Timestamp, NativeValue::String(s)) => parse_timestamp(s).map(NativeValue::Timestamp),
        (LogicalType::Timestamp, NativeValue::Date(d)) => {
            Some(NativeValue::Timestamp(d.and_time(chrono::NaiveTime::MIN)))
        }
        (LogicalType::Interval, NativeValue::String(s)) => parse_interval(s).map(NativeValue::Interval),
        (LogicalType::Uuid, NativeValue::String(s)) => uuid::Uuid::parse_str(s).ok().map(NativeValue::Uuid),
        (LogicalType::Blob, NativeValue::String(s)) => Some(NativeValue::Blob(s.as_bytes().to_vec())),
        (LogicalType::List(inner), NativeValue::List(_, items) | NativeValue::Array(_, items)) => {
            let items = items
                .iter()
                .cloned()
                .map(|item| cast(item, inner))
                .collect::<EngineResult<Vec<_>>>()?;
            Some(NativeValue::List((**inner).clone(), items))
        }
        _ => None,
    };
    converted.ok_or_else(|| fail(&value))
}

/// Parse the `Display` form of an [`Interval`]
fn parse_interval(s: &str) -> Option<Interval> {
    let parts: Vec<&str> = s.split_whitespace().collect();
    match parts.as_slice() {
        [months, "months", days, "days", micros, "micros"] => Some(Interval::new(
            months.parse().ok()?,
            days.parse().ok()?,
            micros.parse().ok()?,
        )),
        _ => None,
    }
}
