//! Embedded graph database engine
//!
//! The store talks to its database through the [`GraphDatabase`] trait and
//! opens one through a [`Connector`]. [`EmbeddedDatabase`] is the in-process
//! implementation: a catalog of typed node and rel tables queried with a
//! Cypher dialect (see `cypher.pest`), persisted as a single snapshot file.

pub mod ast;
pub mod catalog;
pub mod executor;
pub mod parser;

pub use catalog::Catalog;
pub use executor::{MutQueryExecutor, Params, QueryExecutor};
pub use parser::{parse_command, ParseError};

use crate::error::FailureKind;
use crate::query::Statement;
use crate::value::{LogicalType, NativeValue};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Path that opens a volatile database
pub const IN_MEMORY: &str = ":memory:";

/// Engine errors
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("Binder exception: {0}")]
    Binder(String),

    #[error("Catalog exception: {0}")]
    Catalog(String),

    #[error("Runtime exception: {0}")]
    Constraint(String),

    #[error("Conversion exception: {0}")]
    Cast(String),

    #[error("Parameter {0} not found")]
    MissingParameter(String),

    #[error("Database is closed")]
    Closed,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Snapshot error: {0}")]
    Snapshot(#[from] bincode::Error),
}

impl EngineError {
    pub fn kind(&self) -> FailureKind {
        match self {
            EngineError::Catalog(_) => FailureKind::Ddl,
            EngineError::Constraint(_) | EngineError::Cast(_) => FailureKind::Write,
            EngineError::Parse(_) | EngineError::Binder(_) | EngineError::MissingParameter(_) => FailureKind::Read,
            EngineError::Connection(_) | EngineError::Io(_) | EngineError::Closed | EngineError::Snapshot(_) => {
                FailureKind::Connection
            }
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

/// Result set in the engine's native representation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NativeResult {
    pub columns: Vec<String>,
    pub column_types: Vec<LogicalType>,
    pub rows: Vec<Vec<NativeValue>>,
}

impl NativeResult {
    /// Build a result, typing each column after its first non-null value
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<NativeValue>>) -> Self {
        let column_types = (0..columns.len())
            .map(|idx| {
                rows.iter()
                    .filter_map(|row| row.get(idx))
                    .find(|v| !v.is_null())
                    .map(|v| v.logical_type())
                    .unwrap_or(LogicalType::Any)
            })
            .collect();
        NativeResult {
            columns,
            column_types,
            rows,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
}

/// An open database connection
#[async_trait]
pub trait GraphDatabase: Send + Sync {
    /// Execute one statement
    async fn execute(&self, statement: &Statement) -> EngineResult<NativeResult>;

    /// Whether `$name` parameters are bound by the engine rather than inlined
    fn supports_parameters(&self) -> bool {
        true
    }

    /// Release the connection; later calls fail with a connection error
    async fn close(&self);
}

/// Opens databases by path
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, path: &Path) -> EngineResult<Arc<dyn GraphDatabase>>;
}

/// Connector for [`EmbeddedDatabase`]
#[derive(Debug, Clone, Copy)]
pub struct EmbeddedConnector {
    parameters: bool,
}

impl EmbeddedConnector {
    pub fn new() -> Self {
        Self { parameters: true }
    }

    /// Connector whose databases report no parameter support, so callers
    /// inline values into the statement text
    pub fn without_parameters() -> Self {
        Self { parameters: false }
    }
}

impl Default for EmbeddedConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Connector for EmbeddedConnector {
    async fn connect(&self, path: &Path) -> EngineResult<Arc<dyn GraphDatabase>> {
        let path = path.to_path_buf();
        let parameters = self.parameters;
        let db = tokio::task::spawn_blocking(move || EmbeddedDatabase::open(&path))
            .await
            .map_err(|e| EngineError::Connection(e.to_string()))??;
        Ok(Arc::new(db.with_parameters(parameters)))
    }
}

/// In-process database
pub struct EmbeddedDatabase {
    path: Option<PathBuf>,
    parameters: bool,
    catalog: RwLock<Option<Catalog>>,
}

impl EmbeddedDatabase {
    /// Open the database at `path`, creating an empty one if the file is missing
    pub fn open(path: &Path) -> EngineResult<Self> {
        if path.as_os_str() == IN_MEMORY {
            return Ok(Self::in_memory());
        }
        if path.is_dir() {
            return Err(EngineError::Connection(format!(
                "{} is a directory, expected a database file",
                path.display()
            )));
        }

        let catalog = if path.exists() {
            Catalog::load(path)?
        } else {
            let parent = path.parent().filter(|p| !p.as_os_str().is_empty());
            if parent.is_some_and(|p| !p.is_dir()) {
                return Err(EngineError::Connection(format!(
                    "Cannot create database {}: parent directory does not exist",
                    path.display()
                )));
            }
            let catalog = Catalog::new();
            catalog.save(path)?;
            catalog
        };

        info!("Opened database {}", path.display());
        Ok(Self {
            path: Some(path.to_path_buf()),
            parameters: true,
            catalog: RwLock::new(Some(catalog)),
        })
    }

    pub fn in_memory() -> Self {
        Self {
            path: None,
            parameters: true,
            catalog: RwLock::new(Some(Catalog::new())),
        }
    }

    pub fn with_parameters(mut self, parameters: bool) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

#[async_trait]
impl GraphDatabase for EmbeddedDatabase {
    async fn execute(&self, statement: &Statement) -> EngineResult<NativeResult> {
        debug!("Executing: {}", statement.text);
        let command = parse_command(&statement.text)?;

        if !command.is_write() {
            let guard = self.catalog.read().await;
            let catalog = guard.as_ref().ok_or(EngineError::Closed)?;
            return QueryExecutor::new(catalog, &statement.params).execute(&command);
        }

        let mut guard = self.catalog.write().await;
        let current = guard.as_ref().ok_or(EngineError::Closed)?;

        // statements either apply completely or not at all
        let mut next = current.clone();
        let result = MutQueryExecutor::new(&mut next, &statement.params).execute(&command)?;
        if let Some(path) = self.path.clone() {
            let (saved, outcome) = tokio::task::spawn_blocking(move || {
                let outcome = next.save(&path);
                (next, outcome)
            })
            .await
            .map_err(|e| EngineError::Io(std::io::Error::other(e)))?;
            outcome?;
            next = saved;
        }
        *guard = Some(next);
        Ok(result)
    }

    fn supports_parameters(&self) -> bool {
        self.parameters
    }

    async fn close(&self) {
        let mut guard = self.catalog.write().await;
        if guard.take().is_some() {
            match &self.path {
                Some(path) => info!("Closed database {}", path.display()),
                None => info!("Closed in-memory database"),
            }
        }
    }
}
