//! Abstract syntax tree of the engine's query language

use crate::value::{LogicalType, NativeValue};

/// A parsed statement
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    CreateNodeTable {
        name: String,
        columns: Vec<ColumnDef>,
        primary_key: String,
    },
    CreateRelTable {
        name: String,
        from: String,
        to: String,
        columns: Vec<ColumnDef>,
    },
    DropTable {
        name: String,
    },
    AlterTable {
        name: String,
        action: AlterAction,
    },
    Call {
        procedure: Procedure,
        returns: Option<ReturnClause>,
    },
    Query(QueryCommand),
}

impl Command {
    /// Whether executing this command may change the database
    pub fn is_write(&self) -> bool {
        match self {
            Command::Call { .. } => false,
            Command::Query(q) => q.update.is_some(),
            _ => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub name: String,
    pub ty: LogicalType,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AlterAction {
    AddColumn(ColumnDef),
    DropColumn(String),
    RenameTable(String),
}

/// Built-in catalog procedures
#[derive(Debug, Clone, PartialEq)]
pub enum Procedure {
    ShowTables,
    TableInfo(Expr),
    ShowConnection(Expr),
}

/// MATCH / CREATE / SET / DELETE / RETURN pipeline
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryCommand {
    pub patterns: Vec<Pattern>,
    pub filter: Option<Expr>,
    pub update: Option<UpdateClause>,
    pub returns: Option<ReturnClause>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UpdateClause {
    Create(Vec<Pattern>),
    Set(Vec<SetItem>),
    Delete { detach: bool, variables: Vec<String> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SetItem {
    pub variable: String,
    pub key: String,
    pub value: Expr,
}

/// A path pattern: a start node followed by (relationship, node) steps
#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    pub start: NodePattern,
    pub steps: Vec<(RelPattern, NodePattern)>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct NodePattern {
    pub variable: Option<String>,
    pub label: Option<String>,
    pub properties: Vec<(String, Expr)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RelPattern {
    pub variable: Option<String>,
    pub label: Option<String>,
    pub properties: Vec<(String, Expr)>,
    pub direction: Direction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Outgoing,
    Incoming,
    Either,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReturnClause {
    pub items: Vec<ReturnItem>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReturnItem {
    pub expr: Expr,
    /// Output column name: the alias, or the expression text
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(NativeValue),
    Parameter(String),
    Variable(String),
    Property(String, String),
    List(Vec<Expr>),
    Map(Vec<(String, Expr)>),
    Not(Box<Expr>),
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    And,
    Or,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}
