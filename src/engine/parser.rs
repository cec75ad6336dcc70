//! Statement parser for the embedded engine, built on pest

use super::ast::*;
use crate::value::{LogicalType, NativeValue};
use pest::iterators::Pair;
use pest::pratt_parser::{Assoc, Op, PrattParser};
use pest::Parser;
use pest_derive::Parser;
use std::sync::LazyLock;
use thiserror::Error;

#[derive(Parser)]
#[grammar = "engine/cypher.pest"]
struct CypherParser;

static PRATT_PARSER: LazyLock<PrattParser<Rule>> = LazyLock::new(|| {
    PrattParser::new()
        .op(Op::infix(Rule::or_op, Assoc::Left))
        .op(Op::infix(Rule::and_op, Assoc::Left))
        .op(Op::prefix(Rule::not_op))
        .op(Op::infix(Rule::comparison_op, Assoc::Left))
});

/// Parser errors
#[derive(Error, Debug)]
pub enum ParseError {
    /// Pest parsing error
    #[error("Parse error: {0}")]
    PestError(#[from] Box<pest::error::Error<Rule>>),

    /// Semantic error
    #[error("Semantic error: {0}")]
    SemanticError(String),

    /// Unsupported feature
    #[error("Unsupported feature: {0}")]
    UnsupportedFeature(String),
}

pub type ParseResult<T> = Result<T, ParseError>;

/// Parse one statement
pub fn parse_command(input: &str) -> ParseResult<Command> {
    let mut pairs = CypherParser::parse(Rule::statement, input).map_err(Box::new)?;
    let statement = pairs
        .next()
        .ok_or_else(|| ParseError::SemanticError("Empty statement".to_string()))?;

    for inner in statement.into_inner() {
        match inner.as_rule() {
            Rule::create_node_table => return parse_create_node_table(inner),
            Rule::create_rel_table => return parse_create_rel_table(inner),
            Rule::drop_table => {
                let name = first_name(inner, Rule::ident)?;
                return Ok(Command::DropTable { name });
            }
            Rule::alter_table => return parse_alter_table(inner),
            Rule::call_stmt => return parse_call(inner),
            Rule::query => return parse_query(inner).map(Command::Query),
            _ => {}
        }
    }
    Err(ParseError::SemanticError("Empty statement".to_string()))
}

fn name_of(pair: &Pair<Rule>) -> String {
    let text = pair.as_str();
    text.strip_prefix('`')
        .and_then(|t| t.strip_suffix('`'))
        .unwrap_or(text)
        .to_string()
}

fn first_name(pair: Pair<Rule>, rule: Rule) -> ParseResult<String> {
    pair.into_inner()
        .find(|p| p.as_rule() == rule)
        .map(|p| name_of(&p))
        .ok_or_else(|| ParseError::SemanticError(format!("Missing {:?}", rule)))
}

fn parse_column_def(pair: Pair<Rule>) -> ParseResult<ColumnDef> {
    let mut name = None;
    let mut ty = None;
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::ident => name = Some(name_of(&inner)),
            Rule::type_name => {
                ty = Some(LogicalType::parse(inner.as_str()).ok_or_else(|| {
                    ParseError::UnsupportedFeature(format!("column type {}", inner.as_str()))
                })?)
            }
            _ => {}
        }
    }
    Ok(ColumnDef {
        name: name.ok_or_else(|| ParseError::SemanticError("Missing column name".to_string()))?,
        ty: ty.ok_or_else(|| ParseError::SemanticError("Missing column type".to_string()))?,
    })
}

fn parse_create_node_table(pair: Pair<Rule>) -> ParseResult<Command> {
    let mut name = None;
    let mut columns = Vec::new();
    let mut primary_key = None;

    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::ident => name = Some(name_of(&inner)),
            Rule::column_def => columns.push(parse_column_def(inner)?),
            Rule::primary_key => {
                if primary_key.is_some() {
                    return Err(ParseError::SemanticError("Multiple primary keys".to_string()));
                }
                primary_key = Some(first_name(inner, Rule::ident)?);
            }
            _ => {}
        }
    }

    let name = name.ok_or_else(|| ParseError::SemanticError("Missing table name".to_string()))?;
    let primary_key = primary_key
        .ok_or_else(|| ParseError::SemanticError(format!("Node table {} needs a PRIMARY KEY", name)))?;
    Ok(Command::CreateNodeTable {
        name,
        columns,
        primary_key,
    })
}

fn parse_create_rel_table(pair: Pair<Rule>) -> ParseResult<Command> {
    let mut names = Vec::with_capacity(3);
    let mut columns = Vec::new();

    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::ident => names.push(name_of(&inner)),
            Rule::column_def => columns.push(parse_column_def(inner)?),
            _ => {}
        }
    }

    match <[String; 3]>::try_from(names) {
        Ok([name, from, to]) => Ok(Command::CreateRelTable { name, from, to, columns }),
        Err(_) => Err(ParseError::SemanticError(
            "REL TABLE needs a name and FROM/TO tables".to_string(),
        )),
    }
}

fn parse_alter_table(pair: Pair<Rule>) -> ParseResult<Command> {
    let mut name = None;
    let mut action = None;

    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::ident => name = Some(name_of(&inner)),
            Rule::alter_add => {
                let column = inner
                    .into_inner()
                    .find(|p| p.as_rule() == Rule::column_def)
                    .ok_or_else(|| ParseError::SemanticError("Missing column".to_string()))?;
                action = Some(AlterAction::AddColumn(parse_column_def(column)?));
            }
            Rule::alter_drop => action = Some(AlterAction::DropColumn(first_name(inner, Rule::ident)?)),
            Rule::alter_rename => action = Some(AlterAction::RenameTable(first_name(inner, Rule::ident)?)),
            _ => {}
        }
    }

    Ok(Command::AlterTable {
        name: name.ok_or_else(|| ParseError::SemanticError("Missing table name".to_string()))?,
        action: action.ok_or_else(|| ParseError::SemanticError("Missing ALTER action".to_string()))?,
    })
}

fn parse_call(pair: Pair<Rule>) -> ParseResult<Command> {
    let mut procedure = None;
    let mut returns = None;

    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::procedure => procedure = Some(parse_procedure(inner)?),
            Rule::return_clause => returns = Some(parse_return_clause(inner)?),
            _ => {}
        }
    }

    Ok(Command::Call {
        procedure: procedure.ok_or_else(|| ParseError::SemanticError("Missing procedure".to_string()))?,
        returns,
    })
}

fn parse_procedure(pair: Pair<Rule>) -> ParseResult<Procedure> {
    let mut name = String::new();
    let mut args = Vec::new();
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::ident => name = name_of(&inner),
            Rule::expression => args.push(parse_expression(inner)?),
            _ => {}
        }
    }

    match name.to_ascii_uppercase().as_str() {
        "SHOW_TABLES" if args.is_empty() => Ok(Procedure::ShowTables),
        "TABLE_INFO" => Ok(Procedure::TableInfo(single_arg(&name, args)?)),
        "SHOW_CONNECTION" => Ok(Procedure::ShowConnection(single_arg(&name, args)?)),
        _ => Err(ParseError::UnsupportedFeature(format!("procedure {}", name))),
    }
}

fn single_arg(procedure: &str, mut args: Vec<Expr>) -> ParseResult<Expr> {
    match args.len() {
        1 => Ok(args.remove(0)),
        _ => Err(ParseError::SemanticError(format!(
            "{} takes exactly one argument",
            procedure
        ))),
    }
}

fn parse_query(pair: Pair<Rule>) -> ParseResult<QueryCommand> {
    let mut query = QueryCommand::default();

    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::match_clause => query.patterns = parse_patterns(inner)?,
            Rule::where_clause => {
                let expr = inner
                    .into_inner()
                    .find(|p| p.as_rule() == Rule::expression)
                    .ok_or_else(|| ParseError::SemanticError("Invalid WHERE clause".to_string()))?;
                query.filter = Some(parse_expression(expr)?);
            }
            Rule::create_clause => query.update = Some(UpdateClause::Create(parse_patterns(inner)?)),
            Rule::set_clause => {
                let items = inner
                    .into_inner()
                    .filter(|p| p.as_rule() == Rule::set_item)
                    .map(parse_set_item)
                    .collect::<ParseResult<Vec<_>>>()?;
                query.update = Some(UpdateClause::Set(items));
            }
            Rule::delete_clause => {
                let mut detach = false;
                let mut variables = Vec::new();
                for p in inner.into_inner() {
                    match p.as_rule() {
                        Rule::kw_detach => detach = true,
                        Rule::variable => variables.push(name_of(&p)),
                        _ => {}
                    }
                }
                query.update = Some(UpdateClause::Delete { detach, variables });
            }
            Rule::return_clause => query.returns = Some(parse_return_clause(inner)?),
            _ => {}
        }
    }

    Ok(query)
}

fn parse_patterns(pair: Pair<Rule>) -> ParseResult<Vec<Pattern>> {
    pair.into_inner()
        .filter(|p| p.as_rule() == Rule::pattern)
        .map(parse_pattern)
        .collect()
}

fn parse_pattern(pair: Pair<Rule>) -> ParseResult<Pattern> {
    let mut start = None;
    let mut steps = Vec::new();
    let mut pending_rel = None;

    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::node_pattern => {
                let node = parse_node_pattern(inner)?;
                match pending_rel.take() {
                    Some(rel) => steps.push((rel, node)),
                    None => start = Some(node),
                }
            }
            Rule::rel_out | Rule::rel_in | Rule::rel_either => {
                pending_rel = Some(parse_rel_pattern(inner)?);
            }
            _ => {}
        }
    }

    Ok(Pattern {
        start: start.ok_or_else(|| ParseError::SemanticError("Pattern without a node".to_string()))?,
        steps,
    })
}

fn parse_node_pattern(pair: Pair<Rule>) -> ParseResult<NodePattern> {
    let mut node = NodePattern::default();
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::variable => node.variable = Some(name_of(&inner)),
            Rule::label => node.label = Some(name_of(&inner)),
            Rule::properties => node.properties = parse_property_pairs(inner)?,
            _ => {}
        }
    }
    Ok(node)
}

fn parse_rel_pattern(pair: Pair<Rule>) -> ParseResult<RelPattern> {
    let direction = match pair.as_rule() {
        Rule::rel_out => Direction::Outgoing,
        Rule::rel_in => Direction::Incoming,
        _ => Direction::Either,
    };
    let mut rel = RelPattern {
        variable: None,
        label: None,
        properties: Vec::new(),
        direction,
    };
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::variable => rel.variable = Some(name_of(&inner)),
            Rule::label => rel.label = Some(name_of(&inner)),
            Rule::properties => rel.properties = parse_property_pairs(inner)?,
            _ => {}
        }
    }
    Ok(rel)
}

fn parse_property_pairs(pair: Pair<Rule>) -> ParseResult<Vec<(String, Expr)>> {
    let mut props = Vec::new();
    for prop in pair.into_inner().filter(|p| p.as_rule() == Rule::property_pair) {
        let mut key = None;
        let mut value = None;
        for inner in prop.into_inner() {
            match inner.as_rule() {
                Rule::prop_key => key = Some(name_of(&inner)),
                Rule::expression => value = Some(parse_expression(inner)?),
                _ => {}
            }
        }
        match (key, value) {
            (Some(k), Some(v)) => props.push((k, v)),
            _ => return Err(ParseError::SemanticError("Invalid property".to_string())),
        }
    }
    Ok(props)
}

fn parse_set_item(pair: Pair<Rule>) -> ParseResult<SetItem> {
    let mut target = None;
    let mut value = None;
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::property_access => target = Some(parse_property_access(inner)?),
            Rule::expression => value = Some(parse_expression(inner)?),
            _ => {}
        }
    }
    match (target, value) {
        (Some((variable, key)), Some(value)) => Ok(SetItem { variable, key, value }),
        _ => Err(ParseError::SemanticError("Invalid SET item".to_string())),
    }
}

fn parse_return_clause(pair: Pair<Rule>) -> ParseResult<ReturnClause> {
    let mut items = Vec::new();
    let mut limit = None;

    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::return_item => items.push(parse_return_item(inner)?),
            Rule::limit_clause => {
                let n = inner
                    .into_inner()
                    .find(|p| p.as_rule() == Rule::integer)
                    .ok_or_else(|| ParseError::SemanticError("Missing LIMIT".to_string()))?;
                limit = Some(
                    n.as_str()
                        .parse::<usize>()
                        .map_err(|e| ParseError::SemanticError(format!("Invalid LIMIT: {}", e)))?,
                );
            }
            _ => {}
        }
    }

    Ok(ReturnClause { items, limit })
}

fn parse_return_item(pair: Pair<Rule>) -> ParseResult<ReturnItem> {
    let mut expression = None;
    let mut alias = None;

    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::expression => {
                let text = inner.as_str().trim().to_string();
                expression = Some((parse_expression(inner)?, text));
            }
            Rule::variable => alias = Some(name_of(&inner)),
            _ => {}
        }
    }

    let (expr, text) =
        expression.ok_or_else(|| ParseError::SemanticError("Missing expression in RETURN".to_string()))?;
    Ok(ReturnItem {
        expr,
        name: alias.unwrap_or(text),
    })
}

fn parse_expression(pair: Pair<Rule>) -> ParseResult<Expr> {
    PRATT_PARSER
        .map_primary(parse_primary)
        .map_prefix(|op, rhs| match op.as_rule() {
            Rule::not_op => Ok(Expr::Not(Box::new(rhs?))),
            other => Err(ParseError::SemanticError(format!("Unexpected prefix: {:?}", other))),
        })
        .map_infix(|left, op, right| {
            let left = left?;
            let right = right?;

            let op = match op.as_rule() {
                Rule::or_op => BinaryOp::Or,
                Rule::and_op => BinaryOp::And,
                Rule::comparison_op => parse_op_str(op.as_str())?,
                _ => return Err(ParseError::SemanticError(format!("Unexpected operator: {:?}", op.as_rule()))),
            };

            Ok(Expr::Binary {
                left: Box::new(left),
                op,
                right: Box::new(right),
            })
        })
        .parse(pair.into_inner())
}

fn parse_op_str(op_str: &str) -> ParseResult<BinaryOp> {
    Ok(match op_str {
        "=" => BinaryOp::Eq,
        "<>" => BinaryOp::Ne,
        "<" => BinaryOp::Lt,
        "<=" => BinaryOp::Le,
        ">" => BinaryOp::Gt,
        ">=" => BinaryOp::Ge,
        _ => return Err(ParseError::SemanticError(format!("Unknown operator: {}", op_str))),
    })
}

fn parse_primary(pair: Pair<Rule>) -> ParseResult<Expr> {
    match pair.as_rule() {
        Rule::string_lit => {
            let raw = pair.into_inner().next().map(|p| p.as_str()).unwrap_or("");
            Ok(Expr::Literal(NativeValue::String(unescape(raw))))
        }
        Rule::integer_lit => pair
            .as_str()
            .parse::<i64>()
            .map(|i| Expr::Literal(NativeValue::Int64(i)))
            .map_err(|e| ParseError::SemanticError(format!("Invalid integer {}: {}", pair.as_str(), e))),
        Rule::float_lit => pair
            .as_str()
            .parse::<f64>()
            .map(|f| Expr::Literal(NativeValue::Double(f)))
            .map_err(|e| ParseError::SemanticError(format!("Invalid float {}: {}", pair.as_str(), e))),
        Rule::bool_lit => Ok(Expr::Literal(NativeValue::Bool(
            pair.as_str().eq_ignore_ascii_case("true"),
        ))),
        Rule::null_lit => Ok(Expr::Literal(NativeValue::Null(LogicalType::Any))),
        Rule::parameter => {
            let name = pair
                .into_inner()
                .next()
                .map(|p| p.as_str().to_string())
                .ok_or_else(|| ParseError::SemanticError("Empty parameter name".to_string()))?;
            Ok(Expr::Parameter(name))
        }
        Rule::property_access => {
            let (variable, key) = parse_property_access(pair)?;
            Ok(Expr::Property(variable, key))
        }
        Rule::variable => Ok(Expr::Variable(name_of(&pair))),
        Rule::list_literal => pair
            .into_inner()
            .filter(|p| p.as_rule() == Rule::expression)
            .map(parse_expression)
            .collect::<ParseResult<Vec<_>>>()
            .map(Expr::List),
        Rule::map_literal => parse_property_pairs(pair).map(Expr::Map),
        Rule::expression => parse_expression(pair),
        other => Err(ParseError::SemanticError(format!("Unexpected expression: {:?}", other))),
    }
}

fn parse_property_access(pair: Pair<Rule>) -> ParseResult<(String, String)> {
    let mut variable = None;
    let mut key = None;
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::variable => variable = Some(name_of(&inner)),
            Rule::prop_key => key = Some(name_of(&inner)),
            _ => {}
        }
    }
    match (variable, key) {
        (Some(v), Some(k)) => Ok((v, k)),
        _ => Err(ParseError::SemanticError("Invalid property access".to_string())),
    }
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(text: &str) -> QueryCommand {
        match parse_command(text).unwrap() {
            Command::Query(q) => q,
            other => panic!("expected query, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_create_node_table() {
        let cmd = parse_command("CREATE NODE TABLE Person (id STRING, name STRING, age INT64, PRIMARY KEY (id))").unwrap();
        match cmd {
            Command::CreateNodeTable { name, columns, primary_key } => {
                assert_eq!(name, "Person");
                assert_eq!(primary_key, "id");
                assert_eq!(columns.len(), 3);
                assert_eq!(columns[2].ty, LogicalType::Int64);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_node_table_requires_primary_key() {
        assert!(parse_command("CREATE NODE TABLE Person (id STRING)").is_err());
    }

    #[test]
    fn test_parse_create_rel_table() {
        let cmd = parse_command("create rel table KNOWS (FROM Person TO Person, id STRING, since INT64)").unwrap();
        assert_eq!(
            cmd,
            Command::CreateRelTable {
                name: "KNOWS".to_string(),
                from: "Person".to_string(),
                to: "Person".to_string(),
                columns: vec![
                    ColumnDef { name: "id".to_string(), ty: LogicalType::String },
                    ColumnDef { name: "since".to_string(), ty: LogicalType::Int64 },
                ],
            }
        );
    }

    #[test]
    fn test_parse_alter_and_drop() {
        assert_eq!(
            parse_command("ALTER TABLE Person RENAME TO Human").unwrap(),
            Command::AlterTable { name: "Person".to_string(), action: AlterAction::RenameTable("Human".to_string()) }
        );
        assert_eq!(
            parse_command("ALTER TABLE Person DROP age").unwrap(),
            Command::AlterTable { name: "Person".to_string(), action: AlterAction::DropColumn("age".to_string()) }
        );
        assert!(matches!(
            parse_command("ALTER TABLE Person ADD active BOOLEAN").unwrap(),
            Command::AlterTable { action: AlterAction::AddColumn(ColumnDef { ty: LogicalType::Bool, .. }), .. }
        ));
        assert_eq!(parse_command("DROP TABLE Person;").unwrap(), Command::DropTable { name: "Person".to_string() });
    }

    #[test]
    fn test_parse_call() {
        assert!(matches!(
            parse_command("CALL SHOW_TABLES() RETURN name").unwrap(),
            Command::Call { procedure: Procedure::ShowTables, returns: Some(_) }
        ));
        assert!(parse_command("CALL SHOW_TABLES('x')").is_err());
        let cmd = parse_command("CALL TABLE_INFO('Person') RETURN name, type").unwrap();
        match cmd {
            Command::Call { procedure: Procedure::TableInfo(arg), returns: Some(ret) } => {
                assert_eq!(arg, Expr::Literal(NativeValue::String("Person".to_string())));
                assert_eq!(ret.items.len(), 2);
                assert_eq!(ret.items[1].name, "type");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_match_return() {
        let q = query("MATCH (p:Person) RETURN p.name AS name, p.age");
        assert_eq!(q.patterns.len(), 1);
        assert_eq!(q.patterns[0].start.label.as_deref(), Some("Person"));
        let ret = q.returns.unwrap();
        assert_eq!(ret.items[0].name, "name");
        assert_eq!(ret.items[1].name, "p.age");
        assert_eq!(ret.items[1].expr, Expr::Property("p".to_string(), "age".to_string()));
    }

    #[test]
    fn test_parse_relationship_directions() {
        let q = query("MATCH (a)-[r:KNOWS]->(b)<-[:LIKES]-(c)-[]-(d) RETURN a");
        let steps = &q.patterns[0].steps;
        assert_eq!(steps.len(), 3);
        assert_eq!(steps[0].0.direction, Direction::Outgoing);
        assert_eq!(steps[0].0.variable.as_deref(), Some("r"));
        assert_eq!(steps[1].0.direction, Direction::Incoming);
        assert_eq!(steps[1].0.label.as_deref(), Some("LIKES"));
        assert_eq!(steps[2].0.direction, Direction::Either);
        assert_eq!(steps[2].1.variable.as_deref(), Some("d"));

        let anonymous = query("MATCH ()-->() RETURN 1");
        assert_eq!(anonymous.patterns[0].steps[0].0.direction, Direction::Outgoing);
    }

    #[test]
    fn test_parse_match_create_with_parameters() {
        let q = query(
            "MATCH (a:Person {id: $src}), (b:Person {id: $dst}) \
             CREATE (a)-[r:KNOWS {id: $id, since: $p0}]->(b) RETURN r.id AS id",
        );
        assert_eq!(q.patterns.len(), 2);
        assert_eq!(q.patterns[0].start.properties[0].1, Expr::Parameter("src".to_string()));
        match q.update {
            Some(UpdateClause::Create(patterns)) => {
                assert_eq!(patterns[0].steps[0].0.properties.len(), 2);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_set_and_delete() {
        let q = query("MATCH (n:Person {id: 'x'}) SET n.name = 'A', n.age = 3");
        match q.update {
            Some(UpdateClause::Set(items)) => {
                assert_eq!(items.len(), 2);
                assert_eq!(items[1].key, "age");
            }
            other => panic!("unexpected {:?}", other),
        }

        let q = query("MATCH (n) DETACH DELETE n");
        assert_eq!(q.update, Some(UpdateClause::Delete { detach: true, variables: vec!["n".to_string()] }));
        let q = query("MATCH ()-[r]->() DELETE r");
        assert_eq!(q.update, Some(UpdateClause::Delete { detach: false, variables: vec!["r".to_string()] }));
    }

    #[test]
    fn test_parse_where_precedence() {
        let q = query("MATCH (n) WHERE NOT n.a = 1 OR n.b <> 'x' AND n.c >= 2.5 RETURN n");
        match q.filter.unwrap() {
            Expr::Binary { op: BinaryOp::Or, left, right } => {
                assert!(matches!(*left, Expr::Not(_)));
                assert!(matches!(*right, Expr::Binary { op: BinaryOp::And, .. }));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_literals() {
        let q = query("CREATE (n:T {s: 'it\\'s', d: \"q\\\"d\", i: -7, f: 1.5, b: TRUE, z: null, l: [1, 2], m: {k: 'v'}})");
        let props = match q.update {
            Some(UpdateClause::Create(p)) => p[0].start.properties.clone(),
            other => panic!("unexpected {:?}", other),
        };
        assert_eq!(props[0].1, Expr::Literal(NativeValue::String("it's".to_string())));
        assert_eq!(props[1].1, Expr::Literal(NativeValue::String("q\"d".to_string())));
        assert_eq!(props[2].1, Expr::Literal(NativeValue::Int64(-7)));
        assert_eq!(props[3].1, Expr::Literal(NativeValue::Double(1.5)));
        assert_eq!(props[4].1, Expr::Literal(NativeValue::Bool(true)));
        assert_eq!(props[5].1, Expr::Literal(NativeValue::Null(LogicalType::Any)));
        assert!(matches!(&props[6].1, Expr::List(items) if items.len() == 2));
        assert!(matches!(&props[7].1, Expr::Map(items) if items.len() == 1));
    }

    #[test]
    fn test_keywords_are_not_identifier_prefixes() {
        let q = query("MATCH (note:Note) WHERE note.order = 1 RETURN note.notes AS notes LIMIT 3");
        assert_eq!(q.patterns[0].start.variable.as_deref(), Some("note"));
        assert_eq!(q.returns.unwrap().limit, Some(3));
    }

    #[test]
    fn test_injection_attempt_is_a_single_string() {
        let q = query("MATCH (n {name: 'x\\' }) DETACH DELETE n //'}) RETURN n");
        assert!(q.update.is_none());
        assert!(q.returns.is_some());
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(parse_command("MATCH (n RETURN n").is_err());
        assert!(parse_command("SELECT * FROM t").is_err());
        assert!(parse_command("").is_err());
    }
}
