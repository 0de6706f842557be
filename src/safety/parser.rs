//! Parser-backed SQL gate.
//!
//! Uses sqlparser-rs with the MySQL dialect. Runs the keyword gate first, so
//! it never allows anything the keyword gate rejects, then requires exactly
//! one statement that is a pure query all the way down.

use sqlparser::ast::{Query, Select, SetExpr, Statement, TableFactor, TableWithJoins};
use sqlparser::dialect::MySqlDialect;
use sqlparser::parser::Parser;
use tracing::debug;

use super::{KeywordValidator, QueryValidator, Rejection, RejectionReason, ValidationVerdict};

/// Keyword gate plus a single-statement, read-only parse check.
#[derive(Debug)]
pub struct StrictValidator {
    keywords: KeywordValidator,
    dialect: MySqlDialect,
}

impl Default for StrictValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl StrictValidator {
    /// Creates a new strict validator.
    pub fn new() -> Self {
        Self {
            keywords: KeywordValidator::new(),
            dialect: MySqlDialect {},
        }
    }

    fn check_parsed(&self, sql: &str) -> Option<Rejection> {
        let statements = match Parser::parse_sql(&self.dialect, sql) {
            Ok(statements) => statements,
            Err(e) => {
                return Some(Rejection::with_keyword(
                    RejectionReason::Unparseable,
                    e.to_string(),
                ))
            }
        };

        match statements.as_slice() {
            [] => Some(Rejection::new(RejectionReason::Unparseable)),
            [statement] => check_statement(statement),
            _ => Some(Rejection::new(RejectionReason::MultipleStatements)),
        }
    }
}

impl QueryValidator for StrictValidator {
    fn validate(&self, candidate: &str) -> ValidationVerdict {
        let verdict = self.keywords.validate(candidate);
        if !verdict.is_allowed() {
            return verdict;
        }

        match self.check_parsed(candidate) {
            Some(rejection) => {
                debug!("Strict gate rejected candidate: {}", rejection.reason);
                ValidationVerdict::Rejected(rejection)
            }
            None => verdict,
        }
    }
}

fn not_read_only(kind: &str) -> Option<Rejection> {
    Some(Rejection::with_keyword(RejectionReason::NotReadOnly, kind))
}

fn check_statement(statement: &Statement) -> Option<Rejection> {
    match statement {
        Statement::Query(query) => check_query(query),
        other => not_read_only(statement_kind(other)),
    }
}

fn statement_kind(statement: &Statement) -> &'static str {
    match statement {
        Statement::Insert(_) => "INSERT",
        Statement::Update { .. } => "UPDATE",
        Statement::Delete(_) => "DELETE",
        Statement::Drop { .. } => "DROP",
        Statement::Truncate { .. } => "TRUNCATE",
        Statement::AlterTable { .. } => "ALTER",
        Statement::CreateTable { .. } | Statement::CreateView { .. } => "CREATE",
        Statement::Grant { .. } => "GRANT",
        Statement::Revoke { .. } => "REVOKE",
        _ => "statement",
    }
}

/// Walks CTEs and the query body looking for anything that is not a read.
fn check_query(query: &Query) -> Option<Rejection> {
    if let Some(with) = &query.with {
        if let Some(rejection) = with.cte_tables.iter().find_map(|cte| check_query(&cte.query)) {
            return Some(rejection);
        }
    }
    check_set_expr(&query.body)
}

fn check_set_expr(set_expr: &SetExpr) -> Option<Rejection> {
    match set_expr {
        SetExpr::Select(select) => check_select(select),
        SetExpr::Query(query) => check_query(query),
        SetExpr::SetOperation { left, right, .. } => {
            check_set_expr(left).or_else(|| check_set_expr(right))
        }
        SetExpr::Values(_) | SetExpr::Table(_) => None,
        SetExpr::Insert(stmt) | SetExpr::Update(stmt) => check_statement(stmt),
        #[allow(unreachable_patterns)]
        _ => not_read_only("statement"),
    }
}

fn check_select(select: &Select) -> Option<Rejection> {
    // SELECT ... INTO writes a table or file.
    if select.into.is_some() {
        return not_read_only("SELECT INTO");
    }
    select.from.iter().find_map(check_table_with_joins)
}

fn check_table_with_joins(twj: &TableWithJoins) -> Option<Rejection> {
    check_table_factor(&twj.relation)
        .or_else(|| twj.joins.iter().find_map(|join| check_table_factor(&join.relation)))
}

fn check_table_factor(factor: &TableFactor) -> Option<Rejection> {
    match factor {
        TableFactor::Derived { subquery, .. } => check_query(subquery),
        TableFactor::NestedJoin {
            table_with_joins, ..
        } => check_table_with_joins(table_with_joins),
        _ => None,
    }
}
