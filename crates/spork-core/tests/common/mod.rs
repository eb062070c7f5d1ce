#![allow(dead_code)]

use spork_core::{Grammar, MySqlGrammar, Query, SqlValue, StatementKind};

pub fn select(query: &Query) -> (String, Vec<SqlValue>) {
    compile(query, StatementKind::Select)
}

pub fn compile(query: &Query, kind: StatementKind) -> (String, Vec<SqlValue>) {
    let sql = MySqlGrammar
        .compile(kind, query)
        .unwrap_or_else(|e| panic!("Failed to compile {kind:?}: {e}"));
    (sql, MySqlGrammar.bind(query, kind))
}

/// Counts `?` outside quoted identifiers.
pub fn placeholders(sql: &str) -> usize {
    let mut quoted = false;
    sql.chars()
        .filter(|c| {
            if *c == '`' {
                quoted = !quoted;
            }
            !quoted && *c == '?'
        })
        .count()
}

pub fn text(s: &str) -> SqlValue {
    SqlValue::Text(String::from(s))
}
