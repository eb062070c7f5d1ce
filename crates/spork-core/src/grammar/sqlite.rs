//! SQLite grammar.

use super::Grammar;

/// Double-quote grammar for SQLite.
///
/// SQLite also accepts backticks, so [`super::MySqlGrammar`] works against
/// it too; this grammar emits the standard quote instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteGrammar;

impl Grammar for SqliteGrammar {
    fn name(&self) -> &'static str {
        "SQLite"
    }

    fn identifier_quote(&self) -> char {
        '"'
    }
}
