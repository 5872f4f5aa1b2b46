// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Turning statement text into a [`Statement`] and back.

use std::error::Error;
use std::fmt::{self, Write};

use crate::ast::Statement;
use crate::dialect::MySqlDialect;
use crate::parser::{Parser, ParserError};

#[derive(Debug, Clone, PartialEq)]
pub enum SerializeError {
    /// An insert whose `VALUES` list is empty.
    NoRows,
    /// Row `index` (0-based) holds no values.
    EmptyRow(usize),
    Format,
}

impl fmt::Display for SerializeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SerializeError::NoRows => write!(f, "insert statement has no rows"),
            SerializeError::EmptyRow(index) => write!(f, "row {} has no values", index),
            SerializeError::Format => write!(f, "statement could not be formatted"),
        }
    }
}

impl Error for SerializeError {}

impl From<fmt::Error> for SerializeError {
    fn from(_: fmt::Error) -> Self {
        SerializeError::Format
    }
}

/// Parses assembled statements and renders them back to SQL.
///
/// Implementations are shared by every pipeline worker.
pub trait SqlEngine: Send + Sync {
    fn parse(&self, sql: &str) -> Result<Statement, ParserError>;

    /// Render `statement` without its terminating `;`.
    fn serialize(&self, statement: &Statement) -> Result<String, SerializeError>;
}

/// The engine for mysqldump output.
#[derive(Debug, Default, Clone, Copy)]
pub struct MySqlEngine {
    dialect: MySqlDialect,
}

impl MySqlEngine {
    pub fn new() -> Self {
        MySqlEngine::default()
    }
}

impl SqlEngine for MySqlEngine {
    fn parse(&self, sql: &str) -> Result<Statement, ParserError> {
        Parser::parse_sql(&self.dialect, sql)
    }

    fn serialize(&self, statement: &Statement) -> Result<String, SerializeError> {
        if let Statement::Insert(insert) = statement {
            if insert.rows.is_empty() {
                return Err(SerializeError::NoRows);
            }
            if let Some(index) = insert.rows.iter().position(|row| row.is_empty()) {
                return Err(SerializeError::EmptyRow(index));
            }
        }
        let mut sql = String::new();
        write!(sql, "{}", statement)?;
        Ok(sql)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Ident, Insert, ObjectName};
    use matches::assert_matches;

    fn round_trip(sql: &str) -> String {
        let engine = MySqlEngine::new();
        let statement = engine.parse(sql).unwrap();
        engine.serialize(&statement).unwrap()
    }

    #[test]
    fn canonical_insert() {
        assert_eq!(
            round_trip("INSERT INTO `wp_users` VALUES (1,'alice');"),
            "insert into wp_users values (1, 'alice')"
        );
    }

    #[test]
    fn escapes_survive() {
        assert_eq!(
            round_trip(r#"INSERT INTO `wp_comments` VALUES (1,'Hi.\nBye <a href=\"x\">','it''s');"#),
            r#"insert into wp_comments values (1, 'Hi.\nBye <a href=\"x\">', 'it\'s')"#
        );
    }

    #[test]
    fn other_statement_round_trip() {
        assert_eq!(
            round_trip("DROP TABLE IF EXISTS `wp_options`;"),
            "DROP TABLE IF EXISTS `wp_options`"
        );
    }

    #[test]
    fn insert_without_rows_cannot_be_serialized() {
        let statement = Statement::Insert(Insert {
            replace: false,
            priority: None,
            ignore: false,
            table_name: ObjectName(vec![Ident::new("t")]),
            columns: vec![],
            rows: vec![],
        });
        assert_matches!(
            MySqlEngine::new().serialize(&statement),
            Err(SerializeError::NoRows)
        );
    }

    #[test]
    fn empty_row_cannot_be_serialized() {
        let engine = MySqlEngine::new();
        let statement = engine.parse("INSERT INTO t VALUES (1), ()").unwrap();
        assert_eq!(engine.serialize(&statement), Err(SerializeError::EmptyRow(1)));
    }
}
