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

//! SQL Abstract Syntax Tree (AST) types

mod row;
mod value;

use std::fmt;

use crate::dialect::keywords;

pub use self::row::Row;
pub use self::value::{escape_mysql_string, EscapeMySqlString, Value};

struct DisplaySeparated<'a, T>
where
    T: fmt::Display,
{
    slice: &'a [T],
    sep: &'static str,
}

impl<'a, T> fmt::Display for DisplaySeparated<'a, T>
where
    T: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut delim = "";
        for t in self.slice {
            write!(f, "{}", delim)?;
            delim = self.sep;
            write!(f, "{}", t)?;
        }
        Ok(())
    }
}

fn display_comma_separated<T>(slice: &[T]) -> DisplaySeparated<'_, T>
where
    T: fmt::Display,
{
    DisplaySeparated { slice, sep: ", " }
}

/// An identifier, decomposed into its value or character data and the quote style.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ident {
    /// The value of the identifier without quotes.
    pub value: String,
    /// The starting quote if any. Valid quote characters are the double quote
    /// and the backtick.
    pub quote_style: Option<char>,
}

impl Ident {
    /// Create a new identifier with the given value and no quotes.
    pub fn new<S>(value: S) -> Self
    where
        S: Into<String>,
    {
        Ident {
            value: value.into(),
            quote_style: None,
        }
    }

    /// True when the identifier can't be written bare and must be backticked.
    fn needs_quotes(&self) -> bool {
        let mut chars = self.value.chars();
        match chars.next() {
            None => true,
            Some(first) if first.is_ascii_digit() => true,
            Some(_) => {
                !self
                    .value
                    .chars()
                    .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '$')
                    || keywords::is_keyword(&self.value.to_uppercase())
            }
        }
    }
}

impl From<&str> for Ident {
    fn from(value: &str) -> Self {
        Ident::new(value)
    }
}

/// Identifiers are written in canonical form: bare when possible, otherwise
/// with MySQL backticks regardless of how the input quoted them.
impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.needs_quotes() {
            write!(f, "`{}`", self.value.replace('`', "``"))
        } else {
            f.write_str(&self.value)
        }
    }
}

/// A name of a table, possibly qualified by its schema, e.g. `db.wp_users`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectName(pub Vec<Ident>);

impl ObjectName {
    /// The unqualified name: the last part of `db.table`.
    pub fn table(&self) -> &str {
        self.0.last().map(|ident| ident.value.as_str()).unwrap_or("")
    }
}

impl fmt::Display for ObjectName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", DisplaySeparated { slice: &self.0, sep: "." })
    }
}

/// Priority modifier of an `INSERT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InsertPriority {
    LowPriority,
    Delayed,
    HighPriority,
}

impl fmt::Display for InsertPriority {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            InsertPriority::LowPriority => "low_priority",
            InsertPriority::Delayed => "delayed",
            InsertPriority::HighPriority => "high_priority",
        })
    }
}

/// `INSERT`/`REPLACE` with a literal `VALUES` list, the only statement kind
/// whose rows get anonymized.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Insert {
    /// `REPLACE INTO` rather than `INSERT INTO`
    pub replace: bool,
    pub priority: Option<InsertPriority>,
    pub ignore: bool,
    pub table_name: ObjectName,
    pub columns: Vec<Ident>,
    pub rows: Vec<Row>,
}

impl fmt::Display for Insert {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(if self.replace { "replace" } else { "insert" })?;
        if let Some(priority) = self.priority {
            write!(f, " {}", priority)?;
        }
        if self.ignore {
            f.write_str(" ignore")?;
        }
        write!(f, " into {}", self.table_name)?;
        if !self.columns.is_empty() {
            write!(f, "({})", display_comma_separated(&self.columns))?;
        }
        f.write_str(" values ")?;
        let mut delim = "";
        for row in &self.rows {
            write!(f, "{}({})", delim, row)?;
            delim = ", ";
        }
        Ok(())
    }
}

/// A top-level statement (INSERT, or anything else the parser passes along)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Statement {
    Insert(Insert),
    /// Any other statement, with whitespace runs collapsed and comments
    /// removed.
    Other(String),
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Statement::Insert(insert) => write!(f, "{}", insert),
            Statement::Other(sql) => f.write_str(sql),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn insert(rows: Vec<Row>) -> Insert {
        Insert {
            replace: false,
            priority: None,
            ignore: false,
            table_name: ObjectName(vec![Ident::new("wp_users")]),
            columns: vec![],
            rows,
        }
    }

    #[test]
    fn display_insert() {
        let stmt = Statement::Insert(insert(vec![
            Row::new(vec![
                Value::Number("1".to_string()),
                Value::SingleQuotedString("alice".to_string()),
            ]),
            Row::new(vec![Value::Number("2".to_string()), Value::Null]),
        ]));
        assert_eq!(
            stmt.to_string(),
            "insert into wp_users values (1, 'alice'), (2, null)"
        );
    }

    #[test]
    fn display_insert_with_modifiers_and_columns() {
        let mut stmt = insert(vec![Row::new(vec![Value::Number("1".to_string())])]);
        stmt.ignore = true;
        stmt.priority = Some(InsertPriority::LowPriority);
        stmt.columns = vec![Ident::new("id")];
        assert_eq!(
            stmt.to_string(),
            "insert low_priority ignore into wp_users(id) values (1)"
        );
    }

    #[test]
    fn identifiers_are_quoted_only_when_needed() {
        assert_eq!(Ident::new("wp_users").to_string(), "wp_users");
        assert_eq!(Ident::new("order table").to_string(), "`order table`");
        assert_eq!(Ident::new("key").to_string(), "`key`");
        assert_eq!(Ident::new("1st").to_string(), "`1st`");
        assert_eq!(Ident::new("we`ird").to_string(), "`we``ird`");
    }

    #[test]
    fn qualified_table_name() {
        let name = ObjectName(vec![Ident::new("shop"), Ident::new("wp_users")]);
        assert_eq!(name.table(), "wp_users");
        assert_eq!(name.to_string(), "shop.wp_users");
    }
}
