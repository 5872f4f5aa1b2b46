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

use std::borrow::Cow;
use std::fmt;

/// Primitive SQL values such as number and string
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    /// Numeric literal, as written (sign, decimals, exponent or `0x` prefix)
    Number(String),
    /// 'string value', escapes decoded
    SingleQuotedString(String),
    /// N'string value'
    NationalStringLiteral(String),
    /// X'hex value'
    HexStringLiteral(String),
    /// b'bit value'
    BitStringLiteral(String),
    /// A string with a character set introducer: `_binary 'value'`
    Introduced { charset: String, value: String },
    /// Boolean value true or false
    Boolean(bool),
    /// `NULL` value
    Null,
}

impl Value {
    /// A value with no content: `NULL` or an empty string literal.
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Number(_) | Value::Boolean(_) => false,
            Value::SingleQuotedString(s)
            | Value::NationalStringLiteral(s)
            | Value::HexStringLiteral(s)
            | Value::BitStringLiteral(s)
            | Value::Introduced { value: s, .. } => s.is_empty(),
        }
    }

    /// Literal textual form used to compare a cell with a configured value:
    /// the unescaped content of strings, the source text of numbers.
    pub fn literal(&self) -> Cow<'_, str> {
        match self {
            Value::Number(n) => Cow::Borrowed(n),
            Value::SingleQuotedString(s)
            | Value::NationalStringLiteral(s)
            | Value::HexStringLiteral(s)
            | Value::BitStringLiteral(s)
            | Value::Introduced { value: s, .. } => Cow::Borrowed(s),
            Value::Boolean(true) => Cow::Borrowed("true"),
            Value::Boolean(false) => Cow::Borrowed("false"),
            Value::Null => Cow::Borrowed("NULL"),
        }
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::SingleQuotedString(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::SingleQuotedString(s.to_string())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Number(v) => f.write_str(v),
            Value::SingleQuotedString(v) => write!(f, "'{}'", escape_mysql_string(v)),
            Value::NationalStringLiteral(v) => write!(f, "N'{}'", escape_mysql_string(v)),
            Value::HexStringLiteral(v) => write!(f, "X'{}'", v),
            Value::BitStringLiteral(v) => write!(f, "b'{}'", v),
            Value::Introduced { charset, value } => {
                write!(f, "{} '{}'", charset, escape_mysql_string(value))
            }
            Value::Boolean(v) => write!(f, "{}", v),
            Value::Null => f.write_str("null"),
        }
    }
}

pub struct EscapeMySqlString<'a>(&'a str);

impl<'a> fmt::Display for EscapeMySqlString<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for c in self.0.chars() {
            match c {
                '\0' => f.write_str("\\0")?,
                '\'' => f.write_str("\\'")?,
                '"' => f.write_str("\\\"")?,
                '\u{8}' => f.write_str("\\b")?,
                '\n' => f.write_str("\\n")?,
                '\r' => f.write_str("\\r")?,
                '\t' => f.write_str("\\t")?,
                '\u{1a}' => f.write_str("\\Z")?,
                '\\' => f.write_str("\\\\")?,
                c => write!(f, "{}", c)?,
            }
        }
        Ok(())
    }
}

/// Escape a decoded string the way mysqldump writes string literals.
pub fn escape_mysql_string(s: &str) -> EscapeMySqlString<'_> {
    EscapeMySqlString(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_values() {
        assert!(Value::Null.is_empty());
        assert!(Value::SingleQuotedString(String::new()).is_empty());
        assert!(!Value::SingleQuotedString("x".to_string()).is_empty());
        assert!(!Value::Number("0".to_string()).is_empty());
    }

    #[test]
    fn literal_text() {
        assert_eq!(Value::Number("42".to_string()).literal(), "42");
        assert_eq!(Value::from("first_name").literal(), "first_name");
        assert_eq!(Value::Boolean(true).literal(), "true");
        assert_eq!(Value::Null.literal(), "NULL");
    }

    #[test]
    fn display_escapes_strings() {
        let value = Value::from("it's a \"test\"\nwith \\ and \0");
        assert_eq!(
            value.to_string(),
            r#"'it\'s a \"test\"\nwith \\ and \0'"#
        );
    }

    #[test]
    fn display_other_literals() {
        assert_eq!(Value::HexStringLiteral("CAFE".to_string()).to_string(), "X'CAFE'");
        assert_eq!(Value::BitStringLiteral("01".to_string()).to_string(), "b'01'");
        assert_eq!(
            Value::Introduced {
                charset: "_binary".to_string(),
                value: "raw".to_string()
            }
            .to_string(),
            "_binary 'raw'"
        );
        assert_eq!(Value::Boolean(false).to_string(), "false");
    }
}
