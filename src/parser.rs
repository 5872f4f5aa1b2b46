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

//! SQL Parser

use log::trace;

use super::ast::*;
use super::dialect::keywords;
use super::dialect::Dialect;
use super::tokenizer::*;
use std::error::Error;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum ParserError {
    TokenizerError(String),
    ParserError(String),
}

// Use `Parser::expected` instead, if possible
macro_rules! parser_err {
    ($MSG:expr) => {
        Err(ParserError::ParserError($MSG.to_string()))
    };
}

impl From<TokenizerError> for ParserError {
    fn from(e: TokenizerError) -> Self {
        ParserError::TokenizerError(e.to_string())
    }
}

impl fmt::Display for ParserError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "sql parser error: {}",
            match self {
                ParserError::TokenizerError(s) => s,
                ParserError::ParserError(s) => s,
            }
        )
    }
}

impl Error for ParserError {}

/// SQL Parser
pub struct Parser {
    tokens: Vec<Token>,
    /// The index of the first unprocessed token in `self.tokens`
    index: usize,
}

impl Parser {
    /// Parse the specified tokens
    pub fn new(tokens: Vec<Token>) -> Self {
        Parser { tokens, index: 0 }
    }

    /// Parse one SQL statement, with or without its terminating `;`.
    pub fn parse_sql(dialect: &dyn Dialect, sql: &str) -> Result<Statement, ParserError> {
        let mut tokenizer = Tokenizer::new(dialect, sql);
        let tokens = tokenizer.tokenize()?;
        let mut parser = Parser::new(tokens);
        let statement = parser.parse_statement()?;

        while parser.consume_token(&Token::SemiColon) {}
        if parser.peek_token().is_some() {
            let token = parser.peek_token();
            return parser.expected("end of statement", token);
        }
        Ok(statement)
    }

    /// Parse a single top-level statement, stopping before the statement
    /// separator, if any.
    fn parse_statement(&mut self) -> Result<Statement, ParserError> {
        match self.next_token() {
            Some(Token::Word(ref w)) if w.keyword == "INSERT" => self.parse_insert(false),
            Some(Token::Word(ref w)) if w.keyword == "REPLACE" => self.parse_insert(true),
            Some(_) => {
                self.prev_token();
                Ok(Statement::Other(self.take_normalized()))
            }
            None => parser_err!("Expected a statement, found: EOF"),
        }
    }

    /// Consume the remaining tokens and render them with comments dropped,
    /// whitespace runs collapsed and statement terminators stripped.
    fn take_normalized(&mut self) -> String {
        let mut sql = String::new();
        let mut pending_space = false;
        for token in self.tokens.drain(self.index..) {
            match token {
                Token::Whitespace(_) => pending_space = !sql.is_empty(),
                token => {
                    if pending_space {
                        sql.push(' ');
                        pending_space = false;
                    }
                    sql.push_str(&token.to_string());
                }
            }
        }
        while sql.ends_with(';') || sql.ends_with(' ') {
            sql.pop();
        }
        sql
    }

    /// Parse an INSERT (or REPLACE) statement, the leading keyword already
    /// consumed.
    fn parse_insert(&mut self, replace: bool) -> Result<Statement, ParserError> {
        let priority = if self.parse_keyword("LOW_PRIORITY") {
            Some(InsertPriority::LowPriority)
        } else if self.parse_keyword("DELAYED") {
            Some(InsertPriority::Delayed)
        } else if !replace && self.parse_keyword("HIGH_PRIORITY") {
            Some(InsertPriority::HighPriority)
        } else {
            None
        };
        let ignore = !replace && self.parse_keyword("IGNORE");
        let _ = self.parse_keyword("INTO");

        let table_name = self.parse_object_name()?;
        trace!("parsing insert into {}", table_name);

        let columns = self.parse_parenthesized_column_list()?;

        if !self.parse_keyword("VALUES") && !self.parse_keyword("VALUE") {
            let token = self.peek_token();
            return self.expected("VALUES", token);
        }
        let rows = self.parse_values()?;

        Ok(Statement::Insert(Insert {
            replace,
            priority,
            ignore,
            table_name,
            columns,
            rows,
        }))
    }

    fn parse_values(&mut self) -> Result<Vec<Row>, ParserError> {
        self.parse_comma_separated(|parser| {
            parser.expect_token(&Token::LParen)?;
            if parser.consume_token(&Token::RParen) {
                return Ok(Row::default());
            }
            let values = parser.parse_comma_separated(|parser| parser.parse_value())?;
            parser.expect_token(&Token::RParen)?;
            Ok(Row::new(values))
        })
    }

    /// Parse a literal value (numbers, strings, booleans, null)
    fn parse_value(&mut self) -> Result<Value, ParserError> {
        match self.next_token() {
            Some(t) => match t {
                Token::Word(k) => match k.keyword.as_ref() {
                    "TRUE" => Ok(Value::Boolean(true)),
                    "FALSE" => Ok(Value::Boolean(false)),
                    "NULL" => Ok(Value::Null),
                    "" if k.quote_style.is_none() && k.value.starts_with('_') => {
                        match self.next_token() {
                            Some(Token::SingleQuotedString(value)) => Ok(Value::Introduced {
                                charset: k.value,
                                value,
                            }),
                            other => self.expected("a string after character set introducer", other),
                        }
                    }
                    _ => parser_err!(format!("No value parser for word {}", k)),
                },
                Token::Number(n) => Ok(Value::Number(n)),
                Token::Minus => match self.next_token() {
                    Some(Token::Number(n)) => Ok(Value::Number(format!("-{}", n))),
                    other => self.expected("a number after '-'", other),
                },
                Token::Plus => match self.next_token() {
                    Some(Token::Number(n)) => Ok(Value::Number(n)),
                    other => self.expected("a number after '+'", other),
                },
                Token::SingleQuotedString(s) => Ok(Value::SingleQuotedString(s)),
                Token::NationalStringLiteral(s) => Ok(Value::NationalStringLiteral(s)),
                Token::HexStringLiteral(s) => Ok(Value::HexStringLiteral(s)),
                Token::BitStringLiteral(s) => Ok(Value::BitStringLiteral(s)),
                unexpected => self.expected("a value", Some(unexpected)),
            },
            None => parser_err!("Expecting a value, but found EOF"),
        }
    }

    /// Return the first non-whitespace token that has not yet been processed
    /// (or None if reached end-of-file)
    fn peek_token(&self) -> Option<Token> {
        self.tokens[self.index..]
            .iter()
            .find(|token| !matches!(token, Token::Whitespace(_)))
            .cloned()
    }

    /// Return the first non-whitespace token that has not yet been processed
    /// (or None if reached end-of-file) and mark it as processed. OK to call
    /// repeatedly after reaching EOF.
    fn next_token(&mut self) -> Option<Token> {
        loop {
            match self.tokens.get(self.index) {
                Some(Token::Whitespace(_)) => self.index += 1,
                Some(token) => {
                    self.index += 1;
                    return Some(token.clone());
                }
                None => return None,
            }
        }
    }

    /// Push back the last one non-whitespace token. Must be called after
    /// `next_token()` returned a token.
    fn prev_token(&mut self) {
        loop {
            if self.index == 0 {
                return;
            }
            self.index -= 1;
            match self.tokens.get(self.index) {
                Some(Token::Whitespace(_)) => continue,
                _ => return,
            }
        }
    }

    /// Report unexpected token
    fn expected<T>(&self, expected: &str, found: Option<Token>) -> Result<T, ParserError> {
        parser_err!(format!(
            "Expected {}, found: {}",
            expected,
            found.map_or_else(|| "EOF".to_string(), |t| format!("{}", t))
        ))
    }

    /// Look for an expected keyword and consume it if it exists
    #[must_use]
    fn parse_keyword(&mut self, expected: &'static str) -> bool {
        debug_assert!(keywords::is_keyword(expected));
        match self.peek_token() {
            Some(ref token) if token.is_keyword(expected) => {
                self.next_token();
                true
            }
            _ => false,
        }
    }

    /// Consume the next token if it matches the expected token, otherwise return false
    #[must_use]
    fn consume_token(&mut self, expected: &Token) -> bool {
        match &self.peek_token() {
            Some(t) if *t == *expected => {
                self.next_token();
                true
            }
            _ => false,
        }
    }

    /// Bail out if the current token is not an expected token, or consume it if it is
    fn expect_token(&mut self, expected: &Token) -> Result<(), ParserError> {
        let token = self.peek_token();
        if self.consume_token(expected) {
            Ok(())
        } else {
            self.expected(&expected.to_string(), token)
        }
    }

    /// Parse a comma-separated list of 1+ items accepted by `F`
    fn parse_comma_separated<T, F>(&mut self, mut f: F) -> Result<Vec<T>, ParserError>
    where
        F: FnMut(&mut Parser) -> Result<T, ParserError>,
    {
        let mut values = vec![];
        loop {
            values.push(f(self)?);
            if !self.consume_token(&Token::Comma) {
                break;
            }
        }
        Ok(values)
    }

    /// Parse a possibly qualified, possibly quoted identifier, e.g.
    /// `foo` or `myschema`.`table`
    fn parse_object_name(&mut self) -> Result<ObjectName, ParserError> {
        let mut idents = vec![];
        loop {
            idents.push(self.parse_identifier()?);
            if !self.consume_token(&Token::Period) {
                break;
            }
        }
        Ok(ObjectName(idents))
    }

    /// Parse a simple one-word identifier (possibly quoted, possibly a keyword)
    fn parse_identifier(&mut self) -> Result<Ident, ParserError> {
        match self.next_token() {
            Some(Token::Word(w)) => Ok(w.to_ident()),
            unexpected => self.expected("identifier", unexpected),
        }
    }

    /// Parse an optional parenthesized comma-separated list of unqualified,
    /// possibly quoted identifiers
    fn parse_parenthesized_column_list(&mut self) -> Result<Vec<Ident>, ParserError> {
        if self.consume_token(&Token::LParen) {
            let cols = self.parse_comma_separated(|parser| parser.parse_identifier())?;
            self.expect_token(&Token::RParen)?;
            Ok(cols)
        } else {
            Ok(vec![])
        }
    }
}

impl Word {
    fn to_ident(&self) -> Ident {
        Ident {
            value: self.value.clone(),
            quote_style: self.quote_style,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::MySqlDialect;
    use matches::assert_matches;

    fn parse(sql: &str) -> Result<Statement, ParserError> {
        Parser::parse_sql(&MySqlDialect {}, sql)
    }

    fn parse_insert(sql: &str) -> Insert {
        match parse(sql).unwrap() {
            Statement::Insert(insert) => insert,
            other => panic!("expected an insert, got {:?}", other),
        }
    }

    #[test]
    fn parse_simple_insert() {
        let insert = parse_insert("INSERT INTO `wp_users` VALUES (1,'alice'),(2,'bob');");
        assert_eq!(insert.table_name.table(), "wp_users");
        assert_eq!(insert.rows.len(), 2);
        assert_eq!(
            insert.rows[1].values(),
            &[Value::Number("2".to_string()), Value::from("bob")]
        );
        assert!(!insert.replace);
        assert!(!insert.ignore);
    }

    #[test]
    fn parse_insert_with_columns_and_modifiers() {
        let insert = parse_insert(
            "INSERT LOW_PRIORITY IGNORE INTO shop.`orders` (`id`, `email`) VALUES (1, 'a@b.c')",
        );
        assert_eq!(insert.priority, Some(InsertPriority::LowPriority));
        assert!(insert.ignore);
        assert_eq!(insert.table_name.to_string(), "shop.orders");
        let columns: Vec<&str> = insert.columns.iter().map(|c| c.value.as_str()).collect();
        assert_eq!(columns, vec!["id", "email"]);
        assert_eq!(insert.columns[0].quote_style, Some('`'));
    }

    #[test]
    fn parse_replace() {
        let insert = parse_insert("REPLACE INTO t VALUES (1)");
        assert!(insert.replace);
    }

    #[test]
    fn parse_literal_kinds() {
        let insert = parse_insert(
            "INSERT INTO t VALUES (-1, +2, 1.5e3, 0xFF, NULL, TRUE, false, X'AB', b'1', N'n', _binary 'raw', '')",
        );
        assert_eq!(
            insert.rows[0].values(),
            &[
                Value::Number("-1".to_string()),
                Value::Number("2".to_string()),
                Value::Number("1.5e3".to_string()),
                Value::Number("0xFF".to_string()),
                Value::Null,
                Value::Boolean(true),
                Value::Boolean(false),
                Value::HexStringLiteral("AB".to_string()),
                Value::BitStringLiteral("1".to_string()),
                Value::NationalStringLiteral("n".to_string()),
                Value::Introduced {
                    charset: "_binary".to_string(),
                    value: "raw".to_string()
                },
                Value::from(""),
            ]
        );
    }

    #[test]
    fn parse_multiline_values() {
        let insert = parse_insert(
            "INSERT INTO wp_usermeta VALUES\n\t(1,1,'first_name','John'),\n\t(2,1,'last_name','Doe');",
        );
        assert_eq!(insert.rows.len(), 2);
    }

    #[test]
    fn other_statements_are_normalized() {
        let statement = parse("DROP  TABLE IF EXISTS `wp_options` /* gone */ ;").unwrap();
        assert_eq!(
            statement,
            Statement::Other("DROP TABLE IF EXISTS `wp_options`".to_string())
        );
    }

    #[test]
    fn missing_values_keyword() {
        assert_matches!(
            parse("INSERT INTO t SELECT 1"),
            Err(ParserError::ParserError(_))
        );
    }

    #[test]
    fn unbalanced_row() {
        assert_matches!(
            parse("INSERT INTO t VALUES (1, 'a'"),
            Err(ParserError::ParserError(_))
        );
    }

    #[test]
    fn trailing_garbage() {
        assert_matches!(
            parse("INSERT INTO t VALUES (1) garbage"),
            Err(ParserError::ParserError(_))
        );
    }

    #[test]
    fn tokenizer_errors_surface() {
        assert_matches!(
            parse("INSERT INTO t VALUES ('open"),
            Err(ParserError::TokenizerError(_))
        );
    }

    #[test]
    fn empty_statement() {
        assert!(parse("   ").is_err());
    }
}
