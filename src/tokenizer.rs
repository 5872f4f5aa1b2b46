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

//! SQL Tokenizer
//!
//! The tokenizer (a.k.a. lexer) converts one assembled statement into a
//! sequence of tokens.
//!
//! The tokens then form the input for the parser, which outputs a
//! [`Statement`](crate::ast::Statement).

use std::fmt;
use std::iter::Peekable;
use std::str::Chars;

use super::ast::escape_mysql_string;
use super::dialect::keywords;
use super::dialect::Dialect;

/// SQL Token enumeration
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// A keyword (like INSERT) or an optionally quoted SQL identifier
    Word(Word),
    /// An unsigned numeric literal, including `0x` hexadecimal numbers
    Number(String),
    /// A character that could not be tokenized
    Char(char),
    /// Single quoted string with escapes already decoded: i.e: 'string'
    SingleQuotedString(String),
    /// "National" string literal: i.e: N'string'
    NationalStringLiteral(String),
    /// Hexadecimal string literal: i.e.: X'deadbeef'
    HexStringLiteral(String),
    /// Bit string literal: i.e.: b'0101'
    BitStringLiteral(String),
    /// Comma
    Comma,
    /// Whitespace (space, tab, etc)
    Whitespace(Whitespace),
    /// Equality operator `=`
    Eq,
    /// Plus operator `+`
    Plus,
    /// Minus operator `-`
    Minus,
    /// Left parenthesis `(`
    LParen,
    /// Right parenthesis `)`
    RParen,
    /// Period (used for compound identifiers)
    Period,
    /// SemiColon `;` used as statement terminator
    SemiColon,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Token::Word(ref w) => write!(f, "{}", w),
            Token::Number(ref n) => f.write_str(n),
            Token::Char(ref c) => write!(f, "{}", c),
            Token::SingleQuotedString(ref s) => write!(f, "'{}'", escape_mysql_string(s)),
            Token::NationalStringLiteral(ref s) => write!(f, "N'{}'", escape_mysql_string(s)),
            Token::HexStringLiteral(ref s) => write!(f, "X'{}'", s),
            Token::BitStringLiteral(ref s) => write!(f, "b'{}'", s),
            Token::Comma => f.write_str(","),
            Token::Whitespace(ws) => write!(f, "{}", ws),
            Token::Eq => f.write_str("="),
            Token::Plus => f.write_str("+"),
            Token::Minus => f.write_str("-"),
            Token::LParen => f.write_str("("),
            Token::RParen => f.write_str(")"),
            Token::Period => f.write_str("."),
            Token::SemiColon => f.write_str(";"),
        }
    }
}

impl Token {
    pub fn make_keyword(keyword: &str) -> Self {
        Token::make_word(keyword, None)
    }

    pub fn make_word(word: &str, quote_style: Option<char>) -> Self {
        let word_uppercase = word.to_uppercase();
        let is_keyword = quote_style.is_none() && keywords::is_keyword(&word_uppercase);
        Token::Word(Word {
            value: word.to_string(),
            quote_style,
            keyword: if is_keyword {
                word_uppercase
            } else {
                String::new()
            },
        })
    }

    /// True for the keyword `keyword` (given in uppercase).
    pub fn is_keyword(&self, keyword: &str) -> bool {
        matches!(self, Token::Word(w) if w.keyword == keyword)
    }
}

/// A keyword (like INSERT) or an optionally quoted SQL identifier
#[derive(Debug, Clone, PartialEq)]
pub struct Word {
    /// The value of the token, without the enclosing quotes
    pub value: String,
    /// An identifier can be "quoted" (&lt;delimited identifier> in ANSI parlance).
    /// mysqldump uses backticks, ANSI mode uses double quotes.
    pub quote_style: Option<char>,
    /// If the word was not quoted and it matched one of the known keywords,
    /// this will have one of the values from dialect::keywords, otherwise empty
    pub keyword: String,
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.quote_style {
            Some(s) => write!(f, "{}{}{}", s, self.value, s),
            None => f.write_str(&self.value),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Whitespace {
    Space,
    Newline,
    Tab,
    SingleLineComment(String),
    MultiLineComment(String),
}

impl fmt::Display for Whitespace {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Whitespace::Space => f.write_str(" "),
            Whitespace::Newline => f.write_str("\n"),
            Whitespace::Tab => f.write_str("\t"),
            Whitespace::SingleLineComment(s) => write!(f, "--{}", s),
            Whitespace::MultiLineComment(s) => write!(f, "/*{}*/", s),
        }
    }
}

/// Tokenizer error
#[derive(Debug, Clone, PartialEq)]
pub struct TokenizerError {
    pub message: String,
    pub line: u64,
    pub col: u64,
}

impl fmt::Display for TokenizerError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} at Line: {}, Col: {}", self.message, self.line, self.col)
    }
}

impl std::error::Error for TokenizerError {}

/// SQL Tokenizer
pub struct Tokenizer<'a> {
    dialect: &'a dyn Dialect,
    query: Peekable<Chars<'a>>,
    line: u64,
    col: u64,
}

impl<'a> Tokenizer<'a> {
    /// Create a new SQL tokenizer for the specified SQL statement
    pub fn new(dialect: &'a dyn Dialect, query: &'a str) -> Self {
        Self {
            dialect,
            query: query.chars().peekable(),
            line: 1,
            col: 1,
        }
    }

    /// Tokenize the whole statement.
    pub fn tokenize(&mut self) -> Result<Vec<Token>, TokenizerError> {
        let mut tokens = vec![];
        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }
        Ok(tokens)
    }

    /// Get the next token or return None
    fn next_token(&mut self) -> Result<Option<Token>, TokenizerError> {
        match self.query.peek() {
            Some(&ch) => match ch {
                ' ' => self.consume_and_return(Token::Whitespace(Whitespace::Space)),
                '\t' => self.consume_and_return(Token::Whitespace(Whitespace::Tab)),
                '\n' => self.consume_and_return(Token::Whitespace(Whitespace::Newline)),
                '\r' => {
                    // Emit a single Whitespace::Newline token for \r and \r\n
                    self.next_char();
                    if let Some('\n') = self.query.peek() {
                        self.next_char();
                    }
                    Ok(Some(Token::Whitespace(Whitespace::Newline)))
                }
                'N' => {
                    self.next_char(); // consume, to check the next char
                    match self.query.peek() {
                        Some('\'') => {
                            // N'...' - a <national character string literal>
                            let s = self.tokenize_single_quoted_string()?;
                            Ok(Some(Token::NationalStringLiteral(s)))
                        }
                        _ => {
                            // regular identifier starting with an "N"
                            let s = self.tokenize_word('N');
                            Ok(Some(Token::make_word(&s, None)))
                        }
                    }
                }
                x @ 'x' | x @ 'X' => {
                    self.next_char(); // consume, to check the next char
                    match self.query.peek() {
                        Some('\'') => {
                            // X'...' - a <binary string literal>
                            let s = self.tokenize_single_quoted_string()?;
                            Ok(Some(Token::HexStringLiteral(s)))
                        }
                        _ => {
                            // regular identifier starting with an "X"
                            let s = self.tokenize_word(x);
                            Ok(Some(Token::make_word(&s, None)))
                        }
                    }
                }
                b @ 'b' | b @ 'B' => {
                    self.next_char();
                    match self.query.peek() {
                        Some('\'') => {
                            let s = self.tokenize_single_quoted_string()?;
                            Ok(Some(Token::BitStringLiteral(s)))
                        }
                        _ => {
                            let s = self.tokenize_word(b);
                            Ok(Some(Token::make_word(&s, None)))
                        }
                    }
                }
                // identifier or keyword
                ch if self.dialect.is_identifier_start(ch) => {
                    self.next_char(); // consume the first char
                    let s = self.tokenize_word(ch);
                    Ok(Some(Token::make_word(&s, None)))
                }
                // string
                '\'' => {
                    let s = self.tokenize_single_quoted_string()?;
                    Ok(Some(Token::SingleQuotedString(s)))
                }
                // delimited (quoted) identifier
                quote_start if self.dialect.is_delimited_identifier_start(quote_start) => {
                    self.next_char(); // consume the opening quote
                    let s = self.peeking_take_while(|ch| ch != quote_start);
                    match self.next_char() {
                        Some(ch) if ch == quote_start => {
                            Ok(Some(Token::make_word(&s, Some(quote_start))))
                        }
                        _ => self.error(format!(
                            "Expected close delimiter '{}' before EOF.",
                            quote_start
                        )),
                    }
                }
                // numbers
                '0'..='9' => Ok(Some(self.tokenize_number())),
                // punctuation
                '(' => self.consume_and_return(Token::LParen),
                ')' => self.consume_and_return(Token::RParen),
                ',' => self.consume_and_return(Token::Comma),
                // operators
                '-' => {
                    self.next_char(); // consume the '-'
                    match self.query.peek() {
                        Some('-') => {
                            self.next_char(); // consume the second '-', starting a single-line comment
                            Ok(Some(self.tokenize_single_line_comment()))
                        }
                        // a regular '-' operator
                        _ => Ok(Some(Token::Minus)),
                    }
                }
                '#' => {
                    self.next_char();
                    Ok(Some(self.tokenize_single_line_comment()))
                }
                '/' => {
                    self.next_char(); // consume the '/'
                    match self.query.peek() {
                        Some('*') => {
                            self.next_char(); // consume the '*', starting a multi-line comment
                            self.tokenize_multiline_comment()
                        }
                        _ => Ok(Some(Token::Char('/'))),
                    }
                }
                '+' => self.consume_and_return(Token::Plus),
                '=' => self.consume_and_return(Token::Eq),
                '.' => self.consume_and_return(Token::Period),
                ';' => self.consume_and_return(Token::SemiColon),
                other => self.consume_and_return(Token::Char(other)),
            },
            None => Ok(None),
        }
    }

    /// Tokenize an identifier or keyword, after the first char is already consumed.
    fn tokenize_word(&mut self, first_char: char) -> String {
        let mut s = first_char.to_string();
        let dialect = self.dialect;
        s.push_str(&self.peeking_take_while(|ch| dialect.is_identifier_part(ch)));
        s
    }

    /// Decimal (`12`, `1.5`, `2e-3`) or hexadecimal (`0xFF`) number.
    fn tokenize_number(&mut self) -> Token {
        let mut s = self.peeking_take_while(|ch| ch.is_ascii_digit() || ch == '.');
        if s == "0" {
            if let Some(&x) = self.query.peek() {
                if x == 'x' || x == 'X' {
                    self.next_char();
                    s.push(x);
                    s.push_str(&self.peeking_take_while(|ch| ch.is_ascii_hexdigit()));
                    return Token::Number(s);
                }
            }
        }
        if let Some(&e) = self.query.peek() {
            if e == 'e' || e == 'E' {
                self.next_char();
                s.push(e);
                if let Some(&sign) = self.query.peek() {
                    if sign == '+' || sign == '-' {
                        self.next_char();
                        s.push(sign);
                    }
                }
                s.push_str(&self.peeking_take_while(|ch| ch.is_ascii_digit()));
            }
        }
        Token::Number(s)
    }

    /// Read a single quoted string, starting with the opening quote, and
    /// decode MySQL escape sequences.
    fn tokenize_single_quoted_string(&mut self) -> Result<String, TokenizerError> {
        let mut s = String::new();
        self.next_char(); // consume the opening quote
        loop {
            match self.next_char() {
                Some('\'') => {
                    if let Some('\'') = self.query.peek() {
                        s.push('\'');
                        self.next_char();
                    } else {
                        return Ok(s);
                    }
                }
                Some('\\') => match self.next_char() {
                    Some(escaped) => push_unescaped(&mut s, escaped),
                    None => break,
                },
                Some(ch) => s.push(ch),
                None => break,
            }
        }
        self.error("Unterminated string literal".to_string())
    }

    fn tokenize_single_line_comment(&mut self) -> Token {
        let mut s = self.peeking_take_while(|ch| ch != '\n');
        if let Some(ch) = self.next_char() {
            s.push(ch);
        }
        Token::Whitespace(Whitespace::SingleLineComment(s))
    }

    fn tokenize_multiline_comment(&mut self) -> Result<Option<Token>, TokenizerError> {
        let mut s = String::new();
        let mut maybe_closing_comment = false;
        loop {
            match self.next_char() {
                Some(ch) => {
                    if maybe_closing_comment {
                        if ch == '/' {
                            break Ok(Some(Token::Whitespace(Whitespace::MultiLineComment(s))));
                        } else {
                            s.push('*');
                        }
                    }
                    maybe_closing_comment = ch == '*';
                    if !maybe_closing_comment {
                        s.push(ch);
                    }
                }
                None => {
                    break self.error("Unexpected EOF while in a multi-line comment".to_string());
                }
            }
        }
    }

    fn consume_and_return(&mut self, t: Token) -> Result<Option<Token>, TokenizerError> {
        self.next_char();
        Ok(Some(t))
    }

    fn next_char(&mut self) -> Option<char> {
        let ch = self.query.next();
        match ch {
            Some('\n') => {
                self.line += 1;
                self.col = 1;
            }
            Some(_) => self.col += 1,
            None => {}
        }
        ch
    }

    fn error<T>(&self, message: String) -> Result<T, TokenizerError> {
        Err(TokenizerError {
            message,
            line: self.line,
            col: self.col,
        })
    }

    /// Read from `chars` until `predicate` returns `false` or EOF is hit.
    /// Return the characters read as String, and keep the first non-matching
    /// char available as `chars.next()`.
    fn peeking_take_while(&mut self, mut predicate: impl FnMut(char) -> bool) -> String {
        let mut s = String::new();
        while let Some(&ch) = self.query.peek() {
            if predicate(ch) {
                self.next_char(); // consume
                s.push(ch);
            } else {
                break;
            }
        }
        s
    }
}

/// Append the decoded text of a backslash escape inside a string literal.
/// `\%` and `\_` keep their backslash, as MySQL does; unknown escapes drop it.
fn push_unescaped(s: &mut String, escaped: char) {
    match escaped {
        '0' => s.push('\0'),
        'b' => s.push('\u{8}'),
        'n' => s.push('\n'),
        'r' => s.push('\r'),
        't' => s.push('\t'),
        'Z' => s.push('\u{1a}'),
        '%' | '_' => {
            s.push('\\');
            s.push(escaped);
        }
        other => s.push(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::MySqlDialect;

    fn tokenize(sql: &str) -> Result<Vec<Token>, TokenizerError> {
        let dialect = MySqlDialect {};
        Tokenizer::new(&dialect, sql).tokenize()
    }

    fn significant(sql: &str) -> Vec<Token> {
        tokenize(sql)
            .unwrap()
            .into_iter()
            .filter(|t| !matches!(t, Token::Whitespace(_)))
            .collect()
    }

    #[test]
    fn tokenize_insert() {
        let tokens = significant("INSERT INTO `wp_users` VALUES (1,'alice');");
        assert_eq!(
            tokens,
            vec![
                Token::make_keyword("INSERT"),
                Token::make_keyword("INTO"),
                Token::make_word("wp_users", Some('`')),
                Token::make_keyword("VALUES"),
                Token::LParen,
                Token::Number("1".to_string()),
                Token::Comma,
                Token::SingleQuotedString("alice".to_string()),
                Token::RParen,
                Token::SemiColon,
            ]
        );
    }

    #[test]
    fn tokenize_string_escapes() {
        let tokens = significant(r#"'it\'s' 'a''b' 'line\nbreak' 'q\"x' 'back\\slash'"#);
        assert_eq!(
            tokens,
            vec![
                Token::SingleQuotedString("it's".to_string()),
                Token::SingleQuotedString("a'b".to_string()),
                Token::SingleQuotedString("line\nbreak".to_string()),
                Token::SingleQuotedString("q\"x".to_string()),
                Token::SingleQuotedString("back\\slash".to_string()),
            ]
        );
    }

    #[test]
    fn tokenize_numbers() {
        let tokens = significant("12 1.5 2e-3 0xFF");
        assert_eq!(
            tokens,
            vec![
                Token::Number("12".to_string()),
                Token::Number("1.5".to_string()),
                Token::Number("2e-3".to_string()),
                Token::Number("0xFF".to_string()),
            ]
        );
    }

    #[test]
    fn tokenize_prefixed_literals() {
        let tokens = significant("X'DEAD' b'01' N'nat' name");
        assert_eq!(
            tokens,
            vec![
                Token::HexStringLiteral("DEAD".to_string()),
                Token::BitStringLiteral("01".to_string()),
                Token::NationalStringLiteral("nat".to_string()),
                Token::make_word("name", None),
            ]
        );
    }

    #[test]
    fn tokenize_comments() {
        let tokens = tokenize("-- hello\n# hash\n/* multi */").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Whitespace(Whitespace::SingleLineComment(" hello\n".to_string())),
                Token::Whitespace(Whitespace::SingleLineComment(" hash\n".to_string())),
                Token::Whitespace(Whitespace::MultiLineComment(" multi ".to_string())),
            ]
        );
    }

    #[test]
    fn unterminated_string_is_an_error() {
        let err = tokenize("INSERT INTO t VALUES ('abc").unwrap_err();
        assert_eq!(err.message, "Unterminated string literal");
    }

    #[test]
    fn unterminated_identifier_is_an_error() {
        assert!(tokenize("INSERT INTO `t VALUES (1)").is_err());
    }
}
