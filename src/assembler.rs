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

//! Statement assembler
//!
//! Groups the physical lines of a dump into units: INSERT statements,
//! possibly spread over several lines, and every other line on its own.

use log::trace;

/// Shortest line that can start an insert: `INSERT`.
const INSERT_KEYWORD: &[u8] = b"INSERT";

/// One item of work for the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unit {
    /// Written out as is.
    Passthrough(Vec<u8>),
    /// A complete INSERT statement to parse and anonymize.
    Candidate(Vec<u8>),
}

/// Tracks whether the text seen so far ends inside a quoted literal or
/// identifier, so that a `;` inside quotes never ends a statement.
#[derive(Debug, Default, Clone, Copy)]
struct QuoteState {
    quote: Option<u8>,
    escaped: bool,
}

impl QuoteState {
    fn inside(&self) -> bool {
        self.quote.is_some()
    }

    fn scan(&mut self, bytes: &[u8]) {
        for &b in bytes {
            match self.quote {
                Some(_) if self.escaped => self.escaped = false,
                Some(q) if b == b'\\' && q != b'`' => self.escaped = true,
                Some(q) if b == q => self.quote = None,
                Some(_) => {}
                None if b == b'\'' || b == b'"' || b == b'`' => self.quote = Some(b),
                None => {}
            }
        }
    }
}

/// Line-by-line statement assembler.
#[derive(Debug, Default)]
pub struct StatementAssembler {
    accumulating: bool,
    buffer: Vec<u8>,
    quotes: QuoteState,
}

impl StatementAssembler {
    pub fn new() -> Self {
        StatementAssembler::default()
    }

    /// True while an insert has started but not yet seen its `;`.
    pub fn is_accumulating(&self) -> bool {
        self.accumulating
    }

    /// Feed one physical line, including its line terminator if it has one.
    /// Returns the unit the line completes, if any.
    pub fn push_line(&mut self, line: &[u8]) -> Option<Unit> {
        if line.len() >= INSERT_KEYWORD.len()
            && line[..INSERT_KEYWORD.len()].eq_ignore_ascii_case(INSERT_KEYWORD)
        {
            self.accumulating = true;
        }

        if !self.accumulating {
            // Lines too short to be an insert go out untouched.
            if line.len() < INSERT_KEYWORD.len() {
                return Some(Unit::Passthrough(line.to_vec()));
            }
            let mut text = trim(line).to_vec();
            text.push(b'\n');
            return Some(Unit::Passthrough(text));
        }

        let line = line.strip_suffix(b"\n").unwrap_or(line);
        let mut piece = if self.quotes.inside() {
            // The previous line ended inside a literal: the line break and
            // the line's leading whitespace belong to the value.
            self.buffer.push(b'\n');
            self.quotes.scan(b"\n");
            line
        } else {
            trim_start(line)
        };
        self.quotes.scan(piece);
        if !self.quotes.inside() {
            piece = trim_end(piece);
        }
        self.buffer.extend_from_slice(piece);

        if self.quotes.inside() || !piece.ends_with(b";") {
            trace!("statement continues on next line");
            return None;
        }

        self.accumulating = false;
        self.quotes = QuoteState::default();
        Some(Unit::Candidate(std::mem::take(&mut self.buffer)))
    }

    /// End of input. Returns the statement still open, if any; it never saw
    /// its terminating `;`.
    pub fn finish(self) -> Option<Vec<u8>> {
        if self.accumulating && !self.buffer.is_empty() {
            Some(self.buffer)
        } else {
            None
        }
    }
}

fn trim(bytes: &[u8]) -> &[u8] {
    trim_end(trim_start(bytes))
}

fn trim_start(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    &bytes[start..]
}

fn trim_end(bytes: &[u8]) -> &[u8] {
    let end = bytes
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(0, |i| i + 1);
    &bytes[..end]
}
