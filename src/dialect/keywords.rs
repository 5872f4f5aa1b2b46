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

//! Keywords the tokenizer recognizes. Anything not listed here is a plain
//! identifier. The list must stay sorted so lookups can use binary search.

pub const ALL_KEYWORDS: &[&str] = &[
    "ALTER",
    "AND",
    "AS",
    "BY",
    "CREATE",
    "DATABASE",
    "DEFAULT",
    "DELAYED",
    "DELETE",
    "DROP",
    "DUPLICATE",
    "EXISTS",
    "FALSE",
    "FROM",
    "HIGH_PRIORITY",
    "IF",
    "IGNORE",
    "INSERT",
    "INTO",
    "KEY",
    "LOCK",
    "LOW_PRIORITY",
    "NOT",
    "NULL",
    "ON",
    "OR",
    "REPLACE",
    "SELECT",
    "SET",
    "TABLE",
    "TABLES",
    "TRUE",
    "UNLOCK",
    "UPDATE",
    "USE",
    "VALUE",
    "VALUES",
    "WHERE",
    "WRITE",
];

/// Returns true if `word` (already uppercased) is a keyword.
pub fn is_keyword(word: &str) -> bool {
    ALL_KEYWORDS.binary_search(&word).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_are_sorted() {
        let mut sorted = ALL_KEYWORDS.to_vec();
        sorted.sort_unstable();
        assert_eq!(sorted, ALL_KEYWORDS);
    }

    #[test]
    fn lookup() {
        assert!(is_keyword("INSERT"));
        assert!(is_keyword("VALUES"));
        assert!(!is_keyword("WP_USERS"));
    }
}
