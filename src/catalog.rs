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

//! Pattern catalog
//!
//! The catalog is the JSON configuration listing, per table, which row
//! positions to replace and with what kind of generated value:
//!
//! ```json
//! { "patterns": [ { "tableName": "wp_users", "fields": [
//!     { "field": "user_login", "position": 2, "type": "username" } ] } ] }
//! ```
//!
//! It is loaded once at start-up and never mutated afterwards.

use std::error::Error;
use std::fmt;
use std::fs;
use std::io;
use std::num::NonZeroUsize;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::generator::Registry;

/// The WordPress catalog shipped as `config.example.json`.
const WORDPRESS_EXAMPLE: &str = include_str!("../config.example.json");

#[derive(Debug)]
pub enum CatalogError {
    Io(io::Error),
    Json(serde_json::Error),
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CatalogError::Io(e) => write!(f, "could not read catalog: {}", e),
            CatalogError::Json(e) => write!(f, "invalid catalog: {}", e),
        }
    }
}

impl Error for CatalogError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            CatalogError::Io(e) => Some(e),
            CatalogError::Json(e) => Some(e),
        }
    }
}

impl From<io::Error> for CatalogError {
    fn from(e: io::Error) -> Self {
        CatalogError::Io(e)
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(e: serde_json::Error) -> Self {
        CatalogError::Json(e)
    }
}

/// Ordered list of table patterns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub patterns: Vec<TablePattern>,
}

/// Rules for the rows inserted into one table. Several patterns may name
/// the same table; all of them apply, in catalog order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TablePattern {
    pub table_name: String,
    #[serde(default)]
    pub fields: Vec<FieldRule>,
}

/// Replace the value at `position` with a generated value of type `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldRule {
    /// Column name, for humans only.
    #[serde(rename = "field", default)]
    pub label: String,
    /// 1-indexed column position within the row.
    pub position: NonZeroUsize,
    /// Generator tag looked up in the [`Registry`].
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub constraints: Vec<ConstraintRule>,
}

/// The row's value at `position` must read exactly `expected`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintRule {
    #[serde(rename = "field", default)]
    pub label: String,
    pub position: NonZeroUsize,
    #[serde(rename = "value")]
    pub expected: String,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

impl Catalog {
    /// Read and parse a catalog file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let json = fs::read_to_string(path)?;
        json.parse()
    }

    /// The WordPress example catalog.
    pub fn wordpress_example() -> Self {
        // The example is checked by `wordpress_example_parses`.
        serde_json::from_str(WORDPRESS_EXAMPLE).unwrap_or_default()
    }

    /// Patterns governing `table_name`, in catalog order.
    pub fn patterns_for<'a>(
        &'a self,
        table_name: &'a str,
    ) -> impl Iterator<Item = &'a TablePattern> + 'a {
        self.patterns
            .iter()
            .filter(move |pattern| pattern.table_name == table_name)
    }

    /// Describe every rule whose type has no generator in `registry`.
    /// Such rules never fire; callers usually log the result at start-up.
    pub fn unknown_types(&self, registry: &Registry) -> Vec<String> {
        self.patterns
            .iter()
            .flat_map(|pattern| {
                pattern
                    .fields
                    .iter()
                    .filter(|rule| !registry.contains(&rule.kind))
                    .map(move |rule| {
                        format!(
                            "{}.{} (position {}) uses unknown type {:?}",
                            pattern.table_name, rule.label, rule.position, rule.kind
                        )
                    })
            })
            .collect()
    }
}

impl FromStr for Catalog {
    type Err = CatalogError;

    fn from_str(json: &str) -> Result<Self, Self::Err> {
        Ok(serde_json::from_str(json)?)
    }
}
