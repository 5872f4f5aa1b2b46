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

use std::fmt;
use std::num::NonZeroUsize;

use super::{display_comma_separated, Value};

/// One parenthesized tuple of an insert's `VALUES` list.
///
/// Cells are addressed by 1-indexed column position, the way the pattern
/// catalog refers to them. Access outside the tuple yields `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Row(Vec<Value>);

impl Row {
    pub fn new(values: Vec<Value>) -> Self {
        Row(values)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Value at 1-indexed `position`.
    pub fn get(&self, position: NonZeroUsize) -> Option<&Value> {
        self.0.get(position.get() - 1)
    }

    /// Mutable value at 1-indexed `position`.
    pub fn get_mut(&mut self, position: NonZeroUsize) -> Option<&mut Value> {
        self.0.get_mut(position.get() - 1)
    }

    pub fn values(&self) -> &[Value] {
        &self.0
    }
}

impl From<Vec<Value>> for Row {
    fn from(values: Vec<Value>) -> Self {
        Row(values)
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", display_comma_separated(&self.0))
    }
}
