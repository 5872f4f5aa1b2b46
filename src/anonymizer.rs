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

//! Field anonymizer
//!
//! Applies the catalog's field rules to the rows of an insert statement.
//! Rules run sequentially in catalog order, so when two rules target the
//! same position the later one wins.

use std::error::Error;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;

use log::{debug, trace, warn};

use crate::ast::{Row, Statement};
use crate::catalog::{Catalog, ConstraintRule, FieldRule};
use crate::generator::Registry;

/// Why a field rule was not applied. None of these abort the statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleError {
    /// The rule's type has no registered generator.
    UnknownType { table: String, field: String, kind: String },
    /// The rule's target position is past the end of the row.
    PositionOutOfRange {
        table: String,
        field: String,
        row: usize,
        position: NonZeroUsize,
        len: usize,
    },
    /// A constraint looks at a position past the end of the row.
    ConstraintOutOfRange {
        table: String,
        field: String,
        row: usize,
        position: NonZeroUsize,
        len: usize,
    },
}

impl fmt::Display for RuleError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RuleError::UnknownType { table, field, kind } => write!(
                f,
                "no generator for type {:?} (table {}, field {})",
                kind, table, field
            ),
            RuleError::PositionOutOfRange {
                table,
                field,
                row,
                position,
                len,
            } => write!(
                f,
                "position {} of field {} is out of range for row {} of {} ({} values)",
                position, field, row, table, len
            ),
            RuleError::ConstraintOutOfRange {
                table,
                field,
                row,
                position,
                len,
            } => write!(
                f,
                "constraint position {} of field {} is out of range for row {} of {} ({} values)",
                position, field, row, table, len
            ),
        }
    }
}

impl Error for RuleError {}

/// What one anonymization pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnonymizeReport {
    /// Rows visited by at least one matching pattern.
    pub rows: usize,
    pub replaced: usize,
    pub skipped_empty: usize,
    pub skipped_constraint: usize,
    pub errors: Vec<RuleError>,
}

/// The catalog and generators every worker shares.
#[derive(Debug, Clone)]
pub struct FieldAnonymizer {
    catalog: Arc<Catalog>,
    registry: Arc<Registry>,
}

impl FieldAnonymizer {
    pub fn new(catalog: Arc<Catalog>, registry: Arc<Registry>) -> Self {
        FieldAnonymizer { catalog, registry }
    }

    /// Replace the matching values of `statement` in place. Statements other
    /// than inserts are left alone.
    pub fn apply(&self, statement: &mut Statement) -> AnonymizeReport {
        let mut report = AnonymizeReport::default();
        let insert = match statement {
            Statement::Insert(insert) => insert,
            Statement::Other(_) => return report,
        };
        let table = insert.table_name.table().to_string();

        for pattern in self.catalog.patterns_for(&table) {
            report.rows = report.rows.max(insert.rows.len());

            // Unknown types are reported once per statement, not per row.
            let mut unknown_reported = vec![false; pattern.fields.len()];
            for (index, row) in insert.rows.iter_mut().enumerate() {
                for (rule, reported) in pattern.fields.iter().zip(unknown_reported.iter_mut()) {
                    self.apply_rule(&table, index, row, rule, reported, &mut report);
                }
            }
        }

        if report.replaced > 0 || !report.errors.is_empty() {
            debug!(
                "{}: {} rows, {} values replaced, {} rule errors",
                table,
                report.rows,
                report.replaced,
                report.errors.len()
            );
        }
        report
    }

    fn apply_rule(
        &self,
        table: &str,
        index: usize,
        row: &mut Row,
        rule: &FieldRule,
        unknown_reported: &mut bool,
        report: &mut AnonymizeReport,
    ) {
        let current = match row.get(rule.position) {
            Some(value) => value,
            None => {
                let error = RuleError::PositionOutOfRange {
                    table: table.to_string(),
                    field: rule.label.clone(),
                    row: index,
                    position: rule.position,
                    len: row.len(),
                };
                warn!("Skipping field rule: {}", error);
                report.errors.push(error);
                return;
            }
        };

        if current.is_empty() {
            report.skipped_empty += 1;
            return;
        }

        if !self.registry.contains(&rule.kind) {
            if !*unknown_reported {
                *unknown_reported = true;
                let error = RuleError::UnknownType {
                    table: table.to_string(),
                    field: rule.label.clone(),
                    kind: rule.kind.clone(),
                };
                warn!("Skipping field rule: {}", error);
                report.errors.push(error);
            }
            return;
        }

        match row_obeys_constraints(&rule.constraints, row) {
            Ok(true) => {}
            Ok(false) => {
                report.skipped_constraint += 1;
                return;
            }
            Err(position) => {
                let error = RuleError::ConstraintOutOfRange {
                    table: table.to_string(),
                    field: rule.label.clone(),
                    row: index,
                    position,
                    len: row.len(),
                };
                warn!("Skipping field rule: {}", error);
                report.errors.push(error);
                return;
            }
        }

        let replacement = match self.registry.generate(&rule.kind, current) {
            Some(value) => value,
            None => return,
        };
        if let Some(slot) = row.get_mut(rule.position) {
            trace!(
                "{} row {}: {} ({}) replaced",
                table,
                index,
                rule.label,
                rule.position
            );
            *slot = replacement;
            report.replaced += 1;
        }
    }
}

/// True when every constraint holds for `row`. `Err` carries the first
/// constraint position that lies outside the row.
fn row_obeys_constraints(
    constraints: &[ConstraintRule],
    row: &Row,
) -> Result<bool, NonZeroUsize> {
    for constraint in constraints {
        let value = row.get(constraint.position).ok_or(constraint.position)?;
        let literal = value.literal();
        trace!(
            "constraint at {}: {:?} against {:?}",
            constraint.position,
            literal,
            constraint.expected
        );
        if literal != constraint.expected.as_str() {
            return Ok(false);
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Value;
    use crate::engine::{MySqlEngine, SqlEngine};
    use crate::generator::Constant;
    use matches::assert_matches;

    fn registry() -> Registry {
        Registry::empty()
            .register("username", Constant("foobar".to_string()))
            .register("firstName", Constant("Ashley".to_string()))
            .register("lastName", Constant("Jones".to_string()))
            .register("email", Constant("foobar@example.com".to_string()))
    }

    fn anonymizer(config: &str) -> FieldAnonymizer {
        FieldAnonymizer::new(
            Arc::new(config.parse().unwrap()),
            Arc::new(registry()),
        )
    }

    fn run(anonymizer: &FieldAnonymizer, sql: &str) -> (String, AnonymizeReport) {
        let engine = MySqlEngine::new();
        let mut statement = engine.parse(sql).unwrap();
        let report = anonymizer.apply(&mut statement);
        (engine.serialize(&statement).unwrap(), report)
    }

    const USERS: &str = r#"{"patterns":[{"tableName":"wp_users","fields":[
        {"field":"user_login","position":2,"type":"username"}]}]}"#;

    const USERMETA: &str = r#"{"patterns":[{"tableName":"wp_usermeta","fields":[
        {"field":"meta_value","position":4,"type":"firstName",
         "constraints":[{"field":"meta_key","position":3,"value":"first_name"}]},
        {"field":"meta_value","position":4,"type":"lastName",
         "constraints":[{"field":"meta_key","position":3,"value":"last_name"}]}]}]}"#;

    #[test]
    fn replaces_target_position() {
        let (sql, report) = run(&anonymizer(USERS), "INSERT INTO wp_users VALUES (1,'alice');");
        assert_eq!(sql, "insert into wp_users values (1, 'foobar')");
        assert_eq!(report.replaced, 1);
        assert!(report.errors.is_empty());
    }

    #[test]
    fn other_tables_untouched() {
        let (sql, report) = run(&anonymizer(USERS), "INSERT INTO wp_posts VALUES (1,'alice');");
        assert_eq!(sql, "insert into wp_posts values (1, 'alice')");
        assert_eq!(report, AnonymizeReport::default());
    }

    #[test]
    fn other_statements_untouched() {
        let engine = MySqlEngine::new();
        let mut statement = engine.parse("DROP TABLE wp_users").unwrap();
        let before = statement.clone();
        assert_eq!(anonymizer(USERS).apply(&mut statement), AnonymizeReport::default());
        assert_eq!(statement, before);
    }

    #[test]
    fn constraints_gate_rules() {
        let (sql, report) = run(
            &anonymizer(USERMETA),
            "INSERT INTO wp_usermeta VALUES (1,1,'first_name','John'),(2,1,'last_name','Doe'),(3,1,'foobar','bazquz');",
        );
        assert_eq!(
            sql,
            "insert into wp_usermeta values (1, 1, 'first_name', 'Ashley'), (2, 1, 'last_name', 'Jones'), (3, 1, 'foobar', 'bazquz')"
        );
        assert_eq!(report.replaced, 2);
        // Each row fails the other rule's constraint, the third fails both.
        assert_eq!(report.skipped_constraint, 4);
    }

    #[test]
    fn constraint_comparison_is_exact() {
        let (sql, _) = run(
            &anonymizer(USERMETA),
            "INSERT INTO wp_usermeta VALUES (1,1,'First_Name','John'),(2,1,'first_name ','Jim');",
        );
        assert_eq!(
            sql,
            "insert into wp_usermeta values (1, 1, 'First_Name', 'John'), (2, 1, 'first_name ', 'Jim')"
        );
    }

    #[test]
    fn constraints_compare_numbers_by_text() {
        let anonymizer = anonymizer(
            r#"{"patterns":[{"tableName":"t","fields":[{"field":"v","position":2,"type":"username",
                "constraints":[{"field":"k","position":1,"value":"7"}]}]}]}"#,
        );
        let (sql, _) = run(&anonymizer, "INSERT INTO t VALUES (7,'a'),(8,'b')");
        assert_eq!(sql, "insert into t values (7, 'foobar'), (8, 'b')");
    }

    #[test]
    fn empty_values_are_skipped() {
        let (sql, report) = run(
            &anonymizer(USERS),
            "INSERT INTO wp_users VALUES (1,''),(2,NULL),(3,'carol');",
        );
        assert_eq!(
            sql,
            "insert into wp_users values (1, ''), (2, null), (3, 'foobar')"
        );
        assert_eq!(report.skipped_empty, 2);
        assert_eq!(report.replaced, 1);
    }

    #[test]
    fn unknown_types_are_skipped_and_reported_once() {
        let anonymizer = anonymizer(
            r#"{"patterns":[{"tableName":"t","fields":[{"field":"v","position":1,"type":"shoeSize"}]}]}"#,
        );
        let (sql, report) = run(&anonymizer, "INSERT INTO t VALUES ('a'),('b')");
        assert_eq!(sql, "insert into t values ('a'), ('b')");
        assert_eq!(report.replaced, 0);
        assert_eq!(report.errors.len(), 1);
        assert_matches!(&report.errors[0], RuleError::UnknownType { kind, .. } if kind == "shoeSize");
    }

    #[test]
    fn checks_run_in_order_bounds_empty_type() {
        let anonymizer = anonymizer(
            r#"{"patterns":[{"tableName":"t","fields":[
                {"field":"far","position":3,"type":"shoeSize"},
                {"field":"near","position":1,"type":"shoeSize"}]}]}"#,
        );
        let (sql, report) = run(&anonymizer, "INSERT INTO t VALUES ('', 'b'),('c', 'd')");
        assert_eq!(sql, "insert into t values ('', 'b'), ('c', 'd')");
        assert_eq!(report.skipped_empty, 1);
        assert_eq!(report.errors.len(), 3);
        assert_matches!(&report.errors[0], RuleError::PositionOutOfRange { row: 0, .. });
        assert_matches!(&report.errors[1], RuleError::PositionOutOfRange { row: 1, .. });
        assert_matches!(&report.errors[2], RuleError::UnknownType { field, .. } if field == "near");
    }

    #[test]
    fn out_of_range_position_is_reported_per_row() {
        let anonymizer = anonymizer(
            r#"{"patterns":[{"tableName":"t","fields":[
                {"field":"far","position":5,"type":"username"},
                {"field":"near","position":1,"type":"username"}]}]}"#,
        );
        let (sql, report) = run(&anonymizer, "INSERT INTO t VALUES ('a', 'b'),('c', 'd')");
        assert_eq!(sql, "insert into t values ('foobar', 'b'), ('foobar', 'd')");
        assert_eq!(report.errors.len(), 2);
        assert_matches!(
            &report.errors[1],
            RuleError::PositionOutOfRange { row: 1, len: 2, .. }
        );
    }

    #[test]
    fn out_of_range_constraint_is_reported() {
        let anonymizer = anonymizer(
            r#"{"patterns":[{"tableName":"t","fields":[{"field":"v","position":1,"type":"username",
                "constraints":[{"field":"k","position":9,"value":"x"}]}]}]}"#,
        );
        let (sql, report) = run(&anonymizer, "INSERT INTO t VALUES ('a')");
        assert_eq!(sql, "insert into t values ('a')");
        assert_matches!(
            &report.errors[0],
            RuleError::ConstraintOutOfRange { row: 0, len: 1, .. }
        );
    }

    #[test]
    fn every_matching_pattern_applies_and_last_rule_wins() {
        let anonymizer = anonymizer(
            r#"{"patterns":[
                {"tableName":"t","fields":[{"field":"a","position":1,"type":"username"}]},
                {"tableName":"t","fields":[{"field":"a","position":1,"type":"email"},
                                           {"field":"b","position":2,"type":"firstName"}]}]}"#,
        );
        let (sql, report) = run(&anonymizer, "INSERT INTO t VALUES ('x', 'y')");
        assert_eq!(sql, "insert into t values ('foobar@example.com', 'Ashley')");
        assert_eq!(report.replaced, 3);
    }

    #[test]
    fn qualified_table_names_match_on_table() {
        let (sql, _) = run(
            &anonymizer(USERS),
            "INSERT INTO `blog`.`wp_users` VALUES (1,'alice')",
        );
        assert_eq!(sql, "insert into blog.wp_users values (1, 'foobar')");
    }

    #[test]
    fn generators_see_the_current_value() {
        let registry = Registry::empty().register("upper", |current: &Value, _: &mut dyn rand::RngCore| {
            Value::from(current.literal().to_uppercase())
        });
        let anonymizer = FieldAnonymizer::new(
            Arc::new(
                r#"{"patterns":[{"tableName":"t","fields":[{"field":"v","position":1,"type":"upper"}]}]}"#
                    .parse()
                    .unwrap(),
            ),
            Arc::new(registry),
        );
        let (sql, _) = run(&anonymizer, "INSERT INTO t VALUES ('abc')");
        assert_eq!(sql, "insert into t values ('ABC')");
    }
}
