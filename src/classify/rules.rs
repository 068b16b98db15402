//! Deterministic rule-table classification strategy

use crate::classify::SensitivityLevel;
use crate::config::FieldRule;
use crate::error::{Error, Result};
use regex::Regex;

/// Compiled field-name rule table.
///
/// Rules are evaluated in declaration order; the first rule whose pattern
/// matches the field name wins. Patterns are matched against the field name
/// only, never the value.
pub struct RuleTable {
    rules: Vec<CompiledRule>,
}

struct CompiledRule {
    pattern: Regex,
    category: String,
    sensitivity: SensitivityLevel,
}

/// A rule-table hit for one field name
#[derive(Debug, Clone, PartialEq)]
pub struct RuleHit<'a> {
    /// Category the rule assigns
    pub category: &'a str,
    /// Sensitivity the rule assigns
    pub sensitivity: SensitivityLevel,
}

impl RuleTable {
    /// Compile a rule table from configuration
    pub fn new(rules: &[FieldRule]) -> Result<Self> {
        let compiled = rules
            .iter()
            .map(|rule| {
                let pattern = Regex::new(&rule.name_pattern).map_err(|e| {
                    Error::Classification(format!(
                        "Invalid field pattern for rule '{}': {}",
                        rule.name, e
                    ))
                })?;
                Ok(CompiledRule {
                    pattern,
                    category: rule.category.clone(),
                    sensitivity: rule.sensitivity,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { rules: compiled })
    }

    /// Look up the first rule matching a field name
    pub fn lookup(&self, field_name: &str) -> Option<RuleHit<'_>> {
        self.rules
            .iter()
            .find(|rule| rule.pattern.is_match(field_name))
            .map(|rule| RuleHit {
                category: &rule.category,
                sensitivity: rule.sensitivity,
            })
    }

    /// Number of compiled rules
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// True when no rules are configured
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
