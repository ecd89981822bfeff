// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Choice state: routes to the first choice whose rule matches the input.
//!
//! Comparator semantics: a rule whose variable is missing or has the wrong
//! kind is simply false, never an error.

use super::{get_input, get_output, name_valid};
use crate::machine::ValidationError;
use crate::state::StateType;
use chrono::{DateTime, Utc};
use relay_core::{Path, StateError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ChoiceState {
    #[serde(skip)]
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_path: Option<Path>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<Path>,

    /// Fallback state when no choice matches.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Choice {
    #[serde(flatten)]
    pub rule: ChoiceRule,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
}

/// Exactly one comparator or combinator may be set per rule.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ChoiceRule {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variable: Option<Path>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub string_equals: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub string_less_than: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub string_greater_than: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub string_less_than_equals: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub string_greater_than_equals: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub numeric_equals: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub numeric_less_than: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub numeric_greater_than: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub numeric_less_than_equals: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub numeric_greater_than_equals: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub boolean_equals: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp_equals: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp_less_than: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp_greater_than: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp_less_than_equals: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp_greater_than_equals: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub and: Option<Vec<ChoiceRule>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub or: Option<Vec<ChoiceRule>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not: Option<Box<ChoiceRule>>,
}

impl ChoiceState {
    pub(crate) fn execute(&self, input: &Value) -> Result<(Value, Option<String>), StateError> {
        let effective = get_input(self.input_path.as_ref(), input)?;

        let next = self.choose(&effective);
        let Some(next) = next else {
            return Err(StateError::runtime("no choice matched and no Default"));
        };

        let output = get_output(self.output_path.as_ref(), effective)?;
        Ok((output, Some(next)))
    }

    fn choose(&self, input: &Value) -> Option<String> {
        for choice in &self.choices {
            if choice.rule.is_match(input) {
                return choice.next.clone();
            }
        }
        self.default.clone()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let prefixed = |e: ValidationError| e.prefixed(StateType::Choice, &self.name);
        name_valid(&self.name).map_err(prefixed)?;

        if self.choices.is_empty() {
            return Err(prefixed(ValidationError::new("Must have Choices")));
        }

        for choice in &self.choices {
            if choice.next.as_deref().unwrap_or_default().is_empty() {
                return Err(prefixed(ValidationError::new("Choice must have Next")));
            }
            choice.rule.validate().map_err(prefixed)?;
        }

        Ok(())
    }
}

impl ChoiceRule {
    /// Evaluate the rule against the input. Short-circuits combinators.
    pub fn is_match(&self, input: &Value) -> bool {
        if let Some(rules) = &self.and {
            return rules.iter().all(|rule| rule.is_match(input));
        }
        if let Some(rules) = &self.or {
            return rules.iter().any(|rule| rule.is_match(input));
        }
        if let Some(rule) = &self.not {
            return !rule.is_match(input);
        }

        let Some(variable) = &self.variable else {
            return false;
        };

        if let Some(expected) = &self.string_equals {
            return variable.get_string(input).map(|v| v == expected).unwrap_or(false);
        }
        if let Some(bound) = &self.string_less_than {
            return variable.get_string(input).map(|v| v < bound.as_str()).unwrap_or(false);
        }
        if let Some(bound) = &self.string_greater_than {
            return variable.get_string(input).map(|v| v > bound.as_str()).unwrap_or(false);
        }
        if let Some(bound) = &self.string_less_than_equals {
            return variable.get_string(input).map(|v| v <= bound.as_str()).unwrap_or(false);
        }
        if let Some(bound) = &self.string_greater_than_equals {
            return variable.get_string(input).map(|v| v >= bound.as_str()).unwrap_or(false);
        }

        if let Some(expected) = self.numeric_equals {
            return variable.get_number(input).map(|v| v == expected).unwrap_or(false);
        }
        if let Some(bound) = self.numeric_less_than {
            return variable.get_number(input).map(|v| v < bound).unwrap_or(false);
        }
        if let Some(bound) = self.numeric_greater_than {
            return variable.get_number(input).map(|v| v > bound).unwrap_or(false);
        }
        if let Some(bound) = self.numeric_less_than_equals {
            return variable.get_number(input).map(|v| v <= bound).unwrap_or(false);
        }
        if let Some(bound) = self.numeric_greater_than_equals {
            return variable.get_number(input).map(|v| v >= bound).unwrap_or(false);
        }

        if let Some(expected) = self.boolean_equals {
            return variable.get_bool(input).map(|v| v == expected).unwrap_or(false);
        }

        if let Some(expected) = self.timestamp_equals {
            return variable.get_time(input).map(|v| v == expected).unwrap_or(false);
        }
        if let Some(bound) = self.timestamp_less_than {
            return variable.get_time(input).map(|v| v < bound).unwrap_or(false);
        }
        if let Some(bound) = self.timestamp_greater_than {
            return variable.get_time(input).map(|v| v > bound).unwrap_or(false);
        }
        if let Some(bound) = self.timestamp_less_than_equals {
            return variable.get_time(input).map(|v| v <= bound).unwrap_or(false);
        }
        if let Some(bound) = self.timestamp_greater_than_equals {
            return variable.get_time(input).map(|v| v >= bound).unwrap_or(false);
        }

        false
    }

    fn comparison_label(&self) -> String {
        if let Some(v) = &self.string_equals {
            return format!("={v}");
        }
        if let Some(v) = &self.string_less_than {
            return format!("<{v}");
        }
        if let Some(v) = &self.string_greater_than {
            return format!(">{v}");
        }
        if let Some(v) = &self.string_less_than_equals {
            return format!("<={v}");
        }
        if let Some(v) = &self.string_greater_than_equals {
            return format!(">={v}");
        }
        if let Some(v) = self.numeric_equals {
            return format!("={v}");
        }
        if let Some(v) = self.numeric_less_than {
            return format!("<{v}");
        }
        if let Some(v) = self.numeric_greater_than {
            return format!(">{v}");
        }
        if let Some(v) = self.numeric_less_than_equals {
            return format!("<={v}");
        }
        if let Some(v) = self.numeric_greater_than_equals {
            return format!(">={v}");
        }
        if let Some(v) = self.boolean_equals {
            return format!("={v}");
        }
        if let Some(v) = self.timestamp_equals {
            return format!("={}", v.to_rfc3339());
        }
        if let Some(v) = self.timestamp_less_than {
            return format!("<{}", v.to_rfc3339());
        }
        if let Some(v) = self.timestamp_greater_than {
            return format!(">{}", v.to_rfc3339());
        }
        if let Some(v) = self.timestamp_less_than_equals {
            return format!("<={}", v.to_rfc3339());
        }
        if let Some(v) = self.timestamp_greater_than_equals {
            return format!(">={}", v.to_rfc3339());
        }
        String::new()
    }

    fn validate(&self) -> Result<(), ValidationError> {
        let comparators = [
            self.not.is_some(),
            self.and.is_some(),
            self.or.is_some(),
            self.string_equals.is_some(),
            self.string_less_than.is_some(),
            self.string_greater_than.is_some(),
            self.string_less_than_equals.is_some(),
            self.string_greater_than_equals.is_some(),
            self.numeric_equals.is_some(),
            self.numeric_less_than.is_some(),
            self.numeric_greater_than.is_some(),
            self.numeric_less_than_equals.is_some(),
            self.numeric_greater_than_equals.is_some(),
            self.boolean_equals.is_some(),
            self.timestamp_equals.is_some(),
            self.timestamp_less_than.is_some(),
            self.timestamp_greater_than.is_some(),
            self.timestamp_less_than_equals.is_some(),
            self.timestamp_greater_than_equals.is_some(),
        ];

        if comparators.iter().filter(|set| **set).count() != 1 {
            return Err(ValidationError::new("Not Exactly One comparison Operator"));
        }

        let combinator = self.not.is_some() || self.and.is_some() || self.or.is_some();
        if combinator && self.variable.is_some() {
            return Err(ValidationError::new("Variable defined with Not And Or defined"));
        }
        if !combinator && self.variable.is_none() {
            return Err(ValidationError::new("Variable Not defined"));
        }

        if let Some(rules) = &self.and {
            if rules.is_empty() {
                return Err(ValidationError::new("And Must have elements"));
            }
            for rule in rules {
                rule.validate()?;
            }
        }
        if let Some(rules) = &self.or {
            if rules.is_empty() {
                return Err(ValidationError::new("Or Must have elements"));
            }
            for rule in rules {
                rule.validate()?;
            }
        }
        if let Some(rule) = &self.not {
            rule.validate()?;
        }

        Ok(())
    }
}

impl std::fmt::Display for ChoiceRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(rules) = &self.and {
            let parts: Vec<String> = rules.iter().map(ToString::to_string).collect();
            return f.write_str(&parts.join(" && "));
        }
        if let Some(rules) = &self.or {
            let parts: Vec<String> = rules.iter().map(ToString::to_string).collect();
            return f.write_str(&parts.join(" || "));
        }
        if let Some(rule) = &self.not {
            return write!(f, "!({rule})");
        }

        let variable = self.variable.as_ref().map(ToString::to_string).unwrap_or_default();
        write!(f, "{variable}{}", self.comparison_label())
    }
}

#[cfg(test)]
#[path = "choice_tests.rs"]
mod tests;
