//! Metadata filtering for search candidates.

use std::collections::BTreeMap;

use serde_json::Value;

use super::error::IndexError;
use super::model::{MetaValue, MetadataMap};

/// Single-field condition.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterCondition {
    /// Field equals the value exactly. No numeric coercion: an `Int`
    /// never equals a `Float`.
    Equals(MetaValue),
    /// Field equals one of the values.
    OneOf(Vec<MetaValue>),
    /// Field is numeric and inside the inclusive range. Either bound
    /// may be open.
    Range { min: Option<f64>, max: Option<f64> },
}

impl FilterCondition {
    fn matches(&self, value: &MetaValue) -> bool {
        match self {
            FilterCondition::Equals(expected) => value == expected,
            FilterCondition::OneOf(options) => options.contains(value),
            FilterCondition::Range { min, max } => {
                let Some(number) = value.as_f64() else {
                    return false;
                };
                min.is_none_or(|lo| number >= lo) && max.is_none_or(|hi| number <= hi)
            }
        }
    }
}

/// Conjunction of per-field conditions.
///
/// A document matches when every condition matches its metadata; a
/// field the document does not carry never matches.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataFilter {
    conditions: BTreeMap<String, FilterCondition>,
}

impl MetadataFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses the shorthand JSON object form: a scalar means equality,
    /// an array means membership, and an object with `min`/`max` keys
    /// means an inclusive numeric range.
    pub fn from_json(json: &str) -> Result<Self, IndexError> {
        let value: Value = serde_json::from_str(json).map_err(|e| IndexError::InvalidFilter {
            reason: e.to_string(),
        })?;
        Self::from_value(&value)
    }

    pub fn from_value(value: &Value) -> Result<Self, IndexError> {
        let Value::Object(fields) = value else {
            return Err(IndexError::InvalidFilter {
                reason: "filter must be a JSON object".to_string(),
            });
        };

        let mut conditions = BTreeMap::new();
        for (field, spec) in fields {
            conditions.insert(field.clone(), parse_condition(field, spec)?);
        }
        Ok(Self { conditions })
    }

    pub fn equals(mut self, field: impl Into<String>, value: impl Into<MetaValue>) -> Self {
        self.conditions
            .insert(field.into(), FilterCondition::Equals(value.into()));
        self
    }

    pub fn one_of(mut self, field: impl Into<String>, values: Vec<MetaValue>) -> Self {
        self.conditions
            .insert(field.into(), FilterCondition::OneOf(values));
        self
    }

    pub fn range(mut self, field: impl Into<String>, min: Option<f64>, max: Option<f64>) -> Self {
        self.conditions
            .insert(field.into(), FilterCondition::Range { min, max });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    /// Whether `metadata` satisfies every condition.
    pub fn matches(&self, metadata: &MetadataMap) -> bool {
        self.conditions.iter().all(|(field, condition)| {
            metadata
                .get(field)
                .is_some_and(|value| condition.matches(value))
        })
    }
}

fn parse_condition(field: &str, spec: &Value) -> Result<FilterCondition, IndexError> {
    match spec {
        Value::Array(items) => {
            let options = items
                .iter()
                .map(|item| parse_meta_value(field, item))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(FilterCondition::OneOf(options))
        }
        Value::Object(spec_map) => {
            if spec_map.is_empty() || !spec_map.keys().all(|k| k == "min" || k == "max") {
                return Err(IndexError::InvalidFilter {
                    reason: format!("field {field}: object form must use min/max keys"),
                });
            }
            let min = spec_map
                .get("min")
                .map(|v| require_number(field, v))
                .transpose()?;
            let max = spec_map
                .get("max")
                .map(|v| require_number(field, v))
                .transpose()?;
            Ok(FilterCondition::Range { min, max })
        }
        scalar => Ok(FilterCondition::Equals(parse_meta_value(field, scalar)?)),
    }
}

fn parse_meta_value(field: &str, value: &Value) -> Result<MetaValue, IndexError> {
    serde_json::from_value(value.clone()).map_err(|e| IndexError::InvalidFilter {
        reason: format!("field {field}: {e}"),
    })
}

fn require_number(field: &str, value: &Value) -> Result<f64, IndexError> {
    value.as_f64().ok_or_else(|| IndexError::InvalidFilter {
        reason: format!("field {field}: min/max must be numeric"),
    })
}
