//! Derived attributes: pure functions of the stored attributes, recomputed
//! on every record materialization and never persisted.

use crate::core::{DataType, FieldValue};
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Tagged derivation, applied uniformly by [`Derivation::apply`].
///
/// Derivations run in declaration order; a later derivation may read the
/// output of an earlier one (the verdict bands read the computed ratio).
#[derive(Debug, Clone)]
pub enum Derivation {
    /// `round(numerator / denominator^2, precision)` — the BMI shape.
    /// The denominator's field constraint must exclude zero and negatives,
    /// so division here cannot blow up on a validated record.
    RatioOverSquare {
        name: &'static str,
        numerator: &'static str,
        denominator: &'static str,
        precision: i32,
    },
    /// Ordered band classification with strict upper bounds, first match
    /// wins; `labels` has one more entry than `bounds` (the else-band).
    ThresholdBands {
        name: &'static str,
        source: &'static str,
        bounds: Vec<f64>,
        labels: Vec<&'static str>,
    },
    /// `ab***@domain` projection of an email address.
    MaskedEmail {
        name: &'static str,
        source: &'static str,
    },
    Uppercase {
        name: &'static str,
        source: &'static str,
    },
    /// Character-wise reversal of a text field.
    Reversed {
        name: &'static str,
        source: &'static str,
    },
    TitleCase {
        name: &'static str,
        source: &'static str,
    },
    /// Prefixes a numeric field with a currency symbol for display.
    CurrencyPrefix {
        name: &'static str,
        source: &'static str,
        symbol: &'static str,
    },
    /// Reformats an ISO date (`YYYY-MM-DD`) with a chrono format string.
    ReformatDate {
        name: &'static str,
        source: &'static str,
        format: &'static str,
    },
}

impl Derivation {
    pub fn name(&self) -> &'static str {
        match self {
            Self::RatioOverSquare { name, .. }
            | Self::ThresholdBands { name, .. }
            | Self::MaskedEmail { name, .. }
            | Self::Uppercase { name, .. }
            | Self::Reversed { name, .. }
            | Self::TitleCase { name, .. }
            | Self::CurrencyPrefix { name, .. }
            | Self::ReformatDate { name, .. } => name,
        }
    }

    /// Type of the derived value, used by the query layer's allow-lists.
    pub fn data_type(&self) -> DataType {
        match self {
            Self::RatioOverSquare { .. } => DataType::Float,
            _ => DataType::Text,
        }
    }

    /// Computes the derived value from stored attributes plus the derived
    /// values produced so far. Pure and deterministic; a missing or null
    /// source yields `Null` rather than an error, since validation has
    /// already decided what may be absent.
    pub fn apply(
        &self,
        stored: &BTreeMap<String, FieldValue>,
        derived: &BTreeMap<String, FieldValue>,
    ) -> FieldValue {
        let lookup = |field: &str| -> Option<&FieldValue> {
            stored.get(field).or_else(|| derived.get(field))
        };

        match self {
            Self::RatioOverSquare {
                numerator,
                denominator,
                precision,
                ..
            } => {
                let (Some(num), Some(den)) = (
                    lookup(numerator).and_then(FieldValue::as_f64),
                    lookup(denominator).and_then(FieldValue::as_f64),
                ) else {
                    return FieldValue::Null;
                };
                FieldValue::Float(round_to(num / (den * den), *precision))
            }
            Self::ThresholdBands {
                source,
                bounds,
                labels,
                ..
            } => {
                let Some(v) = lookup(source).and_then(FieldValue::as_f64) else {
                    return FieldValue::Null;
                };
                for (bound, label) in bounds.iter().zip(labels.iter()) {
                    if v < *bound {
                        return FieldValue::from(*label);
                    }
                }
                labels
                    .last()
                    .map(|l| FieldValue::from(*l))
                    .unwrap_or(FieldValue::Null)
            }
            Self::MaskedEmail { source, .. } => {
                let Some(email) = lookup(source).and_then(FieldValue::as_str) else {
                    return FieldValue::Null;
                };
                match email.split_once('@') {
                    Some((local, domain)) => {
                        let prefix: String = local.chars().take(2).collect();
                        FieldValue::Text(format!("{}***@{}", prefix, domain))
                    }
                    None => FieldValue::from(email),
                }
            }
            Self::Uppercase { source, .. } => match lookup(source).and_then(FieldValue::as_str) {
                Some(s) => FieldValue::Text(s.to_uppercase()),
                None => FieldValue::Null,
            },
            Self::Reversed { source, .. } => match lookup(source).and_then(FieldValue::as_str) {
                Some(s) => FieldValue::Text(s.chars().rev().collect()),
                None => FieldValue::Null,
            },
            Self::CurrencyPrefix { source, symbol, .. } => {
                match lookup(source).filter(|v| v.as_f64().is_some()) {
                    Some(v) => FieldValue::Text(format!("{}{}", symbol, v)),
                    None => FieldValue::Null,
                }
            }
            Self::TitleCase { source, .. } => match lookup(source).and_then(FieldValue::as_str) {
                Some(s) => FieldValue::Text(title_case(s)),
                None => FieldValue::Null,
            },
            Self::ReformatDate { source, format, .. } => {
                let Some(s) = lookup(source).and_then(FieldValue::as_str) else {
                    return FieldValue::Null;
                };
                match NaiveDate::parse_from_str(s, "%Y-%m-%d") {
                    Ok(date) => FieldValue::Text(date.format(format).to_string()),
                    Err(_) => FieldValue::Null,
                }
            }
        }
    }
}

fn round_to(v: f64, precision: i32) -> f64 {
    let factor = 10f64.powi(precision);
    (v * factor).round() / factor
}

fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
