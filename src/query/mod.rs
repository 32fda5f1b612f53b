//! Query engine: filter, sort, paginate over an in-memory record list.
//!
//! Filters are a conjunction of independently optional predicates. Sorting
//! is restricted to the schema's allow-list and is stable: records with
//! equal sort keys keep their pre-sort relative order. Pagination applies
//! strictly after filtering and sorting.

use crate::core::{FieldValue, RegistryError, Result};
use crate::schema::{Record, RecordSchema};
use std::cmp::Ordering;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl FromStr for SortOrder {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(Self::Ascending),
            "desc" | "descending" => Ok(Self::Descending),
            other => Err(RegistryError::InvalidQuery(format!(
                "invalid sort order '{}'; expected asc or desc",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SortSpec {
    pub field: String,
    pub order: SortOrder,
}

/// One optional predicate; a query ANDs all of its filters.
#[derive(Debug, Clone)]
pub enum Filter {
    /// Case-insensitive substring match against any of the named text
    /// fields (OR within the filter).
    TextContains { fields: Vec<String>, needle: String },
    /// Exact match; case-insensitive for text values.
    Equals { field: String, value: FieldValue },
    /// Membership in a caller-supplied set of text values.
    OneOf { field: String, allowed: Vec<String> },
    /// Inclusive numeric range; either bound optional.
    Range {
        field: String,
        min: Option<f64>,
        max: Option<f64>,
    },
}

impl Filter {
    fn matches(&self, record: &Record) -> bool {
        match self {
            Self::TextContains { fields, needle } => {
                let needle = needle.to_lowercase();
                fields.iter().any(|field| {
                    record
                        .field(field)
                        .and_then(FieldValue::as_str)
                        .is_some_and(|s| s.to_lowercase().contains(&needle))
                })
            }
            Self::Equals { field, value } => match (record.field(field), value) {
                (Some(FieldValue::Text(a)), FieldValue::Text(b)) => a.eq_ignore_ascii_case(b),
                (Some(actual), expected) => actual == expected,
                (None, _) => false,
            },
            Self::OneOf { field, allowed } => record
                .field(field)
                .and_then(FieldValue::as_str)
                .is_some_and(|s| allowed.iter().any(|a| a == s)),
            Self::Range { field, min, max } => {
                let Some(v) = record.field(field).and_then(FieldValue::as_f64) else {
                    return false;
                };
                min.map_or(true, |m| v >= m) && max.map_or(true, |m| v <= m)
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct QueryParams {
    pub filters: Vec<Filter>,
    pub sort: Option<SortSpec>,
    pub skip: usize,
    pub limit: Option<usize>,
}

/// Pagination guardrails; the effective limit never exceeds `max_limit`.
#[derive(Debug, Clone, Copy)]
pub struct PageLimits {
    pub default_limit: usize,
    pub max_limit: usize,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            default_limit: 20,
            max_limit: 100,
        }
    }
}

/// Runs a query over a snapshot of records, returning a fresh list.
///
/// The input is never mutated. An empty result is a valid empty list, not
/// an error; `skip` past the end of the filtered result yields empty.
pub fn run(
    records: &[Record],
    params: &QueryParams,
    schema: &RecordSchema,
    limits: &PageLimits,
) -> Result<Vec<Record>> {
    // Reject structural problems before touching the data.
    if let Some(sort) = &params.sort {
        if !schema.sortable.contains(&sort.field.as_str()) {
            return Err(RegistryError::InvalidQuery(format!(
                "cannot sort by '{}'; sortable fields are {}",
                sort.field,
                schema.sortable.join(", ")
            )));
        }
    }
    let limit = match params.limit {
        Some(0) => {
            return Err(RegistryError::InvalidQuery(
                "limit must be at least 1".to_string(),
            ));
        }
        Some(n) => n.min(limits.max_limit),
        None => limits.default_limit.min(limits.max_limit),
    };

    let mut matched: Vec<Record> = records
        .iter()
        .filter(|r| params.filters.iter().all(|f| f.matches(r)))
        .cloned()
        .collect();

    if let Some(sort) = &params.sort {
        matched = sort_records(matched, sort);
    }

    Ok(matched.into_iter().skip(params.skip).take(limit).collect())
}

/// Stable sort on pre-extracted keys. Missing or null keys order last
/// regardless of direction, so descending sorts do not surface empty
/// values first.
fn sort_records(records: Vec<Record>, sort: &SortSpec) -> Vec<Record> {
    let mut keyed: Vec<(Record, Option<FieldValue>)> = records
        .into_iter()
        .map(|record| {
            let key = record
                .field(&sort.field)
                .filter(|v| !v.is_null())
                .cloned();
            (record, key)
        })
        .collect();

    keyed.sort_by(|(_, a), (_, b)| match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => {
            let cmp = a.compare(b);
            match sort.order {
                SortOrder::Ascending => cmp,
                SortOrder::Descending => cmp.reverse(),
            }
        }
    });

    keyed.into_iter().map(|(record, _)| record).collect()
}
