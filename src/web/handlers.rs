//! Request handlers, generic over the entity registry in the route state.

use super::ApiError;
use crate::core::{DataType, FieldValue, RegistryError, Violation};
use crate::query::{Filter, QueryParams, SortOrder, SortSpec};
use crate::registry::Registry;
use crate::schema::RecordSchema;
use crate::storage::StoredAttrs;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value as JsonValue};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Query-string keys with structural meaning; everything else is treated
/// as a schema-driven filter parameter.
const RESERVED_PARAMS: &[&str] = &["search", "sort_by", "order", "skip", "limit"];

/// Accepted length of the free-text `search` parameter; anything shorter
/// would scan every record for a needle too broad to be useful.
const SEARCH_MIN_LEN: usize = 3;
const SEARCH_MAX_LEN: usize = 50;

pub async fn service_root() -> Json<JsonValue> {
    Json(json!({ "message": "Record Registry Service API" }))
}

pub async fn service_about() -> Json<JsonValue> {
    Json(json!({
        "message": "A fully functional API to manage patient, employee and book records."
    }))
}

pub async fn list_records(
    State(registry): State<Arc<Registry>>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<Vec<JsonValue>>, ApiError> {
    let query = build_query(registry.schema(), &params)?;
    let records = registry.list(&query)?;
    Ok(Json(records.iter().map(|r| r.to_json()).collect()))
}

pub async fn get_record(
    State(registry): State<Arc<Registry>>,
    Path(id): Path<String>,
) -> Result<Json<JsonValue>, ApiError> {
    let record = registry.get(&id)?;
    Ok(Json(record.to_json()))
}

pub async fn create_record(
    State(registry): State<Arc<Registry>>,
    Json(body): Json<JsonValue>,
) -> Result<(StatusCode, Json<JsonValue>), ApiError> {
    let payload = as_object(&body)?;
    let record = registry.create(&payload)?;
    Ok((StatusCode::CREATED, Json(record.to_json())))
}

pub async fn update_record(
    State(registry): State<Arc<Registry>>,
    Path(id): Path<String>,
    Json(body): Json<JsonValue>,
) -> Result<Json<JsonValue>, ApiError> {
    let patch = as_object(&body)?;
    let record = registry.update(&id, &patch)?;
    Ok(Json(record.to_json()))
}

pub async fn delete_record(
    State(registry): State<Arc<Registry>>,
    Path(id): Path<String>,
) -> Result<Json<JsonValue>, ApiError> {
    registry.delete(&id)?;
    Ok(Json(json!({
        "message": format!("{} '{}' deleted", registry.schema().entity, id)
    })))
}

fn as_object(body: &JsonValue) -> Result<StoredAttrs, ApiError> {
    body.as_object().cloned().ok_or_else(|| {
        ApiError(RegistryError::Validation(vec![Violation::new(
            "body",
            "must be a JSON object",
            body.clone(),
        )]))
    })
}

/// Maps query-string parameters onto query-engine filters, driven by the
/// schema: `search` spans the searchable text fields, `min_x`/`max_x` form
/// inclusive ranges over numeric field `x`, a repeated or comma-separated
/// value is set membership, and any other known field is an exact match.
/// Unknown parameters and malformed numbers are `InvalidQuery`.
fn build_query(
    schema: &RecordSchema,
    params: &[(String, String)],
) -> Result<QueryParams, RegistryError> {
    let mut query = QueryParams::default();

    // Structural and range parameters may appear at most once; repeating a
    // filter field merges all of its values into one membership filter.
    let mut singles: HashMap<&str, &str> = HashMap::new();
    let mut field_values: BTreeMap<&str, Vec<String>> = BTreeMap::new();

    for (key, value) in params {
        if RESERVED_PARAMS.contains(&key.as_str())
            || key.starts_with("min_")
            || key.starts_with("max_")
        {
            if singles.insert(key, value).is_some() {
                return Err(RegistryError::InvalidQuery(format!(
                    "parameter '{key}' given more than once"
                )));
            }
        } else {
            field_values
                .entry(key)
                .or_default()
                .extend(value.split(',').map(|v| v.trim().to_string()));
        }
    }

    if let Some(skip) = singles.get("skip") {
        query.skip = skip.parse().map_err(|_| {
            RegistryError::InvalidQuery(format!("skip must be a non-negative integer, got '{skip}'"))
        })?;
    }
    if let Some(limit) = singles.get("limit") {
        query.limit = Some(limit.parse().map_err(|_| {
            RegistryError::InvalidQuery(format!("limit must be a positive integer, got '{limit}'"))
        })?);
    }

    match (singles.get("sort_by"), singles.get("order")) {
        (Some(field), order) => {
            let order = match order {
                Some(o) => o.parse::<SortOrder>()?,
                None => SortOrder::Ascending,
            };
            query.sort = Some(SortSpec {
                field: (*field).to_string(),
                order,
            });
        }
        (None, Some(_)) => {
            return Err(RegistryError::InvalidQuery(
                "order requires sort_by".to_string(),
            ));
        }
        (None, None) => {}
    }

    if let Some(needle) = singles.get("search") {
        let len = needle.chars().count();
        if !(SEARCH_MIN_LEN..=SEARCH_MAX_LEN).contains(&len) {
            return Err(RegistryError::InvalidQuery(format!(
                "search must be between {SEARCH_MIN_LEN} and {SEARCH_MAX_LEN} characters"
            )));
        }
        query.filters.push(Filter::TextContains {
            fields: schema.searchable.iter().map(|f| f.to_string()).collect(),
            needle: (*needle).to_string(),
        });
    }

    // Accumulate min_/max_ pairs so one Range filter covers both bounds.
    let mut ranges: HashMap<String, (Option<f64>, Option<f64>)> = HashMap::new();
    for (key, value) in &singles {
        if let Some(field) = key.strip_prefix("min_").or_else(|| key.strip_prefix("max_")) {
            let bound = parse_numeric_bound(schema, field, key, value)?;
            let entry = ranges.entry(field.to_string()).or_default();
            if key.starts_with("min_") {
                entry.0 = Some(bound);
            } else {
                entry.1 = Some(bound);
            }
        }
    }

    for (field, values) in field_values {
        let Some(data_type) = schema.field_type(field) else {
            return Err(RegistryError::InvalidQuery(format!(
                "unknown filter parameter '{field}'"
            )));
        };

        if values.len() == 1 {
            query.filters.push(Filter::Equals {
                field: field.to_string(),
                value: parse_typed(data_type, field, &values[0])?,
            });
        } else {
            query.filters.push(Filter::OneOf {
                field: field.to_string(),
                allowed: values,
            });
        }
    }

    for (field, (min, max)) in ranges {
        query.filters.push(Filter::Range { field, min, max });
    }

    Ok(query)
}

fn parse_numeric_bound(
    schema: &RecordSchema,
    field: &str,
    key: &str,
    value: &str,
) -> Result<f64, RegistryError> {
    match schema.field_type(field) {
        Some(DataType::Integer) | Some(DataType::Float) => value.parse().map_err(|_| {
            RegistryError::InvalidQuery(format!("{key} must be a number, got '{value}'"))
        }),
        Some(_) => Err(RegistryError::InvalidQuery(format!(
            "field '{field}' is not numeric"
        ))),
        None => Err(RegistryError::InvalidQuery(format!(
            "unknown filter parameter '{key}'"
        ))),
    }
}

fn parse_typed(
    data_type: DataType,
    field: &str,
    value: &str,
) -> Result<FieldValue, RegistryError> {
    match data_type {
        DataType::Integer => value.parse::<i64>().map(FieldValue::Integer).map_err(|_| {
            RegistryError::InvalidQuery(format!("{field} must be an integer, got '{value}'"))
        }),
        DataType::Float => value.parse::<f64>().map(FieldValue::Float).map_err(|_| {
            RegistryError::InvalidQuery(format!("{field} must be a number, got '{value}'"))
        }),
        DataType::Boolean => value.parse::<bool>().map(FieldValue::Boolean).map_err(|_| {
            RegistryError::InvalidQuery(format!("{field} must be true or false, got '{value}'"))
        }),
        DataType::Text => Ok(FieldValue::from(value)),
    }
}
