//! Translation from the engine-agnostic [`Query`] tree to the search
//! engine's native JSON query DSL.
//!
//! The native representation is carried as a [`serde_json::Value`] so the
//! index-provider boundary stays engine-shaped without baking a client crate
//! into this core. Validation of reserved field names happens here, before
//! any network call is made.

use serde_json::{json, Map, Value};

use super::Query;
use crate::types::FieldValue;

/// Reserved field name addressing the document identifier inside a query.
pub const ID_FIELD: &str = "_id";

/// A malformed query, rejected during translation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error("empty field name")]
    EmptyField,
    /// Underscore-prefixed names other than `_id` belong to the engine's
    /// reserved namespace.
    #[error("field '{0}' collides with a reserved name")]
    ReservedField(String),
    /// Only equality and membership can match the document identifier.
    #[error("'{0}' cannot be applied to the identifier field '_id'")]
    UnsupportedIdFilter(&'static str),
    #[error("'in' filter on '{0}' has no values")]
    EmptyValueSet(String),
    #[error("full-text filter has no target fields")]
    EmptyFullTextFields,
}

/// Translate a query to the native JSON DSL. An absent query matches
/// everything.
pub fn translate(query: Option<&Query>) -> Result<Value, QueryError> {
    match query {
        None => Ok(match_all()),
        Some(query) => translate_node(query),
    }
}

fn translate_node(query: &Query) -> Result<Value, QueryError> {
    match query {
        Query::Equals { field, value } => {
            check_field(field)?;
            if field == ID_FIELD {
                Ok(ids(std::slice::from_ref(value)))
            } else {
                Ok(keyed("term", keyed(field, value.into())))
            }
        }
        Query::NotEquals { field, value } => {
            check_field(field)?;
            let positive = if field == ID_FIELD {
                ids(std::slice::from_ref(value))
            } else {
                keyed("term", keyed(field, value.into()))
            };
            Ok(keyed("bool", keyed("must_not", Value::Array(vec![positive]))))
        }
        Query::In { field, values } => {
            check_field(field)?;
            if values.is_empty() {
                return Err(QueryError::EmptyValueSet(field.clone()));
            }
            if field == ID_FIELD {
                Ok(ids(values))
            } else {
                let values = values.iter().map(Value::from).collect();
                Ok(keyed("terms", keyed(field, Value::Array(values))))
            }
        }
        Query::Range { field, min, max } => {
            check_attribute_field(field, "range")?;
            let mut bounds = Map::new();
            if let Some(min) = min {
                bounds.insert("gte".to_string(), min.into());
            }
            if let Some(max) = max {
                bounds.insert("lte".to_string(), max.into());
            }
            // both bounds open is permitted: an unbounded range only
            // requires the field to be present and comparable
            Ok(keyed("range", keyed(field, Value::Object(bounds))))
        }
        Query::Exists { field } => {
            check_attribute_field(field, "exists")?;
            Ok(json!({ "exists": { "field": field } }))
        }
        Query::FullText { fields, text } => {
            if fields.is_empty() {
                return Err(QueryError::EmptyFullTextFields);
            }
            for field in fields {
                check_attribute_field(field, "full_text")?;
            }
            Ok(json!({ "multi_match": { "query": text, "fields": fields } }))
        }
        Query::And { children } => {
            if children.is_empty() {
                return Ok(match_all());
            }
            let clauses = translate_children(children)?;
            Ok(keyed("bool", keyed("must", Value::Array(clauses))))
        }
        Query::Or { children } => {
            if children.is_empty() {
                return Ok(match_all());
            }
            let clauses = translate_children(children)?;
            let mut body = Map::new();
            body.insert("should".to_string(), Value::Array(clauses));
            body.insert("minimum_should_match".to_string(), json!(1));
            Ok(keyed("bool", Value::Object(body)))
        }
    }
}

fn translate_children(children: &[Query]) -> Result<Vec<Value>, QueryError> {
    children.iter().map(translate_node).collect()
}

fn match_all() -> Value {
    json!({ "match_all": {} })
}

fn ids(values: &[FieldValue]) -> Value {
    let values: Vec<Value> = values.iter().map(Value::from).collect();
    json!({ "ids": { "values": values } })
}

/// Build a single-key JSON object. The DSL nests attribute names as object
/// keys, which the `json!` macro cannot express for runtime strings.
fn keyed(key: &str, value: Value) -> Value {
    let mut map = Map::new();
    map.insert(key.to_string(), value);
    Value::Object(map)
}

fn check_field(field: &str) -> Result<(), QueryError> {
    if field.is_empty() {
        return Err(QueryError::EmptyField);
    }
    if field.starts_with('_') && field != ID_FIELD {
        return Err(QueryError::ReservedField(field.to_string()));
    }
    Ok(())
}

/// Like [`check_field`], but for leaves that can only target regular
/// attributes, never the identifier.
fn check_attribute_field(field: &str, kind: &'static str) -> Result<(), QueryError> {
    check_field(field)?;
    if field == ID_FIELD {
        return Err(QueryError::UnsupportedIdFilter(kind));
    }
    Ok(())
}
