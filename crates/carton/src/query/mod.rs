//! Engine-agnostic search predicates.
//!
//! A [`Query`] is an immutable predicate tree: leaves match single
//! attributes, `And`/`Or` nodes compose them. Trees are built with the
//! chainable constructors below, are `Clone`, and may be reused across
//! calls. Nothing here validates against a live schema; field names are
//! opaque strings, and reserved-name or type problems surface during
//! translation.

mod translate;

pub use translate::{translate, QueryError, ID_FIELD};

use serde::{Deserialize, Serialize};

use crate::types::FieldValue;

/// A search predicate over document attributes.
///
/// The special field name [`ID_FIELD`] (`"_id"`) addresses the document
/// identifier instead of a regular attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Query {
    /// Exact match on one attribute.
    Equals { field: String, value: FieldValue },
    /// Negated exact match.
    NotEquals { field: String, value: FieldValue },
    /// Membership in a value set; equivalent to an `Or` of `Equals` leaves.
    In {
        field: String,
        values: Vec<FieldValue>,
    },
    /// Inclusive range; either bound may be open.
    Range {
        field: String,
        min: Option<FieldValue>,
        max: Option<FieldValue>,
    },
    /// The attribute is present, whatever its value.
    Exists { field: String },
    /// Full-text match across one or more attributes.
    FullText { fields: Vec<String>, text: String },
    /// All children must match. Empty means "match all".
    And { children: Vec<Query> },
    /// At least one child must match. Empty means "match all".
    Or { children: Vec<Query> },
}

impl Query {
    pub fn equals(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Query::Equals {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn not_equals(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Query::NotEquals {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn any_in<V: Into<FieldValue>>(
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Query::In {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn range(
        field: impl Into<String>,
        min: Option<FieldValue>,
        max: Option<FieldValue>,
    ) -> Self {
        Query::Range {
            field: field.into(),
            min,
            max,
        }
    }

    /// Inclusive `min <= field <= max`.
    pub fn between(
        field: impl Into<String>,
        min: impl Into<FieldValue>,
        max: impl Into<FieldValue>,
    ) -> Self {
        Self::range(field, Some(min.into()), Some(max.into()))
    }

    /// Inclusive lower bound, open above.
    pub fn at_least(field: impl Into<String>, min: impl Into<FieldValue>) -> Self {
        Self::range(field, Some(min.into()), None)
    }

    /// Inclusive upper bound, open below.
    pub fn at_most(field: impl Into<String>, max: impl Into<FieldValue>) -> Self {
        Self::range(field, None, Some(max.into()))
    }

    pub fn exists(field: impl Into<String>) -> Self {
        Query::Exists {
            field: field.into(),
        }
    }

    pub fn full_text<F: Into<String>>(
        fields: impl IntoIterator<Item = F>,
        text: impl Into<String>,
    ) -> Self {
        Query::FullText {
            fields: fields.into_iter().map(Into::into).collect(),
            text: text.into(),
        }
    }

    pub fn all_of(children: impl IntoIterator<Item = Query>) -> Self {
        Query::And {
            children: children.into_iter().collect(),
        }
    }

    pub fn any_of(children: impl IntoIterator<Item = Query>) -> Self {
        Query::Or {
            children: children.into_iter().collect(),
        }
    }

    /// Conjoin with another predicate. Extends an existing `And` node in
    /// place rather than nesting, so `a.and(b).and(c)` stays one level deep.
    pub fn and(self, other: Query) -> Self {
        match self {
            Query::And { mut children } => {
                children.push(other);
                Query::And { children }
            }
            this => Query::And {
                children: vec![this, other],
            },
        }
    }

    /// Disjoin with another predicate. Extends an existing `Or` node in
    /// place.
    pub fn or(self, other: Query) -> Self {
        match self {
            Query::Or { mut children } => {
                children.push(other);
                Query::Or { children }
            }
            this => Query::Or {
                children: vec![this, other],
            },
        }
    }
}
