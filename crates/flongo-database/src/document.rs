//! Documents, filters and updates.
//!
//! Filters use the MongoDB query shape restricted to what route handlers
//! need: field equality (dotted paths reach into nested objects) and the
//! comparison operators `$eq`, `$ne`, `$gt`, `$gte`, `$lt`, `$lte`, `$in`,
//! `$nin` and `$exists`. An empty filter matches every document.
//!
//! Updates are either a replacement document or a set of `$set`, `$unset`
//! and `$inc` operators.

use crate::DatabaseError;
use serde_json::{Map, Number, Value};
use std::cmp::Ordering;

/// A stored document.
pub type Document = Map<String, Value>;

/// The primary key field.
pub const ID_FIELD: &str = "_id";

/// Builds a filter matching one `_id`.
#[must_use]
pub fn id_filter(id: &Value) -> Document {
    let mut filter = Document::new();
    filter.insert(ID_FIELD.to_string(), id.clone());
    filter
}

/// Resolves a dotted path such as `address.city`.
#[must_use]
pub fn lookup<'a>(document: &'a Document, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let first = segments.next()?;
    segments.try_fold(document.get(first)?, |value, segment| match value {
        Value::Object(object) => object.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Returns `true` if `document` satisfies `filter`.
#[must_use]
pub fn matches(document: &Document, filter: &Document) -> bool {
    filter.iter().all(|(path, condition)| {
        let value = lookup(document, path);
        match condition {
            Value::Object(operators) if is_operator_object(operators) => operators
                .iter()
                .all(|(operator, operand)| apply_operator(value, operator, operand)),
            expected => value.is_some_and(|value| equals(value, expected)),
        }
    })
}

fn is_operator_object(object: &Map<String, Value>) -> bool {
    !object.is_empty() && object.keys().all(|key| key.starts_with('$'))
}

fn apply_operator(value: Option<&Value>, operator: &str, operand: &Value) -> bool {
    match operator {
        "$eq" => value.is_some_and(|v| equals(v, operand)),
        "$ne" => !value.is_some_and(|v| equals(v, operand)),
        "$gt" => value.is_some_and(|v| compare(v, operand) == Some(Ordering::Greater)),
        "$gte" => value.is_some_and(|v| {
            matches!(compare(v, operand), Some(Ordering::Greater | Ordering::Equal))
        }),
        "$lt" => value.is_some_and(|v| compare(v, operand) == Some(Ordering::Less)),
        "$lte" => value.is_some_and(|v| {
            matches!(compare(v, operand), Some(Ordering::Less | Ordering::Equal))
        }),
        "$in" => operand
            .as_array()
            .is_some_and(|options| value.is_some_and(|v| options.iter().any(|o| equals(v, o)))),
        "$nin" => operand
            .as_array()
            .is_some_and(|options| !value.is_some_and(|v| options.iter().any(|o| equals(v, o)))),
        "$exists" => value.is_some() == operand.as_bool().unwrap_or(true),
        _ => false,
    }
}

/// Equality with numeric normalisation, so `1` equals `1.0`.
///
/// An array value also matches when any element equals `expected`.
fn equals(value: &Value, expected: &Value) -> bool {
    if let (Value::Number(a), Value::Number(b)) = (value, expected) {
        return a.as_f64() == b.as_f64();
    }
    if value == expected {
        return true;
    }
    match value {
        Value::Array(items) if !expected.is_array() => items.iter().any(|item| equals(item, expected)),
        _ => false,
    }
}

fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

/// Returns `true` if `update` uses operators rather than replacing.
#[must_use]
pub fn is_operator_update(update: &Document) -> bool {
    update.keys().any(|key| key.starts_with('$'))
}

/// Applies `update` to `document`, returning whether anything changed.
///
/// A replacement keeps the existing `_id`.
pub fn apply_update(document: &mut Document, update: &Document) -> Result<bool, DatabaseError> {
    let before = document.clone();

    if !is_operator_update(update) {
        if let Some(id) = update.get(ID_FIELD) {
            if document.get(ID_FIELD).is_some_and(|current| current != id) {
                return Err(DatabaseError::InvalidUpdate(
                    "a replacement may not change _id".to_string(),
                ));
            }
        }
        let id = document.remove(ID_FIELD);
        document.clear();
        if let Some(id) = id {
            document.insert(ID_FIELD.to_string(), id);
        }
        for (key, value) in update {
            document.insert(key.clone(), value.clone());
        }
        return Ok(*document != before);
    }

    for (operator, fields) in update {
        let Value::Object(fields) = fields else {
            return Err(DatabaseError::InvalidUpdate(format!(
                "{operator} expects an object of fields"
            )));
        };
        if fields.contains_key(ID_FIELD) {
            return Err(DatabaseError::InvalidUpdate(format!(
                "{operator} may not modify _id"
            )));
        }
        match operator.as_str() {
            "$set" => {
                for (field, value) in fields {
                    set_path(document, field, value.clone());
                }
            }
            "$unset" => {
                for field in fields.keys() {
                    unset_path(document, field);
                }
            }
            "$inc" => {
                for (field, amount) in fields {
                    increment(document, field, amount)?;
                }
            }
            other => {
                return Err(DatabaseError::InvalidUpdate(format!(
                    "unsupported update operator {other}"
                )));
            }
        }
    }

    Ok(*document != before)
}

fn set_path(document: &mut Document, path: &str, value: Value) {
    match path.split_once('.') {
        None => {
            document.insert(path.to_string(), value);
        }
        Some((head, rest)) => {
            let child = document
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !child.is_object() {
                *child = Value::Object(Map::new());
            }
            if let Value::Object(child) = child {
                set_path(child, rest, value);
            }
        }
    }
}

fn unset_path(document: &mut Document, path: &str) {
    match path.split_once('.') {
        None => {
            document.remove(path);
        }
        Some((head, rest)) => {
            if let Some(Value::Object(child)) = document.get_mut(head) {
                unset_path(child, rest);
            }
        }
    }
}

fn increment(document: &mut Document, path: &str, amount: &Value) -> Result<(), DatabaseError> {
    let Value::Number(amount) = amount else {
        return Err(DatabaseError::InvalidUpdate(format!(
            "$inc amount for {path} must be a number"
        )));
    };

    let next = match lookup(document, path) {
        None | Some(Value::Null) => Value::Number(amount.clone()),
        Some(Value::Number(current)) => add(current, amount),
        Some(_) => {
            return Err(DatabaseError::InvalidUpdate(format!(
                "cannot apply $inc to non-numeric field {path}"
            )));
        }
    };
    set_path(document, path, next);
    Ok(())
}

fn add(a: &Number, b: &Number) -> Value {
    if let (Some(a), Some(b)) = (a.as_i64(), b.as_i64()) {
        if let Some(sum) = a.checked_add(b) {
            return Value::from(sum);
        }
    }
    let sum = a.as_f64().unwrap_or_default() + b.as_f64().unwrap_or_default();
    Number::from_f64(sum).map_or(Value::Null, Value::Number)
}

/// Returns `true` for values MongoDB-style fixtures accept as an `_id`.
///
/// Missing, `null`, `false`, zero, and empty strings, arrays or objects are
/// rejected.
#[must_use]
pub fn is_present(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null | Value::Bool(false)) => false,
        Some(Value::Number(n)) => n.as_f64() != Some(0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(items)) => !items.is_empty(),
        Some(Value::Object(object)) => !object.is_empty(),
        Some(Value::Bool(true)) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_empty_filter_matches_all() {
        assert!(matches(&doc(json!({"a": 1})), &Document::new()));
    }

    #[test]
    fn test_equality_and_paths() {
        let person = doc(json!({"name": "Peter", "age": 30, "address": {"city": "Oslo"}, "tags": ["a", "b"]}));
        assert!(matches(&person, &doc(json!({"name": "Peter"}))));
        assert!(matches(&person, &doc(json!({"age": 30.0}))));
        assert!(matches(&person, &doc(json!({"address.city": "Oslo"}))));
        assert!(matches(&person, &doc(json!({"tags": "b"}))));
        assert!(!matches(&person, &doc(json!({"name": "Paul"}))));
        assert!(!matches(&person, &doc(json!({"missing": null}))));
    }

    #[test]
    fn test_operators() {
        let item = doc(json!({"qty": 5, "status": "A"}));
        assert!(matches(&item, &doc(json!({"qty": {"$gt": 3, "$lte": 5}}))));
        assert!(!matches(&item, &doc(json!({"qty": {"$lt": 5}}))));
        assert!(matches(&item, &doc(json!({"status": {"$in": ["A", "B"]}}))));
        assert!(matches(&item, &doc(json!({"status": {"$nin": ["C"]}}))));
        assert!(matches(&item, &doc(json!({"status": {"$ne": "B"}}))));
        assert!(matches(&item, &doc(json!({"other": {"$exists": false}}))));
        assert!(!matches(&item, &doc(json!({"qty": {"$unknown": 1}}))));
    }

    #[test]
    fn test_replacement_keeps_id() {
        let mut record = doc(json!({"_id": 1, "name": "Peter", "age": 30}));
        let changed = apply_update(&mut record, &doc(json!({"name": "Paul"}))).unwrap();
        assert!(changed);
        assert_eq!(Value::Object(record), json!({"_id": 1, "name": "Paul"}));
    }

    #[test]
    fn test_replacement_may_not_change_id() {
        let mut record = doc(json!({"_id": 1}));
        assert!(apply_update(&mut record, &doc(json!({"_id": 2}))).is_err());
    }

    #[test]
    fn test_operator_update() {
        let mut record = doc(json!({"_id": 1, "count": 1, "old": true}));
        let update = doc(json!({
            "$set": {"profile.name": "Peter"},
            "$unset": {"old": ""},
            "$inc": {"count": 2, "visits": 1}
        }));
        assert!(apply_update(&mut record, &update).unwrap());
        assert_eq!(
            Value::Object(record),
            json!({"_id": 1, "count": 3, "profile": {"name": "Peter"}, "visits": 1})
        );
    }

    #[test]
    fn test_unchanged_update_reports_no_modification() {
        let mut record = doc(json!({"_id": 1, "a": 1}));
        assert!(!apply_update(&mut record, &doc(json!({"$set": {"a": 1}}))).unwrap());
    }

    #[test]
    fn test_invalid_updates() {
        let mut record = doc(json!({"_id": 1, "name": "x"}));
        assert!(apply_update(&mut record, &doc(json!({"$push": {"a": 1}}))).is_err());
        assert!(apply_update(&mut record, &doc(json!({"$set": 1}))).is_err());
        assert!(apply_update(&mut record, &doc(json!({"$inc": {"name": 1}}))).is_err());
        assert!(apply_update(&mut record, &doc(json!({"$set": {"_id": 2}}))).is_err());
    }

    #[test]
    fn test_is_present() {
        assert!(is_present(Some(&json!("652790328c73b750984aee34"))));
        assert!(is_present(Some(&json!(7))));
        assert!(!is_present(None));
        assert!(!is_present(Some(&json!(""))));
        assert!(!is_present(Some(&json!(0))));
        assert!(!is_present(Some(&Value::Null)));
    }
}
