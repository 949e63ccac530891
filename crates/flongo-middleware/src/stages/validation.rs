//! Request and response schema validation.
//!
//! Schemas are JSON-Schema documents registered per HTTP method on a route.
//! A method without a schema is not validated at all.
//!
//! # Pipeline Position
//!
//! Request validation runs after authorization and before the action.
//! Response validation runs after the action, and only for JSON object
//! bodies:
//!
//! ```text
//! Authorization → [Validation] → Action → [ResponseValidation] → Response
//! ```
//!
//! # Supported keywords
//!
//! `type`, `enum`, `const`, `required`, `properties`, `additionalProperties`,
//! `minProperties`, `maxProperties`, `items`, `minItems`, `maxItems`,
//! `uniqueItems`, `minLength`, `maxLength`, `pattern`, `minimum`, `maximum`,
//! `exclusiveMinimum`, `exclusiveMaximum`, `multipleOf`, `allOf`, `anyOf`,
//! `oneOf` and `not`. Unknown keywords such as `format` or `description` are
//! ignored.
//!
//! Validation stops at the first failure. Keywords are checked in a fixed
//! order and object members in document order, so the same payload and
//! schema always produce the same message.

use flongo_core::{HttpMethod, Payload, SchemaValidationError};
use parking_lot::RwLock;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::OnceLock;
use thiserror::Error;

const TYPE_NAMES: [&str; 7] = [
    "null", "boolean", "object", "array", "number", "string", "integer",
];

/// Per-method schemas for one route.
///
/// Registering an empty `RouteSchema` behaves exactly like registering none.
///
/// # Example
///
/// ```rust
/// use flongo_core::HttpMethod;
/// use flongo_middleware::RouteSchema;
/// use serde_json::json;
///
/// let schema = RouteSchema::new().post(json!({
///     "type": "object",
///     "properties": {"_id": {"type": "integer"}},
///     "required": ["_id"]
/// }));
///
/// assert!(schema.for_method(HttpMethod::Post).is_some());
/// assert!(schema.for_method(HttpMethod::Get).is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteSchema {
    schemas: BTreeMap<HttpMethod, Value>,
}

impl RouteSchema {
    /// Creates an empty schema set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the schema for `method`.
    #[must_use]
    pub fn method(mut self, method: HttpMethod, schema: Value) -> Self {
        self.schemas.insert(method, schema);
        self
    }

    /// Sets the `GET` schema.
    #[must_use]
    pub fn get(self, schema: Value) -> Self {
        self.method(HttpMethod::Get, schema)
    }

    /// Sets the `POST` schema.
    #[must_use]
    pub fn post(self, schema: Value) -> Self {
        self.method(HttpMethod::Post, schema)
    }

    /// Sets the `PUT` schema.
    #[must_use]
    pub fn put(self, schema: Value) -> Self {
        self.method(HttpMethod::Put, schema)
    }

    /// Sets the `PATCH` schema.
    #[must_use]
    pub fn patch(self, schema: Value) -> Self {
        self.method(HttpMethod::Patch, schema)
    }

    /// Sets the `DELETE` schema.
    #[must_use]
    pub fn delete(self, schema: Value) -> Self {
        self.method(HttpMethod::Delete, schema)
    }

    /// Returns the schema for `method`.
    ///
    /// Use [`RouteSchema::method`] (or the per-method setters) to register one.
    #[must_use]
    pub fn for_method(&self, method: HttpMethod) -> Option<&Value> {
        self.schemas.get(&method)
    }

    /// Returns `true` if no method has a schema.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Methods that carry a schema.
    pub fn methods(&self) -> impl Iterator<Item = HttpMethod> + '_ {
        self.schemas.keys().copied()
    }

    /// Checks that every registered document is a usable schema.
    pub fn check(&self) -> Result<(), SchemaDocumentError> {
        for (method, schema) in &self.schemas {
            check_document(schema, &mut Vec::new()).map_err(|reason| {
                SchemaDocumentError {
                    method: *method,
                    reason,
                }
            })?;
        }
        Ok(())
    }
}

/// A registered schema document is itself invalid.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {method} schema: {reason}")]
pub struct SchemaDocumentError {
    /// Method the schema was registered for.
    pub method: HttpMethod,
    /// What is wrong with it.
    pub reason: String,
}

/// The first place an instance failed its schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Member names and array indices leading to the failing value.
    pub path: Vec<String>,
    /// What went wrong.
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            f.write_str(&self.message)
        } else {
            write!(f, "{}: {}", self.path.join("."), self.message)
        }
    }
}

/// Validates payloads and response bodies for one route URL.
#[derive(Debug, Clone)]
pub struct SchemaValidator {
    url: String,
}

impl SchemaValidator {
    /// Creates a validator for `url`, used in error reports.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    /// Validates an inbound payload against the schema for `method`.
    pub fn validate_request(
        &self,
        method: HttpMethod,
        payload: &Payload,
        schemas: &RouteSchema,
    ) -> Result<(), SchemaValidationError> {
        self.validate(method, payload, schemas, false)
    }

    /// Validates a JSON object response body against the schema for `method`.
    pub fn validate_response(
        &self,
        method: HttpMethod,
        body: &Map<String, Value>,
        schemas: &RouteSchema,
    ) -> Result<(), SchemaValidationError> {
        self.validate(method, body, schemas, true)
    }

    fn validate(
        &self,
        method: HttpMethod,
        object: &Map<String, Value>,
        schemas: &RouteSchema,
        is_response_schema: bool,
    ) -> Result<(), SchemaValidationError> {
        let Some(schema) = schemas.for_method(method) else {
            return Ok(());
        };

        validate_value(&Value::Object(object.clone()), schema).map_err(|violation| {
            SchemaValidationError {
                url: self.url.clone(),
                method,
                message: violation.to_string(),
                schema: schema.clone(),
                is_response_schema,
            }
        })
    }
}

/// Validates `instance` against `schema`, returning the first violation.
///
/// ```rust
/// use flongo_middleware::validate_value;
/// use serde_json::json;
///
/// let schema = json!({"type": "object", "properties": {"_id": {"type": "integer"}}});
/// let err = validate_value(&json!({"_id": "abc"}), &schema).unwrap_err();
/// assert_eq!(err.to_string(), r#"_id: "abc" is not of type "integer""#);
/// ```
pub fn validate_value(instance: &Value, schema: &Value) -> Result<(), Violation> {
    let mut path = Vec::new();
    match check(instance, schema, &mut path) {
        Some(message) => Err(Violation { path, message }),
        None => Ok(()),
    }
}

fn render(value: &Value) -> String {
    value.to_string()
}

fn is_type(value: &Value, name: &str) -> bool {
    match name {
        "null" => value.is_null(),
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        "number" => value.is_number(),
        "string" => value.is_string(),
        "integer" => {
            value.is_i64() || value.is_u64() || value.as_f64().is_some_and(|f| f.fract() == 0.0)
        }
        _ => false,
    }
}

/// Returns the failure message, leaving `path` pointing at the failing value.
fn check(instance: &Value, schema: &Value, path: &mut Vec<String>) -> Option<String> {
    let schema = match schema {
        Value::Bool(true) => return None,
        Value::Bool(false) => return Some(format!("False schema does not allow {}", render(instance))),
        Value::Object(schema) => schema,
        _ => return None,
    };

    if let Some(message) = check_type(instance, schema.get("type")) {
        return Some(message);
    }

    if let Some(Value::Array(options)) = schema.get("enum") {
        if !options.contains(instance) {
            return Some(format!(
                "{} is not one of {}",
                render(instance),
                render(&Value::Array(options.clone()))
            ));
        }
    }

    if let Some(expected) = schema.get("const") {
        if expected != instance {
            return Some(format!("{} was expected", render(expected)));
        }
    }

    let found = match instance {
        Value::Object(object) => check_object(object, schema, path),
        Value::Array(items) => check_array(items, schema, path),
        Value::String(text) => check_string(text, schema),
        Value::Number(_) => check_number(instance, schema),
        Value::Null | Value::Bool(_) => None,
    };
    if found.is_some() {
        return found;
    }

    check_combinators(instance, schema, path)
}

fn check_type(instance: &Value, type_keyword: Option<&Value>) -> Option<String> {
    match type_keyword {
        Some(Value::String(name)) if !is_type(instance, name) => Some(format!(
            "{} is not of type {}",
            render(instance),
            render(&Value::String(name.clone()))
        )),
        Some(Value::Array(names)) => {
            let matches = names
                .iter()
                .filter_map(Value::as_str)
                .any(|name| is_type(instance, name));
            if matches {
                None
            } else {
                let names: Vec<String> = names.iter().map(render).collect();
                Some(format!(
                    "{} is not of type {}",
                    render(instance),
                    names.join(", ")
                ))
            }
        }
        _ => None,
    }
}

fn check_object(
    object: &Map<String, Value>,
    schema: &Map<String, Value>,
    path: &mut Vec<String>,
) -> Option<String> {
    if let Some(Value::Array(required)) = schema.get("required") {
        for name in required.iter().filter_map(Value::as_str) {
            if !object.contains_key(name) {
                return Some(format!("\"{name}\" is a required property"));
            }
        }
    }

    if let Some(min) = schema.get("minProperties").and_then(Value::as_u64) {
        if (object.len() as u64) < min {
            return Some(format!("{} does not have enough properties", render_object(object)));
        }
    }
    if let Some(max) = schema.get("maxProperties").and_then(Value::as_u64) {
        if (object.len() as u64) > max {
            return Some(format!("{} has too many properties", render_object(object)));
        }
    }

    let properties = schema.get("properties").and_then(Value::as_object);
    if let Some(properties) = properties {
        for (name, property_schema) in properties {
            if let Some(value) = object.get(name) {
                path.push(name.clone());
                if let Some(message) = check(value, property_schema, path) {
                    return Some(message);
                }
                path.pop();
            }
        }
    }

    match schema.get("additionalProperties") {
        Some(Value::Bool(false)) => {
            let extras: Vec<String> = object
                .keys()
                .filter(|name| !properties.is_some_and(|p| p.contains_key(*name)))
                .map(|name| format!("\"{name}\""))
                .collect();
            if !extras.is_empty() {
                let verb = if extras.len() == 1 { "was" } else { "were" };
                return Some(format!(
                    "Additional properties are not allowed ({} {verb} unexpected)",
                    extras.join(", ")
                ));
            }
        }
        Some(additional @ Value::Object(_)) => {
            for (name, value) in object {
                if properties.is_some_and(|p| p.contains_key(name)) {
                    continue;
                }
                path.push(name.clone());
                if let Some(message) = check(value, additional, path) {
                    return Some(message);
                }
                path.pop();
            }
        }
        _ => {}
    }

    None
}

fn render_object(object: &Map<String, Value>) -> String {
    render(&Value::Object(object.clone()))
}

fn check_array(items: &[Value], schema: &Map<String, Value>, path: &mut Vec<String>) -> Option<String> {
    let rendered = || render(&Value::Array(items.to_vec()));

    if let Some(min) = schema.get("minItems").and_then(Value::as_u64) {
        if (items.len() as u64) < min {
            return Some(format!("{} is too short", rendered()));
        }
    }
    if let Some(max) = schema.get("maxItems").and_then(Value::as_u64) {
        if (items.len() as u64) > max {
            return Some(format!("{} is too long", rendered()));
        }
    }
    if schema.get("uniqueItems") == Some(&Value::Bool(true)) {
        for (i, item) in items.iter().enumerate() {
            if items[..i].contains(item) {
                return Some(format!("{} has non-unique elements", rendered()));
            }
        }
    }

    if let Some(item_schema) = schema.get("items") {
        for (index, item) in items.iter().enumerate() {
            path.push(index.to_string());
            if let Some(message) = check(item, item_schema, path) {
                return Some(message);
            }
            path.pop();
        }
    }

    None
}

fn check_string(text: &str, schema: &Map<String, Value>) -> Option<String> {
    let length = text.chars().count() as u64;
    let rendered = || render(&Value::String(text.to_string()));

    if let Some(min) = schema.get("minLength").and_then(Value::as_u64) {
        if length < min {
            return Some(format!("{} is too short", rendered()));
        }
    }
    if let Some(max) = schema.get("maxLength").and_then(Value::as_u64) {
        if length > max {
            return Some(format!("{} is too long", rendered()));
        }
    }
    if let Some(pattern) = schema.get("pattern").and_then(Value::as_str) {
        match compiled_pattern(pattern) {
            Ok(regex) if !regex.is_match(text) => {
                return Some(format!("{} does not match \"{pattern}\"", rendered()));
            }
            Ok(_) => {}
            Err(error) => {
                tracing::warn!(%error, pattern, "skipping uncompilable schema pattern");
            }
        }
    }
    None
}

/// Compiled `pattern` keywords, shared by every schema in the process.
fn pattern_cache() -> &'static RwLock<HashMap<String, Regex>> {
    static PATTERNS: OnceLock<RwLock<HashMap<String, Regex>>> = OnceLock::new();
    PATTERNS.get_or_init(RwLock::default)
}

/// Compiles `pattern` on first use and reuses it afterwards.
fn compiled_pattern(pattern: &str) -> Result<Regex, regex::Error> {
    if let Some(regex) = pattern_cache().read().get(pattern) {
        return Ok(regex.clone());
    }
    let regex = Regex::new(pattern)?;
    pattern_cache()
        .write()
        .entry(pattern.to_string())
        .or_insert_with(|| regex.clone());
    Ok(regex)
}

fn check_number(instance: &Value, schema: &Map<String, Value>) -> Option<String> {
    let value = instance.as_f64()?;
    let bound = |key: &str| schema.get(key).and_then(Value::as_f64);
    let rendered = render(instance);

    if let Some(min) = bound("minimum") {
        if value < min {
            return Some(format!("{rendered} is less than the minimum of {}", render(&schema["minimum"])));
        }
    }
    if let Some(max) = bound("maximum") {
        if value > max {
            return Some(format!("{rendered} is greater than the maximum of {}", render(&schema["maximum"])));
        }
    }
    if let Some(min) = bound("exclusiveMinimum") {
        if value <= min {
            return Some(format!(
                "{rendered} is less than or equal to the minimum of {}",
                render(&schema["exclusiveMinimum"])
            ));
        }
    }
    if let Some(max) = bound("exclusiveMaximum") {
        if value >= max {
            return Some(format!(
                "{rendered} is greater than or equal to the maximum of {}",
                render(&schema["exclusiveMaximum"])
            ));
        }
    }
    if let Some(step) = bound("multipleOf").filter(|s| *s > 0.0) {
        let quotient = value / step;
        if (quotient - quotient.round()).abs() > f64::EPSILON * quotient.abs().max(1.0) {
            return Some(format!("{rendered} is not a multiple of {}", render(&schema["multipleOf"])));
        }
    }
    None
}

fn check_combinators(instance: &Value, schema: &Map<String, Value>, path: &mut Vec<String>) -> Option<String> {
    if let Some(Value::Array(all)) = schema.get("allOf") {
        for sub in all {
            if let Some(message) = check(instance, sub, path) {
                return Some(message);
            }
        }
    }

    let passes = |sub: &Value| check(instance, sub, &mut Vec::new()).is_none();

    if let Some(Value::Array(any)) = schema.get("anyOf") {
        if !any.iter().any(passes) {
            return Some(format!("{} is not valid under any of the given schemas", render(instance)));
        }
    }

    if let Some(Value::Array(one)) = schema.get("oneOf") {
        match one.iter().filter(|sub| passes(sub)).count() {
            1 => {}
            0 => {
                return Some(format!(
                    "{} is not valid under any of the given schemas",
                    render(instance)
                ))
            }
            _ => {
                return Some(format!(
                    "{} is valid under more than one of the given schemas",
                    render(instance)
                ))
            }
        }
    }

    if let Some(not) = schema.get("not") {
        if passes(not) {
            return Some(format!("{} should not be valid under {}", render(instance), render(not)));
        }
    }

    None
}

/// Structural check of a schema document, run once at registration.
fn check_document(schema: &Value, path: &mut Vec<String>) -> Result<(), String> {
    let at = |path: &[String], what: &str| {
        if path.is_empty() {
            what.to_string()
        } else {
            format!("{} at {}", what, path.join("."))
        }
    };

    let object = match schema {
        Value::Bool(_) => return Ok(()),
        Value::Object(object) => object,
        other => return Err(at(path, &format!("schema must be an object, found {}", render(other)))),
    };

    match object.get("type") {
        None => {}
        Some(Value::String(name)) if TYPE_NAMES.contains(&name.as_str()) => {}
        Some(Value::Array(names))
            if names
                .iter()
                .all(|n| n.as_str().is_some_and(|n| TYPE_NAMES.contains(&n))) => {}
        Some(other) => return Err(at(path, &format!("unknown type {}", render(other)))),
    }

    if let Some(required) = object.get("required") {
        let valid = required
            .as_array()
            .is_some_and(|names| names.iter().all(Value::is_string));
        if !valid {
            return Err(at(path, "\"required\" must be an array of strings"));
        }
    }

    if let Some(pattern) = object.get("pattern") {
        let compiles = pattern.as_str().is_some_and(|p| compiled_pattern(p).is_ok());
        if !compiles {
            return Err(at(path, &format!("invalid pattern {}", render(pattern))));
        }
    }

    if let Some(properties) = object.get("properties") {
        let Some(properties) = properties.as_object() else {
            return Err(at(path, "\"properties\" must be an object"));
        };
        for (name, sub) in properties {
            path.push(name.clone());
            check_document(sub, path)?;
            path.pop();
        }
    }

    for key in ["items", "additionalProperties", "not"] {
        if let Some(sub) = object.get(key) {
            path.push(key.to_string());
            check_document(sub, path)?;
            path.pop();
        }
    }

    for key in ["allOf", "anyOf", "oneOf"] {
        if let Some(subs) = object.get(key) {
            let Some(subs) = subs.as_array() else {
                return Err(at(path, &format!("\"{key}\" must be an array")));
            };
            for (i, sub) in subs.iter().enumerate() {
                path.push(format!("{key}.{i}"));
                check_document(sub, path)?;
                path.pop();
            }
        }
    }

    Ok(())
}
