//! Per-request options for cached fetches

use futures::future::{self, BoxFuture, FutureExt};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{FetchError, TransformError};

/// Future returned by a [`Transform`]
pub type TransformFuture = BoxFuture<'static, Result<Value, TransformError>>;

/// A single query parameter value
#[derive(Debug, Clone, PartialEq)]
pub enum QueryValue {
    String(String),
    Number(Number),
    Bool(bool),
}

impl QueryValue {
    /// The value as it is sent on the wire
    pub fn to_param(&self) -> String {
        match self {
            QueryValue::String(s) => s.clone(),
            QueryValue::Number(n) => n.to_string(),
            QueryValue::Bool(b) => b.to_string(),
        }
    }

    fn to_json(&self) -> Value {
        match self {
            QueryValue::String(s) => Value::String(s.clone()),
            QueryValue::Number(n) => Value::Number(n.clone()),
            QueryValue::Bool(b) => Value::Bool(*b),
        }
    }
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        QueryValue::String(value.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(value: String) -> Self {
        QueryValue::String(value)
    }
}

impl From<bool> for QueryValue {
    fn from(value: bool) -> Self {
        QueryValue::Bool(value)
    }
}

macro_rules! query_value_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for QueryValue {
                fn from(value: $t) -> Self {
                    QueryValue::Number(Number::from(value))
                }
            }
        )*
    };
}

query_value_from_int!(i32, i64, u32, u64);

/// Query parameters appended to a request
///
/// Parameters are kept sorted by name, which gives cache keys and request URLs
/// a stable ordering regardless of insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query(BTreeMap<String, QueryValue>);

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a parameter, replacing any previous value for `name`
    pub fn param(mut self, name: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<QueryValue>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&QueryValue> {
        self.0.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Name/value pairs ready for the HTTP layer
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        self.0
            .iter()
            .map(|(name, value)| (name.clone(), value.to_param()))
            .collect()
    }

    pub(crate) fn to_json(&self) -> Value {
        let map: Map<String, Value> = self
            .0
            .iter()
            .map(|(name, value)| (name.clone(), value.to_json()))
            .collect();
        Value::Object(map)
    }
}

impl<K, V> FromIterator<(K, V)> for Query
where
    K: Into<String>,
    V: Into<QueryValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut query = Query::new();
        for (name, value) in iter {
            query.insert(name, value);
        }
        query
    }
}

/// Shapes a fetched response before it is cached and returned
///
/// Transforms may be plain functions, fallible functions, or async functions.
/// Cloning a transform is cheap.
#[derive(Clone)]
pub struct Transform(Arc<dyn Fn(Value) -> TransformFuture + Send + Sync>);

impl Transform {
    /// Wraps an infallible synchronous function
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        Self(Arc::new(move |value: Value| -> TransformFuture {
            future::ready(Ok(f(value))).boxed()
        }))
    }

    /// Wraps a fallible synchronous function
    pub fn try_new<F, E>(f: F) -> Self
    where
        F: Fn(Value) -> Result<Value, E> + Send + Sync + 'static,
        E: Into<TransformError>,
    {
        Self(Arc::new(move |value: Value| -> TransformFuture {
            future::ready(f(value).map_err(Into::<TransformError>::into)).boxed()
        }))
    }

    /// Wraps an async function
    pub fn future<F, Fut, E>(f: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, E>> + Send + 'static,
        E: Into<TransformError>,
    {
        Self(Arc::new(move |value: Value| -> TransformFuture {
            f(value)
                .map(|result| result.map_err(Into::<TransformError>::into))
                .boxed()
        }))
    }

    pub async fn apply(&self, value: Value) -> Result<Value, TransformError> {
        (self.0)(value).await
    }
}

impl fmt::Debug for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Transform(..)")
    }
}

/// Options for a single cached fetch
///
/// Without `max_age` the response is fetched on every call and never stored.
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    /// Query parameters appended to the URL
    pub query: Option<Query>,
    /// How long a stored response stays fresh
    pub max_age: Option<Duration>,
    /// Applied to the response body before it is stored and returned
    pub transform: Option<Transform>,
}

impl FetchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(mut self, query: Query) -> Self {
        self.query = Some(query);
        self
    }

    pub fn max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }

    pub fn transform(mut self, transform: Transform) -> Self {
        self.transform = Some(transform);
        self
    }

    /// Builds options from an untyped JSON object
    ///
    /// Recognizes `query` (object of strings, numbers or booleans), `maxAge`
    /// (non-negative integer milliseconds) and `transform`. A JSON document
    /// cannot carry a function, so any non-null `transform` is rejected.
    /// `null` values count as absent and unknown keys are ignored.
    pub fn from_json(options: &Value) -> Result<Self, FetchError> {
        let object = options
            .as_object()
            .ok_or_else(|| FetchError::invalid_argument("options", "object", json_type(options)))?;

        let mut parsed = FetchOptions::new();

        if let Some(transform) = present(object, "transform") {
            return Err(FetchError::invalid_argument(
                "transform",
                "function",
                json_type(transform),
            ));
        }

        if let Some(query) = present(object, "query") {
            let entries = query
                .as_object()
                .ok_or_else(|| FetchError::invalid_argument("query", "object", json_type(query)))?;

            let mut params = Query::new();
            for (name, value) in entries {
                let value = match value {
                    Value::String(s) => QueryValue::String(s.clone()),
                    Value::Number(n) => QueryValue::Number(n.clone()),
                    Value::Bool(b) => QueryValue::Bool(*b),
                    other => {
                        return Err(FetchError::invalid_argument(
                            format!("query.{name}"),
                            "string, number or boolean",
                            json_type(other),
                        ))
                    }
                };
                params.insert(name.clone(), value);
            }
            parsed.query = Some(params);
        }

        if let Some(max_age) = present(object, "maxAge") {
            let millis = max_age.as_u64().ok_or_else(|| {
                FetchError::invalid_argument("maxAge", "non-negative integer", json_type(max_age))
            })?;
            parsed.max_age = Some(Duration::from_millis(millis));
        }

        Ok(parsed)
    }
}

fn present<'a>(object: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    object.get(key).filter(|value| !value.is_null())
}

/// Name of a JSON value's type, for error messages
fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
