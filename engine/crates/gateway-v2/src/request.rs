use serde_json::{Map, Value};

use crate::Error;

/// A single generated root field to execute, `queryTodo(filter: ...)` for instance.
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct Request {
    pub field: String,
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

impl Request {
    pub fn new(field: impl Into<String>) -> Self {
        Request {
            field: field.into(),
            arguments: Map::new(),
        }
    }

    #[must_use]
    pub fn argument(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.arguments.insert(name.into(), value.into());
        self
    }

    pub(crate) fn get(&self, name: &str) -> Option<&Value> {
        self.arguments.get(name).filter(|value| !value.is_null())
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ResponseError {
    pub message: String,
}

impl From<&Error> for ResponseError {
    fn from(error: &Error) -> Self {
        ResponseError {
            message: error.to_string(),
        }
    }
}

/// `{"data": {...}, "errors": [...]}`, errors omitted when empty.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Response {
    pub data: Value,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ResponseError>,
}

impl Response {
    pub(crate) fn new(field: &str, result: Value, errors: &[Error]) -> Self {
        let mut data = Map::new();
        data.insert(field.to_string(), result);

        Response {
            data: Value::Object(data),
            errors: errors.iter().map(ResponseError::from).collect(),
        }
    }

    pub(crate) fn error(field: &str, error: &Error) -> Self {
        Response::new(field, Value::Null, std::slice::from_ref(error))
    }

    /// The result of the root field.
    pub fn field(&self, name: &str) -> &Value {
        self.data.get(name).unwrap_or(&Value::Null)
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}
