// In-memory transport for unit tests: canned GET responses, injectable
// failures, and a log of every call made.

use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Mutex;

use crate::api::{ApiError, Method, Transport};

type ErrorFactory = Box<dyn Fn() -> ApiError + Send + Sync>;

#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub method: Method,
    pub path: String,
    pub body: Option<String>,
}

impl Call {
    pub fn json(&self) -> Value {
        serde_json::from_str(self.body.as_deref().unwrap_or("null")).unwrap()
    }
}

/// GETs without a canned response return an empty object; writes
/// succeed with `{}` unless a failure is registered for their path.
#[derive(Default)]
pub struct FakeTransport {
    gets: HashMap<String, Value>,
    failures: HashMap<(bool, String), ErrorFactory>,
    calls: Mutex<Vec<Call>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_get(mut self, path: &str, response: Value) -> Self {
        self.gets.insert(path.to_string(), response);
        self
    }

    pub fn fail_get(mut self, path: &str, err: impl Fn() -> ApiError + Send + Sync + 'static) -> Self {
        self.failures.insert((true, path.to_string()), Box::new(err));
        self
    }

    /// Fail POST and PUT calls to exactly `path`.
    pub fn fail_write(mut self, path: &str, err: impl Fn() -> ApiError + Send + Sync + 'static) -> Self {
        self.failures.insert((false, path.to_string()), Box::new(err));
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn writes(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| c.method != Method::Get)
            .collect()
    }
}

impl Transport for FakeTransport {
    fn request(&self, method: Method, path: &str, body: Option<&str>) -> Result<Value, ApiError> {
        self.calls.lock().unwrap().push(Call {
            method,
            path: path.to_string(),
            body: body.map(str::to_string),
        });

        let is_get = method == Method::Get;
        if let Some(err) = self.failures.get(&(is_get, path.to_string())) {
            return Err(err());
        }
        if is_get {
            Ok(self.gets.get(path).cloned().unwrap_or_else(|| json!({})))
        } else {
            Ok(json!({}))
        }
    }
}
