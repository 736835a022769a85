//! JSON patch documents (RFC 6902) over flat transfer objects.
//!
//! Only single-segment paths such as `/title` are addressable, matched
//! without regard to case. Operations that cannot be applied are reported
//! to the [`ModelState`] and skipped; the rest of the document still runs.

use crate::http::model_state::ModelState;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    Add,
    Remove,
    Replace,
    Move,
    Copy,
    Test,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PatchOperation {
    pub op: OperationType,
    pub path: String,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub value: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct PatchDocument(Vec<PatchOperation>);

impl PatchDocument {
    /// Applies every operation to `target` in order, returning the patched value.
    ///
    /// Failures are recorded under `key`.
    pub fn apply_to<T>(&self, target: T, model_state: &mut ModelState, key: &str) -> T
    where
        T: Serialize + DeserializeOwned + Default,
    {
        let (Some(mut document), Some(defaults)) = (as_object(&target), as_object(&T::default()))
        else {
            model_state.add_error(key, "The target object could not be represented as JSON.");
            return target;
        };

        let mut current = target;
        for operation in &self.0 {
            let mut candidate = document.clone();
            if let Err(message) = operation.apply(&mut candidate, &defaults) {
                model_state.add_error(key, message);
                continue;
            }

            match serde_json::from_value::<T>(Value::Object(candidate.clone())) {
                Ok(patched) => {
                    document = candidate;
                    current = patched;
                }
                Err(_) => model_state.add_error(
                    key,
                    format!(
                        "The value '{}' is invalid for target location.",
                        operation.value()
                    ),
                ),
            }
        }

        current
    }
}

fn as_object<T: Serialize>(value: &T) -> Option<Map<String, Value>> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

impl PatchOperation {
    fn value(&self) -> Value {
        self.value.clone().unwrap_or(Value::Null)
    }

    fn apply(
        &self,
        document: &mut Map<String, Value>,
        defaults: &Map<String, Value>,
    ) -> Result<(), String> {
        let target = resolve(document, &self.path)?;
        match self.op {
            OperationType::Add | OperationType::Replace => {
                document.insert(target, self.value());
            }
            OperationType::Remove => {
                let default = defaults.get(&target).cloned().unwrap_or(Value::Null);
                document.insert(target, default);
            }
            OperationType::Copy | OperationType::Move => {
                let from = self
                    .from
                    .as_deref()
                    .ok_or_else(|| format!("The '{:?}' operation requires a 'from' location.", self.op))?;
                let source = resolve(document, from)?;
                let value = document.get(&source).cloned().unwrap_or(Value::Null);
                if self.op == OperationType::Move && source != target {
                    let default = defaults.get(&source).cloned().unwrap_or(Value::Null);
                    document.insert(source, default);
                }
                document.insert(target, value);
            }
            OperationType::Test => {
                let current = document.get(&target).cloned().unwrap_or(Value::Null);
                let expected = self.value();
                if current != expected {
                    return Err(format!(
                        "The current value '{current}' at path '{}' is not equal to the test value '{expected}'.",
                        self.path
                    ));
                }
            }
        }

        Ok(())
    }
}

/// Maps a `/segment` path onto an existing key of `document`.
fn resolve(document: &Map<String, Value>, path: &str) -> Result<String, String> {
    let segment = path.strip_prefix('/').unwrap_or(path);
    if segment.is_empty() || segment.contains('/') {
        return Err(format!(
            "The target location specified by path '{path}' was not found."
        ));
    }

    document
        .keys()
        .find(|key| key.eq_ignore_ascii_case(segment))
        .cloned()
        .ok_or_else(|| {
            format!("The target location specified by path segment '{segment}' was not found.")
        })
}
