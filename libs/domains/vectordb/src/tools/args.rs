use serde_json::{Map, Value};

use crate::error::{VectorDbError, VectorDbResult};
use crate::models::{Document, Metadata};

/// Typed access to a tool's raw argument map.
///
/// `null` is treated as absent. Field names in error messages carry a path
/// prefix for nested objects, e.g. `documents[2].vector[1]`.
#[derive(Debug, Clone, Copy)]
pub struct Arguments<'a> {
    map: &'a Map<String, Value>,
    path: &'a str,
}

static EMPTY: std::sync::LazyLock<Map<String, Value>> = std::sync::LazyLock::new(Map::new);

impl<'a> Arguments<'a> {
    pub fn new(map: &'a Map<String, Value>) -> Self {
        Self { map, path: "" }
    }

    /// Wrap the top-level `arguments` value. Absent or `null` means no arguments.
    pub fn from_value(value: &'a Value) -> VectorDbResult<Self> {
        match value {
            Value::Object(map) => Ok(Self::new(map)),
            Value::Null => Ok(Self::new(&EMPTY)),
            _ => Err(VectorDbError::invalid_argument("arguments must be an object")),
        }
    }

    fn nested(map: &'a Map<String, Value>, path: &'a str) -> Self {
        Self { map, path }
    }

    fn field(&self, key: &str) -> String {
        if self.path.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", self.path, key)
        }
    }

    fn get(&self, key: &str) -> Option<&'a Value> {
        self.map.get(key).filter(|v| !v.is_null())
    }

    pub fn required_str(&self, key: &str) -> VectorDbResult<String> {
        match self.get(key) {
            Some(Value::String(s)) => Ok(s.clone()),
            _ => Err(VectorDbError::invalid_argument(format!(
                "{} is required and must be a string",
                self.field(key)
            ))),
        }
    }

    pub fn optional_str(&self, key: &str) -> VectorDbResult<Option<String>> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(_) => Err(VectorDbError::invalid_argument(format!(
                "{} must be a string",
                self.field(key)
            ))),
        }
    }

    pub fn str_or(&self, key: &str, default: &str) -> VectorDbResult<String> {
        Ok(self
            .optional_str(key)?
            .unwrap_or_else(|| default.to_string()))
    }

    /// Non-negative integer. Floats are accepted when they have no fractional part.
    pub fn usize_or(&self, key: &str, default: usize) -> VectorDbResult<usize> {
        let invalid = || {
            VectorDbError::invalid_argument(format!(
                "{} must be a non-negative integer",
                self.field(key)
            ))
        };

        match self.get(key) {
            None => Ok(default),
            Some(Value::Number(n)) => {
                if let Some(v) = n.as_u64() {
                    usize::try_from(v).map_err(|_| invalid())
                } else if let Some(f) = n.as_f64() {
                    if f >= 0.0 && f.fract() == 0.0 && f <= usize::MAX as f64 {
                        Ok(f as usize)
                    } else {
                        Err(invalid())
                    }
                } else {
                    Err(invalid())
                }
            }
            Some(_) => Err(invalid()),
        }
    }

    pub fn object_or_empty(&self, key: &str) -> VectorDbResult<Metadata> {
        match self.get(key) {
            None => Ok(Metadata::new()),
            Some(Value::Object(map)) => Ok(map.clone()),
            Some(_) => Err(VectorDbError::invalid_argument(format!(
                "{} must be an object",
                self.field(key)
            ))),
        }
    }

    /// Optional array of numbers. Any non-numeric entry rejects the whole vector.
    pub fn optional_vector(&self, key: &str) -> VectorDbResult<Option<Vec<f32>>> {
        let items = match self.get(key) {
            None => return Ok(None),
            Some(Value::Array(items)) => items,
            Some(_) => {
                return Err(VectorDbError::invalid_argument(format!(
                    "{} must be an array of numbers",
                    self.field(key)
                )));
            }
        };

        items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                item.as_f64().map(|v| v as f32).ok_or_else(|| {
                    VectorDbError::invalid_argument(format!(
                        "invalid vector value at index {} in {}",
                        i,
                        self.field(key)
                    ))
                })
            })
            .collect::<VectorDbResult<Vec<f32>>>()
            .map(Some)
    }

    /// Required non-empty array of strings.
    pub fn required_str_list(&self, key: &str) -> VectorDbResult<Vec<String>> {
        let invalid = || {
            VectorDbError::invalid_argument(format!(
                "{} is required and must be a non-empty array of strings",
                self.field(key)
            ))
        };

        match self.get(key) {
            Some(Value::Array(items)) if !items.is_empty() => items
                .iter()
                .map(|item| item.as_str().map(str::to_string).ok_or_else(invalid))
                .collect(),
            _ => Err(invalid()),
        }
    }

    /// A document built from `url`, `text`, `metadata` and `vector` keys.
    pub fn document(&self) -> VectorDbResult<Document> {
        let mut document = Document::new(self.required_str("url")?, self.required_str("text")?)
            .with_metadata(self.object_or_empty("metadata")?);
        document.vector = self.optional_vector("vector")?;
        Ok(document)
    }

    /// Required non-empty array of document objects. One bad item rejects the batch.
    pub fn required_documents(&self, key: &str) -> VectorDbResult<Vec<Document>> {
        let items = match self.get(key) {
            Some(Value::Array(items)) if !items.is_empty() => items,
            _ => {
                return Err(VectorDbError::invalid_argument(format!(
                    "{} is required and must be a non-empty array of documents",
                    self.field(key)
                )));
            }
        };

        items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                let path = format!("{}[{}]", self.field(key), i);
                match item {
                    Value::Object(map) => Arguments::nested(map, &path).document(),
                    _ => Err(VectorDbError::invalid_argument(format!(
                        "{} must be an object",
                        path
                    ))),
                }
            })
            .collect()
    }
}
