//! Wire types for Qdrant REST responses.

use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Deserialize)]
pub(crate) struct QueryResponse {
    pub(crate) result: QueryResponseResult,
}

#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum QueryResponseResult {
    Points(Vec<QueryPoint>),
    Object {
        #[serde(default)]
        points: Vec<QueryPoint>,
    },
}

impl QueryResponseResult {
    pub(crate) fn into_points(self) -> Vec<QueryPoint> {
        match self {
            Self::Points(points) | Self::Object { points } => points,
        }
    }
}

#[derive(Deserialize)]
pub(crate) struct QueryPoint {
    pub(crate) id: Value,
    pub(crate) score: f32,
    #[serde(default)]
    pub(crate) payload: Option<Map<String, Value>>,
}

#[derive(Deserialize)]
pub(crate) struct CollectionInfoResponse {
    pub(crate) result: CollectionInfo,
}

#[derive(Deserialize)]
pub(crate) struct CollectionInfo {
    pub(crate) config: CollectionConfig,
}

#[derive(Deserialize)]
pub(crate) struct CollectionConfig {
    pub(crate) params: CollectionParams,
}

#[derive(Deserialize)]
pub(crate) struct CollectionParams {
    #[serde(default)]
    pub(crate) vectors: Option<Value>,
}

impl CollectionInfo {
    /// Size of the unnamed vector, `None` for named-vector collections.
    pub(crate) fn vector_size(&self) -> Option<u64> {
        self.config
            .params
            .vectors
            .as_ref()
            .and_then(|vectors| vectors.get("size"))
            .and_then(Value::as_u64)
    }
}

pub(crate) fn stringify_point_id(id: Value) -> String {
    match id {
        Value::String(text) => text,
        Value::Number(number) => number.to_string(),
        Value::Object(map) => map
            .get("uuid")
            .map(|value| match value {
                Value::String(uuid) => uuid.clone(),
                other => other.to_string(),
            })
            .unwrap_or_else(|| Value::Object(map).to_string()),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
