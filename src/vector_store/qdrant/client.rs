//! HTTP client wrapper for interacting with Qdrant.

use super::types::{CollectionInfoResponse, QueryResponse, stringify_point_id};
use crate::config::Config;
use crate::vector_store::{Record, SearchMatch, VectorStore, VectorStoreError, check_dimensions};
use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde_json::{Value, json};
use std::time::Duration;

/// Index-level settings shared by every request.
#[derive(Debug, Clone)]
pub struct IndexSettings {
    /// Collection name.
    pub name: String,
    /// Vector dimensionality declared for the collection.
    pub dimension: usize,
    /// Maximum number of points per upsert request.
    pub batch_size: usize,
    /// Optional minimum score forwarded with queries.
    pub score_threshold: Option<f32>,
}

impl IndexSettings {
    /// Derive settings from configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            name: config.qdrant_index_name.clone(),
            dimension: config.embedding_dimension,
            batch_size: config.upsert_batch_size,
            score_threshold: config.retrieval_score_threshold,
        }
    }
}

/// Lightweight HTTP client for one Qdrant collection.
pub struct QdrantService {
    pub(crate) client: Client,
    pub(crate) base_url: String,
    pub(crate) api_key: Option<String>,
    pub(crate) index: IndexSettings,
}

impl QdrantService {
    /// Construct a client for the collection described by `index`.
    ///
    /// A `batch_size` of zero is raised to one.
    pub fn new(
        url: &str,
        api_key: Option<String>,
        index: IndexSettings,
        timeout: Duration,
    ) -> Result<Self, VectorStoreError> {
        let client = Client::builder()
            .user_agent("docqa/0.1")
            .timeout(timeout)
            .build()?;

        let base_url = normalize_base_url(url).map_err(VectorStoreError::InvalidUrl)?;
        let index = IndexSettings {
            batch_size: index.batch_size.max(1),
            ..index
        };
        tracing::debug!(
            url = %base_url,
            index = %index.name,
            has_api_key = %api_key.as_deref().map(|value| !value.is_empty()).unwrap_or(false),
            "Initialized Qdrant HTTP client"
        );

        Ok(Self {
            client,
            base_url,
            api_key,
            index,
        })
    }

    /// Create the collection when missing; verify its dimensionality when present.
    pub async fn ensure_index(&self) -> Result<(), VectorStoreError> {
        let name = &self.index.name;
        match self.describe_index().await? {
            None => {
                tracing::info!(index = %name, dimension = self.index.dimension, "Creating index");
                self.create_index().await
            }
            Some(Some(size)) if size != self.index.dimension as u64 => {
                let error = VectorStoreError::DimensionMismatch {
                    expected: self.index.dimension,
                    actual: size as usize,
                };
                tracing::error!(index = %name, error = %error, "Index dimensionality does not match configuration");
                Err(error)
            }
            Some(Some(_)) => {
                tracing::debug!(index = %name, "Index ready");
                Ok(())
            }
            Some(None) => {
                tracing::warn!(index = %name, "Index uses named vectors; skipping dimension check");
                Ok(())
            }
        }
    }

    /// `None` when the collection is missing, otherwise its unnamed vector size (if any).
    async fn describe_index(&self) -> Result<Option<Option<u64>>, VectorStoreError> {
        let response = self
            .request(Method::GET, &format!("collections/{}", self.index.name))
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => {
                let info: CollectionInfoResponse = response.json().await?;
                Ok(Some(info.result.vector_size()))
            }
            StatusCode::NOT_FOUND => Ok(None),
            status => {
                let body = response.text().await.unwrap_or_default();
                let error = VectorStoreError::UnexpectedStatus { status, body };
                tracing::error!(index = %self.index.name, error = %error, "Index lookup failed");
                Err(error)
            }
        }
    }

    async fn create_index(&self) -> Result<(), VectorStoreError> {
        let body = json!({
            "vectors": {
                "size": self.index.dimension,
                "distance": "Cosine"
            }
        });

        let response = self
            .request(Method::PUT, &format!("collections/{}", self.index.name))
            .json(&body)
            .send()
            .await?;

        self.ensure_success(response, || {
            tracing::debug!(index = %self.index.name, "Index created");
        })
        .await
    }

    async fn upsert_batch(&self, batch: &[Record]) -> Result<(), VectorStoreError> {
        let points: Vec<Value> = batch
            .iter()
            .map(|record| {
                json!({
                    "id": record.id,
                    "vector": record.values,
                    "payload": record.metadata,
                })
            })
            .collect();

        let response = self
            .request(
                Method::PUT,
                &format!("collections/{}/points", self.index.name),
            )
            .query(&[("wait", true)])
            .json(&json!({ "points": points }))
            .send()
            .await?;

        self.ensure_success(response, || {
            tracing::debug!(index = %self.index.name, points = batch.len(), "Points upserted");
        })
        .await
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format_endpoint(&self.base_url, path);
        let mut req = self.client.request(method, url);
        if let Some(api_key) = &self.api_key
            && !api_key.is_empty()
        {
            req = req.header("api-key", api_key);
        }
        req
    }

    async fn ensure_success<F>(
        &self,
        response: reqwest::Response,
        on_success: F,
    ) -> Result<(), VectorStoreError>
    where
        F: FnOnce(),
    {
        let status = response.status();
        if status.is_success() {
            on_success();
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        let error = if status == StatusCode::NOT_FOUND {
            VectorStoreError::IndexNotFound(self.index.name.clone())
        } else {
            VectorStoreError::UnexpectedStatus { status, body }
        };
        tracing::error!(index = %self.index.name, error = %error, "Qdrant request failed");
        Err(error)
    }
}

#[async_trait]
impl VectorStore for QdrantService {
    /// Writes batches sequentially; a failure leaves earlier batches stored.
    async fn upsert(&self, records: Vec<Record>) -> Result<usize, VectorStoreError> {
        check_dimensions(
            records.iter().map(|record| record.values.as_slice()),
            self.index.dimension,
        )?;

        let mut stored = 0;
        for (batch_index, batch) in records.chunks(self.index.batch_size).enumerate() {
            if let Err(error) = self.upsert_batch(batch).await {
                tracing::error!(
                    index = %self.index.name,
                    batch = batch_index,
                    stored,
                    remaining = records.len() - stored,
                    "Upsert aborted; earlier batches remain stored"
                );
                return Err(error);
            }
            stored += batch.len();
        }
        Ok(stored)
    }

    async fn search(&self, vector: &[f32], top_k: usize) -> Result<Vec<SearchMatch>, VectorStoreError> {
        check_dimensions([vector], self.index.dimension)?;

        let mut body = json!({
            "query": vector,
            "limit": top_k,
            "with_payload": true,
        });
        if let (Some(threshold), Some(obj)) = (self.index.score_threshold, body.as_object_mut()) {
            obj.insert("score_threshold".into(), Value::from(threshold));
        }

        let response = self
            .request(
                Method::POST,
                &format!("collections/{}/points/query", self.index.name),
            )
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = if status == StatusCode::NOT_FOUND {
                VectorStoreError::IndexNotFound(self.index.name.clone())
            } else {
                VectorStoreError::UnexpectedStatus { status, body }
            };
            tracing::error!(index = %self.index.name, error = %error, "Qdrant search failed");
            return Err(error);
        }

        let payload: QueryResponse = response.json().await?;
        Ok(payload
            .result
            .into_points()
            .into_iter()
            .map(|point| SearchMatch {
                id: stringify_point_id(point.id),
                score: point.score,
                metadata: point.payload.unwrap_or_default(),
            })
            .collect())
    }
}

fn normalize_base_url(url: &str) -> Result<String, String> {
    let mut parsed = reqwest::Url::parse(url).map_err(|err| err.to_string())?;
    let path = parsed.path().trim_end_matches('/').to_string();
    parsed.set_path(&path);
    Ok(parsed.to_string())
}

fn format_endpoint(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{base}/{path}")
}
