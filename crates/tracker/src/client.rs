//! [`TrackerClient`]: the `reqwest` implementation of [`WorkItemService`].

use std::time::Duration;

use async_trait::async_trait;
use backlog::{
    ContinuationToken, FieldChange, FieldName, QueryPage, QueryText, ServiceError, WorkItemId,
    WorkItemRecord, WorkItemService,
};
use reqwest::header::{CONTENT_TYPE, RETRY_AFTER};
use reqwest::{RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;

use crate::auth::Credential;
use crate::config::TrackerConfig;
use crate::error::TrackerError;
use crate::wire::{self, BatchRequest, BatchResponse, WiqlRequest, WiqlResponse};

/// HTTP client for one project of the tracking service.
#[derive(Debug, Clone)]
pub struct TrackerClient {
    http: reqwest::Client,
    base: Url,
    config: TrackerConfig,
    credential: Credential,
}

impl TrackerClient {
    /// Builds a client after validating `config`.
    pub fn new(config: TrackerConfig, credential: Credential) -> Result<Self, TrackerError> {
        config.validate()?;
        let base = config.parsed_base_url()?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("backlog-sync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TrackerError::Client {
                message: e.to_string(),
            })?;
        Ok(Self {
            http,
            base,
            config,
            credential,
        })
    }

    pub(crate) fn wiql_url(&self) -> Url {
        self.endpoint(&[self.config.project.as_str(), "_apis", "wit", "wiql"])
    }

    pub(crate) fn batch_url(&self) -> Url {
        self.endpoint(&[self.config.project.as_str(), "_apis", "wit", "workitemsbatch"])
    }

    pub(crate) fn item_url(&self, id: WorkItemId) -> Url {
        let id = id.to_string();
        self.endpoint(&["_apis", "wit", "workitems", id.as_str()])
    }

    /// Appends percent-encoded `segments` to the base URL's path.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        // `parsed_base_url` rejects URLs without a path, so this always succeeds.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Adds authentication and the api-version, sends, and maps every
    /// non-success outcome to a [`ServiceError`].
    async fn send(&self, request: RequestBuilder) -> Result<Response, ServiceError> {
        let request = self
            .credential
            .apply(request)
            .query(&[("api-version", self.config.api_version.as_str())]);

        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(wire::parse_retry_after);
        let body = response.text().await.unwrap_or_default();
        tracing::debug!(status = status.as_u16(), "Service returned non-success status");
        Err(ServiceError::Status {
            status: status.as_u16(),
            message: wire::error_message(&body),
            retry_after,
        })
    }
}

/// Reads and decodes a JSON body.
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ServiceError> {
    let bytes = response.bytes().await.map_err(transport_error)?;
    serde_json::from_slice(&bytes).map_err(|e| ServiceError::Malformed {
        message: e.to_string(),
    })
}

fn transport_error(err: reqwest::Error) -> ServiceError {
    if err.is_timeout() {
        ServiceError::Timeout {
            message: err.to_string(),
        }
    } else if err.is_decode() {
        ServiceError::Malformed {
            message: err.to_string(),
        }
    } else {
        ServiceError::Transport {
            message: err.to_string(),
        }
    }
}

#[async_trait]
impl WorkItemService for TrackerClient {
    async fn query_page(
        &self,
        query: &QueryText,
        continuation: Option<&ContinuationToken>,
    ) -> Result<QueryPage, ServiceError> {
        let mut request = self
            .http
            .post(self.wiql_url())
            .json(&WiqlRequest {
                query: query.as_str(),
            });
        if let Some(token) = continuation {
            request = request.query(&[("continuationToken", token.as_str())]);
        }

        let response = self.send(request).await?;
        let header = response
            .headers()
            .get(wire::CONTINUATION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body: WiqlResponse = decode(response).await?;

        let ids = wire::query_ids(&body.work_items)
            .map_err(|message| ServiceError::Malformed { message })?;
        let continuation = wire::continuation(header.as_deref(), body.continuation_token);
        tracing::debug!(
            ids = ids.len(),
            more = continuation.is_some(),
            "Received query page"
        );
        Ok(QueryPage { ids, continuation })
    }

    async fn get_batch(
        &self,
        ids: &[WorkItemId],
        fields: &[FieldName],
    ) -> Result<Vec<WorkItemRecord>, ServiceError> {
        let body = BatchRequest {
            ids: ids.iter().map(|id| id.as_u64()).collect(),
            fields: fields.iter().map(FieldName::as_str).collect(),
        };
        let response = self
            .send(self.http.post(self.batch_url()).json(&body))
            .await?;
        let batch: BatchResponse = decode(response).await?;
        Ok(batch.value)
    }

    async fn patch_item(
        &self,
        id: WorkItemId,
        changes: &[FieldChange],
    ) -> Result<WorkItemRecord, ServiceError> {
        let document =
            serde_json::to_vec(&wire::patch_document(changes)).map_err(|e| {
                ServiceError::Malformed {
                    message: e.to_string(),
                }
            })?;
        let request = self
            .http
            .patch(self.item_url(id))
            .header(CONTENT_TYPE, wire::JSON_PATCH)
            .body(document);
        let response = self.send(request).await?;
        decode(response).await
    }
}
