//! Request dispatch: exact method+path routes, a static-asset fallthrough
//! for other `GET`s, and error-to-status mapping at the boundary.

use std::sync::Arc;

use tracing::{error, warn};

use crate::application::{AssetService, QueryUseCase};
use crate::connector::storage::CorpusStore;
use crate::domain::{DomainError, QueryRequest, StatusResponse};

use super::framer::ParsedRequest;
use super::response::Response;

pub struct Router {
    corpus: Arc<CorpusStore>,
    query_use_case: Arc<QueryUseCase>,
    assets: Arc<dyn AssetService>,
}

impl Router {
    pub fn new(
        corpus: Arc<CorpusStore>,
        query_use_case: Arc<QueryUseCase>,
        assets: Arc<dyn AssetService>,
    ) -> Self {
        Self {
            corpus,
            query_use_case,
            assets,
        }
    }

    /// Dispatch a framed request. Every failure becomes a status-mapped
    /// response here; nothing propagates past the connection boundary.
    pub async fn route(&self, request: &ParsedRequest) -> Response {
        let result = match (request.method.as_str(), request.path.as_str()) {
            ("OPTIONS", _) => Ok(Response::empty(200)),
            ("POST", "/query") => self.handle_query(&request.body).await,
            ("GET", "/status") => self.handle_status().await,
            ("GET", _) => self.handle_asset(&request.path).await,
            _ => Err(DomainError::not_found(format!(
                "{} {}",
                request.method, request.path
            ))),
        };

        result.unwrap_or_else(|e| {
            let status = e.status_code();
            if status >= 500 {
                error!("Handler failed: {e}");
            } else {
                warn!("Request rejected ({status}): {e}");
            }
            Response::error(status, e.to_string())
        })
    }

    async fn handle_query(&self, body: &[u8]) -> Result<Response, DomainError> {
        let request: QueryRequest = serde_json::from_slice(body)
            .map_err(|e| DomainError::protocol(format!("invalid query body: {e}")))?;
        let response = self.query_use_case.execute(request).await?;
        Ok(Response::json(200, &response))
    }

    async fn handle_status(&self) -> Result<Response, DomainError> {
        Ok(Response::json(
            200,
            &StatusResponse {
                documents_indexed: self.corpus.len().await,
            },
        ))
    }

    async fn handle_asset(&self, path: &str) -> Result<Response, DomainError> {
        let asset = self.assets.resolve(path).await?;
        Ok(Response::new(200, asset.content_type, asset.body))
    }
}
