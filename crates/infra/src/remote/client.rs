//! reqwest-based client for the storefront admin GraphQL endpoint.

use reqwest::Client;
use tracing::instrument;

use stocksync_core::ShopDomain;
use stocksync_inventory::{AdjustmentBatch, RemoteCredentials, StoreAuth};
use stocksync_observability::Logger;

use super::graphql::{self, GraphqlRequest};
use super::{AdjustmentResult, RemoteError, RemoteInventoryClient, VariantPage};
use crate::config::RemoteConfig;

const ACCESS_TOKEN_HEADER: &str = "X-Shopify-Access-Token";

/// Longest slice of an error body kept in [`RemoteError::Status`].
const MAX_ERROR_BODY: usize = 512;

#[derive(Debug, Clone)]
pub struct GraphqlInventoryClient {
    http: Client,
    config: RemoteConfig,
    logger: Logger,
}

impl GraphqlInventoryClient {
    pub fn new(config: RemoteConfig, logger: Logger) -> Result<Self, RemoteError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| RemoteError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config, logger })
    }

    /// `{base}/admin/api/{version}/graphql.json` for `domain`.
    pub fn endpoint(&self, domain: &ShopDomain) -> String {
        let base = self.config.base_url.replace("{shop}", domain.as_str());
        format!(
            "{}/admin/api/{}/graphql.json",
            base.trim_end_matches('/'),
            self.config.api_version
        )
    }

    fn classify(&self, err: reqwest::Error) -> RemoteError {
        if err.is_timeout() {
            RemoteError::Timeout(self.config.timeout)
        } else {
            RemoteError::Transport(err.to_string())
        }
    }

    async fn post(&self, credentials: &RemoteCredentials, request: &GraphqlRequest) -> Result<Vec<u8>, RemoteError> {
        let builder = self.http.post(self.endpoint(&credentials.domain)).json(request);
        let builder = match &credentials.auth {
            StoreAuth::AccessToken { token } => builder.header(ACCESS_TOKEN_HEADER, token.expose()),
            StoreAuth::ApiKey { key, secret } => builder.basic_auth(key, Some(secret.expose())),
        };

        let response = builder.send().await.map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            let mut body = response.text().await.unwrap_or_default();
            if body.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !body.is_char_boundary(cut) {
                    cut -= 1;
                }
                body.truncate(cut);
            }
            return Err(RemoteError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await.map_err(|e| self.classify(e))?;
        Ok(bytes.to_vec())
    }

    #[instrument(
        name = "remote.adjust_inventory",
        skip_all,
        fields(store_id = %credentials.store_id, domain = %credentials.domain, batch_size = batch.len())
    )]
    async fn adjust(
        &self,
        credentials: &RemoteCredentials,
        batch: &AdjustmentBatch,
        reference: Option<&str>,
    ) -> Result<AdjustmentResult, RemoteError> {
        let request = graphql::adjustment_request(batch, &self.config.adjustment_reason, reference);

        let outcome = match self.post(credentials, &request).await {
            Ok(body) => graphql::parse_adjustment_response(batch, &body),
            Err(e) => Err(e),
        };

        match &outcome {
            Ok(result) => tracing::debug!(
                applied = result.applied,
                rejected = result.errors.len(),
                "adjustment batch accepted"
            ),
            Err(e) => tracing::warn!(error = %e, kind = e.kind(), "adjustment batch failed"),
        }
        outcome
    }

    #[instrument(name = "remote.fetch_variants_page", skip_all, fields(store_id = %credentials.store_id, cursor))]
    async fn variants_page(&self, credentials: &RemoteCredentials, cursor: Option<&str>) -> Result<VariantPage, RemoteError> {
        if let Some(c) = cursor {
            tracing::Span::current().record("cursor", c);
        }
        let body = self.post(credentials, &graphql::variants_request(cursor)).await?;
        let page = graphql::parse_variants_response(&body)?;
        tracing::debug!(variants = page.variants.len(), more = page.next_cursor.is_some(), "variant page fetched");
        Ok(page)
    }
}

#[async_trait::async_trait]
impl RemoteInventoryClient for GraphqlInventoryClient {
    async fn adjust_inventory(
        &self,
        credentials: &RemoteCredentials,
        batch: &AdjustmentBatch,
        reference: Option<&str>,
    ) -> Result<AdjustmentResult, RemoteError> {
        self.logger.scope(self.adjust(credentials, batch, reference)).await
    }

    async fn fetch_variants_page(
        &self,
        credentials: &RemoteCredentials,
        cursor: Option<&str>,
    ) -> Result<VariantPage, RemoteError> {
        self.logger.scope(self.variants_page(credentials, cursor)).await
    }
}
