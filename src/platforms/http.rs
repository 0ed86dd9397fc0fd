//! JSON-over-HTTP adapters for platform gateways.
//!
//! Timeouts are enforced by the fetcher/executor, not here.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

use crate::engine::model::PlatformMetrics;
use crate::error::{OptimizerError, OptimizerResult};

use super::traits::{BidAction, BudgetAction, CreativeTrigger, MetricsSource, PlatformResult};
use super::types::{
    AdjustBidsBody, BidChange, BudgetChange, CreativeRequest, ReallocateBudgetBody,
    RequestCreativesBody,
};

/// Base URL plus optional bearer key shared by both adapters.
#[derive(Clone, Debug)]
struct Gateway {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
}

impl Gateway {
    fn new(base_url: &str, api_key: Option<String>) -> OptimizerResult<Self> {
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };
        let base_url = Url::parse(&normalized)
            .map_err(|e| OptimizerError::Config(format!("invalid base_url '{}': {}", base_url, e)))?;

        Ok(Self {
            client: Client::new(),
            base_url,
            api_key,
        })
    }

    /// Appends percent-encoded path segments to the base URL.
    fn endpoint(&self, segments: &[&str]) -> PlatformResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| format!("base_url '{}' cannot carry a path", self.base_url))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => req.bearer_auth(key),
            None => req,
        }
    }

    async fn post_json<B, T>(&self, segments: &[&str], body: &B) -> PlatformResult<T>
    where
        B: serde::Serialize + Sync,
        T: DeserializeOwned + Send,
    {
        let url = self.endpoint(segments)?;
        let resp = self
            .authorize(self.client.post(url))
            .json(body)
            .send()
            .await
            .map_err(OptimizerError::Network)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(status_error(status, resp).await);
        }
        Ok(resp.json::<T>().await.map_err(OptimizerError::Network)?)
    }
}

async fn status_error(status: StatusCode, resp: reqwest::Response) -> Box<dyn std::error::Error + Send + Sync> {
    let text = resp.text().await.unwrap_or_default();
    format!("HTTP {}: {}", status.as_u16(), text).into()
}

#[derive(Clone, Debug)]
pub struct HttpMetricsSource {
    platform: String,
    gateway: Gateway,
}

impl HttpMetricsSource {
    pub fn new(platform: impl Into<String>, base_url: &str, api_key: Option<String>) -> OptimizerResult<Self> {
        Ok(Self {
            platform: platform.into(),
            gateway: Gateway::new(base_url, api_key)?,
        })
    }
}

#[async_trait]
impl MetricsSource for HttpMetricsSource {
    fn platform(&self) -> &str {
        &self.platform
    }

    async fn get_metrics(&self, campaign_id: &str) -> PlatformResult<Option<PlatformMetrics>> {
        let url = self.gateway.endpoint(&[
            "campaigns",
            campaign_id,
            "platforms",
            &self.platform,
            "metrics",
        ])?;

        let resp = self
            .gateway
            .authorize(self.gateway.client.get(url))
            .send()
            .await
            .map_err(OptimizerError::Network)?;
        match resp.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Ok(Some(
                resp.json::<PlatformMetrics>().await.map_err(OptimizerError::Network)?,
            )),
            status => Err(status_error(status, resp).await),
        }
    }
}

/// Campaign-management gateway that applies budget, bid and creative actions.
#[derive(Clone, Debug)]
pub struct HttpActionClient {
    gateway: Gateway,
}

impl HttpActionClient {
    pub fn new(base_url: &str, api_key: Option<String>) -> OptimizerResult<Self> {
        Ok(Self {
            gateway: Gateway::new(base_url, api_key)?,
        })
    }
}

#[async_trait]
impl BudgetAction for HttpActionClient {
    async fn reallocate_budget(
        &self,
        campaign_id: &str,
        from_platform: &str,
        to_platform: &str,
        amount: f64,
    ) -> PlatformResult<BudgetChange> {
        let body = ReallocateBudgetBody {
            from_platform: from_platform.to_string(),
            to_platform: to_platform.to_string(),
            amount,
        };
        self.gateway
            .post_json(&["campaigns", campaign_id, "budgets", "reallocate"], &body)
            .await
    }
}

#[async_trait]
impl BidAction for HttpActionClient {
    async fn adjust_bids(&self, campaign_id: &str, platform: &str, adjustment: f64) -> PlatformResult<BidChange> {
        let body = AdjustBidsBody { adjustment };
        self.gateway
            .post_json(&["campaigns", campaign_id, "platforms", platform, "bids"], &body)
            .await
    }
}

#[async_trait]
impl CreativeTrigger for HttpActionClient {
    async fn request_creatives(&self, campaign_id: &str, platforms: &[String]) -> PlatformResult<CreativeRequest> {
        let body = RequestCreativesBody {
            platforms: platforms.to_vec(),
        };
        self.gateway
            .post_json(&["campaigns", campaign_id, "creatives"], &body)
            .await
    }
}
