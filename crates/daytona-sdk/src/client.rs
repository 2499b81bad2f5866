use std::sync::Arc;

use tracing::info;

use crate::api::{ApiClient, SandboxApi};
use crate::config::DaytonaConfig;
use crate::error::{Result, ResultExt};
use crate::http::HttpClient;
use crate::sandbox::Sandbox;

/// Entry point: resolves sandbox ids into [`Sandbox`] handles.
#[derive(Clone)]
pub struct Daytona {
    api: Arc<dyn SandboxApi>,
}

impl Daytona {
    pub fn new(config: &DaytonaConfig) -> Result<Self> {
        config.validate()?;
        let http = HttpClient::new(&config.api_url, &config.api_key)?;
        info!(target_region = %config.target, "daytona client ready");
        Ok(Self::with_api(Arc::new(ApiClient::new(http))))
    }

    pub fn from_env() -> Result<Self> {
        Self::new(&DaytonaConfig::from_env()?)
    }

    /// Use a custom [`SandboxApi`], e.g. an in-process fake.
    pub fn with_api(api: Arc<dyn SandboxApi>) -> Self {
        Self { api }
    }

    /// Fetch a sandbox by id.
    pub async fn get(&self, id: &str) -> Result<Sandbox> {
        let instance = self
            .api
            .get_sandbox(id)
            .await
            .context("Failed to get sandbox: ")?;
        Ok(Sandbox::new(instance, self.api.clone()))
    }
}
