use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::Method;
use tracing::debug;

use crate::error::Result;
use crate::http::{self, HttpClient};
use crate::types::{
    LabelsRequest, LabelsResponse, PortPreviewUrl, ProjectDirResponse, Workspace,
};

/// Calls the sandbox wrapper needs from the remote service.
///
/// State-changing calls return once the service has accepted the request;
/// they do not wait for the sandbox to reach the new state.
#[async_trait]
pub trait SandboxApi: Send + Sync {
    async fn get_sandbox(&self, id: &str) -> Result<Workspace>;
    async fn start_sandbox(&self, id: &str) -> Result<()>;
    async fn stop_sandbox(&self, id: &str) -> Result<()>;
    async fn archive_sandbox(&self, id: &str) -> Result<()>;
    async fn delete_sandbox(&self, id: &str, force: bool) -> Result<()>;
    async fn replace_labels(
        &self,
        id: &str,
        labels: HashMap<String, String>,
    ) -> Result<HashMap<String, String>>;
    async fn set_autostop_interval(&self, id: &str, minutes: u32) -> Result<()>;
    async fn get_port_preview_url(&self, id: &str, port: u16) -> Result<PortPreviewUrl>;
    /// Working directory of the sandbox user, served by the toolbox API.
    async fn get_project_dir(&self, id: &str) -> Result<String>;
}

/// [`SandboxApi`] over the Daytona REST API.
#[derive(Clone)]
pub struct ApiClient {
    http: HttpClient,
}

impl ApiClient {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    async fn post_empty(&self, path: &str, op: &str) -> Result<()> {
        debug!(path, "{op}");
        http::send(self.http.request(Method::POST, path), op).await?;
        Ok(())
    }
}

#[async_trait]
impl SandboxApi for ApiClient {
    async fn get_sandbox(&self, id: &str) -> Result<Workspace> {
        let path = format!("/workspace/{id}");
        let resp = http::send(self.http.request(Method::GET, &path), "get sandbox").await?;
        http::decode(resp, "get sandbox").await
    }

    async fn start_sandbox(&self, id: &str) -> Result<()> {
        self.post_empty(&format!("/workspace/{id}/start"), "start sandbox")
            .await
    }

    async fn stop_sandbox(&self, id: &str) -> Result<()> {
        self.post_empty(&format!("/workspace/{id}/stop"), "stop sandbox")
            .await
    }

    async fn archive_sandbox(&self, id: &str) -> Result<()> {
        self.post_empty(&format!("/workspace/{id}/archive"), "archive sandbox")
            .await
    }

    async fn delete_sandbox(&self, id: &str, force: bool) -> Result<()> {
        let path = format!("/workspace/{id}");
        let req = self
            .http
            .request(Method::DELETE, &path)
            .query(&[("force", force)]);
        http::send(req, "delete sandbox").await?;
        Ok(())
    }

    async fn replace_labels(
        &self,
        id: &str,
        labels: HashMap<String, String>,
    ) -> Result<HashMap<String, String>> {
        let path = format!("/workspace/{id}/labels");
        let req = self
            .http
            .request(Method::PUT, &path)
            .json(&LabelsRequest { labels });
        let resp = http::send(req, "replace labels").await?;
        let body: LabelsResponse = http::decode(resp, "replace labels").await?;
        Ok(body.labels)
    }

    async fn set_autostop_interval(&self, id: &str, minutes: u32) -> Result<()> {
        self.post_empty(
            &format!("/workspace/{id}/autostop/{minutes}"),
            "set autostop interval",
        )
        .await
    }

    async fn get_port_preview_url(&self, id: &str, port: u16) -> Result<PortPreviewUrl> {
        let path = format!("/workspace/{id}/ports/{port}/preview-url");
        let resp = http::send(self.http.request(Method::GET, &path), "get preview url").await?;
        http::decode(resp, "get preview url").await
    }

    async fn get_project_dir(&self, id: &str) -> Result<String> {
        let path = format!("/toolbox/{id}/toolbox/project-dir");
        let resp = http::send(self.http.request(Method::GET, &path), "get project dir").await?;
        let body: ProjectDirResponse = http::decode(resp, "get project dir").await?;
        Ok(body.dir)
    }
}
