use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::info;

use crate::api::SandboxApi;
use crate::error::{DaytonaError, Result, ResultExt};
use crate::timeout::{format_secs, with_timeout};
use crate::types::{PortPreviewUrl, SandboxInfo, Workspace, state};
use crate::wait::{StatePoller, StateSnapshot, WaitTarget};

const RESOURCE_KIND: &str = "Sandbox";

/// Handle to a single remote sandbox.
///
/// Lifecycle calls take an optional timeout in seconds: `None` uses the
/// 60 second default, `Some(0.0)` waits indefinitely.
pub struct Sandbox {
    id: String,
    instance: Workspace,
    api: Arc<dyn SandboxApi>,
    root_dir: OnceCell<String>,
}

impl Sandbox {
    pub fn new(instance: Workspace, api: Arc<dyn SandboxApi>) -> Self {
        Self {
            id: instance.id.clone(),
            instance,
            api,
            root_dir: OnceCell::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// The sandbox as last fetched or updated by this handle.
    pub fn instance(&self) -> &Workspace {
        &self.instance
    }

    pub async fn info(&self) -> Result<SandboxInfo> {
        let instance = self.api.get_sandbox(&self.id).await?;
        Ok(Self::to_sandbox_info(&instance))
    }

    pub fn to_sandbox_info(instance: &Workspace) -> SandboxInfo {
        SandboxInfo::from(instance)
    }

    /// Home directory of the sandbox user. Cached after the first lookup.
    pub async fn get_user_root_dir(&self) -> Result<String> {
        self.root_dir
            .get_or_try_init(|| self.api.get_project_dir(&self.id))
            .await
            .cloned()
            .context("Failed to get sandbox root directory: ")
    }

    #[deprecated(note = "use `get_user_root_dir` instead; this method will be removed in a future version")]
    pub async fn get_workspace_root_dir(&self) -> Result<String> {
        self.get_user_root_dir().await
    }

    /// Replace all labels on the sandbox. Values are stored as strings, so
    /// `true` becomes `"true"`.
    pub async fn set_labels<K, V>(
        &self,
        labels: impl IntoIterator<Item = (K, V)>,
    ) -> Result<HashMap<String, String>>
    where
        K: Into<String>,
        V: ToString,
    {
        let labels = labels
            .into_iter()
            .map(|(k, v)| (k.into(), v.to_string()))
            .collect();
        self.api
            .replace_labels(&self.id, labels)
            .await
            .context("Failed to set labels: ")
    }

    /// Start the sandbox and wait until it reports `started`.
    pub async fn start(&self, timeout: Option<f64>) -> Result<()> {
        let id = self.id.as_str();
        with_timeout(
            timeout,
            |t| {
                format!(
                    "Sandbox {id} failed to start within the {} seconds timeout period",
                    format_secs(t)
                )
            },
            async {
                self.api.start_sandbox(id).await?;
                info!(sandbox_id = %id, "start requested");
                self.wait_for_state(state::STARTED, "start").await
            },
        )
        .await
        .context("Failed to start sandbox: ")
    }

    /// Stop the sandbox and wait until it reports `stopped`.
    pub async fn stop(&self, timeout: Option<f64>) -> Result<()> {
        let id = self.id.as_str();
        with_timeout(
            timeout,
            |t| {
                format!(
                    "Sandbox {id} failed to stop within the {} seconds timeout period",
                    format_secs(t)
                )
            },
            async {
                self.api.stop_sandbox(id).await?;
                info!(sandbox_id = %id, "stop requested");
                self.wait_for_state(state::STOPPED, "stop").await
            },
        )
        .await
        .context("Failed to stop sandbox: ")
    }

    pub async fn delete(&self) -> Result<()> {
        self.api.delete_sandbox(&self.id, true).await
    }

    /// Wait for the sandbox to reach `started` without requesting it.
    pub async fn wait_for_sandbox_start(&self, timeout: Option<f64>) -> Result<()> {
        let id = self.id.as_str();
        with_timeout(
            timeout,
            |t| {
                format!(
                    "Sandbox {id} failed to become ready within the {} seconds timeout period",
                    format_secs(t)
                )
            },
            self.wait_for_state(state::STARTED, "start"),
        )
        .await
        .context("Failure during waiting for sandbox to start: ")
    }

    /// Wait for the sandbox to reach `stopped` without requesting it.
    pub async fn wait_for_sandbox_stop(&self, timeout: Option<f64>) -> Result<()> {
        let id = self.id.as_str();
        with_timeout(
            timeout,
            |t| {
                format!(
                    "Sandbox {id} failed to become stopped within the {} seconds timeout period",
                    format_secs(t)
                )
            },
            self.wait_for_state(state::STOPPED, "stop"),
        )
        .await
        .context("Failure during waiting for sandbox to stop: ")
    }

    #[deprecated(note = "use `wait_for_sandbox_start` instead; this method will be removed in a future version")]
    pub async fn wait_for_workspace_start(&self, timeout: Option<f64>) -> Result<()> {
        self.wait_for_sandbox_start(timeout).await
    }

    #[deprecated(note = "use `wait_for_sandbox_stop` instead; this method will be removed in a future version")]
    pub async fn wait_for_workspace_stop(&self, timeout: Option<f64>) -> Result<()> {
        self.wait_for_sandbox_stop(timeout).await
    }

    /// Minutes of inactivity before the service stops the sandbox; `0`
    /// disables auto-stop.
    pub async fn set_autostop_interval(&mut self, interval: i64) -> Result<()> {
        const PREFIX: &str = "Failed to set auto-stop interval: ";
        let Ok(minutes) = u32::try_from(interval) else {
            return Err(DaytonaError::Config(
                "Auto-stop interval must be a non-negative integer".to_string(),
            )
            .context(PREFIX));
        };
        self.api
            .set_autostop_interval(&self.id, minutes)
            .await
            .context(PREFIX)?;
        self.instance.auto_stop_interval = Some(minutes);
        Ok(())
    }

    /// Preview URL for `port`, opening the port if needed. Private sandboxes
    /// also get an access token.
    pub async fn get_preview_link(&self, port: u16) -> Result<PortPreviewUrl> {
        self.api
            .get_port_preview_url(&self.id, port)
            .await
            .context("Failed to get preview link: ")
    }

    /// Move the sandbox filesystem to object storage. The sandbox must be
    /// stopped first.
    pub async fn archive(&self) -> Result<()> {
        self.api
            .archive_sandbox(&self.id)
            .await
            .context("Failed to archive sandbox: ")
    }

    async fn wait_for_state(&self, target: &str, verb: &'static str) -> Result<()> {
        let api = &self.api;
        let id = self.id.as_str();
        StatePoller::new(WaitTarget {
            kind: RESOURCE_KIND,
            id,
            state: target,
            verb,
        })
        .run(None, move || async move {
            api.get_sandbox(id).await.map(|ws| StateSnapshot::from(&ws))
        })
        .await
    }
}
