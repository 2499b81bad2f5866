use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// State values reported by the sandbox service.
///
/// The waiter only interprets its target and [`ERROR`]; everything else is
/// treated as "still converging".
pub mod state {
    pub const CREATING: &str = "creating";
    pub const RESTORING: &str = "restoring";
    pub const STARTING: &str = "starting";
    pub const STARTED: &str = "started";
    pub const STOPPING: &str = "stopping";
    pub const STOPPED: &str = "stopped";
    pub const PULLING_IMAGE: &str = "pulling_image";
    pub const ARCHIVING: &str = "archiving";
    pub const ARCHIVED: &str = "archived";
    pub const DESTROYING: &str = "destroying";
    pub const DESTROYED: &str = "destroyed";
    pub const UNKNOWN: &str = "unknown";
    pub const ERROR: &str = "error";
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    pub id: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    #[serde(default)]
    pub labels: HashMap<String, String>,
    #[serde(default)]
    pub public: bool,
    #[serde(default)]
    pub target: String,
    #[serde(default)]
    pub cpu: Option<f64>,
    #[serde(default)]
    pub gpu: Option<f64>,
    #[serde(default)]
    pub memory: Option<f64>,
    #[serde(default)]
    pub disk: Option<f64>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub error_reason: Option<String>,
    #[serde(default)]
    pub snapshot_state: Option<String>,
    #[serde(default)]
    pub snapshot_created_at: Option<String>,
    #[serde(default)]
    pub auto_stop_interval: Option<u32>,
    #[serde(default)]
    pub info: Option<WorkspaceInfo>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceInfo {
    #[serde(default)]
    pub created: Option<String>,
    /// JSON-encoded provider details (node domain, region, class, ...).
    #[serde(default)]
    pub provider_metadata: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PortPreviewUrl {
    pub url: String,
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct ProjectDirResponse {
    pub dir: String,
}

#[derive(Debug, Serialize)]
pub struct LabelsRequest {
    pub labels: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
pub struct LabelsResponse {
    pub labels: HashMap<String, String>,
}

// ---------------------------------------------------------------------------
// SDK view
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SandboxTargetRegion {
    Eu,
    Us,
    Asia,
    Other(String),
}

impl SandboxTargetRegion {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "eu" => SandboxTargetRegion::Eu,
            "us" => SandboxTargetRegion::Us,
            "asia" => SandboxTargetRegion::Asia,
            other => SandboxTargetRegion::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            SandboxTargetRegion::Eu => "eu",
            SandboxTargetRegion::Us => "us",
            SandboxTargetRegion::Asia => "asia",
            SandboxTargetRegion::Other(s) => s,
        }
    }
}

impl fmt::Display for SandboxTargetRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxResources {
    pub cpu: String,
    pub gpu: Option<String>,
    pub memory: String,
    pub disk: String,
}

/// Structured information about a sandbox.
#[derive(Debug, Clone)]
pub struct SandboxInfo {
    pub id: String,
    pub image: Option<String>,
    pub user: Option<String>,
    pub env: HashMap<String, String>,
    pub labels: HashMap<String, String>,
    pub public: bool,
    pub target: SandboxTargetRegion,
    pub resources: SandboxResources,
    pub state: Option<String>,
    pub error_reason: Option<String>,
    pub snapshot_state: Option<String>,
    pub snapshot_created_at: Option<String>,
    pub auto_stop_interval: Option<u32>,
    pub created: String,
    pub node_domain: String,
    pub region: String,
    pub class_name: String,
    pub updated_at: String,
    pub last_snapshot: Option<String>,
    pub provider_metadata: Option<String>,
}

/// Format a numeric resource the way the dashboard shows it: `2` not `2.0`.
fn resource_amount(value: Option<f64>, default: &str) -> String {
    match value {
        Some(v) if v != 0.0 => {
            if v.fract() == 0.0 {
                format!("{v:.0}")
            } else {
                v.to_string()
            }
        }
        _ => default.to_string(),
    }
}

fn metadata_str(metadata: &serde_json::Value, key: &str) -> Option<String> {
    metadata.get(key).and_then(|v| v.as_str()).map(String::from)
}

impl From<&Workspace> for SandboxInfo {
    fn from(ws: &Workspace) -> Self {
        let info = ws.info.clone().unwrap_or_default();
        // Malformed metadata degrades to empty fields rather than failing `info()`.
        let metadata: serde_json::Value = info
            .provider_metadata
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or_else(|| serde_json::json!({}));

        let resources = SandboxResources {
            cpu: resource_amount(ws.cpu, "1"),
            gpu: ws
                .gpu
                .filter(|g| *g != 0.0)
                .map(|g| resource_amount(Some(g), "0")),
            memory: format!("{}Gi", resource_amount(ws.memory, "2")),
            disk: format!("{}Gi", resource_amount(ws.disk, "10")),
        };

        SandboxInfo {
            id: ws.id.clone(),
            image: ws.image.clone(),
            user: ws.user.clone(),
            env: ws.env.clone(),
            labels: ws.labels.clone(),
            public: ws.public,
            target: SandboxTargetRegion::parse(&ws.target),
            resources,
            state: ws.state.clone(),
            error_reason: ws.error_reason.clone(),
            snapshot_state: ws.snapshot_state.clone(),
            snapshot_created_at: ws.snapshot_created_at.clone(),
            auto_stop_interval: ws.auto_stop_interval,
            created: info.created.unwrap_or_default(),
            node_domain: metadata_str(&metadata, "nodeDomain").unwrap_or_default(),
            region: metadata_str(&metadata, "region").unwrap_or_default(),
            class_name: metadata_str(&metadata, "class").unwrap_or_default(),
            updated_at: metadata_str(&metadata, "updatedAt").unwrap_or_default(),
            last_snapshot: metadata_str(&metadata, "lastSnapshot"),
            provider_metadata: info.provider_metadata,
        }
    }
}
