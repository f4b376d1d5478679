//! Resource client seam.
//!
//! Leaf commands describe what they want as a [`ResourceRequest`] and hand it
//! to a [`ResourceClient`]. Talking to a real cluster is outside this crate;
//! the binary uses [`DryRunClient`], which renders requests instead of
//! sending them.

use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::Result;

/// The resource kinds the built-in commands manage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Service,
    Revision,
    Route,
    Trigger,
    Broker,
    Channel,
    Source,
    Domain,
}

impl ResourceKind {
    /// `apiVersion` of the kind.
    pub fn api_version(&self) -> &'static str {
        match self {
            ResourceKind::Service | ResourceKind::Revision | ResourceKind::Route => {
                "serving.knative.dev/v1"
            }
            ResourceKind::Domain => "serving.knative.dev/v1beta1",
            ResourceKind::Trigger | ResourceKind::Broker => "eventing.knative.dev/v1",
            ResourceKind::Channel => "messaging.knative.dev/v1",
            ResourceKind::Source => "sources.knative.dev/v1",
        }
    }

    /// Plural, lowercase name used in messages and URLs.
    pub fn plural(&self) -> &'static str {
        match self {
            ResourceKind::Service => "services",
            ResourceKind::Revision => "revisions",
            ResourceKind::Route => "routes",
            ResourceKind::Trigger => "triggers",
            ResourceKind::Broker => "brokers",
            ResourceKind::Channel => "channels",
            ResourceKind::Source => "sources",
            ResourceKind::Domain => "domainmappings",
        }
    }
}

/// What a leaf wants done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Create,
    Delete,
    List,
    Describe,
}

/// A single request against the orchestration API.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceRequest {
    pub operation: Operation,
    pub kind: ResourceKind,
    pub namespace: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub spec: Value,
}

/// The opaque API client consumed by leaf commands.
#[async_trait]
pub trait ResourceClient: Send + Sync {
    /// Execute a request and return human-readable output.
    async fn execute(&self, request: &ResourceRequest) -> Result<String>;
}

/// Renders requests as JSON instead of sending them to a cluster.
#[derive(Debug, Default)]
pub struct DryRunClient {
    kubeconfig: Option<PathBuf>,
    log_http: bool,
}

impl DryRunClient {
    pub fn new(kubeconfig: Option<PathBuf>, log_http: bool) -> Self {
        Self {
            kubeconfig,
            log_http,
        }
    }
}

#[async_trait]
impl ResourceClient for DryRunClient {
    async fn execute(&self, request: &ResourceRequest) -> Result<String> {
        let body = serde_json::to_string_pretty(request)?;
        if self.log_http {
            info!(
                kubeconfig = ?self.kubeconfig,
                kind = request.kind.plural(),
                body = %body,
                "Request"
            );
        } else {
            debug!(kind = request.kind.plural(), "Rendering request");
        }
        Ok(body)
    }
}

/// Records requests and answers with canned output. Used in tests.
#[derive(Debug, Default)]
pub struct RecordingClient {
    requests: Mutex<Vec<ResourceRequest>>,
}

impl RecordingClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests seen so far, in order.
    pub fn requests(&self) -> Vec<ResourceRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ResourceClient for RecordingClient {
    async fn execute(&self, request: &ResourceRequest) -> Result<String> {
        if let Ok(mut r) = self.requests.lock() {
            r.push(request.clone());
        }
        Ok(format!("{} {:?}", request.kind.plural(), request.operation).to_lowercase())
    }
}
