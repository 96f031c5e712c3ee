//! Remote agent reached over HTTP JSON-RPC.

use crate::handle::AgentHandle;
use async_trait::async_trait;
use mesh_core::{ActionDescriptor, ActionOutput, Arguments, MeshError};
use mesh_registry::protocol::{METHOD_CALL_ACTION, METHOD_LIST_ACTIONS};
use mesh_registry::{
    CallActionParams, CallActionResponse, JsonRpcRequest, JsonRpcResponse, ListActionsResponse,
    decode_error,
};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Cached descriptor set
struct CachedDescriptors {
    descriptors: Vec<ActionDescriptor>,
    fetched_at: Instant,
}

/// An agent served by a remote `AgentServer`.
pub struct HttpAgent {
    id: String,
    rpc_url: String,
    client: reqwest::Client,
    cache: RwLock<Option<CachedDescriptors>>,
    ttl: Option<Duration>,
    next_request_id: AtomicU64,
}

impl HttpAgent {
    /// Create a handle for the agent at `endpoint` (its base URL).
    pub fn new(
        id: impl Into<String>,
        endpoint: &str,
        timeout: Duration,
    ) -> Result<Self, MeshError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MeshError::Internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            id: id.into(),
            rpc_url: format!("{}/rpc", endpoint.trim_end_matches('/')),
            client,
            cache: RwLock::new(None),
            ttl: None,
            next_request_id: AtomicU64::new(1),
        })
    }

    /// Re-pull descriptors after `ttl`. Without one they are cached until
    /// [`AgentHandle::invalidate`] is called.
    pub fn with_descriptor_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    fn is_fresh(&self, cached: &CachedDescriptors) -> bool {
        match self.ttl {
            Some(ttl) => cached.fetched_at.elapsed() < ttl,
            None => true,
        }
    }

    /// Send one JSON-RPC call and return its `result`.
    async fn call(&self, method: &str, params: Option<Value>) -> Result<Value, MeshError> {
        let id = self.next_request_id.fetch_add(1, Ordering::Relaxed);
        let request = JsonRpcRequest::new(id, method, params);

        let response = self
            .client
            .post(&self.rpc_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| MeshError::unreachable(&self.id, transport_reason(&e)))?;

        if !response.status().is_success() {
            return Err(MeshError::unreachable(
                &self.id,
                format!("agent returned HTTP {}", response.status()),
            ));
        }

        // The client timeout covers the body too.
        let bytes = response
            .bytes()
            .await
            .map_err(|e| MeshError::unreachable(&self.id, transport_reason(&e)))?;
        let body: JsonRpcResponse = serde_json::from_slice(&bytes)
            .map_err(|e| MeshError::Protocol(format!("invalid response from {}: {e}", self.id)))?;

        if let Some(error) = body.error {
            return Err(decode_error(&error));
        }

        body.result
            .ok_or_else(|| MeshError::Protocol(format!("response from {} has no result", self.id)))
    }
}

fn transport_reason(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "request timed out".to_string()
    } else if e.is_connect() {
        format!("connection failed: {e}")
    } else {
        e.to_string()
    }
}

#[async_trait]
impl AgentHandle for HttpAgent {
    fn id(&self) -> &str {
        &self.id
    }

    async fn describe(&self) -> Result<Vec<ActionDescriptor>, MeshError> {
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if self.is_fresh(cached) {
                    return Ok(cached.descriptors.clone());
                }
            }
        }

        let result = self.call(METHOD_LIST_ACTIONS, None).await?;
        let listed: ListActionsResponse = serde_json::from_value(result)?;

        tracing::debug!(
            agent = %self.id,
            actions = listed.actions.len(),
            "Fetched descriptors"
        );

        let mut cache = self.cache.write().await;
        *cache = Some(CachedDescriptors {
            descriptors: listed.actions.clone(),
            fetched_at: Instant::now(),
        });
        Ok(listed.actions)
    }

    async fn invoke(&self, action: &str, args: &Arguments) -> Result<ActionOutput, MeshError> {
        let params = CallActionParams {
            name: action.to_string(),
            arguments: args.clone(),
        };
        let result = self
            .call(METHOD_CALL_ACTION, Some(serde_json::to_value(params)?))
            .await?;
        let response: CallActionResponse = serde_json::from_value(result)?;
        response.into_output()
    }

    async fn invalidate(&self) {
        *self.cache.write().await = None;
    }
}
