//! Agent server: exposes one [`ActionRegistry`] over JSON-RPC.

use crate::error::ServerError;
use crate::http_transport::create_router;
use crate::protocol::{
    CallActionParams, CallActionResponse, INVALID_PARAMS, JsonRpcRequest, JsonRpcResponse,
    ListActionsResponse, METHOD_CALL_ACTION, METHOD_INITIALIZE, METHOD_LIST_ACTIONS,
    METHOD_NOT_FOUND, METHOD_PING, ServerInfo,
};
use crate::registry::ActionRegistry;
use mesh_core::ServerConfig;
use serde_json::{Value, json};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Serves one agent's actions.
pub struct AgentServer {
    registry: Arc<ActionRegistry>,
    config: ServerConfig,
}

impl AgentServer {
    /// Create a new server for a registry.
    pub fn new(registry: ActionRegistry, config: ServerConfig) -> Self {
        Self {
            registry: Arc::new(registry),
            config,
        }
    }

    /// The served registry.
    pub fn registry(&self) -> &ActionRegistry {
        &self.registry
    }

    /// The agent name.
    pub fn name(&self) -> &str {
        self.registry.name()
    }

    /// Bind the configured address and serve until ctrl-c.
    pub async fn run(self) -> Result<(), ServerError> {
        let addr = self.config.bind_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.clone(),
                source,
            })?;

        self.serve(listener, shutdown_signal()).await
    }

    /// Serve on an already bound listener until `shutdown` resolves.
    pub async fn serve(
        self,
        listener: TcpListener,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<(), ServerError> {
        let local_addr = listener.local_addr()?;
        tracing::info!(
            agent = %self.name(),
            addr = %local_addr,
            actions = self.registry.len(),
            "Agent server listening"
        );

        let app = create_router(Arc::new(self));
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!(addr = %local_addr, "Agent server stopped");
        Ok(())
    }

    /// Handle a JSON-RPC request.
    pub fn handle_request(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        let id = request.id.clone();

        match request.method.as_str() {
            METHOD_INITIALIZE => self.handle_initialize(id),
            METHOD_LIST_ACTIONS => self.handle_list_actions(id),
            METHOD_CALL_ACTION => self.handle_call_action(id, request.params),
            METHOD_PING => JsonRpcResponse::success(id, json!({})),
            _ => JsonRpcResponse::error(
                id,
                METHOD_NOT_FOUND,
                format!("Method not found: {}", request.method),
            ),
        }
    }

    fn handle_initialize(&self, id: Option<Value>) -> JsonRpcResponse {
        let info = ServerInfo {
            name: self.registry.name().to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            action_count: self.registry.len(),
        };
        JsonRpcResponse::success(id, json!(info))
    }

    fn handle_list_actions(&self, id: Option<Value>) -> JsonRpcResponse {
        let result = ListActionsResponse {
            agent: self.registry.name().to_string(),
            actions: self.registry.describe(),
        };
        JsonRpcResponse::success(id, json!(result))
    }

    fn handle_call_action(&self, id: Option<Value>, params: Option<Value>) -> JsonRpcResponse {
        let params: CallActionParams = match params {
            Some(p) => match serde_json::from_value(p) {
                Ok(params) => params,
                Err(e) => {
                    return JsonRpcResponse::error(
                        id,
                        INVALID_PARAMS,
                        format!("Invalid params: {}", e),
                    );
                }
            },
            None => return JsonRpcResponse::error(id, INVALID_PARAMS, "Missing params"),
        };

        match self.registry.invoke(&params.name, &params.arguments) {
            Ok(output) => {
                tracing::info!(agent = %self.name(), action = %params.name, "Action completed");
                let result = CallActionResponse {
                    content: vec![output],
                };
                JsonRpcResponse::success(id, json!(result))
            }
            Err(err) => {
                tracing::info!(
                    agent = %self.name(),
                    action = %params.name,
                    error = %err,
                    "Action rejected"
                );
                JsonRpcResponse::mesh_error(id, &err)
            }
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}
