//! # mesh-registry
//!
//! Per-agent action registries and the server that exposes them.
//!
//! An agent is an [`ActionRegistry`] populated by explicit `register` calls,
//! one per handler. [`AgentServer`] serves a registry over JSON-RPC so the
//! mesh can discover and invoke its actions remotely:
//!
//! ```text
//! mesh (HttpAgent)
//!       │
//!       │ POST /rpc  actions/list | actions/call
//!       ▼
//! ┌─────────────────┐
//! │   AgentServer   │
//! │  1. Decode      │
//! │  2. Bind args   │  ← ActionDescriptor
//! │  3. Run handler │
//! │  4. Encode      │  ← MeshError → JSON-RPC error
//! └─────────────────┘
//! ```

pub mod error;
pub mod http_transport;
pub mod protocol;
pub mod registry;
pub mod server;

pub use error::ServerError;
pub use http_transport::create_router;
pub use protocol::{
    CallActionParams, CallActionResponse, JsonRpcError, JsonRpcRequest, JsonRpcResponse,
    ListActionsResponse, ServerInfo, decode_error, encode_error,
};
pub use registry::{ActionRegistry, Handler, bind_arguments};
pub use server::AgentServer;
