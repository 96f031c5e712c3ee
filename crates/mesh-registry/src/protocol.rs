//! Wire protocol between the mesh and its agents.
//!
//! JSON-RPC 2.0 messages. Semantic errors travel as JSON-RPC errors with an
//! application code and a `data.kind` tag so the caller can rebuild the exact
//! [`MeshError`] variant; transport problems never masquerade as them.

use mesh_core::{ActionDescriptor, ActionOutput, Arguments, MeshError};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

pub const METHOD_INITIALIZE: &str = "initialize";
pub const METHOD_LIST_ACTIONS: &str = "actions/list";
pub const METHOD_CALL_ACTION: &str = "actions/call";
pub const METHOD_PING: &str = "ping";

pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const UNKNOWN_ACTION: i32 = -32001;
pub const ARGUMENT_ERROR: i32 = -32002;
pub const DUPLICATE_ACTION: i32 = -32003;
pub const AGENT_ERROR: i32 = -32010;

/// JSON-RPC request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    pub fn new(id: impl Into<Value>, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: Some(id.into()),
            method: method.into(),
            params,
        }
    }
}

/// JSON-RPC response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcResponse {
    /// Create a success response.
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response.
    pub fn error(id: Option<Value>, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }

    /// Create an error response carrying a [`MeshError`].
    pub fn mesh_error(id: Option<Value>, err: &MeshError) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(encode_error(err)),
        }
    }
}

/// Agent server info response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
    #[serde(rename = "actionCount")]
    pub action_count: usize,
}

/// `actions/list` result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListActionsResponse {
    pub agent: String,
    pub actions: Vec<ActionDescriptor>,
}

/// `actions/call` parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallActionParams {
    pub name: String,
    #[serde(default)]
    pub arguments: Arguments,
}

/// `actions/call` result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallActionResponse {
    pub content: Vec<ActionOutput>,
}

impl CallActionResponse {
    /// The single output of a call; several parts are joined as text.
    pub fn into_output(mut self) -> Result<ActionOutput, MeshError> {
        match self.content.len() {
            0 => Err(MeshError::Protocol("empty action response".to_string())),
            1 => Ok(self.content.remove(0)),
            _ => Ok(ActionOutput::text(
                self.content
                    .iter()
                    .map(ActionOutput::as_text)
                    .collect::<Vec<_>>()
                    .join("\n"),
            )),
        }
    }
}

/// Encode a [`MeshError`] as a JSON-RPC error.
pub fn encode_error(err: &MeshError) -> JsonRpcError {
    let code = match err {
        MeshError::UnknownAction { .. } => UNKNOWN_ACTION,
        MeshError::ArgumentError { .. } => ARGUMENT_ERROR,
        MeshError::DuplicateAction { .. } => DUPLICATE_ACTION,
        _ => AGENT_ERROR,
    };

    let mut data = json!({ "kind": err.kind() });
    match err {
        MeshError::UnknownAction { name } | MeshError::DuplicateAction { name } => {
            data["name"] = json!(name);
        }
        MeshError::ArgumentError { parameter, reason } => {
            data["parameter"] = json!(parameter);
            data["reason"] = json!(reason);
        }
        _ => {}
    }

    JsonRpcError {
        code,
        message: err.to_string(),
        data: Some(data),
    }
}

/// Rebuild the [`MeshError`] an agent reported.
pub fn decode_error(err: &JsonRpcError) -> MeshError {
    let data = err.data.as_ref();
    let field = |key: &str| {
        data.and_then(|d| d.get(key))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };

    match err.code {
        UNKNOWN_ACTION => MeshError::UnknownAction { name: field("name") },
        ARGUMENT_ERROR => MeshError::ArgumentError {
            parameter: field("parameter"),
            reason: field("reason"),
        },
        DUPLICATE_ACTION => MeshError::DuplicateAction { name: field("name") },
        METHOD_NOT_FOUND | INVALID_PARAMS => {
            MeshError::Protocol(format!("{} ({})", err.message, err.code))
        }
        _ => MeshError::Internal(err.message.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn semantic_errors_survive_the_wire() {
        let cases = vec![
            MeshError::UnknownAction {
                name: "payClaim".into(),
            },
            MeshError::argument("claimAmount", "'lots' is not a decimal number"),
            MeshError::DuplicateAction {
                name: "submitClaim".into(),
            },
        ];

        for original in cases {
            let wire = serde_json::to_value(encode_error(&original)).unwrap();
            let parsed: JsonRpcError = serde_json::from_value(wire).unwrap();
            assert_eq!(decode_error(&parsed), original);
        }
    }

    #[test]
    fn unexpected_errors_decode_as_internal() {
        let err = encode_error(&MeshError::Internal("boom".into()));
        assert_eq!(err.code, AGENT_ERROR);
        assert!(matches!(decode_error(&err), MeshError::Internal(_)));
    }

    #[test]
    fn multi_part_response_joins_text() {
        let response = CallActionResponse {
            content: vec![ActionOutput::text("a"), ActionOutput::text("b")],
        };
        assert_eq!(response.into_output().unwrap(), ActionOutput::text("a\nb"));
    }
}
