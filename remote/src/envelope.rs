use std::any::Any;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::RemoteError;

/// Request envelope. The method is implied by the route path; `params`
/// are positionally JSON-encoded strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcRequest {
    pub id: i32,
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub params: Vec<String>,
}

impl RpcRequest {
    pub fn new(id: i32, params: Vec<String>) -> Self {
        Self {
            id,
            method: String::new(),
            params,
        }
    }
}

/// Response envelope. Exactly one of `result` and `error` is populated;
/// the constructors below are the only way dispatch builds one, which is
/// what enforces that. The response id always equals the originating
/// request id (0 for server-push stream messages).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcResponse {
    pub id: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exception_type: Option<String>,
}

impl RpcResponse {
    /// A success envelope carrying an already JSON-encoded result.
    pub fn success(id: i32, result: impl Into<String>) -> Self {
        Self {
            id,
            result: Some(result.into()),
            error: None,
            exception_type: None,
        }
    }

    /// An error envelope. Empty messages are replaced with the literal
    /// `"Error"` so a client always has something to show.
    pub fn failure(id: i32, error: impl Into<String>, exception_type: Option<String>) -> Self {
        let message = error.into();
        Self {
            id,
            result: None,
            error: Some(if message.is_empty() {
                String::from("Error")
            } else {
                message
            }),
            exception_type,
        }
    }

    /// Encodes a handler return value into a success envelope; an encoding
    /// failure is answered as an error envelope under the same id.
    pub fn encode<R: Serialize>(id: i32, value: &R) -> Self {
        match serde_json::to_string(value) {
            Ok(encoded) => Self::success(id, encoded),
            Err(err) => {
                error!(id, %err, "failed to encode handler result");
                Self::failure(id, err.to_string(), None)
            }
        }
    }

    /// Encodes a server-push stream message (id always 0).
    pub fn push<R: Serialize>(value: &R) -> Self {
        Self::encode(0, value)
    }

    /// The wire body for this envelope.
    #[must_use]
    pub fn to_body(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|err| {
            error!(%err, "failed to encode response envelope");
            String::from(r#"{"id":0,"error":"Error"}"#)
        })
    }
}

/// Decodes one positional parameter from its JSON-encoded string form.
///
/// `String` parameters are raw passthrough: the wire already carries a
/// string, so decoding it as JSON again would double-decode. Every other
/// type goes through `serde_json`.
pub fn decode_parameter<P: DeserializeOwned + 'static>(raw: &str) -> Result<P, RemoteError> {
    let passthrough: Box<dyn Any> = Box::new(raw.to_owned());
    match passthrough.downcast::<P>() {
        Ok(value) => Ok(*value),
        Err(_) => serde_json::from_str(raw).map_err(|err| RemoteError::Decode {
            message: err.to_string(),
        }),
    }
}
