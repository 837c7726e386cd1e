//! Response envelope
//!
//! `Success(payload)` serializes to `{"result":"ok","response":payload}` and
//! `Error(e)` to `{"result":"error","response":message}`. All values go through
//! serde_json, so names, emails and messages are escaped.

use serde::{Serialize, Serializer};

use crate::error::ActionError;
use crate::keyid::KeyId;

/// Successful action result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    /// Armored public and private key blocks
    KeyPair { public: String, private: String },

    /// Armored public key block
    PublicKey { public: String },

    /// Metadata for one identity of a key
    Certificate {
        name: String,
        email: String,
        keyid: KeyId,
        sigs: Vec<KeyId>,
    },
}

/// Outcome of one action, ready for the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Success(Payload),
    Error(ActionError),
}

#[derive(Serialize)]
#[serde(tag = "result", content = "response")]
enum Wire<'a> {
    #[serde(rename = "ok")]
    Ok(&'a Payload),
    #[serde(rename = "error")]
    Error(&'static str),
}

impl Serialize for Response {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Response::Success(payload) => Wire::Ok(payload).serialize(serializer),
            Response::Error(err) => Wire::Error(err.message()).serialize(serializer),
        }
    }
}

impl From<Result<Payload, ActionError>> for Response {
    fn from(result: Result<Payload, ActionError>) -> Self {
        match result {
            Ok(payload) => Response::Success(payload),
            Err(err) => Response::Error(err),
        }
    }
}

/// Body used if an envelope ever fails to serialize
const FALLBACK_BODY: &str = r#"{"result":"error","response":"Internal error"}"#;

impl Response {
    pub fn is_success(&self) -> bool {
        matches!(self, Response::Success(_))
    }

    pub fn error(&self) -> Option<&ActionError> {
        match self {
            Response::Error(err) => Some(err),
            Response::Success(_) => None,
        }
    }

    /// Wire form of the envelope
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|err| {
            tracing::error!(error = %err, "Failed to serialize response envelope");
            FALLBACK_BODY.to_string()
        })
    }
}
