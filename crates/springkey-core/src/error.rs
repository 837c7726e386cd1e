//! Error types for the key actions
//!
//! Every failure an action can produce is an [`ActionError`]: a kind tag plus a
//! fixed, caller-safe message. Library error text is logged server-side and
//! never carried in the message.

use std::fmt;

use thiserror::Error;

/// Result type alias using ActionError
pub type Result<T> = std::result::Result<T, ActionError>;

/// Errors that can occur while handling a key action
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionError {
    /// Request body is not a flat object of string values
    #[error("{0}")]
    BadRequest(&'static str),

    /// A field required by the action is missing or empty
    #[error("{0}")]
    Validation(&'static str),

    /// Armor decoding, block type or entity parsing failed
    #[error("{0}")]
    Codec(&'static str),

    /// Key generation, passphrase or certification failed
    #[error("{0}")]
    Crypto(&'static str),

    /// Re-armoring a result failed
    #[error("{0}")]
    Encoding(&'static str),

    /// The action did not run to completion
    #[error("{0}")]
    Internal(&'static str),
}

/// Discriminant of an [`ActionError`], for branching without message matching
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    BadRequest,
    Validation,
    Codec,
    Crypto,
    Encoding,
    Internal,
}

impl ErrorKind {
    /// Stable code used in logs
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "BAD_REQUEST",
            ErrorKind::Validation => "VALIDATION_ERROR",
            ErrorKind::Codec => "CODEC_ERROR",
            ErrorKind::Crypto => "CRYPTO_ERROR",
            ErrorKind::Encoding => "ENCODING_ERROR",
            ErrorKind::Internal => "INTERNAL_ERROR",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl ActionError {
    pub const MALFORMED_REQUEST: ActionError = ActionError::BadRequest("Malformed request");
    pub const BLANK_FIELD: ActionError = ActionError::Validation("Mandatory field left blank");
    pub const INTERNAL: ActionError = ActionError::Internal("Internal error");

    /// Kind tag of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            ActionError::BadRequest(_) => ErrorKind::BadRequest,
            ActionError::Validation(_) => ErrorKind::Validation,
            ActionError::Codec(_) => ErrorKind::Codec,
            ActionError::Crypto(_) => ErrorKind::Crypto,
            ActionError::Encoding(_) => ErrorKind::Encoding,
            ActionError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Caller-safe message placed in the error envelope
    pub fn message(&self) -> &'static str {
        match *self {
            ActionError::BadRequest(msg)
            | ActionError::Validation(msg)
            | ActionError::Codec(msg)
            | ActionError::Crypto(msg)
            | ActionError::Encoding(msg)
            | ActionError::Internal(msg) => msg,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_and_message() {
        let err = ActionError::Crypto("Bad passphrase");
        assert_eq!(err.kind(), ErrorKind::Crypto);
        assert_eq!(err.message(), "Bad passphrase");
        assert_eq!(err.to_string(), "Bad passphrase");
    }

    #[test]
    fn test_kind_codes_are_distinct() {
        let kinds = [
            ErrorKind::BadRequest,
            ErrorKind::Validation,
            ErrorKind::Codec,
            ErrorKind::Crypto,
            ErrorKind::Encoding,
            ErrorKind::Internal,
        ];
        let codes: std::collections::HashSet<_> = kinds.iter().map(|k| k.code()).collect();
        assert_eq!(codes.len(), kinds.len());
    }

    #[test]
    fn test_constants() {
        assert_eq!(ActionError::BLANK_FIELD.kind(), ErrorKind::Validation);
        assert_eq!(ActionError::MALFORMED_REQUEST.kind(), ErrorKind::BadRequest);
        assert_eq!(ActionError::INTERNAL.message(), "Internal error");
    }
}
