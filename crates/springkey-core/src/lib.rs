//! # Spring Key Core
//!
//! Stateless OpenPGP key lifecycle actions for the Spring key management
//! service.
//!
//! ## Actions
//!
//! - **Generate**: create a keypair bound to `Name <email>`, every secret key
//!   encrypted under the caller's passphrase
//! - **Expand**: report name, email, key id and signer key ids of a public key
//! - **Sign**: certify every identity of a public key with a private key
//! - **Update**: merge identity signatures between two versions of a key,
//!   deduplicated by issuer
//!
//! ## Flow
//!
//! raw bytes → [`ProtocolMessage::receive`] (interaction id, parse) →
//! [`ActionEngine::respond`] (validate, decode, transform, encode) →
//! [`Response`] envelope.
//!
//! No key material outlives the call that produced or consumed it.

pub mod actions;
pub mod correlation;
pub mod envelope;
pub mod error;
pub mod keyid;
pub mod message;
pub mod pgp;

pub use actions::{merge_certifications, Action, ActionEngine};
pub use correlation::{
    derive_interaction_id, log_interaction, Clock, FixedClock, InteractionId, InteractionIdIssuer,
    SystemClock,
};
pub use envelope::{Payload, Response};
pub use error::{ActionError, ErrorKind, Result};
pub use keyid::KeyId;
pub use message::{Field, Inbound, ProtocolMessage};
pub use pgp::{Entity, KeySuite};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get the library version
pub fn version() -> &'static str {
    VERSION
}
