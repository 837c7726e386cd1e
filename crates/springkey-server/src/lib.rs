//! Spring Key Server
//!
//! HTTP transport for the stateless OpenPGP key service. Each route runs one
//! key action and answers with a JSON response envelope.
//!
//! ## API Endpoints
//!
//! - `GET /health` - Liveness check
//! - `POST /genkey` - Generate a passphrase-protected keypair
//! - `POST /expand` - Report name, email, key id and signers of a public key
//! - `POST /sign` - Certify every identity of a public key
//! - `POST /update` - Merge identity signatures into a subject key
//!
//! ## Configuration
//!
//! See [`ServiceConfig`] for the `SPRINGKEY_*` environment variables.

pub mod api;
pub mod config;

pub use api::create_router;
pub use api::handlers::AppState;
pub use config::{ErrorStatusMode, ServiceConfig};
