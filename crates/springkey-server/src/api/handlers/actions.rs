//! Key Action Handlers
//!
//! One handler per action. Each reads the raw body, issues an interaction id,
//! parses the message and runs the action on the blocking pool. Every outcome,
//! including an unreadable body, is answered with a response envelope.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::{to_bytes, Body, Bytes},
    extract::{ConnectInfo, Request, State},
};
use tracing::{error, info, warn};

use springkey_core::{
    log_interaction, Action, Inbound, InteractionId, ProtocolMessage, Response,
};

use crate::api::error::{ApiError, EnvelopeResponse};
use crate::api::handlers::AppState;

/// Generate a keypair
///
/// POST /genkey
pub async fn genkey(State(state): State<Arc<AppState>>, request: Request) -> EnvelopeResponse {
    handle(Action::Generate, state, request).await
}

/// Report identity metadata of a public key
///
/// POST /expand
pub async fn expand(State(state): State<Arc<AppState>>, request: Request) -> EnvelopeResponse {
    handle(Action::Expand, state, request).await
}

/// Certify every identity of a public key
///
/// POST /sign
pub async fn sign(State(state): State<Arc<AppState>>, request: Request) -> EnvelopeResponse {
    handle(Action::Sign, state, request).await
}

/// Merge identity signatures between two versions of a key
///
/// POST /update
pub async fn update(State(state): State<Arc<AppState>>, request: Request) -> EnvelopeResponse {
    handle(Action::Update, state, request).await
}

async fn handle(action: Action, state: Arc<AppState>, request: Request) -> EnvelopeResponse {
    let remote = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    let (interaction_id, envelope) =
        match read_body(request.into_body(), state.config.max_body_bytes).await {
            Ok(raw) => run(action, &state, &raw, remote).await,
            Err(err) => {
                let interaction_id = state.issuer.issue();
                log_interaction(action.label(), &interaction_id, remote);
                warn!(interaction_id = %interaction_id, error = %err, "Rejected request body");
                (interaction_id, Response::Error(err.into()))
            }
        };

    match envelope.error() {
        None => info!(
            interaction_id = %interaction_id,
            action = action.label(),
            "Action succeeded"
        ),
        Some(err) => info!(
            interaction_id = %interaction_id,
            action = action.label(),
            code = err.kind().code(),
            "Action failed"
        ),
    }

    EnvelopeResponse::new(envelope, state.config.error_status)
}

async fn read_body(body: Body, limit: usize) -> Result<Bytes, ApiError> {
    to_bytes(body, limit).await.map_err(ApiError::Body)
}

async fn run(
    action: Action,
    state: &AppState,
    raw: &[u8],
    remote: Option<SocketAddr>,
) -> (InteractionId, Response) {
    let Inbound {
        interaction_id,
        message,
    } = ProtocolMessage::receive(raw, &state.issuer);
    log_interaction(action.label(), &interaction_id, remote);

    let message = match message {
        Ok(message) => message,
        Err(err) => return (interaction_id, Response::Error(err)),
    };

    let engine = state.engine;
    let envelope = tokio::task::spawn_blocking(move || engine.respond(action, &message))
        .await
        .unwrap_or_else(|err| {
            error!(action = action.label(), error = %err, "Action task failed");
            Response::Error(ApiError::from(err).into())
        });

    (interaction_id, envelope)
}
