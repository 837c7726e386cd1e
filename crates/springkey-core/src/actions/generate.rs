//! Generate: create a new passphrase-protected keypair

use tracing::{info, warn};

use crate::envelope::Payload;
use crate::error::{ActionError, Result};
use crate::message::{Field, ProtocolMessage};
use crate::pgp::{Entity, KeySuite, PgpError};

pub(super) fn run(message: &ProtocolMessage, suite: KeySuite) -> Result<Payload> {
    let name = message.required(Field::Name)?;
    let email = message.required(Field::Email)?;
    let passphrase = message.required(Field::Passphrase)?;

    let entity = Entity::generate(name, email, passphrase, suite).map_err(|err| {
        match &err {
            PgpError::InvalidUserId => info!("Refused user id with reserved characters"),
            _ => warn!(error = %err, "Key generation failed"),
        }
        ActionError::Crypto("Error creating entity")
    })?;

    // The private block must never carry plaintext secret material.
    let states = entity.encrypted_secret_keys();
    if states.is_empty() || states.iter().any(|encrypted| !encrypted) {
        warn!(keys = states.len(), "Generated entity has unprotected secret keys");
        return Err(ActionError::Crypto("Error encrypting private key"));
    }

    let private = entity.to_private_armor().map_err(|err| {
        warn!(error = %err, "Private key armoring failed");
        ActionError::Encoding("Error encoding private key armor")
    })?;
    let public = super::public_armor(&entity)?;

    info!(key_id = ?entity.key_id(), suite = %suite, "Generated keypair");

    Ok(Payload::KeyPair { public, private })
}
