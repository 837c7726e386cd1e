//! Sign: certify every identity of a public key with a private key

use tracing::{info, warn};

use crate::envelope::Payload;
use crate::error::{ActionError, Result};
use crate::message::{Field, ProtocolMessage};
use crate::pgp::{BlockType, PgpError};

pub(super) fn run(message: &ProtocolMessage) -> Result<Payload> {
    let public = message.required(Field::PublicKey)?;
    let private = message.required(Field::PrivateKey)?;
    let passphrase = message.required(Field::Passphrase)?;

    let mut subject = super::decode_entity(public, BlockType::PublicKey, &super::PUBLIC_BLOCK)?;
    let signer_entity =
        super::decode_entity(private, BlockType::PrivateKey, &super::PRIVATE_BLOCK)?;

    let mut signer = signer_entity.unlock_signer(passphrase).map_err(|err| match err {
        PgpError::BadPassphrase => ActionError::Crypto("Bad passphrase"),
        PgpError::NoSecretKey => ActionError::Codec("Private key carries no secret material"),
        other => {
            warn!(error = %other, "Unlocking signing key failed");
            ActionError::Crypto("Error certifying identity")
        }
    })?;

    let certified = subject.certify_identities(&mut signer).map_err(|err| {
        warn!(error = %err, "Certification failed");
        ActionError::Crypto("Error certifying identity")
    })?;

    info!(
        signer = ?signer.key_id(),
        subject = ?subject.key_id(),
        identities = certified,
        "Certified identities"
    );

    let public = super::public_armor(&subject)?;
    Ok(Payload::PublicKey { public })
}
