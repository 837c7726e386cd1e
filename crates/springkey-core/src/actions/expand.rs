//! Expand: report identity metadata for a public key
//!
//! The first identity in the certificate's canonical order is reported, so the
//! result is stable for a given key regardless of how it was serialized.

use tracing::debug;

use crate::envelope::Payload;
use crate::error::{ActionError, Result};
use crate::message::{Field, ProtocolMessage};
use crate::pgp::BlockType;

pub(super) fn run(message: &ProtocolMessage) -> Result<Payload> {
    let public = message.required(Field::PublicKey)?;
    let entity = super::decode_entity(public, BlockType::PublicKey, &super::PUBLIC_BLOCK)?;

    let identities = entity.identities();
    let identity = identities
        .first()
        .ok_or(ActionError::Codec("Key carries no identities"))?;

    let keyid = identity
        .self_signatures()
        .iter()
        .find_map(|sig| sig.issuer())
        .or_else(|| entity.key_id())
        .ok_or(ActionError::Codec("Error decoding public entity from block"))?;

    let mut sigs = vec![keyid];
    for certification in identity.certifications() {
        match certification.issuer() {
            Some(issuer) => sigs.push(issuer),
            None => debug!("Skipping certification without issuer"),
        }
    }

    if identities.len() > 1 {
        debug!(identities = identities.len(), "Reporting first identity only");
    }

    Ok(Payload::Certificate {
        name: identity.name().unwrap_or_default(),
        email: identity.email().unwrap_or_default(),
        keyid,
        sigs,
    })
}
