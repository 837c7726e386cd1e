//! Update: merge identity signatures from one version of a key into another
//!
//! Signatures are deduplicated by issuer, not by content: if the subject
//! identity already holds any signature from an issuer, no further signature
//! from that issuer is merged onto it.

use std::collections::HashSet;

use tracing::{debug, info, warn};

use crate::envelope::Payload;
use crate::error::{ActionError, Result};
use crate::keyid::KeyId;
use crate::message::{Field, ProtocolMessage};
use crate::pgp::{BlockType, Certification, Entity, PgpError};

pub(super) fn run(message: &ProtocolMessage) -> Result<Payload> {
    let public = message.required(Field::PublicKey)?;
    let subject = message.required(Field::SubjectKey)?;

    let source = super::decode_entity(public, BlockType::PublicKey, &super::PUBLIC_BLOCK)?;
    let mut subject = super::decode_entity(subject, BlockType::PublicKey, &super::SUBJECT_BLOCK)?;

    let merged = merge_certifications(&source, &mut subject).map_err(|err| {
        warn!(error = %err, "Signature merge failed");
        ActionError::Crypto("Error merging signatures")
    })?;

    info!(subject = ?subject.key_id(), merged, "Merged identity signatures");

    let public = super::public_armor(&subject)?;
    Ok(Payload::PublicKey { public })
}

/// Copy certifications from `source` onto matching identities of `subject`
///
/// Identities are matched by exact user id. Source identities absent from the
/// subject are skipped. A source certification is appended only when the
/// subject identity holds no signature from the same issuer, counting those
/// appended earlier in this merge. Certifications without an issuer are never
/// merged. Returns the number of signatures appended.
pub fn merge_certifications(
    source: &Entity,
    subject: &mut Entity,
) -> std::result::Result<usize, PgpError> {
    let targets = subject.identities();
    let mut appended = 0;

    for identity in source.identities() {
        let Some(target) = targets.iter().find(|t| t.value() == identity.value()) else {
            debug!("Source identity not present on subject, skipping");
            continue;
        };

        let mut issuers: HashSet<KeyId> = target.signatures().filter_map(|s| s.issuer()).collect();

        let fresh: Vec<&Certification> = identity
            .certifications()
            .iter()
            .filter(|c| c.issuer().is_some_and(|issuer| issuers.insert(issuer)))
            .collect();

        appended += subject.append_certifications(target, fresh)?;
    }

    Ok(appended)
}
