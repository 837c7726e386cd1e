//! Key actions
//!
//! Each action validates its mandatory fields, decodes the armored blocks it
//! needs, transforms them and re-armors the result. Actions hold no state
//! between invocations; every [`Entity`](crate::pgp::Entity) they touch is
//! created and dropped inside one call.
//!
//! | Action   | Mandatory fields                 | Payload       |
//! |----------|----------------------------------|---------------|
//! | Generate | name, email, passphrase          | `KeyPair`     |
//! | Expand   | public                           | `Certificate` |
//! | Sign     | public, private, passphrase      | `PublicKey`   |
//! | Update   | public, subject                  | `PublicKey`   |

mod expand;
mod generate;
mod sign;
mod update;

use std::fmt;

use tracing::{debug, warn};

use crate::envelope::{Payload, Response};
use crate::error::{ActionError, Result};
use crate::message::{Field, ProtocolMessage};
use crate::pgp::{decode_armor, BlockType, Entity, KeySuite};

pub use update::merge_certifications;

/// The four key actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Generate,
    Expand,
    Sign,
    Update,
}

impl Action {
    pub const ALL: [Action; 4] = [Action::Generate, Action::Expand, Action::Sign, Action::Update];

    /// Event label used in logs and as the route name
    pub fn label(self) -> &'static str {
        match self {
            Action::Generate => "genkey",
            Action::Expand => "expand",
            Action::Sign => "sign",
            Action::Update => "update",
        }
    }

    /// Fields that must be present and non-empty
    pub fn required_fields(self) -> &'static [Field] {
        match self {
            Action::Generate => &[Field::Name, Field::Email, Field::Passphrase],
            Action::Expand => &[Field::PublicKey],
            Action::Sign => &[Field::PublicKey, Field::PrivateKey, Field::Passphrase],
            Action::Update => &[Field::PublicKey, Field::SubjectKey],
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Runs key actions
///
/// Holds only immutable configuration, so one engine can serve any number of
/// concurrent requests.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActionEngine {
    suite: KeySuite,
}

impl ActionEngine {
    pub fn new(suite: KeySuite) -> Self {
        Self { suite }
    }

    pub fn suite(&self) -> KeySuite {
        self.suite
    }

    /// Run `action` and return its payload
    pub fn perform(&self, action: Action, message: &ProtocolMessage) -> Result<Payload> {
        message.require_all(action.required_fields())?;

        match action {
            Action::Generate => generate::run(message, self.suite),
            Action::Expand => expand::run(message),
            Action::Sign => sign::run(message),
            Action::Update => update::run(message),
        }
    }

    /// Run `action` and wrap the outcome in the response envelope
    pub fn respond(&self, action: Action, message: &ProtocolMessage) -> Response {
        let result = self.perform(action, message);
        if let Err(err) = &result {
            debug!(
                action = action.label(),
                interaction_id = ?message.interaction_id().map(|id| id.as_str()),
                kind = %err.kind(),
                message = err.message(),
                "Action failed"
            );
        }
        result.into()
    }
}

/// Messages for decoding one input block
struct BlockErrors {
    armor: &'static str,
    wrong_type: &'static str,
    entity: &'static str,
}

const PUBLIC_BLOCK: BlockErrors = BlockErrors {
    armor: "Error decoding public armor",
    wrong_type: "Does not decode to public key",
    entity: "Error decoding public entity from block",
};

const PRIVATE_BLOCK: BlockErrors = BlockErrors {
    armor: "Error decoding private armor",
    wrong_type: "Does not decode as private key",
    entity: "Error decoding private entity from block",
};

const SUBJECT_BLOCK: BlockErrors = BlockErrors {
    armor: "Error decoding subject armor",
    wrong_type: "Subject does not decode to public key",
    entity: "Error decoding subject entity from block",
};

/// Decode an armored block of the expected type and parse it into an entity
fn decode_entity(text: &str, expected: BlockType, errors: &BlockErrors) -> Result<Entity> {
    let block = decode_armor(text).map_err(|err| {
        debug!(error = %err, "Armor decoding failed");
        ActionError::Codec(errors.armor)
    })?;

    if block.block_type() != expected {
        debug!(expected = %expected, found = %block.block_type(), "Unexpected block type");
        return Err(ActionError::Codec(errors.wrong_type));
    }

    Entity::parse(&block).map_err(|err| {
        warn!(error = %err, "Entity parsing failed");
        ActionError::Codec(errors.entity)
    })
}

/// Re-armor an entity's public key block
fn public_armor(entity: &Entity) -> Result<String> {
    entity.to_public_armor().map_err(|err| {
        warn!(error = %err, "Public key armoring failed");
        ActionError::Encoding("Error encoding public key armor")
    })
}
