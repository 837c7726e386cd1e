//! OpenPGP codec
//!
//! Thin adapter over `sequoia-openpgp` exposing exactly what the key actions
//! need: armor decoding with block type detection, entity parsing and
//! serialization, key generation, passphrase unlocking and identity
//! certification.
//!
//! An [`Entity`] is owned by a single action invocation and dropped with it.

use std::fmt;
use std::io::Read;
use std::str::FromStr;

use sequoia_openpgp as openpgp;

use openpgp::armor::{self, Kind, ReaderMode};
use openpgp::cert::{CertBuilder, CipherSuite};
use openpgp::crypto::{KeyPair, Password};
use openpgp::packet::{Packet, Signature, UserID};
use openpgp::parse::Parse;
use openpgp::serialize::SerializeInto;
use openpgp::types::SignatureType;
use openpgp::Cert;
use thiserror::Error;

use crate::keyid::KeyId;

/// Errors raised by the codec
///
/// The wrapped library errors are for server-side logs only.
#[derive(Error, Debug)]
pub enum PgpError {
    #[error("Armor decoding failed: {0}")]
    Armor(#[source] std::io::Error),

    #[error("Entity parsing failed: {0}")]
    Parse(#[source] anyhow::Error),

    #[error("Invalid user id component")]
    InvalidUserId,

    #[error("Key generation failed: {0}")]
    Generate(#[source] anyhow::Error),

    #[error("Entity carries no secret key material")]
    NoSecretKey,

    #[error("Passphrase does not unlock the key")]
    BadPassphrase,

    #[error("Key unlocking failed: {0}")]
    Unlock(#[source] anyhow::Error),

    #[error("Certification failed: {0}")]
    Certify(#[source] anyhow::Error),

    #[error("Inserting packets failed: {0}")]
    Insert(#[source] anyhow::Error),

    #[error("Serialization failed: {0}")]
    Serialize(#[source] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, PgpError>;

/// Type tag of an armored block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockType {
    PublicKey,
    PrivateKey,
    Other,
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockType::PublicKey => f.write_str("PGP PUBLIC KEY BLOCK"),
            BlockType::PrivateKey => f.write_str("PGP PRIVATE KEY BLOCK"),
            BlockType::Other => f.write_str("other"),
        }
    }
}

/// A decoded armored block: its type tag and binary body
pub struct ArmoredBlock {
    block_type: BlockType,
    body: Vec<u8>,
}

impl ArmoredBlock {
    pub fn block_type(&self) -> BlockType {
        self.block_type
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

/// Decode ASCII armor
pub fn decode_armor(text: &str) -> Result<ArmoredBlock> {
    let mut reader = armor::Reader::from_bytes(text.as_bytes(), ReaderMode::Tolerant(None));
    let mut body = Vec::new();
    reader.read_to_end(&mut body).map_err(PgpError::Armor)?;

    let block_type = match reader.kind() {
        Some(Kind::PublicKey) => BlockType::PublicKey,
        Some(Kind::SecretKey) => BlockType::PrivateKey,
        _ => BlockType::Other,
    };

    Ok(ArmoredBlock { block_type, body })
}

/// Algorithm profile for generated keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeySuite {
    #[default]
    Cv25519,
    Rsa3k,
    Rsa4k,
    P256,
}

impl KeySuite {
    fn cipher_suite(self) -> CipherSuite {
        match self {
            KeySuite::Cv25519 => CipherSuite::Cv25519,
            KeySuite::Rsa3k => CipherSuite::RSA3k,
            KeySuite::Rsa4k => CipherSuite::RSA4k,
            KeySuite::P256 => CipherSuite::P256,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            KeySuite::Cv25519 => "cv25519",
            KeySuite::Rsa3k => "rsa3k",
            KeySuite::Rsa4k => "rsa4k",
            KeySuite::P256 => "p256",
        }
    }
}

impl fmt::Display for KeySuite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for an unrecognised key suite name
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown key suite '{0}' (expected cv25519, rsa3k, rsa4k or p256)")]
pub struct UnknownKeySuite(pub String);

impl FromStr for KeySuite {
    type Err = UnknownKeySuite;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cv25519" | "ed25519" => Ok(KeySuite::Cv25519),
            "rsa3k" => Ok(KeySuite::Rsa3k),
            "rsa4k" => Ok(KeySuite::Rsa4k),
            "p256" => Ok(KeySuite::P256),
            _ => Err(UnknownKeySuite(s.to_string())),
        }
    }
}

/// Build a `Name <email>` user id, refusing characters that would change
/// how it parses
pub fn user_id(name: &str, email: &str) -> Result<UserID> {
    const FORBIDDEN: &[char] = &['(', ')', '<', '>', '\0'];
    if name.contains(FORBIDDEN) || email.contains(FORBIDDEN) {
        return Err(PgpError::InvalidUserId);
    }
    Ok(UserID::from(format!("{} <{}>", name, email)))
}

/// Split a raw `Name <email>` user id into its parts
///
/// Empty parts are `None`. Without a closing `>` after the last `<`, the whole
/// value is the name.
fn split_user_id(value: &[u8]) -> (Option<String>, Option<String>) {
    let text = String::from_utf8_lossy(value);
    let non_empty = |s: &str| Some(s.trim().to_string()).filter(|s| !s.is_empty());

    match text.rfind('<') {
        Some(open) if text[open..].contains('>') => {
            let rest = &text[open + 1..];
            let close = rest.find('>').unwrap_or(rest.len());
            (non_empty(&text[..open]), non_empty(&rest[..close]))
        }
        _ => (non_empty(&text[..]), None),
    }
}

/// A signature on an identity, with its issuer if one is recorded
#[derive(Debug, Clone)]
pub struct Certification {
    issuer: Option<KeyId>,
    signature: Signature,
}

impl Certification {
    fn new(signature: &Signature) -> Self {
        Self {
            issuer: signature_issuer(signature),
            signature: signature.clone(),
        }
    }

    pub fn issuer(&self) -> Option<KeyId> {
        self.issuer
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }
}

/// Issuer of a signature: the Issuer subpacket, else the Issuer Fingerprint
fn signature_issuer(signature: &Signature) -> Option<KeyId> {
    if let Some(id) = signature.issuers().find_map(|id| KeyId::try_from(id).ok()) {
        return Some(id);
    }
    signature
        .issuer_fingerprints()
        .find_map(|fpr| KeyId::try_from(fpr).ok())
}

/// A user id on an entity with its signatures
#[derive(Debug, Clone)]
pub struct Identity {
    user_id: UserID,
    self_signatures: Vec<Certification>,
    certifications: Vec<Certification>,
}

impl Identity {
    /// Raw user id value; identities are matched on this
    pub fn value(&self) -> &[u8] {
        self.user_id.value()
    }

    /// Name part of the user id
    ///
    /// Falls back to splitting the raw `Name <email>` value when the user id
    /// does not parse as an RFC 2822 mailbox.
    pub fn name(&self) -> Option<String> {
        self.user_id
            .name()
            .ok()
            .flatten()
            .map(|n| n.to_string())
            .or_else(|| split_user_id(self.value()).0)
    }

    /// Email part of the user id, with the same fallback as [`Identity::name`]
    pub fn email(&self) -> Option<String> {
        self.user_id
            .email()
            .ok()
            .flatten()
            .map(|e| e.to_string())
            .or_else(|| split_user_id(self.value()).1)
    }

    pub fn self_signatures(&self) -> &[Certification] {
        &self.self_signatures
    }

    /// Signatures over this identity made by other keys
    pub fn certifications(&self) -> &[Certification] {
        &self.certifications
    }

    /// Self-signatures followed by certifications
    pub fn signatures(&self) -> impl Iterator<Item = &Certification> {
        self.self_signatures.iter().chain(self.certifications.iter())
    }
}

/// Unlocked primary key, able to certify identities
pub struct Signer {
    keypair: KeyPair,
    key_id: Option<KeyId>,
}

impl Signer {
    pub fn key_id(&self) -> Option<KeyId> {
        self.key_id
    }
}

impl fmt::Debug for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signer")
            .field("key_id", &self.key_id)
            .field("keypair", &"[redacted]")
            .finish()
    }
}

/// An OpenPGP key bundle: primary key, subkeys and identities
#[derive(Clone)]
pub struct Entity {
    cert: Cert,
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("key_id", &self.key_id())
            .field("secret", &self.cert.is_tsk())
            .finish()
    }
}

impl Entity {
    /// Parse the body of a decoded block
    pub fn parse(block: &ArmoredBlock) -> Result<Self> {
        Cert::from_bytes(block.body())
            .map(|cert| Self { cert })
            .map_err(PgpError::Parse)
    }

    /// Generate a new entity bound to `Name <email>`
    ///
    /// The primary key and every subkey are each encrypted under `passphrase`.
    pub fn generate(name: &str, email: &str, passphrase: &str, suite: KeySuite) -> Result<Self> {
        let uid = user_id(name, email)?;

        let (cert, _revocation) = CertBuilder::new()
            .set_cipher_suite(suite.cipher_suite())
            .add_userid(uid)
            .add_signing_subkey()
            .add_transport_encryption_subkey()
            .set_password(Some(Password::from(passphrase)))
            .generate()
            .map_err(PgpError::Generate)?;

        Ok(Self { cert })
    }

    /// Key id of the primary key
    pub fn key_id(&self) -> Option<KeyId> {
        KeyId::try_from(&self.cert.keyid()).ok()
    }

    pub fn has_secret(&self) -> bool {
        self.cert.is_tsk()
    }

    /// For each key carrying secret material, whether that material is encrypted
    pub fn encrypted_secret_keys(&self) -> Vec<bool> {
        self.cert
            .keys()
            .secret()
            .map(|ka| ka.key().secret().is_encrypted())
            .collect()
    }

    /// Identities in the certificate's canonical order
    pub fn identities(&self) -> Vec<Identity> {
        self.cert
            .userids()
            .map(|ua| Identity {
                user_id: ua.userid().clone(),
                self_signatures: ua.self_signatures().map(Certification::new).collect(),
                certifications: ua.certifications().map(Certification::new).collect(),
            })
            .collect()
    }

    /// Decrypt the primary key with `passphrase`
    ///
    /// An unencrypted primary key is used as is.
    pub fn unlock_signer(&self, passphrase: &str) -> Result<Signer> {
        let key = self
            .cert
            .primary_key()
            .key()
            .clone()
            .parts_into_secret()
            .map_err(|_| PgpError::NoSecretKey)?;

        let key = if key.secret().is_encrypted() {
            key.decrypt_secret(&Password::from(passphrase))
                .map_err(|_| PgpError::BadPassphrase)?
        } else {
            key
        };

        let keypair = key.into_keypair().map_err(PgpError::Unlock)?;
        Ok(Signer {
            keypair,
            key_id: self.key_id(),
        })
    }

    /// Add one certification by `signer` to every identity
    pub fn certify_identities(&mut self, signer: &mut Signer) -> Result<usize> {
        let mut packets: Vec<Packet> = Vec::new();
        for ua in self.cert.userids() {
            let userid = ua.userid().clone();
            let sig = userid
                .certify(
                    &mut signer.keypair,
                    &self.cert,
                    SignatureType::GenericCertification,
                    None,
                    None,
                )
                .map_err(PgpError::Certify)?;
            packets.push(userid.into());
            packets.push(sig.into());
        }

        let certified = packets.len() / 2;
        self.insert(packets)?;
        Ok(certified)
    }

    /// Append signatures to an existing identity
    pub fn append_certifications<'a, I>(
        &mut self,
        identity: &Identity,
        certifications: I,
    ) -> Result<usize>
    where
        I: IntoIterator<Item = &'a Certification>,
    {
        let mut packets: Vec<Packet> = vec![identity.user_id.clone().into()];
        packets.extend(
            certifications
                .into_iter()
                .map(|c| Packet::from(c.signature.clone())),
        );

        let appended = packets.len() - 1;
        if appended > 0 {
            self.insert(packets)?;
        }
        Ok(appended)
    }

    fn insert(&mut self, packets: Vec<Packet>) -> Result<()> {
        let (cert, _changed) = self
            .cert
            .clone()
            .insert_packets(packets)
            .map_err(PgpError::Insert)?;
        self.cert = cert;
        Ok(())
    }

    /// Armored public key block; secret material is never included
    pub fn to_public_armor(&self) -> Result<String> {
        let bytes = self.cert.armored().to_vec().map_err(PgpError::Serialize)?;
        String::from_utf8(bytes).map_err(|e| PgpError::Serialize(e.into()))
    }

    /// Armored private key block carrying the (encrypted) secret material
    pub fn to_private_armor(&self) -> Result<String> {
        let bytes = self
            .cert
            .as_tsk()
            .armored()
            .to_vec()
            .map_err(PgpError::Serialize)?;
        String::from_utf8(bytes).map_err(|e| PgpError::Serialize(e.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generated() -> Entity {
        Entity::generate("Alice", "alice@example.com", "p", KeySuite::Cv25519).unwrap()
    }

    #[test]
    fn test_user_id_format() {
        let uid = user_id("Alice", "alice@example.com").unwrap();
        assert_eq!(uid.value(), b"Alice <alice@example.com>");
    }

    #[test]
    fn test_user_id_rejects_delimiters() {
        assert!(matches!(user_id("Al<ice", "a@x.com"), Err(PgpError::InvalidUserId)));
        assert!(matches!(user_id("Alice", "a@x.com)"), Err(PgpError::InvalidUserId)));
        assert!(matches!(user_id("Al\0ice", "a@x.com"), Err(PgpError::InvalidUserId)));
    }

    #[test]
    fn test_split_user_id() {
        assert_eq!(
            split_user_id(b"bob <bob>"),
            (Some("bob".to_string()), Some("bob".to_string()))
        );
        assert_eq!(
            split_user_id(b"A <not an email>"),
            (Some("A".to_string()), Some("not an email".to_string()))
        );
        assert_eq!(split_user_id(b"<a@x.com>"), (None, Some("a@x.com".to_string())));
        assert_eq!(split_user_id(b"Just A Name"), (Some("Just A Name".to_string()), None));
    }

    #[test]
    fn test_identity_view_non_mailbox_email() {
        let entity = Entity::generate("bob", "bob", "p", KeySuite::Cv25519).unwrap();
        let identity = &entity.identities()[0];
        assert_eq!(identity.name().as_deref(), Some("bob"));
        assert_eq!(identity.email().as_deref(), Some("bob"));
    }

    #[test]
    fn test_key_suite_parse() {
        assert_eq!("cv25519".parse::<KeySuite>().unwrap(), KeySuite::Cv25519);
        assert_eq!("RSA4K".parse::<KeySuite>().unwrap(), KeySuite::Rsa4k);
        assert!("dsa1k".parse::<KeySuite>().is_err());
    }

    #[test]
    fn test_generated_keys_all_encrypted() {
        let entity = generated();
        let states = entity.encrypted_secret_keys();
        // primary + signing subkey + encryption subkey
        assert_eq!(states.len(), 3);
        assert!(states.iter().all(|encrypted| *encrypted));
    }

    #[test]
    fn test_armor_round_trip_block_types() {
        let entity = generated();

        let public = decode_armor(&entity.to_public_armor().unwrap()).unwrap();
        assert_eq!(public.block_type(), BlockType::PublicKey);
        assert!(!Entity::parse(&public).unwrap().has_secret());

        let private = decode_armor(&entity.to_private_armor().unwrap()).unwrap();
        assert_eq!(private.block_type(), BlockType::PrivateKey);
        assert!(Entity::parse(&private).unwrap().has_secret());
    }

    #[test]
    fn test_unlock_signer() {
        let entity = generated();
        assert!(entity.unlock_signer("p").is_ok());
        assert!(matches!(entity.unlock_signer("wrong"), Err(PgpError::BadPassphrase)));
    }

    #[test]
    fn test_unlock_without_secret() {
        let entity = generated();
        let public = decode_armor(&entity.to_public_armor().unwrap()).unwrap();
        let public = Entity::parse(&public).unwrap();
        assert!(matches!(public.unlock_signer("p"), Err(PgpError::NoSecretKey)));
    }

    #[test]
    fn test_identity_view() {
        let entity = generated();
        let identities = entity.identities();
        assert_eq!(identities.len(), 1);

        let identity = &identities[0];
        assert_eq!(identity.name().as_deref(), Some("Alice"));
        assert_eq!(identity.email().as_deref(), Some("alice@example.com"));
        assert!(identity.certifications().is_empty());
        assert_eq!(identity.self_signatures()[0].issuer(), entity.key_id());
    }

    #[test]
    fn test_certify_identities_by_other_key() {
        let mut subject = generated();
        let signer_entity =
            Entity::generate("Bob", "bob@example.com", "q", KeySuite::Cv25519).unwrap();
        let mut signer = signer_entity.unlock_signer("q").unwrap();

        assert_eq!(subject.certify_identities(&mut signer).unwrap(), 1);

        let identity = &subject.identities()[0];
        let issuers: Vec<_> = identity.certifications().iter().map(|c| c.issuer()).collect();
        assert_eq!(issuers, vec![signer_entity.key_id()]);
    }

    #[test]
    fn test_decode_garbage() {
        let result = decode_armor("-----BEGIN PGP PUBLIC KEY BLOCK-----\n\n!!!!\n");
        let parsed = result.and_then(|block| Entity::parse(&block));
        assert!(parsed.is_err());
    }
}
