//! Authorization for request handlers
//!
//! The engine never inspects signatures itself; it asks an [`Authorizer`]
//! whether a credential proves control of an identity. The reference
//! implementation signs a domain-tagged message over the identity bytes
//! with Ed25519, but any capability scheme fits behind the trait.

use ed25519_dalek::{Signature as DalekSignature, Signer, SigningKey, Verifier, VerifyingKey};
use merkle_ledger::IdentityKey;
use serde::{Deserialize, Serialize};

/// Domain tag signed into every credential
const TAG_CREDENTIAL: &[u8] = b"recon.credential.v1";

/// Digital signature (Ed25519)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signature {
    /// Signature bytes (64 bytes)
    #[serde(with = "serde_bytes")]
    bytes: [u8; 64],
}

impl Signature {
    /// Create from bytes
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self { bytes }
    }

    /// Get bytes
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.bytes
    }
}

/// A caller's claim to act as an identity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    /// Identity the caller claims to control
    pub identity: IdentityKey,

    /// Proof backing the claim
    pub proof: Signature,
}

/// Capability check over identities, independent of any signing scheme
pub trait Authorizer: Send + Sync {
    /// Returns true when `credential` proves control of `identity`
    fn verify(&self, credential: &Credential, identity: &IdentityKey) -> bool;
}

/// Message a credential must sign to prove control of `identity`
pub fn credential_message(identity: &IdentityKey) -> Vec<u8> {
    let mut message = Vec::with_capacity(TAG_CREDENTIAL.len() + 32);
    message.extend_from_slice(TAG_CREDENTIAL);
    message.extend_from_slice(identity.as_bytes());
    message
}

/// Authorizer backed by Ed25519: the identity key *is* the verifying key
#[derive(Debug, Default, Clone, Copy)]
pub struct Ed25519Authorizer;

impl Authorizer for Ed25519Authorizer {
    fn verify(&self, credential: &Credential, identity: &IdentityKey) -> bool {
        if credential.identity != *identity {
            return false;
        }

        let verifying_key = match VerifyingKey::from_bytes(identity.as_bytes()) {
            Ok(key) => key,
            Err(_) => return false,
        };

        let signature = DalekSignature::from_bytes(credential.proof.as_bytes());
        verifying_key
            .verify(&credential_message(identity), &signature)
            .is_ok()
    }
}

/// Authorizer that accepts every credential (tests and demos only)
#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAll;

impl Authorizer for AllowAll {
    fn verify(&self, _credential: &Credential, _identity: &IdentityKey) -> bool {
        true
    }
}

/// Ed25519 key pair for producing credentials
#[derive(Debug)]
pub struct KeyPair {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
}

impl KeyPair {
    /// Generate a new random key pair
    pub fn generate() -> Self {
        let signing_key = SigningKey::from_bytes(&rand::random::<[u8; 32]>());
        let verifying_key = signing_key.verifying_key();

        Self {
            signing_key,
            verifying_key,
        }
    }

    /// Create from seed (32 bytes) - deterministic generation
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(seed);
        let verifying_key = signing_key.verifying_key();

        Self {
            signing_key,
            verifying_key,
        }
    }

    /// Identity key this pair controls
    pub fn identity(&self) -> IdentityKey {
        IdentityKey::from_bytes(self.verifying_key.to_bytes())
    }

    /// Sign a credential proving control of this pair's identity
    pub fn credential(&self) -> Credential {
        let identity = self.identity();
        let signature = self.signing_key.sign(&credential_message(&identity));

        Credential {
            identity,
            proof: Signature::from_bytes(signature.to_bytes()),
        }
    }
}
