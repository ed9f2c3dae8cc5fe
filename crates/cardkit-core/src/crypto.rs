//! Crypto capability consumed by the trust model.
//!
//! Everything above this module talks to [`CardCrypto`] only. The bundled
//! [`Ed25519Crypto`] wraps ed25519-dalek signing and SHA-2 hashing.

use base64::{engine::general_purpose::STANDARD, Engine};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256, Sha512};
use std::fmt;

use crate::error::CoreError;

/// Length of an exported public key.
pub const PUBLIC_KEY_LENGTH: usize = 32;

/// Length of a signature produced by [`Ed25519Crypto`].
pub const SIGNATURE_LENGTH: usize = 64;

/// An imported public key handle.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey(pub [u8; PUBLIC_KEY_LENGTH]);

impl PublicKey {
    /// Create from raw bytes without point validation.
    pub const fn from_bytes(bytes: [u8; PUBLIC_KEY_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; PUBLIC_KEY_LENGTH] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Standard base64 of the raw key, as carried in snapshots and whitelists.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0)
    }

    /// Parse a standard base64 key and check it is a valid curve point.
    pub fn from_base64(s: &str) -> Result<Self, CoreError> {
        let bytes = STANDARD.decode(s)?;
        Self::try_from(bytes.as_slice())
    }

    fn verifying_key(&self) -> Result<VerifyingKey, CoreError> {
        VerifyingKey::from_bytes(&self.0).map_err(|_| CoreError::InvalidPublicKey)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", &self.to_hex()[..16])
    }
}

impl AsRef<[u8]> for PublicKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl TryFrom<&[u8]> for PublicKey {
    type Error = CoreError;

    fn try_from(slice: &[u8]) -> Result<Self, Self::Error> {
        let arr: [u8; PUBLIC_KEY_LENGTH] =
            slice.try_into().map_err(|_| CoreError::InvalidPublicKey)?;
        let key = Self(arr);
        key.verifying_key()?;
        Ok(key)
    }
}

/// Serialized as standard base64, the form used in trust configuration.
impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base64())
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_base64(&s).map_err(de::Error::custom)
    }
}

/// A private signing key.
///
/// Wraps ed25519-dalek's SigningKey.
#[derive(Clone)]
pub struct PrivateKey {
    signing_key: SigningKey,
}

impl PrivateKey {
    /// Generate a new random key.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        Self {
            signing_key: SigningKey::generate(&mut rng),
        }
    }

    /// Create from a 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// Get the matching public key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.signing_key.verifying_key().to_bytes())
    }

    /// Get the raw seed bytes (secret key material).
    pub fn seed(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrivateKey({:?})", self.public_key())
    }
}

/// The narrow crypto surface the trust model depends on.
pub trait CardCrypto: Send + Sync {
    /// Sign raw bytes.
    fn generate_signature(&self, data: &[u8], private_key: &PrivateKey)
        -> Result<Vec<u8>, CoreError>;

    /// Check a detached signature over raw bytes.
    fn verify_signature(&self, data: &[u8], signature: &[u8], public_key: &PublicKey) -> bool;

    fn generate_sha256(&self, data: &[u8]) -> [u8; 32];

    fn generate_sha512(&self, data: &[u8]) -> [u8; 64];

    /// Import an exported public key.
    fn import_public_key(&self, data: &[u8]) -> Result<PublicKey, CoreError>;

    /// Export a public key to raw bytes.
    fn export_public_key(&self, public_key: &PublicKey) -> Vec<u8>;
}

/// Ed25519 signatures with SHA-2 digests.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ed25519Crypto;

impl Ed25519Crypto {
    pub fn new() -> Self {
        Self
    }
}

impl CardCrypto for Ed25519Crypto {
    fn generate_signature(
        &self,
        data: &[u8],
        private_key: &PrivateKey,
    ) -> Result<Vec<u8>, CoreError> {
        Ok(private_key.signing_key.sign(data).to_bytes().to_vec())
    }

    fn verify_signature(&self, data: &[u8], signature: &[u8], public_key: &PublicKey) -> bool {
        let Ok(sig_bytes) = <[u8; SIGNATURE_LENGTH]>::try_from(signature) else {
            return false;
        };
        let Ok(verifying_key) = public_key.verifying_key() else {
            return false;
        };
        verifying_key
            .verify(data, &Signature::from_bytes(&sig_bytes))
            .is_ok()
    }

    fn generate_sha256(&self, data: &[u8]) -> [u8; 32] {
        Sha256::digest(data).into()
    }

    fn generate_sha512(&self, data: &[u8]) -> [u8; 64] {
        Sha512::digest(data).into()
    }

    fn import_public_key(&self, data: &[u8]) -> Result<PublicKey, CoreError> {
        PublicKey::try_from(data)
    }

    fn export_public_key(&self, public_key: &PublicKey) -> Vec<u8> {
        public_key.0.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_verify() {
        let crypto = Ed25519Crypto::new();
        let key = PrivateKey::generate();
        let message = b"hello world";
        let signature = crypto.generate_signature(message, &key).unwrap();

        assert!(crypto.verify_signature(message, &signature, &key.public_key()));

        // Tampered message should fail
        assert!(!crypto.verify_signature(b"hello worlD", &signature, &key.public_key()));
    }

    #[test]
    fn test_verify_rejects_truncated_signature() {
        let crypto = Ed25519Crypto::new();
        let key = PrivateKey::from_seed(&[0x42; 32]);
        let signature = crypto.generate_signature(b"data", &key).unwrap();

        assert!(!crypto.verify_signature(b"data", &signature[..63], &key.public_key()));
    }

    #[test]
    fn test_deterministic_from_seed() {
        let k1 = PrivateKey::from_seed(&[0x42; 32]);
        let k2 = PrivateKey::from_seed(&[0x42; 32]);
        assert_eq!(k1.public_key(), k2.public_key());
        assert_eq!(k1.seed(), [0x42; 32]);
    }

    #[test]
    fn test_public_key_import_export() {
        let crypto = Ed25519Crypto::new();
        let pk = PrivateKey::generate().public_key();
        let exported = crypto.export_public_key(&pk);
        assert_eq!(crypto.import_public_key(&exported).unwrap(), pk);

        assert!(matches!(
            crypto.import_public_key(&exported[..31]),
            Err(CoreError::InvalidPublicKey)
        ));
    }

    #[test]
    fn test_public_key_base64() {
        let pk = PrivateKey::from_seed(&[0x07; 32]).public_key();
        assert_eq!(PublicKey::from_base64(&pk.to_base64()).unwrap(), pk);
        assert!(PublicKey::from_base64("not base64!").is_err());
    }

    #[test]
    fn test_public_key_serde_base64() {
        let pk = PrivateKey::from_seed(&[0x09; 32]).public_key();
        let json = serde_json::to_string(&pk).unwrap();
        assert_eq!(json, format!("\"{}\"", pk.to_base64()));
        assert_eq!(serde_json::from_str::<PublicKey>(&json).unwrap(), pk);
    }

    #[test]
    fn test_sha_digests() {
        let crypto = Ed25519Crypto::new();
        assert_eq!(
            hex::encode(crypto.generate_sha256(b"abc")),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(
            hex::encode(&crypto.generate_sha512(b"abc")[..8]),
            "ddaf35a193617aba"
        );
    }
}
