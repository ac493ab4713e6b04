//! Curve capability, secp256k1 implementation, and node identities.
//!
//! A **Node ID** is the hex-encoded 64-byte public key (uncompressed point
//! without the `0x04` tag), the form peers advertise in directory entries.
//!
//! # Example
//!
//! ```
//! use rlpx_crypto::curve::{NodeId, NodeKey};
//!
//! let key = NodeKey::generate();
//! let node_id = key.node_id();
//! assert_eq!(node_id.as_str().len(), 128);
//!
//! let parsed = NodeId::parse(node_id.as_str()).unwrap();
//! assert_eq!(parsed, node_id);
//! ```

use std::fmt;
use std::fs;
use std::path::Path;

use anyhow::Context;
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use secp256k1::ecdh::shared_secret_point;
use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
use secp256k1::{Message, PublicKey, SecretKey, SECP256K1};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use zeroize::{Zeroize, Zeroizing};

#[derive(Debug, Error)]
pub enum CurveError {
    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("invalid secret key")]
    InvalidSecretKey,

    #[error("invalid signature encoding")]
    InvalidSignature,

    #[error("public key recovery failed")]
    Recovery,
}

/// Asymmetric primitives the handshake and envelope cipher are written against.
///
/// Key and signature lengths are fixed per scheme; encodings are validated
/// when decoded, never reinterpreted.
pub trait Curve {
    /// Public key length as carried in handshake messages.
    const PUBLIC_KEY_LEN: usize;
    const SECRET_KEY_LEN: usize;
    const SIGNATURE_LEN: usize;
    /// Public key length as carried at the front of an envelope.
    const ENVELOPE_KEY_LEN: usize;

    type SecretKey: Send + Sync;
    type PublicKey: Clone + PartialEq + Eq + fmt::Debug + Send + Sync;

    fn generate_secret<R: RngCore + CryptoRng + ?Sized>(rng: &mut R) -> Self::SecretKey;

    fn public_key(secret: &Self::SecretKey) -> Self::PublicKey;

    /// Raw x-coordinate of the shared point.
    fn diffie_hellman(secret: &Self::SecretKey, peer: &Self::PublicKey) -> Zeroizing<[u8; 32]>;

    /// Recoverable signature over a 32-byte digest.
    fn sign(secret: &Self::SecretKey, digest: &[u8; 32]) -> Vec<u8>;

    fn recover(signature: &[u8], digest: &[u8; 32]) -> Result<Self::PublicKey, CurveError>;

    fn encode_public_key(key: &Self::PublicKey) -> Vec<u8>;

    fn decode_public_key(bytes: &[u8]) -> Result<Self::PublicKey, CurveError>;

    fn encode_envelope_key(key: &Self::PublicKey) -> Vec<u8>;

    fn decode_envelope_key(bytes: &[u8]) -> Result<Self::PublicKey, CurveError>;

    fn secret_to_bytes(secret: &Self::SecretKey) -> Zeroizing<Vec<u8>>;

    fn secret_from_bytes(bytes: &[u8]) -> Result<Self::SecretKey, CurveError>;

    fn erase_secret(secret: &mut Self::SecretKey);
}

/// secp256k1 with recoverable ECDSA, as used by RLPx v4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Secp256k1;

impl Curve for Secp256k1 {
    const PUBLIC_KEY_LEN: usize = 64;
    const SECRET_KEY_LEN: usize = 32;
    const SIGNATURE_LEN: usize = 65;
    const ENVELOPE_KEY_LEN: usize = 65;

    type SecretKey = SecretKey;
    type PublicKey = PublicKey;

    fn generate_secret<R: RngCore + CryptoRng + ?Sized>(rng: &mut R) -> SecretKey {
        SecretKey::new(rng)
    }

    fn public_key(secret: &SecretKey) -> PublicKey {
        PublicKey::from_secret_key(SECP256K1, secret)
    }

    fn diffie_hellman(secret: &SecretKey, peer: &PublicKey) -> Zeroizing<[u8; 32]> {
        let mut point = shared_secret_point(peer, secret);
        let mut x = Zeroizing::new([0u8; 32]);
        x.copy_from_slice(&point[..32]);
        point.zeroize();
        x
    }

    fn sign(secret: &SecretKey, digest: &[u8; 32]) -> Vec<u8> {
        let message = Message::from_digest(*digest);
        let (recovery_id, compact) = SECP256K1
            .sign_ecdsa_recoverable(&message, secret)
            .serialize_compact();

        let mut out = Vec::with_capacity(Self::SIGNATURE_LEN);
        out.extend_from_slice(&compact);
        out.push(recovery_id.to_i32() as u8);
        out
    }

    fn recover(signature: &[u8], digest: &[u8; 32]) -> Result<PublicKey, CurveError> {
        if signature.len() != Self::SIGNATURE_LEN {
            return Err(CurveError::InvalidSignature);
        }
        let recovery_id = RecoveryId::from_i32(i32::from(signature[64]))
            .map_err(|_| CurveError::InvalidSignature)?;
        let signature = RecoverableSignature::from_compact(&signature[..64], recovery_id)
            .map_err(|_| CurveError::InvalidSignature)?;

        SECP256K1
            .recover_ecdsa(&Message::from_digest(*digest), &signature)
            .map_err(|_| CurveError::Recovery)
    }

    fn encode_public_key(key: &PublicKey) -> Vec<u8> {
        key.serialize_uncompressed()[1..].to_vec()
    }

    fn decode_public_key(bytes: &[u8]) -> Result<PublicKey, CurveError> {
        if bytes.len() != Self::PUBLIC_KEY_LEN {
            return Err(CurveError::InvalidPublicKey);
        }
        let mut tagged = [0u8; 65];
        tagged[0] = 0x04;
        tagged[1..].copy_from_slice(bytes);
        PublicKey::from_slice(&tagged).map_err(|_| CurveError::InvalidPublicKey)
    }

    fn encode_envelope_key(key: &PublicKey) -> Vec<u8> {
        key.serialize_uncompressed().to_vec()
    }

    fn decode_envelope_key(bytes: &[u8]) -> Result<PublicKey, CurveError> {
        if bytes.len() != Self::ENVELOPE_KEY_LEN || bytes[0] != 0x04 {
            return Err(CurveError::InvalidPublicKey);
        }
        PublicKey::from_slice(bytes).map_err(|_| CurveError::InvalidPublicKey)
    }

    fn secret_to_bytes(secret: &SecretKey) -> Zeroizing<Vec<u8>> {
        Zeroizing::new(secret.secret_bytes().to_vec())
    }

    fn secret_from_bytes(bytes: &[u8]) -> Result<SecretKey, CurveError> {
        SecretKey::from_slice(bytes).map_err(|_| CurveError::InvalidSecretKey)
    }

    fn erase_secret(secret: &mut SecretKey) {
        secret.non_secure_erase();
    }
}

/// Node ID: hex-encoded wire public key.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NodeId(String);

impl NodeId {
    pub fn from_public_key<C: Curve>(key: &C::PublicKey) -> Self {
        Self(hex::encode(C::encode_public_key(key)))
    }

    /// Parse a secp256k1 Node ID from its string representation.
    pub fn parse(s: &str) -> anyhow::Result<Self> {
        Self::parse_for::<Secp256k1>(s)
    }

    /// Parse a Node ID whose key length is set by curve `C`.
    pub fn parse_for<C: Curve>(s: &str) -> anyhow::Result<Self> {
        let bytes = hex::decode(s).context("invalid hex encoding")?;

        if bytes.len() != C::PUBLIC_KEY_LEN {
            anyhow::bail!(
                "invalid Node ID length: expected {} bytes, got {}",
                C::PUBLIC_KEY_LEN,
                bytes.len()
            );
        }

        Ok(Self(s.to_ascii_lowercase()))
    }

    pub fn to_public_key<C: Curve>(&self) -> anyhow::Result<C::PublicKey> {
        let bytes = hex::decode(&self.0).context("invalid hex encoding")?;
        C::decode_public_key(&bytes).context("Node ID is not a valid public key")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for NodeId {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<NodeId> for String {
    fn from(id: NodeId) -> Self {
        id.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({}..)", &self.0[..16.min(self.0.len())])
    }
}

/// Long-term node keypair.
///
/// The secret half is erased on drop and never printed.
pub struct NodeKey<C: Curve = Secp256k1> {
    secret: C::SecretKey,
    public: C::PublicKey,
}

impl NodeKey<Secp256k1> {
    /// Generate a new random keypair using the OS CSPRNG.
    pub fn generate() -> Self {
        Self::generate_with(&mut OsRng)
    }
}

impl<C: Curve> NodeKey<C> {
    pub fn generate_with<R: RngCore + CryptoRng + ?Sized>(rng: &mut R) -> Self {
        Self::from_secret(C::generate_secret(rng))
    }

    pub fn from_secret(secret: C::SecretKey) -> Self {
        let public = C::public_key(&secret);
        Self { secret, public }
    }

    /// Create from raw secret key bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CurveError> {
        C::secret_from_bytes(bytes).map(Self::from_secret)
    }

    pub fn public_key(&self) -> &C::PublicKey {
        &self.public
    }

    pub fn node_id(&self) -> NodeId {
        NodeId::from_public_key::<C>(&self.public)
    }

    pub(crate) fn secret(&self) -> &C::SecretKey {
        &self.secret
    }

    /// Save the secret key as hex text.
    ///
    /// The file is created with 0600 permissions on Unix.
    pub fn save(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let path = path.as_ref();
        let encoded = Zeroizing::new(hex::encode(&*C::secret_to_bytes(&self.secret)));

        fs::write(path, encoded.as_bytes())
            .with_context(|| format!("failed to write node key to {}", path.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = fs::metadata(path)?.permissions();
            perms.set_mode(0o600);
            fs::set_permissions(path, perms)?;
        }

        Ok(())
    }

    /// Load a secret key written by [`NodeKey::save`].
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = Zeroizing::new(
            fs::read_to_string(path)
                .with_context(|| format!("failed to read node key from {}", path.display()))?,
        );
        let bytes = Zeroizing::new(hex::decode(text.trim()).context("invalid hex in node key")?);

        if bytes.len() != C::SECRET_KEY_LEN {
            anyhow::bail!(
                "invalid node key length: expected {} bytes, got {}",
                C::SECRET_KEY_LEN,
                bytes.len()
            );
        }

        Self::from_bytes(&bytes).context("invalid node key")
    }
}

impl<C: Curve> fmt::Debug for NodeKey<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("NodeKey").field(&self.node_id()).finish()
    }
}

impl<C: Curve> Drop for NodeKey<C> {
    fn drop(&mut self) {
        C::erase_secret(&mut self.secret);
    }
}

/// Keypair generated for a single handshake or envelope.
///
/// Deriving the shared secret consumes the keypair, so it cannot be used twice.
pub struct EphemeralKeypair<C: Curve = Secp256k1> {
    secret: C::SecretKey,
    public: C::PublicKey,
}

impl<C: Curve> EphemeralKeypair<C> {
    pub fn generate<R: RngCore + CryptoRng + ?Sized>(rng: &mut R) -> Self {
        let secret = C::generate_secret(rng);
        let public = C::public_key(&secret);
        Self { secret, public }
    }

    #[cfg(test)]
    pub(crate) fn from_secret(secret: C::SecretKey) -> Self {
        let public = C::public_key(&secret);
        Self { secret, public }
    }

    pub fn public_key(&self) -> &C::PublicKey {
        &self.public
    }

    pub fn sign(&self, digest: &[u8; 32]) -> Vec<u8> {
        C::sign(&self.secret, digest)
    }

    pub fn diffie_hellman(self, peer: &C::PublicKey) -> Zeroizing<[u8; 32]> {
        C::diffie_hellman(&self.secret, peer)
    }
}

impl<C: Curve> Drop for EphemeralKeypair<C> {
    fn drop(&mut self) {
        C::erase_secret(&mut self.secret);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keypair_generation() {
        let key = NodeKey::generate();
        let node_id = key.node_id();

        // 64 bytes hex encoded
        assert_eq!(node_id.as_str().len(), 128);
        assert_eq!(
            node_id.to_public_key::<Secp256k1>().unwrap(),
            *key.public_key()
        );
    }

    #[test]
    fn test_sign_recover() {
        let key = EphemeralKeypair::<Secp256k1>::generate(&mut OsRng);
        let digest = [7u8; 32];

        let signature = key.sign(&digest);
        assert_eq!(signature.len(), Secp256k1::SIGNATURE_LEN);
        assert_eq!(
            Secp256k1::recover(&signature, &digest).unwrap(),
            *key.public_key()
        );

        // Different digest recovers a different key (or nothing)
        match Secp256k1::recover(&signature, &[8u8; 32]) {
            Ok(other) => assert_ne!(other, *key.public_key()),
            Err(e) => assert!(matches!(e, CurveError::Recovery)),
        }
    }

    #[test]
    fn test_recover_rejects_bad_encoding() {
        assert!(matches!(
            Secp256k1::recover(&[0u8; 64], &[0u8; 32]),
            Err(CurveError::InvalidSignature)
        ));

        let mut signature = vec![1u8; 65];
        signature[64] = 9;
        assert!(matches!(
            Secp256k1::recover(&signature, &[0u8; 32]),
            Err(CurveError::InvalidSignature)
        ));
    }

    #[test]
    fn test_diffie_hellman_agrees() {
        let a = NodeKey::generate();
        let b = NodeKey::generate();

        let ab = Secp256k1::diffie_hellman(a.secret(), b.public_key());
        let ba = Secp256k1::diffie_hellman(b.secret(), a.public_key());
        assert_eq!(*ab, *ba);
    }

    #[test]
    fn test_public_key_encodings() {
        let key = NodeKey::generate();

        let wire = Secp256k1::encode_public_key(key.public_key());
        assert_eq!(wire.len(), 64);
        assert_eq!(Secp256k1::decode_public_key(&wire).unwrap(), *key.public_key());

        let envelope = Secp256k1::encode_envelope_key(key.public_key());
        assert_eq!(envelope[0], 0x04);
        assert_eq!(&envelope[1..], &wire[..]);
        assert_eq!(
            Secp256k1::decode_envelope_key(&envelope).unwrap(),
            *key.public_key()
        );

        assert!(Secp256k1::decode_public_key(&[0u8; 64]).is_err());
        assert!(Secp256k1::decode_public_key(&wire[1..]).is_err());
        assert!(Secp256k1::decode_envelope_key(&wire).is_err());
    }

    #[test]
    fn test_node_id_parse() {
        let key = NodeKey::generate();
        let node_id = key.node_id();

        let upper = node_id.as_str().to_ascii_uppercase();
        assert_eq!(NodeId::parse(&upper).unwrap(), node_id);

        assert!(NodeId::parse("zz").is_err());
        assert!(NodeId::parse(&node_id.as_str()[2..]).is_err());
    }

    #[test]
    fn test_node_id_length_follows_curve() {
        let exact = hex::encode(vec![0xab; Secp256k1::PUBLIC_KEY_LEN]);
        let long = hex::encode(vec![0xab; Secp256k1::PUBLIC_KEY_LEN + 1]);

        assert!(NodeId::parse_for::<Secp256k1>(&exact).is_ok());
        assert!(NodeId::parse_for::<Secp256k1>(&long).is_err());
        assert_eq!(
            NodeId::parse(&exact).unwrap(),
            NodeId::parse_for::<Secp256k1>(&exact).unwrap()
        );
    }

    #[test]
    fn test_node_id_serde_as_string() {
        let node_id = NodeKey::generate().node_id();

        let json = serde_json::to_string(&node_id).unwrap();
        assert_eq!(json, format!("\"{}\"", node_id));
        let parsed: NodeId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, node_id);

        assert!(serde_json::from_str::<NodeId>("\"abcd\"").is_err());
    }

    #[test]
    fn test_keypair_bytes_roundtrip() {
        let key = NodeKey::generate();
        let bytes = Secp256k1::secret_to_bytes(key.secret());

        let restored = NodeKey::<Secp256k1>::from_bytes(&bytes).unwrap();
        assert_eq!(restored.public_key(), key.public_key());
        assert!(NodeKey::<Secp256k1>::from_bytes(&[0u8; 32]).is_err());
    }

    #[test]
    fn test_save_load() {
        let key = NodeKey::generate();
        let path = std::env::temp_dir().join(format!("rlpx-node-key-{}.hex", key.node_id()));

        key.save(&path).unwrap();
        let loaded = NodeKey::<Secp256k1>::load(&path).unwrap();
        assert_eq!(loaded.public_key(), key.public_key());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_debug_hides_secret() {
        let key = NodeKey::generate();
        let secret_hex = hex::encode(key.secret().secret_bytes());
        let printed = format!("{:?}", key);
        assert!(printed.starts_with("NodeKey("));
        assert!(!printed.contains(&secret_hex));
    }
}
