//! Session secrets derived from a completed handshake.

use sha3::{Digest, Keccak256};
use zeroize::{Zeroize, Zeroizing};

use crate::handshake::Role;
use rlpx_core::NONCE_LEN;

/// Symmetric keys and seeded MAC states for one session.
///
/// Keys are zeroed on drop. The MAC states move into the frame codec and are
/// never shared between directions.
pub struct Secrets {
    pub(crate) aes_key: [u8; 32],
    pub(crate) mac_key: [u8; 32],
    pub(crate) egress_mac: Keccak256,
    pub(crate) ingress_mac: Keccak256,
}

impl Secrets {
    pub fn new(
        aes_key: [u8; 32],
        mac_key: [u8; 32],
        egress_mac: Keccak256,
        ingress_mac: Keccak256,
    ) -> Self {
        Self {
            aes_key,
            mac_key,
            egress_mac,
            ingress_mac,
        }
    }

    /// Derive session secrets.
    ///
    /// ```text
    /// shared = keccak(ecdhe || keccak(resp_nonce || init_nonce))
    /// aes    = keccak(ecdhe || shared)
    /// mac    = keccak(ecdhe || aes)
    /// ```
    ///
    /// The initiator's egress MAC is seeded with `(mac ^ resp_nonce) || auth`
    /// and its ingress MAC with `(mac ^ init_nonce) || ack`; the responder
    /// uses the same two states the other way round.
    pub(crate) fn derive(
        ephemeral_shared: &[u8; 32],
        init_nonce: &[u8; NONCE_LEN],
        resp_nonce: &[u8; NONCE_LEN],
        auth_packet: &[u8],
        ack_packet: &[u8],
        role: Role,
    ) -> Self {
        let nonce_hash = keccak(&[resp_nonce, init_nonce]);
        let shared = Zeroizing::new(keccak(&[ephemeral_shared, &nonce_hash]));
        let aes_key = keccak(&[ephemeral_shared, &shared[..]]);
        let mac_key = keccak(&[ephemeral_shared, &aes_key]);

        let mut auth_mac = Keccak256::new();
        auth_mac.update(xor32(&mac_key, resp_nonce));
        auth_mac.update(auth_packet);

        let mut ack_mac = Keccak256::new();
        ack_mac.update(xor32(&mac_key, init_nonce));
        ack_mac.update(ack_packet);

        let (egress_mac, ingress_mac) = match role {
            Role::Initiator => (auth_mac, ack_mac),
            Role::Responder => (ack_mac, auth_mac),
        };

        Self::new(aes_key, mac_key, egress_mac, ingress_mac)
    }

    pub fn aes_key(&self) -> &[u8; 32] {
        &self.aes_key
    }

    pub fn mac_key(&self) -> &[u8; 32] {
        &self.mac_key
    }

    pub fn egress_mac(&self) -> &Keccak256 {
        &self.egress_mac
    }

    pub fn ingress_mac(&self) -> &Keccak256 {
        &self.ingress_mac
    }
}

impl Drop for Secrets {
    fn drop(&mut self) {
        self.aes_key.zeroize();
        self.mac_key.zeroize();
    }
}

pub(crate) fn keccak(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    for part in parts {
        hasher.update(part);
    }
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    out
}

pub(crate) fn xor32(a: &[u8; 32], b: &[u8; 32]) -> [u8; 32] {
    let mut out = [0u8; 32];
    for (o, (x, y)) in out.iter_mut().zip(a.iter().zip(b.iter())) {
        *o = x ^ y;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_vectors::{self as tv, array32, bytes};

    fn digest_after(mac: &Keccak256, data: &[u8]) -> Vec<u8> {
        let mut mac = mac.clone();
        mac.update(data);
        mac.finalize().to_vec()
    }

    #[test]
    fn test_keccak_empty() {
        assert_eq!(
            hex::encode(keccak(&[])),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
        assert_eq!(keccak(&[b"ab", b"c"]), keccak(&[b"abc"]));
    }

    #[test]
    fn test_xor32() {
        let a = [0xf0u8; 32];
        let b = [0x0fu8; 32];
        assert_eq!(xor32(&a, &b), [0xffu8; 32]);
        assert_eq!(xor32(&a, &a), [0u8; 32]);
    }

    #[test]
    fn test_roles_mirror() {
        let shared = [5u8; 32];
        let init_nonce = [1u8; 32];
        let resp_nonce = [2u8; 32];

        let initiator = Secrets::derive(
            &shared,
            &init_nonce,
            &resp_nonce,
            b"auth",
            b"ack",
            Role::Initiator,
        );
        let responder = Secrets::derive(
            &shared,
            &init_nonce,
            &resp_nonce,
            b"auth",
            b"ack",
            Role::Responder,
        );

        assert_eq!(initiator.aes_key(), responder.aes_key());
        assert_eq!(initiator.mac_key(), responder.mac_key());
        assert_ne!(initiator.aes_key(), initiator.mac_key());
        assert_eq!(
            digest_after(initiator.egress_mac(), b"x"),
            digest_after(responder.ingress_mac(), b"x")
        );
        assert_eq!(
            digest_after(initiator.ingress_mac(), b"x"),
            digest_after(responder.egress_mac(), b"x")
        );
        assert_ne!(
            digest_after(initiator.egress_mac(), b"x"),
            digest_after(initiator.ingress_mac(), b"x")
        );
    }

    #[test]
    fn test_known_secrets() {
        use crate::curve::{Curve, Secp256k1};

        let ephemeral_a = Secp256k1::public_key(&tv::secret(tv::EPHEMERAL_A));
        let shared = Secp256k1::diffie_hellman(&tv::secret(tv::EPHEMERAL_B), &ephemeral_a);
        let derive = |role| {
            Secrets::derive(
                &shared,
                &array32(tv::NONCE_A),
                &array32(tv::NONCE_B),
                &bytes(tv::AUTH_2),
                &bytes(tv::ACK_2),
                role,
            )
        };

        let responder = derive(Role::Responder);
        assert_eq!(responder.aes_key()[..], bytes(tv::AES_SECRET)[..]);
        assert_eq!(responder.mac_key()[..], bytes(tv::MAC_SECRET)[..]);
        assert_eq!(
            digest_after(responder.ingress_mac(), b"foo"),
            bytes(tv::INGRESS_B_AFTER_FOO)
        );

        // The initiator gets the same two seeds the other way round
        let initiator = derive(Role::Initiator);
        assert_eq!(
            digest_after(initiator.egress_mac(), b"foo"),
            bytes(tv::INGRESS_B_AFTER_FOO)
        );
        assert_eq!(
            digest_after(initiator.ingress_mac(), b"foo"),
            digest_after(responder.egress_mac(), b"foo")
        );
    }
}
