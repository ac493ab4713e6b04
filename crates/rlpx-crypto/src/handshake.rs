//! RLPx v4 handshake.
//!
//! # Handshake Flow
//!
//! ```text
//! Initiator                                   Responder
//!     |                                           |
//!     |  auth: sig, static key, nonce, version    |  sealed to responder
//!     |------------------------------------------>|
//!     |                                           |
//!     |  ack: ephemeral key, nonce, version       |  sealed to initiator
//!     |<------------------------------------------|
//!     |                                           |
//!     [   Secrets derived from both packets       ]
//! ```
//!
//! The initiator signs `ECDH(static, remote static) ^ nonce` with its
//! ephemeral key. The responder recomputes that token from the advertised
//! static key and recovers the initiator's ephemeral key from the signature,
//! so a wrong static key ends in secrets that fail the first frame MAC.
//!
//! [`Initiator`] and [`Responder`] are sans-IO: they produce and consume
//! whole packets. [`read_packet`] pulls one packet off an async stream,
//! accepting both EIP-8 and pre-EIP-8 encodings.

use rand::{CryptoRng, Rng, RngCore};
use rlpx_core::{
    AuthMessage, AuthResponse, TrailingItems, ACK_LEGACY_LEN, AUTH_LEGACY_LEN, NONCE_LEN,
    PUBLIC_KEY_LEN, SIGNATURE_LEN,
};
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, trace};
use zeroize::Zeroizing;

use crate::config::SessionConfig;
use crate::curve::{Curve, EphemeralKeypair, NodeId, NodeKey, Secp256k1};
use crate::ecies;
use crate::error::SessionError;
use crate::secrets::{xor32, Secrets};

/// Which side of the handshake this party plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Initiator,
    Responder,
}

/// Which handshake message a packet is expected to carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketKind {
    Auth,
    Ack,
}

impl PacketKind {
    fn legacy_plain_len(self) -> usize {
        match self {
            PacketKind::Auth => AUTH_LEGACY_LEN,
            PacketKind::Ack => ACK_LEGACY_LEN,
        }
    }
}

/// A handshake packet read off the wire and opened.
pub struct HandshakePacket {
    raw: Vec<u8>,
    plaintext: Zeroizing<Vec<u8>>,
    legacy: bool,
}

impl HandshakePacket {
    /// Packet bytes exactly as received, EIP-8 size prefix included.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    pub fn is_legacy(&self) -> bool {
        self.legacy
    }
}

/// Result of a completed handshake.
pub struct HandshakeOutcome<C: Curve = Secp256k1> {
    pub secrets: Secrets,
    /// Verified static key of the peer.
    pub remote_public_key: C::PublicKey,
    /// Version the peer advertised.
    pub remote_version: u64,
    /// Fields the peer appended that this version does not interpret.
    pub remote_rest: TrailingItems,
}

/// Read one handshake packet of the given kind.
///
/// The fixed legacy size is read first and tried as a pre-EIP-8 envelope.
/// Otherwise the first two bytes are the EIP-8 size prefix, which must lie
/// between the legacy size and `max_packet`.
pub async fn read_packet<R, C>(
    reader: &mut R,
    local: &NodeKey<C>,
    kind: PacketKind,
    max_packet: usize,
) -> Result<HandshakePacket, SessionError>
where
    R: AsyncRead + Unpin,
    C: Curve,
{
    let legacy_len = kind.legacy_plain_len() + ecies::overhead::<C>();
    let mut raw = vec![0u8; legacy_len];
    reader.read_exact(&mut raw).await?;

    if let Ok(plaintext) = ecies::open::<C>(local.secret(), &raw, &[]) {
        trace!(?kind, "received legacy handshake packet");
        return Ok(HandshakePacket {
            raw,
            plaintext: Zeroizing::new(plaintext),
            legacy: true,
        });
    }

    let size = usize::from(u16::from_be_bytes([raw[0], raw[1]]));
    if size < legacy_len {
        return Err(SessionError::malformed(format!(
            "handshake size underflow: {} < {}",
            size, legacy_len
        )));
    }
    if size + 2 > max_packet {
        return Err(SessionError::malformed(format!(
            "handshake packet too large: {} bytes",
            size + 2
        )));
    }

    raw.resize(size + 2, 0);
    reader.read_exact(&mut raw[legacy_len..]).await?;

    let (prefix, envelope) = raw.split_at(2);
    let plaintext = Zeroizing::new(ecies::open::<C>(local.secret(), envelope, prefix)?);
    trace!(?kind, size = raw.len(), "received EIP-8 handshake packet");

    Ok(HandshakePacket {
        raw,
        plaintext,
        legacy: false,
    })
}

/// Handshake initiator (dialing side).
pub struct Initiator<'a, C: Curve = Secp256k1> {
    local: &'a NodeKey<C>,
    remote: C::PublicKey,
    nonce: [u8; NONCE_LEN],
    ephemeral: EphemeralKeypair<C>,
    auth_packet: Option<Vec<u8>>,
}

impl<'a, C: Curve> Initiator<'a, C> {
    /// Create an initiator towards a known remote static key.
    pub fn new<R: RngCore + CryptoRng + ?Sized>(
        rng: &mut R,
        local: &'a NodeKey<C>,
        remote: C::PublicKey,
    ) -> Self {
        let mut nonce = [0u8; NONCE_LEN];
        rng.fill_bytes(&mut nonce);
        Self::with_ephemeral(local, remote, EphemeralKeypair::generate(rng), nonce)
    }

    fn with_ephemeral(
        local: &'a NodeKey<C>,
        remote: C::PublicKey,
        ephemeral: EphemeralKeypair<C>,
        nonce: [u8; NONCE_LEN],
    ) -> Self {
        Self {
            local,
            remote,
            nonce,
            ephemeral,
            auth_packet: None,
        }
    }

    /// Build and seal the auth packet.
    pub fn write_auth<R: RngCore + CryptoRng + ?Sized>(
        &mut self,
        rng: &mut R,
        config: &SessionConfig,
    ) -> Result<Vec<u8>, SessionError> {
        if self.auth_packet.is_some() {
            return Err(SessionError::ProtocolMisuse("auth already written"));
        }

        let token = C::diffie_hellman(self.local.secret(), &self.remote);
        let signature = self.ephemeral.sign(&xor32(&token, &self.nonce));

        let msg = AuthMessage::new(
            fixed::<SIGNATURE_LEN>(&signature, "signature")?,
            fixed::<PUBLIC_KEY_LEN>(
                &C::encode_public_key(self.local.public_key()),
                "public key",
            )?,
            self.nonce,
        );

        let packet = seal_eip8::<C, R>(rng, &self.remote, &msg.to_rlp(), config)?;
        let remote_id = NodeId::from_public_key::<C>(&self.remote);
        debug!(remote = %remote_id, size = packet.len(), "auth written");

        self.auth_packet = Some(packet.clone());
        Ok(packet)
    }

    /// Consume the ack packet and derive session secrets.
    pub fn read_ack(self, packet: HandshakePacket) -> Result<HandshakeOutcome<C>, SessionError> {
        let auth_packet = self
            .auth_packet
            .ok_or(SessionError::ProtocolMisuse("ack read before auth was written"))?;

        let ack = if packet.legacy {
            AuthResponse::decode_legacy(&packet.plaintext)?
        } else {
            AuthResponse::decode(&packet.plaintext)?
        };
        let remote_ephemeral = C::decode_public_key(&ack.ephemeral_pubkey)?;
        debug!(version = ack.version, legacy = packet.legacy, "ack received");

        let shared = self.ephemeral.diffie_hellman(&remote_ephemeral);
        let secrets = Secrets::derive(
            &shared,
            &self.nonce,
            &ack.nonce,
            &auth_packet,
            packet.raw(),
            Role::Initiator,
        );

        Ok(HandshakeOutcome {
            secrets,
            remote_public_key: self.remote,
            remote_version: ack.version,
            remote_rest: ack.rest,
        })
    }
}

struct ReceivedAuth<C: Curve> {
    packet: Vec<u8>,
    legacy: bool,
    remote: C::PublicKey,
    remote_ephemeral: C::PublicKey,
    nonce: [u8; NONCE_LEN],
    version: u64,
    rest: TrailingItems,
}

/// Handshake responder (accepting side).
pub struct Responder<'a, C: Curve = Secp256k1> {
    local: &'a NodeKey<C>,
    expected_remote: Option<C::PublicKey>,
    nonce: [u8; NONCE_LEN],
    ephemeral: EphemeralKeypair<C>,
    received: Option<ReceivedAuth<C>>,
}

impl<'a, C: Curve> Responder<'a, C> {
    /// Create a responder. With `expected_remote` set, only that initiator
    /// is accepted.
    pub fn new<R: RngCore + CryptoRng + ?Sized>(
        rng: &mut R,
        local: &'a NodeKey<C>,
        expected_remote: Option<C::PublicKey>,
    ) -> Self {
        let mut nonce = [0u8; NONCE_LEN];
        rng.fill_bytes(&mut nonce);
        Self::with_ephemeral(local, expected_remote, EphemeralKeypair::generate(rng), nonce)
    }

    fn with_ephemeral(
        local: &'a NodeKey<C>,
        expected_remote: Option<C::PublicKey>,
        ephemeral: EphemeralKeypair<C>,
        nonce: [u8; NONCE_LEN],
    ) -> Self {
        Self {
            local,
            expected_remote,
            nonce,
            ephemeral,
            received: None,
        }
    }

    /// Validate the auth packet and recover the initiator's ephemeral key.
    pub fn read_auth(&mut self, packet: HandshakePacket) -> Result<(), SessionError> {
        if self.received.is_some() {
            return Err(SessionError::ProtocolMisuse("auth already read"));
        }

        let msg = if packet.legacy {
            AuthMessage::decode_legacy(&packet.plaintext)?
        } else {
            AuthMessage::decode(&packet.plaintext)?
        };
        let remote = C::decode_public_key(&msg.initiator_pubkey)?;
        let remote_id = NodeId::from_public_key::<C>(&remote);

        if let Some(expected) = &self.expected_remote {
            if *expected != remote {
                debug!(remote = %remote_id, "rejecting unexpected initiator");
                return Err(SessionError::auth("initiator identity does not match"));
            }
        }

        let token = C::diffie_hellman(self.local.secret(), &remote);
        let remote_ephemeral = C::recover(&msg.signature, &xor32(&token, &msg.nonce))?;
        debug!(
            remote = %remote_id,
            version = msg.version,
            legacy = packet.legacy,
            "auth received"
        );

        self.received = Some(ReceivedAuth {
            packet: packet.raw,
            legacy: packet.legacy,
            remote,
            remote_ephemeral,
            nonce: msg.nonce,
            version: msg.version,
            rest: msg.rest,
        });
        Ok(())
    }

    /// Static key of the initiator, once the auth packet has been read.
    pub fn remote_public_key(&self) -> Option<&C::PublicKey> {
        self.received.as_ref().map(|received| &received.remote)
    }

    /// Build and seal the ack packet and derive session secrets.
    ///
    /// A legacy auth is answered with a legacy ack.
    pub fn write_ack<R: RngCore + CryptoRng + ?Sized>(
        self,
        rng: &mut R,
        config: &SessionConfig,
    ) -> Result<(Vec<u8>, HandshakeOutcome<C>), SessionError> {
        let received = self
            .received
            .ok_or(SessionError::ProtocolMisuse("ack written before auth was read"))?;

        let ack = AuthResponse::new(
            fixed::<PUBLIC_KEY_LEN>(
                &C::encode_public_key(self.ephemeral.public_key()),
                "ephemeral key",
            )?,
            self.nonce,
        );
        let packet = if received.legacy {
            ecies::seal::<C, R>(rng, &received.remote, &ack.encode_legacy(), &[])?
        } else {
            seal_eip8::<C, R>(rng, &received.remote, &ack.to_rlp(), config)?
        };
        debug!(size = packet.len(), legacy = received.legacy, "ack written");

        let shared = self.ephemeral.diffie_hellman(&received.remote_ephemeral);
        let secrets = Secrets::derive(
            &shared,
            &received.nonce,
            &self.nonce,
            &received.packet,
            &packet,
            Role::Responder,
        );

        Ok((
            packet,
            HandshakeOutcome {
                secrets,
                remote_public_key: received.remote,
                remote_version: received.version,
                remote_rest: received.rest,
            },
        ))
    }
}

/// `size || ecies(size, body || zero padding)`.
fn seal_eip8<C: Curve, R: RngCore + CryptoRng + ?Sized>(
    rng: &mut R,
    recipient: &C::PublicKey,
    body: &[u8],
    config: &SessionConfig,
) -> Result<Vec<u8>, SessionError> {
    let padding = if config.max_handshake_padding > config.min_handshake_padding {
        rng.gen_range(config.min_handshake_padding..=config.max_handshake_padding)
    } else {
        config.min_handshake_padding
    };

    let mut plaintext = Zeroizing::new(Vec::with_capacity(body.len() + padding));
    plaintext.extend_from_slice(body);
    plaintext.resize(body.len() + padding, 0);

    let size = plaintext.len() + ecies::overhead::<C>();
    let prefix = u16::try_from(size)
        .map_err(|_| SessionError::malformed(format!("handshake message too large: {}", size)))?
        .to_be_bytes();

    let envelope = ecies::seal::<C, R>(rng, recipient, &plaintext, &prefix)?;
    let mut packet = Vec::with_capacity(prefix.len() + envelope.len());
    packet.extend_from_slice(&prefix);
    packet.extend_from_slice(&envelope);
    Ok(packet)
}

fn fixed<const N: usize>(bytes: &[u8], field: &str) -> Result<[u8; N], SessionError> {
    bytes.try_into().map_err(|_| {
        SessionError::malformed(format!(
            "{} encodes to {} bytes, wire format needs {}",
            field,
            bytes.len(),
            N
        ))
    })
}
