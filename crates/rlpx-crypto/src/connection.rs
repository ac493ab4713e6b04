//! Session connections over async byte streams.
//!
//! A [`SessionConnection`] owns one duplex stream, runs the handshake once,
//! then reads and writes whole messages through the frame codec.
//!
//! # Lifecycle
//!
//! ```text
//! Idle ──handshake──> Handshaking ──secrets installed──> Established
//!   │                      │                                  │
//!   └──────────────────────┴────────── any failure ──────────>┴──> Closed
//! ```
//!
//! `read`/`write` outside `Established` fail with `ProtocolMisuse` and leave
//! the state alone. Every other failure is terminal: the connection moves to
//! `Closed` and later calls fail with `Closed`.
//!
//! `read` and `write` take `&mut self`. To read and write from different
//! tasks, use [`SessionConnection::into_split`].

use bytes::Bytes;
use rand::rngs::OsRng;
use rlpx_core::decode_content;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tracing::{debug, trace};

use crate::config::SessionConfig;
use crate::curve::{Curve, NodeId, NodeKey, Secp256k1};
use crate::error::SessionError;
use crate::frame::{self, FrameReader, FrameWriter, Message, HEADER_BLOCK_LEN};
use crate::handshake::{read_packet, HandshakeOutcome, Initiator, PacketKind, Responder};

/// Observable connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    Handshaking,
    Established,
    Closed,
}

enum State<C: Curve> {
    Idle,
    Handshaking,
    Established(Box<Established<C>>),
    Closed,
}

struct Established<C: Curve> {
    egress: Egress,
    ingress: Ingress,
    remote: C::PublicKey,
    remote_version: u64,
}

/// Authenticated session over a duplex byte stream.
pub struct SessionConnection<S, C: Curve = Secp256k1> {
    stream: S,
    config: SessionConfig,
    state: State<C>,
}

impl<S, C> SessionConnection<S, C>
where
    S: AsyncRead + AsyncWrite + Unpin,
    C: Curve,
{
    pub fn new(stream: S) -> Self {
        Self::with_config(stream, SessionConfig::default())
    }

    pub fn with_config(stream: S, config: SessionConfig) -> Self {
        Self {
            stream,
            config,
            state: State::Idle,
        }
    }

    /// Connect as initiator to a peer whose static key is known.
    pub async fn dial(
        stream: S,
        local: &NodeKey<C>,
        remote: C::PublicKey,
    ) -> Result<Self, SessionError> {
        let mut conn = Self::new(stream);
        conn.handshake_initiator(local, remote).await?;
        Ok(conn)
    }

    /// Accept an inbound connection as responder.
    ///
    /// With `expected_remote` set, any other initiator is rejected with
    /// `AuthenticationFailed`.
    pub async fn accept(
        stream: S,
        local: &NodeKey<C>,
        expected_remote: Option<C::PublicKey>,
    ) -> Result<Self, SessionError> {
        let mut conn = Self::new(stream);
        conn.handshake_responder(local, expected_remote).await?;
        Ok(conn)
    }

    /// Run the initiator side of the handshake. Returns the verified remote
    /// static key.
    pub async fn handshake_initiator(
        &mut self,
        local: &NodeKey<C>,
        remote: C::PublicKey,
    ) -> Result<C::PublicKey, SessionError> {
        self.begin_handshake()?;
        let result = initiate(&mut self.stream, local, remote, &self.config).await;
        self.install(result)
    }

    /// Run the responder side of the handshake. Returns the verified remote
    /// static key.
    pub async fn handshake_responder(
        &mut self,
        local: &NodeKey<C>,
        expected_remote: Option<C::PublicKey>,
    ) -> Result<C::PublicKey, SessionError> {
        self.begin_handshake()?;
        let result = respond(&mut self.stream, local, expected_remote, &self.config).await;
        self.install(result)
    }

    pub fn state(&self) -> ConnectionState {
        match self.state {
            State::Idle => ConnectionState::Idle,
            State::Handshaking => ConnectionState::Handshaking,
            State::Established(_) => ConnectionState::Established,
            State::Closed => ConnectionState::Closed,
        }
    }

    pub fn remote_public_key(&self) -> Option<&C::PublicKey> {
        match &self.state {
            State::Established(session) => Some(&session.remote),
            _ => None,
        }
    }

    /// Handshake version the peer advertised.
    pub fn remote_version(&self) -> Option<u64> {
        match &self.state {
            State::Established(session) => Some(session.remote_version),
            _ => None,
        }
    }

    pub fn compression(&self) -> bool {
        self.config.compression
    }

    /// Toggle snappy compression. Applies from the next read and write.
    pub fn set_compression(&mut self, enabled: bool) {
        self.config.compression = enabled;
        if let State::Established(session) = &mut self.state {
            session.egress.compression = enabled;
            session.ingress.compression = enabled;
        }
    }

    /// Write one message. Returns the payload size put on the wire.
    pub async fn write(&mut self, code: u64, payload: &[u8]) -> Result<usize, SessionError> {
        let session = match &mut self.state {
            State::Established(session) => session,
            State::Closed => return Err(SessionError::Closed),
            State::Idle | State::Handshaking => {
                return Err(SessionError::ProtocolMisuse("write before handshake completed"))
            }
        };

        let result = session.egress.write_to(&mut self.stream, code, payload).await;
        self.settle(result)
    }

    /// Read the next message.
    pub async fn read(&mut self) -> Result<Message, SessionError> {
        let session = match &mut self.state {
            State::Established(session) => session,
            State::Closed => return Err(SessionError::Closed),
            State::Idle | State::Handshaking => {
                return Err(SessionError::ProtocolMisuse("read before handshake completed"))
            }
        };

        let result = session.ingress.read_from(&mut self.stream).await;
        self.settle(result)
    }

    /// Drop the session secrets and shut the stream down. Closing twice is a
    /// no-op.
    pub async fn close(&mut self) -> Result<(), SessionError> {
        if matches!(
            std::mem::replace(&mut self.state, State::Closed),
            State::Closed
        ) {
            return Ok(());
        }

        debug!("closing session");
        self.stream.shutdown().await?;
        Ok(())
    }

    /// Split an established connection into independently owned halves.
    pub fn into_split(
        self,
    ) -> Result<(SessionReader<ReadHalf<S>>, SessionWriter<WriteHalf<S>>), SessionError> {
        match self.state {
            State::Established(session) => {
                let Established {
                    egress, ingress, ..
                } = *session;
                let (read_half, write_half) = tokio::io::split(self.stream);
                Ok((
                    SessionReader {
                        io: read_half,
                        ingress,
                    },
                    SessionWriter {
                        io: write_half,
                        egress,
                    },
                ))
            }
            State::Closed => Err(SessionError::Closed),
            State::Idle | State::Handshaking => {
                Err(SessionError::ProtocolMisuse("split before handshake completed"))
            }
        }
    }

    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    fn begin_handshake(&mut self) -> Result<(), SessionError> {
        match self.state {
            State::Idle => {
                self.state = State::Handshaking;
                Ok(())
            }
            // An earlier attempt was abandoned part way through
            State::Handshaking => {
                self.state = State::Closed;
                Err(SessionError::Closed)
            }
            State::Established(_) => {
                Err(SessionError::ProtocolMisuse("handshake already completed"))
            }
            State::Closed => Err(SessionError::Closed),
        }
    }

    fn install(
        &mut self,
        result: Result<HandshakeOutcome<C>, SessionError>,
    ) -> Result<C::PublicKey, SessionError> {
        let outcome = self.settle(result)?;

        let (writer, reader) = frame::split(outcome.secrets);
        let remote = outcome.remote_public_key;
        debug!(
            remote = %NodeId::from_public_key::<C>(&remote),
            version = outcome.remote_version,
            "session established"
        );

        self.state = State::Established(Box::new(Established {
            egress: Egress::new(writer, &self.config),
            ingress: Ingress::new(reader, &self.config),
            remote: remote.clone(),
            remote_version: outcome.remote_version,
        }));
        Ok(remote)
    }

    fn settle<T>(&mut self, result: Result<T, SessionError>) -> Result<T, SessionError> {
        if let Err(e) = &result {
            if !matches!(self.state, State::Closed) {
                debug!(error = %e, "session failed, closing");
            }
            self.state = State::Closed;
        }
        result
    }
}

async fn initiate<S, C>(
    stream: &mut S,
    local: &NodeKey<C>,
    remote: C::PublicKey,
    config: &SessionConfig,
) -> Result<HandshakeOutcome<C>, SessionError>
where
    S: AsyncRead + AsyncWrite + Unpin,
    C: Curve,
{
    let mut initiator = Initiator::new(&mut OsRng, local, remote);
    let auth = initiator.write_auth(&mut OsRng, config)?;
    stream.write_all(&auth).await?;
    stream.flush().await?;

    let ack = read_packet(stream, local, PacketKind::Ack, config.max_handshake_packet).await?;
    initiator.read_ack(ack)
}

async fn respond<S, C>(
    stream: &mut S,
    local: &NodeKey<C>,
    expected_remote: Option<C::PublicKey>,
    config: &SessionConfig,
) -> Result<HandshakeOutcome<C>, SessionError>
where
    S: AsyncRead + AsyncWrite + Unpin,
    C: Curve,
{
    let mut responder = Responder::new(&mut OsRng, local, expected_remote);
    let auth = read_packet(stream, local, PacketKind::Auth, config.max_handshake_packet).await?;
    responder.read_auth(auth)?;

    let (ack, outcome) = responder.write_ack(&mut OsRng, config)?;
    stream.write_all(&ack).await?;
    stream.flush().await?;
    Ok(outcome)
}

/// Egress direction state.
///
/// `ready` is cleared while a frame is in flight and stays cleared if the
/// frame never completes, since the keystream and MAC are then out of step
/// with the peer.
struct Egress {
    frames: FrameWriter,
    compression: bool,
    max_message_size: usize,
    ready: bool,
}

impl Egress {
    fn new(frames: FrameWriter, config: &SessionConfig) -> Self {
        Self {
            frames,
            compression: config.compression,
            max_message_size: config.max_message_size,
            ready: true,
        }
    }

    async fn write_to<W: AsyncWrite + Unpin>(
        &mut self,
        io: &mut W,
        code: u64,
        payload: &[u8],
    ) -> Result<usize, SessionError> {
        if !self.ready {
            return Err(SessionError::Closed);
        }
        if payload.len() > self.max_message_size {
            self.ready = false;
            return Err(SessionError::malformed(format!(
                "message too large: {} bytes",
                payload.len()
            )));
        }

        self.ready = false;
        let compressed;
        let data = if self.compression {
            compressed = snap::raw::Encoder::new()
                .compress_vec(payload)
                .map_err(|e| SessionError::malformed(format!("snappy: {}", e)))?;
            &compressed[..]
        } else {
            payload
        };

        let frame = self.frames.encode(code, data)?;
        io.write_all(&frame).await?;
        io.flush().await?;
        self.ready = true;

        trace!(code, size = data.len(), "message written");
        Ok(data.len())
    }
}

/// Ingress direction state. `ready` works as in [`Egress`].
struct Ingress {
    frames: FrameReader,
    compression: bool,
    max_message_size: usize,
    ready: bool,
}

impl Ingress {
    fn new(frames: FrameReader, config: &SessionConfig) -> Self {
        Self {
            frames,
            compression: config.compression,
            max_message_size: config.max_message_size,
            ready: true,
        }
    }

    async fn read_from<R: AsyncRead + Unpin>(
        &mut self,
        io: &mut R,
    ) -> Result<Message, SessionError> {
        if !self.ready {
            return Err(SessionError::Closed);
        }
        self.ready = false;

        let mut block = [0u8; HEADER_BLOCK_LEN];
        io.read_exact(&mut block).await?;
        let header = self.frames.decode_header(&block)?;

        let mut body = vec![0u8; FrameReader::body_len(&header)];
        io.read_exact(&mut body).await?;
        let content = self.frames.decode_body(&header, &mut body)?;
        let (code, payload) = decode_content(content)?;

        let wire_size = payload.len();
        let payload = if self.compression {
            decompress(payload, self.max_message_size)?
        } else if payload.len() > self.max_message_size {
            return Err(SessionError::malformed(format!(
                "message too large: {} bytes",
                payload.len()
            )));
        } else {
            Bytes::copy_from_slice(payload)
        };
        self.ready = true;

        trace!(code, size = wire_size, "message read");
        Ok(Message {
            code,
            payload,
            wire_size,
        })
    }
}

fn decompress(data: &[u8], limit: usize) -> Result<Bytes, SessionError> {
    let len = snap::raw::decompress_len(data)
        .map_err(|e| SessionError::malformed(format!("snappy: {}", e)))?;
    if len > limit {
        return Err(SessionError::malformed(format!(
            "decompressed message too large: {} bytes",
            len
        )));
    }

    let out = snap::raw::Decoder::new()
        .decompress_vec(data)
        .map_err(|e| SessionError::malformed(format!("snappy: {}", e)))?;
    Ok(Bytes::from(out))
}

/// Read half of a split connection.
pub struct SessionReader<R> {
    io: R,
    ingress: Ingress,
}

impl<R: AsyncRead + Unpin> SessionReader<R> {
    /// Read the next message. After any failure every later call fails with
    /// `Closed`.
    pub async fn read(&mut self) -> Result<Message, SessionError> {
        self.ingress.read_from(&mut self.io).await
    }

    pub fn set_compression(&mut self, enabled: bool) {
        self.ingress.compression = enabled;
    }
}

/// Write half of a split connection.
pub struct SessionWriter<W> {
    io: W,
    egress: Egress,
}

impl<W: AsyncWrite + Unpin> SessionWriter<W> {
    /// Write one message. After any failure every later call fails with
    /// `Closed`.
    pub async fn write(&mut self, code: u64, payload: &[u8]) -> Result<usize, SessionError> {
        self.egress.write_to(&mut self.io, code, payload).await
    }

    pub fn set_compression(&mut self, enabled: bool) {
        self.egress.compression = enabled;
    }

    /// Shut down the write direction.
    pub async fn close(&mut self) -> Result<(), SessionError> {
        if !self.egress.ready {
            return Ok(());
        }
        self.egress.ready = false;
        self.io.shutdown().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::duplex;

    #[test]
    fn test_decompress_limit() {
        let data = vec![7u8; 4096];
        let compressed = snap::raw::Encoder::new().compress_vec(&data).unwrap();

        assert_eq!(&decompress(&compressed, 4096).unwrap()[..], &data[..]);
        assert!(matches!(
            decompress(&compressed, 4095),
            Err(SessionError::Malformed(_))
        ));
        assert!(matches!(
            decompress(&[0xff, 0xff, 0xff], 4096),
            Err(SessionError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn test_misuse_keeps_state() {
        let (stream, _peer) = duplex(1024);
        let mut conn: SessionConnection<_> = SessionConnection::new(stream);

        assert_eq!(conn.state(), ConnectionState::Idle);
        assert!(matches!(
            conn.read().await,
            Err(SessionError::ProtocolMisuse(_))
        ));
        assert!(matches!(
            conn.write(0, b"x").await,
            Err(SessionError::ProtocolMisuse(_))
        ));
        assert!(conn.remote_public_key().is_none());
        assert_eq!(conn.state(), ConnectionState::Idle);
    }

    #[tokio::test]
    async fn test_abandoned_handshake_closes() {
        let (stream, _peer) = duplex(1024);
        let mut conn: SessionConnection<_> = SessionConnection::new(stream);
        let local = NodeKey::generate();

        // The peer never answers, so the handshake is dropped while pending
        let pending = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            conn.handshake_responder(&local, None),
        )
        .await;
        assert!(pending.is_err());
        assert_eq!(conn.state(), ConnectionState::Handshaking);

        assert!(matches!(
            conn.handshake_responder(&local, None).await,
            Err(SessionError::Closed)
        ));
        assert_eq!(conn.state(), ConnectionState::Closed);
    }

    #[tokio::test]
    async fn test_failed_handshake_closes() {
        let (stream, mut peer) = duplex(4096);
        let mut conn: SessionConnection<_> = SessionConnection::new(stream);
        let local = NodeKey::generate();

        peer.write_all(&[0u8; 400]).await.unwrap();
        let err = conn.handshake_responder(&local, None).await.unwrap_err();
        assert!(matches!(err, SessionError::Malformed(_)));
        assert_eq!(conn.state(), ConnectionState::Closed);

        assert!(matches!(conn.read().await, Err(SessionError::Closed)));
        assert!(matches!(conn.write(0, b"x").await, Err(SessionError::Closed)));
        assert!(matches!(conn.into_split(), Err(SessionError::Closed)));
    }
}
