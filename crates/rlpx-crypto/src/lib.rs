//! RLPx sessions.
//!
//! This crate provides:
//! - secp256k1 node keys and Node IDs behind a [`Curve`] capability trait
//! - ECIES envelopes for the two handshake messages
//! - The RLPx v4 handshake, EIP-8 and pre-EIP-8
//! - The running-MAC frame codec
//! - [`SessionConnection`], an async connection over any tokio byte stream
//!
//! # Design
//!
//! Both handshake messages are sealed to the recipient's static key. The
//! initiator proves its identity by signing with its ephemeral key over a
//! token only the two static key holders can compute; secrets come from the
//! ephemeral-ephemeral ECDH plus both nonces.
//!
//! After the handshake each direction runs AES-256-CTR and a running
//! Keccak-256 MAC, so a dropped, replayed or reordered frame fails the next
//! MAC check. Any such failure closes the connection.
//!
//! # Example
//!
//! ```no_run
//! use rlpx_crypto::{NodeKey, SessionConnection};
//! use tokio::net::TcpStream;
//!
//! # async fn run(remote: rlpx_crypto::secp256k1::PublicKey) -> Result<(), Box<dyn std::error::Error>> {
//! let key = NodeKey::generate();
//! let stream = TcpStream::connect("127.0.0.1:30303").await?;
//! let mut conn = SessionConnection::dial(stream, &key, remote).await?;
//!
//! conn.write(0x10, b"hello").await?;
//! let msg = conn.read().await?;
//! println!("code {} with {} bytes", msg.code, msg.payload.len());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

pub mod config;
pub mod connection;
pub mod curve;
pub mod ecies;
pub mod error;
pub mod frame;
pub mod handshake;
pub mod mac;
pub mod secrets;

#[cfg(test)]
mod test_vectors;

pub use config::SessionConfig;
pub use connection::{ConnectionState, SessionConnection, SessionReader, SessionWriter};
pub use curve::{Curve, CurveError, EphemeralKeypair, NodeId, NodeKey, Secp256k1};
pub use error::SessionError;
pub use frame::{FrameReader, FrameWriter, Message};
pub use handshake::{HandshakeOutcome, Initiator, Responder, Role};
pub use mac::RunningMac;
pub use secrets::Secrets;

pub use secp256k1;
