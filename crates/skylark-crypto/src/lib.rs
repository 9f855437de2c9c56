//! # Skylark Frame Crypto
//!
//! AES-128-CTR encryption for real-time audio datagrams.
//!
//! Each session installs a 128-bit key and a 16-byte nonce base taken from
//! the handshake reply. Every audio frame travels as a 16-byte header
//! followed by the ciphertext; the header doubles as the CTR initialization
//! vector, so the receiver can decrypt from the datagram alone.

pub mod errors;
pub mod frame_cipher;

pub use errors::*;
pub use frame_cipher::*;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::errors::*;
    pub use crate::frame_cipher::*;
}
