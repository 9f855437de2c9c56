//! AES-128-CTR Frame Cipher
//!
//! Encrypts and decrypts individual audio frames with the key material
//! installed at handshake time.
//!
//! ## IV construction
//!
//! The per-frame IV is the 16-byte datagram header, derived from the
//! session nonce base:
//!
//! ```text
//! byte   0..2   copied from the nonce base (frame type marker)
//! byte   2..4   payload length, big-endian u16
//! byte   4..12  copied from the nonce base
//! byte  12..16  frame sequence number, big-endian u32
//! ```
//!
//! Both sides compose the IV the same way, so the header is sent in the
//! clear ahead of the ciphertext and nothing else needs to be negotiated
//! per frame. Sequence numbers start at 1 for the first frame of a session
//! and never repeat under one key, which keeps the CTR keystream unique.

use aes::Aes128;
use ctr::cipher::{KeyIvInit, StreamCipher};
use ctr::Ctr128BE;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::errors::{CryptoError, CryptoResult};

/// Session key size in bytes (128 bits)
pub const KEY_SIZE: usize = 16;

/// Nonce base size in bytes
pub const NONCE_SIZE: usize = 16;

/// Frame header size in bytes (also the IV size)
pub const HEADER_SIZE: usize = 16;

type Aes128Ctr = Ctr128BE<Aes128>;

/// Per-session frame cipher.
///
/// Holds the 128-bit key and nonce base installed by a successful
/// handshake. Key material is zeroized when the cipher is dropped, which
/// happens together with the datagram channel teardown.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct FrameCipher {
    key: [u8; KEY_SIZE],
    nonce_base: [u8; NONCE_SIZE],
}

impl FrameCipher {
    /// Create a cipher from fixed-size key material
    pub fn new(key: [u8; KEY_SIZE], nonce_base: [u8; NONCE_SIZE]) -> Self {
        Self { key, nonce_base }
    }

    /// Create a cipher from decoded wire material, validating lengths
    pub fn from_slices(key: &[u8], nonce_base: &[u8]) -> CryptoResult<Self> {
        if key.len() != KEY_SIZE {
            return Err(CryptoError::InvalidKeyLength { got: key.len() });
        }
        if nonce_base.len() != NONCE_SIZE {
            return Err(CryptoError::InvalidNonceLength {
                got: nonce_base.len(),
            });
        }
        let mut k = [0u8; KEY_SIZE];
        k.copy_from_slice(key);
        let mut n = [0u8; NONCE_SIZE];
        n.copy_from_slice(nonce_base);
        Ok(Self::new(k, n))
    }

    /// Compose the frame header (and IV) for a payload of the given length
    pub fn header(&self, payload_len: usize, sequence: u32) -> CryptoResult<[u8; HEADER_SIZE]> {
        if payload_len > u16::MAX as usize {
            return Err(CryptoError::FrameTooLarge {
                got: payload_len,
                max: u16::MAX as usize,
            });
        }
        let mut header = self.nonce_base;
        header[2..4].copy_from_slice(&(payload_len as u16).to_be_bytes());
        header[12..16].copy_from_slice(&sequence.to_be_bytes());
        Ok(header)
    }

    /// Encrypt one audio frame into a ready-to-send datagram
    /// (header followed by ciphertext).
    pub fn encrypt_frame(&self, plaintext: &[u8], sequence: u32) -> CryptoResult<Vec<u8>> {
        let header = self.header(plaintext.len(), sequence)?;

        let mut datagram = Vec::with_capacity(HEADER_SIZE + plaintext.len());
        datagram.extend_from_slice(&header);
        datagram.extend_from_slice(plaintext);
        self.apply_keystream(&header, &mut datagram[HEADER_SIZE..]);
        Ok(datagram)
    }

    /// Decrypt a received datagram, returning its sequence number and
    /// plaintext payload.
    pub fn decrypt_frame(&self, datagram: &[u8]) -> CryptoResult<(u32, Vec<u8>)> {
        if datagram.len() < HEADER_SIZE {
            return Err(CryptoError::FrameTooShort {
                got: datagram.len(),
                min: HEADER_SIZE,
            });
        }

        let mut header = [0u8; HEADER_SIZE];
        header.copy_from_slice(&datagram[..HEADER_SIZE]);

        let declared = u16::from_be_bytes([header[2], header[3]]) as usize;
        let actual = datagram.len() - HEADER_SIZE;
        if declared != actual {
            return Err(CryptoError::FrameLengthMismatch { declared, actual });
        }

        let sequence = u32::from_be_bytes([header[12], header[13], header[14], header[15]]);

        let mut payload = datagram[HEADER_SIZE..].to_vec();
        self.apply_keystream(&header, &mut payload);
        Ok((sequence, payload))
    }

    fn apply_keystream(&self, iv: &[u8; HEADER_SIZE], data: &mut [u8]) {
        let mut cipher = Aes128Ctr::new(&self.key.into(), iv.into());
        cipher.apply_keystream(data);
    }
}

impl std::fmt::Debug for FrameCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Key material stays out of logs
        f.debug_struct("FrameCipher").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_cipher() -> FrameCipher {
        let key = hex::decode("000102030405060708090a0b0c0d0e0f").unwrap();
        let nonce = hex::decode("01000000a1a2a3a4a5a6a7a800000000").unwrap();
        FrameCipher::from_slices(&key, &nonce).unwrap()
    }

    #[test]
    fn test_header_composition() {
        let cipher = test_cipher();
        let header = cipher.header(0x0102, 0xAABBCCDD).unwrap();

        // Nonce base preserved outside the length and sequence slots
        assert_eq!(header[0], 0x01);
        assert_eq!(&header[4..12], &[0xa1, 0xa2, 0xa3, 0xa4, 0xa5, 0xa6, 0xa7, 0xa8]);
        // Length big-endian at 2..4
        assert_eq!(&header[2..4], &[0x01, 0x02]);
        // Sequence big-endian at 12..16
        assert_eq!(&header[12..16], &[0xAA, 0xBB, 0xCC, 0xDD]);
    }

    #[test]
    fn test_encrypt_decrypt_round_trip() {
        let cipher = test_cipher();
        let frame = b"opus frame bytes";

        let datagram = cipher.encrypt_frame(frame, 7).unwrap();
        assert_eq!(datagram.len(), HEADER_SIZE + frame.len());
        assert_ne!(&datagram[HEADER_SIZE..], frame.as_slice());

        let (sequence, payload) = cipher.decrypt_frame(&datagram).unwrap();
        assert_eq!(sequence, 7);
        assert_eq!(payload, frame);
    }

    #[test]
    fn test_distinct_sequences_produce_distinct_ciphertext() {
        let cipher = test_cipher();
        let frame = [0u8; 32];

        let a = cipher.encrypt_frame(&frame, 1).unwrap();
        let b = cipher.encrypt_frame(&frame, 2).unwrap();
        assert_ne!(a[HEADER_SIZE..], b[HEADER_SIZE..]);
    }

    #[test]
    fn test_reject_short_datagram() {
        let cipher = test_cipher();
        let result = cipher.decrypt_frame(&[0u8; 8]);
        assert!(matches!(result, Err(CryptoError::FrameTooShort { .. })));
    }

    #[test]
    fn test_reject_length_mismatch() {
        let cipher = test_cipher();
        let mut datagram = cipher.encrypt_frame(b"abcd", 1).unwrap();
        datagram.pop();
        let result = cipher.decrypt_frame(&datagram);
        assert!(matches!(
            result,
            Err(CryptoError::FrameLengthMismatch { .. })
        ));
    }

    #[test]
    fn test_reject_bad_key_material() {
        assert!(matches!(
            FrameCipher::from_slices(&[0u8; 8], &[0u8; 16]),
            Err(CryptoError::InvalidKeyLength { got: 8 })
        ));
        assert!(matches!(
            FrameCipher::from_slices(&[0u8; 16], &[0u8; 12]),
            Err(CryptoError::InvalidNonceLength { got: 12 })
        ));
    }
}
