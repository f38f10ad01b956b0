//! Envelope encryption for artifacts at rest
//!
//! Every payload gets a fresh AES-256-GCM data key, which is itself sealed
//! under the master key. Layout:
//!
//! ```text
//! offset 0:  8 bytes  magic "PLAGENC1"
//! offset 8:  12 bytes nonce wrapping the data key
//! offset 20: 12 bytes nonce encrypting the payload
//! offset 32: 48 bytes wrapped data key (key + tag)
//! offset 80: N bytes  ciphertext (payload + tag)
//! ```
//!
//! Input without the magic tag is treated as a legacy plaintext artifact and
//! returned unchanged by [`decrypt`].

use crate::error::CryptoError;
use crate::keys::MasterKey;
use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Key, Nonce,
};

pub const MAGIC: &[u8; 8] = b"PLAGENC1";
/// AES-GCM nonce length (96 bit)
pub const NONCE_LEN: usize = 12;
pub const DATA_KEY_LEN: usize = 32;
pub const TAG_LEN: usize = 16;
pub const WRAPPED_KEY_LEN: usize = DATA_KEY_LEN + TAG_LEN;
pub const HEADER_LEN: usize = MAGIC.len() + 2 * NONCE_LEN + WRAPPED_KEY_LEN;

const WRAP_NONCE_AT: usize = MAGIC.len();
const DATA_NONCE_AT: usize = WRAP_NONCE_AT + NONCE_LEN;
const WRAPPED_KEY_AT: usize = DATA_NONCE_AT + NONCE_LEN;

/// Whether `data` starts with the envelope magic tag
pub fn is_encrypted(data: &[u8]) -> bool {
    data.starts_with(MAGIC)
}

/// Seal `plaintext` under a fresh data key wrapped by `master`
pub fn encrypt(master: &MasterKey, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let data_key = Aes256Gcm::generate_key(&mut OsRng);
    let wrap_nonce = Aes256Gcm::generate_nonce(&mut OsRng);
    let data_nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    let wrapper = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(master.expose()));
    let wrapped_key = wrapper
        .encrypt(&wrap_nonce, data_key.as_slice())
        .map_err(|_| CryptoError::Encryption("failed to wrap data key".to_string()))?;

    let ciphertext = Aes256Gcm::new(&data_key)
        .encrypt(&data_nonce, plaintext)
        .map_err(|_| CryptoError::Encryption("failed to encrypt payload".to_string()))?;

    let mut out = Vec::with_capacity(HEADER_LEN + ciphertext.len());
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&wrap_nonce);
    out.extend_from_slice(&data_nonce);
    out.extend_from_slice(&wrapped_key);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Open an envelope; data without the magic tag passes through unchanged
pub fn decrypt(master: &MasterKey, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if !is_encrypted(data) {
        return Ok(data.to_vec());
    }
    if data.len() < HEADER_LEN + TAG_LEN {
        return Err(CryptoError::Integrity(format!(
            "envelope truncated: {} bytes",
            data.len()
        )));
    }

    let wrap_nonce = Nonce::from_slice(&data[WRAP_NONCE_AT..DATA_NONCE_AT]);
    let data_nonce = Nonce::from_slice(&data[DATA_NONCE_AT..WRAPPED_KEY_AT]);
    let wrapped_key = &data[WRAPPED_KEY_AT..HEADER_LEN];
    let ciphertext = &data[HEADER_LEN..];

    let wrapper = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(master.expose()));
    let data_key = wrapper
        .decrypt(wrap_nonce, wrapped_key)
        .map_err(|_| CryptoError::Integrity("data key failed authentication".to_string()))?;
    if data_key.len() != DATA_KEY_LEN {
        return Err(CryptoError::Integrity("unwrapped data key has wrong length".to_string()));
    }

    Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&data_key))
        .decrypt(data_nonce, ciphertext)
        .map_err(|_| CryptoError::Integrity("payload failed authentication".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_header_layout() {
        assert_eq!(HEADER_LEN, 80);

        let master = MasterKey::generate();
        let sealed = encrypt(&master, b"%PDF-1.5 payload").unwrap();
        assert!(sealed.starts_with(b"PLAGENC1"));
        assert_eq!(sealed.len(), HEADER_LEN + b"%PDF-1.5 payload".len() + TAG_LEN);
    }

    #[test]
    fn test_round_trip() {
        let master = MasterKey::generate();
        let sealed = encrypt(&master, b"hello envelope").unwrap();
        assert_eq!(decrypt(&master, &sealed).unwrap(), b"hello envelope".to_vec());
    }

    #[test]
    fn test_empty_payload() {
        let master = MasterKey::generate();
        let sealed = encrypt(&master, b"").unwrap();
        assert_eq!(sealed.len(), HEADER_LEN + TAG_LEN);
        assert!(decrypt(&master, &sealed).unwrap().is_empty());
    }

    #[test]
    fn test_fresh_keys_and_nonces_per_call() {
        let master = MasterKey::generate();
        let a = encrypt(&master, b"same").unwrap();
        let b = encrypt(&master, b"same").unwrap();
        assert_ne!(a[WRAP_NONCE_AT..HEADER_LEN], b[WRAP_NONCE_AT..HEADER_LEN]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_plaintext_passes_through() {
        let master = MasterKey::generate();
        let legacy = b"%PDF-1.4 legacy plaintext".to_vec();
        assert_eq!(decrypt(&master, &legacy).unwrap(), legacy);
    }

    #[test]
    fn test_truncated_envelope_is_integrity_error() {
        let master = MasterKey::generate();
        let mut short = MAGIC.to_vec();
        short.extend_from_slice(&[0u8; 40]);
        assert!(matches!(decrypt(&master, &short), Err(CryptoError::Integrity(_))));
    }

    #[test]
    fn test_tampered_ciphertext_is_integrity_error() {
        let master = MasterKey::generate();
        let mut sealed = encrypt(&master, b"sensitive").unwrap();
        let last = sealed.len() - 1;
        sealed[last] ^= 0x01;
        assert!(matches!(decrypt(&master, &sealed), Err(CryptoError::Integrity(_))));
    }

    #[test]
    fn test_tampered_wrapped_key_is_integrity_error() {
        let master = MasterKey::generate();
        let mut sealed = encrypt(&master, b"sensitive").unwrap();
        sealed[WRAPPED_KEY_AT] ^= 0x80;
        assert!(matches!(decrypt(&master, &sealed), Err(CryptoError::Integrity(_))));
    }

    #[test]
    fn test_wrong_master_key_is_integrity_error() {
        let sealed = encrypt(&MasterKey::generate(), b"sensitive").unwrap();
        let other = MasterKey::generate();
        assert!(matches!(decrypt(&other, &sealed), Err(CryptoError::Integrity(_))));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: any payload survives a seal/open cycle
        #[test]
        fn decrypt_inverts_encrypt(payload in prop::collection::vec(any::<u8>(), 0..4096)) {
            let master = MasterKey::generate();
            let sealed = encrypt(&master, &payload).unwrap();
            prop_assert!(is_encrypted(&sealed));
            prop_assert_eq!(decrypt(&master, &sealed).unwrap(), payload);
        }

        /// Property: data without the magic tag is returned unchanged
        #[test]
        fn non_magic_passthrough(payload in prop::collection::vec(any::<u8>(), 0..1024)) {
            prop_assume!(!payload.starts_with(MAGIC));
            let master = MasterKey::generate();
            prop_assert_eq!(decrypt(&master, &payload).unwrap(), payload);
        }

        /// Property: flipping any ciphertext bit is detected
        #[test]
        fn bit_flips_detected(
            payload in prop::collection::vec(any::<u8>(), 1..256),
            position in any::<prop::sample::Index>(),
            bit in 0u8..8,
        ) {
            let master = MasterKey::generate();
            let mut sealed = encrypt(&master, &payload).unwrap();
            // Anywhere after the magic tag, which would otherwise trigger passthrough
            let offset = MAGIC.len() + position.index(sealed.len() - MAGIC.len());
            sealed[offset] ^= 1 << bit;
            prop_assert!(decrypt(&master, &sealed).is_err());
        }
    }
}
