//! Password-based symmetric encryption of byte buffers.
//!
//! Every ciphertext produced here is self-describing: an 8-byte random salt is
//! prepended to the AES body, so decryption needs nothing beyond the password.
//! The salt makes encryption non-deterministic; encrypting the same plaintext
//! twice yields different bytes.

use std::num::NonZeroU32;

use aes::Aes256;
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::RngCore;
use ring::pbkdf2;
use thiserror::Error;
use zeroize::Zeroizing;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// Length of the salt prepended to every ciphertext.
pub const SALT_LEN: usize = 8;
/// AES-256 key length.
pub const KEY_LEN: usize = 32;
/// CBC initialization vector length (one AES block).
pub const IV_LEN: usize = 16;
/// AES block size; the ciphertext body is always a positive multiple of this.
pub const BLOCK_LEN: usize = 16;
/// Default PBKDF2-HMAC-SHA256 iteration count.
pub const DEFAULT_ITERATIONS: u32 = 600_000;

/// Errors from [`Cipher::decrypt`] (and, rarely, `encrypt`).
///
/// Decryption is all-or-nothing: on any failure no plaintext is returned.
#[derive(Error, Debug)]
pub enum CipherError {
    /// The input is shorter than the embedded salt.
    #[error("ciphertext too short: {actual} bytes, need at least {} for the salt", SALT_LEN)]
    TooShort { actual: usize },

    /// The body after the salt is empty or not block-aligned.
    #[error("ciphertext body of {len} bytes is not a positive multiple of {}", BLOCK_LEN)]
    Misaligned { len: usize },

    /// Block padding did not verify after decryption.
    ///
    /// Wrong password, corrupted data, and foreign data are indistinguishable
    /// here; all surface as this variant.
    #[error("decryption failed: wrong password or corrupted ciphertext")]
    BadPadding,
}

/// Symmetric encryption of byte buffers.
///
/// The password (or absence of one) is owned by the instance, so repository
/// logic stays cipher-agnostic: the production [`AesCipher`], the pass-through
/// [`IdentityCipher`], and deterministic test variants all satisfy the same
/// round-trip contract, `decrypt(encrypt(data)) == data`.
pub trait Cipher: Send + Sync {
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CipherError>;
    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CipherError>;
}

/// How an [`AesCipher`] obtains the per-encryption salt.
enum SaltSource {
    Random,
    /// Fixed salt for deterministic output. Test configurations only; this
    /// removes the non-determinism the format relies on.
    Fixed([u8; SALT_LEN]),
}

/// AES-256-CBC with PBKDF2-HMAC-SHA256 key derivation.
///
/// Layout of every ciphertext: `salt(8) || body`, where `body` is the PKCS#7
/// padded AES-256-CBC encryption of the plaintext. The 48 bytes derived from
/// `(password, salt)` split into a 32-byte key and a 16-byte IV.
pub struct AesCipher {
    password: Zeroizing<Vec<u8>>,
    iterations: NonZeroU32,
    salt_source: SaltSource,
}

impl AesCipher {
    /// Cipher with the default iteration count and random salts.
    pub fn new(password: &str) -> Self {
        Self::with_iterations(password, DEFAULT_ITERATIONS)
    }

    /// Cipher with a custom PBKDF2 iteration count.
    ///
    /// # Panics
    ///
    /// Panics if `iterations` is zero.
    pub fn with_iterations(password: &str, iterations: u32) -> Self {
        Self {
            password: Zeroizing::new(password.as_bytes().to_vec()),
            iterations: NonZeroU32::new(iterations).expect("iteration count must be non-zero"),
            salt_source: SaltSource::Random,
        }
    }

    /// Deterministic variant: every encryption uses `salt`.
    ///
    /// Satisfies the same contract as [`new`](Self::new) and exists so tests
    /// can assert on exact ciphertext bytes. Not for production repositories.
    pub fn with_fixed_salt(password: &str, iterations: u32, salt: [u8; SALT_LEN]) -> Self {
        Self {
            salt_source: SaltSource::Fixed(salt),
            ..Self::with_iterations(password, iterations)
        }
    }

    /// Derive the AES key and CBC IV for `salt`.
    fn derive(&self, salt: &[u8; SALT_LEN]) -> (Zeroizing<[u8; KEY_LEN]>, [u8; IV_LEN]) {
        let mut derived = Zeroizing::new([0u8; KEY_LEN + IV_LEN]);
        pbkdf2::derive(
            pbkdf2::PBKDF2_HMAC_SHA256,
            self.iterations,
            salt,
            &self.password,
            &mut derived[..],
        );

        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        key.copy_from_slice(&derived[..KEY_LEN]);
        let mut iv = [0u8; IV_LEN];
        iv.copy_from_slice(&derived[KEY_LEN..]);
        (key, iv)
    }
}

impl Cipher for AesCipher {
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CipherError> {
        let salt = match self.salt_source {
            SaltSource::Random => {
                let mut salt = [0u8; SALT_LEN];
                rand::rng().fill_bytes(&mut salt);
                salt
            }
            SaltSource::Fixed(salt) => salt,
        };

        let (key, iv) = self.derive(&salt);
        let key: &[u8; KEY_LEN] = &key;
        let body =
            Aes256CbcEnc::new(key.into(), &iv.into()).encrypt_padded_vec_mut::<Pkcs7>(plaintext);

        let mut out = Vec::with_capacity(SALT_LEN + body.len());
        out.extend_from_slice(&salt);
        out.extend_from_slice(&body);
        Ok(out)
    }

    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CipherError> {
        if ciphertext.len() < SALT_LEN {
            return Err(CipherError::TooShort {
                actual: ciphertext.len(),
            });
        }
        let (salt, body) = ciphertext.split_at(SALT_LEN);
        if body.is_empty() || body.len() % BLOCK_LEN != 0 {
            return Err(CipherError::Misaligned { len: body.len() });
        }

        let mut salt_arr = [0u8; SALT_LEN];
        salt_arr.copy_from_slice(salt);
        let (key, iv) = self.derive(&salt_arr);
        let key: &[u8; KEY_LEN] = &key;

        Aes256CbcDec::new(key.into(), &iv.into())
            .decrypt_padded_vec_mut::<Pkcs7>(body)
            .map_err(|_| CipherError::BadPadding)
    }
}

/// Pass-through cipher: both directions return the input unchanged.
///
/// Used wherever a repository channel is configured without encryption but the
/// surrounding code still wants to speak the [`Cipher`] contract.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityCipher;

impl Cipher for IdentityCipher {
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CipherError> {
        Ok(plaintext.to_vec())
    }

    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CipherError> {
        Ok(ciphertext.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    // Production-strength iteration counts make property tests crawl.
    const TEST_ITERATIONS: u32 = 1_000;

    fn test_cipher() -> AesCipher {
        AesCipher::with_iterations("correct horse battery staple", TEST_ITERATIONS)
    }

    #[test]
    fn round_trip_simple() {
        let cipher = test_cipher();
        let ct = cipher.encrypt(b"attack at dawn").unwrap();
        assert_eq!(cipher.decrypt(&ct).unwrap(), b"attack at dawn");
    }

    #[test]
    fn round_trip_empty_plaintext() {
        let cipher = test_cipher();
        let ct = cipher.encrypt(b"").unwrap();
        // Empty plaintext still gets a full padding block.
        assert_eq!(ct.len(), SALT_LEN + BLOCK_LEN);
        assert_eq!(cipher.decrypt(&ct).unwrap(), b"");
    }

    #[test]
    fn ciphertext_layout_is_salt_plus_blocks() {
        let cipher = test_cipher();
        let ct = cipher.encrypt(&[0xAB; 100]).unwrap();
        assert_eq!((ct.len() - SALT_LEN) % BLOCK_LEN, 0);
        // 100 bytes pad up to 112.
        assert_eq!(ct.len(), SALT_LEN + 112);
    }

    #[test]
    fn encryption_is_salted() {
        let cipher = test_cipher();
        let a = cipher.encrypt(b"same input").unwrap();
        let b = cipher.encrypt(b"same input").unwrap();
        assert_ne!(a, b);
        assert_ne!(a[..SALT_LEN], b[..SALT_LEN]);
    }

    #[test]
    fn fixed_salt_is_deterministic() {
        let cipher = AesCipher::with_fixed_salt("pw", TEST_ITERATIONS, [7; SALT_LEN]);
        let a = cipher.encrypt(b"same input").unwrap();
        let b = cipher.encrypt(b"same input").unwrap();
        assert_eq!(a, b);
        assert_eq!(&a[..SALT_LEN], &[7; SALT_LEN]);
        assert_eq!(cipher.decrypt(&a).unwrap(), b"same input");
    }

    #[test]
    fn wrong_password_fails() {
        let ct = test_cipher().encrypt(b"secret").unwrap();
        let other = AesCipher::with_iterations("not the password", TEST_ITERATIONS);
        assert!(matches!(other.decrypt(&ct), Err(CipherError::BadPadding)));
    }

    #[test]
    fn too_short_input_fails() {
        let cipher = test_cipher();
        assert!(matches!(
            cipher.decrypt(&[1, 2, 3]),
            Err(CipherError::TooShort { actual: 3 })
        ));
    }

    #[test]
    fn salt_only_input_fails() {
        let cipher = test_cipher();
        assert!(matches!(
            cipher.decrypt(&[0; SALT_LEN]),
            Err(CipherError::Misaligned { len: 0 })
        ));
    }

    #[test]
    fn misaligned_body_fails() {
        let cipher = test_cipher();
        let mut ct = cipher.encrypt(b"x").unwrap();
        ct.pop();
        assert!(matches!(
            cipher.decrypt(&ct),
            Err(CipherError::Misaligned { .. })
        ));
    }

    #[test]
    fn identity_cipher_passes_through() {
        let cipher = IdentityCipher;
        assert_eq!(cipher.encrypt(b"plain").unwrap(), b"plain");
        assert_eq!(cipher.decrypt(b"plain").unwrap(), b"plain");
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_round_trip(password in ".{1,24}", data in proptest::collection::vec(any::<u8>(), 0..512)) {
            let cipher = AesCipher::with_iterations(&password, TEST_ITERATIONS);
            let ct = cipher.encrypt(&data).unwrap();
            prop_assert_eq!(cipher.decrypt(&ct).unwrap(), data);
        }

        #[test]
        fn prop_tampered_last_block_never_yields_original(data in proptest::collection::vec(any::<u8>(), 1..128)) {
            let cipher = AesCipher::with_iterations("pw", TEST_ITERATIONS);
            let mut ct = cipher.encrypt(&data).unwrap();
            let last = ct.len() - 1;
            ct[last] ^= 0xFF;
            // Either padding rejects it outright or the plaintext differs.
            match cipher.decrypt(&ct) {
                Err(CipherError::BadPadding) => {}
                Err(e) => prop_assert!(false, "unexpected error: {e}"),
                Ok(pt) => prop_assert_ne!(pt, data),
            }
        }
    }
}
