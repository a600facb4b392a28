//! Card number encryption with AES-256-GCM.
//!
//! Payloads are `nonce:ciphertext:tag`, each part standard base64. A fresh
//! 96-bit nonce is drawn for every encryption, so encrypting the same number
//! twice never yields the same payload. The key is decoded once from the
//! `CARD_ENCRYPTION_KEY` secret and zeroized when the cipher is dropped.

use crate::errors::{Error, Result};
use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit, OsRng},
};
use base64::{Engine, engine::general_purpose::STANDARD};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Environment variable holding the key secret.
pub const KEY_ENV: &str = "CARD_ENCRYPTION_KEY";

/// Number of trailing digits kept in plaintext.
pub const LAST_DIGITS_LEN: usize = 4;

const KEY_LENGTH: usize = 32;
const NONCE_SIZE: usize = 12;
const TAG_SIZE: usize = 16;
const SEPARATOR: char = ':';

/// Encrypts and decrypts card numbers with a fixed 256-bit key.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct CardCipher {
    key: [u8; KEY_LENGTH],
}

impl std::fmt::Debug for CardCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CardCipher").finish_non_exhaustive()
    }
}

impl CardCipher {
    /// Builds the cipher from the secret in [`KEY_ENV`].
    ///
    /// # Errors
    /// Returns [`Error::Config`] when the variable is missing or the key is malformed.
    pub fn from_env() -> Result<Self> {
        Self::from_secret(std::env::var(KEY_ENV).ok().as_deref())
    }

    /// Builds the cipher from a raw secret.
    ///
    /// `base64:` and `hex:` prefixes select the encoding; anything else is
    /// taken as raw UTF-8 bytes. The decoded key must be exactly 32 bytes.
    ///
    /// # Errors
    /// Returns [`Error::Config`] when the secret is absent, undecodable or the wrong length.
    pub fn from_secret(raw: Option<&str>) -> Result<Self> {
        let raw = raw.filter(|s| !s.is_empty()).ok_or_else(|| Error::Config {
            message: format!("{KEY_ENV} is not set"),
        })?;

        let mut decoded = if let Some(encoded) = raw.strip_prefix("base64:") {
            STANDARD.decode(encoded).map_err(|e| Error::Config {
                message: format!("{KEY_ENV} is not valid base64: {e}"),
            })?
        } else if let Some(encoded) = raw.strip_prefix("hex:") {
            hex::decode(encoded).map_err(|e| Error::Config {
                message: format!("{KEY_ENV} is not valid hex: {e}"),
            })?
        } else {
            raw.as_bytes().to_vec()
        };

        let key: Result<[u8; KEY_LENGTH]> =
            decoded.as_slice().try_into().map_err(|_| Error::Config {
                message: format!("{KEY_ENV} must be {KEY_LENGTH} bytes after decoding"),
            });
        decoded.zeroize();

        Ok(Self { key: key? })
    }

    fn aead(&self) -> Result<Aes256Gcm> {
        Aes256Gcm::new_from_slice(&self.key).map_err(|e| Error::Config {
            message: format!("Failed to create cipher: {e}"),
        })
    }

    /// Encrypts `plaintext` into a `nonce:ciphertext:tag` payload.
    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        let cipher = self.aead()?;

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        // aes-gcm appends the tag to the ciphertext
        let sealed = cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|_| Error::Authentication)?;
        let (ciphertext, tag) = sealed.split_at(sealed.len() - TAG_SIZE);

        Ok([
            STANDARD.encode(nonce_bytes),
            STANDARD.encode(ciphertext),
            STANDARD.encode(tag),
        ]
        .join(&SEPARATOR.to_string()))
    }

    /// Decrypts a payload produced by [`CardCipher::encrypt`].
    ///
    /// # Errors
    /// [`Error::Decoding`] for a malformed payload, [`Error::Authentication`]
    /// when the tag does not verify.
    pub fn decrypt(&self, payload: &str) -> Result<String> {
        let parts: Vec<&str> = payload.split(SEPARATOR).collect();
        let [nonce_b64, ciphertext_b64, tag_b64] = parts.as_slice() else {
            return Err(Error::Decoding {
                message: format!("expected 3 parts, got {}", parts.len()),
            });
        };

        let nonce_bytes = decode_part("nonce", nonce_b64)?;
        if nonce_bytes.len() != NONCE_SIZE {
            return Err(Error::Decoding {
                message: format!(
                    "invalid nonce size: expected {NONCE_SIZE}, got {}",
                    nonce_bytes.len()
                ),
            });
        }
        let mut sealed = decode_part("ciphertext", ciphertext_b64)?;
        let tag = decode_part("tag", tag_b64)?;
        if tag.len() != TAG_SIZE {
            return Err(Error::Authentication);
        }
        sealed.extend_from_slice(&tag);

        let plaintext = self
            .aead()?
            .decrypt(Nonce::from_slice(&nonce_bytes), sealed.as_ref())
            .map_err(|_| Error::Authentication)?;

        String::from_utf8(plaintext).map_err(|e| Error::Decoding {
            message: format!("invalid UTF-8 in decrypted data: {e}"),
        })
    }
}

fn decode_part(name: &str, part: &str) -> Result<Vec<u8>> {
    STANDARD.decode(part).map_err(|e| Error::Decoding {
        message: format!("invalid {name} encoding: {e}"),
    })
}

/// Strips every non-digit character.
#[must_use]
pub fn sanitize(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

/// Returns the final `n` characters of `digits` (all of them when shorter).
#[must_use]
pub fn last_digits(digits: &str, n: usize) -> String {
    let len = digits.chars().count();
    digits.chars().skip(len.saturating_sub(n)).collect()
}
