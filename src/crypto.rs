/// crypto.rs — Key derivation and authenticated encryption
///
/// Payload pipeline: Zstandard-compress, then seal with an AEAD cipher
/// under a key derived from the passphrase with Argon2id. The salt and
/// nonce are fresh random bytes per encryption and travel in the key
/// file; the derived key itself never touches disk.
///
/// Three AEAD suites are supported. All use empty associated data.
///
///   Suite               Key   Nonce
///   ─────────────────   ───   ─────
///   Ascon-128           16    16
///   ChaCha20-Poly1305   32    12
///   AES-256-GCM         32    12
///
/// The Argon2id parameters (time=2, memory=64 MiB, parallelism=2,
/// 16-byte salt) are part of the key-file format. Extraction re-runs
/// the same derivation, so changing them orphans existing stego files.
use crate::error::{Result, StegError};
use argon2::{Algorithm, Argon2, Params, Version};
use chacha20poly1305::aead::{Aead, KeyInit};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Argon2 salt length in bytes.
pub const SALT_LEN: usize = 16;

const ARGON2_T_COST: u32 = 2;
const ARGON2_M_COST: u32 = 65536; // KiB → 64 MiB
const ARGON2_P_COST: u32 = 2;

/// The supported AEAD cipher suites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CipherSuite {
    #[serde(rename = "Ascon-128")]
    Ascon128,
    #[serde(rename = "ChaCha20-Poly1305")]
    ChaCha20Poly1305,
    #[serde(rename = "AES-256-GCM")]
    Aes256Gcm,
}

impl CipherSuite {
    pub const ALL: [CipherSuite; 3] = [
        CipherSuite::Ascon128,
        CipherSuite::ChaCha20Poly1305,
        CipherSuite::Aes256Gcm,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CipherSuite::Ascon128 => "Ascon-128",
            CipherSuite::ChaCha20Poly1305 => "ChaCha20-Poly1305",
            CipherSuite::Aes256Gcm => "AES-256-GCM",
        }
    }

    pub fn key_len(self) -> usize {
        match self {
            CipherSuite::Ascon128 => 16,
            CipherSuite::ChaCha20Poly1305 | CipherSuite::Aes256Gcm => 32,
        }
    }

    pub fn nonce_len(self) -> usize {
        match self {
            CipherSuite::Ascon128 => 16,
            CipherSuite::ChaCha20Poly1305 | CipherSuite::Aes256Gcm => 12,
        }
    }
}

impl fmt::Display for CipherSuite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CipherSuite {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, String> {
        CipherSuite::ALL
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown cipher '{s}'. Supported: Ascon-128, ChaCha20-Poly1305, AES-256-GCM"))
    }
}

/// Everything produced by one encryption.
///
/// The derived `key` is handed back so the carrier engine can seed the
/// adaptive slot permutation from it, binding slot selection to the
/// passphrase. It must not be persisted.
#[derive(Debug)]
pub struct Encrypted {
    pub ciphertext: Vec<u8>,
    pub nonce: Vec<u8>,
    pub salt: [u8; SALT_LEN],
    pub cipher: CipherSuite,
    pub key: Vec<u8>,
}

/// Derive an encryption key from a passphrase and salt with Argon2id.
///
/// Deterministic: the same (passphrase, salt, cipher) always yields
/// the same key, across calls and across machines.
pub fn derive_key(passphrase: &str, salt: &[u8], cipher: CipherSuite) -> Result<Vec<u8>> {
    let params = Params::new(
        ARGON2_M_COST,
        ARGON2_T_COST,
        ARGON2_P_COST,
        Some(cipher.key_len()),
    )
    .map_err(|e| StegError::KeyDerivation(e.to_string()))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut key = vec![0u8; cipher.key_len()];
    argon2
        .hash_password_into(passphrase.as_bytes(), salt, &mut key)
        .map_err(|e| StegError::KeyDerivation(e.to_string()))?;

    Ok(key)
}

/// Compress and encrypt plaintext under a passphrase-derived key.
///
/// Generates a fresh random salt and nonce, derives the key, applies
/// Zstandard at the default level, then seals with the chosen AEAD.
pub fn encrypt(plaintext: &[u8], passphrase: &str, cipher: CipherSuite) -> Result<Encrypted> {
    if passphrase.is_empty() {
        return Err(StegError::EmptyPassphrase);
    }

    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    let mut nonce = vec![0u8; cipher.nonce_len()];
    rand::thread_rng().fill_bytes(&mut nonce);

    let key = derive_key(passphrase, &salt, cipher)?;

    let compressed =
        zstd::encode_all(plaintext, 0).map_err(|_| StegError::EncryptionFailed)?;

    let ciphertext = seal(cipher, &key, &nonce, &compressed)?;

    Ok(Encrypted {
        ciphertext,
        nonce,
        salt,
        cipher,
        key,
    })
}

/// Decrypt and decompress a ciphertext produced by [`encrypt`].
///
/// A wrong passphrase and corrupted data are indistinguishable by
/// construction: the AEAD tag check and the Zstandard frame check both
/// surface as [`StegError::BadCredentials`], so callers cannot be used
/// as a padding- or format-oracle.
pub fn decrypt(
    ciphertext: &[u8],
    passphrase: &str,
    cipher: CipherSuite,
    nonce: &[u8],
    salt: &[u8],
) -> Result<Vec<u8>> {
    let key = derive_key(passphrase, salt, cipher)?;
    let compressed = open(cipher, &key, nonce, ciphertext)?;
    zstd::decode_all(compressed.as_slice()).map_err(|_| StegError::BadCredentials)
}

// ── AEAD dispatch ─────────────────────────────────────────────────────

fn seal(cipher: CipherSuite, key: &[u8], nonce: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
    match cipher {
        CipherSuite::Ascon128 => {
            use ascon_aead::{Ascon128, Key, Nonce};
            Ascon128::new(Key::<Ascon128>::from_slice(key))
                .encrypt(Nonce::<Ascon128>::from_slice(nonce), plaintext)
                .map_err(|_| StegError::EncryptionFailed)
        }
        CipherSuite::ChaCha20Poly1305 => {
            use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
            ChaCha20Poly1305::new(Key::from_slice(key))
                .encrypt(Nonce::from_slice(nonce), plaintext)
                .map_err(|_| StegError::EncryptionFailed)
        }
        CipherSuite::Aes256Gcm => {
            use aes_gcm::{Aes256Gcm, Key, Nonce};
            Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key))
                .encrypt(Nonce::from_slice(nonce), plaintext)
                .map_err(|_| StegError::EncryptionFailed)
        }
    }
}

fn open(cipher: CipherSuite, key: &[u8], nonce: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
    match cipher {
        CipherSuite::Ascon128 => {
            use ascon_aead::{Ascon128, Key, Nonce};
            Ascon128::new(Key::<Ascon128>::from_slice(key))
                .decrypt(Nonce::<Ascon128>::from_slice(nonce), ciphertext)
                .map_err(|_| StegError::BadCredentials)
        }
        CipherSuite::ChaCha20Poly1305 => {
            use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
            ChaCha20Poly1305::new(Key::from_slice(key))
                .decrypt(Nonce::from_slice(nonce), ciphertext)
                .map_err(|_| StegError::BadCredentials)
        }
        CipherSuite::Aes256Gcm => {
            use aes_gcm::{Aes256Gcm, Key, Nonce};
            Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key))
                .decrypt(Nonce::from_slice(nonce), ciphertext)
                .map_err(|_| StegError::BadCredentials)
        }
    }
}
