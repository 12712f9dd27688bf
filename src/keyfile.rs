/// keyfile.rs — Sidecar key-file serialisation
///
/// The key file is the external metadata binding a stego file to its
/// ciphertext: without it the carrier is unreadable even with the
/// right passphrase. It stays a separate artifact so the stego file
/// remains a perfectly ordinary media file, and so deniable embeds can
/// produce two sidecars that are structurally identical — same field
/// set, same sizes — with nothing marking one as the "real" one.
///
/// FORMAT (UTF-8 JSON document)
/// ─────────────────────────────────────────────────────────────────
///  cipher          string   "Ascon-128" | "ChaCha20-Poly1305"
///                           | "AES-256-GCM"
///  steg_mode       string   "adaptive" | "sequential" | "dct"
///  deniable        bool
///  nonce           base64   cipher-specific length
///  salt            base64   16 bytes
///  info_type       string   original plaintext file extension
///  partition_seed  base64   16 bytes          (iff deniable)
///  partition_half  0 | 1                      (iff deniable)
///  prng            string   "chacha8" — permutation PRNG version
/// ─────────────────────────────────────────────────────────────────
use crate::carrier::StegMode;
use crate::crypto::{CipherSuite, SALT_LEN};
use crate::error::{Result, StegError};
use crate::shuffle::{PARTITION_SEED_LEN, PRNG_NAME};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyFileRecord {
    pub cipher: CipherSuite,
    pub steg_mode: StegMode,
    #[serde(default)]
    pub deniable: bool,
    #[serde(with = "b64")]
    pub nonce: Vec<u8>,
    #[serde(with = "b64")]
    pub salt: Vec<u8>,
    pub info_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "b64_opt")]
    pub partition_seed: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partition_half: Option<u8>,
    #[serde(default = "default_prng")]
    pub prng: String,
}

fn default_prng() -> String {
    PRNG_NAME.to_string()
}

impl KeyFileRecord {
    /// Check internal consistency. Run on both read and write so a
    /// record that serialises is also one that parses back.
    pub fn validate(&self) -> Result<()> {
        if self.salt.len() != SALT_LEN {
            return Err(StegError::MalformedKeyFile(format!(
                "salt must be {SALT_LEN} bytes, got {}",
                self.salt.len()
            )));
        }
        if self.nonce.len() != self.cipher.nonce_len() {
            return Err(StegError::MalformedKeyFile(format!(
                "nonce must be {} bytes for {}, got {}",
                self.cipher.nonce_len(),
                self.cipher,
                self.nonce.len()
            )));
        }
        if self.prng != PRNG_NAME {
            return Err(StegError::MalformedKeyFile(format!(
                "unsupported permutation prng '{}' (this build speaks '{PRNG_NAME}')",
                self.prng
            )));
        }
        if self.deniable {
            match &self.partition_seed {
                Some(seed) if seed.len() == PARTITION_SEED_LEN => {}
                Some(seed) => {
                    return Err(StegError::MalformedKeyFile(format!(
                        "partition_seed must be {PARTITION_SEED_LEN} bytes, got {}",
                        seed.len()
                    )))
                }
                None => {
                    return Err(StegError::MalformedKeyFile(
                        "deniable key file is missing partition_seed".into(),
                    ))
                }
            }
            match self.partition_half {
                Some(0) | Some(1) => {}
                Some(n) => {
                    return Err(StegError::MalformedKeyFile(format!(
                        "partition_half must be 0 or 1, got {n}"
                    )))
                }
                None => {
                    return Err(StegError::MalformedKeyFile(
                        "deniable key file is missing partition_half".into(),
                    ))
                }
            }
        }
        Ok(())
    }
}

/// Write a key-file record as pretty-printed JSON.
pub fn write_key_file(path: &Path, record: &KeyFileRecord) -> Result<()> {
    record.validate()?;
    let json = serde_json::to_string_pretty(record)
        .map_err(|e| StegError::MalformedKeyFile(e.to_string()))?;
    fs::write(path, json + "\n")?;
    Ok(())
}

/// Read and validate a key-file record.
///
/// Missing required fields, unknown cipher or mode names, undecodable
/// base64, and wrong byte lengths all surface as `MalformedKeyFile`.
pub fn read_key_file(path: &Path) -> Result<KeyFileRecord> {
    let text = fs::read_to_string(path)?;
    let record: KeyFileRecord =
        serde_json::from_str(&text).map_err(|e| StegError::MalformedKeyFile(e.to_string()))?;
    record.validate()?;
    Ok(record)
}

// ── base64 field codecs ───────────────────────────────────────────────

mod b64 {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(d)?;
        STANDARD.decode(text).map_err(serde::de::Error::custom)
    }
}

mod b64_opt {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &Option<Vec<u8>>, s: S) -> Result<S::Ok, S::Error> {
        match bytes {
            Some(b) => s.serialize_str(&STANDARD.encode(b)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<u8>>, D::Error> {
        let text = Option::<String>::deserialize(d)?;
        match text {
            Some(t) => STANDARD
                .decode(t)
                .map(Some)
                .map_err(serde::de::Error::custom),
            None => Ok(None),
        }
    }
}
