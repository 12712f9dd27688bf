use thiserror::Error;

#[derive(Debug, Error)]
pub enum StegError {
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Insufficient carrier capacity: available ~{available} bytes, required ~{required} bytes")]
    InsufficientCapacity { available: usize, required: usize },

    #[error("No valid payload detected. Check you are using the correct stego file and key file")]
    NoPayloadDetected,

    #[error("Decryption failed: wrong passphrase or corrupted data")]
    BadCredentials,

    #[error("Key file is malformed: {0}")]
    MalformedKeyFile(String),

    #[error("Adaptive mode requires a key")]
    MissingKey,

    #[error("Passphrase cannot be empty")]
    EmptyPassphrase,

    #[error("Passphrase mismatch: confirmation did not match")]
    PasswordMismatch,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("Encryption failed")]
    EncryptionFailed,

    // ── carrier I/O errors ────────────────────────────────────────────
    #[error("Invalid JPEG: {0}")]
    InvalidJpeg(String),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Audio error: {0}")]
    Audio(#[from] hound::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StegError>;
