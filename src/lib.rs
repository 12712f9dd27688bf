/// lib.rs — stegbox library surface
///
/// Hides one or two encrypted payloads inside an ordinary media file.
/// The pipeline on embed is
///
///   plaintext → zstd → AEAD (Argon2id key) → carrier LSB slots
///
/// and the reverse on extract. Supported carriers: PNG/BMP (adaptive
/// or sequential pixel LSB), JPEG (DCT-coefficient LSB) and WAV
/// (frame-byte LSB). A sidecar key file binds the stego file to its
/// cipher parameters; deniable embeds produce two indistinguishable
/// sidecars over disjoint slot partitions.
///
/// Everything is synchronous and owns its buffers for the duration of
/// a call; no operation keeps thread-affine state.
pub mod bits;
pub mod carrier;
pub mod crypto;
pub mod error;
pub mod jpegcodec;
pub mod keyfile;
pub mod score;
pub mod shuffle;

pub use carrier::{
    detect, embed, embed_deniable, extract, extract_deniable, get_capacity, Capacity, CarrierKind,
    StegMode,
};
pub use crypto::{decrypt, derive_key, encrypt, CipherSuite, Encrypted};
pub use error::{Result, StegError};
pub use keyfile::{read_key_file, write_key_file, KeyFileRecord};
pub use score::{score_cover_image, CoverScore};
