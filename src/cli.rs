/// cli.rs — stegbox command-line interface
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// stegbox — hide encrypted payloads in ordinary media files
#[derive(Parser, Debug)]
#[command(
    name = "stegbox",
    author,
    version,
    about = "Passphrase-encrypted steganography for PNG/BMP, JPEG, and WAV carriers",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Encrypt a file and hide it inside a cover
    ///
    /// Examples:
    ///   stegbox embed cover.png --payload notes.txt --output stego.png
    ///   stegbox embed photo.jpg -p secret.pdf -o out.jpg -c AES-256-GCM
    ///   stegbox embed cover.png -p real.txt -o stego.png --decoy alibi.txt
    Embed {
        /// Cover media path (.png, .bmp, .jpg, .jpeg, .wav)
        cover: PathBuf,

        /// File whose bytes will be hidden
        #[arg(short, long, value_name = "PATH")]
        payload: PathBuf,

        /// Stego output path (must stay in the cover's format family)
        #[arg(short, long, value_name = "PATH")]
        output: PathBuf,

        /// Cipher suite: Ascon-128, ChaCha20-Poly1305, or AES-256-GCM
        #[arg(short, long, default_value = "Ascon-128")]
        cipher: String,

        /// Raster embedding mode: adaptive or sequential
        #[arg(short, long, default_value = "adaptive")]
        mode: String,

        /// Key-file output path (default: <output>.key)
        #[arg(long, value_name = "PATH")]
        key_file: Option<PathBuf>,

        /// Decoy payload file — switches to deniable dual embedding
        #[arg(long, value_name = "PATH")]
        decoy: Option<PathBuf>,

        /// Decoy key-file output path (default: <output>.key2)
        #[arg(long, value_name = "PATH")]
        decoy_key_file: Option<PathBuf>,
    },

    /// Recover and decrypt a payload from a stego file
    ///
    /// Examples:
    ///   stegbox extract stego.png --key-file stego.png.key
    ///   stegbox extract stego.png -k stego.png.key2 -o alibi.txt
    Extract {
        /// Stego media path
        stego: PathBuf,

        /// Key file written at embed time
        #[arg(short, long, value_name = "PATH")]
        key_file: PathBuf,

        /// Output path (default: recovered<info_type> beside the stego file)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },

    /// Report how many payload bytes a cover can hold
    Capacity {
        /// Cover media path
        path: PathBuf,

        /// Raster mode to measure: adaptive or sequential
        #[arg(short, long, default_value = "adaptive")]
        mode: String,
    },

    /// Score an image cover's suitability for hiding data
    Score {
        /// Image path (.png, .bmp, .jpg, .jpeg)
        path: PathBuf,
    },

    /// List the supported cipher suites
    Ciphers,
}
