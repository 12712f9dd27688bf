/// main.rs — stegbox entry point
mod cli;

use clap::Parser;
use cli::{Cli, Command};
use rand::RngCore;
use std::fs;
use std::path::{Path, PathBuf};
use stegbox::shuffle::{PARTITION_SEED_LEN, PRNG_NAME};
use stegbox::{
    carrier, crypto, keyfile, score, CarrierKind, CipherSuite, KeyFileRecord, Result, StegError,
    StegMode,
};

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Embed {
            cover,
            payload,
            output,
            cipher,
            mode,
            key_file,
            decoy,
            decoy_key_file,
        } => {
            let cipher: CipherSuite = cipher.parse().map_err(StegError::InvalidArgument)?;
            let mode: StegMode = mode.parse().map_err(StegError::InvalidArgument)?;
            let kind = carrier::detect(&cover)?;
            let plaintext = fs::read(&payload)?;

            // The raster mode flag is meaningless for the other carriers
            let steg_mode = match kind {
                CarrierKind::LosslessRaster => mode,
                CarrierKind::Jpeg => StegMode::Dct,
                CarrierKind::PcmAudio => StegMode::Sequential,
            };

            match decoy {
                Some(decoy_path) => embed_deniable(
                    &cover,
                    &plaintext,
                    &decoy_path,
                    &output,
                    cipher,
                    kind,
                    steg_mode,
                    info_type_of(&payload),
                    key_file,
                    decoy_key_file,
                ),
                None => embed_single(
                    &cover,
                    &plaintext,
                    &output,
                    cipher,
                    steg_mode,
                    info_type_of(&payload),
                    key_file,
                ),
            }
        }

        Command::Extract {
            stego,
            key_file,
            output,
        } => {
            let record = keyfile::read_key_file(&key_file)?;
            let passphrase =
                rpassword::prompt_password("Enter passphrase: ").map_err(StegError::Io)?;

            eprintln!("Deriving key… (Argon2id may take a moment)");
            let key = crypto::derive_key(&passphrase, &record.salt, record.cipher)?;

            let ciphertext = if record.deniable {
                let (seed, half) = partition_fields(&record)?;
                carrier::extract_deniable(&stego, &key, &seed, half)?
            } else {
                carrier::extract(&stego, Some(&key), record.steg_mode)?
            };

            let plaintext = crypto::decrypt(
                &ciphertext,
                &passphrase,
                record.cipher,
                &record.nonce,
                &record.salt,
            )?;

            let out = output.unwrap_or_else(|| {
                stego.with_file_name(format!("recovered{}", record.info_type))
            });
            fs::write(&out, &plaintext)?;
            eprintln!("Recovered {} bytes to {}", plaintext.len(), out.display());
            Ok(())
        }

        Command::Capacity { path, mode } => {
            let mode: StegMode = mode.parse().map_err(StegError::InvalidArgument)?;
            let cap = carrier::get_capacity(&path, mode)?;
            println!(
                "{}: ~{} bytes available in {} mode",
                path.display(),
                cap.available_bytes,
                cap.mode
            );
            Ok(())
        }

        Command::Score { path } => {
            let report = score::score_cover_image(&path)?;
            println!("Cover:               {}", path.display());
            println!("Dimensions:          {}x{}", report.width, report.height);
            println!("Entropy:             {:.2} / 8.00", report.entropy);
            println!("Texture density:     {:.3}", report.texture_density);
            println!("Adaptive capacity:   {} bytes", report.adaptive_capacity);
            println!("Sequential capacity: {} bytes", report.sequential_capacity);
            println!("Score:               {} / 100 ({})", report.score, report.label);
            Ok(())
        }

        Command::Ciphers => {
            println!("Supported cipher suites:");
            for cipher in CipherSuite::ALL {
                println!(
                    "  {:<18} key {} bytes, nonce {} bytes",
                    cipher.name(),
                    cipher.key_len(),
                    cipher.nonce_len()
                );
            }
            Ok(())
        }
    }
}

// ── embed flows ───────────────────────────────────────────────────────

fn embed_single(
    cover: &Path,
    plaintext: &[u8],
    output: &Path,
    cipher: CipherSuite,
    steg_mode: StegMode,
    info_type: String,
    key_file: Option<PathBuf>,
) -> Result<()> {
    let passphrase = prompt_new_passphrase("Enter passphrase: ")?;

    eprintln!("Encrypting… (Argon2id key derivation may take a moment)");
    let enc = crypto::encrypt(plaintext, &passphrase, cipher)?;

    carrier::embed(cover, &enc.ciphertext, output, Some(&enc.key), steg_mode)?;

    let record = KeyFileRecord {
        cipher,
        steg_mode,
        deniable: false,
        nonce: enc.nonce,
        salt: enc.salt.to_vec(),
        info_type,
        partition_seed: None,
        partition_half: None,
        prng: PRNG_NAME.into(),
    };
    let key_path = key_file.unwrap_or_else(|| suffixed(output, ".key"));
    keyfile::write_key_file(&key_path, &record)?;

    eprintln!("Stego file written to {}", output.display());
    eprintln!(
        "Key file written to {} — without it the payload is unrecoverable",
        key_path.display()
    );
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn embed_deniable(
    cover: &Path,
    plaintext: &[u8],
    decoy_path: &Path,
    output: &Path,
    cipher: CipherSuite,
    kind: CarrierKind,
    steg_mode: StegMode,
    info_type: String,
    key_file: Option<PathBuf>,
    decoy_key_file: Option<PathBuf>,
) -> Result<()> {
    if kind != CarrierKind::LosslessRaster {
        return Err(StegError::InvalidArgument(
            "deniable embedding requires a PNG or BMP cover".into(),
        ));
    }
    if steg_mode != StegMode::Adaptive {
        return Err(StegError::InvalidArgument(
            "deniable embedding uses adaptive mode".into(),
        ));
    }
    let decoy_plaintext = fs::read(decoy_path)?;

    let passphrase = prompt_new_passphrase("Enter passphrase: ")?;
    let decoy_passphrase = prompt_new_passphrase("Enter decoy passphrase: ")?;

    eprintln!("Encrypting both payloads… (Argon2id runs twice)");
    let enc_real = crypto::encrypt(plaintext, &passphrase, cipher)?;
    let enc_decoy = crypto::encrypt(&decoy_plaintext, &decoy_passphrase, cipher)?;

    let mut partition_seed = [0u8; PARTITION_SEED_LEN];
    rand::thread_rng().fill_bytes(&mut partition_seed);

    carrier::embed_deniable(
        cover,
        &enc_real.ciphertext,
        &enc_decoy.ciphertext,
        output,
        &enc_real.key,
        &enc_decoy.key,
        &partition_seed,
    )?;

    let make_record = |enc: &crypto::Encrypted, info_type: String, half: u8| KeyFileRecord {
        cipher,
        steg_mode: StegMode::Adaptive,
        deniable: true,
        nonce: enc.nonce.clone(),
        salt: enc.salt.to_vec(),
        info_type,
        partition_seed: Some(partition_seed.to_vec()),
        partition_half: Some(half),
        prng: PRNG_NAME.into(),
    };

    let real_path = key_file.unwrap_or_else(|| suffixed(output, ".key"));
    let decoy_key_path = decoy_key_file.unwrap_or_else(|| suffixed(output, ".key2"));
    keyfile::write_key_file(&real_path, &make_record(&enc_real, info_type, 0))?;
    keyfile::write_key_file(
        &decoy_key_path,
        &make_record(&enc_decoy, info_type_of(decoy_path), 1),
    )?;

    eprintln!("Stego file written to {}", output.display());
    eprintln!(
        "Key files written to {} and {} — the two files are structurally identical; store them separately and rename them freely",
        real_path.display(),
        decoy_key_path.display()
    );
    Ok(())
}

// ── helpers ───────────────────────────────────────────────────────────

fn prompt_new_passphrase(label: &str) -> Result<String> {
    let passphrase = rpassword::prompt_password(label).map_err(StegError::Io)?;
    let confirm = rpassword::prompt_password("Confirm passphrase: ").map_err(StegError::Io)?;
    if passphrase != confirm {
        return Err(StegError::PasswordMismatch);
    }
    if passphrase.is_empty() {
        return Err(StegError::EmptyPassphrase);
    }
    Ok(passphrase)
}

/// The payload file's extension with its dot, e.g. ".txt".
fn info_type_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{e}"))
        .unwrap_or_default()
}

/// Append a suffix to a full file name: stego.png + ".key" → stego.png.key
fn suffixed(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

fn partition_fields(record: &KeyFileRecord) -> Result<([u8; PARTITION_SEED_LEN], u8)> {
    let (seed_vec, half) = match (&record.partition_seed, record.partition_half) {
        (Some(seed), Some(half)) => (seed, half),
        _ => {
            return Err(StegError::MalformedKeyFile(
                "deniable key file is missing partition fields".into(),
            ))
        }
    };
    if seed_vec.len() != PARTITION_SEED_LEN {
        return Err(StegError::MalformedKeyFile(
            "partition_seed has the wrong length".into(),
        ));
    }
    let mut seed = [0u8; PARTITION_SEED_LEN];
    seed.copy_from_slice(seed_vec);
    Ok((seed, half))
}
