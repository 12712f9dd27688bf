/// score.rs — Advisory cover-image scoring
///
/// Purely informational: ranks how well an image cover will hide
/// data. Entropy measures value diversity, texture density measures
/// how much of the image the adaptive mask accepts, and the area term
/// rewards larger covers. Nothing here affects embedding or
/// extraction.
use crate::carrier::{self, raster, StegMode};
use crate::error::Result;

/// Score report for a prospective cover image.
#[derive(Debug, Clone)]
pub struct CoverScore {
    /// Shannon entropy of the channel bytes, 0–8.
    pub entropy: f64,
    /// Fraction of pixels the adaptive mask accepts, 0–1.
    pub texture_density: f64,
    pub adaptive_capacity: usize,
    pub sequential_capacity: usize,
    /// Weighted score, 0–100.
    pub score: u32,
    pub label: &'static str,
    pub width: usize,
    pub height: usize,
}

fn label_for(score: u32) -> &'static str {
    match score {
        75.. => "Excellent",
        55.. => "Good",
        35.. => "Fair",
        _ => "Poor",
    }
}

/// Score an image cover (PNG, BMP or JPEG).
pub fn score_cover_image(path: &std::path::Path) -> Result<CoverScore> {
    let img = raster::load_rgb(path)?;
    let (width, height) = (img.width() as usize, img.height() as usize);
    let px: &[u8] = &img;

    // Shannon entropy over the 256-bin channel histogram
    let mut counts = [0u64; 256];
    for &b in px {
        counts[b as usize] += 1;
    }
    let total = px.len() as f64;
    let mut entropy = 0f64;
    for &c in counts.iter() {
        if c > 0 {
            let p = c as f64 / total;
            entropy -= p * p.log2();
        }
    }

    let mask = raster::compute_mask(&img);
    let textured = mask.iter().filter(|&&m| m).count();
    let texture_density = textured as f64 / (width * height) as f64;

    let adaptive_capacity = carrier::get_capacity(path, StegMode::Adaptive)?.available_bytes;
    let sequential_capacity = carrier::get_capacity(path, StegMode::Sequential)?.available_bytes;

    let area_term = ((width * height) as f64 / (1920.0 * 1080.0)).min(1.0);
    let raw = 0.40 * (entropy / 8.0) + 0.40 * (texture_density / 0.5).min(1.0) + 0.20 * area_term;
    let score = (raw * 100.0).round() as u32;

    Ok(CoverScore {
        entropy,
        texture_density,
        adaptive_capacity,
        sequential_capacity,
        score,
        label: label_for(score),
        width,
        height,
    })
}
