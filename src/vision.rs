//! Image encoder: turns a raster image into a bounded textual surrogate.
//!
//! The downstream model has no vision capability, so each attached image is
//! resampled to a fixed square grid and emitted as literal RRGGBB hex tokens,
//! followed by global color statistics and a cheap gradient edge map. The
//! instructional preamble is part of the contract: without it the model has
//! no way to know what the hex block means.
//!
//! Encoding is a pure function of the image bytes and the pipeline config —
//! identical input always produces byte-identical output.

use image::imageops::FilterType;
use image::RgbImage;

use crate::config::PipelineConfig;
use crate::errors::EncodeError;
use crate::session::ImageBlob;

/// Which color channel strictly dominates the image mean.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DominantChannel {
    Red,
    Green,
    Blue,
    /// No channel strictly exceeds both others (any tie lands here).
    Neutral,
}

impl DominantChannel {
    pub fn label(&self) -> &'static str {
        match self {
            DominantChannel::Red => "Red tones",
            DominantChannel::Green => "Green tones",
            DominantChannel::Blue => "Blue tones",
            DominantChannel::Neutral => "Neutral/Gray tones",
        }
    }
}

/// Five-bucket brightness classification from mean luminance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrightnessBucket {
    VeryBright,
    Bright,
    Medium,
    Dark,
    VeryDark,
}

impl BrightnessBucket {
    fn from_luminance(lum: f64) -> Self {
        if lum >= 200.0 {
            BrightnessBucket::VeryBright
        } else if lum >= 150.0 {
            BrightnessBucket::Bright
        } else if lum >= 100.0 {
            BrightnessBucket::Medium
        } else if lum >= 50.0 {
            BrightnessBucket::Dark
        } else {
            BrightnessBucket::VeryDark
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            BrightnessBucket::VeryBright => "very bright",
            BrightnessBucket::Bright => "bright",
            BrightnessBucket::Medium => "medium brightness",
            BrightnessBucket::Dark => "dark",
            BrightnessBucket::VeryDark => "very dark",
        }
    }
}

/// Global color statistics over the resampled grid.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelStats {
    pub mean_r: f64,
    pub mean_g: f64,
    pub mean_b: f64,
    pub dominant: DominantChannel,
    pub brightness: BrightnessBucket,
}

/// Edge-point summary from the gradient scan.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeSummary {
    pub count: usize,
    /// Mean (x, y) of edge points. `None` when no edges were found.
    pub centroid: Option<(f64, f64)>,
}

/// Derived, per-call analysis of one image. Recomputed for every model call;
/// has no identity beyond the call that created it.
#[derive(Debug, Clone)]
pub struct ImageAnalysisReport {
    pub grid_size: u32,
    pub grid: String,
    pub stats: PixelStats,
    pub edges: EdgeSummary,
}

/// Analyze one image blob. Fails only on decode errors.
pub fn analyze(blob: &ImageBlob, config: &PipelineConfig) -> Result<ImageAnalysisReport, EncodeError> {
    let decoded = image::load_from_memory(&blob.bytes).map_err(|e| EncodeError::DecodeFailed {
        filename: blob.filename.clone(),
        reason: e.to_string(),
    })?;

    let size = config.grid_size;
    // Lanczos keeps the resample faithful regardless of source resolution.
    let rgb = decoded.resize_exact(size, size, FilterType::Lanczos3).to_rgb8();

    Ok(ImageAnalysisReport {
        grid_size: size,
        grid: render_grid(&rgb),
        stats: compute_stats(&rgb),
        edges: detect_edges(&rgb, config.edge_threshold),
    })
}

/// Encode one image blob to its full textual block, or an inline error
/// marker if the image cannot be decoded. Never aborts the turn.
pub fn encode(blob: &ImageBlob, config: &PipelineConfig) -> String {
    match analyze(blob, config) {
        Ok(report) => report.render(),
        Err(e) => format!("[image could not be decoded: {}]", e),
    }
}

/// Emit the pixel grid: one 6-hex-digit RRGGBB token per pixel, tokens
/// separated by spaces, rows separated by newlines.
fn render_grid(rgb: &RgbImage) -> String {
    let (w, h) = rgb.dimensions();
    let mut out = String::with_capacity((w as usize * 7 + 1) * h as usize);
    for y in 0..h {
        for x in 0..w {
            let p = rgb.get_pixel(x, y);
            if x > 0 {
                out.push(' ');
            }
            out.push_str(&format!("{:02X}{:02X}{:02X}", p[0], p[1], p[2]));
        }
        out.push('\n');
    }
    out
}

fn compute_stats(rgb: &RgbImage) -> PixelStats {
    let n = (rgb.width() * rgb.height()) as f64;
    let (mut sum_r, mut sum_g, mut sum_b) = (0u64, 0u64, 0u64);
    for p in rgb.pixels() {
        sum_r += p[0] as u64;
        sum_g += p[1] as u64;
        sum_b += p[2] as u64;
    }
    let mean_r = sum_r as f64 / n;
    let mean_g = sum_g as f64 / n;
    let mean_b = sum_b as f64 / n;

    // Strict majority: a channel must exceed both others, ties are Neutral.
    let dominant = if mean_r > mean_g && mean_r > mean_b {
        DominantChannel::Red
    } else if mean_g > mean_r && mean_g > mean_b {
        DominantChannel::Green
    } else if mean_b > mean_r && mean_b > mean_g {
        DominantChannel::Blue
    } else {
        DominantChannel::Neutral
    };

    let luminance = (mean_r + mean_g + mean_b) / 3.0;

    PixelStats {
        mean_r,
        mean_g,
        mean_b,
        dominant,
        brightness: BrightnessBucket::from_luminance(luminance),
    }
}

/// Gradient-magnitude edge scan. For every interior pixel, compare summed-RGB
/// brightness (0..=765) against the right and below neighbors; a delta above
/// the threshold marks an edge point.
fn detect_edges(rgb: &RgbImage, threshold: u32) -> EdgeSummary {
    let (w, h) = rgb.dimensions();
    let brightness = |x: u32, y: u32| -> i64 {
        let p = rgb.get_pixel(x, y);
        p[0] as i64 + p[1] as i64 + p[2] as i64
    };

    let mut count = 0usize;
    let (mut sum_x, mut sum_y) = (0u64, 0u64);
    for y in 0..h.saturating_sub(1) {
        for x in 0..w.saturating_sub(1) {
            let here = brightness(x, y);
            let dx = (here - brightness(x + 1, y)).unsigned_abs();
            let dy = (here - brightness(x, y + 1)).unsigned_abs();
            if dx > threshold as u64 || dy > threshold as u64 {
                count += 1;
                sum_x += x as u64;
                sum_y += y as u64;
            }
        }
    }

    let centroid = if count > 0 {
        Some((sum_x as f64 / count as f64, sum_y as f64 / count as f64))
    } else {
        None
    };

    EdgeSummary { count, centroid }
}

impl ImageAnalysisReport {
    /// Render the full text block: preamble, grid, statistics, edge summary.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "The following is a {size}x{size} pixel grid of an image the user attached. \
             Each token is one pixel as a 6-digit RRGGBB hex color; rows are separated by \
             line breaks. Decode the colors to infer what the image shows. Heuristics: \
             warm beige/tan/brown tones often mean skin or fur; greens usually mean \
             vegetation; blues at the top usually mean sky or water.\n\n",
            size = self.grid_size
        ));
        out.push_str("PIXEL GRID:\n");
        out.push_str(&self.grid);
        out.push_str(&format!(
            "\nSTATISTICS:\nAverage color: R={:.0} G={:.0} B={:.0}\nDominant: {}\nOverall: {}\n",
            self.stats.mean_r,
            self.stats.mean_g,
            self.stats.mean_b,
            self.stats.dominant.label(),
            self.stats.brightness.label(),
        ));
        match self.edges.centroid {
            Some((cx, cy)) => out.push_str(&format!(
                "EDGES: {} edge points, centered near ({:.0}, {:.0})\n",
                self.edges.count, cx, cy
            )),
            None => out.push_str("EDGES: none detected\n"),
        }
        out
    }
}
