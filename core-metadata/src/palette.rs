//! Colour palette extraction
//!
//! Swatches are found the way Android's `Palette` does it: pixels are
//! quantized to RGB555, median cut reduces them to a handful of colours, and
//! each of six swatch targets (vibrant/muted in light, normal and dark) picks
//! the best scoring colour not already taken. The dominant swatch is the most
//! populous colour.

use bridge_traits::artwork::{AlbumPalette, DecodedArtwork};
use std::cmp::Ordering;

/// Colours kept after median cut.
pub const MAX_COLORS: usize = 8;

/// Roughly a 112x112 image; larger inputs are sampled with a stride.
const MAX_SAMPLES: usize = 112 * 112;

const QUANTIZE_BITS: u8 = 5;

const WEIGHT_SATURATION: f32 = 0.24;
const WEIGHT_LUMINANCE: f32 = 0.52;
const WEIGHT_POPULATION: f32 = 0.24;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Swatch {
    rgb: [u8; 3],
    population: u32,
}

impl Swatch {
    fn argb(&self) -> u32 {
        0xFF00_0000 | (u32::from(self.rgb[0]) << 16) | (u32::from(self.rgb[1]) << 8) | u32::from(self.rgb[2])
    }
}

/// `(min, target, max)` bounds on saturation and lightness.
struct Target {
    saturation: (f32, f32, f32),
    lightness: (f32, f32, f32),
}

const LIGHT: (f32, f32, f32) = (0.55, 0.74, 1.0);
const NORMAL: (f32, f32, f32) = (0.3, 0.5, 0.7);
const DARK: (f32, f32, f32) = (0.0, 0.26, 0.45);
const VIBRANT: (f32, f32, f32) = (0.35, 1.0, 1.0);
const MUTED: (f32, f32, f32) = (0.0, 0.3, 0.4);

// Resolution order matters: earlier targets claim swatches first.
const LIGHT_VIBRANT_TARGET: Target = Target { saturation: VIBRANT, lightness: LIGHT };
const VIBRANT_TARGET: Target = Target { saturation: VIBRANT, lightness: NORMAL };
const DARK_VIBRANT_TARGET: Target = Target { saturation: VIBRANT, lightness: DARK };
const LIGHT_MUTED_TARGET: Target = Target { saturation: MUTED, lightness: LIGHT };
const MUTED_TARGET: Target = Target { saturation: MUTED, lightness: NORMAL };
const DARK_MUTED_TARGET: Target = Target { saturation: MUTED, lightness: DARK };

/// Extract swatches from decoded artwork.
pub fn generate_palette(image: &DecodedArtwork) -> AlbumPalette {
    let swatches = quantize(image);
    if swatches.is_empty() {
        return AlbumPalette::default();
    }

    let max_population = swatches.iter().map(|s| s.population).max().unwrap_or(1);
    let mut used = vec![false; swatches.len()];
    let mut pick = |target: &Target| -> Option<u32> {
        let idx = best_match(&swatches, &used, target, max_population)?;
        used[idx] = true;
        Some(swatches[idx].argb())
    };

    let light_vibrant = pick(&LIGHT_VIBRANT_TARGET);
    let vibrant = pick(&VIBRANT_TARGET);
    let dark_vibrant = pick(&DARK_VIBRANT_TARGET);
    let light_muted = pick(&LIGHT_MUTED_TARGET);
    let muted = pick(&MUTED_TARGET);
    let dark_muted = pick(&DARK_MUTED_TARGET);

    AlbumPalette {
        vibrant,
        dark_vibrant,
        light_vibrant,
        muted,
        dark_muted,
        light_muted,
        dominant: swatches.iter().max_by_key(|s| s.population).map(Swatch::argb),
    }
}

fn best_match(swatches: &[Swatch], used: &[bool], target: &Target, max_population: u32) -> Option<usize> {
    swatches
        .iter()
        .enumerate()
        .filter(|(i, _)| !used[*i])
        .filter_map(|(i, swatch)| {
            let [_, s, l] = rgb_to_hsl(swatch.rgb);
            let in_range = (target.saturation.0..=target.saturation.2).contains(&s)
                && (target.lightness.0..=target.lightness.2).contains(&l);
            if !in_range {
                return None;
            }
            let score = WEIGHT_SATURATION * (1.0 - (s - target.saturation.1).abs())
                + WEIGHT_LUMINANCE * (1.0 - (l - target.lightness.1).abs())
                + WEIGHT_POPULATION * (swatch.population as f32 / max_population as f32);
            Some((i, score))
        })
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal))
        .map(|(i, _)| i)
}

// =============================================================================
// Quantization
// =============================================================================

fn quantize(image: &DecodedArtwork) -> Vec<Swatch> {
    let pixel_count = image.rgb.len() / 3;
    let step = (pixel_count / MAX_SAMPLES).max(1);

    let mut histogram = vec![0u32; 1 << (QUANTIZE_BITS * 3)];
    for px in image.rgb.chunks_exact(3).step_by(step) {
        histogram[pack(px[0], px[1], px[2])] += 1;
    }

    let colors: Vec<([u8; 3], u32)> = histogram
        .iter()
        .enumerate()
        .filter(|(_, count)| **count > 0)
        .map(|(packed, count)| (unpack(packed), *count))
        .filter(|(quantized, _)| !should_ignore(expand(*quantized)))
        .collect();

    if colors.is_empty() {
        return Vec::new();
    }

    median_cut(colors, MAX_COLORS)
        .iter()
        .map(|color_box| average(color_box))
        .collect()
}

fn pack(r: u8, g: u8, b: u8) -> usize {
    let shift = 8 - QUANTIZE_BITS;
    (usize::from(r >> shift) << (2 * QUANTIZE_BITS))
        | (usize::from(g >> shift) << QUANTIZE_BITS)
        | usize::from(b >> shift)
}

fn unpack(packed: usize) -> [u8; 3] {
    let mask = (1 << QUANTIZE_BITS) - 1;
    [
        ((packed >> (2 * QUANTIZE_BITS)) & mask) as u8,
        ((packed >> QUANTIZE_BITS) & mask) as u8,
        (packed & mask) as u8,
    ]
}

/// 5-bit channels back to 8 bits, replicating the high bits.
fn expand(quantized: [u8; 3]) -> [u8; 3] {
    quantized.map(|v| (v << 3) | (v >> 2))
}

/// Near black, near white, and the skin-tone "I line" carry little colour.
fn should_ignore(rgb: [u8; 3]) -> bool {
    let [h, s, l] = rgb_to_hsl(rgb);
    l <= 0.05 || l >= 0.95 || ((10.0..=37.0).contains(&h) && s <= 0.82)
}

fn median_cut(colors: Vec<([u8; 3], u32)>, max_colors: usize) -> Vec<Vec<([u8; 3], u32)>> {
    let mut boxes = vec![colors];

    while boxes.len() < max_colors {
        let Some(idx) = boxes
            .iter()
            .enumerate()
            .filter(|(_, b)| b.len() > 1)
            .max_by_key(|(_, b)| volume(b))
            .map(|(i, _)| i)
        else {
            break;
        };

        let color_box = boxes.swap_remove(idx);
        let (low, high) = split(color_box);
        boxes.push(low);
        boxes.push(high);
    }

    boxes
}

fn channel_ranges(colors: &[([u8; 3], u32)]) -> [(u8, u8); 3] {
    let mut ranges = [(u8::MAX, u8::MIN); 3];
    for (rgb, _) in colors {
        for (range, v) in ranges.iter_mut().zip(rgb) {
            range.0 = range.0.min(*v);
            range.1 = range.1.max(*v);
        }
    }
    ranges
}

fn volume(colors: &[([u8; 3], u32)]) -> u32 {
    channel_ranges(colors)
        .iter()
        .map(|(min, max)| u32::from(max - min) + 1)
        .product()
}

/// Split along the widest channel at the population median.
fn split(mut colors: Vec<([u8; 3], u32)>) -> (Vec<([u8; 3], u32)>, Vec<([u8; 3], u32)>) {
    let ranges = channel_ranges(&colors);
    let channel = (0..3)
        .max_by_key(|&c| ranges[c].1 - ranges[c].0)
        .unwrap_or(0);
    colors.sort_by_key(|(rgb, _)| rgb[channel]);

    let half = colors.iter().map(|(_, c)| u64::from(*c)).sum::<u64>() / 2;
    let mut acc = 0u64;
    let mut split_at = 1;
    for (i, (_, count)) in colors.iter().enumerate() {
        acc += u64::from(*count);
        if acc >= half {
            split_at = i + 1;
            break;
        }
    }
    let split_at = split_at.clamp(1, colors.len() - 1);

    let high = colors.split_off(split_at);
    (colors, high)
}

fn average(colors: &[([u8; 3], u32)]) -> Swatch {
    let mut sums = [0u64; 3];
    let mut population = 0u64;
    for (rgb, count) in colors {
        for (sum, v) in sums.iter_mut().zip(rgb) {
            *sum += u64::from(*v) * u64::from(*count);
        }
        population += u64::from(*count);
    }
    let quantized = sums.map(|s| (s / population.max(1)) as u8);

    Swatch {
        rgb: expand(quantized),
        population: u32::try_from(population).unwrap_or(u32::MAX),
    }
}

/// `[hue 0..360, saturation 0..1, lightness 0..1]`
fn rgb_to_hsl(rgb: [u8; 3]) -> [f32; 3] {
    let [r, g, b] = rgb.map(|v| f32::from(v) / 255.0);
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;
    let l = (max + min) / 2.0;

    if delta == 0.0 {
        return [0.0, 0.0, l];
    }

    let h = if max == r {
        ((g - b) / delta).rem_euclid(6.0)
    } else if max == g {
        (b - r) / delta + 2.0
    } else {
        (r - g) / delta + 4.0
    };
    let s = delta / (1.0 - (2.0 * l - 1.0).abs());

    [(h * 60.0).rem_euclid(360.0), s.clamp(0.0, 1.0), l]
}
