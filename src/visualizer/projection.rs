//! Projections of a byte spectrum onto display levels.

pub const BAR_COUNT: usize = 32;
pub const WAVEFORM_POINTS: usize = 50;

/// Contiguous slices of the bars, low to high.
pub const BAND_SIZES: [usize; 5] = [6, 6, 6, 6, 8];
pub const BAND_LABELS: [&str; 5] = ["Bass", "Low Mid", "Mid", "High Mid", "Treble"];

fn level(byte: u8) -> f32 {
    byte as f32 / 255.0 * 100.0
}

/// The first `count` bins as 0-100 levels, zero-padded if the spectrum is short.
fn leading_levels(data: &[u8], count: usize) -> Vec<f32> {
    (0..count)
        .map(|i| data.get(i).copied().map_or(0.0, level))
        .collect()
}

pub fn bar_levels(data: &[u8]) -> Vec<f32> {
    leading_levels(data, BAR_COUNT)
}

/// Same frequency bins as the bars, just more of them.
pub fn waveform(data: &[u8]) -> Vec<f32> {
    leading_levels(data, WAVEFORM_POINTS)
}

pub fn bands(bars: &[f32]) -> [f32; 5] {
    let mut out = [0.0; 5];
    let mut start = 0;
    for (slot, size) in out.iter_mut().zip(BAND_SIZES) {
        let end = (start + size).min(bars.len());
        if end > start {
            *slot = bars[start..end].iter().sum::<f32>() / size as f32;
        }
        start += size;
    }
    out
}

pub fn mean(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f32>() / values.len() as f32
}
