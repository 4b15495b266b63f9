//! Per-channel display windows mapping 16-bit intensities to 8-bit colour
//!
//! Windows are indexed by channel: entry 0 belongs to C1, the mask, which
//! is drawn in blue. C2 is drawn in green and C3 in red.

use crate::io::configuration::{
    AUTO_LOWER_PERCENTILE, AUTO_UPPER_PERCENTILE, AdjustMode, CurationConfig, HISTOGRAM_BINS,
};
use crate::render::stack::ChannelImage;
use image::{Rgb, RgbImage};

/// Number of distinct 16-bit intensities
const PIXEL_RANGE: u32 = 1 << 16;
/// Intensities covered by one histogram bin
// Bin count is a small constant
#[allow(clippy::cast_possible_truncation)]
const BIN_WIDTH: u32 = PIXEL_RANGE / HISTOGRAM_BINS as u32;

// Pixel counts stay far below 2^52, the conversion is exact
#[allow(clippy::cast_precision_loss)]
const fn count_as_f64(count: u64) -> f64 {
    count as f64
}

/// How display windows are chosen
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Adjustment {
    /// 1% to 99% percentile window widened by a fraction of the full range
    Auto {
        /// Fraction of the range added on both sides
        buffer_percent: f64,
    },
    /// Fixed windows
    MinMax {
        /// Window minimum per channel
        low: [u16; 3],
        /// Window maximum per channel
        high: [u16; 3],
    },
    /// Clip a percentage of pixels split between both ends
    Saturation {
        /// Saturated percentage per channel
        percent: [f64; 3],
    },
    /// Each channel stretched between its own extremes
    Off,
}

impl Adjustment {
    /// Adjustment selected by `config`
    pub const fn from_config(config: &CurationConfig) -> Self {
        match config.adjust {
            AdjustMode::Auto => Self::Auto {
                buffer_percent: config.buffer_percent,
            },
            AdjustMode::MinMax => Self::MinMax {
                low: config.bc_min,
                high: config.bc_max,
            },
            AdjustMode::Saturation => Self::Saturation {
                percent: config.saturation,
            },
            AdjustMode::Off => Self::Off,
        }
    }
}

/// Inclusive intensity range stretched over 0..=255
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelWindow {
    /// Intensity shown as black
    pub low: u16,
    /// Intensity shown at full brightness
    pub high: u16,
}

impl ChannelWindow {
    /// Display value of `value`
    pub fn map(&self, value: u16) -> u8 {
        if value <= self.low {
            return 0;
        }
        if value >= self.high {
            return u8::MAX;
        }
        let offset = u32::from(value - self.low);
        let span = u32::from(self.high - self.low);
        u8::try_from(offset * 255 / span).unwrap_or(u8::MAX)
    }
}

/// Intensity statistics of one channel
#[derive(Debug, Clone)]
pub struct ChannelStats {
    /// Smallest intensity
    pub min: u16,
    /// Largest intensity
    pub max: u16,
    /// Pixel counts per bin over the full 16-bit range
    pub histogram: Vec<u64>,
}

impl ChannelStats {
    /// Statistics of `channel` (0 to 2) of `image`
    pub fn of(image: &ChannelImage, channel: usize) -> Self {
        let mut histogram = vec![0_u64; HISTOGRAM_BINS];
        let mut min = u16::MAX;
        let mut max = u16::MIN;
        for pixel in image.pixels() {
            let Some(&value) = pixel.0.get(channel) else {
                continue;
            };
            min = min.min(value);
            max = max.max(value);
            if let Some(bin) = histogram.get_mut((u32::from(value) / BIN_WIDTH) as usize) {
                *bin += 1;
            }
        }
        if min > max {
            min = 0;
            max = 0;
        }
        Self {
            min,
            max,
            histogram,
        }
    }

    fn total(&self) -> u64 {
        self.histogram.iter().sum()
    }

    /// First bin whose cumulative count reaches `fraction` of all pixels
    fn percentile_bin(&self, fraction: f64) -> Option<usize> {
        let target = fraction * count_as_f64(self.total());
        let mut cumulative = 0_u64;
        self.histogram.iter().position(|&count| {
            cumulative += count;
            count_as_f64(cumulative) >= target
        })
    }

    fn bin_start(bin: usize) -> u32 {
        u32::try_from(bin).unwrap_or(u32::MAX).saturating_mul(BIN_WIDTH)
    }

    fn clamp_window(&self, low: u32, high: u32) -> ChannelWindow {
        let low = u16::try_from(low).unwrap_or(u16::MAX).max(self.min);
        let high = u16::try_from(high).unwrap_or(u16::MAX).min(self.max);
        if low < high {
            ChannelWindow { low, high }
        } else {
            self.full_window()
        }
    }

    fn full_window(&self) -> ChannelWindow {
        ChannelWindow {
            low: self.min,
            high: self.max.max(self.min.saturating_add(1)),
        }
    }

    /// Percentile window widened by `buffer_percent` of the range
    pub fn auto_window(&self, buffer_percent: f64) -> ChannelWindow {
        let low_bin = self.percentile_bin(AUTO_LOWER_PERCENTILE).unwrap_or(0);
        let high_bin = self
            .percentile_bin(AUTO_UPPER_PERCENTILE)
            .unwrap_or(HISTOGRAM_BINS - 1);

        // Buffer is a bounded fraction of 2^16
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let buffer = (buffer_percent.clamp(0.0, 1.0) * f64::from(PIXEL_RANGE)) as u32;
        let low = Self::bin_start(low_bin).saturating_sub(buffer);
        let high = Self::bin_start(high_bin)
            .saturating_add(buffer)
            .min(PIXEL_RANGE - 1);
        self.clamp_window(low, high)
    }

    /// Window leaving `percent` of the pixels saturated, half at each end
    pub fn saturated_window(&self, percent: f64) -> ChannelWindow {
        let tail = percent.clamp(0.0, 100.0) / 200.0;
        let low_bin = self.percentile_bin(tail).unwrap_or(0);
        let high_bin = self
            .percentile_bin(1.0 - tail)
            .unwrap_or(HISTOGRAM_BINS - 1);
        let high = Self::bin_start(high_bin + 1).saturating_sub(1);
        self.clamp_window(Self::bin_start(low_bin), high)
    }
}

/// Display windows of channels C1, C2 and C3 of `image`
pub fn windows(image: &ChannelImage, adjustment: &Adjustment) -> [ChannelWindow; 3] {
    std::array::from_fn(|channel| {
        let stats = ChannelStats::of(image, channel);
        match adjustment {
            Adjustment::Auto { buffer_percent } => stats.auto_window(*buffer_percent),
            Adjustment::MinMax { low, high } => {
                let low = low.get(channel).copied().unwrap_or(0);
                let high = high.get(channel).copied().unwrap_or(u16::MAX);
                ChannelWindow {
                    low,
                    high: high.max(low.saturating_add(1)),
                }
            }
            Adjustment::Saturation { percent } => {
                stats.saturated_window(percent.get(channel).copied().unwrap_or(0.0))
            }
            Adjustment::Off => stats.full_window(),
        }
    })
}

/// Map `image` through `windows` into blue (C1), green (C2) and red (C3)
pub fn apply(image: &ChannelImage, windows: &[ChannelWindow; 3]) -> RgbImage {
    let [mask, second, third] = windows;
    RgbImage::from_fn(image.width(), image.height(), |x, y| {
        let Rgb([c1, c2, c3]) = *image.get_pixel(x, y);
        Rgb([third.map(c3), second.map(c2), mask.map(c1)])
    })
}

/// Contrast adjusted 8-bit colour copy of `image`
pub fn adjust(image: &ChannelImage, adjustment: &Adjustment) -> RgbImage {
    let windows = windows(image, adjustment);
    tracing::debug!(?windows, "display windows");
    apply(image, &windows)
}
