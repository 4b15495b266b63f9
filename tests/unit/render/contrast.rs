//! Tests for display window selection and 16-bit to 8-bit mapping

#[cfg(test)]
mod tests {
    use cilia_curate::io::configuration::{AdjustMode, CurationConfig};
    use cilia_curate::render::contrast::{
        Adjustment, ChannelStats, ChannelWindow, adjust, apply, windows,
    };
    use cilia_curate::render::stack::ChannelImage;
    use image::Rgb;

    /// One pixel per histogram bin, 0 to 65280 in steps of 256
    fn ramp() -> ChannelImage {
        ChannelImage::from_fn(256, 1, |x, _| {
            let value = u16::try_from(x * 256).unwrap();
            Rgb([value, value, value])
        })
    }

    // Tests window ends clip and the inside is linear
    // Verified by mapping relative to zero instead of the window minimum
    #[test]
    fn test_window_map() {
        let window = ChannelWindow { low: 100, high: 355 };
        assert_eq!(window.map(0), 0);
        assert_eq!(window.map(100), 0);
        assert_eq!(window.map(227), 127);
        assert_eq!(window.map(355), 255);
        assert_eq!(window.map(u16::MAX), 255);
    }

    // Tests channel statistics track extremes and bins
    // Verified by binning with the wrong width
    #[test]
    fn test_channel_stats() {
        let stats = ChannelStats::of(&ramp(), 1);
        assert_eq!(stats.min, 0);
        assert_eq!(stats.max, 65280);
        assert_eq!(stats.histogram.len(), 256);
        assert!(stats.histogram.iter().all(|&count| count == 1));
    }

    // Tests the auto window uses the 1% and 99% bins
    // Verified by using the extremes instead of percentiles
    #[test]
    fn test_auto_window_percentiles() {
        let stats = ChannelStats::of(&ramp(), 0);
        assert_eq!(
            stats.auto_window(0.0),
            ChannelWindow {
                low: 512,
                high: 64768
            }
        );
    }

    // Tests the buffer widens the window but never past the data
    // Verified by skipping the clamp to the channel extremes
    #[test]
    fn test_auto_window_buffer_clamped() {
        let stats = ChannelStats::of(&ramp(), 0);
        assert_eq!(
            stats.auto_window(0.25),
            ChannelWindow {
                low: 0,
                high: 65280
            }
        );
    }

    // Tests a flat channel still gets a non-empty window
    // Verified by returning an empty window for constant images
    #[test]
    fn test_flat_channel_window() {
        let flat = ChannelImage::from_pixel(4, 4, Rgb([30000, 30000, 30000]));
        let stats = ChannelStats::of(&flat, 2);
        let window = stats.auto_window(0.0);
        assert_eq!(window.low, 30000);
        assert_eq!(window.high, 30001);
    }

    // Tests saturation splits the clipped pixels between both ends
    // Verified by clipping the whole percentage at the top
    #[test]
    fn test_saturated_window() {
        let stats = ChannelStats::of(&ramp(), 0);
        assert_eq!(
            stats.saturated_window(2.0),
            ChannelWindow {
                low: 512,
                high: 65023
            }
        );
        assert_eq!(
            stats.saturated_window(0.0),
            ChannelWindow {
                low: 0,
                high: 65280
            }
        );
    }

    // Tests the configured mode selects the adjustment
    // Verified by ignoring bc_min in min-max mode
    #[test]
    fn test_adjustment_from_config() {
        let config = CurationConfig {
            adjust: AdjustMode::MinMax,
            ..CurationConfig::default()
        };
        let windows = windows(&ramp(), &Adjustment::from_config(&config));
        assert_eq!(windows[0], ChannelWindow { low: 0, high: 600 });
        assert_eq!(
            windows[1],
            ChannelWindow {
                low: 5000,
                high: 30000
            }
        );
        assert_eq!(
            Adjustment::from_config(&CurationConfig::default()),
            Adjustment::Auto {
                buffer_percent: 0.25
            }
        );
    }

    // Tests no adjustment stretches each channel over its own range
    // Verified by sharing one window across channels
    #[test]
    fn test_off_uses_channel_extremes() {
        let image = ChannelImage::from_fn(2, 1, |x, _| {
            if x == 0 {
                Rgb([10, 200, 0])
            } else {
                Rgb([20, 400, 1000])
            }
        });
        let windows = windows(&image, &Adjustment::Off);
        assert_eq!(windows[0], ChannelWindow { low: 10, high: 20 });
        assert_eq!(windows[1], ChannelWindow { low: 200, high: 400 });

        let adjusted = apply(&image, &windows);
        assert_eq!(adjusted.get_pixel(0, 0), &Rgb([0, 0, 0]));
        assert_eq!(adjusted.get_pixel(1, 0), &Rgb([255, 255, 255]));
    }

    // Tests C1 is drawn blue, C2 green and C3 red, each through its own window
    // Verified by writing the channels out in red, green, blue order
    #[test]
    fn test_adjust_channel_colours() {
        let image = ChannelImage::from_fn(3, 1, |x, _| match x {
            0 => Rgb([600, 0, 0]),
            1 => Rgb([0, 30000, 0]),
            _ => Rgb([0, 0, 30000]),
        });
        let config = CurationConfig {
            adjust: AdjustMode::MinMax,
            ..CurationConfig::default()
        };
        let adjusted = adjust(&image, &Adjustment::from_config(&config));
        assert_eq!(adjusted.dimensions(), (3, 1));
        assert_eq!(adjusted.get_pixel(0, 0), &Rgb([0, 0, 255]));
        assert_eq!(adjusted.get_pixel(1, 0), &Rgb([0, 255, 0]));
        assert_eq!(adjusted.get_pixel(2, 0), &Rgb([255, 0, 0]));
    }
}
