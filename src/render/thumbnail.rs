//! Square crops around each cilium, cut from contrast adjusted projections

use crate::ciliaq::record::CiliumRecord;
use crate::io::configuration::CurationConfig;
use crate::render::contrast::{Adjustment, adjust};
use crate::render::stack::load_projection;
use crate::session::discovery::Bundle;
use image::RgbImage;
use image::imageops::{self, FilterType};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// `size` x `size` crop of `image` centred on `center`
///
/// Parts of the crop outside the image stay black.
pub fn crop_centered(image: &RgbImage, center: (f64, f64), size: u32) -> RgbImage {
    let half = f64::from(size / 2);
    // Coordinates are bounded by the image size
    #[allow(clippy::cast_possible_truncation)]
    let (left, top) = ((center.0 - half) as i64, (center.1 - half) as i64);

    let mut crop = RgbImage::new(size, size);
    let (width, height) = (i64::from(image.width()), i64::from(image.height()));
    for (x, y, pixel) in crop.enumerate_pixels_mut() {
        let source_x = left + i64::from(x);
        let source_y = top + i64::from(y);
        if (0..width).contains(&source_x) && (0..height).contains(&source_y) {
            let (Ok(sx), Ok(sy)) = (u32::try_from(source_x), u32::try_from(source_y)) else {
                continue;
            };
            *pixel = *image.get_pixel(sx, sy);
        }
    }
    crop
}

/// `image` enlarged by an integer `scale`, each pixel becoming a block
pub fn upscale(image: &RgbImage, scale: u32) -> RgbImage {
    if scale <= 1 {
        return image.clone();
    }
    imageops::resize(
        image,
        image.width() * scale,
        image.height() * scale,
        FilterType::Nearest,
    )
}

/// Produces thumbnails, keeping each adjusted source image in memory
pub struct ThumbnailRenderer {
    roi_size: u32,
    scale: u32,
    adjustment: Adjustment,
    cache: HashMap<PathBuf, Option<RgbImage>>,
}

impl ThumbnailRenderer {
    /// Renderer using the crop size, scale and contrast options of `config`
    pub fn new(config: &CurationConfig) -> Self {
        Self {
            roi_size: config.roi_size,
            scale: config.scale,
            adjustment: Adjustment::from_config(config),
            cache: HashMap::new(),
        }
    }

    /// Contrast adjusted projection of the stack at `path`, decoded on first use
    ///
    /// Stacks that fail to load are remembered as missing and logged once.
    pub fn adjusted(&mut self, path: &Path) -> Option<&RgbImage> {
        let adjustment = self.adjustment;
        self.cache
            .entry(path.to_path_buf())
            .or_insert_with(|| match load_projection(path) {
                Ok(image) => Some(adjust(&image, &adjustment)),
                Err(error) => {
                    tracing::warn!(%error, "thumbnails unavailable");
                    None
                }
            })
            .as_ref()
    }

    /// Upscaled crop around `record`, `None` when the bundle has no usable image
    pub fn thumbnail(&mut self, bundle: &Bundle, record: &CiliumRecord) -> Option<RgbImage> {
        let calibration = bundle.document().calibration();
        let (roi_size, scale) = (self.roi_size, self.scale);
        let image = self.adjusted(bundle.image_path()?)?;
        let crop = crop_centered(image, record.pixel_center(calibration), roi_size);
        Some(upscale(&crop, scale))
    }

    /// Drop all decoded images
    pub fn clear(&mut self) {
        self.cache.clear();
    }
}
