//! Multi-page TIFF stacks reduced to one maximum intensity plane per channel
//!
//! CiliaQ writes its crop images as ImageJ hyperstacks: one grey page per
//! channel and z slice, channels varying fastest. The channel count comes
//! from the `channels=` entry of the ImageJ description.

use crate::io::error::{CurationError, Result};
use image::error::{DecodingError, ImageFormatHint};
use image::{ImageBuffer, ImageError, ImageFormat, Rgb};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tiff::ColorType;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::tags::Tag;

/// 16-bit image whose three samples are channels C1, C2 and C3, in that order
pub type ChannelImage = ImageBuffer<Rgb<u16>, Vec<u16>>;

/// Channels displayed from a stack
pub const DISPLAY_CHANNELS: usize = 3;

fn load_error(
    path: &Path,
    err: impl Into<Box<dyn std::error::Error + Send + Sync>>,
) -> CurationError {
    CurationError::ImageLoad {
        path: path.to_path_buf(),
        source: ImageError::Decoding(DecodingError::new(
            ImageFormatHint::Exact(ImageFormat::Tiff),
            err,
        )),
    }
}

/// Channel count from an ImageJ description such as `ImageJ=1.54\nchannels=3`
pub fn imagej_channels(description: &str) -> Option<usize> {
    description
        .lines()
        .find_map(|line| line.trim().strip_prefix("channels=")?.parse().ok())
        .filter(|&channels| channels > 0)
}

/// Samples of the current page split into planes
///
/// Grey pages give one plane. RGB pages give three, ordered blue, green,
/// red so that they line up with C1, C2 and C3.
fn page_planes<R: std::io::Read + std::io::Seek>(
    decoder: &mut Decoder<R>,
) -> std::result::Result<Vec<Vec<u16>>, String> {
    let colortype = decoder.colortype().map_err(|err| err.to_string())?;
    let samples: Vec<u16> = match decoder.read_image().map_err(|err| err.to_string())? {
        DecodingResult::U8(data) => data.into_iter().map(u16::from).collect(),
        DecodingResult::U16(data) => data,
        _ => return Err("only 8 and 16 bit samples are supported".to_owned()),
    };

    match colortype {
        ColorType::Gray(_) => Ok(vec![samples]),
        ColorType::RGB(_) => Ok((0..3)
            .rev()
            .map(|offset| samples.iter().skip(offset).step_by(3).copied().collect())
            .collect()),
        other => Err(format!("unsupported colour type {other:?}")),
    }
}

/// Maximum over z of every displayed channel
///
/// `planes` are in file order with `channels` planes per z slice. Channels
/// past the third are ignored; missing channels stay black.
pub fn project(width: u32, height: u32, planes: &[Vec<u16>], channels: usize) -> ChannelImage {
    let mut projection = ChannelImage::new(width, height);
    let channels = channels.max(1);

    for (index, plane) in planes.iter().enumerate() {
        let channel = index % channels;
        if channel >= DISPLAY_CHANNELS {
            continue;
        }
        for (pixel, &value) in projection.pixels_mut().zip(plane) {
            if let Some(sample) = pixel.0.get_mut(channel) {
                *sample = (*sample).max(value);
            }
        }
    }
    projection
}

/// Decode every page of the stack at `path` and project it over z
///
/// # Errors
///
/// Returns an image load error if the file cannot be read, is not a TIFF,
/// holds pages of different sizes or uses an unsupported sample format
pub fn load_projection(path: &Path) -> Result<ChannelImage> {
    let file = File::open(path).map_err(|source| CurationError::ImageLoad {
        path: path.to_path_buf(),
        source: ImageError::IoError(source),
    })?;
    let mut decoder = Decoder::new(BufReader::new(file)).map_err(|err| load_error(path, err))?;

    let rgb = matches!(decoder.colortype(), Ok(ColorType::RGB(_)));
    let channels = if rgb {
        DISPLAY_CHANNELS
    } else {
        decoder
            .get_tag_ascii_string(Tag::ImageDescription)
            .ok()
            .and_then(|description| imagej_channels(&description))
            .unwrap_or(DISPLAY_CHANNELS)
    };
    let (width, height) = decoder.dimensions().map_err(|err| load_error(path, err))?;

    let mut planes = Vec::new();
    loop {
        let size = decoder.dimensions().map_err(|err| load_error(path, err))?;
        if size != (width, height) {
            return Err(load_error(
                path,
                format!("page of {}x{} in a {width}x{height} stack", size.0, size.1),
            ));
        }
        planes.extend(page_planes(&mut decoder).map_err(|err| load_error(path, err))?);
        if !decoder.more_images() {
            break;
        }
        decoder.next_image().map_err(|err| load_error(path, err))?;
    }

    tracing::debug!(
        path = %path.display(),
        planes = planes.len(),
        channels,
        "stack projected"
    );
    Ok(project(width, height, &planes, channels))
}
