//! Texture decoding: image file -> raw pixel buffer + dimensions +
//! channel count, with a process-wide vertical-flip setting.

use std::path::Path;
use std::sync::OnceLock;

use crate::error::{ImportError, ImportResult};

/// Decoded pixels in CPU memory, ready for a one-time hand-off to the
/// render engine. Moving the value into the engine is the transfer; there
/// is no second copy to free.
#[derive(Clone, Debug, PartialEq)]
pub struct TextureData {
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Channels per pixel as stored in `pixels` (1, 2, 3 or 4).
    pub channels: u8,
}

impl TextureData {
    pub fn new(pixels: Vec<u8>, width: u32, height: u32, channels: u8) -> Self {
        Self {
            pixels,
            width,
            height,
            channels,
        }
    }

    /// 1x1 opaque magenta, substituted when a decode fails so texture
    /// indices handed out for the path stay valid.
    pub fn placeholder() -> Self {
        Self::new(vec![255, 0, 255, 255], 1, 1, 4)
    }

    pub fn is_valid(&self) -> bool {
        self.width > 0
            && self.height > 0
            && self.pixels.len()
                == (self.width as usize) * (self.height as usize) * (self.channels as usize)
    }
}

static FLIP_VERTICAL: OnceLock<bool> = OnceLock::new();

/// Set the vertical-flip-on-decode behavior for the whole process. Must be
/// called once before any decode; later calls are ignored with a warning.
pub fn init_decoder(flip_vertical: bool) {
    if FLIP_VERTICAL.set(flip_vertical).is_err() {
        log::warn!("texture decoder already initialized; ignoring init_decoder call");
    }
}

/// Current flip setting; `false` until [`init_decoder`] runs.
pub fn flip_vertical_on_load() -> bool {
    FLIP_VERTICAL.get().copied().unwrap_or(false)
}

/// Decode an image file, preserving the source channel count.
pub fn decode_file(path: &Path) -> ImportResult<TextureData> {
    let img = image::open(path).map_err(|e| ImportError::decode(path, e.to_string()))?;
    let img = if flip_vertical_on_load() {
        img.flipv()
    } else {
        img
    };

    let width = img.width();
    let height = img.height();
    let channels = img.color().channel_count();
    let pixels = match channels {
        1 => img.into_luma8().into_raw(),
        2 => img.into_luma_alpha8().into_raw(),
        3 => img.into_rgb8().into_raw(),
        _ => img.into_rgba8().into_raw(),
    };
    let channels = channels.min(4);

    log::debug!(
        "decoded texture {} ({}x{}, {} channels)",
        path.display(),
        width,
        height,
        channels
    );
    Ok(TextureData::new(pixels, width, height, channels))
}
