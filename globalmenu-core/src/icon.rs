// SPDX-License-Identifier: LGPL-3.0-only
//! Icon resolution and decoding.

use std::io::Cursor;

use image::ImageFormat;
use thiserror::Error;

use crate::content::{attr, ContentId, Document};

/// Default maximum icon dimension in pixels.
pub const MAX_ICON_SIZE: u32 = 100;

/// Errors that can occur while producing icon data.
#[derive(Debug, Error)]
pub enum IconError {
    /// The URI scheme cannot be fetched.
    #[error("Unsupported icon URI '{0}'")]
    UnsupportedUri(String),

    /// The icon could not be found.
    #[error("Icon '{0}' not found")]
    NotFound(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Decoding or encoding failed.
    #[error("Invalid image: {0}")]
    Image(#[from] image::ImageError),

    /// The icon is too large to send over the bus.
    #[error("Icon is {width}x{height}, larger than {max}px")]
    TooLarge {
        /// Width in pixels.
        width: u32,
        /// Height in pixels.
        height: u32,
        /// Allowed maximum.
        max: u32,
    },

    /// The clip region is malformed or outside the image.
    #[error("Invalid image region: {0}")]
    InvalidRegion(String),
}

/// Fetches raw icon bytes for a URI.
pub trait IconSource {
    /// Load the encoded image behind `uri`.
    fn fetch(&self, uri: &str) -> Result<Vec<u8>, IconError>;
}

/// Clip rectangle in image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageRegion {
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Width.
    pub width: u32,
    /// Height.
    pub height: u32,
}

impl ImageRegion {
    /// Parse a CSS `rect(top, right, bottom, left)` value in px.
    ///
    /// `auto` and empty values mean "no region".
    pub fn parse(value: &str) -> Result<Option<ImageRegion>, IconError> {
        let value = value.trim();
        if value.is_empty() || value == "auto" {
            return Ok(None);
        }
        let inner = value
            .strip_prefix("rect(")
            .and_then(|v| v.strip_suffix(')'))
            .ok_or_else(|| IconError::InvalidRegion(value.to_string()))?;
        let sides = inner
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|s| !s.is_empty())
            .map(|side| {
                let number = side.strip_suffix("px").unwrap_or(side);
                number
                    .parse::<f32>()
                    .map(|v| v.round() as i64)
                    .map_err(|_| IconError::InvalidRegion(value.to_string()))
            })
            .collect::<Result<Vec<i64>, IconError>>()?;
        let &[top, right, bottom, left] = sides.as_slice() else {
            return Err(IconError::InvalidRegion(value.to_string()));
        };
        if top < 0 || left < 0 || bottom <= top || right <= left {
            return Err(IconError::InvalidRegion(value.to_string()));
        }
        let pixels = |v: i64| u32::try_from(v).map_err(|_| IconError::InvalidRegion(value.to_string()));
        Ok(Some(ImageRegion {
            x: pixels(left)?,
            y: pixels(top)?,
            width: pixels(right - left)?,
            height: pixels(bottom - top)?,
        }))
    }
}

/// Where the icon of a content node comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IconSpec {
    /// Image URI.
    pub uri: String,
    /// Optional clip.
    pub region: Option<ImageRegion>,
}

/// Resolve the icon for `node`: the `image` attribute, else the computed
/// `list-style-image` clipped by `-moz-image-region`.
pub fn resolve_icon<D: Document + ?Sized>(doc: &D, node: ContentId) -> Result<Option<IconSpec>, IconError> {
    if let Some(uri) = doc.attribute(node, attr::IMAGE).filter(|u| !u.is_empty()) {
        return Ok(Some(IconSpec { uri, region: None }));
    }
    let Some(uri) = doc
        .computed_style(node, "list-style-image")
        .and_then(|value| css_url(&value))
    else {
        return Ok(None);
    };
    let region = match doc.computed_style(node, "-moz-image-region") {
        Some(value) => ImageRegion::parse(&value)?,
        None => None,
    };
    Ok(Some(IconSpec { uri, region }))
}

fn css_url(value: &str) -> Option<String> {
    let inner = value.trim().strip_prefix("url(")?.strip_suffix(')')?.trim();
    let unquoted = inner
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .or_else(|| inner.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
        .unwrap_or(inner);
    (!unquoted.is_empty()).then(|| unquoted.to_string())
}

/// Decode `bytes`, apply `region` and re-encode as PNG.
pub fn decode_icon(bytes: &[u8], region: Option<ImageRegion>, max_size: u32) -> Result<Vec<u8>, IconError> {
    let mut image = image::load_from_memory(bytes)?;
    if let Some(region) = region {
        let right = region.x.checked_add(region.width);
        let bottom = region.y.checked_add(region.height);
        let inside = matches!((right, bottom), (Some(r), Some(b)) if r <= image.width() && b <= image.height());
        if !inside {
            return Err(IconError::InvalidRegion(format!(
                "{region:?} outside {}x{}",
                image.width(),
                image.height()
            )));
        }
        image = image.crop_imm(region.x, region.y, region.width, region.height);
    }
    if image.width() > max_size || image.height() > max_size {
        return Err(IconError::TooLarge {
            width: image.width(),
            height: image.height(),
            max: max_size,
        });
    }
    let mut out = Cursor::new(Vec::new());
    image.write_to(&mut out, ImageFormat::Png)?;
    Ok(out.into_inner())
}
