//! Raster sources: decode PNG/JPEG and turn them into PDF image XObjects.

use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use image::{DynamicImage, GenericImageView, ImageFormat};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Object, ObjectId, Stream, StringFormat};

use super::classify::PayloadKind;
use super::layout::{fit_image, label_origin, PageGeometry, Placement};
use crate::config::AssemblyConfig;

/// A decoded image, already Flate-compressed for embedding.
#[derive(Clone)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    /// 8-bit RGB samples, zlib-compressed.
    rgb: Vec<u8>,
    /// 8-bit alpha samples, zlib-compressed, when the source had transparency.
    alpha: Option<Vec<u8>>,
}

impl DecodedImage {
    pub fn has_alpha(&self) -> bool {
        self.alpha.is_some()
    }
}

impl std::fmt::Debug for DecodedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecodedImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("has_alpha", &self.has_alpha())
            .finish()
    }
}

/// Decode with the format implied by `kind` (never sniffed).
pub fn decode_image(payload: &[u8], kind: PayloadKind) -> Result<DecodedImage, String> {
    let format = match kind {
        PayloadKind::Png => ImageFormat::Png,
        PayloadKind::Jpeg => ImageFormat::Jpeg,
        other => return Err(format!("{} is not an image format", other.as_str())),
    };
    let img = image::load_from_memory_with_format(payload, format).map_err(|e| e.to_string())?;
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return Err("image has no pixels".into());
    }

    let rgb = deflate(img.to_rgb8().as_raw())?;
    let alpha = if img.color().has_alpha() {
        Some(deflate(&alpha_channel(&img))?)
    } else {
        None
    };

    Ok(DecodedImage { width, height, rgb, alpha })
}

fn alpha_channel(img: &DynamicImage) -> Vec<u8> {
    img.to_rgba8().pixels().map(|p| p.0[3]).collect()
}

fn deflate(raw: &[u8]) -> Result<Vec<u8>, String> {
    let mut encoder = ZlibEncoder::new(Vec::with_capacity(raw.len() / 2), Compression::default());
    encoder.write_all(raw).map_err(|e| e.to_string())?;
    encoder.finish().map_err(|e| e.to_string())
}

/// A built image page, not yet linked to a parent node.
pub struct ImagePageObjects {
    pub page: Dictionary,
    pub placement: Placement,
}

/// Add the XObject(s) and content stream for one image page to `doc` and
/// return the page dictionary (without `Parent`).
pub fn build_image_page(
    doc: &mut lopdf::Document,
    image: &DecodedImage,
    label: &str,
    font_id: ObjectId,
    config: &AssemblyConfig,
) -> Result<ImagePageObjects, lopdf::Error> {
    let geometry = PageGeometry::from_config(config);
    let placement = fit_image(image.width, image.height, &geometry)
        .ok_or_else(|| lopdf::Error::Syntax("image has no pixels".into()))?;

    let mut image_dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => image.width as i64,
        "Height" => image.height as i64,
        "ColorSpace" => "DeviceRGB",
        "BitsPerComponent" => 8,
        "Filter" => "FlateDecode",
    };
    if let Some(alpha) = &image.alpha {
        let mask = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => image.width as i64,
                "Height" => image.height as i64,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
                "Filter" => "FlateDecode",
            },
            alpha.clone(),
        );
        let mask_id = doc.add_object(mask);
        image_dict.set("SMask", mask_id);
    }
    let image_id = doc.add_object(Stream::new(image_dict, image.rgb.clone()));

    let (label_x, label_y) = label_origin(config);
    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    Object::Real(placement.width),
                    0.into(),
                    0.into(),
                    Object::Real(placement.height),
                    Object::Real(placement.x),
                    Object::Real(placement.y),
                ],
            ),
            Operation::new("Do", vec!["Im1".into()]),
            Operation::new("Q", vec![]),
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), Object::Real(config.label_font_size)]),
            Operation::new("Td", vec![Object::Real(label_x), Object::Real(label_y)]),
            Operation::new(
                "Tj",
                vec![Object::String(encode_win_ansi(label), StringFormat::Literal)],
            ),
            Operation::new("ET", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));

    let page = dictionary! {
        "Type" => "Page",
        "MediaBox" => vec![
            0.into(),
            0.into(),
            Object::Real(config.page_width),
            Object::Real(config.page_height),
        ],
        "Contents" => content_id,
        "Resources" => dictionary! {
            "Font" => dictionary! { "F1" => font_id },
            "XObject" => dictionary! { "Im1" => image_id },
        },
    };

    Ok(ImagePageObjects { page, placement })
}

/// Standard Helvetica with WinAnsi encoding, for page labels.
pub fn label_font() -> Dictionary {
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    }
}

/// Encode text for a WinAnsi simple font. Unmappable characters become `?`.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\u{20}'..='\u{7E}' | '\u{A0}'..='\u{FF}' => c as u32 as u8,
            '€' => 0x80,
            '…' => 0x85,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            _ => b'?',
        })
        .collect()
}
