//! Geometry for image pages, in PDF points (origin bottom-left).

use crate::config::AssemblyConfig;
use crate::format::shorten;

/// Page size and margin used to place one image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
    pub margin: f32,
}

impl PageGeometry {
    pub fn from_config(config: &AssemblyConfig) -> Self {
        Self {
            width: config.page_width,
            height: config.page_height,
            margin: config.margin,
        }
    }

    pub fn available_width(&self) -> f32 {
        self.width - 2.0 * self.margin
    }

    pub fn available_height(&self) -> f32 {
        self.height - 2.0 * self.margin
    }
}

/// Where an image lands on the page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub scale: f32,
}

impl Placement {
    pub fn top(&self) -> f32 {
        self.y + self.height
    }
}

/// Scale uniformly to fit the printable area and center on the page.
///
/// `scale = min(available_w / image_w, available_h / image_h)`; small images
/// are scaled up as well. Returns `None` for zero-sized images.
pub fn fit_image(image_width: u32, image_height: u32, page: &PageGeometry) -> Option<Placement> {
    if image_width == 0 || image_height == 0 {
        return None;
    }
    let (iw, ih) = (image_width as f32, image_height as f32);
    let scale = (page.available_width() / iw).min(page.available_height() / ih);
    let width = iw * scale;
    let height = ih * scale;
    Some(Placement {
        x: page.width / 2.0 - width / 2.0,
        y: page.height / 2.0 - height / 2.0,
        width,
        height,
        scale,
    })
}

/// Baseline origin of the page label.
pub fn label_origin(config: &AssemblyConfig) -> (f32, f32) {
    (config.margin, config.page_height - config.label_offset)
}

/// Shorten a label so it fits between the side margins.
///
/// Uses half an em as the average Helvetica glyph width, which errs wide for
/// the mixed-case text of certificate names.
pub fn fit_label(text: &str, config: &AssemblyConfig) -> String {
    let avg_glyph = config.label_font_size * 0.5;
    let usable = config.page_width - 2.0 * config.margin;
    let max_chars = (usable / avg_glyph).floor().max(4.0) as usize;
    shorten(text, max_chars)
}
