//! Test-only source files: small PDFs and images built in memory.

use std::io::Cursor;

use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage, Rgba, RgbaImage};
use lopdf::{dictionary, Document, Object, Stream};

/// A PDF with `pages` pages; page `n` (1-based) shows the text `<tag>-<n>`.
pub fn pdf(tag: &str, pages: usize) -> Vec<u8> {
    save(build_pdf(tag, pages, false))
}

/// Like [`pdf`], but MediaBox and Resources live on the Pages node only.
pub fn pdf_with_inherited_attributes(tag: &str, pages: usize) -> Vec<u8> {
    save(build_pdf(tag, pages, true))
}

/// A structurally valid PDF whose page tree is empty.
pub fn empty_pdf() -> Vec<u8> {
    save(build_pdf("empty", 0, false))
}

fn build_pdf(tag: &str, pages: usize, inherit: bool) -> Document {
    let mut doc = Document::with_version("1.4");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources = dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    };
    let media_box: Vec<Object> = vec![0.into(), 0.into(), 612.into(), 792.into()];

    let mut kids = Vec::with_capacity(pages);
    for n in 1..=pages {
        let content = format!("BT /F1 24 Tf 72 700 Td ({tag}-{n}) Tj ET");
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
        let mut page = dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        };
        if !inherit {
            page.set("MediaBox", media_box.clone());
            page.set("Resources", resources.clone());
        }
        kids.push(Object::from(doc.add_object(page)));
    }

    let mut pages_dict = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => pages as i64,
    };
    if inherit {
        pages_dict.set("MediaBox", media_box);
        pages_dict.set("Resources", resources);
    }
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc
}

fn save(mut doc: Document) -> Vec<u8> {
    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

pub fn png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb([200, 30, 30]));
    encode(DynamicImage::ImageRgb8(img), ImageOutputFormat::Png)
}

pub fn png_with_alpha(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, Rgba([10, 120, 200, 128]));
    encode(DynamicImage::ImageRgba8(img), ImageOutputFormat::Png)
}

pub fn jpeg(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb([30, 160, 60]));
    encode(DynamicImage::ImageRgb8(img), ImageOutputFormat::Jpeg(90))
}

fn encode(img: DynamicImage, format: ImageOutputFormat) -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    img.write_to(&mut cursor, format).unwrap();
    cursor.into_inner()
}

/// Text drawn on each page of a merged document, in page order.
pub fn page_texts(bytes: &[u8]) -> Vec<String> {
    let doc = Document::load_mem(bytes).unwrap();
    doc.get_pages()
        .values()
        .map(|id| String::from_utf8_lossy(&doc.get_page_content(*id).unwrap()).into_owned())
        .collect()
}
