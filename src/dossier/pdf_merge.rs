//! Output document builder: appends whole source PDFs and image pages
//! into a single page tree.

use lopdf::{dictionary, Document, Object, ObjectId, StringFormat};

use super::image_page::{build_image_page, label_font, DecodedImage};
use crate::config::{AssemblyConfig, APP_NAME, APP_VERSION};

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Object types from a source that must not be carried over.
const SKIPPED_TYPES: [&[u8]; 4] = [b"Catalog", b"Pages", b"XRef", b"ObjStm"];

/// Bound on Parent links followed while resolving inherited attributes.
const MAX_TREE_DEPTH: usize = 64;

/// US Letter, assumed when a source page carries no MediaBox anywhere.
const FALLBACK_MEDIA_BOX: [i64; 4] = [0, 0, 612, 792];

/// A loaded PDF that is known to have at least one page.
#[derive(Debug)]
pub struct SourcePdf {
    doc: Document,
    page_count: usize,
}

#[derive(Debug, PartialEq, Eq)]
pub enum SourceRejection {
    Encrypted,
    NoPages,
}

impl SourcePdf {
    pub fn new(doc: Document) -> Result<Self, SourceRejection> {
        if doc.trailer.get(b"Encrypt").is_ok() {
            return Err(SourceRejection::Encrypted);
        }
        let page_count = doc.get_pages().len();
        if page_count == 0 {
            return Err(SourceRejection::NoPages);
        }
        Ok(Self { doc, page_count })
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }
}

pub struct DossierBuilder {
    doc: Document,
    pages_id: ObjectId,
    kids: Vec<ObjectId>,
    font_id: Option<ObjectId>,
}

impl Default for DossierBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DossierBuilder {
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            kids: Vec::new(),
            font_id: None,
        }
    }

    pub fn page_count(&self) -> usize {
        self.kids.len()
    }

    /// Append every page of `source`, in its own order. Returns the number
    /// of pages added.
    pub fn append_pdf(&mut self, source: SourcePdf) -> usize {
        let mut src = source.doc;
        src.renumber_objects_with(self.doc.max_id + 1);

        let page_ids: Vec<ObjectId> = src.get_pages().into_values().collect();
        for page_id in &page_ids {
            let inherited = inherited_attributes(&src, *page_id);
            if let Ok(Object::Dictionary(page)) = src.get_object_mut(*page_id) {
                for (key, value) in inherited {
                    page.set(key, value);
                }
                if !page.has(b"MediaBox") {
                    let media_box: Vec<Object> = FALLBACK_MEDIA_BOX.iter().map(|v| (*v).into()).collect();
                    page.set("MediaBox", media_box);
                }
                page.set("Parent", self.pages_id);
            }
        }

        let src_max_id = src.max_id;
        for (id, object) in src.objects {
            if is_skipped(&object) {
                continue;
            }
            self.doc.objects.insert(id, object);
        }
        self.doc.max_id = self.doc.max_id.max(src_max_id);

        self.kids.extend(&page_ids);
        page_ids.len()
    }

    /// Append one page showing `image` fitted below `label`.
    pub fn append_image_page(
        &mut self,
        image: &DecodedImage,
        label: &str,
        config: &AssemblyConfig,
    ) -> Result<(), lopdf::Error> {
        let font_id = match self.font_id {
            Some(id) => id,
            None => {
                let id = self.doc.add_object(label_font());
                self.font_id = Some(id);
                id
            }
        };
        let mut built = build_image_page(&mut self.doc, image, label, font_id, config)?;
        built.page.set("Parent", self.pages_id);
        let page_id = self.doc.add_object(built.page);
        self.kids.push(page_id);
        Ok(())
    }

    /// Write the page tree, catalog and info dictionary, and serialize.
    pub fn finish(mut self, title: &str) -> Result<Vec<u8>, lopdf::Error> {
        let kids: Vec<Object> = self.kids.iter().map(|id| Object::Reference(*id)).collect();
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => self.kids.len() as i64,
        };
        self.doc.objects.insert(self.pages_id, Object::Dictionary(pages));

        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        let info_id = self.doc.add_object(dictionary! {
            "Title" => text_string(title),
            "Producer" => text_string(&format!("{APP_NAME} {APP_VERSION}")),
        });
        self.doc.trailer.set("Root", catalog_id);
        self.doc.trailer.set("Info", info_id);

        let mut buf = Vec::new();
        self.doc.save_to(&mut buf)?;
        Ok(buf)
    }
}

fn is_skipped(object: &Object) -> bool {
    let dict = match object {
        Object::Dictionary(dict) => dict,
        Object::Stream(stream) => &stream.dict,
        _ => return false,
    };
    match dict.get(b"Type").and_then(Object::as_name) {
        Ok(name) => SKIPPED_TYPES.contains(&name),
        Err(_) => false,
    }
}

/// Attributes the page lacks but an ancestor defines, nearest ancestor first.
fn inherited_attributes(doc: &Document, page_id: ObjectId) -> Vec<(Vec<u8>, Object)> {
    let Ok(page) = doc.get_dictionary(page_id) else {
        return Vec::new();
    };
    let mut wanted: Vec<&[u8]> = INHERITABLE.iter().copied().filter(|k| !page.has(k)).collect();
    let mut found = Vec::new();
    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();

    for _ in 0..MAX_TREE_DEPTH {
        if wanted.is_empty() {
            break;
        }
        let Some(node) = parent.and_then(|id| doc.get_dictionary(id).ok()) else {
            break;
        };
        wanted.retain(|key| match node.get(key) {
            Ok(value) => {
                found.push((key.to_vec(), value.clone()));
                false
            }
            Err(_) => true,
        });
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
    }
    found
}

/// PDF text string; UTF-16BE with BOM so accented names survive.
fn text_string(text: &str) -> Object {
    let mut bytes = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}
