use serde::Deserialize;

/// Book-level metadata served next to the content.
#[derive(Deserialize, Debug)]
pub struct BookMeta {
    /// Total number of sections in the book.
    pub length: usize,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Deserialize, Debug)]
pub(crate) struct TocResponse {
    pub toc: Toc,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Toc {
    pub toc_items: Vec<TocItem>,
}

/// A single table-of-contents entry. Several entries can point into the
/// same section at different depths.
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TocItem {
    pub section_index: usize,
    pub depth: u32,
    pub title: String,
    pub filename: String,
}

/// Per-section metadata, of which only the asset manifest is used.
#[derive(Deserialize, Debug)]
pub struct SectionMeta {
    pub assets: Vec<Asset>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Asset {
    /// Asset kind as reported by the manifest; only `"image"` is handled.
    #[serde(rename = "type")]
    pub kind: String,
    pub path: String,
}

impl Asset {
    pub fn is_image(&self) -> bool {
        self.kind == "image"
    }
}
