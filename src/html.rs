//! Table-of-contents reconciliation and the text rewriting passes applied to
//! fetched section HTML.

use std::collections::{btree_map::Entry, BTreeMap};

use crate::models::TocItem;

/// Collapse the TOC entry list into one entry per section index.
///
/// The first entry seen for an index wins, unless a later entry for the same
/// index sits at depth 1: top-level sections override nested duplicates, so a
/// single HTML file is produced per section.
pub fn reconcile_sections(items: &[TocItem]) -> BTreeMap<usize, TocItem> {
    let mut sections = BTreeMap::new();
    for item in items {
        match sections.entry(item.section_index) {
            Entry::Vacant(slot) => {
                slot.insert(item.clone());
            }
            Entry::Occupied(mut slot) => {
                if item.depth == 1 {
                    slot.insert(item.clone());
                }
            }
        }
    }
    sections
}

/// Local filename a retained section is exported under.
pub fn section_filename(index: usize) -> String {
    format!("section_{}.html", index)
}

/// Replace references to the sections' original filenames with the locally
/// generated ones, so cross-links keep working after export.
pub fn remap_cross_links(mut html: String, renames: &[(String, String)]) -> String {
    for (original, local) in renames {
        html = html.replace(original.as_str(), local);
    }
    html
}

/// Name an asset is cached under locally: the last path segment of its
/// manifest path, sanitized for the filesystem.
pub fn local_asset_name(path: &str) -> String {
    let name = path.rsplit('/').next().unwrap_or(path);
    sanitize_filename::sanitize(name)
}

/// Encode to ASCII bytes, turning every non-ASCII character into a decimal
/// numeric character reference.
pub fn encode_ascii(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    for c in text.chars() {
        if c.is_ascii() {
            out.push(c as u8);
        } else {
            out.extend_from_slice(format!("&#{};", u32::from(c)).as_bytes());
        }
    }
    out
}
