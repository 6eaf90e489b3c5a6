use std::path::{Path, PathBuf};

use anyhow::Context;
use askama::Template;
use log::{debug, error, info, warn};

use crate::{
    client::CheggClient,
    error::Result,
    html::{
        encode_ascii, local_asset_name, reconcile_sections, remap_cross_links, section_filename,
    },
    models::TocItem,
    templates::SectionHtml,
};

const IMAGES: &str = "images";

lazy_static! {
    static ref IMAGES_DIR: PathBuf = PathBuf::from(IMAGES);
}

/// Fetch every retained section of the book and write it under `export_dir`,
/// with images cached in an `images/` subdirectory.
pub async fn export_book(
    client: &CheggClient,
    export_dir: &Path,
    skip_downloaded: bool,
) -> Result<()> {
    HtmlExporter::new(client, export_dir, skip_downloaded)
        .export()
        .await
}

struct HtmlExporter<'a> {
    client: &'a CheggClient,
    export_dir: PathBuf,
    images_dir: PathBuf,
    skip_downloaded: bool,
}

impl<'a> HtmlExporter<'a> {
    fn new(client: &'a CheggClient, export_dir: &Path, skip_downloaded: bool) -> Self {
        HtmlExporter {
            client,
            export_dir: export_dir.to_path_buf(),
            images_dir: export_dir.join(IMAGES_DIR.as_path()),
            skip_downloaded,
        }
    }

    async fn export(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.images_dir)
            .await
            .with_context(|| format!("failed to create {}", self.images_dir.display()))?;

        let metadata = self.client.fetch_metadata().await?;
        if let Some(title) = &metadata.title {
            info!("Book title: {}", title);
        }
        info!("Total sections: {}", metadata.length);

        let toc = self.client.fetch_toc().await?;
        let sections = reconcile_sections(&toc);
        debug!("Retained {} of {} toc entries", sections.len(), toc.len());

        // Filenames the cross-references are rewritten to, for every
        // retained section at once.
        let renames: Vec<(String, String)> = sections
            .values()
            .map(|item| (item.filename.clone(), section_filename(item.section_index)))
            .collect();

        for item in sections.values() {
            self.export_section(item, &renames).await?;
        }

        Ok(())
    }

    async fn export_section(&self, item: &TocItem, renames: &[(String, String)]) -> Result<()> {
        let index = item.section_index;
        let out_path = self.export_dir.join(section_filename(index));

        if self.skip_downloaded && out_path.exists() {
            info!("Skipping section {}: already downloaded", index);
            return Ok(());
        }

        info!("Fetching section {}...", index);
        let content = match self.client.fetch_section_content(index).await {
            Ok(content) => content,
            Err(err) => {
                error!("Could not fetch section {}: {}", index, err);
                return Ok(());
            }
        };

        let content = self.localize_assets(index, content).await;

        let page = SectionHtml {
            title: &item.title,
            body: &content,
        }
        .render()
        .context("failed to render section template")?;

        let page = remap_cross_links(page, renames);

        info!("Exporting section {}...", index);
        tokio::fs::write(&out_path, encode_ascii(&page))
            .await
            .with_context(|| format!("failed to write {}", out_path.display()))?;

        Ok(())
    }

    /// Rewrite image references to the local cache, downloading anything not
    /// cached yet. A failed manifest fetch or download is reported and the
    /// section stays usable with whatever rewrites already happened.
    async fn localize_assets(&self, index: usize, mut content: String) -> String {
        let meta = match self.client.fetch_section_meta(index).await {
            Ok(meta) => meta,
            Err(err) => {
                warn!("Could not fetch metadata for section {}: {}", index, err);
                return content;
            }
        };

        for asset in meta.assets.iter().filter(|a| a.is_image()) {
            let filename = local_asset_name(&asset.path);
            // Relative to the section HTML file.
            content = content.replace(&asset.path, &format!("./{}/{}", IMAGES, filename));

            let cache_path = self.images_dir.join(&filename);
            if cache_path.exists() {
                debug!("Skipping {}: already downloaded", filename);
                continue;
            }

            info!("Downloading {}...", asset.path);
            match self.client.download_asset(&asset.path).await {
                Ok(bytes) => {
                    if let Err(err) = tokio::fs::write(&cache_path, &bytes).await {
                        warn!("Could not write {}: {}", cache_path.display(), err);
                    }
                }
                Err(err) => warn!("Could not download {}: {}", asset.path, err),
            }
        }

        content
    }
}
