use std::{io::BufWriter, path::Path, time::Duration};

use base64::Engine;
use printpdf::*;
use serde::Serialize;
use tracing::info;

use crate::{error::ExportError, models::GeneratedTextContent};

/// Stagger between consecutive image downloads.
pub const DOWNLOAD_STAGGER: Duration = Duration::from_millis(200);

pub fn text_document(text: &GeneratedTextContent) -> String {
    let bullets = |items: &[String]| items.iter().map(|i| format!("- {i}")).collect::<Vec<_>>().join("\n");
    format!(
        "Product Name:\n{}\n\n---\n\nTitle:\n{}\n\n---\n\nDescription:\n{}\n\n---\n\nHighlights:\n{}\n\n---\n\nBenefits:\n{}",
        text.name,
        text.title,
        text.description,
        bullets(&text.highlights),
        bullets(&text.benefits),
    )
    .trim()
    .to_string()
}

pub fn text_file_name(name: &str) -> String {
    let slug = name.to_lowercase().split_whitespace().collect::<Vec<_>>().join("-");
    format!("{slug}-content.txt")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImagePrefix {
    Product,
    Creative,
}

impl ImagePrefix {
    fn as_str(self) -> &'static str {
        match self {
            ImagePrefix::Product => "product",
            ImagePrefix::Creative => "creative",
        }
    }
}

pub fn image_file_name(prefix: ImagePrefix, index: usize) -> String {
    format!("{}-image-{}.png", prefix.as_str(), index + 1)
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DownloadItem {
    pub index: usize,
    pub file_name: String,
    pub delay_ms: u64,
}

pub fn download_plan(image_count: usize, prefix: ImagePrefix) -> Vec<DownloadItem> {
    (0..image_count)
        .map(|index| DownloadItem {
            index,
            file_name: image_file_name(prefix, index),
            delay_ms: DOWNLOAD_STAGGER.as_millis() as u64 * index as u64,
        })
        .collect()
}

/// Splits `data:<type>;base64,<payload>` into its media type and decoded bytes.
pub fn decode_data_uri(uri: &str) -> Result<(String, Vec<u8>), ExportError> {
    let invalid = || ExportError::InvalidDataUri(uri.chars().take(40).collect());
    let rest = uri.strip_prefix("data:").ok_or_else(invalid)?;
    let (meta, payload) = rest.split_once(',').ok_or_else(invalid)?;
    let media_type = meta.strip_suffix(";base64").ok_or_else(invalid)?;
    let bytes = base64::engine::general_purpose::STANDARD.decode(payload).map_err(|_| invalid())?;
    Ok((media_type.to_string(), bytes))
}

pub fn image_at(images: &[String], index: usize) -> Result<(String, Vec<u8>), ExportError> {
    let uri = images.get(index).ok_or(ExportError::ImageIndex(index))?;
    decode_data_uri(uri)
}

/// Writes every image under `dir`, pausing between files the same way the browser
/// downloads are staggered.
pub async fn write_downloads(dir: &Path, images: &[String], prefix: ImagePrefix) -> Result<Vec<String>, anyhow::Error> {
    tokio::fs::create_dir_all(dir).await?;
    let mut written = Vec::with_capacity(images.len());
    for (item, image) in download_plan(images.len(), prefix).into_iter().zip(images) {
        if item.index > 0 {
            tokio::time::sleep(DOWNLOAD_STAGGER).await;
        }
        let (_, bytes) = decode_data_uri(image)?;
        tokio::fs::write(dir.join(&item.file_name), bytes).await?;
        info!("💾 Wrote {}", item.file_name);
        written.push(item.file_name);
    }
    Ok(written)
}

/// Text-only PDF of the listing.
pub fn listing_pdf(text: &GeneratedTextContent) -> Vec<u8> {
    let (doc, page, layer) = PdfDocument::new(
        format!("Listing: {}", truncate(&text.name, 48)),
        Mm(210.0),
        Mm(297.0),
        "Layer 1",
    );
    let mut buf: Vec<u8> = Vec::new();
    let Ok(font) = doc.add_builtin_font(BuiltinFont::Helvetica) else {
        return buf;
    };
    let layer_ref = doc.get_page(page).get_layer(layer);

    let mut y = 275.0;
    let line = |s: &str, size: f32, y: &mut f32| {
        layer_ref.use_text(s, size, Mm(15.0), Mm(*y), &font);
        *y -= if size > 12.0 { 12.0 } else { 7.0 };
    };
    line(&truncate(&text.name, 60), 20.0, &mut y);
    line(&truncate(&text.title, 120), 11.0, &mut y);
    for chunk in wrap(&text.description, 95) {
        line(&chunk, 10.0, &mut y);
    }
    line("Highlights", 14.0, &mut y);
    for h in &text.highlights {
        line(&format!("- {}", truncate(h, 110)), 10.0, &mut y);
    }
    line("Benefits", 14.0, &mut y);
    for b in &text.benefits {
        line(&format!("- {}", truncate(b, 110)), 10.0, &mut y);
    }

    {
        let mut writer = BufWriter::new(&mut buf);
        doc.save(&mut writer).ok();
    }
    buf
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max { s.to_string() } else { format!("{}…", s.chars().take(max).collect::<String>()) }
}

fn wrap(s: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in s.split_whitespace() {
        if !current.is_empty() && current.chars().count() + word.chars().count() + 1 > width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}
