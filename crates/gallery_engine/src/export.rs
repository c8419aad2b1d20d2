use std::io::Cursor;
use std::path::PathBuf;

use gallery_core::FilterKind;
use gallery_logging::gallery_info;
use image::{ImageFormat, RgbaImage};
use serde_json::json;

use crate::filename::{export_filename, sidecar_filename};
use crate::persist::{AtomicFileWriter, PersistError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRequest {
    pub title: String,
    pub source_url: String,
    pub filter: FilterKind,
    pub exported_utc: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub image_path: PathBuf,
    pub sidecar_path: PathBuf,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("encode error: {0}")]
    Encode(#[from] image::ImageError),
    #[error("persist error: {0}")]
    Persist(#[from] PersistError),
}

/// Writes the raster as PNG plus a JSON sidecar describing where it came from.
///
/// Both files are written atomically. The image lands first so a sidecar never
/// points at a missing file.
pub fn export_image(
    writer: &AtomicFileWriter,
    raster: &RgbaImage,
    request: &ExportRequest,
) -> Result<ExportSummary, ExportError> {
    let mut png = Cursor::new(Vec::new());
    raster.write_to(&mut png, ImageFormat::Png)?;

    let filename = export_filename(&request.title, request.filter, &request.source_url);
    let image_path = writer.write(&filename, png.into_inner())?;

    let sidecar = json!({
        "source_url": request.source_url,
        "filter": request.filter.id(),
        "width": raster.width(),
        "height": raster.height(),
        "exported_utc": request.exported_utc,
    });
    let sidecar_path = writer.write(&sidecar_filename(&filename), sidecar.to_string())?;

    gallery_info!("Exported {} ({})", image_path.display(), request.filter);
    Ok(ExportSummary {
        image_path,
        sidecar_path,
        width: raster.width(),
        height: raster.height(),
    })
}
