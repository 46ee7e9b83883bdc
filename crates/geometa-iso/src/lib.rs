//! ISO 19139 exporters for geometa
//!
//! [`Iso19139Serializer`] implements the core `MetadataSerializer` port:
//! XML through quick-xml, thumbnails through `image` and the PDF report
//! through lopdf.

pub mod pdf;
pub mod thumbnail;
pub mod xml;

use geometa_core::models::{MetadataRecord, RasterPreview, ThumbnailOptions};
use geometa_core::ports::MetadataSerializer;
use geometa_core::Result;
use tracing::debug;

/// Default exporter set
#[derive(Debug, Clone, Copy, Default)]
pub struct Iso19139Serializer;

impl Iso19139Serializer {
    pub fn new() -> Self {
        Self
    }
}

impl MetadataSerializer for Iso19139Serializer {
    fn to_xml(&self, record: &MetadataRecord) -> Result<Vec<u8>> {
        let bytes = xml::write_record(record)?;
        debug!(bytes = bytes.len(), "Encoded ISO 19139 XML");
        Ok(bytes)
    }

    fn to_thumbnail(
        &self,
        record: &MetadataRecord,
        preview: &RasterPreview,
        options: &ThumbnailOptions,
    ) -> Result<Vec<u8>> {
        let bytes = thumbnail::render_thumbnail(preview, &record.content.sample_format, options)?;
        debug!(bytes = bytes.len(), format = ?options.format, "Rendered thumbnail");
        Ok(bytes)
    }

    fn to_pdf(&self, record: &MetadataRecord) -> Result<Vec<u8>> {
        let bytes = pdf::write_record(record)?;
        debug!(bytes = bytes.len(), "Rendered PDF report");
        Ok(bytes)
    }
}
