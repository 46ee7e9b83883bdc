use crate::error::Result;
use crate::models::{MetadataRecord, RasterPreview, RecordInput, ThumbnailOptions};

/// Port for building and exporting metadata records
///
/// Exporters return the encoded bytes; writing them to disk is the
/// orchestrator's job so every artifact lands the same way.
pub trait MetadataSerializer {
    /// Build the record for one dataset
    fn populate(&self, input: RecordInput<'_>) -> Result<MetadataRecord> {
        Ok(MetadataRecord::assemble(input))
    }

    /// Encode the record as an ISO 19139 XML document
    fn to_xml(&self, record: &MetadataRecord) -> Result<Vec<u8>>;

    /// Render the thumbnail from the dataset preview
    fn to_thumbnail(
        &self,
        record: &MetadataRecord,
        preview: &RasterPreview,
        options: &ThumbnailOptions,
    ) -> Result<Vec<u8>>;

    /// Render the record as a PDF document
    fn to_pdf(&self, record: &MetadataRecord) -> Result<Vec<u8>>;
}
