//! Inspect command implementation

use super::SUCCESS;
use crate::cli::InspectArgs;
use crate::output::OutputWriter;
use crate::output_types::InspectOutput;
use anyhow::Result;
use geometa_core::config::MAX_THUMBNAIL_SIZE;
use geometa_core::geo::geographic_bounds;
use geometa_core::ports::RasterInspector;
use geometa_core::profile::format_number;
use geometa_raster::GeoTiffInspector;
use tabled::Tabled;

#[derive(Tabled)]
struct PropertyRow {
    #[tabled(rename = "Property")]
    property: String,
    #[tabled(rename = "Value")]
    value: String,
}

impl PropertyRow {
    fn new(property: &str, value: impl ToString) -> Self {
        Self { property: property.to_string(), value: value.to_string() }
    }
}

pub fn execute(args: InspectArgs, output: &OutputWriter) -> Result<u8> {
    let inspector = GeoTiffInspector::new();
    let mut raster = inspector.open(&args.path)?;
    let properties = inspector.read_properties(&mut raster)?;
    let bounds = geographic_bounds(&properties.extent, &properties.spatial_reference);

    let value_range = if args.stats {
        let preview = inspector.read_preview(&mut raster, MAX_THUMBNAIL_SIZE)?;
        preview.value_range()
    } else {
        None
    };

    if output.is_json() {
        output.result(InspectOutput {
            path: args.path,
            properties,
            geographic_bounds: bounds,
            value_range,
        })?;
        return Ok(SUCCESS);
    }

    let (min, max) = (properties.extent.min(), properties.extent.max());
    let mut rows = vec![
        PropertyRow::new("Format", &properties.format_name),
        PropertyRow::new("Size", format!("{} x {} cells", properties.width, properties.height)),
        PropertyRow::new(
            "Bands",
            format!(
                "{} x {} ({} bit)",
                properties.band_count, properties.sample_format, properties.bits_per_sample
            ),
        ),
        PropertyRow::new("Spatial reference", properties.spatial_reference.identifier()),
        PropertyRow::new(
            "Extent",
            format!(
                "{}, {} : {}, {}",
                format_number(min.x),
                format_number(min.y),
                format_number(max.x),
                format_number(max.y)
            ),
        ),
        PropertyRow::new(
            "Resolution",
            format!(
                "{} x {} {}",
                format_number(properties.resolution.x),
                format_number(properties.resolution.y),
                properties.spatial_reference.resolution_unit()
            ),
        ),
        PropertyRow::new("Cell geometry", properties.cell_geometry.code()),
        PropertyRow::new(
            "Nodata",
            properties.nodata.map(format_number).unwrap_or_else(|| "-".to_string()),
        ),
        PropertyRow::new("File size", format!("{} bytes", properties.file_size)),
    ];

    if let Some(bbox) = bounds {
        rows.push(PropertyRow::new(
            "Geographic bounds",
            format!(
                "W {} E {} S {} N {}",
                format_number(bbox.west),
                format_number(bbox.east),
                format_number(bbox.south),
                format_number(bbox.north)
            ),
        ));
    }
    if let Some(date) = properties.modified {
        rows.push(PropertyRow::new("Modified", date));
    }
    if let Some(range) = value_range {
        rows.push(PropertyRow::new(
            "Value range",
            format!("{} to {}", format_number(range.min), format_number(range.max)),
        ));
    }

    output.section(args.path.display());
    output.table(rows);

    Ok(SUCCESS)
}
