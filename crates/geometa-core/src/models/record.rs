//! In-memory ISO 19115 metadata record
//!
//! A record is assembled once per invocation from the dataset properties and
//! the organization profile, then handed to each exporter unchanged.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::dataset::{CellGeometry, DatasetReference, DatasetType, SpatialReference, ValueRange};
use crate::geo::{geographic_bounds, GeographicBoundingBox};
use crate::profile::{
    format_number, KeywordGroup, Organization, OrganizationProfile, TemplateContext,
};

pub const METADATA_STANDARD_NAME: &str = "ISO 19115:2003/19139";
pub const METADATA_STANDARD_VERSION: &str = "1.0";

/// Namespaces every ISO 19139 document declares
pub const ISO_NAMESPACES: [(&str, &str); 6] = [
    ("gmd", "http://www.isotc211.org/2005/gmd"),
    ("gco", "http://www.isotc211.org/2005/gco"),
    ("gml", "http://www.opengis.net/gml/3.2"),
    ("gmx", "http://www.isotc211.org/2005/gmx"),
    ("xlink", "http://www.w3.org/1999/xlink"),
    ("xsi", "http://www.w3.org/2001/XMLSchema-instance"),
];

pub const ISO_SCHEMA_LOCATION: &str =
    "http://www.isotc211.org/2005/gmd http://schemas.opengis.net/iso/19139/20070417/gmd/gmd.xsd";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetadataRecord {
    pub file_identifier: Uuid,

    /// ISO 639-2 code
    pub language: String,

    pub character_set: String,

    /// MD_ScopeCode of the described resource
    pub hierarchy_level: String,

    pub contact: ResponsibleParty,

    /// Generation timestamp; the only value that differs between runs
    pub date_stamp: DateTime<Utc>,

    pub metadata_standard_name: String,
    pub metadata_standard_version: String,

    /// Prefix/URI pairs, ISO namespaces first then profile extras
    pub namespaces: Vec<(String, String)>,

    pub grid: GridRepresentation,

    pub reference_system: SpatialReference,

    pub identification: Identification,

    pub content: ContentDescription,

    pub distribution: Distribution,

    pub lineage: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponsibleParty {
    pub organisation_name: String,
    pub individual_name: Option<String>,
    pub position_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub website: Option<String>,

    /// CI_RoleCode
    pub role: String,
}

impl ResponsibleParty {
    fn from_organization(org: &Organization, role: &str) -> Self {
        Self {
            organisation_name: org.name.clone(),
            individual_name: org.individual_name.clone(),
            position_name: org.position_name.clone(),
            phone: org.phone.clone(),
            email: org.email.clone(),
            address: org.address.clone(),
            city: org.city.clone(),
            postal_code: org.postal_code.clone(),
            country: org.country.clone(),
            website: org.website.clone(),
            role: role.to_string(),
        }
    }

    pub fn has_contact_info(&self) -> bool {
        self.phone.is_some()
            || self.email.is_some()
            || self.address.is_some()
            || self.city.is_some()
            || self.postal_code.is_some()
            || self.country.is_some()
            || self.website.is_some()
    }
}

/// MD_GridSpatialRepresentation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridRepresentation {
    pub columns: u32,
    pub rows: u32,
    pub cell_size_x: f64,
    pub cell_size_y: f64,

    /// Unit of the cell sizes ("m" or "deg")
    pub unit: String,

    pub cell_geometry: CellGeometry,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Identification {
    pub title: String,

    /// Revision date of the resource, taken from the dataset file
    pub citation_date: Option<NaiveDate>,

    #[serde(rename = "abstract")]
    pub abstract_text: String,

    pub purpose: Option<String>,

    pub point_of_contact: ResponsibleParty,

    pub browse_graphic: Option<BrowseGraphic>,

    pub keywords: Vec<KeywordGroup>,

    pub use_limitation: Option<String>,

    pub access_constraints: Option<String>,

    /// Ground distance of one cell
    pub spatial_resolution: f64,

    pub resolution_unit: String,

    pub language: String,

    pub topic_categories: Vec<String>,

    pub extent: Extent,
}

/// MD_BrowseGraphic: the companion thumbnail
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BrowseGraphic {
    pub file_name: String,
    pub description: String,
    pub file_type: String,
}

/// EX_Extent
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Extent {
    /// Native-CRS bounds in words, always present
    pub description: String,

    pub geographic: Option<GeographicBoundingBox>,

    /// Elevation range, for terrain models
    pub vertical: Option<ValueRange>,
}

/// MD_CoverageDescription
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentDescription {
    /// MD_CoverageContentTypeCode
    pub content_type: String,

    pub band_count: u16,

    pub sample_format: String,

    pub value_range: Option<ValueRange>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Distribution {
    pub format_name: String,
    pub format_version: String,

    /// Transfer size in megabytes
    pub transfer_size_mb: f64,
}

/// Everything a record is assembled from
#[derive(Debug, Clone, Copy)]
pub struct RecordInput<'a> {
    pub dataset: &'a DatasetReference,
    pub profile: &'a OrganizationProfile,
    pub value_range: Option<ValueRange>,
    pub browse_graphic: Option<&'a BrowseGraphic>,
    pub generated_at: DateTime<Utc>,
}

impl MetadataRecord {
    pub fn assemble(input: RecordInput<'_>) -> Self {
        let RecordInput { dataset, profile, value_range, browse_graphic, generated_at } = input;
        let props = &dataset.properties;
        let org = &profile.organization;
        let preset = profile.preset(dataset.dataset_type);
        let context = TemplateContext::for_dataset(dataset);

        let file_name = dataset
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| dataset.base_name.clone());
        let identifier_seed = format!("{}:{}", dataset.dataset_type.tag(), file_name);
        let file_identifier = Uuid::new_v5(&org.identifier_namespace, identifier_seed.as_bytes());

        let mut namespaces: Vec<(String, String)> = ISO_NAMESPACES
            .iter()
            .map(|(prefix, uri)| (prefix.to_string(), uri.to_string()))
            .collect();
        namespaces.extend(org.namespaces.iter().map(|(p, u)| (p.clone(), u.clone())));

        let unit = props.spatial_reference.resolution_unit().to_string();
        let (min, max) = (props.extent.min(), props.extent.max());
        let extent = Extent {
            description: format!(
                "{} (min x, min y, max x, max y): {}, {}, {}, {}",
                props.spatial_reference.identifier(),
                format_number(min.x),
                format_number(min.y),
                format_number(max.x),
                format_number(max.y),
            ),
            geographic: geographic_bounds(&props.extent, &props.spatial_reference),
            vertical: match dataset.dataset_type {
                DatasetType::Terrain => value_range,
                DatasetType::Orthoimage => None,
            },
        };

        let content_type = match dataset.dataset_type {
            DatasetType::Terrain => "physicalMeasurement",
            DatasetType::Orthoimage => "image",
        };

        Self {
            file_identifier,
            language: org.language.clone(),
            character_set: "utf8".to_string(),
            hierarchy_level: "dataset".to_string(),
            contact: ResponsibleParty::from_organization(org, "pointOfContact"),
            date_stamp: generated_at,
            metadata_standard_name: METADATA_STANDARD_NAME.to_string(),
            metadata_standard_version: METADATA_STANDARD_VERSION.to_string(),
            namespaces,
            grid: GridRepresentation {
                columns: props.width,
                rows: props.height,
                cell_size_x: props.resolution.x,
                cell_size_y: props.resolution.y,
                unit: unit.clone(),
                cell_geometry: props.cell_geometry,
            },
            reference_system: props.spatial_reference.clone(),
            identification: Identification {
                title: context.render(&preset.title),
                citation_date: props.modified,
                abstract_text: context.render(&preset.abstract_text),
                purpose: preset.purpose.as_deref().map(|p| context.render(p)),
                point_of_contact: ResponsibleParty::from_organization(org, "originator"),
                browse_graphic: browse_graphic.cloned(),
                keywords: preset.keywords.clone(),
                use_limitation: preset.use_limitation.as_deref().map(|u| context.render(u)),
                access_constraints: preset.access_constraints.clone(),
                spatial_resolution: props.resolution.distance(),
                resolution_unit: unit,
                language: org.language.clone(),
                topic_categories: preset.topic_categories.clone(),
                extent,
            },
            content: ContentDescription {
                content_type: content_type.to_string(),
                band_count: props.band_count,
                sample_format: props.sample_format.clone(),
                value_range,
            },
            distribution: Distribution {
                format_name: props.format_name.clone(),
                format_version: "1.0".to_string(),
                transfer_size_mb: (props.file_size as f64 / 1_048_576.0 * 1000.0).round() / 1000.0,
            },
            lineage: context.render(&preset.lineage),
        }
    }

    /// Every keyword embedded in the record, in order
    pub fn keywords(&self) -> Vec<&str> {
        self.identification
            .keywords
            .iter()
            .flat_map(|g| g.keywords.iter().map(String::as_str))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CrsKind, RasterProperties, Resolution};
    use chrono::TimeZone;
    use geo::{coord, Rect};
    use std::path::PathBuf;

    fn dataset(dataset_type: DatasetType) -> DatasetReference {
        DatasetReference {
            path: PathBuf::from("/data/sheet_0559.tif"),
            base_name: "sheet_0559".to_string(),
            dataset_type,
            properties: RasterProperties {
                width: 2000,
                height: 1500,
                band_count: if dataset_type == DatasetType::Terrain { 1 } else { 3 },
                sample_format: "float32".to_string(),
                bits_per_sample: 32,
                spatial_reference: SpatialReference::from_epsg(25830, CrsKind::Projected),
                extent: Rect::new(
                    coord! { x: 430_000.0, y: 4_465_000.0 },
                    coord! { x: 440_000.0, y: 4_472_500.0 },
                ),
                resolution: Resolution { x: 5.0, y: 5.0 },
                nodata: None,
                cell_geometry: CellGeometry::Area,
                format_name: "GeoTIFF".to_string(),
                file_size: 2_097_152,
                modified: NaiveDate::from_ymd_opt(2023, 11, 20),
            },
        }
    }

    fn assemble(dataset: &DatasetReference, profile: &OrganizationProfile) -> MetadataRecord {
        MetadataRecord::assemble(RecordInput {
            dataset,
            profile,
            value_range: Some(ValueRange { min: 512.5, max: 874.0 }),
            browse_graphic: None,
            generated_at: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
        })
    }

    #[test]
    fn test_terrain_record_uses_terrain_preset() {
        let profile = OrganizationProfile::default();
        let record = assemble(&dataset(DatasetType::Terrain), &profile);

        assert_eq!(record.keywords(), profile.presets.terrain.all_keywords());
        assert_eq!(record.identification.title, "Digital terrain model sheet_0559");
        assert_eq!(record.identification.topic_categories, vec!["elevation"]);
        assert_eq!(record.content.content_type, "physicalMeasurement");
        assert_eq!(
            record.identification.extent.vertical,
            Some(ValueRange { min: 512.5, max: 874.0 })
        );
    }

    #[test]
    fn test_orthoimage_record_uses_orthoimage_preset() {
        let profile = OrganizationProfile::default();
        let record = assemble(&dataset(DatasetType::Orthoimage), &profile);

        assert_eq!(record.keywords(), profile.presets.orthoimage.all_keywords());
        assert!(!record.keywords().contains(&"Elevation"));
        assert_eq!(record.content.content_type, "image");
        assert_eq!(record.identification.extent.vertical, None);
    }

    #[test]
    fn test_file_identifier_is_stable_and_type_specific() {
        let profile = OrganizationProfile::default();
        let a = assemble(&dataset(DatasetType::Terrain), &profile);
        let b = assemble(&dataset(DatasetType::Terrain), &profile);
        let c = assemble(&dataset(DatasetType::Orthoimage), &profile);

        assert_eq!(a.file_identifier, b.file_identifier);
        assert_ne!(a.file_identifier, c.file_identifier);
    }

    #[test]
    fn test_file_identifier_includes_extension() {
        let profile = OrganizationProfile::default();
        let tif = dataset(DatasetType::Terrain);
        let mut tiff = dataset(DatasetType::Terrain);
        tiff.path = PathBuf::from("/data/sheet_0559.tiff");

        assert_ne!(assemble(&tif, &profile).file_identifier, assemble(&tiff, &profile).file_identifier);
    }

    #[test]
    fn test_namespaces_include_profile_extras() {
        let mut profile = OrganizationProfile::default();
        profile
            .organization
            .namespaces
            .insert("ign".to_string(), "http://www.ign.es/metadata".to_string());
        let record = assemble(&dataset(DatasetType::Terrain), &profile);

        assert_eq!(record.namespaces[0].0, "gmd");
        assert_eq!(record.namespaces.last().unwrap().0, "ign");
    }

    #[test]
    fn test_extent_and_grid() {
        let profile = OrganizationProfile::default();
        let record = assemble(&dataset(DatasetType::Terrain), &profile);

        assert_eq!(record.grid.columns, 2000);
        assert_eq!(record.grid.unit, "m");
        assert!(record.identification.extent.description.starts_with("EPSG:25830"));
        assert!(record.identification.extent.geographic.is_some());
        assert_eq!(record.distribution.transfer_size_mb, 2.0);
    }
}
