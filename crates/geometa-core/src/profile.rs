//! Organization profile: constants and per-dataset-type metadata presets
//!
//! The profile is an immutable value handed to the orchestrator at
//! construction. It is either the built-in default or loaded from TOML.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use uuid::Uuid;

use crate::error::{MetadataError, Result};
use crate::models::{DatasetReference, DatasetType};

/// Namespace prefixes reserved for the ISO 19139 encoding itself
pub const RESERVED_PREFIXES: [&str; 6] = ["gmd", "gco", "gml", "gmx", "xlink", "xsi"];

/// XML name without a colon: a letter or '_', then letters, digits, '-', '_' or '.'
fn is_ncname(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

/// ISO 19115 MD_TopicCategoryCode values
pub const TOPIC_CATEGORIES: [&str; 19] = [
    "farming",
    "biota",
    "boundaries",
    "climatologyMeteorologyAtmosphere",
    "economy",
    "elevation",
    "environment",
    "geoscientificInformation",
    "health",
    "imageryBaseMapsEarthCover",
    "intelligenceMilitary",
    "inlandWaters",
    "location",
    "oceans",
    "planningCadastre",
    "society",
    "structure",
    "transportation",
    "utilitiesCommunication",
];

const DEFAULT_IDENTIFIER_NAMESPACE: Uuid = Uuid::from_u128(0x6f1c_2a8e_4b7d_5e90_a3c2_9d41_e07b_58f6);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganizationProfile {
    pub organization: Organization,
    pub presets: Presets,
}

/// Responsible party and encoding constants of the organization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub individual_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,

    /// ISO 639-2 code of the metadata language
    #[serde(default = "default_language")]
    pub language: String,

    /// Namespace for deriving stable file identifiers (UUID v5)
    #[serde(default = "default_identifier_namespace")]
    pub identifier_namespace: Uuid,

    /// Extra XML namespace declarations, prefix to URI
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub namespaces: BTreeMap<String, String>,
}

fn default_language() -> String {
    "eng".to_string()
}

fn default_identifier_namespace() -> Uuid {
    DEFAULT_IDENTIFIER_NAMESPACE
}

/// One preset per dataset type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Presets {
    pub terrain: DatasetPreset,
    pub orthoimage: DatasetPreset,
}

/// Templated identification fields and keywords for one dataset type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetPreset {
    pub title: String,

    #[serde(rename = "abstract")]
    pub abstract_text: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,

    #[serde(default)]
    pub topic_categories: Vec<String>,

    #[serde(default)]
    pub keywords: Vec<KeywordGroup>,

    pub lineage: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_limitation: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_constraints: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordGroup {
    pub keywords: Vec<String>,

    #[serde(default)]
    pub keyword_type: KeywordType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thesaurus: Option<Thesaurus>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thesaurus {
    pub title: String,

    /// Publication date of the thesaurus
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
}

/// ISO 19115 MD_KeywordTypeCode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeywordType {
    Discipline,
    Place,
    Stratum,
    Temporal,
    #[default]
    Theme,
}

impl KeywordType {
    pub fn code(&self) -> &'static str {
        match self {
            KeywordType::Discipline => "discipline",
            KeywordType::Place => "place",
            KeywordType::Stratum => "stratum",
            KeywordType::Temporal => "temporal",
            KeywordType::Theme => "theme",
        }
    }
}

impl OrganizationProfile {
    /// Load and validate a profile from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| MetadataError::ConfigInvalid {
            key: "profile".to_string(),
            reason: format!("Failed to read profile {}: {}", path.as_ref().display(), e),
        })?;

        let profile: OrganizationProfile =
            toml::from_str(&content).map_err(|e| MetadataError::ConfigInvalid {
                key: "profile".to_string(),
                reason: format!("Failed to parse TOML: {}", e),
            })?;

        profile.validate()?;
        Ok(profile)
    }

    /// Serialize to TOML, e.g. for a starter config file
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| MetadataError::ConfigInvalid {
            key: "profile".to_string(),
            reason: format!("Failed to serialize profile: {}", e),
        })
    }

    /// The preset for a dataset type
    pub fn preset(&self, dataset_type: DatasetType) -> &DatasetPreset {
        match dataset_type {
            DatasetType::Terrain => &self.presets.terrain,
            DatasetType::Orthoimage => &self.presets.orthoimage,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.organization.name.trim().is_empty() {
            return Err(MetadataError::ConfigMissing { key: "organization.name".to_string() });
        }

        let language = &self.organization.language;
        if language.len() != 3 || !language.chars().all(|c| c.is_ascii_lowercase()) {
            return Err(MetadataError::ConfigInvalid {
                key: "organization.language".to_string(),
                reason: format!("'{}' is not an ISO 639-2 code (e.g. eng, spa)", language),
            });
        }

        for (prefix, uri) in &self.organization.namespaces {
            if RESERVED_PREFIXES.contains(&prefix.as_str()) {
                return Err(MetadataError::ConfigInvalid {
                    key: format!("organization.namespaces.{}", prefix),
                    reason: "prefix is reserved for the ISO 19139 encoding".to_string(),
                });
            }
            if !is_ncname(prefix) || prefix.to_ascii_lowercase().starts_with("xml") {
                return Err(MetadataError::ConfigInvalid {
                    key: format!("organization.namespaces.{}", prefix),
                    reason: format!("'{}' is not a usable XML namespace prefix", prefix),
                });
            }
            if uri.trim().is_empty() {
                return Err(MetadataError::ConfigInvalid {
                    key: format!("organization.namespaces.{}", prefix),
                    reason: "namespace URI is empty".to_string(),
                });
            }
        }

        for dataset_type in DatasetType::ALL {
            self.preset(dataset_type).validate(dataset_type)?;
        }

        Ok(())
    }
}

impl DatasetPreset {
    fn validate(&self, dataset_type: DatasetType) -> Result<()> {
        let key = |field: &str| format!("presets.{}.{}", dataset_type.tag(), field);

        if self.title.trim().is_empty() {
            return Err(MetadataError::ConfigMissing { key: key("title") });
        }
        if self.abstract_text.trim().is_empty() {
            return Err(MetadataError::ConfigMissing { key: key("abstract") });
        }

        for category in &self.topic_categories {
            if !TOPIC_CATEGORIES.contains(&category.as_str()) {
                return Err(MetadataError::ConfigInvalid {
                    key: key("topic_categories"),
                    reason: format!("'{}' is not an ISO 19115 topic category", category),
                });
            }
        }

        for group in &self.keywords {
            if group.keywords.iter().any(|k| k.trim().is_empty()) || group.keywords.is_empty() {
                return Err(MetadataError::ConfigInvalid {
                    key: key("keywords"),
                    reason: "keyword groups must contain non-empty keywords".to_string(),
                });
            }
        }

        Ok(())
    }

    /// Every keyword of the preset, in declaration order
    pub fn all_keywords(&self) -> Vec<&str> {
        self.keywords.iter().flat_map(|g| g.keywords.iter().map(String::as_str)).collect()
    }
}

impl Default for OrganizationProfile {
    fn default() -> Self {
        let inspire_themes = |keyword: &str| KeywordGroup {
            keywords: vec![keyword.to_string()],
            keyword_type: KeywordType::Theme,
            thesaurus: Some(Thesaurus {
                title: "GEMET - INSPIRE themes, version 1.0".to_string(),
                date: NaiveDate::from_ymd_opt(2008, 6, 1),
            }),
        };

        Self {
            organization: Organization {
                name: "Cartographic Service".to_string(),
                individual_name: None,
                position_name: Some("Geographic Information Unit".to_string()),
                phone: None,
                email: Some("metadata@example.org".to_string()),
                address: None,
                city: None,
                postal_code: None,
                country: None,
                website: None,
                language: default_language(),
                identifier_namespace: DEFAULT_IDENTIFIER_NAMESPACE,
                namespaces: BTreeMap::new(),
            },
            presets: Presets {
                terrain: DatasetPreset {
                    title: "Digital terrain model {name}".to_string(),
                    abstract_text: "Digital terrain model (MDT) of sheet {name} with a grid spacing of {resolution}, {columns} x {rows} cells, in {crs}.".to_string(),
                    purpose: Some("Representation of the bare-earth ground elevation.".to_string()),
                    topic_categories: vec!["elevation".to_string()],
                    keywords: vec![
                        inspire_themes("Elevation"),
                        KeywordGroup {
                            keywords: vec![
                                "MDT".to_string(),
                                "digital terrain model".to_string(),
                                "elevation".to_string(),
                            ],
                            keyword_type: KeywordType::Theme,
                            thesaurus: None,
                        },
                    ],
                    lineage: "Interpolated from classified ground points and resampled to a regular grid.".to_string(),
                    use_limitation: Some("Attribution to the producing organization is required.".to_string()),
                    access_constraints: Some("No limitations on public access.".to_string()),
                },
                orthoimage: DatasetPreset {
                    title: "Orthoimage {name}".to_string(),
                    abstract_text: "Orthorectified image of sheet {name} with a ground sample distance of {resolution}, {bands} bands, in {crs}.".to_string(),
                    purpose: Some("Cartographic base imagery.".to_string()),
                    topic_categories: vec!["imageryBaseMapsEarthCover".to_string()],
                    keywords: vec![
                        inspire_themes("Orthoimagery"),
                        KeywordGroup {
                            keywords: vec![
                                "orthoimage".to_string(),
                                "orthophotography".to_string(),
                            ],
                            keyword_type: KeywordType::Theme,
                            thesaurus: None,
                        },
                    ],
                    lineage: "Aerial imagery orthorectified over the digital terrain model and mosaicked.".to_string(),
                    use_limitation: Some("Attribution to the producing organization is required.".to_string()),
                    access_constraints: Some("No limitations on public access.".to_string()),
                },
            },
        }
    }
}

/// Values substituted into preset templates
#[derive(Debug, Clone)]
pub struct TemplateContext {
    values: Vec<(&'static str, String)>,
}

impl TemplateContext {
    pub fn for_dataset(dataset: &DatasetReference) -> Self {
        let props = &dataset.properties;
        let resolution = format!(
            "{} {}",
            format_number(props.resolution.distance()),
            props.spatial_reference.resolution_unit()
        );

        Self {
            values: vec![
                ("name", dataset.base_name.clone()),
                ("type", dataset.dataset_type.label().to_string()),
                ("crs", props.spatial_reference.identifier()),
                ("resolution", resolution),
                ("columns", props.width.to_string()),
                ("rows", props.height.to_string()),
                ("bands", props.band_count.to_string()),
            ],
        }
    }

    /// Replace `{key}` placeholders; unknown placeholders are left as written
    pub fn render(&self, template: &str) -> String {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            match after.find('}') {
                Some(close) => {
                    let key = &after[..close];
                    match self.values.iter().find(|(k, _)| *k == key) {
                        Some((_, value)) => out.push_str(value),
                        None => {
                            out.push('{');
                            out.push_str(key);
                            out.push('}');
                        }
                    }
                    rest = &after[close + 1..];
                }
                None => {
                    out.push_str(&rest[open..]);
                    rest = "";
                }
            }
        }

        out.push_str(rest);
        out
    }
}

/// Format a measurement without trailing zeros (5.0 -> "5", 0.25 -> "0.25")
pub fn format_number(value: f64) -> String {
    let formatted = format!("{:.6}", value);
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    if trimmed.is_empty() || trimmed == "-" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}
