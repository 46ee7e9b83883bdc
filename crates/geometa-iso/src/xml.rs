//! ISO 19139 XML encoding
//!
//! Elements are written in schema order. Everything except `gmd:dateStamp`
//! is a pure function of the record, so two runs with the same timestamp
//! produce identical bytes.

use geometa_core::models::record::{Extent, ResponsibleParty, ISO_SCHEMA_LOCATION};
use geometa_core::models::{ArtifactKind, MetadataRecord};
use geometa_core::profile::{format_number, KeywordGroup};
use geometa_core::{MetadataError, Result};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

pub const CODE_LIST_CATALOGUE: &str =
    "http://standards.iso.org/iso/19139/resources/gmxCodelists.xml";

const LANGUAGE_CODE_LIST: &str = "http://www.loc.gov/standards/iso639-2/";

/// Encode a record as a `gmd:MD_Metadata` document
pub fn write_record(record: &MetadataRecord) -> Result<Vec<u8>> {
    let mut doc = IsoDocument::new();
    doc.metadata(record)?;
    Ok(doc.finish())
}

struct IsoDocument {
    writer: Writer<Vec<u8>>,
}

impl IsoDocument {
    fn new() -> Self {
        Self { writer: Writer::new_with_indent(Vec::new(), b' ', 2) }
    }

    fn finish(self) -> Vec<u8> {
        let mut bytes = self.writer.into_inner();
        bytes.push(b'\n');
        bytes
    }

    fn event(&mut self, event: Event<'_>) -> Result<()> {
        self.writer
            .write_event(event)
            .map_err(|e| MetadataError::export(ArtifactKind::Xml, e))
    }

    fn start(&mut self, name: &str) -> Result<()> {
        self.event(Event::Start(BytesStart::new(name)))
    }

    fn start_with(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<()> {
        let mut start = BytesStart::new(name);
        for attribute in attributes {
            start.push_attribute(*attribute);
        }
        self.event(Event::Start(start))
    }

    fn end(&mut self, name: &str) -> Result<()> {
        self.event(Event::End(BytesEnd::new(name)))
    }

    fn empty(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<()> {
        let mut start = BytesStart::new(name);
        for attribute in attributes {
            start.push_attribute(*attribute);
        }
        self.event(Event::Empty(start))
    }

    fn text(&mut self, text: &str) -> Result<()> {
        self.event(Event::Text(BytesText::new(text)))
    }

    /// `<name>` around whatever `body` writes
    fn wrap(&mut self, name: &str, body: impl FnOnce(&mut Self) -> Result<()>) -> Result<()> {
        self.start(name)?;
        body(self)?;
        self.end(name)
    }

    fn leaf(&mut self, name: &str, attributes: &[(&str, &str)], text: &str) -> Result<()> {
        self.start_with(name, attributes)?;
        self.text(text)?;
        self.end(name)
    }

    fn string(&mut self, name: &str, value: &str) -> Result<()> {
        self.wrap(name, |d| d.leaf("gco:CharacterString", &[], value))
    }

    fn opt_string(&mut self, name: &str, value: Option<&str>) -> Result<()> {
        match value {
            Some(value) => self.string(name, value),
            None => Ok(()),
        }
    }

    fn typed(&mut self, name: &str, gco_type: &str, value: &str) -> Result<()> {
        self.wrap(name, |d| d.leaf(gco_type, &[], value))
    }

    fn code(&mut self, name: &str, code_list: &str, value: &str) -> Result<()> {
        let list_uri = format!("{}#{}", CODE_LIST_CATALOGUE, code_list);
        self.wrap(name, |d| {
            d.leaf(
                &format!("gmd:{}", code_list),
                &[("codeList", list_uri.as_str()), ("codeListValue", value)],
                value,
            )
        })
    }

    fn language(&mut self, name: &str, code: &str) -> Result<()> {
        self.wrap(name, |d| {
            d.leaf(
                "gmd:LanguageCode",
                &[("codeList", LANGUAGE_CODE_LIST), ("codeListValue", code)],
                code,
            )
        })
    }

    fn nil(&mut self, name: &str, reason: &str) -> Result<()> {
        self.empty(name, &[("gco:nilReason", reason)])
    }

    fn metadata(&mut self, record: &MetadataRecord) -> Result<()> {
        self.event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

        let xmlns: Vec<(String, &str)> = record
            .namespaces
            .iter()
            .map(|(prefix, uri)| (format!("xmlns:{}", prefix), uri.as_str()))
            .collect();
        let mut root: Vec<(&str, &str)> = xmlns.iter().map(|(k, v)| (k.as_str(), *v)).collect();
        root.push(("xsi:schemaLocation", ISO_SCHEMA_LOCATION));
        self.start_with("gmd:MD_Metadata", &root)?;

        self.string("gmd:fileIdentifier", &record.file_identifier.to_string())?;
        self.language("gmd:language", &record.language)?;
        self.code("gmd:characterSet", "MD_CharacterSetCode", &record.character_set)?;
        self.code("gmd:hierarchyLevel", "MD_ScopeCode", &record.hierarchy_level)?;
        self.wrap("gmd:contact", |d| d.responsible_party(&record.contact))?;
        self.typed(
            "gmd:dateStamp",
            "gco:DateTime",
            &record.date_stamp.format("%Y-%m-%dT%H:%M:%S").to_string(),
        )?;
        self.string("gmd:metadataStandardName", &record.metadata_standard_name)?;
        self.string("gmd:metadataStandardVersion", &record.metadata_standard_version)?;

        self.wrap("gmd:spatialRepresentationInfo", |d| d.grid(record))?;
        self.wrap("gmd:referenceSystemInfo", |d| d.reference_system(record))?;
        self.wrap("gmd:identificationInfo", |d| d.identification(record))?;
        self.wrap("gmd:contentInfo", |d| d.content(record))?;
        self.wrap("gmd:distributionInfo", |d| d.distribution(record))?;
        self.wrap("gmd:dataQualityInfo", |d| d.data_quality(record))?;

        self.end("gmd:MD_Metadata")
    }

    fn responsible_party(&mut self, party: &ResponsibleParty) -> Result<()> {
        self.wrap("gmd:CI_ResponsibleParty", |d| {
            d.opt_string("gmd:individualName", party.individual_name.as_deref())?;
            d.string("gmd:organisationName", &party.organisation_name)?;
            d.opt_string("gmd:positionName", party.position_name.as_deref())?;
            if party.has_contact_info() {
                d.wrap("gmd:contactInfo", |d| d.contact(party))?;
            }
            d.code("gmd:role", "CI_RoleCode", &party.role)
        })
    }

    fn contact(&mut self, party: &ResponsibleParty) -> Result<()> {
        self.wrap("gmd:CI_Contact", |d| {
            if let Some(phone) = &party.phone {
                d.wrap("gmd:phone", |d| {
                    d.wrap("gmd:CI_Telephone", |d| d.string("gmd:voice", phone))
                })?;
            }

            let has_address = party.address.is_some()
                || party.city.is_some()
                || party.postal_code.is_some()
                || party.country.is_some()
                || party.email.is_some();
            if has_address {
                d.wrap("gmd:address", |d| {
                    d.wrap("gmd:CI_Address", |d| {
                        d.opt_string("gmd:deliveryPoint", party.address.as_deref())?;
                        d.opt_string("gmd:city", party.city.as_deref())?;
                        d.opt_string("gmd:postalCode", party.postal_code.as_deref())?;
                        d.opt_string("gmd:country", party.country.as_deref())?;
                        d.opt_string("gmd:electronicMailAddress", party.email.as_deref())
                    })
                })?;
            }

            if let Some(website) = &party.website {
                d.wrap("gmd:onlineResource", |d| {
                    d.wrap("gmd:CI_OnlineResource", |d| {
                        d.wrap("gmd:linkage", |d| d.leaf("gmd:URL", &[], website))
                    })
                })?;
            }
            Ok(())
        })
    }

    fn grid(&mut self, record: &MetadataRecord) -> Result<()> {
        let grid = &record.grid;
        self.wrap("gmd:MD_GridSpatialRepresentation", |d| {
            d.typed("gmd:numberOfDimensions", "gco:Integer", "2")?;
            for (axis, size, cell) in [
                ("column", grid.columns, grid.cell_size_x),
                ("row", grid.rows, grid.cell_size_y),
            ] {
                d.wrap("gmd:axisDimensionProperties", |d| {
                    d.wrap("gmd:MD_Dimension", |d| {
                        d.code("gmd:dimensionName", "MD_DimensionNameTypeCode", axis)?;
                        d.typed("gmd:dimensionSize", "gco:Integer", &size.to_string())?;
                        d.wrap("gmd:resolution", |d| {
                            d.leaf("gco:Measure", &[("uom", grid.unit.as_str())], &format_number(cell))
                        })
                    })
                })?;
            }
            d.code("gmd:cellGeometry", "MD_CellGeometryCode", grid.cell_geometry.code())?;
            d.typed("gmd:transformationParameterAvailability", "gco:Boolean", "true")
        })
    }

    fn reference_system(&mut self, record: &MetadataRecord) -> Result<()> {
        let srs = &record.reference_system;
        self.wrap("gmd:MD_ReferenceSystem", |d| {
            d.wrap("gmd:referenceSystemIdentifier", |d| {
                d.wrap("gmd:RS_Identifier", |d| match srs.epsg {
                    Some(code) => {
                        d.string("gmd:code", &code.to_string())?;
                        d.string("gmd:codeSpace", "EPSG")
                    }
                    None => d.string("gmd:code", &srs.identifier()),
                })
            })
        })
    }

    fn identification(&mut self, record: &MetadataRecord) -> Result<()> {
        let id = &record.identification;
        self.wrap("gmd:MD_DataIdentification", |d| {
            d.wrap("gmd:citation", |d| {
                d.wrap("gmd:CI_Citation", |d| {
                    d.string("gmd:title", &id.title)?;
                    match id.citation_date {
                        Some(date) => d.wrap("gmd:date", |d| {
                            d.ci_date(&date.format("%Y-%m-%d").to_string(), "revision")
                        }),
                        None => d.nil("gmd:date", "unknown"),
                    }
                })
            })?;
            d.string("gmd:abstract", &id.abstract_text)?;
            d.opt_string("gmd:purpose", id.purpose.as_deref())?;
            d.wrap("gmd:pointOfContact", |d| d.responsible_party(&id.point_of_contact))?;

            if let Some(graphic) = &id.browse_graphic {
                d.wrap("gmd:graphicOverview", |d| {
                    d.wrap("gmd:MD_BrowseGraphic", |d| {
                        d.string("gmd:fileName", &graphic.file_name)?;
                        d.string("gmd:fileDescription", &graphic.description)?;
                        d.string("gmd:fileType", &graphic.file_type)
                    })
                })?;
            }

            for group in &id.keywords {
                d.wrap("gmd:descriptiveKeywords", |d| d.keywords(group))?;
            }

            if let Some(limitation) = &id.use_limitation {
                d.wrap("gmd:resourceConstraints", |d| {
                    d.wrap("gmd:MD_Constraints", |d| d.string("gmd:useLimitation", limitation))
                })?;
            }
            if let Some(constraints) = &id.access_constraints {
                d.wrap("gmd:resourceConstraints", |d| {
                    d.wrap("gmd:MD_LegalConstraints", |d| {
                        d.code("gmd:accessConstraints", "MD_RestrictionCode", "otherRestrictions")?;
                        d.string("gmd:otherConstraints", constraints)
                    })
                })?;
            }

            d.code("gmd:spatialRepresentationType", "MD_SpatialRepresentationTypeCode", "grid")?;
            d.wrap("gmd:spatialResolution", |d| {
                d.wrap("gmd:MD_Resolution", |d| {
                    d.wrap("gmd:distance", |d| {
                        d.leaf(
                            "gco:Distance",
                            &[("uom", id.resolution_unit.as_str())],
                            &format_number(id.spatial_resolution),
                        )
                    })
                })
            })?;
            d.language("gmd:language", &id.language)?;
            d.code("gmd:characterSet", "MD_CharacterSetCode", &record.character_set)?;
            for category in &id.topic_categories {
                d.wrap("gmd:topicCategory", |d| d.leaf("gmd:MD_TopicCategoryCode", &[], category))?;
            }
            d.wrap("gmd:extent", |d| d.extent(&id.extent))
        })
    }

    fn ci_date(&mut self, date: &str, date_type: &str) -> Result<()> {
        self.wrap("gmd:CI_Date", |d| {
            d.typed("gmd:date", "gco:Date", date)?;
            d.code("gmd:dateType", "CI_DateTypeCode", date_type)
        })
    }

    fn keywords(&mut self, group: &KeywordGroup) -> Result<()> {
        self.wrap("gmd:MD_Keywords", |d| {
            for keyword in &group.keywords {
                d.string("gmd:keyword", keyword)?;
            }
            d.code("gmd:type", "MD_KeywordTypeCode", group.keyword_type.code())?;
            if let Some(thesaurus) = &group.thesaurus {
                d.wrap("gmd:thesaurusName", |d| {
                    d.wrap("gmd:CI_Citation", |d| {
                        d.string("gmd:title", &thesaurus.title)?;
                        match thesaurus.date {
                            Some(date) => d.wrap("gmd:date", |d| {
                                d.ci_date(&date.format("%Y-%m-%d").to_string(), "publication")
                            }),
                            None => d.nil("gmd:date", "unknown"),
                        }
                    })
                })?;
            }
            Ok(())
        })
    }

    fn extent(&mut self, extent: &Extent) -> Result<()> {
        self.wrap("gmd:EX_Extent", |d| {
            d.string("gmd:description", &extent.description)?;

            if let Some(bbox) = &extent.geographic {
                d.wrap("gmd:geographicElement", |d| {
                    d.wrap("gmd:EX_GeographicBoundingBox", |d| {
                        d.typed("gmd:westBoundLongitude", "gco:Decimal", &format_number(bbox.west))?;
                        d.typed("gmd:eastBoundLongitude", "gco:Decimal", &format_number(bbox.east))?;
                        d.typed("gmd:southBoundLatitude", "gco:Decimal", &format_number(bbox.south))?;
                        d.typed("gmd:northBoundLatitude", "gco:Decimal", &format_number(bbox.north))
                    })
                })?;
            }

            if let Some(range) = &extent.vertical {
                d.wrap("gmd:verticalElement", |d| {
                    d.wrap("gmd:EX_VerticalExtent", |d| {
                        d.typed("gmd:minimumValue", "gco:Real", &format_number(range.min))?;
                        d.typed("gmd:maximumValue", "gco:Real", &format_number(range.max))?;
                        d.nil("gmd:verticalCRS", "unknown")
                    })
                })?;
            }
            Ok(())
        })
    }

    fn content(&mut self, record: &MetadataRecord) -> Result<()> {
        let content = &record.content;
        self.wrap("gmd:MD_CoverageDescription", |d| {
            d.typed("gmd:attributeDescription", "gco:RecordType", &content.sample_format)?;
            d.code("gmd:contentType", "MD_CoverageContentTypeCode", &content.content_type)?;
            if let Some(range) = &content.value_range {
                d.wrap("gmd:dimension", |d| {
                    d.wrap("gmd:MD_Band", |d| {
                        d.typed("gmd:maxValue", "gco:Real", &format_number(range.max))?;
                        d.typed("gmd:minValue", "gco:Real", &format_number(range.min))
                    })
                })?;
            }
            Ok(())
        })
    }

    fn distribution(&mut self, record: &MetadataRecord) -> Result<()> {
        let distribution = &record.distribution;
        self.wrap("gmd:MD_Distribution", |d| {
            d.wrap("gmd:distributionFormat", |d| {
                d.wrap("gmd:MD_Format", |d| {
                    d.string("gmd:name", &distribution.format_name)?;
                    d.string("gmd:version", &distribution.format_version)
                })
            })?;
            d.wrap("gmd:transferOptions", |d| {
                d.wrap("gmd:MD_DigitalTransferOptions", |d| {
                    d.typed(
                        "gmd:transferSize",
                        "gco:Real",
                        &format_number(distribution.transfer_size_mb),
                    )
                })
            })
        })
    }

    fn data_quality(&mut self, record: &MetadataRecord) -> Result<()> {
        self.wrap("gmd:DQ_DataQuality", |d| {
            d.wrap("gmd:scope", |d| {
                d.wrap("gmd:DQ_Scope", |d| d.code("gmd:level", "MD_ScopeCode", &record.hierarchy_level))
            })?;
            d.wrap("gmd:lineage", |d| {
                d.wrap("gmd:LI_Lineage", |d| d.string("gmd:statement", &record.lineage))
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use geo::{coord, Rect};
    use geometa_core::models::{
        CellGeometry, CrsKind, DatasetReference, DatasetType, RasterProperties, RecordInput,
        Resolution, SpatialReference, ValueRange,
    };
    use geometa_core::OrganizationProfile;
    use proptest::prelude::*;
    use quick_xml::Reader;
    use std::path::PathBuf;

    fn record() -> MetadataRecord {
        let dataset = DatasetReference {
            path: PathBuf::from("/data/MDT05-0559.tif"),
            base_name: "MDT05-0559".to_string(),
            dataset_type: DatasetType::Terrain,
            properties: RasterProperties {
                width: 2000,
                height: 1500,
                band_count: 1,
                sample_format: "float32".to_string(),
                bits_per_sample: 32,
                spatial_reference: SpatialReference::from_epsg(25830, CrsKind::Projected),
                extent: Rect::new(
                    coord! { x: 430_000.0, y: 4_465_000.0 },
                    coord! { x: 440_000.0, y: 4_472_500.0 },
                ),
                resolution: Resolution { x: 5.0, y: 5.0 },
                nodata: Some(-9999.0),
                cell_geometry: CellGeometry::Area,
                format_name: "GeoTIFF".to_string(),
                file_size: 12_000_000,
                modified: NaiveDate::from_ymd_opt(2023, 11, 20),
            },
        };
        MetadataRecord::assemble(RecordInput {
            dataset: &dataset,
            profile: &OrganizationProfile::default(),
            value_range: Some(ValueRange { min: 512.5, max: 874.0 }),
            browse_graphic: None,
            generated_at: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
        })
    }

    /// Text of every element whose parent is `parent`, in document order
    fn texts_under(xml: &[u8], parent: &str) -> Vec<String> {
        let mut reader = Reader::from_reader(xml);
        reader.config_mut().trim_text(true);
        let mut buf = Vec::new();
        let mut stack: Vec<String> = Vec::new();
        let mut texts = Vec::new();

        loop {
            match reader.read_event_into(&mut buf).unwrap() {
                Event::Start(e) => {
                    stack.push(String::from_utf8(e.name().as_ref().to_vec()).unwrap());
                }
                Event::End(_) => {
                    stack.pop();
                }
                Event::Text(e) => {
                    if stack.len() >= 2 && stack[stack.len() - 2] == parent {
                        texts.push(e.unescape().unwrap().into_owned());
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        assert!(stack.is_empty(), "unclosed elements: {:?}", stack);
        texts
    }

    #[test]
    fn test_document_is_well_formed_and_ordered() {
        let xml = write_record(&record()).unwrap();
        let text = String::from_utf8(xml.clone()).unwrap();

        assert!(text.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(text.contains("xmlns:gmd=\"http://www.isotc211.org/2005/gmd\""));

        let sections = [
            "<gmd:fileIdentifier>",
            "<gmd:dateStamp>",
            "<gmd:spatialRepresentationInfo>",
            "<gmd:referenceSystemInfo>",
            "<gmd:identificationInfo>",
            "<gmd:contentInfo>",
            "<gmd:distributionInfo>",
            "<gmd:dataQualityInfo>",
        ];
        let positions: Vec<usize> = sections.iter().map(|s| text.find(s).unwrap()).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));

        assert_eq!(texts_under(&xml, "gmd:dateStamp"), vec!["2024-03-01T12:00:00"]);
    }

    #[test]
    fn test_encodes_record_fields() {
        let record = record();
        let xml = write_record(&record).unwrap();

        assert_eq!(
            texts_under(&xml, "gmd:fileIdentifier"),
            vec![record.file_identifier.to_string()]
        );
        assert_eq!(texts_under(&xml, "gmd:code"), vec!["25830"]);
        assert_eq!(texts_under(&xml, "gmd:codeSpace"), vec!["EPSG"]);
        assert_eq!(texts_under(&xml, "gmd:dimensionSize"), vec!["2000", "1500"]);
        assert_eq!(texts_under(&xml, "gmd:maxValue"), vec!["874"]);
        assert_eq!(texts_under(&xml, "gmd:minValue"), vec!["512.5"]);
        assert_eq!(texts_under(&xml, "gmd:keyword"), vec![
            "Elevation",
            "MDT",
            "digital terrain model",
            "elevation",
        ]);
        assert_eq!(texts_under(&xml, "gmd:date"), vec!["2023-11-20", "2008-06-01"]);
        assert_eq!(texts_under(&xml, "gmd:topicCategory"), vec!["elevation"]);
        assert_eq!(texts_under(&xml, "gmd:statement"), vec![record.lineage.clone()]);
    }

    #[test]
    fn test_optional_sections() {
        let mut record = record();
        record.identification.citation_date = None;
        record.identification.browse_graphic = None;
        record.content.value_range = None;
        record.identification.extent.vertical = None;

        let text = String::from_utf8(write_record(&record).unwrap()).unwrap();
        assert!(text.contains("<gmd:date gco:nilReason=\"unknown\"/>"));
        assert!(!text.contains("gmd:graphicOverview"));
        assert!(!text.contains("gmd:MD_Band"));
        assert!(!text.contains("gmd:verticalElement"));
    }

    #[test]
    fn test_browse_graphic() {
        let mut record = record();
        record.identification.browse_graphic = Some(geometa_core::models::BrowseGraphic {
            file_name: "MDT05-0559.png".to_string(),
            description: "Thumbnail".to_string(),
            file_type: "image/png".to_string(),
        });

        let xml = write_record(&record).unwrap();
        assert_eq!(texts_under(&xml, "gmd:fileName"), vec!["MDT05-0559.png"]);
        assert_eq!(texts_under(&xml, "gmd:fileType"), vec!["image/png"]);
    }

    proptest! {
        #[test]
        fn prop_text_is_escaped(title in "[a-zA-Z<>&\"'][a-zA-Z<>&\"' ]{0,30}[a-zA-Z<>&\"']") {
            let mut record = record();
            record.identification.title = title.clone();

            let xml = write_record(&record).unwrap();
            let titles = texts_under(&xml, "gmd:title");
            prop_assert_eq!(&titles[0], &title);
        }
    }
}
