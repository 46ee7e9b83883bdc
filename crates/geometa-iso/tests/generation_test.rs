//! End-to-end generation over real GeoTIFF fixtures

use chrono::{TimeZone, Utc};
use geometa_core::models::{ArtifactKind, ThumbnailFormat, ThumbnailOptions};
use geometa_core::naming::OutputNaming;
use geometa_core::{MetadataOrchestrator, OrganizationProfile};
use geometa_iso::Iso19139Serializer;
use geometa_raster::GeoTiffInspector;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tiff::encoder::{colortype, TiffEncoder};
use tiff::tags::Tag;

type Orchestrator = MetadataOrchestrator<GeoTiffInspector, Iso19139Serializer>;

fn orchestrator(profile: OrganizationProfile) -> Orchestrator {
    MetadataOrchestrator::new(GeoTiffInspector::new(), Iso19139Serializer::new(), profile).unwrap()
}

fn write_terrain(path: &Path) {
    let data: Vec<f32> = (0..32 * 24)
        .map(|i| if i == 5 { -9999.0 } else { 600.0 + (i % 97) as f32 * 0.5 })
        .collect();

    let mut file = File::create(path).unwrap();
    let mut encoder = TiffEncoder::new(&mut file).unwrap();
    let mut image = encoder.new_image::<colortype::Gray32Float>(32, 24).unwrap();
    image.encoder().write_tag(Tag::ModelPixelScaleTag, &[5.0f64, 5.0, 0.0][..]).unwrap();
    image
        .encoder()
        .write_tag(Tag::ModelTiepointTag, &[0.0f64, 0.0, 0.0, 440_000.0, 4_474_020.0, 0.0][..])
        .unwrap();
    image
        .encoder()
        .write_tag(
            Tag::GeoKeyDirectoryTag,
            &[1u16, 1, 0, 3, 1024, 0, 1, 1, 1025, 0, 1, 1, 3072, 0, 1, 25830][..],
        )
        .unwrap();
    image.encoder().write_tag(Tag::GdalNodata, "-9999").unwrap();
    image.write_data(&data).unwrap();
}

fn write_orthoimage(dir: &Path, stem: &str) -> PathBuf {
    let path = dir.join(format!("{}.tif", stem));
    let data: Vec<u8> = (0..16 * 16 * 3).map(|i| (i * 7 % 256) as u8).collect();
    let mut file = File::create(&path).unwrap();
    let mut encoder = TiffEncoder::new(&mut file).unwrap();
    encoder.write_image::<colortype::RGB8>(16, 16, &data).unwrap();

    fs::write(dir.join(format!("{}.tfw", stem)), "0.25\n0\n0\n-0.25\n430000.125\n4472499.875\n").unwrap();
    fs::write(
        dir.join(format!("{}.prj", stem)),
        r#"PROJCS["ETRS89 / UTM zone 30N",GEOGCS["ETRS89"],AUTHORITY["EPSG","25830"]]"#,
    )
    .unwrap();
    path
}

fn element_texts(xml: &[u8], parent: &str) -> Vec<String> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut stack: Vec<String> = Vec::new();
    let mut texts = Vec::new();

    loop {
        match reader.read_event_into(&mut buf).unwrap() {
            Event::Start(e) => stack.push(String::from_utf8(e.name().as_ref().to_vec()).unwrap()),
            Event::End(_) => {
                stack.pop();
            }
            Event::Text(e) if stack.len() >= 2 && stack[stack.len() - 2] == parent => {
                texts.push(e.unescape().unwrap().into_owned());
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    texts
}

#[test]
fn test_generates_all_three_artifacts() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("MDT05-0559.tif");
    write_terrain(&input);

    let report = orchestrator(OrganizationProfile::default()).generate(&input, "terrain").unwrap();

    assert!(report.is_complete(), "failures: {:?}", report.failures());
    let xml = fs::read(dir.path().join("MDT05-0559.xml")).unwrap();
    let png = fs::read(dir.path().join("MDT05-0559.png")).unwrap();
    let pdf = fs::read(dir.path().join("MDT05-0559.pdf")).unwrap();

    assert_eq!(element_texts(&xml, "gmd:code"), vec!["25830"]);
    assert_eq!(element_texts(&xml, "gmd:fileName"), vec!["MDT05-0559.png"]);
    assert_eq!(element_texts(&xml, "gmd:minValue"), vec!["600"]);

    let thumbnail = image::load_from_memory(&png).unwrap();
    assert_eq!((thumbnail.width(), thumbnail.height()), (32, 24));

    assert!(pdf.starts_with(b"%PDF-"));
    let document = lopdf::Document::load_mem(&pdf).unwrap();
    assert_eq!(document.get_pages().len(), 1);
}

#[test]
fn test_xml_is_byte_identical_for_a_fixed_timestamp() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("MDT05-0559.tif");
    write_terrain(&input);
    let xml_path = dir.path().join("MDT05-0559.xml");
    let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
    let orch = orchestrator(OrganizationProfile::default());

    orch.generate_at(&input, "terrain", at).unwrap();
    let first = fs::read(&xml_path).unwrap();
    orch.generate_at(&input, "terrain", at).unwrap();
    let second = fs::read(&xml_path).unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_only_date_stamp_changes_between_runs() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("MDT05-0559.tif");
    write_terrain(&input);
    let xml_path = dir.path().join("MDT05-0559.xml");
    let orch = orchestrator(OrganizationProfile::default());

    orch.generate_at(&input, "terrain", Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap())
        .unwrap();
    let first = fs::read_to_string(&xml_path).unwrap();
    orch.generate_at(&input, "terrain", Utc.with_ymd_and_hms(2025, 1, 2, 8, 30, 0).unwrap())
        .unwrap();
    let second = fs::read_to_string(&xml_path).unwrap();

    let changed: Vec<(&str, &str)> =
        first.lines().zip(second.lines()).filter(|(a, b)| a != b).collect();
    assert_eq!(first.lines().count(), second.lines().count());
    assert_eq!(changed.len(), 1);
    assert!(changed[0].0.contains("2024-03-01T12:00:00"));
    assert!(changed[0].1.contains("2025-01-02T08:30:00"));
}

#[test]
fn test_orthoimage_keywords_follow_its_preset() {
    let dir = TempDir::new().unwrap();
    let input = write_orthoimage(dir.path(), "PNOA_0559");
    let out = dir.path().join("out");
    let profile = OrganizationProfile::default();
    let expected: Vec<String> = profile
        .presets
        .orthoimage
        .all_keywords()
        .into_iter()
        .map(str::to_string)
        .collect();

    let orch = orchestrator(profile)
        .with_naming(OutputNaming::in_directory(&out))
        .with_thumbnail_options(ThumbnailOptions { max_edge: 8, format: ThumbnailFormat::Jpeg });
    let report = orch.generate(&input, "orthoimage").unwrap();

    assert!(report.is_complete());
    assert_eq!(report.written_path(ArtifactKind::Thumbnail), Some(out.join("PNOA_0559.jpg").as_path()));

    let xml = fs::read(out.join("PNOA_0559.xml")).unwrap();
    assert_eq!(element_texts(&xml, "gmd:keyword"), expected);
    assert_eq!(element_texts(&xml, "gmd:fileType"), vec!["image/jpeg"]);

    let jpeg = image::load_from_memory(&fs::read(out.join("PNOA_0559.jpg")).unwrap()).unwrap();
    assert_eq!((jpeg.width(), jpeg.height()), (8, 8));
}

#[test]
fn test_long_lineage_spans_pages() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("MDT05-0559.tif");
    write_terrain(&input);

    let mut profile = OrganizationProfile::default();
    profile.presets.terrain.lineage =
        "Ground points were filtered, classified and interpolated. ".repeat(600);

    let report = orchestrator(profile).generate(&input, "terrain").unwrap();
    let pdf = fs::read(report.written_path(ArtifactKind::Pdf).unwrap()).unwrap();

    let document = lopdf::Document::load_mem(&pdf).unwrap();
    assert!(document.get_pages().len() > 1);
}
