//! Output file naming convention
//!
//! All three artifacts share one base name: the input's file stem, or its
//! full file name when another raster in the same directory has that stem.
//! They go to the configured output directory, or beside the input when
//! none is set.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{MetadataError, Result};
use crate::models::{ArtifactPaths, ThumbnailFormat};

/// Raster file extensions, compared case-insensitively
pub const RASTER_EXTENSIONS: [&str; 2] = ["tif", "tiff"];

pub fn is_raster_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| RASTER_EXTENSIONS.iter().any(|r| e.eq_ignore_ascii_case(r)))
        .unwrap_or(false)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputNaming {
    output_dir: Option<PathBuf>,
    source_root: Option<PathBuf>,
}

impl OutputNaming {
    /// Write artifacts beside each input dataset
    pub fn beside_input() -> Self {
        Self { output_dir: None, source_root: None }
    }

    /// Write all artifacts into one directory
    pub fn in_directory(dir: impl Into<PathBuf>) -> Self {
        Self { output_dir: Some(dir.into()), source_root: None }
    }

    /// Recreate the layout below `root` inside the output directory
    ///
    /// Has no effect when artifacts are written beside their inputs.
    pub fn mirroring(mut self, root: impl Into<PathBuf>) -> Self {
        self.source_root = Some(root.into());
        self
    }

    pub fn output_dir(&self) -> Option<&Path> {
        self.output_dir.as_deref()
    }

    /// Base name shared by the artifacts of a dataset
    pub fn base_name(dataset_path: &Path) -> Result<String> {
        let invalid = || {
            MetadataError::invalid_input(format!(
                "cannot derive a base name from '{}'",
                dataset_path.display()
            ))
        };
        let stem = dataset_path
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(invalid)?;
        let file_name = dataset_path.file_name().and_then(|s| s.to_str()).ok_or_else(invalid)?;

        if file_name != stem && has_sibling_raster(dataset_path, stem, file_name) {
            tracing::debug!("Another raster shares the stem '{}'; using '{}'", stem, file_name);
            return Ok(file_name.to_string());
        }
        Ok(stem.to_string())
    }

    pub fn paths_for(&self, dataset_path: &Path, thumbnail: ThumbnailFormat) -> Result<ArtifactPaths> {
        let base = Self::base_name(dataset_path)?;
        let parent = dataset_path.parent().filter(|p| !p.as_os_str().is_empty());
        let dir = match &self.output_dir {
            Some(dir) => match (&self.source_root, parent) {
                (Some(root), Some(parent)) => match parent.strip_prefix(root) {
                    Ok(relative) => dir.join(relative),
                    Err(_) => dir.clone(),
                },
                _ => dir.clone(),
            },
            None => parent.map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from(".")),
        };

        Ok(ArtifactPaths {
            xml: dir.join(format!("{}.xml", base)),
            thumbnail: dir.join(format!("{}.{}", base, thumbnail.extension())),
            pdf: dir.join(format!("{}.pdf", base)),
        })
    }
}

/// Whether another raster file beside `dataset_path` has the stem `stem`
fn has_sibling_raster(dataset_path: &Path, stem: &str, file_name: &str) -> bool {
    let dir = match dataset_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(dir) => dir,
        None => Path::new("."),
    };
    let Ok(entries) = fs::read_dir(dir) else {
        return false;
    };

    entries.filter_map(|entry| entry.ok()).any(|entry| {
        let path = entry.path();
        let name = entry.file_name();
        name.to_str() != Some(file_name)
            && path.file_stem().and_then(|s| s.to_str()) == Some(stem)
            && is_raster_file(&path)
            && path.is_file()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_paths_beside_input() {
        let paths = OutputNaming::beside_input()
            .paths_for(Path::new("/data/mdt/MDT05-0559.tif"), ThumbnailFormat::Png)
            .unwrap();

        assert_eq!(paths.xml, PathBuf::from("/data/mdt/MDT05-0559.xml"));
        assert_eq!(paths.thumbnail, PathBuf::from("/data/mdt/MDT05-0559.png"));
        assert_eq!(paths.pdf, PathBuf::from("/data/mdt/MDT05-0559.pdf"));
        assert_eq!(paths.directory(), Path::new("/data/mdt"));
    }

    #[test]
    fn test_paths_in_output_directory() {
        let paths = OutputNaming::in_directory("/out")
            .paths_for(Path::new("/data/PNOA_2023.tiff"), ThumbnailFormat::Jpeg)
            .unwrap();

        assert_eq!(paths.xml, PathBuf::from("/out/PNOA_2023.xml"));
        assert_eq!(paths.thumbnail, PathBuf::from("/out/PNOA_2023.jpg"));
    }

    #[test]
    fn test_relative_input_without_parent() {
        let paths = OutputNaming::beside_input()
            .paths_for(Path::new("sheet.tif"), ThumbnailFormat::Png)
            .unwrap();
        assert_eq!(paths.xml, PathBuf::from("./sheet.xml"));
    }

    #[test]
    fn test_sibling_rasters_keep_distinct_names() {
        let dir = tempfile::TempDir::new().unwrap();
        let tif = dir.path().join("sheet.tif");
        let tiff = dir.path().join("sheet.tiff");
        let alone = dir.path().join("other.tif");
        for path in [&tif, &tiff, &alone] {
            fs::write(path, b"").unwrap();
        }
        fs::write(dir.path().join("sheet.tfw"), b"").unwrap();

        let naming = OutputNaming::beside_input();
        let a = naming.paths_for(&tif, ThumbnailFormat::Png).unwrap();
        let b = naming.paths_for(&tiff, ThumbnailFormat::Png).unwrap();

        assert_eq!(a.xml, dir.path().join("sheet.tif.xml"));
        assert_eq!(b.xml, dir.path().join("sheet.tiff.xml"));
        assert_ne!(a.thumbnail, b.thumbnail);
        assert_ne!(a.pdf, b.pdf);
        assert_eq!(OutputNaming::base_name(&alone).unwrap(), "other");
    }

    #[test]
    fn test_mirroring_keeps_subdirectories_apart() {
        let naming = OutputNaming::in_directory("/out").mirroring("/data");

        let a = naming.paths_for(Path::new("/data/2023/h0559.tif"), ThumbnailFormat::Png).unwrap();
        let b = naming.paths_for(Path::new("/data/2024/h0559.tif"), ThumbnailFormat::Png).unwrap();
        let top = naming.paths_for(Path::new("/data/h0559.tif"), ThumbnailFormat::Png).unwrap();

        assert_eq!(a.xml, PathBuf::from("/out/2023/h0559.xml"));
        assert_eq!(b.xml, PathBuf::from("/out/2024/h0559.xml"));
        assert_eq!(top.xml, PathBuf::from("/out/h0559.xml"));

        let beside = OutputNaming::beside_input().mirroring("/data");
        let c = beside.paths_for(Path::new("/data/2023/h0559.tif"), ThumbnailFormat::Png).unwrap();
        assert_eq!(c.xml, PathBuf::from("/data/2023/h0559.xml"));
    }

    #[test]
    fn test_raster_extensions() {
        assert!(is_raster_file(Path::new("a.tif")));
        assert!(is_raster_file(Path::new("a.TIFF")));
        assert!(!is_raster_file(Path::new("a.tfw")));
        assert!(!is_raster_file(Path::new("tif")));
    }

    #[test]
    fn test_base_name_requires_file_name() {
        assert!(OutputNaming::base_name(Path::new("/")).is_err());
        assert!(OutputNaming::base_name(Path::new("")).is_err());
    }

    proptest! {
        #[test]
        fn prop_distinct_stems_never_collide(a in "[A-Za-z0-9_-]{1,16}", b in "[A-Za-z0-9_-]{1,16}") {
            prop_assume!(a != b);
            let naming = OutputNaming::in_directory("/out");
            let pa = naming.paths_for(&PathBuf::from(format!("/data/{}.tif", a)), ThumbnailFormat::Png).unwrap();
            let pb = naming.paths_for(&PathBuf::from(format!("/other/{}.tif", b)), ThumbnailFormat::Png).unwrap();

            prop_assert_ne!(&pa.xml, &pb.xml);
            prop_assert_ne!(&pa.thumbnail, &pb.thumbnail);
            prop_assert_ne!(&pa.pdf, &pb.pdf);
        }
    }
}
