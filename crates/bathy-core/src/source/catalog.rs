use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{BathyError, Result};
use crate::io::tiff_io::read_band;
use crate::raster::{Band, GeoTransform, Image, ImageCollection, Scene};

use super::RasterSource;

/// File name of the catalog index inside a catalog directory.
pub const CATALOG_FILE: &str = "catalog.toml";

/// Parsed `catalog.toml`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CatalogIndex {
    #[serde(default, rename = "collection")]
    pub collections: Vec<CollectionEntry>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CollectionEntry {
    pub id: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "scene")]
    pub scenes: Vec<SceneEntry>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SceneEntry {
    pub id: String,
    /// `YYYY-MM-DD`, quoted.
    pub date: NaiveDate,
    #[serde(default)]
    pub cloud_cover: f64,
    pub transform: GeoTransform,
    #[serde(rename = "band")]
    pub bands: Vec<BandEntry>,
}

/// One single-band TIFF. Stored samples become `value * scale + offset`;
/// samples equal to `nodata` become masked.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BandEntry {
    pub name: String,
    /// Relative to the catalog directory.
    pub path: PathBuf,
    #[serde(default)]
    pub nodata: Option<f64>,
    #[serde(default = "default_scale")]
    pub scale: f64,
    #[serde(default)]
    pub offset: f64,
}

fn default_scale() -> f64 {
    1.0
}

impl CatalogIndex {
    pub fn parse(text: &str) -> Result<Self> {
        let index: CatalogIndex = toml::from_str(text)?;
        for (i, c) in index.collections.iter().enumerate() {
            if index.collections[..i].iter().any(|o| o.id == c.id) {
                return Err(BathyError::Catalog(format!("collection '{}' listed twice", c.id)));
            }
            for s in &c.scenes {
                if s.bands.is_empty() {
                    return Err(BathyError::Catalog(format!(
                        "scene '{}' in '{}' has no bands",
                        s.id, c.id
                    )));
                }
            }
        }
        Ok(index)
    }

    pub fn collection(&self, id: &str) -> Option<&CollectionEntry> {
        self.collections.iter().find(|c| c.id == id)
    }
}

/// Directory of single-band TIFFs indexed by `catalog.toml`.
#[derive(Clone, Debug)]
pub struct CatalogSource {
    root: PathBuf,
    index: CatalogIndex,
}

impl CatalogSource {
    /// Open a catalog directory (or a path to its `catalog.toml`).
    pub fn open(path: &Path) -> Result<Self> {
        let (root, file) = if path.is_dir() {
            (path.to_path_buf(), path.join(CATALOG_FILE))
        } else {
            let root = path.parent().map(Path::to_path_buf).unwrap_or_default();
            (root, path.to_path_buf())
        };
        let index = CatalogIndex::parse(&std::fs::read_to_string(&file)?)?;
        info!(
            catalog = %file.display(),
            collections = index.collections.len(),
            "Opened raster catalog"
        );
        Ok(Self { root, index })
    }

    pub fn index(&self) -> &CatalogIndex {
        &self.index
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn load_band(&self, entry: &BandEntry) -> Result<Band> {
        let mut data = read_band(&self.root.join(&entry.path))?;
        data.mapv_inplace(|v| match entry.nodata {
            Some(nd) if v == nd => f64::NAN,
            _ => v * entry.scale + entry.offset,
        });
        Ok(Band::new(entry.name.clone(), data))
    }

    fn load_scene(&self, entry: &SceneEntry) -> Result<Scene> {
        let bands = entry
            .bands
            .iter()
            .map(|b| self.load_band(b))
            .collect::<Result<Vec<_>>>()?;
        let image = Image::new(entry.transform, bands)?;
        debug!(scene = %entry.id, rows = image.rows(), cols = image.cols(), "Loaded scene");
        Ok(Scene {
            id: entry.id.clone(),
            date: entry.date,
            cloud_cover: entry.cloud_cover,
            image,
        })
    }
}

impl RasterSource for CatalogSource {
    fn load_collection(&self, id: &str) -> Result<ImageCollection> {
        let entry = self
            .index
            .collection(id)
            .ok_or_else(|| BathyError::Catalog(format!("unknown collection '{id}'")))?;
        let scenes = entry
            .scenes
            .iter()
            .map(|s| self.load_scene(s))
            .collect::<Result<Vec<_>>>()?;
        Ok(ImageCollection::new(id, scenes))
    }

    fn collection_ids(&self) -> Vec<String> {
        self.index.collections.iter().map(|c| c.id.clone()).collect()
    }
}
