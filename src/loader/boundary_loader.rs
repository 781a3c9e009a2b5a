//! Fetches the boundary archive, parses the shapefile inside, and builds
//! the region collection the map renders.

use std::io::{Cursor, Read};
use std::sync::Arc;
use std::time::Duration;

use rayon::prelude::*;
use zip::ZipArchive;

use crate::map::region::{Region, RegionCollection};

use super::crs;
use super::error::{LoadError, Result};
use super::source::SourceLocator;

#[derive(Debug, Clone)]
pub struct BoundaryLoader {
    client: reqwest::Client,
    name_field: String,
    timeout: Duration,
}

impl BoundaryLoader {
    pub fn new(name_field: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            name_field: name_field.into(),
            timeout,
        }
    }

    /// Asynchronously fetches the archive and converts it into a region
    /// collection. Any failure aborts the whole load; there is no partial
    /// collection.
    pub async fn load(&self, source: &SourceLocator) -> Result<Arc<RegionCollection>> {
        let bytes = self.retrieve(source).await?;
        let collection = parse_archive(&bytes, &self.name_field)?;
        log::info!("loaded {} regions from {}", collection.len(), source);
        Ok(Arc::new(collection))
    }

    async fn retrieve(&self, source: &SourceLocator) -> Result<Vec<u8>> {
        match source {
            SourceLocator::Remote(url) => {
                log::info!("fetching boundary archive from {url}");
                let response = self.client.get(url).timeout(self.timeout).send().await?;
                if !response.status().is_success() {
                    return Err(LoadError::BadStatus(response.status()));
                }
                Ok(response.bytes().await?.to_vec())
            }
            SourceLocator::Local(path) => {
                log::info!("reading boundary archive from {}", path.display());
                std::fs::read(path).map_err(|e| LoadError::Io(path.clone(), e))
            }
        }
    }
}

/// Parses archive bytes into a collection. Synchronous; it runs on the
/// loader task and only one load is ever in flight.
pub(crate) fn parse_archive(bytes: &[u8], name_field: &str) -> Result<RegionCollection> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;

    let shp = entry_with_extension(&mut archive, "shp")?.ok_or(LoadError::MissingBoundaryFile)?;
    let dbf =
        entry_with_extension(&mut archive, "dbf")?.ok_or(LoadError::MissingAttributeTable)?;
    let prj = entry_with_extension(&mut archive, "prj")?;

    let prj_text = prj.map(|raw| String::from_utf8_lossy(&raw).into_owned());
    if prj_text.is_none() {
        log::warn!("archive has no .prj entry, assuming geographic coordinates");
    }
    let source_crs = crs::classify(prj_text.as_deref()).map_err(LoadError::UnsupportedCrs)?;

    let dbf_reader = shapefile::dbase::Reader::new(Cursor::new(dbf))?;
    if !dbf_reader.fields().iter().any(|f| f.name() == name_field) {
        return Err(LoadError::MissingNameField(name_field.to_string()));
    }

    let shape_reader = shapefile::ShapeReader::new(Cursor::new(shp))?;
    let mut reader = shapefile::Reader::new(shape_reader, dbf_reader);

    let mut named = Vec::new();
    let mut dropped = 0usize;

    for pair in reader.iter_shapes_and_records() {
        let (shape, record) = pair?;

        let name = match record.get(name_field) {
            Some(shapefile::dbase::FieldValue::Character(Some(value))) => {
                value.trim().to_string()
            }
            _ => {
                dropped += 1;
                continue;
            }
        };
        if name.is_empty() {
            dropped += 1;
            continue;
        }

        match shape {
            shapefile::Shape::Polygon(polygon) => {
                named.push((name, geo_types::MultiPolygon::<f64>::from(polygon)));
            }
            // Null and non-polygon shapes are dropped, not fatal
            _ => dropped += 1,
        }
    }

    let candidates = named.len();
    let regions: Vec<Region> = named
        .into_par_iter()
        .filter_map(|(name, boundary)| Region::new(name, crs::to_wgs84(boundary, source_crs)))
        .collect();
    dropped += candidates - regions.len();

    if regions.is_empty() {
        return Err(LoadError::EmptyCollection);
    }
    if dropped > 0 {
        log::warn!("dropped {dropped} records with invalid shapes or names");
    }

    Ok(RegionCollection::new(regions))
}

/// Reads the first entry with the given extension into memory, skipping
/// resource-fork noise from macOS-made archives.
fn entry_with_extension(
    archive: &mut ZipArchive<Cursor<&[u8]>>,
    extension: &str,
) -> Result<Option<Vec<u8>>> {
    let suffix = format!(".{extension}");
    let name = archive
        .file_names()
        .find(|n| !n.starts_with("__MACOSX") && n.to_ascii_lowercase().ends_with(&suffix))
        .map(str::to_string);
    let Some(name) = name else {
        return Ok(None);
    };

    let mut entry = archive.by_name(&name)?;
    let mut buf = Vec::with_capacity(entry.size() as usize);
    entry
        .read_to_end(&mut buf)
        .map_err(|e| LoadError::Malformed(format!("{name}: {e}")))?;
    Ok(Some(buf))
}
