//! Coordinate reference handling for the `.prj` sidecar. The renderer
//! wants WGS84 degrees; geographic sources pass through unchanged and
//! spherical-mercator sources are inverted in pure Rust (no libproj).

use geo::MapCoords;
use geo_types::{Coord, MultiPolygon};

// Spherical mercator earth radius (m)
const EARTH_RADIUS: f64 = 6_378_137.0;

/// CRS classes the loader accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceCrs {
    /// Longitude/latitude degrees; used as-is.
    Geographic,
    /// EPSG:3857-style meters; inverted per coordinate.
    WebMercator,
}

/// Classifies the WKT of a `.prj` entry. A missing sidecar is treated as
/// geographic (the caller logs the assumption). Projected systems other
/// than spherical mercator are rejected with the CRS name so the
/// diagnostic can say what the archive actually contained.
pub fn classify(prj: Option<&str>) -> Result<SourceCrs, String> {
    let Some(wkt) = prj else {
        return Ok(SourceCrs::Geographic);
    };

    if wkt.contains("PROJCS") {
        let lowered = wkt.to_ascii_lowercase();
        if lowered.contains("mercator")
            && (lowered.contains("auxiliary_sphere")
                || lowered.contains("pseudo")
                || lowered.contains("3857"))
        {
            return Ok(SourceCrs::WebMercator);
        }
        return Err(crs_name(wkt));
    }

    if wkt.contains("GEOGCS") || wkt.contains("GEOGCRS") {
        return Ok(SourceCrs::Geographic);
    }

    Err(crs_name(wkt))
}

/// First quoted token of the WKT, which is the CRS name by convention.
fn crs_name(wkt: &str) -> String {
    wkt.split('"')
        .nth(1)
        .unwrap_or("unknown")
        .to_string()
}

/// Normalizes a boundary into WGS84 degrees.
pub fn to_wgs84(boundary: MultiPolygon<f64>, crs: SourceCrs) -> MultiPolygon<f64> {
    match crs {
        SourceCrs::Geographic => boundary,
        SourceCrs::WebMercator => boundary.map_coords(invert_web_mercator),
    }
}

fn invert_web_mercator(c: Coord<f64>) -> Coord<f64> {
    Coord {
        x: (c.x / EARTH_RADIUS).to_degrees(),
        y: (c.y / EARTH_RADIUS).sinh().atan().to_degrees(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use geo_types::polygon;

    const MAGNA_SIRGAS: &str = r#"GEOGCS["GCS_MAGNA",DATUM["D_MAGNA",SPHEROID["GRS_1980",6378137.0,298.257222101]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]]"#;
    const WEB_MERCATOR: &str = r#"PROJCS["WGS_1984_Web_Mercator_Auxiliary_Sphere",GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]],PROJECTION["Mercator_Auxiliary_Sphere"],UNIT["Meter",1.0]]"#;
    const UTM_18N: &str = r#"PROJCS["WGS_1984_UTM_Zone_18N",GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]],PROJECTION["Transverse_Mercator"],UNIT["Meter",1.0]]"#;

    #[test]
    fn geographic_wkt_passes_through() {
        assert_eq!(classify(Some(MAGNA_SIRGAS)), Ok(SourceCrs::Geographic));
    }

    #[test]
    fn missing_sidecar_is_assumed_geographic() {
        assert_eq!(classify(None), Ok(SourceCrs::Geographic));
    }

    #[test]
    fn web_mercator_is_recognized() {
        assert_eq!(classify(Some(WEB_MERCATOR)), Ok(SourceCrs::WebMercator));
    }

    #[test]
    fn other_projections_are_rejected_by_name() {
        assert_eq!(
            classify(Some(UTM_18N)),
            Err("WGS_1984_UTM_Zone_18N".to_string())
        );
    }

    // Reference values from pyproj (PROJ 9.x):
    //   Transformer.from_crs(3857, 4326, always_xy=True)
    //   t.transform(-8237642.32, 4970241.33) → (-74.0, 40.7127)
    #[test]
    fn mercator_inversion_matches_reference() {
        let c = invert_web_mercator(Coord {
            x: -8_237_642.32,
            y: 4_970_241.33,
        });
        assert_relative_eq!(c.x, -74.0, epsilon = 1e-4);
        assert_relative_eq!(c.y, 40.7127, epsilon = 1e-4);
    }

    #[test]
    fn origin_maps_to_origin() {
        let c = invert_web_mercator(Coord { x: 0.0, y: 0.0 });
        assert_relative_eq!(c.x, 0.0);
        assert_relative_eq!(c.y, 0.0);
    }

    #[test]
    fn geographic_boundaries_are_untouched() {
        let boundary = MultiPolygon(vec![polygon![
            (x: -74.0, y: 4.0),
            (x: -73.0, y: 4.0),
            (x: -73.0, y: 5.0),
            (x: -74.0, y: 4.0),
        ]]);
        let out = to_wgs84(boundary.clone(), SourceCrs::Geographic);
        assert_eq!(out, boundary);
    }
}
