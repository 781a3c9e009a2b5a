use serde::{Deserialize, Serialize};

/// Latitude clamp keeping the mercator math finite near the poles.
const MAX_LATITUDE: f64 = 85.0;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Coordinate {
    latitude: f64,
    longitude: f64,
}

impl Default for Coordinate {
    fn default() -> Self {
        Self {
            latitude: 0.0,
            longitude: 0.0,
        }
    }
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Returns the coordinate shifted by the given deltas in degrees,
    /// keeping the latitude inside the renderable range.
    pub fn offset_by(&self, lat_delta: f64, lng_delta: f64) -> Self {
        Self {
            latitude: (self.latitude + lat_delta).clamp(-MAX_LATITUDE, MAX_LATITUDE),
            longitude: (self.longitude + lng_delta).clamp(-180.0, 180.0),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct GeoBounds {
    south: f64, // minimum latitude
    west: f64,  // minimum longitude
    north: f64, // maximum latitude
    east: f64,  // maximum longitude
}

impl GeoBounds {
    pub fn new(south: f64, west: f64, north: f64, east: f64) -> Self {
        Self {
            south,
            west,
            north,
            east,
        }
    }

    /// Bounds of a geometry's axis-aligned bounding rectangle.
    pub fn from_rect(rect: geo_types::Rect<f64>) -> Self {
        Self {
            south: rect.min().y,
            west: rect.min().x,
            north: rect.max().y,
            east: rect.max().x,
        }
    }

    pub fn south(&self) -> f64 {
        self.south
    }

    pub fn west(&self) -> f64 {
        self.west
    }

    pub fn north(&self) -> f64 {
        self.north
    }

    pub fn east(&self) -> f64 {
        self.east
    }

    /// (latitude span, longitude span)
    pub fn size(&self) -> (f64, f64) {
        (self.north - self.south, self.east - self.west)
    }

    pub fn center(&self) -> Coordinate {
        Coordinate {
            latitude: (self.south + self.north) / 2.0,
            longitude: (self.west + self.east) / 2.0,
        }
    }

    pub fn contains(&self, other: &GeoBounds) -> bool {
        self.south <= other.south
            && self.west <= other.west
            && self.north >= other.north
            && self.east >= other.east
    }

    pub fn intersects(&self, other: &GeoBounds) -> bool {
        self.south <= other.north
            && self.north >= other.south
            && self.west <= other.east
            && self.east >= other.west
    }

    /// Smallest bounds covering both inputs.
    pub fn merge(&self, other: &GeoBounds) -> GeoBounds {
        GeoBounds {
            south: self.south.min(other.south),
            west: self.west.min(other.west),
            north: self.north.max(other.north),
            east: self.east.max(other.east),
        }
    }

    /// The geographic window seen by a square viewport of `viewport_px`
    /// centered on `center` at the given zoom. Zoom follows the usual
    /// web-map convention: at zoom z a 512px viewport spans 360 / 2^z
    /// degrees of longitude.
    pub fn from_center(center: &Coordinate, zoom: f32, viewport_px: f64) -> Self {
        let zoom_floor = zoom.floor();
        let zoom_fract = zoom - zoom_floor;

        let n_floor = 2.0_f64.powf(zoom_floor as f64);
        let n_ceil = 2.0_f64.powf((zoom_floor + 1.0) as f64);

        let lng_span_floor = 360.0 / n_floor;
        let lng_span_ceil = 360.0 / n_ceil;

        // Lerp between the two spans for fractional zoom
        let lng_span =
            lng_span_floor * (1.0 - zoom_fract as f64) + lng_span_ceil * zoom_fract as f64;

        // Widen the latitude span for mercator distortion at this latitude
        let lat_span = lng_span * (1.0 / center.latitude().to_radians().cos());

        let scale = viewport_px / 512.0;
        let half_lng = (lng_span * scale) / 2.0;
        let half_lat = (lat_span * scale) / 2.0;

        GeoBounds {
            west: center.longitude() - half_lng,
            east: center.longitude() + half_lng,
            north: center.latitude() + half_lat,
            south: center.latitude() - half_lat,
        }
    }

    /// The largest zoom at which `from_center` on our center still shows
    /// all of these bounds in a `viewport_px` viewport.
    pub fn zoom_to_fit(&self, viewport_px: f64) -> f32 {
        let (lat_span, lng_span) = self.size();
        let scale = viewport_px / 512.0;

        let lng_zoom = (360.0 * scale / lng_span.max(f64::EPSILON)).log2();
        // Invert the lat_span widening from from_center
        let lat_needed = lat_span * self.center().latitude().to_radians().cos();
        let lat_zoom = (360.0 * scale / lat_needed.max(f64::EPSILON)).log2();

        (lng_zoom.min(lat_zoom) as f32 - 0.2).clamp(0.0, 20.0)
    }

    /// Maps a WGS84 position onto `rect`, with mercator vertical placement
    /// so shapes line up with the usual web-map look.
    pub fn project(&self, longitude: f64, latitude: f64, rect: egui::Rect) -> egui::Pos2 {
        let fx = (longitude - self.west) / (self.east - self.west);
        let north_y = merc_y(self.north);
        let south_y = merc_y(self.south);
        let fy = (north_y - merc_y(latitude)) / (north_y - south_y);

        egui::pos2(
            rect.min.x + fx as f32 * rect.width(),
            rect.min.y + fy as f32 * rect.height(),
        )
    }

    /// Inverse of `project`.
    pub fn unproject(&self, pos: egui::Pos2, rect: egui::Rect) -> Coordinate {
        let fx = ((pos.x - rect.min.x) / rect.width()) as f64;
        let fy = ((pos.y - rect.min.y) / rect.height()) as f64;

        let longitude = self.west + fx * (self.east - self.west);
        let north_y = merc_y(self.north);
        let south_y = merc_y(self.south);
        let m = north_y - fy * (north_y - south_y);
        let latitude = (2.0 * m.exp().atan() - std::f64::consts::FRAC_PI_2).to_degrees();

        Coordinate::new(latitude, longitude)
    }
}

/// Mercator y for a latitude in degrees.
fn merc_y(latitude: f64) -> f64 {
    let clamped = latitude.clamp(-MAX_LATITUDE, MAX_LATITUDE);
    (std::f64::consts::PI / 4.0 + clamped.to_radians() / 2.0).tan().ln()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn merge_covers_both() {
        let a = GeoBounds::new(2.0, -76.0, 6.0, -74.0);
        let b = GeoBounds::new(4.0, -78.0, 9.0, -75.0);
        let merged = a.merge(&b);
        assert!(merged.contains(&a));
        assert!(merged.contains(&b));
        assert_relative_eq!(merged.south(), 2.0);
        assert_relative_eq!(merged.west(), -78.0);
        assert_relative_eq!(merged.north(), 9.0);
        assert_relative_eq!(merged.east(), -74.0);
    }

    #[test]
    fn intersects_is_symmetric_and_strict() {
        let a = GeoBounds::new(0.0, 0.0, 2.0, 2.0);
        let b = GeoBounds::new(1.0, 1.0, 3.0, 3.0);
        let far = GeoBounds::new(10.0, 10.0, 11.0, 11.0);
        assert!(a.intersects(&b));
        assert!(b.intersects(&a));
        assert!(!a.intersects(&far));
    }

    #[test]
    fn center_is_midpoint() {
        let bounds = GeoBounds::new(2.0, -78.0, 6.0, -74.0);
        let center = bounds.center();
        assert_relative_eq!(center.latitude(), 4.0);
        assert_relative_eq!(center.longitude(), -76.0);
    }

    #[test]
    fn project_hits_rect_corners() {
        let bounds = GeoBounds::new(0.0, -10.0, 10.0, 0.0);
        let rect = egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(100.0, 100.0));

        let nw = bounds.project(-10.0, 10.0, rect);
        assert_relative_eq!(nw.x, 0.0, epsilon = 1e-3);
        assert_relative_eq!(nw.y, 0.0, epsilon = 1e-3);

        let se = bounds.project(0.0, 0.0, rect);
        assert_relative_eq!(se.x, 100.0, epsilon = 1e-3);
        assert_relative_eq!(se.y, 100.0, epsilon = 1e-3);
    }

    #[test]
    fn unproject_round_trips() {
        let bounds = GeoBounds::new(-4.0, -79.0, 13.0, -66.0);
        let rect = egui::Rect::from_min_max(egui::pos2(10.0, 20.0), egui::pos2(790.0, 780.0));

        let pos = bounds.project(-74.1, 4.6, rect);
        let back = bounds.unproject(pos, rect);
        assert_relative_eq!(back.longitude(), -74.1, epsilon = 1e-4);
        assert_relative_eq!(back.latitude(), 4.6, epsilon = 1e-4);
    }

    #[test]
    fn fit_zoom_keeps_bounds_visible() {
        let bounds = GeoBounds::new(1.0, -77.5, 8.9, -71.6);
        let viewport = 768.0;
        let zoom = bounds.zoom_to_fit(viewport);
        let view = GeoBounds::from_center(&bounds.center(), zoom, viewport);
        assert!(view.contains(&bounds), "view {view:?} vs bounds {bounds:?}");
    }

    #[test]
    fn offset_clamps_latitude() {
        let near_pole = Coordinate::new(84.0, 0.0).offset_by(5.0, 0.0);
        assert_relative_eq!(near_pole.latitude(), 85.0);
    }
}
