use std::collections::BTreeSet;

use geo::{BoundingRect, Contains};
use geo_types::{MultiPolygon, Point};
use rstar::{RTree, RTreeObject, AABB};

use super::geo_bounds::GeoBounds;

/// One named administrative area.
#[derive(Debug, Clone)]
pub struct Region {
    pub name: String,
    pub boundary: MultiPolygon<f64>,
    pub bounds: GeoBounds,
}

impl Region {
    /// Returns `None` when the boundary has no extent (nothing to draw).
    pub fn new(name: impl Into<String>, boundary: MultiPolygon<f64>) -> Option<Self> {
        let rect = boundary.bounding_rect()?;
        Some(Self {
            name: name.into(),
            boundary,
            bounds: GeoBounds::from_rect(rect),
        })
    }
}

/// Bounding-box entry pointing back into the region list; the tree only
/// narrows hover candidates, the exact test is `Contains` on the boundary.
#[derive(Debug)]
struct RegionEnvelope {
    index: usize,
    aabb: AABB<[f64; 2]>,
}

impl RTreeObject for RegionEnvelope {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.aabb
    }
}

/// All loaded regions, read-only after construction.
#[derive(Debug)]
pub struct RegionCollection {
    regions: Vec<Region>,
    index: RTree<RegionEnvelope>,
}

impl RegionCollection {
    pub fn new(regions: Vec<Region>) -> Self {
        let envelopes = regions
            .iter()
            .enumerate()
            .map(|(index, region)| RegionEnvelope {
                index,
                aabb: AABB::from_corners(
                    [region.bounds.west(), region.bounds.south()],
                    [region.bounds.east(), region.bounds.north()],
                ),
            })
            .collect();

        Self {
            regions,
            index: RTree::bulk_load(envelopes),
        }
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Deduplicated, sorted names for the sidebar list.
    pub fn distinct_names(&self) -> Vec<String> {
        let names: BTreeSet<&str> = self.regions.iter().map(|r| r.name.as_str()).collect();
        names.into_iter().map(str::to_string).collect()
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.regions.iter().any(|r| r.name == name)
    }

    /// Merged bounds of every region whose name is selected, or `None`
    /// when the selection matches nothing.
    pub fn bounds_of(&self, names: &BTreeSet<String>) -> Option<GeoBounds> {
        self.regions
            .iter()
            .filter(|r| names.contains(&r.name))
            .map(|r| r.bounds.clone())
            .reduce(|acc, b| acc.merge(&b))
    }

    /// The region under a WGS84 position, if any.
    pub fn region_at(&self, longitude: f64, latitude: f64) -> Option<&Region> {
        let probe = AABB::from_point([longitude, latitude]);
        let point = Point::new(longitude, latitude);
        self.index
            .locate_in_envelope_intersecting(&probe)
            .map(|envelope| &self.regions[envelope.index])
            .find(|region| region.boundary.contains(&point))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::polygon;

    fn square(name: &str, x: f64, y: f64, side: f64) -> Region {
        let poly = polygon![
            (x: x, y: y),
            (x: x + side, y: y),
            (x: x + side, y: y + side),
            (x: x, y: y + side),
            (x: x, y: y),
        ];
        Region::new(name, MultiPolygon(vec![poly])).expect("square has extent")
    }

    fn collection() -> RegionCollection {
        RegionCollection::new(vec![
            square("CAUCA", 0.0, 0.0, 1.0),
            square("ANTIOQUIA", 2.0, 2.0, 1.0),
            // Same department split over two records, as real tables do
            square("ANTIOQUIA", 4.0, 2.0, 1.0),
            square("BOYACA", 6.0, 0.0, 2.0),
        ])
    }

    #[test]
    fn names_are_deduplicated_and_sorted() {
        assert_eq!(
            collection().distinct_names(),
            vec!["ANTIOQUIA", "BOYACA", "CAUCA"]
        );
    }

    #[test]
    fn bounds_cover_exactly_the_selected_regions() {
        let collection = collection();
        let selection: BTreeSet<String> = ["ANTIOQUIA".to_string()].into();
        let bounds = collection.bounds_of(&selection).expect("known name");

        // Both ANTIOQUIA records, nothing else
        assert_eq!(bounds.west(), 2.0);
        assert_eq!(bounds.east(), 5.0);
        assert_eq!(bounds.south(), 2.0);
        assert_eq!(bounds.north(), 3.0);
    }

    #[test]
    fn empty_selection_has_no_bounds() {
        assert!(collection().bounds_of(&BTreeSet::new()).is_none());
    }

    #[test]
    fn unknown_names_have_no_bounds() {
        let selection: BTreeSet<String> = ["NARNIA".to_string()].into();
        assert!(collection().bounds_of(&selection).is_none());
    }

    #[test]
    fn region_lookup_by_position() {
        let collection = collection();
        assert_eq!(
            collection.region_at(0.5, 0.5).map(|r| r.name.as_str()),
            Some("CAUCA")
        );
        assert_eq!(
            collection.region_at(4.5, 2.5).map(|r| r.name.as_str()),
            Some("ANTIOQUIA")
        );
        assert!(collection.region_at(20.0, 20.0).is_none());
    }

    #[test]
    fn empty_boundary_is_rejected() {
        assert!(Region::new("NOWHERE", MultiPolygon(vec![])).is_none());
    }
}
