//! Overlap lookup: which known zone does a closed loop land in?
//!
//! A loop overlaps a zone when the loop's centroid falls inside the zone's
//! polygon. Only one zone is ever considered: the first match in the order the
//! store listed them. Loops whose centroid sits in several zones are not
//! disambiguated any further.
//!
//! A runner's own zones are invisible to their own challenges: the `rival`
//! lookups skip zones owned by the runner, so a loop drawn inside your own
//! zone either lands on a rival zone listed later or claims fresh ground.
//!
//! [`find_overlapping_zone`] is the straight scan. [`ZoneIndex`] keeps an
//! R-tree of zone bounding boxes so repeated lookups against a large listing
//! only ray-cast the zones whose box contains the point, while still returning
//! the first match in listing order.

use rstar::{RTree, RTreeObject, AABB};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::arbitration::Zone;
use crate::geo_utils::{compute_bounds, point_in_polygon};
use crate::{GeoPoint, LoopPolygon};

/// First zone, in listing order, whose polygon contains the loop's centroid.
pub fn find_overlapping_zone<'a>(zones: &'a [Zone], candidate: &LoopPolygon) -> Option<&'a Zone> {
    let centroid = candidate.centroid();
    zones
        .iter()
        .find(|zone| point_in_polygon(&centroid, &zone.coordinates))
}

/// First zone not owned by `player_id` whose polygon contains the loop's centroid.
pub fn find_rival_zone<'a>(zones: &'a [Zone], candidate: &LoopPolygon, player_id: &str) -> Option<&'a Zone> {
    let centroid = candidate.centroid();
    zones
        .iter()
        .find(|zone| zone.owner_id != player_id && point_in_polygon(&centroid, &zone.coordinates))
}

/// Parallel version of [`find_rival_zone`]. Returns the same zone.
#[cfg(feature = "parallel")]
pub fn find_rival_zone_parallel<'a>(zones: &'a [Zone], candidate: &LoopPolygon, player_id: &str) -> Option<&'a Zone> {
    let centroid = candidate.centroid();
    zones
        .par_iter()
        .find_first(|zone| zone.owner_id != player_id && point_in_polygon(&centroid, &zone.coordinates))
}

/// Bounding box of one zone, tagged with its listing position.
#[derive(Debug, Clone)]
struct ZoneEnvelope {
    position: usize,
    min: [f64; 2],
    max: [f64; 2],
}

impl RTreeObject for ZoneEnvelope {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(self.min, self.max)
    }
}

/// Zone listing with a spatial index over zone bounds.
#[derive(Debug)]
pub struct ZoneIndex {
    zones: Vec<Zone>,
    tree: RTree<ZoneEnvelope>,
}

impl Default for ZoneIndex {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl ZoneIndex {
    /// Index a zone listing. Listing order is kept and decides ties.
    pub fn new(zones: Vec<Zone>) -> Self {
        let envelopes: Vec<ZoneEnvelope> = zones
            .iter()
            .enumerate()
            // An empty ring has no bounds and can contain nothing
            .filter(|(_, zone)| !zone.coordinates.is_empty())
            .map(|(position, zone)| {
                let b = compute_bounds(&zone.coordinates);
                ZoneEnvelope {
                    position,
                    min: [b.min_lng, b.min_lat],
                    max: [b.max_lng, b.max_lat],
                }
            })
            .collect();

        Self {
            zones,
            tree: RTree::bulk_load(envelopes),
        }
    }

    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    pub fn get(&self, zone_id: &str) -> Option<&Zone> {
        self.zones.iter().find(|zone| zone.id == zone_id)
    }

    /// First zone, in listing order, containing `point`.
    pub fn find_containing(&self, point: &GeoPoint) -> Option<&Zone> {
        self.first_matching(point, |_| true)
    }

    /// First zone, in listing order, containing the loop's centroid.
    pub fn find_overlapping(&self, candidate: &LoopPolygon) -> Option<&Zone> {
        self.find_containing(&candidate.centroid())
    }

    /// First zone not owned by `player_id` containing the loop's centroid.
    pub fn find_rival(&self, candidate: &LoopPolygon, player_id: &str) -> Option<&Zone> {
        self.first_matching(&candidate.centroid(), |zone| zone.owner_id != player_id)
    }

    fn first_matching(&self, point: &GeoPoint, accept: impl Fn(&Zone) -> bool) -> Option<&Zone> {
        let probe = AABB::from_point([point.longitude, point.latitude]);
        self.tree
            .locate_in_envelope_intersecting(&probe)
            .map(|envelope| envelope.position)
            .filter(|&position| {
                let zone = &self.zones[position];
                accept(zone) && point_in_polygon(point, &zone.coordinates)
            })
            .min()
            .map(|position| &self.zones[position])
    }
}

// ============================================================================
// Tests
// ============================================================================
