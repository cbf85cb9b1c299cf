//! Region fan-out
//!
//! **[REC-GEO-010]** Expands a single origin point into a ranked set of
//! candidate regions within a feasible travel budget. Pure, synchronous
//! computation over a static region table — no provider calls.

use crate::types::{CandidateRegion, GeoPoint};
use roam_common::Tunables;

/// Mean Earth radius, km
const EARTH_RADIUS_KM: f64 = 6371.0;

struct RegionDef {
    id: &'static str,
    name: &'static str,
    lat: f64,
    lng: f64,
}

/// Searchable regions around the deployment area
///
/// Centroids are approximate town centers; granularity is deliberately
/// coarse — the venue search radius does the fine-grained work.
static REGION_TABLE: &[RegionDef] = &[
    RegionDef { id: "bucharest", name: "Bucharest", lat: 44.4268, lng: 26.1025 },
    RegionDef { id: "mogosoaia", name: "Mogoșoaia", lat: 44.5278, lng: 25.9983 },
    RegionDef { id: "otopeni", name: "Otopeni", lat: 44.5565, lng: 26.0729 },
    RegionDef { id: "snagov", name: "Snagov", lat: 44.7006, lng: 26.1772 },
    RegionDef { id: "comana", name: "Comana", lat: 44.1733, lng: 26.1545 },
    RegionDef { id: "ploiesti", name: "Ploiești", lat: 44.9416, lng: 26.0231 },
    RegionDef { id: "sinaia", name: "Sinaia", lat: 45.3500, lng: 25.5500 },
    RegionDef { id: "brasov", name: "Brașov", lat: 45.6579, lng: 25.6012 },
    RegionDef { id: "constanta", name: "Constanța", lat: 44.1598, lng: 28.6348 },
    RegionDef { id: "sibiu", name: "Sibiu", lat: 45.7983, lng: 24.1256 },
    RegionDef { id: "cluj-napoca", name: "Cluj-Napoca", lat: 46.7712, lng: 23.6236 },
    RegionDef { id: "iasi", name: "Iași", lat: 47.1585, lng: 27.6014 },
    RegionDef { id: "timisoara", name: "Timișoara", lat: 45.7489, lng: 21.2087 },
];

/// Great-circle distance between two points, km
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlng = (b.lng - a.lng).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

/// Fan-out result
#[derive(Debug, Clone)]
pub struct FanoutResult {
    /// Feasible regions, sorted by ascending distance; never empty
    pub regions: Vec<CandidateRegion>,
    /// Set when the requested duration crossed the long-trip threshold
    pub willing_to_travel: bool,
}

/// Origin + available duration → ranked candidate regions
pub struct RegionFanout {
    tunables: Tunables,
}

impl RegionFanout {
    pub fn new(tunables: &Tunables) -> Self {
        Self {
            tunables: tunables.clone(),
        }
    }

    /// Estimated one-way travel time for a given distance, minutes
    ///
    /// Three-tier speed model: short hops crawl through city traffic,
    /// mid-range runs average suburban roads, long hauls assume highway.
    pub fn travel_time_min(&self, distance_km: f64) -> f64 {
        let t = &self.tunables;
        let speed_kmh = if distance_km <= t.city_tier_km {
            t.city_speed_kmh
        } else if distance_km <= t.suburban_tier_km {
            t.suburban_speed_kmh
        } else {
            t.highway_speed_kmh
        };
        distance_km / speed_kmh * 60.0
    }

    /// Rank candidate regions for an origin and available duration
    ///
    /// A region is feasible only if the round trip plus the minimum dwell
    /// time fits the requested duration. Zero feasible regions fall back
    /// to the origin's nearest region as a single-element result.
    pub fn candidate_regions(&self, origin: GeoPoint, duration_minutes: f64) -> FanoutResult {
        let t = &self.tunables;
        let willing_to_travel = duration_minutes >= t.long_trip_threshold_min;
        let radius_km = if willing_to_travel {
            t.extended_region_radius_km
        } else {
            t.base_region_radius_km
        };

        let mut regions: Vec<CandidateRegion> = REGION_TABLE
            .iter()
            .filter_map(|def| {
                let center = GeoPoint {
                    lat: def.lat,
                    lng: def.lng,
                };
                let distance_km = haversine_km(origin, center);
                if distance_km > radius_km {
                    return None;
                }
                let travel_time_min = self.travel_time_min(distance_km);
                if 2.0 * travel_time_min + t.dwell_minutes > duration_minutes {
                    return None;
                }
                Some(CandidateRegion {
                    id: def.id.to_string(),
                    name: def.name.to_string(),
                    center,
                    distance_km,
                    travel_time_min,
                })
            })
            .collect();

        regions.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));

        if regions.is_empty() {
            tracing::debug!(
                duration_minutes,
                "No feasible region in travel budget, falling back to nearest"
            );
            regions.push(self.nearest_region(origin));
        }

        FanoutResult {
            regions,
            willing_to_travel,
        }
    }

    fn nearest_region(&self, origin: GeoPoint) -> CandidateRegion {
        // Table is non-empty by construction, so the fold always yields
        let def = REGION_TABLE
            .iter()
            .min_by(|a, b| {
                let da = haversine_km(origin, GeoPoint { lat: a.lat, lng: a.lng });
                let db = haversine_km(origin, GeoPoint { lat: b.lat, lng: b.lng });
                da.total_cmp(&db)
            })
            .expect("region table is empty");

        let center = GeoPoint {
            lat: def.lat,
            lng: def.lng,
        };
        let distance_km = haversine_km(origin, center);
        CandidateRegion {
            id: def.id.to_string(),
            name: def.name.to_string(),
            center,
            distance_km,
            travel_time_min: self.travel_time_min(distance_km),
        }
    }
}
