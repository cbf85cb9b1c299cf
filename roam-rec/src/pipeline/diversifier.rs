//! Sector classification and diversity selection
//!
//! **[REC-DIV-010]** Groups verified candidates into thematic sectors and
//! selects a bounded, diverse subset so one oversupplied sector (generic
//! parks) cannot crowd out rarer high-intent matches (adrenaline).

use crate::types::{ScoredVenue, Sector};
use roam_common::Tunables;
use std::collections::HashMap;

pub struct SectorDef {
    pub sector: Sector,
    /// Higher = processed earlier during selection
    pub priority: u32,
    /// Matched against provider-reported tags (substring)
    pub tag_keywords: &'static [&'static str],
    /// Matched against the venue name (substring)
    pub name_keywords: &'static [&'static str],
}

/// Ordered sector definitions, descending priority
pub static SECTOR_TABLE: &[SectorDef] = &[
    SectorDef {
        sector: Sector::Adrenaline,
        priority: 90,
        tag_keywords: &["amusement_park", "go_kart", "climbing", "adventure", "bowling_alley"],
        name_keywords: &["karting", "escape", "paintball", "zipline", "adventure", "bungee"],
    },
    SectorDef {
        sector: Sector::Culture,
        priority: 75,
        tag_keywords: &["museum", "art_gallery", "theater", "theatre", "cultural", "library", "historical"],
        name_keywords: &["museum", "muzeu", "gallery", "teatru", "opera"],
    },
    SectorDef {
        sector: Sector::Nature,
        priority: 70,
        tag_keywords: &["park", "natural_feature", "campground", "garden", "hiking_area", "lake"],
        name_keywords: &["park", "parc", "lac", "gradina", "forest"],
    },
    SectorDef {
        sector: Sector::Nightlife,
        priority: 65,
        tag_keywords: &["night_club", "bar", "pub", "casino"],
        name_keywords: &["club", "lounge", "pub"],
    },
    SectorDef {
        sector: Sector::Sports,
        priority: 60,
        tag_keywords: &["gym", "stadium", "sports_complex", "swimming_pool", "fitness"],
        name_keywords: &["arena", "stadion", "sport", "fitness"],
    },
    SectorDef {
        sector: Sector::Wellness,
        priority: 55,
        tag_keywords: &["spa", "beauty_salon", "physiotherapist", "sauna"],
        name_keywords: &["spa", "therme", "wellness", "yoga"],
    },
    SectorDef {
        sector: Sector::Creative,
        priority: 50,
        tag_keywords: &["art_studio", "workshop", "school"],
        name_keywords: &["atelier", "workshop", "studio", "pottery"],
    },
    SectorDef {
        sector: Sector::Food,
        priority: 45,
        tag_keywords: &["restaurant", "cafe", "bakery", "food", "meal_takeaway"],
        name_keywords: &["restaurant", "bistro", "cafenea", "terasa"],
    },
];

/// Classify a venue into a sector from its provider tags and name
///
/// First match in descending-priority table order wins; anything
/// unmatched lands in the unclassified pool.
pub fn classify_sector(tags: &[String], name: &str) -> Sector {
    let name_lower = name.to_lowercase();
    let tags_lower: Vec<String> = tags.iter().map(|t| t.to_lowercase()).collect();

    for def in SECTOR_TABLE {
        let tag_hit = def
            .tag_keywords
            .iter()
            .any(|k| tags_lower.iter().any(|t| t.contains(k)));
        let name_hit = def.name_keywords.iter().any(|k| name_lower.contains(k));
        if tag_hit || name_hit {
            return def.sector;
        }
    }
    Sector::Unclassified
}

/// Bounded, sector-diverse selection over scored venues
pub struct SectorDiversifier {
    max_results: usize,
    max_per_sector: usize,
    priority_overrides: HashMap<String, u32>,
}

impl SectorDiversifier {
    pub fn new(tunables: &Tunables) -> Self {
        Self {
            max_results: tunables.max_results,
            max_per_sector: tunables.max_per_sector,
            priority_overrides: tunables.sector_priority_overrides.clone(),
        }
    }

    fn priority(&self, sector: Sector) -> u32 {
        if let Some(p) = self.priority_overrides.get(sector.as_str()) {
            return *p;
        }
        SECTOR_TABLE
            .iter()
            .find(|d| d.sector == sector)
            .map(|d| d.priority)
            .unwrap_or(0)
    }

    /// Select at most `max_results` venues, at most `max_per_sector` per
    /// sector, backfilling from the unclassified pool by rating
    pub fn select(&self, candidates: Vec<ScoredVenue>) -> Vec<ScoredVenue> {
        let mut by_sector: HashMap<Sector, Vec<ScoredVenue>> = HashMap::new();
        let mut unclassified: Vec<ScoredVenue> = Vec::new();

        for candidate in candidates {
            if candidate.venue.sector == Sector::Unclassified {
                unclassified.push(candidate);
            } else {
                by_sector
                    .entry(candidate.venue.sector)
                    .or_default()
                    .push(candidate);
            }
        }

        // Descending priority, table order as tie-break
        let mut sectors: Vec<Sector> = by_sector.keys().copied().collect();
        sectors.sort_by_key(|s| {
            let table_index = SECTOR_TABLE
                .iter()
                .position(|d| d.sector == *s)
                .unwrap_or(usize::MAX);
            (std::cmp::Reverse(self.priority(*s)), table_index)
        });

        let mut selected: Vec<ScoredVenue> = Vec::with_capacity(self.max_results);

        'outer: for sector in sectors {
            let mut pool = by_sector.remove(&sector).unwrap_or_default();
            pool.sort_by(|a, b| {
                b.score
                    .total_cmp(&a.score)
                    .then(rating_of(b).total_cmp(&rating_of(a)))
            });
            for candidate in pool.into_iter().take(self.max_per_sector) {
                if selected.len() >= self.max_results {
                    break 'outer;
                }
                selected.push(candidate);
            }
        }

        if selected.len() < self.max_results {
            unclassified.sort_by(|a, b| rating_of(b).total_cmp(&rating_of(a)));
            for candidate in unclassified {
                if selected.len() >= self.max_results {
                    break;
                }
                selected.push(candidate);
            }
        }

        selected.truncate(self.max_results);
        selected
    }
}

fn rating_of(candidate: &ScoredVenue) -> f32 {
    candidate.venue.rating.unwrap_or(0.0)
}
