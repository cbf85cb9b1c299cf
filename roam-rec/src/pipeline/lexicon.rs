//! Keyword lexicon for fallback intent matching
//!
//! **[REC-INT-110]** Multilingual (English + Romanian) synonym tables for
//! categories, energy levels, and indoor/outdoor preference. Exact lexicon
//! matches are checked before any fuzzy heuristics, so explicit category
//! names always resolve deterministically.

use crate::types::{Category, Energy, IndoorOutdoor};

struct LexiconEntry {
    category: Category,
    keywords: &'static [&'static str],
}

static CATEGORY_LEXICON: &[LexiconEntry] = &[
    LexiconEntry {
        category: Category::Sports,
        keywords: &[
            "sport", "sports", "fitness", "gym", "football", "fotbal", "tennis", "tenis",
            "basketball", "baschet", "swimming", "inot", "running", "alergare", "workout",
            "bicicleta", "cycling",
        ],
    },
    LexiconEntry {
        category: Category::Nature,
        keywords: &[
            "nature", "natura", "park", "parc", "hike", "hiking", "drumetie", "forest", "padure",
            "lake", "lac", "mountain", "munte", "picnic", "garden", "gradina",
        ],
    },
    LexiconEntry {
        category: Category::Culture,
        keywords: &[
            "museum", "muzeu", "culture", "cultura", "art", "arta", "gallery", "galerie",
            "theater", "theatre", "teatru", "history", "istorie", "exhibition", "expozitie",
            "opera", "concert",
        ],
    },
    LexiconEntry {
        category: Category::Nightlife,
        keywords: &[
            "nightlife", "club", "clubbing", "party", "petrecere", "bar", "pub", "dancing",
            "dans", "drinks", "cocktail", "cocktails",
        ],
    },
    LexiconEntry {
        category: Category::Food,
        keywords: &[
            "food", "mancare", "restaurant", "dinner", "cina", "lunch", "pranz", "brunch",
            "cafe", "coffee", "cafea", "tasting", "street food", "bistro",
        ],
    },
    LexiconEntry {
        category: Category::Wellness,
        keywords: &[
            "wellness", "spa", "massage", "masaj", "relaxare", "sauna", "yoga", "meditation",
            "meditatie", "therme", "pool",
        ],
    },
    LexiconEntry {
        category: Category::Adrenaline,
        keywords: &[
            "adrenaline", "adrenalina", "karting", "paintball", "climbing", "catarare",
            "escape room", "zipline", "bungee", "skydiving", "parapanta", "rafting",
        ],
    },
    LexiconEntry {
        category: Category::Creative,
        keywords: &[
            "creative", "creativ", "workshop", "atelier", "pottery", "ceramica", "painting",
            "pictura", "crafts", "handmade", "photography", "fotografie",
        ],
    },
];

static CHILL_KEYWORDS: &[&str] = &[
    "chill", "relax", "relaxed", "relaxare", "calm", "linistit", "quiet", "lazy", "slow", "cozy",
    "mellow",
];

static HIGH_KEYWORDS: &[&str] = &[
    "energetic", "intense", "wild", "crazy", "nebun", "extreme", "adrenaline", "adrenalina",
    "party", "active", "pumped",
];

static INDOOR_KEYWORDS: &[&str] = &["indoor", "inside", "inauntru", "interior", "rain", "rainy", "ploaie"];

static OUTDOOR_KEYWORDS: &[&str] = &["outdoor", "outside", "afara", "open air", "aer liber", "sunny", "soare"];

/// Minimum Jaro-Winkler similarity for a fuzzy token match
const FUZZY_THRESHOLD: f64 = 0.93;

/// Minimum token length before fuzzy matching applies (short words collide)
const FUZZY_MIN_LEN: usize = 5;

/// Lowercase and strip Romanian diacritics so both spellings match
fn normalize(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| match c {
            'ă' | 'â' => 'a',
            'î' => 'i',
            'ș' | 'ş' => 's',
            'ț' | 'ţ' => 't',
            _ => c,
        })
        .collect()
}

fn tokenize(normalized: &str) -> Vec<&str> {
    normalized
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect()
}

fn keyword_matches(normalized: &str, tokens: &[&str], keyword: &str) -> bool {
    if keyword.contains(' ') {
        // Multi-word keywords match as phrases
        return normalized.contains(keyword);
    }
    // Exact token match first, fuzzy only as a fallback
    if tokens.iter().any(|t| *t == keyword) {
        return true;
    }
    if keyword.len() >= FUZZY_MIN_LEN {
        return tokens
            .iter()
            .filter(|t| t.len() >= FUZZY_MIN_LEN)
            .any(|t| strsim::jaro_winkler(t, keyword) >= FUZZY_THRESHOLD);
    }
    false
}

/// Match categories mentioned in the text, in lexicon order
pub fn match_categories(text: &str) -> Vec<Category> {
    let normalized = normalize(text);
    let tokens = tokenize(&normalized);

    CATEGORY_LEXICON
        .iter()
        .filter(|entry| {
            entry
                .keywords
                .iter()
                .any(|k| keyword_matches(&normalized, &tokens, k))
        })
        .map(|entry| entry.category)
        .collect()
}

/// Match an explicit energy level mentioned in the text
pub fn match_energy(text: &str) -> Option<Energy> {
    let normalized = normalize(text);
    let tokens = tokenize(&normalized);

    if CHILL_KEYWORDS
        .iter()
        .any(|k| keyword_matches(&normalized, &tokens, k))
    {
        return Some(Energy::Chill);
    }
    if HIGH_KEYWORDS
        .iter()
        .any(|k| keyword_matches(&normalized, &tokens, k))
    {
        return Some(Energy::High);
    }
    None
}

/// Match an explicit indoor/outdoor preference mentioned in the text
pub fn match_indoor_outdoor(text: &str) -> Option<IndoorOutdoor> {
    let normalized = normalize(text);
    let tokens = tokenize(&normalized);

    let indoor = INDOOR_KEYWORDS
        .iter()
        .any(|k| keyword_matches(&normalized, &tokens, k));
    let outdoor = OUTDOOR_KEYWORDS
        .iter()
        .any(|k| keyword_matches(&normalized, &tokens, k));

    match (indoor, outdoor) {
        (true, false) => Some(IndoorOutdoor::Indoor),
        (false, true) => Some(IndoorOutdoor::Outdoor),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_category_resolves_deterministically() {
        assert_eq!(match_categories("I want sports"), vec![Category::Sports]);
        assert_eq!(match_categories("vreau sport"), vec![Category::Sports]);
    }

    #[test]
    fn test_romanian_diacritics_normalize() {
        assert_eq!(match_categories("o drumeție în pădure"), vec![Category::Nature]);
        assert_eq!(match_categories("vreau mâncare bună"), vec![Category::Food]);
    }

    #[test]
    fn test_multiple_categories_in_lexicon_order() {
        let cats = match_categories("museum then cocktails");
        assert_eq!(cats, vec![Category::Culture, Category::Nightlife]);
    }

    #[test]
    fn test_phrase_keyword() {
        assert_eq!(match_categories("an escape room with friends"), vec![Category::Adrenaline]);
    }

    #[test]
    fn test_fuzzy_tolerates_typos() {
        // "musem" is a one-letter slip of "museum"
        assert_eq!(match_categories("visit a musem"), vec![Category::Culture]);
    }

    #[test]
    fn test_energy_keywords() {
        assert_eq!(match_energy("something chill and cozy"), Some(Energy::Chill));
        assert_eq!(match_energy("a wild night"), Some(Energy::High));
        assert_eq!(match_energy("a walk"), None);
    }

    #[test]
    fn test_indoor_outdoor() {
        assert_eq!(match_indoor_outdoor("it's rainy today"), Some(IndoorOutdoor::Indoor));
        assert_eq!(match_indoor_outdoor("ceva în aer liber"), Some(IndoorOutdoor::Outdoor));
        // Conflicting hints resolve to no preference
        assert_eq!(match_indoor_outdoor("indoor or outdoor"), None);
        assert_eq!(match_indoor_outdoor("whatever"), None);
    }

    #[test]
    fn test_empty_text_matches_nothing() {
        assert!(match_categories("").is_empty());
        assert_eq!(match_energy(""), None);
    }
}
