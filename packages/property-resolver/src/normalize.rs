//! Address normalization.
//!
//! Canonicalizes free-text addresses into a single upper-case form with
//! street suffixes and directionals spelled out, and produces the ordered
//! set of alternate spellings engines feed into a source site's search.
//!
//! Everything here is pure: the same input always yields the same output in
//! the same order. Cache fingerprints depend on it.

use crate::types::address::{Address, AddressInputType};

/// Abbreviation → full word, matched on whole whitespace-delimited tokens.
const STREET_ABBREVIATIONS: &[(&str, &str)] = &[
    ("ST", "STREET"),
    ("RD", "ROAD"),
    ("AVE", "AVENUE"),
    ("AV", "AVENUE"),
    ("BLVD", "BOULEVARD"),
    ("DR", "DRIVE"),
    ("PL", "PLACE"),
    ("CT", "COURT"),
    ("LN", "LANE"),
    ("CIR", "CIRCLE"),
    ("TER", "TERRACE"),
    ("PKWY", "PARKWAY"),
    ("HWY", "HIGHWAY"),
    ("AVES", "AVENUES"),
    ("BLVDS", "BOULEVARDS"),
    ("RDS", "ROADS"),
];

const DIRECTIONAL_ABBREVIATIONS: &[(&str, &str)] = &[
    ("N", "NORTH"),
    ("S", "SOUTH"),
    ("E", "EAST"),
    ("W", "WEST"),
    ("NE", "NORTHEAST"),
    ("NW", "NORTHWEST"),
    ("SE", "SOUTHEAST"),
    ("SW", "SOUTHWEST"),
];

const UNIT_DESIGNATORS: &[&str] = &["APT", "APARTMENT", "UNIT", "STE", "SUITE", "#"];

/// A canonicalized address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NormalizedAddress {
    canonical: String,
}

impl NormalizedAddress {
    /// Upper-case, abbreviation-expanded rendering (punctuation kept).
    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    /// Punctuation-free rendering used for cache keys and matching.
    pub fn key(&self) -> String {
        self.canonical
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl std::fmt::Display for NormalizedAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.canonical)
    }
}

/// Expand abbreviations in the street line and upper-case the address.
///
/// `"3144 Nichols Canyon Rd"` becomes `"3144 NICHOLS CANYON ROAD"`. Text
/// after the first comma (city, state, zip) is only upper-cased, so
/// `"St Louis, MO"` and `"Hartford, CT"` survive.
pub fn normalize(raw: &str) -> NormalizedAddress {
    NormalizedAddress {
        canonical: map_street_tokens(raw, expand_token),
    }
}

/// Inverse of [`normalize`]: full words in the street line replaced by
/// their abbreviations.
pub fn abbreviate(raw: &str) -> String {
    map_street_tokens(raw, abbreviate_token)
}

/// Remove unit designators ("APT 4", "UNIT B", "#12") from an address.
pub fn strip_unit(raw: &str) -> String {
    let mut out: Vec<String> = Vec::new();
    let mut skip_next = false;

    for token in raw.split_whitespace() {
        if skip_next {
            skip_next = false;
            // Keep a trailing comma so city/state separation survives.
            if token.ends_with(',') {
                if let Some(last) = out.last_mut() {
                    if !last.ends_with(',') {
                        last.push(',');
                    }
                }
            }
            continue;
        }

        let (word, _) = split_trailing_punct(token);
        let upper = word.to_uppercase();
        if UNIT_DESIGNATORS.contains(&upper.as_str()) {
            skip_next = true;
            continue;
        }
        if upper.starts_with('#') && upper.len() > 1 {
            if token.ends_with(',') {
                if let Some(last) = out.last_mut() {
                    if !last.ends_with(',') {
                        last.push(',');
                    }
                }
            }
            continue;
        }
        out.push(token.to_string());
    }

    // "123 MAIN ST, APT 4, LA" leaves "MAIN ST,," behind otherwise.
    out.join(" ").replace(",,", ",").trim_end_matches(',').to_string()
}

/// Whether the address carries a unit designator.
pub fn has_unit(raw: &str) -> bool {
    raw.split_whitespace().any(|token| {
        let (word, _) = split_trailing_punct(token);
        let upper = word.to_uppercase();
        UNIT_DESIGNATORS.contains(&upper.as_str()) || (upper.starts_with('#') && upper.len() > 1)
    })
}

/// Ordered, de-duplicated alternate renderings of an address.
///
/// Starts with the formatted forms appropriate to the input kind, then adds
/// the expanded and abbreviated spellings of the primary form and, when the
/// address has a unit, the same without it. Titles are not addresses and get
/// no spelling variants.
pub fn plausible_matches(address: &Address) -> Vec<String> {
    let mut candidates: Vec<String> = match address.input_type() {
        AddressInputType::AutoComplete => vec![
            address.formatted_without_country().to_string(),
            address.formatted().to_string(),
            address.input().to_string(),
        ],
        AddressInputType::FreeForm | AddressInputType::ExactPlaceId => vec![
            address.formatted().to_string(),
            address.formatted_without_country().to_string(),
        ],
        AddressInputType::PropertyTitle => vec![
            address.formatted().to_string(),
            address.input().to_string(),
        ],
    };

    if address.input_type() != AddressInputType::PropertyTitle {
        let primary = candidates[0].clone();
        let expanded = normalize(&primary).canonical;
        let abbreviated = abbreviate(&primary);
        candidates.push(expanded.clone());
        candidates.push(abbreviated.clone());

        if has_unit(&primary) {
            candidates.push(strip_unit(&expanded));
            candidates.push(strip_unit(&abbreviated));
        }
    }

    dedupe(candidates)
}

/// Every spelling of `text` across full and abbreviated directionals and
/// street types, including dotted abbreviations and no street type at all.
///
/// Used by engines that probe predictable URLs.
pub fn abbreviation_variants(text: &str) -> Vec<String> {
    let expanded = normalize(text).canonical;
    let abbreviated = abbreviate(text);
    let dotted = map_street_tokens(&abbreviated, |word| {
        let is_abbrev = STREET_ABBREVIATIONS
            .iter()
            .chain(DIRECTIONAL_ABBREVIATIONS)
            .any(|(abbr, _)| *abbr == word);
        is_abbrev.then(|| format!("{word}."))
    });
    let without_type = drop_street_type(&expanded);

    dedupe(vec![
        text.trim().to_uppercase(),
        expanded,
        abbreviated,
        dotted,
        without_type,
    ])
}

/// URL slug: lower-cased, punctuation dropped, whitespace runs → `-`.
pub fn slugify(text: &str) -> String {
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace() || *c == '-')
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join("-")
}

/// Slug formats a listing page may live under, most likely first.
pub fn url_slugs(title: &str) -> Vec<String> {
    let compact = |s: &str| -> String {
        s.to_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect()
    };
    let abbreviated = abbreviate(title);

    dedupe(vec![
        slugify(title),
        compact(title),
        slugify(&abbreviated),
        compact(&abbreviated),
    ])
}

fn dedupe(candidates: Vec<String>) -> Vec<String> {
    let mut unique: Vec<String> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let candidate = candidate.trim().to_string();
        if !candidate.is_empty() && !unique.contains(&candidate) {
            unique.push(candidate);
        }
    }
    unique
}

/// [`map_tokens`] over the text before the first comma; the rest is only
/// upper-cased.
fn map_street_tokens(raw: &str, f: impl Fn(&str) -> Option<String>) -> String {
    let Some((street, rest)) = raw.split_once(',') else {
        return map_tokens(raw, f);
    };
    let street = map_tokens(street, f);
    let rest = rest.split_whitespace().collect::<Vec<_>>().join(" ").to_uppercase();
    if rest.is_empty() {
        street
    } else {
        format!("{street}, {rest}")
    }
}

fn map_tokens(raw: &str, f: impl Fn(&str) -> Option<String>) -> String {
    raw.split_whitespace()
        .map(|token| {
            let (word, punct) = split_trailing_punct(token);
            let upper = word.to_uppercase();
            match f(&upper) {
                Some(replacement) => format!("{replacement}{punct}"),
                None => format!("{upper}{punct}"),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn expand_token(word: &str) -> Option<String> {
    let word = word.trim_end_matches('.');
    STREET_ABBREVIATIONS
        .iter()
        .chain(DIRECTIONAL_ABBREVIATIONS)
        .find(|(abbr, _)| *abbr == word)
        .map(|(_, full)| full.to_string())
}

fn abbreviate_token(word: &str) -> Option<String> {
    let word = word.trim_end_matches('.');
    STREET_ABBREVIATIONS
        .iter()
        .chain(DIRECTIONAL_ABBREVIATIONS)
        .find(|(_, full)| *full == word)
        .map(|(abbr, _)| abbr.to_string())
        .or_else(|| expand_token(word).map(|_| word.to_string()))
}

fn drop_street_type(expanded: &str) -> String {
    let street_types: Vec<&str> = STREET_ABBREVIATIONS.iter().map(|(_, full)| *full).collect();
    expanded
        .split_whitespace()
        .filter(|token| {
            let (word, _) = split_trailing_punct(token);
            !street_types.contains(&word)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Split `"RD.,"` into `("RD.", ",")`. Only commas count as trailing
/// punctuation; periods belong to the abbreviation.
fn split_trailing_punct(token: &str) -> (&str, &str) {
    let trimmed = token.trim_end_matches(',');
    (trimmed, &token[trimmed.len()..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_expands_suffix() {
        assert_eq!(
            normalize("3144 Nichols Canyon Rd").canonical(),
            "3144 NICHOLS CANYON ROAD"
        );
        assert_eq!(
            normalize("337 N Croft Ave").canonical(),
            "337 NORTH CROFT AVENUE"
        );
        assert_eq!(
            normalize("12 Sunset Blvd., Los Angeles, CA").canonical(),
            "12 SUNSET BOULEVARD, LOS ANGELES, CA"
        );
    }

    #[test]
    fn test_normalize_leaves_city_and_state_alone() {
        assert_eq!(
            normalize("12 Elm St, Hartford, CT 06103").canonical(),
            "12 ELM STREET, HARTFORD, CT 06103"
        );
        assert_eq!(
            normalize("12 Oak Ave, Omaha, NE 68102").canonical(),
            "12 OAK AVENUE, OMAHA, NE 68102"
        );
        assert_eq!(
            normalize("100 Market St, St Louis, MO").canonical(),
            "100 MARKET STREET, ST LOUIS, MO"
        );
        assert_eq!(abbreviate("5 North Road, North Haven, CT"), "5 N RD, NORTH HAVEN, CT");
    }

    #[test]
    fn test_plausible_matches_keep_state_codes() {
        let address = Address::new("12 Elm St, Hartford, CT 06103", AddressInputType::FreeForm, None);
        let candidates = plausible_matches(&address);
        assert!(candidates.contains(&"12 ELM STREET, HARTFORD, CT 06103".to_string()));
        assert!(candidates.iter().all(|c| !c.contains("COURT")));
    }

    #[test]
    fn test_normalize_is_case_insensitive() {
        assert_eq!(normalize("1 main st"), normalize("1 MAIN ST"));
        assert_eq!(normalize("1 Main Street"), normalize("1 main st"));
    }

    #[test]
    fn test_key_drops_commas() {
        let a = normalize("1 Main St, Los Angeles, CA");
        let b = normalize("1 Main Street Los Angeles CA");
        assert_eq!(a.key(), b.key());
        assert_eq!(a.key(), "1 MAIN STREET LOS ANGELES CA");
    }

    #[test]
    fn test_abbreviate() {
        assert_eq!(abbreviate("337 North Croft Avenue"), "337 N CROFT AVE");
        assert_eq!(abbreviate("3144 NICHOLS CANYON RD."), "3144 NICHOLS CANYON RD");
    }

    #[test]
    fn test_strip_unit() {
        assert_eq!(strip_unit("100 MAIN ST APT 4"), "100 MAIN ST");
        assert_eq!(strip_unit("100 MAIN ST, UNIT B, LA"), "100 MAIN ST, LA");
        assert_eq!(strip_unit("100 MAIN ST #12, LA"), "100 MAIN ST, LA");
        assert!(has_unit("100 Main St Apt 4"));
        assert!(!has_unit("100 Main St"));
    }

    #[test]
    fn test_plausible_matches_deterministic_and_unique() {
        let address = Address::new(
            "100 Main St Apt 4, Los Angeles, CA, USA",
            AddressInputType::AutoComplete,
            None,
        );
        let first = plausible_matches(&address);
        let second = plausible_matches(&address);
        assert_eq!(first, second);

        let mut sorted = first.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), first.len());

        assert_eq!(first[0], "100 Main St Apt 4, Los Angeles, CA");
        assert!(first.contains(&"100 MAIN STREET APT 4, LOS ANGELES, CA".to_string()));
        assert!(first.contains(&"100 MAIN ST, LOS ANGELES, CA".to_string()));
    }

    #[test]
    fn test_plausible_matches_title_has_no_variants() {
        let address = Address::new("West Hollywood", AddressInputType::PropertyTitle, None);
        assert_eq!(plausible_matches(&address), vec!["West Hollywood".to_string()]);
    }

    #[test]
    fn test_url_slugs() {
        let slugs = url_slugs("Brentwood Private Estate");
        assert_eq!(slugs[0], "brentwood-private-estate");
        assert_eq!(slugs[1], "brentwoodprivateestate");

        let slugs = url_slugs("337 North Croft Avenue");
        assert_eq!(
            slugs,
            vec![
                "337-north-croft-avenue".to_string(),
                "337northcroftavenue".to_string(),
                "337-n-croft-ave".to_string(),
                "337ncroftave".to_string(),
            ]
        );
    }

    #[test]
    fn test_abbreviation_variants() {
        let variants = abbreviation_variants("337 North Croft Avenue");
        assert!(variants.contains(&"337 NORTH CROFT AVENUE".to_string()));
        assert!(variants.contains(&"337 N CROFT AVE".to_string()));
        assert!(variants.contains(&"337 N. CROFT AVE.".to_string()));
        assert!(variants.contains(&"337 NORTH CROFT".to_string()));
    }
}
