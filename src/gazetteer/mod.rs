use std::collections::HashSet;
use std::sync::LazyLock;

use serde::Deserialize;

/// Hand-curated place-name table, LatAm-biased. Swappable data: scoring only
/// talks to `expand_aliases` and `location_mentioned`.
static GAZETTEER: LazyLock<Gazetteer> = LazyLock::new(|| {
    serde_json::from_str(include_str!("data.json")).expect("gazetteer data.json is valid")
});

/// Substring matching ignores aliases shorter than this, measured in bytes:
/// two-letter ASCII codes ("py", "fl") would light up inside unrelated words,
/// while multibyte aliases (flag glyphs, accented names) stay matchable.
const MIN_CONTAINMENT_ALIAS_LEN: usize = 3;

#[derive(Debug, Deserialize)]
struct Gazetteer {
    countries: Vec<Country>,
}

#[derive(Debug, Deserialize)]
struct Country {
    #[allow(dead_code)]
    name: String,
    aliases: Vec<String>,
    subdivisions: Vec<Place>,
    cities: Vec<Place>,
}

#[derive(Debug, Deserialize)]
struct Place {
    #[allow(dead_code)]
    name: String,
    aliases: Vec<String>,
}

fn alias_set(aliases: &[String], token: &str) -> HashSet<String> {
    let mut set: HashSet<String> = aliases.iter().map(|a| a.to_lowercase()).collect();
    set.insert(token.to_string());
    set
}

/// The token plus every alias sharing its gazetteer entry. Lookup order is
/// countries, then all subdivisions, then all cities; the first entry whose
/// alias list contains the token wins. Unknown tokens degrade to a singleton.
pub fn expand_aliases(token: &str) -> HashSet<String> {
    let needle = token.trim().to_lowercase();

    for country in &GAZETTEER.countries {
        if country.aliases.iter().any(|a| a.to_lowercase() == needle) {
            return alias_set(&country.aliases, &needle);
        }
    }
    for country in &GAZETTEER.countries {
        for subdivision in &country.subdivisions {
            if subdivision.aliases.iter().any(|a| a.to_lowercase() == needle) {
                return alias_set(&subdivision.aliases, &needle);
            }
        }
    }
    for country in &GAZETTEER.countries {
        for city in &country.cities {
            if city.aliases.iter().any(|a| a.to_lowercase() == needle) {
                return alias_set(&city.aliases, &needle);
            }
        }
    }

    let mut singleton = HashSet::new();
    singleton.insert(needle);
    singleton
}

/// True iff any alias of `token` appears (case-insensitive) inside `text`.
pub fn location_mentioned(token: &str, text: &str) -> bool {
    let haystack = text.to_lowercase();
    expand_aliases(token)
        .iter()
        .filter(|alias| alias.len() >= MIN_CONTAINMENT_ALIAS_LEN)
        .any(|alias| haystack.contains(alias.as_str()))
}
