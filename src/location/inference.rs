//! Country inference from unstructured address text.
//!
//! Callers frequently leave the country field at its form default, so the
//! country has to be guessed from the address, city, postal code and venue
//! name: one structural postal-code check, then a priority-ordered keyword
//! scan over the raw and accent-folded text.

use regex::Regex;
use std::sync::LazyLock;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Country returned when nothing in the text points elsewhere.
pub const BASELINE_COUNTRY: &str = "france";

/// `NN-NNN` is the Polish postal code shape and nothing else in the table uses it.
static POLISH_POSTAL_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{2}-\d{3}\b").expect("postal code pattern compiles"));

const POLISH_POSTAL_COUNTRY: &str = "poland";

// ─── Keyword table ───────────────────────────────────────────────

/// A country identifier with the keywords that betray it.
///
/// Keywords match whole words only. Suffixes match the end of a word, for
/// languages that glue street types onto the name ("Hauptstraße").
pub struct CountryPattern {
    pub country: &'static str,
    pub keywords: &'static [&'static str],
    pub suffixes: &'static [&'static str],
}

/// Scanned top to bottom, first hit wins. Countries whose cities share
/// French spellings (Bruxelles, Genève, Montréal) sit above France.
pub const COUNTRY_PATTERNS: &[CountryPattern] = &[
    CountryPattern {
        country: "poland",
        keywords: &[
            "polska", "poland", "pologne", "warszawa", "warsaw", "varsovie",
            "kraków", "krakow", "cracovie", "gdańsk", "gdansk", "wrocław", "wroclaw",
            "poznań", "poznan", "łódź", "lodz", "katowice", "szczecin", "lublin", "ul.",
        ],
        suffixes: &[],
    },
    CountryPattern {
        country: "ukraine",
        keywords: &[
            "україна", "ukraine", "україни", "київ", "kyiv", "kiev", "львів", "lviv",
            "одеса", "odesa", "odessa", "харків", "kharkiv",
        ],
        suffixes: &[],
    },
    CountryPattern {
        country: "greece",
        keywords: &[
            "ελλάδα", "ελλαδα", "greece", "grèce", "αθήνα", "αθηνα", "athens", "athènes",
            "θεσσαλονίκη", "thessaloniki",
        ],
        suffixes: &[],
    },
    CountryPattern {
        country: "czech republic",
        keywords: &[
            "česko", "česká republika", "ceska republika", "czech", "tchèque", "tcheque",
            "praha", "prague", "brno", "ostrava",
        ],
        suffixes: &[],
    },
    CountryPattern {
        country: "belgium",
        keywords: &[
            "belgique", "belgië", "belgie", "belgium", "belgien", "bruxelles", "brussel",
            "brussels", "anvers", "antwerpen", "gent", "liège", "liege", "namur", "charleroi",
        ],
        suffixes: &[],
    },
    CountryPattern {
        country: "switzerland",
        keywords: &[
            "suisse", "schweiz", "svizzera", "switzerland", "genève", "geneve", "geneva",
            "zürich", "zurich", "lausanne", "basel", "bâle",
        ],
        suffixes: &[],
    },
    CountryPattern {
        country: "canada",
        keywords: &["canada", "québec", "quebec", "montréal", "montreal"],
        suffixes: &[],
    },
    CountryPattern {
        country: "germany",
        keywords: &[
            "deutschland", "germany", "allemagne", "berlin", "münchen", "muenchen",
            "munich", "hamburg", "hambourg", "köln", "koln", "frankfurt", "francfort",
            "stuttgart", "düsseldorf", "dusseldorf",
        ],
        suffixes: &["straße", "strasse"],
    },
    CountryPattern {
        country: "austria",
        keywords: &[
            "österreich", "osterreich", "austria", "autriche", "wien", "vienna",
            "salzburg", "graz", "innsbruck",
        ],
        suffixes: &[],
    },
    CountryPattern {
        country: "netherlands",
        keywords: &[
            "nederland", "netherlands", "pays-bas", "amsterdam", "rotterdam", "utrecht",
            "den haag", "la haye", "eindhoven",
        ],
        suffixes: &[],
    },
    CountryPattern {
        country: "spain",
        keywords: &[
            "españa", "espana", "spain", "espagne", "madrid", "barcelona", "barcelone",
            "sevilla", "séville", "valencia", "málaga", "malaga", "bilbao", "calle",
            "avenida",
        ],
        suffixes: &[],
    },
    CountryPattern {
        country: "portugal",
        keywords: &["portugal", "lisboa", "lisbonne", "lisbon", "porto", "rua"],
        suffixes: &[],
    },
    CountryPattern {
        country: "italy",
        keywords: &[
            "italia", "italy", "italie", "milano", "napoli", "torino", "firenze",
            "venezia", "via",
        ],
        suffixes: &[],
    },
    CountryPattern {
        country: "united kingdom",
        keywords: &[
            "united kingdom", "royaume-uni", "england", "angleterre", "scotland", "écosse",
            "wales", "london", "londres", "manchester", "edinburgh", "édimbourg",
        ],
        suffixes: &[],
    },
    CountryPattern {
        country: "ireland",
        keywords: &["ireland", "irlande", "éire", "dublin", "galway"],
        suffixes: &[],
    },
    CountryPattern {
        country: "morocco",
        keywords: &["maroc", "morocco", "المغرب", "casablanca", "marrakech", "الدار البيضاء"],
        suffixes: &[],
    },
    CountryPattern {
        country: "france",
        keywords: &[
            "france", "paris", "lyon", "marseille", "toulouse", "bordeaux", "lille",
            "nantes", "strasbourg",
        ],
        suffixes: &[],
    },
    CountryPattern {
        country: "luxembourg",
        keywords: &["luxembourg", "luxemburg", "lëtzebuerg", "esch-sur-alzette"],
        suffixes: &[],
    },
];

// ─── Normalization ───────────────────────────────────────────────

/// Lowercase, drop combining accents, and fold letters that carry no
/// decomposition (Polish `ł`, Nordic `ø`, ...) onto their Latin base.
pub fn normalize_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.to_lowercase().nfd().filter(|c| !is_combining_mark(*c)) {
        match c {
            'ł' => out.push('l'),
            'ø' => out.push('o'),
            'đ' => out.push('d'),
            'ı' => out.push('i'),
            'ß' => out.push_str("ss"),
            'æ' => out.push_str("ae"),
            'œ' => out.push_str("oe"),
            _ => out.push(c),
        }
    }
    out
}

// ─── Inference ───────────────────────────────────────────────────

/// Hyphens join parts of one place name ("Porto-Vecchio"), so they do not
/// end a word.
fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-'
}

/// `needle` occurs in `text` with no word character on either side.
fn contains_word(text: &str, needle: &str) -> bool {
    text.match_indices(needle).any(|(i, _)| {
        let before = text[..i].chars().next_back();
        let after = text[i + needle.len()..].chars().next();
        !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
    })
}

/// `suffix` closes a word somewhere in `text`.
fn ends_word(text: &str, suffix: &str) -> bool {
    text.match_indices(suffix)
        .any(|(i, _)| !text[i + suffix.len()..].chars().next().is_some_and(is_word_char))
}

/// Infer a lowercase country id, falling back to [`BASELINE_COUNTRY`].
pub fn infer_country(text: &str, entity_name: &str) -> String {
    infer_country_with(text, Some(entity_name), BASELINE_COUNTRY)
}

/// Infer a lowercase country id with an explicit baseline.
pub fn infer_country_with(text: &str, entity_name: Option<&str>, baseline: &str) -> String {
    let original = text.to_lowercase();

    if POLISH_POSTAL_CODE.is_match(&original) {
        return POLISH_POSTAL_COUNTRY.to_string();
    }

    let normalized = normalize_text(text);
    let name = entity_name
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(|n| (n.to_lowercase(), normalize_text(n)));

    let mut haystacks = vec![original.as_str(), normalized.as_str()];
    if let Some((raw, folded)) = &name {
        haystacks.extend([raw.as_str(), folded.as_str()]);
    }

    for pattern in COUNTRY_PATTERNS {
        let hit = haystacks.iter().any(|text| {
            pattern.keywords.iter().any(|kw| contains_word(text, kw))
                || pattern.suffixes.iter().any(|sfx| ends_word(text, sfx))
        });
        if hit {
            tracing::debug!(country = pattern.country, "country inferred from keywords");
            return pattern.country.to_string();
        }
    }

    baseline.trim().to_lowercase()
}

// ─── Display names and ISO codes ─────────────────────────────────

struct CountryName {
    id: &'static str,
    aliases: &'static [&'static str],
    display: &'static str,
    iso: &'static str,
}

const COUNTRY_NAMES: &[CountryName] = &[
    CountryName { id: "france", aliases: &["fr"], display: "France", iso: "fr" },
    CountryName { id: "belgium", aliases: &["belgique", "belgië", "belgien", "be"], display: "Belgium", iso: "be" },
    CountryName { id: "switzerland", aliases: &["suisse", "schweiz", "svizzera", "ch"], display: "Switzerland", iso: "ch" },
    CountryName { id: "luxembourg", aliases: &["luxemburg", "lëtzebuerg", "lu"], display: "Luxembourg", iso: "lu" },
    CountryName { id: "germany", aliases: &["deutschland", "allemagne", "de"], display: "Germany", iso: "de" },
    CountryName { id: "austria", aliases: &["österreich", "autriche", "at"], display: "Austria", iso: "at" },
    CountryName { id: "netherlands", aliases: &["nederland", "pays-bas", "the netherlands", "holland", "nl"], display: "Netherlands", iso: "nl" },
    CountryName { id: "spain", aliases: &["españa", "espagne", "es"], display: "Spain", iso: "es" },
    CountryName { id: "portugal", aliases: &["pt"], display: "Portugal", iso: "pt" },
    CountryName { id: "italy", aliases: &["italia", "italie", "it"], display: "Italy", iso: "it" },
    CountryName { id: "united kingdom", aliases: &["uk", "great britain", "royaume-uni", "england", "gb"], display: "United Kingdom", iso: "gb" },
    CountryName { id: "ireland", aliases: &["irlande", "éire", "ie"], display: "Ireland", iso: "ie" },
    CountryName { id: "poland", aliases: &["polska", "pologne", "pl"], display: "Poland", iso: "pl" },
    CountryName { id: "czech republic", aliases: &["czechia", "česko", "česká republika", "tchéquie", "cz"], display: "Czechia", iso: "cz" },
    CountryName { id: "ukraine", aliases: &["україна", "ua"], display: "Ukraine", iso: "ua" },
    CountryName { id: "greece", aliases: &["ελλάδα", "grèce", "gr"], display: "Greece", iso: "gr" },
    CountryName { id: "canada", aliases: &["ca"], display: "Canada", iso: "ca" },
    CountryName { id: "morocco", aliases: &["maroc", "المغرب", "ma"], display: "Morocco", iso: "ma" },
];

fn lookup(country: &str) -> Option<&'static CountryName> {
    let key = normalize_text(country.trim());
    if key.is_empty() {
        return None;
    }
    COUNTRY_NAMES.iter().find(|c| {
        normalize_text(c.id) == key || c.aliases.iter().any(|a| normalize_text(a) == key)
    })
}

/// Map any known spelling ("Polska", "BE", "Belgique") to its lowercase id.
pub fn canonical_country_id(country: &str) -> Option<&'static str> {
    lookup(country).map(|c| c.id)
}

/// Canonical English name for a country id; unknown input passes through.
pub fn country_display_name(country: &str) -> String {
    match lookup(country) {
        Some(c) => c.display.to_string(),
        None => country.to_string(),
    }
}

/// Lowercase ISO 3166-1 alpha-2 code, or `""` when the country is unknown.
pub fn country_iso_code(country: &str) -> &'static str {
    lookup(country).map(|c| c.iso).unwrap_or("")
}

/// Whether a caller-supplied country is too weak to trust: blank, or the
/// form default (any spelling of the baseline market).
pub fn is_generic_country(hint: &str, baseline: &str) -> bool {
    let hint = hint.trim();
    if hint.is_empty() {
        return true;
    }
    match (canonical_country_id(hint), canonical_country_id(baseline)) {
        (Some(a), Some(b)) => a == b,
        _ => normalize_text(hint) == normalize_text(baseline.trim()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_polish() {
        assert_eq!(normalize_text("Łódź"), "lodz");
        assert_eq!(normalize_text("Zażółć gęślą jaźń"), "zazolc gesla jazn");
        assert_eq!(normalize_text("Kraków"), "krakow");
    }

    #[test]
    fn test_normalize_other_scripts() {
        assert_eq!(normalize_text("Straße"), "strasse");
        assert_eq!(normalize_text("Tromsø"), "tromso");
        assert_eq!(normalize_text("Αθήνα"), "αθηνα");
    }

    #[test]
    fn test_postal_shape_wins() {
        assert_eq!(infer_country("ul. Floriańska 1, 31-021 Kraków", ""), "poland");
        // Postal code alone, no keyword anywhere.
        assert_eq!(infer_country("Rynek 5 00-950", ""), "poland");
        // Shape beats the France keyword.
        assert_eq!(infer_country("Rue de Paris 3, 12-345", ""), "poland");
    }

    #[test]
    fn test_keyword_match() {
        assert_eq!(infer_country("Grand Place, Bruxelles", ""), "belgium");
        assert_eq!(infer_country("Rue du Rhône 10 1204 Genève", ""), "switzerland");
        assert_eq!(infer_country("Hauptstraße 5 10115", ""), "germany");
        assert_eq!(infer_country("вул. Хрещатик 1, Київ", ""), "ukraine");
    }

    #[test]
    fn test_keyword_matches_folded_text() {
        // Typed with accents, keyword listed without.
        assert_eq!(infer_country("Plac Wolności 1, Wrocław", ""), "poland");
        // Typed without accents, keyword listed with and without.
        assert_eq!(infer_country("Rynek Glowny, Krakow", ""), "poland");
    }

    #[test]
    fn test_entity_name_signal() {
        assert_eq!(infer_country("Main Square 4", "Café Lisboa"), "portugal");
        assert_eq!(infer_country("Main Square 4", "Pierogarnia Łódź"), "poland");
    }

    #[test]
    fn test_keywords_inside_french_place_names_do_not_match() {
        assert_eq!(infer_country("12 Rue de Paris, Argenteuil 95100", ""), "france");
        assert_eq!(infer_country("3 Grande Rue, Nogent-sur-Marne 94130", ""), "france");
        assert_eq!(infer_country("Route de Bastia, Porto-Vecchio 20137", ""), "france");
        assert_eq!(infer_country("8 Boul. Haussmann, 75009", ""), "france");
        assert_eq!(
            infer_country("4 Rue Victor Hugo, Lyon 69002", "Secret Agent Airsoft"),
            "france"
        );
    }

    #[test]
    fn test_short_keywords_match_whole_words() {
        assert_eq!(infer_country("Korenmarkt 1, Gent", ""), "belgium");
        assert_eq!(infer_country("Rua Augusta 10, Porto", ""), "portugal");
        assert_eq!(infer_country("Via Roma 3", ""), "italy");
        assert_eq!(infer_country("ul. Długa 5", ""), "poland");
    }

    #[test]
    fn test_suffix_matches_compound_street_names() {
        assert_eq!(infer_country("Friedrichstraße 43", ""), "germany");
        assert_eq!(infer_country("Friedrichstrasse 43", ""), "germany");
        assert!(contains_word("rue de paris", "paris"));
        assert!(!contains_word("parisienne", "paris"));
        assert!(ends_word("hauptstrasse 5", "strasse"));
        assert!(!ends_word("strasser weg", "strasse"));
    }

    #[test]
    fn test_table_order_priority() {
        // Both Belgium (Bruxelles) and France (Paris) match; Belgium is listed first.
        assert_eq!(infer_country("Rue de Paris 12, Bruxelles", ""), "belgium");
    }

    #[test]
    fn test_baseline_when_nothing_matches() {
        assert_eq!(infer_country("Main Street 5", ""), BASELINE_COUNTRY);
        assert_eq!(infer_country("", ""), BASELINE_COUNTRY);
        assert_eq!(infer_country_with("Main Street 5", None, "Belgium"), "belgium");
    }

    #[test]
    fn test_display_name() {
        assert_eq!(country_display_name("poland"), "Poland");
        assert_eq!(country_display_name("Polska"), "Poland");
        assert_eq!(country_display_name("BELGIQUE"), "Belgium");
        assert_eq!(country_display_name("Atlantis"), "Atlantis");
    }

    #[test]
    fn test_iso_code() {
        assert_eq!(country_iso_code("poland"), "pl");
        assert_eq!(country_iso_code("united kingdom"), "gb");
        assert_eq!(country_iso_code("Česko"), "cz");
        assert_eq!(country_iso_code("atlantis"), "");
        assert_eq!(country_iso_code(""), "");
    }

    #[test]
    fn test_generic_country() {
        assert!(is_generic_country("", BASELINE_COUNTRY));
        assert!(is_generic_country("   ", BASELINE_COUNTRY));
        assert!(is_generic_country("France", BASELINE_COUNTRY));
        assert!(is_generic_country("FR", BASELINE_COUNTRY));
        assert!(!is_generic_country("Polska", BASELINE_COUNTRY));
        assert!(!is_generic_country("Japan", BASELINE_COUNTRY));
    }

    #[test]
    fn test_every_pattern_country_has_iso_code() {
        for pattern in COUNTRY_PATTERNS {
            assert!(!country_iso_code(pattern.country).is_empty(), "{}", pattern.country);
        }
    }
}
