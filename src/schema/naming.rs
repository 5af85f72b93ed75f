//! Naming conventions: type-name casing and collection singularization.

/// Words that are their own singular.
const UNCOUNTABLE: &[&str] = &[
    "data",
    "equipment",
    "fish",
    "information",
    "metadata",
    "money",
    "news",
    "rice",
    "series",
    "sheep",
    "species",
];

/// Plural → singular pairs the suffix rules get wrong.
const IRREGULAR: &[(&str, &str)] = &[
    ("analyses", "analysis"),
    ("buses", "bus"),
    ("children", "child"),
    ("crises", "crisis"),
    ("feet", "foot"),
    ("geese", "goose"),
    ("halves", "half"),
    ("indices", "index"),
    ("knives", "knife"),
    ("leaves", "leaf"),
    ("lives", "life"),
    ("matrices", "matrix"),
    ("men", "man"),
    ("mice", "mouse"),
    ("movies", "movie"),
    ("oxen", "ox"),
    ("people", "person"),
    ("shoes", "shoe"),
    ("statuses", "status"),
    ("teeth", "tooth"),
    ("vertices", "vertex"),
    ("wives", "wife"),
    ("wolves", "wolf"),
    ("women", "woman"),
];

/// Ordered suffix rules; first match wins.
const SUFFIX_RULES: &[(&str, &str)] = &[
    ("ies", "y"),
    ("sses", "ss"),
    ("ches", "ch"),
    ("shes", "sh"),
    ("xes", "x"),
    ("zzes", "zz"),
    ("oes", "o"),
    ("ss", "ss"),
    ("us", "us"),
    ("is", "is"),
    ("s", ""),
];

fn is_separator(c: char) -> bool {
    matches!(c, '_' | '-' | ' ')
}

/// Upper camel case: `team_member` → `TeamMember`, `id` → `Id`.
///
/// Characters after the first of each word are kept as written, so an
/// already camel-cased name passes through unchanged.
pub fn camelize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper_next = true;
    for c in name.chars() {
        if is_separator(c) {
            upper_next = true;
            continue;
        }
        if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Lower camel case: `team_member` → `teamMember`.
pub fn camelize_lower(name: &str) -> String {
    let camel = camelize(name);
    let mut chars = camel.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => camel,
    }
}

/// Whether `name` is a legal GraphQL name: `[_A-Za-z][_0-9A-Za-z]*`.
pub fn is_graphql_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first == '_' || first.is_ascii_alphabetic() => {
            chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
        }
        _ => false,
    }
}

/// Byte offset where the last word of `name` starts.
fn last_word_start(name: &str) -> usize {
    let mut start = 0;
    let mut prev: Option<char> = None;
    for (i, c) in name.char_indices() {
        if is_separator(c) {
            start = i + c.len_utf8();
        } else if c.is_uppercase() && prev.map_or(false, |p| p.is_lowercase()) {
            start = i;
        }
        prev = Some(c);
    }
    start
}

/// Keep the capitalization of the first letter of `original` in `replacement`.
fn match_case(original: &str, replacement: &str) -> String {
    let upper = original.chars().next().map_or(false, char::is_uppercase);
    let mut chars = replacement.chars();
    match chars.next() {
        Some(first) if upper => first.to_uppercase().chain(chars).collect(),
        _ => replacement.to_string(),
    }
}

/// English singular of a (usually plural) collection name.
///
/// Only the last word is inflected: `team_members` → `team_member`,
/// `playerStats` → `playerStat`.
pub fn singularize(name: &str) -> String {
    let split = last_word_start(name);
    let (prefix, word) = name.split_at(split);
    let lower = word.to_lowercase();

    if lower.is_empty() || UNCOUNTABLE.contains(&lower.as_str()) {
        return name.to_string();
    }

    if let Some((_, singular)) = IRREGULAR.iter().find(|(plural, _)| *plural == lower) {
        return format!("{}{}", prefix, match_case(word, singular));
    }

    for (suffix, replacement) in SUFFIX_RULES {
        if lower.len() > suffix.len() && lower.ends_with(suffix) {
            // Suffixes are ASCII, so the byte cut lands on a char boundary.
            let stem = &word[..word.len() - suffix.len()];
            return format!("{}{}{}", prefix, stem, replacement);
        }
    }

    name.to_string()
}
