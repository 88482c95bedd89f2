use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

pub const SUBJECT_MATHEMATIQUES: &str = "mathématiques";
pub const SUBJECT_FRANCAIS: &str = "français";
pub const SUBJECT_SCIENCES: &str = "sciences";
pub const SUBJECT_HISTOIRE_GEO: &str = "histoire-géo";
pub const SUBJECT_GEOGRAPHIE: &str = "géographie";
pub const SUBJECT_INFORMATIQUE: &str = "informatique";
pub const SUBJECT_ANGLAIS: &str = "anglais";
pub const SUBJECT_AUTRES: &str = "autres";

pub const DEFAULT_LANGUAGE: &str = "français";

// Folded, lowercase input. Group 1 is the ordinal, group 2 the cycle code.
static LEVEL_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^a-z0-9])([1-8])(?:e|er|ere|eme)?[_\- ]?(pr|eb|hs)(?:$|[^a-z0-9])")
        .expect("level token pattern compiles")
});

pub fn strip_accents(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '\u{0300}'..='\u{036f}' => {}
            'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => out.push('a'),
            'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' => out.push('A'),
            'ç' => out.push('c'),
            'Ç' => out.push('C'),
            'è' | 'é' | 'ê' | 'ë' => out.push('e'),
            'È' | 'É' | 'Ê' | 'Ë' => out.push('E'),
            'ì' | 'í' | 'î' | 'ï' => out.push('i'),
            'Ì' | 'Í' | 'Î' | 'Ï' => out.push('I'),
            'ñ' => out.push('n'),
            'Ñ' => out.push('N'),
            'ò' | 'ó' | 'ô' | 'õ' | 'ö' => out.push('o'),
            'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' => out.push('O'),
            'ù' | 'ú' | 'û' | 'ü' => out.push('u'),
            'Ù' | 'Ú' | 'Û' | 'Ü' => out.push('U'),
            'ý' | 'ÿ' => out.push('y'),
            'Ý' | 'Ÿ' => out.push('Y'),
            'œ' => out.push_str("oe"),
            'Œ' => out.push_str("OE"),
            'æ' => out.push_str("ae"),
            'Æ' => out.push_str("AE"),
            'ß' => out.push_str("ss"),
            '\u{2019}' | '\u{2018}' => out.push('\''),
            other => out.push(other),
        }
    }
    out
}

/// Accent-free lowercase form used for every comparison in the crate.
pub fn fold(input: &str) -> String {
    strip_accents(input).to_lowercase()
}

pub fn word_tokens(input: &str) -> Vec<String> {
    fold(input)
        .split(|ch: char| !ch.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

pub fn norm_token(input: &str) -> String {
    fold(input)
        .chars()
        .filter(|ch| ch.is_ascii_alphanumeric())
        .collect()
}

pub fn normalize_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<&str>>().join(" ")
}

/// Last path component, accepting both separators.
pub fn base_name(path: &str) -> &str {
    let trimmed = path.trim();
    trimmed
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(trimmed)
        .trim()
}

/// File name without its final extension.
pub fn file_stem(name: &str) -> &str {
    let base = base_name(name);
    match base.rfind('.') {
        Some(index) if index > 0 => &base[..index],
        _ => base,
    }
}

pub fn canonical_subject(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    if fold(trimmed) == "fr" {
        return SUBJECT_FRANCAIS.to_string();
    }

    recognize_subject(&word_tokens(trimmed))
        .map(ToOwned::to_owned)
        .unwrap_or_else(|| trimmed.to_lowercase())
}

/// Subject guessed from a document's path and id, for sources that carry none.
pub fn infer_subject(path: &str, id: &str) -> Option<&'static str> {
    let mut words = word_tokens(path);
    words.extend(word_tokens(id));
    recognize_subject(&words)
}

fn recognize_subject(words: &[String]) -> Option<&'static str> {
    let has_prefix = |prefix: &str| words.iter().any(|word| word.starts_with(prefix));
    let has_word = |value: &str| words.iter().any(|word| word == value);

    if has_prefix("math") || has_prefix("geometr") {
        return Some(SUBJECT_MATHEMATIQUES);
    }
    if has_prefix("francais") || has_word("french") {
        return Some(SUBJECT_FRANCAIS);
    }
    if has_prefix("histoire") || (has_prefix("history") && has_prefix("geograph")) {
        return Some(SUBJECT_HISTOIRE_GEO);
    }
    if has_word("svt")
        || has_prefix("science")
        || has_prefix("biolog")
        || has_prefix("physique")
        || has_prefix("chimie")
        || has_word("spttic")
    {
        return Some(SUBJECT_SCIENCES);
    }
    if has_word("geo") || has_prefix("geograph") {
        return Some(SUBJECT_GEOGRAPHIE);
    }
    if has_word("informatique") || has_word("tic") || has_word("computing") {
        return Some(SUBJECT_INFORMATIQUE);
    }
    if has_word("anglais") || has_word("english") {
        return Some(SUBJECT_ANGLAIS);
    }
    None
}

pub fn canonical_language(raw: &str) -> String {
    let folded = fold(raw)
        .replace(['_', '-', '.'], " ")
        .trim()
        .to_string();

    let canonical = match folded.as_str() {
        "fr" | "fra" | "fre" | "francais" | "french" => "français",
        "en" | "eng" | "english" | "anglais" => "anglais",
        "ln" | "lin" | "lingala" => "lingala",
        "kg" | "kk" | "kon" | "kikongo" | "kongo" => "kikongo",
        "sw" | "swa" | "swahili" | "kiswahili" => "swahili",
        "lu" | "lua" | "tsh" | "tshiluba" | "ciluba" | "chiluba" | "luba" => "tshiluba",
        _ => return raw.trim().to_string(),
    };
    canonical.to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cycle {
    Primaire,
    Secondaire,
}

impl Cycle {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Primaire => "primaire",
            Self::Secondaire => "secondaire",
        }
    }
}

/// One of the twelve canonical grades: years 1..=6 of each cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Grade {
    pub cycle: Cycle,
    pub year: u8,
}

impl Grade {
    pub fn new(cycle: Cycle, year: u8) -> Option<Self> {
        (1..=6).contains(&year).then_some(Self { cycle, year })
    }

    /// Directory-style level code used in corpus paths.
    pub fn level_token(self) -> String {
        match (self.cycle, self.year) {
            (Cycle::Primaire, 1) => "1ere_PR".to_string(),
            (Cycle::Primaire, year) => format!("{year}eme_PR"),
            (Cycle::Secondaire, 1) => "7eme_EB".to_string(),
            (Cycle::Secondaire, 2) => "8eme_EB".to_string(),
            (Cycle::Secondaire, 3) => "1ere_HS".to_string(),
            (Cycle::Secondaire, year) => format!("{}eme_HS", year - 2),
        }
    }

    fn from_level_code(ordinal: u8, code: &str) -> Option<Self> {
        match code {
            "pr" => Self::new(Cycle::Primaire, ordinal),
            "eb" if (7..=8).contains(&ordinal) => Self::new(Cycle::Secondaire, ordinal - 6),
            "hs" if (1..=4).contains(&ordinal) => Self::new(Cycle::Secondaire, ordinal + 2),
            _ => None,
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}e_{}", self.year, self.cycle.as_str())
    }
}

pub fn canonical_grade(raw: &str) -> Option<Grade> {
    let folded = fold(raw);
    let words = word_tokens(&folded);
    if words.is_empty() {
        return None;
    }

    if let Some(grade) = compact_grade(&words.concat()) {
        return Some(grade);
    }
    if let Some(grade) = grade_from_level_token(&folded) {
        return Some(grade);
    }

    let cycle = words.iter().find_map(|word| match word.as_str() {
        "primaire" | "primary" | "pr" => Some(Cycle::Primaire),
        "secondaire" | "secondary" => Some(Cycle::Secondaire),
        _ => None,
    })?;
    let year = words.iter().find_map(|word| parse_ordinal(word))?;
    Grade::new(cycle, year)
}

/// Canonical level token for `grade` first, then looser primary variants
/// that older corpus layouts used.
pub fn level_tokens_for_grade(grade: &str) -> Vec<String> {
    let Some(grade) = canonical_grade(grade) else {
        return Vec::new();
    };

    let mut tokens = vec![grade.level_token()];
    if grade.cycle == Cycle::Primaire {
        let year = grade.year;
        for variant in [
            format!("{year}e_PR"),
            format!("{year}eme"),
            format!("{year}e"),
        ] {
            if !tokens.contains(&variant) {
                tokens.push(variant);
            }
        }
    }
    tokens
}

/// Canonical level token encoded somewhere in a corpus path, if any.
pub fn detect_level_token(path: &str) -> Option<String> {
    grade_from_level_token(&fold(path)).map(Grade::level_token)
}

pub fn detect_cycle(path: &str) -> Option<Cycle> {
    if let Some(grade) = grade_from_level_token(&fold(path)) {
        return Some(grade.cycle);
    }
    let words = word_tokens(path);
    if words.iter().any(|word| word == "primaire") {
        return Some(Cycle::Primaire);
    }
    if words.iter().any(|word| word == "secondaire") {
        return Some(Cycle::Secondaire);
    }
    None
}

fn grade_from_level_token(folded: &str) -> Option<Grade> {
    LEVEL_TOKEN.captures_iter(folded).find_map(|captures| {
        let ordinal = captures.get(1)?.as_str().parse::<u8>().ok()?;
        Grade::from_level_code(ordinal, captures.get(2)?.as_str())
    })
}

fn compact_grade(joined: &str) -> Option<Grade> {
    let bytes = joined.as_bytes();
    if bytes.len() != 2 {
        return None;
    }
    let (letter, digit) = if bytes[0].is_ascii_digit() {
        (bytes[1], bytes[0])
    } else {
        (bytes[0], bytes[1])
    };
    if !digit.is_ascii_digit() {
        return None;
    }
    let year = digit - b'0';
    match letter {
        b'p' => Grade::new(Cycle::Primaire, year),
        b's' => Grade::new(Cycle::Secondaire, year),
        _ => None,
    }
}

fn parse_ordinal(word: &str) -> Option<u8> {
    let digits_end = word
        .find(|ch: char| !ch.is_ascii_digit())
        .unwrap_or(word.len());
    if digits_end == 0 {
        return None;
    }
    let suffix = &word[digits_end..];
    if !matches!(suffix, "" | "e" | "er" | "ere" | "em" | "eme" | "ieme") {
        return None;
    }
    let value = word[..digits_end].parse::<u8>().ok()?;
    (1..=6).contains(&value).then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_accents_folds_french_letters() {
        assert_eq!(strip_accents("Mathématiques à l'école"), "Mathematiques a l'ecole");
        assert_eq!(fold("ŒUVRE Élève"), "oeuvre eleve");
        assert_eq!(fold("e\u{0301}le\u{0300}ve"), "eleve");
    }

    #[test]
    fn word_tokens_split_on_any_separator() {
        assert_eq!(
            word_tokens("primaire/5eme_PR/Guide-Maths.pdf"),
            vec!["primaire", "5eme", "pr", "guide", "maths", "pdf"]
        );
        assert_eq!(norm_token("Guide Maths-5e"), "guidemaths5e");
    }

    #[test]
    fn base_name_and_stem_accept_both_separators() {
        assert_eq!(base_name("data\\rag_seed\\Guide.pdf"), "Guide.pdf");
        assert_eq!(base_name("primaire/5eme_PR/Guide.pdf"), "Guide.pdf");
        assert_eq!(file_stem("primaire/Guide.v2.pdf"), "Guide.v2");
        assert_eq!(file_stem(".hidden"), ".hidden");
    }

    #[test]
    fn canonical_subject_maps_common_variants() {
        assert_eq!(canonical_subject("math"), SUBJECT_MATHEMATIQUES);
        assert_eq!(canonical_subject("Mathematiques"), SUBJECT_MATHEMATIQUES);
        assert_eq!(canonical_subject("mathematics"), SUBJECT_MATHEMATIQUES);
        assert_eq!(canonical_subject("SVT"), SUBJECT_SCIENCES);
        assert_eq!(canonical_subject("science"), SUBJECT_SCIENCES);
        assert_eq!(canonical_subject("Histoire-Géographie"), SUBJECT_HISTOIRE_GEO);
        assert_eq!(canonical_subject("histoire"), SUBJECT_HISTOIRE_GEO);
        assert_eq!(canonical_subject("history-geography"), SUBJECT_HISTOIRE_GEO);
        assert_eq!(canonical_subject("géographie"), SUBJECT_GEOGRAPHIE);
        assert_eq!(canonical_subject("fr"), SUBJECT_FRANCAIS);
        assert_eq!(canonical_subject("  Lingala "), "lingala");
        assert_eq!(canonical_subject(""), "");
    }

    #[test]
    fn infer_subject_reads_path_and_id() {
        assert_eq!(
            infer_subject("primaire/5eme_PR/", "Guide-Maths-5e.pdf"),
            Some(SUBJECT_MATHEMATIQUES)
        );
        assert_eq!(infer_subject("secondaire/7eme_EB/", "Programme.pdf"), None);
    }

    #[test]
    fn canonical_grade_handles_ordinals_abbreviations_and_level_tokens() {
        let expect = |raw: &str, token: &str| {
            assert_eq!(
                canonical_grade(raw).map(|grade| grade.to_string()).as_deref(),
                Some(token),
                "input: {raw}"
            );
        };
        expect("5e_primaire", "5e_primaire");
        expect("5ème primaire", "5e_primaire");
        expect("5eme annee primaire", "5e_primaire");
        expect("P5", "5e_primaire");
        expect("5P", "5e_primaire");
        expect("1ère secondaire", "1e_secondaire");
        expect("S3", "3e_secondaire");
        expect("grade 3 secondaire", "3e_secondaire");
        expect("7eme_EB", "1e_secondaire");
        expect("1ere_HS", "3e_secondaire");
        expect("4eme HS", "6e_secondaire");
        expect("1er primaire", "1e_primaire");
        assert_eq!(canonical_grade("terminale"), None);
        assert_eq!(canonical_grade("9e secondaire"), None);
        assert_eq!(canonical_grade(""), None);
    }

    #[test]
    fn level_tokens_follow_cycle_mapping() {
        assert_eq!(
            level_tokens_for_grade("5e_primaire"),
            vec!["5eme_PR", "5e_PR", "5eme", "5e"]
        );
        assert_eq!(level_tokens_for_grade("3e_secondaire"), vec!["1ere_HS"]);
        assert_eq!(level_tokens_for_grade("1e_secondaire"), vec!["7eme_EB"]);
        assert_eq!(level_tokens_for_grade("6e_secondaire"), vec!["4eme_HS"]);
        assert!(level_tokens_for_grade("unknown").is_empty());
    }

    #[test]
    fn detect_level_token_finds_directory_and_filename_codes() {
        assert_eq!(
            detect_level_token("primaire/5eme_PR/Guide.pdf").as_deref(),
            Some("5eme_PR")
        );
        assert_eq!(
            detect_level_token("2024_primaire_5eme_PR_mathématiques_Guide.pdf").as_deref(),
            Some("5eme_PR")
        );
        assert_eq!(
            detect_level_token("secondaire/2eme_HS/Physique.pdf").as_deref(),
            Some("2eme_HS")
        );
        assert_eq!(detect_level_token("primaire/Guide-Maths.pdf"), None);
        assert_eq!(detect_cycle("secondaire/Programme.pdf"), Some(Cycle::Secondaire));
        assert_eq!(detect_cycle("data/8eme_EB/x.pdf"), Some(Cycle::Secondaire));
    }

    #[test]
    fn canonical_language_maps_codes_and_keeps_unknown() {
        assert_eq!(canonical_language("FR"), "français");
        assert_eq!(canonical_language("english"), "anglais");
        assert_eq!(canonical_language("Kiswahili"), "swahili");
        assert_eq!(canonical_language("ciluba"), "tshiluba");
        assert_eq!(canonical_language(" Kinyarwanda "), "Kinyarwanda");
    }
}
