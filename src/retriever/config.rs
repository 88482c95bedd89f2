use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_DOCS: usize = 3;
pub const DEFAULT_CACHE_CAPACITY: usize = 256;
pub const DEFAULT_MIN_TOKEN_CHARS: usize = 3;

const DEFAULT_STOPWORDS: &[&str] = &[
    // fr
    "le", "la", "les", "un", "une", "de", "du", "des", "et", "ou", "est", "sont", "comment",
    "que", "qui", "quoi", "quel", "quelle", "quels", "quelles", "pour", "par", "sur", "dans",
    "avec", "sans", "aux", "au", "ce", "cet", "cette", "ces", "son", "sa", "ses", "mon", "ma",
    "mes", "leur", "leurs", "nous", "vous", "ils", "elles", "pas", "plus", "etre", "avoir",
    "faire", "fait", "peut", "entre",
    // en
    "the", "and", "for", "what", "how", "why", "with", "from", "that", "this", "are", "is",
    "was", "which", "does", "can",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerMatch {
    #[default]
    Exact,
    Prefix,
}

/// Extra tokens injected into a document's text when one of its title/path
/// tokens matches `trigger`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynonymRule {
    pub trigger: String,
    #[serde(default)]
    pub match_mode: TriggerMatch,
    pub tokens: Vec<String>,
}

impl SynonymRule {
    fn new(trigger: &str, match_mode: TriggerMatch, tokens: &[&str]) -> Self {
        Self {
            trigger: trigger.to_string(),
            match_mode,
            tokens: tokens.iter().map(|token| token.to_string()).collect(),
        }
    }

    pub fn matches(&self, token: &str) -> bool {
        match self.match_mode {
            TriggerMatch::Exact => token == self.trigger,
            TriggerMatch::Prefix => token.starts_with(self.trigger.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrieverConfig {
    pub stopwords: Vec<String>,
    /// Query tokens shorter than this are discarded.
    pub min_token_chars: usize,
    pub default_max_docs: usize,
    /// Entries kept in the per-retriever result cache; 0 disables caching.
    pub cache_capacity: usize,
    pub synonyms: Vec<SynonymRule>,
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self {
            stopwords: DEFAULT_STOPWORDS.iter().map(|word| word.to_string()).collect(),
            min_token_chars: DEFAULT_MIN_TOKEN_CHARS,
            default_max_docs: DEFAULT_MAX_DOCS,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            synonyms: default_synonyms(),
        }
    }
}

fn default_synonyms() -> Vec<SynonymRule> {
    use TriggerMatch::{Exact, Prefix};

    vec![
        SynonymRule::new("primaire", Exact, &["primaire", "école"]),
        SynonymRule::new("secondaire", Exact, &["secondaire", "lycée"]),
        SynonymRule::new("hs", Exact, &["secondaire", "lycée"]),
        SynonymRule::new("eb", Exact, &["secondaire", "lycée"]),
        SynonymRule::new("math", Prefix, &["mathématiques", "calcul", "géométrie"]),
        SynonymRule::new("svt", Exact, &["sciences", "biologie", "vie", "terre"]),
        SynonymRule::new("lingala", Exact, &["lingala", "langue"]),
        SynonymRule::new("kiswahili", Exact, &["kiswahili", "swahili", "langue"]),
        SynonymRule::new("ciluba", Exact, &["ciluba", "tshiluba", "langue"]),
    ]
}
