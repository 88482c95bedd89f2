use pretty_assertions::assert_eq;

use super::*;

fn doc(id: &str, path: &str, subject: &str, level: Option<&str>) -> DocumentRecord {
    DocumentRecord {
        id: id.to_string(),
        title: crate::normalize::file_stem(id).to_string(),
        subject: subject.to_string(),
        level: level.map(ToOwned::to_owned),
        cycle: "autre".to_string(),
        language: "français".to_string(),
        path: path.to_string(),
        checksum: None,
        source_url: None,
        ingested_at: None,
    }
}

fn retriever_for(records: Vec<DocumentRecord>) -> Retriever {
    Retriever::new(
        Arc::new(CorpusIndex::from_records(records)),
        &RetrieverConfig::default(),
    )
}

fn sample_corpus() -> Vec<DocumentRecord> {
    vec![
        doc(
            "Guide-Maths-5e-Primaire.pdf",
            "primaire/5eme_PR/Guide-Maths-5e-Primaire.pdf",
            "mathématiques",
            Some("5e_primaire"),
        ),
        doc(
            "Programme-SVT-1ere-HS.pdf",
            "secondaire/1ere_HS/Programme-SVT-1ere-HS.pdf",
            "sciences",
            Some("3e_secondaire"),
        ),
        doc(
            "Lingala-Guide-2e.pdf",
            "primaire/2eme_PR/Lingala-Guide-2e.pdf",
            "lingala",
            Some("2e_primaire"),
        ),
    ]
}

#[test]
fn scenario_area_question_with_grade_hint_finds_primary_math_guide() {
    let retriever = retriever_for(vec![doc(
        "Guide-Maths-5e-Primaire.pdf",
        "primaire/5eme_PR/Guide-Maths-5e-Primaire.pdf",
        "mathématiques",
        None,
    )]);

    let query = Query::new("comment calculer l'aire d'un rectangle")
        .with_grade_hint(Some("5e_primaire"));
    let result = retriever.retrieve(&query, 3);

    assert_eq!(result.hits.len(), 1);
    assert_eq!(result.hits[0].document.id, "Guide-Maths-5e-Primaire.pdf");
    assert!(result.hits[0].score > 0.0);
}

#[test]
fn keyword_matches_the_start_of_a_document_token() {
    let retriever = retriever_for(vec![doc(
        "Guide-Maths-5e-Primaire.pdf",
        "primaire/5eme_PR/Guide-Maths-5e-Primaire.pdf",
        "sciences",
        None,
    )]);

    let result = retriever.retrieve(&Query::new("math"), 3);
    assert_eq!(result.doc_ids().collect::<Vec<&str>>(), vec!["Guide-Maths-5e-Primaire.pdf"]);
    assert_eq!(result.hits[0].matched_keywords, vec!["math"]);
    assert_eq!(result.hits[0].score, 1.0);
}

#[test]
fn keyword_inside_a_token_does_not_match() {
    let retriever = retriever_for(vec![doc(
        "Guide-Maths-5e-Primaire.pdf",
        "primaire/5eme_PR/Guide-Maths-5e-Primaire.pdf",
        "mathématiques",
        None,
    )]);

    let result = retriever.retrieve(&Query::new("aire"), 3);
    assert_eq!(result.keywords, vec!["aire"]);
    assert!(result.hits.is_empty());
}

#[test]
fn raw_subject_hint_counts_toward_the_score() {
    let retriever = retriever_for(vec![doc(
        "Guide-Maths-5e-Primaire.pdf",
        "primaire/5eme_PR/Guide-Maths-5e-Primaire.pdf",
        "mathématiques",
        None,
    )]);

    let query = Query::new("fractions en math").with_subject_hint(Some("math"));
    let result = retriever.retrieve(&query, 3);
    assert_eq!(result.keywords, vec!["fractions", "math", "mathematiques"]);
    assert_eq!(result.hits[0].matched_keywords, vec!["math", "mathematiques"]);
    assert!((result.hits[0].score - 2.0 / 3.0).abs() < 1e-9);
}

#[test]
fn keywords_drop_stopwords_short_tokens_and_accents() {
    let retriever = retriever_for(Vec::new());
    let keywords = retriever.keywords(&Query::new("Comment résoudre l'équation de la Géométrie ?"));
    assert_eq!(keywords, vec!["resoudre", "equation", "geometrie"]);
}

#[test]
fn hint_tokens_merge_raw_and_canonical_forms() {
    let retriever = retriever_for(Vec::new());
    let query = Query::new("fractions")
        .with_grade_hint(Some("P5"))
        .with_subject_hint(Some("math"));
    assert_eq!(
        retriever.keywords(&query),
        vec!["fractions", "primaire", "math", "mathematiques"]
    );
}

#[test]
fn empty_keyword_set_returns_empty_result() {
    let retriever = retriever_for(sample_corpus());
    for text in ["", "le la les de", "a b c", "?!"] {
        let result = retriever.retrieve(&Query::new(text), 3);
        assert!(result.keywords.is_empty(), "{text}");
        assert!(result.hits.is_empty(), "{text}");
    }
}

#[test]
fn synonyms_expand_path_segments() {
    let retriever = retriever_for(sample_corpus());

    let school = retriever.retrieve(&Query::new("école"), 3);
    let ids = school.doc_ids().collect::<Vec<&str>>();
    assert_eq!(ids, vec!["Guide-Maths-5e-Primaire.pdf", "Lingala-Guide-2e.pdf"]);

    let lycee = retriever.retrieve(&Query::new("biologie au lycée"), 3);
    assert_eq!(lycee.hits[0].document.id, "Programme-SVT-1ere-HS.pdf");
    assert_eq!(lycee.hits[0].score, 1.0);
}

#[test]
fn ranking_sorts_by_score_then_corpus_order_and_truncates() {
    let retriever = retriever_for(sample_corpus());

    let result = retriever.retrieve(&Query::new("guide lingala"), 3);
    let ranked = result
        .hits
        .iter()
        .map(|hit| (hit.rank, hit.document.id.as_str(), hit.score))
        .collect::<Vec<_>>();
    assert_eq!(
        ranked,
        vec![
            (1, "Lingala-Guide-2e.pdf", 1.0),
            (2, "Guide-Maths-5e-Primaire.pdf", 0.5),
        ]
    );

    let truncated = retriever.retrieve(&Query::new("guide"), 1);
    assert_eq!(truncated.hits.len(), 1);
    assert_eq!(truncated.hits[0].document.id, "Guide-Maths-5e-Primaire.pdf");
}

#[test]
fn repeated_retrieval_is_identical_with_and_without_cache() {
    let cached = retriever_for(sample_corpus());
    let uncached = Retriever::new(
        Arc::new(CorpusIndex::from_records(sample_corpus())),
        &RetrieverConfig {
            cache_capacity: 0,
            ..RetrieverConfig::default()
        },
    );

    let query = Query::new("guide de mathématiques").with_grade_hint(Some("5e primaire"));
    let first = cached.retrieve(&query, 3);
    let second = cached.retrieve(&query, 3);
    let third = uncached.retrieve(&query, 3);

    let render = |result: &RetrievalResult| serde_json::to_string(result).expect("serialize");
    assert_eq!(render(&first), render(&second));
    assert_eq!(render(&first), render(&third));
    assert_eq!(cached.stats().cache_hits, 1);
    assert_eq!(uncached.stats().cache_hits, 0);
}

#[test]
fn stats_count_queries_and_queries_with_hits() {
    let retriever = retriever_for(sample_corpus());
    retriever.retrieve(&Query::new("lingala"), 3);
    retriever.retrieve(&Query::new("astrophysique"), 3);
    retriever.retrieve(&Query::new(""), 3);

    let stats = retriever.stats();
    assert_eq!(stats.documents_loaded, 3);
    assert_eq!(stats.queries, 3);
    assert_eq!(stats.queries_with_hits, 1);
    assert!((stats.hit_rate - 1.0 / 3.0).abs() < 1e-9);
}

#[test]
fn custom_synonym_rules_are_injected() {
    let config = RetrieverConfig {
        synonyms: vec![SynonymRule {
            trigger: "Lingala".to_string(),
            match_mode: TriggerMatch::Exact,
            tokens: vec!["langue nationale".to_string()],
        }],
        ..RetrieverConfig::default()
    };
    let retriever = Retriever::new(
        Arc::new(CorpusIndex::from_records(sample_corpus())),
        &config,
    );

    let result = retriever.retrieve(&Query::new("nationale"), 3);
    assert_eq!(result.doc_ids().collect::<Vec<&str>>(), vec!["Lingala-Guide-2e.pdf"]);
}

#[test]
fn retriever_is_shareable_across_threads() {
    let retriever = Arc::new(retriever_for(sample_corpus()));
    let handles = (0..4)
        .map(|_| {
            let retriever = Arc::clone(&retriever);
            std::thread::spawn(move || retriever.retrieve(&Query::new("guide"), 3))
        })
        .collect::<Vec<_>>();

    let results = handles
        .into_iter()
        .map(|handle| handle.join().expect("thread completes"))
        .collect::<Vec<RetrievalResult>>();
    assert!(results.windows(2).all(|pair| pair[0] == pair[1]));
    assert_eq!(retriever.stats().queries, 4);
}
