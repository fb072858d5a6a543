use std::collections::BTreeMap;
use std::sync::Arc;

use task_intercom::models::command::{
    DueDate, EntityName, EntityValue, EnumeratedValue, Intent, MatchKind, Priority,
};
use task_intercom::nlu::analyzer::{Analyzer, AnalyzerSettings, Verdict};
use task_intercom::nlu::matcher::{Candidate, Matcher};
use task_intercom::nlu::patterns::PatternTable;
use task_intercom::nlu::scorer::{Gate, Scorer};
use task_intercom::nlu::similarity::JaroWinkler;
use task_intercom::nlu::ParseError;

fn analyzer() -> Analyzer {
    Analyzer::new(&AnalyzerSettings::default()).expect("pattern table compiles")
}

fn indices(value: Option<&EntityValue>) -> Vec<u32> {
    match value {
        Some(EntityValue::IndexSet(set)) => set.as_slice().to_vec(),
        other => panic!("expected indices, got {other:?}"),
    }
}

fn candidate(intent: Intent, kind: MatchKind, covered_len: usize, text_len: usize) -> Candidate {
    Candidate {
        pattern_id: "test",
        intent,
        captures: BTreeMap::new(),
        literal_len: covered_len,
        covered_len,
        text_len,
        priority: 50,
        kind,
        order: 0,
    }
}

#[test]
fn builtin_table_compiles_with_keywords() {
    let table = PatternTable::builtin().expect("compiles");
    assert!(!table.patterns().is_empty());
    let keywords = table.keywords();
    for keyword in ["listar", "mostre", "feito", "apagar", "criar", "adiar", "prioridade"] {
        assert!(keywords.contains(&keyword), "missing keyword {keyword}");
    }
}

#[test]
fn complete_with_index_list() {
    let analysis = analyzer().analyze("Feito 1, 3 e 5!!!");
    assert_eq!(analysis.verdict, Verdict::Accepted);
    assert_eq!(analysis.parsed.intent, Intent::CompleteTask);
    assert_eq!(analysis.parsed.normalized_text, "feito 1, 3 e 5");
    assert_eq!(analysis.parsed.matched_pattern_id.as_deref(), Some("complete.idx"));
    assert_eq!(analysis.parsed.match_kind, Some(MatchKind::Exact));
    assert!((analysis.parsed.confidence - 1.0).abs() < 1e-9);
    assert_eq!(indices(analysis.parsed.entities.get(EntityName::Indices)), vec![1, 3, 5]);
}

#[test]
fn verbatim_match_beats_embedded_pattern() {
    let matcher = Matcher::new(
        PatternTable::builtin().expect("compiles"),
        Arc::new(JaroWinkler),
        0.82,
    );
    let found = matcher.candidates("feito 2");
    assert!(found.len() >= 2);
    assert_eq!(found[0].pattern_id, "complete.idx");
    assert!(found.iter().any(|c| c.pattern_id == "complete.embedded"));
}

#[test]
fn synonyms_share_an_intent() {
    let a = analyzer();
    for text in ["concluído 2", "marcar como feito 2", "terminei 2", "2 feito"] {
        let analysis = a.analyze(text);
        assert_eq!(analysis.parsed.intent, Intent::CompleteTask, "{text}");
        assert_eq!(indices(analysis.parsed.entities.get(EntityName::Indices)), vec![2]);
    }
}

#[test]
fn bare_verb_is_accepted_without_entities() {
    let analysis = analyzer().analyze("mostre");
    assert_eq!(analysis.verdict, Verdict::Accepted);
    assert_eq!(analysis.parsed.intent, Intent::ShowTask);
    assert!(analysis.parsed.entities.is_empty());
    assert!(analysis.parsed.confidence >= 0.75);
}

#[test]
fn typo_in_verb_is_corrected_with_a_penalty() {
    let analysis = analyzer().analyze("fieto 2");
    assert_eq!(analysis.parsed.intent, Intent::CompleteTask);
    assert!(matches!(analysis.parsed.match_kind, Some(MatchKind::Fuzzy { .. })));
    assert!(analysis.parsed.confidence < 1.0);
    assert!(analysis.parsed.confidence >= 0.75);
    assert_eq!(indices(analysis.parsed.entities.get(EntityName::Indices)), vec![2]);
}

#[test]
fn unrelated_text_is_low_confidence() {
    let analysis = analyzer().analyze("previsão do tempo");
    assert_eq!(analysis.verdict, Verdict::LowConfidence);
    assert_eq!(analysis.parsed.intent, Intent::None);
    assert!(analysis.parsed.matched_pattern_id.is_none());
    assert!(analysis.parsed.entities.is_empty());
}

#[test]
fn create_with_date_and_priority() {
    let analysis = analyzer().analyze("criar comprar pão amanhã prioridade alta");
    let entities = &analysis.parsed.entities;
    assert_eq!(analysis.parsed.intent, Intent::CreateTask);
    assert_eq!(
        entities.get(EntityName::Title),
        Some(&EntityValue::FreeText("comprar pão".into()))
    );
    assert_eq!(
        entities.get(EntityName::Date),
        Some(&EntityValue::Enumerated(EnumeratedValue::Date(DueDate::Tomorrow)))
    );
    assert_eq!(
        entities.get(EntityName::Priority),
        Some(&EntityValue::Enumerated(EnumeratedValue::Priority(Priority::High)))
    );
}

#[test]
fn create_keeps_title_casing() {
    let analysis = analyzer().analyze("criar Reunião com a Ana sexta");
    assert_eq!(
        analysis.parsed.entities.get(EntityName::Title),
        Some(&EntityValue::FreeText("Reunião com a Ana".into()))
    );
}

#[test]
fn set_priority_and_postpone() {
    let a = analyzer();

    let priority = a.analyze("prioridade 2 urgente");
    assert_eq!(priority.parsed.intent, Intent::SetPriority);
    assert_eq!(
        priority.parsed.entities.get(EntityName::Priority),
        Some(&EntityValue::Enumerated(EnumeratedValue::Priority(Priority::Urgent)))
    );

    let postpone = a.analyze("adiar 3 para sexta");
    assert_eq!(postpone.parsed.intent, Intent::PostponeTask);
    assert_eq!(indices(postpone.parsed.entities.get(EntityName::Indices)), vec![3]);
}

#[test]
fn small_talk_intents() {
    let a = analyzer();
    assert_eq!(a.analyze("oi").parsed.intent, Intent::Greeting);
    assert_eq!(a.analyze("Bom dia!").parsed.intent, Intent::Greeting);
    assert_eq!(a.analyze("ajuda").parsed.intent, Intent::Help);
    assert_eq!(a.analyze("cancelar").parsed.intent, Intent::Cancel);
    assert_eq!(a.analyze("listar").parsed.intent, Intent::ListTasks);
    assert_eq!(a.analyze("minhas tarefas").parsed.intent, Intent::ListTasks);
}

#[test]
fn malformed_entity_is_rejected_with_reason() {
    let analysis = analyzer().analyze("apagar 5-1");
    assert_eq!(analysis.parsed.intent, Intent::DeleteTask);
    assert_eq!(
        analysis.verdict,
        Verdict::Rejected(ParseError::InvertedRange { start: 5, end: 1 })
    );
}

#[test]
fn exact_full_coverage_scores_one() {
    let scored = Scorer::score(&candidate(Intent::ListTasks, MatchKind::Exact, 6, 6));
    assert!((scored.score - 1.0).abs() < 1e-9);
    assert!((scored.completeness - 1.0).abs() < 1e-9);
}

#[test]
fn gate_confident_above_threshold() {
    let scorer = Scorer::default();
    let gate = scorer.gate(&[candidate(Intent::ListTasks, MatchKind::Exact, 6, 6)]);
    assert!(matches!(gate, Gate::Confident(_)));
}

#[test]
fn gate_plausible_when_only_entities_are_missing() {
    let fuzzy = MatchKind::Fuzzy { similarity: 0.85 };
    let gate = Scorer::default().gate(&[candidate(Intent::ShowTask, fuzzy, 6, 6)]);
    assert!(matches!(gate, Gate::Plausible(_)), "{gate:?}");
}

#[test]
fn gate_low_for_poor_coverage() {
    let fuzzy = MatchKind::Fuzzy { similarity: 0.85 };
    let gate = Scorer::default().gate(&[candidate(Intent::ShowTask, fuzzy, 3, 6)]);
    assert!(matches!(gate, Gate::Low(Some(_))), "{gate:?}");
    assert_eq!(Scorer::default().gate(&[]), Gate::Low(None));
}

#[test]
fn gate_ties_keep_resolution_order() {
    let mut first = candidate(Intent::ListTasks, MatchKind::Exact, 6, 6);
    first.pattern_id = "first";
    let mut second = first.clone();
    second.pattern_id = "second";
    let Gate::Confident(best) = Scorer::default().gate(&[first, second]) else {
        panic!("expected a confident gate");
    };
    assert_eq!(best.candidate.pattern_id, "first");
}
