use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Weekday;

use task_intercom::models::command::{
    DueDate, EntityName, EntityValue, EnumeratedValue, Priority,
};
use task_intercom::nlu::entities::{free_text, recover_original, EntityResolver, MAX_TITLE_CHARS};
use task_intercom::nlu::normalizer::NormalizerOptions;
use task_intercom::nlu::similarity::JaroWinkler;
use task_intercom::nlu::ParseError;

fn resolver(projects: &[&str]) -> EntityResolver {
    let projects: Vec<String> = projects.iter().map(|p| (*p).to_owned()).collect();
    EntityResolver::new(
        Arc::new(JaroWinkler),
        0.82,
        NormalizerOptions::default(),
        &projects,
    )
}

#[test]
fn priority_aliases_and_fillers() {
    let r = resolver(&[]);
    assert_eq!(r.resolve_priority("urgente"), Ok(Priority::Urgent));
    assert_eq!(r.resolve_priority("prioridade alta"), Ok(Priority::High));
    assert_eq!(r.resolve_priority("normal"), Ok(Priority::Medium));
    assert_eq!(r.resolve_priority("baixo"), Ok(Priority::Low));
}

#[test]
fn priority_typo_is_corrected() {
    assert_eq!(resolver(&[]).resolve_priority("urgnte"), Ok(Priority::Urgent));
}

#[test]
fn unknown_priority_fails_explicitly() {
    assert_eq!(
        resolver(&[]).resolve_priority("xyz"),
        Err(ParseError::UnknownPriority("xyz".into()))
    );
}

#[test]
fn relative_dates() {
    let r = resolver(&[]);
    assert_eq!(r.resolve_date("hoje"), Ok(DueDate::Today));
    assert_eq!(r.resolve_date("amanha"), Ok(DueDate::Tomorrow));
    assert_eq!(r.resolve_date("depois de amanha"), Ok(DueDate::DayAfterTomorrow));
    assert_eq!(r.resolve_date("semana que vem"), Ok(DueDate::NextWeek));
}

#[test]
fn weekdays_with_and_without_suffix() {
    let r = resolver(&[]);
    let friday = Ok(DueDate::Weekday { day: Weekday::Fri });
    assert_eq!(r.resolve_date("sexta"), friday);
    assert_eq!(r.resolve_date("sexta-feira"), friday);
    assert_eq!(r.resolve_date("para sexta"), friday);
}

#[test]
fn calendar_dates() {
    let r = resolver(&[]);
    assert_eq!(
        r.resolve_date("15/03"),
        Ok(DueDate::Calendar {
            day: 15,
            month: 3,
            year: None
        })
    );
    assert_eq!(
        r.resolve_date("15/03/27"),
        Ok(DueDate::Calendar {
            day: 15,
            month: 3,
            year: Some(2027)
        })
    );
    assert!(r.resolve_date("29/02").is_ok());
}

#[test]
fn impossible_calendar_dates_are_unknown() {
    let r = resolver(&[]);
    assert_eq!(r.resolve_date("31/02"), Err(ParseError::UnknownDate("31/02".into())));
    assert!(r.resolve_date("10/13").is_err());
}

#[test]
fn date_typo_is_corrected() {
    assert_eq!(resolver(&[]).resolve_date("amnha"), Ok(DueDate::Tomorrow));
}

#[test]
fn unknown_date_fails_explicitly() {
    assert_eq!(
        resolver(&[]).resolve_date("xyzzy"),
        Err(ParseError::UnknownDate("xyzzy".into()))
    );
}

#[test]
fn project_snaps_to_configured_label() {
    let r = resolver(&["Casa", "Trabalho"]);
    assert_eq!(r.resolve_project("trabalho"), Ok("Trabalho".to_owned()));
    assert_eq!(r.resolve_project("trabaho"), Ok("Trabalho".to_owned()));
}

#[test]
fn unknown_project_keeps_trimmed_text() {
    let r = resolver(&["Casa"]);
    assert_eq!(r.resolve_project("  Academia  "), Ok("Academia".to_owned()));
}

#[test]
fn free_text_is_trimmed_and_bounded() {
    assert_eq!(
        free_text(EntityName::Title, "  comprar   pão ", MAX_TITLE_CHARS),
        Ok("comprar pão".to_owned())
    );
    assert_eq!(
        free_text(EntityName::Title, "   ", MAX_TITLE_CHARS),
        Err(ParseError::EmptyText(EntityName::Title))
    );
    let long = "a".repeat(MAX_TITLE_CHARS + 1);
    assert_eq!(
        free_text(EntityName::Title, &long, MAX_TITLE_CHARS),
        Err(ParseError::TextTooLong {
            entity: EntityName::Title,
            max: MAX_TITLE_CHARS
        })
    );
}

#[test]
fn recover_original_restores_case_and_accents() {
    let original = "criar Comprar PÃO amanhã";
    assert_eq!(
        recover_original(original, "comprar pao", NormalizerOptions::default()),
        "Comprar PÃO"
    );
}

#[test]
fn recover_original_falls_back_to_capture() {
    assert_eq!(
        recover_original("nada a ver", "comprar pao", NormalizerOptions::default()),
        "comprar pao"
    );
}

#[test]
fn extract_resolves_every_capture() {
    let mut captures = BTreeMap::new();
    captures.insert(EntityName::Indices, "1, 3-4".to_owned());
    captures.insert(EntityName::Priority, "alta".to_owned());

    let entities = resolver(&[])
        .extract(&captures, "prioridade 1, 3-4 alta")
        .expect("entities resolve");

    let Some(EntityValue::IndexSet(indices)) = entities.get(EntityName::Indices) else {
        panic!("indices missing");
    };
    assert_eq!(indices.as_slice(), &[1, 3, 4]);
    assert_eq!(
        entities.get(EntityName::Priority),
        Some(&EntityValue::Enumerated(EnumeratedValue::Priority(Priority::High)))
    );
}

#[test]
fn extract_stops_at_first_bad_entity() {
    let mut captures = BTreeMap::new();
    captures.insert(EntityName::Indices, "5-1".to_owned());
    let result = resolver(&[]).extract(&captures, "apagar 5-1");
    assert_eq!(result, Err(ParseError::InvertedRange { start: 5, end: 1 }));
}

#[test]
fn slot_value_for_indices_skips_articles() {
    let value = resolver(&[])
        .parse_entity(EntityName::Indices, "a tarefa 2", "a tarefa 2")
        .expect("index parses");
    let EntityValue::IndexSet(indices) = value else {
        panic!("expected an index set");
    };
    assert_eq!(indices.as_slice(), &[2]);
}

#[test]
fn slot_value_for_title_reads_original_text() {
    let value = resolver(&[])
        .parse_entity(EntityName::Title, "Ligar pro João", "ligar para joao")
        .expect("title parses");
    assert_eq!(value, EntityValue::FreeText("Ligar pro João".into()));
}
