use task_intercom::nlu::normalizer::{normalize, normalize_with, NormalizerOptions};

const NOISY: &[&str] = &[
    "Feito 1, 3 e 5!!!",
    "MOSTRE   a tarefa   dois",
    "marcar como concluído 4",
    "criar Comprar PÃO amanhã prioridade ALTA",
    "apagaaaar 3–5",
    "oiiiiiii 😀😀",
    "  ,, ,,  ",
    "deixa pra lá",
    "adiar 2 pra sexta-feira",
    "prioridade da 3 para urgente",
    "1 , ,2 ,,3-4",
    "não quero mais",
    "e aí, o que vc faz?",
    "feito um",
    "feito 2 e um",
    "primeira e terceira",
    "𝓕𝓮𝓲𝓽𝓸 2",
    "ﬁnalizado 7",
    "",
];

#[test]
fn normalize_is_idempotent_over_noisy_corpus() {
    for options in [
        NormalizerOptions { strip_emoji: true },
        NormalizerOptions { strip_emoji: false },
    ] {
        for input in NOISY {
            let once = normalize_with(input, options);
            let twice = normalize_with(&once, options);
            assert_eq!(once, twice, "not idempotent for {input:?} ({options:?})");
        }
    }
}

#[test]
fn normalize_never_leaves_edge_whitespace() {
    for input in NOISY {
        let out = normalize(input);
        assert_eq!(out.trim(), out, "edge whitespace for {input:?}");
        assert!(!out.contains("  "), "double space for {input:?}");
    }
}

#[test]
fn folds_compatibility_forms() {
    assert_eq!(normalize("𝓕𝓮𝓲𝓽𝓸 2"), "feito 2");
    assert_eq!(normalize("ﬁnalizado 7"), "feito 7");
}

#[test]
fn list_separators_are_tidied() {
    assert_eq!(normalize("Feito 1, 3 e 5!!!"), "feito 1, 3 e 5");
    assert_eq!(normalize("1 , ,2 ,,3-4"), "1, 2, 3-4");
}

#[test]
fn phrases_collapse_to_canonical_words() {
    assert_eq!(normalize("não quero mais"), "cancelar");
    assert_eq!(normalize("e aí"), "oi");
    assert_eq!(normalize("o que vc faz?"), "ajuda");
}

#[test]
fn article_um_stays_a_word_inside_titles() {
    assert_eq!(normalize("criar um lembrete"), "criar um lembrete");
    assert_eq!(normalize("mostre um"), "mostre 1");
}

#[test]
fn ordinals_become_digits() {
    assert_eq!(normalize("primeira e terceira"), "1 e 3");
}

#[test]
fn weekday_names_are_not_numbers() {
    assert_eq!(normalize("adiar 2 pra sexta-feira"), "adiar 2 para sexta-feira");
}
