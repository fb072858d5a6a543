use task_intercom::nlu::confirmation::{classify, is_cancellation, ConfirmationReply};

#[test]
fn affirmative_replies() {
    for text in ["sim", "Sim!", "siiim", "pode", "ok", "Sim, por favor", "👍", "👍🏽", "sim 👍"] {
        assert_eq!(classify(text), ConfirmationReply::Yes, "{text}");
    }
}

#[test]
fn negative_replies() {
    for text in ["não", "nao", "NÃO!", "n", "negativo", "cancelar", "👎", "❌"] {
        assert_eq!(classify(text), ConfirmationReply::No, "{text}");
    }
}

#[test]
fn unclear_replies_are_ambiguous() {
    for text in ["hmm", "sim não", "feito 2", "", "   ", "👍 👎"] {
        assert_eq!(classify(text), ConfirmationReply::Ambiguous, "{text}");
    }
}

#[test]
fn cancellation_accepts_filler_only() {
    assert!(is_cancellation("cancelar"));
    assert!(is_cancellation("nao"));
    assert!(is_cancellation("parar"));
    assert!(is_cancellation("cancelar tudo"));
    assert!(!is_cancellation("tudo"));
    assert!(!is_cancellation("2"));
    assert!(!is_cancellation("nao sei"));
}
