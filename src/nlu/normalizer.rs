//! Total, idempotent text normalizer.
//!
//! Pipeline: lowercase and strip diacritics, map every character to a
//! letter, digit, list separator (`,` `-` `/`), optional emoji or space,
//! collapse letter runs to at most two, tidy separators and whitespace,
//! then canonicalize tokens (synonyms, phrases, spelled-out numbers).
//!
//! Each stage maps its own output to itself, which is what makes
//! `normalize(normalize(x)) == normalize(x)` hold.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Normalizer switches chosen once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizerOptions {
    /// Replace emoji with whitespace.
    pub strip_emoji: bool,
}

impl Default for NormalizerOptions {
    fn default() -> Self {
        Self { strip_emoji: true }
    }
}

/// Single-token synonyms, keyed by folded form.
///
/// No canonical value may appear as a key.
const SYNONYMS: &[(&str, &str)] = &[
    // complete
    ("feita", "feito"),
    ("feitos", "feito"),
    ("feitas", "feito"),
    ("fiz", "feito"),
    ("pronto", "feito"),
    ("pronta", "feito"),
    ("concluido", "feito"),
    ("concluida", "feito"),
    ("concluidos", "feito"),
    ("concluidas", "feito"),
    ("concluir", "feito"),
    ("conclui", "feito"),
    ("finalizado", "feito"),
    ("finalizada", "feito"),
    ("finalizar", "feito"),
    ("finalizei", "feito"),
    ("terminado", "feito"),
    ("terminada", "feito"),
    ("terminei", "feito"),
    ("terminar", "feito"),
    ("done", "feito"),
    // show
    ("mostra", "mostre"),
    ("mostrar", "mostre"),
    ("exibir", "mostre"),
    ("exibe", "mostre"),
    ("exiba", "mostre"),
    ("ver", "mostre"),
    ("veja", "mostre"),
    ("detalhe", "mostre"),
    ("detalhes", "mostre"),
    ("detalhar", "mostre"),
    ("abrir", "mostre"),
    ("abre", "mostre"),
    ("abra", "mostre"),
    ("show", "mostre"),
    // list
    ("lista", "listar"),
    ("liste", "listar"),
    ("listagem", "listar"),
    ("list", "listar"),
    // delete
    ("apaga", "apagar"),
    ("apague", "apagar"),
    ("deletar", "apagar"),
    ("delete", "apagar"),
    ("deleta", "apagar"),
    ("excluir", "apagar"),
    ("exclui", "apagar"),
    ("exclua", "apagar"),
    ("remover", "apagar"),
    ("remove", "apagar"),
    ("remova", "apagar"),
    // start
    ("comeca", "comecar"),
    ("comece", "comecar"),
    ("comecei", "comecar"),
    ("iniciar", "comecar"),
    ("inicia", "comecar"),
    ("inicie", "comecar"),
    ("iniciei", "comecar"),
    ("start", "comecar"),
    // postpone
    ("adia", "adiar"),
    ("adie", "adiar"),
    ("postergar", "adiar"),
    ("posterga", "adiar"),
    ("remarcar", "adiar"),
    ("remarca", "adiar"),
    ("reagendar", "adiar"),
    ("reagenda", "adiar"),
    // create
    ("cria", "criar"),
    ("crie", "criar"),
    ("adicionar", "criar"),
    ("adiciona", "criar"),
    ("adicione", "criar"),
    ("add", "criar"),
    ("anotar", "criar"),
    ("anota", "criar"),
    ("anote", "criar"),
    // priority
    ("prio", "prioridade"),
    ("prioridades", "prioridade"),
    // cancel
    ("cancela", "cancelar"),
    ("cancele", "cancelar"),
    ("esquece", "cancelar"),
    ("esqueca", "cancelar"),
    ("esquecer", "cancelar"),
    ("aborta", "cancelar"),
    ("abortar", "cancelar"),
    ("desisto", "cancelar"),
    // help
    ("ajudar", "ajuda"),
    ("help", "ajuda"),
    ("socorro", "ajuda"),
    ("comandos", "ajuda"),
    ("menu", "ajuda"),
    // greeting
    ("oii", "oi"),
    ("oie", "oi"),
    ("ola", "oi"),
    ("olaa", "oi"),
    ("opa", "oi"),
    ("eai", "oi"),
    ("hey", "oi"),
    ("hello", "oi"),
    ("salve", "oi"),
    // misc
    ("pra", "para"),
    ("vc", "voce"),
];

/// Multi-token phrases, matched against already-canonical tokens.
const PHRASES: &[(&[&str], &str)] = &[
    (&["marcar", "como", "feito"], "feito"),
    (&["marque", "como", "feito"], "feito"),
    (&["marca", "como", "feito"], "feito"),
    (&["deixa", "para", "la"], "cancelar"),
    (&["nao", "quero", "mais"], "cancelar"),
    (&["o", "que", "voce", "faz"], "ajuda"),
    (&["e", "ai"], "oi"),
];

/// Words that take an index right after them.
const INDEX_VERBS: &[&str] = &[
    "feito",
    "mostre",
    "apagar",
    "comecar",
    "adiar",
    "prioridade",
    "tarefa",
    "item",
    "numero",
];

/// Normalize with default options.
#[must_use]
pub fn normalize(text: &str) -> String {
    normalize_with(text, NormalizerOptions::default())
}

/// Normalize raw chat text.
#[must_use]
pub fn normalize_with(text: &str, options: NormalizerOptions) -> String {
    let folded = fold(text);
    let mapped: String = folded.chars().map(|c| map_char(c, options)).collect();
    let collapsed = collapse_letter_runs(&mapped);
    let tidied = tidy_separators(&collapsed);
    canonicalize_tokens(&tidied)
}

/// Synonym table as `(variant, canonical)` pairs.
#[must_use]
pub fn synonym_entries() -> &'static [(&'static str, &'static str)] {
    SYNONYMS
}

/// Whether `c` belongs to one of the emoji blocks.
#[must_use]
pub fn is_emoji(c: char) -> bool {
    matches!(
        u32::from(c),
        0x1F000..=0x1FAFF
            | 0x2300..=0x23FF
            | 0x2600..=0x27BF
            | 0x2B00..=0x2BFF
            | 0x200D
            | 0xFE0F
            | 0xE0020..=0xE007F
    )
}

fn fold(text: &str) -> String {
    let lowered: String = text.chars().flat_map(char::to_lowercase).collect();
    lowered
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

fn is_dash(c: char) -> bool {
    matches!(c, '\u{2010}'..='\u{2015}' | '\u{2212}' | '\u{FE58}' | '\u{FE63}' | '\u{FF0D}')
}

fn map_char(c: char, options: NormalizerOptions) -> char {
    if c.is_alphanumeric() || matches!(c, ',' | '-' | '/') {
        c
    } else if is_dash(c) {
        '-'
    } else if !options.strip_emoji && is_emoji(c) {
        c
    } else {
        ' '
    }
}

fn collapse_letter_runs(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut previous = None;
    let mut run = 0usize;
    for c in text.chars() {
        if Some(c) == previous && c.is_alphabetic() {
            run += 1;
            if run > 2 {
                continue;
            }
        } else {
            run = 1;
        }
        previous = Some(c);
        out.push(c);
    }
    out
}

/// Single spaces between tokens, `a, b` comma spacing, no doubled `-`/`/`,
/// no leading or trailing separators or whitespace.
fn tidy_separators(text: &str) -> String {
    fn flush(out: &mut String, pending_space: &mut bool) {
        if *pending_space && !out.is_empty() {
            out.push(' ');
        }
        *pending_space = false;
    }

    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;
    for c in text.chars() {
        match c {
            ' ' => pending_space = true,
            ',' => {
                if !out.is_empty() && !out.ends_with(',') {
                    out.push(',');
                }
                pending_space = true;
            }
            '-' | '/' => {
                if out.ends_with(c) && !pending_space {
                    continue;
                }
                flush(&mut out, &mut pending_space);
                out.push(c);
            }
            other => {
                flush(&mut out, &mut pending_space);
                out.push(other);
            }
        }
    }
    if out.ends_with(',') {
        out.pop();
    }
    out
}

#[derive(Debug, Clone)]
struct Token {
    core: String,
    comma: bool,
}

impl Token {
    fn parse(raw: &str) -> Self {
        match raw.strip_suffix(',') {
            Some(core) => Self {
                core: core.to_owned(),
                comma: true,
            },
            None => Self {
                core: raw.to_owned(),
                comma: false,
            },
        }
    }

    fn render(&self, out: &mut String) {
        out.push_str(&self.core);
        if self.comma {
            out.push(',');
        }
    }
}

fn canonicalize_tokens(text: &str) -> String {
    let mut tokens: Vec<Token> = text
        .split(' ')
        .filter(|raw| !raw.is_empty())
        .map(Token::parse)
        .collect();

    for token in &mut tokens {
        if let Some(canonical) = synonym(&token.core) {
            canonical.clone_into(&mut token.core);
        }
    }
    while replace_first_phrase(&mut tokens) {}
    convert_numbers(&mut tokens);

    let mut out = String::with_capacity(text.len());
    for (position, token) in tokens.iter().enumerate() {
        if position > 0 {
            out.push(' ');
        }
        token.render(&mut out);
    }
    out
}

fn synonym(core: &str) -> Option<&'static str> {
    SYNONYMS
        .iter()
        .find(|(variant, _)| *variant == core)
        .map(|(_, canonical)| *canonical)
}

fn replace_first_phrase(tokens: &mut Vec<Token>) -> bool {
    for start in 0..tokens.len() {
        for (phrase, canonical) in PHRASES {
            let end = start + phrase.len();
            if end > tokens.len() {
                continue;
            }
            let window = &tokens[start..end];
            let words_match = window
                .iter()
                .zip(phrase.iter())
                .all(|(token, word)| token.core == *word);
            let inner_commas = window[..window.len() - 1].iter().any(|token| token.comma);
            if words_match && !inner_commas {
                let comma = window[window.len() - 1].comma;
                tokens.splice(
                    start..end,
                    std::iter::once(Token {
                        core: (*canonical).to_owned(),
                        comma,
                    }),
                );
                return true;
            }
        }
    }
    false
}

fn number_word(core: &str) -> Option<u32> {
    let value = match core {
        "zero" => 0,
        "dois" | "duas" | "segundo" => 2,
        "tres" | "terceiro" | "terceira" => 3,
        "quatro" | "quarto" => 4,
        "cinco" | "quinto" => 5,
        "seis" | "sexto" => 6,
        "sete" | "setimo" | "setima" => 7,
        "oito" | "oitavo" | "oitava" => 8,
        "nove" | "nono" | "nona" => 9,
        "dez" | "decimo" | "decima" => 10,
        "onze" => 11,
        "doze" => 12,
        "treze" => 13,
        "catorze" | "quatorze" => 14,
        "quinze" => 15,
        "dezesseis" => 16,
        "dezessete" => 17,
        "dezoito" => 18,
        "dezenove" => 19,
        "vinte" => 20,
        "primeiro" | "primeira" => 1,
        _ => return None,
    };
    Some(value)
}

fn is_numeric(core: &str) -> bool {
    core.chars().any(|c| c.is_ascii_digit()) && core.chars().all(|c| c.is_ascii_digit() || c == '-')
}

/// Spelled-out numbers become digits. "um"/"uma" double as articles, so
/// they convert only next to another number or as the last word after an
/// index-taking verb.
fn convert_numbers(tokens: &mut [Token]) {
    for token in tokens.iter_mut() {
        if let Some(value) = number_word(&token.core) {
            token.core = value.to_string();
        }
    }

    loop {
        let mut changed = false;
        for position in 0..tokens.len() {
            if matches!(tokens[position].core.as_str(), "um" | "uma")
                && unit_reads_as_number(tokens, position)
            {
                tokens[position].core = "1".to_owned();
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
}

fn unit_reads_as_number(tokens: &[Token], position: usize) -> bool {
    let left = neighbour_left(tokens, position);
    let right = neighbour_right(tokens, position);

    let left_numeric = left.is_some_and(|token| is_numeric(&token.core));
    let right_numeric = right.is_some_and(|token| is_numeric(&token.core));
    let after_verb = position > 0
        && INDEX_VERBS.contains(&tokens[position - 1].core.as_str())
        && (position + 1 == tokens.len() || tokens[position].comma || right_numeric);

    left_numeric || right_numeric || after_verb
}

fn neighbour_left(tokens: &[Token], position: usize) -> Option<&Token> {
    let mut index = position.checked_sub(1)?;
    if tokens[index].core == "e" && !tokens[index].comma {
        index = index.checked_sub(1)?;
    }
    tokens.get(index)
}

fn neighbour_right(tokens: &[Token], position: usize) -> Option<&Token> {
    let mut index = position + 1;
    if tokens.get(index).is_some_and(|token| token.core == "e") {
        index += 1;
    }
    tokens.get(index)
}
