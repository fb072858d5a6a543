//! Dialogue state machine.
//!
//! `IDLE → AWAITING_ENTITY → IDLE` for slot filling and
//! `IDLE → AWAITING_CONFIRMATION → IDLE` for destructive commands.
//!
//! [`DialogueMachine::plan`] is pure: it reads the current state and the
//! message and returns the next state together with the effect to perform.
//! The interpreter commits the state before performing the effect.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::models::command::{
    Command, CommandError, Entities, EntityName, Intent, ParsedCommand,
};
use crate::models::dialogue::{
    DialogueState, LastMessage, Pending, PendingConfirmation, PendingSlot,
};
use crate::nlu::analyzer::{Analyzer, Verdict};
use crate::nlu::confirmation::{classify, is_cancellation, ConfirmationReply};
use crate::nlu::normalizer::{normalize_with, NormalizerOptions};

/// Acknowledgment for a repeated message.
pub const DUPLICATE_REPLY: &str = "Já recebi essa mensagem, estou cuidando dela.";

const CANCELLED_REPLY: &str = "Ok, cancelado.";
const DECLINED_REPLY: &str = "Ok, não vou apagar nada.";
const NOTHING_TO_CANCEL_REPLY: &str = "Não há nada para cancelar.";
const GREETING_REPLY: &str = "Oi! Em que posso ajudar? Envie \"ajuda\" para ver os comandos.";
const HELP_REPLY: &str = "Posso ajudar com suas tarefas:\n\
    • listar: mostra suas tarefas\n\
    • mostre 2: detalhes da tarefa 2\n\
    • feito 1 3 5: conclui tarefas\n\
    • comecar 2: marca como em andamento\n\
    • apagar 4: apaga (pede confirmação)\n\
    • criar comprar pão amanhã prioridade alta\n\
    • prioridade 2 urgente\n\
    • adiar 3 para sexta";

/// Timing knobs for the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MachineSettings {
    /// Lifetime of a pending slot or confirmation.
    pub pending_ttl: Duration,
    /// Repeated-message window.
    pub duplicate_window: Duration,
}

impl Default for MachineSettings {
    fn default() -> Self {
        Self {
            pending_ttl: Duration::seconds(120),
            duplicate_window: Duration::seconds(30),
        }
    }
}

/// Category of a locally produced reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    /// Asked for a missing entity.
    AwaitingEntity,
    /// Asked a yes/no question.
    AwaitingConfirmation,
    /// Pending exchange cancelled or declined.
    Cancelled,
    /// A supplied entity was malformed; the reply says how to fix it.
    Rejected,
    /// Help or greeting answered without a collaborator.
    Answered,
    /// Cancellation requested with nothing pending.
    NothingToCancel,
}

/// What the interpreter must do after committing the planned state.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Same text as the last message, inside the window.
    Duplicate,
    /// Nothing cleared the threshold; route to the fallback.
    LowConfidence {
        /// Best score seen.
        confidence: f64,
    },
    /// Send a reply; nothing is dispatched.
    Reply {
        /// Reply category.
        kind: ReplyKind,
        /// Reply text.
        text: String,
    },
    /// Dispatch the command to the task store.
    Dispatch {
        /// Validated command.
        command: Command,
    },
}

/// Planned transition.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    /// State to commit; `None` means leave storage untouched.
    pub state: Option<DialogueState>,
    /// Effect to perform once the state is committed.
    pub effect: Effect,
    /// Classification, when the message went through the analyzer.
    pub parsed: Option<ParsedCommand>,
}

impl Transition {
    fn write(state: DialogueState, effect: Effect, parsed: Option<ParsedCommand>) -> Self {
        Self {
            state: Some(state),
            effect,
            parsed,
        }
    }

    fn reply(state: DialogueState, kind: ReplyKind, text: impl Into<String>) -> Self {
        Self::write(
            state,
            Effect::Reply {
                kind,
                text: text.into(),
            },
            None,
        )
    }

    fn with_parsed(mut self, parsed: ParsedCommand) -> Self {
        self.parsed = Some(parsed);
        self
    }
}

/// Pure planner over [`DialogueState`].
#[derive(Debug, Clone)]
pub struct DialogueMachine {
    analyzer: Arc<Analyzer>,
    settings: MachineSettings,
}

impl DialogueMachine {
    /// Machine over a shared analyzer.
    #[must_use]
    pub fn new(analyzer: Arc<Analyzer>, settings: MachineSettings) -> Self {
        Self { analyzer, settings }
    }

    /// Analyzer in use.
    #[must_use]
    pub fn analyzer(&self) -> &Analyzer {
        &self.analyzer
    }

    /// Plan the transition for one message received at `now`.
    #[must_use]
    pub fn plan(&self, current: &DialogueState, original: &str, now: DateTime<Utc>) -> Transition {
        let mut state = current.clone();
        let expired = state.expire(now);
        if expired {
            debug!("pending dialogue expired");
        }

        let guard_text = normalize_with(original, NormalizerOptions { strip_emoji: false });
        if state.is_duplicate(&guard_text, now, self.settings.duplicate_window) {
            let touched = state.touch_last_message(now);
            return Transition {
                state: (touched || expired).then_some(state),
                effect: Effect::Duplicate,
                parsed: None,
            };
        }

        let normalized = self.analyzer.normalize(original);
        let next = DialogueState {
            pending: None,
            last_message: Some(LastMessage::new(&guard_text, now)),
        };

        match state.pending {
            Some(Pending::Slot(slot)) => self.fill_slot(next, slot, original, &normalized, now),
            Some(Pending::Confirmation(pending)) => {
                self.confirm(next, pending, original, &normalized, now)
            }
            None => self.fresh(next, original, &normalized, now),
        }
    }

    fn fill_slot(
        &self,
        mut next: DialogueState,
        slot: PendingSlot,
        original: &str,
        normalized: &str,
        now: DateTime<Utc>,
    ) -> Transition {
        if is_cancellation(normalized) {
            return Transition::reply(next, ReplyKind::Cancelled, CANCELLED_REPLY);
        }

        let resolver = self.analyzer.resolver();
        match resolver.parse_entity(slot.expected_entity, original, normalized) {
            Ok(value) => {
                let mut entities = slot.partial_entities;
                entities.insert(slot.expected_entity, value);
                self.advance(next, slot.intent, entities, now)
            }
            Err(err) => {
                debug!(entity = slot.expected_entity.as_str(), %err, "slot value rejected");
                next.pending = Some(Pending::Slot(slot));
                Transition::reply(next, ReplyKind::Rejected, err.corrective_prompt())
            }
        }
    }

    fn confirm(
        &self,
        mut next: DialogueState,
        pending: PendingConfirmation,
        original: &str,
        normalized: &str,
        now: DateTime<Utc>,
    ) -> Transition {
        match classify(original) {
            ConfirmationReply::Yes => {
                debug!(action_id = %pending.action_id, "confirmed");
                Transition::write(
                    next,
                    Effect::Dispatch {
                        command: pending.command,
                    },
                    None,
                )
            }
            ConfirmationReply::No => {
                debug!(action_id = %pending.action_id, "declined");
                Transition::reply(next, ReplyKind::Cancelled, DECLINED_REPLY)
            }
            ConfirmationReply::Ambiguous => {
                let question = confirmation_question(&pending.command);
                next.pending = Some(Pending::Confirmation(pending));
                let attempt = self.fresh(next, original, normalized, now);
                if matches!(attempt.effect, Effect::LowConfidence { .. }) {
                    // Nothing written: the question stays open as it was.
                    Transition {
                        state: None,
                        effect: Effect::Reply {
                            kind: ReplyKind::AwaitingConfirmation,
                            text: format!("Não entendi. {question}"),
                        },
                        parsed: attempt.parsed,
                    }
                } else {
                    attempt
                }
            }
        }
    }

    /// Classify from scratch. Leaves `next.pending` alone unless the
    /// outcome opens a new exchange.
    fn fresh(
        &self,
        mut next: DialogueState,
        original: &str,
        normalized: &str,
        now: DateTime<Utc>,
    ) -> Transition {
        let analysis = self.analyzer.analyze_normalized(original, normalized);
        let parsed = analysis.parsed;

        match analysis.verdict {
            Verdict::LowConfidence => Transition {
                state: None,
                effect: Effect::LowConfidence {
                    confidence: parsed.confidence,
                },
                parsed: Some(parsed),
            },
            Verdict::Rejected(err) => {
                Transition::reply(next, ReplyKind::Rejected, err.corrective_prompt())
                    .with_parsed(parsed)
            }
            Verdict::Accepted => match parsed.intent {
                Intent::Help => {
                    Transition::reply(next, ReplyKind::Answered, HELP_REPLY).with_parsed(parsed)
                }
                Intent::Greeting => {
                    Transition::reply(next, ReplyKind::Answered, GREETING_REPLY).with_parsed(parsed)
                }
                Intent::Cancel => {
                    let (kind, text) = if next.pending.take().is_some() {
                        (ReplyKind::Cancelled, CANCELLED_REPLY)
                    } else {
                        (ReplyKind::NothingToCancel, NOTHING_TO_CANCEL_REPLY)
                    };
                    Transition::reply(next, kind, text).with_parsed(parsed)
                }
                intent => {
                    let entities = parsed.entities.clone();
                    self.advance(next, intent, entities, now).with_parsed(parsed)
                }
            },
        }
    }

    /// Dispatch, ask for confirmation, or ask for the next missing entity.
    fn advance(
        &self,
        mut next: DialogueState,
        intent: Intent,
        entities: Entities,
        now: DateTime<Utc>,
    ) -> Transition {
        match Command::from_entities(intent, &entities) {
            Ok(command) if intent.requires_confirmation() => {
                let question = confirmation_question(&command);
                let pending = PendingConfirmation::new(command, now, self.settings.pending_ttl);
                next.pending = Some(Pending::Confirmation(pending));
                Transition::reply(next, ReplyKind::AwaitingConfirmation, question)
            }
            Ok(command) => Transition::write(next, Effect::Dispatch { command }, None),
            Err(CommandError::Missing(entity)) => {
                next.pending = Some(Pending::Slot(PendingSlot {
                    intent,
                    expected_entity: entity,
                    partial_entities: entities,
                    created_at: now,
                    expires_at: now + self.settings.pending_ttl,
                }));
                Transition::reply(next, ReplyKind::AwaitingEntity, entity_prompt(intent, entity))
            }
            Err(CommandError::NotActionable(_)) => {
                Transition::reply(next, ReplyKind::Answered, HELP_REPLY)
            }
        }
    }
}

/// Question asked for one missing entity.
#[must_use]
pub fn entity_prompt(intent: Intent, entity: EntityName) -> String {
    match entity {
        EntityName::Indices => {
            let question = match intent {
                Intent::ShowTask => "Qual tarefa você quer ver?",
                Intent::CompleteTask => "Qual tarefa você concluiu?",
                Intent::StartTask => "Qual tarefa você vai começar?",
                Intent::DeleteTask => "Qual tarefa você quer apagar?",
                Intent::SetPriority => "De qual tarefa você quer mudar a prioridade?",
                Intent::PostponeTask => "Qual tarefa você quer adiar?",
                _ => "Qual tarefa?",
            };
            format!("{question} Envie o número, por exemplo: 2")
        }
        EntityName::Title => "Qual é o título da nova tarefa?".to_owned(),
        EntityName::Priority => "Qual prioridade? baixa, média, alta ou urgente.".to_owned(),
        EntityName::Date => "Para quando? Por exemplo: amanhã, sexta ou 15/03.".to_owned(),
        EntityName::Project => "Qual projeto?".to_owned(),
    }
}

/// Yes/no question bound to a command.
#[must_use]
pub fn confirmation_question(command: &Command) -> String {
    match command {
        Command::DeleteTask { indices } if indices.len() == 1 => {
            format!("Tem certeza que quer apagar a tarefa {indices}? Responda sim ou não.")
        }
        Command::DeleteTask { indices } => {
            format!("Tem certeza que quer apagar as tarefas {indices}? Responda sim ou não.")
        }
        other => format!("Confirma {}? Responda sim ou não.", other.intent()),
    }
}
