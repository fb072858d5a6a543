//! Process-local task list, used when no HTTP task store is configured.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use tokio::sync::Mutex;

use crate::interpreter::collaborator::{ActionExecutor, ExecutionReport};
use crate::models::command::{Priority, TaskAction};
use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Task {
    title: String,
    done: bool,
    started: bool,
    priority: Option<Priority>,
}

/// Per-user task lists held in memory.
#[derive(Debug, Default)]
pub struct MemoryTaskStore {
    tasks: Mutex<HashMap<String, Vec<Task>>>,
    log: Mutex<Vec<(String, TaskAction)>>,
}

impl MemoryTaskStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every action received, in order, with its user.
    pub async fn executed(&self) -> Vec<(String, TaskAction)> {
        self.log.lock().await.clone()
    }

    async fn apply(&self, action: &TaskAction, user_id: &str) -> ExecutionReport {
        let mut tasks = self.tasks.lock().await;
        let list = tasks.entry(user_id.to_owned()).or_default();

        if let TaskAction::Create { title, priority, .. } = action {
            list.push(Task {
                title: title.clone(),
                done: false,
                started: false,
                priority: *priority,
            });
            return ExecutionReport::ok(format!("Tarefa {} criada: {title}", list.len()));
        }
        if matches!(action, TaskAction::List) {
            return ExecutionReport::ok(render(list));
        }

        let Some(index) = action.index() else {
            return ExecutionReport::ok(String::new());
        };
        let Some(task) = usize::try_from(index)
            .ok()
            .and_then(|i| i.checked_sub(1))
            .and_then(|i| list.get_mut(i))
            .filter(|task| !task.title.is_empty())
        else {
            return ExecutionReport {
                success: false,
                text: format!("Não existe a tarefa {index}."),
            };
        };

        let text = match action {
            TaskAction::Show { .. } => format!("{index}. {}", describe(task)),
            TaskAction::Complete { .. } => {
                task.done = true;
                format!("Tarefa {index} concluída.")
            }
            TaskAction::Start { .. } => {
                task.started = true;
                format!("Tarefa {index} em andamento.")
            }
            TaskAction::SetPriority { priority, .. } => {
                task.priority = Some(*priority);
                format!("Tarefa {index} agora tem prioridade {}.", priority.label())
            }
            TaskAction::Postpone { .. } => format!("Tarefa {index} adiada."),
            TaskAction::Delete { .. } => {
                let title = task.title.clone();
                // Blanked, not removed: later indices in a batch stay valid.
                task.title.clear();
                format!("Tarefa {index} apagada: {title}")
            }
            TaskAction::List | TaskAction::Create { .. } => String::new(),
        };
        ExecutionReport::ok(text)
    }
}

fn describe(task: &Task) -> String {
    let status = if task.done {
        "concluída"
    } else if task.started {
        "em andamento"
    } else {
        "pendente"
    };
    match task.priority {
        Some(priority) => format!("{} ({status}, prioridade {})", task.title, priority.label()),
        None => format!("{} ({status})", task.title),
    }
}

fn render(list: &[Task]) -> String {
    let lines: Vec<String> = list
        .iter()
        .enumerate()
        .filter(|(_, task)| !task.title.is_empty())
        .map(|(i, task)| format!("{}. {}", i + 1, describe(task)))
        .collect();
    if lines.is_empty() {
        "Você não tem tarefas.".to_owned()
    } else {
        lines.join("\n")
    }
}

impl ActionExecutor for MemoryTaskStore {
    fn execute(
        &self,
        action: &TaskAction,
        user_id: &str,
    ) -> Pin<Box<dyn Future<Output = Result<ExecutionReport>> + Send + '_>> {
        let action = action.clone();
        let user_id = user_id.to_owned();
        Box::pin(async move {
            self.log.lock().await.push((user_id.clone(), action.clone()));
            Ok(self.apply(&action, &user_id).await)
        })
    }
}
