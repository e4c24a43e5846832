//! The task-scoped blackboard and its merge rules.
//!
//! Nodes never mutate [`AgentState`] directly: they build a [`StateUpdate`],
//! pass it through [`AgentState::sanitize_update`] (which drops illegal
//! writes and records the originating agent), and the runtime commits it.
//! Per-field merge semantics: thought and executor-message lists append,
//! everything else replaces.

use agentgraph::{GraphState, Message};
use device::UiElement;
use serde::{Deserialize, Serialize};

/// Lifecycle status of one planned step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubgoalStatus {
    NotStarted,
    Running,
    Success,
    Failure,
}

/// An atomic planned step with lifecycle status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subgoal {
    pub id: String,
    pub description: String,
    pub status: SubgoalStatus,
    pub completion_reason: Option<String>,
}

impl Subgoal {
    pub fn not_started(description: impl Into<String>) -> Self {
        Self {
            id: generate_subgoal_id(),
            description: description.into(),
            status: SubgoalStatus::NotStarted,
            completion_reason: None,
        }
    }
}

impl std::fmt::Display for Subgoal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {} ({:?})", self.id, self.description, self.status)?;
        if let Some(reason) = &self.completion_reason {
            write!(f, ": {reason}")?;
        }
        Ok(())
    }
}

/// Fresh, opaque subgoal id. New plans always generate fresh ids.
pub fn generate_subgoal_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..8].to_string()
}

// Plan queries and transitions. Exactly one subgoal may be Running; the
// transition helpers preserve that.

pub fn nothing_started(plan: &[Subgoal]) -> bool {
    plan.iter().all(|s| s.status == SubgoalStatus::NotStarted)
}

pub fn current_subgoal(plan: &[Subgoal]) -> Option<&Subgoal> {
    plan.iter().find(|s| s.status == SubgoalStatus::Running)
}

pub fn all_completed(plan: &[Subgoal]) -> bool {
    !plan.is_empty() && plan.iter().all(|s| s.status == SubgoalStatus::Success)
}

pub fn any_failure(plan: &[Subgoal]) -> bool {
    plan.iter().any(|s| s.status == SubgoalStatus::Failure)
}

/// Advance the first NotStarted subgoal to Running. Returns the newly
/// running subgoal, if any.
pub fn start_next_subgoal(plan: &mut [Subgoal]) -> Option<&Subgoal> {
    let index = plan
        .iter()
        .position(|s| s.status == SubgoalStatus::NotStarted)?;
    plan[index].status = SubgoalStatus::Running;
    Some(&plan[index])
}

pub fn fail_current_subgoal(plan: &mut [Subgoal], reason: &str) {
    if let Some(subgoal) = plan.iter_mut().find(|s| s.status == SubgoalStatus::Running) {
        subgoal.status = SubgoalStatus::Failure;
        subgoal.completion_reason = Some(reason.to_string());
    }
}

pub fn complete_subgoals_by_ids(plan: &mut [Subgoal], ids: &[String], reason: &str) {
    for subgoal in plan.iter_mut() {
        if ids.contains(&subgoal.id) {
            subgoal.status = SubgoalStatus::Success;
            subgoal.completion_reason = Some(reason.to_string());
        }
    }
}

pub fn subgoals_by_ids<'a>(plan: &'a [Subgoal], ids: &[String]) -> Vec<&'a Subgoal> {
    plan.iter().filter(|s| ids.contains(&s.id)).collect()
}

pub fn format_plan(plan: &[Subgoal]) -> String {
    plan.iter()
        .map(Subgoal::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

/// The shared task state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentState {
    /// The natural-language goal. Immutable after task start.
    pub initial_goal: String,
    pub subgoal_plan: Vec<Subgoal>,
    pub latest_ui_hierarchy: Option<Vec<UiElement>>,
    pub latest_screenshot: Option<String>,
    pub focused_app_info: Option<String>,
    pub device_date: Option<String>,
    pub screen_size: Option<(u32, u32)>,
    /// Stringified JSON of the Cortex's next action intents. Cleared once
    /// consumed by the Executor.
    pub structured_decisions: Option<String>,
    /// Subgoal ids the Cortex proposes as complete. Always cleared by the
    /// Orchestrator on exit.
    pub complete_subgoals_by_ids: Vec<String>,
    pub agents_thoughts: Vec<String>,
    pub executor_messages: Vec<Message>,
    pub cortex_last_thought: Option<String>,
    /// Node executions left in the budget. Set by the runtime only.
    pub remaining_steps: u32,
}

impl AgentState {
    pub fn new(goal: impl Into<String>, max_steps: u32) -> Self {
        Self {
            initial_goal: goal.into(),
            subgoal_plan: Vec::new(),
            latest_ui_hierarchy: None,
            latest_screenshot: None,
            focused_app_info: None,
            device_date: None,
            screen_size: None,
            structured_decisions: None,
            complete_subgoals_by_ids: Vec::new(),
            agents_thoughts: Vec::new(),
            executor_messages: Vec::new(),
            cortex_last_thought: None,
            remaining_steps: max_steps,
        }
    }

    /// Normalize an update before the runtime commits it: drop writes to
    /// immutable fields, reject clears of `complete_subgoals_by_ids` from
    /// anyone but the orchestrator, discard blank thoughts, and record the
    /// originating agent.
    pub fn sanitize_update(&self, agent: &str, mut update: StateUpdate) -> StateUpdate {
        if update.initial_goal.take().is_some() {
            tracing::warn!(agent, "dropping write to immutable field initial_goal");
        }

        if let Some(ids) = &mut update.complete_subgoals_by_ids {
            if ids.is_empty() && agent != "orchestrator" {
                tracing::warn!(agent, "only the orchestrator may clear complete_subgoals_by_ids");
                update.complete_subgoals_by_ids = None;
            } else if !ids.is_empty() {
                let known: Vec<String> = self.subgoal_plan.iter().map(|s| s.id.clone()).collect();
                ids.retain(|id| {
                    let keep = known.contains(id);
                    if !keep {
                        tracing::warn!(agent, id, "dropping unknown subgoal id from update");
                    }
                    keep
                });
            }
        }

        update.agents_thoughts.retain(|t| !t.trim().is_empty());
        update.agent = Some(agent.to_string());
        update
    }
}

/// A sanitized set of field updates. `Option` marks "field written";
/// double options distinguish writing `null` from not writing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StateUpdate {
    /// Originating agent, recorded by `sanitize_update`.
    pub agent: Option<String>,
    /// Attempted goal rewrite. Always dropped by the sanitizer.
    pub initial_goal: Option<String>,
    pub subgoal_plan: Option<Vec<Subgoal>>,
    pub latest_ui_hierarchy: Option<Vec<UiElement>>,
    pub latest_screenshot: Option<String>,
    pub focused_app_info: Option<Option<String>>,
    pub device_date: Option<String>,
    pub screen_size: Option<(u32, u32)>,
    pub structured_decisions: Option<Option<String>>,
    pub complete_subgoals_by_ids: Option<Vec<String>>,
    pub agents_thoughts: Vec<String>,
    pub executor_messages: Vec<Message>,
    pub cortex_last_thought: Option<Option<String>>,
}

impl StateUpdate {
    pub fn with_thought(mut self, thought: impl Into<String>) -> Self {
        self.agents_thoughts.push(thought.into());
        self
    }

    pub fn with_plan(mut self, plan: Vec<Subgoal>) -> Self {
        self.subgoal_plan = Some(plan);
        self
    }

    pub fn with_message(mut self, message: Message) -> Self {
        self.executor_messages.push(message);
        self
    }

    /// Clear the completion proposals (orchestrator exit invariant).
    pub fn clearing_complete_ids(mut self) -> Self {
        self.complete_subgoals_by_ids = Some(Vec::new());
        self
    }

    /// Fold another update into this one: lists append, replacing fields
    /// take the later writer. Used when one ExecutorTools superstep runs
    /// several tool calls and commits a single aggregate update.
    pub fn merge(&mut self, other: StateUpdate) {
        macro_rules! replace {
            ($field:ident) => {
                if other.$field.is_some() {
                    self.$field = other.$field;
                }
            };
        }
        replace!(agent);
        replace!(initial_goal);
        replace!(subgoal_plan);
        replace!(latest_ui_hierarchy);
        replace!(latest_screenshot);
        replace!(focused_app_info);
        replace!(device_date);
        replace!(screen_size);
        replace!(structured_decisions);
        replace!(complete_subgoals_by_ids);
        replace!(cortex_last_thought);
        self.agents_thoughts.extend(other.agents_thoughts);
        self.executor_messages.extend(other.executor_messages);
    }
}

impl GraphState for AgentState {
    type Update = StateUpdate;

    fn apply(&mut self, update: StateUpdate) {
        if let Some(plan) = update.subgoal_plan {
            self.subgoal_plan = plan;
        }
        if let Some(hierarchy) = update.latest_ui_hierarchy {
            self.latest_ui_hierarchy = Some(hierarchy);
        }
        if let Some(screenshot) = update.latest_screenshot {
            self.latest_screenshot = Some(screenshot);
        }
        if let Some(focused) = update.focused_app_info {
            self.focused_app_info = focused;
        }
        if let Some(date) = update.device_date {
            self.device_date = Some(date);
        }
        if let Some(size) = update.screen_size {
            self.screen_size = Some(size);
        }
        if let Some(decisions) = update.structured_decisions {
            self.structured_decisions = decisions;
        }
        if let Some(ids) = update.complete_subgoals_by_ids {
            self.complete_subgoals_by_ids = ids;
        }
        if let Some(thought) = update.cortex_last_thought {
            self.cortex_last_thought = thought;
        }
        self.agents_thoughts.extend(update.agents_thoughts);
        self.executor_messages.extend(update.executor_messages);
    }

    fn set_remaining_steps(&mut self, remaining: u32) {
        self.remaining_steps = remaining;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan_of(statuses: &[SubgoalStatus]) -> Vec<Subgoal> {
        statuses
            .iter()
            .enumerate()
            .map(|(i, status)| Subgoal {
                id: format!("sg{i}"),
                description: format!("step {i}"),
                status: *status,
                completion_reason: None,
            })
            .collect()
    }

    #[test]
    fn test_at_most_one_running_after_transitions() {
        let mut plan = plan_of(&[SubgoalStatus::NotStarted, SubgoalStatus::NotStarted]);
        start_next_subgoal(&mut plan);
        let running = plan
            .iter()
            .filter(|s| s.status == SubgoalStatus::Running)
            .count();
        assert_eq!(running, 1);

        complete_subgoals_by_ids(&mut plan, &["sg0".to_string()], "done");
        start_next_subgoal(&mut plan);
        let running = plan
            .iter()
            .filter(|s| s.status == SubgoalStatus::Running)
            .count();
        assert_eq!(running, 1);
    }

    #[test]
    fn test_plan_predicates() {
        assert!(!all_completed(&[]));
        let plan = plan_of(&[SubgoalStatus::Success, SubgoalStatus::Success]);
        assert!(all_completed(&plan));
        let plan = plan_of(&[SubgoalStatus::Success, SubgoalStatus::Failure]);
        assert!(any_failure(&plan));
        assert!(current_subgoal(&plan).is_none());
    }

    #[test]
    fn test_sanitizer_drops_goal_rewrite_and_records_agent() {
        let state = AgentState::new("order a pizza", 50);
        let update = StateUpdate {
            initial_goal: Some("something else".into()),
            ..Default::default()
        };
        let sanitized = state.sanitize_update("cortex", update);
        assert!(sanitized.initial_goal.is_none());
        assert_eq!(sanitized.agent.as_deref(), Some("cortex"));
    }

    #[test]
    fn test_sanitizer_guards_complete_ids_clearing() {
        let mut state = AgentState::new("goal", 50);
        state.subgoal_plan = plan_of(&[SubgoalStatus::Running]);

        // Non-orchestrator clear is rejected.
        let update = StateUpdate::default().clearing_complete_ids();
        let sanitized = state.sanitize_update("cortex", update);
        assert!(sanitized.complete_subgoals_by_ids.is_none());

        // Orchestrator clear passes.
        let update = StateUpdate::default().clearing_complete_ids();
        let sanitized = state.sanitize_update("orchestrator", update);
        assert_eq!(sanitized.complete_subgoals_by_ids, Some(Vec::new()));

        // Unknown ids are coerced away.
        let update = StateUpdate {
            complete_subgoals_by_ids: Some(vec!["sg0".into(), "bogus".into()]),
            ..Default::default()
        };
        let sanitized = state.sanitize_update("cortex", update);
        assert_eq!(sanitized.complete_subgoals_by_ids, Some(vec!["sg0".to_string()]));
    }

    #[test]
    fn test_apply_merge_semantics() {
        let mut state = AgentState::new("goal", 50);
        state.agents_thoughts.push("first".into());
        state.structured_decisions = Some("[]".into());

        let update = StateUpdate {
            structured_decisions: Some(None),
            agents_thoughts: vec!["second".into()],
            ..Default::default()
        };
        state.apply(update);

        assert_eq!(state.agents_thoughts, vec!["first", "second"]);
        assert!(state.structured_decisions.is_none());
    }

    #[test]
    fn test_update_merge_appends_and_replaces() {
        let mut left = StateUpdate::default()
            .with_thought("a")
            .with_message(Message::assistant("m1"));
        left.structured_decisions = Some(Some("x".into()));

        let mut right = StateUpdate::default().with_thought("b");
        right.structured_decisions = Some(None);

        left.merge(right);
        assert_eq!(left.agents_thoughts, vec!["a", "b"]);
        assert_eq!(left.executor_messages.len(), 1);
        assert_eq!(left.structured_decisions, Some(None));
    }
}
