//! Task lifecycle: request, builder, status transitions, finalization.

use crate::context::DeviceContext;
use crate::state::AgentState;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

/// Default step budget for a task.
pub const DEFAULT_MAX_STEPS: u32 = 100;

/// Task lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }
}

/// Observer invoked on every status transition with `(status, message,
/// output)`. Failures inside the callback are logged and never affect the
/// task.
pub type StatusCallback = Arc<dyn Fn(TaskStatus, &str, Option<&Value>) + Send + Sync>;

/// Everything a task needs to run.
#[derive(Clone)]
pub struct TaskRequest {
    pub goal: String,
    pub name: Option<String>,
    pub profile: Option<String>,
    pub max_steps: u32,
    pub output_description: Option<String>,
    /// JSON Schema of the structured output shape.
    pub output_format: Option<Value>,
    pub locked_app_package: Option<String>,
    pub record_trace: bool,
    pub trace_path: Option<PathBuf>,
    pub thoughts_output_path: Option<PathBuf>,
    pub llm_output_path: Option<PathBuf>,
    pub on_status_changed: Option<StatusCallback>,
}

impl TaskRequest {
    pub fn new(goal: impl Into<String>) -> Self {
        Self {
            goal: goal.into(),
            name: None,
            profile: None,
            max_steps: DEFAULT_MAX_STEPS,
            output_description: None,
            output_format: None,
            locked_app_package: None,
            record_trace: false,
            trace_path: None,
            thoughts_output_path: None,
            llm_output_path: None,
            on_status_changed: None,
        }
    }

    pub fn builder(goal: impl Into<String>) -> TaskRequestBuilder {
        TaskRequestBuilder {
            request: Self::new(goal),
        }
    }
}

impl std::fmt::Debug for TaskRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskRequest")
            .field("goal", &self.goal)
            .field("name", &self.name)
            .field("profile", &self.profile)
            .field("max_steps", &self.max_steps)
            .field("output_description", &self.output_description)
            .field("output_format", &self.output_format)
            .field("locked_app_package", &self.locked_app_package)
            .field("record_trace", &self.record_trace)
            .field("on_status_changed", &self.on_status_changed.as_ref().map(|_| "<callback>"))
            .finish()
    }
}

/// Fluent builder for [`TaskRequest`].
pub struct TaskRequestBuilder {
    request: TaskRequest,
}

impl TaskRequestBuilder {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.request.name = Some(name.into());
        self
    }

    pub fn using_profile(mut self, profile: impl Into<String>) -> Self {
        self.request.profile = Some(profile.into());
        self
    }

    pub fn with_max_steps(mut self, max_steps: u32) -> Self {
        self.request.max_steps = max_steps;
        self
    }

    /// Declare a structured output shape as a JSON Schema.
    pub fn with_output_format(mut self, schema: Value) -> Self {
        self.request.output_format = Some(schema);
        self
    }

    /// Declare a free-form output instruction.
    pub fn with_output_description(mut self, description: impl Into<String>) -> Self {
        self.request.output_description = Some(description.into());
        self
    }

    pub fn with_locked_app_package(mut self, package: impl Into<String>) -> Self {
        self.request.locked_app_package = Some(package.into());
        self
    }

    pub fn with_trace_recording(mut self, enabled: bool, path: impl Into<PathBuf>) -> Self {
        self.request.record_trace = enabled;
        self.request.trace_path = Some(path.into());
        self
    }

    pub fn with_thoughts_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.request.thoughts_output_path = Some(path.into());
        self
    }

    pub fn with_llm_output_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.request.llm_output_path = Some(path.into());
        self
    }

    pub fn on_status_changed(mut self, callback: StatusCallback) -> Self {
        self.request.on_status_changed = Some(callback);
        self
    }

    pub fn build(self) -> TaskRequest {
        self.request
    }
}

/// One in-flight (or settled) task.
pub struct Task {
    pub id: String,
    pub device: DeviceContext,
    pub status: TaskStatus,
    pub request: TaskRequest,
    pub created_at: DateTime<Utc>,
    pub output: Option<Value>,
    pub error: Option<String>,
    pub last_state: Option<AgentState>,
}

impl Task {
    pub fn new(device: DeviceContext, request: TaskRequest) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            device,
            status: TaskStatus::Pending,
            request,
            created_at: Utc::now(),
            output: None,
            error: None,
            last_state: None,
        }
    }

    pub fn name(&self) -> String {
        self.request
            .name
            .clone()
            .unwrap_or_else(|| format!("task-{}", &self.id[..8]))
    }

    /// Transition status and notify the observer. Observer panics are
    /// contained.
    pub fn set_status(&mut self, status: TaskStatus, message: &str) {
        self.status = status;
        if let Some(callback) = &self.request.on_status_changed {
            let callback = Arc::clone(callback);
            let output = self.output.clone();
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                callback(status, message, output.as_ref())
            }));
            if result.is_err() {
                tracing::warn!(task = %self.name(), "status callback panicked");
            }
        }
    }

    /// Settle the task. Runs on every terminal path (normal completion,
    /// error, cancellation), recording the last committed state
    /// snapshot and the extracted output.
    pub fn finalize(
        &mut self,
        output: Option<Value>,
        last_state: Option<AgentState>,
        error: Option<String>,
        cancelled: bool,
    ) {
        self.output = output;
        self.last_state = last_state;
        self.error = error.clone();

        let (status, message) = if cancelled {
            (TaskStatus::Cancelled, "task cancelled".to_string())
        } else if let Some(error) = error {
            (TaskStatus::Failed, error)
        } else {
            (TaskStatus::Completed, "task completed".to_string())
        };
        tracing::info!(task = %self.name(), status = ?status, "finalizing task");
        self.set_status(status, &message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use device::DevicePlatform;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn device() -> DeviceContext {
        DeviceContext {
            platform: DevicePlatform::Android,
            device_id: "emulator-5554".into(),
            device_width: 1080,
            device_height: 1920,
        }
    }

    #[test]
    fn test_builder_sets_all_options() {
        let request = TaskRequest::builder("order a pizza")
            .with_name("pizza")
            .using_profile("fast")
            .with_max_steps(42)
            .with_output_description("the order number")
            .with_locked_app_package("com.ubercab.eats")
            .build();
        assert_eq!(request.max_steps, 42);
        assert_eq!(request.profile.as_deref(), Some("fast"));
        assert_eq!(request.locked_app_package.as_deref(), Some("com.ubercab.eats"));
    }

    #[test]
    fn test_finalize_terminal_statuses() {
        let mut task = Task::new(device(), TaskRequest::new("goal"));
        task.finalize(None, None, None, true);
        assert_eq!(task.status, TaskStatus::Cancelled);

        let mut task = Task::new(device(), TaskRequest::new("goal"));
        task.finalize(None, None, Some("boom".into()), false);
        assert_eq!(task.status, TaskStatus::Failed);
        assert_eq!(task.error.as_deref(), Some("boom"));

        let mut task = Task::new(device(), TaskRequest::new("goal"));
        task.finalize(Some(Value::String("ok".into())), None, None, false);
        assert_eq!(task.status, TaskStatus::Completed);
        assert!(task.status.is_terminal());
    }

    #[test]
    fn test_status_callback_panic_is_contained() {
        let calls = Arc::new(AtomicUsize::new(0));
        let observed = Arc::clone(&calls);
        let request = TaskRequest::builder("goal")
            .on_status_changed(Arc::new(move |status, _message, _output| {
                observed.fetch_add(1, Ordering::SeqCst);
                if status == TaskStatus::Completed {
                    panic!("observer bug");
                }
            }))
            .build();

        let mut task = Task::new(device(), request);
        task.set_status(TaskStatus::Running, "started");
        task.finalize(None, None, None, false);
        // Both transitions reached the callback; the panic in the second
        // did not propagate.
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(task.status, TaskStatus::Completed);
    }
}
