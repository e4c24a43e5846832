//! The programmatic SDK surface: `Agent::init`, task execution with
//! single-flight discipline, output extraction, and teardown.

use crate::agents::outputter::{outputter, OutputConfig};
use crate::config::AgentConfig;
use crate::context::{DeviceContext, ExecutionSetup, MobiusContext};
use crate::errors::{AgentError, Result};
use crate::graph::build_graph;
use crate::recorder::{record_output, record_thoughts, TraceRecorder};
use crate::state::AgentState;
use crate::task::{Task, TaskRequest, TaskRequestBuilder, TaskStatus};
use crate::tools::ToolRegistry;
use agentgraph::{CancellationToken, RunConfig, StreamEvent};
use device::{
    get_first_device, AdbClient, AndroidProbe, BridgeBackend, DeviceController,
    DeviceHardwareClient, DevicePlatform, DeviceProbe, IosProbe, NativeBackend, ScreenApiClient,
    ScreenSource,
};
use llm::ProfileModelFactory;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{watch, Mutex, RwLock};
use tokio_stream::StreamExt;

struct AgentRuntime {
    device: DeviceContext,
    screen: Arc<ScreenApiClient>,
    adb: Option<AdbClient>,
    probe: Arc<dyn DeviceProbe>,
    bridge: DeviceHardwareClient,
}

struct RunningTask {
    id: String,
    cancel: CancellationToken,
    settled: watch::Receiver<bool>,
}

/// Entry point for host code. One task runs at a time per device; starting
/// a second task cancels the first and waits for it to settle.
pub struct Agent {
    config: AgentConfig,
    runtime: RwLock<Option<AgentRuntime>>,
    current: Mutex<Option<RunningTask>>,
}

impl Agent {
    pub fn new(config: AgentConfig) -> Self {
        Self {
            config,
            runtime: RwLock::new(None),
            current: Mutex::new(None),
        }
    }

    /// Probe the device and the external services. Everything that makes a
    /// task impossible surfaces here as [`AgentError::DeviceUnavailable`].
    pub async fn init(&self) -> Result<()> {
        let mut runtime = self.runtime.write().await;
        if runtime.is_some() {
            tracing::warn!("agent is already initialized, skipping");
            return Ok(());
        }

        let (device_id, platform) = match (&self.config.device_id, self.config.device_platform) {
            (Some(id), Some(platform)) => (id.clone(), platform),
            _ => get_first_device()
                .await
                .map_err(|e| AgentError::DeviceUnavailable(e.to_string()))?,
        };

        let bridge = DeviceHardwareClient::new(&self.config.servers.hw_bridge_base_url)
            .map_err(|e| AgentError::DeviceUnavailable(e.to_string()))?;
        bridge
            .banner_message()
            .await
            .map_err(|e| AgentError::DeviceUnavailable(format!("bridge unreachable: {e}")))?;

        let screen = Arc::new(
            ScreenApiClient::new(&self.config.servers.screen_api_base_url)
                .map_err(|e| AgentError::DeviceUnavailable(e.to_string()))?,
        );
        screen
            .health()
            .await
            .map_err(|e| AgentError::DeviceUnavailable(format!("screen API unhealthy: {e}")))?;
        let screen_data = screen
            .screen_data()
            .await
            .map_err(|e| AgentError::DeviceUnavailable(format!("no screen data: {e}")))?;

        let adb = match platform {
            DevicePlatform::Android => Some(AdbClient::new(&device_id)),
            DevicePlatform::Ios => None,
        };
        let probe: Arc<dyn DeviceProbe> = match &adb {
            Some(adb) => Arc::new(AndroidProbe::new(adb.clone())),
            None => Arc::new(IosProbe),
        };

        let device = DeviceContext {
            platform,
            device_id,
            device_width: screen_data.width,
            device_height: screen_data.height,
        };
        tracing::info!(
            device = %device.device_id,
            platform = device.platform.as_str(),
            width = device.device_width,
            height = device.device_height,
            "mobius agent initialized"
        );

        *runtime = Some(AgentRuntime {
            device,
            screen,
            adb,
            probe,
            bridge,
        });
        Ok(())
    }

    /// Start building a task request with the configured defaults.
    pub fn new_task(&self, goal: impl Into<String>) -> TaskRequestBuilder {
        TaskRequest::builder(goal).with_max_steps(self.config.default_max_steps)
    }

    /// Run a goal with default options.
    pub async fn run_goal(&self, goal: impl Into<String>) -> Result<Option<Value>> {
        let request = self.new_task(goal).build();
        self.run_task(request).await
    }

    /// Run a task to completion and return its extracted output.
    pub async fn run_task(&self, request: TaskRequest) -> Result<Option<Value>> {
        let ctx = self.build_task_context(&request).await?;

        // Single-flight: cancel and join any task already in flight, then
        // take ownership.
        let task_id = uuid::Uuid::new_v4().to_string();
        let cancel = CancellationToken::new();
        let (settled_tx, settled_rx) = watch::channel(false);
        {
            let mut current = self.current.lock().await;
            if let Some(previous) = current.take() {
                tracing::info!("replacing in-flight task, cancelling it first");
                previous.cancel.cancel();
                let mut settled = previous.settled.clone();
                if !*settled.borrow() {
                    let _ = settled.changed().await;
                }
            }
            *current = Some(RunningTask {
                id: task_id.clone(),
                cancel: cancel.clone(),
                settled: settled_rx,
            });
        }

        let mut task = Task::new(ctx.device.clone(), request.clone());
        task.id = task_id.clone();
        let result = self.drive_task(&mut task, ctx, cancel).await;

        let _ = settled_tx.send(true);
        {
            let mut current = self.current.lock().await;
            if current.as_ref().map(|t| t.id.as_str()) == Some(task_id.as_str()) {
                *current = None;
            }
        }
        result
    }

    /// Cooperatively cancel the in-flight task, if any, and wait for it to
    /// settle.
    pub async fn stop_current_task(&self) {
        let previous = { self.current.lock().await.take() };
        if let Some(previous) = previous {
            previous.cancel.cancel();
            let mut settled = previous.settled.clone();
            if !*settled.borrow() {
                let _ = settled.changed().await;
            }
        }
    }

    /// Stop any running task and drop the runtime.
    pub async fn clean(&self) {
        self.stop_current_task().await;
        *self.runtime.write().await = None;
        tracing::info!("mobius agent stopped");
    }

    async fn build_task_context(&self, request: &TaskRequest) -> Result<Arc<MobiusContext>> {
        let runtime = self.runtime.read().await;
        let runtime = runtime.as_ref().ok_or(AgentError::NotInitialized)?;

        let profile = self
            .config
            .resolve_profile(request.profile.as_deref())
            .ok_or_else(|| {
                AgentError::ProfileNotFound(request.profile.clone().unwrap_or_default())
            })?
            .clone();

        let bridge_backend = Arc::new(BridgeBackend::new(runtime.bridge.clone()));
        let controller = match &runtime.adb {
            Some(adb) => DeviceController::new(
                Arc::new(NativeBackend::new(
                    adb.clone(),
                    runtime.device.device_width,
                    runtime.device.device_height,
                )),
                Some(bridge_backend),
            ),
            None => DeviceController::new(bridge_backend, None),
        };

        let execution = request.record_trace.then(|| ExecutionSetup {
            traces_dir: request
                .trace_path
                .clone()
                .unwrap_or_else(|| PathBuf::from("mobius-traces")),
            trace_id: request
                .name
                .clone()
                .unwrap_or_else(|| "trace".to_string()),
        });

        Ok(Arc::new(MobiusContext {
            device: runtime.device.clone(),
            controller,
            screen: Arc::clone(&runtime.screen) as Arc<dyn ScreenSource>,
            probe: Arc::clone(&runtime.probe),
            models: Arc::new(ProfileModelFactory::new(profile.llm)),
            execution,
            locked_app_package: request.locked_app_package.clone(),
        }))
    }

    async fn drive_task(
        &self,
        task: &mut Task,
        ctx: Arc<MobiusContext>,
        cancel: CancellationToken,
    ) -> Result<Option<Value>> {
        let request = task.request.clone();
        let task_name = task.name();

        let trace = match &ctx.execution {
            Some(setup) => {
                let dir = setup.traces_dir.join(format!("{task_name}-{}", &task.id[..8]));
                match TraceRecorder::create(&dir) {
                    Ok(trace) => Some(trace),
                    Err(e) => {
                        tracing::warn!(error = %e, "trace recording disabled");
                        None
                    }
                }
            }
            None => None,
        };

        let registry = Arc::new(ToolRegistry::standard());
        let graph = build_graph(Arc::clone(&ctx), registry)?;

        tracing::info!(task = %task_name, goal = %request.goal, "starting graph");
        task.set_status(TaskStatus::Running, "graph started");

        let input = AgentState::new(request.goal.clone(), request.max_steps);
        let run_config = RunConfig::new(request.max_steps).with_cancel(cancel);
        let mut run = graph.stream(input, run_config);

        let mut last_state: Option<AgentState> = None;
        let mut last_node = String::new();
        while let Some(event) = run.events.next().await {
            match event {
                StreamEvent::Values { state } => {
                    if let Some(path) = &request.thoughts_output_path {
                        if let Err(e) = record_thoughts(path, &state.agents_thoughts) {
                            tracing::warn!(error = %e, "failed to record thoughts");
                        }
                    }
                    if let Some(trace) = &trace {
                        trace.record_step(
                            &last_node,
                            state.agents_thoughts.last().map(String::as_str),
                            state.latest_screenshot.as_deref(),
                        );
                    }
                    last_state = Some(state);
                }
                StreamEvent::Updates { node, update } => {
                    last_node = node;
                    if let Some(thought) = update.agents_thoughts.last() {
                        tracing::info!(agent = %update.agent.as_deref().unwrap_or(&last_node), "{thought}");
                    }
                }
                StreamEvent::Message { node, chunk } => {
                    tracing::info!(agent = %node, "{chunk}");
                }
                StreamEvent::Custom { .. } => {}
            }
        }

        let outcome = run
            .outcome
            .await
            .map_err(|e| AgentError::Execution(format!("graph task panicked: {e}")))?;

        let result = match outcome {
            Ok(final_state) => {
                let output = self
                    .extract_output(&ctx, &request, &task_name, &final_state)
                    .await;
                tracing::info!(task = %task_name, "automation succeeded");
                task.finalize(output.clone(), Some(final_state), None, false);
                Ok(output)
            }
            Err(graph_err) => {
                let err = AgentError::from(graph_err);
                if err.is_cancelled() {
                    tracing::warn!(task = %task_name, "task cancelled");
                    task.finalize(None, last_state, None, true);
                } else {
                    tracing::error!(task = %task_name, error = %err, "task failed");
                    task.finalize(None, last_state, Some(err.to_string()), false);
                }
                Err(err)
            }
        };

        if let Some(trace) = &trace {
            if let Err(e) = trace.finalize() {
                tracing::warn!(error = %e, "failed to finalize trace");
            }
        }
        result
    }

    /// Extract the task output: through the Outputter when an output shape
    /// or description was declared, the last agent thought otherwise. A
    /// declared format that fails validation yields a null output and a
    /// logged error, never a task failure.
    async fn extract_output(
        &self,
        ctx: &MobiusContext,
        request: &TaskRequest,
        task_name: &str,
        state: &AgentState,
    ) -> Option<Value> {
        let output_config = OutputConfig {
            output_description: request.output_description.clone(),
            output_format: request.output_format.clone(),
        };

        let output = if output_config.is_requested() {
            tracing::info!(task = task_name, "generating structured output");
            match outputter(ctx, &output_config, state).await {
                Ok(value) => {
                    if let Some(schema) = &output_config.output_format {
                        match jsonschema::JSONSchema::compile(schema) {
                            Ok(compiled) => {
                                if !compiled.is_valid(&value) {
                                    tracing::error!(
                                        task = task_name,
                                        "structured output failed schema validation"
                                    );
                                    return None;
                                }
                            }
                            Err(e) => {
                                tracing::error!(task = task_name, error = %e, "output schema does not compile");
                                return None;
                            }
                        }
                    }
                    Some(value)
                }
                Err(e) => {
                    tracing::error!(task = task_name, error = %e, "failed to generate structured output");
                    None
                }
            }
        } else {
            state
                .agents_thoughts
                .last()
                .map(|thought| Value::String(thought.clone()))
        };

        if let (Some(path), Some(value)) = (&request.llm_output_path, &output) {
            if let Err(e) = record_output(path, value) {
                tracing::warn!(error = %e, "failed to record LLM output");
            }
        }
        output
    }
}
