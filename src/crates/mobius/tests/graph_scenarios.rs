//! End-to-end graph scenarios against scripted models and a mock device.

use agentgraph::error::Result as GraphResult;
use agentgraph::llm::{ChatModel, ChatRequest, ChatResponse};
use agentgraph::{CancellationToken, GraphError, Message, RunConfig, StreamEvent, ToolCall};
use async_trait::async_trait;
use device::{
    DeviceBackend, DeviceController, DeviceError, DevicePlatform, DeviceProbe, Key, ScreenData,
    ScreenSource, Selector, SwipeRequest,
};
use llm::{AgentNode, LlmError, ModelFactory};
use mobius::{
    build_graph, AgentState, DeviceContext, MobiusContext, SubgoalStatus, ToolRegistry,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_stream::StreamExt;

// ---------------------------------------------------------------- device

#[derive(Default)]
struct DeviceLog {
    links: Vec<String>,
    launched: Vec<String>,
    taps: usize,
    total_ops: usize,
}

#[derive(Clone, Default)]
struct MockDevice {
    log: Arc<Mutex<DeviceLog>>,
}

impl MockDevice {
    fn links(&self) -> Vec<String> {
        self.log.lock().unwrap().links.clone()
    }

    fn total_ops(&self) -> usize {
        self.log.lock().unwrap().total_ops
    }

    fn bump(&self) -> Result<(), DeviceError> {
        self.log.lock().unwrap().total_ops += 1;
        Ok(())
    }
}

#[async_trait]
impl DeviceBackend for MockDevice {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn tap(&self, _selector: &Selector, _index: Option<usize>) -> Result<(), DeviceError> {
        self.log.lock().unwrap().taps += 1;
        self.bump()
    }

    async fn long_press(
        &self,
        _selector: &Selector,
        _index: Option<usize>,
        _duration_ms: u32,
    ) -> Result<(), DeviceError> {
        self.bump()
    }

    async fn swipe(&self, _request: &SwipeRequest) -> Result<(), DeviceError> {
        self.bump()
    }

    async fn input_text(&self, _text: &str) -> Result<(), DeviceError> {
        self.bump()
    }

    async fn erase_text(&self, _chars: u32) -> Result<(), DeviceError> {
        self.bump()
    }

    async fn launch_app(&self, package: &str) -> Result<(), DeviceError> {
        self.log.lock().unwrap().launched.push(package.to_string());
        self.bump()
    }

    async fn stop_app(&self, _package: Option<&str>) -> Result<(), DeviceError> {
        self.bump()
    }

    async fn open_link(&self, url: &str) -> Result<(), DeviceError> {
        self.log.lock().unwrap().links.push(url.to_string());
        self.bump()
    }

    async fn back(&self) -> Result<(), DeviceError> {
        self.bump()
    }

    async fn press_key(&self, _key: Key) -> Result<(), DeviceError> {
        self.bump()
    }

    async fn wait_for_animation_to_end(&self, _timeout_ms: Option<u32>) -> Result<(), DeviceError> {
        Ok(())
    }
}

struct MockScreen;

#[async_trait]
impl ScreenSource for MockScreen {
    async fn screen_data(&self) -> Result<ScreenData, DeviceError> {
        Ok(ScreenData {
            base64: "c2NyZWVu".to_string(),
            elements: serde_json::from_value(json!([
                {"resourceId": "com.browser:id/url_bar", "text": "Search", "bounds": "[0,0][1080,120]"}
            ]))
            .unwrap(),
            width: 1080,
            height: 1920,
            platform: "android".to_string(),
        })
    }
}

struct MockProbe;

#[async_trait]
impl DeviceProbe for MockProbe {
    async fn focused_app(&self) -> Result<Option<String>, DeviceError> {
        Ok(Some("com.android.launcher".to_string()))
    }

    async fn device_date(&self) -> Result<String, DeviceError> {
        Ok("Sat Aug  1 10:00:00 CET 2026".to_string())
    }

    async fn list_packages(&self) -> Result<String, DeviceError> {
        Ok("com.android.settings\ncom.browser".to_string())
    }
}

// ---------------------------------------------------------------- models

enum Step {
    Reply(Box<dyn Fn(&ChatRequest) -> Message + Send + Sync>),
    /// Simulate an inference stuck at an I/O await.
    Hang,
}

struct ScriptedModel {
    node: &'static str,
    steps: Mutex<VecDeque<Step>>,
}

impl ScriptedModel {
    fn new(node: &'static str, steps: Vec<Step>) -> Arc<Self> {
        Arc::new(Self {
            node,
            steps: Mutex::new(steps.into()),
        })
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn chat(&self, request: ChatRequest) -> GraphResult<ChatResponse> {
        let step = self.steps.lock().unwrap().pop_front();
        match step {
            Some(Step::Reply(reply)) => Ok(ChatResponse {
                message: reply(&request),
                usage: None,
                metadata: HashMap::new(),
            }),
            Some(Step::Hang) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(GraphError::Llm("unreachable".into()))
            }
            None => Err(GraphError::Llm(format!(
                "script for {} exhausted",
                self.node
            ))),
        }
    }
}

struct ScriptedFactory {
    models: HashMap<&'static str, Arc<ScriptedModel>>,
}

impl ScriptedFactory {
    fn new(models: Vec<Arc<ScriptedModel>>) -> Arc<Self> {
        Arc::new(Self {
            models: models.into_iter().map(|m| (m.node, m)).collect(),
        })
    }
}

impl ModelFactory for ScriptedFactory {
    fn model_for(&self, node: AgentNode) -> Result<Arc<dyn ChatModel>, LlmError> {
        self.models
            .get(node.as_str())
            .cloned()
            .map(|m| m as Arc<dyn ChatModel>)
            .ok_or_else(|| LlmError::Config(format!("no script for {}", node.as_str())))
    }

    fn fallback_for(&self, _node: AgentNode) -> Option<Arc<dyn ChatModel>> {
        None
    }

    fn supports_parallel_tool_calls(&self, _node: AgentNode) -> bool {
        true
    }

    fn needs_flat_tool_variants(&self, _node: AgentNode) -> bool {
        false
    }
}

fn structured(value: Value) -> Step {
    Step::Reply(Box::new(move |_request| Message::assistant(value.to_string())))
}

/// Extract the first `[8-hex-char]` subgoal id mentioned in the request.
fn first_subgoal_id(request: &ChatRequest) -> String {
    let text: String = request
        .messages
        .iter()
        .filter_map(|message| message.text())
        .collect::<Vec<_>>()
        .join("\n");
    for (start, _) in text.match_indices('[') {
        let candidate = &text[start + 1..];
        if let Some(end) = candidate.find(']') {
            let id = &candidate[..end];
            if id.len() == 8 && id.chars().all(|c| c.is_ascii_hexdigit()) {
                return id.to_string();
            }
        }
    }
    panic!("no subgoal id found in request");
}

fn test_context(device: MockDevice, factory: Arc<ScriptedFactory>) -> Arc<MobiusContext> {
    Arc::new(MobiusContext {
        device: DeviceContext {
            platform: DevicePlatform::Android,
            device_id: "emulator-5554".to_string(),
            device_width: 1080,
            device_height: 1920,
        },
        controller: DeviceController::new(Arc::new(device), None),
        screen: Arc::new(MockScreen),
        probe: Arc::new(MockProbe),
        models: factory,
        execution: None,
        locked_app_package: None,
    })
}

// -------------------------------------------------------------- scenarios

/// §  Open a URL: one subgoal, one open_link tool call, clean termination.
#[tokio::test]
async fn test_open_url_scenario() {
    let planner = ScriptedModel::new(
        "planner",
        vec![structured(
            json!({"subgoals": [{"description": "Open https://example.com in the browser"}]}),
        )],
    );
    let cortex = ScriptedModel::new(
        "cortex",
        vec![
            structured(json!({
                "decisions": "[{\"action\": \"open_link\", \"url\": \"https://example.com\"}]",
                "decisions_reason": "The browser can open the URL directly."
            })),
            Step::Reply(Box::new(|request| {
                let id = first_subgoal_id(request);
                Message::assistant(
                    json!({
                        "decisions": null,
                        "decisions_reason": "The link was opened, the subgoal is complete.",
                        "goals_completion_reason": "The open_link tool reported success.",
                        "complete_subgoals_by_ids": [id]
                    })
                    .to_string(),
                )
            })),
        ],
    );
    let executor = ScriptedModel::new(
        "executor",
        vec![Step::Reply(Box::new(|_request| {
            Message::assistant("Opening the link.").with_tool_calls(vec![ToolCall::new(
                "call_1",
                "open_link",
                json!({"agent_thought": "open the url", "url": "https://example.com"}),
            )])
        }))],
    );
    let orchestrator = ScriptedModel::new(
        "orchestrator",
        vec![Step::Reply(Box::new(|request| {
            let id = first_subgoal_id(request);
            Message::assistant(
                json!({
                    "needs_replaning": false,
                    "reason": "The link was opened successfully.",
                    "completed_subgoal_ids": [id]
                })
                .to_string(),
            )
        }))],
    );

    let device = MockDevice::default();
    let ctx = test_context(
        device.clone(),
        ScriptedFactory::new(vec![planner, cortex, executor, orchestrator]),
    );
    let graph = build_graph(ctx, Arc::new(ToolRegistry::standard())).unwrap();

    let mut run = graph.stream(
        AgentState::new("Open https://example.com in the browser", 50),
        RunConfig::new(50),
    );

    let mut snapshots: Vec<AgentState> = Vec::new();
    let mut orchestrator_exits = 0;
    while let Some(event) = run.events.next().await {
        match event {
            StreamEvent::Values { state } => snapshots.push(state),
            StreamEvent::Updates { node, .. } if node == "orchestrator" => {
                orchestrator_exits += 1;
            }
            _ => {}
        }
    }
    let final_state = run.outcome.await.unwrap().unwrap();

    // The single open_link call reached the device.
    assert_eq!(device.links(), vec!["https://example.com".to_string()]);

    // All subgoals succeeded and a textual confirmation is available.
    assert!(final_state
        .subgoal_plan
        .iter()
        .all(|s| s.status == SubgoalStatus::Success));
    assert!(!final_state.agents_thoughts.is_empty());
    assert!(orchestrator_exits >= 2);

    // Invariants over every snapshot: the budget never increases, at most
    // one subgoal runs, and completion proposals are cleared after each
    // orchestrator exit.
    let mut previous_remaining = u32::MAX;
    for state in &snapshots {
        assert!(state.remaining_steps <= previous_remaining);
        previous_remaining = state.remaining_steps;
        let running = state
            .subgoal_plan
            .iter()
            .filter(|s| s.status == SubgoalStatus::Running)
            .count();
        assert!(running <= 1);
    }
    assert!(final_state.complete_subgoals_by_ids.is_empty());

    // The Cortex's decisions were consumed by the Executor: no stale
    // decisions survive in any snapshot taken after an executor commit.
    let executor_snapshot = snapshots
        .iter()
        .find(|state| !state.executor_messages.is_empty())
        .expect("executor committed");
    assert!(executor_snapshot.structured_decisions.is_none());
}

/// §  Budget exhaustion: a three-step budget cannot reach the action loop.
#[tokio::test]
async fn test_budget_exhaustion_scenario() {
    let planner = ScriptedModel::new(
        "planner",
        vec![structured(json!({"subgoals": [
            {"description": "step one"},
            {"description": "step two"}
        ]}))],
    );
    // Cortex would hang if ever consulted; the budget dies first.
    let cortex = ScriptedModel::new("cortex", vec![Step::Hang]);

    let device = MockDevice::default();
    let ctx = test_context(
        device.clone(),
        ScriptedFactory::new(vec![planner, cortex]),
    );
    let graph = build_graph(ctx, Arc::new(ToolRegistry::standard())).unwrap();

    let err = graph
        .invoke(AgentState::new("do five things", 3), RunConfig::new(3))
        .await
        .unwrap_err();
    assert!(err.is_budget_exhausted());
    let err = mobius::AgentError::from(err);
    assert!(matches!(err, mobius::AgentError::BudgetExhausted { limit: 3 }));
    assert_eq!(device.total_ops(), 0);
}

/// §  Replan on failure: launch_app fails with an unresolvable package,
/// the Orchestrator requests a replan, and the Planner reruns in replan
/// mode.
#[tokio::test]
async fn test_replan_on_launch_failure_scenario() {
    let planner = ScriptedModel::new(
        "planner",
        vec![
            Step::Reply(Box::new(|request| {
                let text = request.messages[1].text().unwrap();
                assert!(text.contains("Action: plan"));
                Message::assistant(
                    json!({"subgoals": [{"description": "Launch WhatsApp and message Alice"}]})
                        .to_string(),
                )
            })),
            Step::Reply(Box::new(|request| {
                let text = request.messages[1].text().unwrap();
                assert!(text.contains("Action: replan"), "second run must replan");
                Message::assistant(
                    json!({"subgoals": [{"description": "Message Alice over SMS instead"}]})
                        .to_string(),
                )
            })),
        ],
    );
    let cortex = ScriptedModel::new(
        "cortex",
        vec![
            structured(json!({
                "decisions": "[{\"action\": \"launch_app\", \"app_name\": \"WhatsApp\"}]",
                "decisions_reason": "WhatsApp must be open before messaging."
            })),
            Step::Reply(Box::new(|request| {
                let id = first_subgoal_id(request);
                Message::assistant(
                    json!({
                        "decisions": null,
                        "decisions_reason": "The launch failed, this subgoal needs review.",
                        "complete_subgoals_by_ids": [id]
                    })
                    .to_string(),
                )
            })),
            Step::Reply(Box::new(|request| {
                let id = first_subgoal_id(request);
                Message::assistant(
                    json!({
                        "decisions": null,
                        "decisions_reason": "The SMS thread shows the sent message.",
                        "complete_subgoals_by_ids": [id]
                    })
                    .to_string(),
                )
            })),
        ],
    );
    let executor = ScriptedModel::new(
        "executor",
        vec![Step::Reply(Box::new(|_request| {
            Message::assistant("Launching WhatsApp.").with_tool_calls(vec![ToolCall::new(
                "call_1",
                "launch_app",
                json!({"agent_thought": "open whatsapp", "app_name": "WhatsApp"}),
            )])
        }))],
    );
    let orchestrator = ScriptedModel::new(
        "orchestrator",
        vec![
            structured(json!({
                "needs_replaning": true,
                "reason": "WhatsApp is not installed on this device.",
                "completed_subgoal_ids": []
            })),
            Step::Reply(Box::new(|request| {
                let id = first_subgoal_id(request);
                Message::assistant(
                    json!({
                        "needs_replaning": false,
                        "reason": "The replacement subgoal is done.",
                        "completed_subgoal_ids": [id]
                    })
                    .to_string(),
                )
            })),
        ],
    );
    // Hopper cannot find WhatsApp in the package listing.
    let hopper = ScriptedModel::new(
        "hopper",
        vec![structured(json!({
            "reason": "No installed package matches WhatsApp.",
            "output": null
        }))],
    );

    let device = MockDevice::default();
    let ctx = test_context(
        device.clone(),
        ScriptedFactory::new(vec![planner, cortex, executor, orchestrator, hopper]),
    );
    let graph = build_graph(ctx, Arc::new(ToolRegistry::standard())).unwrap();

    let final_state = graph
        .invoke(
            AgentState::new("Message Alice on WhatsApp", 60),
            RunConfig::new(60),
        )
        .await
        .unwrap();

    // Nothing was launched, the failure was surfaced as a tool error, and
    // the replanned subgoal carried the task to success.
    assert!(device.log.lock().unwrap().launched.is_empty());
    assert!(device.links().is_empty());
    assert!(final_state
        .executor_messages
        .iter()
        .any(|message| message.is_tool()
            && message.text().unwrap_or_default().contains("no installed package")));
    assert!(final_state
        .agents_thoughts
        .iter()
        .any(|thought| thought.contains("END OF PLAN, REPLANNING")));
    assert!(final_state
        .subgoal_plan
        .iter()
        .all(|s| s.status == SubgoalStatus::Success));
}

/// §  Cancellation: after at least one device action, a cancel signal
/// settles the task without further device commands.
#[tokio::test]
async fn test_cancellation_scenario() {
    let planner = ScriptedModel::new(
        "planner",
        vec![structured(
            json!({"subgoals": [{"description": "Search for 'best coffee' in the browser"}]}),
        )],
    );
    let cortex = ScriptedModel::new(
        "cortex",
        vec![
            structured(json!({
                "decisions": "[{\"action\": \"open_link\", \"url\": \"https://search.example/best+coffee\"}]",
                "decisions_reason": "Open the search results."
            })),
            // The second inference never returns; cancellation unblocks it.
            Step::Hang,
        ],
    );
    let executor = ScriptedModel::new(
        "executor",
        vec![Step::Reply(Box::new(|_request| {
            Message::assistant("Opening search.").with_tool_calls(vec![ToolCall::new(
                "call_1",
                "open_link",
                json!({"agent_thought": "search", "url": "https://search.example/best+coffee"}),
            )])
        }))],
    );

    let device = MockDevice::default();
    let ctx = test_context(
        device.clone(),
        ScriptedFactory::new(vec![planner, cortex, executor]),
    );
    let graph = build_graph(ctx, Arc::new(ToolRegistry::standard())).unwrap();

    let cancel = CancellationToken::new();
    let mut run = graph.stream(
        AgentState::new("Search for 'best coffee'", 50),
        RunConfig::new(50).with_cancel(cancel.clone()),
    );

    let mut last_snapshot = None;
    while let Some(event) = run.events.next().await {
        match event {
            StreamEvent::Updates { node, .. } if node == "summarizer" => {
                // At least one executor superstep ran; cancel mid-loop.
                cancel.cancel();
            }
            StreamEvent::Values { state } => last_snapshot = Some(state),
            _ => {}
        }
    }

    let err = run.outcome.await.unwrap().unwrap_err();
    assert!(err.is_cancelled());

    // The last committed observation survived, and no device command ran
    // after the cancel was processed.
    let snapshot = last_snapshot.expect("snapshot retained");
    assert!(snapshot.latest_ui_hierarchy.is_some());
    let ops_at_cancel = device.total_ops();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(device.total_ops(), ops_at_cancel);
    assert_eq!(device.links().len(), 1);
}

/// §  Structured output: the Outputter binds the declared shape and the
/// result validates against it.
#[tokio::test]
async fn test_structured_output_scenario() {
    let outputter_model = ScriptedModel::new(
        "outputter",
        vec![structured(json!({"package_name": "com.android.launcher"}))],
    );
    let ctx = test_context(
        MockDevice::default(),
        ScriptedFactory::new(vec![outputter_model]),
    );

    let mut state = AgentState::new("Return the currently focused package", 10);
    state.focused_app_info = Some("com.android.launcher".to_string());
    state
        .agents_thoughts
        .push("The focused package is com.android.launcher.".to_string());

    let schema = json!({
        "type": "object",
        "properties": {"package_name": {"type": "string"}},
        "required": ["package_name"]
    });
    let config = mobius::OutputConfig {
        output_description: None,
        output_format: Some(schema.clone()),
    };

    let value = mobius::agents::outputter::outputter(&ctx, &config, &state)
        .await
        .unwrap();
    let compiled = jsonschema::JSONSchema::compile(&schema).unwrap();
    assert!(compiled.is_valid(&value));
    assert_eq!(value["package_name"], state.focused_app_info.unwrap());
}
