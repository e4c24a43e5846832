//! The `launch_app` tool: resolve a natural-language app name to a package
//! id through the Hopper agent, then launch it.

use crate::agents::hopper::hopper;
use crate::context::MobiusContext;
use crate::errors::AgentError;
use crate::state::{AgentState, StateUpdate};
use crate::tools::{agent_thought_schema, invalid_args_update, tool_update, MobileTool};
use agentgraph::{ToolCall, ToolStatus};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

/// Resolve an app name against the installed-package listing.
pub(crate) async fn find_package(
    ctx: &MobiusContext,
    app_name: &str,
) -> Result<String, AgentError> {
    let packages = ctx.probe.list_packages().await?;
    let output = hopper(
        ctx,
        &format!("I'm looking for the package name of the following app: '{app_name}'"),
        &packages,
    )
    .await?;
    output
        .output
        .filter(|package| !package.trim().is_empty())
        .ok_or_else(|| AgentError::PackageNotFound(app_name.to_string()))
}

#[derive(Debug, Deserialize)]
struct LaunchAppArgs {
    agent_thought: String,
    app_name: String,
}

pub struct LaunchAppTool;

#[async_trait]
impl MobileTool for LaunchAppTool {
    fn name(&self) -> &'static str {
        "launch_app"
    }

    fn description(&self) -> &'static str {
        "Find and launch an application by its natural-language name \
         (e.g. 'WhatsApp', 'Settings')."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "agent_thought": agent_thought_schema(),
                "app_name": {"type": "string", "description": "Human-readable app name"}
            },
            "required": ["agent_thought", "app_name"]
        })
    }

    async fn invoke(&self, ctx: &MobiusContext, _state: &AgentState, call: &ToolCall) -> StateUpdate {
        let args: LaunchAppArgs = match serde_json::from_value(call.args.clone()) {
            Ok(args) => args,
            Err(e) => return invalid_args_update(call, &e),
        };

        let package = match find_package(ctx, &args.app_name).await {
            Ok(package) => package,
            Err(e) => {
                return tool_update(
                    call,
                    &args.agent_thought,
                    format!("Failed to launch app '{}': {e}", args.app_name),
                    ToolStatus::Error,
                )
            }
        };

        match ctx.controller.launch_app(&package).await {
            Ok(()) => tool_update(
                call,
                &args.agent_thought,
                format!("App '{}' launched successfully.", args.app_name),
                ToolStatus::Success,
            ),
            Err(e) => tool_update(
                call,
                &args.agent_thought,
                format!("Failed to launch app '{}': {e}", args.app_name),
                ToolStatus::Error,
            ),
        }
    }
}
