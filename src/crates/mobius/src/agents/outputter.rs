//! Outputter: read the final task state and emit the requested output,
//! either free-form text or a value for a declared structured shape.

use crate::context::MobiusContext;
use crate::errors::AgentError;
use crate::state::{format_plan, AgentState};
use agentgraph::llm::ChatRequest;
use agentgraph::Message;
use llm::{invoke_structured, AgentNode, ResponseSchema};
use serde_json::Value;

const SYSTEM_PROMPT: &str = "\
A device automation task just finished. From its final state, produce the
output the caller asked for. Use only facts present in the state; never
invent values. Dates and identifiers are copied verbatim.";

/// What the caller asked for.
#[derive(Debug, Clone, Default)]
pub struct OutputConfig {
    pub output_description: Option<String>,
    /// JSON Schema of the output shape.
    pub output_format: Option<Value>,
}

impl OutputConfig {
    pub fn is_requested(&self) -> bool {
        self.output_description.is_some() || self.output_format.is_some()
    }
}

fn state_digest(state: &AgentState) -> String {
    format!(
        "Goal: {}\n\nPlan:\n{}\n\nFocused app: {}\nDevice date: {}\n\nAgent notes:\n{}",
        state.initial_goal,
        format_plan(&state.subgoal_plan),
        state.focused_app_info.as_deref().unwrap_or("unknown"),
        state.device_date.as_deref().unwrap_or("unknown"),
        state.agents_thoughts.join("\n"),
    )
}

/// Produce the final output value. With a declared format the reply is
/// bound to that schema; otherwise the description drives a free-form text
/// answer.
pub async fn outputter(
    ctx: &MobiusContext,
    config: &OutputConfig,
    state: &AgentState,
) -> Result<Value, AgentError> {
    tracing::info!("starting outputter agent");
    let model = ctx
        .models
        .model_for(AgentNode::Outputter)
        .map_err(|e| AgentError::Llm(e.to_string()))?;

    let mut prompt = state_digest(state);
    if let Some(description) = &config.output_description {
        prompt.push_str(&format!("\n\nRequested output: {description}"));
    }
    let messages = vec![Message::system(SYSTEM_PROMPT), Message::human(prompt)];

    if let Some(schema) = &config.output_format {
        let response: Value = invoke_structured(
            &model,
            messages,
            ResponseSchema::new("task_output", schema.clone()),
            0.0,
        )
        .await
        .map_err(|e| AgentError::Llm(e.to_string()))?;
        return Ok(response);
    }

    let response = model
        .chat(ChatRequest::new(messages).with_temperature(0.0))
        .await
        .map_err(|e| AgentError::Llm(e.to_string()))?;
    let text = response.message.text().unwrap_or_default().trim().to_string();
    if text.is_empty() {
        return Err(AgentError::Llm("outputter returned no content".into()));
    }
    Ok(Value::String(text))
}
