//! Hopper: stateless extraction utility. Given a request and a blob of
//! candidate data, return the single best match.

use crate::context::MobiusContext;
use crate::errors::AgentError;
use agentgraph::Message;
use llm::{invoke_structured, AgentNode, ResponseSchema};
use serde::Deserialize;
use serde_json::json;

const SYSTEM_PROMPT: &str = "\
You extract one piece of information from raw data. You are given a request
and the data to dig through. Return the single value that best answers the
request, exactly as it appears in the data. When nothing matches, return a
null output and say why in the reason.";

#[derive(Debug, Deserialize)]
pub struct HopperOutput {
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub output: Option<String>,
}

fn output_schema() -> ResponseSchema {
    ResponseSchema::new(
        "extraction",
        json!({
            "type": "object",
            "properties": {
                "reason": {"type": ["string", "null"]},
                "output": {"type": ["string", "null"], "description": "The extracted value, verbatim from the data"}
            },
            "required": ["output"]
        }),
    )
}

pub async fn hopper(
    ctx: &MobiusContext,
    request: &str,
    data: &str,
) -> Result<HopperOutput, AgentError> {
    tracing::info!("starting hopper agent");
    let messages = vec![
        Message::system(SYSTEM_PROMPT),
        Message::human(format!("{request}\nHere is the data you must dig:\n{data}")),
    ];
    let model = ctx
        .models
        .model_for(AgentNode::Hopper)
        .map_err(|e| AgentError::Llm(e.to_string()))?;
    invoke_structured(&model, messages, output_schema(), 0.0)
        .await
        .map_err(|e| AgentError::Llm(e.to_string()))
}
