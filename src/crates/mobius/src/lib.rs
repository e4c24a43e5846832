//! mobius drives a live mobile device (Android or iOS) toward a
//! natural-language goal by orchestrating a cooperating set of LLM-backed
//! agents over a shared task state.
//!
//! A task enters at the Planner, which produces an ordered subgoal plan.
//! Control then cycles through observation (Contextor), decision (Cortex),
//! action (Executor + tools), and bookkeeping (Summarizer, Orchestrator)
//! until the plan is exhausted, the step budget runs out, or the task is
//! cancelled.
//!
//! # Quick start
//!
//! ```rust,ignore
//! use mobius::{Agent, AgentConfig};
//!
//! let agent = Agent::new(AgentConfig::default());
//! agent.init().await?;
//! let output = agent.run_goal("Open https://example.com in the browser").await?;
//! agent.clean().await;
//! ```

pub mod agent;
pub mod agents;
pub mod config;
pub mod context;
pub mod errors;
pub mod graph;
pub mod recorder;
pub mod state;
pub mod task;
pub mod tools;

#[cfg(test)]
pub(crate) mod testkit;

pub use agent::Agent;
pub use agents::outputter::OutputConfig;
pub use config::{AgentConfig, AgentProfile, ServerConfig};
pub use context::{DeviceContext, ExecutionSetup, MobiusContext};
pub use errors::{AgentError, Result};
pub use graph::build_graph;
pub use state::{AgentState, StateUpdate, Subgoal, SubgoalStatus};
pub use task::{Task, TaskRequest, TaskRequestBuilder, TaskStatus};
pub use tools::{MobileTool, Target, ToolRegistry};
