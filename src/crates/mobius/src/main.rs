//! mobius command-line interface.

use anyhow::Context;
use clap::{Parser, Subcommand};
use mobius::{Agent, AgentConfig, AgentProfile, ServerConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mobius", about = "Drive a mobile device toward a goal with LLM agents")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one automation task against the first available device.
    Run {
        /// The natural-language goal.
        goal: String,

        /// Maximum node executions before the task fails.
        #[arg(long, default_value_t = mobius::task::DEFAULT_MAX_STEPS)]
        max_steps: u32,

        /// LLM profile TOML file (per-agent provider/model assignments).
        #[arg(long)]
        llm_profile: Option<PathBuf>,

        /// Free-form instruction describing the desired output.
        #[arg(long)]
        output_description: Option<String>,

        /// Keep the task inside this app package, relaunching it on focus
        /// loss.
        #[arg(long)]
        locked_app: Option<String>,

        /// Record a trace folder (one JPEG per step plus steps.json).
        #[arg(long)]
        trace_dir: Option<PathBuf>,

        /// Append agent thoughts to this file as the task runs.
        #[arg(long)]
        thoughts_file: Option<PathBuf>,

        /// Device-hardware bridge base URL.
        #[arg(long, default_value = mobius::config::DEFAULT_HW_BRIDGE_BASE_URL)]
        bridge_url: String,

        /// Screen API base URL.
        #[arg(long, default_value = mobius::config::DEFAULT_SCREEN_API_BASE_URL)]
        screen_api_url: String,
    },

    /// Serve the Screen API over the bridge's screen SSE stream.
    ScreenApi {
        /// Device-hardware bridge base URL.
        #[arg(long, default_value = mobius::config::DEFAULT_HW_BRIDGE_BASE_URL)]
        bridge_url: String,

        /// Listen port.
        #[arg(long, default_value_t = 9998)]
        port: u16,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match Cli::parse().command {
        Commands::Run {
            goal,
            max_steps,
            llm_profile,
            output_description,
            locked_app,
            trace_dir,
            thoughts_file,
            bridge_url,
            screen_api_url,
        } => {
            let mut config = AgentConfig::default().with_servers(ServerConfig {
                hw_bridge_base_url: bridge_url,
                screen_api_base_url: screen_api_url,
            });
            if let Some(path) = llm_profile {
                let llm = llm::LlmProfile::from_toml_file(&path)
                    .with_context(|| format!("loading LLM profile {}", path.display()))?;
                config = config.with_default_profile(AgentProfile { llm });
            }

            let agent = Agent::new(config);
            agent.init().await?;

            let mut builder = agent.new_task(goal).with_max_steps(max_steps);
            if let Some(description) = output_description {
                builder = builder.with_output_description(description);
            }
            if let Some(package) = locked_app {
                builder = builder.with_locked_app_package(package);
            }
            if let Some(dir) = trace_dir {
                builder = builder.with_trace_recording(true, dir);
            }
            if let Some(path) = thoughts_file {
                builder = builder.with_thoughts_file(path);
            }

            let result = agent.run_task(builder.build()).await;
            agent.clean().await;

            match result? {
                Some(output) => println!("{}", serde_json::to_string_pretty(&output)?),
                None => println!("(no output)"),
            }
            Ok(())
        }

        Commands::ScreenApi { bridge_url, port } => {
            let bridge = device::DeviceHardwareClient::new(bridge_url)
                .context("building bridge client")?;
            let stream = Arc::new(device::ScreenStream::spawn(bridge));
            let addr = std::net::SocketAddr::from(([127, 0, 0, 1], port));
            device::server::serve(stream, addr)
                .await
                .context("screen API server failed")?;
            Ok(())
        }
    }
}
