//! Persisted task artifacts: thoughts file, step screenshots, steps.json,
//! and the final LLM output file.

use base64::Engine;
use serde::Serialize;
use serde_json::Value;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Rewrite the thoughts file with the full thought log.
pub fn record_thoughts(path: &Path, thoughts: &[String]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::File::create(path)?;
    for thought in thoughts {
        writeln!(file, "{thought}")?;
    }
    Ok(())
}

/// Write the final structured or textual output.
pub fn record_output(path: &Path, output: &Value) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(output)?)
}

#[derive(Debug, Serialize)]
struct StepRecord {
    step: usize,
    node: String,
    thought: Option<String>,
    screenshot: Option<String>,
}

/// Collects one JPEG per step plus a `steps.json` into a trace folder.
pub struct TraceRecorder {
    dir: PathBuf,
    steps: Mutex<Vec<StepRecord>>,
}

impl TraceRecorder {
    pub fn create(dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            steps: Mutex::new(Vec::new()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Record one superstep: decode and save the screenshot (when present)
    /// and remember the step metadata.
    pub fn record_step(&self, node: &str, thought: Option<&str>, screenshot_b64: Option<&str>) {
        let mut steps = match self.steps.lock() {
            Ok(steps) => steps,
            Err(poisoned) => poisoned.into_inner(),
        };
        let index = steps.len() + 1;

        let mut saved = None;
        if let Some(data) = screenshot_b64 {
            let file_name = format!("step_{index:03}.jpg");
            match base64::engine::general_purpose::STANDARD.decode(data) {
                Ok(bytes) => match std::fs::write(self.dir.join(&file_name), bytes) {
                    Ok(()) => saved = Some(file_name),
                    Err(e) => tracing::warn!(error = %e, "failed to write step screenshot"),
                },
                Err(e) => tracing::debug!(error = %e, "step screenshot is not valid base64"),
            }
        }

        steps.push(StepRecord {
            step: index,
            node: node.to_string(),
            thought: thought.map(str::to_string),
            screenshot: saved,
        });
    }

    /// Write `steps.json`. Called from every terminal task path.
    pub fn finalize(&self) -> std::io::Result<()> {
        let steps = match self.steps.lock() {
            Ok(steps) => steps,
            Err(poisoned) => poisoned.into_inner(),
        };
        let json = serde_json::to_string_pretty(&*steps)?;
        std::fs::write(self.dir.join("steps.json"), json)
    }
}
