//! Contextor: refresh the device observation fields, and pull the task
//! back into its locked app when focus has drifted.

use crate::context::MobiusContext;
use crate::errors::AgentError;
use crate::state::{AgentState, StateUpdate};
use agentgraph::stream::NodeContext;
use std::sync::Arc;

pub struct ContextorNode {
    ctx: Arc<MobiusContext>,
}

impl ContextorNode {
    pub fn new(ctx: Arc<MobiusContext>) -> Self {
        Self { ctx }
    }

    pub async fn run(
        &self,
        _node: NodeContext<AgentState>,
        state: AgentState,
    ) -> Result<StateUpdate, AgentError> {
        tracing::info!("starting contextor agent");

        let mut screen = self.ctx.screen.screen_data().await?;
        let mut focused = self.ctx.probe.focused_app().await?;

        if let Some(locked) = &self.ctx.locked_app_package {
            if focused.as_deref() != Some(locked.as_str()) {
                tracing::warn!(
                    locked,
                    focused = focused.as_deref().unwrap_or("<none>"),
                    "focus left the locked app, relaunching"
                );
                self.ctx.controller.launch_app(locked).await?;
                screen = self.ctx.screen.screen_data().await?;
                focused = self.ctx.probe.focused_app().await?;
            }
        }

        let device_date = self.ctx.probe.device_date().await?;

        let update = StateUpdate {
            latest_ui_hierarchy: Some(screen.elements),
            latest_screenshot: Some(screen.base64),
            screen_size: Some((screen.width, screen.height)),
            focused_app_info: Some(focused),
            device_date: Some(device_date),
            ..Default::default()
        };
        Ok(state.sanitize_update("contextor", update))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::{test_context, RecordingBackend};
    use agentgraph::stream::NodeContext as Ctx;

    #[tokio::test]
    async fn test_contextor_refreshes_observations() {
        let ctx = Arc::new(test_context(RecordingBackend::ok()));
        let node = ContextorNode::new(Arc::clone(&ctx));
        let state = AgentState::new("goal", 10);

        let update = node.run(Ctx::detached("contextor"), state).await.unwrap();
        assert_eq!(update.screen_size, Some((1080, 1920)));
        assert!(update.latest_ui_hierarchy.is_some());
        assert!(update.latest_screenshot.is_some());
        assert_eq!(
            update.focused_app_info,
            Some(Some("com.android.launcher".to_string()))
        );
        assert!(update.device_date.is_some());
    }

    #[tokio::test]
    async fn test_contextor_relaunches_locked_app() {
        let backend = RecordingBackend::ok();
        let mut context = test_context(backend.clone());
        context.locked_app_package = Some("com.whatsapp".to_string());
        let node = ContextorNode::new(Arc::new(context));
        let state = AgentState::new("goal", 10);

        node.run(Ctx::detached("contextor"), state).await.unwrap();
        // The probe reports the launcher as focused, so the locked app gets
        // relaunched.
        assert_eq!(backend.launched(), vec!["com.whatsapp".to_string()]);
    }
}
