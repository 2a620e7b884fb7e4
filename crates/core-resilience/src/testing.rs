//! Inert channels for exercising the registry and selector

use crate::registry::ChannelRegistry;
use std::sync::Arc;
use switchover_channel_interface::{Channel, Response, Result};

pub(crate) struct StubChannel {
    id: String,
    priority: u32,
}

#[async_trait::async_trait]
impl Channel<()> for StubChannel {
    fn id(&self) -> &str {
        &self.id
    }

    fn priority(&self) -> u32 {
        self.priority
    }

    async fn connect(&self) -> Result<()> {
        Ok(())
    }

    async fn check_availability(&self) -> Result<bool> {
        Ok(true)
    }

    async fn get_data(&self) -> Result<Response<()>> {
        Ok(Response::new(()))
    }
}

/// Registry of stub channels given as `(id, priority)` in registration order
pub(crate) fn stub_registry(links: &[(&str, u32)]) -> ChannelRegistry<()> {
    let channels: Vec<Arc<dyn Channel<()>>> = links
        .iter()
        .map(|(id, priority)| {
            Arc::new(StubChannel {
                id: id.to_string(),
                priority: *priority,
            }) as Arc<dyn Channel<()>>
        })
        .collect();

    ChannelRegistry::new(channels).expect("stub registry must not be empty")
}
