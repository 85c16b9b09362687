use std::sync::Arc;

use async_trait::async_trait;
use svckit::{Dependencies, Instance, ServiceFactory};

use crate::config::MailConfig;
use crate::outbox::MailService;

pub struct MailServiceFactory;

#[async_trait]
impl ServiceFactory for MailServiceFactory {
    fn name(&self) -> &str {
        "MailService"
    }

    fn dependencies(&self) -> &[&str] {
        &[]
    }

    async fn construct(
        &self,
        _deps: Dependencies,
        config: &serde_json::Value,
    ) -> anyhow::Result<Instance> {
        let cfg: MailConfig = if config.is_null() {
            MailConfig::default()
        } else {
            serde_json::from_value(config.clone())?
        };
        tracing::info!(sender = %cfg.sender, "Mail service ready");
        Ok(Arc::new(MailService::new(cfg)))
    }
}

inventory::submit! {
    svckit::FactoryRegistrator(|| Arc::new(MailServiceFactory))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn defaults_apply_without_config() {
        let instance = MailServiceFactory
            .construct(Dependencies::default(), &serde_json::Value::Null)
            .await
            .unwrap();
        let mail = instance.into_any().downcast::<MailService>().unwrap();
        assert_eq!(mail.sender(), "noreply@localhost");
    }
}
