use std::sync::Arc;

use async_trait::async_trait;
use http_service::HttpService;
use mail_service::MailService;
use svckit::{Dependencies, Instance, ServiceFactory};

use crate::config::UserConfig;
use crate::directory::UserService;

/// Factory for `UserService`. Constructor order: HTTP, then mail.
pub struct UserServiceFactory;

#[async_trait]
impl ServiceFactory for UserServiceFactory {
    fn name(&self) -> &str {
        "UserService"
    }

    fn dependencies(&self) -> &[&str] {
        &["HttpService", "MailService"]
    }

    async fn construct(
        &self,
        deps: Dependencies,
        config: &serde_json::Value,
    ) -> anyhow::Result<Instance> {
        let cfg: UserConfig = if config.is_null() {
            UserConfig::default()
        } else {
            serde_json::from_value(config.clone())?
        };
        let http = deps.require::<HttpService>("HttpService")?;
        let mail = deps.require::<MailService>("MailService")?;
        Ok(Arc::new(UserService::new(cfg, http, mail)))
    }
}

inventory::submit! {
    svckit::FactoryRegistrator(|| Arc::new(UserServiceFactory))
}
