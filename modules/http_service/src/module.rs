use std::sync::Arc;

use async_trait::async_trait;
use svckit::{Dependencies, Instance, ServiceFactory};
use tracing::info;

use crate::config::HttpConfig;
use crate::routes::HttpService;

/// Factory for `HttpService`. No dependencies.
pub struct HttpServiceFactory;

#[async_trait]
impl ServiceFactory for HttpServiceFactory {
    fn name(&self) -> &str {
        "HttpService"
    }

    fn dependencies(&self) -> &[&str] {
        &[]
    }

    async fn construct(
        &self,
        _deps: Dependencies,
        config: &serde_json::Value,
    ) -> anyhow::Result<Instance> {
        let cfg: HttpConfig = if config.is_null() {
            HttpConfig::default()
        } else {
            serde_json::from_value(config.clone())?
        };
        info!(bind_addr = %cfg.bind_addr, "HTTP route table ready");
        Ok(Arc::new(HttpService::new(cfg)))
    }
}

inventory::submit! {
    svckit::FactoryRegistrator(|| Arc::new(HttpServiceFactory))
}
