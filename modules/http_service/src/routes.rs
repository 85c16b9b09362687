use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use async_trait::async_trait;
use svckit::ServiceInstance;

use crate::config::HttpConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub method: String,
    pub path: String,
    /// Name of the handler, e.g. `user.connect`.
    pub handler: String,
}

type RouteTable = BTreeMap<(String, String), Route>;

/// Route table shared with dependent services. Readers never block; writers
/// publish a new table.
pub struct HttpService {
    config: HttpConfig,
    routes: ArcSwap<RouteTable>,
}

impl HttpService {
    pub fn new(config: HttpConfig) -> Self {
        Self {
            config,
            routes: ArcSwap::from_pointee(RouteTable::new()),
        }
    }

    pub fn config(&self) -> &HttpConfig {
        &self.config
    }

    /// Register `handler` for `method path`. Returns the handler it replaced.
    pub fn register(&self, method: &str, path: &str, handler: &str) -> Option<String> {
        let key = (method.to_ascii_uppercase(), path.to_owned());
        let route = Route {
            method: key.0.clone(),
            path: key.1.clone(),
            handler: handler.to_owned(),
        };

        let prev = self.routes.rcu(|table| {
            let mut next = RouteTable::clone(table);
            next.insert(key.clone(), route.clone());
            next
        });
        let replaced = prev.get(&key).map(|r| r.handler.clone());
        if let Some(old) = &replaced {
            tracing::debug!(method = %key.0, path = %key.1, old = %old, "Route handler replaced");
        }
        replaced
    }

    pub fn unregister(&self, method: &str, path: &str) -> bool {
        let key = (method.to_ascii_uppercase(), path.to_owned());
        let prev = self.routes.rcu(|table| {
            let mut next = RouteTable::clone(table);
            next.remove(&key);
            next
        });
        prev.contains_key(&key)
    }

    pub fn lookup(&self, method: &str, path: &str) -> Option<Route> {
        self.routes
            .load()
            .get(&(method.to_ascii_uppercase(), path.to_owned()))
            .cloned()
    }

    /// All routes sorted by method, then path.
    pub fn routes(&self) -> Vec<Route> {
        self.routes.load().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.routes.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.load().is_empty()
    }
}

#[async_trait]
impl ServiceInstance for HttpService {
    async fn release(&self) -> anyhow::Result<()> {
        let dropped = self.routes.swap(Arc::new(RouteTable::new()));
        tracing::info!(routes = dropped.len(), "HTTP route table cleared");
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}
