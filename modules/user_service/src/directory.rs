use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use http_service::HttpService;
use mail_service::MailService;
use svckit::ServiceInstance;

use crate::config::UserConfig;

/// `(method, path, handler)` owned by this service.
pub const ROUTES: &[(&str, &str, &str)] = &[
    ("GET", "/api/connect", "user.connect"),
    ("GET", "/api/disconnect", "user.disconnect"),
    ("GET", "/api/user", "user.get"),
];

#[derive(Debug, Clone)]
pub struct User {
    pub email: String,
    pub name: Option<String>,
    pub connected: bool,
    pub last_seen: DateTime<Utc>,
}

pub struct UserService {
    config: UserConfig,
    http: Arc<HttpService>,
    mail: Arc<MailService>,
    users: DashMap<String, User>,
}

impl UserService {
    /// Registers this service's routes on `http`.
    pub fn new(config: UserConfig, http: Arc<HttpService>, mail: Arc<MailService>) -> Self {
        for (method, path, handler) in ROUTES {
            http.register(method, path, handler);
        }
        Self {
            config,
            http,
            mail,
            users: DashMap::new(),
        }
    }

    /// Connect `email`. A first connection creates the user and queues a
    /// welcome mail.
    pub fn connect(&self, email: &str, name: Option<&str>) -> anyhow::Result<User> {
        let key = email.to_ascii_lowercase();
        let now = Utc::now();

        if let Some(mut existing) = self.users.get_mut(&key) {
            existing.connected = true;
            existing.last_seen = now;
            if let Some(name) = name {
                existing.name = Some(name.to_owned());
            }
            return Ok(existing.clone());
        }

        self.mail.send(email, &self.config.welcome_subject)?;
        let user = User {
            email: key.clone(),
            name: name.map(str::to_owned),
            connected: true,
            last_seen: now,
        };
        self.users.insert(key, user.clone());
        tracing::info!(email, "User connected for the first time");
        Ok(user)
    }

    /// Returns false when the user is unknown.
    pub fn disconnect(&self, email: &str) -> bool {
        match self.users.get_mut(&email.to_ascii_lowercase()) {
            Some(mut user) => {
                user.connected = false;
                user.last_seen = Utc::now();
                true
            }
            None => false,
        }
    }

    pub fn user(&self, email: &str) -> Option<User> {
        self.users
            .get(&email.to_ascii_lowercase())
            .map(|u| u.value().clone())
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait]
impl ServiceInstance for UserService {
    async fn release(&self) -> anyhow::Result<()> {
        for (method, path, _) in ROUTES {
            self.http.unregister(method, path);
        }
        tracing::debug!("User routes removed");
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}
