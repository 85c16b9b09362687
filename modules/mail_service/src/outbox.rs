use std::any::Any;
use std::collections::VecDeque;
use std::sync::Arc;

use anyhow::bail;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use svckit::ServiceInstance;

use crate::config::MailConfig;

#[derive(Debug, Clone)]
pub struct Mail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub queued_at: DateTime<Utc>,
}

pub struct MailService {
    config: MailConfig,
    outbox: Mutex<VecDeque<Mail>>,
}

impl MailService {
    pub fn new(config: MailConfig) -> Self {
        Self {
            config,
            outbox: Mutex::new(VecDeque::new()),
        }
    }

    pub fn sender(&self) -> &str {
        &self.config.sender
    }

    pub fn send(&self, to: &str, subject: &str) -> anyhow::Result<()> {
        if !is_plausible_address(to) {
            bail!("invalid recipient address '{to}'");
        }

        let mail = Mail {
            from: self.config.sender.clone(),
            to: to.to_owned(),
            subject: subject.to_owned(),
            queued_at: Utc::now(),
        };

        let mut outbox = self.outbox.lock();
        if outbox.len() >= self.config.outbox_capacity.max(1) {
            outbox.pop_front();
        }
        outbox.push_back(mail);
        tracing::debug!(to, subject, "Mail queued");
        Ok(())
    }

    /// Queued messages, oldest first.
    pub fn outbox(&self) -> Vec<Mail> {
        self.outbox.lock().iter().cloned().collect()
    }
}

fn is_plausible_address(addr: &str) -> bool {
    match addr.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !domain.contains('@'),
        None => false,
    }
}

#[async_trait]
impl ServiceInstance for MailService {
    async fn release(&self) -> anyhow::Result<()> {
        let pending = self.outbox.lock().len();
        if pending > 0 {
            tracing::info!(pending, "Mail service released with queued messages");
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}
