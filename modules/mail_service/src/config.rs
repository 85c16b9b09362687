use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MailConfig {
    #[serde(default = "default_sender")]
    pub sender: String,
    /// Oldest messages are dropped beyond this many.
    #[serde(default = "default_outbox_capacity")]
    pub outbox_capacity: usize,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            sender: default_sender(),
            outbox_capacity: default_outbox_capacity(),
        }
    }
}

fn default_sender() -> String {
    "noreply@localhost".to_string()
}

fn default_outbox_capacity() -> usize {
    1000
}
