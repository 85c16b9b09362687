use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserConfig {
    /// Subject line of the mail sent on first connection.
    #[serde(default = "default_welcome_subject")]
    pub welcome_subject: String,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            welcome_subject: default_welcome_subject(),
        }
    }
}

fn default_welcome_subject() -> String {
    "Welcome".to_string()
}
