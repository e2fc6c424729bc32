//! Credential validation interface.
//!
//! Credential issuance and persistence live outside the core; the
//! dispatcher only ever asks whether a bot id / key pair is valid.

use async_trait::async_trait;
use std::collections::HashMap;

#[async_trait]
pub trait BotAuth: Send + Sync {
    async fn validate(&self, bot_id: &str, api_key: &str) -> bool;
}

/// Accepts every credential. Development and test default.
#[derive(Clone, Copy, Debug, Default)]
pub struct AllowAllAuth;

#[async_trait]
impl BotAuth for AllowAllAuth {
    async fn validate(&self, _bot_id: &str, _api_key: &str) -> bool {
        true
    }
}

/// A fixed in-memory key table.
#[derive(Clone, Debug, Default)]
pub struct StaticKeyAuth {
    keys: HashMap<String, String>,
}

impl StaticKeyAuth {
    #[must_use]
    pub fn new(keys: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            keys: keys.into_iter().collect(),
        }
    }
}

#[async_trait]
impl BotAuth for StaticKeyAuth {
    async fn validate(&self, bot_id: &str, api_key: &str) -> bool {
        self.keys.get(bot_id).is_some_and(|key| key == api_key)
    }
}
