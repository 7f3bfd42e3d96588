use serde::Deserialize;

use crate::ledger::client::{MAINNET_URL, TESTNET_URL};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    Development,
    Staging,
    Production,
}

impl Profile {
    pub fn from_env() -> Self {
        std::env::var("APP_PROFILE")
            .ok()
            .and_then(|s| match s.to_lowercase().as_str() {
                "development" | "dev" => Some(Self::Development),
                "staging" | "stage" => Some(Self::Staging),
                "production" | "prod" => Some(Self::Production),
                _ => None,
            })
            .unwrap_or(Self::Development)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Staging => "staging",
            Self::Production => "production",
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProfileDefaults {
    pub server_port: u16,
    pub database_url: Option<String>,
    pub xrpl_rpc_url: String,
    pub submit_timeout_secs: u64,
}

impl ProfileDefaults {
    pub fn for_profile(profile: Profile) -> Self {
        match profile {
            Profile::Development => Self {
                server_port: 3000,
                database_url: None,
                xrpl_rpc_url: TESTNET_URL.to_string(),
                submit_timeout_secs: 60,
            },
            Profile::Staging => Self {
                server_port: 8080,
                database_url: None,
                xrpl_rpc_url: TESTNET_URL.to_string(),
                submit_timeout_secs: 60,
            },
            Profile::Production => Self {
                server_port: 8080,
                database_url: None,
                xrpl_rpc_url: MAINNET_URL.to_string(),
                submit_timeout_secs: 120,
            },
        }
    }
}
