use rust_decimal::Decimal;
use std::env;
use std::path::PathBuf;

use crate::models::Identity;

const DEFAULT_CREATION_FEE: &str = "0.001";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// Bearer token for `/api` and `/ws`; auth is disabled when unset.
    pub api_token: Option<String>,

    // Roles the registry starts with
    pub owner: Identity,
    pub resolver: Identity,
    pub creation_fee: Decimal,

    // Persistence (in-memory only when unset)
    pub state_file: Option<PathBuf>,

    // Event delivery
    pub event_webhook_url: Option<String>,
    pub event_channel_capacity: usize,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let owner = parse_identity("OWNER_ADDRESS", &require("OWNER_ADDRESS")?)?;
        let resolver = parse_identity("RESOLVER_ADDRESS", &require("RESOLVER_ADDRESS")?)?;

        let creation_fee: Decimal = env::var("CREATION_FEE")
            .unwrap_or_else(|_| DEFAULT_CREATION_FEE.into())
            .parse()
            .map_err(|e| anyhow::anyhow!("CREATION_FEE is not a decimal: {e}"))?;
        if creation_fee < Decimal::ZERO {
            anyhow::bail!("CREATION_FEE must not be negative");
        }

        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".into())
                .parse()?,
            api_token: env::var("API_TOKEN").ok().filter(|s| !s.is_empty()),

            owner,
            resolver,
            creation_fee,

            state_file: env::var("STATE_FILE")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),

            event_webhook_url: env::var("EVENT_WEBHOOK_URL")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            event_channel_capacity: env::var("EVENT_CHANNEL_CAPACITY")
                .unwrap_or_else(|_| "256".into())
                .parse()
                .unwrap_or(256)
                .max(1),
        })
    }

    /// Config with the given roles and defaults for everything else.
    pub fn with_roles(owner: Identity, resolver: Identity, creation_fee: Decimal) -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            api_token: None,
            owner,
            resolver,
            creation_fee,
            state_file: None,
            event_webhook_url: None,
            event_channel_capacity: 256,
        }
    }
}

fn require(key: &str) -> anyhow::Result<String> {
    env::var(key).map_err(|_| anyhow::anyhow!("{key} must be set"))
}

fn parse_identity(key: &str, raw: &str) -> anyhow::Result<Identity> {
    let id: Identity = raw
        .parse()
        .map_err(|e| anyhow::anyhow!("{key} is not a valid address: {e}"))?;
    if id.is_zero() {
        anyhow::bail!("{key} must not be the zero address");
    }
    Ok(id)
}
