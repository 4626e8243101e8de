use anyhow::Context;
use serde::Deserialize;

use crate::auth::SecretScheme;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Raw PORT value; parsed by [`Config::listen_port`] only when serving.
    /// `serve --port` overrides it and the server refuses to start when neither is given.
    pub port: Option<String>,
    /// HS256 secret for bearer tokens. Set via JWT_SECRET_KEY, required.
    pub jwt_secret: String,
    /// Postgres backend; the in-memory store is used when unset.
    pub database_url: Option<String>,
    /// Whether `GET /cats/` needs a bearer token.
    /// Set via CATTERY_LIST_REQUIRES_AUTH. Default: true.
    pub list_requires_auth: bool,
    /// Reject tokens whose subject is not a registered user.
    /// Set via CATTERY_RECHECK_SUBJECT. Default: false.
    pub recheck_subject: bool,
    /// How secrets are stored. Set via CATTERY_PASSWORD_SCHEME. Default: argon2.
    pub password_scheme: SecretScheme,
    /// Preload the demo user and cats on startup.
    pub seed_demo: bool,
    /// Extra CORS origin allowed next to localhost.
    pub allowed_origin: String,
}

impl Config {
    /// Test and embedding defaults: in-memory store, list requires auth.
    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self {
            port: None,
            jwt_secret: secret.into(),
            database_url: None,
            list_requires_auth: true,
            recheck_subject: false,
            password_scheme: SecretScheme::default(),
            seed_demo: false,
            allowed_origin: "http://localhost:3000".into(),
        }
    }

    pub fn listen_port(&self) -> anyhow::Result<Option<u16>> {
        self.port
            .as_deref()
            .map(|p| {
                p.trim()
                    .parse::<u16>()
                    .with_context(|| format!("PORT is not a valid port number: '{}'", p))
            })
            .transpose()
    }
}

fn env_flag(name: &str, default: bool) -> anyhow::Result<bool> {
    match std::env::var(name) {
        Ok(v) => match v.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => anyhow::bail!("{} must be a boolean, got '{}'", name, other),
        },
        Err(_) => Ok(default),
    }
}

pub fn load() -> anyhow::Result<Config> {
    dotenvy::dotenv().ok();

    let jwt_secret = std::env::var("JWT_SECRET_KEY").unwrap_or_default();
    if jwt_secret.is_empty() {
        anyhow::bail!("JWT_SECRET_KEY is not set. Refusing to sign tokens with an empty key.");
    }

    let password_scheme = match std::env::var("CATTERY_PASSWORD_SCHEME") {
        Ok(v) => v.parse().map_err(anyhow::Error::msg)?,
        Err(_) => SecretScheme::default(),
    };

    Ok(Config {
        port: std::env::var("PORT").ok(),
        jwt_secret,
        database_url: std::env::var("DATABASE_URL")
            .ok()
            .filter(|s| !s.trim().is_empty()),
        list_requires_auth: env_flag("CATTERY_LIST_REQUIRES_AUTH", true)?,
        recheck_subject: env_flag("CATTERY_RECHECK_SUBJECT", false)?,
        password_scheme,
        seed_demo: env_flag("CATTERY_SEED_DEMO", false)?,
        allowed_origin: std::env::var("CATTERY_ALLOWED_ORIGIN")
            .unwrap_or_else(|_| "http://localhost:3000".into()),
    })
}
