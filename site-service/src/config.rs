use std::env;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} is invalid: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Process-level settings. Collaborator clients read their own variables.
#[derive(Debug, Clone)]
pub struct SiteConfig {
    pub admin_password: String,
    pub admin_token_secret: String,
    pub port: u16,
    pub route_prefix: String,
}

impl SiteConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let admin_password = lookup("ADMIN_PASSWORD")
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::Missing("ADMIN_PASSWORD"))?;

        let admin_token_secret = lookup("ADMIN_TOKEN_SECRET")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| format!("warmcycle-admin:{}", admin_password));

        let port = match lookup("PORT") {
            Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
                name: "PORT",
                value,
            })?,
            None => 8080,
        };

        // API Gateway stages mount the API under /Prod unless told otherwise.
        let remove_base_path = lookup("REMOVE_BASE_PATH")
            .map(|v| v.to_lowercase() == "true")
            .unwrap_or(false);
        let route_prefix = if remove_base_path { "" } else { "/Prod" }.to_string();

        Ok(SiteConfig {
            admin_password,
            admin_token_secret,
            port,
            route_prefix,
        })
    }
}
