//! Process configuration, read once from the environment at startup.

use std::env;
use std::net::SocketAddr;

use thiserror::Error;

use workhive_auth::Credentials;

const DEV_JWT_SECRET: &str = "dev-secret";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },

    #[error("{present} is set but {missing} is not")]
    Incomplete { present: &'static str, missing: &'static str },
}

/// Optional platform account created at startup if absent.
#[derive(Clone, PartialEq, Eq)]
pub struct SuperAdminSeed {
    pub email: String,
    pub password: String,
    pub full_name: String,
}

impl std::fmt::Debug for SuperAdminSeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SuperAdminSeed")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("full_name", &self.full_name)
            .finish()
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    pub jwt_ttl_secs: i64,
    /// `None` selects the in-memory store.
    pub database_url: Option<String>,
    pub super_admin: Option<SuperAdminSeed>,
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("bind_addr", &self.bind_addr)
            .field("jwt_secret", &"<redacted>")
            .field("jwt_ttl_secs", &self.jwt_ttl_secs)
            .field("database_url", &self.database_url.as_ref().map(|_| "<set>"))
            .field("super_admin", &self.super_admin)
            .finish()
    }
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bind_addr = match var("BIND_ADDR") {
            Some(raw) => raw
                .parse()
                .map_err(|_| ConfigError::Invalid { name: "BIND_ADDR", value: raw })?,
            None => SocketAddr::from(([0, 0, 0, 0], 8080)),
        };

        let jwt_secret = var("JWT_SECRET").unwrap_or_else(|| {
            tracing::warn!("JWT_SECRET not set; using insecure dev default");
            DEV_JWT_SECRET.to_string()
        });

        let jwt_ttl_secs = match var("JWT_EXPIRES_IN_SECS") {
            Some(raw) => match raw.parse::<i64>() {
                Ok(secs) if secs > 0 => secs,
                _ => return Err(ConfigError::Invalid { name: "JWT_EXPIRES_IN_SECS", value: raw }),
            },
            None => Credentials::DEFAULT_TTL_SECS,
        };

        let super_admin = match (var("SUPER_ADMIN_EMAIL"), var("SUPER_ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(SuperAdminSeed {
                email,
                password,
                full_name: var("SUPER_ADMIN_NAME").unwrap_or_else(|| "Platform Admin".to_string()),
            }),
            (Some(_), None) => {
                return Err(ConfigError::Incomplete {
                    present: "SUPER_ADMIN_EMAIL",
                    missing: "SUPER_ADMIN_PASSWORD",
                });
            }
            (None, Some(_)) => {
                return Err(ConfigError::Incomplete {
                    present: "SUPER_ADMIN_PASSWORD",
                    missing: "SUPER_ADMIN_EMAIL",
                });
            }
            (None, None) => None,
        };

        Ok(Self {
            bind_addr,
            jwt_secret,
            jwt_ttl_secs,
            database_url: var("DATABASE_URL"),
            super_admin,
        })
    }

    /// In-memory configuration with the given signing secret.
    pub fn in_memory(jwt_secret: impl Into<String>) -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            jwt_secret: jwt_secret.into(),
            jwt_ttl_secs: Credentials::DEFAULT_TTL_SECS,
            database_url: None,
            super_admin: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let cfg = ApiConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg.bind_addr.port(), 8080);
        assert_eq!(cfg.jwt_secret, DEV_JWT_SECRET);
        assert_eq!(cfg.jwt_ttl_secs, 86_400);
        assert!(cfg.database_url.is_none());
        assert!(cfg.super_admin.is_none());
    }

    #[test]
    fn reads_every_variable() {
        let cfg = ApiConfig::from_lookup(lookup(&[
            ("BIND_ADDR", "127.0.0.1:9000"),
            ("JWT_SECRET", "s3cret"),
            ("JWT_EXPIRES_IN_SECS", "600"),
            ("DATABASE_URL", "postgres://localhost/workhive"),
            ("SUPER_ADMIN_EMAIL", "root@workhive.test"),
            ("SUPER_ADMIN_PASSWORD", "root-password"),
        ]))
        .unwrap();
        assert_eq!(cfg.bind_addr.to_string(), "127.0.0.1:9000");
        assert_eq!(cfg.jwt_secret, "s3cret");
        assert_eq!(cfg.jwt_ttl_secs, 600);
        assert_eq!(cfg.database_url.as_deref(), Some("postgres://localhost/workhive"));
        assert_eq!(cfg.super_admin.unwrap().email, "root@workhive.test");
    }

    #[test]
    fn rejects_bad_values() {
        let err = ApiConfig::from_lookup(lookup(&[("JWT_EXPIRES_IN_SECS", "-5")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "JWT_EXPIRES_IN_SECS", .. }));

        let err = ApiConfig::from_lookup(lookup(&[("SUPER_ADMIN_EMAIL", "root@workhive.test")])).unwrap_err();
        assert!(matches!(err, ConfigError::Incomplete { missing: "SUPER_ADMIN_PASSWORD", .. }));
    }

    #[test]
    fn debug_output_hides_secrets() {
        let cfg = ApiConfig::in_memory("top-secret");
        assert!(!format!("{cfg:?}").contains("top-secret"));
    }
}
