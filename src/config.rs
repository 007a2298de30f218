use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::{fs, io};

use actix_web::http::header::ContentType;
use actix_web::{HttpRequest, HttpResponse};
use anyhow::{bail, Context, Result};
use log::warn;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub const DEFAULT_ROLE_SESSION_KEY: &str = "rbac_roles";
pub const DEFAULT_NO_PERM_MESSAGE: &str = "You have no permission to visit this page";

/// Called to build the response of a denied request.
pub type OnNoPerm = Arc<dyn Fn(&HttpRequest) -> HttpResponse + Send + Sync>;

pub trait CommonConfig: Default {
    /// Validates the config after it was deserialized.
    fn complete(&mut self) -> Result<()>;
}

/// Loads a TOML config file. A missing file yields the defaults.
pub fn load_config<T>(path: impl AsRef<str>) -> Result<T>
where
    T: CommonConfig + DeserializeOwned,
{
    let path = expandenv("config path", path)?;
    let mut cfg: T = match fs::read_to_string(&path) {
        Ok(s) => toml::from_str(&s).context("parse config toml")?,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            warn!("Config file {path} not found, using defaults");
            T::default()
        }
        Err(err) => {
            return Err(err).context(format!("read config file: {}", Path::new(&path).display()));
        }
    };

    cfg.complete().context("validate config")?;
    Ok(cfg)
}

/// See: [`shellexpand::full`].
pub fn expandenv(name: &str, s: impl AsRef<str>) -> Result<String> {
    let s =
        shellexpand::full(s.as_ref()).with_context(|| format!("expand env value for '{name}'"))?;
    Ok(s.to_string())
}

/// Authorizer related configuration
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct RbacConfig {
    /// The session key under which the caller's roles are stored.
    /// Defaults to `rbac_roles`.
    #[serde(default = "RbacConfig::default_role_session_key")]
    pub role_session_key: String,

    /// The plain text body written when a request is denied.
    #[serde(default = "RbacConfig::default_no_perm_message")]
    pub no_perm_message: String,
}

impl Default for RbacConfig {
    fn default() -> Self {
        Self {
            role_session_key: Self::default_role_session_key(),
            no_perm_message: Self::default_no_perm_message(),
        }
    }
}

impl CommonConfig for RbacConfig {
    fn complete(&mut self) -> Result<()> {
        if self.role_session_key.is_empty() {
            bail!("role_session_key is required");
        }

        Ok(())
    }
}

impl RbacConfig {
    pub fn default_role_session_key() -> String {
        String::from(DEFAULT_ROLE_SESSION_KEY)
    }

    pub fn default_no_perm_message() -> String {
        String::from(DEFAULT_NO_PERM_MESSAGE)
    }

    pub fn options(&self) -> Options {
        Options::new()
            .with_role_session_key(&self.role_session_key)
            .with_no_perm_message(&self.no_perm_message)
    }
}

/// Authorizer options, fixed once the authorizer is built.
#[derive(Clone)]
pub struct Options {
    role_session_key: String,
    on_no_perm: OnNoPerm,
}

impl Options {
    pub fn new() -> Self {
        Self {
            role_session_key: String::from(DEFAULT_ROLE_SESSION_KEY),
            on_no_perm: Self::no_perm_text(DEFAULT_NO_PERM_MESSAGE),
        }
    }

    /// Empty keys are ignored and keep the current one.
    pub fn with_role_session_key(mut self, key: impl AsRef<str>) -> Self {
        let key = key.as_ref();
        if !key.is_empty() {
            self.role_session_key = key.to_string();
        }
        self
    }

    pub fn with_on_no_perm<F>(mut self, f: F) -> Self
    where
        F: Fn(&HttpRequest) -> HttpResponse + Send + Sync + 'static,
    {
        self.on_no_perm = Arc::new(f);
        self
    }

    /// Denies with `200 OK` and `message` as plain text body.
    pub fn with_no_perm_message(mut self, message: impl AsRef<str>) -> Self {
        self.on_no_perm = Self::no_perm_text(message.as_ref());
        self
    }

    pub fn role_session_key(&self) -> &str {
        &self.role_session_key
    }

    /// Builds the response for a denied request.
    pub fn reject(&self, req: &HttpRequest) -> HttpResponse {
        (self.on_no_perm)(req)
    }

    fn no_perm_text(message: &str) -> OnNoPerm {
        let message = message.to_string();
        Arc::new(move |_req| {
            HttpResponse::Ok()
                .content_type(ContentType::plaintext())
                .body(message.clone())
        })
    }
}

impl Default for Options {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("role_session_key", &self.role_session_key)
            .finish_non_exhaustive()
    }
}
