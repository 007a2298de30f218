use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use rbac_gate::config::{CommonConfig, RbacConfig};
use rbac_gate::grant::{RoleGrant, StaticGrants};
use rbac_gate::session::MemorySessionStore;
use rbac_gate::{Rbac, Registry};
use serde::{Deserialize, Serialize};

use super::actions;
use super::server::DemoServer;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "ServerConfig::default_bind")]
    pub bind: String,

    #[serde(default = "ServerConfig::default_log_level")]
    pub log_level: String,

    /// Cookie carrying the session id.
    #[serde(default = "ServerConfig::default_session_cookie")]
    pub session_cookie: String,

    /// Lifetime of a login session.
    #[serde(default = "ServerConfig::default_session_ttl_secs")]
    pub session_ttl_secs: u64,

    pub keep_alive_secs: Option<u64>,

    pub workers: Option<u64>,

    #[serde(default)]
    pub rbac: RbacConfig,

    /// Permissions of each role. Roles not listed here hold no permission.
    #[serde(default = "ServerConfig::default_grants")]
    pub grants: Vec<RoleGrant>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: Self::default_bind(),
            log_level: Self::default_log_level(),
            session_cookie: Self::default_session_cookie(),
            session_ttl_secs: Self::default_session_ttl_secs(),
            keep_alive_secs: None,
            workers: None,
            rbac: RbacConfig::default(),
            grants: Self::default_grants(),
        }
    }
}

impl CommonConfig for ServerConfig {
    fn complete(&mut self) -> Result<()> {
        if self.bind.is_empty() {
            bail!("bind is required");
        }

        if self.session_cookie.is_empty() {
            bail!("session_cookie is required");
        }

        if self.session_ttl_secs == 0 {
            bail!("session_ttl_secs must be greater than 0");
        }

        if let Some(workers) = self.workers {
            if workers == 0 {
                bail!("workers must be greater than 0");
            }
        }

        for grant in self.grants.iter() {
            if grant.role.is_empty() {
                bail!("grant role cannot be empty");
            }
        }

        self.rbac.complete()?;
        Ok(())
    }
}

impl ServerConfig {
    pub fn default_bind() -> String {
        String::from("127.0.0.1:8080")
    }

    pub fn default_log_level() -> String {
        String::from("info")
    }

    pub fn default_session_cookie() -> String {
        String::from(MemorySessionStore::DEFAULT_COOKIE)
    }

    pub fn default_session_ttl_secs() -> u64 {
        MemorySessionStore::DEFAULT_TTL.as_secs()
    }

    pub fn default_grants() -> Vec<RoleGrant> {
        vec![
            RoleGrant {
                role: String::from("writer"),
                permissions: vec![String::from("read"), String::from("write")],
            },
            RoleGrant {
                role: String::from("reader"),
                permissions: vec![String::from("read")],
            },
        ]
    }

    pub fn build_server(&self) -> DemoServer {
        let sessions = Arc::new(
            MemorySessionStore::new(&self.session_cookie)
                .with_ttl(Duration::from_secs(self.session_ttl_secs)),
        );
        let grants = StaticGrants::from(self.grants.as_slice());

        let mut registry = Registry::new();
        actions::register(&mut registry);

        let rbac = Rbac::new(
            Arc::new(grants),
            sessions.clone(),
            Arc::new(registry),
            self.rbac.options(),
        );

        let mut srv = DemoServer::new(self.bind.clone(), Arc::new(rbac), sessions);
        if let Some(keep_alive) = self.keep_alive_secs {
            srv.set_keep_alive_secs(keep_alive);
        }
        if let Some(workers) = self.workers {
            srv.set_workers(workers);
        }
        srv
    }
}
