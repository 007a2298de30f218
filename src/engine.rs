use std::fmt;
use std::sync::Arc;

use actix_web::HttpRequest;
use anyhow::{Context, Result};
use log::debug;

use crate::action::{ActionId, BoundAction};
use crate::annotation::{AnnotationSource, TagKind};
use crate::config::Options;
use crate::grant::GrantRelation;
use crate::resolver::TagResolver;
use crate::session::{SessionBinding, SessionStore};
use crate::tag::Requirement;

/// Outcome of an authorization check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Run the action.
    Allow,
    /// Call the rejection callback instead of the action.
    Deny,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Allow => f.write_str("allow"),
            Decision::Deny => f.write_str("deny"),
        }
    }
}

/// The authorizer. One instance is shared by all workers.
///
/// For each request it:
/// - allows requests without a bound action
/// - checks the permission tag of the action against the grant relation,
///   for every role in the caller's session
/// - otherwise checks the role tag against the caller's roles
/// - allows actions that declare neither
pub struct Rbac {
    opts: Options,
    resolver: TagResolver,
    sessions: Arc<dyn SessionStore>,
    grants: Arc<dyn GrantRelation>,
}

impl Rbac {
    pub fn new(
        grants: Arc<dyn GrantRelation>,
        sessions: Arc<dyn SessionStore>,
        source: Arc<dyn AnnotationSource>,
        opts: Options,
    ) -> Self {
        Self {
            opts,
            resolver: TagResolver::new(source),
            sessions,
            grants,
        }
    }

    pub fn options(&self) -> &Options {
        &self.opts
    }

    /// Decides whether `req` may reach the bound action.
    ///
    /// Errors only come from the session store or the grant relation, they are
    /// returned untouched for the caller to handle.
    pub fn authorize(&self, req: &HttpRequest, bound: Option<BoundAction>) -> Result<Decision> {
        let mut bound = match bound {
            Some(bound) => bound,
            None => return Ok(Decision::Allow),
        };

        bound.action.bind_session(SessionBinding::new(
            self.opts.role_session_key(),
            self.sessions.clone(),
            req.clone(),
        ));

        let verb = req.method().as_str();

        let perm_tag = self.resolver.resolve(TagKind::Perm, &bound);
        let decision = match Requirement::parse(&perm_tag, verb) {
            Requirement::Unrestricted => Decision::Allow,
            Requirement::Required(perm) => self.check_perm(req, &bound.id, &perm)?,
            Requirement::Absent => {
                let role_tag = self.resolver.resolve(TagKind::Role, &bound);
                match Requirement::parse(&role_tag, verb) {
                    Requirement::Required(role) => self.check_role(req, &bound.id, &role)?,
                    Requirement::Unrestricted | Requirement::Absent => Decision::Allow,
                }
            }
        };

        debug!(
            "Authorize {verb} {} for action {}: {decision}",
            req.path(),
            bound.id
        );
        Ok(decision)
    }

    fn check_perm(&self, req: &HttpRequest, id: &ActionId, perm: &str) -> Result<Decision> {
        let roles = match self.roles(req)? {
            Some(roles) => roles,
            None => return Ok(Decision::Deny),
        };

        for role in roles.iter() {
            let granted = self
                .grants
                .is_granted(role, perm, None)
                .with_context(|| format!("check permission '{perm}' of role '{role}'"))?;
            if granted {
                debug!("Role '{role}' grants permission '{perm}' on action {id}");
                return Ok(Decision::Allow);
            }
        }

        debug!("No role in {roles:?} grants permission '{perm}' on action {id}");
        Ok(Decision::Deny)
    }

    fn check_role(&self, req: &HttpRequest, id: &ActionId, required: &str) -> Result<Decision> {
        let roles = match self.roles(req)? {
            Some(roles) => roles,
            None => return Ok(Decision::Deny),
        };

        if roles.iter().any(|role| role == required) {
            return Ok(Decision::Allow);
        }

        debug!("Roles {roles:?} miss role '{required}' on action {id}");
        Ok(Decision::Deny)
    }

    fn roles(&self, req: &HttpRequest) -> Result<Option<Vec<String>>> {
        let key = self.opts.role_session_key();
        let roles = self
            .sessions
            .get(req, key)
            .with_context(|| format!("get session value '{key}'"))?;
        if roles.is_none() {
            debug!("No roles in session for {} {}", req.method(), req.path());
        }
        Ok(roles)
    }
}
