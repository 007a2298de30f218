use std::any::{self, TypeId};
use std::fmt;

use actix_web::web::Bytes;
use actix_web::{HttpRequest, HttpResponse};
use async_trait::async_trait;

use crate::session::SessionBinding;

/// Stable identity of an action type, used to key cached annotations.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActionId {
    type_id: TypeId,
    name: &'static str,
}

impl ActionId {
    pub fn of<A: 'static>() -> Self {
        Self {
            type_id: TypeId::of::<A>(),
            name: any::type_name::<A>(),
        }
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Debug for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Optional abilities an action can expose to the authorizer.
///
/// Every method has a default that reports "not supported", so a plain
/// action only needs an empty `impl Capabilities for MyAction {}`.
pub trait Capabilities {
    /// Reports the permission tag of this action directly. Returning `Some`
    /// skips the registry and the tag cache.
    fn perm_tag(&self) -> Option<String> {
        None
    }

    /// Reports the role tag of this action directly. Returning `Some` skips
    /// the registry and the tag cache.
    fn role_tag(&self) -> Option<String> {
        None
    }

    /// Receives the session binding of the current request before any rule is
    /// checked. Actions keep it to assign roles later.
    fn bind_session(&mut self, _session: SessionBinding) {}
}

/// A request handler guarded by the authorizer.
///
/// A fresh value is built for every request, see [`crate::dispatch`].
#[async_trait(?Send)]
pub trait Action: Capabilities + 'static {
    /// Permission annotation, bare (`write`) or keyed by verb
    /// (`GET:"read" POST:"write"`). Empty means none.
    const PERM: &'static str = "";

    /// Role annotation, same syntax as [`Action::PERM`].
    const ROLE: &'static str = "";

    async fn handle(&mut self, req: &HttpRequest, body: Bytes) -> HttpResponse;
}

/// An action instance bound to the current request.
pub struct BoundAction<'a> {
    pub id: ActionId,
    pub action: &'a mut dyn Capabilities,
}

impl<'a> BoundAction<'a> {
    pub fn new<A: Capabilities + 'static>(action: &'a mut A) -> Self {
        Self {
            id: ActionId::of::<A>(),
            action,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    struct First;
    struct Second;

    #[test]
    fn test_action_id() {
        assert_eq!(ActionId::of::<First>(), ActionId::of::<First>());
        assert_ne!(ActionId::of::<First>(), ActionId::of::<Second>());

        let ids: HashSet<ActionId> = [
            ActionId::of::<First>(),
            ActionId::of::<Second>(),
            ActionId::of::<First>(),
        ]
        .into_iter()
        .collect();
        assert_eq!(ids.len(), 2);

        assert!(ActionId::of::<First>().name().ends_with("First"));
        assert_eq!(
            format!("{}", ActionId::of::<Second>()),
            ActionId::of::<Second>().name()
        );
    }
}
