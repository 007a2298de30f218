use std::collections::HashMap;
use std::fmt;

use crate::action::{Action, ActionId};

/// The two annotation kinds an action can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagKind {
    Perm,
    Role,
}

impl TagKind {
    /// The field name the annotation is declared under.
    pub fn field(&self) -> &'static str {
        match self {
            TagKind::Perm => "Perm",
            TagKind::Role => "Role",
        }
    }
}

impl fmt::Display for TagKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field())
    }
}

/// Looks up the declared annotation of an action type.
///
/// Returns an empty string when the action declares nothing of that kind.
pub trait AnnotationSource: Send + Sync {
    fn annotation(&self, id: &ActionId, kind: TagKind) -> String;
}

/// Annotations declared by one action type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Annotations {
    pub perm: String,
    pub role: String,
}

impl Annotations {
    pub fn perm(perm: impl ToString) -> Self {
        Self {
            perm: perm.to_string(),
            role: String::new(),
        }
    }

    pub fn role(role: impl ToString) -> Self {
        Self {
            perm: String::new(),
            role: role.to_string(),
        }
    }

    fn get(&self, kind: TagKind) -> &str {
        match kind {
            TagKind::Perm => &self.perm,
            TagKind::Role => &self.role,
        }
    }
}

/// Annotation table filled while routes are registered.
#[derive(Debug, Default)]
pub struct Registry {
    actions: HashMap<ActionId, Annotations>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the annotations `A` declares through [`Action::PERM`] and
    /// [`Action::ROLE`].
    pub fn register<A: Action>(&mut self) -> &mut Self {
        self.insert(
            ActionId::of::<A>(),
            Annotations {
                perm: A::PERM.to_string(),
                role: A::ROLE.to_string(),
            },
        )
    }

    /// Records annotations for an id, replacing earlier ones.
    pub fn insert(&mut self, id: ActionId, annotations: Annotations) -> &mut Self {
        self.actions.insert(id, annotations);
        self
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

impl AnnotationSource for Registry {
    fn annotation(&self, id: &ActionId, kind: TagKind) -> String {
        self.actions
            .get(id)
            .map(|a| a.get(kind).to_string())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use actix_web::web::Bytes;
    use actix_web::{HttpRequest, HttpResponse};
    use async_trait::async_trait;

    use crate::action::Capabilities;

    use super::*;

    struct Writer;

    impl Capabilities for Writer {}

    #[async_trait(?Send)]
    impl Action for Writer {
        const PERM: &'static str = r#"GET:"read" POST:"write""#;
        const ROLE: &'static str = "writer";

        async fn handle(&mut self, _req: &HttpRequest, _body: Bytes) -> HttpResponse {
            HttpResponse::Ok().finish()
        }
    }

    struct Plain;

    #[test]
    fn test_registry() {
        let mut registry = Registry::new();
        assert!(registry.is_empty());

        registry
            .register::<Writer>()
            .insert(ActionId::of::<Plain>(), Annotations::role("reader"));
        assert_eq!(registry.len(), 2);

        let writer = ActionId::of::<Writer>();
        assert_eq!(
            registry.annotation(&writer, TagKind::Perm),
            r#"GET:"read" POST:"write""#
        );
        assert_eq!(registry.annotation(&writer, TagKind::Role), "writer");

        let plain = ActionId::of::<Plain>();
        assert_eq!(registry.annotation(&plain, TagKind::Perm), "");
        assert_eq!(registry.annotation(&plain, TagKind::Role), "reader");

        // Unknown actions declare nothing
        let unknown = ActionId::of::<Registry>();
        assert_eq!(registry.annotation(&unknown, TagKind::Perm), "");
        assert_eq!(registry.annotation(&unknown, TagKind::Role), "");

        // Later registrations replace earlier ones
        registry.insert(plain, Annotations::perm("write"));
        assert_eq!(registry.annotation(&plain, TagKind::Perm), "write");
        assert_eq!(registry.annotation(&plain, TagKind::Role), "");
    }

    #[test]
    fn test_tag_kind() {
        assert_eq!(TagKind::Perm.field(), "Perm");
        assert_eq!(TagKind::Role.to_string(), "Role");
    }
}
