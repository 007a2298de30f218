use std::sync::Arc;

use crate::action::BoundAction;
use crate::annotation::{AnnotationSource, TagKind};
use crate::cache::TagCache;

/// Finds the raw permission and role tags of the bound action.
///
/// Self reported tags win. Otherwise the annotation source is asked once per
/// action type, with a separate cache for each tag kind.
pub struct TagResolver {
    source: Arc<dyn AnnotationSource>,
    perms: TagCache,
    roles: TagCache,
}

impl TagResolver {
    pub fn new(source: Arc<dyn AnnotationSource>) -> Self {
        Self {
            source,
            perms: TagCache::new(),
            roles: TagCache::new(),
        }
    }

    pub fn resolve(&self, kind: TagKind, bound: &BoundAction) -> String {
        let reported = match kind {
            TagKind::Perm => bound.action.perm_tag(),
            TagKind::Role => bound.action.role_tag(),
        };
        if let Some(tag) = reported {
            return tag;
        }

        self.cache(kind).get_or_compute(&bound.id, || {
            self.source.annotation(&bound.id, kind)
        })
    }

    pub fn cache(&self, kind: TagKind) -> &TagCache {
        match kind {
            TagKind::Perm => &self.perms,
            TagKind::Role => &self.roles,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::action::{ActionId, Capabilities};
    use crate::annotation::{Annotations, Registry};

    use super::*;

    /// Counts how often each tag kind is looked up.
    pub struct CountingSource {
        pub inner: Registry,
        pub perm_calls: AtomicUsize,
        pub role_calls: AtomicUsize,
    }

    impl CountingSource {
        pub fn new(inner: Registry) -> Self {
            Self {
                inner,
                perm_calls: AtomicUsize::new(0),
                role_calls: AtomicUsize::new(0),
            }
        }

        pub fn calls(&self, kind: TagKind) -> usize {
            match kind {
                TagKind::Perm => self.perm_calls.load(Ordering::SeqCst),
                TagKind::Role => self.role_calls.load(Ordering::SeqCst),
            }
        }
    }

    impl AnnotationSource for CountingSource {
        fn annotation(&self, id: &ActionId, kind: TagKind) -> String {
            match kind {
                TagKind::Perm => self.perm_calls.fetch_add(1, Ordering::SeqCst),
                TagKind::Role => self.role_calls.fetch_add(1, Ordering::SeqCst),
            };
            self.inner.annotation(id, kind)
        }
    }

    struct Declared;
    impl Capabilities for Declared {}

    struct Undeclared;
    impl Capabilities for Undeclared {}

    struct Reporting;
    impl Capabilities for Reporting {
        fn perm_tag(&self) -> Option<String> {
            Some(r#"GET:"read" POST:"write""#.to_string())
        }

        fn role_tag(&self) -> Option<String> {
            Some(String::new())
        }
    }

    fn resolver() -> (TagResolver, Arc<CountingSource>) {
        let mut registry = Registry::new();
        registry
            .insert(
                ActionId::of::<Declared>(),
                Annotations {
                    perm: "write".to_string(),
                    role: "writer".to_string(),
                },
            )
            .insert(ActionId::of::<Reporting>(), Annotations::perm("ignored"));
        let source = Arc::new(CountingSource::new(registry));
        (TagResolver::new(source.clone()), source)
    }

    #[test]
    fn test_resolve_cached() {
        let (resolver, source) = resolver();
        let mut action = Declared;

        for _ in 0..3 {
            let bound = BoundAction::new(&mut action);
            assert_eq!(resolver.resolve(TagKind::Perm, &bound), "write");
            assert_eq!(resolver.resolve(TagKind::Role, &bound), "writer");
        }
        assert_eq!(source.calls(TagKind::Perm), 1);
        assert_eq!(source.calls(TagKind::Role), 1);

        let id = ActionId::of::<Declared>();
        assert_eq!(resolver.cache(TagKind::Perm).get(&id), Some("write".to_string()));
        assert_eq!(resolver.cache(TagKind::Role).get(&id), Some("writer".to_string()));
    }

    #[test]
    fn test_resolve_undeclared() {
        let (resolver, source) = resolver();
        let mut action = Undeclared;

        for _ in 0..3 {
            let bound = BoundAction::new(&mut action);
            assert_eq!(resolver.resolve(TagKind::Perm, &bound), "");
        }
        // Absence is probed again every time
        assert_eq!(source.calls(TagKind::Perm), 3);
        assert!(resolver.cache(TagKind::Perm).is_empty());
    }

    #[test]
    fn test_resolve_reported() {
        let (resolver, source) = resolver();
        let mut action = Reporting;

        let bound = BoundAction::new(&mut action);
        assert_eq!(
            resolver.resolve(TagKind::Perm, &bound),
            r#"GET:"read" POST:"write""#
        );
        assert_eq!(resolver.resolve(TagKind::Role, &bound), "");

        assert_eq!(source.calls(TagKind::Perm), 0);
        assert_eq!(source.calls(TagKind::Role), 0);
        assert!(resolver.cache(TagKind::Perm).is_empty());
        assert!(resolver.cache(TagKind::Role).is_empty());
    }
}
