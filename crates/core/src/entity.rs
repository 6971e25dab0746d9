//! The contract a domain entity implements to take part in media tracking.

use std::any::{Any, TypeId};

use crate::types::DbId;

/// Upcast helper so trait objects can be downcast to their concrete type.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A persisted domain entity whose properties may reference media files.
///
/// Wrapper types (lazy-loading proxies, change-tracking shells) override
/// [`unproxied`](TrackableEntity::unproxied) to expose the declared entity,
/// so registry lookups and property accessors see the real type.
pub trait TrackableEntity: AsAny + Send + Sync {
    /// Logical type name stored on track records, e.g. `"Product"`.
    fn entity_name(&self) -> &'static str;

    /// Primary key; `< 1` while the entity is unsaved.
    fn entity_id(&self) -> DbId;

    fn is_transient_record(&self) -> bool {
        self.entity_id() < 1
    }

    fn unproxied(&self) -> &dyn Any {
        self.as_any()
    }
}

impl dyn TrackableEntity + '_ {
    /// The declared type used as the registry key.
    pub fn declared_type(&self) -> TypeId {
        Any::type_id(self.unproxied())
    }

    pub fn key(&self) -> EntityKey {
        EntityKey {
            entity_name: self.entity_name(),
            entity_id: self.entity_id(),
        }
    }
}

/// Identity of one entity instance within a unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityKey {
    pub entity_name: &'static str,
    pub entity_id: DbId,
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Product {
        id: DbId,
    }

    impl TrackableEntity for Product {
        fn entity_name(&self) -> &'static str {
            "Product"
        }
        fn entity_id(&self) -> DbId {
            self.id
        }
    }

    struct LazyProxy {
        inner: Product,
    }

    impl TrackableEntity for LazyProxy {
        fn entity_name(&self) -> &'static str {
            self.inner.entity_name()
        }
        fn entity_id(&self) -> DbId {
            self.inner.entity_id()
        }
        fn unproxied(&self) -> &dyn Any {
            &self.inner
        }
    }

    #[test]
    fn proxy_resolves_to_declared_type() {
        let proxy = LazyProxy {
            inner: Product { id: 3 },
        };
        let entity: &dyn TrackableEntity = &proxy;
        assert_eq!(entity.declared_type(), TypeId::of::<Product>());
        assert!(entity.unproxied().downcast_ref::<Product>().is_some());
    }

    #[test]
    fn unsaved_entities_are_transient_records() {
        let product = Product { id: 0 };
        assert!(product.is_transient_record());
        assert!(!Product { id: 1 }.is_transient_record());
    }
}
