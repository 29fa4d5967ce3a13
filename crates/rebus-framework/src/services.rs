//! Shared services handed to handlers.
//!
//! Handlers registered at link time are built by plain function pointers and
//! cannot capture state. Stateful collaborators (stores, settings) are put in
//! a [`Services`] map when the runtime is built and looked up by type from the
//! [`HandlerContext`](crate::HandlerContext).

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

/// Type-keyed map of shared services.
///
/// `T` may be a trait object: `insert::<dyn PuzzleStore>(store)` stores the
/// `Arc<dyn PuzzleStore>` and `get::<dyn PuzzleStore>()` returns it.
#[derive(Default, Clone)]
pub struct Services {
    entries: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl Services {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a service (builder pattern).
    pub fn with<T: ?Sized + Send + Sync + 'static>(mut self, service: Arc<T>) -> Self {
        self.insert(service);
        self
    }

    /// Adds a service, replacing any previous one of the same type.
    pub fn insert<T: ?Sized + Send + Sync + 'static>(&mut self, service: Arc<T>) {
        self.entries.insert(TypeId::of::<T>(), Arc::new(service));
    }

    /// Looks up a service by type.
    pub fn get<T: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.entries
            .get(&TypeId::of::<T>())
            .and_then(|entry| entry.downcast_ref::<Arc<T>>().map(Arc::clone))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services")
            .field("count", &self.entries.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Greeter: Send + Sync {
        fn greet(&self) -> String;
    }

    struct English;

    impl Greeter for English {
        fn greet(&self) -> String {
            "hello".into()
        }
    }

    #[test]
    fn test_trait_object_lookup() {
        let services = Services::new().with::<dyn Greeter>(Arc::new(English));
        let greeter = services.get::<dyn Greeter>().unwrap();
        assert_eq!(greeter.greet(), "hello");
        assert!(services.get::<u32>().is_none());
    }

    #[test]
    fn test_insert_replaces_same_type() {
        let mut services = Services::new();
        services.insert(Arc::new(1u32));
        services.insert(Arc::new(2u32));
        assert_eq!(services.len(), 1);
        assert_eq!(*services.get::<u32>().unwrap(), 2);
    }
}
