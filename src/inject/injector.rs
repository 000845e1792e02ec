//! Type-keyed value store with parent delegation.

use dashmap::DashMap;
use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use crate::dispatch::ReturnValues;
use crate::error::{Fault, InjectError};
use crate::inject::handler::IntoHandler;

/// A mapped value together with the name of the type it was mapped as.
struct Entry {
    type_name: &'static str,
    /// Always an `Arc<T>` where `T` is the type behind the key.
    value: Box<dyn Any + Send + Sync>,
}

/// Maps values to types and invokes handlers against those mappings.
///
/// Values are stored as `Arc<T>` keyed by `TypeId::of::<T>()`. Because `T`
/// may be unsized, a concrete value can be mapped under a trait object type
/// with [`Injector::map_to`] and then resolved wherever that capability is
/// requested.
pub struct Injector {
    values: DashMap<TypeId, Entry>,
    parent: Option<Arc<Injector>>,
}

impl Injector {
    /// Create an empty container with no parent.
    pub fn new() -> Self {
        Self {
            values: DashMap::new(),
            parent: None,
        }
    }

    /// Create an empty container that reads through to `parent` on a miss.
    pub fn child_of(parent: Arc<Injector>) -> Self {
        Self {
            values: DashMap::new(),
            parent: Some(parent),
        }
    }

    /// Set the container lookups fall back to.
    pub fn set_parent(&mut self, parent: Arc<Injector>) {
        self.parent = Some(parent);
    }

    /// The parent container, if any.
    pub fn parent(&self) -> Option<&Arc<Injector>> {
        self.parent.as_ref()
    }

    /// Map `value` under its concrete type, replacing any earlier mapping in
    /// this container.
    pub fn map<T: Send + Sync + 'static>(&self, value: T) {
        self.map_to::<T>(Arc::new(value));
    }

    /// Map `value` under the explicitly named type `I`.
    ///
    /// `I` is usually a trait object, for example
    /// `injector.map_to::<dyn ResponseWriter>(Arc::new(writer))`.
    pub fn map_to<I: ?Sized + Send + Sync + 'static>(&self, value: Arc<I>) {
        let type_name = std::any::type_name::<I>();
        let previous = self.values.insert(
            TypeId::of::<I>(),
            Entry {
                type_name,
                value: Box::new(value),
            },
        );
        if previous.is_some() {
            tracing::trace!(type_name, "Replaced mapping");
        }
    }

    /// Resolve `T` from this container, then from its ancestors.
    pub fn get<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<T>, InjectError> {
        if let Some(found) = self.get_local::<T>() {
            return Ok(found);
        }
        match &self.parent {
            Some(parent) => parent.get::<T>(),
            None => Err(InjectError::unresolved::<T>()),
        }
    }

    fn get_local<T: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.values
            .get(&TypeId::of::<T>())
            .and_then(|entry| entry.value.downcast_ref::<Arc<T>>().map(Arc::clone))
    }

    /// Whether `T` resolves anywhere in the ancestor chain.
    pub fn contains<T: ?Sized + 'static>(&self) -> bool {
        self.values.contains_key(&TypeId::of::<T>())
            || self.parent.as_ref().is_some_and(|p| p.contains::<T>())
    }

    /// Number of mappings held directly by this container.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if this container holds no mappings of its own.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Resolve every parameter of `handler` and call it.
    ///
    /// If any parameter cannot be resolved the handler body is never run and
    /// the resolution error is returned. Return values are passed back as-is.
    pub fn invoke<Args, H>(&self, handler: H) -> Result<ReturnValues, Fault>
    where
        H: IntoHandler<Args>,
    {
        handler.into_handler().call(self)
    }
}

impl Default for Injector {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Injector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&'static str> = self.values.iter().map(|e| e.type_name).collect();
        names.sort_unstable();
        f.debug_struct("Injector")
            .field("values", &names)
            .field("has_parent", &self.parent.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    trait Greeter: Send + Sync {
        fn greet(&self) -> String;
    }

    struct English;

    impl Greeter for English {
        fn greet(&self) -> String {
            "hello".to_string()
        }
    }

    #[derive(Debug, PartialEq)]
    struct Port(u16);

    #[test]
    fn test_map_and_get() {
        let injector = Injector::new();
        injector.map(Port(3000));

        assert_eq!(*injector.get::<Port>().unwrap(), Port(3000));
        assert!(injector.contains::<Port>());
        assert_eq!(injector.len(), 1);
    }

    #[test]
    fn test_map_overwrites() {
        let injector = Injector::new();
        injector.map(Port(1));
        injector.map(Port(2));

        assert_eq!(*injector.get::<Port>().unwrap(), Port(2));
        assert_eq!(injector.len(), 1);
    }

    #[test]
    fn test_map_to_trait_object() {
        let injector = Injector::new();
        injector.map_to::<dyn Greeter>(Arc::new(English));

        let greeter = injector.get::<dyn Greeter>().unwrap();
        assert_eq!(greeter.greet(), "hello");
        // Only the capability is mapped, not the concrete type.
        assert!(injector.get::<English>().is_err());
    }

    #[test]
    fn test_missing_is_unresolved() {
        let injector = Injector::new();
        let err = injector.get::<Port>().unwrap_err();
        assert_eq!(err, InjectError::unresolved::<Port>());
    }

    #[test]
    fn test_child_reads_through_to_parent() {
        let parent = Arc::new(Injector::new());
        parent.map(Port(80));

        let child = Injector::child_of(Arc::clone(&parent));
        assert_eq!(*child.get::<Port>().unwrap(), Port(80));
        assert!(child.is_empty());
    }

    #[test]
    fn test_child_shadows_without_touching_parent() {
        let parent = Arc::new(Injector::new());
        parent.map(Port(80));

        let child = Injector::child_of(Arc::clone(&parent));
        child.map(Port(8080));

        assert_eq!(*child.get::<Port>().unwrap(), Port(8080));
        assert_eq!(*parent.get::<Port>().unwrap(), Port(80));
    }

    #[test]
    fn test_set_parent() {
        let parent = Arc::new(Injector::new());
        parent.map(Port(1));

        let mut child = Injector::new();
        assert!(child.get::<Port>().is_err());

        child.set_parent(parent);
        assert_eq!(*child.get::<Port>().unwrap(), Port(1));
    }

    #[test]
    fn test_invoke_resolves_parameters() {
        let injector = Injector::new();
        injector.map(Port(3000));
        injector.map_to::<dyn Greeter>(Arc::new(English));

        let values = injector
            .invoke(|port: Arc<Port>, greeter: Arc<dyn Greeter>| {
                format!("{} on {}", greeter.greet(), port.0)
            })
            .unwrap();

        assert_eq!(values.len(), 1);
    }

    #[test]
    fn test_invoke_unresolved_skips_body() {
        let injector = Injector::new();
        let ran = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&ran);

        let result = injector.invoke(move |_port: Arc<Port>| {
            flag.store(true, Ordering::SeqCst);
        });

        assert!(matches!(
            result,
            Err(Fault::Inject(InjectError::Unresolved { .. }))
        ));
        assert!(!ran.load(Ordering::SeqCst));
    }
}
