//! Dependency injection container.
//!
//! The container maps string keys to resolution rules. A rule is a
//! [`Concrete`]: the name of a registered class, a factory closure, or a
//! literal value. Shared rules cache their first result.
//!
//! Classes are types implementing [`Injectable`]. Their constructor pulls
//! each dependency from a [`Resolver`], which looks at the extra parameters
//! passed to [`Container::make_with`] first, then at a declared default, and
//! finally resolves the dependency's own class through the container.
//!
//! # Example
//!
//! ```rust
//! use portico_core::di::{Container, ContainerError, Injectable, Resolver};
//! use std::sync::Arc;
//!
//! struct Database {
//!     dsn: String,
//! }
//!
//! impl Injectable for Database {
//!     const CLASS: &'static str = "database";
//!
//!     fn construct(resolver: &mut Resolver<'_>) -> Result<Self, ContainerError> {
//!         Ok(Self {
//!             dsn: resolver.value_or("dsn", "sqlite::memory:".to_string()),
//!         })
//!     }
//! }
//!
//! struct UserRepository {
//!     db: Arc<Database>,
//! }
//!
//! impl Injectable for UserRepository {
//!     const CLASS: &'static str = "users";
//!
//!     fn construct(resolver: &mut Resolver<'_>) -> Result<Self, ContainerError> {
//!         Ok(Self {
//!             db: resolver.dependency::<Database>("db")?,
//!         })
//!     }
//! }
//!
//! let container = Container::new();
//! container.register_class::<Database>();
//! container.register_class::<UserRepository>();
//! container.singleton(Database::CLASS, None);
//!
//! let first = container.resolve::<UserRepository>().unwrap();
//! let second = container.resolve::<UserRepository>().unwrap();
//! assert!(!Arc::ptr_eq(&first, &second));
//! assert!(Arc::ptr_eq(&first.db, &second.db));
//! assert_eq!(first.db.dsn, "sqlite::memory:");
//! ```

use parking_lot::RwLock;
use std::any::{type_name, Any};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// A resolved service, type-erased.
pub type Service = Arc<dyn Any + Send + Sync>;

/// A constructor registered for a class or used as a factory binding.
pub type Constructor =
    Arc<dyn Fn(&mut Resolver<'_>) -> Result<Service, ContainerError> + Send + Sync>;

/// Errors raised while resolving services.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ContainerError {
    /// Neither a binding nor a class exists for the key.
    #[error("No binding registered for '{key}' and no class of that name exists")]
    BindingNotFound {
        /// The key that was requested.
        key: String,
    },

    /// A constructor asked for a dependency that could not be supplied.
    #[error("Unable to resolve dependency '{parameter}' while building '{class}'")]
    DependencyUnresolved {
        /// The class being constructed.
        class: String,
        /// The dependency name.
        parameter: String,
    },

    /// The resolved service has a different type than requested.
    #[error("Service '{key}' is not a {expected}")]
    TypeMismatch {
        /// The key that was requested.
        key: String,
        /// The Rust type the caller expected.
        expected: &'static str,
    },

    /// A key was requested again while it was still being built.
    #[error("Circular dependency while resolving: {}", chain.join(" -> "))]
    CircularDependency {
        /// The resolution stack, ending with the repeated key.
        chain: Vec<String>,
    },

    /// A constructor failed for a reason of its own.
    #[error("Failed to construct '{class}': {message}")]
    Construction {
        /// The class being constructed.
        class: String,
        /// Why construction failed.
        message: String,
    },
}

impl ContainerError {
    /// Returns a short name for the variant.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::BindingNotFound { .. } => "BindingNotFound",
            Self::DependencyUnresolved { .. } => "DependencyUnresolved",
            Self::TypeMismatch { .. } => "TypeMismatch",
            Self::CircularDependency { .. } => "CircularDependency",
            Self::Construction { .. } => "ConstructionFailed",
        }
    }
}

/// A type the container knows how to build.
///
/// `CLASS` is the name the type is registered under; constructors name
/// their dependencies through the [`Resolver`].
pub trait Injectable: Sized + Send + Sync + 'static {
    /// The class name used as the container key.
    const CLASS: &'static str;

    /// Builds the value, pulling dependencies from the resolver.
    fn construct(resolver: &mut Resolver<'_>) -> Result<Self, ContainerError>;
}

/// How a binding produces its value.
#[derive(Clone)]
pub enum Concrete {
    /// Build the registered class with this name.
    Class(String),
    /// Call a factory.
    Factory(Constructor),
    /// Return this value as-is.
    Value(Service),
}

impl Concrete {
    /// A class concrete.
    pub fn class(name: impl Into<String>) -> Self {
        Self::Class(name.into())
    }

    /// A factory concrete returning `T`.
    pub fn factory<T, F>(factory: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&mut Resolver<'_>) -> Result<T, ContainerError> + Send + Sync + 'static,
    {
        Self::Factory(Arc::new(move |resolver| {
            Ok(Arc::new(factory(resolver)?) as Service)
        }))
    }

    /// A literal value concrete.
    pub fn value<T: Send + Sync + 'static>(value: T) -> Self {
        Self::Value(Arc::new(value))
    }
}

impl fmt::Debug for Concrete {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Class(name) => f.debug_tuple("Class").field(name).finish(),
            Self::Factory(_) => f.write_str("Factory(..)"),
            Self::Value(_) => f.write_str("Value(..)"),
        }
    }
}

#[derive(Clone, Debug)]
struct Binding {
    concrete: Concrete,
    shared: bool,
}

/// Named values passed to [`Container::make_with`].
///
/// Constructors see them through [`Resolver::parameter`] and friends before
/// any default or container lookup.
#[derive(Clone, Default)]
pub struct Parameters {
    values: HashMap<String, Service>,
}

impl Parameters {
    /// Creates an empty parameter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a value, builder style.
    pub fn with<T: Send + Sync + 'static>(mut self, name: impl Into<String>, value: T) -> Self {
        self.insert(name, value);
        self
    }

    /// Adds a value.
    pub fn insert<T: Send + Sync + 'static>(&mut self, name: impl Into<String>, value: T) {
        self.values.insert(name.into(), Arc::new(value));
    }

    /// Adds an already shared value.
    pub fn insert_shared(&mut self, name: impl Into<String>, value: Service) {
        self.values.insert(name.into(), value);
    }

    /// Gets a value by name if it has type `T`.
    #[must_use]
    pub fn get<T: Send + Sync + 'static>(&self, name: &str) -> Option<Arc<T>> {
        self.values
            .get(name)
            .and_then(|value| Arc::clone(value).downcast::<T>().ok())
    }

    /// Checks whether a value with this name exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Returns the number of values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if there are no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for Parameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.values.keys()).finish()
    }
}

/// Resolution context handed to constructors and factories.
pub struct Resolver<'a> {
    container: &'a Container,
    params: &'a Parameters,
    building: &'a str,
    stack: &'a mut Vec<String>,
}

impl<'a> Resolver<'a> {
    /// The container performing the resolution.
    #[must_use]
    pub fn container(&self) -> &'a Container {
        self.container
    }

    /// The key or class currently being built.
    #[must_use]
    pub fn building(&self) -> &str {
        self.building
    }

    /// The extra parameters of this resolution.
    #[must_use]
    pub fn parameters(&self) -> &Parameters {
        self.params
    }

    /// An extra parameter by name.
    #[must_use]
    pub fn parameter<T: Send + Sync + 'static>(&self, name: &str) -> Option<Arc<T>> {
        self.params.get::<T>(name)
    }

    /// An extra parameter by name, or the declared default.
    pub fn value_or<T: Clone + Send + Sync + 'static>(&self, name: &str, default: T) -> T {
        self.parameter::<T>(name)
            .map_or(default, |value| T::clone(&value))
    }

    /// An extra parameter that has no default.
    pub fn value<T: Clone + Send + Sync + 'static>(&self, name: &str) -> Result<T, ContainerError> {
        self.parameter::<T>(name)
            .map(|value| T::clone(&value))
            .ok_or_else(|| self.unresolved(name))
    }

    /// A class dependency: the extra parameter `name` if given, otherwise
    /// `T::CLASS` resolved through the container.
    pub fn dependency<T: Injectable>(&mut self, name: &str) -> Result<Arc<T>, ContainerError> {
        self.dependency_as::<T>(name, T::CLASS)
    }

    /// A dependency stored under an arbitrary key, for instances and trait
    /// objects that are not [`Injectable`].
    pub fn dependency_as<T: Send + Sync + 'static>(
        &mut self,
        name: &str,
        key: &str,
    ) -> Result<Arc<T>, ContainerError> {
        if let Some(value) = self.parameter::<T>(name) {
            return Ok(value);
        }
        let service = self
            .container
            .build(key, &Parameters::default(), self.stack)
            .map_err(|err| match err {
                ContainerError::BindingNotFound { key: missing } if missing == key => {
                    self.unresolved(name)
                }
                other => other,
            })?;
        downcast::<T>(key, service)
    }

    /// Like [`Resolver::dependency_as`], but `None` when nothing is
    /// registered under `key`.
    pub fn optional<T: Send + Sync + 'static>(
        &mut self,
        name: &str,
        key: &str,
    ) -> Result<Option<Arc<T>>, ContainerError> {
        if self.params.contains(name) || self.container.has(key) || self.container.has_class(key)
        {
            self.dependency_as::<T>(name, key).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Builds an error for a constructor that failed on its own terms.
    #[must_use]
    pub fn construction_failed(&self, message: impl Into<String>) -> ContainerError {
        ContainerError::Construction {
            class: self.building.to_string(),
            message: message.into(),
        }
    }

    fn unresolved(&self, name: &str) -> ContainerError {
        ContainerError::DependencyUnresolved {
            class: self.building.to_string(),
            parameter: name.to_string(),
        }
    }
}

/// A dependency injection container.
///
/// All methods take `&self`; the container is shared as `Arc<Container>`
/// through the middleware chain and the terminal target.
#[derive(Default)]
pub struct Container {
    bindings: RwLock<HashMap<String, Binding>>,
    instances: RwLock<HashMap<String, Service>>,
    classes: RwLock<HashMap<String, Constructor>>,
}

impl Container {
    /// Creates a new empty container.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a resolution rule. `None` makes the key resolve to the
    /// class of the same name. Replaces any earlier rule or cached instance.
    pub fn bind(&self, key: impl Into<String>, concrete: Option<Concrete>, shared: bool) {
        let key = key.into();
        let concrete = concrete.unwrap_or_else(|| Concrete::Class(key.clone()));
        self.instances.write().remove(&key);
        self.bindings
            .write()
            .insert(key, Binding { concrete, shared });
    }

    /// Registers a shared rule.
    pub fn singleton(&self, key: impl Into<String>, concrete: Option<Concrete>) {
        self.bind(key, concrete, true);
    }

    /// Registers a constructed value, returned verbatim by every `make`.
    pub fn instance<T: Send + Sync + 'static>(&self, key: impl Into<String>, value: Arc<T>) {
        self.instances.write().insert(key.into(), value);
    }

    /// Registers an [`Injectable`] type under its class name.
    pub fn register_class<T: Injectable>(&self) {
        self.register_class_with(T::CLASS, |resolver| {
            Ok(Arc::new(T::construct(resolver)?) as Service)
        });
    }

    /// Registers a class under `name` with a custom constructor.
    pub fn register_class_with<F>(&self, name: impl Into<String>, constructor: F)
    where
        F: Fn(&mut Resolver<'_>) -> Result<Service, ContainerError> + Send + Sync + 'static,
    {
        self.classes.write().insert(name.into(), Arc::new(constructor));
    }

    /// Resolves `key`.
    pub fn make(&self, key: &str) -> Result<Service, ContainerError> {
        self.make_with(key, &Parameters::default())
    }

    /// Resolves `key` with extra named parameters.
    pub fn make_with(&self, key: &str, params: &Parameters) -> Result<Service, ContainerError> {
        let mut stack = Vec::new();
        self.build(key, params, &mut stack)
    }

    /// Resolves `key` and downcasts it.
    pub fn make_as<T: Send + Sync + 'static>(&self, key: &str) -> Result<Arc<T>, ContainerError> {
        downcast::<T>(key, self.make(key)?)
    }

    /// Resolves `key` with parameters and downcasts it.
    pub fn make_as_with<T: Send + Sync + 'static>(
        &self,
        key: &str,
        params: &Parameters,
    ) -> Result<Arc<T>, ContainerError> {
        downcast::<T>(key, self.make_with(key, params)?)
    }

    /// Resolves an [`Injectable`] type by its class name.
    pub fn resolve<T: Injectable>(&self) -> Result<Arc<T>, ContainerError> {
        self.make_as::<T>(T::CLASS)
    }

    /// Checks whether a binding or instance exists for `key`.
    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        self.bindings.read().contains_key(key) || self.instances.read().contains_key(key)
    }

    /// Checks whether a class is registered under `name`.
    #[must_use]
    pub fn has_class(&self, name: &str) -> bool {
        self.classes.read().contains_key(name)
    }

    fn build(
        &self,
        key: &str,
        params: &Parameters,
        stack: &mut Vec<String>,
    ) -> Result<Service, ContainerError> {
        if let Some(instance) = self.instances.read().get(key) {
            return Ok(Arc::clone(instance));
        }

        if stack.iter().any(|entry| entry == key) {
            let mut chain = stack.clone();
            chain.push(key.to_string());
            return Err(ContainerError::CircularDependency { chain });
        }

        let binding = self.bindings.read().get(key).cloned();
        let (concrete, shared) = match binding {
            Some(Binding { concrete, shared }) => (concrete, shared),
            None => (Concrete::Class(key.to_string()), false),
        };

        stack.push(key.to_string());
        let built = self.build_concrete(key, concrete, params, stack);
        stack.pop();
        let object = built?;

        if shared {
            let mut instances = self.instances.write();
            let cached = instances
                .entry(key.to_string())
                .or_insert_with(|| Arc::clone(&object));
            return Ok(Arc::clone(cached));
        }

        Ok(object)
    }

    fn build_concrete(
        &self,
        key: &str,
        concrete: Concrete,
        params: &Parameters,
        stack: &mut Vec<String>,
    ) -> Result<Service, ContainerError> {
        match concrete {
            Concrete::Value(value) => Ok(value),
            Concrete::Factory(factory) => {
                let mut resolver = Resolver {
                    container: self,
                    params,
                    building: key,
                    stack,
                };
                factory(&mut resolver)
            }
            Concrete::Class(class) => {
                let constructor = self
                    .classes
                    .read()
                    .get(&class)
                    .cloned()
                    .ok_or_else(|| ContainerError::BindingNotFound { key: class.clone() })?;
                tracing::trace!(key, class = %class, "building class");
                let mut resolver = Resolver {
                    container: self,
                    params,
                    building: &class,
                    stack,
                };
                constructor(&mut resolver)
            }
        }
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("bindings", &self.bindings.read().len())
            .field("instances", &self.instances.read().len())
            .field("classes", &self.classes.read().len())
            .finish()
    }
}

fn downcast<T: Send + Sync + 'static>(key: &str, service: Service) -> Result<Arc<T>, ContainerError> {
    service
        .downcast::<T>()
        .map_err(|_| ContainerError::TypeMismatch {
            key: key.to_string(),
            expected: type_name::<T>(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Clock;

    impl Injectable for Clock {
        const CLASS: &'static str = "clock";

        fn construct(_: &mut Resolver<'_>) -> Result<Self, ContainerError> {
            Ok(Self)
        }
    }

    struct Mailer {
        clock: Arc<Clock>,
        sender: String,
    }

    impl Injectable for Mailer {
        const CLASS: &'static str = "mailer";

        fn construct(resolver: &mut Resolver<'_>) -> Result<Self, ContainerError> {
            Ok(Self {
                clock: resolver.dependency::<Clock>("clock")?,
                sender: resolver.value_or("sender", "noreply@example.com".to_string()),
            })
        }
    }

    struct Greeter {
        greeting: String,
    }

    impl Injectable for Greeter {
        const CLASS: &'static str = "greeter";

        fn construct(resolver: &mut Resolver<'_>) -> Result<Self, ContainerError> {
            Ok(Self {
                greeting: resolver.value("greeting")?,
            })
        }
    }

    struct Chicken;
    struct Egg;

    impl Injectable for Chicken {
        const CLASS: &'static str = "chicken";

        fn construct(resolver: &mut Resolver<'_>) -> Result<Self, ContainerError> {
            resolver.dependency::<Egg>("egg")?;
            Ok(Self)
        }
    }

    impl Injectable for Egg {
        const CLASS: &'static str = "egg";

        fn construct(resolver: &mut Resolver<'_>) -> Result<Self, ContainerError> {
            resolver.dependency::<Chicken>("chicken")?;
            Ok(Self)
        }
    }

    fn container() -> Container {
        let container = Container::new();
        container.register_class::<Clock>();
        container.register_class::<Mailer>();
        container
    }

    #[test]
    fn test_singleton_returns_same_instance() {
        let container = container();
        container.singleton(Clock::CLASS, None);

        let a = container.resolve::<Clock>().unwrap();
        let b = container.resolve::<Clock>().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_non_shared_binding_builds_each_time() {
        let container = container();
        container.bind(Clock::CLASS, None, false);

        let a = container.resolve::<Clock>().unwrap();
        let b = container.resolve::<Clock>().unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_dependency_on_singleton_is_shared() {
        let container = container();
        container.singleton(Clock::CLASS, None);

        let first = container.resolve::<Mailer>().unwrap();
        let second = container.resolve::<Mailer>().unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(&first.clock, &second.clock));
    }

    #[test]
    fn test_unbound_class_is_built_without_binding() {
        let container = container();
        assert!(!container.has(Mailer::CLASS));
        let mailer = container.resolve::<Mailer>().unwrap();
        assert_eq!(mailer.sender, "noreply@example.com");
    }

    #[test]
    fn test_unknown_key_is_binding_not_found() {
        let container = container();
        let err = container.make("App\\Missing").unwrap_err();
        assert_eq!(
            err,
            ContainerError::BindingNotFound {
                key: "App\\Missing".to_string()
            }
        );
    }

    #[test]
    fn test_extra_params_win_over_defaults() {
        let container = container();
        let params = Parameters::new().with("sender", "ops@example.com".to_string());
        let mailer = container
            .make_as_with::<Mailer>(Mailer::CLASS, &params)
            .unwrap();
        assert_eq!(mailer.sender, "ops@example.com");
    }

    #[test]
    fn test_extra_params_can_supply_dependency() {
        let container = container();
        let clock = Arc::new(Clock);
        let mut params = Parameters::new();
        params.insert_shared("clock", Arc::clone(&clock) as Service);

        let mailer = container
            .make_as_with::<Mailer>(Mailer::CLASS, &params)
            .unwrap();
        assert!(Arc::ptr_eq(&mailer.clock, &clock));
    }

    #[test]
    fn test_missing_value_is_dependency_unresolved() {
        let container = Container::new();
        container.register_class::<Greeter>();
        let err = container.resolve::<Greeter>().err().unwrap();
        assert_eq!(
            err,
            ContainerError::DependencyUnresolved {
                class: "greeter".to_string(),
                parameter: "greeting".to_string(),
            }
        );
    }

    #[test]
    fn test_missing_class_dependency_is_dependency_unresolved() {
        let container = Container::new();
        container.register_class::<Mailer>();
        let err = container.resolve::<Mailer>().err().unwrap();
        assert_eq!(err.kind(), "DependencyUnresolved");
    }

    #[test]
    fn test_instance_is_returned_verbatim() {
        let container = Container::new();
        let config = Arc::new(String::from("debug"));
        container.instance("config", Arc::clone(&config));

        let resolved = container.make_as::<String>("config").unwrap();
        assert!(Arc::ptr_eq(&resolved, &config));
        assert!(container.has("config"));
    }

    #[test]
    fn test_factory_binding_receives_resolver() {
        let container = container();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        container.bind(
            "sender",
            Some(Concrete::factory(move |resolver| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(resolver.value_or("domain", "example.com".to_string()))
            })),
            false,
        );

        let params = Parameters::new().with("domain", "portico.dev".to_string());
        let value = container.make_as_with::<String>("sender", &params).unwrap();
        assert_eq!(value.as_str(), "portico.dev");
        container.make("sender").unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_literal_value_concrete() {
        let container = Container::new();
        container.bind("answer", Some(Concrete::value(42_u32)), false);
        assert_eq!(*container.make_as::<u32>("answer").unwrap(), 42);
    }

    #[test]
    fn test_class_concrete_under_other_key() {
        let container = container();
        container.singleton("time", Some(Concrete::class(Clock::CLASS)));
        let a = container.make_as::<Clock>("time").unwrap();
        let b = container.make_as::<Clock>("time").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_type_mismatch() {
        let container = container();
        let err = container.make_as::<String>(Clock::CLASS).unwrap_err();
        assert_eq!(err.kind(), "TypeMismatch");
    }

    #[test]
    fn test_rebinding_replaces_cached_instance() {
        let container = Container::new();
        container.instance("name", Arc::new(String::from("old")));
        container.bind("name", Some(Concrete::value(String::from("new"))), false);
        assert_eq!(container.make_as::<String>("name").unwrap().as_str(), "new");
    }

    #[test]
    fn test_circular_dependency_is_reported() {
        let container = Container::new();
        container.register_class::<Chicken>();
        container.register_class::<Egg>();

        let err = container.resolve::<Chicken>().err().unwrap();
        assert_eq!(
            err,
            ContainerError::CircularDependency {
                chain: vec!["chicken".into(), "egg".into(), "chicken".into()],
            }
        );
    }

    #[test]
    fn test_has_reports_bindings_and_instances_only() {
        let container = container();
        assert!(!container.has(Clock::CLASS));
        assert!(container.has_class(Clock::CLASS));
        container.bind(Clock::CLASS, None, false);
        assert!(container.has(Clock::CLASS));
    }

    #[test]
    fn test_optional_dependency() {
        let container = Container::new();
        container.register_class_with("probe", |resolver| {
            let clock = resolver.optional::<Clock>("clock", Clock::CLASS)?;
            Ok(Arc::new(clock.is_some()) as Service)
        });
        assert!(!*container.make_as::<bool>("probe").unwrap());

        container.register_class::<Clock>();
        assert!(*container.make_as::<bool>("probe").unwrap());
    }
}
