//! Handlers and the parameters they can ask for.
//!
//! A handler is any `Fn` whose parameters all implement [`Inject`] and whose
//! result implements [`IntoReturnValues`]. Conversion to [`Handler`] happens
//! once, when the handler is registered; at that point the parameter types are
//! recorded and a resolver for each of them is fixed by the type system.

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::dispatch::{IntoReturnValues, ReturnValues};
use crate::error::{ConfigurationError, Fault, InjectError};
use crate::inject::Injector;

/// A value that can be produced from a container for a handler parameter.
pub trait Inject: Sized {
    fn inject(injector: &Injector) -> Result<Self, InjectError>;
}

/// Any mapped service, resolved by the type it was mapped under.
impl<T: ?Sized + Send + Sync + 'static> Inject for Arc<T> {
    fn inject(injector: &Injector) -> Result<Self, InjectError> {
        injector.get::<T>()
    }
}

/// Optional dependency: resolution failure yields `None`.
impl<T: Inject> Inject for Option<T> {
    fn inject(injector: &Injector) -> Result<Self, InjectError> {
        Ok(T::inject(injector).ok())
    }
}

trait Callable: Send + Sync {
    fn call(&self, injector: &Injector) -> Result<ReturnValues, Fault>;
}

/// A registered, type-erased handler.
#[derive(Clone)]
pub struct Handler {
    callable: Arc<dyn Callable>,
    name: &'static str,
    params: Arc<[&'static str]>,
}

impl Handler {
    fn from_callable(
        callable: impl Callable + 'static,
        name: &'static str,
        params: Vec<&'static str>,
    ) -> Self {
        Self {
            callable: Arc::new(callable),
            name,
            params: params.into(),
        }
    }

    /// Accept a dynamically typed value as a handler.
    ///
    /// Only a value that already is a [`Handler`] is callable; anything else
    /// is rejected here, at registration.
    pub fn try_from_value<V: Any + Send + Sync>(value: V) -> Result<Self, ConfigurationError> {
        let boxed: Box<dyn Any + Send + Sync> = Box::new(value);
        boxed
            .downcast::<Handler>()
            .map(|handler| *handler)
            .map_err(|_| ConfigurationError::NotCallable {
                type_name: std::any::type_name::<V>().to_string(),
            })
    }

    /// Resolve this handler's parameters from `injector` and call it.
    pub fn call(&self, injector: &Injector) -> Result<ReturnValues, Fault> {
        self.callable.call(injector)
    }

    /// Type name of the underlying callable.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Type names of the declared parameters, in order.
    pub fn params(&self) -> &[&'static str] {
        &self.params
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish()
    }
}

/// Conversion of a callable into a [`Handler`].
///
/// `Args` is the tuple of parameter types and only exists to keep the impls
/// for different arities apart.
pub trait IntoHandler<Args>: Send + Sync + 'static {
    fn into_handler(self) -> Handler;
}

/// Marker for handlers that are already erased.
pub enum Prebuilt {}

impl IntoHandler<Prebuilt> for Handler {
    fn into_handler(self) -> Handler {
        self
    }
}

/// Convert a callable into a [`Handler`], e.g. to build a list for
/// `Application::handlers`.
pub fn handler<Args, H: IntoHandler<Args>>(h: H) -> Handler {
    h.into_handler()
}

struct FnHandler<F, Args> {
    f: F,
    _args: PhantomData<fn() -> Args>,
}

macro_rules! impl_handler {
    ($($ty:ident),*) => {
        impl<F, R, $($ty,)*> Callable for FnHandler<F, ($($ty,)*)>
        where
            F: Fn($($ty),*) -> R + Send + Sync + 'static,
            R: IntoReturnValues,
            $($ty: Inject + 'static,)*
        {
            #[allow(non_snake_case, unused_variables)]
            fn call(&self, injector: &Injector) -> Result<ReturnValues, Fault> {
                $(let $ty = <$ty as Inject>::inject(injector)?;)*
                (self.f)($($ty),*).into_return_values()
            }
        }

        impl<F, R, $($ty,)*> IntoHandler<($($ty,)*)> for F
        where
            F: Fn($($ty),*) -> R + Send + Sync + 'static,
            R: IntoReturnValues,
            $($ty: Inject + 'static,)*
        {
            fn into_handler(self) -> Handler {
                Handler::from_callable(
                    FnHandler::<F, ($($ty,)*)> { f: self, _args: PhantomData },
                    std::any::type_name::<F>(),
                    vec![$(std::any::type_name::<$ty>()),*],
                )
            }
        }
    };
}

impl_handler!();
impl_handler!(T1);
impl_handler!(T1, T2);
impl_handler!(T1, T2, T3);
impl_handler!(T1, T2, T3, T4);
impl_handler!(T1, T2, T3, T4, T5);
impl_handler!(T1, T2, T3, T4, T5, T6);
impl_handler!(T1, T2, T3, T4, T5, T6, T7);
impl_handler!(T1, T2, T3, T4, T5, T6, T7, T8);
