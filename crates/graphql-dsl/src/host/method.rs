//! Variadic invocation of registered closures.
//!
//! Members are registered as plain closures over a receiver. [`Method`] and
//! [`Construct`] are implemented for every closure arity up to eight, so the
//! registry can report a closure's parameter and return descriptors and call
//! it with positional [`HostValue`] arguments.

use std::future::Future;

use super::convert::{Describe, Input, Output};
use super::value::HostValue;
use crate::error::ResolveError;
use crate::types::TypeDescriptor;

/// Marker for closures returning their value directly.
pub enum Blocking {}

/// Marker for closures returning a future.
pub enum Suspending {}

/// Parameter and return descriptors of a closure.
#[derive(Debug, Clone)]
pub struct Signature {
    pub params: Vec<TypeDescriptor>,
    pub output: TypeDescriptor,
    pub is_async: bool,
}

/// A closure callable on a receiver of type `R`.
///
/// `Args` is the tuple of parameter types and `Kind` is [`Blocking`] or
/// [`Suspending`]; both are inferred from the closure.
pub trait Method<R, Args, Kind>: Send + Sync + 'static {
    fn signature() -> Signature;

    /// # Errors
    ///
    /// Returns an error when an argument can't be converted to its parameter type.
    fn invoke(&self, receiver: &R, args: Vec<HostValue>) -> Result<HostValue, ResolveError>;
}

/// A closure building an instance of `T` from its parameters.
pub trait Construct<T, Args>: Send + Sync + 'static {
    fn params() -> Vec<TypeDescriptor>;

    /// # Errors
    ///
    /// Returns an error when an argument can't be converted to its parameter type.
    fn construct(&self, args: Vec<HostValue>) -> Result<HostValue, ResolveError>;
}

fn next_argument(args: &mut std::vec::IntoIter<HostValue>) -> HostValue {
    args.next().unwrap_or(HostValue::Null)
}

macro_rules! impl_method {
    ($($arg:ident),*) => {
        #[allow(non_snake_case, unused_mut, unused_variables)]
        impl<F, R, O, $($arg,)*> Method<R, ($($arg,)*), Blocking> for F
        where
            F: Fn(&R $(, $arg)*) -> O + Send + Sync + 'static,
            R: 'static,
            O: Output,
            $($arg: Input,)*
        {
            fn signature() -> Signature {
                Signature {
                    params: vec![$(<$arg as Describe>::descriptor()),*],
                    output: O::descriptor(),
                    is_async: false,
                }
            }

            fn invoke(&self, receiver: &R, args: Vec<HostValue>) -> Result<HostValue, ResolveError> {
                let mut args = args.into_iter();
                $(let $arg = <$arg as Input>::from_host(next_argument(&mut args))?;)*
                Ok(self(receiver $(, $arg)*).into_host())
            }
        }

        #[allow(non_snake_case, unused_mut, unused_variables)]
        impl<F, R, Fut, O, $($arg,)*> Method<R, ($($arg,)*), Suspending> for F
        where
            F: Fn(&R $(, $arg)*) -> Fut + Send + Sync + 'static,
            R: 'static,
            Fut: Future<Output = O> + Send + 'static,
            O: Output,
            $($arg: Input,)*
        {
            fn signature() -> Signature {
                Signature {
                    params: vec![$(<$arg as Describe>::descriptor()),*],
                    output: O::descriptor(),
                    is_async: true,
                }
            }

            fn invoke(&self, receiver: &R, args: Vec<HostValue>) -> Result<HostValue, ResolveError> {
                let mut args = args.into_iter();
                $(let $arg = <$arg as Input>::from_host(next_argument(&mut args))?;)*
                let future = self(receiver $(, $arg)*);
                Ok(HostValue::deferred(async move { Ok(future.await.into_host()) }))
            }
        }

        #[allow(non_snake_case, unused_mut, unused_variables)]
        impl<F, T, $($arg,)*> Construct<T, ($($arg,)*)> for F
        where
            F: Fn($($arg),*) -> T + Send + Sync + 'static,
            T: Output,
            $($arg: Input,)*
        {
            fn params() -> Vec<TypeDescriptor> {
                vec![$(<$arg as Describe>::descriptor()),*]
            }

            fn construct(&self, args: Vec<HostValue>) -> Result<HostValue, ResolveError> {
                let mut args = args.into_iter();
                $(let $arg = <$arg as Input>::from_host(next_argument(&mut args))?;)*
                Ok(self($($arg),*).into_host())
            }
        }
    };
}

impl_method!();
impl_method!(A1);
impl_method!(A1, A2);
impl_method!(A1, A2, A3);
impl_method!(A1, A2, A3, A4);
impl_method!(A1, A2, A3, A4, A5);
impl_method!(A1, A2, A3, A4, A5, A6);
impl_method!(A1, A2, A3, A4, A5, A6, A7);
impl_method!(A1, A2, A3, A4, A5, A6, A7, A8);
