//! Host classes and values.
//!
//! Everything the schema builder needs to know about user types: how they are
//! described, introspected, converted to and from resolver values, and how
//! their members are invoked.

mod asynchronous;
mod convert;
mod introspect;
mod method;
mod registry;
mod value;

pub use asynchronous::{Completer, Deferred, Flow, Promise, Publisher};
pub use convert::{Describe, HostClass, Input, Output};
pub use introspect::{
    ClassKind, ConstructorFn, ConstructorInfo, FunctionInfo, Getter, Invoker, ParameterInfo,
    PropertyInfo, TypeIntrospector,
};
pub use method::{Blocking, Construct, Method, Signature, Suspending};
pub use registry::{ClassBuilder, ClassRegistry};
pub use value::{Handle, HostObject, HostType, HostValue, MapEntry, ResolveFuture, ResolveStream};
