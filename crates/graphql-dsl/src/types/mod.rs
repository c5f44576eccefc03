//! Type descriptors, type nodes and the resolution between them.

mod descriptor;
mod node;
mod resolver;
pub mod scalars;

pub use descriptor::{Classifier, TypeDescriptor};
pub use node::{TypeNode, is_valid_name, validate_name};
pub use resolver::{MapEntryType, Polarity, TypeKind, TypeResolver};
pub use scalars::{Coercing, ScalarCoercion, builtin_scalar};
