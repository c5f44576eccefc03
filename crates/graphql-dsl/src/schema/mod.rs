//! Schema declaration, assembly and the frozen result.

mod arguments;
mod builder;
mod declarations;
mod description;
mod fields;
mod graph;
mod spec;

pub use arguments::{ArgumentRole, ArgumentSpec};
pub use declarations::{
    EnumConstants, EnumSpec, IdCoercer, IdFormatter, IdSpec, InputFieldSpec, InputSpec,
    OperationSpec, OutputKind, ScalarSpec, TypeSpec,
};
pub use description::trim_indent;
pub use fields::{FieldOrigin, FieldSpec, Invocation, Resolver, is_structural};
pub use graph::{
    EnumType, FieldDef, InputObjectType, InputValueDef, NamedType, ObjectType, SchemaGraph,
};
pub use spec::{SchemaSpec, TypeBuilder};
