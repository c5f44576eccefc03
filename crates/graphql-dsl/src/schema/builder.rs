//! Multi-pass schema assembly.
//!
//! Names are registered before bodies are built, so declarations may refer to
//! each other in any order. Any error aborts the whole build.

use std::collections::HashMap;
use std::sync::Arc;

use async_graphql::dynamic::{
    Enum, EnumItem, InputObject, Interface, InterfaceField, Object, Scalar, Schema, Subscription,
};
use indexmap::IndexMap;
use tracing::{debug, trace};

use super::declarations::{OperationSpec, OutputKind, TypeSpec};
use super::fields::{FieldSpec, Resolver};
use super::graph::{
    EnumType, FieldDef, InputObjectType, InputValueDef, NamedType, ObjectType, SchemaGraph,
};
use super::spec::{QUERY, SchemaSpec, SpecContext};
use crate::error::SchemaError;
use crate::host::HostObject;
use crate::resolvers::output::OutputCatalog;
use crate::resolvers::wiring::{Binding, entry_resolver, input_value, object_field, subscription_field};
use crate::types::{Polarity, TypeKind, TypeResolver};

pub(crate) struct SchemaAssembler {
    spec: SchemaSpec,
    resolver: TypeResolver,
    types: IndexMap<String, NamedType>,
    resolvers: IndexMap<(String, String), Resolver>,
    receivers: HashMap<String, HostObject>,
}

impl SchemaAssembler {
    pub(crate) fn new(spec: SchemaSpec) -> Self {
        Self {
            spec,
            resolver: TypeResolver::new(),
            types: IndexMap::new(),
            resolvers: IndexMap::new(),
            receivers: HashMap::new(),
        }
    }

    pub(crate) fn assemble(mut self) -> Result<SchemaGraph, SchemaError> {
        self.register_leaves()?;
        self.declare_inputs()?;
        self.build_inputs()?;
        self.declare_outputs()?;
        self.build_outputs(OutputKind::Interface)?;
        self.build_outputs(OutputKind::Object)?;
        self.build_roots()?;
        self.freeze()
    }

    /// Pass 1: scalars, enums and ID types.
    fn register_leaves(&mut self) -> Result<(), SchemaError> {
        for scalar in &self.spec.scalars {
            self.resolver
                .register_scalar(scalar.coercion.class(), &scalar.name)?;
            self.types.insert(
                scalar.name.clone(),
                NamedType::Scalar {
                    name: scalar.name.clone(),
                    description: scalar.description.clone(),
                },
            );
        }
        for spec in &self.spec.enums {
            self.resolver.register_enum(spec.class, &spec.name)?;
            self.types.insert(
                spec.name.clone(),
                NamedType::Enum(EnumType {
                    name: spec.name.clone(),
                    description: spec.description.clone(),
                    values: spec.constants.names().map(str::to_owned).collect(),
                }),
            );
        }
        for class in self.spec.context.ids.keys() {
            self.resolver.register_id(*class);
        }
        debug!(
            scalars = self.spec.scalars.len(),
            enums = self.spec.enums.len(),
            ids = self.spec.context.ids.len(),
            "Registered leaf types"
        );
        Ok(())
    }

    /// Pass 2: input object names.
    fn declare_inputs(&mut self) -> Result<(), SchemaError> {
        for input in &self.spec.inputs {
            self.resolver.declare_input(input.class, &input.name)?;
        }
        debug!(inputs = self.spec.inputs.len(), "Declared input objects");
        Ok(())
    }

    /// Pass 3: input object bodies.
    fn build_inputs(&mut self) -> Result<(), SchemaError> {
        for input in &self.spec.inputs {
            let mut fields = Vec::with_capacity(input.fields.len());
            for field in &input.fields {
                fields.push(InputValueDef {
                    name: field.name.clone(),
                    description: field.description.clone(),
                    ty: self.resolver.resolve(&field.ty, Polarity::Input)?,
                });
            }
            self.resolver.mark_built(&input.name);
            self.types.insert(
                input.name.clone(),
                NamedType::Input(InputObjectType {
                    name: input.name.clone(),
                    description: input.description.clone(),
                    fields,
                }),
            );
        }
        debug!(inputs = self.spec.inputs.len(), "Built input objects");
        Ok(())
    }

    /// Pass 4: interface and object type names.
    fn declare_outputs(&mut self) -> Result<(), SchemaError> {
        for spec in &self.spec.interfaces {
            self.resolver
                .declare_output(spec.class, &spec.name, TypeKind::Interface)?;
        }
        for spec in &self.spec.objects {
            self.resolver
                .declare_output(spec.class, &spec.name, TypeKind::Object)?;
        }
        debug!(
            interfaces = self.spec.interfaces.len(),
            objects = self.spec.objects.len(),
            "Declared output types"
        );
        Ok(())
    }

    /// Passes 5 and 6: interface bodies, then object type bodies.
    fn build_outputs(&mut self, kind: OutputKind) -> Result<(), SchemaError> {
        let specs = match kind {
            OutputKind::Interface => &self.spec.interfaces,
            OutputKind::Object => &self.spec.objects,
        };
        for spec in specs {
            let implemented = implemented_interfaces(spec, &self.spec.interfaces, &self.spec.context)?;
            let fields = splice(&spec.fields, &implemented);
            let defs = resolve_fields(&mut self.resolver, &self.spec.context, &spec.name, &fields)?;
            for field in &fields {
                self.resolvers.insert(
                    (spec.name.clone(), field.name().to_owned()),
                    Arc::clone(field.resolver()),
                );
            }
            self.resolver.mark_built(&spec.name);
            let ty = ObjectType {
                name: spec.name.clone(),
                description: spec.description.clone(),
                fields: defs,
                interfaces: implemented.iter().map(|i| i.name.clone()).collect(),
            };
            self.types.insert(
                spec.name.clone(),
                match kind {
                    OutputKind::Interface => NamedType::Interface(ty),
                    OutputKind::Object => NamedType::Object(ty),
                },
            );
        }
        debug!(?kind, count = specs.len(), "Built output types");
        Ok(())
    }

    /// Pass 7: root operations.
    fn build_roots(&mut self) -> Result<(), SchemaError> {
        if self.spec.query.is_none() {
            return Err(SchemaError::invariant("a schema needs a query root"));
        }
        let roots = [&self.spec.query, &self.spec.mutation, &self.spec.subscription];
        for root in roots.into_iter().flatten() {
            let OperationSpec {
                name,
                description,
                receiver,
                fields,
            } = root;
            self.resolver.declare_root(name)?;
            let defs = resolve_fields(&mut self.resolver, &self.spec.context, name, fields)?;
            for field in fields {
                self.resolvers.insert(
                    (name.clone(), field.name().to_owned()),
                    Arc::clone(field.resolver()),
                );
            }
            self.receivers.insert(name.clone(), receiver.clone());
            self.types.insert(
                name.clone(),
                NamedType::Object(ObjectType {
                    name: name.clone(),
                    description: description.clone(),
                    fields: defs,
                    interfaces: Vec::new(),
                }),
            );
        }
        debug!(roots = self.receivers.len(), "Built root operations");
        Ok(())
    }

    /// Pass 8: map entry types, forward references and the engine schema.
    fn freeze(mut self) -> Result<SchemaGraph, SchemaError> {
        let entries: Vec<_> = self.resolver.entries().cloned().collect();
        for entry in entries {
            for (field, key) in [("key", true), ("value", false)] {
                self.resolvers
                    .insert((entry.name.clone(), field.to_owned()), entry_resolver(key));
            }
            self.types.insert(
                entry.name.clone(),
                NamedType::Object(ObjectType {
                    name: entry.name.clone(),
                    description: None,
                    fields: vec![
                        FieldDef {
                            name: "key".to_owned(),
                            description: None,
                            ty: entry.key,
                            arguments: Vec::new(),
                        },
                        FieldDef {
                            name: "value".to_owned(),
                            description: None,
                            ty: entry.value,
                            arguments: Vec::new(),
                        },
                    ],
                    interfaces: Vec::new(),
                }),
            );
        }

        for ty in self.types.values_mut() {
            match ty {
                NamedType::Input(input) => {
                    for field in &mut input.fields {
                        field.ty = self.resolver.finalize(field.ty.clone(), Polarity::Input)?;
                    }
                }
                NamedType::Interface(object) | NamedType::Object(object) => {
                    for field in &mut object.fields {
                        field.ty = self.resolver.finalize(field.ty.clone(), Polarity::Output)?;
                        for argument in &mut field.arguments {
                            argument.ty =
                                self.resolver.finalize(argument.ty.clone(), Polarity::Input)?;
                        }
                    }
                }
                NamedType::Scalar { .. } | NamedType::Enum(_) => {}
            }
        }
        debug!(types = self.types.len(), resolvers = self.resolvers.len(), "Resolved forward references");

        let catalog = Arc::new(self.catalog());
        let schema = self.engine_schema(&catalog)?;
        debug!("Froze schema");

        let query = self
            .spec
            .query
            .as_ref()
            .map_or_else(|| QUERY.to_owned(), |root| root.name.clone());
        Ok(SchemaGraph {
            types: self.types,
            query,
            mutation: self.spec.mutation.map(|root| root.name),
            subscription: self.spec.subscription.map(|root| root.name),
            resolvers: self.resolvers,
            receivers: self.receivers,
            schema,
        })
    }

    fn catalog(&self) -> OutputCatalog {
        let mut implementations: HashMap<String, Vec<_>> = HashMap::new();
        for spec in &self.spec.objects {
            let Some(object) = self.types.get(&spec.name).and_then(NamedType::as_object) else {
                continue;
            };
            for interface in &object.interfaces {
                implementations
                    .entry(interface.clone())
                    .or_default()
                    .push((spec.class, spec.name.clone()));
            }
        }
        OutputCatalog {
            scalars: self
                .spec
                .scalars
                .iter()
                .map(|scalar| (scalar.name.clone(), scalar.coercion.clone()))
                .collect(),
            ids: self
                .spec
                .context
                .ids
                .iter()
                .map(|(class, id)| (*class, Arc::clone(&id.formatter)))
                .collect(),
            enums: self
                .spec
                .enums
                .iter()
                .map(|spec| (spec.name.clone(), spec.constants.clone()))
                .collect(),
            implementations,
            introspector: Arc::clone(&self.spec.context.introspector),
        }
    }

    fn engine_schema(&self, catalog: &Arc<OutputCatalog>) -> Result<Schema, SchemaError> {
        let mutation = self.spec.mutation.as_ref().map(|root| root.name.as_str());
        let subscription = self.spec.subscription.as_ref().map(|root| root.name.as_str());
        let query = self
            .spec
            .query
            .as_ref()
            .map_or(QUERY, |root| root.name.as_str());
        let mut builder = Schema::build(query, mutation, subscription);

        for ty in self.types.values() {
            builder = match ty {
                NamedType::Scalar { name, description } => {
                    let mut scalar = Scalar::new(name.as_str());
                    if let Some(description) = description {
                        scalar = scalar.description(description.as_str());
                    }
                    if let Some(coercion) = catalog.scalars.get(name).cloned() {
                        scalar = scalar.validator(move |value| coercion.accepts(value));
                    }
                    builder.register(scalar)
                }
                NamedType::Enum(ty) => {
                    let mut engine = Enum::new(ty.name.as_str());
                    if let Some(description) = &ty.description {
                        engine = engine.description(description.as_str());
                    }
                    for value in &ty.values {
                        engine = engine.item(EnumItem::new(value.as_str()));
                    }
                    builder.register(engine)
                }
                NamedType::Input(ty) => {
                    let mut engine = InputObject::new(ty.name.as_str());
                    if let Some(description) = &ty.description {
                        engine = engine.description(description.as_str());
                    }
                    for field in &ty.fields {
                        engine = engine.field(input_value(field));
                    }
                    builder.register(engine)
                }
                NamedType::Interface(ty) => builder.register(self.interface(ty)),
                NamedType::Object(ty) if Some(ty.name.as_str()) == subscription => {
                    builder.register(self.subscription(ty, catalog)?)
                }
                NamedType::Object(ty) => builder.register(self.object(ty, catalog)?),
            };
        }

        let config = &self.spec.config;
        if let Some(depth) = config.max_depth {
            builder = builder.limit_depth(depth);
        }
        if let Some(complexity) = config.max_complexity {
            builder = builder.limit_complexity(complexity);
        }
        if !config.introspection {
            builder = builder.disable_introspection();
        }
        builder
            .finish()
            .map_err(|err| SchemaError::Engine(err.to_string()))
    }

    fn interface(&self, ty: &ObjectType) -> Interface {
        let mut engine = Interface::new(ty.name.as_str());
        if let Some(description) = &ty.description {
            engine = engine.description(description.as_str());
        }
        for field in &ty.fields {
            let mut def = InterfaceField::new(field.name.as_str(), field.ty.to_type_ref());
            if let Some(description) = &field.description {
                def = def.description(description.as_str());
            }
            for argument in &field.arguments {
                def = def.argument(input_value(argument));
            }
            engine = engine.field(def);
        }
        for interface in &ty.interfaces {
            engine = engine.implement(interface.as_str());
        }
        engine
    }

    fn binding(&self, parent: &ObjectType, field: &FieldDef) -> Result<Binding, SchemaError> {
        let resolver = self
            .resolvers
            .get(&(parent.name.clone(), field.name.clone()))
            .cloned()
            .ok_or_else(|| {
                SchemaError::invariant(format!("no resolver for {}.{}", parent.name, field.name))
            })?;
        Ok(Binding {
            parent: parent.name.clone(),
            field: field.clone(),
            resolver,
            receiver: self.receivers.get(&parent.name).cloned(),
        })
    }

    fn object(&self, ty: &ObjectType, catalog: &Arc<OutputCatalog>) -> Result<Object, SchemaError> {
        let mut engine = Object::new(ty.name.as_str());
        if let Some(description) = &ty.description {
            engine = engine.description(description.as_str());
        }
        for field in &ty.fields {
            engine = engine.field(object_field(self.binding(ty, field)?, Arc::clone(catalog)));
        }
        for interface in &ty.interfaces {
            engine = engine.implement(interface.as_str());
        }
        Ok(engine)
    }

    fn subscription(
        &self,
        ty: &ObjectType,
        catalog: &Arc<OutputCatalog>,
    ) -> Result<Subscription, SchemaError> {
        let mut engine = Subscription::new(ty.name.as_str());
        if let Some(description) = &ty.description {
            engine = engine.description(description.as_str());
        }
        for field in &ty.fields {
            engine = engine.field(subscription_field(self.binding(ty, field)?, Arc::clone(catalog)));
        }
        Ok(engine)
    }
}

/// Explicit interfaces first, then declared interfaces among the supertypes.
fn implemented_interfaces<'s>(
    spec: &TypeSpec,
    interfaces: &'s [TypeSpec],
    context: &SpecContext,
) -> Result<Vec<&'s TypeSpec>, SchemaError> {
    let mut implemented: Vec<&TypeSpec> = Vec::new();
    for class in &spec.interfaces {
        let interface = interfaces
            .iter()
            .find(|candidate| candidate.class == *class)
            .ok_or_else(|| {
                SchemaError::invariant(format!(
                    "{} implements {class}, which is not a declared interface",
                    spec.name
                ))
            })?;
        if !context.introspector.is_subtype(spec.class, interface.class) {
            return Err(SchemaError::invariant(format!(
                "{} implements {}, but {} does not extend {}",
                spec.name, interface.name, spec.class, interface.class
            )));
        }
        implemented.push(interface);
    }
    for interface in interfaces {
        let inherited = interface.class != spec.class
            && context.introspector.is_subtype(spec.class, interface.class)
            && !implemented.iter().any(|i| i.class == interface.class);
        if inherited {
            trace!(ty = %spec.name, interface = %interface.name, "Detected inherited interface");
            implemented.push(interface);
        }
    }
    Ok(implemented)
}

/// Own fields followed by the interface fields the type doesn't declare.
fn splice(own: &[FieldSpec], interfaces: &[&TypeSpec]) -> Vec<FieldSpec> {
    let mut fields = own.to_vec();
    for interface in interfaces {
        for field in &interface.fields {
            if !fields.iter().any(|f| f.name() == field.name()) {
                trace!(interface = %interface.name, field = field.name(), "Inherited interface field");
                fields.push(field.clone());
            }
        }
    }
    fields
}

fn resolve_fields(
    resolver: &mut TypeResolver,
    context: &SpecContext,
    owner: &str,
    fields: &[FieldSpec],
) -> Result<Vec<FieldDef>, SchemaError> {
    let mut defs = Vec::with_capacity(fields.len());
    for field in fields {
        for argument in field.invocation_arguments() {
            argument.check_binding(context)?;
        }
        let mut arguments = Vec::with_capacity(field.arguments().len());
        for argument in field.arguments() {
            arguments.push(InputValueDef {
                name: argument.name().to_owned(),
                description: argument.description().map(str::to_owned),
                ty: resolver.resolve(argument.ty(), Polarity::Input)?,
            });
        }
        let ty = resolver.resolve(field.output_type(), Polarity::Output)?;
        trace!(owner, field = field.name(), ty = %ty, "Resolved field");
        defs.push(FieldDef {
            name: field.name().to_owned(),
            description: field.description().map(str::to_owned),
            ty,
            arguments,
        });
    }
    Ok(defs)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::host::{ClassBuilder, ClassKind, ClassRegistry, HostClass};
    use crate::types::TypeNode;

    #[derive(Clone)]
    struct Shape {
        name: String,
    }

    #[derive(Clone)]
    struct Circle {
        shape: Shape,
        radius: f64,
    }

    #[derive(Clone)]
    struct Library;

    impl HostClass for Shape {}
    impl HostClass for Circle {}

    fn registry() -> Arc<ClassRegistry> {
        let mut registry = ClassRegistry::new();
        registry
            .register(
                ClassBuilder::<Shape>::new()
                    .kind(ClassKind::Open)
                    .property("name", |s: &Shape| s.name.clone()),
            )
            .unwrap()
            .register(
                ClassBuilder::<Circle>::new()
                    .extends(|c: &Circle| &c.shape)
                    .property("radius", |c: &Circle| c.radius),
            )
            .unwrap();
        Arc::new(registry)
    }

    fn spec() -> SchemaSpec {
        let mut spec = SchemaSpec::new(registry());
        spec.query(Library, |q| {
            q.constant(
                "circle",
                Circle {
                    shape: Shape {
                        name: "unit".into(),
                    },
                    radius: 1.0,
                },
            );
        })
        .unwrap();
        spec
    }

    #[test]
    fn test_missing_query_root() {
        let spec = SchemaSpec::new(registry());
        let err = spec.build().unwrap_err();
        assert!(matches!(err, SchemaError::InvariantViolation(_)));
    }

    #[test]
    fn test_forward_reference_is_finalized() {
        let mut spec = spec();
        // Circle is referenced by the query root before it is declared.
        spec.object::<Circle, _>(|t| {
            t.derive();
        })
        .unwrap();
        let graph = spec.build().unwrap();
        let field = graph.query_type().unwrap().field("circle").unwrap();
        assert_eq!(field.ty, TypeNode::Object("Circle".into()).non_null());
    }

    #[test]
    fn test_inherited_interface_is_detected() {
        let mut spec = spec();
        spec.interface::<Shape, _>(|t| {
            t.derive();
        })
        .unwrap()
        .object::<Circle, _>(|t| {
            t.include_property("radius");
        })
        .unwrap();
        let graph = spec.build().unwrap();
        let Some(NamedType::Object(circle)) = graph.get_type("Circle") else {
            panic!("expected Circle");
        };
        assert_eq!(circle.interfaces, vec!["Shape".to_owned()]);
        let names: Vec<_> = circle.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["radius", "name"]);
        assert!(graph.resolver("Circle", "name").is_some());
    }

    #[test]
    fn test_undeclared_output_type() {
        let err = spec().build().unwrap_err();
        assert!(matches!(err, SchemaError::TypeResolution { .. }));
    }
}
