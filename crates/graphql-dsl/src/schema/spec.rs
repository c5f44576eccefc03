//! Declaration DSL.
//!
//! [`SchemaSpec`] accumulates every named declaration of a schema; the
//! interface, object and root operation bodies are configured through a
//! [`TypeBuilder`]. Nothing is resolved here: names are reserved, fields and
//! arguments are derived, and [`SchemaSpec::build`] hands the result to the
//! assembler.

use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::fmt::Display;
use std::marker::PhantomData;
use std::str::FromStr;
use std::sync::Arc;

use strum::IntoEnumIterator;
use tracing::{debug, info, warn};

use super::arguments::ArgumentBinder;
use super::builder::SchemaAssembler;
use super::declarations::{
    EnumConstants, EnumSpec, IdSpec, InputSpec, OperationSpec, OutputKind, ScalarSpec, TypeSpec,
};
use super::description::{PendingDescription, pick};
use super::fields::{ExclusionTarget, Exclusions, FieldSpec, Invocation, is_structural};
use super::graph::SchemaGraph;
use crate::config::SchemaConfig;
use crate::context::Environment;
use crate::error::{ResolveError, SchemaError};
use crate::host::{
    FunctionInfo, HostClass, HostObject, HostType, HostValue, Method, Output, ParameterInfo,
    TypeIntrospector,
};
use crate::types::scalars::BUILTIN_SCALARS;
use crate::types::{Coercing, ScalarCoercion, TypeDescriptor, validate_name};

pub(crate) const QUERY: &str = "Query";
pub(crate) const MUTATION: &str = "Mutation";
pub(crate) const SUBSCRIPTION: &str = "Subscription";

/// Registries consulted while fields and arguments are derived.
pub(crate) struct SpecContext {
    pub(crate) introspector: Arc<dyn TypeIntrospector>,
    pub(crate) ids: HashMap<HostType, IdSpec>,
    pub(crate) scalars: HashMap<HostType, ScalarCoercion>,
    pub(crate) enums: HashMap<HostType, EnumSpec>,
    pub(crate) inputs: HashMap<HostType, String>,
    pub(crate) convert_streams: bool,
    pub(crate) validate_names: bool,
}

impl SpecContext {
    pub(crate) fn new(introspector: Arc<dyn TypeIntrospector>) -> Self {
        Self {
            introspector,
            ids: HashMap::new(),
            scalars: HashMap::new(),
            enums: HashMap::new(),
            inputs: HashMap::new(),
            convert_streams: true,
            validate_names: true,
        }
    }

    fn check_name(&self, kind: &str, name: &str) -> Result<(), SchemaError> {
        if self.validate_names {
            validate_name(kind, name)
        } else {
            Ok(())
        }
    }
}

/// Every declaration of a schema, in declaration order.
pub struct SchemaSpec {
    pub(crate) context: SpecContext,
    pub(crate) config: SchemaConfig,
    description: PendingDescription,
    names: HashSet<String>,
    pub(crate) scalars: Vec<ScalarSpec>,
    pub(crate) enums: Vec<EnumSpec>,
    pub(crate) inputs: Vec<InputSpec>,
    pub(crate) interfaces: Vec<TypeSpec>,
    pub(crate) objects: Vec<TypeSpec>,
    pub(crate) query: Option<OperationSpec>,
    pub(crate) mutation: Option<OperationSpec>,
    pub(crate) subscription: Option<OperationSpec>,
}

impl SchemaSpec {
    /// An empty spec with the default configuration.
    #[must_use]
    pub fn new(introspector: Arc<dyn TypeIntrospector>) -> Self {
        let mut names: HashSet<String> = BUILTIN_SCALARS.iter().map(|s| (*s).to_owned()).collect();
        names.extend([QUERY, MUTATION, SUBSCRIPTION].map(str::to_owned));
        Self {
            context: SpecContext::new(introspector),
            config: SchemaConfig::default(),
            description: PendingDescription::default(),
            names,
            scalars: Vec::new(),
            enums: Vec::new(),
            inputs: Vec::new(),
            interfaces: Vec::new(),
            objects: Vec::new(),
            query: None,
            mutation: None,
            subscription: None,
        }
    }

    /// An empty spec with `config` applied.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Config`] if the configuration is invalid.
    pub fn with_config(
        introspector: Arc<dyn TypeIntrospector>,
        config: SchemaConfig,
    ) -> Result<Self, SchemaError> {
        config.validate().map_err(SchemaError::Config)?;
        let mut spec = Self::new(introspector);
        spec.context.convert_streams = config.convert_streams_to_publisher;
        spec.context.validate_names = config.validate_names;
        spec.config = config;
        Ok(spec)
    }

    #[must_use]
    pub fn config(&self) -> &SchemaConfig {
        &self.config
    }

    /// Sets the description of the next declaration.
    pub fn describe(&mut self, text: &str) -> &mut Self {
        self.description.set(text);
        self
    }

    /// Switches adaptation of subscription streams to publishers.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::InvariantViolation`] once a subscription root is
    /// declared, since its fields were derived with the previous setting.
    pub fn convert_streams_to_publisher(&mut self, enabled: bool) -> Result<&mut Self, SchemaError> {
        if self.subscription.is_some() {
            return Err(SchemaError::invariant(
                "stream conversion can't change after the subscription root is declared",
            ));
        }
        self.context.convert_streams = enabled;
        self.config.convert_streams_to_publisher = enabled;
        Ok(self)
    }

    fn reserve(&mut self, kind: &str, name: &str) -> Result<(), SchemaError> {
        self.context.check_name(kind, name)?;
        if !self.names.insert(name.to_owned()) {
            return Err(SchemaError::duplicate(format!("type name {name}")));
        }
        Ok(())
    }

    /// Exposes `T` through the `ID` scalar, parsed with [`FromStr`].
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::DuplicateDeclaration`] if `T` is already an ID type.
    pub fn id<T>(&mut self) -> Result<&mut Self, SchemaError>
    where
        T: HostClass + FromStr + Display,
        T::Err: Display,
    {
        self.id_with::<T, _, _>(|raw| raw.parse::<T>())
    }

    /// Exposes `T` through the `ID` scalar, parsed with `coercer`.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::DuplicateDeclaration`] if `T` is already an ID type.
    pub fn id_with<T, F, E>(&mut self, coercer: F) -> Result<&mut Self, SchemaError>
    where
        T: HostClass + Display,
        F: Fn(&str) -> Result<T, E> + Send + Sync + 'static,
        E: Display,
    {
        let class = HostType::of::<T>();
        if self.context.ids.contains_key(&class) {
            return Err(SchemaError::duplicate(format!("ID type {class}")));
        }
        debug!(class = %class, "Declared ID type");
        self.context.ids.insert(
            class,
            IdSpec {
                class,
                coercer: Arc::new(move |raw: &str| {
                    coercer(raw)
                        .map(|value| HostValue::Object(HostObject::new(value)))
                        .map_err(ResolveError::resolver)
                }),
                formatter: Arc::new(|object: &HostObject| {
                    object.downcast_ref::<T>().map(ToString::to_string)
                }),
            },
        );
        Ok(self)
    }

    /// Declares a custom scalar named after its host class.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::DuplicateDeclaration`] if the name or class is taken.
    pub fn scalar<C: Coercing>(&mut self, coercing: C) -> Result<&mut Self, SchemaError> {
        let name = HostType::of::<C::Host>().name();
        self.scalar_named(name, coercing)
    }

    /// # Errors
    ///
    /// Returns [`SchemaError::DuplicateDeclaration`] if the name or class is taken.
    pub fn scalar_named<C: Coercing>(
        &mut self,
        name: &str,
        coercing: C,
    ) -> Result<&mut Self, SchemaError> {
        let coercion = ScalarCoercion::new(coercing);
        let class = coercion.class();
        if self.context.scalars.contains_key(&class) {
            return Err(SchemaError::duplicate(format!("scalar for {class}")));
        }
        self.reserve("scalar", name)?;
        let description = pick(self.description.take(), self.context.introspector.description(class));
        debug!(scalar = name, class = %class, "Declared scalar");
        self.context.scalars.insert(class, coercion.clone());
        self.scalars.push(ScalarSpec {
            name: name.to_owned(),
            description,
            coercion,
        });
        Ok(self)
    }

    /// Declares an enum named after its host class.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::DuplicateDeclaration`] if the name or class is taken.
    pub fn enumeration<T>(&mut self) -> Result<&mut Self, SchemaError>
    where
        T: HostClass + IntoEnumIterator + AsRef<str>,
    {
        self.enumeration_named::<T>(HostType::of::<T>().name())
    }

    /// # Errors
    ///
    /// Returns [`SchemaError::DuplicateDeclaration`] if the name or class is
    /// taken, or [`SchemaError::InvariantViolation`] for an invalid constant name.
    pub fn enumeration_named<T>(&mut self, name: &str) -> Result<&mut Self, SchemaError>
    where
        T: HostClass + IntoEnumIterator + AsRef<str>,
    {
        let class = HostType::of::<T>();
        if self.context.enums.contains_key(&class) {
            return Err(SchemaError::duplicate(format!("enum for {class}")));
        }
        self.reserve("enum", name)?;
        let constants = EnumConstants::of::<T>();
        for constant in constants.names() {
            self.context.check_name("enum value", constant)?;
        }
        let spec = EnumSpec {
            name: name.to_owned(),
            description: pick(self.description.take(), self.context.introspector.description(class)),
            class,
            constants,
        };
        debug!(enumeration = name, constants = spec.constants.len(), "Declared enum");
        self.context.enums.insert(class, spec.clone());
        self.enums.push(spec);
        Ok(self)
    }

    /// Declares an input object named after its host class.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::InvariantViolation`] if `T` has no primary
    /// constructor or a non-null reference to itself.
    pub fn input<T: HostClass>(&mut self) -> Result<&mut Self, SchemaError> {
        self.input_named::<T>(HostType::of::<T>().name())
    }

    /// # Errors
    ///
    /// Returns [`SchemaError::InvariantViolation`] if `T` has no primary
    /// constructor or a non-null reference to itself.
    pub fn input_named<T: HostClass>(&mut self, name: &str) -> Result<&mut Self, SchemaError> {
        let class = HostType::of::<T>();
        if self.context.inputs.contains_key(&class) {
            return Err(SchemaError::duplicate(format!("input object for {class}")));
        }
        self.reserve("input object", name)?;
        let spec = InputSpec::derive(
            name,
            self.description.take(),
            class,
            self.context.introspector.as_ref(),
        )?;
        for field in &spec.fields {
            self.context.check_name("input field", &field.name)?;
        }
        debug!(input = name, fields = spec.fields.len(), "Declared input object");
        self.context.inputs.insert(class, name.to_owned());
        self.inputs.push(spec);
        Ok(self)
    }

    /// Declares an interface named after its host class.
    ///
    /// # Errors
    ///
    /// Returns the first error raised while configuring the interface.
    pub fn interface<T, F>(&mut self, configure: F) -> Result<&mut Self, SchemaError>
    where
        T: HostClass,
        F: FnOnce(&mut TypeBuilder<'_, T>),
    {
        let spec = self.declare_type::<T, F>(OutputKind::Interface, configure)?;
        self.interfaces.push(spec);
        Ok(self)
    }

    /// Declares an object type named after its host class.
    ///
    /// # Errors
    ///
    /// Returns the first error raised while configuring the type.
    pub fn object<T, F>(&mut self, configure: F) -> Result<&mut Self, SchemaError>
    where
        T: HostClass,
        F: FnOnce(&mut TypeBuilder<'_, T>),
    {
        let spec = self.declare_type::<T, F>(OutputKind::Object, configure)?;
        self.objects.push(spec);
        Ok(self)
    }

    fn declare_type<T, F>(&mut self, kind: OutputKind, configure: F) -> Result<TypeSpec, SchemaError>
    where
        T: HostClass,
        F: FnOnce(&mut TypeBuilder<'_, T>),
    {
        let class = HostType::of::<T>();
        let declared = self
            .interfaces
            .iter()
            .chain(&self.objects)
            .any(|spec| spec.class == class);
        if declared {
            return Err(SchemaError::duplicate(format!("output type for {class}")));
        }
        let target = match kind {
            OutputKind::Interface => Target::Interface,
            OutputKind::Object => Target::Object,
        };
        let mut builder = TypeBuilder::new(&self.context, class.name(), target);
        configure(&mut builder);
        let built = builder.finish()?;
        let kind_name = match kind {
            OutputKind::Interface => "interface",
            OutputKind::Object => "object type",
        };
        self.reserve(kind_name, &built.name)?;
        let description = pick(self.description.take(), self.context.introspector.description(class));
        debug!(name = %built.name, ?kind, fields = built.fields.len(), "Declared output type");
        Ok(TypeSpec {
            name: built.name,
            description,
            class,
            kind,
            fields: built.fields,
            interfaces: built.interfaces,
        })
    }

    /// Declares the query root; its fields run against `receiver`.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::DuplicateDeclaration`] if a query root exists,
    /// or the first error raised while configuring it.
    pub fn query<R, F>(&mut self, receiver: R, configure: F) -> Result<&mut Self, SchemaError>
    where
        R: Any + Send + Sync,
        F: FnOnce(&mut TypeBuilder<'_, R>),
    {
        if self.query.is_some() {
            return Err(SchemaError::duplicate("query root declared twice"));
        }
        self.query = Some(self.declare_operation(QUERY, receiver, configure)?);
        Ok(self)
    }

    /// Declares the mutation root.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::DuplicateDeclaration`] if a mutation root exists,
    /// or the first error raised while configuring it.
    pub fn mutation<R, F>(&mut self, receiver: R, configure: F) -> Result<&mut Self, SchemaError>
    where
        R: Any + Send + Sync,
        F: FnOnce(&mut TypeBuilder<'_, R>),
    {
        if self.mutation.is_some() {
            return Err(SchemaError::duplicate("mutation root declared twice"));
        }
        self.mutation = Some(self.declare_operation(MUTATION, receiver, configure)?);
        Ok(self)
    }

    /// Declares the subscription root.
    ///
    /// Stream results of its fields are adapted according to the stream
    /// conversion setting in effect at this point.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::DuplicateDeclaration`] if a subscription root
    /// exists, or the first error raised while configuring it.
    pub fn subscription<R, F>(&mut self, receiver: R, configure: F) -> Result<&mut Self, SchemaError>
    where
        R: Any + Send + Sync,
        F: FnOnce(&mut TypeBuilder<'_, R>),
    {
        if self.subscription.is_some() {
            return Err(SchemaError::duplicate("subscription root declared twice"));
        }
        self.subscription = Some(self.declare_operation(SUBSCRIPTION, receiver, configure)?);
        Ok(self)
    }

    fn declare_operation<R, F>(
        &mut self,
        name: &str,
        receiver: R,
        configure: F,
    ) -> Result<OperationSpec, SchemaError>
    where
        R: Any + Send + Sync,
        F: FnOnce(&mut TypeBuilder<'_, R>),
    {
        let mut builder = TypeBuilder::new(&self.context, name, Target::Operation);
        configure(&mut builder);
        let built = builder.finish()?;
        debug!(operation = name, fields = built.fields.len(), "Declared root operation");
        Ok(OperationSpec {
            name: name.to_owned(),
            description: self.description.take(),
            receiver: HostObject::new(receiver),
            fields: built.fields,
        })
    }

    /// Assembles the schema.
    ///
    /// # Errors
    ///
    /// Returns the first error of any assembly pass; no partial schema is produced.
    pub fn build(mut self) -> Result<SchemaGraph, SchemaError> {
        self.description.finish("schema");
        let graph = SchemaAssembler::new(self).assemble()?;
        info!(
            types = graph.types().count(),
            resolvers = graph.resolvers().count(),
            "Schema built"
        );
        Ok(graph)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Interface,
    Object,
    Operation,
}

struct Built {
    name: String,
    fields: Vec<FieldSpec>,
    interfaces: Vec<HostType>,
}

/// Configures the fields of an interface, object type or root operation
/// backed by `R`.
///
/// Errors are recorded and reported when the declaration completes; after
/// the first one the remaining calls are ignored.
pub struct TypeBuilder<'a, R> {
    context: &'a SpecContext,
    name: String,
    class: HostType,
    target: Target,
    description: PendingDescription,
    fields: Vec<FieldSpec>,
    interfaces: Vec<HostType>,
    exclusions: Exclusions,
    error: Option<SchemaError>,
    _receiver: PhantomData<fn() -> R>,
}

impl<'a, R: Any + Send + Sync> TypeBuilder<'a, R> {
    fn new(context: &'a SpecContext, name: &str, target: Target) -> Self {
        Self {
            context,
            name: name.to_owned(),
            class: HostType::of::<R>(),
            target,
            description: PendingDescription::default(),
            fields: Vec::new(),
            interfaces: Vec::new(),
            exclusions: Exclusions::default(),
            error: None,
            _receiver: PhantomData,
        }
    }

    fn fail(&mut self, error: SchemaError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    fn failed(&self) -> bool {
        self.error.is_some()
    }

    fn push(&mut self, field: FieldSpec) {
        if self.fields.iter().any(|f| f.name() == field.name()) {
            self.fail(SchemaError::duplicate(format!(
                "field {}.{}",
                self.name,
                field.name()
            )));
            return;
        }
        if let Err(err) = self.context.check_name("field", field.name()) {
            self.fail(err);
            return;
        }
        for argument in field.arguments() {
            if let Err(err) = self.context.check_name("argument", argument.name()) {
                self.fail(err);
                return;
            }
        }
        self.fields.push(field);
    }

    /// Name of the declared type.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Renames the type. Root operations keep their fixed names.
    pub fn rename(&mut self, name: &str) -> &mut Self {
        if self.target == Target::Operation {
            self.fail(SchemaError::invariant(format!(
                "root operation {} can't be renamed",
                self.name
            )));
        } else {
            self.name = name.to_owned();
        }
        self
    }

    /// Sets the description of the next field.
    pub fn describe(&mut self, text: &str) -> &mut Self {
        self.description.set(text);
        self
    }

    /// Derives a field for every property and function of the backing class.
    ///
    /// Structural members and excluded members are skipped. A pending
    /// description is an error, since it would attach to no field.
    pub fn derive(&mut self) -> &mut Self {
        if self.failed() {
            return self;
        }
        if let Some(description) = self.description.take() {
            self.fail(SchemaError::invariant(format!(
                "description \"{description}\" on {} must precede a single field, not derive()",
                self.name
            )));
            return self;
        }
        let kind = self.context.introspector.kind(self.class);
        let valid = match self.target {
            Target::Interface => kind.can_back_interface(),
            Target::Object => kind.can_back_object(),
            Target::Operation => true,
        };
        if !valid {
            let what = if self.target == Target::Interface {
                "an interface"
            } else {
                "a type"
            };
            self.fail(SchemaError::invariant(format!(
                "Can't derive {} ({kind:?}) as {what}",
                self.class
            )));
            return self;
        }

        let introspector = Arc::clone(&self.context.introspector);
        for property in introspector.properties(self.class) {
            let field = FieldSpec::property(
                &property,
                property.description.clone(),
                Arc::clone(&introspector),
                self.context.convert_streams,
            );
            if !self.exclusions.excludes(&field) {
                self.push(field);
            }
        }
        for function in introspector.functions(self.class) {
            if is_structural(&function.name) {
                continue;
            }
            if function.return_type.is_injected() {
                warn!(
                    class = %self.class,
                    function = %function.name,
                    ty = %function.return_type,
                    "Skipping function whose return type has no schema representation"
                );
                continue;
            }
            self.push_function(&function, function.description.clone());
        }
        self
    }

    fn push_function(&mut self, function: &FunctionInfo, description: Option<String>) {
        let binder = ArgumentBinder::new(self.context);
        let field = FieldSpec::function(
            function,
            description,
            &binder,
            Arc::clone(&self.context.introspector),
            self.context.convert_streams,
        );
        match field {
            Ok(field) if self.exclusions.excludes(&field) => {}
            Ok(field) => self.push(field),
            Err(err) => self.fail(err),
        }
    }

    /// Adds the field backed by the property `name`.
    pub fn include_property(&mut self, name: &str) -> &mut Self {
        if self.failed() {
            return self;
        }
        let property = self
            .context
            .introspector
            .properties(self.class)
            .into_iter()
            .find(|p| p.name == name);
        match property {
            Some(property) => {
                let description = pick(self.description.take(), property.description.clone());
                let field = FieldSpec::property(
                    &property,
                    description,
                    Arc::clone(&self.context.introspector),
                    self.context.convert_streams,
                );
                self.push(field);
            }
            None => self.fail(SchemaError::invariant(format!(
                "{} has no property {name}",
                self.class
            ))),
        }
        self
    }

    /// Adds the field backed by the function `name`.
    pub fn include_function(&mut self, name: &str) -> &mut Self {
        if self.failed() {
            return self;
        }
        let function = self
            .context
            .introspector
            .functions(self.class)
            .into_iter()
            .find(|f| f.name == name);
        match function {
            Some(function) => {
                let description = pick(self.description.take(), function.description.clone());
                let binder = ArgumentBinder::new(self.context);
                match FieldSpec::function(
                    &function,
                    description,
                    &binder,
                    Arc::clone(&self.context.introspector),
                    self.context.convert_streams,
                ) {
                    Ok(field) => self.push(field),
                    Err(err) => self.fail(err),
                }
            }
            None => self.fail(SchemaError::invariant(format!(
                "{} has no function {name}",
                self.class
            ))),
        }
        self
    }

    /// Adds a field computed by `method` on the receiver.
    ///
    /// `params` names every parameter after the receiver.
    pub fn field<M, Args, K>(&mut self, name: &str, params: &[&str], method: M) -> &mut Self
    where
        M: Method<R, Args, K>,
    {
        if self.failed() {
            return self;
        }
        let signature = M::signature();
        if signature.params.len() != params.len() {
            self.fail(SchemaError::invariant(format!(
                "field {}.{name} takes {} parameters but {} names were given",
                self.name,
                signature.params.len(),
                params.len()
            )));
            return self;
        }
        let class = self.class;
        let function = FunctionInfo {
            name: name.to_owned(),
            params: params
                .iter()
                .zip(signature.params)
                .map(|(param, ty)| ParameterInfo {
                    name: (*param).to_owned(),
                    ty,
                    description: None,
                })
                .collect(),
            return_type: signature.output,
            is_async: signature.is_async,
            description: None,
            owner: class,
            invoker: Arc::new(move |receiver: &(dyn Any + Send + Sync), args: Vec<HostValue>| {
                let receiver = receiver
                    .downcast_ref::<R>()
                    .ok_or_else(|| ResolveError::receiver(class.name(), "another class"))?;
                method.invoke(receiver, args)
            }),
        };
        let description = self.description.take();
        self.push_function(&function, description);
        self
    }

    /// Adds a field always resolving to `value`.
    pub fn constant<O>(&mut self, name: &str, value: O) -> &mut Self
    where
        O: Output + Clone + Sync,
    {
        if self.failed() {
            return self;
        }
        let invocation: Invocation = Arc::new(move |_: &Environment, _: Vec<HostValue>| {
            Ok::<_, ResolveError>(value.clone().into_host())
        });
        let field = FieldSpec::custom(
            name,
            self.description.take(),
            &O::descriptor(),
            Vec::new(),
            invocation,
            self.context.convert_streams,
        );
        self.push(field);
        self
    }

    /// Adds a field with an explicit output type and arguments.
    ///
    /// `resolver` receives the environment and the extracted argument values
    /// in declaration order.
    pub fn custom_field<F>(
        &mut self,
        name: &str,
        output: TypeDescriptor,
        arguments: &[(&str, TypeDescriptor)],
        resolver: F,
    ) -> &mut Self
    where
        F: Fn(&Environment, Vec<HostValue>) -> Result<HostValue, ResolveError>
            + Send
            + Sync
            + 'static,
    {
        if self.failed() {
            return self;
        }
        let binder = ArgumentBinder::new(self.context);
        let bound = arguments
            .iter()
            .map(|(argument, ty)| binder.bind(argument, ty, None))
            .collect::<Result<Vec<_>, _>>();
        match bound {
            Ok(bound) => {
                let field = FieldSpec::custom(
                    name,
                    self.description.take(),
                    &output,
                    bound,
                    Arc::new(resolver),
                    self.context.convert_streams,
                );
                self.push(field);
            }
            Err(err) => self.fail(err),
        }
        self
    }

    fn exclude_target(&mut self, target: ExclusionTarget) -> &mut Self {
        if self.failed() {
            return self;
        }
        if let Err(err) = self.exclusions.add(target) {
            self.fail(err);
            return self;
        }
        let exclusions = &mut self.exclusions;
        self.fields.retain(|field| !exclusions.excludes(field));
        self
    }

    /// Removes the field `name`, now or when it is derived later.
    pub fn exclude(&mut self, name: &str) -> &mut Self {
        self.exclude_target(ExclusionTarget::Name(name.to_owned()))
    }

    /// Removes the field backed by the property `name`.
    pub fn exclude_property(&mut self, name: &str) -> &mut Self {
        self.exclude_target(ExclusionTarget::Property(name.to_owned()))
    }

    /// Removes the field backed by the function `name`.
    pub fn exclude_function(&mut self, name: &str) -> &mut Self {
        self.exclude_target(ExclusionTarget::Function(name.to_owned()))
    }

    /// Declares that this object type implements the interface backed by `I`.
    pub fn implements<I: HostClass>(&mut self) -> &mut Self {
        if self.failed() {
            return self;
        }
        let interface = HostType::of::<I>();
        if self.target != Target::Object {
            self.fail(SchemaError::invariant(format!(
                "{} can't implement {interface}: only object types implement interfaces",
                self.name
            )));
        } else if self.interfaces.contains(&interface) {
            self.fail(SchemaError::duplicate(format!(
                "{} implements {interface} twice",
                self.name
            )));
        } else {
            self.interfaces.push(interface);
        }
        self
    }

    /// Describes an argument of an already declared field.
    pub fn argument_description(&mut self, field: &str, argument: &str, text: &str) -> &mut Self {
        let described = self
            .fields
            .iter_mut()
            .find(|f| f.name() == field)
            .is_some_and(|f| f.describe_argument(argument, text));
        if !described {
            warn!(
                type_name = %self.name,
                field,
                argument,
                "Description for unknown argument ignored"
            );
        }
        self
    }

    fn finish(mut self) -> Result<Built, SchemaError> {
        if let Some(err) = self.error.take() {
            return Err(err);
        }
        self.exclusions.finish(&self.name)?;
        self.description.finish(&self.name);
        Ok(Built {
            name: self.name,
            fields: self.fields,
            interfaces: self.interfaces,
        })
    }
}
