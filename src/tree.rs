use std::sync::Arc;

use super::constraint::Constraint;
use super::form::{FormError, FormResult};
use super::registry::{Options, TypeRegistry};
use super::transform::DataTransformer;
use super::value::Value;

#[derive(Clone)]
pub struct Field {
    name: String,
    type_id: String,
    options: Options,
    transformers: Vec<Arc<dyn DataTransformer>>,
    constraints: Vec<Arc<dyn Constraint>>,
    children: Vec<Field>,
}

impl Field {
    pub fn new(name: impl Into<String>, type_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_id: type_id.into(),
            options: Options::new(),
            transformers: Vec::new(),
            constraints: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    pub fn transformer(mut self, transformer: impl DataTransformer + 'static) -> Self {
        self.transformers.push(Arc::new(transformer));
        self
    }

    pub fn constraint(mut self, constraint: impl Constraint + 'static) -> Self {
        self.constraints.push(Arc::new(constraint));
        self
    }

    pub fn child(mut self, field: Field) -> Self {
        self.children.push(field);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

pub struct FieldNode {
    name: String,
    type_id: String,
    options: Options,
    transformers: Vec<Arc<dyn DataTransformer>>,
    constraints: Vec<Arc<dyn Constraint>>,
    children: Vec<FieldNode>,
    display: Value,
}

impl std::fmt::Debug for FieldNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldNode")
            .field("name", &self.name)
            .field("type_id", &self.type_id)
            .field("options", &self.options)
            .field("children", &self.children)
            .field("display", &self.display)
            .finish()
    }
}

impl FieldNode {
    pub(crate) fn resolve(declaration: Field, registry: &TypeRegistry) -> FormResult<Self> {
        let resolved = registry.resolve(&declaration.type_id)?;
        let (mut options, transformer_factories, constraint_factories) = resolved.into_parts();
        for (key, value) in declaration.options {
            options.insert(key, value);
        }

        let mut transformers = transformer_factories
            .iter()
            .filter_map(|factory| factory(&options))
            .collect::<Vec<_>>();
        transformers.extend(declaration.transformers);

        let mut constraints = constraint_factories
            .iter()
            .filter_map(|factory| factory(&options))
            .collect::<Vec<_>>();
        constraints.extend(declaration.constraints);

        let mut children: Vec<FieldNode> = Vec::new();
        for child in declaration.children {
            if children.iter().any(|existing| existing.name == child.name) {
                return Err(FormError::DuplicateField(child.name));
            }
            children.push(FieldNode::resolve(child, registry)?);
        }

        Ok(Self {
            name: declaration.name,
            type_id: declaration.type_id,
            options,
            transformers,
            constraints,
            children,
            display: Value::Null,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_id(&self) -> &str {
        &self.type_id
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn children(&self) -> &[FieldNode] {
        &self.children
    }

    pub fn is_compound(&self) -> bool {
        !self.children.is_empty()
    }

    pub fn display(&self) -> &Value {
        &self.display
    }

    pub(crate) fn transformers(&self) -> &[Arc<dyn DataTransformer>] {
        &self.transformers
    }

    pub(crate) fn constraints(&self) -> &[Arc<dyn Constraint>] {
        &self.constraints
    }

    pub(crate) fn children_mut(&mut self) -> &mut [FieldNode] {
        &mut self.children
    }

    pub(crate) fn set_display(&mut self, value: Value) {
        self.display = value;
    }
}

pub struct TreeEditor {
    nodes: Vec<FieldNode>,
    registry: Arc<TypeRegistry>,
}

impl TreeEditor {
    pub(crate) fn new(nodes: Vec<FieldNode>, registry: Arc<TypeRegistry>) -> Self {
        Self { nodes, registry }
    }

    pub fn add(&mut self, field: Field) -> FormResult<()> {
        if self.contains(field.name()) {
            return Err(FormError::DuplicateField(field.name().to_string()));
        }
        let node = FieldNode::resolve(field, &self.registry)?;
        self.nodes.push(node);
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.nodes.len();
        self.nodes.retain(|node| node.name() != name);
        self.nodes.len() != before
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.iter().any(|node| node.name() == name)
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.nodes.iter().map(FieldNode::name).collect()
    }

    pub(crate) fn into_nodes(self) -> Vec<FieldNode> {
        self.nodes
    }
}
