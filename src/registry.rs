use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use super::constraint::{Constraint, EmailFormat, OneOf};
use super::form::{FormError, FormResult};
use super::transform::{CheckboxTransformer, DataTransformer, NumberTransformer, Trim};
use super::value::Value;

pub type Options = BTreeMap<String, Value>;

pub type TransformerFactory =
    Arc<dyn Fn(&Options) -> Option<Arc<dyn DataTransformer>> + Send + Sync>;
pub type ConstraintFactory = Arc<dyn Fn(&Options) -> Option<Arc<dyn Constraint>> + Send + Sync>;

#[derive(Clone)]
pub struct FieldType {
    id: String,
    parent: Option<String>,
    defaults: Options,
    transformers: Vec<TransformerFactory>,
    constraints: Vec<ConstraintFactory>,
}

impl FieldType {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            parent: None,
            defaults: Options::new(),
            transformers: Vec::new(),
            constraints: Vec::new(),
        }
    }

    pub fn parent(mut self, id: impl Into<String>) -> Self {
        self.parent = Some(id.into());
        self
    }

    pub fn default_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.defaults.insert(key.into(), value.into());
        self
    }

    pub fn transformer<F>(mut self, factory: F) -> Self
    where
        F: Fn(&Options) -> Option<Arc<dyn DataTransformer>> + Send + Sync + 'static,
    {
        self.transformers.push(Arc::new(factory));
        self
    }

    pub fn constraint<F>(mut self, factory: F) -> Self
    where
        F: Fn(&Options) -> Option<Arc<dyn Constraint>> + Send + Sync + 'static,
    {
        self.constraints.push(Arc::new(factory));
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

pub struct ResolvedType {
    options: Options,
    transformers: Vec<TransformerFactory>,
    constraints: Vec<ConstraintFactory>,
}

impl std::fmt::Debug for ResolvedType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedType")
            .field("options", &self.options)
            .field("transformers", &self.transformers.len())
            .field("constraints", &self.constraints.len())
            .finish()
    }
}

impl ResolvedType {
    pub fn options(&self) -> &Options {
        &self.options
    }

    pub(crate) fn into_parts(self) -> (Options, Vec<TransformerFactory>, Vec<ConstraintFactory>) {
        (self.options, self.transformers, self.constraints)
    }
}

#[derive(Clone, Default)]
pub struct TypeRegistry {
    types: BTreeMap<String, FieldType>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_core_types() -> Self {
        let mut registry = Self::new();
        registry.register(
            FieldType::new("text")
                .default_option("trim", true)
                .transformer(|options| {
                    option_is_true(options, "trim").then(|| Arc::new(Trim) as Arc<dyn DataTransformer>)
                }),
        );
        registry.register(FieldType::new("email").parent("text").constraint(|options| {
            Some(Arc::new(EmailFormat::new(invalid_message(
                options,
                "this value is not a valid email address",
            ))) as Arc<dyn Constraint>)
        }));
        registry.register(FieldType::new("checkbox").transformer(|_| {
            Some(Arc::new(CheckboxTransformer) as Arc<dyn DataTransformer>)
        }));
        registry.register(FieldType::new("choice").constraint(|options| {
            let Some(Value::Map(choices)) = options.get("choices") else {
                return None;
            };
            let allowed = choices.values().cloned().collect::<Vec<_>>();
            Some(Arc::new(OneOf::new(
                allowed,
                invalid_message(options, "the selected choice is not valid"),
            )) as Arc<dyn Constraint>)
        }));
        registry.register(FieldType::new("number").transformer(|_| {
            Some(Arc::new(NumberTransformer) as Arc<dyn DataTransformer>)
        }));
        registry.register(FieldType::new("group"));
        registry
    }

    pub fn register(&mut self, field_type: FieldType) {
        self.types.insert(field_type.id.clone(), field_type);
    }

    pub fn contains(&self, type_id: &str) -> bool {
        self.types.contains_key(type_id)
    }

    pub fn resolve(&self, type_id: &str) -> FormResult<ResolvedType> {
        let mut chain = Vec::new();
        let mut seen = BTreeSet::new();
        let mut current = Some(type_id.to_string());
        while let Some(id) = current.take() {
            if !seen.insert(id.clone()) {
                return Err(FormError::CyclicType(id));
            }
            let field_type = self
                .types
                .get(&id)
                .ok_or_else(|| FormError::UnknownType(id.clone()))?;
            current = field_type.parent.clone();
            chain.push(field_type);
        }

        let mut options = Options::new();
        let mut transformers = Vec::new();
        let mut constraints = Vec::new();
        for field_type in chain.iter().rev() {
            for (key, value) in &field_type.defaults {
                options.insert(key.clone(), value.clone());
            }
            transformers.extend(field_type.transformers.iter().cloned());
            constraints.extend(field_type.constraints.iter().cloned());
        }
        Ok(ResolvedType {
            options,
            transformers,
            constraints,
        })
    }
}

pub(crate) fn option_text<'a>(options: &'a Options, key: &str) -> Option<&'a str> {
    options.get(key).and_then(Value::as_text)
}

pub(crate) fn option_is_true(options: &Options, key: &str) -> bool {
    options.get(key).and_then(Value::as_bool).unwrap_or(false)
}

pub(crate) fn invalid_message(options: &Options, fallback: &str) -> String {
    option_text(options, "invalid_message")
        .unwrap_or(fallback)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_with_chain() -> TypeRegistry {
        let mut registry = TypeRegistry::with_core_types();
        registry.register(
            FieldType::new("position")
                .parent("choice")
                .default_option("label", "Desired position")
                .default_option("placeholder", "Choose a position")
                .default_option(
                    "choices",
                    Value::map([("Developer", "developer"), ("Tester", "tester")]),
                ),
        );
        registry
    }

    #[test]
    fn child_defaults_overwrite_ancestor_defaults() {
        let mut registry = TypeRegistry::new();
        registry.register(
            FieldType::new("base")
                .default_option("label", "base label")
                .default_option("trim", true),
        );
        registry.register(
            FieldType::new("derived")
                .parent("base")
                .default_option("label", "derived label"),
        );

        let resolved = registry.resolve("derived").expect("chain resolves");
        assert_eq!(option_text(resolved.options(), "label"), Some("derived label"));
        assert!(option_is_true(resolved.options(), "trim"));
    }

    #[test]
    fn factories_concatenate_ancestor_to_leaf() {
        let registry = registry_with_chain();
        let resolved = registry.resolve("position").expect("position resolves");
        let (options, _, constraints) = resolved.into_parts();
        assert_eq!(constraints.len(), 1);
        let constraint = constraints[0](&options).expect("choices are configured");
        let path = crate::value::FieldPath::root("form").child("position");
        assert_eq!(constraint.evaluate(&path, &Value::text("manager")).len(), 1);
        assert!(constraint
            .evaluate(&path, &Value::text("developer"))
            .is_empty());
    }

    #[test]
    fn unknown_type_and_unknown_parent_fail_fast() {
        let registry = TypeRegistry::with_core_types();
        let error = registry.resolve("mystery").expect_err("unknown type fails");
        assert_eq!(error, FormError::UnknownType("mystery".into()));

        let mut registry = TypeRegistry::new();
        registry.register(FieldType::new("orphan").parent("missing"));
        let error = registry.resolve("orphan").expect_err("unknown parent fails");
        assert_eq!(error, FormError::UnknownType("missing".into()));
    }

    #[test]
    fn cyclic_chains_are_detected() {
        let mut registry = TypeRegistry::new();
        registry.register(FieldType::new("a").parent("b"));
        registry.register(FieldType::new("b").parent("a"));
        let error = registry.resolve("a").expect_err("cycle fails");
        assert_eq!(error, FormError::CyclicType("a".into()));
    }
}
