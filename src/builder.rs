use std::sync::Arc;

use super::constraint::Violation;
use super::csrf::{SessionId, TokenProvider};
use super::event::{ListenerResult, Listeners};
use super::form::{CSRF_FIELD, Form, FormError, FormResult, Protection, SubmitState};
use super::registry::TypeRegistry;
use super::tree::{Field, FieldNode, TreeEditor};
use super::value::{RawInput, Record};

pub struct FormBuilder {
    name: String,
    registry: Arc<TypeRegistry>,
    fields: Vec<Field>,
    listeners: Listeners,
    protection: Option<Protection>,
}

impl FormBuilder {
    pub fn new(name: impl Into<String>, registry: Arc<TypeRegistry>) -> Self {
        Self {
            name: name.into(),
            registry,
            fields: Vec::new(),
            listeners: Listeners::default(),
            protection: None,
        }
    }

    pub fn add(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn remove(mut self, name: &str) -> Self {
        self.fields.retain(|field| field.name() != name);
        self
    }

    pub fn on_pre_bind<F>(mut self, listener: F) -> Self
    where
        F: Fn(&Record, &mut TreeEditor) -> ListenerResult + Send + Sync + 'static,
    {
        self.listeners.pre_bind.push(Box::new(listener));
        self
    }

    pub fn on_post_bind<F>(mut self, listener: F) -> Self
    where
        F: Fn(&Record, &[FieldNode]) -> ListenerResult + Send + Sync + 'static,
    {
        self.listeners.post_bind.push(Box::new(listener));
        self
    }

    pub fn on_pre_submit<F>(mut self, listener: F) -> Self
    where
        F: Fn(&mut RawInput) -> ListenerResult + Send + Sync + 'static,
    {
        self.listeners.pre_submit.push(Box::new(listener));
        self
    }

    pub fn on_submit<F>(mut self, listener: F) -> Self
    where
        F: Fn(&mut Record) -> ListenerResult + Send + Sync + 'static,
    {
        self.listeners.submit.push(Box::new(listener));
        self
    }

    pub fn on_post_submit<F>(mut self, listener: F) -> Self
    where
        F: Fn(&Record, &[Violation]) -> ListenerResult + Send + Sync + 'static,
    {
        self.listeners.post_submit.push(Box::new(listener));
        self
    }

    pub fn on_valid<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Record) + Send + Sync + 'static,
    {
        self.listeners.on_valid.push(Box::new(callback));
        self
    }

    pub fn protect(self, provider: Arc<dyn TokenProvider>, session: SessionId) -> Self {
        self.protect_with_field(provider, session, CSRF_FIELD)
    }

    pub fn protect_with_field(
        mut self,
        provider: Arc<dyn TokenProvider>,
        session: SessionId,
        field: impl Into<String>,
    ) -> Self {
        self.protection = Some(Protection {
            provider,
            session,
            field: field.into(),
        });
        self
    }

    pub fn build(self) -> FormResult<Form> {
        if let Some(protection) = &self.protection {
            if self
                .fields
                .iter()
                .any(|field| field.name() == protection.field)
            {
                return Err(FormError::ReservedFieldName(protection.field.clone()));
            }
        }

        let mut nodes: Vec<FieldNode> = Vec::new();
        for declaration in self.fields {
            if nodes.iter().any(|node| node.name() == declaration.name()) {
                return Err(FormError::DuplicateField(declaration.name().to_string()));
            }
            nodes.push(FieldNode::resolve(declaration, &self.registry)?);
        }

        Ok(Form {
            name: self.name,
            registry: self.registry,
            nodes,
            listeners: self.listeners,
            protection: self.protection,
            state: SubmitState::Unbound,
            record: None,
            violations: Vec::new(),
            csrf_token: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csrf::{CsrfGuard, InMemoryTokenStore};

    fn registry() -> Arc<TypeRegistry> {
        Arc::new(TypeRegistry::with_core_types())
    }

    #[test]
    fn duplicate_root_names_abort_construction() {
        let error = FormBuilder::new("registration", registry())
            .add(Field::new("firstName", "text"))
            .add(Field::new("firstName", "text"))
            .build()
            .expect_err("duplicate names must fail");
        assert_eq!(error, FormError::DuplicateField("firstName".into()));
    }

    #[test]
    fn removed_declarations_never_reach_the_tree() {
        let form = FormBuilder::new("registration", registry())
            .add(Field::new("firstName", "text"))
            .add(Field::new("phone", "text"))
            .remove("phone")
            .build()
            .expect("build succeeds");
        assert_eq!(form.fields().len(), 1);
        assert_eq!(form.fields()[0].name(), "firstName");
    }

    #[test]
    fn unknown_types_fail_at_build_time() {
        let error = FormBuilder::new("registration", registry())
            .add(Field::new("firstName", "mystery"))
            .build()
            .expect_err("unknown type must fail");
        assert_eq!(error, FormError::UnknownType("mystery".into()));
    }

    #[test]
    fn data_fields_cannot_shadow_the_token_field() {
        let provider = Arc::new(CsrfGuard::new(InMemoryTokenStore::new()));
        let error = FormBuilder::new("registration", registry())
            .add(Field::new("csrf_token", "text"))
            .protect(provider, SessionId::new("session-1"))
            .build()
            .expect_err("reserved name must fail");
        assert_eq!(error, FormError::ReservedFieldName("csrf_token".into()));
    }
}
