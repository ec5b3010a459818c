use std::fmt::{Display, Formatter};
use std::sync::Arc;

use log::debug;
use serde::Serialize;

use super::constraint::Violation;
use super::csrf::{SessionId, TokenProvider};
use super::event::Listeners;
use super::registry::{Options, TypeRegistry, option_text};
use super::transform::{externalize, internalize};
use super::tree::{FieldNode, TreeEditor};
use super::validation::validate_tree;
use super::value::{FieldPath, RawInput, Record, Value};

pub const CSRF_FIELD: &str = "csrf_token";

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub enum SubmitState {
    Unbound,
    Bound,
    SubmittedInvalid,
    SubmittedValid,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum FormError {
    UnknownType(String),
    CyclicType(String),
    DuplicateField(String),
    ReservedFieldName(String),
    InvalidStateTransition { from: SubmitState, to: SubmitState },
    ListenerFailed(String),
    TokenStore(String),
}

impl Display for FormError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FormError::UnknownType(type_id) => {
                write!(f, "field type '{type_id}' is not registered")
            }
            FormError::CyclicType(type_id) => {
                write!(f, "field type '{type_id}' appears twice in its own parent chain")
            }
            FormError::DuplicateField(name) => {
                write!(f, "field '{name}' is already declared in this scope")
            }
            FormError::ReservedFieldName(name) => {
                write!(f, "field name '{name}' is reserved for the form token")
            }
            FormError::InvalidStateTransition { from, to } => {
                write!(f, "invalid submit state transition: {from:?} -> {to:?}")
            }
            FormError::ListenerFailed(error) => {
                write!(f, "lifecycle listener failed: {error}")
            }
            FormError::TokenStore(error) => write!(f, "token store failed: {error}"),
        }
    }
}

impl std::error::Error for FormError {}

pub type FormResult<T> = Result<T, FormError>;

pub(crate) struct Protection {
    pub(crate) provider: Arc<dyn TokenProvider>,
    pub(crate) session: SessionId,
    pub(crate) field: String,
}

pub struct Form {
    pub(crate) name: String,
    pub(crate) registry: Arc<TypeRegistry>,
    pub(crate) nodes: Vec<FieldNode>,
    pub(crate) listeners: Listeners,
    pub(crate) protection: Option<Protection>,
    pub(crate) state: SubmitState,
    pub(crate) record: Option<Record>,
    pub(crate) violations: Vec<Violation>,
    pub(crate) csrf_token: Option<String>,
}

impl std::fmt::Debug for Form {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Form")
            .field("name", &self.name)
            .field("state", &self.state)
            .field("fields", &self.nodes)
            .field("violations", &self.violations)
            .finish()
    }
}

impl Form {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> SubmitState {
        self.state
    }

    pub fn is_valid(&self) -> bool {
        self.state == SubmitState::SubmittedValid
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn fields(&self) -> &[FieldNode] {
        &self.nodes
    }

    pub fn data(&self) -> Option<&Record> {
        self.record.as_ref()
    }

    pub fn into_record(self) -> Option<Record> {
        self.record
    }

    pub fn csrf_token(&self) -> Option<&str> {
        self.csrf_token.as_deref()
    }

    pub fn bind(&mut self, record: Record) -> FormResult<()> {
        if self.state != SubmitState::Unbound {
            return Err(FormError::InvalidStateTransition {
                from: self.state,
                to: SubmitState::Bound,
            });
        }
        debug!("binding record to form '{}'", self.name);

        let mut editor = TreeEditor::new(std::mem::take(&mut self.nodes), self.registry.clone());
        let mut failure = None;
        for listener in &self.listeners.pre_bind {
            if let Err(error) = listener(&record, &mut editor) {
                failure = Some(error);
                break;
            }
        }
        self.nodes = editor.into_nodes();
        if let Some(error) = failure {
            return Err(FormError::ListenerFailed(error.to_string()));
        }

        let root = FieldPath::root(self.name.clone());
        compute_display(&mut self.nodes, &record, &root);

        if let Some(protection) = &self.protection {
            self.csrf_token = Some(protection.provider.issue(&self.name, &protection.session)?);
        }

        for listener in &self.listeners.post_bind {
            listener(&record, &self.nodes)
                .map_err(|error| FormError::ListenerFailed(error.to_string()))?;
        }

        self.record = Some(record);
        self.state = SubmitState::Bound;
        Ok(())
    }

    pub fn submit(&mut self, raw: RawInput) -> FormResult<()> {
        if self.state != SubmitState::Bound {
            return Err(FormError::InvalidStateTransition {
                from: self.state,
                to: SubmitState::SubmittedInvalid,
            });
        }
        let Some(mut record) = self.record.take() else {
            return Err(FormError::InvalidStateTransition {
                from: self.state,
                to: SubmitState::SubmittedInvalid,
            });
        };

        let mut raw = raw;
        for listener in &self.listeners.pre_submit {
            if let Err(error) = listener(&mut raw) {
                self.record = Some(record);
                return Err(FormError::ListenerFailed(error.to_string()));
            }
        }

        let root = FieldPath::root(self.name.clone());
        let mut violations = Vec::new();
        apply_input(&self.nodes, &raw, &mut record, &root, &mut violations);

        if let Some(protection) = &self.protection {
            let token_path = root.child(protection.field.as_str());
            let supplied = raw
                .get(&token_path.to_string())
                .and_then(Value::as_text)
                .unwrap_or("");
            let verified =
                match protection
                    .provider
                    .verify(&self.name, &protection.session, supplied)
                {
                    Ok(verified) => verified,
                    Err(error) => {
                        self.record = Some(record);
                        return Err(error);
                    }
                };
            if !verified {
                debug!("rejecting forged submission of form '{}'", self.name);
                violations.push(Violation::new(
                    token_path,
                    "the submitted form token is invalid",
                ));
            }
        }

        for listener in &self.listeners.submit {
            if let Err(error) = listener(&mut record) {
                self.record = Some(record);
                return Err(FormError::ListenerFailed(error.to_string()));
            }
        }

        violations.extend(validate_tree(&self.nodes, &record, &root));

        for listener in &self.listeners.post_submit {
            if let Err(error) = listener(&record, &violations) {
                self.record = Some(record);
                return Err(FormError::ListenerFailed(error.to_string()));
            }
        }

        debug!(
            "form '{}' submitted with {} violation(s)",
            self.name,
            violations.len()
        );
        let valid = violations.is_empty();
        self.violations = violations;
        self.record = Some(record);
        self.state = if valid {
            SubmitState::SubmittedValid
        } else {
            SubmitState::SubmittedInvalid
        };
        if valid {
            if let Some(record) = &self.record {
                for callback in &self.listeners.on_valid {
                    callback(record);
                }
            }
        }
        Ok(())
    }

    pub fn view(&self) -> FormView {
        let root = FieldPath::root(self.name.clone());
        FormView {
            name: self.name.clone(),
            state: self.state,
            csrf_token: self.csrf_token.clone(),
            fields: self
                .nodes
                .iter()
                .map(|node| field_view(node, &root, &self.violations))
                .collect(),
        }
    }
}

fn compute_display(nodes: &mut [FieldNode], record: &Record, parent: &FieldPath) {
    for node in nodes {
        let path = parent.child(node.name());
        if node.is_compound() {
            compute_display(node.children_mut(), record, &path);
        } else {
            let value = record
                .get_path(path.record_segments())
                .cloned()
                .unwrap_or(Value::Null);
            let display = externalize(node.transformers(), &value);
            node.set_display(display);
        }
    }
}

fn apply_input(
    nodes: &[FieldNode],
    raw: &RawInput,
    record: &mut Record,
    parent: &FieldPath,
    violations: &mut Vec<Violation>,
) {
    for node in nodes {
        let path = parent.child(node.name());
        if node.is_compound() {
            apply_input(node.children(), raw, record, &path, violations);
            continue;
        }
        let submitted = raw.get(&path.to_string()).cloned().unwrap_or(Value::Null);
        match internalize(node.transformers(), &submitted) {
            Ok(value) => record.set_path(path.record_segments(), value),
            Err(error) => {
                // A failed step leaves the record's field untouched.
                let message = option_text(node.options(), "invalid_message")
                    .map(str::to_string)
                    .unwrap_or_else(|| error.message().to_string());
                violations.push(Violation::new(path, message).with_value(submitted));
            }
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct FieldView {
    pub name: String,
    pub full_name: String,
    pub value: Value,
    pub has_errors: bool,
    pub errors: Vec<String>,
    pub options: Options,
    pub children: Vec<FieldView>,
}

#[derive(Clone, Debug, Serialize)]
pub struct FormView {
    pub name: String,
    pub state: SubmitState,
    pub csrf_token: Option<String>,
    pub fields: Vec<FieldView>,
}

fn field_view(node: &FieldNode, parent: &FieldPath, violations: &[Violation]) -> FieldView {
    let path = parent.child(node.name());
    let errors = violations
        .iter()
        .filter(|violation| violation.path() == &path)
        .map(|violation| violation.message().to_string())
        .collect::<Vec<_>>();
    FieldView {
        name: node.name().to_string(),
        full_name: path.to_string(),
        value: node.display().clone(),
        has_errors: !errors.is_empty(),
        errors,
        options: node.options().clone(),
        children: node
            .children()
            .iter()
            .map(|child| field_view(child, &path, violations))
            .collect(),
    }
}
