mod builder;
mod constraint;
mod csrf;
mod event;
mod form;
mod registry;
mod transform;
mod tree;
mod validation;
mod value;


pub use builder::FormBuilder;
pub use constraint::{Constraint, EmailFormat, MinLength, NotBlank, OneOf, Violation};
pub use csrf::{CsrfGuard, InMemoryTokenStore, SessionId, StoredToken, TokenProvider, TokenStore};
pub use event::{ListenerError, ListenerResult};
pub use form::{CSRF_FIELD, FieldView, Form, FormError, FormResult, FormView, SubmitState};
pub use registry::{
    ConstraintFactory, FieldType, Options, ResolvedType, TransformerFactory, TypeRegistry,
};
pub use transform::{
    CanonicalCase, CaseCanonicalizer, CheckboxTransformer, DataTransformer, NumberTransformer,
    TransformError, Trim,
};
pub use tree::{Field, FieldNode, TreeEditor};
pub use value::{FieldPath, RawInput, Record, Value};
