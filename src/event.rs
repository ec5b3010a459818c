use std::fmt::{Display, Formatter};

use super::constraint::Violation;
use super::tree::{FieldNode, TreeEditor};
use super::value::{RawInput, Record};

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ListenerError {
    message: String,
}

impl ListenerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Display for ListenerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ListenerError {}

pub type ListenerResult = Result<(), ListenerError>;

pub(crate) type PreBindFn = Box<dyn Fn(&Record, &mut TreeEditor) -> ListenerResult + Send + Sync>;
pub(crate) type PostBindFn = Box<dyn Fn(&Record, &[FieldNode]) -> ListenerResult + Send + Sync>;
pub(crate) type PreSubmitFn = Box<dyn Fn(&mut RawInput) -> ListenerResult + Send + Sync>;
pub(crate) type SubmitFn = Box<dyn Fn(&mut Record) -> ListenerResult + Send + Sync>;
pub(crate) type PostSubmitFn = Box<dyn Fn(&Record, &[Violation]) -> ListenerResult + Send + Sync>;
pub(crate) type ValidCallbackFn = Box<dyn Fn(&Record) + Send + Sync>;

#[derive(Default)]
pub(crate) struct Listeners {
    pub(crate) pre_bind: Vec<PreBindFn>,
    pub(crate) post_bind: Vec<PostBindFn>,
    pub(crate) pre_submit: Vec<PreSubmitFn>,
    pub(crate) submit: Vec<SubmitFn>,
    pub(crate) post_submit: Vec<PostSubmitFn>,
    pub(crate) on_valid: Vec<ValidCallbackFn>,
}
