use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use rust_decimal::Decimal;
use serde::{Serialize, Serializer};

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Text(String),
    Number(Decimal),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    pub fn text(value: impl Into<String>) -> Self {
        Value::Text(value.into())
    }

    pub fn map<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        Value::Map(
            entries
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<Decimal> {
        match self {
            Value::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_blank(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Bool(value) => !value,
            Value::Text(text) => text.trim().is_empty(),
            Value::Number(_) => false,
            Value::List(items) => items.is_empty(),
            Value::Map(entries) => entries.is_empty(),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<Decimal> for Value {
    fn from(value: Decimal) -> Self {
        Value::Number(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Number(Decimal::from(value))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Record {
    values: BTreeMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get_path(&self, segments: &[String]) -> Option<&Value> {
        let (first, rest) = segments.split_first()?;
        let mut current = self.values.get(first)?;
        for segment in rest {
            match current {
                Value::Map(entries) => current = entries.get(segment)?,
                _ => return None,
            }
        }
        Some(current)
    }

    pub fn set_path(&mut self, segments: &[String], value: Value) {
        let Some((first, rest)) = segments.split_first() else {
            return;
        };
        if rest.is_empty() {
            self.values.insert(first.clone(), value);
            return;
        }
        let entry = self
            .values
            .entry(first.clone())
            .or_insert_with(|| Value::Map(BTreeMap::new()));
        set_in(entry, rest, value);
    }
}

fn set_in(target: &mut Value, segments: &[String], value: Value) {
    let Some((first, rest)) = segments.split_first() else {
        return;
    };
    if !matches!(target, Value::Map(_)) {
        *target = Value::Map(BTreeMap::new());
    }
    let Value::Map(entries) = target else {
        return;
    };
    if rest.is_empty() {
        entries.insert(first.clone(), value);
        return;
    }
    let entry = entries
        .entry(first.clone())
        .or_insert_with(|| Value::Map(BTreeMap::new()));
    set_in(entry, rest, value);
}

#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    pub fn root(name: impl Into<String>) -> Self {
        Self {
            segments: vec![name.into()],
        }
    }

    pub fn child(&self, name: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(name.into());
        Self { segments }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn record_segments(&self) -> &[String] {
        &self.segments[1..]
    }
}

impl Display for FieldPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let Some((first, rest)) = self.segments.split_first() else {
            return Ok(());
        };
        f.write_str(first)?;
        for segment in rest {
            write!(f, "[{segment}]")?;
        }
        Ok(())
    }
}

impl Serialize for FieldPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawInput {
    values: BTreeMap<String, Value>,
}

impl RawInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        }
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.values.remove(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_renders_bracket_notation() {
        let path = FieldPath::root("registration")
            .child("address")
            .child("city");
        assert_eq!(path.to_string(), "registration[address][city]");
        assert_eq!(path.record_segments(), ["address", "city"]);
    }

    #[test]
    fn record_addresses_nested_values_by_path() {
        let mut record = Record::new();
        record.set_path(
            &["address".into(), "city".into()],
            Value::text("Marseille"),
        );
        assert_eq!(
            record.get_path(&["address".into(), "city".into()]),
            Some(&Value::text("Marseille"))
        );
        assert_eq!(record.get_path(&["address".into(), "zip".into()]), None);

        record.set_path(&["address".into(), "city".into()], Value::text("Paris"));
        assert_eq!(
            record.get_path(&["address".into(), "city".into()]),
            Some(&Value::text("Paris"))
        );
    }

    #[test]
    fn blankness_matches_form_semantics() {
        assert!(Value::Null.is_blank());
        assert!(Value::Bool(false).is_blank());
        assert!(Value::text("   ").is_blank());
        assert!(!Value::Bool(true).is_blank());
        assert!(!Value::text("x").is_blank());
        assert!(!Value::from(0i64).is_blank());
    }
}
