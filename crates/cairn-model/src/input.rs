//! Named slots on a block: fields plus an optional connection.

use crate::connection::{Connection, ConnectionKind};

/// What a named input slot accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// Holds a value block via an input-value connection.
    Value,
    /// Holds a statement stack via an input-statement connection.
    Statement,
    /// Holds fields only; no connection. Used for label-only rows.
    Dummy,
}

/// The kinds of fields that can sit inline on an input row.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    /// Static text; not editable, not serialized.
    Label,
    /// Free-form editable text.
    Text,
    /// Editable number.
    Number,
    /// One value out of a fixed option list of (label, value) pairs.
    Dropdown(Vec<(String, String)>),
    /// A fixed-size icon; not editable, not serialized.
    Icon,
}

impl FieldKind {
    /// Editable fields round-trip through the serialized form; static ones
    /// are part of the block definition and do not.
    pub fn is_serializable(&self) -> bool {
        !matches!(self, FieldKind::Label | FieldKind::Icon)
    }
}

/// One field on an input row.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    name: String,
    kind: FieldKind,
    value: String,
}

impl Field {
    pub fn new(name: impl Into<String>, kind: FieldKind, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            value: value.into(),
        }
    }

    pub fn label(text: impl Into<String>) -> Self {
        let text = text.into();
        Self::new(text.clone(), FieldKind::Label, text)
    }

    pub fn icon(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Icon, String::new())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub(crate) fn set_value(&mut self, value: impl Into<String>) {
        self.value = value.into();
    }
}

/// A named slot on a block: an ordered row of fields followed by at most one
/// connection socket. Input order on the block is render-significant.
#[derive(Debug, Clone, PartialEq)]
pub struct Input {
    name: String,
    kind: InputKind,
    connection: Option<Connection>,
    fields: Vec<Field>,
}

impl Input {
    /// Creates a value input with an optional type check.
    pub fn value(name: impl Into<String>, check: Option<Vec<String>>) -> Self {
        Self {
            name: name.into(),
            kind: InputKind::Value,
            connection: Some(Connection::new(ConnectionKind::InputValue, check)),
            fields: Vec::new(),
        }
    }

    /// Creates a statement input with an optional type check.
    pub fn statement(name: impl Into<String>, check: Option<Vec<String>>) -> Self {
        Self {
            name: name.into(),
            kind: InputKind::Statement,
            connection: Some(Connection::new(ConnectionKind::InputStatement, check)),
            fields: Vec::new(),
        }
    }

    /// Creates a field-only row.
    pub fn dummy(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: InputKind::Dummy,
            connection: None,
            fields: Vec::new(),
        }
    }

    /// Appends a field to this input's row, returning self for chaining.
    pub fn with_field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> InputKind {
        self.kind
    }

    pub fn connection(&self) -> Option<&Connection> {
        self.connection.as_ref()
    }

    pub(crate) fn connection_mut(&mut self) -> Option<&mut Connection> {
        self.connection.as_mut()
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub(crate) fn fields_mut(&mut self) -> &mut [Field] {
        &mut self.fields
    }

    pub(crate) fn set_fields(&mut self, fields: Vec<Field>) {
        self.fields = fields;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_input_has_value_connection() {
        let input = Input::value("X", Some(vec!["Number".into()]));
        let conn = input.connection().unwrap();
        assert_eq!(conn.kind(), ConnectionKind::InputValue);
        assert_eq!(conn.check(), Some(&["Number".to_string()][..]));
    }

    #[test]
    fn test_dummy_input_has_no_connection() {
        let input = Input::dummy("NAME").with_field(Field::label("when started"));
        assert!(input.connection().is_none());
        assert_eq!(input.fields().len(), 1);
    }

    #[test]
    fn test_field_serializability() {
        assert!(!Field::label("if").kind().is_serializable());
        assert!(!Field::icon("pen").kind().is_serializable());
        assert!(Field::new("NUM", FieldKind::Number, "10").kind().is_serializable());
    }
}
