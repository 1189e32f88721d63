//! Dynamic result values built incrementally during matching.
//!
//! The engine populates a [`Value::Struct`] per composite rule; each
//! successful capture writes into exactly one field slot of the innermost
//! enclosing struct. Sequence-kinded slots accumulate, scalar slots are
//! set, text slots concatenate.

use crate::error::Error;
use crate::schema::FieldKind;
use crate::token::Position;
use std::collections::HashMap;
use std::fmt;

/// A dynamically typed result value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Absent / no value
    #[default]
    Nil,
    /// Boolean value (presence flags)
    Bool(bool),
    /// Integer value
    Int(i64),
    /// Float value
    Float(f64),
    /// String value
    Str(String),
    /// Ordered sequence of values
    List(Vec<Value>),
    /// A populated composite
    Struct {
        /// Name of the composite's struct definition
        name: String,
        /// Field slots, by name; unset fields are simply absent
        fields: HashMap<String, Value>,
    },
}

impl Value {
    /// An empty struct value for the named composite.
    pub fn strct(name: impl Into<String>) -> Self {
        Value::Struct {
            name: name.into(),
            fields: HashMap::new(),
        }
    }

    /// As a string slice, if this is a `Str`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// As an integer, if this is an `Int`.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// As a float, if this is a `Float`.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(x) => Some(*x),
            _ => None,
        }
    }

    /// As a boolean, if this is a `Bool`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// A field of a struct value, if present.
    pub fn field(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Struct { fields, .. } => fields.get(name),
            _ => None,
        }
    }

    /// The elements of a list value.
    pub fn items(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Whether this is `Nil`.
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// The struct name, if this is a struct value.
    pub fn struct_name(&self) -> Option<&str> {
        match self {
            Value::Struct { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Write captured values into a field slot of this struct.
    ///
    /// Sequence kinds append one element per value; `Text` concatenates
    /// token texts into the existing slot; scalar kinds set the slot.
    /// Coercion failure is a hard [`Error::Capture`].
    pub(crate) fn bind_field(
        &mut self,
        field: &str,
        kind: &FieldKind,
        values: Vec<Value>,
        pos: Position,
    ) -> Result<(), Error> {
        let fields = match self {
            Value::Struct { fields, .. } => fields,
            // Only struct values own field slots.
            _ => return Ok(()),
        };
        match kind {
            FieldKind::List(elem) => {
                let slot = fields
                    .entry(field.to_string())
                    .or_insert_with(|| Value::List(Vec::new()));
                if let Value::List(items) = slot {
                    for value in values {
                        items.push(coerce(field, elem, value, pos)?);
                    }
                }
                Ok(())
            }
            FieldKind::Flag => {
                fields.insert(field.to_string(), Value::Bool(true));
                Ok(())
            }
            FieldKind::Text => {
                let slot = fields
                    .entry(field.to_string())
                    .or_insert_with(|| Value::Str(String::new()));
                if let Value::Str(s) = slot {
                    for value in values {
                        if let Value::Str(text) = value {
                            s.push_str(&text);
                        }
                    }
                }
                Ok(())
            }
            _ => {
                if let Some(value) = values.into_iter().next() {
                    let value = coerce(field, kind, value, pos)?;
                    fields.insert(field.to_string(), value);
                }
                Ok(())
            }
        }
    }
}

/// Coerce one produced value to a field kind.
fn coerce(field: &str, kind: &FieldKind, value: Value, pos: Position) -> Result<Value, Error> {
    match kind {
        FieldKind::Text | FieldKind::Struct(_) => Ok(value),
        FieldKind::Flag => Ok(Value::Bool(true)),
        FieldKind::Int => {
            let text = value.as_str().unwrap_or_default().to_string();
            text.parse::<i64>().map(Value::Int).map_err(|_| Error::Capture {
                field: field.to_string(),
                message: format!("{:?} is not a valid integer", text),
                pos,
            })
        }
        FieldKind::Float => {
            let text = value.as_str().unwrap_or_default().to_string();
            text.parse::<f64>()
                .map(Value::Float)
                .map_err(|_| Error::Capture {
                    field: field.to_string(),
                    message: format!("{:?} is not a valid number", text),
                    pos,
                })
        }
        FieldKind::List(elem) => coerce(field, elem, value, pos),
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => write!(f, "{:?}", s),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Struct { name, fields } => {
                write!(f, "{}(", name)?;
                let mut names: Vec<&String> = fields.keys().collect();
                names.sort();
                for (i, key) in names.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key, fields[*key])?;
                }
                write!(f, ")")
            }
        }
    }
}
