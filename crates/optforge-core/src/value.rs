//! Host-typed counterparts of the wire value model.

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

/// Element type of a tensor, box, or sequence, named after the wire tensor
/// families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dtype {
    Boolean,
    Byte,
    Int64,
    Float,
    Double,
    String,
}

impl Dtype {
    pub fn as_str(self) -> &'static str {
        match self {
            Dtype::Boolean => "boolean",
            Dtype::Byte => "byte",
            Dtype::Int64 => "int64",
            Dtype::Float => "float",
            Dtype::Double => "double",
            Dtype::String => "string",
        }
    }
}

impl fmt::Display for Dtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{len} values do not fit shape {shape:?}")]
pub struct ShapeError {
    pub shape: Vec<i64>,
    pub len: usize,
}

/// Dense row-major tensor. The shape travels exactly as it appears on the
/// wire; `values.len() == product(shape)` is checked at construction and
/// holds for every constructed tensor.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor<T> {
    shape: Vec<i64>,
    values: Vec<T>,
}

impl<T> Tensor<T> {
    pub fn new(shape: Vec<i64>, values: Vec<T>) -> Result<Self, ShapeError> {
        if shape.iter().any(|&dim| dim < 0) {
            return Err(ShapeError {
                shape,
                len: values.len(),
            });
        }
        let expected: i64 = shape.iter().product();
        if values.len() as i64 != expected {
            return Err(ShapeError {
                shape,
                len: values.len(),
            });
        }
        Ok(Self { shape, values })
    }

    /// One-dimensional tensor over `values`.
    pub fn flat(values: Vec<T>) -> Self {
        Self {
            shape: vec![values.len() as i64],
            values,
        }
    }

    pub fn shape(&self) -> &[i64] {
        &self.shape
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn into_parts(self) -> (Vec<i64>, Vec<T>) {
        (self.shape, self.values)
    }
}

impl<T: Eq> Eq for Tensor<T> {}

/// Host-typed counterpart of the wire `Event`: exactly the same closed set
/// of variants, carried as native Rust values.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int64(i64),
    Float(f32),
    Double(f64),
    String(String),
    Bytes(Vec<u8>),
    BooleanTensor(Tensor<bool>),
    ByteTensor(Tensor<i8>),
    Int64Tensor(Tensor<i64>),
    FloatTensor(Tensor<f32>),
    DoubleTensor(Tensor<f64>),
    StringTensor(Tensor<String>),
    List(Vec<Value>),
    Dict(HashMap<String, Value>),
}

impl Value {
    /// Short variant name, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Int64(_) => "int64",
            Value::Float(_) => "float",
            Value::Double(_) => "double",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::BooleanTensor(_) => "boolean tensor",
            Value::ByteTensor(_) => "byte tensor",
            Value::Int64Tensor(_) => "int64 tensor",
            Value::FloatTensor(_) => "float tensor",
            Value::DoubleTensor(_) => "double tensor",
            Value::StringTensor(_) => "string tensor",
            Value::List(_) => "list",
            Value::Dict(_) => "dict",
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int64(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Double(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}
