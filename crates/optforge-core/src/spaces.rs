//! Host-typed space descriptors: the legal domain of a [`Value`], mirroring
//! the wire `Space` family.
//!
//! [`Value`]: crate::value::Value

use std::collections::HashMap;

use crate::value::{Dtype, Tensor};

/// Inclusive scalar bounds. An absent bound is unbounded on that side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScalarRange<T> {
    pub min: Option<T>,
    pub max: Option<T>,
}

impl<T> ScalarRange<T> {
    pub fn new(min: Option<T>, max: Option<T>) -> Self {
        Self { min, max }
    }

    pub fn unbounded() -> Self {
        Self {
            min: None,
            max: None,
        }
    }
}

impl<T> Default for ScalarRange<T> {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl<T: PartialOrd> ScalarRange<T> {
    pub fn contains(&self, value: &T) -> bool {
        if let Some(min) = &self.min
            && value < min
        {
            return false;
        }
        if let Some(max) = &self.max
            && value > max
        {
            return false;
        }
        true
    }
}

/// A single bounded scalar, one variant per wire range family.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarSpace {
    Boolean(ScalarRange<bool>),
    Int64(ScalarRange<i64>),
    Float(ScalarRange<f32>),
    Double(ScalarRange<f64>),
}

impl ScalarSpace {
    pub fn dtype(&self) -> Dtype {
        match self {
            ScalarSpace::Boolean(_) => Dtype::Boolean,
            ScalarSpace::Int64(_) => Dtype::Int64,
            ScalarSpace::Float(_) => Dtype::Float,
            ScalarSpace::Double(_) => Dtype::Double,
        }
    }
}

/// Elementwise tensor bounds. `low` and `high` always share a shape; the
/// conversion layer rejects mismatches before a value is constructed.
#[derive(Debug, Clone, PartialEq)]
pub enum BoxSpace {
    Boolean {
        low: Tensor<bool>,
        high: Tensor<bool>,
    },
    Byte {
        low: Tensor<i8>,
        high: Tensor<i8>,
    },
    Int64 {
        low: Tensor<i64>,
        high: Tensor<i64>,
    },
    Float {
        low: Tensor<f32>,
        high: Tensor<f32>,
    },
    Double {
        low: Tensor<f64>,
        high: Tensor<f64>,
    },
}

impl BoxSpace {
    pub fn dtype(&self) -> Dtype {
        match self {
            BoxSpace::Boolean { .. } => Dtype::Boolean,
            BoxSpace::Byte { .. } => Dtype::Byte,
            BoxSpace::Int64 { .. } => Dtype::Int64,
            BoxSpace::Float { .. } => Dtype::Float,
            BoxSpace::Double { .. } => Dtype::Double,
        }
    }

    pub fn shape(&self) -> &[i64] {
        match self {
            BoxSpace::Boolean { low, .. } => low.shape(),
            BoxSpace::Byte { low, .. } => low.shape(),
            BoxSpace::Int64 { low, .. } => low.shape(),
            BoxSpace::Float { low, .. } => low.shape(),
            BoxSpace::Double { low, .. } => low.shape(),
        }
    }
}

/// Variable-length sequence of scalars: a length range plus, for the typed
/// variants, an optional per-element range.
#[derive(Debug, Clone, PartialEq)]
pub enum SequenceSpace {
    Boolean {
        length_range: ScalarRange<i64>,
        scalar_range: Option<ScalarRange<bool>>,
    },
    Byte {
        length_range: ScalarRange<i64>,
        scalar_range: Option<ScalarRange<i64>>,
    },
    Int64 {
        length_range: ScalarRange<i64>,
        scalar_range: Option<ScalarRange<i64>>,
    },
    Float {
        length_range: ScalarRange<i64>,
        scalar_range: Option<ScalarRange<f32>>,
    },
    Double {
        length_range: ScalarRange<i64>,
        scalar_range: Option<ScalarRange<f64>>,
    },
    String {
        length_range: ScalarRange<i64>,
    },
}

impl SequenceSpace {
    pub fn dtype(&self) -> Dtype {
        match self {
            SequenceSpace::Boolean { .. } => Dtype::Boolean,
            SequenceSpace::Byte { .. } => Dtype::Byte,
            SequenceSpace::Int64 { .. } => Dtype::Int64,
            SequenceSpace::Float { .. } => Dtype::Float,
            SequenceSpace::Double { .. } => Dtype::Double,
            SequenceSpace::String { .. } => Dtype::String,
        }
    }

    pub fn length_range(&self) -> &ScalarRange<i64> {
        match self {
            SequenceSpace::Boolean { length_range, .. }
            | SequenceSpace::Byte { length_range, .. }
            | SequenceSpace::Int64 { length_range, .. }
            | SequenceSpace::Float { length_range, .. }
            | SequenceSpace::Double { length_range, .. }
            | SequenceSpace::String { length_range } => length_range,
        }
    }
}

/// A space descriptor plus its optional name.
#[derive(Debug, Clone, PartialEq)]
pub struct Space {
    pub name: Option<String>,
    pub kind: SpaceKind,
}

impl Space {
    pub fn new(kind: SpaceKind) -> Self {
        Self { name: None, kind }
    }

    pub fn named(name: impl Into<String>, kind: SpaceKind) -> Self {
        Self {
            name: Some(name.into()),
            kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SpaceKind {
    /// `n` choices in `[0, n)`.
    Discrete { n: i64 },
    /// Ordered, distinct names; the action index selects a name.
    NamedDiscrete { names: Vec<String> },
    Scalar(ScalarSpace),
    Box(BoxSpace),
    Sequence(SequenceSpace),
    /// A single string with a bounded length.
    String { length_range: ScalarRange<i64> },
    /// A raw byte buffer with a bounded length.
    Bytes { length_range: ScalarRange<i64> },
    List(Vec<Space>),
    Dict(HashMap<String, Space>),
}

impl SpaceKind {
    /// Number of discrete choices, for the discrete families.
    pub fn cardinality(&self) -> Option<i64> {
        match self {
            SpaceKind::Discrete { n } => Some(*n),
            SpaceKind::NamedDiscrete { names } => Some(names.len() as i64),
            _ => None,
        }
    }
}
