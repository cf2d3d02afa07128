//! Bidirectional conversion between the wire value/space messages and the
//! host-typed model in `optforge_core`.
//!
//! Every conversion is a pure function over no shared mutable state, so the
//! whole module is reentrant and safe to use concurrently across sessions.
//! The closed oneofs are matched exhaustively; only the type-erased
//! `Opaque` payload goes through an open decoder registry. Failures are
//! surfaced as [`ConversionError`]s, never coerced to defaults.

use std::collections::HashMap;
use std::sync::Arc;

use optforge_core::spaces::{
    BoxSpace, ScalarRange, ScalarSpace, SequenceSpace, Space, SpaceKind,
};
use optforge_core::value::{Tensor, Value};
use optforge_proto::common::v1 as common;

use crate::grpc::error::ConversionError;

// ---------------------------------------------------------------------------
// Tensors
//
// One dedicated pair per scalar type. Shape is copied verbatim; the
// row-major flat values travel unchanged. Byte tensors pack their values
// into a raw byte buffer where every other type uses a repeated field.

pub fn proto_to_boolean_tensor(
    tensor: &common::BooleanTensor,
) -> Result<Tensor<bool>, ConversionError> {
    Ok(Tensor::new(tensor.shape.clone(), tensor.values.clone())?)
}

pub fn boolean_tensor_to_proto(tensor: &Tensor<bool>) -> common::BooleanTensor {
    common::BooleanTensor {
        shape: tensor.shape().to_vec(),
        values: tensor.values().to_vec(),
    }
}

pub fn proto_to_byte_tensor(tensor: &common::ByteTensor) -> Result<Tensor<i8>, ConversionError> {
    let values = tensor.values.iter().map(|&byte| byte as i8).collect();
    Ok(Tensor::new(tensor.shape.clone(), values)?)
}

pub fn byte_tensor_to_proto(tensor: &Tensor<i8>) -> common::ByteTensor {
    common::ByteTensor {
        shape: tensor.shape().to_vec(),
        values: tensor.values().iter().map(|&value| value as u8).collect(),
    }
}

pub fn proto_to_int64_tensor(
    tensor: &common::Int64Tensor,
) -> Result<Tensor<i64>, ConversionError> {
    Ok(Tensor::new(tensor.shape.clone(), tensor.values.clone())?)
}

pub fn int64_tensor_to_proto(tensor: &Tensor<i64>) -> common::Int64Tensor {
    common::Int64Tensor {
        shape: tensor.shape().to_vec(),
        values: tensor.values().to_vec(),
    }
}

pub fn proto_to_float_tensor(
    tensor: &common::FloatTensor,
) -> Result<Tensor<f32>, ConversionError> {
    Ok(Tensor::new(tensor.shape.clone(), tensor.values.clone())?)
}

pub fn float_tensor_to_proto(tensor: &Tensor<f32>) -> common::FloatTensor {
    common::FloatTensor {
        shape: tensor.shape().to_vec(),
        values: tensor.values().to_vec(),
    }
}

pub fn proto_to_double_tensor(
    tensor: &common::DoubleTensor,
) -> Result<Tensor<f64>, ConversionError> {
    Ok(Tensor::new(tensor.shape.clone(), tensor.values.clone())?)
}

pub fn double_tensor_to_proto(tensor: &Tensor<f64>) -> common::DoubleTensor {
    common::DoubleTensor {
        shape: tensor.shape().to_vec(),
        values: tensor.values().to_vec(),
    }
}

pub fn proto_to_string_tensor(
    tensor: &common::StringTensor,
) -> Result<Tensor<String>, ConversionError> {
    Ok(Tensor::new(tensor.shape.clone(), tensor.values.clone())?)
}

pub fn string_tensor_to_proto(tensor: &Tensor<String>) -> common::StringTensor {
    common::StringTensor {
        shape: tensor.shape().to_vec(),
        values: tensor.values().to_vec(),
    }
}

// ---------------------------------------------------------------------------
// Opaque payloads

/// Format identifier of payloads decoded by the built-in JSON decoder.
pub const JSON_OPAQUE_FORMAT: &str = "json://";

pub type OpaqueDecoder = Arc<dyn Fn(&[u8]) -> Result<Value, ConversionError> + Send + Sync>;

/// Registry resolving `Opaque.format` identifiers to decoders.
///
/// Unpacking an identifier with no registered decoder is an error with no
/// partial result; extension types register their own decoders instead of
/// relying on a fallback.
#[derive(Clone)]
pub struct OpaqueDecoders {
    decoders: HashMap<String, OpaqueDecoder>,
}

impl OpaqueDecoders {
    pub fn empty() -> Self {
        Self {
            decoders: HashMap::new(),
        }
    }

    pub fn register(&mut self, format: impl Into<String>, decoder: OpaqueDecoder) {
        self.decoders.insert(format.into(), decoder);
    }

    pub fn unpack(&self, opaque: &common::Opaque) -> Result<Value, ConversionError> {
        let decoder =
            self.decoders
                .get(&opaque.format)
                .ok_or_else(|| ConversionError::UnknownOpaqueFormat {
                    format: opaque.format.clone(),
                })?;
        decoder(&opaque.data)
    }
}

impl Default for OpaqueDecoders {
    /// The pre-wired registry: `json://` payloads decode through serde_json
    /// into nested host values.
    fn default() -> Self {
        let mut decoders = Self::empty();
        decoders.register(JSON_OPAQUE_FORMAT, Arc::new(decode_json_opaque));
        decoders
    }
}

fn decode_json_opaque(data: &[u8]) -> Result<Value, ConversionError> {
    let json: serde_json::Value =
        serde_json::from_slice(data).map_err(|e| ConversionError::InvalidData {
            message: format!("opaque json payload: {e}"),
        })?;
    json_to_value(json)
}

fn json_to_value(json: serde_json::Value) -> Result<Value, ConversionError> {
    match json {
        serde_json::Value::Null => Err(ConversionError::InvalidData {
            message: "json null has no host value representation".to_string(),
        }),
        serde_json::Value::Bool(value) => Ok(Value::Bool(value)),
        serde_json::Value::Number(number) => {
            if let Some(value) = number.as_i64() {
                Ok(Value::Int64(value))
            } else if let Some(value) = number.as_f64() {
                Ok(Value::Double(value))
            } else {
                Err(ConversionError::InvalidData {
                    message: format!("json number {number} has no host value representation"),
                })
            }
        }
        serde_json::Value::String(value) => Ok(Value::String(value)),
        serde_json::Value::Array(items) => Ok(Value::List(
            items.into_iter().map(json_to_value).collect::<Result<_, _>>()?,
        )),
        serde_json::Value::Object(entries) => Ok(Value::Dict(
            entries
                .into_iter()
                .map(|(key, value)| Ok::<_, ConversionError>((key, json_to_value(value)?)))
                .collect::<Result<_, _>>()?,
        )),
    }
}

// ---------------------------------------------------------------------------
// Events

/// Wire->host converter over every `Event` variant, recursively.
///
/// `EventConverter::default()` is the fully pre-wired graph used everywhere
/// unless a caller supplies a custom one (e.g. with extra opaque decoders).
#[derive(Clone, Default)]
pub struct EventConverter {
    opaque: OpaqueDecoders,
}

impl EventConverter {
    pub fn new(opaque: OpaqueDecoders) -> Self {
        Self { opaque }
    }

    pub fn register_opaque(&mut self, format: impl Into<String>, decoder: OpaqueDecoder) {
        self.opaque.register(format, decoder);
    }

    pub fn to_host(&self, event: &common::Event) -> Result<Value, ConversionError> {
        use common::event::Value as EventValue;

        let value = event
            .value
            .as_ref()
            .ok_or_else(|| ConversionError::MissingOneofVariant {
                message: "Event".to_string(),
            })?;
        Ok(match value {
            EventValue::BooleanValue(v) => Value::Bool(*v),
            EventValue::Int64Value(v) => Value::Int64(*v),
            EventValue::FloatValue(v) => Value::Float(*v),
            EventValue::DoubleValue(v) => Value::Double(*v),
            EventValue::StringValue(v) => Value::String(v.clone()),
            EventValue::BytesValue(v) => Value::Bytes(v.clone()),
            EventValue::BooleanTensor(t) => Value::BooleanTensor(proto_to_boolean_tensor(t)?),
            EventValue::ByteTensor(t) => Value::ByteTensor(proto_to_byte_tensor(t)?),
            EventValue::Int64Tensor(t) => Value::Int64Tensor(proto_to_int64_tensor(t)?),
            EventValue::FloatTensor(t) => Value::FloatTensor(proto_to_float_tensor(t)?),
            EventValue::DoubleTensor(t) => Value::DoubleTensor(proto_to_double_tensor(t)?),
            EventValue::StringTensor(t) => Value::StringTensor(proto_to_string_tensor(t)?),
            EventValue::EventList(list) => Value::List(
                list.events
                    .iter()
                    .map(|event| self.to_host(event))
                    .collect::<Result<_, _>>()?,
            ),
            EventValue::EventDict(dict) => Value::Dict(
                dict.events
                    .iter()
                    .map(|(key, event)| Ok::<_, ConversionError>((key.clone(), self.to_host(event)?)))
                    .collect::<Result<_, _>>()?,
            ),
            EventValue::Opaque(opaque) => self.opaque.unpack(opaque)?,
        })
    }
}

/// Host->wire inverse: picks the `Event` field from the value's runtime
/// variant. Total over [`Value`], recursing through containers.
pub fn value_to_proto(value: &Value) -> common::Event {
    use common::event::Value as EventValue;

    let value = match value {
        Value::Bool(v) => EventValue::BooleanValue(*v),
        Value::Int64(v) => EventValue::Int64Value(*v),
        Value::Float(v) => EventValue::FloatValue(*v),
        Value::Double(v) => EventValue::DoubleValue(*v),
        Value::String(v) => EventValue::StringValue(v.clone()),
        Value::Bytes(v) => EventValue::BytesValue(v.clone()),
        Value::BooleanTensor(t) => EventValue::BooleanTensor(boolean_tensor_to_proto(t)),
        Value::ByteTensor(t) => EventValue::ByteTensor(byte_tensor_to_proto(t)),
        Value::Int64Tensor(t) => EventValue::Int64Tensor(int64_tensor_to_proto(t)),
        Value::FloatTensor(t) => EventValue::FloatTensor(float_tensor_to_proto(t)),
        Value::DoubleTensor(t) => EventValue::DoubleTensor(double_tensor_to_proto(t)),
        Value::StringTensor(t) => EventValue::StringTensor(string_tensor_to_proto(t)),
        Value::List(items) => EventValue::EventList(common::ListEvent {
            events: items.iter().map(value_to_proto).collect(),
        }),
        Value::Dict(entries) => EventValue::EventDict(common::DictEvent {
            events: entries
                .iter()
                .map(|(key, value)| (key.clone(), value_to_proto(value)))
                .collect(),
        }),
    };
    common::Event { value: Some(value) }
}

// ---------------------------------------------------------------------------
// Scalar ranges

pub fn proto_to_boolean_range(range: &common::BooleanRange) -> ScalarRange<bool> {
    ScalarRange::new(range.min, range.max)
}

pub fn boolean_range_to_proto(range: &ScalarRange<bool>) -> common::BooleanRange {
    common::BooleanRange {
        min: range.min,
        max: range.max,
    }
}

pub fn proto_to_int64_range(range: &common::Int64Range) -> ScalarRange<i64> {
    ScalarRange::new(range.min, range.max)
}

pub fn int64_range_to_proto(range: &ScalarRange<i64>) -> common::Int64Range {
    common::Int64Range {
        min: range.min,
        max: range.max,
    }
}

pub fn proto_to_float_range(range: &common::FloatRange) -> ScalarRange<f32> {
    ScalarRange::new(range.min, range.max)
}

pub fn float_range_to_proto(range: &ScalarRange<f32>) -> common::FloatRange {
    common::FloatRange {
        min: range.min,
        max: range.max,
    }
}

pub fn proto_to_double_range(range: &common::DoubleRange) -> ScalarRange<f64> {
    ScalarRange::new(range.min, range.max)
}

pub fn double_range_to_proto(range: &ScalarRange<f64>) -> common::DoubleRange {
    common::DoubleRange {
        min: range.min,
        max: range.max,
    }
}

/// A missing length range means the length is unbounded.
fn proto_to_length_range(range: Option<&common::Int64Range>) -> ScalarRange<i64> {
    range.map(proto_to_int64_range).unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Discrete spaces

pub fn proto_to_discrete_space(space: &common::DiscreteSpace) -> Result<SpaceKind, ConversionError> {
    if space.n <= 0 {
        return Err(ConversionError::InvalidValue {
            field: "DiscreteSpace.n".to_string(),
            value: space.n.to_string(),
        });
    }
    Ok(SpaceKind::Discrete { n: space.n })
}

pub fn discrete_space_to_proto(n: i64) -> common::DiscreteSpace {
    common::DiscreteSpace { n }
}

pub fn proto_to_named_discrete_space(
    space: &common::NamedDiscreteSpace,
) -> Result<SpaceKind, ConversionError> {
    let mut seen = std::collections::HashSet::new();
    for name in &space.names {
        if !seen.insert(name) {
            return Err(ConversionError::InvalidValue {
                field: "NamedDiscreteSpace.names".to_string(),
                value: format!("duplicate name '{name}'"),
            });
        }
    }
    Ok(SpaceKind::NamedDiscrete {
        names: space.names.clone(),
    })
}

pub fn named_discrete_space_to_proto(names: &[String]) -> common::NamedDiscreteSpace {
    common::NamedDiscreteSpace {
        names: names.to_vec(),
    }
}

// ---------------------------------------------------------------------------
// Boxes
//
// Mirrors the tensor families; low and high must share a shape, and the
// host representation keeps the dtype tag via the BoxSpace variant.

fn check_box_shapes<T>(
    low: &Tensor<T>,
    high: &Tensor<T>,
    message: &str,
) -> Result<(), ConversionError> {
    if low.shape() != high.shape() {
        return Err(ConversionError::InvalidData {
            message: format!(
                "{message}: low shape {:?} != high shape {:?}",
                low.shape(),
                high.shape()
            ),
        });
    }
    Ok(())
}

fn required<'a, T>(field: Option<&'a T>, name: &str) -> Result<&'a T, ConversionError> {
    field.ok_or_else(|| ConversionError::MissingField {
        field: name.to_string(),
    })
}

pub fn proto_to_boolean_box(space: &common::BooleanBox) -> Result<BoxSpace, ConversionError> {
    let low = proto_to_boolean_tensor(required(space.low.as_ref(), "BooleanBox.low")?)?;
    let high = proto_to_boolean_tensor(required(space.high.as_ref(), "BooleanBox.high")?)?;
    check_box_shapes(&low, &high, "BooleanBox")?;
    Ok(BoxSpace::Boolean { low, high })
}

pub fn proto_to_byte_box(space: &common::ByteBox) -> Result<BoxSpace, ConversionError> {
    let low = proto_to_byte_tensor(required(space.low.as_ref(), "ByteBox.low")?)?;
    let high = proto_to_byte_tensor(required(space.high.as_ref(), "ByteBox.high")?)?;
    check_box_shapes(&low, &high, "ByteBox")?;
    Ok(BoxSpace::Byte { low, high })
}

pub fn proto_to_int64_box(space: &common::Int64Box) -> Result<BoxSpace, ConversionError> {
    let low = proto_to_int64_tensor(required(space.low.as_ref(), "Int64Box.low")?)?;
    let high = proto_to_int64_tensor(required(space.high.as_ref(), "Int64Box.high")?)?;
    check_box_shapes(&low, &high, "Int64Box")?;
    Ok(BoxSpace::Int64 { low, high })
}

pub fn proto_to_float_box(space: &common::FloatBox) -> Result<BoxSpace, ConversionError> {
    let low = proto_to_float_tensor(required(space.low.as_ref(), "FloatBox.low")?)?;
    let high = proto_to_float_tensor(required(space.high.as_ref(), "FloatBox.high")?)?;
    check_box_shapes(&low, &high, "FloatBox")?;
    Ok(BoxSpace::Float { low, high })
}

pub fn proto_to_double_box(space: &common::DoubleBox) -> Result<BoxSpace, ConversionError> {
    let low = proto_to_double_tensor(required(space.low.as_ref(), "DoubleBox.low")?)?;
    let high = proto_to_double_tensor(required(space.high.as_ref(), "DoubleBox.high")?)?;
    check_box_shapes(&low, &high, "DoubleBox")?;
    Ok(BoxSpace::Double { low, high })
}

pub fn box_space_to_proto(space: &BoxSpace) -> common::space::Value {
    use common::space::Value as SpaceValue;

    match space {
        BoxSpace::Boolean { low, high } => SpaceValue::BooleanBox(common::BooleanBox {
            low: Some(boolean_tensor_to_proto(low)),
            high: Some(boolean_tensor_to_proto(high)),
        }),
        BoxSpace::Byte { low, high } => SpaceValue::ByteBox(common::ByteBox {
            low: Some(byte_tensor_to_proto(low)),
            high: Some(byte_tensor_to_proto(high)),
        }),
        BoxSpace::Int64 { low, high } => SpaceValue::Int64Box(common::Int64Box {
            low: Some(int64_tensor_to_proto(low)),
            high: Some(int64_tensor_to_proto(high)),
        }),
        BoxSpace::Float { low, high } => SpaceValue::FloatBox(common::FloatBox {
            low: Some(float_tensor_to_proto(low)),
            high: Some(float_tensor_to_proto(high)),
        }),
        BoxSpace::Double { low, high } => SpaceValue::DoubleBox(common::DoubleBox {
            low: Some(double_tensor_to_proto(low)),
            high: Some(double_tensor_to_proto(high)),
        }),
    }
}

// ---------------------------------------------------------------------------
// Sequences

pub fn proto_to_boolean_sequence_space(space: &common::BooleanSequenceSpace) -> SequenceSpace {
    SequenceSpace::Boolean {
        length_range: proto_to_length_range(space.length_range.as_ref()),
        scalar_range: space.scalar_range.as_ref().map(proto_to_boolean_range),
    }
}

pub fn proto_to_byte_sequence_space(space: &common::ByteSequenceSpace) -> SequenceSpace {
    SequenceSpace::Byte {
        length_range: proto_to_length_range(space.length_range.as_ref()),
        scalar_range: space.scalar_range.as_ref().map(proto_to_int64_range),
    }
}

pub fn proto_to_int64_sequence_space(space: &common::Int64SequenceSpace) -> SequenceSpace {
    SequenceSpace::Int64 {
        length_range: proto_to_length_range(space.length_range.as_ref()),
        scalar_range: space.scalar_range.as_ref().map(proto_to_int64_range),
    }
}

pub fn proto_to_float_sequence_space(space: &common::FloatSequenceSpace) -> SequenceSpace {
    SequenceSpace::Float {
        length_range: proto_to_length_range(space.length_range.as_ref()),
        scalar_range: space.scalar_range.as_ref().map(proto_to_float_range),
    }
}

pub fn proto_to_double_sequence_space(space: &common::DoubleSequenceSpace) -> SequenceSpace {
    SequenceSpace::Double {
        length_range: proto_to_length_range(space.length_range.as_ref()),
        scalar_range: space.scalar_range.as_ref().map(proto_to_double_range),
    }
}

pub fn proto_to_string_sequence_space(space: &common::StringSequenceSpace) -> SequenceSpace {
    SequenceSpace::String {
        length_range: proto_to_length_range(space.length_range.as_ref()),
    }
}

pub fn sequence_space_to_proto(space: &SequenceSpace) -> common::space::Value {
    use common::space::Value as SpaceValue;

    match space {
        SequenceSpace::Boolean {
            length_range,
            scalar_range,
        } => SpaceValue::BooleanSequence(common::BooleanSequenceSpace {
            length_range: Some(int64_range_to_proto(length_range)),
            scalar_range: scalar_range.as_ref().map(boolean_range_to_proto),
        }),
        SequenceSpace::Byte {
            length_range,
            scalar_range,
        } => SpaceValue::ByteSequence(common::ByteSequenceSpace {
            length_range: Some(int64_range_to_proto(length_range)),
            scalar_range: scalar_range.as_ref().map(int64_range_to_proto),
        }),
        SequenceSpace::Int64 {
            length_range,
            scalar_range,
        } => SpaceValue::Int64Sequence(common::Int64SequenceSpace {
            length_range: Some(int64_range_to_proto(length_range)),
            scalar_range: scalar_range.as_ref().map(int64_range_to_proto),
        }),
        SequenceSpace::Float {
            length_range,
            scalar_range,
        } => SpaceValue::FloatSequence(common::FloatSequenceSpace {
            length_range: Some(int64_range_to_proto(length_range)),
            scalar_range: scalar_range.as_ref().map(float_range_to_proto),
        }),
        SequenceSpace::Double {
            length_range,
            scalar_range,
        } => SpaceValue::DoubleSequence(common::DoubleSequenceSpace {
            length_range: Some(int64_range_to_proto(length_range)),
            scalar_range: scalar_range.as_ref().map(double_range_to_proto),
        }),
        SequenceSpace::String { length_range } => {
            SpaceValue::StringSequence(common::StringSequenceSpace {
                length_range: Some(int64_range_to_proto(length_range)),
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Spaces

/// Convert a wire `Space` to the host model, recursing through lists and
/// dicts. An unpopulated oneof, a non-positive discrete cardinality, or a
/// shape-mismatched box is an error.
pub fn proto_to_space(space: &common::Space) -> Result<Space, ConversionError> {
    use common::space::Value as SpaceValue;

    let value = space
        .value
        .as_ref()
        .ok_or_else(|| ConversionError::MissingOneofVariant {
            message: "Space".to_string(),
        })?;
    let kind = match value {
        SpaceValue::Discrete(s) => proto_to_discrete_space(s)?,
        SpaceValue::NamedDiscrete(s) => proto_to_named_discrete_space(s)?,
        SpaceValue::BooleanValue(r) => SpaceKind::Scalar(ScalarSpace::Boolean(proto_to_boolean_range(r))),
        SpaceValue::Int64Value(r) => SpaceKind::Scalar(ScalarSpace::Int64(proto_to_int64_range(r))),
        SpaceValue::FloatValue(r) => SpaceKind::Scalar(ScalarSpace::Float(proto_to_float_range(r))),
        SpaceValue::DoubleValue(r) => SpaceKind::Scalar(ScalarSpace::Double(proto_to_double_range(r))),
        SpaceValue::StringValue(s) => SpaceKind::String {
            length_range: proto_to_length_range(s.length_range.as_ref()),
        },
        SpaceValue::BooleanSequence(s) => SpaceKind::Sequence(proto_to_boolean_sequence_space(s)),
        SpaceValue::ByteSequence(s) => SpaceKind::Sequence(proto_to_byte_sequence_space(s)),
        SpaceValue::BytesSequence(s) => SpaceKind::Bytes {
            length_range: proto_to_length_range(s.length_range.as_ref()),
        },
        SpaceValue::Int64Sequence(s) => SpaceKind::Sequence(proto_to_int64_sequence_space(s)),
        SpaceValue::FloatSequence(s) => SpaceKind::Sequence(proto_to_float_sequence_space(s)),
        SpaceValue::DoubleSequence(s) => SpaceKind::Sequence(proto_to_double_sequence_space(s)),
        SpaceValue::StringSequence(s) => SpaceKind::Sequence(proto_to_string_sequence_space(s)),
        SpaceValue::BooleanBox(b) => SpaceKind::Box(proto_to_boolean_box(b)?),
        SpaceValue::ByteBox(b) => SpaceKind::Box(proto_to_byte_box(b)?),
        SpaceValue::Int64Box(b) => SpaceKind::Box(proto_to_int64_box(b)?),
        SpaceValue::FloatBox(b) => SpaceKind::Box(proto_to_float_box(b)?),
        SpaceValue::DoubleBox(b) => SpaceKind::Box(proto_to_double_box(b)?),
        SpaceValue::SpaceList(list) => SpaceKind::List(
            list.spaces
                .iter()
                .map(proto_to_space)
                .collect::<Result<_, _>>()?,
        ),
        SpaceValue::SpaceDict(dict) => SpaceKind::Dict(
            dict.spaces
                .iter()
                .map(|(key, space)| Ok::<_, ConversionError>((key.clone(), proto_to_space(space)?)))
                .collect::<Result<_, _>>()?,
        ),
    };
    Ok(Space {
        name: if space.name.is_empty() {
            None
        } else {
            Some(space.name.clone())
        },
        kind,
    })
}

/// Host->wire inverse of [`proto_to_space`]. Total over the host model.
pub fn space_to_proto(space: &Space) -> common::Space {
    use common::space::Value as SpaceValue;

    let value = match &space.kind {
        SpaceKind::Discrete { n } => SpaceValue::Discrete(discrete_space_to_proto(*n)),
        SpaceKind::NamedDiscrete { names } => {
            SpaceValue::NamedDiscrete(named_discrete_space_to_proto(names))
        }
        SpaceKind::Scalar(scalar) => match scalar {
            ScalarSpace::Boolean(r) => SpaceValue::BooleanValue(boolean_range_to_proto(r)),
            ScalarSpace::Int64(r) => SpaceValue::Int64Value(int64_range_to_proto(r)),
            ScalarSpace::Float(r) => SpaceValue::FloatValue(float_range_to_proto(r)),
            ScalarSpace::Double(r) => SpaceValue::DoubleValue(double_range_to_proto(r)),
        },
        SpaceKind::Box(space) => box_space_to_proto(space),
        SpaceKind::Sequence(space) => sequence_space_to_proto(space),
        SpaceKind::String { length_range } => SpaceValue::StringValue(common::StringSpace {
            length_range: Some(int64_range_to_proto(length_range)),
        }),
        SpaceKind::Bytes { length_range } => {
            SpaceValue::BytesSequence(common::BytesSequenceSpace {
                length_range: Some(int64_range_to_proto(length_range)),
            })
        }
        SpaceKind::List(spaces) => SpaceValue::SpaceList(common::ListSpace {
            spaces: spaces.iter().map(space_to_proto).collect(),
        }),
        SpaceKind::Dict(spaces) => SpaceValue::SpaceDict(common::DictSpace {
            spaces: spaces
                .iter()
                .map(|(key, space)| (key.clone(), space_to_proto(space)))
                .collect(),
        }),
    };
    common::Space {
        name: space.name.clone().unwrap_or_default(),
        value: Some(value),
    }
}
