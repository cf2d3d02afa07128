//! Client-side catalog of the observation spaces one service instance
//! exposes, with per-space translation, formatting, and default-value
//! metadata.

use std::fmt;
use std::sync::Arc;

use optforge_core::spaces::Space;
use optforge_core::value::Value;
use optforge_proto::common::v1 as common;
use optforge_proto::service::v1::ObservationSpace;

use crate::grpc::conversions::{EventConverter, proto_to_space};
use crate::grpc::error::ConversionError;

type TranslateFn = Arc<dyn Fn(&common::Event) -> Result<Value, ConversionError> + Send + Sync>;
type RenderFn = Arc<dyn Fn(&Value) -> String + Send + Sync>;

/// One named observation space: its host space descriptor plus how to turn
/// a raw wire observation into a host value and a display string.
///
/// The index is the position in the service's fixed catalog; it is only
/// meaningful within the service instance the spec came from.
#[derive(Clone)]
pub struct ObservationSpaceSpec {
    pub id: String,
    pub index: usize,
    pub space: Space,
    /// Whether recomputing against unchanged state yields the same value.
    /// Callers use this to decide caching policy.
    pub deterministic: bool,
    pub platform_dependent: bool,
    /// Returned in place of a computed observation when computation is
    /// impossible (e.g. after termination), for callers that opt in.
    pub default_value: Option<Value>,
    translate: TranslateFn,
    render: RenderFn,
}

impl ObservationSpaceSpec {
    pub fn from_proto(
        index: usize,
        proto: &ObservationSpace,
        converter: &EventConverter,
    ) -> Result<Self, ConversionError> {
        let space_proto = proto
            .space
            .as_ref()
            .ok_or_else(|| ConversionError::MissingField {
                field: "ObservationSpace.space".to_string(),
            })?;
        if space_proto.name.is_empty() {
            return Err(ConversionError::MissingField {
                field: "ObservationSpace.space.name".to_string(),
            });
        }
        let default_value = proto
            .default_observation
            .as_ref()
            .map(|event| converter.to_host(event))
            .transpose()?;
        let translate: TranslateFn = {
            let converter = converter.clone();
            Arc::new(move |event| converter.to_host(event))
        };
        Ok(Self {
            id: space_proto.name.clone(),
            index,
            space: proto_to_space(space_proto)?,
            deterministic: proto.deterministic,
            platform_dependent: proto.platform_dependent,
            default_value,
            translate,
            render: Arc::new(|value| format!("{value:?}")),
        })
    }

    /// Translate a raw wire observation into this space's host value.
    pub fn translate(&self, event: &common::Event) -> Result<Value, ConversionError> {
        (self.translate)(event)
    }

    pub fn render(&self, value: &Value) -> String {
        (self.render)(value)
    }

    /// Derive a new space whose translation runs `translate` after this
    /// space's own. Unspecified attributes are inherited; the derived
    /// default value is the translation of the base default, so derivation
    /// order is observable through it.
    pub fn make_derived<F>(
        &self,
        id: impl Into<String>,
        translate: F,
    ) -> Result<Self, ConversionError>
    where
        F: Fn(Value) -> Result<Value, ConversionError> + Send + Sync + 'static,
    {
        let translate = Arc::new(translate);
        let base = self.translate.clone();
        let chained: TranslateFn = {
            let translate = translate.clone();
            Arc::new(move |event| translate(base(event)?))
        };
        let default_value = self
            .default_value
            .clone()
            .map(|value| translate(value))
            .transpose()?;
        Ok(Self {
            id: id.into(),
            index: self.index,
            space: self.space.clone(),
            deterministic: self.deterministic,
            platform_dependent: self.platform_dependent,
            default_value,
            translate: chained,
            render: self.render.clone(),
        })
    }

    pub fn with_space(mut self, space: Space) -> Self {
        self.space = space;
        self
    }

    pub fn with_deterministic(mut self, deterministic: bool) -> Self {
        self.deterministic = deterministic;
        self
    }

    pub fn with_platform_dependent(mut self, platform_dependent: bool) -> Self {
        self.platform_dependent = platform_dependent;
        self
    }

    pub fn with_default_value(mut self, default_value: Value) -> Self {
        self.default_value = Some(default_value);
        self
    }

    pub fn with_render<F>(mut self, render: F) -> Self
    where
        F: Fn(&Value) -> String + Send + Sync + 'static,
    {
        self.render = Arc::new(render);
        self
    }
}

/// Equality ignores the translate/render callbacks: two specs are the same
/// catalog entry if their identity and metadata agree.
impl PartialEq for ObservationSpaceSpec {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.index == other.index
            && self.space == other.space
            && self.deterministic == other.deterministic
            && self.platform_dependent == other.platform_dependent
    }
}

impl fmt::Debug for ObservationSpaceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservationSpaceSpec")
            .field("id", &self.id)
            .field("index", &self.index)
            .finish_non_exhaustive()
    }
}

/// Ordered catalog of observation space specs, in service index order.
/// Derived spaces register after the base entries.
#[derive(Debug, Clone, Default)]
pub struct ObservationView {
    specs: Vec<ObservationSpaceSpec>,
}

impl ObservationView {
    pub fn from_proto(
        spaces: &[ObservationSpace],
        converter: &EventConverter,
    ) -> Result<Self, ConversionError> {
        let specs = spaces
            .iter()
            .enumerate()
            .map(|(index, space)| ObservationSpaceSpec::from_proto(index, space, converter))
            .collect::<Result<_, _>>()?;
        Ok(Self { specs })
    }

    pub fn get(&self, id: &str) -> Option<&ObservationSpaceSpec> {
        self.specs.iter().find(|spec| spec.id == id)
    }

    pub fn add_derived(&mut self, spec: ObservationSpaceSpec) {
        self.specs.push(spec);
    }

    pub fn specs(&self) -> &[ObservationSpaceSpec] {
        &self.specs
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}
