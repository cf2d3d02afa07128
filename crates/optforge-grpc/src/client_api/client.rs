//! Thin typed wrapper over the generated CompilerService client: wire
//! messages in and out, host values where the observation registry applies.

use optforge_core::value::Value;
use optforge_proto::common::v1 as common;
use optforge_proto::service::v1::{
    AddBenchmarkRequest, Benchmark, EndSessionRequest, ForkSessionRequest, GetSpacesReply,
    GetSpacesRequest, GetVersionReply, GetVersionRequest, SendSessionParameterRequest,
    SessionParameter, StartSessionReply, StartSessionRequest, StepReply, StepRequest,
    compiler_service_client::CompilerServiceClient,
};
use tonic::transport::Channel;

use crate::client_api::observation::{ObservationSpaceSpec, ObservationView};
use crate::grpc::conversions::EventConverter;
use crate::grpc::error::{ConversionError, GrpcError};

type Result<T> = std::result::Result<T, GrpcError>;

pub struct CompilerClient {
    inner: CompilerServiceClient<Channel>,
    converter: EventConverter,
}

impl CompilerClient {
    pub fn new(channel: Channel) -> Self {
        Self::with_converter(channel, EventConverter::default())
    }

    /// Use a custom converter, e.g. one with extra opaque decoders.
    pub fn with_converter(channel: Channel, converter: EventConverter) -> Self {
        Self {
            inner: CompilerServiceClient::new(channel),
            converter,
        }
    }

    pub async fn version(&mut self) -> Result<GetVersionReply> {
        let reply = self
            .inner
            .get_version(GetVersionRequest {})
            .await
            .map_err(Box::new)?;
        Ok(reply.into_inner())
    }

    pub async fn spaces(&mut self) -> Result<GetSpacesReply> {
        let reply = self
            .inner
            .get_spaces(GetSpacesRequest {})
            .await
            .map_err(Box::new)?;
        Ok(reply.into_inner())
    }

    /// Fetch the observation catalog and build the client-side registry.
    pub async fn observation_view(&mut self) -> Result<ObservationView> {
        let spaces = self.spaces().await?.observation_space_list;
        Ok(ObservationView::from_proto(&spaces, &self.converter)?)
    }

    pub async fn start_session(&mut self, request: StartSessionRequest) -> Result<StartSessionReply> {
        let reply = self.inner.start_session(request).await.map_err(Box::new)?;
        Ok(reply.into_inner())
    }

    pub async fn fork_session(&mut self, session_id: i64) -> Result<i64> {
        let reply = self
            .inner
            .fork_session(ForkSessionRequest { session_id })
            .await
            .map_err(Box::new)?;
        Ok(reply.into_inner().session_id)
    }

    pub async fn step(&mut self, request: StepRequest) -> Result<StepReply> {
        let reply = self.inner.step(request).await.map_err(Box::new)?;
        Ok(reply.into_inner())
    }

    /// Compute one observation and translate it through the spec's chain.
    pub async fn observe(
        &mut self,
        session_id: i64,
        spec: &ObservationSpaceSpec,
    ) -> Result<Value> {
        let reply = self
            .step(StepRequest {
                session_id,
                action: vec![],
                observation_space: vec![spec.index as i32],
            })
            .await?;
        let event: &common::Event =
            reply
                .observation
                .first()
                .ok_or_else(|| ConversionError::MissingField {
                    field: "StepReply.observation".to_string(),
                })?;
        Ok(spec.translate(event)?)
    }

    pub async fn end_session(&mut self, session_id: i64) -> Result<i32> {
        let reply = self
            .inner
            .end_session(EndSessionRequest { session_id })
            .await
            .map_err(Box::new)?;
        Ok(reply.into_inner().remaining_sessions)
    }

    pub async fn add_benchmarks(&mut self, benchmark: Vec<Benchmark>) -> Result<()> {
        self.inner
            .add_benchmark(AddBenchmarkRequest { benchmark })
            .await
            .map_err(Box::new)?;
        Ok(())
    }

    /// Send ordered out-of-band key/value parameters; replies come back in
    /// the same order.
    pub async fn send_session_parameters(
        &mut self,
        session_id: i64,
        parameters: Vec<(String, String)>,
    ) -> Result<Vec<String>> {
        let parameter = parameters
            .into_iter()
            .map(|(key, value)| SessionParameter { key, value })
            .collect();
        let reply = self
            .inner
            .send_session_parameter(SendSessionParameterRequest {
                session_id,
                parameter,
            })
            .await
            .map_err(Box::new)?;
        Ok(reply.into_inner().reply)
    }
}
