//! Server-side runtime for the CompilerService RPC surface: owns the live
//! session table and drives the session protocol against a
//! [`SessionFactory`].

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use optforge_core::SessionError;
use optforge_core::session::{SessionFactory, SessionHandle};
use optforge_proto::service::v1::{
    ActionSpace, AddBenchmarkReply, AddBenchmarkRequest, Benchmark, EndSessionReply,
    EndSessionRequest, ForkSessionReply, ForkSessionRequest, GetSpacesReply, GetSpacesRequest,
    GetVersionReply, GetVersionRequest, ObservationSpace, SendSessionParameterReply,
    SendSessionParameterRequest, StartSessionReply, StartSessionRequest, StepReply, StepRequest,
    compiler_service_server,
};
use tokio::sync::Mutex;
use tonic::{Request, Response, Status};
use tracing::{debug, info, warn};

use crate::grpc::error::{ConversionError, GrpcError};

struct SessionEntry {
    handle: SessionHandle,
    /// Owned scratch directory, removed when the session ends. Forked
    /// sessions manage their own resources and carry no directory here.
    working_dir: Option<PathBuf>,
}

/// gRPC service over a single [`SessionFactory`].
///
/// Each session is driven sequentially by its owning caller; distinct
/// sessions only share the brief map lock, so they step concurrently.
pub struct RuntimeCompilerService {
    factory: Arc<dyn SessionFactory>,
    working_root: PathBuf,
    action_spaces: Vec<ActionSpace>,
    observation_spaces: Vec<ObservationSpace>,
    sessions: Mutex<HashMap<i64, Arc<Mutex<SessionEntry>>>>,
    benchmarks: Mutex<HashMap<String, Benchmark>>,
    next_session_id: AtomicI64,
}

impl RuntimeCompilerService {
    /// The space catalogs are fixed for the lifetime of the service; space
    /// indices in requests resolve against them.
    pub fn new(factory: Arc<dyn SessionFactory>, working_root: PathBuf) -> Self {
        let action_spaces = factory.action_spaces();
        let observation_spaces = factory.observation_spaces();
        Self {
            factory,
            working_root,
            action_spaces,
            observation_spaces,
            sessions: Mutex::new(HashMap::new()),
            benchmarks: Mutex::new(HashMap::new()),
            next_session_id: AtomicI64::new(0),
        }
    }

    async fn session(&self, session_id: i64) -> Result<Arc<Mutex<SessionEntry>>, GrpcError> {
        let sessions = self.sessions.lock().await;
        sessions
            .get(&session_id)
            .cloned()
            .ok_or(GrpcError::SessionNotFound { session_id })
    }

    fn observation_space(&self, index: i32) -> Result<&ObservationSpace, GrpcError> {
        self.observation_spaces
            .get(usize::try_from(index).map_err(|_| GrpcError::UnknownSpaceIndex { index })?)
            .ok_or(GrpcError::UnknownSpaceIndex { index })
    }

    /// A benchmark with an inline program is used as-is (and cached under
    /// its uri for reuse); one without must name a previously added uri.
    async fn resolve_benchmark(
        &self,
        benchmark: Option<Benchmark>,
    ) -> Result<Benchmark, GrpcError> {
        let benchmark = benchmark.ok_or_else(|| {
            GrpcError::Conversion(ConversionError::MissingField {
                field: "StartSessionRequest.benchmark".to_string(),
            })
        })?;
        if benchmark.program.is_some() {
            if !benchmark.uri.is_empty() {
                let mut store = self.benchmarks.lock().await;
                store.insert(benchmark.uri.clone(), benchmark.clone());
            }
            return Ok(benchmark);
        }
        let store = self.benchmarks.lock().await;
        store
            .get(&benchmark.uri)
            .cloned()
            .ok_or_else(|| GrpcError::UnknownBenchmark {
                uri: benchmark.uri.clone(),
            })
    }

    async fn remove_working_dir(working_dir: Option<&PathBuf>) {
        if let Some(dir) = working_dir
            && let Err(error) = tokio::fs::remove_dir_all(dir).await
        {
            warn!(dir = %dir.display(), %error, "failed to remove session working directory");
        }
    }
}

#[tonic::async_trait]
impl compiler_service_server::CompilerService for RuntimeCompilerService {
    async fn get_version(
        &self,
        _request: Request<GetVersionRequest>,
    ) -> Result<Response<GetVersionReply>, Status> {
        Ok(Response::new(GetVersionReply {
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            compiler_version: self.factory.compiler_version(),
        }))
    }

    async fn get_spaces(
        &self,
        _request: Request<GetSpacesRequest>,
    ) -> Result<Response<GetSpacesReply>, Status> {
        Ok(Response::new(GetSpacesReply {
            action_space_list: self.action_spaces.clone(),
            observation_space_list: self.observation_spaces.clone(),
        }))
    }

    async fn start_session(
        &self,
        request: Request<StartSessionRequest>,
    ) -> Result<Response<StartSessionReply>, Status> {
        let request = request.into_inner();
        let benchmark = self.resolve_benchmark(request.benchmark).await?;
        let action_space = self
            .action_spaces
            .get(usize::try_from(request.action_space).map_err(|_| {
                GrpcError::UnknownSpaceIndex {
                    index: request.action_space,
                }
            })?)
            .cloned()
            .ok_or(GrpcError::UnknownSpaceIndex {
                index: request.action_space,
            })?;

        let session_id = self.next_session_id.fetch_add(1, Ordering::SeqCst);
        let working_dir = self.working_root.join(format!("session-{session_id}"));
        tokio::fs::create_dir_all(&working_dir)
            .await
            .map_err(|e| GrpcError::Session(SessionError::Io(e)))?;

        let benchmark_uri = benchmark.uri.clone();
        let session = match self
            .factory
            .start(&working_dir, action_space.clone(), benchmark)
            .await
        {
            Ok(session) => session,
            Err(err) => {
                Self::remove_working_dir(Some(&working_dir)).await;
                return Err(GrpcError::Session(err).into());
            }
        };
        let mut handle = SessionHandle::new(session, action_space);

        // Initial actions are part of setup: any failure aborts creation so
        // that no partially-active session persists.
        for action in &request.initial_action {
            if let Err(err) = handle.apply_action(action).await {
                let _ = handle.close().await;
                Self::remove_working_dir(Some(&working_dir)).await;
                return Err(GrpcError::Session(SessionError::SetupFailure(format!(
                    "initial action failed: {err}"
                )))
                .into());
            }
        }
        handle.activate();

        let mut observation = Vec::with_capacity(request.observation_space.len());
        for index in &request.observation_space {
            let space = match self.observation_space(*index) {
                Ok(space) => space,
                Err(err) => {
                    let _ = handle.close().await;
                    Self::remove_working_dir(Some(&working_dir)).await;
                    return Err(err.into());
                }
            };
            match handle.observe(space).await {
                Ok(event) => observation.push(event),
                Err(err) => {
                    let _ = handle.close().await;
                    Self::remove_working_dir(Some(&working_dir)).await;
                    return Err(GrpcError::Session(err).into());
                }
            }
        }

        let new_action_space = handle.action_space().clone();
        let entry = Arc::new(Mutex::new(SessionEntry {
            handle,
            working_dir: Some(working_dir),
        }));
        self.sessions.lock().await.insert(session_id, entry);

        info!(session_id, benchmark = %benchmark_uri, "started compilation session");
        Ok(Response::new(StartSessionReply {
            session_id,
            new_action_space: Some(new_action_space),
            observation,
        }))
    }

    async fn fork_session(
        &self,
        request: Request<ForkSessionRequest>,
    ) -> Result<Response<ForkSessionReply>, Status> {
        let request = request.into_inner();
        let parent = self.session(request.session_id).await?;
        // Holding the parent's lock for the whole fork keeps it atomic with
        // respect to concurrent mutation of the parent.
        let parent = parent.lock().await;
        let child = parent.handle.fork().await.map_err(GrpcError::Session)?;

        let child_id = self.next_session_id.fetch_add(1, Ordering::SeqCst);
        let entry = Arc::new(Mutex::new(SessionEntry {
            handle: child,
            working_dir: None,
        }));
        self.sessions.lock().await.insert(child_id, entry);

        info!(parent_id = request.session_id, child_id, "forked compilation session");
        Ok(Response::new(ForkSessionReply {
            session_id: child_id,
        }))
    }

    async fn step(&self, request: Request<StepRequest>) -> Result<Response<StepReply>, Status> {
        let request = request.into_inner();
        let entry = self.session(request.session_id).await?;
        let mut entry = entry.lock().await;

        let mut end_of_session = false;
        let mut new_action_space = None;
        let mut action_had_no_effect = Vec::with_capacity(request.action.len());
        for action in &request.action {
            let outcome = entry
                .handle
                .apply_action(action)
                .await
                .map_err(GrpcError::Session)?;
            action_had_no_effect.push(outcome.action_had_no_effect);
            if outcome.new_action_space.is_some() {
                new_action_space = outcome.new_action_space;
            }
            if outcome.end_of_session {
                end_of_session = true;
                break;
            }
        }

        let mut observation = Vec::with_capacity(request.observation_space.len());
        for index in &request.observation_space {
            let space = self.observation_space(*index)?;
            let event = entry
                .handle
                .observe(space)
                .await
                .map_err(GrpcError::Session)?;
            observation.push(event);
        }

        debug!(
            session_id = request.session_id,
            actions = request.action.len(),
            end_of_session,
            "stepped compilation session"
        );
        Ok(Response::new(StepReply {
            end_of_session,
            new_action_space,
            action_had_no_effect,
            observation,
        }))
    }

    async fn end_session(
        &self,
        request: Request<EndSessionRequest>,
    ) -> Result<Response<EndSessionReply>, Status> {
        let request = request.into_inner();
        let entry = {
            let mut sessions = self.sessions.lock().await;
            sessions
                .remove(&request.session_id)
                .ok_or(GrpcError::SessionNotFound {
                    session_id: request.session_id,
                })?
        };

        let mut entry = entry.lock().await;
        let result = entry.handle.close().await;
        Self::remove_working_dir(entry.working_dir.as_ref()).await;
        result.map_err(GrpcError::Session)?;

        let remaining_sessions = self.sessions.lock().await.len() as i32;
        info!(session_id = request.session_id, remaining_sessions, "ended compilation session");
        Ok(Response::new(EndSessionReply { remaining_sessions }))
    }

    async fn add_benchmark(
        &self,
        request: Request<AddBenchmarkRequest>,
    ) -> Result<Response<AddBenchmarkReply>, Status> {
        let request = request.into_inner();
        let mut store = self.benchmarks.lock().await;
        for benchmark in request.benchmark {
            if benchmark.uri.is_empty() {
                return Err(GrpcError::Conversion(ConversionError::MissingField {
                    field: "Benchmark.uri".to_string(),
                })
                .into());
            }
            debug!(uri = %benchmark.uri, "registered benchmark");
            store.insert(benchmark.uri.clone(), benchmark);
        }
        Ok(Response::new(AddBenchmarkReply {}))
    }

    async fn send_session_parameter(
        &self,
        request: Request<SendSessionParameterRequest>,
    ) -> Result<Response<SendSessionParameterReply>, Status> {
        let request = request.into_inner();
        let entry = self.session(request.session_id).await?;
        let mut entry = entry.lock().await;

        let mut reply = Vec::with_capacity(request.parameter.len());
        for parameter in &request.parameter {
            let answer = entry
                .handle
                .handle_session_parameter(&parameter.key, &parameter.value)
                .await
                .map_err(GrpcError::Session)?
                .ok_or_else(|| {
                    GrpcError::Session(SessionError::UnknownParameter(parameter.key.clone()))
                })?;
            reply.push(answer);
        }
        Ok(Response::new(SendSessionParameterReply { reply }))
    }
}
