//! End-to-end tests of the session protocol, driven through a real tonic
//! channel against an in-process server.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use optforge_core::benchmark::write_benchmark;
use optforge_core::error::{Result, SessionError};
use optforge_core::session::{CompilationSession, SessionFactory, StepOutcome};
use optforge_grpc::CompilerClient;
use optforge_grpc::local_server::create_local_channel;
use optforge_proto::common::v1 as common;
use optforge_proto::common::v1::{Event, event, space};
use optforge_proto::service::v1::{
    ActionSpace, Benchmark, EndSessionRequest, File, ObservationSpace, StartSessionRequest,
    StepRequest, compiler_service_client::CompilerServiceClient, file,
};
use tempfile::TempDir;
use tonic::Code;

const PASS_NAMES: [&str; 3] = ["dce", "licm", "inline"];

/// Toy optimization pipeline: actions append named passes to the IR, and a
/// pass applied twice in a row is a no-op.
struct PipelineSession {
    ir: String,
    passes: Vec<String>,
}

impl PipelineSession {
    fn pass_count_by_kind(&self) -> [i64; 3] {
        let mut counts = [0i64; 3];
        for pass in &self.passes {
            if let Some(slot) = PASS_NAMES.iter().position(|name| name == pass) {
                counts[slot] += 1;
            }
        }
        counts
    }
}

#[async_trait]
impl CompilationSession for PipelineSession {
    async fn apply_action(&mut self, action: &Event) -> Result<StepOutcome> {
        let index = match action.value.as_ref() {
            Some(event::Value::Int64Value(index)) => *index as usize,
            other => {
                return Err(SessionError::MalformedAction(format!(
                    "expected int64 action, got {other:?}"
                )));
            }
        };
        let pass = PASS_NAMES[index];
        if self.passes.last().map(String::as_str) == Some(pass) {
            return Ok(StepOutcome {
                action_had_no_effect: true,
                ..Default::default()
            });
        }
        self.passes.push(pass.to_string());
        self.ir.push_str(&format!("\n; pass: {pass}"));
        Ok(StepOutcome::default())
    }

    async fn observe(&self, space: &ObservationSpace) -> Result<Event> {
        let name = space
            .space
            .as_ref()
            .map(|s| s.name.as_str())
            .unwrap_or_default();
        let value = match name {
            "ir" => event::Value::StringValue(self.ir.clone()),
            "pass-count" => event::Value::Int64Value(self.passes.len() as i64),
            "features" => event::Value::Int64Tensor(common::Int64Tensor {
                shape: vec![3],
                values: self.pass_count_by_kind().to_vec(),
            }),
            other => return Err(SessionError::UnknownObservationSpace(other.to_string())),
        };
        Ok(Event { value: Some(value) })
    }

    async fn fork(&self) -> Result<Box<dyn CompilationSession>> {
        Ok(Box::new(PipelineSession {
            ir: self.ir.clone(),
            passes: self.passes.clone(),
        }))
    }

    async fn handle_session_parameter(&mut self, key: &str, value: &str) -> Result<Option<String>> {
        match key {
            "pipeline.reset" => {
                self.passes.clear();
                Ok(Some(value.to_string()))
            }
            _ => Ok(None),
        }
    }
}

struct PipelineFactory;

#[async_trait]
impl SessionFactory for PipelineFactory {
    fn compiler_version(&self) -> String {
        "17.0.1".to_string()
    }

    fn action_spaces(&self) -> Vec<ActionSpace> {
        vec![ActionSpace {
            space: Some(common::Space {
                name: "passes".to_string(),
                value: Some(space::Value::NamedDiscrete(common::NamedDiscreteSpace {
                    names: PASS_NAMES.iter().map(ToString::to_string).collect(),
                })),
            }),
        }]
    }

    fn observation_spaces(&self) -> Vec<ObservationSpace> {
        vec![
            ObservationSpace {
                space: Some(common::Space {
                    name: "ir".to_string(),
                    value: Some(space::Value::StringValue(common::StringSpace {
                        length_range: Some(common::Int64Range {
                            min: Some(0),
                            max: None,
                        }),
                    })),
                }),
                deterministic: true,
                platform_dependent: false,
                default_observation: Some(Event {
                    value: Some(event::Value::StringValue(String::new())),
                }),
            },
            ObservationSpace {
                space: Some(common::Space {
                    name: "pass-count".to_string(),
                    value: Some(space::Value::Int64Value(common::Int64Range {
                        min: Some(0),
                        max: None,
                    })),
                }),
                deterministic: true,
                platform_dependent: false,
                default_observation: Some(Event {
                    value: Some(event::Value::Int64Value(0)),
                }),
            },
            ObservationSpace {
                space: Some(common::Space {
                    name: "features".to_string(),
                    value: Some(space::Value::Int64Box(common::Int64Box {
                        low: Some(common::Int64Tensor {
                            shape: vec![3],
                            values: vec![0, 0, 0],
                        }),
                        high: Some(common::Int64Tensor {
                            shape: vec![3],
                            values: vec![100, 100, 100],
                        }),
                    })),
                }),
                deterministic: true,
                platform_dependent: false,
                default_observation: None,
            },
        ]
    }

    async fn start(
        &self,
        working_dir: &Path,
        _action_space: ActionSpace,
        benchmark: Benchmark,
    ) -> Result<Box<dyn CompilationSession>> {
        let layout = write_benchmark(&benchmark, working_dir).await?;
        let ir = tokio::fs::read_to_string(&layout.program)
            .await
            .map_err(|e| SessionError::SetupFailure(format!("unreadable program: {e}")))?;
        Ok(Box::new(PipelineSession { ir, passes: vec![] }))
    }
}

fn benchmark(uri: &str) -> Benchmark {
    Benchmark {
        uri: uri.to_string(),
        program: Some(File {
            path: "program.ll".to_string(),
            data: Some(file::Data::Contents(b"define i32 @main()".to_vec())),
        }),
        files: vec![],
        dynamic_config: None,
    }
}

fn int64_action(index: i64) -> Event {
    Event {
        value: Some(event::Value::Int64Value(index)),
    }
}

async fn setup() -> (
    CompilerServiceClient<tonic::transport::Channel>,
    CompilerClient,
    TempDir,
    tokio::task::JoinHandle<()>,
) {
    let _ = tracing_subscriber::fmt().try_init();
    let working_root = TempDir::new().expect("temp working root");
    let (channel, server_handle) =
        create_local_channel(Arc::new(PipelineFactory), working_root.path().to_path_buf())
            .await
            .expect("setup local server");
    let raw = CompilerServiceClient::new(channel.clone());
    let client = CompilerClient::new(channel);
    (raw, client, working_root, server_handle)
}

async fn start(raw: &mut CompilerServiceClient<tonic::transport::Channel>, uri: &str) -> i64 {
    raw.start_session(StartSessionRequest {
        benchmark: Some(benchmark(uri)),
        action_space: 0,
        initial_action: vec![],
        observation_space: vec![],
    })
    .await
    .expect("start session")
    .into_inner()
    .session_id
}

async fn observe_ir(
    raw: &mut CompilerServiceClient<tonic::transport::Channel>,
    session_id: i64,
) -> String {
    let reply = raw
        .step(StepRequest {
            session_id,
            action: vec![],
            observation_space: vec![0],
        })
        .await
        .expect("observe ir")
        .into_inner();
    match reply.observation[0].value.as_ref() {
        Some(event::Value::StringValue(ir)) => ir.clone(),
        other => panic!("expected string ir observation, got {other:?}"),
    }
}

#[tokio::test]
async fn version_and_spaces_describe_the_service() {
    let (mut raw, mut client, _root, server) = setup().await;

    let version = client.version().await.expect("get version");
    assert_eq!(version.compiler_version, "17.0.1");
    assert!(!version.service_version.is_empty());

    let spaces = raw
        .get_spaces(optforge_proto::service::v1::GetSpacesRequest {})
        .await
        .expect("get spaces")
        .into_inner();
    assert_eq!(spaces.action_space_list.len(), 1);
    assert_eq!(spaces.observation_space_list.len(), 3);

    server.abort();
}

#[tokio::test]
async fn out_of_range_action_is_rejected_without_mutation() {
    let (mut raw, _client, _root, server) = setup().await;
    let session_id = start(&mut raw, "benchmark://toy/a").await;
    let before = observe_ir(&mut raw, session_id).await;

    let status = raw
        .step(StepRequest {
            session_id,
            action: vec![int64_action(5)],
            observation_space: vec![],
        })
        .await
        .expect_err("out-of-range action must fail");
    assert_eq!(status.code(), Code::InvalidArgument);

    // program state is exactly as it was, and the session is still live
    assert_eq!(observe_ir(&mut raw, session_id).await, before);
    raw.step(StepRequest {
        session_id,
        action: vec![int64_action(0)],
        observation_space: vec![],
    })
    .await
    .expect("session stays usable");

    server.abort();
}

#[tokio::test]
async fn repeated_pass_reports_no_effect_and_leaves_ir_unchanged() {
    let (mut raw, _client, _root, server) = setup().await;
    let session_id = start(&mut raw, "benchmark://toy/b").await;

    let reply = raw
        .step(StepRequest {
            session_id,
            action: vec![int64_action(1), int64_action(1)],
            observation_space: vec![0],
        })
        .await
        .expect("step")
        .into_inner();
    assert_eq!(reply.action_had_no_effect, vec![false, true]);

    let after_first = match reply.observation[0].value.as_ref() {
        Some(event::Value::StringValue(ir)) => ir.clone(),
        other => panic!("expected string observation, got {other:?}"),
    };
    assert!(after_first.ends_with("; pass: licm"));

    server.abort();
}

#[tokio::test]
async fn forked_sessions_are_independent() {
    let (mut raw, _client, _root, server) = setup().await;
    let parent_id = start(&mut raw, "benchmark://toy/c").await;

    raw.step(StepRequest {
        session_id: parent_id,
        action: vec![int64_action(0)],
        observation_space: vec![],
    })
    .await
    .expect("parent step");
    let parent_ir = observe_ir(&mut raw, parent_id).await;

    let child_id = raw
        .fork_session(optforge_proto::service::v1::ForkSessionRequest {
            session_id: parent_id,
        })
        .await
        .expect("fork")
        .into_inner()
        .session_id;
    assert_ne!(child_id, parent_id);

    // diverge only the child
    raw.step(StepRequest {
        session_id: child_id,
        action: vec![int64_action(2)],
        observation_space: vec![],
    })
    .await
    .expect("child step");

    assert_eq!(observe_ir(&mut raw, parent_id).await, parent_ir);
    assert_ne!(observe_ir(&mut raw, child_id).await, parent_ir);

    server.abort();
}

#[tokio::test]
async fn ended_sessions_are_gone() {
    let (mut raw, _client, _root, server) = setup().await;
    let session_id = start(&mut raw, "benchmark://toy/d").await;

    let reply = raw
        .end_session(EndSessionRequest { session_id })
        .await
        .expect("end session")
        .into_inner();
    assert_eq!(reply.remaining_sessions, 0);

    let status = raw
        .end_session(EndSessionRequest { session_id })
        .await
        .expect_err("second end must fail");
    assert_eq!(status.code(), Code::NotFound);

    let status = raw
        .step(StepRequest {
            session_id,
            action: vec![int64_action(0)],
            observation_space: vec![],
        })
        .await
        .expect_err("step after end must fail");
    assert_eq!(status.code(), Code::NotFound);

    server.abort();
}

#[tokio::test]
async fn benchmarks_can_be_added_then_started_by_uri() {
    let (mut raw, mut client, _root, server) = setup().await;

    client
        .add_benchmarks(vec![benchmark("benchmark://toy/stored")])
        .await
        .expect("add benchmark");

    // start by reference: uri only, no inline program
    let reply = raw
        .start_session(StartSessionRequest {
            benchmark: Some(Benchmark {
                uri: "benchmark://toy/stored".to_string(),
                program: None,
                files: vec![],
                dynamic_config: None,
            }),
            action_space: 0,
            initial_action: vec![],
            observation_space: vec![1],
        })
        .await
        .expect("start by uri")
        .into_inner();
    assert_eq!(
        reply.observation[0].value,
        Some(event::Value::Int64Value(0))
    );

    let status = raw
        .start_session(StartSessionRequest {
            benchmark: Some(Benchmark {
                uri: "benchmark://toy/unknown".to_string(),
                program: None,
                files: vec![],
                dynamic_config: None,
            }),
            action_space: 0,
            initial_action: vec![],
            observation_space: vec![],
        })
        .await
        .expect_err("unknown benchmark must fail");
    assert_eq!(status.code(), Code::NotFound);

    server.abort();
}

#[tokio::test]
async fn initial_actions_are_setup_and_failures_abort_creation() {
    let (mut raw, _client, _root, server) = setup().await;

    let reply = raw
        .start_session(StartSessionRequest {
            benchmark: Some(benchmark("benchmark://toy/e")),
            action_space: 0,
            initial_action: vec![int64_action(0), int64_action(1)],
            observation_space: vec![1],
        })
        .await
        .expect("start with initial actions")
        .into_inner();
    assert_eq!(
        reply.observation[0].value,
        Some(event::Value::Int64Value(2))
    );

    let status = raw
        .start_session(StartSessionRequest {
            benchmark: Some(benchmark("benchmark://toy/f")),
            action_space: 0,
            initial_action: vec![int64_action(99)],
            observation_space: vec![],
        })
        .await
        .expect_err("failing initial action must abort creation");
    assert_eq!(status.code(), Code::FailedPrecondition);

    server.abort();
}

#[tokio::test]
async fn session_parameters_get_ordered_replies() {
    let (mut raw, mut client, _root, server) = setup().await;
    let session_id = start(&mut raw, "benchmark://toy/g").await;

    let replies = client
        .send_session_parameters(
            session_id,
            vec![("pipeline.reset".to_string(), "ack".to_string())],
        )
        .await
        .expect("send parameter");
    assert_eq!(replies, vec!["ack".to_string()]);

    let err = client
        .send_session_parameters(
            session_id,
            vec![("no.such.key".to_string(), "x".to_string())],
        )
        .await
        .expect_err("unknown parameter must fail");
    match err {
        optforge_grpc::GrpcError::CallFailed(status) => {
            assert_eq!(status.code(), Code::InvalidArgument);
        }
        other => panic!("expected status error, got {other:?}"),
    }

    server.abort();
}

#[tokio::test]
async fn observation_view_translates_wire_observations() {
    let (mut raw, mut client, _root, server) = setup().await;
    let session_id = start(&mut raw, "benchmark://toy/h").await;

    let view = client.observation_view().await.expect("observation view");
    assert_eq!(view.len(), 3);
    let pass_count = view.get("pass-count").expect("pass-count spec");
    assert!(pass_count.deterministic);

    raw.step(StepRequest {
        session_id,
        action: vec![int64_action(0)],
        observation_space: vec![],
    })
    .await
    .expect("step");

    let value = client
        .observe(session_id, pass_count)
        .await
        .expect("observe");
    assert_eq!(value, optforge_core::value::Value::Int64(1));

    server.abort();
}
