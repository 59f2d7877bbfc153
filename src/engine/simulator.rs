//! Execution simulator.
//!
//! Drives a validated workflow sequence step by step. The first MCP step is
//! delegated to the workflow backend; every later step is simulated locally.
//! Each step's textual output becomes the next step's input, and the first
//! failure halts the chain with the partial result list returned as-is.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::backend::WorkflowBackend;
use super::clock::Clock;
use crate::error::{Error, ErrorStage, Result};
use crate::model::{EntityId, ErrorHandling, ResponseType, WorkflowRequest};
use crate::repository::Repository;
use crate::workflow::{validate, StepType, WorkflowStep};

/// Outcome of one executed step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepStatus {
    Success,
    Error,
}

/// Typed record of one step's execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub step_id: EntityId,
    pub step_type: StepType,
    pub step_name: String,
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Observable run state: idle, running a given step, or terminal.
///
/// Terminal states are transient; the machine returns to `Idle` once the
/// result list has been handed back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "state")]
pub enum RunState {
    Idle,
    Running { step_index: usize },
    Success,
    Error,
}

/// Simulated per-step processing delay.
const SIMULATED_STEP_DELAY: Duration = Duration::from_millis(800);

/// Sequential workflow execution simulator.
///
/// One simulator hosts at most one logical run at a time; starting a new
/// run or calling [`Simulator::abort`] supersedes any run still in flight,
/// and a superseded run discards late-arriving results instead of applying
/// them to stale state.
pub struct Simulator {
    backend: Arc<dyn WorkflowBackend>,
    clock: Arc<dyn Clock>,
    state: Mutex<StateCell>,
    generation: AtomicU64,
}

/// Run state tagged with the generation that last wrote it, so a superseded
/// run cannot clobber a newer run's state.
struct StateCell {
    generation: u64,
    state: RunState,
}

impl Simulator {
    pub fn new(backend: Arc<dyn WorkflowBackend>, clock: Arc<dyn Clock>) -> Self {
        Self {
            backend,
            clock,
            state: Mutex::new(StateCell {
                generation: 0,
                state: RunState::Idle,
            }),
            generation: AtomicU64::new(0),
        }
    }

    /// Current state of the run machine.
    pub fn state(&self) -> RunState {
        self.state.lock().expect("state lock poisoned").state
    }

    /// Supersede any run currently in flight. The underlying network call
    /// is not torn down; its result is discarded when it lands.
    pub fn abort(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Write the state on behalf of `generation`; stale writers lose.
    fn set_state(&self, generation: u64, state: RunState) {
        let mut cell = self.state.lock().expect("state lock poisoned");
        if generation >= cell.generation {
            cell.generation = generation;
            cell.state = state;
        }
    }

    /// Execute a test run over the given steps.
    ///
    /// Validation runs first on every call; validity is never cached. A
    /// structurally invalid workflow returns `Error::Validation` before any
    /// network call. Otherwise the returned list holds one result per
    /// executed step, halting at the first failure.
    pub async fn run(
        &self,
        steps: &[WorkflowStep],
        initial_input: &str,
        repo: &dyn Repository,
    ) -> Result<Vec<StepResult>> {
        let verdict = validate(steps, repo);
        if !verdict.valid {
            return Err(Error::Validation(
                verdict.reason.unwrap_or_else(|| "invalid workflow".into()),
            ));
        }

        let my_generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let superseded = || self.generation.load(Ordering::SeqCst) != my_generation;

        info!(steps = steps.len(), "Starting workflow test run");
        let mut results = Vec::with_capacity(steps.len());
        let mut current_input = initial_input.to_string();
        let mut failed = false;

        for (index, step) in steps.iter().enumerate() {
            self.set_state(my_generation, RunState::Running { step_index: index });

            let policy = self.error_policy(step, repo);
            let mut outcome = self.execute_step(index, step, &current_input, repo).await;

            if outcome.is_err() && policy.handling == ErrorHandling::Retry {
                debug!(step = step.id, "Retrying failed step once");
                outcome = self.execute_step(index, step, &current_input, repo).await;
            }
            if outcome.is_err() && policy.handling == ErrorHandling::Fallback {
                let fallback = policy.fallback_value.clone().unwrap_or_default();
                warn!(step = step.id, "Step failed; substituting fallback output");
                outcome = Ok(Executed {
                    name: policy.name.clone(),
                    output: fallback,
                });
            }

            if superseded() {
                // A newer run (or an abort) owns the generation now. Settle
                // our own state back to idle; a newer run's write wins the
                // generation comparison and is left alone.
                warn!(step = step.id, "Run superseded; discarding late result");
                self.set_state(my_generation, RunState::Idle);
                return Ok(results);
            }

            match outcome {
                Ok(executed) => {
                    results.push(StepResult {
                        step_id: step.id,
                        step_type: step.step_type,
                        step_name: executed.name,
                        status: StepStatus::Success,
                        output: Some(executed.output.clone()),
                        error: None,
                        timestamp: self.clock.now(),
                    });
                    current_input = executed.output;
                }
                Err(e) => {
                    results.push(StepResult {
                        step_id: step.id,
                        step_type: step.step_type,
                        step_name: policy.name,
                        status: StepStatus::Error,
                        output: None,
                        error: Some(e.to_string()),
                        timestamp: self.clock.now(),
                    });
                    failed = true;
                    break;
                }
            }
        }

        self.set_state(
            my_generation,
            if failed { RunState::Error } else { RunState::Success },
        );
        self.set_state(my_generation, RunState::Idle);
        Ok(results)
    }

    /// Error-handling intent and display name for a step, resolved leniently:
    /// an unresolvable config degrades to pass-through with a placeholder
    /// name, and the execution path reports the real resolution error.
    ///
    /// Only response configs carry a configured fallback default. An mcp
    /// step with `Fallback` substitutes the empty string, which downstream
    /// steps treat as ordinary (empty) input.
    fn error_policy(&self, step: &WorkflowStep, repo: &dyn Repository) -> StepPolicy {
        let default = step.error_handling.unwrap_or(ErrorHandling::PassThrough);
        match step.step_type {
            StepType::Mcp => StepPolicy {
                name: step
                    .resolve_mcp(repo)
                    .map(|e| e.name)
                    .unwrap_or_else(|_| format!("step-{}", step.id)),
                handling: default,
                fallback_value: None,
            },
            StepType::Response => match step.resolve_response(repo) {
                Ok(effective) => StepPolicy {
                    name: effective.name,
                    handling: effective.error_handling,
                    fallback_value: effective.fallback_value,
                },
                Err(_) => StepPolicy {
                    name: format!("step-{}", step.id),
                    handling: default,
                    fallback_value: None,
                },
            },
        }
    }

    async fn execute_step(
        &self,
        index: usize,
        step: &WorkflowStep,
        input: &str,
        repo: &dyn Repository,
    ) -> Result<Executed> {
        match step.step_type {
            StepType::Mcp if index == 0 => self.execute_backend_step(step, input, repo).await,
            StepType::Mcp => self.simulate_mcp_step(step, input, repo).await,
            StepType::Response => self.simulate_response_step(step, input, repo).await,
        }
    }

    /// Delegate the first MCP step to the external backend.
    ///
    /// Tool resolution fails fast, before any network call, distinguishing
    /// an empty selection from dangling tool ids.
    async fn execute_backend_step(
        &self,
        step: &WorkflowStep,
        input: &str,
        repo: &dyn Repository,
    ) -> Result<Executed> {
        let effective = step.resolve_mcp(repo)?;

        if effective.selected_tools.is_empty() {
            return Err(Error::Resolution(format!(
                "No tools selected for MCP config '{}'",
                effective.name
            )));
        }

        let mut names = Vec::with_capacity(effective.selected_tools.len());
        let mut missing = Vec::new();
        for id in &effective.selected_tools {
            match repo.tool(*id) {
                Some(tool) => names.push(tool.name.clone()),
                None => missing.push(*id),
            }
        }
        if !missing.is_empty() {
            return Err(Error::Resolution(format!(
                "Tools not found: {:?} (selected by MCP config '{}')",
                missing, effective.name
            )));
        }

        let request = WorkflowRequest {
            user_instructions: input.to_string(),
            tool_ids: names,
            format_response: Some(true),
            response_format_instructions: Some(effective.instruction.clone()),
        };

        let response = self.backend.execute(request).await?;
        if !response.is_success() {
            let stage = ErrorStage::from(response.error_stage.as_deref().unwrap_or("unknown"));
            return Err(Error::Upstream {
                stage,
                message: response
                    .error
                    .unwrap_or_else(|| "backend reported an error".into()),
            });
        }

        Ok(Executed {
            name: effective.name,
            output: response.output_text(),
        })
    }

    /// Locally simulate an MCP step: echo tool usage and an uppercased
    /// transform of the input as a stand-in for real LLM behavior.
    async fn simulate_mcp_step(
        &self,
        step: &WorkflowStep,
        input: &str,
        repo: &dyn Repository,
    ) -> Result<Executed> {
        let effective = step.resolve_mcp(repo)?;
        self.clock.sleep(SIMULATED_STEP_DELAY).await;

        // Dangling tool ids degrade gracefully here: only the backend path
        // is strict about resolution.
        let names: Vec<String> = effective
            .selected_tools
            .iter()
            .filter_map(|id| repo.tool(*id).map(|t| t.name.clone()))
            .collect();

        let output = format!(
            "[{}] Processed with tools [{}]: {}",
            effective.name,
            names.join(", "),
            input.to_uppercase()
        );
        Ok(Executed {
            name: effective.name,
            output,
        })
    }

    /// Locally simulate a Response step.
    async fn simulate_response_step(
        &self,
        step: &WorkflowStep,
        input: &str,
        repo: &dyn Repository,
    ) -> Result<Executed> {
        let effective = step.resolve_response(repo)?;
        self.clock.sleep(SIMULATED_STEP_DELAY).await;

        let output = match effective.response_type {
            ResponseType::RawOutput => input.to_string(),
            ResponseType::LlmReprocess => {
                let mut out = format!("Reprocessed: {}", input);
                if let Some(instructions) = &effective.reprocess_instructions {
                    out.push_str(&format!(" ({})", instructions));
                }
                out
            }
        };
        Ok(Executed {
            name: effective.name,
            output,
        })
    }
}

/// Internal carrier for a successful step execution.
struct Executed {
    name: String,
    output: String,
}

/// Step-level error intent resolved ahead of execution.
struct StepPolicy {
    name: String,
    handling: ErrorHandling,
    fallback_value: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::clock::ManualClock;
    use crate::model::{HttpMethod, ToolDraft, WorkflowResponse};
    use crate::repository::{
        McpConfigDraft, MemoryRepository, ResponseConfigDraft,
    };
    use async_trait::async_trait;
    use std::sync::atomic::AtomicU32;

    /// Scriptable backend spy: counts invocations, records the last
    /// request, and replays queued responses in order. Once the queue is
    /// drained the last scripted response repeats.
    struct SpyBackend {
        calls: AtomicU32,
        last_request: Mutex<Option<WorkflowRequest>>,
        script: Mutex<Vec<Result<WorkflowResponse>>>,
    }

    impl SpyBackend {
        fn scripted(script: Vec<Result<WorkflowResponse>>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicU32::new(0),
                last_request: Mutex::new(None),
                script: Mutex::new(script),
            })
        }

        fn returning(response: WorkflowResponse) -> Arc<Self> {
            Self::scripted(vec![Ok(response)])
        }

        fn failing(message: &str) -> Arc<Self> {
            Self::scripted(vec![Err(Error::Internal(message.into()))])
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    fn clone_scripted(entry: &Result<WorkflowResponse>) -> Result<WorkflowResponse> {
        match entry {
            Ok(r) => Ok(r.clone()),
            Err(e) => Err(Error::Internal(e.to_string())),
        }
    }

    #[async_trait]
    impl WorkflowBackend for SpyBackend {
        async fn execute(&self, request: WorkflowRequest) -> Result<WorkflowResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_request.lock().unwrap() = Some(request);
            let mut script = self.script.lock().unwrap();
            if script.len() > 1 {
                script.remove(0)
            } else {
                clone_scripted(&script[0])
            }
        }
    }

    fn success_response(formatted: &str) -> WorkflowResponse {
        WorkflowResponse {
            status: "success".into(),
            selected_tool: Some("get-forecast".into()),
            http_spec: None,
            raw_response: Some(serde_json::json!({"raw": true})),
            formatted_response: Some(formatted.into()),
            error: None,
            error_stage: None,
        }
    }

    struct Fixture {
        repo: MemoryRepository,
        mcp_id: EntityId,
        response_id: EntityId,
    }

    fn fixture() -> Fixture {
        let mut repo = MemoryRepository::new();
        let tool_id = repo.create_tool(ToolDraft {
            name: "get-forecast".into(),
            method: HttpMethod::Get,
            url: "https://api.weather.test/forecast".into(),
            ..Default::default()
        });
        let mcp_id = repo.create_mcp_config(McpConfigDraft {
            name: "assistant".into(),
            model: "gpt-4o".into(),
            temperature: 0.7,
            max_tokens: 1024,
            system_prompt: None,
            instruction: "answer briefly".into(),
            selected_tools: vec![tool_id],
        });
        repo.begin_deployment(mcp_id).unwrap();
        repo.finish_deployment(mcp_id, Ok("https://mcp.example.com".into()))
            .unwrap();
        let response_id = repo.create_response_config(ResponseConfigDraft {
            name: "formatter".into(),
            response_type: ResponseType::LlmReprocess,
            reprocess_instructions: Some("as bullet points".into()),
            error_handling: ErrorHandling::PassThrough,
            fallback_value: None,
        });
        Fixture {
            repo,
            mcp_id,
            response_id,
        }
    }

    fn simulator(backend: Arc<dyn WorkflowBackend>) -> Simulator {
        Simulator::new(backend, Arc::new(ManualClock::new()))
    }

    #[tokio::test]
    async fn test_single_deployed_step_calls_backend_with_tool_names() {
        let f = fixture();
        let backend = SpyBackend::returning(success_response("sunny, 21C"));
        let sim = simulator(backend.clone());

        let steps = vec![WorkflowStep::mcp(1, f.mcp_id)];
        let results = sim.run(&steps, "hello", &f.repo).await.unwrap();

        assert_eq!(backend.calls(), 1);
        let request = backend.last_request.lock().unwrap().clone().unwrap();
        assert_eq!(request.user_instructions, "hello");
        assert_eq!(request.tool_ids, vec!["get-forecast".to_string()]);
        assert_eq!(request.format_response, Some(true));
        assert_eq!(
            request.response_format_instructions.as_deref(),
            Some("answer briefly")
        );

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].status, StepStatus::Success);
        assert_eq!(results[0].output.as_deref(), Some("sunny, 21C"));
        assert_eq!(results[0].step_name, "assistant");
        assert_eq!(sim.state(), RunState::Idle);
    }

    #[tokio::test]
    async fn test_not_deployed_rejected_before_backend() {
        let mut f = fixture();
        f.repo.begin_deployment(f.mcp_id).unwrap();
        f.repo
            .finish_deployment(f.mcp_id, Err("build failed".into()))
            .unwrap();

        let backend = SpyBackend::returning(success_response("unused"));
        let sim = simulator(backend.clone());

        let steps = vec![WorkflowStep::mcp(1, f.mcp_id)];
        let err = sim.run(&steps, "hello", &f.repo).await.unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
        assert!(err.to_string().contains("assistant"));
        assert_eq!(backend.calls(), 0, "run must never reach the backend");
    }

    #[tokio::test]
    async fn test_chaining_output_feeds_next_input() {
        let f = fixture();
        let backend = SpyBackend::returning(success_response("sunny"));
        let sim = simulator(backend);

        let steps = vec![
            WorkflowStep::mcp(1, f.mcp_id),
            WorkflowStep::response(2, f.response_id),
        ];
        let results = sim.run(&steps, "weather?", &f.repo).await.unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].output.as_deref(), Some("sunny"));
        assert_eq!(
            results[1].output.as_deref(),
            Some("Reprocessed: sunny (as bullet points)")
        );
    }

    #[tokio::test]
    async fn test_chain_halts_on_backend_failure() {
        let f = fixture();
        let backend = SpyBackend::failing("connection reset");
        let sim = simulator(backend.clone());

        let steps = vec![
            WorkflowStep::mcp(1, f.mcp_id),
            WorkflowStep::response(2, f.response_id),
        ];
        let results = sim.run(&steps, "weather?", &f.repo).await.unwrap();

        // Exactly one result: the failing step. Step 2 never executed.
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].status, StepStatus::Error);
        assert!(results[0].error.as_deref().unwrap().contains("connection reset"));
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn test_empty_tool_selection_fails_before_network() {
        let mut f = fixture();
        let bare_id = f.repo.create_mcp_config(McpConfigDraft {
            name: "toolless".into(),
            model: "gpt-4o".into(),
            temperature: 0.5,
            max_tokens: 512,
            system_prompt: None,
            instruction: "x".into(),
            selected_tools: vec![],
        });
        f.repo.begin_deployment(bare_id).unwrap();
        f.repo
            .finish_deployment(bare_id, Ok("https://mcp.example.com/2".into()))
            .unwrap();

        let backend = SpyBackend::returning(success_response("unused"));
        let sim = simulator(backend.clone());

        let results = sim
            .run(&[WorkflowStep::mcp(1, bare_id)], "hi", &f.repo)
            .await
            .unwrap();
        assert_eq!(backend.calls(), 0);
        assert_eq!(results[0].status, StepStatus::Error);
        assert!(results[0]
            .error
            .as_deref()
            .unwrap()
            .contains("No tools selected"));
    }

    #[tokio::test]
    async fn test_dangling_tool_id_distinct_error() {
        let mut f = fixture();
        f.repo.delete_tool(1);

        let backend = SpyBackend::returning(success_response("unused"));
        let sim = simulator(backend.clone());

        let results = sim
            .run(&[WorkflowStep::mcp(1, f.mcp_id)], "hi", &f.repo)
            .await
            .unwrap();
        assert_eq!(backend.calls(), 0);
        let error = results[0].error.as_deref().unwrap();
        assert!(error.contains("Tools not found"));
        assert!(!error.contains("No tools selected"));
    }

    #[tokio::test]
    async fn test_upstream_error_tagged_with_stage() {
        let f = fixture();
        let backend = SpyBackend::returning(WorkflowResponse {
            status: "error".into(),
            selected_tool: None,
            http_spec: None,
            raw_response: None,
            formatted_response: None,
            error: Some("Tools not found in registry: [7]".into()),
            error_stage: Some("tool_retrieval".into()),
        });
        let sim = simulator(backend);

        let results = sim
            .run(&[WorkflowStep::mcp(1, f.mcp_id)], "hi", &f.repo)
            .await
            .unwrap();
        assert_eq!(results[0].status, StepStatus::Error);
        let error = results[0].error.as_deref().unwrap();
        assert!(error.contains("tool_retrieval"));
        assert!(error.contains("Tools not found in registry"));
    }

    #[tokio::test]
    async fn test_llm_selection_stage_surfaced_verbatim() {
        let f = fixture();
        let backend = SpyBackend::returning(WorkflowResponse {
            status: "error".into(),
            selected_tool: None,
            http_spec: None,
            raw_response: None,
            formatted_response: None,
            error: Some("model refused".into()),
            error_stage: Some("llm_selection".into()),
        });
        let sim = simulator(backend);

        let results = sim
            .run(&[WorkflowStep::mcp(1, f.mcp_id)], "hi", &f.repo)
            .await
            .unwrap();
        let error = results[0].error.as_deref().unwrap();
        assert!(error.contains("llm_selection"));
        assert!(error.contains("model refused"));
    }

    #[tokio::test]
    async fn test_retry_reinvokes_failed_step_once() {
        let f = fixture();
        let backend = SpyBackend::scripted(vec![
            Err(Error::Internal("flaky upstream".into())),
            Ok(success_response("recovered")),
        ]);
        let sim = simulator(backend.clone());

        let mut step = WorkflowStep::mcp(1, f.mcp_id);
        step.error_handling = Some(ErrorHandling::Retry);

        let results = sim.run(&[step], "hi", &f.repo).await.unwrap();
        assert_eq!(backend.calls(), 2);
        assert_eq!(results[0].status, StepStatus::Success);
        assert_eq!(results[0].output.as_deref(), Some("recovered"));
    }

    #[tokio::test]
    async fn test_retry_gives_up_after_second_failure() {
        let f = fixture();
        let backend = SpyBackend::failing("still down");
        let sim = simulator(backend.clone());

        let mut step = WorkflowStep::mcp(1, f.mcp_id);
        step.error_handling = Some(ErrorHandling::Retry);

        let results = sim.run(&[step], "hi", &f.repo).await.unwrap();
        assert_eq!(backend.calls(), 2, "exactly one re-invocation");
        assert_eq!(results[0].status, StepStatus::Error);
    }

    #[tokio::test]
    async fn test_fallback_substitutes_configured_default() {
        let mut f = fixture();
        let fb_id = f.repo.create_response_config(ResponseConfigDraft {
            name: "safety-net".into(),
            response_type: ResponseType::RawOutput,
            reprocess_instructions: None,
            error_handling: ErrorHandling::Fallback,
            fallback_value: Some("default answer".into()),
        });

        let sim = simulator(SpyBackend::returning(success_response("sunny")));
        let step = WorkflowStep::response(2, fb_id);
        let policy = sim.error_policy(&step, &f.repo);
        assert_eq!(policy.handling, ErrorHandling::Fallback);
        assert_eq!(policy.fallback_value.as_deref(), Some("default answer"));
    }

    #[tokio::test]
    async fn test_fallback_keeps_chain_alive_on_failure() {
        let f = fixture();
        let backend = SpyBackend::failing("connection reset");
        let sim = simulator(backend);

        let mut step = WorkflowStep::mcp(1, f.mcp_id);
        step.error_handling = Some(ErrorHandling::Fallback);
        let steps = vec![step, WorkflowStep::response(2, f.response_id)];

        let results = sim.run(&steps, "hi", &f.repo).await.unwrap();
        assert_eq!(results.len(), 2, "fallback output keeps the chain going");
        assert_eq!(results[0].status, StepStatus::Success);
        // mcp steps have no configured default, so the substitute is empty.
        assert_eq!(results[0].output.as_deref(), Some(""));
        assert_eq!(results[1].status, StepStatus::Success);
        assert_eq!(
            results[1].output.as_deref(),
            Some("Reprocessed:  (as bullet points)")
        );
    }

    /// Backend that aborts the hosting simulator mid-call, modeling a user
    /// closing the surface while the request is in flight.
    struct AbortingBackend {
        sim: Mutex<Option<Arc<Simulator>>>,
        calls: AtomicU32,
    }

    #[async_trait]
    impl WorkflowBackend for AbortingBackend {
        async fn execute(&self, _request: WorkflowRequest) -> Result<WorkflowResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(sim) = self.sim.lock().unwrap().as_ref() {
                sim.abort();
            }
            Ok(success_response("too late"))
        }
    }

    #[tokio::test]
    async fn test_abort_mid_flight_discards_late_result() {
        let f = fixture();
        let backend = Arc::new(AbortingBackend {
            sim: Mutex::new(None),
            calls: AtomicU32::new(0),
        });
        let sim = Arc::new(Simulator::new(backend.clone(), Arc::new(ManualClock::new())));
        *backend.sim.lock().unwrap() = Some(sim.clone());

        let steps = vec![WorkflowStep::mcp(1, f.mcp_id)];
        let results = sim.run(&steps, "hi", &f.repo).await.unwrap();

        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
        assert!(results.is_empty(), "late result must be discarded");
        // With no newer run, the machine settles back to idle.
        assert_eq!(sim.state(), RunState::Idle);
    }

    #[tokio::test]
    async fn test_chaining_monotonicity_over_four_steps() {
        let f = fixture();
        let backend = SpyBackend::returning(success_response("one"));
        let sim = simulator(backend.clone());

        let steps = vec![
            WorkflowStep::mcp(1, f.mcp_id),
            WorkflowStep::response(2, f.response_id),
            WorkflowStep::mcp(3, f.mcp_id),
            WorkflowStep::response(4, f.response_id),
        ];
        let results = sim.run(&steps, "go", &f.repo).await.unwrap();
        assert_eq!(results.len(), 4);

        // Step i's output is step i+1's input: the reprocess step embeds
        // its input verbatim, the simulated mcp step embeds it uppercased.
        let o0 = results[0].output.as_deref().unwrap();
        let o1 = results[1].output.as_deref().unwrap();
        let o2 = results[2].output.as_deref().unwrap();
        let o3 = results[3].output.as_deref().unwrap();
        assert_eq!(o0, "one");
        assert!(o1.starts_with("Reprocessed: one"));
        assert!(o2.contains(&o1.to_uppercase()));
        assert!(o3.starts_with(&format!("Reprocessed: {}", o2)));

        // Only the first mcp step goes to the backend.
        assert_eq!(backend.calls(), 1);
        assert!(o2.contains("Processed with tools"));
    }
}
