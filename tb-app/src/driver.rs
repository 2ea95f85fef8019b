//! Conversation driver: request a completion, run the tools it asks for, repeat until the
//! model answers without tool calls.

use crate::backend::ChatBackend;
use crate::stats::RunStats;
use crate::stream::StreamAssembler;
use crate::transcript::Transcript;
use anyhow::{Context, Result};
use futures_util::StreamExt;
use std::io::Write;
use std::time::Instant;
use tb_llm::{ChatMessage, StreamChunk, ToolCall, ToolDefinition};
use tb_tools::ToolRegistry;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMode {
    Buffered,
    Streaming,
}

#[derive(Debug, Clone, Copy)]
pub struct DriverOptions {
    pub mode: RequestMode,
    /// Completion requests allowed per run; `None` is unbounded.
    pub max_rounds: Option<usize>,
}

/// How a run ended. Only `Done` is a success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Done {
        answer: String,
    },
    UnknownTool {
        name: String,
    },
    MalformedArguments {
        tool: String,
        raw: String,
        error: String,
    },
    RoundLimit {
        rounds: usize,
    },
}

impl RunOutcome {
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done { .. })
    }
}

#[derive(Debug)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub history: Vec<ChatMessage>,
    pub stats: RunStats,
}

/// Result of one completion request.
enum Turn {
    Final(String),
    ToolCalls(ChatMessage),
}

pub struct ConversationDriver<'a> {
    backend: &'a dyn ChatBackend,
    registry: &'a ToolRegistry,
    options: DriverOptions,
}

impl<'a> ConversationDriver<'a> {
    pub fn new(
        backend: &'a dyn ChatBackend,
        registry: &'a ToolRegistry,
        options: DriverOptions,
    ) -> Self {
        Self {
            backend,
            registry,
            options,
        }
    }

    #[tracing::instrument(
        level = "info",
        skip_all,
        fields(mode = ?self.options.mode, model = %self.backend.model())
    )]
    pub async fn run<W: Write>(
        &self,
        prompt: &str,
        transcript: &mut Transcript<W>,
    ) -> Result<RunReport> {
        let tools: Vec<ToolDefinition> = self.registry.definitions();
        let mut history = vec![ChatMessage::user(prompt)];
        let mut stats = RunStats::default();
        tracing::info!(
            tools_registered = tools.len(),
            max_rounds = ?self.options.max_rounds,
            "conversation started"
        );

        let outcome = loop {
            if let Some(max_rounds) = self.options.max_rounds {
                if stats.requests >= max_rounds {
                    tracing::error!(max_rounds, "round limit reached without a final answer");
                    transcript.round_limit(max_rounds)?;
                    break RunOutcome::RoundLimit { rounds: max_rounds };
                }
            }
            tracing::debug!(
                round = stats.requests + 1,
                history_messages = history.len(),
                "requesting completion"
            );

            let turn = match self.options.mode {
                RequestMode::Buffered => {
                    self.request_buffered(&history, &tools, &mut stats, transcript)
                        .await?
                }
                RequestMode::Streaming => {
                    self.request_streaming(&history, &tools, &mut stats, transcript)
                        .await?
                }
            };

            let message = match turn {
                Turn::Final(answer) => {
                    history.push(ChatMessage::assistant(answer.clone(), vec![]));
                    transcript.final_answer(&answer)?;
                    break RunOutcome::Done { answer };
                }
                Turn::ToolCalls(message) => message,
            };

            let calls = message.tool_calls.clone();
            history.push(message);
            tracing::info!(tool_calls = calls.len(), "model requested tool calls");

            let mut aborted = None;
            for call in &calls {
                if let Some(outcome) = self
                    .dispatch(call, &mut history, &mut stats, transcript)
                    .await?
                {
                    aborted = Some(outcome);
                    break;
                }
            }
            if let Some(outcome) = aborted {
                break outcome;
            }
        };

        tracing::info!(
            outcome = ?outcome,
            requests = stats.requests,
            tool_calls = stats.tool_calls,
            total_tokens = stats.total_tokens,
            "conversation finished"
        );
        Ok(RunReport {
            outcome,
            history,
            stats,
        })
    }

    async fn request_buffered<W: Write>(
        &self,
        history: &[ChatMessage],
        tools: &[ToolDefinition],
        stats: &mut RunStats,
        transcript: &mut Transcript<W>,
    ) -> Result<Turn> {
        let started = Instant::now();
        let response = self
            .backend
            .chat(history, tools)
            .await
            .context("chat completion request failed")?;
        let elapsed = started.elapsed();

        let requested_tools = !response.message.tool_calls.is_empty();
        stats.record_inference(elapsed);
        stats.record_usage(response.usage, requested_tools);
        tracing::info!(
            latency_ms = elapsed.as_millis() as u64,
            total_tokens = response.usage.total_tokens,
            completion_tokens = response.usage.completion_tokens,
            tool_calls = response.message.tool_calls.len(),
            finish_reason = %response.finish_reason,
            "completion received"
        );
        transcript.model_response(&response.message)?;

        if requested_tools {
            Ok(Turn::ToolCalls(response.message))
        } else {
            Ok(Turn::Final(response.message.content))
        }
    }

    async fn request_streaming<W: Write>(
        &self,
        history: &[ChatMessage],
        tools: &[ToolDefinition],
        stats: &mut RunStats,
        transcript: &mut Transcript<W>,
    ) -> Result<Turn> {
        let started = Instant::now();
        let mut stream = self
            .backend
            .chat_stream(history, tools)
            .await
            .context("streaming chat completion request failed")?;
        transcript.stream_started()?;

        let mut assembler = StreamAssembler::default();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.context("reading completion stream")?;
            if let StreamChunk::Delta { content } = &chunk {
                transcript.stream_delta(content)?;
            }
            assembler.push(chunk);
        }
        let elapsed = started.elapsed();
        let assembled = assembler.finish();

        stats.record_inference(elapsed);
        if let Some(usage) = assembled.usage {
            stats.record_usage(usage, assembled.has_tool_call());
        }
        tracing::info!(
            latency_ms = elapsed.as_millis() as u64,
            text_len = assembled.text.len(),
            tool_call_fragments = assembled.fragments,
            dropped_fragments = assembled.dropped_fragments,
            arguments_len = assembled.arguments.len(),
            usage_reported = assembled.usage.is_some(),
            "completion stream finished"
        );
        transcript.stream_finished(&assembled)?;

        let round = stats.requests;
        let Some(call) = assembled.tool_call(|| format!("call_{round}_{}", Uuid::new_v4().simple()))
        else {
            tracing::warn!("no tool call arguments collected from stream");
            transcript.no_stream_arguments()?;
            return Ok(Turn::Final(assembled.text));
        };
        Ok(Turn::ToolCalls(ChatMessage::assistant(
            assembled.text,
            vec![call],
        )))
    }

    /// Runs one tool call and appends its result to `history`. Returns the terminal outcome
    /// when the call cannot be run.
    #[tracing::instrument(
        level = "info",
        skip_all,
        fields(tool_call_id = %call.id, tool_name = %call.name)
    )]
    async fn dispatch<W: Write>(
        &self,
        call: &ToolCall,
        history: &mut Vec<ChatMessage>,
        stats: &mut RunStats,
        transcript: &mut Transcript<W>,
    ) -> Result<Option<RunOutcome>> {
        let arguments = match parse_arguments(&call.arguments) {
            Ok(v) => v,
            Err(e) => {
                tracing::error!(raw = %call.arguments, error = %e, "tool call arguments are not valid JSON");
                transcript.malformed_arguments(&e.to_string(), &call.arguments)?;
                return Ok(Some(RunOutcome::MalformedArguments {
                    tool: call.name.clone(),
                    raw: call.arguments.clone(),
                    error: e.to_string(),
                }));
            }
        };
        transcript.tool_call(&call.name, &arguments)?;

        let Some(tool) = self.registry.get(&call.name) else {
            tracing::error!("tool call referenced unknown tool");
            transcript.unknown_tool(&call.name)?;
            return Ok(Some(RunOutcome::UnknownTool {
                name: call.name.clone(),
            }));
        };

        let started = Instant::now();
        let output = tool
            .execute(arguments)
            .await
            .with_context(|| format!("tool {} failed", call.name))?;
        let elapsed = started.elapsed();
        stats.record_tool_call(elapsed, output.is_failure());

        if output.is_failure() {
            // Forwarded to the model like any result; the label keeps it apart in the trace.
            tracing::warn!(
                latency_ms = elapsed.as_millis() as u64,
                output = %output.text(),
                "tool reported a failure"
            );
        } else {
            tracing::info!(
                latency_ms = elapsed.as_millis() as u64,
                output_len = output.text().len(),
                "tool call executed"
            );
        }
        transcript.tool_result(&output, elapsed)?;
        history.push(ChatMessage::tool_result(call, output.into_text()));
        Ok(None)
    }
}

/// Empty argument text is read as an empty object, for tools that take no parameters.
fn parse_arguments(raw: &str) -> serde_json::Result<serde_json::Value> {
    if raw.trim().is_empty() {
        return Ok(serde_json::Value::Object(serde_json::Map::new()));
    }
    serde_json::from_str(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ChunkStream;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Arc;
    use std::sync::Mutex;
    use tb_llm::{ChatResponse, Role, Usage};
    use tb_tools::{MockWeatherTool, Tool, ToolOutput, ToolSpec};

    const PROMPT: &str = "What's the weather like in Boston today?";

    /// Replays canned responses and records every request it receives.
    #[derive(Default)]
    struct ScriptedBackend {
        buffered: Mutex<VecDeque<ChatResponse>>,
        streamed: Mutex<VecDeque<Vec<StreamChunk>>>,
        requests: Mutex<Vec<Vec<ChatMessage>>>,
    }

    impl ScriptedBackend {
        fn buffered(responses: Vec<ChatResponse>) -> Self {
            Self {
                buffered: Mutex::new(responses.into()),
                ..Self::default()
            }
        }

        fn streamed(responses: Vec<Vec<StreamChunk>>) -> Self {
            Self {
                streamed: Mutex::new(responses.into()),
                ..Self::default()
            }
        }

        fn request_count(&self) -> usize {
            self.requests.lock().expect("requests lock").len()
        }
    }

    #[async_trait]
    impl ChatBackend for ScriptedBackend {
        fn model(&self) -> &str {
            "scripted"
        }

        async fn chat(
            &self,
            messages: &[ChatMessage],
            _tools: &[ToolDefinition],
        ) -> tb_llm::Result<ChatResponse> {
            self.requests
                .lock()
                .expect("requests lock")
                .push(messages.to_vec());
            self.buffered
                .lock()
                .expect("buffered lock")
                .pop_front()
                .ok_or_else(|| tb_llm::LlmError::ResponseFormat("script exhausted".to_string()))
        }

        async fn chat_stream(
            &self,
            messages: &[ChatMessage],
            _tools: &[ToolDefinition],
        ) -> tb_llm::Result<ChunkStream> {
            self.requests
                .lock()
                .expect("requests lock")
                .push(messages.to_vec());
            let chunks = self
                .streamed
                .lock()
                .expect("streamed lock")
                .pop_front()
                .ok_or_else(|| tb_llm::LlmError::ResponseFormat("script exhausted".to_string()))?;
            Ok(Box::pin(futures_util::stream::iter(
                chunks.into_iter().map(Ok),
            )))
        }
    }

    struct FailingWeather;

    #[async_trait]
    impl Tool for FailingWeather {
        fn spec(&self) -> ToolSpec {
            ToolSpec {
                name: tb_tools::WEATHER_TOOL_NAME.to_string(),
                description: "always 503".to_string(),
                parameters_schema: tb_tools::weather_parameters_schema(),
            }
        }

        async fn execute(&self, _arguments: serde_json::Value) -> tb_tools::Result<ToolOutput> {
            Ok(ToolOutput::Failure(
                "Failed to fetch weather (status 503)".to_string(),
            ))
        }
    }

    fn weather_registry() -> ToolRegistry {
        ToolRegistry::new()
            .with(Arc::new(MockWeatherTool))
            .expect("register mock weather")
    }

    fn tool_call_response(name: &str, arguments: &str) -> ChatResponse {
        ChatResponse {
            message: ChatMessage::assistant(
                "I should look up the weather.",
                vec![ToolCall {
                    id: "call_0".to_string(),
                    name: name.to_string(),
                    arguments: arguments.to_string(),
                }],
            ),
            usage: Usage {
                prompt_tokens: 200,
                completion_tokens: 40,
                total_tokens: 240,
            },
            finish_reason: "tool_calls".to_string(),
        }
    }

    fn answer_response(text: &str) -> ChatResponse {
        ChatResponse {
            message: ChatMessage::assistant(text, vec![]),
            usage: Usage {
                prompt_tokens: 280,
                completion_tokens: 30,
                total_tokens: 310,
            },
            finish_reason: "stop".to_string(),
        }
    }

    fn options(mode: RequestMode) -> DriverOptions {
        DriverOptions {
            mode,
            max_rounds: Some(8),
        }
    }

    async fn run(
        backend: &ScriptedBackend,
        registry: &ToolRegistry,
        options: DriverOptions,
    ) -> (RunReport, String) {
        let driver = ConversationDriver::new(backend, registry, options);
        let mut transcript = Transcript::new(Vec::new());
        let report = driver
            .run(PROMPT, &mut transcript)
            .await
            .expect("run completes");
        let out = String::from_utf8(transcript.into_inner()).expect("utf8 transcript");
        (report, out)
    }

    const BOSTON_F: &str = r#"{"city": "Boston", "state": "MA", "unit": "fahrenheit"}"#;

    #[tokio::test]
    async fn one_tool_round_then_final_answer() {
        let backend = ScriptedBackend::buffered(vec![
            tool_call_response("get_current_weather", BOSTON_F),
            answer_response("It's 85°F and partly cloudy in Boston."),
        ]);
        let registry = weather_registry();
        let (report, out) = run(&backend, &registry, options(RequestMode::Buffered)).await;

        assert_eq!(backend.request_count(), 2);
        assert_eq!(
            report.outcome,
            RunOutcome::Done {
                answer: "It's 85°F and partly cloudy in Boston.".to_string()
            }
        );

        let roles: Vec<Role> = report.history.iter().map(|m| m.role.clone()).collect();
        assert_eq!(
            roles,
            vec![Role::User, Role::Assistant, Role::Tool, Role::Assistant]
        );
        let tool_msg = &report.history[2];
        assert_eq!(tool_msg.tool_call_id.as_deref(), Some("call_0"));
        assert_eq!(tool_msg.name.as_deref(), Some("get_current_weather"));
        assert!(tool_msg.content.contains("85 degrees fahrenheit"));

        // The second request carries the tool round.
        let second = &backend.requests.lock().expect("requests lock")[1];
        assert_eq!(second.len(), 3);
        assert_eq!(second[2].role, Role::Tool);

        assert!(out.contains(
            "[Tool Result] The weather in Boston, MA is 85 degrees fahrenheit. Partly cloudy, highs in the 90's."
        ));
        assert!(out.contains("=== Final Answer ===\nIt's 85°F and partly cloudy in Boston.\n"));

        assert_eq!(report.stats.requests, 2);
        assert_eq!(report.stats.tool_calls, 1);
        assert_eq!(report.stats.total_tokens, 550);
        assert_eq!(report.stats.tool_call_tokens, 40);
    }

    #[tokio::test]
    async fn unknown_tool_stops_without_another_request() {
        let backend = ScriptedBackend::buffered(vec![
            tool_call_response("get_forecast", BOSTON_F),
            answer_response("never sent"),
        ]);
        let registry = weather_registry();
        let (report, out) = run(&backend, &registry, options(RequestMode::Buffered)).await;

        assert_eq!(backend.request_count(), 1);
        assert_eq!(
            report.outcome,
            RunOutcome::UnknownTool {
                name: "get_forecast".to_string()
            }
        );
        assert!(out.contains("[Error] Unknown tool: get_forecast"));
        assert!(!out.contains("=== Final Answer ==="));
        assert_eq!(report.stats.tool_calls, 0);
    }

    #[tokio::test]
    async fn malformed_buffered_arguments_abort() {
        let backend = ScriptedBackend::buffered(vec![tool_call_response(
            "get_current_weather",
            "{\"city\": \"Bos",
        )]);
        let registry = weather_registry();
        let (report, out) = run(&backend, &registry, options(RequestMode::Buffered)).await;

        assert!(matches!(
            report.outcome,
            RunOutcome::MalformedArguments { ref raw, .. } if raw == "{\"city\": \"Bos"
        ));
        assert!(out.contains("Raw arguments: {\"city\": \"Bos"));
        assert_eq!(backend.request_count(), 1);
    }

    #[tokio::test]
    async fn multiple_calls_in_one_turn_run_in_order() {
        let mut first = tool_call_response("get_current_weather", BOSTON_F);
        first.message.tool_calls.push(ToolCall {
            id: "call_1".to_string(),
            name: "get_current_weather".to_string(),
            arguments: r#"{"city": "Austin", "state": "TX", "unit": "celsius"}"#.to_string(),
        });
        let backend = ScriptedBackend::buffered(vec![first, answer_response("Both done.")]);
        let registry = weather_registry();
        let (report, _out) = run(&backend, &registry, options(RequestMode::Buffered)).await;

        assert!(report.outcome.is_done());
        assert_eq!(report.stats.tool_calls, 2);
        let tool_ids: Vec<&str> = report
            .history
            .iter()
            .filter(|m| m.role == Role::Tool)
            .filter_map(|m| m.tool_call_id.as_deref())
            .collect();
        assert_eq!(tool_ids, vec!["call_0", "call_1"]);
        assert!(report.history[3].content.contains("Austin, TX is 85 degrees celsius"));
    }

    #[tokio::test]
    async fn tool_failure_is_forwarded_and_counted() {
        let backend = ScriptedBackend::buffered(vec![
            tool_call_response("get_current_weather", BOSTON_F),
            answer_response("The weather service is unavailable."),
        ]);
        let registry = ToolRegistry::new()
            .with(Arc::new(FailingWeather))
            .expect("register failing tool");
        let (report, out) = run(&backend, &registry, options(RequestMode::Buffered)).await;

        assert!(report.outcome.is_done());
        assert_eq!(report.stats.failed_tool_calls, 1);
        assert!(out.contains("[Tool Failure] Failed to fetch weather (status 503)"));
        assert_eq!(
            report.history[2].content,
            "Failed to fetch weather (status 503)"
        );
    }

    #[tokio::test]
    async fn round_limit_stops_a_model_that_never_answers() {
        let backend = ScriptedBackend::buffered(
            (0..5)
                .map(|_| tool_call_response("get_current_weather", BOSTON_F))
                .collect(),
        );
        let registry = weather_registry();
        let (report, out) = run(
            &backend,
            &registry,
            DriverOptions {
                mode: RequestMode::Buffered,
                max_rounds: Some(3),
            },
        )
        .await;

        assert_eq!(report.outcome, RunOutcome::RoundLimit { rounds: 3 });
        assert_eq!(backend.request_count(), 3);
        assert_eq!(report.stats.tool_calls, 3);
        assert!(out.contains("Stopped after 3 completion requests"));
    }

    #[tokio::test]
    async fn backend_error_propagates() {
        let backend = ScriptedBackend::buffered(vec![]);
        let registry = weather_registry();
        let driver =
            ConversationDriver::new(&backend, &registry, options(RequestMode::Buffered));
        let mut transcript = Transcript::new(Vec::new());
        let err = driver
            .run(PROMPT, &mut transcript)
            .await
            .expect_err("exhausted script is an error");
        assert!(err.to_string().contains("chat completion request failed"));
    }

    fn fragment(id: Option<&str>, name: Option<&str>, arguments: &str) -> StreamChunk {
        StreamChunk::ToolCallFragment {
            index: 0,
            id: id.map(str::to_string),
            name: name.map(str::to_string),
            arguments: arguments.to_string(),
        }
    }

    fn delta(text: &str) -> StreamChunk {
        StreamChunk::Delta {
            content: text.to_string(),
        }
    }

    #[tokio::test]
    async fn streaming_reassembles_call_then_answers() {
        let backend = ScriptedBackend::streamed(vec![
            vec![
                delta("Checking the weather. "),
                fragment(Some("call_s"), Some("get_current_weather"), "{\"city\": \"Bos"),
                fragment(None, None, "ton\", \"state\": \"MA\", \"unit\": \"celsius\"}"),
                StreamChunk::Done {
                    usage: Some(Usage {
                        prompt_tokens: 100,
                        completion_tokens: 25,
                        total_tokens: 125,
                    }),
                },
            ],
            vec![
                delta("It is 85 degrees "),
                delta("celsius in Boston."),
                StreamChunk::Done { usage: None },
            ],
        ]);
        let registry = weather_registry();
        let (report, out) = run(&backend, &registry, options(RequestMode::Streaming)).await;

        assert_eq!(backend.request_count(), 2);
        assert_eq!(
            report.outcome,
            RunOutcome::Done {
                answer: "It is 85 degrees celsius in Boston.".to_string()
            }
        );
        assert_eq!(report.history.len(), 4);
        let call = &report.history[1].tool_calls[0];
        assert_eq!(call.id, "call_s");
        assert_eq!(
            call.arguments,
            "{\"city\": \"Boston\", \"state\": \"MA\", \"unit\": \"celsius\"}"
        );
        assert!(report.history[2].content.contains("Boston, MA is 85 degrees celsius"));
        assert!(out.contains("streamed function call name: get_current_weather"));
        assert!(out.contains("Checking the weather. \n"));

        assert_eq!(report.stats.total_tokens, 125);
        assert_eq!(report.stats.tool_call_tokens, 25);
    }

    #[tokio::test]
    async fn streaming_parallel_calls_run_only_the_first() {
        let backend = ScriptedBackend::streamed(vec![
            vec![
                fragment(Some("call_a"), Some("get_current_weather"), BOSTON_F),
                StreamChunk::ToolCallFragment {
                    index: 1,
                    id: Some("call_b".to_string()),
                    name: Some("get_current_weather".to_string()),
                    arguments: r#"{"city": "Austin", "state": "TX", "unit": "celsius"}"#
                        .to_string(),
                },
                StreamChunk::Done { usage: None },
            ],
            vec![delta("Boston only."), StreamChunk::Done { usage: None }],
        ]);
        let registry = weather_registry();
        let (report, _out) = run(&backend, &registry, options(RequestMode::Streaming)).await;

        assert!(report.outcome.is_done());
        assert_eq!(report.stats.tool_calls, 1);
        assert_eq!(report.history[1].tool_calls.len(), 1);
        assert!(report.history[2].content.contains("Boston, MA"));
    }

    #[tokio::test]
    async fn streaming_without_arguments_surfaces_text() {
        let backend = ScriptedBackend::streamed(vec![vec![
            delta("No tools needed."),
            StreamChunk::Done { usage: None },
        ]]);
        let registry = weather_registry();
        let (report, out) = run(&backend, &registry, options(RequestMode::Streaming)).await;

        assert_eq!(
            report.outcome,
            RunOutcome::Done {
                answer: "No tools needed.".to_string()
            }
        );
        assert!(out.contains("[Warning] No arguments collected from stream"));
        assert_eq!(report.stats.total_tokens, 0);
        assert_eq!(backend.request_count(), 1);
    }

    #[tokio::test]
    async fn streaming_malformed_arguments_abort() {
        let backend = ScriptedBackend::streamed(vec![vec![
            fragment(Some("call_x"), Some("get_current_weather"), "{\"city\": "),
            StreamChunk::Done { usage: None },
        ]]);
        let registry = weather_registry();
        let (report, out) = run(&backend, &registry, options(RequestMode::Streaming)).await;

        assert!(matches!(
            report.outcome,
            RunOutcome::MalformedArguments { ref tool, .. } if tool == "get_current_weather"
        ));
        assert!(out.contains("[Error] JSONDecodeError:"));
        assert_eq!(backend.request_count(), 1);
    }

    #[tokio::test]
    async fn streaming_unknown_tool_stops() {
        let backend = ScriptedBackend::streamed(vec![vec![
            fragment(None, Some("get_forecast"), "{}"),
            StreamChunk::Done { usage: None },
        ]]);
        let registry = weather_registry();
        let (report, out) = run(&backend, &registry, options(RequestMode::Streaming)).await;

        assert_eq!(
            report.outcome,
            RunOutcome::UnknownTool {
                name: "get_forecast".to_string()
            }
        );
        assert!(out.contains("[Error] Unknown tool: get_forecast"));
        assert!(report.history[1].tool_calls[0].id.starts_with("call_1_"));
    }

    #[test]
    fn empty_arguments_read_as_empty_object() {
        assert_eq!(
            parse_arguments("  ").expect("empty is ok"),
            serde_json::json!({})
        );
        assert!(parse_arguments("{").is_err());
    }
}
