//! Closed tool table and the dispatcher that enforces it.
//!
//! A tool runs only when the intent names an allowlisted tool, its arguments
//! pass that tool's validation, and it finishes inside the dispatcher
//! timeout. Every other path ends in a [`ToolError`] whose safe message is
//! what the user sees.

pub mod clock;
pub mod runbooks;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use warden_core::ToolError;

use crate::intent::Intent;

pub use clock::{SystemClock, TimeSource, WorldClockTool};
pub use runbooks::RunbookSearchTool;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub argument: &'static str,
    pub argument_hint: &'static str,
    pub max_chars: usize,
}

pub const WORLD_TIME: ToolDescriptor = ToolDescriptor {
    name: "WorldTime.GetCityTime",
    argument: "city",
    argument_hint: "<city>",
    max_chars: 64,
};

pub const RUNBOOK_SEARCH: ToolDescriptor = ToolDescriptor {
    name: "Runbooks.Search",
    argument: "query",
    argument_hint: "<problem description>",
    max_chars: 500,
};

/// The only tools that can ever run.
pub const ALLOWED_TOOLS: [ToolDescriptor; 2] = [WORLD_TIME, RUNBOOK_SEARCH];

/// Arguments that passed a tool's own validation. Only constructed by
/// [`Tool::validate`] implementations in this module tree.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidatedArguments {
    values: BTreeMap<&'static str, String>,
}

impl ValidatedArguments {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    fn with(mut self, key: &'static str, value: String) -> Self {
        self.values.insert(key, value);
        self
    }
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn descriptor(&self) -> &'static ToolDescriptor;

    fn validate(&self, arguments: Option<&Value>) -> Result<ValidatedArguments, ToolError>;

    /// Read-only lookup. Dropping the future discards any partial result.
    async fn run(&self, arguments: ValidatedArguments) -> Result<String, ToolError>;
}

/// Extracts the descriptor's single string argument from a flat JSON object.
fn single_string_argument(
    descriptor: &'static ToolDescriptor,
    arguments: Option<&Value>,
) -> Result<ValidatedArguments, ToolError> {
    let invalid_shape = || ToolError::InvalidArgument("Invalid tool arguments.".to_string());
    let object = arguments.and_then(Value::as_object).ok_or_else(invalid_shape)?;
    if object.values().any(|value| value.is_object() || value.is_array()) {
        return Err(invalid_shape());
    }

    let Some(raw) = object.get(descriptor.argument) else {
        return Err(ToolError::InvalidArgument(format!(
            "Missing required argument: {}",
            descriptor.argument
        )));
    };

    let value = raw.as_str().map(str::trim).unwrap_or_default();
    let length = value.chars().count();
    if length == 0 || length > descriptor.max_chars {
        return Err(ToolError::InvalidArgument(format!("Invalid {}.", descriptor.argument)));
    }

    Ok(ValidatedArguments::default().with(descriptor.argument, value.to_string()))
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolOutcome {
    pub ok: bool,
    /// Present only when `ok`.
    pub output: Option<String>,
    /// Always safe to show; empty on success.
    pub safe_message: String,
    pub error: Option<ToolError>,
}

impl ToolOutcome {
    pub fn success(output: String) -> Self {
        Self { ok: true, output: Some(output), safe_message: String::new(), error: None }
    }

    pub fn failure(error: ToolError) -> Self {
        Self { ok: false, output: None, safe_message: error.safe_message(), error: Some(error) }
    }
}

impl From<Result<String, ToolError>> for ToolOutcome {
    fn from(result: Result<String, ToolError>) -> Self {
        match result {
            Ok(output) => Self::success(output),
            Err(error) => Self::failure(error),
        }
    }
}

pub struct ToolDispatcher {
    clock: Arc<WorldClockTool>,
    runbooks: Arc<RunbookSearchTool>,
    timeout: Duration,
}

impl ToolDispatcher {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    pub fn new(clock: WorldClockTool, runbooks: RunbookSearchTool, timeout: Duration) -> Self {
        Self { clock: Arc::new(clock), runbooks: Arc::new(runbooks), timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn execute(&self, intent: &Intent) -> ToolOutcome {
        self.dispatch(intent).await.into()
    }

    pub async fn dispatch(&self, intent: &Intent) -> Result<String, ToolError> {
        let Intent::Tool { name, arguments } = intent else {
            return Err(ToolError::Misuse);
        };

        let name = name.trim();
        if name.is_empty() {
            return Err(ToolError::MissingName);
        }

        let tool = self.resolve(name).ok_or_else(|| ToolError::NotAllowed(name.to_string()))?;
        let descriptor = tool.descriptor();
        let validated = tool.validate(arguments.as_ref())?;

        let started = Instant::now();
        let mut task = AbortOnDrop(tokio::spawn(async move { tool.run(validated).await }));
        let result = match tokio::time::timeout(self.timeout, &mut task.0).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => Err(ToolError::ExecutionFailed(join_error.to_string())),
            Err(_) => Err(ToolError::TimedOut { elapsed_ms: elapsed_ms(started) }),
        };
        drop(task);

        match &result {
            Ok(output) => info!(
                event_name = "agent.tool.completed",
                tool = descriptor.name,
                elapsed_ms = elapsed_ms(started),
                output_chars = output.chars().count(),
                "tool completed"
            ),
            Err(error) => warn!(
                event_name = "agent.tool.failed",
                tool = descriptor.name,
                elapsed_ms = elapsed_ms(started),
                error = %error,
                "tool failed"
            ),
        }
        result
    }

    /// The allowlisted spelling of `name`, if it names a tool at all.
    pub fn canonical_name(&self, name: &str) -> Option<&'static str> {
        self.resolve(name.trim()).map(|tool| tool.descriptor().name)
    }

    fn resolve(&self, name: &str) -> Option<Arc<dyn Tool>> {
        if name.eq_ignore_ascii_case(WORLD_TIME.name) {
            Some(self.clock.clone())
        } else if name.eq_ignore_ascii_case(RUNBOOK_SEARCH.name) {
            Some(self.runbooks.clone())
        } else {
            None
        }
    }
}

/// Aborts the spawned tool when dropped, so a timed-out or cancelled
/// dispatch never leaves the tool running.
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use warden_core::knowledge::default_runbooks;
    use warden_core::{Embedder, ModelError, SemanticIndex, ToolError};

    use super::clock::FixedTime;
    use super::{
        single_string_argument, RunbookSearchTool, ToolDispatcher, ToolOutcome, WorldClockTool,
        RUNBOOK_SEARCH, WORLD_TIME,
    };
    use crate::intent::Intent;

    struct ConstantEmbedder;

    #[async_trait]
    impl Embedder for ConstantEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, ModelError> {
            Ok(vec![1.0, 1.0])
        }
    }

    struct StallingEmbedder;

    #[async_trait]
    impl Embedder for StallingEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, ModelError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(vec![1.0, 1.0])
        }
    }

    /// Counts query embeddings that ran to completion.
    struct SlowCountingEmbedder {
        finished: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Embedder for SlowCountingEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, ModelError> {
            tokio::time::sleep(Duration::from_millis(300)).await;
            self.finished.fetch_add(1, Ordering::SeqCst);
            Ok(vec![1.0, 1.0])
        }
    }

    struct BrokenEmbedder;

    #[async_trait]
    impl Embedder for BrokenEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, ModelError> {
            Err(ModelError::Transport("dial tcp 10.1.2.3:11434: connection refused".to_string()))
        }
    }

    async fn dispatcher_with(
        query_embedder: Arc<dyn Embedder>,
        timeout: Duration,
    ) -> ToolDispatcher {
        let index = SemanticIndex::build(default_runbooks(), &ConstantEmbedder)
            .await
            .expect("index should build");
        let now = Utc.with_ymd_and_hms(2026, 1, 15, 12, 0, 0).single().expect("valid instant");

        ToolDispatcher::new(
            WorldClockTool::new(Arc::new(FixedTime(now))),
            RunbookSearchTool::new(Arc::new(index), query_embedder, 3),
            timeout,
        )
    }

    fn tool(name: &str, arguments: serde_json::Value) -> Intent {
        Intent::Tool { name: name.to_string(), arguments: Some(arguments) }
    }

    #[tokio::test]
    async fn non_tool_intent_is_misuse() {
        let dispatcher = dispatcher_with(Arc::new(ConstantEmbedder), Duration::from_secs(1)).await;

        let outcome = dispatcher.execute(&Intent::fallback()).await;
        assert_eq!(outcome, ToolOutcome::failure(ToolError::Misuse));
        assert_eq!(outcome.safe_message, "Tool execution requested incorrectly.");

        let refused = dispatcher.dispatch(&Intent::Refuse).await;
        assert_eq!(refused, Err(ToolError::Misuse));
    }

    #[tokio::test]
    async fn blank_name_is_rejected() {
        let dispatcher = dispatcher_with(Arc::new(ConstantEmbedder), Duration::from_secs(1)).await;

        let result = dispatcher.dispatch(&tool("  ", json!({ "city": "London" }))).await;
        assert_eq!(result, Err(ToolError::MissingName));
    }

    #[tokio::test]
    async fn unknown_tool_is_not_allowed_regardless_of_arguments() {
        let dispatcher = dispatcher_with(Arc::new(ConstantEmbedder), Duration::from_secs(1)).await;

        for arguments in [json!({}), json!({ "city": "London" }), json!([1, 2]), json!(null)] {
            let outcome = dispatcher.execute(&tool("Shell.Exec", arguments)).await;
            assert!(!outcome.ok);
            assert!(outcome.output.is_none());
            assert_eq!(outcome.error, Some(ToolError::NotAllowed("Shell.Exec".to_string())));
            assert_eq!(outcome.safe_message, "Tool not allowed.");
        }
    }

    #[tokio::test]
    async fn tool_names_match_case_insensitively() {
        let dispatcher = dispatcher_with(Arc::new(ConstantEmbedder), Duration::from_secs(1)).await;

        let outcome =
            dispatcher.execute(&tool("worldtime.getcitytime", json!({ "city": "Tokyo" }))).await;
        assert!(outcome.ok, "unexpected failure: {:?}", outcome.error);
        assert_eq!(
            outcome.output.as_deref(),
            Some("Current time in Tokyo (Asia/Tokyo): 2026-01-15 21:00 (UTC+09:00)")
        );
    }

    #[tokio::test]
    async fn clock_without_city_is_invalid() {
        let dispatcher = dispatcher_with(Arc::new(ConstantEmbedder), Duration::from_secs(1)).await;

        let outcome = dispatcher.execute(&tool(WORLD_TIME.name, json!({ "town": "London" }))).await;
        assert_eq!(
            outcome.error,
            Some(ToolError::InvalidArgument("Missing required argument: city".to_string()))
        );
        assert_eq!(outcome.safe_message, "Missing required argument: city");

        let missing = dispatcher
            .execute(&Intent::Tool { name: WORLD_TIME.name.to_string(), arguments: None })
            .await;
        assert_eq!(
            missing.error,
            Some(ToolError::InvalidArgument("Invalid tool arguments.".to_string()))
        );
    }

    #[tokio::test]
    async fn runbook_search_returns_ranked_excerpts() {
        let dispatcher = dispatcher_with(Arc::new(ConstantEmbedder), Duration::from_secs(1)).await;

        let outcome = dispatcher
            .execute(&tool(RUNBOOK_SEARCH.name, json!({ "query": "db pool saturated" })))
            .await;
        let output = outcome.output.expect("search output");
        assert!(output.starts_with("Relevant documents:\n- INC-101: "));
        assert!(output.contains("(score: 1.000)"));
        assert_eq!(output.matches("  Excerpt: ").count(), 3);
    }

    #[tokio::test]
    async fn slow_tool_times_out_without_partial_output() {
        let dispatcher =
            dispatcher_with(Arc::new(StallingEmbedder), Duration::from_millis(50)).await;

        let outcome = dispatcher
            .execute(&tool(RUNBOOK_SEARCH.name, json!({ "query": "redis memory" })))
            .await;
        assert!(!outcome.ok);
        assert!(outcome.output.is_none());
        assert!(matches!(outcome.error, Some(ToolError::TimedOut { .. })));
        assert_eq!(outcome.safe_message, "Tool timed out. Try again with a simpler request.");
    }

    #[tokio::test]
    async fn caller_cancellation_stops_the_running_tool() {
        let finished = Arc::new(AtomicUsize::new(0));
        let embedder = SlowCountingEmbedder { finished: finished.clone() };
        let dispatcher = dispatcher_with(Arc::new(embedder), Duration::from_secs(5)).await;

        let intent = tool(RUNBOOK_SEARCH.name, json!({ "query": "redis memory" }));
        let cancelled =
            tokio::time::timeout(Duration::from_millis(50), dispatcher.execute(&intent)).await;
        assert!(cancelled.is_err());

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(finished.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn canonical_name_follows_the_allowlist() {
        let dispatcher = dispatcher_with(Arc::new(ConstantEmbedder), Duration::from_secs(1)).await;

        assert_eq!(dispatcher.canonical_name(" runbooks.SEARCH "), Some(RUNBOOK_SEARCH.name));
        assert_eq!(dispatcher.canonical_name("worldtime.getcitytime"), Some(WORLD_TIME.name));
        assert_eq!(dispatcher.canonical_name("Shell.Exec"), None);
    }

    #[tokio::test]
    async fn execution_failure_hides_raw_detail() {
        let dispatcher = dispatcher_with(Arc::new(BrokenEmbedder), Duration::from_secs(1)).await;

        let outcome = dispatcher
            .execute(&tool(RUNBOOK_SEARCH.name, json!({ "query": "pods restarting" })))
            .await;
        assert!(matches!(outcome.error, Some(ToolError::ExecutionFailed(_))));
        assert_eq!(outcome.safe_message, "Tool failed safely. Try again.");
        assert!(!outcome.safe_message.contains("10.1.2.3"));
    }

    #[test]
    fn argument_bounds_are_enforced() {
        let at_limit = "q".repeat(500);
        let over_limit = "q".repeat(501);

        assert!(single_string_argument(&RUNBOOK_SEARCH, Some(&json!({ "query": at_limit })))
            .is_ok());
        assert_eq!(
            single_string_argument(&RUNBOOK_SEARCH, Some(&json!({ "query": over_limit }))),
            Err(ToolError::InvalidArgument("Invalid query.".to_string()))
        );
        assert_eq!(
            single_string_argument(&WORLD_TIME, Some(&json!({ "city": "   " }))),
            Err(ToolError::InvalidArgument("Invalid city.".to_string()))
        );
        assert_eq!(
            single_string_argument(&WORLD_TIME, Some(&json!({ "city": 42 }))),
            Err(ToolError::InvalidArgument("Invalid city.".to_string()))
        );
    }

    #[test]
    fn nested_arguments_are_rejected() {
        let result = single_string_argument(
            &WORLD_TIME,
            Some(&json!({ "city": "London", "extra": { "cmd": "rm -rf /" } })),
        );
        assert_eq!(result, Err(ToolError::InvalidArgument("Invalid tool arguments.".to_string())));
    }

    #[test]
    fn validated_argument_is_trimmed() {
        let validated =
            single_string_argument(&WORLD_TIME, Some(&json!({ "city": "  Paris " }))).expect("ok");
        assert_eq!(validated.get("city"), Some("Paris"));
    }
}
