use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;
use warden_core::config::GuardrailConfig;
use warden_core::{Embedder, GuardrailError, SemanticIndex};

use crate::grounding::Grounder;
use crate::guardrails::{GuardrailDecision, GuardrailPolicy};
use crate::intent::Intent;
use crate::llm::LlmClient;
use crate::planner::Planner;
use crate::tools::{RunbookSearchTool, TimeSource, ToolDispatcher, WorldClockTool};

pub const REFUSAL_MESSAGE: &str = "I can't help with that request.";

/// Where a turn ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TurnRoute {
    InputRejected,
    DeterministicRefusal,
    Arithmetic,
    PlannerRefused,
    PlannerAnswered,
    ToolFailed,
    Grounded,
}

impl TurnRoute {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InputRejected => "input_rejected",
            Self::DeterministicRefusal => "deterministic_refusal",
            Self::Arithmetic => "arithmetic",
            Self::PlannerRefused => "planner_refused",
            Self::PlannerAnswered => "planner_answered",
            Self::ToolFailed => "tool_failed",
            Self::Grounded => "grounded",
        }
    }

    /// True when the turn was settled without a model call.
    pub fn is_deterministic(&self) -> bool {
        matches!(self, Self::InputRejected | Self::DeterministicRefusal | Self::Arithmetic)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TurnReply {
    pub correlation_id: Uuid,
    pub route: TurnRoute,
    pub text: String,
    pub reason_code: Option<&'static str>,
}

pub struct AgentRuntime {
    guardrails: GuardrailPolicy,
    planner: Arc<Planner>,
    dispatcher: ToolDispatcher,
    grounder: Grounder,
}

impl AgentRuntime {
    pub fn new(guardrails: GuardrailPolicy, planner: Arc<Planner>, dispatcher: ToolDispatcher) -> Self {
        let grounder = Grounder::new(planner.clone());
        Self { guardrails, planner, dispatcher, grounder }
    }

    /// Wires the default guardrails and both tools around one model client.
    pub fn from_config(
        config: &GuardrailConfig,
        llm: Arc<dyn LlmClient>,
        embedder: Arc<dyn Embedder>,
        index: Arc<SemanticIndex>,
        time: Arc<dyn TimeSource>,
    ) -> Self {
        let dispatcher = ToolDispatcher::new(
            WorldClockTool::new(time),
            RunbookSearchTool::new(index, embedder, config.search_top_k),
            config.tool_timeout(),
        );
        Self::new(
            GuardrailPolicy::new(config.max_input_chars),
            Arc::new(Planner::new(llm)),
            dispatcher,
        )
    }

    pub fn max_input_chars(&self) -> usize {
        self.guardrails.max_input_chars()
    }

    pub async fn handle_turn(&self, text: &str) -> TurnReply {
        let correlation_id = Uuid::new_v4();
        info!(
            event_name = "agent.turn.started",
            correlation_id = %correlation_id,
            input_chars = text.chars().count(),
            "turn started"
        );

        let reply = self.route_turn(correlation_id, text).await;

        info!(
            event_name = "agent.turn.completed",
            correlation_id = %correlation_id,
            route = reply.route.as_str(),
            reason_code = reply.reason_code.unwrap_or(""),
            "turn completed"
        );
        reply
    }

    async fn route_turn(&self, correlation_id: Uuid, text: &str) -> TurnReply {
        let reply = |route, text: String, reason_code| TurnReply {
            correlation_id,
            route,
            text,
            reason_code,
        };

        let input = match self.guardrails.evaluate(text) {
            GuardrailDecision::Allow { input } => input,
            GuardrailDecision::Resolved { value } => {
                return reply(TurnRoute::Arithmetic, format!("Result: {value}"), None);
            }
            GuardrailDecision::Deny { reason_code, user_message, error } => {
                let route = match error {
                    GuardrailError::InputRejected(_) => TurnRoute::InputRejected,
                    GuardrailError::Arithmetic(_) => TurnRoute::Arithmetic,
                    _ => TurnRoute::DeterministicRefusal,
                };
                warn!(
                    event_name = "agent.guardrail.denied",
                    correlation_id = %correlation_id,
                    reason_code,
                    "turn stopped before planning"
                );
                return reply(route, user_message, Some(reason_code));
            }
        };

        let intent = self.planner.plan(input).await;
        match &intent {
            Intent::Refuse => reply(TurnRoute::PlannerRefused, REFUSAL_MESSAGE.to_string(), None),
            Intent::Answer { text } => reply(TurnRoute::PlannerAnswered, text.clone(), None),
            Intent::Tool { name, .. } => {
                let outcome = self.dispatcher.execute(&intent).await;
                match (outcome.output, outcome.error) {
                    (Some(output), None) => {
                        let tool_name =
                            self.dispatcher.canonical_name(name).unwrap_or(name.as_str());
                        let answer = self.grounder.answer(input, tool_name, &output).await;
                        reply(TurnRoute::Grounded, answer, None)
                    }
                    (_, error) => {
                        let reason_code = error.map(|error| GuardrailError::Tool(error).reason_code());
                        reply(TurnRoute::ToolFailed, outcome.safe_message, reason_code)
                    }
                }
            }
        }
    }
}
