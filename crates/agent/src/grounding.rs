use std::sync::Arc;

use tracing::warn;

use crate::intent::FALLBACK_ANSWER;
use crate::planner::Planner;

const PROMPT_SECTION_MARKERS: &[&str] = &["USER_QUESTION:", "TOOL_OUTPUT:", "TOOL_NAME:"];

/// Produces the final answer for a successful tool call. The answer depends
/// only on the question, the tool name and the tool output.
pub struct Grounder {
    planner: Arc<Planner>,
}

impl Grounder {
    pub fn new(planner: Arc<Planner>) -> Self {
        Self { planner }
    }

    pub async fn answer(&self, user_input: &str, tool_name: &str, tool_output: &str) -> String {
        if tool_output.trim().is_empty() {
            return FALLBACK_ANSWER.to_string();
        }
        let answer = self.planner.grounded_answer(user_input, tool_name, tool_output).await;
        screen_answer(answer)
    }
}

/// An answer that repeats the prompt scaffolding is replaced wholesale.
pub fn screen_answer(answer: String) -> String {
    match PROMPT_SECTION_MARKERS.iter().find(|marker| answer.contains(*marker)) {
        Some(marker) => {
            warn!(
                event_name = "agent.grounding.answer_screened",
                marker = %marker,
                "grounded answer echoed prompt scaffolding"
            );
            FALLBACK_ANSWER.to_string()
        }
        None => answer,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{screen_answer, Grounder};
    use crate::planner::tests::ScriptedLlm;
    use crate::planner::Planner;

    #[test]
    fn plain_answers_pass_through() {
        assert_eq!(screen_answer("Raise the pool size.".to_string()), "Raise the pool size.");
    }

    #[test]
    fn echoed_scaffolding_is_replaced() {
        let leaked = "TOOL_OUTPUT:\nRelevant documents: ...".to_string();
        assert_eq!(screen_answer(leaked), "I don't know.");
        assert_eq!(screen_answer("USER_QUESTION: why".to_string()), "I don't know.");
    }

    #[tokio::test]
    async fn empty_tool_output_skips_the_model() {
        let llm = ScriptedLlm::replying(vec![Ok("made up".to_string())]);
        let grounder = Grounder::new(Arc::new(Planner::new(llm.clone())));

        assert_eq!(grounder.answer("q", "Runbooks.Search", "  ").await, "I don't know.");
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn answer_comes_from_the_model() {
        let llm = ScriptedLlm::replying(vec![Ok("Check the pool size first.".to_string())]);
        let grounder = Grounder::new(Arc::new(Planner::new(llm.clone())));

        let answer = grounder.answer("db pool?", "Runbooks.Search", "Relevant documents:").await;
        assert_eq!(answer, "Check the pool size first.");
        assert_eq!(llm.calls(), 1);
    }
}
