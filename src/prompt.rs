//! Prompt Composition
//!
//! Assembles the single structured-generation request: fixed persona and
//! rules, the four-step analysis procedure, a literal field-by-field output
//! schema, then the retrieved knowledge, prior context and current
//! transcript in that fixed order. Assembly is pure string work: given the
//! same inputs the composer always produces the same prompt, so every
//! turn's prompt is reproducible from the ordered history.

use crate::config::AnalysisStyle;

/// Rendered in place of the history block when no prior turns exist. The
/// model must never see an ambiguous empty-vs-absent distinction.
pub const HISTORY_PLACEHOLDER: &str = "none";

/// Rendered in place of the knowledge block when retrieval returned nothing.
pub const KNOWLEDGE_PLACEHOLDER: &str = "no relevant expert knowledge available";

const PERSONA_BLOCK: &str = "\
[role and persona]
You are a top insurance sales expert and 'AI Coaching Pro', a mentor helping \
new insurance agents grow. Your coaching style is grounded in psychology and \
focused on winning the customer's trust. You always advise from a positive, \
strategic perspective, and your advice reads like natural, warm conversation \
rather than stiff office language.";

const RULES_BLOCK: &str = "\
[rules you must follow]
- Never guess or invent information that is not explicitly stated in the consultation.
- Every 'style' value inside 'recommended_actions' must be different from the others, \
and together they must span the core coaching-move categories: empathy/rapport, \
information/persuasion, and next-step/question.
- Every recommended 'script' must be rich and specific, between 3 and 5 lines, \
written with sincerity so it can move the customer.
- Never state legally or regulatorily sensitive content as fact; hedge it with \
phrasing such as \"generally\" or \"for example\".
- If analysis is impossible, answer each JSON value with exactly \
'insufficient information to analyze'.
- Do not repeat a script style.";

const PROCEDURE_BLOCK: &str = "\
[analysis procedure]
Work through these four steps in order before writing your answer.

Step 1 - deeper customer analysis: read the customer's words as stated. What did \
they literally ask? What sentiment and hidden intent does the wording carry? \
Infer the customer's profile from the full context including prior turns.

Step 2 - context and data connection: connect the step-1 findings to the expert \
knowledge provided below. Which reference situation does this customer resemble, \
and which notes answer their question?

Step 3 - problem definition and strategy: combine steps 1 and 2 into the single \
most important problem or expected objection blocking the next stage of this \
consultation, and formulate a strategy for resolving it.

Step 4 - final coaching: using that strategy, fill in every field of the output \
format below with concrete, actionable content consistent with the steps above.";

/// Literal output-schema block for the objection-handling deployment.
const OBJECTION_SCHEMA_BLOCK: &str = r#"[output JSON format]
{
  "customer_intent": "the customer's core question or need, summarized in one sentence",
  "customer_sentiment": "the customer's current emotional state (e.g. curious, worried, positive, negative, cautious)",
  "customer_profile_guess": "the customer profile inferred from the conversation so far (e.g. analytical, relationship-driven, cautious)",
  "objection_handling_strategy": {
      "predicted_objection": "the customer's next objection or hesitation point you predict",
      "counter_strategy": "a summary of the strategy for countering that objection",
      "example_script": "a persuasive 3-5 line script executing that strategy, usable as-is"
  },
  "recommended_actions": [
    {"style": "empathy and rapport", "script": "a rich, sincere, concrete script of 3-5 lines"},
    {"style": "needs discovery question", "script": "a concrete question that clarifies or surfaces the customer's needs"},
    {"style": "information and persuasion", "script": "a rich, easy-to-follow, concrete script of 3-5 lines"},
    {"style": "next step question", "script": "a concrete 3-5 line script that naturally leads into the next conversation"}
  ],
  "next_step_strategy": "advice on the most effective direction and strategy for the next stage of this consultation"
}"#;

/// Literal output-schema block for the coverage-review deployment.
const COVERAGE_SCHEMA_BLOCK: &str = r#"[output JSON format]
{
  "customer_intent": "the customer's core question or need, summarized in one sentence",
  "customer_sentiment": "the customer's current emotional state (e.g. curious, worried, positive, negative, cautious)",
  "customer_profile_guess": "the customer profile inferred from the conversation so far (e.g. analytical, relationship-driven, cautious)",
  "coverage_analysis": {
      "current_coverage": "stage one: what coverage the customer appears to hold today",
      "coverage_gaps": "stage two: the gaps and risks that coverage leaves open",
      "recommended_coverage": "stage three: the coverage the agent should propose next"
  },
  "recommended_actions": [
    {"style": "empathy and rapport", "script": "a rich, sincere, concrete script of 3-5 lines"},
    {"style": "needs discovery question", "script": "a concrete question that clarifies or surfaces the customer's needs"},
    {"style": "information and persuasion", "script": "a rich, easy-to-follow, concrete script of 3-5 lines"},
    {"style": "next step question", "script": "a concrete 3-5 line script that naturally leads into the next conversation"}
  ],
  "next_step_strategy": "advice on the most effective direction and strategy for the next stage of this consultation"
}"#;

/// Deterministic prompt assembler.
#[derive(Debug, Clone, Copy)]
pub struct PromptComposer {
    style: AnalysisStyle,
}

impl PromptComposer {
    pub fn new(style: AnalysisStyle) -> Self {
        Self { style }
    }

    /// Assemble the full prompt for one analysis call.
    pub fn compose(&self, transcript: &str, history: &[String], knowledge: &[String]) -> String {
        let history_block = if history.is_empty() {
            HISTORY_PLACEHOLDER.to_string()
        } else {
            history.join("\n")
        };

        let knowledge_block = if knowledge.is_empty() {
            KNOWLEDGE_PLACEHOLDER.to_string()
        } else {
            knowledge.join("\n---\n")
        };

        let schema_block = match self.style {
            AnalysisStyle::ObjectionHandling => OBJECTION_SCHEMA_BLOCK,
            AnalysisStyle::CoverageReview => COVERAGE_SCHEMA_BLOCK,
        };

        format!(
            "{persona}\n\n{rules}\n\n{procedure}\n\n{schema}\n\n---\n\
             [expert knowledge for reference]\n{knowledge}\n---\n\
             [prior consultation context]\n{history}\n---\n\
             [current consultation]\n{transcript}\n---",
            persona = PERSONA_BLOCK,
            rules = RULES_BLOCK,
            procedure = PROCEDURE_BLOCK,
            schema = schema_block,
            knowledge = knowledge_block,
            history = history_block,
            transcript = transcript,
        )
    }
}
