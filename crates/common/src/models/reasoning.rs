use serde::{Deserialize, Serialize};
use std::fmt;

/// Source label carried by a step whose provider call failed
pub const ERROR_SOURCE: &str = "Error";

/// Lexical category of a user query; selects the reasoning template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryType {
    Comparison,
    Analysis,
    Explanation,
    Synthesis,
    Research,
    General,
}

impl QueryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryType::Comparison => "comparison",
            QueryType::Analysis => "analysis",
            QueryType::Explanation => "explanation",
            QueryType::Synthesis => "synthesis",
            QueryType::Research => "research",
            QueryType::General => "general",
        }
    }
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a reasoning step asks the model to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepAction {
    Identify,
    Analyze,
    Compare,
    Conclude,
    BreakDown,
    Examine,
    Synthesize,
    Understand,
    Research,
    Explain,
    Search,
    Summarize,
    Process,
    Respond,
    Expand,
}

impl StepAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepAction::Identify => "identify",
            StepAction::Analyze => "analyze",
            StepAction::Compare => "compare",
            StepAction::Conclude => "conclude",
            StepAction::BreakDown => "break_down",
            StepAction::Examine => "examine",
            StepAction::Synthesize => "synthesize",
            StepAction::Understand => "understand",
            StepAction::Research => "research",
            StepAction::Explain => "explain",
            StepAction::Search => "search",
            StepAction::Summarize => "summarize",
            StepAction::Process => "process",
            StepAction::Respond => "respond",
            StepAction::Expand => "expand",
        }
    }

    /// Instruction text placed in the step prompt
    pub fn guidance(&self) -> &'static str {
        match self {
            StepAction::Identify => {
                "Identify the key subjects, concepts, or elements mentioned in the query."
            }
            StepAction::Analyze => {
                "Analyze the identified elements in detail, considering their properties and characteristics."
            }
            StepAction::Compare => {
                "Compare and contrast the analyzed elements, highlighting similarities and differences."
            }
            StepAction::BreakDown => "Break down the topic into its main components or aspects.",
            StepAction::Examine => {
                "Examine each component in detail, using available information sources."
            }
            StepAction::Synthesize => "Synthesize the examined information into coherent insights.",
            StepAction::Understand => "Understand and clarify what exactly is being asked.",
            StepAction::Research => {
                "Research and gather relevant information from available sources."
            }
            StepAction::Search => "Focus on searching for current, relevant information.",
            StepAction::Explain => "Provide a clear, detailed explanation with examples if possible.",
            StepAction::Conclude => "Draw final conclusions based on all previous analysis.",
            StepAction::Summarize => "Summarize the key findings and insights.",
            StepAction::Process | StepAction::Respond | StepAction::Expand => {
                "Process the information and work toward a comprehensive response."
            }
        }
    }
}

impl fmt::Display for StepAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a reasoning plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanStep {
    /// 1-based position in the plan
    pub step_number: usize,
    pub action: StepAction,
    pub description: String,
}

impl PlanStep {
    pub fn new(step_number: usize, action: StepAction, description: impl Into<String>) -> Self {
        Self {
            step_number,
            action,
            description: description.into(),
        }
    }
}

/// The executed form of a plan step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasoningStep {
    pub step_number: usize,
    pub action: StepAction,
    pub description: String,
    pub content: String,
    #[serde(default)]
    pub sources_used: Vec<String>,
}

impl ReasoningStep {
    /// True when the step's provider call failed and its content describes the error
    pub fn is_error(&self) -> bool {
        self.sources_used.len() == 1 && self.sources_used[0] == ERROR_SOURCE
    }
}
