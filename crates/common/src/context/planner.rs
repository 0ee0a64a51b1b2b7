//! Reasoning Planner - Maps a query type to an ordered step plan
//!
//! Provides:
//! - Fixed per-type step templates
//! - Truncation or extension to a requested depth

use crate::models::{PlanStep, QueryType, StepAction};

/// Ordered (action, description) template for a query type
///
/// Synthesis queries share the general template.
fn template(query_type: QueryType) -> &'static [(StepAction, &'static str)] {
    match query_type {
        QueryType::Comparison => &[
            (StepAction::Identify, "Identify the subjects to compare"),
            (StepAction::Analyze, "Analyze each subject individually"),
            (StepAction::Compare, "Compare and contrast the subjects"),
            (StepAction::Conclude, "Draw conclusions from the comparison"),
        ],
        QueryType::Analysis => &[
            (StepAction::BreakDown, "Break down the topic into components"),
            (StepAction::Examine, "Examine each component in detail"),
            (StepAction::Synthesize, "Synthesize findings into insights"),
        ],
        QueryType::Explanation => &[
            (StepAction::Understand, "Understand the core question"),
            (StepAction::Research, "Gather relevant information"),
            (StepAction::Explain, "Provide clear explanation with examples"),
        ],
        QueryType::Research => &[
            (StepAction::Search, "Search for current information"),
            (StepAction::Analyze, "Analyze and verify information"),
            (StepAction::Summarize, "Summarize key findings"),
        ],
        QueryType::Synthesis | QueryType::General => &[
            (StepAction::Understand, "Understand the question"),
            (StepAction::Process, "Process available information"),
            (StepAction::Respond, "Formulate comprehensive response"),
        ],
    }
}

/// Builds reasoning plans
#[derive(Debug, Clone, Default)]
pub struct ReasoningPlanner;

impl ReasoningPlanner {
    pub fn new() -> Self {
        Self
    }

    /// Plan exactly `depth` steps numbered `1..=depth`
    ///
    /// A template longer than `depth` is cut short, so a depth-3 comparison
    /// plan has no `conclude` step. A shorter one is padded with `expand` steps.
    pub fn plan(&self, query_type: QueryType, depth: usize) -> Vec<PlanStep> {
        let mut plan: Vec<PlanStep> = template(query_type)
            .iter()
            .take(depth)
            .enumerate()
            .map(|(i, (action, description))| PlanStep::new(i + 1, *action, *description))
            .collect();

        while plan.len() < depth {
            let step_number = plan.len() + 1;
            plan.push(PlanStep::new(
                step_number,
                StepAction::Expand,
                format!("Perform additional analysis (step {})", step_number),
            ));
        }

        plan
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbers(plan: &[PlanStep]) -> Vec<usize> {
        plan.iter().map(|s| s.step_number).collect()
    }

    #[test]
    fn test_comparison_depth_three_drops_conclude() {
        let plan = ReasoningPlanner::new().plan(QueryType::Comparison, 3);

        assert_eq!(numbers(&plan), vec![1, 2, 3]);
        let actions: Vec<_> = plan.iter().map(|s| s.action).collect();
        assert_eq!(actions, vec![StepAction::Identify, StepAction::Analyze, StepAction::Compare]);
        assert!(plan.iter().all(|s| s.action != StepAction::Conclude));
    }

    #[test]
    fn test_general_depth_five_is_padded() {
        let plan = ReasoningPlanner::new().plan(QueryType::General, 5);

        assert_eq!(numbers(&plan), vec![1, 2, 3, 4, 5]);
        assert_eq!(plan[2].action, StepAction::Respond);
        assert_eq!(plan[3].action, StepAction::Expand);
        assert_eq!(plan[4].description, "Perform additional analysis (step 5)");
    }

    #[test]
    fn test_full_comparison_template() {
        let plan = ReasoningPlanner::new().plan(QueryType::Comparison, 4);
        assert_eq!(plan[3].action, StepAction::Conclude);
    }

    #[test]
    fn test_synthesis_uses_general_template() {
        let planner = ReasoningPlanner::new();
        assert_eq!(planner.plan(QueryType::Synthesis, 3), planner.plan(QueryType::General, 3));
    }

    #[test]
    fn test_numbering_is_contiguous_for_every_depth() {
        let planner = ReasoningPlanner::new();
        for query_type in [
            QueryType::Comparison,
            QueryType::Analysis,
            QueryType::Explanation,
            QueryType::Research,
            QueryType::General,
        ] {
            for depth in 0..=10 {
                let plan = planner.plan(query_type, depth);
                assert_eq!(numbers(&plan), (1..=depth).collect::<Vec<_>>());
            }
        }
    }
}
