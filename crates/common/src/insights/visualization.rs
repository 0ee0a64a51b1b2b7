use super::{transcript, InsightOutcome};
use crate::llm::{ChatMessage, CompletionRequest, LlmProvider};
use crate::models::Message;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::{Arc, OnceLock};
use std::time::Instant;

/// Messages considered for a visualization
const VISUALIZATION_WINDOW: usize = 10;

/// Kind of visualization data to produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisualizationKind {
    ConceptMap,
    Timeline,
    Comparison,
}

impl VisualizationKind {
    pub const ALL: [VisualizationKind; 3] = [
        VisualizationKind::ConceptMap,
        VisualizationKind::Timeline,
        VisualizationKind::Comparison,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            VisualizationKind::ConceptMap => "concept_map",
            VisualizationKind::Timeline => "timeline",
            VisualizationKind::Comparison => "comparison",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            VisualizationKind::ConceptMap => "Concept Map",
            VisualizationKind::Timeline => "Timeline",
            VisualizationKind::Comparison => "Comparison Chart",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            VisualizationKind::ConceptMap => "Visual map of concepts and relationships",
            VisualizationKind::Timeline => "Chronological timeline of events",
            VisualizationKind::Comparison => "Compare different items or options",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            VisualizationKind::ConceptMap => "concept map",
            VisualizationKind::Timeline => "timeline",
            VisualizationKind::Comparison => "comparison",
        }
    }

    fn system_prompt(&self) -> &'static str {
        match self {
            VisualizationKind::ConceptMap => {
                "You are a data analyst creating structured concept maps. Return only valid JSON."
            }
            VisualizationKind::Timeline => {
                "You are a data analyst creating timeline visualizations. Return only valid JSON."
            }
            VisualizationKind::Comparison => {
                "You are a data analyst creating comparison charts. Return only valid JSON."
            }
        }
    }

    fn max_tokens(&self) -> u32 {
        match self {
            VisualizationKind::ConceptMap => 800,
            VisualizationKind::Timeline | VisualizationKind::Comparison => 600,
        }
    }

    fn prompt(&self, content: &str) -> String {
        match self {
            VisualizationKind::ConceptMap => format!(
                r#"
Based on the research conversation below, identify key concepts and their relationships:

{content}

Return a JSON structure with:
{{
  "nodes": [
    {{"id": "concept1", "label": "Concept Name", "category": "main|supporting|detail"}},
    {{"id": "concept2", "label": "Another Concept", "category": "main|supporting|detail"}}
  ],
  "links": [
    {{"source": "concept1", "target": "concept2", "relationship": "causes|relates_to|supports|contradicts"}}
  ]
}}

Focus on the 8-12 most important concepts and their key relationships.
"#
            ),
            VisualizationKind::Timeline => format!(
                r#"
Based on the research conversation below, identify any temporal elements (dates, events, sequences):

{content}

Return a JSON structure with:
{{
  "timeline_events": [
    {{"date": "YYYY-MM-DD or YYYY or 'Ancient'", "event": "Event description", "category": "historical|recent|future"}},
    {{"date": "YYYY-MM-DD", "event": "Another event", "category": "historical|recent|future"}}
  ],
  "title": "Timeline Title"
}}

If no clear temporal elements exist, return {{"timeline_events": [], "message": "No temporal data found"}}.
"#
            ),
            VisualizationKind::Comparison => format!(
                r#"
Based on the research conversation below, identify any comparisons, pros/cons, or contrasting elements:

{content}

Return a JSON structure with:
{{
  "comparison": {{
    "title": "Comparison Title",
    "items": [
      {{"name": "Item 1", "pros": ["Pro 1", "Pro 2"], "cons": ["Con 1", "Con 2"], "score": 7}},
      {{"name": "Item 2", "pros": ["Pro 1", "Pro 2"], "cons": ["Con 1"], "score": 8}}
    ]
  }}
}}

Score should be 1-10. If no clear comparisons exist, return {{ "comparison": null, "message": "No comparison data found" }}.
"#
            ),
        }
    }
}

fn json_block() -> Option<&'static Regex> {
    static BLOCK: OnceLock<Option<Regex>> = OnceLock::new();
    // Outermost braces; models often wrap JSON in prose or code fences
    BLOCK.get_or_init(|| Regex::new(r"(?s)\{.*\}").ok()).as_ref()
}

/// Parse the JSON object embedded in a model reply
pub fn extract_json(reply: &str) -> Result<Value, serde_json::Error> {
    let candidate = json_block()
        .and_then(|re| re.find(reply))
        .map(|m| m.as_str())
        .unwrap_or(reply);
    serde_json::from_str(candidate)
}

/// Generates visualization data from recent conversation turns
pub struct VisualizationGenerator {
    llm: Arc<dyn LlmProvider>,
    model: String,
}

impl VisualizationGenerator {
    const TEMPERATURE: f32 = 0.2;

    pub fn new(llm: Arc<dyn LlmProvider>, model: impl Into<String>) -> Self {
        Self { llm, model: model.into() }
    }

    pub async fn generate(&self, kind: VisualizationKind, messages: &[Message]) -> InsightOutcome<Value> {
        let recent = &messages[messages.len().saturating_sub(VISUALIZATION_WINDOW)..];
        let request = CompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage::system(kind.system_prompt()),
                ChatMessage::user(kind.prompt(&transcript(recent, false))),
            ],
            temperature: Self::TEMPERATURE,
            max_tokens: kind.max_tokens(),
        };

        let start = Instant::now();
        let result = self.llm.complete(&request).await;
        crate::metrics::record_llm_call("visualization", start.elapsed().as_secs_f64(), result.is_ok());

        let parsed = result.and_then(|reply| extract_json(&reply).map_err(Into::into));
        match parsed {
            Ok(data) => InsightOutcome::Completed(data),
            Err(e) => {
                tracing::warn!(kind = kind.id(), error = %e, "Visualization generation failed");
                InsightOutcome::Degraded {
                    fallback: json!({ "error": format!("Failed to generate {}: {}", kind.label(), e) }),
                    error: e.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedLlm;

    #[test]
    fn test_extract_json_from_fenced_reply() {
        let reply = "Here you go:\n```json\n{\"nodes\": [], \"links\": []}\n```";
        let value = extract_json(reply).unwrap();
        assert_eq!(value, json!({"nodes": [], "links": []}));

        assert!(extract_json("no json here").is_err());
    }

    #[test]
    fn test_kind_wire_names() {
        let parsed: VisualizationKind = serde_json::from_str("\"concept_map\"").unwrap();
        assert_eq!(parsed, VisualizationKind::ConceptMap);
        assert_eq!(VisualizationKind::Comparison.name(), "Comparison Chart");
    }

    #[tokio::test]
    async fn test_uses_last_ten_messages() {
        let llm = Arc::new(ScriptedLlm::new().reply("{\"timeline_events\": []}"));
        let generator = VisualizationGenerator::new(llm.clone(), "m");
        let messages: Vec<Message> = (0..15).map(|i| Message::user(format!("turn-{:02}", i))).collect();

        let outcome = generator.generate(VisualizationKind::Timeline, &messages).await;

        assert!(!outcome.is_degraded());
        let request = &llm.requests()[0];
        assert_eq!(request.temperature, 0.2);
        assert_eq!(request.max_tokens, 600);
        let prompt = request.last_user_content().unwrap();
        assert!(!prompt.contains("turn-04"));
        assert!(prompt.contains("turn-05"));
        assert!(prompt.contains("turn-14"));
    }

    #[tokio::test]
    async fn test_unparseable_reply_degrades() {
        let generator =
            VisualizationGenerator::new(Arc::new(ScriptedLlm::new().reply("I cannot do that")), "m");

        let outcome = generator.generate(VisualizationKind::ConceptMap, &[Message::user("x")]).await;

        assert!(outcome.is_degraded());
        let error = outcome.value()["error"].as_str().unwrap();
        assert!(error.starts_with("Failed to generate concept map:"));
    }
}
