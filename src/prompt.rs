//! Prompt Compositor
//!
//! Builds the single text payload for the generation service.

use crate::aggregate::Summary;
use crate::intent::QueryIntent;
use crate::reconcile::CrossTableNote;
use crate::schema::SchemaRegistry;

pub const ASSISTANT_NAME: &str = "Unimaid Resources AI";

const INSTRUCTION_SUFFIX: &str = "Provide a clear, conversational answer with Markdown formatting (e.g., **bold**, *italic*, [links](url)) where appropriate. \
Use the totals exactly as given; do not multiply, extrapolate or re-add figures unless the user explicitly asks for it. \
If the data does not answer the question, say so clearly and suggest related questions about the baseline, people-in-need or severity data.";

pub fn compose_prompt(
    registry: &SchemaRegistry,
    message: &str,
    intent: &QueryIntent,
    summary: &Summary,
    notes: &[CrossTableNote],
) -> String {
    if !intent.is_related {
        return compose_fallback_prompt(registry, message);
    }

    let mut prompt = format!(
        "You are {}, an expert on humanitarian data about IDP, Returnee and Host Community populations.\n\n",
        ASSISTANT_NAME
    );
    prompt.push_str(&registry.describe());
    if intent.is_in_need {
        prompt.push_str("The user asked about people in need of assistance; only the people-in-need table was consulted.\n");
    }

    prompt.push_str("\nData retrieved for this question:\n");
    prompt.push_str(&summary.to_string());

    if !notes.is_empty() {
        prompt.push_str("\nAmbiguity warnings:\n");
        for note in notes {
            prompt.push_str(&format!("- {}\n", note));
        }
    }

    prompt.push_str(&format!("\nUser asked: '{}'\n\n", message));
    prompt.push_str(INSTRUCTION_SUFFIX);
    prompt
}

/// Prompt used when the message does not concern the dataset.
pub fn compose_fallback_prompt(registry: &SchemaRegistry, message: &str) -> String {
    let tables: Vec<&str> = registry.tables().iter().map(|t| t.label()).collect();
    format!(
        "You are {}, specialized in humanitarian data about IDP, Returnee and Host Community populations ({}). \
User asked: '{}'\n\
This question seems unrelated to that data. Respond in a friendly, conversational tone with Markdown formatting, \
suggesting the user ask about the data or offering to clarify their question. Do not offer to browse the internet.",
        ASSISTANT_NAME,
        tables.join(", "),
        message
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_related_prompt_sections() {
        let registry = SchemaRegistry::standard();
        let intent = QueryIntent {
            is_related: true,
            ..Default::default()
        };
        let notes = vec![CrossTableNote {
            value: "NG002016".into(),
            column: "LGA_Pcode".into(),
            tables: vec!["baselinedata".into(), "peopleinneed".into()],
        }];
        let prompt = compose_prompt(&registry, "NG002016", &intent, &Summary::NoData, &notes);
        assert!(prompt.contains("baselinedata"));
        assert!(prompt.contains("No specific data found"));
        assert!(prompt.contains("Ambiguity warnings"));
        assert!(prompt.contains("User asked: 'NG002016'"));
        assert!(prompt.contains("do not multiply"));
    }

    #[test]
    fn test_unrelated_prompt_is_fallback() {
        let registry = SchemaRegistry::standard();
        let prompt = compose_prompt(
            &registry,
            "What is the weather today?",
            &QueryIntent::default(),
            &Summary::NoData,
            &[],
        );
        assert!(prompt.contains("seems unrelated"));
        assert!(!prompt.contains("Data retrieved"));
    }
}
