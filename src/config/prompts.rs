//! Prompt templates for Pitwall.
//!
//! Prompts can be customized by placing TOML files in the custom prompts directory.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub rag: RagPrompts,
    pub direct: DirectPrompts,
}

/// Prompts for grounded answers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagPrompts {
    /// Full prompt; `{{context}}` and `{{question}}` are substituted.
    pub template: String,
    /// Placed in the context slot when retrieval found nothing usable.
    pub no_context_marker: String,
    /// Returned verbatim when there is no context at all to ground on.
    pub no_context_answer: String,
}

impl Default for RagPrompts {
    fn default() -> Self {
        Self {
            template: r#"You are a knowledgeable Formula 1 expert assistant. Answer the user's question using ONLY the provided context from the F1 knowledge base.

CONTEXT FROM F1 KNOWLEDGE BASE:
{{context}}

USER QUESTION: {{question}}

INSTRUCTIONS:
- Answer based strictly on the provided context
- If the context contains relevant information, provide a detailed, accurate answer
- If the context is insufficient, clearly state what you know from context and what is missing
- When citing facts, reference the source (e.g., "According to [Source Title]...")
- Use precise F1 terminology (DRS, undercut, dirty air, etc.) when relevant
- For statistics and results, be exact and do not approximate
- Do not make up information not present in the context

ANSWER:"#
                .to_string(),

            no_context_marker: "No relevant context found in the knowledge base.".to_string(),

            no_context_answer: "No grounded context was found in the F1 knowledge base for this question, \
                so I can't give a sourced answer. Try rephrasing, widening the namespace filter, \
                or check that the knowledge base has been ingested."
                .to_string(),
        }
    }
}

/// Prompts for ungrounded answers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectPrompts {
    /// Full prompt; `{{question}}` is substituted.
    pub template: String,
}

impl Default for DirectPrompts {
    fn default() -> Self {
        Self {
            template: r#"You are a Formula 1 expert assistant. Answer the user's question using your general knowledge about Formula 1.

USER QUESTION: {{question}}

INSTRUCTIONS:
- Provide a comprehensive, accurate answer about Formula 1
- Include relevant statistics, history, and technical details
- Use proper F1 terminology
- If you're uncertain about specific details, indicate your confidence level

ANSWER:"#
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts, overriding defaults with files from `custom_dir` when present.
    pub fn load(custom_dir: Option<&str>) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let rag_path = custom_path.join("rag.toml");
            if rag_path.exists() {
                let content = std::fs::read_to_string(&rag_path)?;
                prompts.rag = toml::from_str(&content)?;
            }

            let direct_path = custom_path.join("direct.toml");
            if direct_path.exists() {
                let content = std::fs::read_to_string(&direct_path)?;
                prompts.direct = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }

    /// Build the grounded prompt.
    pub fn rag_prompt(&self, context: &str, question: &str) -> String {
        let mut vars = HashMap::new();
        vars.insert("context".to_string(), context.to_string());
        vars.insert("question".to_string(), question.to_string());
        Self::render(&self.rag.template, &vars)
    }

    /// Build the ungrounded prompt.
    pub fn direct_prompt(&self, question: &str) -> String {
        let mut vars = HashMap::new();
        vars.insert("question".to_string(), question.to_string());
        Self::render(&self.direct.template, &vars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_prompts() {
        let prompts = Prompts::default();
        assert!(prompts.rag.template.contains("{{context}}"));
        assert!(prompts.rag.template.contains("{{question}}"));
        assert!(prompts.direct.template.contains("{{question}}"));
    }

    #[test]
    fn test_render_template() {
        let template = "Hello {{name}}, you have {{count}} messages.";
        let mut vars = HashMap::new();
        vars.insert("name".to_string(), "Alice".to_string());
        vars.insert("count".to_string(), "5".to_string());

        let result = Prompts::render(template, &vars);
        assert_eq!(result, "Hello Alice, you have 5 messages.");
    }

    #[test]
    fn test_rag_prompt_places_context_before_question() {
        let prompts = Prompts::default();
        let prompt = prompts.rag_prompt("Verstappen won in 2023.", "Who won in 2023?");
        let ctx = prompt.find("Verstappen won").unwrap();
        let q = prompt.find("Who won in 2023?").unwrap();
        assert!(ctx < q);
        assert!(!prompt.contains("{{"));
    }

    #[test]
    fn test_custom_dir_overrides_direct_prompt() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("direct.toml"),
            "template = \"Q: {{question}}\"\n",
        )
        .unwrap();

        let prompts = Prompts::load(dir.path().to_str()).unwrap();
        assert_eq!(prompts.direct_prompt("Who is fastest?"), "Q: Who is fastest?");
        assert!(prompts.rag.template.contains("{{context}}"));
    }
}
