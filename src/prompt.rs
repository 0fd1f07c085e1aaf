use crate::error::{RagError, Result};
use serde::{Deserialize, Serialize};

/// Answers must stay inside the retrieved context; keep the wording verbatim
pub const PROMPT_TEMPLATE: &str = "\nYou are a helpful college Math 1050 professor. \n\
Answer the student's question based ONLY on the provided context.\n\
If the answer isn't in the context, say you don't know.\n\
\n\
Context:\n\
{context}\n\
\n\
Question: {question}\n";

const CONTEXT_SLOT: &str = "{context}";
const QUESTION_SLOT: &str = "{question}";

/// Chat role of a prompt message; the rendered prompt is always a user turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
}

/// One role-tagged message of a chat prompt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

/// Template with `{context}` and `{question}` slots, rendered as one user message
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    template: String,
}

impl PromptTemplate {
    pub fn new(template: impl Into<String>) -> Result<Self> {
        let template = template.into();
        for slot in [CONTEXT_SLOT, QUESTION_SLOT] {
            if !template.contains(slot) {
                return Err(RagError::Configuration(format!(
                    "Prompt template is missing the {} slot",
                    slot
                )));
            }
        }
        Ok(PromptTemplate { template })
    }

    /// Fill both slots in a single pass, so text inside the context is
    /// never mistaken for a slot
    pub fn render(&self, context: &str, question: &str) -> Vec<ChatMessage> {
        let mut rendered =
            String::with_capacity(self.template.len() + context.len() + question.len());
        let mut rest = self.template.as_str();

        while let Some(open) = rest.find('{') {
            rendered.push_str(&rest[..open]);
            let candidate = &rest[open..];

            if let Some(tail) = candidate.strip_prefix(CONTEXT_SLOT) {
                rendered.push_str(context);
                rest = tail;
            } else if let Some(tail) = candidate.strip_prefix(QUESTION_SLOT) {
                rendered.push_str(question);
                rest = tail;
            } else {
                rendered.push('{');
                rest = &candidate[1..];
            }
        }
        rendered.push_str(rest);

        vec![ChatMessage {
            role: Role::User,
            content: rendered,
        }]
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        PromptTemplate {
            template: PROMPT_TEMPLATE.to_string(),
        }
    }
}
