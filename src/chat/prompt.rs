//! Prompt assembly and source extraction.

use crate::{
    llm::PromptMessage,
    memory::{ChatTurn, Role},
    vector_store::RetrievedChunk,
};
use serde_json::Value;

const CONDENSE_TEMPLATE: &str = "Given the following conversation and a follow up question, \
rephrase the follow up question to be a standalone question, in its original language.";

const ANSWER_TEMPLATE: &str = "Use the following pieces of context to answer the user's question. \n\
If you don't know the answer, just say that you don't know, don't try to make up an answer.\n\
----------------\n";

/// Render history as `Human:` / `Assistant:` lines.
pub(crate) fn render_history(history: &[ChatTurn]) -> String {
    history
        .iter()
        .map(|turn| match turn.role() {
            Role::User => format!("Human: {}", turn.text()),
            Role::Assistant => format!("Assistant: {}", turn.text()),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Prompt asking the model to turn a follow-up into a self-contained question.
pub(crate) fn condense_messages(history: &[ChatTurn], question: &str) -> Vec<PromptMessage> {
    let prompt = format!(
        "{CONDENSE_TEMPLATE}\n\nChat History:\n{}\nFollow Up Input: {question}\nStandalone question:",
        render_history(history)
    );
    vec![PromptMessage::user(prompt)]
}

/// Prompt asking the model to answer `question` from the retrieved chunks.
pub(crate) fn answer_messages(chunks: &[RetrievedChunk], question: &str) -> Vec<PromptMessage> {
    let context = chunks
        .iter()
        .map(|chunk| chunk.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");
    vec![
        PromptMessage::system(format!("{ANSWER_TEMPLATE}{context}")),
        PromptMessage::user(question),
    ]
}

/// File name of the chunk's `source` metadata; empty when absent or not a string.
pub(crate) fn source_name(chunk: &RetrievedChunk) -> String {
    match chunk.metadata.get("source") {
        Some(Value::String(path)) => path.rsplit('/').next().unwrap_or_default().to_string(),
        _ => String::new(),
    }
}
