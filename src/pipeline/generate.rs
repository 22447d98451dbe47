use std::sync::Arc;

use crate::llm::{ChatMessage, ChatRequest, LlmProvider};
use crate::profiles::UserProfile;
use crate::retrieval::RetrievedDocument;

const SYSTEM_PROMPT: &str = "You are a helpful, accurate, and informative healthcare assistant focused on preventive healthcare. \
Your goal is to provide evidence-based information from reliable medical sources. \
Answer questions clearly and concisely, and always emphasize the importance of consulting healthcare professionals for personalized advice.\n\
Base your responses on the provided context documents when available.";

const DISCLAIMER_MARKER: &str = "not a substitute for professional medical advice";

const DISCLAIMER_SENTENCE: &str = "\n\nNote: This information is not a substitute for professional medical advice. Always consult with your healthcare provider.";

const FALLBACK_RESPONSE: &str = "I apologize, but I'm having trouble generating a response at the moment. Please try again later.";

/// Number of history turns included in the prompt.
const HISTORY_WINDOW: usize = 3;

/// Assembles the prompt from query, retrieved context, chat history and
/// profile, invokes the language model and enforces the disclaimer.
pub struct ResponseGenerator {
    provider: Arc<dyn LlmProvider>,
    chat_model: String,
    temperature: f64,
    max_tokens: i32,
}

impl ResponseGenerator {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        chat_model: String,
        temperature: f64,
        max_tokens: i32,
    ) -> Self {
        Self {
            provider,
            chat_model,
            temperature,
            max_tokens,
        }
    }

    /// Generate a response. Never fails: any provider error is converted to
    /// a fixed apologetic fallback so the caller always has text to return.
    pub async fn generate(
        &self,
        query: &str,
        retrieved_documents: &[RetrievedDocument],
        chat_history: Option<&[ChatMessage]>,
        user_profile: Option<&UserProfile>,
    ) -> String {
        let prompt = build_prompt(query, retrieved_documents, chat_history, user_profile);

        let mut request = ChatRequest::new(vec![ChatMessage::user(prompt)]);
        request.temperature = Some(self.temperature);
        request.max_tokens = Some(self.max_tokens);

        match self.provider.chat(request, &self.chat_model).await {
            Ok(raw) => {
                let mut response = raw.trim().to_string();
                if !response.to_lowercase().contains(DISCLAIMER_MARKER) {
                    response.push_str(DISCLAIMER_SENTENCE);
                }
                tracing::info!("Generated response for query: {:.50}", query);
                response
            }
            Err(err) => {
                tracing::error!("Error generating response: {}", err);
                FALLBACK_RESPONSE.to_string()
            }
        }
    }
}

/// Each retrieved document becomes one paragraph prefixed with its source.
/// The generator must never receive an empty context block silently.
fn prepare_context(retrieved_documents: &[RetrievedDocument]) -> String {
    if retrieved_documents.is_empty() {
        return "No relevant documents found.".to_string();
    }

    retrieved_documents
        .iter()
        .enumerate()
        .map(|(i, doc)| {
            format!(
                "Document {} (Source: {}): {}",
                i + 1,
                doc.metadata.source,
                doc.content
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Prompt assembly order is fixed and significant: system instructions →
/// profile summary → last 3 history turns → document contexts → query →
/// the `Assistant Response:` cue.
fn build_prompt(
    query: &str,
    retrieved_documents: &[RetrievedDocument],
    chat_history: Option<&[ChatMessage]>,
    user_profile: Option<&UserProfile>,
) -> String {
    let context = prepare_context(retrieved_documents);

    let mut history_text = String::new();
    if let Some(history) = chat_history {
        let start = history.len().saturating_sub(HISTORY_WINDOW);
        for message in &history[start..] {
            history_text.push_str(&format!(
                "{}: {}\n",
                capitalize(&message.role),
                message.content
            ));
        }
    }

    let mut profile_text = String::new();
    if let Some(profile) = user_profile {
        let age = profile
            .age
            .map(|age| age.to_string())
            .unwrap_or_default();
        let gender = profile.gender.clone().unwrap_or_default();

        if !age.is_empty() || !gender.is_empty() {
            profile_text = format!("User Profile: {} {}", age, gender)
                .trim_end()
                .to_string();
        }

        if !profile.health_conditions.is_empty() {
            profile_text.push_str(&format!(
                ", Has conditions: {}",
                profile.health_conditions.join(", ")
            ));
        }
    }

    let mut prompt = format!("{}\n\n", SYSTEM_PROMPT);

    if !profile_text.is_empty() {
        prompt.push_str(&format!("{}\n\n", profile_text));
    }

    if !history_text.is_empty() {
        prompt.push_str(&format!("Previous conversation:\n{}\n", history_text));
    }

    prompt.push_str(&format!("Context information:\n{}\n\n", context));
    prompt.push_str(&format!("User Query: {}\n\n", query));
    prompt.push_str("Assistant Response:");

    prompt
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::ApiError;
    use crate::retrieval::RetrievedMetadata;
    use async_trait::async_trait;

    struct ScriptedProvider {
        response: Result<String, String>,
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn health_check(&self) -> Result<bool, ApiError> {
            Ok(true)
        }

        async fn chat(&self, _request: ChatRequest, _model_id: &str) -> Result<String, ApiError> {
            self.response
                .clone()
                .map_err(ApiError::Internal)
        }

        async fn embed(
            &self,
            _inputs: &[String],
            _model_id: &str,
        ) -> Result<Vec<Vec<f32>>, ApiError> {
            Err(ApiError::Internal("no embeddings".to_string()))
        }
    }

    fn doc(content: &str, source: &str) -> RetrievedDocument {
        RetrievedDocument {
            id: "doc_0".to_string(),
            content: content.to_string(),
            metadata: RetrievedMetadata {
                source: source.to_string(),
                score: 0.12,
                date: "2025-01-01".to_string(),
            },
        }
    }

    fn generator(response: Result<String, String>) -> ResponseGenerator {
        ResponseGenerator::new(
            Arc::new(ScriptedProvider { response }),
            "med-chat".to_string(),
            0.7,
            512,
        )
    }

    #[test]
    fn prompt_contains_numbered_context_and_ends_with_cue() {
        let docs = vec![doc("Get a flu shot yearly", "CDC")];
        let prompt = build_prompt("Should I get vaccinated?", &docs, None, None);

        assert!(prompt.contains("Document 1 (Source: CDC): Get a flu shot yearly"));
        assert!(prompt.ends_with("Assistant Response:"));
        assert!(prompt.contains("User Query: Should I get vaccinated?"));
    }

    #[test]
    fn prompt_substitutes_placeholder_for_empty_context() {
        let prompt = build_prompt("Should I get vaccinated?", &[], None, None);
        assert!(prompt.contains("No relevant documents found."));
    }

    #[test]
    fn prompt_includes_last_three_history_turns_role_labeled() {
        let history = vec![
            ChatMessage {
                role: "user".to_string(),
                content: "first".to_string(),
            },
            ChatMessage {
                role: "assistant".to_string(),
                content: "second".to_string(),
            },
            ChatMessage {
                role: "user".to_string(),
                content: "third".to_string(),
            },
            ChatMessage {
                role: "assistant".to_string(),
                content: "fourth".to_string(),
            },
        ];

        let prompt = build_prompt("next question", &[], Some(&history), None);

        assert!(!prompt.contains("User: first"));
        assert!(prompt.contains("Assistant: second"));
        assert!(prompt.contains("User: third"));
        assert!(prompt.contains("Assistant: fourth"));
    }

    #[test]
    fn prompt_summarizes_profile_when_present() {
        let profile = UserProfile {
            age: Some(42),
            gender: Some("female".to_string()),
            health_conditions: vec!["hypertension".to_string()],
            ..Default::default()
        };

        let prompt = build_prompt("question", &[], None, Some(&profile));
        assert!(prompt.contains("User Profile: 42 female, Has conditions: hypertension"));

        let anonymous = build_prompt("question", &[], None, None);
        assert!(!anonymous.contains("User Profile:"));
    }

    #[tokio::test]
    async fn disclaimer_is_appended_when_missing() {
        let generator = generator(Ok("A yearly flu shot is recommended.".to_string()));
        let response = generator.generate("flu?", &[], None, None).await;

        assert!(response.starts_with("A yearly flu shot is recommended."));
        assert!(response.contains("not a substitute for professional medical advice"));
    }

    #[tokio::test]
    async fn disclaimer_is_not_duplicated() {
        let text = "Get a flu shot. This is not a substitute for professional medical advice.";
        let generator = generator(Ok(text.to_string()));
        let response = generator.generate("flu?", &[], None, None).await;

        assert_eq!(response, text);
    }

    #[tokio::test]
    async fn provider_failure_yields_fallback_string() {
        let generator = generator(Err("model crashed".to_string()));
        let response = generator.generate("flu?", &[], None, None).await;

        assert_eq!(response, FALLBACK_RESPONSE);
    }
}
