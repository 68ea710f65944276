//! Conversational mixing advisor.

use super::{AiError, ChatMessage, InferenceBackend};

/// Persona the advisor service is configured with.
pub const ADVISOR_PERSONA: &str = "You are an expert audio engineer. Give concise, practical advice on \
mixing, mastering, noise reduction and recording technique. Prefer concrete settings \
(frequencies, ratios, times) over general remarks.";

/// Shown in the transcript when the advisor could not be reached.
pub const ADVISOR_ERROR_NOTICE: &str = "Sorry, I couldn't reach the advisor. Please try again.";

/// Sends one user message and returns the advisor's reply.
///
/// # Errors
/// - If the request fails
/// - If the reply is empty
pub async fn advise(
    backend: &dyn InferenceBackend,
    history: &[ChatMessage],
    message: &str,
) -> Result<String, AiError> {
    tracing::debug!(
        "Advisor request ({} prior messages, {} chars)",
        history.len(),
        message.len()
    );

    let reply = backend.chat(ADVISOR_PERSONA, history, message).await?;
    let reply = reply.trim();

    if reply.is_empty() {
        return Err(AiError::Malformed("advisor returned an empty reply".to_string()));
    }

    Ok(reply.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::StructuredRequest;
    use std::sync::Mutex;

    struct EchoBackend {
        reply: String,
        seen: Mutex<Vec<(String, usize, String)>>,
    }

    #[async_trait::async_trait]
    impl InferenceBackend for EchoBackend {
        async fn generate_structured(&self, _request: StructuredRequest) -> Result<String, AiError> {
            Err(AiError::Network("not used".into()))
        }

        async fn chat(
            &self,
            persona: &str,
            history: &[ChatMessage],
            message: &str,
        ) -> Result<String, AiError> {
            self.seen
                .lock()
                .unwrap()
                .push((persona.to_string(), history.len(), message.to_string()));
            Ok(self.reply.clone())
        }
    }

    #[tokio::test]
    async fn test_advise_uses_persona_and_trims() {
        let backend = EchoBackend {
            reply: "  Cut 200Hz by 3dB.\n".into(),
            seen: Mutex::new(Vec::new()),
        };
        let history = vec![ChatMessage::user("hi"), ChatMessage::assistant("hello")];

        let reply = advise(&backend, &history, "My vocal sounds muddy").await.unwrap();

        assert_eq!(reply, "Cut 200Hz by 3dB.");
        let seen = backend.seen.lock().unwrap();
        assert_eq!(seen[0].0, ADVISOR_PERSONA);
        assert_eq!(seen[0].1, 2);
        assert_eq!(seen[0].2, "My vocal sounds muddy");
    }

    #[tokio::test]
    async fn test_empty_reply_is_error() {
        let backend = EchoBackend {
            reply: "   ".into(),
            seen: Mutex::new(Vec::new()),
        };
        assert!(matches!(
            advise(&backend, &[], "hello").await,
            Err(AiError::Malformed(_))
        ));
    }
}
