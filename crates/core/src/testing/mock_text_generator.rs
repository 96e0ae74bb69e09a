//! Mock text generator for testing.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::CoreError;
use crate::llm::{GenerationRequest, GenerationResponse, TextGenerator, TokenUsage};

/// Mock implementation of the [`TextGenerator`] trait.
///
/// Responses are a FIFO queue: each `generate` call consumes the next queued
/// response or error. Every request is recorded for assertions.
pub struct MockTextGenerator {
    queue: Mutex<VecDeque<Result<String, CoreError>>>,
    calls: Mutex<Vec<GenerationRequest>>,
}

impl Default for MockTextGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTextGenerator {
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Queue a text response.
    pub fn push_response(&self, text: String) {
        self.queue.lock().unwrap().push_back(Ok(text));
    }

    /// Queue an error in place of a response.
    pub fn push_error(&self, error: CoreError) {
        self.queue.lock().unwrap().push_back(Err(error));
    }

    /// Every request seen so far, in call order.
    pub fn calls(&self) -> Vec<GenerationRequest> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for MockTextGenerator {
    fn provider(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationResponse, CoreError> {
        self.calls.lock().unwrap().push(request);
        let next = self.queue.lock().unwrap().pop_front();
        match next {
            Some(Ok(text)) => Ok(GenerationResponse {
                text,
                usage: TokenUsage {
                    input_tokens: 100,
                    output_tokens: 100,
                },
                model: "mock-model".to_string(),
            }),
            Some(Err(error)) => Err(error),
            None => Err(CoreError::Internal(
                "mock text generator queue is empty".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_responses_consumed_in_order() {
        let llm = MockTextGenerator::new();
        llm.push_response("first".to_string());
        llm.push_response("second".to_string());

        let a = llm.generate(GenerationRequest::new("one")).await.unwrap();
        let b = llm.generate(GenerationRequest::new("two")).await.unwrap();
        assert_eq!(a.text, "first");
        assert_eq!(b.text, "second");

        let calls = llm.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].prompt, "one");
    }

    #[tokio::test]
    async fn test_queued_error_is_returned() {
        let llm = MockTextGenerator::new();
        llm.push_error(CoreError::RateLimit("slow down".to_string()));

        let err = llm
            .generate(GenerationRequest::new("prompt"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "rate_limit");
    }

    #[tokio::test]
    async fn test_empty_queue_is_an_internal_error() {
        let llm = MockTextGenerator::new();
        let err = llm
            .generate(GenerationRequest::new("prompt"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "internal_error");
    }
}
