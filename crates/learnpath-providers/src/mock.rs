//! Mock provider for tests and offline use.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use learnpath_core::traits::{
    GenerateRequest, GenerateResponse, LlmProvider, ModelInfo, TokenUsage,
};

/// Canned quiz matching the strict policy (3 multiple choice, 2 open ended).
pub const SAMPLE_QUIZ: &str = r#"```json
{
  "questions": [
    {
      "id": "q1",
      "text": "Which statement best describes a variable binding that owns its value?",
      "type": "multiple_choice",
      "category": "fundamentals",
      "skillArea": "core concepts",
      "difficulty": "beginner",
      "options": ["It is dropped when it goes out of scope", "It lives forever", "It is always copied", "It cannot be moved"],
      "correctAnswer": "It is dropped when it goes out of scope",
      "explanation": "Owned values are released at the end of their scope.",
      "points": 10
    },
    {
      "id": "q2",
      "text": "What does a shared reference allow?",
      "type": "multiple_choice",
      "category": "fundamentals",
      "skillArea": "core concepts",
      "difficulty": "beginner",
      "options": ["Reading the value", "Mutating the value", "Moving the value", "Freeing the value"],
      "correctAnswer": "Reading the value",
      "explanation": "Shared references are read-only.",
      "points": 10
    },
    {
      "id": "q3",
      "text": "Which tool runs the test suite of a project?",
      "type": "multiple_choice",
      "category": "practical",
      "skillArea": "tooling",
      "difficulty": "intermediate",
      "options": ["A test runner", "A linker", "A formatter", "A debugger"],
      "correctAnswer": "A test runner",
      "explanation": "Test runners discover and execute tests.",
      "points": 10
    },
    {
      "id": "q4",
      "text": "Explain the basic concept of ownership in your own words.",
      "type": "open_ended",
      "category": "fundamentals",
      "skillArea": "core concepts",
      "difficulty": "intermediate",
      "correctAnswer": "Each value has a single owner that releases it.",
      "explanation": "Look for single ownership and scope-based release.",
      "points": 10
    },
    {
      "id": "q5",
      "text": "Describe a practical example where you would structure a project into modules.",
      "type": "open_ended",
      "category": "practical",
      "skillArea": "tooling",
      "difficulty": "intermediate",
      "correctAnswer": "Separating parsing, storage and presentation.",
      "explanation": "Look for separation of concerns.",
      "points": 10
    }
  ]
}
```"#;

/// Canned two-week roadmap.
pub const SAMPLE_ROADMAP: &str = r#"{
  "weeks": [
    {
      "week": 1,
      "theme": "Foundations",
      "topics": ["ownership", "borrowing"],
      "resources": [
        {"type": "article", "title": "Understanding Ownership", "url": "https://doc.rust-lang.org/book/ch04-00-understanding-ownership.html", "difficulty": "beginner"}
      ],
      "project": {"title": "Word counter", "description": "Count words in a text file.", "estimatedHours": 3},
      "weeklyHours": 5
    },
    {
      "week": 2,
      "theme": "Abstractions",
      "topics": ["traits", "generics"],
      "resources": [],
      "project": {"title": "Shape library", "description": "Model shapes with traits.", "estimatedHours": 4},
      "weeklyHours": 5
    }
  ],
  "metadata": {"difficulty": "beginner"}
}"#;

/// A mock LLM provider that answers without network calls.
///
/// Returns configurable responses based on prompt content matching.
pub struct MockProvider {
    /// Map of prompt substring → response text.
    responses: HashMap<String, String>,
    /// Default response if no prompt matches.
    default_response: String,
    call_count: AtomicU32,
    last_request: Mutex<Option<GenerateRequest>>,
}

impl MockProvider {
    /// Create a new mock provider with the given prompt→response mappings.
    pub fn new(responses: HashMap<String, String>) -> Self {
        Self {
            responses,
            default_response: "{}".to_string(),
            call_count: AtomicU32::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Create a mock that always returns the same response.
    pub fn with_fixed_response(response: &str) -> Self {
        Self {
            default_response: response.to_string(),
            ..Self::new(HashMap::new())
        }
    }

    /// A mock that answers quiz prompts with [`SAMPLE_QUIZ`] and roadmap
    /// prompts with [`SAMPLE_ROADMAP`]. Extra mappings take precedence.
    pub fn canned(extra: HashMap<String, String>) -> Self {
        let mut responses = HashMap::from([
            ("placement quiz".to_string(), SAMPLE_QUIZ.to_string()),
            ("learning roadmap".to_string(), SAMPLE_ROADMAP.to_string()),
        ]);
        responses.extend(extra);
        Self::new(responses)
    }

    /// Number of calls made to this provider.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    /// The last request made to this provider.
    pub fn last_request(&self) -> Option<GenerateRequest> {
        self.last_request
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate(&self, request: &GenerateRequest) -> anyhow::Result<GenerateResponse> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        *self.last_request.lock().unwrap_or_else(|e| e.into_inner()) = Some(request.clone());

        // Longest matching key wins so overlapping mappings are deterministic.
        let content = self
            .responses
            .iter()
            .filter(|(key, _)| request.prompt.contains(key.as_str()))
            .max_by_key(|(key, _)| key.len())
            .map(|(_, v)| v.clone())
            .unwrap_or_else(|| self.default_response.clone());

        let prompt_tokens = (request.prompt.len() / 4) as u32; // Rough estimate
        let completion_tokens = (content.len() / 4) as u32;

        Ok(GenerateResponse {
            content,
            model: request.model.clone(),
            token_usage: TokenUsage {
                prompt_tokens,
                completion_tokens,
                total_tokens: prompt_tokens + completion_tokens,
            },
            latency_ms: 1,
        })
    }

    fn available_models(&self) -> Vec<ModelInfo> {
        vec![ModelInfo {
            id: "mock-model".into(),
            name: "Mock Model".into(),
            provider: "mock".into(),
            max_context: 100_000,
        }]
    }
}
