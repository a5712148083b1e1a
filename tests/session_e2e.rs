//! End-to-end coverage for the chat session's generate/tool-execute loop
//! and for cancelling an in-flight stream (`spec.md §8`, scenarios E1/E2).
//!
//! `ScriptedProvider` is a canned, no-network stand-in for a real vendor
//! provider, driven entirely through `conduit_core`'s public capability
//! traits so the session under test can't tell it apart from
//! `conduit_provider_anthropic::Anthropic` et al.

use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use conduit_core::{
    AIProvider, Availability, ChunkStream, ConduitError, FinishReason, GenerateConfig,
    GenerationChunk, GenerationResult, Message, Role, TextGenerator,
};
use conduit_schema::{Generable, GeneratedContent, GenerationSchema, PartiallyGenerated, SchemaNode};
use conduit_session::ChatSession;
use conduit_tool::{MissingToolPolicy, Tool, ToolError, ToolExecutor};
use futures::StreamExt;
use std::collections::BTreeMap;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

struct ScriptedProvider {
    responses: Mutex<Vec<GenerationResult>>,
    cancellation: Arc<StdMutex<CancellationToken>>,
}

impl ScriptedProvider {
    fn new(responses: Vec<GenerationResult>) -> Self {
        Self {
            responses: Mutex::new(responses),
            cancellation: Arc::new(StdMutex::new(CancellationToken::new())),
        }
    }
}

fn text_result(text: &str) -> GenerationResult {
    GenerationResult {
        text: text.to_string(),
        total_tokens: None,
        duration: Duration::from_millis(1),
        finish_reason: FinishReason::Stop,
        usage: None,
        tool_calls: vec![],
        reasoning: None,
    }
}

fn tool_call_result(id: &str, name: &str, args: serde_json::Value) -> GenerationResult {
    GenerationResult {
        text: String::new(),
        total_tokens: None,
        duration: Duration::from_millis(1),
        finish_reason: FinishReason::ToolCall,
        usage: None,
        tool_calls: vec![conduit_core::CompletedToolCall {
            id: id.to_string(),
            name: name.to_string(),
            arguments: args,
        }],
        reasoning: None,
    }
}

impl TextGenerator for ScriptedProvider {
    async fn generate(
        &self,
        _messages: Vec<Message>,
        _model_id: &str,
        _config: &GenerateConfig,
    ) -> Result<GenerationResult, ConduitError> {
        let mut responses = self.responses.lock().await;
        if responses.is_empty() {
            return Err(ConduitError::GenerationFailed(
                "no scripted response left".into(),
            ));
        }
        Ok(responses.remove(0))
    }

    async fn stream_with_metadata(
        &self,
        _messages: Vec<Message>,
        _model_id: &str,
        _config: &GenerateConfig,
    ) -> Result<ChunkStream, ConduitError> {
        let token = {
            let mut guard = self.cancellation.lock().unwrap();
            *guard = CancellationToken::new();
            guard.clone()
        };
        let stream_token = token.clone();
        let inner = async_stream::stream! {
            for i in 0..10_000u32 {
                tokio::select! {
                    biased;
                    () = stream_token.cancelled() => {
                        yield Err(ConduitError::Cancelled);
                        return;
                    }
                    () = tokio::time::sleep(Duration::from_millis(15)) => {}
                }
                yield Ok(GenerationChunk {
                    delta_text: format!("word{i} "),
                    tokens_in_chunk: 1,
                    tokens_per_second: 0.0,
                    is_complete: false,
                    finish_reason: None,
                    usage: None,
                    partial_tool_call: None,
                    completed_tool_calls: vec![],
                });
            }
        };
        Ok(ChunkStream::new(Box::pin(inner), token))
    }
}

impl AIProvider for ScriptedProvider {
    async fn availability(&self) -> Availability {
        Availability::Available
    }

    async fn cancel_generation(&self) {
        self.cancellation.lock().unwrap().cancel();
    }
}

#[derive(Debug, Clone, PartialEq)]
struct WeatherArgs {
    city: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
struct PartialWeatherArgs {
    city: Option<String>,
}

impl Generable for WeatherArgs {
    type Partial = PartialWeatherArgs;

    fn generation_schema() -> GenerationSchema {
        let mut properties = BTreeMap::new();
        properties.insert("city".to_string(), SchemaNode::string());
        GenerationSchema::single(
            "WeatherArgs",
            SchemaNode::object(properties, vec!["city".to_string()]),
        )
    }

    fn from_content(content: &GeneratedContent) -> Result<Self, ConduitError> {
        let city = content
            .get("city")
            .and_then(GeneratedContent::as_str)
            .ok_or_else(|| ConduitError::ConversionFailed("missing `city`".to_string()))?
            .to_string();
        Ok(Self { city })
    }

    fn to_content(&self) -> GeneratedContent {
        GeneratedContent::object(vec![("city".to_string(), GeneratedContent::string(&self.city))])
    }
}

impl PartiallyGenerated for PartialWeatherArgs {
    fn from_partial_content(content: &GeneratedContent) -> Result<Self, ConduitError> {
        Ok(Self {
            city: content
                .get("city")
                .and_then(GeneratedContent::as_str)
                .map(str::to_string),
        })
    }
}

struct WeatherTool;

impl Tool for WeatherTool {
    type Args = WeatherArgs;
    type Output = String;
    const NAME: &'static str = "get_weather";

    fn description(&self) -> &str {
        "Look up current weather for a city"
    }

    async fn call(&self, args: Self::Args) -> Result<Self::Output, ToolError> {
        Ok(format!("72F sunny in {}", args.city))
    }
}

/// E1: a non-streaming chat with a single tool round-trip ends with a
/// five-message log (system, user, assistant-with-tool-call, tool-result,
/// assistant-final) and the session's returned text matches the final
/// assistant turn.
#[tokio::test]
async fn non_streaming_chat_with_tools_completes_the_loop() {
    let provider = ScriptedProvider::new(vec![
        tool_call_result("call-1", "get_weather", serde_json::json!({"city": "Tokyo"})),
        text_result("It's 72°F and sunny in Tokyo."),
    ]);
    let mut executor = ToolExecutor::new(MissingToolPolicy::Throw);
    executor.register(WeatherTool);

    let session = ChatSession::new(provider, "model-x", GenerateConfig::default())
        .with_tool_executor(executor);
    session.set_system_prompt("You are helpful").await;

    let reply = session.send("weather in Tokyo").await.unwrap();
    assert_eq!(reply.text, "It's 72°F and sunny in Tokyo.");
    assert_eq!(reply.turns, 2);

    let messages = session.messages().await;
    assert_eq!(messages.len(), 5);
    assert_eq!(messages[0].role, Role::System);
    assert_eq!(messages[1].role, Role::User);
    assert_eq!(messages[2].role, Role::Assistant);
    assert!(!messages[2].tool_calls().is_empty());
    assert_eq!(messages[3].role, Role::Tool);
    assert_eq!(messages[4].role, Role::Assistant);
    assert_eq!(messages[4].text(), "It's 72°F and sunny in Tokyo.");

    let user_turns = messages.iter().filter(|m| m.role == Role::User).count();
    assert_eq!(user_turns, 1);
}

/// E2: cancelling a long-running stream stops delivery promptly, the
/// consumer observes `Cancelled`, and the producing task still completes
/// (no orphaned task left spinning).
#[tokio::test]
async fn cancelling_a_stream_stops_delivery_and_completes_the_producer() {
    let provider = Arc::new(ScriptedProvider::new(vec![]));
    let stream = provider
        .stream_with_metadata(vec![Message::user("write 10k words")], "model-x", &GenerateConfig::default())
        .await
        .unwrap();

    let consumer = tokio::spawn(async move {
        let mut stream = stream;
        let mut chunks = Vec::new();
        while let Some(item) = stream.next().await {
            match item {
                Ok(chunk) => chunks.push(chunk.delta_text),
                Err(err) => return (chunks, Some(err)),
            }
        }
        (chunks, None)
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    provider.cancel_generation().await;

    let (chunks, error) = tokio::time::timeout(Duration::from_secs(1), consumer)
        .await
        .expect("producer task should complete promptly after cancellation")
        .expect("consumer task should not panic");

    assert!(matches!(error, Some(ConduitError::Cancelled)));
    // A handful of chunks arrived before cancellation (roughly 100ms / 15ms),
    // but nowhere near the full 10,000-chunk script.
    assert!(chunks.len() < 20, "expected cancellation well before the stream finished, got {} chunks", chunks.len());
}
