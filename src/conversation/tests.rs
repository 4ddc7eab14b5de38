use super::*;
use crate::tools::ToolHandler;
use crate::types::{StreamingUpdate, ToolCallFragment};
use crate::utils::AssemblyError;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Replays canned replies and records the history of every dispatch.
#[derive(Default)]
struct ScriptedProvider {
    completions: Mutex<VecDeque<Completion>>,
    streams: Mutex<VecDeque<Vec<StreamingUpdate>>>,
    seen: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedProvider {
    fn completions(replies: impl IntoIterator<Item = Completion>) -> Arc<Self> {
        Arc::new(Self {
            completions: Mutex::new(replies.into_iter().collect()),
            ..Self::default()
        })
    }

    fn streams(replies: impl IntoIterator<Item = Vec<StreamingUpdate>>) -> Arc<Self> {
        Arc::new(Self {
            streams: Mutex::new(replies.into_iter().collect()),
            ..Self::default()
        })
    }

    fn seen(&self) -> Vec<Vec<Message>> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatProvider for ScriptedProvider {
    async fn complete(&self, request: ChatRequest<'_>) -> Result<Completion> {
        self.seen.lock().unwrap().push(request.messages.to_vec());
        self.completions
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| Error::runtime("script exhausted"))
    }

    async fn complete_stream(
        &self,
        request: ChatRequest<'_>,
    ) -> Result<BoxStream<'static, StreamingUpdate>> {
        self.seen.lock().unwrap().push(request.messages.to_vec());
        let updates = self
            .streams
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| Error::runtime("script exhausted"))?;
        Ok(Box::pin(futures::stream::iter(updates.into_iter().map(Ok))))
    }
}

/// Records every invocation in a shared log.
struct Recording {
    name: &'static str,
    log: CallLog,
}

#[async_trait]
impl ToolHandler for Recording {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        "records its calls"
    }

    fn parameters_schema(&self) -> Value {
        json!({"type": "object"})
    }

    async fn invoke(&self, parameters: Value) -> String {
        self.log
            .lock()
            .unwrap()
            .push((self.name.to_string(), parameters));
        format!("{} done", self.name)
    }
}

type CallLog = Arc<Mutex<Vec<(String, Value)>>>;

fn recording_registry(names: &[&'static str]) -> (Arc<ToolRegistry>, CallLog) {
    let log = Arc::new(Mutex::new(Vec::new()));
    let registry = ToolRegistry::new(names.iter().map(|&name| {
        Arc::new(Recording {
            name,
            log: Arc::clone(&log),
        }) as Arc<dyn ToolHandler>
    }));
    (Arc::new(registry), log)
}

#[tokio::test]
async fn direct_answer_needs_one_dispatch() {
    let provider = ScriptedProvider::completions([Completion::stop("Hello!")]);
    let conversation = Conversation::new(provider.clone(), Arc::new(ToolRegistry::default()));

    let outcome = conversation.run("sys", "hi").await.unwrap();
    assert_eq!(outcome.content(), "Hello!");
    assert_eq!(outcome.dispatches, 1);
    assert_eq!(outcome.history.len(), 3);
    assert_eq!(outcome.history[2], Message::assistant("Hello!"));
    assert_eq!(
        provider.seen()[0],
        vec![Message::system("sys"), Message::user("hi")]
    );
}

#[tokio::test]
async fn tool_round_trip_appends_result_and_redispatches() {
    let provider = ScriptedProvider::completions([
        Completion::tool_calls(vec![ToolCall::new(
            "c1",
            "GetBirthdays",
            "{\"birthday\":\"2024-03-10\"}",
        )]),
        Completion::stop("Lucy and Nina."),
    ]);
    let registry = Arc::new(ToolRegistry::with_builtin_tools());
    let conversation = Conversation::new(provider.clone(), registry);

    let outcome = conversation.run("sys", "whose birthday?").await.unwrap();
    assert_eq!(outcome.dispatches, 2);
    assert_eq!(outcome.content(), "Lucy and Nina.");

    let second = &provider.seen()[1];
    assert_eq!(second.len(), 4);
    assert_eq!(second[2].tool_calls()[0].id, "c1");
    assert_eq!(
        second[3],
        Message::tool_result("c1", "People with a birthday on 2024-03-10: Lucy, Nina.")
    );
}

#[tokio::test]
async fn calls_from_one_turn_run_in_listed_order() {
    let provider = ScriptedProvider::completions([
        Completion::tool_calls(vec![
            ToolCall::new("c-a", "a", "{}"),
            ToolCall::new("c-b", "b", "{\"x\":1}"),
        ]),
        Completion::stop("ok"),
    ]);
    let (registry, log) = recording_registry(&["a", "b"]);
    let conversation = Conversation::new(provider.clone(), registry);

    let outcome = conversation.run("sys", "go").await.unwrap();
    assert_eq!(outcome.dispatches, 2);

    let calls = log.lock().unwrap().clone();
    assert_eq!(
        calls,
        vec![
            ("a".to_string(), json!({})),
            ("b".to_string(), json!({"x": 1})),
        ]
    );
    let second = &provider.seen()[1];
    assert_eq!(second[3], Message::tool_result("c-a", "a done"));
    assert_eq!(second[4], Message::tool_result("c-b", "b done"));
}

#[tokio::test]
async fn unknown_tool_becomes_result_text() {
    let provider = ScriptedProvider::completions([
        Completion::tool_calls(vec![ToolCall::new("c1", "Teleport", "{}")]),
        Completion::stop("sorry"),
    ]);
    let conversation = Conversation::new(provider.clone(), Arc::new(ToolRegistry::default()));

    conversation.run("sys", "beam me up").await.unwrap();
    assert_eq!(
        provider.seen()[1][3],
        Message::tool_result("c1", "Tool \"Teleport\" is not registered.")
    );
}

#[tokio::test]
async fn length_is_a_final_answer() {
    let provider = ScriptedProvider::completions([Completion::new(FinishReason::Length, "trunc")]);
    let conversation = Conversation::new(provider, Arc::new(ToolRegistry::default()));

    let outcome = conversation.run("sys", "long").await.unwrap();
    assert_eq!(outcome.completion.finish_reason, FinishReason::Length);
    assert_eq!(outcome.content(), "trunc");
}

#[tokio::test]
async fn unsupported_finish_reason_fails_the_run() {
    let provider =
        ScriptedProvider::completions([Completion::new(FinishReason::ContentFilter, "")]);
    let conversation = Conversation::new(provider, Arc::new(ToolRegistry::default()));

    let err = conversation.run("sys", "x").await.unwrap_err();
    assert!(matches!(err, Error::UnexpectedFinish { ref reason } if reason == "content_filter"));
}

#[tokio::test]
async fn provider_error_propagates() {
    let provider = ScriptedProvider::completions([]);
    let conversation = Conversation::new(provider, Arc::new(ToolRegistry::default()));
    assert!(conversation.run("sys", "x").await.is_err());
}

#[tokio::test]
async fn streaming_reassembles_fragments_and_forwards_content() {
    let provider = ScriptedProvider::streams([
        vec![
            StreamingUpdate::content("Let me check. "),
            StreamingUpdate::tool_call(
                ToolCallFragment::new(0)
                    .with_id("c1")
                    .with_name("GetBirthdays")
                    .with_arguments(""),
            ),
            StreamingUpdate::tool_call(ToolCallFragment::new(0).with_arguments("{\"birth")),
            StreamingUpdate::tool_call(
                ToolCallFragment::new(0).with_arguments("day\":\"2024-01-01\"}"),
            ),
            StreamingUpdate::finished(FinishReason::ToolCalls),
        ],
        vec![
            StreamingUpdate::content("It is "),
            StreamingUpdate::content("Kay."),
            StreamingUpdate::finished(FinishReason::Stop),
        ],
    ]);
    let conversation = Conversation::new(
        provider.clone(),
        Arc::new(ToolRegistry::with_builtin_tools()),
    );

    let events: Vec<ConversationEvent> = conversation
        .run_streaming("sys", "who?")
        .map(|e| e.unwrap())
        .collect()
        .await;

    assert_eq!(events[0], ConversationEvent::ContentDelta("Let me check. ".into()));
    assert_eq!(
        events[1],
        ConversationEvent::ToolResult {
            call_id: "c1".into(),
            name: "GetBirthdays".into(),
            content: "People with a birthday on 2024-01-01: Kay.".into(),
        }
    );
    assert_eq!(events[2], ConversationEvent::ContentDelta("It is ".into()));
    assert_eq!(events[3], ConversationEvent::ContentDelta("Kay.".into()));
    match &events[4] {
        ConversationEvent::Finished {
            reason,
            content,
            history,
        } => {
            assert_eq!(*reason, FinishReason::Stop);
            assert_eq!(content, "It is Kay.");
            assert_eq!(history.len(), 5);
            assert_eq!(history[2].text(), Some("Let me check. "));
            assert_eq!(
                history[2].tool_calls()[0].arguments,
                "{\"birthday\":\"2024-01-01\"}"
            );
        }
        other => panic!("expected Finished, got {other:?}"),
    }
    assert_eq!(events.len(), 5);
    assert_eq!(provider.seen().len(), 2);
}

#[tokio::test]
async fn streaming_interleaved_calls_keep_first_seen_order() {
    let provider = ScriptedProvider::streams([
        vec![
            StreamingUpdate::tool_call(ToolCallFragment::new(1).with_id("c-b").with_name("b")),
            StreamingUpdate::tool_call(ToolCallFragment::new(0).with_id("c-a").with_name("a")),
            StreamingUpdate::tool_call(ToolCallFragment::new(0).with_arguments("{}")),
            StreamingUpdate::tool_call(ToolCallFragment::new(1).with_arguments("{}")),
            StreamingUpdate::finished(FinishReason::ToolCalls),
        ],
        vec![StreamingUpdate::finished(FinishReason::Stop)],
    ]);
    let (registry, log) = recording_registry(&["a", "b"]);
    let conversation = Conversation::new(provider, registry);

    let events: Vec<_> = conversation.run_streaming("sys", "go").collect().await;
    assert!(events.iter().all(|e| e.is_ok()));

    let order: Vec<String> = log.lock().unwrap().iter().map(|(n, _)| n.clone()).collect();
    assert_eq!(order, vec!["b", "a"]);
}

#[tokio::test]
async fn streaming_orphan_fragment_is_an_error() {
    let provider = ScriptedProvider::streams([vec![
        StreamingUpdate::tool_call(ToolCallFragment::new(3).with_arguments("{}")),
        StreamingUpdate::finished(FinishReason::ToolCalls),
    ]]);
    let conversation = Conversation::new(provider, Arc::new(ToolRegistry::default()));

    let events: Vec<_> = conversation.run_streaming("sys", "x").collect().await;
    assert_eq!(events.len(), 1);
    match &events[0] {
        Err(Error::Assembly(AssemblyError::OrphanFragment { index })) => assert_eq!(*index, 3),
        other => panic!("expected orphan fragment error, got {other:?}"),
    }
}

#[tokio::test]
async fn streaming_without_finish_reason_is_an_error() {
    let provider = ScriptedProvider::streams([vec![StreamingUpdate::content("partial")]]);
    let conversation = Conversation::new(provider, Arc::new(ToolRegistry::default()));

    let events: Vec<_> = conversation.run_streaming("sys", "x").collect().await;
    assert_eq!(events.len(), 2);
    assert!(matches!(&events[0], Ok(ConversationEvent::ContentDelta(t)) if t == "partial"));
    assert!(events[1].is_err());
}

#[tokio::test]
async fn default_stream_replays_one_shot_completions() {
    struct OneShotOnly;

    #[async_trait]
    impl ChatProvider for OneShotOnly {
        async fn complete(&self, request: ChatRequest<'_>) -> Result<Completion> {
            if request.messages.len() == 2 {
                Ok(Completion::tool_calls(vec![ToolCall::new(
                    "c1",
                    "GetBirthdays",
                    "{\"birthday\":\"1999-12-31\"}",
                )]))
            } else {
                Ok(Completion::stop("nobody"))
            }
        }
    }

    let conversation = Conversation::new(
        Arc::new(OneShotOnly),
        Arc::new(ToolRegistry::with_builtin_tools()),
    );
    let events: Vec<_> = conversation
        .run_streaming("sys", "x")
        .map(|e| e.unwrap())
        .collect()
        .await;

    assert_eq!(
        events[0],
        ConversationEvent::ToolResult {
            call_id: "c1".into(),
            name: "GetBirthdays".into(),
            content: "No known birthdays on 1999-12-31.".into(),
        }
    );
    assert!(matches!(
        &events[2],
        ConversationEvent::Finished { content, .. } if content == "nobody"
    ));
}

#[tokio::test]
async fn dropping_the_stream_stops_the_run() {
    let provider = ScriptedProvider::streams([
        vec![
            StreamingUpdate::content("pre "),
            StreamingUpdate::tool_call(ToolCallFragment::new(0).with_id("c1").with_name("a")),
            StreamingUpdate::tool_call(ToolCallFragment::new(0).with_arguments("{}")),
            StreamingUpdate::finished(FinishReason::ToolCalls),
        ],
        vec![StreamingUpdate::content("never"), StreamingUpdate::finished(FinishReason::Stop)],
    ]);
    let (registry, log) = recording_registry(&["a"]);
    let conversation = Conversation::new(provider.clone(), registry);

    let mut events = conversation.run_streaming("sys", "go");
    let first = events.next().await;
    assert!(matches!(first, Some(Ok(ConversationEvent::ContentDelta(ref t))) if t == "pre "));
    drop(events);

    assert_eq!(provider.seen().len(), 1);
    assert!(log.lock().unwrap().is_empty());
}

#[tokio::test]
async fn tool_calls_finish_without_calls_fails_fast() {
    let provider = ScriptedProvider::completions([
        Completion::tool_calls(Vec::new()),
        Completion::stop("unreachable"),
    ]);
    let conversation = Conversation::new(provider.clone(), Arc::new(ToolRegistry::default()));

    let err = conversation.run("sys", "x").await.unwrap_err();
    match err {
        Error::Runtime { message, context } => {
            assert_eq!(message, "tool_calls finish without calls");
            assert_eq!(context.details.as_deref(), Some("turn 1"));
        }
        other => panic!("expected runtime error, got {other:?}"),
    }
    assert_eq!(provider.seen().len(), 1);
}

#[tokio::test]
async fn streaming_tool_calls_finish_without_fragments_fails_fast() {
    let provider = ScriptedProvider::streams([
        vec![
            StreamingUpdate::content("thinking"),
            StreamingUpdate::finished(FinishReason::ToolCalls),
        ],
        vec![StreamingUpdate::finished(FinishReason::Stop)],
    ]);
    let conversation = Conversation::new(provider.clone(), Arc::new(ToolRegistry::default()));

    let events: Vec<_> = conversation.run_streaming("sys", "x").collect().await;
    assert_eq!(events.len(), 2);
    assert!(matches!(
        &events[1],
        Err(Error::Runtime { message, .. }) if message == "tool_calls finish without calls"
    ));
    assert_eq!(provider.seen().len(), 1);
}
