use futures::StreamExt;

use crate::stream::QueryStream;
use crate::types::{ContentBlock, TokenUsage, UserContentBlock};
use crate::usage::UsageStats;
use crate::{query, ClaudeAgentError, Message, QueryOptions, Result};

// ─── TurnEvent ────────────────────────────────────────────────────────────

/// Progress within one turn, reported as messages arrive.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnEvent {
    Text(String),
    ToolUse {
        name: String,
        input: serde_json::Value,
    },
    ToolResult {
        is_error: bool,
    },
    Thinking(String),
}

// ─── TurnResult ───────────────────────────────────────────────────────────

/// The outcome of one user message.
#[derive(Debug, Clone)]
pub struct TurnResult {
    pub session_id: String,
    /// Final answer; for a failed run, the reason it failed.
    pub text: String,
    pub is_error: bool,
    pub total_cost_usd: f64,
    pub num_turns: u32,
    pub usage: TokenUsage,
}

/// Consume a [`QueryStream`], reporting progress, until the result message.
pub(crate) async fn collect(
    mut stream: QueryStream,
    on_event: &mut dyn FnMut(TurnEvent),
) -> Result<(TurnResult, crate::ResultMessage)> {
    while let Some(msg) = stream.next().await {
        match msg? {
            Message::System(sys) => {
                if let crate::SystemPayload::Init(init) = &sys.payload {
                    for srv in init.failed_servers() {
                        tracing::warn!(server = %srv.name, status = %srv.status, "MCP server not connected");
                    }
                }
            }
            Message::Assistant(a) => {
                for block in a.message.content {
                    match block {
                        ContentBlock::Text { text } if !text.is_empty() => {
                            on_event(TurnEvent::Text(text))
                        }
                        ContentBlock::ToolUse { name, input, .. } => {
                            on_event(TurnEvent::ToolUse { name, input })
                        }
                        ContentBlock::Thinking { thinking } => on_event(TurnEvent::Thinking(thinking)),
                        _ => {}
                    }
                }
            }
            Message::User(u) => {
                for block in u.message.content {
                    if let UserContentBlock::ToolResult { is_error, .. } = block {
                        on_event(TurnEvent::ToolResult {
                            is_error: is_error.unwrap_or(false),
                        });
                    }
                }
            }
            Message::Result(r) => {
                let turn = TurnResult {
                    session_id: r.session_id.clone(),
                    text: if r.is_error() {
                        r.error_text()
                    } else {
                        r.result_text().unwrap_or("").to_string()
                    },
                    is_error: r.is_error(),
                    total_cost_usd: r.total_cost_usd,
                    num_turns: r.num_turns,
                    usage: r.usage.clone(),
                };
                return Ok((turn, r));
            }
        }
    }
    Err(ClaudeAgentError::Process(
        "stream ended without a result message".into(),
    ))
}

// ─── ChatSession ──────────────────────────────────────────────────────────

/// A multi-turn conversation: each message resumes the previous session and
/// usage accumulates across turns.
///
/// ```rust,ignore
/// let mut chat = ChatSession::new(opts);
/// let turn = chat.send("今天要做什麼？", &mut |ev| println!("{ev:?}")).await?;
/// println!("{}\n{}", turn.text, chat.usage().summary_line());
/// ```
pub struct ChatSession {
    opts: QueryOptions,
    session_id: Option<String>,
    usage: UsageStats,
    #[cfg(test)]
    scripted: std::collections::VecDeque<Vec<Result<Message>>>,
}

impl ChatSession {
    pub fn new(opts: QueryOptions) -> Self {
        ChatSession {
            opts,
            session_id: None,
            usage: UsageStats::default(),
            #[cfg(test)]
            scripted: Default::default(),
        }
    }

    /// Continue a previously saved session.
    pub fn resume(opts: QueryOptions, session_id: impl Into<String>) -> Self {
        let mut chat = Self::new(opts);
        chat.session_id = Some(session_id.into());
        chat
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn usage(&self) -> &UsageStats {
        &self.usage
    }

    pub fn options(&self) -> &QueryOptions {
        &self.opts
    }

    /// Start over: the next message opens a new session. Usage is kept.
    pub fn reset(&mut self) {
        self.session_id = None;
    }

    /// Send one user message and wait for the answer.
    ///
    /// If resuming fails before any result (an expired or unknown session),
    /// the message is retried once in a fresh session.
    pub async fn send(
        &mut self,
        prompt: &str,
        on_event: &mut dyn FnMut(TurnEvent),
    ) -> Result<TurnResult> {
        let outcome = match self.turn(prompt, on_event).await {
            Err(e) if self.session_id.is_some() => {
                tracing::warn!(error = %e, "resume failed, starting a new session");
                self.session_id = None;
                self.turn(prompt, on_event).await
            }
            other => other,
        };
        let (turn, raw) = outcome?;
        self.usage.record(&raw);
        if !turn.session_id.is_empty() {
            self.session_id = Some(turn.session_id.clone());
        }
        Ok(turn)
    }

    async fn turn(
        &mut self,
        prompt: &str,
        on_event: &mut dyn FnMut(TurnEvent),
    ) -> Result<(TurnResult, crate::ResultMessage)> {
        let mut opts = self.opts.clone();
        opts.resume = self.session_id.clone();
        collect(self.stream(prompt, opts), on_event).await
    }

    #[cfg(not(test))]
    fn stream(&mut self, prompt: &str, opts: QueryOptions) -> QueryStream {
        query(prompt, opts)
    }

    #[cfg(test)]
    fn stream(&mut self, prompt: &str, opts: QueryOptions) -> QueryStream {
        match self.scripted.pop_front() {
            Some(messages) => tests::channel_stream(messages),
            None => query(prompt, opts),
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tokio::sync::mpsc;

    pub(crate) fn channel_stream(messages: Vec<Result<Message>>) -> QueryStream {
        let (tx, rx) = mpsc::channel(32);
        tokio::spawn(async move {
            for msg in messages {
                if tx.send(msg).await.is_err() {
                    break;
                }
            }
        });
        QueryStream::from_channel(rx)
    }

    fn parse(json: serde_json::Value) -> Message {
        serde_json::from_value(json).unwrap()
    }

    fn success(session: &str, text: &str) -> Message {
        parse(serde_json::json!({
            "type": "result",
            "subtype": "success",
            "session_id": session,
            "result": text,
            "is_error": false,
            "num_turns": 3,
            "total_cost_usd": 0.012,
            "usage": {"input_tokens": 100, "output_tokens": 50}
        }))
    }

    fn budget_exceeded() -> Message {
        parse(serde_json::json!({
            "type": "result",
            "subtype": "error_max_budget_usd",
            "session_id": "s2",
            "is_error": true,
            "num_turns": 4,
            "total_cost_usd": 0.5,
            "usage": {"input_tokens": 50, "output_tokens": 20}
        }))
    }

    fn assistant() -> Message {
        parse(serde_json::json!({
            "type": "assistant",
            "session_id": "s1",
            "message": {"content": [
                {"type": "thinking", "thinking": "看一下專案"},
                {"type": "tool_use", "id": "t1", "name": "mcp__komorebi__list_projects", "input": {}},
                {"type": "text", "text": ""}
            ]}
        }))
    }

    fn tool_result(is_error: bool) -> Message {
        parse(serde_json::json!({
            "type": "user",
            "session_id": "s1",
            "message": {"content": [
                {"type": "tool_result", "tool_use_id": "t1", "content": "x", "is_error": is_error}
            ]}
        }))
    }

    #[tokio::test]
    async fn collect_reports_events_in_order() {
        let stream = channel_stream(vec![
            Ok(assistant()),
            Ok(tool_result(true)),
            Ok(success("s1", "完成")),
        ]);
        let mut events = Vec::new();
        let (turn, _) = collect(stream, &mut |e| events.push(e)).await.unwrap();
        assert_eq!(turn.text, "完成");
        assert_eq!(turn.num_turns, 3);
        assert!(!turn.is_error);
        assert_eq!(
            events,
            vec![
                TurnEvent::Thinking("看一下專案".into()),
                TurnEvent::ToolUse {
                    name: "mcp__komorebi__list_projects".into(),
                    input: serde_json::json!({}),
                },
                TurnEvent::ToolResult { is_error: true },
            ]
        );
    }

    #[tokio::test]
    async fn error_result_carries_reason() {
        let stream = channel_stream(vec![Ok(budget_exceeded())]);
        let (turn, _) = collect(stream, &mut |_| {}).await.unwrap();
        assert!(turn.is_error);
        assert_eq!(turn.text, "budget limit reached");
    }

    #[tokio::test]
    async fn stream_without_result_is_an_error() {
        let (tx, rx) = mpsc::channel::<Result<Message>>(1);
        drop(tx);
        let err = collect(QueryStream::from_channel(rx), &mut |_| {})
            .await
            .unwrap_err();
        assert!(err.to_string().contains("result message"));
    }

    #[tokio::test]
    async fn send_tracks_session_and_usage() {
        let mut chat = ChatSession::new(QueryOptions::default());
        chat.scripted.push_back(vec![Ok(success("s1", "a"))]);
        chat.scripted.push_back(vec![Ok(success("s1", "b"))]);

        chat.send("hi", &mut |_| {}).await.unwrap();
        assert_eq!(chat.session_id(), Some("s1"));
        let turn = chat.send("again", &mut |_| {}).await.unwrap();
        assert_eq!(turn.text, "b");
        assert_eq!(chat.usage().queries, 2);
        assert_eq!(chat.usage().input_tokens, 200);
        assert_eq!(chat.usage().turns, 6);
    }

    #[tokio::test]
    async fn failed_resume_retries_in_a_fresh_session() {
        let mut chat = ChatSession::resume(QueryOptions::default(), "stale");
        chat.scripted.push_back(vec![Err(ClaudeAgentError::Process(
            "claude exited with code 1\nstderr: No conversation found".into(),
        ))]);
        chat.scripted.push_back(vec![Ok(success("fresh", "ok"))]);

        let turn = chat.send("hi", &mut |_| {}).await.unwrap();
        assert_eq!(turn.text, "ok");
        assert_eq!(chat.session_id(), Some("fresh"));
    }

    #[tokio::test]
    async fn failure_without_session_is_returned() {
        let mut chat = ChatSession::new(QueryOptions::default());
        chat.scripted
            .push_back(vec![Err(ClaudeAgentError::Process("boom".into()))]);
        assert!(chat.send("hi", &mut |_| {}).await.is_err());
        assert_eq!(chat.usage().queries, 0);
    }

    #[tokio::test]
    async fn reset_forgets_session_but_keeps_usage() {
        let mut chat = ChatSession::new(QueryOptions::default());
        chat.scripted.push_back(vec![Ok(success("s1", "a"))]);
        chat.send("hi", &mut |_| {}).await.unwrap();
        chat.reset();
        assert!(chat.session_id().is_none());
        assert_eq!(chat.usage().queries, 1);
    }
}
