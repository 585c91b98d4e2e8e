//! Request lifecycle and conversation state.
//!
//! [`ChatSession`] owns the conversation log and the single in-flight flag.
//! Its lifecycle is Idle -> Pending -> Idle: [`ChatSession::submit`] moves to
//! Pending and spawns the outbound call, and [`ChatSession::finish`] moves
//! back to Idle unconditionally, on success and failure alike. At most one
//! request is ever outstanding; while one is, further submissions are
//! refused.

use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::api::GenerateResponse;
use crate::core::message::Message;
use crate::core::service::ModelService;

/// First model turn shown on startup.
pub const GREETING: &str = "Hello! How can I help you today?";

/// Shown when a reply carries neither artifacts nor text.
pub const FALLBACK_REPLY: &str = "Sorry, I could not generate a response. Please try again.";

/// Shown when an outbound failure carries no message of its own.
pub const UNKNOWN_ERROR: &str = "An unknown error occurred.";

/// Terminal event of one request. Exactly one is delivered per submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Reply(String),
    Failure(String),
}

pub struct ChatSession {
    messages: Vec<Message>,
    in_flight: bool,
    service: Arc<dyn ModelService>,
    outcomes: mpsc::UnboundedSender<Outcome>,
}

impl ChatSession {
    pub fn new(service: Arc<dyn ModelService>, outcomes: mpsc::UnboundedSender<Outcome>) -> Self {
        Self {
            messages: vec![Message::model(GREETING)],
            in_flight: false,
            service,
            outcomes,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_pending(&self) -> bool {
        self.in_flight
    }

    /// Idle -> Pending. Trims the input; empty input and submissions while a
    /// request is outstanding are refused without side effects. Otherwise
    /// the prompt is echoed as a user turn and the outbound call is spawned.
    /// Returns whether a request was issued.
    pub fn submit(&mut self, input: &str) -> bool {
        let prompt = input.trim();
        if prompt.is_empty() || self.in_flight {
            return false;
        }

        self.messages.push(Message::user(prompt));
        self.in_flight = true;
        debug!(chars = prompt.len(), "prompt submitted");

        let service = Arc::clone(&self.service);
        let outcomes = self.outcomes.clone();
        let prompt = prompt.to_string();
        tokio::spawn(async move {
            let outcome = match service.generate(&prompt).await {
                Ok(response) => Outcome::Reply(compose_reply(&response)),
                Err(err) => Outcome::Failure(failure_text(&*err)),
            };
            // The receiver only drops on shutdown; a lost outcome is moot then.
            let _ = outcomes.send(outcome);
        });
        true
    }

    /// Pending -> Idle. Unconditional: both outcomes clear the in-flight
    /// flag before the turn is appended, so no result can leave the session
    /// stuck in Pending.
    pub fn finish(&mut self, outcome: Outcome) {
        self.in_flight = false;
        match outcome {
            Outcome::Reply(text) => self.messages.push(Message::model(text)),
            Outcome::Failure(text) => {
                error!(message = %text, "generate request failed");
                self.messages.push(Message::error(text));
            }
        }
    }
}

/// Map a decoded response to the displayed reply text. Ordered policy,
/// first match wins: artifact sections, then plain text, then the fixed
/// fallback.
pub fn compose_reply(response: &GenerateResponse) -> String {
    let parts = response.parts();

    let code = parts.iter().find_map(|part| part.executable_code.as_ref());
    let result = parts
        .iter()
        .find_map(|part| part.code_execution_result.as_ref());

    if code.is_some() || result.is_some() {
        let mut sections = Vec::new();
        if let Some(code) = code {
            let tag = code
                .language
                .as_deref()
                .unwrap_or_default()
                .to_lowercase();
            sections.push(format!(
                "**Code Generated:**\n```{}\n{}\n```",
                tag,
                code.code.trim_end()
            ));
        }
        if let Some(result) = result {
            let output = result.output.as_deref().unwrap_or_default().trim_end();
            sections.push(format!("**Execution Result:**\n```\n{}\n```", output));
        }
        return sections.join("\n\n");
    }

    let text: String = parts
        .iter()
        .filter_map(|part| part.text.as_deref())
        .collect();
    if !text.trim().is_empty() {
        return text;
    }

    FALLBACK_REPLY.to_string()
}

fn failure_text(err: &(dyn std::error::Error + Send + Sync)) -> String {
    let text = err.to_string();
    if text.trim().is_empty() {
        UNKNOWN_ERROR.to_string()
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Candidate, CodeExecutionResult, Content, ExecutableCode, Part};
    use crate::core::message::Sender;
    use crate::core::service::ServiceError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn response_with_parts(parts: Vec<Part>) -> GenerateResponse {
        GenerateResponse {
            candidates: vec![Candidate {
                content: Some(Content { role: None, parts }),
            }],
        }
    }

    fn text_response(text: &str) -> GenerateResponse {
        response_with_parts(vec![Part::text(text)])
    }

    /// Test double that serves one scripted result and counts calls.
    struct ScriptedService {
        result: Mutex<Option<Result<GenerateResponse, String>>>,
        calls: AtomicUsize,
    }

    impl ScriptedService {
        fn replying(response: GenerateResponse) -> Self {
            Self {
                result: Mutex::new(Some(Ok(response))),
                calls: AtomicUsize::new(0),
            }
        }

        fn failing(message: &str) -> Self {
            Self {
                result: Mutex::new(Some(Err(message.to_string()))),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ModelService for ScriptedService {
        async fn generate(&self, _prompt: &str) -> Result<GenerateResponse, ServiceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.result.lock().unwrap().take().expect("unscripted call") {
                Ok(response) => Ok(response),
                Err(message) => Err(message.into()),
            }
        }
    }

    fn session_with(
        service: Arc<ScriptedService>,
    ) -> (ChatSession, mpsc::UnboundedReceiver<Outcome>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ChatSession::new(service, tx), rx)
    }

    fn senders(session: &ChatSession) -> Vec<Sender> {
        session.messages().iter().map(|m| m.sender).collect()
    }

    #[test]
    fn starts_idle_with_greeting() {
        let (session, _rx) = session_with(Arc::new(ScriptedService::replying(text_response("x"))));
        assert!(!session.is_pending());
        assert_eq!(senders(&session), vec![Sender::Model]);
        assert_eq!(session.messages()[0].content, GREETING);
    }

    #[tokio::test]
    async fn submission_yields_one_user_and_one_model_turn() {
        let service = Arc::new(ScriptedService::replying(text_response("Four.")));
        let (mut session, mut rx) = session_with(Arc::clone(&service));

        assert!(session.submit("  what is 2+2?  "));
        assert!(session.is_pending());
        assert_eq!(session.messages().last().unwrap().content, "what is 2+2?");

        let outcome = rx.recv().await.expect("outcome");
        session.finish(outcome);

        assert!(!session.is_pending());
        assert_eq!(senders(&session), vec![Sender::Model, Sender::User, Sender::Model]);
        assert_eq!(session.messages().last().unwrap().content, "Four.");
        assert_eq!(service.calls(), 1);
    }

    #[tokio::test]
    async fn blank_input_is_ignored_without_a_call() {
        let service = Arc::new(ScriptedService::replying(text_response("unused")));
        let (mut session, _rx) = session_with(Arc::clone(&service));

        assert!(!session.submit(""));
        assert!(!session.submit("   \n\t  "));

        assert!(!session.is_pending());
        assert_eq!(senders(&session), vec![Sender::Model]);
        assert_eq!(service.calls(), 0);
    }

    #[tokio::test]
    async fn second_submission_refused_while_pending() {
        let service = Arc::new(ScriptedService::replying(text_response("first")));
        let (mut session, mut rx) = session_with(Arc::clone(&service));

        assert!(session.submit("one"));
        assert!(!session.submit("two"));
        assert_eq!(service.calls(), 1);

        let outcome = rx.recv().await.expect("outcome");
        session.finish(outcome);
        assert!(!session.is_pending());
        // refused submission left no trace
        assert_eq!(senders(&session), vec![Sender::Model, Sender::User, Sender::Model]);
    }

    #[tokio::test]
    async fn failure_surfaces_as_error_turn_and_returns_to_idle() {
        let service = Arc::new(ScriptedService::failing("timeout"));
        let (mut session, mut rx) = session_with(service);

        assert!(session.submit("hello"));
        let outcome = rx.recv().await.expect("outcome");
        assert_eq!(outcome, Outcome::Failure("timeout".to_string()));
        session.finish(outcome);

        assert!(!session.is_pending());
        let last = session.messages().last().unwrap();
        assert_eq!(last.sender, Sender::Error);
        assert_eq!(last.content, "timeout");

        // and the session accepts input again
        assert!(!session.submit("  "));
    }

    #[tokio::test]
    async fn blank_failure_message_becomes_unknown_error() {
        let service = Arc::new(ScriptedService::failing(""));
        let (mut session, mut rx) = session_with(service);

        session.submit("hello");
        let outcome = rx.recv().await.expect("outcome");
        assert_eq!(outcome, Outcome::Failure(UNKNOWN_ERROR.to_string()));
        session.finish(outcome);
        assert_eq!(session.messages().last().unwrap().content, UNKNOWN_ERROR);
    }

    #[test]
    fn compose_reply_orders_code_then_result() {
        let response = response_with_parts(vec![
            Part {
                executable_code: Some(ExecutableCode {
                    language: Some("PYTHON".to_string()),
                    code: "print(1)\n".to_string(),
                }),
                ..Part::default()
            },
            Part {
                code_execution_result: Some(CodeExecutionResult {
                    outcome: Some("OUTCOME_OK".to_string()),
                    output: Some("1\n".to_string()),
                }),
                ..Part::default()
            },
        ]);

        let reply = compose_reply(&response);
        assert_eq!(
            reply,
            "**Code Generated:**\n```python\nprint(1)\n```\n\n**Execution Result:**\n```\n1\n```"
        );
        let code_at = reply.find("Code Generated").unwrap();
        let result_at = reply.find("Execution Result").unwrap();
        assert!(code_at < result_at);
    }

    #[test]
    fn compose_reply_omits_absent_sections() {
        let code_only = response_with_parts(vec![Part {
            executable_code: Some(ExecutableCode {
                language: None,
                code: "ls".to_string(),
            }),
            ..Part::default()
        }]);
        let reply = compose_reply(&code_only);
        assert!(reply.contains("Code Generated"));
        assert!(!reply.contains("Execution Result"));

        let result_only = response_with_parts(vec![Part {
            code_execution_result: Some(CodeExecutionResult {
                outcome: None,
                output: Some("done".to_string()),
            }),
            ..Part::default()
        }]);
        let reply = compose_reply(&result_only);
        assert!(!reply.contains("Code Generated"));
        assert!(reply.contains("Execution Result"));
        assert!(reply.contains("done"));
    }

    #[test]
    fn compose_reply_prefers_artifacts_over_text() {
        let response = response_with_parts(vec![
            Part::text("Here is the code:"),
            Part {
                executable_code: Some(ExecutableCode {
                    language: Some("PYTHON".to_string()),
                    code: "print(1)".to_string(),
                }),
                ..Part::default()
            },
        ]);
        let reply = compose_reply(&response);
        assert!(reply.starts_with("**Code Generated:**"));
    }

    #[test]
    fn compose_reply_concatenates_text_parts() {
        let response =
            response_with_parts(vec![Part::text("Hello, "), Part::text("world.")]);
        assert_eq!(compose_reply(&response), "Hello, world.");
    }

    #[test]
    fn compose_reply_falls_back_on_empty_shapes() {
        assert_eq!(compose_reply(&GenerateResponse::default()), FALLBACK_REPLY);
        let whitespace_text = response_with_parts(vec![Part::text("   \n")]);
        assert_eq!(compose_reply(&whitespace_text), FALLBACK_REPLY);
    }
}
