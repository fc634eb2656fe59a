//! Conversation agent
//!
//! Two states: Idle (awaiting input) and Executing (tool call in flight).
//! Each user turn allows at most one SQL statement through the tool before
//! the final natural-language reply.

pub mod prompt;
pub mod rules;
pub mod sql_tool;

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Local;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::db::repositories::transaction::TransactionRepository;
use crate::db::{Database, MessageRepository};
use crate::model::{with_retries, ChatMessage, ChatRequest, ModelProvider, ToolSpec};

pub use sql_tool::{SqlOutcome, SqlTool};

/// Fallback reply when a turn fails after retries; nothing in the agent is
/// fatal to the process.
pub const PROCESSING_ERROR_REPLY: &str =
    "ledgerchat: Sorry, I ran into an error processing that. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentState {
    Idle,
    Executing,
}

/// A tool call the model requested during a turn.
#[derive(Debug, Clone)]
pub struct ToolInvocation {
    pub name: String,
    pub arguments: String,
}

/// Outcome of one user turn: the reply, the SQL that actually ran (if
/// any), and every tool call the model requested.
#[derive(Debug, Clone)]
pub struct AgentReply {
    pub text: String,
    pub executed_sql: Option<String>,
    pub tool_calls: Vec<ToolInvocation>,
}

#[derive(Debug, Deserialize)]
struct SqlToolArgs {
    statement: String,
}

fn sql_tool_spec() -> ToolSpec {
    ToolSpec::function(
        "execute_sql",
        "Execute one SQL statement against the transactions ledger",
        json!({
            "type": "object",
            "properties": {
                "statement": {
                    "type": "string",
                    "description": "A single SQL statement (INSERT, SELECT, UPDATE or DELETE)"
                }
            },
            "required": ["statement"]
        }),
    )
}

pub struct ConversationAgent<P: ModelProvider> {
    provider: Arc<P>,
    model: String,
    tool: SqlTool,
    messages: MessageRepository,
    retries: u32,
    state: AgentState,
}

impl<P: ModelProvider> ConversationAgent<P> {
    pub fn new(provider: Arc<P>, model: impl Into<String>, db: Database, retries: u32) -> Self {
        Self {
            provider,
            model: model.into(),
            tool: SqlTool::new(db.clone()),
            messages: MessageRepository::new(db),
            retries,
            state: AgentState::Idle,
        }
    }

    pub fn state(&self) -> AgentState {
        self.state
    }

    /// Run one user turn: append to history, ask the model, honor at most
    /// one tool call, and return the final reply.
    pub async fn chat(&mut self, session_id: &str, user_text: &str) -> Result<AgentReply> {
        self.messages.append(session_id, "user", user_text).await?;

        let mut convo = vec![ChatMessage::system(prompt::system_prompt(
            Local::now().date_naive(),
        ))];
        for stored in self.messages.history(session_id).await? {
            let message = match stored.role.as_str() {
                "user" => ChatMessage::user(stored.content),
                _ => ChatMessage::assistant(stored.content),
            };
            convo.push(message);
        }

        let request = ChatRequest {
            model: self.model.clone(),
            messages: convo.clone(),
            tools: Some(vec![sql_tool_spec()]),
            temperature: Some(0.0),
            max_completion_tokens: None,
        };

        let provider = Arc::clone(&self.provider);
        let first = with_retries(self.retries, "chat completion", || {
            let request = request.clone();
            let provider = Arc::clone(&provider);
            async move { provider.complete(request).await }
        })
        .await?;

        let reply = match first.tool_calls.as_deref() {
            Some([call, rest @ ..]) => {
                if !rest.is_empty() {
                    warn!(
                        "Model requested {} tool calls; honoring only the first",
                        rest.len() + 1
                    );
                }
                self.state = AgentState::Executing;
                let result = self.tool_turn(convo, &first, call).await;
                self.state = AgentState::Idle;
                result?
            }
            _ => AgentReply {
                text: first.text(),
                executed_sql: None,
                tool_calls: Vec::new(),
            },
        };

        self.messages
            .append(session_id, "assistant", &reply.text)
            .await?;

        Ok(reply)
    }

    /// Execute the requested statement, feed the result back, and get the
    /// final reply from the model.
    async fn tool_turn(
        &self,
        mut convo: Vec<ChatMessage>,
        assistant: &ChatMessage,
        call: &crate::model::ToolCallRequest,
    ) -> Result<AgentReply> {
        let invocation = ToolInvocation {
            name: call.function.name.clone(),
            arguments: call.function.arguments.clone(),
        };

        let mut executed_sql = None;
        let outcome_text = if call.function.name == "execute_sql" {
            let args: SqlToolArgs = serde_json::from_str(&call.function.arguments)
                .context("Malformed execute_sql arguments")?;
            match self.tool.execute(&args.statement).await {
                Ok(outcome) => {
                    debug!("SQL tool outcome: {}", outcome.render());
                    executed_sql = Some(args.statement);
                    outcome.render()
                }
                // SQL failures go back to the model so it can apologize or
                // correct itself; they are not fatal to the turn.
                Err(e) => format!("SQL error: {}", e),
            }
        } else {
            format!("Unknown tool: {}", call.function.name)
        };

        convo.push(assistant.clone());
        convo.push(ChatMessage::tool_result(call.id.clone(), outcome_text));

        let request = ChatRequest {
            model: self.model.clone(),
            messages: convo,
            tools: None,
            temperature: Some(0.0),
            max_completion_tokens: None,
        };

        let provider = Arc::clone(&self.provider);
        let second = with_retries(self.retries, "chat completion (tool reply)", || {
            let request = request.clone();
            let provider = Arc::clone(&provider);
            async move { provider.complete(request).await }
        })
        .await?;

        Ok(AgentReply {
            text: second.text(),
            executed_sql,
            tool_calls: vec![invocation],
        })
    }
}

/// One turn without a hosted endpoint: the keyword rules classify the
/// utterance and the repository records it directly.
pub async fn offline_turn(
    repo: &TransactionRepository,
    messages: &MessageRepository,
    session_id: &str,
    user_text: &str,
) -> Result<AgentReply> {
    messages.append(session_id, "user", user_text).await?;

    let today = Local::now().date_naive();
    let reply = match rules::classify(user_text, today) {
        Some(tx) => {
            let date = tx.date.unwrap_or(today);
            let statement = format!(
                "INSERT INTO transactions (date, description, amount, category, kind) \
                 VALUES ('{}', '{}', {}, '{}', '{}')",
                date.format("%Y-%m-%d"),
                tx.description.replace('\'', "''"),
                tx.amount,
                tx.category.as_str(),
                tx.kind.as_str(),
            );
            let text = format!(
                "ledgerchat: Recorded: {} - {:.2} ({})",
                tx.description,
                tx.amount,
                tx.category.as_str()
            );
            repo.insert(tx).await?;
            AgentReply {
                text,
                executed_sql: Some(statement),
                tool_calls: Vec::new(),
            }
        }
        None => AgentReply {
            text: "ledgerchat: No hosted model is configured, so I can only record \
                   statements like \"spent 20 on groceries\" or \"received 1500 salary\"."
                .to_string(),
            executed_sql: None,
            tool_calls: Vec::new(),
        },
    };

    messages.append(session_id, "assistant", &reply.text).await?;
    Ok(reply)
}
