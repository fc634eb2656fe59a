// Conversation agent tests with a scripted model provider

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Local;
use ledgerchat::agent::{self, AgentState, ConversationAgent, SqlOutcome, SqlTool};
use ledgerchat::db::repositories::transaction::{Category, Kind, TransactionFilter, TransactionRepository};
use ledgerchat::db::{Database, MessageRepository};
use ledgerchat::model::{
    ChatMessage, ChatRequest, FunctionCall, ModelProvider, ToolCallRequest,
};
use tempfile::TempDir;

fn create_test_db() -> (Database, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");
    let db = Database::new(db_path).unwrap();
    (db, temp_dir)
}

/// Replays a fixed sequence of assistant messages.
struct ScriptedProvider {
    responses: Mutex<VecDeque<ChatMessage>>,
}

impl ScriptedProvider {
    fn new(responses: Vec<ChatMessage>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
        })
    }
}

#[async_trait]
impl ModelProvider for ScriptedProvider {
    async fn complete(&self, _request: ChatRequest) -> Result<ChatMessage> {
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .context("Script exhausted")
    }

    async fn transcribe(&self, _audio: &[u8], _filename: &str, _prompt: &str) -> Result<String> {
        Ok("scripted transcription".to_string())
    }

    async fn describe(&self, _image: &[u8], _mime: &str, _instruction: &str) -> Result<String> {
        Ok("scripted description".to_string())
    }
}

fn tool_call_message(statement: &str) -> ChatMessage {
    ChatMessage {
        role: "assistant".to_string(),
        content: None,
        tool_calls: Some(vec![ToolCallRequest {
            id: "call_1".to_string(),
            call_type: "function".to_string(),
            function: FunctionCall {
                name: "execute_sql".to_string(),
                arguments: serde_json::json!({ "statement": statement }).to_string(),
            },
        }]),
        tool_call_id: None,
    }
}

#[tokio::test]
async fn test_turn_with_insert_tool_call() {
    let (db, _temp) = create_test_db();
    let statement = "INSERT INTO transactions (date, description, amount, category, kind) \
                     VALUES (date('now'), 'Book', 50.0, 'Education', 'Liability')";

    let provider = ScriptedProvider::new(vec![
        tool_call_message(statement),
        ChatMessage::assistant("ledgerchat: Recorded: Book - 50.00 (Education)"),
    ]);
    let mut agent = ConversationAgent::new(provider, "test-model", db.clone(), 3);

    let reply = agent.chat("session-1", "I bought a book for 50").await.unwrap();

    assert_eq!(reply.text, "ledgerchat: Recorded: Book - 50.00 (Education)");
    assert_eq!(reply.executed_sql.as_deref(), Some(statement));
    assert_eq!(reply.tool_calls.len(), 1);
    assert_eq!(reply.tool_calls[0].name, "execute_sql");
    assert_eq!(agent.state(), AgentState::Idle);

    let repo = TransactionRepository::new(db);
    let rows = repo.list(&TransactionFilter::default()).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].description, "Book");
    assert_eq!(rows[0].category, Category::Education);
}

#[tokio::test]
async fn test_plain_turn_executes_nothing() {
    let (db, _temp) = create_test_db();
    let provider = ScriptedProvider::new(vec![ChatMessage::assistant(
        "ledgerchat: Hi! Tell me about an expense and I'll record it.",
    )]);
    let mut agent = ConversationAgent::new(provider, "test-model", db.clone(), 3);

    let reply = agent.chat("session-1", "hello").await.unwrap();

    assert!(reply.executed_sql.is_none());
    assert!(reply.tool_calls.is_empty());

    let repo = TransactionRepository::new(db);
    assert!(repo.list(&TransactionFilter::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_invalid_sql_is_reported_not_executed() {
    let (db, _temp) = create_test_db();
    // 'Snacks' is not in the category CHECK constraint
    let statement = "INSERT INTO transactions (date, description, amount, category, kind) \
                     VALUES (date('now'), 'Chips', 5.0, 'Snacks', 'Liability')";

    let provider = ScriptedProvider::new(vec![
        tool_call_message(statement),
        ChatMessage::assistant("ledgerchat: I could not record that."),
    ]);
    let mut agent = ConversationAgent::new(provider, "test-model", db.clone(), 3);

    let reply = agent.chat("session-1", "chips for 5").await.unwrap();

    // The statement failed, so nothing counts as executed
    assert!(reply.executed_sql.is_none());
    assert_eq!(reply.tool_calls.len(), 1);
    assert_eq!(agent.state(), AgentState::Idle);

    let repo = TransactionRepository::new(db);
    assert!(repo.list(&TransactionFilter::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_history_spans_turns() {
    let (db, _temp) = create_test_db();
    let provider = ScriptedProvider::new(vec![
        ChatMessage::assistant("first reply"),
        ChatMessage::assistant("second reply"),
    ]);
    let mut agent = ConversationAgent::new(provider, "test-model", db.clone(), 3);

    agent.chat("session-1", "one").await.unwrap();
    agent.chat("session-1", "two").await.unwrap();

    let messages = MessageRepository::new(db);
    let history = messages.history("session-1").await.unwrap();
    assert_eq!(history.len(), 4);
    assert_eq!(history[0].role, "user");
    assert_eq!(history[1].role, "assistant");
    assert_eq!(history[3].content, "second reply");
}

/// Fails a fixed number of times before succeeding.
struct FlakyProvider {
    failures_left: AtomicU32,
    calls: AtomicU32,
}

#[async_trait]
impl ModelProvider for FlakyProvider {
    async fn complete(&self, _request: ChatRequest) -> Result<ChatMessage> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failures_left.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            anyhow::bail!("transient endpoint error");
        }
        Ok(ChatMessage::assistant("recovered"))
    }

    async fn transcribe(&self, _audio: &[u8], _filename: &str, _prompt: &str) -> Result<String> {
        anyhow::bail!("transcription endpoint down")
    }

    async fn describe(&self, _image: &[u8], _mime: &str, _instruction: &str) -> Result<String> {
        anyhow::bail!("vision endpoint down")
    }
}

#[tokio::test]
async fn test_transient_errors_are_retried() {
    let (db, _temp) = create_test_db();
    let provider = Arc::new(FlakyProvider {
        failures_left: AtomicU32::new(2),
        calls: AtomicU32::new(0),
    });
    let mut agent = ConversationAgent::new(Arc::clone(&provider), "test-model", db, 3);

    let reply = agent.chat("session-1", "hello").await.unwrap();
    assert_eq!(reply.text, "recovered");
    assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_retries_exhausted_surfaces_error() {
    let (db, _temp) = create_test_db();
    let provider = Arc::new(FlakyProvider {
        failures_left: AtomicU32::new(10),
        calls: AtomicU32::new(0),
    });
    let mut agent = ConversationAgent::new(Arc::clone(&provider), "test-model", db, 3);

    assert!(agent.chat("session-1", "hello").await.is_err());
    assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    assert_eq!(agent.state(), AgentState::Idle);
}

#[tokio::test]
async fn test_offline_turn_records_expense() {
    let (db, _temp) = create_test_db();
    let repo = TransactionRepository::new(db.clone());
    let messages = MessageRepository::new(db);

    let reply = agent::offline_turn(&repo, &messages, "session-1", "I spent 20 on pet food")
        .await
        .unwrap();

    assert!(reply.text.contains("Recorded"));
    let sql = reply.executed_sql.unwrap();
    assert!(sql.starts_with("INSERT INTO transactions"));

    let rows = repo.list(&TransactionFilter::default()).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].category, Category::Home);
    assert_eq!(rows[0].kind, Kind::Liability);
    assert_eq!(rows[0].amount, 20.0);
    assert_eq!(rows[0].date, Local::now().date_naive());
}

#[tokio::test]
async fn test_offline_turn_ignores_questions() {
    let (db, _temp) = create_test_db();
    let repo = TransactionRepository::new(db.clone());
    let messages = MessageRepository::new(db);

    let reply = agent::offline_turn(&repo, &messages, "session-1", "how are you today?")
        .await
        .unwrap();

    assert!(reply.executed_sql.is_none());
    assert!(repo.list(&TransactionFilter::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_sql_tool_rejects_multiple_statements() {
    let (db, _temp) = create_test_db();
    let tool = SqlTool::new(db);

    let result = tool
        .execute("DELETE FROM transactions; DROP TABLE transactions")
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_sql_tool_select_returns_rows() {
    let (db, _temp) = create_test_db();
    let repo = TransactionRepository::new(db.clone());
    repo.insert(ledgerchat::db::repositories::transaction::NewTransaction {
        date: None,
        description: "Coffee".to_string(),
        amount: 4.5,
        category: Category::Food,
        kind: Kind::Liability,
    })
    .await
    .unwrap();

    let tool = SqlTool::new(db);
    let outcome = tool
        .execute("SELECT description, amount FROM transactions")
        .await
        .unwrap();

    match outcome {
        SqlOutcome::Rows(rows) => {
            assert_eq!(rows.len(), 1);
            assert_eq!(rows[0]["description"], "Coffee");
            assert_eq!(rows[0]["amount"], 4.5);
        }
        SqlOutcome::Changed(_) => panic!("expected rows"),
    }
}

#[tokio::test]
async fn test_sql_tool_write_bumps_generation() {
    let (db, _temp) = create_test_db();
    let tool = SqlTool::new(db.clone());
    let before = db.generation();

    let outcome = tool
        .execute(
            "INSERT INTO transactions (date, description, amount, category, kind) \
             VALUES ('2026-01-05', 'Gym', 45.0, 'Health', 'Liability');",
        )
        .await
        .unwrap();

    match outcome {
        SqlOutcome::Changed(n) => assert_eq!(n, 1),
        SqlOutcome::Rows(_) => panic!("expected a write"),
    }
    assert!(db.generation() > before);
}
