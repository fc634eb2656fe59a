//! CLI commands

use std::io::{BufRead, Write as IoWrite};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};

use crate::agent::{self, ConversationAgent, PROCESSING_ERROR_REPLY};
use crate::config::Config;
use crate::core::AppState;
use crate::db::repositories::transaction::{
    Category, Kind, MonthlySummary, NewTransaction, TransactionFilter,
};
use crate::db::Database;
use crate::media::Transcoder;
use crate::model::HostedModelClient;
use crate::session::SessionContext;
use crate::webhook::WebhookServer;

#[derive(Parser)]
#[command(name = "ledgerchat")]
#[command(about = "Conversational personal-finance ledger", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Database path (default: ~/.ledgerchat/ledgerchat.db)
    #[arg(long)]
    database: Option<String>,

    /// Config file path (default: ~/.ledgerchat/config.yml)
    #[arg(long)]
    config: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Talk to the assistant (one message, or a REPL when omitted)
    Chat {
        /// Message to send; starts an interactive session when omitted
        message: Option<String>,

        /// Session id to continue an earlier conversation
        #[arg(long)]
        session: Option<String>,
    },

    /// Start the inbound webhook server
    Serve {
        /// Port number (default: from config)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Record a transaction directly, bypassing the agent
    Add {
        /// Short description
        description: String,

        /// Positive amount
        amount: f64,

        /// Category (Food, Transport, Health, Home, Shopping, Entertainment, Education, Income)
        #[arg(long, default_value = "Shopping")]
        category: String,

        /// Kind: Asset (income) or Liability (expense)
        #[arg(long, default_value = "Liability")]
        kind: String,

        /// Date as YYYY-MM-DD (default: today)
        #[arg(long)]
        date: Option<String>,
    },

    /// List transactions
    List {
        /// Filter by month (YYYY-MM)
        #[arg(long)]
        month: Option<String>,

        /// Filter by category
        #[arg(long)]
        category: Option<String>,

        /// Filter by kind
        #[arg(long)]
        kind: Option<String>,
    },

    /// Delete a transaction by id
    Delete {
        id: i64,
    },

    /// Monthly summary with category breakdown
    Report {
        /// Month as YYYY-MM (default: current month)
        #[arg(long)]
        month: Option<String>,
    },

    /// Ledger-wide statistics per kind
    Stats,

    /// Transcribe an audio file
    Transcribe {
        file: String,
    },

    /// Describe an image file
    Describe {
        file: String,
    },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(db_path) = cli.database {
        config.database_path = db_path;
    }

    let db = Database::new(config.resolve_db_path()?)?;
    let state = Arc::new(AppState::with_database(config, db));

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    rt.block_on(async {
        match cli.command {
            Commands::Chat { message, session } => chat(&state, message, session).await,
            Commands::Serve { port } => serve(&state, port).await,
            Commands::Add {
                description,
                amount,
                category,
                kind,
                date,
            } => add(&state, description, amount, &category, &kind, date).await,
            Commands::List {
                month,
                category,
                kind,
            } => list(&state, month, category, kind).await,
            Commands::Delete { id } => delete(&state, id).await,
            Commands::Report { month } => report(&state, month).await,
            Commands::Stats => stats(&state).await,
            Commands::Transcribe { file } => transcribe(&state, &file).await,
            Commands::Describe { file } => describe(&state, &file).await,
        }
    })
}

async fn chat(state: &Arc<AppState>, message: Option<String>, session: Option<String>) -> Result<()> {
    let session_id = session.unwrap_or_else(|| SessionContext::new().id);
    let hosted = state.config.resolve_api_key().is_some();

    let mut agent = if hosted {
        let client = Arc::new(HostedModelClient::new(&state.config)?);
        let model = client.chat_model().to_string();
        Some(ConversationAgent::new(
            client,
            model,
            state.db.clone(),
            state.config.retries,
        ))
    } else {
        println!("(no API key configured; using offline keyword rules)");
        None
    };

    match message {
        Some(text) => run_turn(state, &mut agent, &session_id, &text).await,
        None => {
            println!("Session {} (Ctrl-D to exit)", session_id);
            let stdin = std::io::stdin();
            loop {
                print!("> ");
                std::io::stdout().flush()?;
                let mut line = String::new();
                if stdin.lock().read_line(&mut line)? == 0 {
                    break;
                }
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                run_turn(state, &mut agent, &session_id, line).await?;
            }
            Ok(())
        }
    }
}

async fn run_turn(
    state: &Arc<AppState>,
    agent: &mut Option<ConversationAgent<HostedModelClient>>,
    session_id: &str,
    text: &str,
) -> Result<()> {
    let result = match agent {
        Some(agent) => agent.chat(session_id, text).await,
        None => {
            agent::offline_turn(&state.transactions, &state.messages, session_id, text).await
        }
    };

    match result {
        Ok(reply) => {
            println!("{}", reply.text);
            if let Some(sql) = &reply.executed_sql {
                println!("  [sql] {}", sql);
            }
        }
        Err(e) => {
            tracing::error!("Turn failed: {:#}", e);
            println!("{}", PROCESSING_ERROR_REPLY);
        }
    }
    Ok(())
}

async fn serve(state: &Arc<AppState>, port: Option<u16>) -> Result<()> {
    let client = Arc::new(HostedModelClient::new(&state.config)?);
    let model = client.chat_model().to_string();
    let port = port.unwrap_or(state.config.server.port);

    let server = WebhookServer::new(
        state.config.server.host.clone(),
        port,
        model,
        Arc::clone(state),
        client,
    );
    server.run().await
}

async fn add(
    state: &Arc<AppState>,
    description: String,
    amount: f64,
    category: &str,
    kind: &str,
    date: Option<String>,
) -> Result<()> {
    let date = date
        .map(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d"))
        .transpose()
        .context("Date must be YYYY-MM-DD")?;

    let tx = NewTransaction {
        date,
        description,
        amount,
        category: parse_category(category)?,
        kind: parse_kind(kind)?,
    };

    let id = state.transactions.insert(tx).await?;
    println!("Recorded transaction {}", id);
    Ok(())
}

async fn list(
    state: &Arc<AppState>,
    month: Option<String>,
    category: Option<String>,
    kind: Option<String>,
) -> Result<()> {
    let filter = TransactionFilter {
        month,
        category: category.as_deref().map(parse_category).transpose()?,
        kind: kind.as_deref().map(parse_kind).transpose()?,
    };

    let txs = state.transactions.list(&filter).await?;
    if txs.is_empty() {
        println!("No transactions found");
        return Ok(());
    }

    println!(
        "{:<6} {:<12} {:<30} {:>10}  {:<13} {}",
        "ID", "DATE", "DESCRIPTION", "AMOUNT", "CATEGORY", "KIND"
    );
    for tx in txs {
        println!(
            "{:<6} {:<12} {:<30} {:>10.2}  {:<13} {}",
            tx.id,
            tx.date.format("%Y-%m-%d"),
            tx.description,
            tx.amount,
            tx.category.as_str(),
            tx.kind.as_str()
        );
    }
    Ok(())
}

async fn delete(state: &Arc<AppState>, id: i64) -> Result<()> {
    if state.transactions.delete(id).await? {
        println!("Deleted transaction {}", id);
    } else {
        println!("No transaction with id {}", id);
    }
    Ok(())
}

async fn report(state: &Arc<AppState>, month: Option<String>) -> Result<()> {
    let month = month.unwrap_or_else(|| Local::now().format("%Y-%m").to_string());
    let generation = state.db.generation();
    let cache_key = format!("monthly:{}", month);

    let summary: MonthlySummary = match state.reports.get(&cache_key, generation) {
        Some(cached) => serde_json::from_str(&cached).context("Corrupt cached report")?,
        None => {
            let summary = state.transactions.monthly_summary(&month).await?;
            state
                .reports
                .insert(cache_key, generation, serde_json::to_string(&summary)?);
            summary
        }
    };

    println!("Report for {}", summary.month);
    println!("  Expenses: {:>12.2}", summary.expenses);
    println!("  Income:   {:>12.2}", summary.income);
    println!("  Net:      {:>12.2}", summary.net);

    let by_category = state.transactions.sum_by_category(Some(Kind::Liability)).await?;
    if !by_category.is_empty() {
        println!("Expenses by category (all time):");
        for (category, total) in by_category {
            println!("  {:<13} {:>12.2}", category.as_str(), total);
        }
    }
    Ok(())
}

async fn stats(state: &Arc<AppState>) -> Result<()> {
    let stats = state.transactions.summary_stats().await?;
    if stats.is_empty() {
        println!("Ledger is empty");
        return Ok(());
    }

    println!(
        "{:<10} {:>6} {:>12} {:>12} {:>12} {:>12}",
        "KIND", "COUNT", "TOTAL", "AVERAGE", "MAX", "MIN"
    );
    for s in stats {
        println!(
            "{:<10} {:>6} {:>12.2} {:>12.2} {:>12.2} {:>12.2}",
            s.kind.as_str(),
            s.count,
            s.total,
            s.average,
            s.max,
            s.min
        );
    }
    Ok(())
}

async fn transcribe(state: &Arc<AppState>, file: &str) -> Result<()> {
    let bytes = std::fs::read(file).with_context(|| format!("Failed to read {}", file))?;
    let client = Arc::new(HostedModelClient::new(&state.config)?);
    let transcoder = Transcoder::new(client, Arc::clone(&state.media_memo), state.config.retries);

    let filename = std::path::Path::new(file)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "audio".to_string());

    println!("{}", transcoder.transcribe(&bytes, &filename).await);
    Ok(())
}

async fn describe(state: &Arc<AppState>, file: &str) -> Result<()> {
    let bytes = std::fs::read(file).with_context(|| format!("Failed to read {}", file))?;
    let client = Arc::new(HostedModelClient::new(&state.config)?);
    let transcoder = Transcoder::new(client, Arc::clone(&state.media_memo), state.config.retries);

    let mime = match std::path::Path::new(file)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "image/jpeg",
    };

    println!("{}", transcoder.describe(&bytes, mime).await?);
    Ok(())
}

fn parse_category(s: &str) -> Result<Category> {
    Category::from_str(&title_case(s)).map_err(Into::into)
}

fn parse_kind(s: &str) -> Result<Kind> {
    Kind::from_str(&title_case(s)).map_err(Into::into)
}

fn title_case(s: &str) -> String {
    let mut chars = s.trim().chars();
    match chars.next() {
        Some(first) => {
            first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
        }
        None => String::new(),
    }
}
