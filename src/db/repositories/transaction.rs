//! Transaction ledger repository
//!
//! The single `transactions` table is the whole data model: a flat ledger
//! of dated monetary events. The sign of an event is carried by `kind`
//! (Asset = income, Liability = expense); `amount` is always positive.

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use rusqlite::params;
use serde::{Deserialize, Serialize};

use crate::db::Database;

/// Validation errors rejected at the repository boundary.
///
/// The upstream agent is instructed to emit well-formed rows, but nothing
/// guarantees it does; these are enforced here and by CHECK constraints in
/// the schema so a misbehaving model cannot corrupt the ledger.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("amount must be positive, got {0}")]
    NonPositiveAmount(f64),
    #[error("unknown category: {0}")]
    UnknownCategory(String),
    #[error("unknown kind: {0}")]
    UnknownKind(String),
    #[error("description must not be empty")]
    EmptyDescription,
}

/// The fixed category set. `Income` is the only category used for Asset rows.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Category {
    Food,
    Transport,
    Health,
    Home,
    Shopping,
    Entertainment,
    Education,
    Income,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::Food,
        Category::Transport,
        Category::Health,
        Category::Home,
        Category::Shopping,
        Category::Entertainment,
        Category::Education,
        Category::Income,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Food => "Food",
            Category::Transport => "Transport",
            Category::Health => "Health",
            Category::Home => "Home",
            Category::Shopping => "Shopping",
            Category::Entertainment => "Entertainment",
            Category::Education => "Education",
            Category::Income => "Income",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, LedgerError> {
        match s {
            "Food" => Ok(Category::Food),
            "Transport" => Ok(Category::Transport),
            "Health" => Ok(Category::Health),
            "Home" => Ok(Category::Home),
            "Shopping" => Ok(Category::Shopping),
            "Entertainment" => Ok(Category::Entertainment),
            "Education" => Ok(Category::Education),
            "Income" => Ok(Category::Income),
            _ => Err(LedgerError::UnknownCategory(s.to_string())),
        }
    }
}

/// Asset = income, Liability = expense.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Kind {
    Asset,
    Liability,
}

impl Kind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Asset => "Asset",
            Kind::Liability => "Liability",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, LedgerError> {
        match s {
            "Asset" => Ok(Kind::Asset),
            "Liability" => Ok(Kind::Liability),
            _ => Err(LedgerError::UnknownKind(s.to_string())),
        }
    }
}

/// A stored ledger row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub date: NaiveDate,
    pub description: String,
    pub amount: f64,
    pub category: Category,
    pub kind: Kind,
}

/// A row to insert. `date` defaults to today when the user omitted it.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub date: Option<NaiveDate>,
    pub description: String,
    pub amount: f64,
    pub category: Category,
    pub kind: Kind,
}

impl NewTransaction {
    fn validate(&self) -> Result<(), LedgerError> {
        if self.amount <= 0.0 {
            return Err(LedgerError::NonPositiveAmount(self.amount));
        }
        if self.description.trim().is_empty() {
            return Err(LedgerError::EmptyDescription);
        }
        Ok(())
    }
}

/// Optional filters for listing ledger rows.
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    /// Calendar month as "YYYY-MM"
    pub month: Option<String>,
    pub category: Option<Category>,
    pub kind: Option<Kind>,
}

/// Totals for one calendar month.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlySummary {
    pub month: String,
    pub expenses: f64,
    pub income: f64,
    pub net: f64,
}

/// Per-kind descriptive statistics (count/sum/avg/max/min).
#[derive(Debug, Clone, Serialize)]
pub struct KindStats {
    pub kind: Kind,
    pub count: i64,
    pub total: f64,
    pub average: f64,
    pub max: f64,
    pub min: f64,
}

pub struct TransactionRepository {
    db: Database,
}

impl TransactionRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Get the database reference
    pub fn db(&self) -> &Database {
        &self.db
    }

    /// Insert a validated row; returns the assigned id.
    pub async fn insert(&self, tx: NewTransaction) -> Result<i64> {
        tx.validate()?;
        let date = tx.date.unwrap_or_else(|| Local::now().date_naive());

        let conn = self.db.lock().await;
        conn.execute(
            "INSERT INTO transactions (date, description, amount, category, kind)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                date.format("%Y-%m-%d").to_string(),
                tx.description.trim(),
                tx.amount,
                tx.category.as_str(),
                tx.kind.as_str(),
            ],
        )
        .context("Failed to insert transaction")?;

        let id = conn.last_insert_rowid();
        drop(conn);
        self.db.bump_generation();

        tracing::debug!("Inserted transaction {}: {} {}", id, tx.amount, tx.description);
        Ok(id)
    }

    /// Get a transaction by id
    pub async fn get(&self, id: i64) -> Result<Option<Transaction>> {
        let conn = self.db.lock().await;
        let mut stmt = conn.prepare(
            "SELECT id, date, description, amount, category, kind
             FROM transactions WHERE id = ?1",
        )?;

        let result = stmt.query_row(params![id], Self::map_row);

        match result {
            Ok(tx) => Ok(Some(tx)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e).context("Failed to get transaction"),
        }
    }

    /// List transactions, newest first, optionally filtered.
    pub async fn list(&self, filter: &TransactionFilter) -> Result<Vec<Transaction>> {
        let conn = self.db.lock().await;

        let mut query = String::from(
            "SELECT id, date, description, amount, category, kind
             FROM transactions WHERE 1=1",
        );
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(month) = &filter.month {
            params.push(Box::new(month.clone()));
            query.push_str(&format!(" AND strftime('%Y-%m', date) = ?{}", params.len()));
        }
        if let Some(category) = filter.category {
            params.push(Box::new(category.as_str().to_string()));
            query.push_str(&format!(" AND category = ?{}", params.len()));
        }
        if let Some(kind) = filter.kind {
            params.push(Box::new(kind.as_str().to_string()));
            query.push_str(&format!(" AND kind = ?{}", params.len()));
        }
        query.push_str(" ORDER BY date DESC, id DESC");

        let mut stmt = conn.prepare(&query)?;
        let params_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let rows = stmt.query_map(params_refs.as_slice(), Self::map_row)?;
        let txs: Vec<Transaction> = rows
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("Failed to collect transactions")?;

        Ok(txs)
    }

    /// Correct the amount of an existing row. Returns false if the id is unknown.
    pub async fn update_amount(&self, id: i64, amount: f64) -> Result<bool> {
        if amount <= 0.0 {
            return Err(LedgerError::NonPositiveAmount(amount).into());
        }

        let conn = self.db.lock().await;
        let changed = conn.execute(
            "UPDATE transactions SET amount = ?1 WHERE id = ?2",
            params![amount, id],
        )?;
        drop(conn);

        if changed > 0 {
            self.db.bump_generation();
        }
        Ok(changed > 0)
    }

    /// Re-categorize an existing row. Returns false if the id is unknown.
    pub async fn update_category(&self, id: i64, category: Category) -> Result<bool> {
        let conn = self.db.lock().await;
        let changed = conn.execute(
            "UPDATE transactions SET category = ?1 WHERE id = ?2",
            params![category.as_str(), id],
        )?;
        drop(conn);

        if changed > 0 {
            self.db.bump_generation();
        }
        Ok(changed > 0)
    }

    /// Delete a transaction by id. Returns false if the id is unknown.
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let conn = self.db.lock().await;
        let changed = conn.execute("DELETE FROM transactions WHERE id = ?1", params![id])?;
        drop(conn);

        if changed > 0 {
            self.db.bump_generation();
            tracing::debug!("Deleted transaction: {}", id);
        }
        Ok(changed > 0)
    }

    /// Sum of amounts per category, optionally restricted to one kind.
    pub async fn sum_by_category(&self, kind: Option<Kind>) -> Result<Vec<(Category, f64)>> {
        let conn = self.db.lock().await;

        let mut query = String::from(
            "SELECT category, SUM(amount) FROM transactions WHERE 1=1",
        );
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(kind) = kind {
            params.push(Box::new(kind.as_str().to_string()));
            query.push_str(&format!(" AND kind = ?{}", params.len()));
        }
        query.push_str(" GROUP BY category ORDER BY SUM(amount) DESC");

        let mut stmt = conn.prepare(&query)?;
        let params_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let rows = stmt.query_map(params_refs.as_slice(), |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
        })?;

        let mut totals = Vec::new();
        for row in rows {
            let (category, total) = row.context("Failed to read category total")?;
            totals.push((Category::from_str(&category)?, total));
        }
        Ok(totals)
    }

    /// Expense/income totals for one calendar month ("YYYY-MM").
    pub async fn monthly_summary(&self, month: &str) -> Result<MonthlySummary> {
        let conn = self.db.lock().await;
        let mut stmt = conn.prepare(
            "SELECT
                 COALESCE(SUM(CASE WHEN kind = 'Liability' THEN amount END), 0),
                 COALESCE(SUM(CASE WHEN kind = 'Asset' THEN amount END), 0)
             FROM transactions WHERE strftime('%Y-%m', date) = ?1",
        )?;

        let (expenses, income): (f64, f64) = stmt
            .query_row(params![month], |row| Ok((row.get(0)?, row.get(1)?)))
            .context("Failed to compute monthly summary")?;

        Ok(MonthlySummary {
            month: month.to_string(),
            expenses,
            income,
            net: income - expenses,
        })
    }

    /// Descriptive statistics per kind, across the whole ledger.
    pub async fn summary_stats(&self) -> Result<Vec<KindStats>> {
        let conn = self.db.lock().await;
        let mut stmt = conn.prepare(
            "SELECT kind, COUNT(*), SUM(amount), AVG(amount), MAX(amount), MIN(amount)
             FROM transactions GROUP BY kind ORDER BY kind",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, f64>(2)?,
                row.get::<_, f64>(3)?,
                row.get::<_, f64>(4)?,
                row.get::<_, f64>(5)?,
            ))
        })?;

        let mut stats = Vec::new();
        for row in rows {
            let (kind, count, total, average, max, min) =
                row.context("Failed to read summary stats")?;
            stats.push(KindStats {
                kind: Kind::from_str(&kind)?,
                count,
                total,
                average,
                max,
                min,
            });
        }
        Ok(stats)
    }

    fn map_row(row: &rusqlite::Row) -> rusqlite::Result<Transaction> {
        let date_str: String = row.get(1)?;
        let category_str: String = row.get(4)?;
        let kind_str: String = row.get(5)?;

        let date = NaiveDate::parse_from_str(&date_str, "%Y-%m-%d").map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
        })?;
        let category = Category::from_str(&category_str).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
        })?;
        let kind = Kind::from_str(&kind_str).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
        })?;

        Ok(Transaction {
            id: row.get(0)?,
            date,
            description: row.get(2)?,
            amount: row.get(3)?,
            category,
            kind,
        })
    }
}
