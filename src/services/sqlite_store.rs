//! SQLite persistence layer for portfolios, holdings, transactions, and
//! valuation snapshots.
//!
//! A single `Mutex<Connection>` serializes all writers, which is what gives
//! the ledger its one-writer-per-portfolio guarantee: a trade runs inside one
//! SQL transaction obtained through [`SqliteStore::with_transaction`] and
//! either every mutation lands or none do.
//!
//! Transactions and snapshots are append-only audit trails; nothing in this
//! module updates or deletes them after insertion.

use crate::services::ledger::LedgerError;
use crate::types::{
    Holding, Portfolio, PortfolioWithHoldings, Snapshot, Transaction, TransactionType,
};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, error, info};

/// SQLite store for portfolio state.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Create a new SQLite store at the given path.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, rusqlite::Error> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        info!("SQLite store initialized");
        Ok(store)
    }

    /// Create an in-memory SQLite store (for testing).
    pub fn new_in_memory() -> Result<Self, rusqlite::Error> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        debug!("In-memory SQLite store initialized");
        Ok(store)
    }

    /// Initialize database schema.
    fn init_schema(&self) -> Result<(), rusqlite::Error> {
        let conn = self.conn.lock().unwrap();

        conn.execute(
            "CREATE TABLE IF NOT EXISTS portfolios (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                name TEXT NOT NULL,
                cash REAL NOT NULL,
                invested REAL NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_portfolios_user ON portfolios(user_id)",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS holdings (
                portfolio_id TEXT NOT NULL,
                symbol TEXT NOT NULL,
                quantity REAL NOT NULL,
                UNIQUE(portfolio_id, symbol)
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS transactions (
                id TEXT PRIMARY KEY,
                portfolio_id TEXT NOT NULL,
                symbol TEXT NOT NULL,
                tx_type TEXT NOT NULL,
                amount REAL NOT NULL,
                price REAL NOT NULL,
                timestamp INTEGER NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_transactions_portfolio
             ON transactions(portfolio_id, timestamp DESC)",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS portfolio_snapshots (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                portfolio_id TEXT NOT NULL,
                timestamp INTEGER NOT NULL,
                value REAL NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_snapshots_portfolio
             ON portfolio_snapshots(portfolio_id, timestamp)",
            [],
        )?;

        info!("SQLite schema initialized");
        Ok(())
    }

    /// Run a closure inside a single SQL transaction. The transaction commits
    /// only when the closure returns `Ok`; any error rolls every write back.
    pub fn with_transaction<T>(
        &self,
        f: impl FnOnce(&rusqlite::Transaction<'_>) -> Result<T, LedgerError>,
    ) -> Result<T, LedgerError> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let out = f(&tx)?;
        tx.commit()?;
        Ok(out)
    }

    // ========== Portfolio Methods ==========

    /// Persist a new portfolio.
    pub fn create_portfolio(&self, portfolio: &Portfolio) -> Result<(), rusqlite::Error> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO portfolios (id, user_id, name, cash, invested, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                portfolio.id,
                portfolio.user_id,
                portfolio.name,
                portfolio.cash,
                portfolio.invested,
                portfolio.created_at,
                portfolio.updated_at,
            ],
        )?;

        debug!("Created portfolio {} for user {}", portfolio.id, portfolio.user_id);
        Ok(())
    }

    /// Get a portfolio by ID.
    pub fn get_portfolio(&self, id: &str) -> Option<Portfolio> {
        let conn = self.conn.lock().unwrap();
        match fetch_portfolio(&conn, id) {
            Ok(portfolio) => portfolio,
            Err(e) => {
                error!("Error fetching portfolio {}: {}", id, e);
                None
            }
        }
    }

    /// Get a portfolio together with its holdings.
    pub fn get_portfolio_with_holdings(&self, id: &str) -> Option<PortfolioWithHoldings> {
        let conn = self.conn.lock().unwrap();
        let portfolio = fetch_portfolio(&conn, id).ok()??;
        let holdings = fetch_holdings(&conn, id).unwrap_or_default();
        Some(PortfolioWithHoldings {
            portfolio,
            holdings,
        })
    }

    /// Get all portfolios for a user, each with holdings.
    pub fn get_user_portfolios(&self, user_id: &str) -> Vec<PortfolioWithHoldings> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = match conn.prepare(
            "SELECT id, user_id, name, cash, invested, created_at, updated_at
             FROM portfolios WHERE user_id = ?1 ORDER BY created_at",
        ) {
            Ok(stmt) => stmt,
            Err(e) => {
                error!("Error preparing portfolio query: {}", e);
                return Vec::new();
            }
        };

        let portfolios: Vec<Portfolio> = stmt
            .query_map(params![user_id], map_portfolio)
            .map(|rows| rows.filter_map(|r| r.ok()).collect())
            .unwrap_or_default();

        portfolios
            .into_iter()
            .map(|portfolio| {
                let holdings = fetch_holdings(&conn, &portfolio.id).unwrap_or_default();
                PortfolioWithHoldings {
                    portfolio,
                    holdings,
                }
            })
            .collect()
    }

    /// Check whether a user already has a portfolio with this name.
    pub fn portfolio_name_exists(&self, user_id: &str, name: &str) -> bool {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT COUNT(*) FROM portfolios WHERE user_id = ?1 AND name = ?2",
            params![user_id, name],
            |row| row.get::<_, i64>(0),
        )
        .map(|count| count > 0)
        .unwrap_or(false)
    }

    /// Get the holdings of a portfolio.
    pub fn get_holdings(&self, portfolio_id: &str) -> Vec<Holding> {
        let conn = self.conn.lock().unwrap();
        fetch_holdings(&conn, portfolio_id).unwrap_or_default()
    }

    // ========== Transaction Methods ==========

    /// Get a transaction by ID.
    pub fn get_transaction(&self, id: &str) -> Option<Transaction> {
        let conn = self.conn.lock().unwrap();

        let result = conn.query_row(
            "SELECT id, portfolio_id, symbol, tx_type, amount, price, timestamp
             FROM transactions WHERE id = ?1",
            params![id],
            map_transaction,
        );

        match result {
            Ok(tx) => Some(tx),
            Err(rusqlite::Error::QueryReturnedNoRows) => None,
            Err(e) => {
                error!("Error fetching transaction {}: {}", id, e);
                None
            }
        }
    }

    /// Get transaction history, newest first, with optional filters.
    pub fn get_transactions(
        &self,
        portfolio_id: Option<&str>,
        symbol: Option<&str>,
        limit: usize,
    ) -> Vec<Transaction> {
        let conn = self.conn.lock().unwrap();
        let limit = limit as i64;

        let result = match (portfolio_id, symbol) {
            (Some(pid), Some(sym)) => run_transaction_query(
                &conn,
                "SELECT id, portfolio_id, symbol, tx_type, amount, price, timestamp
                 FROM transactions WHERE portfolio_id = ?1 AND symbol = ?2
                 ORDER BY timestamp DESC LIMIT ?3",
                params![pid, sym, limit],
            ),
            (Some(pid), None) => run_transaction_query(
                &conn,
                "SELECT id, portfolio_id, symbol, tx_type, amount, price, timestamp
                 FROM transactions WHERE portfolio_id = ?1
                 ORDER BY timestamp DESC LIMIT ?2",
                params![pid, limit],
            ),
            _ => run_transaction_query(
                &conn,
                "SELECT id, portfolio_id, symbol, tx_type, amount, price, timestamp
                 FROM transactions ORDER BY timestamp DESC LIMIT ?1",
                params![limit],
            ),
        };

        match result {
            Ok(transactions) => transactions,
            Err(e) => {
                error!("Error querying transactions: {}", e);
                Vec::new()
            }
        }
    }

    /// Number of transactions recorded for a portfolio.
    pub fn transaction_count(&self, portfolio_id: &str) -> usize {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT COUNT(*) FROM transactions WHERE portfolio_id = ?1",
            params![portfolio_id],
            |row| row.get(0),
        )
        .unwrap_or(0)
    }

    // ========== Snapshot Methods ==========

    /// Get the full snapshot series for a portfolio, oldest first.
    pub fn get_snapshots(&self, portfolio_id: &str) -> Vec<Snapshot> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = match conn.prepare(
            "SELECT portfolio_id, timestamp, value FROM portfolio_snapshots
             WHERE portfolio_id = ?1 ORDER BY timestamp ASC, id ASC",
        ) {
            Ok(stmt) => stmt,
            Err(e) => {
                error!("Error preparing snapshot query: {}", e);
                return Vec::new();
            }
        };

        stmt.query_map(params![portfolio_id], |row| {
            Ok(Snapshot {
                portfolio_id: row.get(0)?,
                timestamp: row.get(1)?,
                value: row.get(2)?,
            })
        })
        .map(|rows| rows.filter_map(|r| r.ok()).collect())
        .unwrap_or_default()
    }

    /// Number of snapshots recorded for a portfolio.
    pub fn snapshot_count(&self, portfolio_id: &str) -> usize {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT COUNT(*) FROM portfolio_snapshots WHERE portfolio_id = ?1",
            params![portfolio_id],
            |row| row.get(0),
        )
        .unwrap_or(0)
    }
}

// =============================================================================
// Row helpers shared with the ledger's transactional path
// =============================================================================

pub(crate) fn fetch_portfolio(
    conn: &Connection,
    id: &str,
) -> Result<Option<Portfolio>, rusqlite::Error> {
    let result = conn.query_row(
        "SELECT id, user_id, name, cash, invested, created_at, updated_at
         FROM portfolios WHERE id = ?1",
        params![id],
        map_portfolio,
    );

    match result {
        Ok(portfolio) => Ok(Some(portfolio)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e),
    }
}

pub(crate) fn fetch_holdings(
    conn: &Connection,
    portfolio_id: &str,
) -> Result<Vec<Holding>, rusqlite::Error> {
    let mut stmt = conn.prepare(
        "SELECT portfolio_id, symbol, quantity FROM holdings
         WHERE portfolio_id = ?1 ORDER BY symbol",
    )?;

    let holdings = stmt
        .query_map(params![portfolio_id], map_holding)?
        .filter_map(|r| r.ok())
        .collect();

    Ok(holdings)
}

pub(crate) fn fetch_holding(
    conn: &Connection,
    portfolio_id: &str,
    symbol: &str,
) -> Result<Option<Holding>, rusqlite::Error> {
    let result = conn.query_row(
        "SELECT portfolio_id, symbol, quantity FROM holdings
         WHERE portfolio_id = ?1 AND symbol = ?2",
        params![portfolio_id, symbol],
        map_holding,
    );

    match result {
        Ok(holding) => Ok(Some(holding)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e),
    }
}

pub(crate) fn update_portfolio_balances(
    conn: &Connection,
    portfolio_id: &str,
    cash: f64,
    invested: f64,
) -> Result<(), rusqlite::Error> {
    conn.execute(
        "UPDATE portfolios SET cash = ?2, invested = ?3, updated_at = ?4 WHERE id = ?1",
        params![
            portfolio_id,
            cash,
            invested,
            chrono::Utc::now().timestamp_millis()
        ],
    )?;
    Ok(())
}

/// Increment a holding, creating it on first buy of the symbol.
pub(crate) fn add_to_holding(
    conn: &Connection,
    portfolio_id: &str,
    symbol: &str,
    amount: f64,
) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO holdings (portfolio_id, symbol, quantity) VALUES (?1, ?2, ?3)
         ON CONFLICT(portfolio_id, symbol) DO UPDATE SET
            quantity = quantity + excluded.quantity",
        params![portfolio_id, symbol, amount],
    )?;
    Ok(())
}

/// Set a holding's quantity outright. A fully liquidated holding stays in the
/// table at quantity zero.
pub(crate) fn set_holding_quantity(
    conn: &Connection,
    portfolio_id: &str,
    symbol: &str,
    quantity: f64,
) -> Result<(), rusqlite::Error> {
    conn.execute(
        "UPDATE holdings SET quantity = ?3 WHERE portfolio_id = ?1 AND symbol = ?2",
        params![portfolio_id, symbol, quantity],
    )?;
    Ok(())
}

pub(crate) fn insert_transaction(
    conn: &Connection,
    tx: &Transaction,
) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO transactions (id, portfolio_id, symbol, tx_type, amount, price, timestamp)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            tx.id,
            tx.portfolio_id,
            tx.symbol,
            tx.tx_type.to_string(),
            tx.amount,
            tx.price,
            tx.timestamp,
        ],
    )?;
    Ok(())
}

pub(crate) fn insert_snapshot(
    conn: &Connection,
    snapshot: &Snapshot,
) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO portfolio_snapshots (portfolio_id, timestamp, value) VALUES (?1, ?2, ?3)",
        params![snapshot.portfolio_id, snapshot.timestamp, snapshot.value],
    )?;
    Ok(())
}

fn run_transaction_query(
    conn: &Connection,
    query: &str,
    bind: &[&dyn rusqlite::ToSql],
) -> Result<Vec<Transaction>, rusqlite::Error> {
    let mut stmt = conn.prepare(query)?;
    let transactions = stmt
        .query_map(bind, map_transaction)?
        .filter_map(|r| r.ok())
        .collect();
    Ok(transactions)
}

fn map_portfolio(row: &rusqlite::Row<'_>) -> Result<Portfolio, rusqlite::Error> {
    Ok(Portfolio {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        cash: row.get(3)?,
        invested: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

fn map_holding(row: &rusqlite::Row<'_>) -> Result<Holding, rusqlite::Error> {
    Ok(Holding {
        portfolio_id: row.get(0)?,
        symbol: row.get(1)?,
        quantity: row.get(2)?,
    })
}

fn map_transaction(row: &rusqlite::Row<'_>) -> Result<Transaction, rusqlite::Error> {
    let tx_type: String = row.get(3)?;
    Ok(Transaction {
        id: row.get(0)?,
        portfolio_id: row.get(1)?,
        symbol: row.get(2)?,
        tx_type: if tx_type == "SELL" {
            TransactionType::Sell
        } else {
            TransactionType::Buy
        },
        amount: row.get(4)?,
        price: row.get(5)?,
        timestamp: row.get(6)?,
    })
}
