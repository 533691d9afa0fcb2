use std::collections::HashMap;
use std::path::Path;

use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use tracing::info;

use scopecrawl_core::{EnvironmentFault, PageRow, PageStatus, QueuedUrl, ResumeConfig};

/// Durable, transactional store of the URL frontier, visit outcomes,
/// per-attempt history, and global word counts (spec §4.2). Single
/// writer: the Crawl Loop. Backed by SQLite with WAL so read-only
/// dashboard connections can open concurrently (spec §5).
#[derive(Clone)]
pub struct Ledger {
    pool: SqlitePool,
}

impl Ledger {
    pub async fn open(db_path: &Path) -> Result<Self, EnvironmentFault> {
        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(EnvironmentFault::ledger)?;

        let ledger = Self { pool };
        ledger.init_schema().await?;
        info!(path = %db_path.display(), "ledger opened");
        Ok(ledger)
    }

    /// Open a read-only connection for dashboard observers. Tolerates
    /// weakly-consistent snapshots; never writes.
    pub async fn open_read_only(db_path: &Path) -> Result<Self, EnvironmentFault> {
        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .read_only(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(2)
            .connect_with(options)
            .await
            .map_err(EnvironmentFault::ledger)?;
        Ok(Self { pool })
    }

    async fn init_schema(&self) -> Result<(), EnvironmentFault> {
        sqlx::raw_sql(
            r#"
            CREATE TABLE IF NOT EXISTS pages (
                sid INTEGER PRIMARY KEY AUTOINCREMENT,
                url TEXT UNIQUE NOT NULL,
                depth INTEGER NOT NULL,
                status TEXT NOT NULL DEFAULT 'queued',
                attempts INTEGER NOT NULL DEFAULT 0,
                inserted_at TEXT NOT NULL,
                last_attempt TEXT,
                error TEXT
            );
            CREATE TABLE IF NOT EXISTS attempts (
                sid INTEGER NOT NULL,
                url TEXT NOT NULL,
                depth INTEGER NOT NULL,
                attempt INTEGER NOT NULL,
                http_status INTEGER,
                fetch_seconds REAL NOT NULL,
                attempt_time TEXT NOT NULL,
                error TEXT
            );
            CREATE TABLE IF NOT EXISTS words (
                word TEXT PRIMARY KEY,
                count INTEGER NOT NULL DEFAULT 0
            );
            CREATE TABLE IF NOT EXISTS resume_config (
                id INTEGER PRIMARY KEY CHECK (id = 0),
                url TEXT NOT NULL,
                max_depth INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_status ON pages(status);
            CREATE INDEX IF NOT EXISTS idx_status_attempts ON pages(status, attempts);
            CREATE INDEX IF NOT EXISTS idx_url ON pages(url);
            CREATE INDEX IF NOT EXISTS idx_word ON words(word);
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(EnvironmentFault::ledger)?;
        Ok(())
    }

    /// Idempotent insert of a `queued` Page. No-op if `url` already
    /// present (spec §4.2, invariant 1).
    pub async fn enqueue(&self, url: &str, depth: u32) -> Result<(), EnvironmentFault> {
        sqlx::query(
            "INSERT OR IGNORE INTO pages (url, depth, status, attempts, inserted_at) \
             VALUES (?, ?, 'queued', 0, ?)",
        )
        .bind(url)
        .bind(depth as i64)
        .bind(now())
        .execute(&self.pool)
        .await
        .map_err(EnvironmentFault::ledger)?;
        Ok(())
    }

    /// Next queued URL, ordered (depth asc, attempts desc, inserted_at
    /// asc). Does not remove the row.
    pub async fn peek(&self) -> Result<Option<QueuedUrl>, EnvironmentFault> {
        let row = sqlx::query(
            "SELECT sid, url, depth, attempts FROM pages \
             WHERE status = 'queued' \
             ORDER BY depth ASC, attempts DESC, inserted_at ASC \
             LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(EnvironmentFault::ledger)?;

        Ok(row.map(|r| QueuedUrl {
            sid: r.get::<i64, _>("sid"),
            url: r.get::<String, _>("url"),
            depth: r.get::<i64, _>("depth") as u32,
            attempts: r.get::<i64, _>("attempts") as u32,
        }))
    }

    pub async fn mark_attempt(&self, url: &str) -> Result<(), EnvironmentFault> {
        sqlx::query("UPDATE pages SET attempts = attempts + 1, last_attempt = ? WHERE url = ?")
            .bind(now())
            .bind(url)
            .execute(&self.pool)
            .await
            .map_err(EnvironmentFault::ledger)?;
        Ok(())
    }

    /// Undo a recorded attempt (used on an `EnvironmentFault` abort that
    /// made no real network attempt count).
    pub async fn decrease_attempt(&self, url: &str) -> Result<(), EnvironmentFault> {
        sqlx::query("UPDATE pages SET attempts = attempts - 1, last_attempt = ? WHERE url = ?")
            .bind(now())
            .bind(url)
            .execute(&self.pool)
            .await
            .map_err(EnvironmentFault::ledger)?;
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn log_attempt(
        &self,
        sid: i64,
        url: &str,
        depth: u32,
        ordinal: u32,
        http_status: Option<u16>,
        fetch_seconds: f64,
        error: Option<&str>,
    ) -> Result<(), EnvironmentFault> {
        sqlx::query(
            "INSERT INTO attempts (sid, url, depth, attempt, http_status, fetch_seconds, attempt_time, error) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(sid)
        .bind(url)
        .bind(depth as i64)
        .bind(ordinal as i64)
        .bind(http_status.map(|s| s as i64))
        .bind(fetch_seconds)
        .bind(now())
        .bind(error)
        .execute(&self.pool)
        .await
        .map_err(EnvironmentFault::ledger)?;
        Ok(())
    }

    pub async fn mark_failure(&self, url: &str, error: &str) -> Result<(), EnvironmentFault> {
        let truncated: String = error.chars().take(100).collect();
        sqlx::query("UPDATE pages SET status = 'failed', last_attempt = ?, error = ? WHERE url = ?")
            .bind(now())
            .bind(truncated)
            .bind(url)
            .execute(&self.pool)
            .await
            .map_err(EnvironmentFault::ledger)?;
        Ok(())
    }

    /// Atomically merge `word_counts` into the global tally and mark the
    /// URL visited. Either both persist or neither (spec §4.2, invariant
    /// 2).
    pub async fn commit_success(
        &self,
        url: &str,
        word_counts: &HashMap<String, u64>,
    ) -> Result<(), EnvironmentFault> {
        let mut tx = self.pool.begin().await.map_err(EnvironmentFault::ledger)?;

        for (word, count) in word_counts {
            sqlx::query(
                "INSERT INTO words (word, count) VALUES (?, ?) \
                 ON CONFLICT(word) DO UPDATE SET count = count + excluded.count",
            )
            .bind(word)
            .bind(*count as i64)
            .execute(&mut *tx)
            .await
            .map_err(EnvironmentFault::ledger)?;
        }

        sqlx::query("UPDATE pages SET status = 'visited' WHERE url = ?")
            .bind(url)
            .execute(&mut *tx)
            .await
            .map_err(EnvironmentFault::ledger)?;

        tx.commit().await.map_err(EnvironmentFault::ledger)?;
        Ok(())
    }

    pub async fn length(&self) -> Result<u64, EnvironmentFault> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM pages")
            .fetch_one(&self.pool)
            .await
            .map_err(EnvironmentFault::ledger)?;
        Ok(row.get::<i64, _>("n") as u64)
    }

    /// Recovers the first-ever enqueued URL for display (earliest
    /// `inserted_at`).
    pub async fn start_url(&self) -> Result<Option<String>, EnvironmentFault> {
        let row = sqlx::query("SELECT url FROM pages ORDER BY inserted_at ASC, sid ASC LIMIT 1")
            .fetch_optional(&self.pool)
            .await
            .map_err(EnvironmentFault::ledger)?;
        Ok(row.map(|r| r.get::<String, _>("url")))
    }

    pub async fn save_resume_config(&self, cfg: &ResumeConfig) -> Result<(), EnvironmentFault> {
        sqlx::query(
            "INSERT INTO resume_config (id, url, max_depth) VALUES (0, ?, ?) \
             ON CONFLICT(id) DO NOTHING",
        )
        .bind(&cfg.url)
        .bind(cfg.max_depth as i64)
        .execute(&self.pool)
        .await
        .map_err(EnvironmentFault::ledger)?;
        Ok(())
    }

    pub async fn load_resume_config(&self) -> Result<Option<ResumeConfig>, EnvironmentFault> {
        let row = sqlx::query("SELECT url, max_depth FROM resume_config WHERE id = 0")
            .fetch_optional(&self.pool)
            .await
            .map_err(EnvironmentFault::ledger)?;
        Ok(row.map(|r| ResumeConfig {
            url: r.get::<String, _>("url"),
            max_depth: r.get::<i64, _>("max_depth") as u32,
        }))
    }

    pub async fn all_pages(&self) -> Result<Vec<PageRow>, EnvironmentFault> {
        let rows = sqlx::query(
            "SELECT sid, url, depth, status, attempts, inserted_at, last_attempt, error FROM pages",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(EnvironmentFault::ledger)?;

        Ok(rows
            .into_iter()
            .map(|r| PageRow {
                sid: r.get::<i64, _>("sid"),
                url: r.get::<String, _>("url"),
                depth: r.get::<i64, _>("depth") as u32,
                status: PageStatus::parse(&r.get::<String, _>("status")),
                attempts: r.get::<i64, _>("attempts") as u32,
                inserted_at: parse_ts(&r.get::<String, _>("inserted_at")),
                last_attempt: r
                    .get::<Option<String>, _>("last_attempt")
                    .map(|s| parse_ts(&s)),
                error: r.get::<Option<String>, _>("error"),
            })
            .collect())
    }

    pub async fn word_counts(&self) -> Result<Vec<(String, i64)>, EnvironmentFault> {
        let rows = sqlx::query("SELECT word, count FROM words ORDER BY count DESC, word ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(EnvironmentFault::ledger)?;
        Ok(rows
            .into_iter()
            .map(|r| (r.get::<String, _>("word"), r.get::<i64, _>("count")))
            .collect())
    }

    pub async fn mean_attempts(&self) -> Result<f64, EnvironmentFault> {
        let row = sqlx::query("SELECT AVG(attempts) AS mean FROM pages WHERE attempts > 0")
            .fetch_one(&self.pool)
            .await
            .map_err(EnvironmentFault::ledger)?;
        Ok(row.get::<Option<f64>, _>("mean").unwrap_or(0.0))
    }

    pub async fn mean_fetch_seconds(&self) -> Result<f64, EnvironmentFault> {
        let row = sqlx::query("SELECT AVG(fetch_seconds) AS mean FROM attempts")
            .fetch_one(&self.pool)
            .await
            .map_err(EnvironmentFault::ledger)?;
        Ok(row.get::<Option<f64>, _>("mean").unwrap_or(0.0))
    }

    pub async fn error_histogram(&self) -> Result<Vec<(String, i64)>, EnvironmentFault> {
        let rows = sqlx::query(
            "SELECT COALESCE(error, 'none') AS error, COUNT(*) AS n FROM pages \
             GROUP BY error ORDER BY n DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(EnvironmentFault::ledger)?;
        Ok(rows
            .into_iter()
            .map(|r| (r.get::<String, _>("error"), r.get::<i64, _>("n")))
            .collect())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn now() -> String {
    Utc::now().to_rfc3339()
}

fn parse_ts(s: &str) -> chrono::DateTime<Utc> {
    chrono::DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
