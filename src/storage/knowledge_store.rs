//! Knowledge Store
//!
//! Persistent graph of generation knowledge on top of [`Database`].
//!
//! ## Nodes
//!
//! - `patterns` (+ `agent_outputs`): quality-approved generations
//! - `documentation`: distinct URLs with usage counters
//! - `search_cache`: search results keyed by normalized-query hash
//! - `user_feedback`: append-only rating events
//!
//! ## Relationships
//!
//! - `contributed_to`: documentation → pattern, carrying the pattern score
//! - `negative_feedback`: documentation → feedback
//!
//! All writes are idempotent upserts keyed by natural identity
//! (URL for documentation, query hash for cache entries).

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use rusqlite::{Connection, params};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use super::database::SharedDatabase;
use super::similarity::SimilarityStrategy;
use crate::constants::store::{MAX_OUTPUT_CHARS, MAX_TASK_CHARS, WORKFLOW_AGENT};
use crate::types::{
    AgentOutput, AgentStats, CacheStats, DocEffectiveness, PatternId, PatternRecord, Result,
    SearchResult, StoredAgentOutput, SwarmError, UserFeedback, ValidationErrorKind,
    log_filter_error, truncate_chars,
};

pub type SharedKnowledgeStore = Arc<KnowledgeStore>;

/// Input for [`KnowledgeStore::store_pattern`]
#[derive(Debug, Clone, Copy)]
pub struct NewPattern<'a> {
    pub task: &'a str,
    pub outputs: &'a [AgentOutput],
    pub avg_score: f64,
    pub docs: &'a [SearchResult],
}

/// Documentation node as stored
#[derive(Debug, Clone)]
pub struct DocumentationNode {
    pub url: String,
    pub title: String,
    pub domain: String,
    pub first_seen: String,
    pub last_seen: String,
    pub total_uses: u32,
}

/// One documentation → pattern relationship
#[derive(Debug, Clone)]
pub struct Contribution {
    pub doc_url: String,
    pub pattern_id: String,
    pub score: f64,
    pub agent: String,
}

/// Outcome of [`KnowledgeStore::store_user_feedback`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackReceipt {
    pub feedback_id: String,
    /// Unhelpful documents actually linked; unknown URLs are not counted
    pub flagged: usize,
}

/// Lowercase, trim and collapse whitespace runs.
pub fn normalize_query(query: &str) -> String {
    query
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// SHA-256 hex digest of the normalized query.
pub fn query_hash(query: &str) -> String {
    let digest = Sha256::digest(normalize_query(query).as_bytes());
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

fn domain_of(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_default()
}

pub struct KnowledgeStore {
    db: SharedDatabase,
}

impl KnowledgeStore {
    /// Wrap an initialized database.
    pub fn new(db: SharedDatabase) -> Self {
        Self { db }
    }

    // =========================================================================
    // Search Cache
    // =========================================================================

    /// Upsert cached results for `query`, expiring `ttl_days` from now.
    pub fn cache_search_results(
        &self,
        query: &str,
        results: &[SearchResult],
        ttl_days: i64,
    ) -> Result<()> {
        let now = Utc::now();
        let expires = ChronoDuration::try_days(ttl_days)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .ok_or_else(|| {
                SwarmError::Config(format!("cache ttl of {} days is out of range", ttl_days))
            })?;
        let payload = serde_json::to_string(results)?;

        self.db.execute(
            r#"
            INSERT INTO search_cache (query_hash, query, created_at, expires_at, results)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(query_hash) DO UPDATE SET
                query = excluded.query,
                created_at = excluded.created_at,
                expires_at = excluded.expires_at,
                results = excluded.results
            "#,
            &[
                &query_hash(query),
                &query,
                &now.timestamp_millis(),
                &expires.timestamp_millis(),
                &payload,
            ],
        )?;
        debug!(query, count = results.len(), "Cached search results");
        Ok(())
    }

    /// Cached results for `query`; expired entries read as a miss.
    pub fn get_cached_search_results(&self, query: &str) -> Result<Option<Vec<SearchResult>>> {
        let now = Utc::now().timestamp_millis();
        let payload: Option<String> = self.db.query_row(
            "SELECT results FROM search_cache WHERE query_hash = ?1 AND expires_at > ?2",
            &[&query_hash(query), &now],
            |row| row.get(0),
        )?;

        match payload {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => {
                debug!(query, "Search cache miss");
                Ok(None)
            }
        }
    }

    /// Physically delete expired cache rows; returns rows removed.
    pub fn purge_expired_cache(&self) -> Result<usize> {
        let now = Utc::now().timestamp_millis();
        let removed = self
            .db
            .execute("DELETE FROM search_cache WHERE expires_at <= ?1", &[&now])?;
        if removed > 0 {
            info!("Purged {} expired search cache entries", removed);
        }
        Ok(removed)
    }

    pub fn cache_stats(&self) -> Result<CacheStats> {
        let now = Utc::now().timestamp_millis();
        let stats = self.db.query_row(
            "SELECT COUNT(*), COALESCE(SUM(CASE WHEN expires_at > ?1 THEN 1 ELSE 0 END), 0)
             FROM search_cache",
            &[&now],
            |row| {
                Ok(CacheStats {
                    total: row.get::<_, i64>(0)? as u64,
                    live: row.get::<_, i64>(1)? as u64,
                })
            },
        )?;
        Ok(stats.unwrap_or_default())
    }

    // =========================================================================
    // Documentation
    // =========================================================================

    /// Record documents returned by search without counting a use.
    pub fn record_documents_seen(&self, docs: &[SearchResult]) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        self.db.transaction(|conn| {
            for doc in docs {
                conn.execute(
                    r#"
                    INSERT INTO documentation (url, title, domain, first_seen, last_seen, total_uses)
                    VALUES (?1, ?2, ?3, ?4, ?4, 0)
                    ON CONFLICT(url) DO UPDATE SET
                        last_seen = excluded.last_seen,
                        title = CASE WHEN excluded.title <> '' THEN excluded.title ELSE documentation.title END
                    "#,
                    params![doc.url, doc.title, domain_of(&doc.url), now],
                )?;
            }
            Ok(())
        })
    }

    pub fn get_documentation(&self, url: &str) -> Result<Option<DocumentationNode>> {
        self.db.query_row(
            "SELECT url, title, domain, first_seen, last_seen, total_uses
             FROM documentation WHERE url = ?1",
            &[&url],
            |row| {
                Ok(DocumentationNode {
                    url: row.get(0)?,
                    title: row.get(1)?,
                    domain: row.get(2)?,
                    first_seen: row.get(3)?,
                    last_seen: row.get(4)?,
                    total_uses: row.get(5)?,
                })
            },
        )
    }

    pub fn documentation_count(&self) -> Result<u64> {
        self.count("SELECT COUNT(*) FROM documentation")
    }

    // =========================================================================
    // Patterns
    // =========================================================================

    /// Persist a pattern when `avg_score >= threshold`.
    ///
    /// Returns `None` without writing anything below the threshold. Above it,
    /// the pattern, its agent outputs, one documentation upsert per distinct
    /// URL and one contribution per URL are written in a single transaction.
    pub fn store_pattern(&self, pattern: NewPattern<'_>, threshold: f64) -> Result<Option<PatternId>> {
        if pattern.avg_score < threshold {
            debug!(
                avg_score = pattern.avg_score,
                threshold, "Pattern below threshold, not stored"
            );
            return Ok(None);
        }

        let id = PatternId::generate();
        let now = Utc::now();
        let now_ms = now.timestamp_millis();
        let now_text = now.to_rfc3339();

        self.db.transaction(|conn| {
            conn.execute(
                "INSERT INTO patterns (id, task, avg_score, agent_count, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    id.as_str(),
                    truncate_chars(pattern.task, MAX_TASK_CHARS),
                    pattern.avg_score,
                    pattern.outputs.len() as i64,
                    now_ms
                ],
            )?;

            for output in pattern.outputs {
                conn.execute(
                    r#"
                    INSERT INTO agent_outputs (pattern_id, role, content, score, iterations, latency_ms)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                    ON CONFLICT(pattern_id, role) DO UPDATE SET
                        content = excluded.content,
                        score = excluded.score,
                        iterations = excluded.iterations,
                        latency_ms = excluded.latency_ms
                    "#,
                    params![
                        id.as_str(),
                        output.role.as_str(),
                        truncate_chars(&output.content, MAX_OUTPUT_CHARS),
                        output.score,
                        output.iterations,
                        output.latency_ms as i64
                    ],
                )?;
            }

            let mut seen = HashSet::new();
            for doc in pattern.docs.iter().filter(|d| seen.insert(d.url.as_str())) {
                Self::upsert_used_doc(conn, doc, &now_text)?;
                conn.execute(
                    "INSERT INTO contributed_to (doc_url, pattern_id, score, agent, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![doc.url, id.as_str(), pattern.avg_score, WORKFLOW_AGENT, now_ms],
                )?;
            }
            Ok(())
        })?;

        info!(pattern_id = %id, avg_score = pattern.avg_score, docs = pattern.docs.len(), "Stored pattern");
        Ok(Some(id))
    }

    fn upsert_used_doc(conn: &Connection, doc: &SearchResult, now: &str) -> Result<()> {
        conn.execute(
            r#"
            INSERT INTO documentation (url, title, domain, first_seen, last_seen, total_uses)
            VALUES (?1, ?2, ?3, ?4, ?4, 1)
            ON CONFLICT(url) DO UPDATE SET
                total_uses = documentation.total_uses + 1,
                last_seen = excluded.last_seen,
                title = CASE WHEN excluded.title <> '' THEN excluded.title ELSE documentation.title END
            "#,
            params![doc.url, doc.title, domain_of(&doc.url), now],
        )?;
        Ok(())
    }

    /// Stored patterns similar to `task`, best first.
    ///
    /// Ranking is by stored average score, then recency; similarity only
    /// decides membership.
    pub fn retrieve_similar_patterns(
        &self,
        task: &str,
        limit: usize,
        min_score: f64,
        strategy: &dyn SimilarityStrategy,
    ) -> Result<Vec<PatternRecord>> {
        let keywords = strategy.keywords(task);
        if keywords.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let ids: Vec<String> = {
            let conn = self.db.connection()?;
            let mut stmt = conn.prepare(
                "SELECT id, task FROM patterns WHERE avg_score >= ?1
                 ORDER BY avg_score DESC, created_at DESC",
            )?;
            stmt.query_map(params![min_score], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .filter_map(|r| log_filter_error(r, "reading pattern row"))
            .filter(|(_, stored_task)| strategy.is_similar(&keywords, stored_task))
            .take(limit)
            .map(|(id, _)| id)
            .collect()
        };

        let mut patterns = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(pattern) = self.get_pattern(&id)? {
                patterns.push(pattern);
            }
        }

        debug!(
            strategy = strategy.name(),
            found = patterns.len(),
            "Retrieved similar patterns"
        );
        Ok(patterns)
    }

    pub fn get_pattern(&self, id: &str) -> Result<Option<PatternRecord>> {
        let head = self.db.query_row(
            "SELECT id, task, avg_score, created_at, repository_url FROM patterns WHERE id = ?1",
            &[&id],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, f64>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, Option<String>>(4)?,
                ))
            },
        )?;

        let Some((id, task, avg_score, created_at, repository_url)) = head else {
            return Ok(None);
        };

        let conn = self.db.connection()?;
        let outputs: Vec<StoredAgentOutput> = conn
            .prepare(
                "SELECT role, content, score, iterations, latency_ms
                 FROM agent_outputs WHERE pattern_id = ?1 ORDER BY role",
            )?
            .query_map(params![id], |row| {
                Ok(StoredAgentOutput {
                    role: row.get(0)?,
                    content: row.get(1)?,
                    score: row.get(2)?,
                    iterations: row.get(3)?,
                    latency_ms: row.get::<_, i64>(4)? as u64,
                })
            })?
            .filter_map(|r| log_filter_error(r, "reading agent output"))
            .collect();

        let doc_urls: Vec<String> = conn
            .prepare("SELECT doc_url FROM contributed_to WHERE pattern_id = ?1 ORDER BY id")?
            .query_map(params![id], |row| row.get(0))?
            .filter_map(|r| log_filter_error(r, "reading pattern doc"))
            .collect();

        Ok(Some(PatternRecord {
            id: PatternId::new(id),
            task,
            avg_score,
            timestamp: chrono::DateTime::from_timestamp_millis(created_at).unwrap_or_default(),
            repository_url,
            doc_urls,
            outputs,
        }))
    }

    /// Attach an external repository URL to a stored pattern.
    pub fn link_repository_url(&self, pattern_id: &str, repository_url: &str) -> Result<()> {
        url::Url::parse(repository_url).map_err(|e| {
            SwarmError::validation(ValidationErrorKind::Format, "repository_url", e.to_string())
        })?;

        let updated = self.db.execute(
            "UPDATE patterns SET repository_url = ?1 WHERE id = ?2",
            &[&repository_url, &pattern_id],
        )?;
        if updated == 0 {
            return Err(SwarmError::NotFound {
                kind: "pattern",
                id: pattern_id.to_string(),
            });
        }
        Ok(())
    }

    pub fn pattern_count(&self) -> Result<u64> {
        self.count("SELECT COUNT(*) FROM patterns")
    }

    pub fn contributions_for_pattern(&self, pattern_id: &str) -> Result<Vec<Contribution>> {
        let conn = self.db.connection()?;
        let mut stmt = conn.prepare(
            "SELECT doc_url, pattern_id, score, agent FROM contributed_to
             WHERE pattern_id = ?1 ORDER BY id",
        )?;
        let rows = stmt
            .query_map(params![pattern_id], |row| {
                Ok(Contribution {
                    doc_url: row.get(0)?,
                    pattern_id: row.get(1)?,
                    score: row.get(2)?,
                    agent: row.get(3)?,
                })
            })?
            .filter_map(|r| log_filter_error(r, "reading contribution"))
            .collect();
        Ok(rows)
    }

    // =========================================================================
    // Effectiveness
    // =========================================================================

    /// Per-document effectiveness over all contributions.
    ///
    /// Documents with fewer than `min_samples` contributions are omitted.
    /// Sorted by average score, then use count, both descending.
    pub fn doc_effectiveness(&self, min_samples: usize, threshold: f64) -> Result<Vec<DocEffectiveness>> {
        let conn = self.db.connection()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT d.url, d.title, AVG(c.score) AS avg_score, COUNT(*) AS uses,
                   AVG(CASE WHEN c.score >= ?2 THEN 1.0 ELSE 0.0 END) AS success_rate
            FROM contributed_to c
            JOIN documentation d ON d.url = c.doc_url
            GROUP BY d.url
            HAVING COUNT(*) >= ?1
            ORDER BY avg_score DESC, uses DESC, d.url ASC
            "#,
        )?;
        let rows = stmt
            .query_map(params![min_samples as i64, threshold], |row| {
                Ok(DocEffectiveness {
                    url: row.get(0)?,
                    title: row.get(1)?,
                    avg_score: row.get(2)?,
                    uses: row.get(3)?,
                    success_rate: row.get(4)?,
                })
            })?
            .filter_map(|r| log_filter_error(r, "reading effectiveness row"))
            .collect();
        Ok(rows)
    }

    /// Top effectiveness-ranked documents that contributed to patterns
    /// similar to `task`.
    pub fn proven_docs_for_task(
        &self,
        task: &str,
        strategy: &dyn SimilarityStrategy,
        limit: usize,
        min_samples: usize,
        threshold: f64,
    ) -> Result<Vec<DocEffectiveness>> {
        let keywords = strategy.keywords(task);
        if keywords.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let related: HashSet<String> = {
            let conn = self.db.connection()?;
            let mut stmt = conn.prepare(
                "SELECT DISTINCT c.doc_url, p.task FROM contributed_to c
                 JOIN patterns p ON p.id = c.pattern_id",
            )?;
            stmt.query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .filter_map(|r| log_filter_error(r, "reading doc task"))
            .filter(|(_, stored_task)| strategy.is_similar(&keywords, stored_task))
            .map(|(url, _)| url)
            .collect()
        };

        if related.is_empty() {
            return Ok(Vec::new());
        }

        Ok(self
            .doc_effectiveness(min_samples, threshold)?
            .into_iter()
            .filter(|doc| related.contains(&doc.url))
            .take(limit)
            .collect())
    }

    // =========================================================================
    // Feedback
    // =========================================================================

    /// Append a feedback event and link its unhelpful documents.
    ///
    /// Unhelpful URLs unknown to the store are ignored.
    pub fn store_user_feedback(&self, feedback: &UserFeedback) -> Result<FeedbackReceipt> {
        feedback.validate()?;

        if self.get_pattern_exists(feedback.pattern_id.as_str())?.is_none() {
            return Err(SwarmError::NotFound {
                kind: "pattern",
                id: feedback.pattern_id.to_string(),
            });
        }

        let feedback_id = format!("feedback_{}", uuid::Uuid::new_v4().simple());
        let now = Utc::now().to_rfc3339();

        let flagged = self.db.transaction(|conn| {
            conn.execute(
                "INSERT INTO user_feedback
                 (id, pattern_id, code_quality, context_quality, comment, retry_session, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    feedback_id,
                    feedback.pattern_id.as_str(),
                    feedback.code_quality,
                    feedback.context_quality,
                    feedback.comment,
                    feedback.retry_session,
                    now
                ],
            )?;

            let mut flagged = 0;
            for url in &feedback.unhelpful_docs {
                match Self::link_negative(conn, url, &feedback_id, &now)? {
                    0 => debug!(url = %url, "Unhelpful doc not in store, ignoring"),
                    n => flagged += n,
                }
            }
            Ok(flagged)
        })?;

        info!(
            feedback_id = %feedback_id,
            pattern_id = %feedback.pattern_id,
            requested = feedback.unhelpful_docs.len(),
            flagged,
            "Stored user feedback"
        );
        Ok(FeedbackReceipt {
            feedback_id,
            flagged,
        })
    }

    /// Mark one document unhelpful for an existing feedback event.
    pub fn mark_doc_unhelpful(&self, url: &str, feedback_id: &str) -> Result<bool> {
        let now = Utc::now().to_rfc3339();
        let conn = self.db.connection()?;
        Ok(Self::link_negative(&conn, url, feedback_id, &now)? > 0)
    }

    fn link_negative(conn: &Connection, url: &str, feedback_id: &str, now: &str) -> Result<usize> {
        Ok(conn.execute(
            "INSERT OR IGNORE INTO negative_feedback (doc_url, feedback_id, created_at)
             SELECT d.url, f.id, ?3 FROM documentation d, user_feedback f
             WHERE d.url = ?1 AND f.id = ?2",
            params![url, feedback_id, now],
        )?)
    }

    fn get_pattern_exists(&self, id: &str) -> Result<Option<i64>> {
        self.db
            .query_row("SELECT 1 FROM patterns WHERE id = ?1", &[&id], |row| row.get(0))
    }

    /// URLs whose negative-feedback rate is above `max_rate`, among documents
    /// used at least `min_uses` times.
    pub fn excluded_docs(&self, max_rate: f64, min_uses: u32) -> Result<HashSet<String>> {
        let conn = self.db.connection()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT d.url
            FROM documentation d
            LEFT JOIN negative_feedback n ON n.doc_url = d.url
            WHERE d.total_uses >= ?2 AND d.total_uses > 0
            GROUP BY d.url
            HAVING CAST(COUNT(n.feedback_id) AS REAL) / d.total_uses > ?1
            "#,
        )?;
        let urls = stmt
            .query_map(params![max_rate, min_uses], |row| row.get(0))?
            .filter_map(|r| log_filter_error(r, "reading excluded doc"))
            .collect();
        Ok(urls)
    }

    // =========================================================================
    // Agent Performance
    // =========================================================================

    pub fn record_agent_run(
        &self,
        role: &str,
        score: f64,
        latency_ms: u64,
        threshold: f64,
    ) -> Result<()> {
        let success = i64::from(score >= threshold);
        self.db.execute(
            r#"
            INSERT INTO agent_stats (role, runs, successes, total_score, total_latency_ms, updated_at)
            VALUES (?1, 1, ?2, ?3, ?4, ?5)
            ON CONFLICT(role) DO UPDATE SET
                runs = agent_stats.runs + 1,
                successes = agent_stats.successes + excluded.successes,
                total_score = agent_stats.total_score + excluded.total_score,
                total_latency_ms = agent_stats.total_latency_ms + excluded.total_latency_ms,
                updated_at = excluded.updated_at
            "#,
            &[
                &role,
                &success,
                &score,
                &(latency_ms as i64),
                &Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn agent_stats(&self) -> Result<Vec<AgentStats>> {
        let conn = self.db.connection()?;
        let mut stmt = conn.prepare(
            "SELECT role, runs, successes, total_score, total_latency_ms
             FROM agent_stats ORDER BY role",
        )?;
        let rows = stmt
            .query_map([], |row| {
                let runs: i64 = row.get(1)?;
                let total_score: f64 = row.get(3)?;
                let total_latency: i64 = row.get(4)?;
                let divisor = runs.max(1) as f64;
                Ok(AgentStats {
                    role: row.get(0)?,
                    runs: runs as u64,
                    successes: row.get::<_, i64>(2)? as u64,
                    avg_score: total_score / divisor,
                    avg_latency_ms: total_latency as f64 / divisor,
                })
            })?
            .filter_map(|r| log_filter_error(r, "reading agent stats"))
            .collect();
        Ok(rows)
    }

    fn count(&self, sql: &str) -> Result<u64> {
        let n: Option<i64> = self.db.query_row(sql, &[], |row| row.get(0))?;
        Ok(n.unwrap_or(0) as u64)
    }
}
