//! Full-text side of the hybrid index.
//!
//! An in-memory SQLite FTS5 table ranked with `bm25`. Row ids are the
//! record's insertion position plus one.

use crate::error::{GuideError, Result};
use regex::Regex;
use rusqlite::{params, Connection};
use std::sync::{Mutex, OnceLock};
use tracing::debug;

/// Words too common to carry signal in a question.
const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "at", "be", "by", "can", "do", "does", "for", "how", "i", "in", "is",
    "it", "me", "my", "of", "on", "or", "should", "the", "to", "was", "what", "when", "where",
    "which", "who", "why", "with", "you", "your",
];

fn term_regex() -> &'static Regex {
    static TERM: OnceLock<Regex> = OnceLock::new();
    TERM.get_or_init(|| Regex::new(r"[\p{L}\p{N}]+").expect("Invalid regex"))
}

/// Split free text into lowercase search terms, dropping stopwords.
pub fn query_terms(text: &str) -> Vec<String> {
    let mut terms: Vec<String> = Vec::new();
    for m in term_regex().find_iter(text) {
        let term = m.as_str().to_lowercase();
        if STOPWORDS.contains(&term.as_str()) || terms.contains(&term) {
            continue;
        }
        terms.push(term);
    }
    terms
}

/// FTS5 index over record content and category.
pub struct LexicalIndex {
    conn: Mutex<Connection>,
}

impl LexicalIndex {
    /// Build the index from `(content, category)` pairs in insertion order.
    pub fn build<'a>(documents: impl IntoIterator<Item = (&'a str, &'a str)>) -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        conn.execute_batch(
            "CREATE VIRTUAL TABLE records_fts USING fts5(content, category, tokenize = 'porter unicode61');",
        )?;

        let tx = conn.transaction()?;
        let mut inserted = 0usize;
        {
            let mut stmt =
                tx.prepare("INSERT INTO records_fts(rowid, content, category) VALUES (?1, ?2, ?3)")?;
            for (position, (content, category)) in documents.into_iter().enumerate() {
                stmt.execute(params![
                    position as i64 + 1,
                    content,
                    category.replace('_', " ")
                ])?;
                inserted += 1;
            }
        }
        tx.commit()?;

        debug!("Built full-text index with {} rows", inserted);
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Return `(position, score)` for up to `limit` matches, best first.
    ///
    /// Scores are negated `bm25` ranks, so higher is better. Any query term
    /// may match.
    pub fn search(&self, text: &str, limit: usize) -> Result<Vec<(usize, f64)>> {
        let terms = query_terms(text);
        if terms.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let expression = terms
            .iter()
            .map(|t| format!("\"{}\"", t))
            .collect::<Vec<_>>()
            .join(" OR ");

        let conn = self
            .conn
            .lock()
            .map_err(|_| GuideError::Index("Full-text index lock poisoned".to_string()))?;
        let mut stmt = conn.prepare(
            "SELECT rowid, bm25(records_fts) AS score FROM records_fts \
             WHERE records_fts MATCH ?1 ORDER BY score, rowid LIMIT ?2",
        )?;

        let rows = stmt.query_map(params![expression, limit as i64], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, f64>(1)?))
        })?;

        let mut matches = Vec::new();
        for row in rows {
            let (rowid, rank) = row?;
            matches.push(((rowid - 1) as usize, -rank));
        }
        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_terms() {
        assert_eq!(
            query_terms("How do I build a Snow shelter? snow!"),
            vec!["build", "snow", "shelter"]
        );
        assert!(query_terms("how do i").is_empty());
        assert!(query_terms("").is_empty());
    }

    #[test]
    fn test_search_ranks_matches() {
        let index = LexicalIndex::build([
            ("Catch halibut with herring", "fishing"),
            ("Dig a snow trench 2 feet deep", "winter_survival"),
            ("Snow walls block wind, pack the snow tight", "winter_survival"),
        ])
        .unwrap();

        let hits = index.search("snow", 10).unwrap();
        let positions: Vec<usize> = hits.iter().map(|(p, _)| *p).collect();
        assert_eq!(positions.len(), 2);
        assert!(positions.contains(&1));
        assert!(positions.contains(&2));
        assert!(!positions.contains(&0));
        assert!(hits[0].1 >= hits[1].1);
    }

    #[test]
    fn test_search_stems_and_matches_category() {
        let index = LexicalIndex::build([
            ("Frame the walls before the roof", "building"),
            ("Use a bobber", "fishing"),
        ])
        .unwrap();

        let hits = index.search("building cabins", 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0, 0);

        let hits = index.search("fishing", 10).unwrap();
        assert_eq!(hits[0].0, 1);
    }

    #[test]
    fn test_search_respects_limit_and_no_terms() {
        let index = LexicalIndex::build([("snow", "a"), ("snow", "b"), ("snow", "c")]).unwrap();
        assert_eq!(index.search("snow", 2).unwrap().len(), 2);
        assert!(index.search("the", 10).unwrap().is_empty());
        assert!(index.search("snow", 0).unwrap().is_empty());
    }

    #[test]
    fn test_quotes_in_query_are_not_syntax() {
        let index = LexicalIndex::build([("bear spray", "gear")]).unwrap();
        let hits = index.search("\"bear\" AND (spray", 10).unwrap();
        assert_eq!(hits.len(), 1);
    }
}
