//! Canonical-artifact selection among retried upstream results.
//!
//! Reprocessing can leave several Extractions, ChunkedDocuments or
//! ChunkEmbeddings for the same (document, config) pair. Exactly one is
//! canonical: the oldest. Later duplicates are retried noise, not updates,
//! so the earliest `created_at` wins; ties keep the earliest-positioned
//! input item, which makes the choice deterministic.

use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::types::{ChunkEmbeddings, ChunkedDocument, Extraction};

/// Anything stamped with a producing-config id and a creation timestamp.
pub trait Artifact {
    fn config_id(&self) -> &str;
    fn created_at(&self) -> DateTime<Utc>;
}

impl Artifact for Extraction {
    fn config_id(&self) -> &str {
        &self.config_id
    }
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Artifact for ChunkedDocument {
    fn config_id(&self) -> &str {
        &self.config_id
    }
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Artifact for ChunkEmbeddings {
    fn config_id(&self) -> &str {
        &self.config_id
    }
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Returns one item per distinct config id: the one with the minimum
/// creation timestamp. Pure; superseded duplicates are left untouched
/// (deleting them is an external collaborator's job). Output order follows
/// first appearance of each config id in the input.
pub fn dedupe<T: Artifact + Clone>(items: &[T]) -> Vec<T> {
    // config_id -> index into `kept`
    let mut by_config: HashMap<&str, usize> = HashMap::new();
    let mut kept: Vec<T> = Vec::new();
    for item in items {
        match by_config.get(item.config_id()) {
            None => {
                by_config.insert(item.config_id(), kept.len());
                kept.push(item.clone());
            }
            Some(&slot) => {
                // Strictly earlier replaces; an equal timestamp keeps the
                // earlier-positioned item.
                if item.created_at() < kept[slot].created_at() {
                    kept[slot] = item.clone();
                }
            }
        }
    }
    kept
}

/// Convenience: the canonical artifact for one specific config id, if any.
pub fn canonical_for<'a, T: Artifact>(items: &'a [T], config_id: &str) -> Option<&'a T> {
    items
        .iter()
        .filter(|i| i.config_id() == config_id)
        .min_by_key(|i| i.created_at())
}
