// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2024 Jonathan Lee
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License version 3
// as published by the Free Software Foundation.
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see https://www.gnu.org/licenses/.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use crate::leak::normalise;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read word catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed word catalog: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("word catalog is empty")]
    Empty,

    #[error("duplicate word id '{0}' in catalog")]
    DuplicateId(String),

    #[error("catalog entry {index} is invalid: {reason}")]
    InvalidEntry { index: usize, reason: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordEntry {
    pub id: String,
    pub target: String,
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl WordEntry {
    /// Whether `guess` names this word: the target or one of its aliases,
    /// compared after case and diacritic folding.
    pub fn accepts(&self, guess: &str) -> bool {
        let guess = normalise(guess);
        if guess.is_empty() {
            return false;
        }
        std::iter::once(&self.target)
            .chain(self.aliases.iter())
            .any(|form| normalise(form) == guess)
    }
}

/// The secret handed to a new round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetPick {
    pub target: String,
    pub word_id: String,
}

/// Read-only table of target words, built once at startup and shared behind
/// an `Arc`. Never empty.
#[derive(Debug, Clone)]
pub struct WordCatalog {
    entries: Vec<WordEntry>,
    by_id: HashMap<String, usize>,
}

impl WordCatalog {
    pub fn new(entries: Vec<WordEntry>) -> Result<Self, CatalogError> {
        if entries.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut by_id = HashMap::with_capacity(entries.len());
        for (index, entry) in entries.iter().enumerate() {
            if entry.id.trim().is_empty() {
                return Err(CatalogError::InvalidEntry {
                    index,
                    reason: "empty id",
                });
            }
            if entry.target.trim().is_empty() {
                return Err(CatalogError::InvalidEntry {
                    index,
                    reason: "empty target",
                });
            }
            if by_id.insert(entry.id.clone(), index).is_some() {
                return Err(CatalogError::DuplicateId(entry.id.clone()));
            }
        }

        Ok(Self { entries, by_id })
    }

    pub fn from_json_str(json: &str) -> Result<Self, CatalogError> {
        let entries: Vec<WordEntry> = serde_json::from_str(json)?;
        Self::new(entries)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let catalog = Self::from_json_str(&raw)?;
        info!(path = %path.display(), words = catalog.len(), "word catalog loaded");
        Ok(catalog)
    }

    pub fn get(&self, id: &str) -> Option<&WordEntry> {
        self.by_id.get(id).map(|&index| &self.entries[index])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Uniform choice over all entries.
    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> &WordEntry {
        &self.entries[rng.gen_range(0..self.entries.len())]
    }

    pub fn pick_target(&self) -> TargetPick {
        let entry = self.pick(&mut rand::thread_rng());
        TargetPick {
            target: entry.target.clone(),
            word_id: entry.id.clone(),
        }
    }
}
