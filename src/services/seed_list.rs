use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;

/// Seed list compiled into the binary.
const BUNDLED_SEED_WALLETS: &str = include_str!("../../data/seed_wallets.json");

#[derive(Debug, Error)]
pub enum SeedLoadError {
    #[error("seed list {path} unreadable: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("seed list malformed: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
struct SeedDocument {
    wallets: Vec<String>,
}

/// Where the static fallback wallet list comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeedList {
    Bundled,
    File(PathBuf),
    Inline(Vec<String>),
}

impl SeedList {
    /// Read the list. Blank entries are dropped; no other normalization.
    pub async fn load(&self) -> Result<Vec<String>, SeedLoadError> {
        let wallets = match self {
            SeedList::Bundled => parse_seed_document(BUNDLED_SEED_WALLETS)?,
            SeedList::File(path) => {
                let raw = tokio::fs::read_to_string(path)
                    .await
                    .map_err(|source| SeedLoadError::Io {
                        path: path.display().to_string(),
                        source,
                    })?;
                parse_seed_document(&raw)?
            }
            SeedList::Inline(wallets) => wallets.clone(),
        };

        Ok(wallets
            .into_iter()
            .filter(|w| !w.trim().is_empty())
            .collect())
    }
}

/// Parse `{ "wallets": [ "0x...", ... ] }`.
pub fn parse_seed_document(raw: &str) -> Result<Vec<String>, SeedLoadError> {
    let doc: SeedDocument = serde_json::from_str(raw)?;
    Ok(doc.wallets)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_seed_document() {
        let wallets = parse_seed_document(r#"{ "wallets": ["0xAA", "0xbb"] }"#).unwrap();
        assert_eq!(wallets, vec!["0xAA".to_string(), "0xbb".to_string()]);
    }

    #[test]
    fn test_malformed_seed_document() {
        assert!(matches!(
            parse_seed_document(r#"{ "addresses": [] }"#),
            Err(SeedLoadError::Malformed(_))
        ));
        assert!(matches!(
            parse_seed_document(r#"{ "wallets": [1, 2] }"#),
            Err(SeedLoadError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn test_bundled_list_parses() {
        assert!(SeedList::Bundled.load().await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let list = SeedList::File(PathBuf::from("/nonexistent/seed_wallets.json"));
        assert!(matches!(list.load().await, Err(SeedLoadError::Io { .. })));
    }

    #[tokio::test]
    async fn test_blank_entries_dropped() {
        let list = SeedList::Inline(vec!["0xaa".into(), "  ".into(), String::new()]);
        assert_eq!(list.load().await.unwrap(), vec!["0xaa".to_string()]);
    }
}
