//! Reading and writing the knowledge base artifact.
//!
//! Two layouts are supported: a single JSON document holding the whole
//! [`KnowledgeBase`], or a directory with one file per collection.

use super::{Business, Category, DadJoke, Fact, KnowledgeBase, Metadata};
use crate::error::{GuideError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info};

const METADATA_FILE: &str = "metadata.json";
const CATEGORIES_FILE: &str = "categories.json";
const FACTS_FILE: &str = "facts.json";
const BUSINESSES_FILE: &str = "businesses.json";
const JOKES_FILE: &str = "jokes.json";

/// Load a knowledge base from a file or a split directory.
pub fn load(path: &Path) -> Result<KnowledgeBase> {
    if path.is_dir() {
        load_dir(path)
    } else {
        load_file(path)
    }
}

/// Save a knowledge base. Paths ending in `.json` get the single-document
/// layout; anything else is treated as a directory.
pub fn save(kb: &KnowledgeBase, path: &Path) -> Result<()> {
    if path.extension().is_some_and(|ext| ext == "json") {
        save_file(kb, path)
    } else {
        save_dir(kb, path)
    }
}

/// Load the single-document layout.
pub fn load_file(path: &Path) -> Result<KnowledgeBase> {
    let content = std::fs::read_to_string(path)?;
    let kb: KnowledgeBase = serde_json::from_str(&content)?;
    info!(
        "Loaded knowledge base from {:?} ({} records)",
        path,
        kb.record_count()
    );
    Ok(kb)
}

/// Write the single-document layout.
pub fn save_file(kb: &KnowledgeBase, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, serde_json::to_string_pretty(kb)?)?;
    info!("Saved knowledge base to {:?}", path);
    Ok(())
}

/// Load the split-directory layout. Only `metadata.json` is required.
pub fn load_dir(dir: &Path) -> Result<KnowledgeBase> {
    let metadata_path = dir.join(METADATA_FILE);
    if !metadata_path.exists() {
        return Err(GuideError::InvalidInput(format!(
            "{:?} is not a knowledge base directory (missing {})",
            dir, METADATA_FILE
        )));
    }

    let metadata: Metadata = read_json(&metadata_path)?;
    let categories: Vec<Category> = read_optional(&dir.join(CATEGORIES_FILE))?;
    let facts: Vec<Fact> = read_optional(&dir.join(FACTS_FILE))?;
    let businesses: Vec<Business> = read_optional(&dir.join(BUSINESSES_FILE))?;
    let jokes: Vec<DadJoke> = read_optional(&dir.join(JOKES_FILE))?;

    let kb = KnowledgeBase {
        metadata,
        categories,
        facts,
        businesses,
        jokes,
    };
    info!(
        "Loaded knowledge base from {:?} ({} records)",
        dir,
        kb.record_count()
    );
    Ok(kb)
}

/// Write the split-directory layout.
pub fn save_dir(kb: &KnowledgeBase, dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    write_json(&dir.join(METADATA_FILE), &kb.metadata)?;
    write_json(&dir.join(CATEGORIES_FILE), &kb.categories)?;
    write_json(&dir.join(FACTS_FILE), &kb.facts)?;
    write_json(&dir.join(BUSINESSES_FILE), &kb.businesses)?;
    write_json(&dir.join(JOKES_FILE), &kb.jokes)?;
    info!("Saved knowledge base to {:?}", dir);
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

fn read_optional<T: DeserializeOwned + Default>(path: &Path) -> Result<T> {
    if path.exists() {
        read_json(path)
    } else {
        debug!("{:?} not present, using empty collection", path);
        Ok(T::default())
    }
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    std::fs::write(path, serde_json::to_string_pretty(value)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::{BusinessType, FactType};
    use std::collections::BTreeSet;

    fn sample() -> KnowledgeBase {
        let mut kb = KnowledgeBase::empty();
        kb.metadata.channel_name = Some("Outdoor Boys".to_string());
        kb.metadata.total_videos = 1;
        kb.categories.push(Category {
            id: "winter_survival".to_string(),
            name: "Winter Survival".to_string(),
            description: "Cold weather trips".to_string(),
            playlist_id: "PLwinter".to_string(),
            fact_count: 1,
        });
        kb.facts.push(Fact {
            id: "f1".to_string(),
            fact_type: FactType::SurvivalTip,
            content: "Dig a snow trench 2 feet deep".to_string(),
            embedding: vec![0.1, 0.2, 0.3],
            category: "winter_survival".to_string(),
            video_id: "abc123".to_string(),
            video_title: "Snow Shelter Overnight".to_string(),
            timestamp: Some("03:15".to_string()),
            tags: BTreeSet::from(["survival".to_string(), "winter_survival".to_string()]),
        });
        kb.businesses.push(Business {
            id: "b1".to_string(),
            name: "Kenai Charters".to_string(),
            business_type: BusinessType::Charter,
            location: "Soldotna, AK".to_string(),
            contact: None,
            url: Some("https://example.com".to_string()),
            video_references: vec!["abc123".to_string()],
            description: "Halibut trips".to_string(),
            embedding: vec![0.3, 0.2, 0.1],
        });
        kb.jokes.push(DadJoke {
            id: "j1".to_string(),
            joke: "I only know 25 letters of the alphabet. I don't know y.".to_string(),
            context: "Snow Shelter Overnight".to_string(),
            video_id: "abc123".to_string(),
            timestamp: None,
            embedding: vec![0.0, 1.0, 0.0],
        });
        kb
    }

    #[test]
    fn test_single_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kb").join("knowledge-base.json");
        let kb = sample();

        save(&kb, &path).unwrap();
        let loaded = load(&path).unwrap();

        assert_eq!(loaded, kb);
    }

    #[test]
    fn test_directory_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("knowledge-base");
        let kb = sample();

        save(&kb, &path).unwrap();
        assert!(path.join(FACTS_FILE).exists());
        let loaded = load(&path).unwrap();

        assert_eq!(loaded, kb);
    }

    #[test]
    fn test_directory_without_metadata_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_dir(dir.path()).unwrap_err();
        assert!(matches!(err, GuideError::InvalidInput(_)));
    }

    #[test]
    fn test_directory_with_only_metadata() {
        let dir = tempfile::tempdir().unwrap();
        write_json(&dir.path().join(METADATA_FILE), &Metadata::new(0, 0)).unwrap();
        let kb = load_dir(dir.path()).unwrap();
        assert_eq!(kb.record_count(), 0);
    }
}
