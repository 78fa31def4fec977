use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Records keyed by id, persisted as one JSON document per location.
pub type DB<T> = HashMap<String, T>;

const DB_FILE: &str = "db.json";

#[derive(Debug, Error)]
pub enum DBError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

fn db_file(location: &str) -> PathBuf {
    Path::new(location).join(DB_FILE)
}

/// Missing file means an empty database.
pub fn load_db<T: DeserializeOwned>(location: &str) -> Result<DB<T>, DBError> {
    let path = db_file(location);
    match fs::read_to_string(&path) {
        Ok(content) if content.trim().is_empty() => Ok(HashMap::new()),
        Ok(content) => Ok(serde_json::from_str(&content)?),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(HashMap::new()),
        Err(err) => Err(err.into()),
    }
}

/// Writes to a temp file first and renames it over the previous copy.
pub fn save_db<T: Serialize>(location: &str, db: &DB<T>) -> Result<(), DBError> {
    fs::create_dir_all(location)?;
    let path = db_file(location);
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, serde_json::to_vec_pretty(db)?)?;
    fs::rename(&tmp, &path)?;
    Ok(())
}
