// Flat per-gesture JSON record store

use anyhow::{Context, Result};
use gesture_signatures::models::{GestureSignature, SignatureSet};
use std::fs;
use std::path::{Path, PathBuf};

/// Suffix of records written by the trainer
const TRAINED_SUFFIX: &str = "_firma";
const RECORD_EXTENSION: &str = "json";

/// Directory of signature records, one JSON file per gesture
pub struct SignatureStore {
    dir: PathBuf,
}

impl SignatureStore {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of a trained record: `<name>_firma.json`
    pub fn trained_path(&self, name: &str) -> PathBuf {
        self.dir
            .join(format!("{}{}.{}", name, TRAINED_SUFFIX, RECORD_EXTENSION))
    }

    /// Path of an optimized record: `<name>.json`
    pub fn record_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", name, RECORD_EXTENSION))
    }

    /// Load every `*.json` record in file-name order
    pub fn load_all(&self) -> Result<SignatureSet> {
        let entries = fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to read signature directory {:?}", self.dir))?;

        let mut paths = Vec::new();
        for entry in entries {
            let path = entry.context("Failed to read directory entry")?.path();
            let is_record = path.extension().map_or(false, |ext| ext == RECORD_EXTENSION);
            if is_record && path.is_file() {
                paths.push(path);
            }
        }
        paths.sort();

        let mut set = SignatureSet::new();
        for path in paths {
            let signature = Self::read_record(&path)?;
            tracing::debug!("Loaded '{}' from {:?}", signature.name, path);
            set.insert(signature)
                .with_context(|| format!("Failed to add record {:?}", path))?;
        }

        tracing::info!("Loaded {} signatures from {:?}", set.len(), self.dir);
        Ok(set)
    }

    pub fn read_record(path: &Path) -> Result<GestureSignature> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read signature file {:?}", path))?;
        let signature = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse signature file {:?}", path))?;
        Ok(signature)
    }

    /// Write a freshly trained signature as `<name>_firma.json`
    pub fn save_trained(&self, signature: &GestureSignature) -> Result<PathBuf> {
        let path = self.trained_path(&signature.name);
        let contents = serde_json::to_string_pretty(signature)
            .context("Failed to serialize signature")?;

        self.ensure_dir()?;
        fs::write(&path, contents)
            .with_context(|| format!("Failed to write signature file {:?}", path))?;

        tracing::debug!("Saved trained signature {:?}", path);
        Ok(path)
    }

    /// Write every signature of an optimized set as `<name>.json`.
    ///
    /// All records are serialized before the first file is written.
    pub fn save_all(&self, signatures: &SignatureSet) -> Result<Vec<PathBuf>> {
        let mut pending = Vec::with_capacity(signatures.len());
        for signature in signatures.iter() {
            let contents = serde_json::to_string_pretty(signature)
                .with_context(|| format!("Failed to serialize signature '{}'", signature.name))?;
            pending.push((self.record_path(&signature.name), contents));
        }

        self.ensure_dir()?;

        let mut written = Vec::with_capacity(pending.len());
        for (path, contents) in pending {
            fs::write(&path, contents)
                .with_context(|| format!("Failed to write signature file {:?}", path))?;
            written.push(path);
        }

        tracing::info!("Saved {} signatures to {:?}", written.len(), self.dir);
        Ok(written)
    }

    fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create directory {:?}", self.dir))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn record(name: &str, vector: Vec<f64>) -> GestureSignature {
        let json = serde_json::json!({
            "nombre": name,
            "tipo": "unimanual",
            "dimensiones": vector.len(),
            "firma_promedio": vector,
            "sigma": 0.02,
            "umbral": 0.08,
            "metadata": {"frames_estables": 20, "origen": "manual"},
        });
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_save_trained_and_load_all() -> Result<()> {
        let dir = tempdir()?;
        let store = SignatureStore::new(dir.path().join("gestures"));

        let path = store.save_trained(&record("hola", vec![0.1, 0.2]))?;
        assert!(path.ends_with("hola_firma.json"));
        store.save_trained(&record("adios", vec![0.3, 0.4]))?;
        fs::write(store.dir().join("notes.txt"), "ignored")?;

        let set = store.load_all()?;
        assert_eq!(set.names(), vec!["adios".to_string(), "hola".to_string()]);
        assert_eq!(set.get("hola").unwrap().metadata.extra["origen"], "manual");

        Ok(())
    }

    #[test]
    fn test_save_all_writes_plain_names() -> Result<()> {
        let dir = tempdir()?;
        let store = SignatureStore::new(dir.path());
        let set = SignatureSet::from_signatures(vec![
            record("a", vec![0.1, 0.2]),
            record("b", vec![0.3, 0.4]),
        ])?;

        let written = store.save_all(&set)?;
        assert_eq!(written.len(), 2);
        assert!(dir.path().join("a.json").exists());
        assert!(dir.path().join("b.json").exists());

        let reloaded = store.load_all()?;
        assert_eq!(reloaded, set);

        Ok(())
    }

    #[test]
    fn test_duplicate_names_in_directory() -> Result<()> {
        let dir = tempdir()?;
        let store = SignatureStore::new(dir.path());
        store.save_trained(&record("hola", vec![0.1, 0.2]))?;
        store.save_all(&SignatureSet::from_signatures(vec![record("hola", vec![0.1, 0.2])])?)?;

        assert!(store.load_all().is_err());
        Ok(())
    }

    #[test]
    fn test_missing_directory() {
        let store = SignatureStore::new("/definitely/not/here");
        assert!(store.load_all().is_err());
    }

    #[test]
    fn test_malformed_record() -> Result<()> {
        let dir = tempdir()?;
        fs::write(dir.path().join("roto.json"), "{\"nombre\": 3}")?;

        let err = SignatureStore::new(dir.path()).load_all().unwrap_err();
        assert!(format!("{:#}", err).contains("roto.json"));
        Ok(())
    }
}
