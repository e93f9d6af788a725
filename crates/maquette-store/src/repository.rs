//! Versioned model storage with backups.
//!
//! All operations work under a caller-supplied base directory laid out as
//! `models/`, `versions/<model_id>/`, and `backups/`, created on
//! construction. File I/O is blocking and unlocked; concurrent access to the
//! same directory from multiple processes is the caller's responsibility.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Utc};
use log::{debug, info};
use uuid::Uuid;

use maquette_core::{ElementId, Model};

use crate::error::StoreError;
use crate::serializer::{ModelDeserializer, ModelSerializer};

/// Serialization format of a stored model file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    #[default]
    Json,
    Yaml,
    Xmi,
}

impl Format {
    /// All formats a model file can be stored in.
    pub const ALL: [Format; 3] = [Format::Json, Format::Yaml, Format::Xmi];

    /// The file extension for the format.
    pub fn extension(&self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Yaml => "yaml",
            Format::Xmi => "xmi",
        }
    }
}

impl FromStr for Format {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(Format::Json),
            "yaml" => Ok(Format::Yaml),
            "xmi" => Ok(Format::Xmi),
            other => Err(StoreError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// A stored version snapshot, as listed by
/// [`ModelRepository::list_versions`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionInfo {
    pub version_id: String,
    pub created_at: DateTime<Utc>,
    pub file_size: u64,
}

/// A stored backup, as listed by [`ModelRepository::list_backups`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupInfo {
    pub backup_name: String,
    pub created_at: DateTime<Utc>,
    pub file_size: u64,
}

/// Stores, versions, and backs up serialized models.
pub struct ModelRepository {
    models_path: PathBuf,
    versions_path: PathBuf,
    backups_path: PathBuf,
    serializer: ModelSerializer,
    deserializer: ModelDeserializer,
}

impl ModelRepository {
    /// Opens a repository under `base_path`, creating the directory layout
    /// if needed.
    pub fn new(base_path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let base_path = base_path.as_ref();
        let repository = Self {
            models_path: base_path.join("models"),
            versions_path: base_path.join("versions"),
            backups_path: base_path.join("backups"),
            serializer: ModelSerializer::new(),
            deserializer: ModelDeserializer::new(),
        };
        for path in [
            &repository.models_path,
            &repository.versions_path,
            &repository.backups_path,
        ] {
            fs::create_dir_all(path).map_err(|source| StoreError::io("create", path, source))?;
        }
        Ok(repository)
    }

    fn model_path(&self, model_id: &str, format: Format) -> PathBuf {
        self.models_path
            .join(format!("{model_id}.{}", format.extension()))
    }

    fn version_path(&self, model_id: &str, version_id: &str) -> PathBuf {
        self.versions_path
            .join(model_id)
            .join(format!("{version_id}.json"))
    }

    /// Returns the model's storage id, assigning one first if absent.
    fn ensure_model_id(model: &mut Model) -> String {
        match model.id() {
            Some(id) => id.to_string(),
            None => {
                let id = ElementId::new();
                model.set_id(id);
                id.to_string()
            }
        }
    }

    /// Saves a model, assigning its storage id if absent.
    ///
    /// With `create_backup`, the state being saved is first snapshotted into
    /// `backups/`.
    pub fn save_model(
        &self,
        model: &mut Model,
        format: Format,
        create_backup: bool,
    ) -> Result<String, StoreError> {
        let model_id = Self::ensure_model_id(model);

        if create_backup {
            self.create_backup(model)?;
        }

        let content = match format {
            Format::Json => self.serializer.to_json(model, None, None)?,
            Format::Yaml => self.serializer.to_yaml(model, None, None)?,
            Format::Xmi => self.serializer.to_xmi(model, None, None)?,
        };

        let path = self.model_path(&model_id, format);
        write_file(&path, &content)?;

        info!(model_id = model_id, format = format.extension(); "Model saved");
        Ok(model_id)
    }

    /// Loads a model from its primary file.
    ///
    /// # Errors
    ///
    /// [`StoreError::ModelNotFound`] if no file exists for the id/format.
    pub fn load_model(&self, model_id: &str, format: Format) -> Result<Model, StoreError> {
        let path = self.model_path(model_id, format);
        if !path.exists() {
            return Err(StoreError::ModelNotFound(model_id.to_string()));
        }

        let content = read_file(&path)?;
        match format {
            Format::Json => self.deserializer.from_json(&content),
            Format::Yaml => self.deserializer.from_yaml(&content),
            Format::Xmi => self.deserializer.from_xmi(&content),
        }
    }

    /// Writes a JSON version snapshot and returns its id.
    ///
    /// Snapshots are always JSON regardless of the model's primary format.
    pub fn create_version(
        &self,
        model: &mut Model,
        version_id: Option<&str>,
    ) -> Result<String, StoreError> {
        let model_id = Self::ensure_model_id(model);
        let version_id = version_id
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let version_dir = self.versions_path.join(&model_id);
        fs::create_dir_all(&version_dir)
            .map_err(|source| StoreError::io("create", &version_dir, source))?;

        let content = self.serializer.to_json(model, None, None)?;
        write_file(&self.version_path(&model_id, &version_id), &content)?;

        debug!(model_id = model_id, version_id = version_id; "Version created");
        Ok(version_id)
    }

    /// Loads a specific version snapshot.
    ///
    /// # Errors
    ///
    /// [`StoreError::VersionNotFound`] if the snapshot does not exist.
    pub fn load_version(&self, model_id: &str, version_id: &str) -> Result<Model, StoreError> {
        let path = self.version_path(model_id, version_id);
        if !path.exists() {
            return Err(StoreError::VersionNotFound {
                model_id: model_id.to_string(),
                version_id: version_id.to_string(),
            });
        }
        self.deserializer.from_json(&read_file(&path)?)
    }

    /// Lists a model's version snapshots, newest first.
    pub fn list_versions(&self, model_id: &str) -> Result<Vec<VersionInfo>, StoreError> {
        let version_dir = self.versions_path.join(model_id);
        if !version_dir.exists() {
            return Ok(Vec::new());
        }

        let mut versions = Vec::new();
        for entry in list_json_files(&version_dir)? {
            let (path, created_at, file_size) = entry;
            let version_id = path
                .file_stem()
                .map(|stem| stem.to_string_lossy().to_string())
                .unwrap_or_default();
            versions.push(VersionInfo {
                version_id,
                created_at,
                file_size,
            });
        }

        versions.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.version_id.cmp(&a.version_id))
        });
        Ok(versions)
    }

    /// Snapshots the model into `backups/` and returns the backup name.
    ///
    /// The name encodes the model id and a UTC timestamp with second
    /// precision: `<model_id>_<YYYYMMDD_HHMMSS>.json`.
    pub fn create_backup(&self, model: &mut Model) -> Result<String, StoreError> {
        let model_id = Self::ensure_model_id(model);
        let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
        let backup_name = format!("{model_id}_{timestamp}.json");

        let content = self.serializer.to_json(model, None, None)?;
        write_file(&self.backups_path.join(&backup_name), &content)?;

        debug!(backup_name = backup_name; "Backup created");
        Ok(backup_name)
    }

    /// Lists a model's backups, newest first.
    pub fn list_backups(&self, model_id: &str) -> Result<Vec<BackupInfo>, StoreError> {
        let prefix = format!("{model_id}_");
        let mut backups = Vec::new();
        for (path, created_at, file_size) in list_json_files(&self.backups_path)? {
            let name = path
                .file_name()
                .map(|name| name.to_string_lossy().to_string())
                .unwrap_or_default();
            if !name.starts_with(&prefix) {
                continue;
            }
            backups.push(BackupInfo {
                backup_name: name,
                created_at,
                file_size,
            });
        }

        backups.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.backup_name.cmp(&a.backup_name))
        });
        Ok(backups)
    }

    /// Restores a model from a backup file.
    ///
    /// # Errors
    ///
    /// [`StoreError::BackupNotFound`] if no backup has that name.
    pub fn restore_backup(&self, backup_name: &str) -> Result<Model, StoreError> {
        let path = self.backups_path.join(backup_name);
        if !path.exists() {
            return Err(StoreError::BackupNotFound(backup_name.to_string()));
        }
        self.deserializer.from_json(&read_file(&path)?)
    }

    /// Deletes a model's primary files in every format; versions and
    /// backups are removed only when explicitly requested.
    pub fn delete_model(
        &self,
        model_id: &str,
        delete_versions: bool,
        delete_backups: bool,
    ) -> Result<(), StoreError> {
        for format in Format::ALL {
            let path = self.model_path(model_id, format);
            if path.exists() {
                fs::remove_file(&path).map_err(|source| StoreError::io("delete", &path, source))?;
            }
        }

        if delete_versions {
            let version_dir = self.versions_path.join(model_id);
            if version_dir.exists() {
                fs::remove_dir_all(&version_dir)
                    .map_err(|source| StoreError::io("delete", &version_dir, source))?;
            }
        }

        if delete_backups {
            for backup in self.list_backups(model_id)? {
                let path = self.backups_path.join(&backup.backup_name);
                fs::remove_file(&path).map_err(|source| StoreError::io("delete", &path, source))?;
            }
        }

        info!(model_id = model_id; "Model deleted");
        Ok(())
    }

    /// Removes backups older than `keep_days` and returns how many were
    /// deleted.
    pub fn cleanup_old_backups(&self, model_id: &str, keep_days: u64) -> Result<usize, StoreError> {
        let cutoff = SystemTime::now() - Duration::from_secs(keep_days * 24 * 60 * 60);
        self.cleanup_backups_before(model_id, cutoff)
    }

    /// Removes backups whose file modification time is older than `cutoff`.
    pub fn cleanup_backups_before(
        &self,
        model_id: &str,
        cutoff: SystemTime,
    ) -> Result<usize, StoreError> {
        let cutoff: DateTime<Utc> = cutoff.into();
        let mut removed = 0;
        for backup in self.list_backups(model_id)? {
            if backup.created_at < cutoff {
                let path = self.backups_path.join(&backup.backup_name);
                fs::remove_file(&path).map_err(|source| StoreError::io("delete", &path, source))?;
                removed += 1;
            }
        }

        debug!(model_id = model_id, removed = removed; "Old backups cleaned up");
        Ok(removed)
    }
}

fn read_file(path: &Path) -> Result<String, StoreError> {
    fs::read_to_string(path).map_err(|source| StoreError::io("read", path, source))
}

fn write_file(path: &Path, content: &str) -> Result<(), StoreError> {
    fs::write(path, content).map_err(|source| StoreError::io("write", path, source))
}

/// Lists `.json` files in a directory with their modification time and size.
fn list_json_files(dir: &Path) -> Result<Vec<(PathBuf, DateTime<Utc>, u64)>, StoreError> {
    let entries = fs::read_dir(dir).map_err(|source| StoreError::io("read", dir, source))?;
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| StoreError::io("read", dir, source))?;
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
            continue;
        }
        let metadata = entry
            .metadata()
            .map_err(|source| StoreError::io("read", &path, source))?;
        let modified = metadata
            .modified()
            .map_err(|source| StoreError::io("read", &path, source))?;
        files.push((path, modified.into(), metadata.len()));
    }
    Ok(files)
}
