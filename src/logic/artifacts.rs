//! Artifact Store
//!
//! The winning model, the scaler state and the label codec are persisted as
//! three independent JSON blobs plus a plain-text feature list. Every blob is
//! wrapped in a versioned envelope carrying a SHA-256 checksum of its payload.
//! Writes are all-or-nothing: files are staged as `.tmp` siblings and only
//! renamed into place once every write has succeeded. Files being replaced
//! are parked as `.bak` siblings until the whole swap succeeds, and put back
//! if any rename fails.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::ClassifierError;
use crate::logic::features::FEATURE_COUNT;
use crate::logic::label::CodecState;
use crate::logic::model::{ModelKind, TrainedModel};
use crate::logic::scaler::ScalerState;

// ============================================================================
// LAYOUT
// ============================================================================

pub const MODEL_FILE: &str = "best_model_15features.json";
pub const SCALER_FILE: &str = "scaler_15features.json";
pub const CODEC_FILE: &str = "label_encoder_15features.json";
pub const FEATURE_NAMES_FILE: &str = "feature_names_15.txt";

/// Bump when a payload layout changes incompatibly
pub const FORMAT_VERSION: u32 = 1;

const KIND_MODEL: &str = "model";
const KIND_SCALER: &str = "scaler";
const KIND_CODEC: &str = "label_codec";

pub fn candidate_file(kind: ModelKind) -> String {
    format!("model_{}_15features.json", kind.slug())
}

// ============================================================================
// DATA STRUCTURES
// ============================================================================

/// Persisted classifier plus what it scored when selected
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub name: String,
    pub kind: ModelKind,
    /// Held-out accuracy, 0.0 - 1.0
    pub accuracy: f64,
    pub trained_samples: usize,
    pub model: TrainedModel,
}

/// Everything inference needs, produced once per training run
#[derive(Debug, Clone)]
pub struct ArtifactBundle {
    pub model: ModelArtifact,
    pub scaler: ScalerState,
    pub codec: CodecState,
    pub feature_names: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Envelope<T> {
    format_version: u32,
    kind: String,
    run_id: Uuid,
    created_at: DateTime<Utc>,
    checksum: String,
    payload: T,
}

/// A loaded payload with its provenance
#[derive(Debug, Clone)]
pub struct Stamped<T> {
    pub run_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub payload: T,
}

// ============================================================================
// SAVE
// ============================================================================

/// Persist a bundle (and optionally every candidate) into `dir`.
///
/// Returns the run id shared by all blobs written.
pub fn save_bundle(
    dir: &Path,
    bundle: &ArtifactBundle,
    extra_models: &[ModelArtifact],
) -> Result<Uuid, ClassifierError> {
    fs::create_dir_all(dir)?;

    let run_id = Uuid::new_v4();
    let created_at = Utc::now();

    let mut files: Vec<(PathBuf, Vec<u8>)> = vec![
        (dir.join(MODEL_FILE), encode(KIND_MODEL, &bundle.model, run_id, created_at)?),
        (dir.join(SCALER_FILE), encode(KIND_SCALER, &bundle.scaler, run_id, created_at)?),
        (dir.join(CODEC_FILE), encode(KIND_CODEC, &bundle.codec, run_id, created_at)?),
        (dir.join(FEATURE_NAMES_FILE), feature_names_text(&bundle.feature_names).into_bytes()),
    ];
    for extra in extra_models {
        files.push((dir.join(candidate_file(extra.kind)), encode(KIND_MODEL, extra, run_id, created_at)?));
    }

    write_all_or_nothing(&files)?;

    tracing::info!("Artifacts saved to {} (run {})", dir.display(), run_id);
    Ok(run_id)
}

fn encode<T: Serialize>(
    kind: &str,
    payload: &T,
    run_id: Uuid,
    created_at: DateTime<Utc>,
) -> Result<Vec<u8>, ClassifierError> {
    let value = serde_json::to_value(payload).map_err(|e| ClassifierError::Training(e.to_string()))?;
    let envelope = Envelope {
        format_version: FORMAT_VERSION,
        kind: kind.to_string(),
        run_id,
        created_at,
        checksum: checksum(&value)?,
        payload: value,
    };
    serde_json::to_vec_pretty(&envelope).map_err(|e| ClassifierError::Training(e.to_string()))
}

fn write_all_or_nothing(files: &[(PathBuf, Vec<u8>)]) -> Result<(), ClassifierError> {
    let staged: Vec<PathBuf> = files.iter().map(|(path, _)| sibling(path, "tmp")).collect();

    for (i, (_, bytes)) in files.iter().enumerate() {
        if let Err(e) = fs::write(&staged[i], bytes) {
            remove_quietly(&staged[..=i]);
            return Err(e.into());
        }
    }

    let mut swapped: Vec<Swap> = Vec::with_capacity(files.len());
    for ((path, _), tmp) in files.iter().zip(&staged) {
        match swap_in(tmp, path) {
            Ok(swap) => swapped.push(swap),
            Err(e) => {
                roll_back(&swapped);
                remove_quietly(&staged);
                return Err(e.into());
            }
        }
    }

    let backups: Vec<PathBuf> = swapped.into_iter().filter_map(|s| s.backup).collect();
    remove_quietly(&backups);
    Ok(())
}

/// A file renamed into place, and where its predecessor was parked
struct Swap {
    target: PathBuf,
    backup: Option<PathBuf>,
}

fn swap_in(tmp: &Path, target: &Path) -> io::Result<Swap> {
    let backup = match fs::symlink_metadata(target) {
        Ok(meta) if meta.is_file() => {
            let backup = sibling(target, "bak");
            fs::rename(target, &backup)?;
            Some(backup)
        }
        _ => None,
    };

    if let Err(e) = fs::rename(tmp, target) {
        if let Some(backup) = &backup {
            restore(backup, target);
        }
        return Err(e);
    }
    Ok(Swap {
        target: target.to_path_buf(),
        backup,
    })
}

/// Undo completed swaps, newest first
fn roll_back(swapped: &[Swap]) {
    for swap in swapped.iter().rev() {
        match &swap.backup {
            Some(backup) => restore(backup, &swap.target),
            None => remove_quietly(std::slice::from_ref(&swap.target)),
        }
    }
}

fn restore(backup: &Path, target: &Path) {
    if let Err(e) = fs::rename(backup, target) {
        tracing::error!("Could not restore {} from {}: {}", target.display(), backup.display(), e);
    }
}

fn remove_quietly(paths: &[PathBuf]) {
    for path in paths {
        let _ = fs::remove_file(path);
    }
}

fn sibling(path: &Path, extension: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(extension);
    path.with_file_name(name)
}

fn feature_names_text(names: &[String]) -> String {
    let mut text = names.join("\n");
    text.push('\n');
    text
}

/// SHA-256 over the canonical (sorted-key) JSON form of a payload
fn checksum(value: &serde_json::Value) -> Result<String, ClassifierError> {
    let bytes = serde_json::to_vec(value).map_err(|e| ClassifierError::Training(e.to_string()))?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}

// ============================================================================
// LOAD
// ============================================================================

pub fn load_model(dir: &Path) -> Result<Stamped<ModelArtifact>, ClassifierError> {
    load_envelope(&dir.join(MODEL_FILE), KIND_MODEL)
}

pub fn load_scaler(dir: &Path) -> Result<Stamped<ScalerState>, ClassifierError> {
    let stamped: Stamped<ScalerState> = load_envelope(&dir.join(SCALER_FILE), KIND_SCALER)?;
    let state = &stamped.payload;
    if state.mean.len() != FEATURE_COUNT || state.std.len() != FEATURE_COUNT {
        return Err(ClassifierError::artifact(
            SCALER_FILE,
            format!("expected {} features, found {}", FEATURE_COUNT, state.mean.len()),
        ));
    }
    if state.std.iter().any(|s| !s.is_finite() || *s <= 0.0) {
        return Err(ClassifierError::artifact(SCALER_FILE, "non-positive standard deviation"));
    }
    Ok(stamped)
}

pub fn load_codec(dir: &Path) -> Result<Stamped<CodecState>, ClassifierError> {
    load_envelope(&dir.join(CODEC_FILE), KIND_CODEC)
}

pub fn load_feature_names(dir: &Path) -> Result<Vec<String>, ClassifierError> {
    let text = fs::read_to_string(dir.join(FEATURE_NAMES_FILE))
        .map_err(|e| ClassifierError::artifact(FEATURE_NAMES_FILE, e))?;
    let names: Vec<String> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect();
    if names.len() != FEATURE_COUNT {
        return Err(ClassifierError::artifact(
            FEATURE_NAMES_FILE,
            format!("expected {} names, found {}", FEATURE_COUNT, names.len()),
        ));
    }
    Ok(names)
}

fn load_envelope<T: DeserializeOwned>(path: &Path, expected_kind: &str) -> Result<Stamped<T>, ClassifierError> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());

    let bytes = fs::read(path).map_err(|e| ClassifierError::artifact(&name, e))?;
    let envelope: Envelope<serde_json::Value> =
        serde_json::from_slice(&bytes).map_err(|e| ClassifierError::artifact(&name, e))?;

    if envelope.kind != expected_kind {
        return Err(ClassifierError::artifact(
            &name,
            format!("expected a {} artifact, found {}", expected_kind, envelope.kind),
        ));
    }
    if envelope.format_version != FORMAT_VERSION {
        return Err(ClassifierError::artifact(
            &name,
            format!("unsupported format version {}", envelope.format_version),
        ));
    }
    if checksum(&envelope.payload)? != envelope.checksum {
        return Err(ClassifierError::artifact(&name, "checksum mismatch"));
    }

    let payload = serde_json::from_value(envelope.payload).map_err(|e| ClassifierError::artifact(&name, e))?;
    Ok(Stamped {
        run_id: envelope.run_id,
        created_at: envelope.created_at,
        payload,
    })
}
