//! File-backed recording storage.
//!
//! Layout inside the store directory:
//! ```text
//! recording.meta.json   - schema version, tick count, tuning, payload digest
//! recording.cbor.zst    - CBOR+zstd compressed recording
//! ```

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use bhop_netcode::{CodecError, from_cbor, to_cbor};
use bhop_tuning::TuningSet;

use crate::recording::{Recording, ReplayReport};

/// Current recording schema version.
const RECORDING_SCHEMA_VERSION: u32 = 1;

const META_FILE: &str = "recording.meta.json";
const PAYLOAD_FILE: &str = "recording.cbor.zst";
const ZSTD_LEVEL: i32 = 3;

/// Errors from file-backed recording operations.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("integrity check failed: expected {expected}, got {actual}")]
    IntegrityMismatch { expected: String, actual: String },
    #[error("schema version mismatch: file has v{file_version}, expected v{expected_version}")]
    SchemaMismatch {
        file_version: u32,
        expected_version: u32,
    },
    #[error("tick count mismatch: meta says {meta}, payload has {payload}")]
    TickCountMismatch { meta: usize, payload: usize },
    #[error("recording has no inputs")]
    Empty,
}

/// Metadata stored in recording.meta.json.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingMeta {
    pub schema_version: u32,
    pub tick_count: usize,
    pub tick_rate: u32,
    pub tuning: TuningSet,
    pub final_hash: u64,
    /// SHA-256 of the compressed payload.
    pub sha256: String,
}

/// A directory holding one recording.
pub struct RecordingStore {
    root: PathBuf,
}

impl RecordingStore {
    /// Open or create a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, RecordError> {
        let root = path.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write `recording`, replacing whatever the store held.
    pub fn save(&self, recording: &Recording) -> Result<RecordingMeta, RecordError> {
        if recording.is_empty() {
            return Err(RecordError::Empty);
        }
        let compressed = zstd::encode_all(to_cbor(recording)?.as_slice(), ZSTD_LEVEL)?;

        let meta = RecordingMeta {
            schema_version: RECORDING_SCHEMA_VERSION,
            tick_count: recording.len(),
            tick_rate: recording.tick_rate,
            tuning: recording.tuning,
            final_hash: recording.final_hash,
            sha256: digest(&compressed),
        };

        std::fs::write(self.root.join(PAYLOAD_FILE), &compressed)?;
        serde_json::to_writer_pretty(std::fs::File::create(self.root.join(META_FILE))?, &meta)?;
        info!(
            ticks = meta.tick_count,
            bytes = compressed.len(),
            path = %self.root.display(),
            "recording saved"
        );
        Ok(meta)
    }

    /// Read the metadata and check its schema version.
    pub fn meta(&self) -> Result<RecordingMeta, RecordError> {
        let meta: RecordingMeta =
            serde_json::from_reader(std::fs::File::open(self.root.join(META_FILE))?)?;
        if meta.schema_version != RECORDING_SCHEMA_VERSION {
            return Err(RecordError::SchemaMismatch {
                file_version: meta.schema_version,
                expected_version: RECORDING_SCHEMA_VERSION,
            });
        }
        Ok(meta)
    }

    /// Load the recording. Fails closed on any schema, digest or count mismatch.
    pub fn load(&self) -> Result<Recording, RecordError> {
        let meta = self.meta()?;
        let compressed = std::fs::read(self.root.join(PAYLOAD_FILE))?;

        let actual = digest(&compressed);
        if actual != meta.sha256 {
            return Err(RecordError::IntegrityMismatch {
                expected: meta.sha256,
                actual,
            });
        }

        let recording: Recording = from_cbor(&zstd::decode_all(compressed.as_slice())?)?;
        if recording.len() != meta.tick_count {
            return Err(RecordError::TickCountMismatch {
                meta: meta.tick_count,
                payload: recording.len(),
            });
        }
        debug!(ticks = recording.len(), "recording loaded");
        Ok(recording)
    }

    /// Load, replay and compare against the recorded final hash.
    pub fn verify(&self) -> Result<ReplayReport, RecordError> {
        let report = self.load()?.check();
        info!(%report, "recording verified");
        Ok(report)
    }
}

/// Lowercase hex SHA-256 of `bytes`.
fn digest(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bhop_arena::Arena;
    use bhop_input::{Command, ScriptedInput};
    use glam::Vec3;

    fn recording(ticks: usize) -> Recording {
        let mut input = ScriptedInput::new(Vec::new())
            .hold(Command::forward(), 20)
            .hold(Command::forward().with_jump(), 2)
            .hold(Command::default().with_strafe(1.0), 20);
        Recording::capture(
            TuningSet::default(),
            Arena::proving_ground(),
            Vec3::new(0.0, 0.9, 0.0),
            60,
            &mut input,
            ticks,
        )
    }

    #[test]
    fn save_then_load_round_trips() {
        let tmp = tempfile::tempdir().unwrap();
        let store = RecordingStore::open(tmp.path().join("run")).unwrap();
        let rec = recording(40);

        let meta = store.save(&rec).unwrap();
        assert_eq!(meta.tick_count, 40);
        assert_eq!(meta.schema_version, RECORDING_SCHEMA_VERSION);
        assert!(store.root().join(META_FILE).is_file());

        let loaded = store.load().unwrap();
        assert_eq!(loaded, rec);
    }

    #[test]
    fn verify_replays_to_the_same_hash() {
        let tmp = tempfile::tempdir().unwrap();
        let store = RecordingStore::open(tmp.path()).unwrap();
        store.save(&recording(40)).unwrap();
        let report = store.verify().unwrap();
        assert!(report.is_match(), "{report}");
    }

    #[test]
    fn empty_recording_is_refused() {
        let tmp = tempfile::tempdir().unwrap();
        let store = RecordingStore::open(tmp.path()).unwrap();
        assert!(matches!(store.save(&recording(0)), Err(RecordError::Empty)));
    }

    #[test]
    fn corrupted_payload_fails_closed() {
        let tmp = tempfile::tempdir().unwrap();
        let store = RecordingStore::open(tmp.path()).unwrap();
        store.save(&recording(30)).unwrap();

        let path = tmp.path().join(PAYLOAD_FILE);
        let mut data = std::fs::read(&path).unwrap();
        if let Some(byte) = data.last_mut() {
            *byte ^= 0xff;
        }
        std::fs::write(&path, &data).unwrap();

        assert!(matches!(
            store.load(),
            Err(RecordError::IntegrityMismatch { .. })
        ));
    }

    #[test]
    fn schema_mismatch_fails_closed() {
        let tmp = tempfile::tempdir().unwrap();
        let store = RecordingStore::open(tmp.path()).unwrap();
        let mut meta = store.save(&recording(10)).unwrap();

        meta.schema_version = RECORDING_SCHEMA_VERSION + 1;
        serde_json::to_writer_pretty(
            std::fs::File::create(tmp.path().join(META_FILE)).unwrap(),
            &meta,
        )
        .unwrap();

        match store.load() {
            Err(RecordError::SchemaMismatch {
                file_version,
                expected_version,
            }) => {
                assert_eq!(file_version, RECORDING_SCHEMA_VERSION + 1);
                assert_eq!(expected_version, RECORDING_SCHEMA_VERSION);
            }
            other => panic!("expected schema mismatch, got {other:?}"),
        }
    }

    #[test]
    fn digest_is_lowercase_hex() {
        assert_eq!(
            digest(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn undecodable_payload_is_a_codec_error() {
        let tmp = tempfile::tempdir().unwrap();
        let store = RecordingStore::open(tmp.path()).unwrap();
        let mut meta = store.save(&recording(10)).unwrap();

        let junk = zstd::encode_all(&[0xffu8, 0x00, 0x13][..], ZSTD_LEVEL).unwrap();
        std::fs::write(tmp.path().join(PAYLOAD_FILE), &junk).unwrap();
        meta.sha256 = digest(&junk);
        serde_json::to_writer_pretty(
            std::fs::File::create(tmp.path().join(META_FILE)).unwrap(),
            &meta,
        )
        .unwrap();

        assert!(matches!(store.load(), Err(RecordError::Codec(_))));
    }

    #[test]
    fn missing_store_is_an_io_error() {
        let tmp = tempfile::tempdir().unwrap();
        let store = RecordingStore::open(tmp.path().join("fresh")).unwrap();
        assert!(matches!(store.load(), Err(RecordError::Io(_))));
    }
}
