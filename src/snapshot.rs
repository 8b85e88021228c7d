use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::model::SystemState;

/// On-disk persistence collaborator for the scheduling engine.
///
/// The engine itself is persistence-agnostic: it emits and accepts a plain
/// `SystemState` record. This store keeps that record in a single framed
/// file: `[u32: len][bincode: SystemState][u32: crc32]`.
/// - `len` is the byte length of the bincode payload (not including the CRC).
/// - Writes go to a temp file, are fsynced, then atomically renamed over the
///   target, so a crash mid-save leaves the previous snapshot intact.
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Return the snapshot file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Durably persist `state`, replacing any previous snapshot.
    pub fn save(&self, state: &SystemState) -> io::Result<()> {
        let payload = bincode::serialize(state)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let len = payload.len() as u32;
        let crc = crc32fast::hash(&payload);

        let tmp_path = self.path.with_extension("snap.tmp");
        let file = File::create(&tmp_path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(&len.to_le_bytes())?;
        writer.write_all(&payload)?;
        writer.write_all(&crc.to_le_bytes())?;
        writer.flush()?;
        writer.get_ref().sync_all()?;

        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    /// Load the last saved state. A missing file is the empty state; a
    /// truncated or corrupt frame is an `InvalidData` error (there is no
    /// valid prefix to fall back to).
    pub fn load(&self) -> io::Result<SystemState> {
        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Ok(SystemState::default());
            }
            Err(e) => return Err(e),
        };
        let mut reader = BufReader::new(file);

        let mut len_buf = [0u8; 4];
        reader.read_exact(&mut len_buf).map_err(truncated)?;
        let len = u32::from_le_bytes(len_buf) as usize;

        let mut payload = vec![0u8; len];
        reader.read_exact(&mut payload).map_err(truncated)?;

        let mut crc_buf = [0u8; 4];
        reader.read_exact(&mut crc_buf).map_err(truncated)?;
        let stored_crc = u32::from_le_bytes(crc_buf);
        let computed_crc = crc32fast::hash(&payload);

        if stored_crc != computed_crc {
            tracing::warn!(path = %self.path.display(), "snapshot CRC mismatch");
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "snapshot CRC mismatch",
            ));
        }

        bincode::deserialize(&payload)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}

fn truncated(e: io::Error) -> io::Error {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        io::Error::new(io::ErrorKind::InvalidData, "snapshot truncated")
    } else {
        e
    }
}
