//! The on-disk TAS file format (§6): magic `MINZTAS\x00`, a small fixed
//! header, then a JSON or bincode-encoded payload, optionally gzipped.

use std::io::{Read, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::tas::event::Event;

pub const MAGIC: [u8; 8] = *b"MINZTAS\0";
pub const VERSION: u16 = 1;

/// Which on-disk encoding a file uses (§6: `format` byte, 0/1/2).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum StorageFormat {
    Json = 0,
    Binary = 1,
    GzippedBinary = 2,
}

impl StorageFormat {
    fn from_byte(b: u8) -> CoreResult<Self> {
        match b {
            0 => Ok(StorageFormat::Json),
            1 => Ok(StorageFormat::Binary),
            2 => Ok(StorageFormat::GzippedBinary),
            other => Err(CoreError::TasFormat(format!("unknown storage format byte {other}"))),
        }
    }
}

/// The Z80 register file captured by a snapshot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterFile {
    pub af: u16,
    pub bc: u16,
    pub de: u16,
    pub hl: u16,
    pub af_shadow: u16,
    pub bc_shadow: u16,
    pub de_shadow: u16,
    pub hl_shadow: u16,
    pub ix: u16,
    pub iy: u16,
    pub sp: u16,
    pub pc: u16,
}

/// A full-state snapshot, the "snapshot" half of the hybrid compression
/// strategy: cheaper than replaying every event from cycle zero, taken
/// periodically by the recorder rather than after every event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub cycle: u64,
    pub registers: RegisterFile,
    pub flags: u8,
    #[serde(with = "serde_bytes_vec")]
    pub memory: Vec<u8>,
}

/// Whole memory snapshots are 64 KiB; `serde`'s default `Vec<u8>` impl
/// serializes element-by-element in JSON, which is correct but wasteful to
/// write out by hand here, so this submodule just forwards to the derived
/// behavior explicitly rather than depending on the `serde_bytes` crate for
/// one field.
mod serde_bytes_vec {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        bytes.to_vec().serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        Vec::<u8>::deserialize(d)
    }
}

/// The full recorded session: metadata, the event log, and the snapshots
/// taken along the way.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TasFile {
    pub version: u16,
    pub recorded_at: DateTime<Utc>,
    pub metadata: std::collections::BTreeMap<String, String>,
    pub events: Vec<Event>,
    pub snapshots: Vec<Snapshot>,
}

impl TasFile {
    pub fn new() -> Self {
        TasFile {
            version: VERSION,
            recorded_at: Utc::now(),
            metadata: std::collections::BTreeMap::new(),
            events: Vec::new(),
            snapshots: Vec::new(),
        }
    }

    /// Rotate-XOR checksum over event cycles and SMC patch addresses (§6).
    pub fn checksum(&self) -> u32 {
        let mut acc: u32 = 0;
        for e in &self.events {
            acc = acc.rotate_left(3) ^ (e.cycle as u32);
            if let crate::tas::event::EventKind::SmcPatch { addr, .. } = e.kind {
                acc = acc.rotate_left(5) ^ (addr as u32);
            }
        }
        acc
    }

    pub fn save(&self, path: impl AsRef<Path>, format: StorageFormat) -> CoreResult<()> {
        let mut file = std::fs::File::create(path)?;
        file.write_all(&MAGIC)?;
        file.write_all(&self.version.to_le_bytes())?;
        file.write_all(&[format as u8])?;
        file.write_all(&[0u8])?; // flags, reserved
        let timestamp = self.recorded_at.to_rfc3339();
        let ts_bytes = timestamp.as_bytes();
        file.write_all(&(ts_bytes.len() as u16).to_le_bytes())?;
        file.write_all(ts_bytes)?;
        file.write_all(&self.checksum().to_le_bytes())?;

        match format {
            StorageFormat::Json => {
                let json = serde_json::to_vec_pretty(self)?;
                file.write_all(&json)?;
            }
            StorageFormat::Binary => {
                let payload = bincode::serialize(self)?;
                file.write_all(&payload)?;
            }
            StorageFormat::GzippedBinary => {
                let payload = bincode::serialize(self)?;
                let mut encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
                encoder.write_all(&payload)?;
                encoder.finish()?;
            }
        }
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> CoreResult<Self> {
        let mut file = std::fs::File::open(path)?;
        let mut magic = [0u8; 8];
        file.read_exact(&mut magic)?;
        if magic != MAGIC {
            return Err(CoreError::TasFormat("magic mismatch".to_string()));
        }
        let mut version_bytes = [0u8; 2];
        file.read_exact(&mut version_bytes)?;
        let version = u16::from_le_bytes(version_bytes);
        if version != VERSION {
            return Err(CoreError::TasFormat(format!(
                "unsupported version {version}, expected {VERSION}"
            )));
        }
        let mut format_byte = [0u8; 1];
        file.read_exact(&mut format_byte)?;
        let format = StorageFormat::from_byte(format_byte[0])?;
        let mut flags = [0u8; 1];
        file.read_exact(&mut flags)?;
        let mut ts_len_bytes = [0u8; 2];
        file.read_exact(&mut ts_len_bytes)?;
        let ts_len = u16::from_le_bytes(ts_len_bytes) as usize;
        let mut ts_bytes = vec![0u8; ts_len];
        file.read_exact(&mut ts_bytes)?;
        let mut checksum_bytes = [0u8; 4];
        file.read_exact(&mut checksum_bytes)?;
        let stored_checksum = u32::from_le_bytes(checksum_bytes);

        let mut rest = Vec::new();
        file.read_to_end(&mut rest)?;

        let parsed: TasFile = match format {
            StorageFormat::Json => serde_json::from_slice(&rest)?,
            StorageFormat::Binary => bincode::deserialize(&rest)?,
            StorageFormat::GzippedBinary => {
                let mut decoder = flate2::read::GzDecoder::new(rest.as_slice());
                let mut decoded = Vec::new();
                decoder.read_to_end(&mut decoded)?;
                bincode::deserialize(&decoded)?
            }
        };

        if parsed.checksum() != stored_checksum {
            return Err(CoreError::TasFormat("checksum mismatch".to_string()));
        }
        Ok(parsed)
    }
}

impl Default for TasFile {
    fn default() -> Self {
        TasFile::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tas::event::EventKind;

    fn sample() -> TasFile {
        let mut f = TasFile::new();
        f.events.push(Event::new(10, EventKind::MemoryWrite { addr: 0x8000, value: 1 }));
        f.events.push(Event::new(20, EventKind::SmcPatch { addr: 0x8010, old: 0, new: 5 }));
        f.snapshots.push(Snapshot {
            cycle: 0,
            registers: RegisterFile::default(),
            flags: 0,
            memory: vec![0u8; 64],
        });
        f
    }

    #[test]
    fn json_round_trips() {
        let dir = std::env::temp_dir().join(format!("minzc-tas-json-{}", std::process::id()));
        let file = sample();
        file.save(&dir, StorageFormat::Json).unwrap();
        let loaded = TasFile::load(&dir).unwrap();
        assert_eq!(loaded.events, file.events);
        let _ = std::fs::remove_file(&dir);
    }

    #[test]
    fn binary_round_trips() {
        let dir = std::env::temp_dir().join(format!("minzc-tas-bin-{}", std::process::id()));
        let file = sample();
        file.save(&dir, StorageFormat::Binary).unwrap();
        let loaded = TasFile::load(&dir).unwrap();
        assert_eq!(loaded.events, file.events);
        assert_eq!(loaded.snapshots, file.snapshots);
        let _ = std::fs::remove_file(&dir);
    }

    #[test]
    fn gzipped_binary_round_trips() {
        let dir = std::env::temp_dir().join(format!("minzc-tas-gz-{}", std::process::id()));
        let file = sample();
        file.save(&dir, StorageFormat::GzippedBinary).unwrap();
        let loaded = TasFile::load(&dir).unwrap();
        assert_eq!(loaded.events, file.events);
        let _ = std::fs::remove_file(&dir);
    }

    #[test]
    fn magic_mismatch_is_rejected() {
        let dir = std::env::temp_dir().join(format!("minzc-tas-badmagic-{}", std::process::id()));
        std::fs::write(&dir, b"NOTMINZTAS").unwrap();
        assert!(TasFile::load(&dir).is_err());
        let _ = std::fs::remove_file(&dir);
    }
}
