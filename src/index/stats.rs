use crate::error::{IndexError, Result};
use crate::index::suffix_array::SuffixArrayReader;
use crate::index::suffix_array::types::{INDEX_VERSION, sidecar_path, sidecar_size};
use crate::index::types::IndexConfig;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// State of the sidecar next to a source, judged from its header alone
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SidecarStatus {
    Missing,
    /// Header and size agree with the source
    Ready,
    /// Built for a source of a different length
    Stale { indexed_len: u64 },
    Corrupt(String),
}

/// Summary of a source and its persisted index
#[derive(Debug, Clone)]
pub struct IndexInfo {
    pub source_path: PathBuf,
    pub source_len: u64,
    pub sidecar_path: PathBuf,
    pub sidecar_bytes: Option<u64>,
    pub sidecar_modified: Option<SystemTime>,
    pub status: SidecarStatus,
}

impl IndexInfo {
    /// Inspect `source` and its sidecar without loading the arrays
    pub fn gather(source: &Path, config: &IndexConfig) -> Result<Self> {
        let source = source
            .canonicalize()
            .map_err(|e| IndexError::io(source, e))?;
        let source_len = fs::metadata(&source)
            .map_err(|e| IndexError::io(&source, e))?
            .len();
        let sidecar = sidecar_path(&source, &config.sidecar_extension);

        let metadata = fs::metadata(&sidecar).ok();
        let sidecar_bytes = metadata.as_ref().map(|m| m.len());
        let sidecar_modified = metadata.as_ref().and_then(|m| m.modified().ok());

        let status = match SuffixArrayReader::read_header(&sidecar) {
            Ok(None) => SidecarStatus::Missing,
            Err(IndexError::PersistedIndexCorrupt { reason, .. }) => SidecarStatus::Corrupt(reason),
            Err(e) => return Err(e),
            Ok(Some(header)) if header.version != INDEX_VERSION => {
                SidecarStatus::Corrupt(format!("unsupported version {}", header.version))
            }
            Ok(Some(header)) if header.length < 0 => {
                SidecarStatus::Corrupt(format!("negative length {}", header.length))
            }
            Ok(Some(header)) if header.length as u64 != source_len => SidecarStatus::Stale {
                indexed_len: header.length as u64,
            },
            Ok(Some(header)) => {
                let expected = sidecar_size(header.length as usize);
                if sidecar_bytes == Some(expected) {
                    SidecarStatus::Ready
                } else {
                    SidecarStatus::Corrupt(format!(
                        "expected {} bytes, found {}",
                        expected,
                        sidecar_bytes.unwrap_or(0)
                    ))
                }
            }
        };

        Ok(Self {
            source_path: source,
            source_len,
            sidecar_path: sidecar,
            sidecar_bytes,
            sidecar_modified,
            status,
        })
    }
}

/// Display index information
pub fn print_info<W: Write>(out: &mut W, info: &IndexInfo) -> io::Result<()> {
    writeln!(out, "Index Information")?;
    writeln!(out, "=================")?;
    writeln!(out)?;
    writeln!(out, "Source:           {}", info.source_path.display())?;
    writeln!(out, "Source size:      {}", format_size(info.source_len))?;
    writeln!(out, "Sidecar:          {}", info.sidecar_path.display())?;

    let status = match &info.status {
        SidecarStatus::Missing => "not built".to_string(),
        SidecarStatus::Ready => "ready".to_string(),
        SidecarStatus::Stale { indexed_len } => {
            format!("stale (indexed {} bytes)", indexed_len)
        }
        SidecarStatus::Corrupt(reason) => format!("corrupt ({})", reason),
    };
    writeln!(out, "Status:           {}", status)?;

    if let Some(bytes) = info.sidecar_bytes {
        writeln!(out, "Sidecar size:     {}", format_size(bytes))?;
    }
    if let Some(modified) = info.sidecar_modified {
        writeln!(out, "Updated:          {}", format_age(modified))?;
    }

    Ok(())
}

/// Format byte size to human readable
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

/// Format how long ago `time` was
pub fn format_age(time: SystemTime) -> String {
    let secs = SystemTime::now()
        .duration_since(time)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    match secs {
        0..=59 => format!("{}s ago", secs),
        60..=3599 => format!("{}m ago", secs / 60),
        3600..=86_399 => format!("{}h ago", secs / 3600),
        _ => format!("{}d ago", secs / 86_400),
    }
}
