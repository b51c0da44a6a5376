//! Kernel source loading.

use crate::error::{RenderError, Result};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

pub const DEFAULT_KERNEL_PATH: &str = "raytracer.ocl";

/// 16 KiB.
pub const MAX_SOURCE_SIZE: usize = 16 * 1024;

/// Kernel program text read from disk.
#[derive(Debug, Clone)]
pub struct KernelSource {
    path: PathBuf,
    bytes: Vec<u8>,
}

impl KernelSource {
    /// Reads at most `max_len` bytes from `path`.
    ///
    /// A file longer than `max_len` is rejected, never truncated.
    pub fn load(path: impl AsRef<Path>, max_len: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|source| RenderError::KernelSource {
            path: path.clone(),
            source,
        })?;

        // One extra byte tells us whether the file went past the cap.
        let mut bytes = Vec::with_capacity(max_len.min(MAX_SOURCE_SIZE) + 1);
        file.take((max_len as u64).saturating_add(1))
            .read_to_end(&mut bytes)
            .map_err(|source| RenderError::KernelSource {
                path: path.clone(),
                source,
            })?;

        if bytes.len() > max_len {
            return Err(RenderError::KernelSourceTooLarge {
                path,
                limit: max_len,
            });
        }

        log::debug!("Read {} bytes of kernel source from {}", bytes.len(), path.display());
        Ok(Self { path, bytes })
    }

    pub fn from_text(path: impl Into<PathBuf>, text: &str) -> Self {
        Self {
            path: path.into(),
            bytes: text.as_bytes().to_vec(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The program text as handed to the compiler.
    pub fn text(&self) -> Result<&str> {
        std::str::from_utf8(&self.bytes).map_err(|_| RenderError::SourceEncoding {
            path: self.path.clone(),
        })
    }
}

/// Parses a size string (e.g., "16K", "1M", "4096") into bytes.
pub fn parse_size_string(size_str: &str) -> std::result::Result<usize, String> {
    let size_str = size_str.trim().to_uppercase();
    let (num_part, suffix) = size_str.split_at(
        size_str
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(size_str.len()),
    );

    let num: usize = num_part
        .parse()
        .map_err(|_| format!("Invalid size number: '{}'", num_part))?;

    let scale = match suffix {
        "" | "B" => 1,
        "K" | "KB" => 1024,
        "M" | "MB" => 1024 * 1024,
        _ => return Err(format!("Invalid size suffix: '{}'. Use K/KB or M/MB.", suffix)),
    };
    num.checked_mul(scale)
        .ok_or_else(|| format!("Size '{}' is too large", size_str))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(contents: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn loads_whole_file() {
        let file = write_temp(b"__kernel void vector_add() {}");
        let source = KernelSource::load(file.path(), MAX_SOURCE_SIZE).unwrap();
        assert_eq!(source.len(), 29);
        assert_eq!(source.text().unwrap(), "__kernel void vector_add() {}");
        assert_eq!(source.path(), file.path());
    }

    #[test]
    fn file_at_limit_is_accepted() {
        let file = write_temp(&[b' '; 64]);
        let source = KernelSource::load(file.path(), 64).unwrap();
        assert_eq!(source.len(), 64);
    }

    #[test]
    fn file_over_limit_is_rejected() {
        let file = write_temp(&[b' '; 65]);
        match KernelSource::load(file.path(), 64) {
            Err(RenderError::KernelSourceTooLarge { limit, .. }) => assert_eq!(limit, 64),
            other => panic!("expected KernelSourceTooLarge, got {:?}", other),
        }
    }

    #[test]
    fn unbounded_limit_reads_whole_file() {
        let file = write_temp(b"x");
        let source = KernelSource::load(file.path(), usize::MAX).unwrap();
        assert_eq!(source.len(), 1);
    }

    #[test]
    fn empty_file_is_accepted() {
        let file = write_temp(b"");
        let source = KernelSource::load(file.path(), MAX_SOURCE_SIZE).unwrap();
        assert!(source.is_empty());
    }

    #[test]
    fn missing_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("raytracer.ocl");
        match KernelSource::load(&path, MAX_SOURCE_SIZE) {
            Err(RenderError::KernelSource { path: p, .. }) => assert_eq!(p, path),
            other => panic!("expected KernelSource error, got {:?}", other),
        }
    }

    #[test]
    fn invalid_utf8_is_reported() {
        let file = write_temp(&[0xff, 0xfe, 0x00]);
        let source = KernelSource::load(file.path(), MAX_SOURCE_SIZE).unwrap();
        assert!(matches!(source.text(), Err(RenderError::SourceEncoding { .. })));
    }

    #[test]
    fn size_suffixes() {
        assert_eq!(parse_size_string("4096"), Ok(4096));
        assert_eq!(parse_size_string("16K"), Ok(16 * 1024));
        assert_eq!(parse_size_string("16kb"), Ok(16 * 1024));
        assert_eq!(parse_size_string("1M"), Ok(1024 * 1024));
        assert!(parse_size_string("12Q").is_err());
        assert!(parse_size_string("K").is_err());
    }
}
