//! File I/O for C++ sources: UTF-8 reads with a memory map for large
//! translation units, and atomic replacement on write.

use anyhow::{Context, Result, bail};
use memmap2::Mmap;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

/// Files above this size are mapped instead of copied
const MMAP_THRESHOLD: u64 = 1024 * 1024;

/// Text of a header or implementation file
pub enum FileContent {
    Mapped(Mmap),
    Buffered(String),
}

impl AsRef<str> for FileContent {
    fn as_ref(&self) -> &str {
        match self {
            // Validated in read_file_smart
            FileContent::Mapped(mmap) => std::str::from_utf8(mmap).unwrap_or_default(),
            FileContent::Buffered(s) => s.as_str(),
        }
    }
}

pub fn read_file_smart<P: AsRef<Path>>(path: P) -> Result<FileContent> {
    let path = path.as_ref();
    let len = fs::metadata(path)
        .with_context(|| format!("cannot stat {}", path.display()))?
        .len();

    let content = if len > MMAP_THRESHOLD {
        let file = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;

        // Safety: read-only mapping; the file is not modified while mapped
        let mmap = unsafe { Mmap::map(&file) }
            .with_context(|| format!("cannot map {}", path.display()))?;
        FileContent::Mapped(mmap)
    } else {
        let bytes = fs::read(path).with_context(|| format!("cannot read {}", path.display()))?;
        match String::from_utf8(bytes) {
            Ok(text) => FileContent::Buffered(text),
            Err(e) => bail!(
                "{} is not valid UTF-8 (byte {})",
                path.display(),
                e.utf8_error().valid_up_to()
            ),
        }
    };

    if let FileContent::Mapped(mmap) = &content
        && let Err(e) = std::str::from_utf8(mmap)
    {
        bail!("{} is not valid UTF-8 (byte {})", path.display(), e.valid_up_to());
    }

    Ok(content)
}

/// Atomic write: same-directory temp file, fsync, then rename over `path`
pub fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    // Keep the original permissions when replacing an existing file
    let perms = fs::metadata(path).map(|m| m.permissions()).ok();

    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;

    tmp.write_all(data)
        .with_context(|| format!("Failed to write temp file for {}", path.display()))?;
    tmp.as_file().sync_all()?;

    if let Some(perms) = perms {
        fs::set_permissions(tmp.path(), perms).context("set temp permissions")?;
    }

    tmp.persist(path)
        .with_context(|| format!("Failed to replace {}", path.display()))?;

    // fsync parent dir for durability on Unix
    #[cfg(unix)]
    {
        if let Ok(parent) = File::open(dir) {
            let _ = parent.sync_all();
        }
    }

    Ok(())
}
