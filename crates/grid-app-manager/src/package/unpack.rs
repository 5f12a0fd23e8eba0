//! Unpacking of downloaded package archives.

use grid_core::{GridError, Result};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{debug, info};

/// Archive formats a package can be published as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Zip,
    TarGz,
}

impl ArchiveKind {
    /// Detect the format from an asset file name.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.to_lowercase();
        if name.ends_with(".zip") {
            Some(Self::Zip)
        } else if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Some(Self::TarGz)
        } else {
            None
        }
    }
}

/// Unpack `archive_path` into `dest_dir`.
///
/// Entries that would escape `dest_dir` are skipped. When the archive wraps
/// everything in a single top-level directory, its contents are hoisted so
/// `dest_dir` holds the package files directly.
pub fn unpack_archive(archive_path: &Path, kind: ArchiveKind, dest_dir: &Path) -> Result<()> {
    info!("Unpacking {} into {}", archive_path.display(), dest_dir.display());
    std::fs::create_dir_all(dest_dir).map_err(|e| GridError::io_with_path(e, dest_dir))?;

    match kind {
        ArchiveKind::Zip => unpack_zip(archive_path, dest_dir)?,
        ArchiveKind::TarGz => unpack_tar_gz(archive_path, dest_dir)?,
    }
    hoist_single_root(dest_dir)
}

fn unpack_zip(archive_path: &Path, dest_dir: &Path) -> Result<()> {
    let file = File::open(archive_path).map_err(|e| GridError::io_with_path(e, archive_path))?;
    let mut archive = zip::ZipArchive::new(BufReader::new(file)).map_err(|e| {
        GridError::DownloadIncomplete {
            url: archive_path.display().to_string(),
            message: format!("Invalid zip archive: {}", e),
        }
    })?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(|e| GridError::DownloadIncomplete {
            url: archive_path.display().to_string(),
            message: format!("Failed to read zip entry {}: {}", i, e),
        })?;

        let outpath = match entry.enclosed_name() {
            Some(path) => dest_dir.join(path),
            None => {
                debug!("Skipping zip entry with unsafe path: {}", entry.name());
                continue;
            }
        };

        if entry.is_dir() {
            std::fs::create_dir_all(&outpath).map_err(|e| GridError::io_with_path(e, &outpath))?;
            continue;
        }
        if let Some(parent) = outpath.parent() {
            std::fs::create_dir_all(parent).map_err(|e| GridError::io_with_path(e, parent))?;
        }
        let mut outfile = File::create(&outpath).map_err(|e| GridError::io_with_path(e, &outpath))?;
        std::io::copy(&mut entry, &mut outfile).map_err(|e| GridError::io_with_path(e, &outpath))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = entry.unix_mode() {
                std::fs::set_permissions(&outpath, std::fs::Permissions::from_mode(mode)).ok();
            }
        }
    }
    Ok(())
}

fn unpack_tar_gz(archive_path: &Path, dest_dir: &Path) -> Result<()> {
    let file = File::open(archive_path).map_err(|e| GridError::io_with_path(e, archive_path))?;
    let decoder = flate2::read::GzDecoder::new(BufReader::new(file));
    let mut archive = tar::Archive::new(decoder);
    archive.unpack(dest_dir).map_err(|e| GridError::DownloadIncomplete {
        url: archive_path.display().to_string(),
        message: format!("Failed to extract tarball: {}", e),
    })
}

fn hoist_single_root(dest_dir: &Path) -> Result<()> {
    let entries: Vec<_> = std::fs::read_dir(dest_dir)
        .map_err(|e| GridError::io_with_path(e, dest_dir))?
        .filter_map(|e| e.ok())
        .collect();
    if entries.len() != 1 || !entries[0].path().is_dir() {
        return Ok(());
    }

    // Move the wrapper aside first; it may contain an entry with its own name.
    let wrapper = entries[0].path();
    let root = dest_dir.join(".grid-unpack-root");
    std::fs::rename(&wrapper, &root).map_err(|e| GridError::io_with_path(e, &wrapper))?;
    debug!("Hoisting contents of {}", wrapper.display());
    for child in std::fs::read_dir(&root).map_err(|e| GridError::io_with_path(e, &root))? {
        let child = child.map_err(|e| GridError::io_with_path(e, &root))?;
        let target = dest_dir.join(child.file_name());
        std::fs::rename(child.path(), &target).map_err(|e| GridError::io_with_path(e, &target))?;
    }
    std::fs::remove_dir(&root).map_err(|e| GridError::io_with_path(e, &root))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_tar_gz(path: &Path, files: &[(&str, &str)]) {
        let file = File::create(path).unwrap();
        let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
        let mut builder = tar::Builder::new(encoder);
        for (name, body) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(body.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, name, body.as_bytes()).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap();
    }

    fn write_zip(path: &Path, files: &[(&str, &str)]) {
        let file = File::create(path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default();
        for (name, body) in files {
            writer.start_file(*name, options).unwrap();
            writer.write_all(body.as_bytes()).unwrap();
        }
        writer.finish().unwrap();
    }

    #[test]
    fn test_archive_kind() {
        assert_eq!(ArchiveKind::from_name("grid-ui.ZIP"), Some(ArchiveKind::Zip));
        assert_eq!(ArchiveKind::from_name("parity.tar.gz"), Some(ArchiveKind::TarGz));
        assert_eq!(ArchiveKind::from_name("parity.tgz"), Some(ArchiveKind::TarGz));
        assert_eq!(ArchiveKind::from_name("parity"), None);
    }

    #[test]
    fn test_unpack_tar_gz_hoists_root() {
        let temp_dir = TempDir::new().unwrap();
        let archive = temp_dir.path().join("grid-ui.tar.gz");
        write_tar_gz(
            &archive,
            &[("grid-ui/index.html", "<html/>"), ("grid-ui/js/app.js", "1")],
        );

        let dest = temp_dir.path().join("out");
        unpack_archive(&archive, ArchiveKind::TarGz, &dest).unwrap();
        assert_eq!(std::fs::read_to_string(dest.join("index.html")).unwrap(), "<html/>");
        assert!(dest.join("js").join("app.js").exists());
        assert!(!dest.join("grid-ui").exists());
    }

    #[test]
    fn test_unpack_zip_flat() {
        let temp_dir = TempDir::new().unwrap();
        let archive = temp_dir.path().join("grid-ui.zip");
        write_zip(&archive, &[("index.html", "<html/>"), ("main.js", "x")]);

        let dest = temp_dir.path().join("out");
        unpack_archive(&archive, ArchiveKind::Zip, &dest).unwrap();
        assert!(dest.join("index.html").exists());
        assert!(dest.join("main.js").exists());
    }

    #[test]
    fn test_corrupt_archive_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let archive = temp_dir.path().join("broken.zip");
        std::fs::write(&archive, b"not a zip").unwrap();
        let result = unpack_archive(&archive, ArchiveKind::Zip, &temp_dir.path().join("out"));
        assert!(matches!(result, Err(GridError::DownloadIncomplete { .. })));
    }
}
