use std::collections::HashSet;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::ArchiveError;
use crate::sanitize::redact_path;

/// Result of a successful packaging run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackagedArchive {
    pub path: PathBuf,
    /// Entry names, in the order they were written.
    pub entries: Vec<String>,
    /// Inputs left out because they were missing or shadowed by an
    /// earlier input with the same file name.
    pub skipped: Vec<PathBuf>,
}

/// Bundles rendered posters into a single compressed archive.
///
/// Entries are stored flat under their base file name.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArchivePackager;

impl ArchivePackager {
    pub fn new() -> Self {
        Self
    }

    pub fn package(
        &self,
        inputs: &[PathBuf],
        destination: &Path,
    ) -> Result<PackagedArchive, ArchiveError> {
        let (included, mut skipped) = select_entries(inputs);

        if included.is_empty() {
            return Err(ArchiveError::NothingToPack {
                attempted: inputs.len(),
            });
        }

        if let Some(parent) = destination.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| ArchiveError::CreateDirectory {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
            }
        }

        // Inputs can disappear between selection and writing.
        let written = write_archive(&included, destination).and_then(|(entries, vanished)| {
            if entries.is_empty() {
                Err(ArchiveError::NothingToPack {
                    attempted: inputs.len(),
                })
            } else {
                Ok((entries, vanished))
            }
        });

        match written {
            Ok((entries, vanished)) => {
                skipped.extend(vanished);
                info!(
                    "Packaged {} file(s) into {} ({} skipped)",
                    entries.len(),
                    redact_path(destination),
                    skipped.len()
                );
                Ok(PackagedArchive {
                    path: destination.to_path_buf(),
                    entries,
                    skipped,
                })
            }
            Err(e) => {
                // Leave no truncated archive behind.
                if let Err(remove_err) = std::fs::remove_file(destination) {
                    if remove_err.kind() != io::ErrorKind::NotFound {
                        warn!(
                            "Failed to remove partial archive {}: {}",
                            redact_path(destination),
                            remove_err
                        );
                    }
                }
                Err(e)
            }
        }
    }
}

/// Splits inputs into (entry name, path) pairs to write and paths to skip.
fn select_entries(inputs: &[PathBuf]) -> (Vec<(String, PathBuf)>, Vec<PathBuf>) {
    let mut seen = HashSet::new();
    let mut included = Vec::new();
    let mut skipped = Vec::new();

    for input in inputs {
        let name = match input.file_name().and_then(|n| n.to_str()) {
            Some(name) => name.to_string(),
            None => {
                warn!("Skipping archive input without a usable file name");
                skipped.push(input.clone());
                continue;
            }
        };

        if !input.is_file() {
            warn!("Skipping missing archive input {}", name);
            skipped.push(input.clone());
            continue;
        }

        if !seen.insert(name.clone()) {
            warn!("Skipping duplicate archive entry {}", name);
            skipped.push(input.clone());
            continue;
        }

        included.push((name, input.clone()));
    }

    (included, skipped)
}

/// Writes the selected inputs and returns the entry names written along
/// with any inputs that were gone by the time they were opened.
fn write_archive(
    included: &[(String, PathBuf)],
    destination: &Path,
) -> Result<(Vec<String>, Vec<PathBuf>), ArchiveError> {
    let file = File::create(destination).map_err(|e| ArchiveError::WriteFile {
        path: destination.to_path_buf(),
        source: e,
    })?;

    let mut writer = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut entries = Vec::with_capacity(included.len());
    let mut vanished = Vec::new();

    for (name, path) in included {
        let source = match File::open(path) {
            Ok(source) => source,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!("Skipping archive input {} removed before it was read", name);
                vanished.push(path.clone());
                continue;
            }
            Err(e) => {
                return Err(ArchiveError::ReadFile {
                    path: path.clone(),
                    source: e,
                })
            }
        };

        writer.start_file(name.as_str(), options)?;
        io::copy(&mut BufReader::new(source), &mut writer).map_err(|e| {
            ArchiveError::WriteFile {
                path: destination.to_path_buf(),
                source: e,
            }
        })?;

        debug!("Added {} to archive", name);
        entries.push(name.clone());
    }

    writer.finish()?;
    Ok((entries, vanished))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::TempDir;

    fn write_file(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    fn read_entries(path: &Path) -> Vec<(String, Vec<u8>)> {
        let mut archive = zip::ZipArchive::new(File::open(path).unwrap()).unwrap();
        let mut out = Vec::new();
        for i in 0..archive.len() {
            let mut entry = archive.by_index(i).unwrap();
            let mut content = Vec::new();
            entry.read_to_end(&mut content).unwrap();
            out.push((entry.name().to_string(), content));
        }
        out
    }

    #[test]
    fn test_input_removed_after_selection_is_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let kept = write_file(temp_dir.path(), "paris_noir.png", b"noir");
        let gone = temp_dir.path().join("paris_ocean.png");
        let destination = temp_dir.path().join("paris_batch.zip");
        let included = vec![
            ("paris_noir.png".to_string(), kept),
            ("paris_ocean.png".to_string(), gone.clone()),
        ];

        let (entries, vanished) = write_archive(&included, &destination).unwrap();

        assert_eq!(entries, vec!["paris_noir.png"]);
        assert_eq!(vanished, vec![gone]);
        let archived = read_entries(&destination);
        assert_eq!(archived.len(), 1);
        assert_eq!(archived[0].0, "paris_noir.png");
    }

    #[test]
    fn test_all_inputs_removed_after_selection_writes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let destination = temp_dir.path().join("paris_batch.zip");
        let included = vec![(
            "paris_noir.png".to_string(),
            temp_dir.path().join("paris_noir.png"),
        )];

        let (entries, vanished) = write_archive(&included, &destination).unwrap();

        assert!(entries.is_empty());
        assert_eq!(vanished.len(), 1);
    }

    #[test]
    fn test_package_all_inputs() {
        let temp_dir = TempDir::new().unwrap();
        let a = write_file(temp_dir.path(), "paris_noir.png", b"noir");
        let b = write_file(temp_dir.path(), "paris_ocean.png", b"ocean");
        let destination = temp_dir.path().join("out").join("paris_batch.zip");

        let packaged = ArchivePackager::new()
            .package(&[a, b], &destination)
            .unwrap();

        assert_eq!(packaged.path, destination);
        assert_eq!(packaged.entries, vec!["paris_noir.png", "paris_ocean.png"]);
        assert!(packaged.skipped.is_empty());

        let entries = read_entries(&destination);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0], ("paris_noir.png".to_string(), b"noir".to_vec()));
        assert_eq!(entries[1], ("paris_ocean.png".to_string(), b"ocean".to_vec()));
    }

    #[test]
    fn test_missing_input_is_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let a = write_file(temp_dir.path(), "a.png", b"a");
        let missing = temp_dir.path().join("missing.png");
        let destination = temp_dir.path().join("bundle.zip");

        let packaged = ArchivePackager::new()
            .package(&[a, missing.clone()], &destination)
            .unwrap();

        assert_eq!(packaged.entries, vec!["a.png"]);
        assert_eq!(packaged.skipped, vec![missing]);
        assert_eq!(read_entries(&destination).len(), 1);
    }

    #[test]
    fn test_duplicate_base_names_keep_first() {
        let temp_dir = TempDir::new().unwrap();
        let first_dir = temp_dir.path().join("one");
        let second_dir = temp_dir.path().join("two");
        std::fs::create_dir_all(&first_dir).unwrap();
        std::fs::create_dir_all(&second_dir).unwrap();
        let first = write_file(&first_dir, "poster.png", b"first");
        let second = write_file(&second_dir, "poster.png", b"second");
        let destination = temp_dir.path().join("bundle.zip");

        let packaged = ArchivePackager::new()
            .package(&[first, second.clone()], &destination)
            .unwrap();

        assert_eq!(packaged.skipped, vec![second]);
        let entries = read_entries(&destination);
        assert_eq!(entries, vec![("poster.png".to_string(), b"first".to_vec())]);
    }

    #[test]
    fn test_nothing_to_pack_creates_no_file() {
        let temp_dir = TempDir::new().unwrap();
        let destination = temp_dir.path().join("bundle.zip");

        let result = ArchivePackager::new().package(
            &[temp_dir.path().join("gone.png")],
            &destination,
        );

        assert!(matches!(
            result,
            Err(ArchiveError::NothingToPack { attempted: 1 })
        ));
        assert!(!destination.exists());
    }

    #[test]
    fn test_empty_input_list() {
        let temp_dir = TempDir::new().unwrap();
        let destination = temp_dir.path().join("bundle.zip");

        let result = ArchivePackager::new().package(&[], &destination);

        assert!(matches!(
            result,
            Err(ArchiveError::NothingToPack { attempted: 0 })
        ));
    }
}
