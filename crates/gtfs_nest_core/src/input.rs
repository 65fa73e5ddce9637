use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use zip::result::ZipError;
use zip::ZipArchive;

use crate::csv_reader::{read_csv_from_reader, CsvParseError, CsvTable};

#[derive(Debug, thiserror::Error)]
pub enum GtfsInputError {
    #[error("input path does not exist: {0}")]
    MissingPath(PathBuf),
    #[error("input is neither a directory nor a zip file: {0}")]
    NotAFile(PathBuf),
    #[error("input is not a valid zip archive: {0}")]
    InvalidZip(PathBuf),
    #[error("missing required file {0}")]
    MissingFile(String),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read {file} from zip archive: {source}")]
    ZipFile {
        file: String,
        #[source]
        source: ZipError,
    },
    #[error(transparent)]
    Csv(#[from] CsvParseError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GtfsInputSource {
    Directory(PathBuf),
    Zip {
        path: PathBuf,
        /// Folder inside the archive holding the tables, empty for the root.
        prefix: String,
    },
}

#[derive(Debug, Clone)]
pub struct GtfsInput {
    source: GtfsInputSource,
}

impl GtfsInput {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, GtfsInputError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(GtfsInputError::MissingPath(path.to_path_buf()));
        }
        if path.is_dir() {
            return Ok(Self {
                source: GtfsInputSource::Directory(path.to_path_buf()),
            });
        }
        if !path.is_file() {
            return Err(GtfsInputError::NotAFile(path.to_path_buf()));
        }

        let file = File::open(path).map_err(|source| GtfsInputError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let archive = ZipArchive::new(BufReader::new(file))
            .map_err(|_| GtfsInputError::InvalidZip(path.to_path_buf()))?;
        let prefix = table_prefix(archive.file_names());
        Ok(Self {
            source: GtfsInputSource::Zip {
                path: path.to_path_buf(),
                prefix,
            },
        })
    }

    pub fn source(&self) -> &GtfsInputSource {
        &self.source
    }

    pub fn path(&self) -> &Path {
        match &self.source {
            GtfsInputSource::Directory(path) => path,
            GtfsInputSource::Zip { path, .. } => path,
        }
    }

    pub fn reader(&self) -> GtfsInputReader<'_> {
        GtfsInputReader { input: self }
    }
}

/// Tables are usually at the archive root, but some publishers wrap them in a folder.
fn table_prefix<'a>(names: impl Iterator<Item = &'a str>) -> String {
    let mut prefix = None;
    for name in names {
        if name.starts_with("__MACOSX/") {
            continue;
        }
        let Some(dir) = name.strip_suffix(crate::feed::ROUTES_FILE) else {
            continue;
        };
        if dir.is_empty() {
            return String::new();
        }
        if dir.ends_with('/') && prefix.is_none() {
            prefix = Some(dir.to_string());
        }
    }
    prefix.unwrap_or_default()
}

/// Upper bound on the buffer reserved from a zip entry's declared size.
const MAX_PREALLOCATION: u64 = 64 * 1024 * 1024;

fn initial_capacity(declared_size: u64) -> usize {
    declared_size.min(MAX_PREALLOCATION) as usize
}

pub struct GtfsInputReader<'a> {
    input: &'a GtfsInput,
}

impl GtfsInputReader<'_> {
    /// Raw bytes of one table, `None` when the file is absent.
    pub fn read_optional_file(&self, file_name: &str) -> Result<Option<Vec<u8>>, GtfsInputError> {
        match &self.input.source {
            GtfsInputSource::Directory(dir) => {
                let path = dir.join(file_name);
                if !path.is_file() {
                    return Ok(None);
                }
                std::fs::read(&path)
                    .map(Some)
                    .map_err(|source| GtfsInputError::Io { path, source })
            }
            GtfsInputSource::Zip { path, prefix } => {
                let file = File::open(path).map_err(|source| GtfsInputError::Io {
                    path: path.clone(),
                    source,
                })?;
                let mut archive = ZipArchive::new(BufReader::new(file))
                    .map_err(|_| GtfsInputError::InvalidZip(path.clone()))?;
                let entry_name = format!("{prefix}{file_name}");
                let mut entry = match archive.by_name(&entry_name) {
                    Ok(entry) => entry,
                    Err(ZipError::FileNotFound) => return Ok(None),
                    Err(source) => {
                        return Err(GtfsInputError::ZipFile {
                            file: file_name.to_string(),
                            source,
                        })
                    }
                };
                let mut data = Vec::with_capacity(initial_capacity(entry.size()));
                entry
                    .read_to_end(&mut data)
                    .map_err(|source| GtfsInputError::Io {
                        path: path.join(&entry_name),
                        source,
                    })?;
                Ok(Some(data))
            }
        }
    }

    pub fn read_optional_csv<T: DeserializeOwned>(
        &self,
        file_name: &str,
        required_columns: &[&str],
    ) -> Result<Option<CsvTable<T>>, GtfsInputError> {
        let Some(data) = self.read_optional_file(file_name)? else {
            return Ok(None);
        };
        let table = read_csv_from_reader(data.as_slice(), file_name, required_columns)?;
        Ok(Some(table))
    }

    pub fn read_required_csv<T: DeserializeOwned>(
        &self,
        file_name: &str,
        required_columns: &[&str],
    ) -> Result<CsvTable<T>, GtfsInputError> {
        self.read_optional_csv(file_name, required_columns)?
            .ok_or_else(|| GtfsInputError::MissingFile(file_name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_tables_at_archive_root() {
        let names = ["agency.txt", "routes.txt", "trips.txt"];
        assert_eq!(table_prefix(names.into_iter()), "");
    }

    #[test]
    fn finds_tables_in_nested_folder() {
        let names = [
            "__MACOSX/feed/routes.txt",
            "feed/",
            "feed/routes.txt",
            "feed/trips.txt",
        ];
        assert_eq!(table_prefix(names.into_iter()), "feed/");
    }

    #[test]
    fn declared_entry_size_is_capped() {
        assert_eq!(initial_capacity(1024), 1024);
        assert_eq!(initial_capacity(u64::MAX), MAX_PREALLOCATION as usize);
    }

    #[test]
    fn reads_tables_from_nested_zip_folder() {
        use std::io::Write;
        use std::time::{SystemTime, UNIX_EPOCH};
        use zip::write::FileOptions;
        use zip::ZipWriter;

        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time")
            .as_nanos();
        let path = std::env::temp_dir().join(format!("gtfs_nested_{}_{}.zip", std::process::id(), nanos));
        let mut writer = ZipWriter::new(File::create(&path).expect("create zip"));
        writer
            .start_file("feed/routes.txt", FileOptions::default())
            .expect("start file");
        writer.write_all(b"route_id\nR1\n").expect("write entry");
        writer.finish().expect("finish zip");

        let input = GtfsInput::from_path(&path).expect("input");
        assert_eq!(
            input.source(),
            &GtfsInputSource::Zip {
                path: path.clone(),
                prefix: "feed/".to_string(),
            }
        );
        let reader = input.reader();
        let data = reader.read_optional_file("routes.txt").expect("read");
        assert_eq!(data.as_deref(), Some(&b"route_id\nR1\n"[..]));
        assert!(reader.read_optional_file("shapes.txt").expect("read").is_none());

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn rejects_missing_path() {
        let err = GtfsInput::from_path("/definitely/not/here").unwrap_err();
        assert!(matches!(err, GtfsInputError::MissingPath(_)));
    }
}
