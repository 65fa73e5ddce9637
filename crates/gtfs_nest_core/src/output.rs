use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use gtfs_nest_model::RouteDocument;
use serde::Serialize;
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// A single JSON array of route documents.
    #[default]
    Json,
    /// One route document per line.
    JsonLines,
}

pub fn render_documents(
    routes: &[RouteDocument],
    format: OutputFormat,
    pretty: bool,
) -> Result<Vec<u8>, serde_json::Error> {
    match format {
        OutputFormat::Json => {
            let mut bytes = to_bytes(routes, pretty)?;
            bytes.push(b'\n');
            Ok(bytes)
        }
        OutputFormat::JsonLines => {
            let mut bytes = Vec::new();
            for route in routes {
                bytes.extend(serde_json::to_vec(route)?);
                bytes.push(b'\n');
            }
            Ok(bytes)
        }
    }
}

fn to_bytes<T: Serialize + ?Sized>(value: &T, pretty: bool) -> Result<Vec<u8>, serde_json::Error> {
    if pretty {
        serde_json::to_vec_pretty(value)
    } else {
        serde_json::to_vec(value)
    }
}

pub fn write_documents(
    path: &Path,
    routes: &[RouteDocument],
    format: OutputFormat,
    pretty: bool,
) -> Result<(), OutputError> {
    let bytes = render_documents(routes, format, pretty).map_err(|source| OutputError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| OutputError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let mut file = fs::File::create(path).map_err(|source| OutputError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    file.write_all(&bytes).map_err(|source| OutputError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    info!("wrote {} routes to {}", routes.len(), path.display());
    Ok(())
}

/// Dumps the document after each stage as `NN_<stage>.json`.
#[derive(Debug, Clone)]
pub struct CheckpointWriter {
    dir: PathBuf,
}

impl CheckpointWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, OutputError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| OutputError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    pub fn path_for(&self, index: usize, stage: &str) -> PathBuf {
        self.dir.join(format!("{index:02}_{stage}.json"))
    }

    pub fn write(
        &self,
        index: usize,
        stage: &str,
        routes: &[RouteDocument],
    ) -> Result<PathBuf, OutputError> {
        let path = self.path_for(index, stage);
        write_documents(&path, routes, OutputFormat::Json, true)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gtfs_nest_model::{FeedId, Route};
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_dir(prefix: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time")
            .as_nanos();
        std::env::temp_dir().join(format!("{}_{}_{}", prefix, std::process::id(), nanos))
    }

    fn documents() -> Vec<RouteDocument> {
        ["R1", "R2"]
            .into_iter()
            .map(|id| {
                RouteDocument::new(Route {
                    route_id: FeedId::from(id),
                    ..Default::default()
                })
            })
            .collect()
    }

    #[test]
    fn renders_json_array() {
        let bytes = render_documents(&documents(), OutputFormat::Json, false).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value.as_array().unwrap().len(), 2);
        assert_eq!(value[1]["route_id"], "R2");
    }

    #[test]
    fn renders_one_route_per_line() {
        let bytes = render_documents(&documents(), OutputFormat::JsonLines, true).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["route_id"], "R1");
    }

    #[test]
    fn checkpoint_files_are_numbered_by_stage() {
        let dir = temp_dir("gtfs_checkpoints");
        let writer = CheckpointWriter::new(&dir).expect("writer");
        let path = writer.write(3, "trip_joiner", &documents()).expect("write");
        assert_eq!(path.file_name().unwrap(), "03_trip_joiner.json");
        assert!(path.is_file());
        fs::remove_dir_all(&dir).ok();
    }
}
