//! On-disk catalog files
//!
//! A catalog file holds the halo table, an optional particle table, and a
//! flat set of string attributes describing where the catalog came from.
//! [`ColumnarFileStore`] writes these as a self-describing JSON document.

use crate::catalog::Table;
use crate::error::{HalocatError, HalocatResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::debug;

/// Extension every cached catalog file must carry
pub const CANONICAL_EXTENSION: &str = ".hdf5";

/// Format tag written into every catalog file
pub const FORMAT_NAME: &str = "halocat-columnar";

/// Current catalog file layout version
pub const FORMAT_VERSION: u32 = 1;

/// Whether `path` ends with the canonical catalog extension
pub fn has_canonical_extension(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext == CANONICAL_EXTENSION.trim_start_matches('.'))
}

/// Contents of a catalog file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogFile {
    pub format: String,
    pub version: u32,
    pub attrs: BTreeMap<String, String>,
    pub halo_table: Table,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ptcl_table: Option<Table>,
}

impl CatalogFile {
    pub fn new(
        attrs: BTreeMap<String, String>,
        halo_table: Table,
        ptcl_table: Option<Table>,
    ) -> Self {
        Self {
            format: FORMAT_NAME.to_string(),
            version: FORMAT_VERSION,
            attrs,
            halo_table,
            ptcl_table,
        }
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).map(String::as_str)
    }
}

/// Storage backend for catalog files
pub trait TableStore: fmt::Debug {
    /// Write `file` to `path`, replacing anything already there
    fn write(&self, path: &Path, file: &CatalogFile) -> HalocatResult<()>;

    /// Read a full catalog file
    fn read(&self, path: &Path) -> HalocatResult<CatalogFile>;

    /// Read only the file-level attributes
    fn read_attrs(&self, path: &Path) -> HalocatResult<BTreeMap<String, String>> {
        Ok(self.read(path)?.attrs)
    }
}

/// JSON-backed columnar catalog files
#[derive(Debug, Clone, Copy, Default)]
pub struct ColumnarFileStore;

impl TableStore for ColumnarFileStore {
    fn write(&self, path: &Path, file: &CatalogFile) -> HalocatResult<()> {
        let handle = File::create(path)
            .map_err(|e| HalocatError::io(format!("creating catalog file {}", path.display()), e))?;
        let mut writer = BufWriter::new(handle);
        serde_json::to_writer(&mut writer, file)?;
        writer
            .flush()
            .map_err(|e| HalocatError::io(format!("writing catalog file {}", path.display()), e))?;

        debug!(
            "Wrote {} halos ({} columns) to {}",
            file.halo_table.num_rows(),
            file.halo_table.num_columns(),
            path.display()
        );
        Ok(())
    }

    fn read(&self, path: &Path) -> HalocatResult<CatalogFile> {
        let content = fs::read_to_string(path)
            .map_err(|e| HalocatError::io(format!("reading catalog file {}", path.display()), e))?;

        let file: CatalogFile =
            serde_json::from_str(&content).map_err(|e| HalocatError::CatalogFileInvalid {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        if file.format != FORMAT_NAME {
            return Err(HalocatError::CatalogFileInvalid {
                path: path.to_path_buf(),
                reason: format!("unknown format {:?}", file.format),
            });
        }
        if file.version > FORMAT_VERSION {
            return Err(HalocatError::CatalogFileInvalid {
                path: path.to_path_buf(),
                reason: format!(
                    "format version {} is newer than supported version {}",
                    file.version, FORMAT_VERSION
                ),
            });
        }
        Ok(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Column;
    use tempfile::TempDir;

    fn sample() -> CatalogFile {
        let table = Table::from_columns([
            ("halo_id", Column::Int(vec![1, 2, 3])),
            ("halo_mass", Column::Float(vec![1e12, 2e12, 3e12])),
        ])
        .unwrap();
        let mut attrs = BTreeMap::new();
        attrs.insert("simname".to_string(), "bolshoi".to_string());
        CatalogFile::new(attrs, table, None)
    }

    #[test]
    fn extension_check() {
        assert!(has_canonical_extension(Path::new("/a/abc.hdf5")));
        assert!(!has_canonical_extension(Path::new("/a/abc")));
        assert!(!has_canonical_extension(Path::new("/a/abc.hdf5.bak")));
        assert!(!has_canonical_extension(Path::new("/a/abc.h5")));
    }

    #[test]
    fn write_then_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cat.hdf5");
        let store = ColumnarFileStore;

        store.write(&path, &sample()).unwrap();
        let read = store.read(&path).unwrap();
        assert_eq!(read, sample());
        assert_eq!(read.attr("simname"), Some("bolshoi"));
        assert!(read.ptcl_table.is_none());
    }

    #[test]
    fn rejects_foreign_files() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cat.hdf5");
        fs::write(&path, "not json").unwrap();

        let err = ColumnarFileStore.read(&path).unwrap_err();
        assert!(matches!(err, HalocatError::CatalogFileInvalid { .. }));
    }

    #[test]
    fn rejects_unknown_format_tag() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cat.hdf5");
        let mut file = sample();
        file.format = "something-else".to_string();
        ColumnarFileStore.write(&path, &file).unwrap();

        let err = ColumnarFileStore.read(&path).unwrap_err();
        assert!(err.to_string().contains("unknown format"));
    }
}
