//! Persistent cache log of registered halo catalogs
//!
//! The log is a tab-separated text file with one row per catalog:
//!
//! ```text
//! # simname	halo_finder	version_name	redshift	fname
//! bolshoi	rockstar	halotools_v0p4	0.0000	/data/halocats/bolshoi.hdf5
//! ```
//!
//! It is loaded fully into a [`HaloTableCache`] handle, mutated in memory,
//! and rewritten on [`HaloTableCache::save`].

use crate::cache::store::{has_canonical_extension, ColumnarFileStore, TableStore};
use crate::config::{Config, ConfigManager};
use crate::error::{HalocatError, HalocatResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};

const LOG_HEADER: &str = "# simname\thalo_finder\tversion_name\tredshift\tfname";

/// Default tolerance when matching entries by redshift
pub const DEFAULT_DZ_TOL: f64 = 0.05;

/// One row of the cache log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheLogEntry {
    pub simname: String,
    pub halo_finder: String,
    pub version_name: String,
    pub redshift: f64,
    /// Absolute path of the catalog file
    pub fname: PathBuf,
}

impl CacheLogEntry {
    /// Create an entry, making `fname` absolute
    pub fn new(
        simname: impl Into<String>,
        halo_finder: impl Into<String>,
        version_name: impl Into<String>,
        redshift: f64,
        fname: impl AsRef<Path>,
    ) -> HalocatResult<Self> {
        let fname = fname.as_ref();
        let absolute = std::path::absolute(fname)
            .map_err(|e| HalocatError::io(format!("resolving path {}", fname.display()), e))?;
        let absolute = normalize_lexically(&absolute);

        let entry = Self {
            simname: simname.into(),
            halo_finder: halo_finder.into(),
            version_name: version_name.into(),
            redshift,
            fname: absolute,
        };
        entry.validate()?;
        Ok(entry)
    }

    /// Redshift as written to the log; entries compare on this form
    pub fn redshift_string(&self) -> String {
        format!("{:.4}", self.redshift)
    }

    /// Check that every field can be written as a single log row
    pub fn validate(&self) -> HalocatResult<()> {
        let fname = self.fname.to_str().ok_or_else(|| {
            HalocatError::InvalidCacheLogEntry(format!(
                "fname {} is not valid UTF-8",
                self.fname.display()
            ))
        })?;

        let fields = [
            ("simname", self.simname.as_str()),
            ("halo_finder", self.halo_finder.as_str()),
            ("version_name", self.version_name.as_str()),
            ("fname", fname),
        ];
        for (name, value) in fields {
            if value.trim().is_empty() {
                return Err(HalocatError::InvalidCacheLogEntry(format!(
                    "``{name}`` must not be blank"
                )));
            }
            if value.contains(['\t', '\n', '\r']) {
                return Err(HalocatError::InvalidCacheLogEntry(format!(
                    "``{name}`` must not contain tabs or line breaks: {value:?}"
                )));
            }
        }
        if !self.redshift.is_finite() {
            return Err(HalocatError::InvalidCacheLogEntry(format!(
                "redshift must be finite, got {}",
                self.redshift
            )));
        }
        Ok(())
    }

    fn to_log_line(&self) -> String {
        format!(
            "{}\t{}\t{}\t{}\t{}",
            self.simname,
            self.halo_finder,
            self.version_name,
            self.redshift_string(),
            self.fname.display()
        )
    }

    fn from_log_line(line: &str) -> Result<Self, String> {
        let fields: Vec<&str> = line.split('\t').collect();
        let &[simname, halo_finder, version_name, redshift, fname] = fields.as_slice() else {
            return Err(format!("expected 5 tab-separated fields, found {}", fields.len()));
        };
        let redshift: f64 = redshift
            .trim()
            .parse()
            .map_err(|e| format!("invalid redshift {redshift:?}: {e}"))?;

        let entry = Self {
            simname: simname.to_string(),
            halo_finder: halo_finder.to_string(),
            version_name: version_name.to_string(),
            redshift,
            fname: normalize_lexically(Path::new(fname)),
        };
        if !entry.fname.is_absolute() {
            return Err(format!("fname {fname} is not an absolute path"));
        }
        entry.validate().map_err(|e| e.to_string())?;
        Ok(entry)
    }
}

impl PartialEq for CacheLogEntry {
    fn eq(&self, other: &Self) -> bool {
        self.simname == other.simname
            && self.halo_finder == other.halo_finder
            && self.version_name == other.version_name
            && self.redshift_string() == other.redshift_string()
            && self.fname == other.fname
    }
}

impl Eq for CacheLogEntry {}

impl fmt::Display for CacheLogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "(simname={}, halo_finder={}, version_name={}, redshift={}, fname={})",
            self.simname,
            self.halo_finder,
            self.version_name,
            self.redshift_string(),
            self.fname.display()
        )
    }
}

/// Query over log entries; unset fields match anything
#[derive(Debug, Clone)]
pub struct EntryFilter {
    pub simname: Option<String>,
    pub halo_finder: Option<String>,
    pub version_name: Option<String>,
    pub redshift: Option<f64>,
    pub dz_tol: f64,
}

impl Default for EntryFilter {
    fn default() -> Self {
        Self {
            simname: None,
            halo_finder: None,
            version_name: None,
            redshift: None,
            dz_tol: DEFAULT_DZ_TOL,
        }
    }
}

impl EntryFilter {
    pub fn simname(mut self, simname: impl Into<String>) -> Self {
        self.simname = Some(simname.into());
        self
    }

    pub fn halo_finder(mut self, halo_finder: impl Into<String>) -> Self {
        self.halo_finder = Some(halo_finder.into());
        self
    }

    pub fn version_name(mut self, version_name: impl Into<String>) -> Self {
        self.version_name = Some(version_name.into());
        self
    }

    pub fn redshift(mut self, redshift: f64) -> Self {
        self.redshift = Some(redshift);
        self
    }

    pub fn dz_tol(mut self, dz_tol: f64) -> Self {
        self.dz_tol = dz_tol;
        self
    }

    pub fn matches(&self, entry: &CacheLogEntry) -> bool {
        let field_ok = |want: &Option<String>, have: &str| want.as_deref().is_none_or(|w| w == have);

        field_ok(&self.simname, &entry.simname)
            && field_ok(&self.halo_finder, &entry.halo_finder)
            && field_ok(&self.version_name, &entry.version_name)
            && self
                .redshift
                .is_none_or(|z| (z - entry.redshift).abs() <= self.dz_tol)
    }
}

/// Options for [`HaloTableCache::remove_entry`]
#[derive(Debug, Clone, Copy)]
pub struct RemoveOptions {
    /// Fail with `EntryNotFound` when nothing matches
    pub raise_if_missing: bool,
    /// Rewrite the log file immediately
    pub update_log: bool,
    /// Delete the catalog file the entry points to
    pub delete_file: bool,
}

impl Default for RemoveOptions {
    fn default() -> Self {
        Self {
            raise_if_missing: false,
            update_log: true,
            delete_file: false,
        }
    }
}

/// Problems found when auditing an entry against its catalog file
#[derive(Debug, Clone, PartialEq)]
pub enum EntryIssue {
    FileMissing,
    WrongExtension,
    Unreadable(String),
    AttributeMismatch {
        attr: &'static str,
        expected: String,
        found: Option<String>,
    },
}

impl fmt::Display for EntryIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FileMissing => write!(f, "catalog file does not exist"),
            Self::WrongExtension => write!(f, "catalog file does not have an .hdf5 extension"),
            Self::Unreadable(reason) => write!(f, "catalog file cannot be read: {reason}"),
            Self::AttributeMismatch {
                attr,
                expected,
                found: Some(found),
            } => write!(f, "attribute {attr} is {found:?}, log says {expected:?}"),
            Self::AttributeMismatch {
                attr,
                expected,
                found: None,
            } => write!(f, "attribute {attr} is missing, log says {expected:?}"),
        }
    }
}

/// Handle on the cache log, with an explicit load/save lifecycle
#[derive(Debug)]
pub struct HaloTableCache {
    log_path: PathBuf,
    entries: Vec<CacheLogEntry>,
    store: Box<dyn TableStore>,
}

impl HaloTableCache {
    /// Open the log at `log_path`; a missing file is an empty log
    pub fn open(log_path: impl Into<PathBuf>) -> HalocatResult<Self> {
        Self::open_with_store(log_path, Box::new(ColumnarFileStore))
    }

    /// Open the log backed by a custom table store
    pub fn open_with_store(
        log_path: impl Into<PathBuf>,
        store: Box<dyn TableStore>,
    ) -> HalocatResult<Self> {
        let log_path = log_path.into();
        let entries = read_log(&log_path)?;
        debug!(
            "Loaded {} cache log entries from {}",
            entries.len(),
            log_path.display()
        );
        Ok(Self {
            log_path,
            entries,
            store,
        })
    }

    /// Open the log at the location named by the configuration
    pub fn open_default(config: &Config) -> HalocatResult<Self> {
        Self::open(ConfigManager::cache_log_path(config))
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    pub fn store(&self) -> &dyn TableStore {
        self.store.as_ref()
    }

    pub fn entries(&self) -> &[CacheLogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, entry: &CacheLogEntry) -> bool {
        self.entries.contains(entry)
    }

    /// The entry registered for `fname`, if any
    pub fn entry_for_fname(&self, fname: &Path) -> Option<&CacheLogEntry> {
        self.entries.iter().find(|e| e.fname == fname)
    }

    pub fn matching_entries(&self, filter: &EntryFilter) -> Vec<&CacheLogEntry> {
        self.entries.iter().filter(|e| filter.matches(e)).collect()
    }

    /// Append an entry in memory
    ///
    /// An existing entry for the same fname is replaced when `overwrite` is
    /// set and is a conflict otherwise. Returns the replaced entry.
    pub fn add_entry(
        &mut self,
        entry: CacheLogEntry,
        overwrite: bool,
    ) -> HalocatResult<Option<CacheLogEntry>> {
        entry.validate()?;

        let existing = self.entries.iter().position(|e| e.fname == entry.fname);
        let replaced = match existing {
            Some(_) if !overwrite => {
                return Err(HalocatError::FileExistsConflict(entry.fname.clone()));
            }
            Some(index) => Some(self.entries.remove(index)),
            None => None,
        };

        debug!("Adding cache log entry {}", entry);
        self.entries.push(entry);
        Ok(replaced)
    }

    /// Undo an `add_entry` that could not be committed
    pub(crate) fn revert_add(&mut self, added: &CacheLogEntry, replaced: Option<CacheLogEntry>) {
        self.entries.retain(|e| e != added);
        if let Some(previous) = replaced {
            self.entries.push(previous);
        }
    }

    /// Remove the entry equal to `key`
    pub fn remove_entry(
        &mut self,
        key: &CacheLogEntry,
        options: RemoveOptions,
    ) -> HalocatResult<Option<CacheLogEntry>> {
        let Some(index) = self.entries.iter().position(|e| e == key) else {
            if options.raise_if_missing {
                return Err(HalocatError::EntryNotFound(key.to_string()));
            }
            debug!("No cache log entry matches {}", key);
            return Ok(None);
        };

        let removed = self.entries.remove(index);

        if options.update_log {
            if let Err(e) = self.save() {
                self.entries.insert(index, removed);
                return Err(e);
            }
        }

        if options.delete_file {
            match fs::remove_file(&removed.fname) {
                Ok(()) => info!("Deleted catalog file {}", removed.fname.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    warn!("Catalog file {} was already gone", removed.fname.display());
                }
                Err(e) => {
                    // the log no longer lists the file, so put the entry back
                    self.entries.insert(index, removed.clone());
                    if options.update_log {
                        if let Err(save_err) = self.save() {
                            warn!("Failed to restore cache log entry {}: {}", removed, save_err);
                        }
                    }
                    return Err(HalocatError::io(
                        format!("deleting catalog file {}", removed.fname.display()),
                        e,
                    ));
                }
            }
        }

        info!("Removed cache log entry {}", removed);
        Ok(Some(removed))
    }

    /// Rewrite the log file from the in-memory entries
    pub fn save(&self) -> HalocatResult<()> {
        if let Some(parent) = self.log_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                HalocatError::io(format!("creating cache directory {}", parent.display()), e)
            })?;
        }

        let mut content = String::from(LOG_HEADER);
        content.push('\n');
        for entry in &self.entries {
            content.push_str(&entry.to_log_line());
            content.push('\n');
        }

        let staging = staging_path(&self.log_path);
        fs::write(&staging, content)
            .map_err(|e| HalocatError::io(format!("writing cache log {}", staging.display()), e))?;
        fs::rename(&staging, &self.log_path).map_err(|e| {
            let _ = fs::remove_file(&staging);
            HalocatError::io(format!("replacing cache log {}", self.log_path.display()), e)
        })?;

        debug!(
            "Saved {} cache log entries to {}",
            self.entries.len(),
            self.log_path.display()
        );
        Ok(())
    }

    /// Audit one entry against the catalog file it points to
    pub fn verify_entry(&self, entry: &CacheLogEntry) -> Vec<EntryIssue> {
        let mut issues = Vec::new();
        if !has_canonical_extension(&entry.fname) {
            issues.push(EntryIssue::WrongExtension);
        }
        if !entry.fname.is_file() {
            issues.push(EntryIssue::FileMissing);
            return issues;
        }

        let attrs = match self.store.read_attrs(&entry.fname) {
            Ok(attrs) => attrs,
            Err(e) => {
                issues.push(EntryIssue::Unreadable(e.to_string()));
                return issues;
            }
        };

        let expected = [
            ("simname", entry.simname.as_str()),
            ("halo_finder", entry.halo_finder.as_str()),
            ("version_name", entry.version_name.as_str()),
        ];
        for (attr, want) in expected {
            let found = attrs.get(attr);
            if found.map(String::as_str) != Some(want) {
                issues.push(EntryIssue::AttributeMismatch {
                    attr,
                    expected: want.to_string(),
                    found: found.cloned(),
                });
            }
        }

        let found_z = attrs.get("redshift");
        let z_matches = found_z
            .and_then(|z| z.parse::<f64>().ok())
            .is_some_and(|z| format!("{z:.4}") == entry.redshift_string());
        if !z_matches {
            issues.push(EntryIssue::AttributeMismatch {
                attr: "redshift",
                expected: entry.redshift_string(),
                found: found_z.cloned(),
            });
        }

        issues
    }

    /// Audit every entry, returning only the ones with problems
    pub fn verify_all(&self) -> Vec<(&CacheLogEntry, Vec<EntryIssue>)> {
        self.entries
            .iter()
            .map(|e| (e, self.verify_entry(e)))
            .filter(|(_, issues)| !issues.is_empty())
            .collect()
    }
}

/// Resolve `.` and `..` without touching the filesystem
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }
    normalized
}

/// Sibling path used while a file is being rewritten
pub(crate) fn staging_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.partial"))
}

fn read_log(path: &Path) -> HalocatResult<Vec<CacheLogEntry>> {
    if !path.exists() {
        debug!("Cache log {} not found, starting empty", path.display());
        return Ok(Vec::new());
    }

    let content = fs::read_to_string(path)
        .map_err(|e| HalocatError::io(format!("reading cache log {}", path.display()), e))?;

    let mut entries = Vec::new();
    for (index, line) in content.lines().enumerate() {
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }
        let entry = CacheLogEntry::from_log_line(line).map_err(|reason| {
            HalocatError::CacheLogCorrupt {
                path: path.to_path_buf(),
                line: index + 1,
                reason,
            }
        })?;
        entries.push(entry);
    }
    Ok(entries)
}
