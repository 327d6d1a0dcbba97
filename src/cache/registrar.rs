//! Registering validated catalogs in the cache
//!
//! Every check runs before anything touches the disk. The catalog is then
//! written to a staging file next to its target, the log is updated and
//! saved, and only then is the staging file renamed into place. A failure
//! at any step rolls the earlier steps back, so the log never points at a
//! file that was not written and no file is left without a log entry.

use crate::cache::log::{staging_path, CacheLogEntry, HaloTableCache};
use crate::cache::store::{has_canonical_extension, CatalogFile, CANONICAL_EXTENSION};
use crate::catalog::{CatalogValue, HaloCatalog};
use crate::error::{HalocatError, HalocatResult};
use chrono::Utc;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// File attributes written by the registrar itself
pub const RESERVED_ATTRS: &[&str] = &[
    "Lbox",
    "particle_mass",
    "redshift",
    "simname",
    "halo_finder",
    "version_name",
    "processing_notes",
    "fname",
    "time_of_catalog_production",
];

/// Everything needed to register one catalog
#[derive(Debug, Clone)]
pub struct CacheRequest {
    pub fname: PathBuf,
    pub simname: CatalogValue,
    pub halo_finder: CatalogValue,
    pub version_name: CatalogValue,
    pub processing_notes: CatalogValue,
    /// Replace an existing file and log entry at `fname`
    pub overwrite: bool,
    /// Also write the particle table, when the catalog has one
    pub store_ptcl_table: bool,
    pub extra_metadata: BTreeMap<String, CatalogValue>,
}

impl CacheRequest {
    pub fn new(
        fname: impl Into<PathBuf>,
        simname: impl Into<CatalogValue>,
        halo_finder: impl Into<CatalogValue>,
        version_name: impl Into<CatalogValue>,
        processing_notes: impl Into<CatalogValue>,
    ) -> Self {
        Self {
            fname: fname.into(),
            simname: simname.into(),
            halo_finder: halo_finder.into(),
            version_name: version_name.into(),
            processing_notes: processing_notes.into(),
            overwrite: false,
            store_ptcl_table: false,
            extra_metadata: BTreeMap::new(),
        }
    }

    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn store_ptcl_table(mut self, store: bool) -> Self {
        self.store_ptcl_table = store;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<CatalogValue>) -> Self {
        self.extra_metadata.insert(key.into(), value.into());
        self
    }
}

/// Identifying strings after conversion
struct Identity {
    simname: String,
    halo_finder: String,
    version_name: String,
    processing_notes: String,
}

impl HaloCatalog {
    /// Write the catalog to `request.fname` and record it in `cache`
    ///
    /// On success the new entry is also stored on the catalog and is
    /// available from [`HaloCatalog::log_entry`].
    pub fn add_to_cache(
        &mut self,
        cache: &mut HaloTableCache,
        request: CacheRequest,
    ) -> HalocatResult<CacheLogEntry> {
        check_target_path(&request.fname, request.overwrite)?;
        check_extension(&request.fname)?;
        let identity = identity_strings(&request)?;
        let extra = extra_metadata_strings(&request.extra_metadata)?;

        let entry = CacheLogEntry::new(
            identity.simname.clone(),
            identity.halo_finder.clone(),
            identity.version_name.clone(),
            self.redshift(),
            &request.fname,
        )?;

        if !request.overwrite && cache.entry_for_fname(&entry.fname).is_some() {
            return Err(HalocatError::FileExistsConflict(entry.fname));
        }

        let file = self.to_catalog_file(&identity, extra, &entry.fname, request.store_ptcl_table);
        commit(cache, &file, &entry, request.overwrite)?;

        info!("Registered halo catalog {}", entry);
        self.log_entry = Some(entry.clone());
        Ok(entry)
    }

    fn to_catalog_file(
        &self,
        identity: &Identity,
        extra: BTreeMap<String, String>,
        fname: &Path,
        store_ptcl_table: bool,
    ) -> CatalogFile {
        let mut attrs = BTreeMap::new();

        for (key, value) in self.metadata_entries() {
            match value.to_display_string() {
                Ok(s) => {
                    attrs.insert(key.to_string(), s);
                }
                Err(reason) => warn!("Skipping catalog metadata ``{}``: {}", key, reason),
            }
        }
        attrs.extend(extra);

        let fixed = [
            ("Lbox", format!("{:?}", self.lbox())),
            ("particle_mass", format!("{:?}", self.particle_mass())),
            ("redshift", format!("{:?}", self.redshift())),
            ("simname", identity.simname.clone()),
            ("halo_finder", identity.halo_finder.clone()),
            ("version_name", identity.version_name.clone()),
            ("processing_notes", identity.processing_notes.clone()),
            ("fname", fname.display().to_string()),
            ("time_of_catalog_production", Utc::now().to_rfc3339()),
        ];
        for (key, value) in fixed {
            attrs.insert(key.to_string(), value);
        }

        let ptcl_table = match (store_ptcl_table, self.ptcl_table()) {
            (true, Some(table)) => Some(table.clone()),
            (true, None) => {
                warn!("Particle table requested but the catalog has none");
                None
            }
            (false, _) => None,
        };

        CatalogFile::new(attrs, self.halo_table().clone(), ptcl_table)
    }
}

fn check_target_path(fname: &Path, overwrite: bool) -> HalocatResult<()> {
    let parent = fname.parent().filter(|p| !p.as_os_str().is_empty());
    match parent {
        Some(dir) if dir.is_dir() => {}
        Some(dir) => return Err(HalocatError::PathNotFound(dir.to_path_buf())),
        None => return Err(HalocatError::PathNotFound(PathBuf::new())),
    }

    if fname.exists() && !overwrite {
        return Err(HalocatError::FileExistsConflict(fname.to_path_buf()));
    }
    Ok(())
}

fn check_extension(fname: &Path) -> HalocatResult<()> {
    if has_canonical_extension(fname) {
        Ok(())
    } else {
        Err(HalocatError::InvalidFileExtension {
            path: fname.to_path_buf(),
            expected: CANONICAL_EXTENSION.to_string(),
        })
    }
}

fn identity_strings(request: &CacheRequest) -> HalocatResult<Identity> {
    let convert = |field: &str, value: &CatalogValue| {
        value.to_display_string().map_err(|reason| {
            HalocatError::MetadataType(format!(
                "The simname, halo_finder, version_name and processing_notes \
                 must all be strings. ``{field}`` could not be converted: {reason}"
            ))
        })
    };

    Ok(Identity {
        simname: convert("simname", &request.simname)?,
        halo_finder: convert("halo_finder", &request.halo_finder)?,
        version_name: convert("version_name", &request.version_name)?,
        processing_notes: convert("processing_notes", &request.processing_notes)?,
    })
}

fn extra_metadata_strings(
    extra: &BTreeMap<String, CatalogValue>,
) -> HalocatResult<BTreeMap<String, String>> {
    extra
        .iter()
        .map(|(key, value)| {
            if RESERVED_ATTRS.contains(&key.as_str()) {
                return Err(HalocatError::MetadataType(format!(
                    "The ``{key}`` keyword is reserved for the catalog's own attributes."
                )));
            }
            let s = value.to_display_string().map_err(|reason| {
                HalocatError::MetadataType(format!(
                    "The ``{key}`` keyword is not representable as a string. ({reason})"
                ))
            })?;
            Ok((key.clone(), s))
        })
        .collect()
}

fn commit(
    cache: &mut HaloTableCache,
    file: &CatalogFile,
    entry: &CacheLogEntry,
    overwrite: bool,
) -> HalocatResult<()> {
    let staging = staging_path(&entry.fname);
    if let Err(e) = cache.store().write(&staging, file) {
        discard(&staging);
        return Err(e);
    }

    let replaced = match cache.add_entry(entry.clone(), overwrite) {
        Ok(replaced) => replaced,
        Err(e) => {
            discard(&staging);
            return Err(e);
        }
    };

    if let Err(e) = cache.save() {
        cache.revert_add(entry, replaced);
        discard(&staging);
        return Err(e);
    }

    if let Err(source) = fs::rename(&staging, &entry.fname) {
        cache.revert_add(entry, replaced);
        if let Err(e) = cache.save() {
            warn!("Failed to roll back cache log after aborted write: {}", e);
        }
        discard(&staging);
        return Err(HalocatError::io(
            format!("moving catalog into place at {}", entry.fname.display()),
            source,
        ));
    }

    debug!("Committed {} to {}", entry.fname.display(), cache.log_path().display());
    Ok(())
}

fn discard(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!("Failed to remove staging file {}: {}", path.display(), e);
        }
    }
}
