//! User-supplied halo catalogs
//!
//! A [`HaloCatalog`] is built from a name to value mapping and only exists
//! once every structural and physical check has passed:
//!
//! - `Lbox` and `particle_mass` are positive numbers
//! - `redshift` is a float
//! - `halo_id` (unique integers), a mass-like column, and `halo_x`,
//!   `halo_y`, `halo_z` are present with identical lengths
//! - every halo position lies in `[0, Lbox)`
//! - an optional particle table has `x`, `y`, `z` and enough rows
//!
//! Anything else the caller passes is kept as metadata.

pub mod validate;
pub mod value;

pub use validate::{HALO_PREFIX, MIN_NUM_PTCLS};
pub use value::{CatalogArgs, CatalogValue, Column, DisplayValue, RecordArray, Table};

use crate::cache::CacheLogEntry;
use crate::error::HalocatResult;
use std::collections::BTreeMap;
use tracing::info;

/// A validated halo catalog
#[derive(Debug, Clone)]
pub struct HaloCatalog {
    lbox: f64,
    particle_mass: f64,
    redshift: f64,
    halo_table: Table,
    ptcl_table: Option<Table>,
    metadata: BTreeMap<String, CatalogValue>,
    warnings: Vec<String>,
    pub(crate) log_entry: Option<CacheLogEntry>,
}

impl HaloCatalog {
    /// Validate `args` and build the catalog
    pub fn new(args: CatalogArgs) -> HalocatResult<Self> {
        let parts = validate::validate(args.into_inner())?;

        info!(
            "Loaded halo catalog with {} halos and {} metadata entries",
            parts.halo_table.num_rows(),
            parts.metadata.len()
        );

        Ok(Self {
            lbox: parts.lbox,
            particle_mass: parts.particle_mass,
            redshift: parts.redshift,
            halo_table: parts.halo_table,
            ptcl_table: parts.ptcl_table,
            metadata: parts.metadata,
            warnings: parts.warnings,
            log_entry: None,
        })
    }

    /// Side length of the periodic simulation box
    pub fn lbox(&self) -> f64 {
        self.lbox
    }

    /// Mass resolution of the simulation
    pub fn particle_mass(&self) -> f64 {
        self.particle_mass
    }

    pub fn redshift(&self) -> f64 {
        self.redshift
    }

    /// Number of halos in the catalog
    pub fn num_halos(&self) -> usize {
        self.halo_table.num_rows()
    }

    pub fn halo_table(&self) -> &Table {
        &self.halo_table
    }

    /// A single halo column by name
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.halo_table.column(name)
    }

    /// The particle table, present only when one was supplied
    pub fn ptcl_table(&self) -> Option<&Table> {
        self.ptcl_table.as_ref()
    }

    pub fn metadata(&self, name: &str) -> Option<&CatalogValue> {
        self.metadata.get(name)
    }

    pub fn metadata_entries(&self) -> impl Iterator<Item = (&str, &CatalogValue)> {
        self.metadata.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Attach metadata after construction
    pub fn set_metadata(&mut self, name: impl Into<String>, value: impl Into<CatalogValue>) {
        self.metadata.insert(name.into(), value.into());
    }

    /// Non-fatal warnings raised while classifying the input
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// The cache log entry created by the last successful registration
    pub fn log_entry(&self) -> Option<&CacheLogEntry> {
        self.log_entry.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HalocatError;
    use std::sync::Arc;

    const NUM_HALOS: usize = 100;
    const LBOX: f64 = 100.0;

    fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
        let step = (stop - start) / (n - 1) as f64;
        (0..n).map(|i| start + step * i as f64).collect()
    }

    /// Positions span [0, 99] so they fit a box of 200 but not of 20
    fn good_halo_args() -> CatalogArgs {
        let positions = linspace(0.0, LBOX - 1.0, NUM_HALOS);
        let masses: Vec<f64> = linspace(10.0, 15.0, NUM_HALOS)
            .into_iter()
            .map(|e| 10f64.powf(e))
            .collect();
        CatalogArgs::new()
            .with("halo_x", positions.clone())
            .with("halo_y", positions.clone())
            .with("halo_z", positions)
            .with("halo_id", (0..NUM_HALOS as i64).collect::<Vec<_>>())
            .with("halo_mass", masses)
    }

    fn good_args() -> CatalogArgs {
        good_halo_args()
            .with("Lbox", 200)
            .with("particle_mass", 100)
            .with("redshift", 0.0)
    }

    fn ptcl_table(n: usize, axes: &[&str]) -> Table {
        Table::from_columns(axes.iter().map(|a| (*a, vec![0.0; n]))).unwrap()
    }

    #[test]
    fn successful_load() {
        let halocat = HaloCatalog::new(good_args()).unwrap();
        assert_eq!(halocat.lbox(), 200.0);
        assert_eq!(halocat.particle_mass(), 100.0);
        assert_eq!(halocat.redshift(), 0.0);
        assert_eq!(halocat.num_halos(), NUM_HALOS);
        assert!(halocat.warnings().is_empty());
        assert!(halocat.log_entry().is_none());
    }

    #[test]
    fn particle_mass_required() {
        let mut args = good_args();
        args.remove("particle_mass");
        let err = HaloCatalog::new(args).unwrap_err();
        assert!(matches!(err, HalocatError::MissingRequiredArgument(ref k) if k == "particle_mass"));
    }

    #[test]
    fn lbox_required() {
        let mut args = good_args();
        args.remove("Lbox");
        let err = HaloCatalog::new(args).unwrap_err();
        assert!(matches!(err, HalocatError::MissingRequiredArgument(ref k) if k == "Lbox"));
    }

    #[test]
    fn lbox_must_be_positive() {
        let args = good_args().with("Lbox", -5.0);
        let err = HaloCatalog::new(args).unwrap_err();
        assert!(matches!(err, HalocatError::InvalidScalar { .. }));
    }

    #[test]
    fn halos_contained_inside_lbox() {
        let args = good_args().with("Lbox", 20);
        let err = HaloCatalog::new(args).unwrap_err();
        assert!(matches!(err, HalocatError::PositionOutOfBounds { axis: 'x', .. }));
    }

    #[test]
    fn redshift_is_float() {
        let args = good_args().with("redshift", "1.0");
        let err = HaloCatalog::new(args).unwrap_err();
        assert!(matches!(err, HalocatError::TypeValidation(_)));
        assert!(err
            .to_string()
            .contains("The ``redshift`` metadata must be a float."));
    }

    #[test]
    fn redshift_rejects_integer() {
        let args = good_args().with("redshift", 1);
        assert!(matches!(
            HaloCatalog::new(args),
            Err(HalocatError::TypeValidation(_))
        ));
    }

    #[test]
    fn additional_metadata() {
        let args = good_args().with("arnold_schwarzenegger", "Stick around!");
        let halocat = HaloCatalog::new(args).unwrap();
        assert_eq!(
            halocat.metadata("arnold_schwarzenegger").and_then(CatalogValue::as_str),
            Some("Stick around!")
        );
    }

    #[test]
    fn metadata_attached_after_construction() {
        let mut halocat = HaloCatalog::new(good_args()).unwrap();
        halocat.set_metadata("cosmology", "WMAP5");
        assert_eq!(halocat.metadata("cosmology"), Some(&CatalogValue::from("WMAP5")));
    }

    #[test]
    fn negative_position_fails() {
        let mut args = good_args();
        if let Some(CatalogValue::Array(Column::Float(x))) = args.get_mut("halo_x") {
            x[0] = -1.0;
        }
        let err = HaloCatalog::new(args).unwrap_err();
        assert!(matches!(
            err,
            HalocatError::PositionOutOfBounds { axis: 'x', index: 0, .. }
        ));
    }

    #[test]
    fn position_beyond_lbox_fails() {
        let mut args = good_args();
        if let Some(CatalogValue::Array(Column::Float(y))) = args.get_mut("halo_y") {
            y[3] = 10000.0;
        }
        let err = HaloCatalog::new(args).unwrap_err();
        assert!(matches!(
            err,
            HalocatError::PositionOutOfBounds { axis: 'y', index: 3, .. }
        ));
    }

    #[test]
    fn requires_position_and_id_columns() {
        for name in ["halo_x", "halo_y", "halo_z", "halo_id"] {
            let mut args = good_args();
            args.remove(name);
            let err = HaloCatalog::new(args).unwrap_err();
            assert!(
                matches!(err, HalocatError::MissingRequiredColumn(ref c) if c == name),
                "missing {name} gave {err}"
            );
        }
    }

    #[test]
    fn requires_mass_column() {
        let mut args = good_args();
        args.remove("halo_mass");
        let err = HaloCatalog::new(args).unwrap_err();
        assert!(matches!(err, HalocatError::MissingRequiredColumn(_)));
    }

    #[test]
    fn halo_columns_share_length() {
        let args = good_args().with("halo_vmax", vec![1.0; NUM_HALOS - 1]);
        let err = HaloCatalog::new(args).unwrap_err();
        assert!(matches!(
            err,
            HalocatError::InconsistentColumnLength { ref column, expected: 100, actual: 99 }
                if column == "halo_vmax"
        ));
    }

    #[test]
    fn halo_id_must_be_unique() {
        let mut ids: Vec<i64> = (0..NUM_HALOS as i64).collect();
        ids[5] = 4;
        let args = good_args().with("halo_id", ids);
        let err = HaloCatalog::new(args).unwrap_err();
        assert!(matches!(err, HalocatError::DuplicateHaloId { value: 4 }));
    }

    #[test]
    fn halo_id_must_be_integer() {
        let args = good_args().with("halo_id", vec![0.0; NUM_HALOS]);
        assert!(matches!(
            HaloCatalog::new(args),
            Err(HalocatError::TypeValidation(_))
        ));
    }

    #[test]
    fn halo_prefix_warning() {
        let args = good_args().with("s", vec![1.0; NUM_HALOS]);
        let halocat = HaloCatalog::new(args).unwrap();

        assert_eq!(halocat.warnings().len(), 1);
        assert!(halocat.warnings()[0].contains("interpreted as metadata"));
        assert!(halocat.column("s").is_none());
        assert!(matches!(halocat.metadata("s"), Some(CatalogValue::Array(_))));
    }

    #[test]
    fn short_unprefixed_array_is_quiet_metadata() {
        let args = good_args().with("bins", vec![1.0, 2.0, 3.0]);
        let halocat = HaloCatalog::new(args).unwrap();
        assert!(halocat.warnings().is_empty());
        assert!(halocat.metadata("bins").is_some());
    }

    #[test]
    fn ptcl_table_absent_by_default() {
        let halocat = HaloCatalog::new(good_args()).unwrap();
        assert!(halocat.ptcl_table().is_none());
        assert!(halocat.metadata("ptcl_table").is_none());
    }

    #[test]
    fn ptcl_table_kept_when_valid() {
        let table = ptcl_table(MIN_NUM_PTCLS, &["x", "y", "z"]);
        let args = good_args().with("ptcl_table", table.clone());
        let halocat = HaloCatalog::new(args).unwrap();
        assert_eq!(halocat.ptcl_table(), Some(&table));
    }

    #[test]
    fn ptcl_table_min_count() {
        let args = good_args().with("ptcl_table", ptcl_table(1000, &["x", "y", "z"]));
        let err = HaloCatalog::new(args).unwrap_err();
        assert!(matches!(
            err,
            HalocatError::InsufficientParticleCount { actual: 1000, minimum: 10_000 }
        ));
    }

    #[test]
    fn ptcl_table_needs_z() {
        let args = good_args().with("ptcl_table", ptcl_table(MIN_NUM_PTCLS, &["x", "y"]));
        let err = HaloCatalog::new(args).unwrap_err();
        assert!(matches!(err, HalocatError::MissingRequiredColumn(ref c) if c == "z"));
    }

    #[test]
    fn ptcl_table_must_be_table() {
        let records = ptcl_table(MIN_NUM_PTCLS, &["x", "y", "z"]).as_records();
        let args = good_args().with("ptcl_table", records);
        let err = HaloCatalog::new(args).unwrap_err();
        assert!(matches!(err, HalocatError::TypeValidation(_)));
    }

    #[test]
    fn object_metadata_preserved() {
        #[derive(Debug)]
        struct Notes;
        impl DisplayValue for Notes {
            fn to_display_string(&self) -> Result<String, String> {
                Ok("notes".to_string())
            }
        }

        let obj: Arc<dyn DisplayValue> = Arc::new(Notes);
        let args = good_args().with("notes", obj.clone());
        let halocat = HaloCatalog::new(args).unwrap();
        assert_eq!(halocat.metadata("notes"), Some(&CatalogValue::Object(obj)));
    }
}
