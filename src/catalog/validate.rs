//! Two-pass classification and validation of constructor input
//!
//! Pass one pulls out the recognized keys (`Lbox`, `particle_mass`,
//! `redshift`, `ptcl_table`) and the halo count from `halo_id`. Pass two
//! sorts every remaining entry into a halo column or metadata using a fixed
//! predicate: an array whose name carries the halo prefix is a column,
//! everything else is metadata.

use crate::catalog::value::{CatalogValue, Column, Table};
use crate::error::{HalocatError, HalocatResult};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, warn};

/// Prefix every halo column name must carry
pub const HALO_PREFIX: &str = "halo_";

/// Minimum number of rows in a particle table
pub const MIN_NUM_PTCLS: usize = 10_000;

pub(crate) const LBOX_KEY: &str = "Lbox";
pub(crate) const PARTICLE_MASS_KEY: &str = "particle_mass";
pub(crate) const REDSHIFT_KEY: &str = "redshift";
pub(crate) const PTCL_TABLE_KEY: &str = "ptcl_table";

const POSITION_AXES: [char; 3] = ['x', 'y', 'z'];

/// Output of a successful validation
#[derive(Debug)]
pub(crate) struct ValidatedParts {
    pub lbox: f64,
    pub particle_mass: f64,
    pub redshift: f64,
    pub halo_table: Table,
    pub ptcl_table: Option<Table>,
    pub metadata: BTreeMap<String, CatalogValue>,
    pub warnings: Vec<String>,
}

/// Run every check in order, failing on the first violation
pub(crate) fn validate(mut values: BTreeMap<String, CatalogValue>) -> HalocatResult<ValidatedParts> {
    let lbox = take_positive_scalar(&mut values, LBOX_KEY)?;
    let particle_mass = take_positive_scalar(&mut values, PARTICLE_MASS_KEY)?;
    let redshift = take_redshift(&mut values)?;
    let ptcl_value = values.remove(PTCL_TABLE_KEY);

    let num_halos = halo_count(&values)?;
    debug!("Classifying {} catalog entries for {} halos", values.len(), num_halos);

    let mut halo_columns = BTreeMap::new();
    let mut metadata = BTreeMap::new();
    let mut warnings = Vec::new();

    for (name, value) in values {
        match value {
            CatalogValue::Array(column) if name.starts_with(HALO_PREFIX) => {
                halo_columns.insert(name, column);
            }
            CatalogValue::Array(column) => {
                if column.len() == num_halos {
                    let message = format!(
                        "The ``{name}`` argument has length {num_halos}, the same as the number \
                         of halos, but it does not begin with ``{HALO_PREFIX}``. It will be \
                         interpreted as metadata, not as a halo column. Prefix the name with \
                         ``{HALO_PREFIX}`` if it should be a column of the halo table."
                    );
                    warn!("{}", message);
                    warnings.push(message);
                }
                metadata.insert(name, CatalogValue::Array(column));
            }
            other => {
                metadata.insert(name, other);
            }
        }
    }

    check_required_columns(&halo_columns)?;
    let halo_table = build_halo_table(halo_columns, num_halos)?;
    check_unique_ids(&halo_table)?;
    check_positions(&halo_table, lbox)?;

    let ptcl_table = ptcl_value.map(check_ptcl_table).transpose()?;

    Ok(ValidatedParts {
        lbox,
        particle_mass,
        redshift,
        halo_table,
        ptcl_table,
        metadata,
        warnings,
    })
}

fn take_positive_scalar(values: &mut BTreeMap<String, CatalogValue>, key: &str) -> HalocatResult<f64> {
    let value = values
        .remove(key)
        .ok_or_else(|| HalocatError::MissingRequiredArgument(key.to_string()))?;

    let number = value.as_f64().ok_or_else(|| {
        HalocatError::type_validation(format!(
            "The ``{key}`` argument must be a number, got a {}.",
            value.kind()
        ))
    })?;

    if !number.is_finite() || number <= 0.0 {
        return Err(HalocatError::InvalidScalar {
            field: key.to_string(),
            value: number,
        });
    }
    Ok(number)
}

fn take_redshift(values: &mut BTreeMap<String, CatalogValue>) -> HalocatResult<f64> {
    match values.remove(REDSHIFT_KEY) {
        Some(CatalogValue::Float(z)) => Ok(z),
        Some(other) => Err(HalocatError::type_validation(format!(
            "The ``redshift`` metadata must be a float. Got a {} instead.",
            other.kind()
        ))),
        None => Err(HalocatError::MissingRequiredArgument(REDSHIFT_KEY.to_string())),
    }
}

fn halo_count(values: &BTreeMap<String, CatalogValue>) -> HalocatResult<usize> {
    match values.get("halo_id") {
        Some(CatalogValue::Array(Column::Int(ids))) => Ok(ids.len()),
        Some(CatalogValue::Array(Column::Float(_))) => Err(HalocatError::type_validation(
            "The ``halo_id`` column must store integers.",
        )),
        Some(other) => Err(HalocatError::type_validation(format!(
            "The ``halo_id`` argument must be an array of integers, got a {}.",
            other.kind()
        ))),
        None => Err(HalocatError::MissingRequiredColumn("halo_id".to_string())),
    }
}

fn check_required_columns(columns: &BTreeMap<String, Column>) -> HalocatResult<()> {
    if !columns.contains_key("halo_id") {
        return Err(HalocatError::MissingRequiredColumn("halo_id".to_string()));
    }
    if !columns.keys().any(|name| name.contains("mass")) {
        return Err(HalocatError::MissingRequiredColumn("halo_mass".to_string()));
    }
    for axis in POSITION_AXES {
        let name = format!("{HALO_PREFIX}{axis}");
        if !columns.contains_key(&name) {
            return Err(HalocatError::MissingRequiredColumn(name));
        }
    }
    Ok(())
}

fn build_halo_table(columns: BTreeMap<String, Column>, num_halos: usize) -> HalocatResult<Table> {
    if let Some((name, column)) = columns.iter().find(|(_, c)| c.len() != num_halos) {
        return Err(HalocatError::InconsistentColumnLength {
            column: name.clone(),
            expected: num_halos,
            actual: column.len(),
        });
    }
    Table::from_columns(columns)
}

fn check_unique_ids(table: &Table) -> HalocatResult<()> {
    let ids = table
        .column("halo_id")
        .and_then(Column::as_int)
        .unwrap_or_default();

    let mut seen = HashSet::with_capacity(ids.len());
    for &id in ids {
        if !seen.insert(id) {
            return Err(HalocatError::DuplicateHaloId { value: id });
        }
    }
    Ok(())
}

fn check_positions(table: &Table, lbox: f64) -> HalocatResult<()> {
    for axis in POSITION_AXES {
        let name = format!("{HALO_PREFIX}{axis}");
        let Some(column) = table.column(&name) else {
            return Err(HalocatError::MissingRequiredColumn(name));
        };
        // NaN fails both comparisons, so it is rejected here as well
        let violation = column
            .iter_f64()
            .enumerate()
            .find(|&(_, v)| !(v >= 0.0 && v < lbox));
        if let Some((index, value)) = violation {
            return Err(HalocatError::PositionOutOfBounds {
                axis,
                index,
                value,
                lbox,
            });
        }
    }
    Ok(())
}

fn check_ptcl_table(value: CatalogValue) -> HalocatResult<Table> {
    let table = match value {
        CatalogValue::Table(table) => table,
        other => {
            return Err(HalocatError::type_validation(format!(
                "The ``ptcl_table`` argument must be a table, got a {}.",
                other.kind()
            )))
        }
    };

    for axis in POSITION_AXES {
        if !table.contains(&axis.to_string()) {
            return Err(HalocatError::MissingRequiredColumn(axis.to_string()));
        }
    }

    if table.num_rows() < MIN_NUM_PTCLS {
        return Err(HalocatError::InsufficientParticleCount {
            actual: table.num_rows(),
            minimum: MIN_NUM_PTCLS,
        });
    }
    Ok(table)
}
