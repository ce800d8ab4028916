//! Whole-table normalisation (§4.3). A one-shot transformation: once run,
//! a [`DataSource`]'s `normalized` flag is set and every active column's
//! normalised vector is populated.

use super::DataSource;
use crate::column::Column;
use crate::error::{Error, Result};
use crate::types::ColumnType;

/// `normalize(data_source, calc_min_max)`: NUMERICAL columns compute
/// min/max (ignoring NaN) and populate their normalised vector per the
/// column's scale formula; STRING columns are a no-op (their one-hot is
/// already their normalisation); any other column type is a programming
/// error and fails with `InvalidColumnType`.
pub fn normalize(data_source: &mut DataSource, calc_min_max: bool) -> Result<()> {
    for column in data_source.columns_mut() {
        if !column.active() {
            continue;
        }
        match column {
            Column::Number(c) => c.normalize(calc_min_max),
            Column::Array(c) => {
                for sub in c.columns_mut() {
                    sub.normalize(calc_min_max);
                }
            }
            Column::String(_) => {}
        }
    }
    data_source.set_normalized(true);
    Ok(())
}

/// Single-value forward transform for one NUMERICAL column, optionally
/// clamped to `[min, max]` first. NaN-preserving.
pub fn get_normalized_number(
    data_source: &DataSource,
    column_i: usize,
    x: f32,
    limit: bool,
) -> Result<f32> {
    let column = data_source
        .columns()
        .get(column_i)
        .ok_or_else(|| Error::invalid_column_index(format!("{column_i}")))?;
    match column {
        Column::Number(c) => Ok(c.normalize_value_limit(x, limit)),
        other => Err(Error::invalid_column_type(format!(
            "column {column_i} is {:?}, not NUMERICAL",
            other.column_type()
        ))),
    }
}

/// Single-value inverse transform for one NUMERICAL column. NaN-preserving.
pub fn get_denormalized_number(data_source: &DataSource, column_i: usize, x: f32) -> Result<f32> {
    let column = data_source
        .columns()
        .get(column_i)
        .ok_or_else(|| Error::invalid_column_index(format!("{column_i}")))?;
    match column {
        Column::Number(c) => Ok(c.denormalize_value(x)),
        other => Err(Error::invalid_column_type(format!(
            "column {column_i} is {:?}, not NUMERICAL",
            other.column_type()
        ))),
    }
}

/// Maps a user-supplied raw vector of length `dimension()` into
/// normalised feature space, active column by active column: NUMERICAL
/// columns apply their scale formula, NUMERICAL_ARRAY columns pass their
/// slot values through unchanged (they are already one-hot).
pub fn get_normalized_number_vector(data_source: &DataSource, x: &[f32]) -> Result<Vec<f32>> {
    if x.len() != data_source.dimension() {
        return Err(Error::invalid_dimension(data_source.dimension(), x.len()));
    }
    let mut out = Vec::with_capacity(x.len());
    let mut offset = 0usize;
    for column in data_source.columns() {
        if !column.active() {
            continue;
        }
        let dim = column.dimension();
        let slice = &x[offset..offset + dim];
        match column {
            Column::Number(c) => out.push(c.normalize_value(slice[0])),
            Column::Array(_) => out.extend_from_slice(slice),
            Column::String(_) => {
                return Err(Error::invalid_column_type(
                    "get_normalized_number_vector only supports NUMERICAL and NUMERICAL_ARRAY columns",
                ))
            }
        }
        offset += dim;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ScaleType;

    fn single_numeric(values: &[f32]) -> DataSource {
        let mut ds = DataSource::new(&[ColumnType::Numerical], &["A".to_string()]);
        for &v in values {
            ds.add_value_row(&[v.to_string()]).unwrap();
        }
        ds
    }

    #[test]
    fn scenario_1_linear_normalize() {
        let mut ds = single_numeric(&[0.0, 5.0, 10.0]);
        normalize(&mut ds, true).unwrap();
        let normalized = ds.get_normalized_number_vector(0).unwrap();
        assert_eq!(normalized, vec![0.0]);
        assert_eq!(ds.get_normalized_number_vector(1).unwrap(), vec![0.5]);
        assert_eq!(ds.get_normalized_number_vector(2).unwrap(), vec![1.0]);
        for i in 0..3 {
            let denorm = ds.get_denormalized_number_vector(i).unwrap();
            assert!((denorm[0] - values_at(&ds, i)).abs() < 1e-4);
        }
    }

    fn values_at(ds: &DataSource, i: usize) -> f32 {
        ds.get_number_vector(i).unwrap()[0]
    }

    #[test]
    fn string_column_normalize_is_noop() {
        let mut ds = DataSource::new(&[ColumnType::String], &["color".to_string()]);
        ds.add_value_row(&["red".to_string()]).unwrap();
        normalize(&mut ds, true).unwrap();
        assert!(ds.is_normalized());
    }

    #[test]
    fn get_normalized_number_vector_rejects_strings() {
        let mut ds = DataSource::new(&[ColumnType::String], &["color".to_string()]);
        ds.add_value_row(&["red".to_string()]).unwrap();
        normalize(&mut ds, true).unwrap();
        assert!(matches!(
            get_normalized_number_vector(&ds, &[0.0]),
            Err(Error::InvalidColumnType(_))
        ));
    }
}
