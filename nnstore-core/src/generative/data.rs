//! `GenerativeData`: a [`DataSource`] specialisation whose nominal string
//! columns have been materialised as one-hot NUMERICAL_ARRAY columns, fed
//! from an external generative model. Stores only normalised values.

use crate::column::array::NumberArrayColumn;
use crate::column::number::NumberColumn;
use crate::column::Column;
use crate::datasource::DataSource;
use crate::error::{Error, Result};
use crate::io::{Reader, Writer};
use std::io::{Read as IoRead, Write as IoWrite};
use std::ops::{Deref, DerefMut};

pub const TYPE_ID: &str = "15e02d71-de25-4e2f-8b79-d9e1d7c4a5ed";

/// Wraps a [`DataSource`] rather than inheriting from it (Rust has no
/// struct inheritance); `Deref`/`DerefMut` let callers use the full
/// `DataSource` row-projection contract directly on a `GenerativeData`.
#[derive(Debug)]
pub struct GenerativeData {
    inner: DataSource,
}

impl Deref for GenerativeData {
    type Target = DataSource;
    fn deref(&self) -> &DataSource {
        &self.inner
    }
}

impl DerefMut for GenerativeData {
    fn deref_mut(&mut self) -> &mut DataSource {
        &mut self.inner
    }
}

impl GenerativeData {
    /// Build from an existing, already-normalised `DataSource`: drop
    /// inactive columns, replace each NOMINAL string column with a
    /// NUMERICAL_ARRAY mirroring its one-hot dimension and slot names,
    /// clone NUMERICAL columns verbatim, and copy the density column.
    /// Rejects STRING columns whose scale isn't NOMINAL, and any column
    /// type other than STRING/NUMERICAL.
    pub fn from_data_source(source: &DataSource) -> Result<Self> {
        if !source.is_normalized() {
            return Err(Error::NotNormalized);
        }
        let mut columns = Vec::new();
        for column in source.columns().iter().filter(|c| c.active()) {
            match column {
                Column::Number(c) => columns.push(Column::Number(clone_normalized_column(c))),
                Column::String(c) => {
                    if c.scale() != crate::types::ScaleType::Nominal {
                        return Err(Error::invalid_scale_type(format!(
                            "column {} must be NOMINAL to materialise, got {}",
                            c.name(),
                            c.scale()
                        )));
                    }
                    let slots = c.slot_names();
                    let mut array = NumberArrayColumn::new(c.name(), &slots);
                    for i in 0..c.norm_size() {
                        let row = c.normalized_number_vec(i)?;
                        array.add_normalized_value(&row, 0)?;
                    }
                    columns.push(Column::Array(array));
                }
                Column::Array(_) => {
                    return Err(Error::invalid_column_type(
                        "GenerativeData cannot be built from a DataSource that already holds NUMERICAL_ARRAY columns",
                    ))
                }
            }
        }

        let mut inner = DataSource::from_columns(columns);
        inner.set_normalized(true);
        *inner.density_column_mut() = clone_normalized_column(source.density_column());
        inner.build_normalized_number_vector_vector()?;
        Ok(Self { inner })
    }

    /// Append an already-normalised row starting at `offset` in
    /// `value_vector`, bypassing raw-value parsing entirely (generative
    /// rows never go through string parsing).
    pub fn add_value_line(&mut self, value_vector: &[f32], offset: usize) -> Result<()> {
        let mut cursor = offset;
        for column in self.inner.columns_mut() {
            if !column.active() {
                continue;
            }
            match column {
                Column::Number(c) => {
                    let v = *value_vector
                        .get(cursor)
                        .ok_or_else(|| Error::invalid_vector_size("row shorter than dimension"))?;
                    c.add_normalized_value(v);
                    cursor += 1;
                }
                Column::Array(c) => {
                    c.add_normalized_value(value_vector, cursor)?;
                    cursor += c.dimension();
                }
                Column::String(_) => {
                    return Err(Error::invalid_column_type(
                        "GenerativeData holds no STRING columns",
                    ))
                }
            }
        }
        Ok(())
    }

    /// Append several rows back to back; `value_vector.len()` must be a
    /// multiple of `dimension()`.
    pub fn add_value_lines(&mut self, value_vector: &[f32]) -> Result<()> {
        let dim = self.inner.dimension();
        if dim == 0 || value_vector.len() % dim != 0 {
            return Err(Error::invalid_dimension(dim, value_vector.len()));
        }
        for chunk_start in (0..value_vector.len()).step_by(dim) {
            self.add_value_line(value_vector, chunk_start)?;
        }
        self.inner.build_normalized_number_vector_vector()
    }

    /// Denormalise a column's `min`/`max` pair, for NUMERICAL columns only.
    pub fn get_min(&self, column_i: usize) -> Result<f32> {
        self.numeric_column(column_i).map(|c| c.min())
    }

    pub fn get_max(&self, column_i: usize) -> Result<f32> {
        self.numeric_column(column_i).map(|c| c.max())
    }

    fn numeric_column(&self, column_i: usize) -> Result<&NumberColumn> {
        self.inner
            .columns()
            .get(column_i)
            .ok_or_else(|| Error::invalid_column_index(format!("{column_i}")))?
            .as_number()
            .ok_or_else(|| Error::invalid_column_type(format!("column {column_i} is not NUMERICAL")))
    }

    /// The normalised number of rows stored (`gd_get_number_of_rows`);
    /// generative data has no meaningful "raw" size since it only ever
    /// stores normalised rows.
    pub fn number_of_rows(&self) -> usize {
        self.inner.normalized_size()
    }

    /// Denormalise row `i` back into host-facing values: NUMERICAL
    /// columns via their scale's inverse, NUMERICAL_ARRAY columns via
    /// `get_max_value`.
    pub fn get_row(&self, i: usize) -> Result<Vec<String>> {
        crate::density::denormalize_record_row(&self.inner, i)
    }

    pub fn write<W: IoWrite>(&self, w: &mut W) -> Result<()> {
        let mut writer = Writer::new(w);
        writer.write_string(TYPE_ID)?;
        self.inner.write_body(&mut writer)
    }

    pub fn read<R: IoRead>(r: &mut R) -> Result<Self> {
        let mut reader = Reader::new(r);
        let type_id = reader.read_string()?;
        if type_id != TYPE_ID {
            return Err(Error::invalid_type_id(TYPE_ID, type_id));
        }
        let inner = DataSource::read_body(&mut reader)?;
        Ok(Self { inner })
    }
}

fn clone_normalized_column(c: &NumberColumn) -> NumberColumn {
    let mut clone = NumberColumn::new(c.name(), c.scale());
    clone.set_min_max(c.min(), c.max());
    for &v in c.normalized() {
        clone.add_normalized_value(v);
    }
    clone
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::normalize;
    use crate::types::ColumnType;

    fn nominal_source() -> DataSource {
        let mut ds = DataSource::new(
            &[ColumnType::Numerical, ColumnType::String],
            &["age".to_string(), "color".to_string()],
        );
        ds.add_value_row(&["1.0".to_string(), "red".to_string()])
            .unwrap();
        ds.add_value_row(&["2.0".to_string(), "green".to_string()])
            .unwrap();
        normalize::normalize(&mut ds, true).unwrap();
        ds
    }

    #[test]
    fn materializes_nominal_as_array() {
        let ds = nominal_source();
        let gd = GenerativeData::from_data_source(&ds).unwrap();
        assert_eq!(gd.dimension(), 1 + 2);
        assert_eq!(gd.number_of_rows(), 2);
    }

    #[test]
    fn rejects_unnormalized_source() {
        let mut ds = DataSource::new(&[ColumnType::Numerical], &["a".to_string()]);
        ds.add_value_row(&["1.0".to_string()]).unwrap();
        assert!(matches!(
            GenerativeData::from_data_source(&ds),
            Err(Error::NotNormalized)
        ));
    }

    #[test]
    fn wire_round_trip() {
        let ds = nominal_source();
        let gd = GenerativeData::from_data_source(&ds).unwrap();
        let mut buf = Vec::new();
        gd.write(&mut buf).unwrap();
        let mut cursor = std::io::Cursor::new(buf);
        let back = GenerativeData::read(&mut cursor).unwrap();
        assert_eq!(back.number_of_rows(), gd.number_of_rows());
    }
}
