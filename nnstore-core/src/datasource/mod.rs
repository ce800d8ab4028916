//! A data source: an ordered list of typed columns, an active mask
//! carried per-column, a `normalized` flag, an embedded density column,
//! and persistence to/from the binary record format (§6).

pub mod normalize;

use crate::column::{number::NumberColumn, Column};
use crate::error::{Error, Result};
use crate::io::{Reader, Writer};
use crate::types::ColumnType;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::io::{Read as IoRead, Write as IoWrite};

pub const TYPE_ID: &str = "c46afa0e-51b6-4877-b4f4-53d909e34a7d";
pub const VERSION: i32 = 1;

#[derive(Debug)]
pub struct DataSource {
    version: i32,
    normalized: bool,
    columns: Vec<Column>,
    density: NumberColumn,
    normalized_cache: Vec<Vec<f32>>,
    rng: StdRng,
}

impl Clone for DataSource {
    fn clone(&self) -> Self {
        // The copy constructor always forces `normalized = false` — two
        // historical variants existed upstream, this is the resolved one
        // (see DESIGN.md).
        Self {
            version: self.version,
            normalized: false,
            columns: self.columns.clone(),
            density: NumberColumn::new("Densities", crate::types::ScaleType::Logarithmic),
            normalized_cache: Vec::new(),
            rng: StdRng::from_entropy(),
        }
    }
}

impl DataSource {
    /// Build an empty data source from parallel `column_types`/`column_names`.
    /// Only STRING and NUMERICAL columns can be created this way;
    /// NUMERICAL_ARRAY columns only arise from materialising a nominal
    /// string column inside [`crate::generative`].
    pub fn new(column_types: &[ColumnType], column_names: &[String]) -> Self {
        let columns = column_types
            .iter()
            .zip(column_names)
            .map(|(ty, name)| match ty {
                ColumnType::Numerical => Column::Number(NumberColumn::new(
                    name.clone(),
                    crate::types::ScaleType::Linear,
                )),
                ColumnType::String => Column::String(crate::column::string::StringColumn::new(
                    name.clone(),
                    crate::types::ScaleType::Nominal,
                )),
                ColumnType::NumericalArray => {
                    // Created empty; real slots are attached by the
                    // generative-data materialisation path.
                    Column::Array(crate::column::array::NumberArrayColumn::new(
                        name.clone(),
                        &[],
                    ))
                }
            })
            .collect();
        Self {
            version: VERSION,
            normalized: false,
            columns,
            density: NumberColumn::new("Densities", crate::types::ScaleType::Logarithmic),
            normalized_cache: Vec::new(),
            rng: StdRng::from_entropy(),
        }
    }

    /// Build directly from an already-assembled column vector. Used by
    /// [`crate::generative::data::GenerativeData`], which constructs its
    /// columns itself rather than through `add_value_row` parsing.
    pub(crate) fn from_columns(columns: Vec<Column>) -> Self {
        Self {
            version: VERSION,
            normalized: false,
            columns,
            density: NumberColumn::new("Densities", crate::types::ScaleType::Logarithmic),
            normalized_cache: Vec::new(),
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seed_sampling_rng(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    /// Seed every STRING column's NOMINAL-substitution RNG, each from a
    /// distinct derived seed so columns don't draw identical sequences.
    pub fn seed_nominal_rngs(&mut self, seed: u64) {
        for (i, column) in self.columns.iter_mut().enumerate() {
            if let Column::String(c) = column {
                c.seed_rng(seed.wrapping_add(i as u64));
            }
        }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn columns_mut(&mut self) -> &mut [Column] {
        &mut self.columns
    }

    pub fn density_column(&self) -> &NumberColumn {
        &self.density
    }

    pub fn density_column_mut(&mut self) -> &mut NumberColumn {
        &mut self.density
    }

    pub fn is_normalized(&self) -> bool {
        self.normalized
    }

    pub fn set_normalized(&mut self, normalized: bool) {
        self.normalized = normalized;
    }

    /// Size of the data source: raw row count of the first active column,
    /// or 0 if no column is active.
    pub fn size(&self) -> usize {
        self.columns
            .iter()
            .find(|c| c.active())
            .map(|c| c.raw_size())
            .unwrap_or(0)
    }

    /// Row count of the normalised view (populated only once `normalize`
    /// has run).
    pub fn normalized_size(&self) -> usize {
        self.columns
            .iter()
            .find(|c| c.active())
            .map(|c| c.norm_size())
            .unwrap_or(0)
    }

    /// Sum of active columns' dimensions.
    pub fn dimension(&self) -> usize {
        self.columns
            .iter()
            .filter(|c| c.active())
            .map(|c| c.dimension())
            .sum()
    }

    pub fn active_column_names(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| c.active())
            .map(|c| c.name().to_string())
            .collect()
    }

    pub fn inactive_column_names(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| !c.active())
            .map(|c| c.name().to_string())
            .collect()
    }

    pub fn set_columns_active(&mut self, indices: &[usize], active: bool) -> Result<()> {
        for &i in indices {
            let column = self
                .columns
                .get_mut(i)
                .ok_or_else(|| Error::out_of_range(format!("column index {i}")))?;
            column.set_active(active);
        }
        Ok(())
    }

    /// Parse and append one raw row. NUMERICAL parses as float (`"NA"` as
    /// NaN); STRING records the value verbatim.
    pub fn add_value_row(&mut self, cells: &[String]) -> Result<()> {
        if cells.len() != self.columns.len() {
            return Err(Error::different_sizes(format!(
                "row has {} cells, data source has {} columns",
                cells.len(),
                self.columns.len()
            )));
        }
        for (i, (column, cell)) in self.columns.iter_mut().zip(cells).enumerate() {
            crate::column::add_raw_cell(column, i, cell)?;
        }
        Ok(())
    }

    /// Structural append from another data source with matching column
    /// types at each index. `indices` (when given) selects which rows of
    /// `other` to copy; all rows otherwise.
    pub fn add_data(&mut self, other: &DataSource, indices: Option<&[usize]>) -> Result<()> {
        if self.columns.len() != other.columns.len() {
            return Err(Error::different_sizes(
                "data sources have different column counts",
            ));
        }
        let default_indices: Vec<usize> = (0..other.size()).collect();
        let rows = indices.unwrap_or(&default_indices);
        for (i, (dst, src)) in self.columns.iter_mut().zip(&other.columns).enumerate() {
            if dst.column_type() != src.column_type() {
                return Err(Error::invalid_column_type(format!(
                    "column {i} type mismatch: {} vs {}",
                    dst.column_type(),
                    src.column_type()
                )));
            }
            match (dst, src) {
                (Column::Number(d), Column::Number(s)) => {
                    for &row in rows {
                        let [v] = s.number_vec(row)?;
                        d.add_value(v);
                    }
                }
                (Column::String(d), Column::String(s)) => {
                    for &row in rows {
                        // Re-inserted by string, not raw id: the two
                        // sources' value maps need not agree.
                        let value = s.value(row)?;
                        d.add_value(&value, true);
                    }
                }
                (Column::Array(d), Column::Array(s)) => {
                    for &row in rows {
                        let v = s.number_vec(row)?;
                        d.add_value(&v, 0)?;
                    }
                }
                _ => unreachable!("column_type equality checked above"),
            }
        }
        Ok(())
    }

    pub fn get_number_vector(&self, i: usize) -> Result<Vec<f32>> {
        self.project(i, |c, i| c.number_vec(i))
    }

    pub fn get_normalized_number_vector(&self, i: usize) -> Result<Vec<f32>> {
        if !self.normalized {
            return Err(Error::NotNormalized);
        }
        self.project(i, |c, i| c.normalized_number_vec(i))
    }

    pub fn get_denormalized_number_vector(&self, i: usize) -> Result<Vec<f32>> {
        if !self.normalized {
            return Err(Error::NotNormalized);
        }
        self.project(i, |c, i| c.denormalized_number_vec(i))
    }

    fn project(
        &self,
        i: usize,
        f: impl Fn(&Column, usize) -> Result<Vec<f32>>,
    ) -> Result<Vec<f32>> {
        let mut out = Vec::with_capacity(self.dimension());
        for column in self.columns.iter().filter(|c| c.active()) {
            out.extend(f(column, i)?);
        }
        Ok(out)
    }

    /// Maps a position in the concatenated active-column feature vector
    /// back to the owning column's index in `self.columns()`.
    pub fn get_column_index(&self, feature_i: usize) -> Result<usize> {
        let mut offset = 0usize;
        for (idx, column) in self.columns.iter().enumerate() {
            if !column.active() {
                continue;
            }
            if feature_i < offset + column.dimension() {
                return Ok(idx);
            }
            offset += column.dimension();
        }
        Err(Error::invalid_index(format!(
            "feature index {feature_i} out of range for dimension {}",
            self.dimension()
        )))
    }

    /// Like `get_column_index`, but names the slot within a
    /// NUMERICAL_ARRAY column (`"<column>.<slot>"`), or just the column
    /// name otherwise.
    pub fn get_number_vector_index_name(&self, feature_i: usize) -> Result<String> {
        let mut offset = 0usize;
        for column in self.columns.iter().filter(|c| c.active()) {
            let dim = column.dimension();
            if feature_i < offset + dim {
                return Ok(match column {
                    Column::Array(arr) => {
                        format!("{}.{}", arr.name(), arr.slot_names()[feature_i - offset])
                    }
                    other => other.name().to_string(),
                });
            }
            offset += dim;
        }
        Err(Error::invalid_index(format!(
            "feature index {feature_i} out of range for dimension {}",
            self.dimension()
        )))
    }

    /// `n` row ids drawn uniformly (with replacement) from `[0, size)`,
    /// raw projections concatenated in draw order.
    pub fn get_data_random(&mut self, n: usize) -> Vec<f32> {
        let size = self.size();
        let mut out = Vec::new();
        for _ in 0..n {
            if size == 0 {
                break;
            }
            let row = self.rng.gen_range(0..size);
            if let Ok(v) = self.get_number_vector(row) {
                out.extend(v);
            }
        }
        out
    }

    pub fn get_normalized_data_random(&mut self, n: usize) -> Result<Vec<f32>> {
        if !self.normalized {
            return Err(Error::NotNormalized);
        }
        let size = self.normalized_size();
        let mut out = Vec::new();
        for _ in 0..n {
            if size == 0 {
                break;
            }
            let row = self.rng.gen_range(0..size);
            out.extend(self.get_normalized_number_vector(row)?);
        }
        Ok(out)
    }

    /// Rows drawn without replacement: `round(size * percent / 100)` of
    /// them, in an order permuted by a Fisher-Yates-style shrink (mirrors
    /// the original's `RandomIndicesWithoutReplacement`).
    pub fn get_normalized_data_random_percent(&mut self, percent: f64) -> Result<Vec<f32>> {
        if !self.normalized {
            return Err(Error::NotNormalized);
        }
        let indices = self.sample_indices_without_replacement(percent);
        let mut out = Vec::new();
        for row in indices {
            out.extend(self.get_normalized_number_vector(row)?);
        }
        Ok(out)
    }

    /// Same sampling as `get_normalized_data_random_percent`, also
    /// returning the corresponding normalised density values.
    pub fn get_normalized_data_random_percent_with_densities(
        &mut self,
        percent: f64,
    ) -> Result<(Vec<f32>, Vec<f32>)> {
        if !self.normalized {
            return Err(Error::NotNormalized);
        }
        if self.density.norm_size() == 0 {
            return Err(Error::NoDensities);
        }
        let indices = self.sample_indices_without_replacement(percent);
        let mut data = Vec::new();
        let mut densities = Vec::new();
        for row in &indices {
            data.extend(self.get_normalized_number_vector(*row)?);
            densities.extend(self.density.normalized_number_vec(*row)?);
        }
        Ok((data, densities))
    }

    fn sample_indices_without_replacement(&mut self, percent: f64) -> Vec<usize> {
        let size = self.normalized_size();
        let n = ((size as f64) * percent / 100.0).round() as usize;
        let n = n.min(size);
        let mut pool: Vec<usize> = (0..size).collect();
        let mut out = Vec::with_capacity(n);
        for _ in 0..n {
            if pool.is_empty() {
                break;
            }
            let pick = self.rng.gen_range(0..pool.len());
            out.push(pool.swap_remove(pick));
        }
        out
    }

    /// Pre-materialise a row-major cache of normalised rows for
    /// zero-copy downstream use (VP-tree build, density pass).
    pub fn build_normalized_number_vector_vector(&mut self) -> Result<()> {
        if !self.normalized {
            return Err(Error::NotNormalized);
        }
        let size = self.normalized_size();
        let mut cache = Vec::with_capacity(size);
        for i in 0..size {
            cache.push(self.get_normalized_number_vector(i)?);
        }
        self.normalized_cache = cache;
        Ok(())
    }

    pub fn get_normalized_number_vector_reference(&self, i: usize) -> Result<&[f32]> {
        self.normalized_cache
            .get(i)
            .map(|v| v.as_slice())
            .ok_or_else(|| Error::out_of_range(format!("row {i} of {}", self.normalized_cache.len())))
    }

    pub fn normalized_cache(&self) -> &[Vec<f32>] {
        &self.normalized_cache
    }

    pub fn write<W: IoWrite>(&self, w: &mut W) -> Result<()> {
        let mut writer = Writer::new(w);
        writer.write_string(TYPE_ID)?;
        self.write_body(&mut writer)
    }

    /// Writes everything after the type-id header; shared with
    /// `GenerativeData`, which prefixes its own type-id instead.
    pub(crate) fn write_body<W: IoWrite>(&self, w: &mut Writer<'_, W>) -> Result<()> {
        w.write_i32(self.version)?;
        w.write_bool(self.normalized)?;
        w.write_i32(self.columns.len() as i32)?;
        for column in &self.columns {
            column.write(w)?;
        }
        Column::Number(self.density.clone()).write(w)?;
        Ok(())
    }

    pub fn read<R: IoRead>(r: &mut R) -> Result<Self> {
        let mut reader = Reader::new(r);
        let type_id = reader.read_string()?;
        if type_id != TYPE_ID {
            return Err(Error::invalid_type_id(TYPE_ID, type_id));
        }
        Self::read_body(&mut reader)
    }

    /// Reads everything after the type-id header has already been
    /// consumed and checked by the caller.
    pub(crate) fn read_body<R: IoRead>(r: &mut Reader<'_, R>) -> Result<Self> {
        let version = r.read_i32()?;
        let normalized = r.read_bool()?;
        let column_count = r.read_i32()? as usize;
        let mut columns = Vec::with_capacity(column_count);
        for _ in 0..column_count {
            columns.push(Column::read(r)?);
        }
        let density_column = Column::read(r)?;
        let density = density_column
            .as_number()
            .cloned()
            .ok_or_else(|| Error::invalid_column_type("density column must be NUMERICAL"))?;
        let mut ds = Self {
            version,
            normalized,
            columns,
            density,
            normalized_cache: Vec::new(),
            rng: StdRng::from_entropy(),
        };
        if normalized {
            ds.build_normalized_number_vector_vector()?;
        }
        Ok(ds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_numeric_source() -> DataSource {
        let mut ds = DataSource::new(
            &[ColumnType::Numerical, ColumnType::Numerical],
            &["A".to_string(), "B".to_string()],
        );
        ds.add_value_row(&["1.0".to_string(), "2.0".to_string()])
            .unwrap();
        ds.add_value_row(&["3.0".to_string(), "NA".to_string()])
            .unwrap();
        ds
    }

    #[test]
    fn dimension_tracks_active_mask() {
        let mut ds = make_numeric_source();
        assert_eq!(ds.dimension(), 2);
        ds.set_columns_active(&[1], false).unwrap();
        assert_eq!(ds.dimension(), 1);
    }

    #[test]
    fn add_value_row_rejects_wrong_arity() {
        let mut ds = make_numeric_source();
        let err = ds.add_value_row(&["1.0".to_string()]).unwrap_err();
        assert!(matches!(err, Error::DifferentSizes(_)));
    }

    #[test]
    fn na_parses_as_nan() {
        let ds = make_numeric_source();
        let row = ds.get_number_vector(1).unwrap();
        assert!(row[1].is_nan());
    }

    #[test]
    fn copy_forces_unnormalized() {
        let mut ds = make_numeric_source();
        normalize::normalize(&mut ds, true).unwrap();
        assert!(ds.is_normalized());
        let copy = ds.clone();
        assert!(!copy.is_normalized());
    }

    #[test]
    fn feature_index_maps_back_to_column() {
        let ds = make_numeric_source();
        assert_eq!(ds.get_column_index(0).unwrap(), 0);
        assert_eq!(ds.get_column_index(1).unwrap(), 1);
        assert!(ds.get_column_index(2).is_err());
    }

    #[test]
    fn wire_round_trip() {
        let mut ds = make_numeric_source();
        normalize::normalize(&mut ds, true).unwrap();
        let mut buf = Vec::new();
        ds.write(&mut buf).unwrap();
        let mut cursor = std::io::Cursor::new(buf);
        let back = DataSource::read(&mut cursor).unwrap();
        assert_eq!(back.size(), ds.size());
        assert_eq!(back.is_normalized(), ds.is_normalized());
        assert_eq!(
            back.get_normalized_number_vector(0).unwrap(),
            ds.get_normalized_number_vector(0).unwrap()
        );
    }

    #[test]
    fn seeded_sampling_rng_is_reproducible() {
        let mut a = make_numeric_source();
        let mut b = make_numeric_source();
        normalize::normalize(&mut a, true).unwrap();
        normalize::normalize(&mut b, true).unwrap();
        a.build_normalized_number_vector_vector().unwrap();
        b.build_normalized_number_vector_vector().unwrap();
        a.seed_sampling_rng(42);
        b.seed_sampling_rng(42);
        assert_eq!(
            a.get_normalized_data_random(10).unwrap(),
            b.get_normalized_data_random(10).unwrap()
        );
    }

    #[test]
    fn seeded_nominal_rng_substitutes_deterministically() {
        let mut a = DataSource::new(&[ColumnType::String], &["color".to_string()]);
        let mut b = DataSource::new(&[ColumnType::String], &["color".to_string()]);
        for ds in [&mut a, &mut b] {
            let Column::String(c) = &mut ds.columns_mut()[0] else {
                unreachable!()
            };
            c.add_value("red", true);
            c.add_value("green", true);
            c.add_value("unseen", false); // unknown: id 0
        }
        normalize::normalize(&mut a, true).unwrap();
        normalize::normalize(&mut b, true).unwrap();
        a.seed_nominal_rngs(99);
        b.seed_nominal_rngs(99);
        assert_eq!(
            a.get_normalized_number_vector(2).unwrap(),
            b.get_normalized_number_vector(2).unwrap()
        );
    }
}
