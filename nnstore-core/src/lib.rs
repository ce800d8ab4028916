//! nnstore: a small in-memory analytical engine. A columnar store with
//! reversible per-column normalisation feeds a vantage-point tree over
//! normalised rows, which in turn backs exact k-nearest-neighbour
//! retrieval, k-NN density estimation, record imputation, and quantile
//! queries. Rows come either from a host-assembled [`DataSource`] or from
//! synthetic rows a trained generative model hands back
//! ([`GenerativeData`]); both ride the same storage and indexing
//! substrate.

#![allow(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod column;
pub mod config;
pub mod datasource;
pub mod density;
pub mod error;
pub mod generative;
pub mod index;
pub mod io;
pub mod platform;
pub mod types;

pub use crate::{
    config::Config,
    error::{Error, Result},
};

use crate::datasource::normalize;
use crate::datasource::DataSource;
use crate::generative::{GenerativeData, GenerativeModel, TrainedModel};
use crate::index::{LpDistance, VpTree};
use crate::platform::Progress;
use crate::types::ColumnType;
use parking_lot::Mutex;
use std::fs::File;
use std::io::{BufReader, BufWriter, Cursor};
use std::path::Path;

/// The engine handle: process-wide optional owned slots for the current
/// data source, current generative data, current generative model, and
/// the two cached VP-trees (one for k-NN record queries, one for density
/// passes), per §5's resource model. Replacing a slot releases the prior
/// owner in full; there is no aliasing across slots.
///
/// All mutating operations are serialised through an internal mutex —
/// the engine itself never runs two calls concurrently, matching the
/// single-threaded-per-instance scheduling model — but the handle is
/// `Send + Sync` so a host binding can share one across threads without
/// its own locking.
pub struct Engine {
    state: Mutex<EngineState>,
}

struct EngineState {
    config: Config,
    data_source: Option<DataSource>,
    generative_data: Option<GenerativeData>,
    generative_model: Option<GenerativeModel>,
    knn_tree: Option<VpTree>,
    density_tree: Option<VpTree>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl Engine {
    pub fn new(config: Config) -> Self {
        Self {
            state: Mutex::new(EngineState {
                config,
                data_source: None,
                generative_data: None,
                generative_model: None,
                knn_tree: None,
                density_tree: None,
            }),
        }
    }

    /// Release every owned slot (data source, generative data, generative
    /// model, both cached trees). `config` is left untouched — it governs
    /// the engine instance itself, not any one loaded dataset.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.data_source = None;
        state.generative_data = None;
        state.generative_model = None;
        state.knn_tree = None;
        state.density_tree = None;
    }

    pub fn config(&self) -> Config {
        self.state.lock().config.clone()
    }

    // ---- data source -----------------------------------------------

    /// Replace the data source slot with a freshly created, empty,
    /// unnormalised `DataSource` over `column_types`/`column_names`.
    /// Drops both cached trees — they index the prior data source.
    pub fn ds_create(&self, column_types: &[ColumnType], column_names: &[String]) {
        let mut state = self.state.lock();
        let mut ds = DataSource::new(column_types, column_names);
        Self::seed_data_source(&mut ds, &state.config);
        state.data_source = Some(ds);
        state.knn_tree = None;
        state.density_tree = None;
    }

    pub fn ds_read(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        let mut ds = DataSource::read(&mut reader)?;
        let mut state = self.state.lock();
        Self::seed_data_source(&mut ds, &state.config);
        state.data_source = Some(ds);
        state.knn_tree = None;
        state.density_tree = None;
        Ok(())
    }

    /// Apply the two configurable PRNG streams (row sampling, NOMINAL
    /// one-hot substitution) from `config.sampling`; the VP-tree's own
    /// vantage-selection stream is always seeded from the fixed
    /// `VP_TREE_SEED` constant, never from config.
    fn seed_data_source(ds: &mut DataSource, config: &Config) {
        if let Some(seed) = config.sampling.seed {
            ds.seed_sampling_rng(seed);
        }
        if let Some(seed) = config.sampling.nominal_seed {
            ds.seed_nominal_rngs(seed);
        }
    }

    /// Normalises the data source (recomputing min/max) and writes it out,
    /// unconditionally — mirrors `dsInt.cpp::dsWrite`, which always
    /// renormalises before persisting rather than trusting the in-memory
    /// `normalized` flag.
    pub fn ds_write(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut state = self.state.lock();
        let ds = state
            .data_source
            .as_mut()
            .ok_or_else(|| Error::state_missing("no data source"))?;
        normalize::normalize(ds, true)?;
        ds.build_normalized_number_vector_vector()?;
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        ds.write(&mut writer)
    }

    pub fn ds_add_value_row(&self, cells: &[String]) -> Result<()> {
        let mut state = self.state.lock();
        let ds = state
            .data_source
            .as_mut()
            .ok_or_else(|| Error::state_missing("no data source"))?;
        ds.add_value_row(cells)
    }

    pub fn ds_activate_columns(&self, indices: &[usize]) -> Result<()> {
        self.ds_set_columns_active(indices, true)
    }

    pub fn ds_deactivate_columns(&self, indices: &[usize]) -> Result<()> {
        self.ds_set_columns_active(indices, false)
    }

    fn ds_set_columns_active(&self, indices: &[usize], active: bool) -> Result<()> {
        let mut state = self.state.lock();
        let ds = state
            .data_source
            .as_mut()
            .ok_or_else(|| Error::state_missing("no data source"))?;
        ds.set_columns_active(indices, active)
    }

    pub fn ds_get_active_column_names(&self) -> Result<Vec<String>> {
        let state = self.state.lock();
        let ds = state
            .data_source
            .as_ref()
            .ok_or_else(|| Error::state_missing("no data source"))?;
        Ok(ds.active_column_names())
    }

    pub fn ds_get_inactive_column_names(&self) -> Result<Vec<String>> {
        let state = self.state.lock();
        let ds = state
            .data_source
            .as_ref()
            .ok_or_else(|| Error::state_missing("no data source"))?;
        Ok(ds.inactive_column_names())
    }

    pub fn ds_get_number_of_rows(&self) -> Result<usize> {
        let state = self.state.lock();
        let ds = state
            .data_source
            .as_ref()
            .ok_or_else(|| Error::state_missing("no data source"))?;
        Ok(ds.size())
    }

    pub fn ds_get_normalized(&self) -> Result<bool> {
        let state = self.state.lock();
        let ds = state
            .data_source
            .as_ref()
            .ok_or_else(|| Error::state_missing("no data source"))?;
        Ok(ds.is_normalized())
    }

    /// Row `index` of every column in storage order (not just active
    /// ones), raw (not normalised) values: STRING columns return their
    /// stored text, NUMERICAL columns their raw float or `"NA"` for NaN.
    /// Mirrors `dsInt.cpp::dsGetRow`.
    pub fn ds_get_row(&self, index: usize) -> Result<Vec<String>> {
        let state = self.state.lock();
        let ds = state
            .data_source
            .as_ref()
            .ok_or_else(|| Error::state_missing("no data source"))?;
        let mut out = Vec::with_capacity(ds.columns().len());
        for column in ds.columns() {
            match column {
                column::Column::String(c) => out.push(c.value(index)?),
                column::Column::Number(c) => {
                    let [v] = c.number_vec(index)?;
                    out.push(if v.is_nan() { "NA".to_string() } else { v.to_string() });
                }
                column::Column::Array(_) => {
                    return Err(Error::invalid_column_type(
                        "a data source never holds NUMERICAL_ARRAY columns",
                    ))
                }
            }
        }
        Ok(out)
    }

    // ---- generative data --------------------------------------------

    /// Materialise generative data from the current (normalised) data
    /// source — one-hot NOMINAL string columns become NUMERICAL_ARRAY,
    /// NUMERICAL columns carry over as-is. Drops both cached trees.
    pub fn gd_create(&self) -> Result<()> {
        let mut state = self.state.lock();
        let ds = state
            .data_source
            .as_ref()
            .ok_or_else(|| Error::state_missing("no data source"))?;
        state.generative_data = Some(GenerativeData::from_data_source(ds)?);
        state.knn_tree = None;
        state.density_tree = None;
        Ok(())
    }

    pub fn gd_read(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        let gd = GenerativeData::read(&mut reader)?;
        if gd.number_of_rows() > self.state.lock().config.generative_data.max_rows {
            return Err(Error::invalid_operation(
                "max size of generative data exceeded",
            ));
        }
        let mut state = self.state.lock();
        state.generative_data = Some(gd);
        state.knn_tree = None;
        state.density_tree = None;
        Ok(())
    }

    pub fn gd_write(&self, path: impl AsRef<Path>) -> Result<()> {
        let state = self.state.lock();
        let gd = state
            .generative_data
            .as_ref()
            .ok_or_else(|| Error::state_missing("no generative data"))?;
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        gd.write(&mut writer)
    }

    /// Append rows of already-normalised values (`values.len()` a
    /// multiple of the dimension). Lazily materialises generative data
    /// from the data source slot if nothing has been loaded yet, mirroring
    /// `gdInt.cpp::gdAddValueRows`'s fallback. The append is refused
    /// outright (not truncated) if it would exceed the configured row cap.
    pub fn gd_add_value_rows(&self, values: &[f32]) -> Result<()> {
        let mut state = self.state.lock();
        if state.generative_data.is_none() {
            let ds = state
                .data_source
                .as_ref()
                .ok_or_else(|| Error::state_missing("no data source"))?;
            state.generative_data = Some(GenerativeData::from_data_source(ds)?);
        }
        let dim = state.generative_data.as_ref().unwrap().dimension();
        let max_rows = state.config.generative_data.max_rows;

        let gd = state.generative_data.as_mut().unwrap();
        let incoming_rows = if dim == 0 { 0 } else { values.len() / dim };
        if gd.number_of_rows() + incoming_rows > max_rows {
            return Err(Error::invalid_operation(
                "max size of generative data exceeded",
            ));
        }
        gd.add_value_lines(values)?;
        state.knn_tree = None;
        state.density_tree = None;
        Ok(())
    }

    pub fn gd_get_row(&self, index: usize) -> Result<Vec<String>> {
        let state = self.state.lock();
        let gd = state
            .generative_data
            .as_ref()
            .ok_or_else(|| Error::state_missing("no generative data"))?;
        gd.get_row(index)
    }

    pub fn gd_get_min(&self, column_i: usize) -> Result<f32> {
        let state = self.state.lock();
        let gd = state
            .generative_data
            .as_ref()
            .ok_or_else(|| Error::state_missing("no generative data"))?;
        gd.get_min(column_i)
    }

    pub fn gd_get_max(&self, column_i: usize) -> Result<f32> {
        let state = self.state.lock();
        let gd = state
            .generative_data
            .as_ref()
            .ok_or_else(|| Error::state_missing("no generative data"))?;
        gd.get_max(column_i)
    }

    pub fn gd_get_number_of_rows(&self) -> Result<usize> {
        let state = self.state.lock();
        let gd = state
            .generative_data
            .as_ref()
            .ok_or_else(|| Error::state_missing("no generative data"))?;
        Ok(gd.number_of_rows())
    }

    /// Name each feature-vector position in `indices` (`"<column>.<slot>"`
    /// for a NUMERICAL_ARRAY slot, the bare column name otherwise).
    pub fn gd_get_column_names(&self, indices: &[usize]) -> Result<Vec<String>> {
        let state = self.state.lock();
        let gd = state
            .generative_data
            .as_ref()
            .ok_or_else(|| Error::state_missing("no generative data"))?;
        indices
            .iter()
            .map(|&i| gd.get_number_vector_index_name(i))
            .collect()
    }

    /// Rebuild the density tree from the current generative data and run
    /// a full density pass (§4.5). `k` defaults to `config.density.default_k`.
    pub fn gd_calculate_density_values(
        &self,
        k: Option<usize>,
        progress: &dyn Progress,
    ) -> Result<()> {
        let mut state = self.state.lock();
        let k = k.unwrap_or(state.config.density.default_k);
        let max_nearest_neighbors = state.config.vp_tree.max_nearest_neighbors;
        let gd = state
            .generative_data
            .as_mut()
            .ok_or_else(|| Error::state_missing("no generative data"))?;
        let mut tree = VpTree::build(gd.normalized_cache(), LpDistance::L2, progress)?;
        tree.set_max_nearest_neighbors(max_nearest_neighbors);
        density::calculate_density_values(gd, &tree, k, progress)?;
        state.density_tree = Some(tree);
        Ok(())
    }

    /// Density estimate for a caller-supplied raw feature vector, against
    /// the density tree built by the last `gd_calculate_density_values`.
    pub fn gd_calculate_density_value(
        &self,
        number_vector: &[f32],
        k: usize,
        use_tree: bool,
    ) -> Result<f32> {
        let state = self.state.lock();
        let gd = state
            .generative_data
            .as_ref()
            .ok_or_else(|| Error::state_missing("no generative data"))?;
        let tree = state.density_tree.as_ref().ok_or(Error::NoDensities)?;
        density::calculate_density_value(gd, tree, number_vector, k, use_tree)
    }

    pub fn gd_density_value_quantile(&self, percent: f32) -> Result<f32> {
        let state = self.state.lock();
        let gd = state
            .generative_data
            .as_ref()
            .ok_or_else(|| Error::state_missing("no generative data"))?;
        density::calculate_quantile(gd, percent)
    }

    pub fn gd_density_value_inverse_quantile(&self, value: f32) -> Result<f32> {
        let state = self.state.lock();
        let gd = state
            .generative_data
            .as_ref()
            .ok_or_else(|| Error::state_missing("no generative data"))?;
        Ok(density::calculate_inverse_quantile(gd, value))
    }

    /// `k` nearest neighbours of `record` (NUMERICAL cells as text, `"NA"`
    /// for missing), rebuilding the k-NN tree in place whenever the
    /// record's NaN pattern differs from the one it was last built with.
    pub fn gd_k_nearest_neighbors(
        &self,
        record: &[String],
        k: usize,
        use_tree: bool,
        progress: &dyn Progress,
    ) -> Result<Vec<Vec<String>>> {
        let mut state = self.state.lock();
        if state.generative_data.is_none() {
            return Err(Error::state_missing("no generative data"));
        }
        let max_nearest_neighbors = state.config.vp_tree.max_nearest_neighbors;
        let tree = state
            .knn_tree
            .get_or_insert_with(|| VpTree::empty(LpDistance::L2));
        let gd = state.generative_data.as_ref().unwrap();
        density::k_nearest_neighbors(gd, tree, record, k, use_tree, max_nearest_neighbors, progress)
    }

    /// Fill `"NA"` fields of `record` from its single nearest neighbour.
    pub fn gd_complete(
        &self,
        record: &[String],
        use_tree: bool,
        progress: &dyn Progress,
    ) -> Result<Vec<String>> {
        let mut state = self.state.lock();
        if state.generative_data.is_none() {
            return Err(Error::state_missing("no generative data"));
        }
        let max_nearest_neighbors = state.config.vp_tree.max_nearest_neighbors;
        let tree = state
            .knn_tree
            .get_or_insert_with(|| VpTree::empty(LpDistance::L2));
        let gd = state.generative_data.as_ref().unwrap();
        density::complete(gd, tree, record, use_tree, max_nearest_neighbors, progress)
    }

    // ---- generative model --------------------------------------------

    /// Wrap the current data source (not generative data) as a fresh,
    /// untrained `GenerativeModel`; the external trainer fills in
    /// hyperparameters and the trained-model blobs afterwards.
    pub fn gm_create(&self) -> Result<()> {
        let mut state = self.state.lock();
        let ds = state
            .data_source
            .as_ref()
            .ok_or_else(|| Error::state_missing("no data source"))?
            .clone();
        state.generative_model = Some(GenerativeModel::new(ds));
        Ok(())
    }

    /// Writes the current generative model's record to `path`, first
    /// reading the two trained-model blobs back in from sibling files
    /// named after `model_name` (`<model_name>.data-00000-of-00001`,
    /// `<model_name>.index`) so the bundled record actually carries
    /// what the external trainer produced, mirroring
    /// `generativeModel.h::writeWithReadingTrainedModel`. The async read
    /// runs before the lock is taken so the mutex guard never has to
    /// cross an `.await` point.
    pub async fn gm_write(&self, path: impl AsRef<Path>, model_name: &str) -> Result<()> {
        let trained_model = TrainedModel::read_vectors(model_name).await?;
        let mut state = self.state.lock();
        let gm = state
            .generative_model
            .as_mut()
            .ok_or_else(|| Error::state_missing("no generative model"))?;
        gm.set_trained_model(trained_model);
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        gm.write(&mut writer)
    }

    /// Reads a model record from `path`, then (per `generativeModel.h`)
    /// writes its two trained-model blobs back out to sibling files named
    /// after `model_name` for the external trainer to pick up.
    pub async fn gm_read(&self, path: impl AsRef<Path>, model_name: &str) -> Result<()> {
        let bytes = tokio::fs::read(path).await?;
        let mut cursor = Cursor::new(bytes);
        let gm = GenerativeModel::read(&mut cursor, model_name).await?;
        self.state.lock().generative_model = Some(gm);
        Ok(())
    }

    pub fn gm_set_trained_model(&self, trained_model: TrainedModel) -> Result<()> {
        let mut state = self.state.lock();
        let gm = state
            .generative_model
            .as_mut()
            .ok_or_else(|| Error::state_missing("no generative model"))?;
        gm.set_trained_model(trained_model);
        Ok(())
    }

    pub fn gm_get_n_training_iterations(&self) -> Result<i32> {
        self.with_model(|gm| gm.n_training_iterations())
    }

    pub fn gm_set_n_training_iterations(&self, value: i32) -> Result<()> {
        self.with_model_mut(|gm| gm.set_n_training_iterations(value))
    }

    pub fn gm_get_n_initialization_iterations(&self) -> Result<i32> {
        self.with_model(|gm| gm.n_initialization_iterations())
    }

    pub fn gm_set_n_initialization_iterations(&self, value: i32) -> Result<()> {
        self.with_model_mut(|gm| gm.set_n_initialization_iterations(value))
    }

    pub fn gm_get_n_hidden_layer_units(&self) -> Result<i32> {
        self.with_model(|gm| gm.n_hidden_layer_units())
    }

    pub fn gm_set_n_hidden_layer_units(&self, value: i32) -> Result<()> {
        self.with_model_mut(|gm| gm.set_n_hidden_layer_units(value))
    }

    pub fn gm_get_learning_rate(&self) -> Result<f32> {
        self.with_model(|gm| gm.learning_rate())
    }

    pub fn gm_set_learning_rate(&self, value: f32) -> Result<()> {
        self.with_model_mut(|gm| gm.set_learning_rate(value))
    }

    pub fn gm_get_dropout(&self) -> Result<f32> {
        self.with_model(|gm| gm.dropout())
    }

    pub fn gm_set_dropout(&self, value: f32) -> Result<()> {
        self.with_model_mut(|gm| gm.set_dropout(value))
    }

    fn with_model<T>(&self, f: impl FnOnce(&GenerativeModel) -> T) -> Result<T> {
        let state = self.state.lock();
        let gm = state
            .generative_model
            .as_ref()
            .ok_or_else(|| Error::state_missing("no generative model"))?;
        Ok(f(gm))
    }

    fn with_model_mut(&self, f: impl FnOnce(&mut GenerativeModel)) -> Result<()> {
        let mut state = self.state.lock();
        let gm = state
            .generative_model
            .as_mut()
            .ok_or_else(|| Error::state_missing("no generative model"))?;
        f(gm);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::NullProgress;

    fn grid_engine() -> Engine {
        let engine = Engine::default();
        engine.ds_create(
            &[ColumnType::Numerical, ColumnType::Numerical],
            &["x".to_string(), "y".to_string()],
        );
        for i in 0..200 {
            let x = (i % 20) as f32;
            let y = (i / 20) as f32;
            engine
                .ds_add_value_row(&[x.to_string(), y.to_string()])
                .unwrap();
        }
        engine
    }

    #[test]
    fn reset_clears_every_slot_but_keeps_config() {
        let engine = grid_engine();
        engine.gd_create().unwrap_err(); // not normalised yet
        let mut cfg = Config::default();
        cfg.density.default_k = 7;
        let engine = Engine::new(cfg);
        engine.reset();
        assert_eq!(engine.config().density.default_k, 7);
        assert!(matches!(
            engine.ds_get_number_of_rows(),
            Err(Error::StateMissing(_))
        ));
    }

    #[test]
    fn ds_create_and_add_value_row_round_trip_via_get_row() {
        let engine = grid_engine();
        assert_eq!(engine.ds_get_number_of_rows().unwrap(), 200);
        let row = engine.ds_get_row(5).unwrap();
        assert_eq!(row, vec!["5".to_string(), "0".to_string()]);
    }

    #[test]
    fn ds_write_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ds.bin");
        let engine = grid_engine();
        engine.ds_write(&path).unwrap();

        let engine2 = Engine::default();
        engine2.ds_read(&path).unwrap();
        assert_eq!(engine2.ds_get_number_of_rows().unwrap(), 200);
        assert!(engine2.ds_get_normalized().unwrap());
    }

    #[test]
    fn gd_create_requires_normalized_data_source() {
        let engine = grid_engine();
        assert!(matches!(
            engine.gd_create(),
            Err(Error::NotNormalized)
        ));
        engine.ds_write_normalizes_then(|engine| {
            engine.gd_create().unwrap();
        });
    }

    impl Engine {
        // Test helper: normalise the data source slot directly, without
        // the write-to-disk round trip `ds_write` otherwise requires.
        fn ds_write_normalizes_then(&self, f: impl FnOnce(&Engine)) {
            {
                let mut state = self.state.lock();
                let ds = state.data_source.as_mut().unwrap();
                normalize::normalize(ds, true).unwrap();
                ds.build_normalized_number_vector_vector().unwrap();
            }
            f(self);
        }
    }

    #[test]
    fn gd_density_and_knn_pipeline() {
        let engine = grid_engine();
        engine.ds_write_normalizes_then(|engine| {
            engine.gd_create().unwrap();
        });
        engine
            .gd_calculate_density_values(Some(10), &NullProgress)
            .unwrap();
        assert_eq!(engine.gd_get_number_of_rows().unwrap(), 200);

        let q50 = engine.gd_density_value_quantile(50.0).unwrap();
        let inv = engine.gd_density_value_inverse_quantile(q50).unwrap();
        assert!((inv - 50.0).abs() < 20.0);

        let record = vec!["5.0".to_string(), "NA".to_string()];
        let completed = engine.gd_complete(&record, true, &NullProgress).unwrap();
        assert_eq!(completed[0], "5");
        assert_ne!(completed[1], "NA");

        let neighbors = engine
            .gd_k_nearest_neighbors(&record, 3, true, &NullProgress)
            .unwrap();
        assert_eq!(neighbors.len(), 3);
    }

    #[test]
    fn gm_create_then_hyperparameters_round_trip() {
        let engine = grid_engine();
        engine.gm_create().unwrap();
        engine.gm_set_learning_rate(0.05).unwrap();
        engine.gm_set_n_training_iterations(100).unwrap();
        assert_eq!(engine.gm_get_learning_rate().unwrap(), 0.05);
        assert_eq!(engine.gm_get_n_training_iterations().unwrap(), 100);
    }

    #[test]
    fn gm_requires_data_source() {
        let engine = Engine::default();
        assert!(matches!(
            engine.gm_create(),
            Err(Error::StateMissing(_))
        ));
    }

    #[tokio::test]
    async fn gm_write_reads_trained_model_blobs_from_sibling_files() {
        let dir = tempfile::tempdir().unwrap();
        let model_path = dir.path().join("mymodel");
        let model_name = model_path.to_string_lossy().into_owned();
        tokio::fs::write(dir.path().join("mymodel.data-00000-of-00001"), vec![9, 8, 7])
            .await
            .unwrap();
        tokio::fs::write(dir.path().join("mymodel.index"), vec![1, 2])
            .await
            .unwrap();

        let engine = grid_engine();
        engine.gm_create().unwrap();

        let out_path = dir.path().join("model.bin");
        engine.gm_write(&out_path, &model_name).await.unwrap();

        let bytes = std::fs::read(&out_path).unwrap();
        let mut cursor = Cursor::new(bytes);
        let gm = GenerativeModel::read(&mut cursor, &model_name).await.unwrap();
        assert_eq!(gm.trained_model().data(), &[9, 8, 7]);
        assert_eq!(gm.trained_model().index(), &[1, 2]);
    }
}
