//! `GenerativeModel`: hyperparameters plus metadata for an externally
//! trained generative model, whose trained weights are stored as opaque
//! byte blobs. The model's own training is out of scope for this crate;
//! it only persists what the trainer hands back.

use crate::datasource::DataSource;
use crate::error::{Error, Result};
use crate::io::{Reader, Writer};
use std::io::{Read as IoRead, Write as IoWrite};
use std::path::{Path, PathBuf};

pub const TYPE_ID: &str = "ae82c484-a137-4a86-beef-441b75ed9096";
pub const VERSION: i32 = 1;

const DATA_FILE_EXTENSION: &str = "data-00000-of-00001";
const INDEX_FILE_EXTENSION: &str = "index";

#[derive(Debug, Clone, Default)]
pub struct TrainedModel {
    data: Vec<u8>,
    index: Vec<u8>,
}

impl TrainedModel {
    pub fn new(data: Vec<u8>, index: Vec<u8>) -> Self {
        Self { data, index }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn index(&self) -> &[u8] {
        &self.index
    }

    /// Write the two blobs out to sibling files named
    /// `<model>.data-00000-of-00001` and `<model>.index`.
    pub async fn write_vectors(&self, model_name: &str) -> Result<()> {
        tokio::fs::write(build_file_name(model_name, DATA_FILE_EXTENSION), &self.data).await?;
        tokio::fs::write(build_file_name(model_name, INDEX_FILE_EXTENSION), &self.index).await?;
        Ok(())
    }

    pub async fn read_vectors(model_name: &str) -> Result<Self> {
        let data = tokio::fs::read(build_file_name(model_name, DATA_FILE_EXTENSION)).await?;
        let index = tokio::fs::read(build_file_name(model_name, INDEX_FILE_EXTENSION)).await?;
        Ok(Self { data, index })
    }

    fn write_sync<W: IoWrite>(&self, w: &mut Writer<'_, W>) -> Result<()> {
        w.write_vec_u8(&self.data)?;
        w.write_vec_u8(&self.index)?;
        Ok(())
    }

    fn read_sync<R: IoRead>(r: &mut Reader<'_, R>) -> Result<Self> {
        let data = r.read_vec_u8()?;
        let index = r.read_vec_u8()?;
        Ok(Self { data, index })
    }
}

/// Strip any existing extension from `model_name` and append `.{extension}`.
fn build_file_name(model_name: &str, extension: &str) -> PathBuf {
    let path = Path::new(model_name);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| model_name.to_string());
    let base = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.join(stem),
        _ => PathBuf::from(stem),
    };
    base.with_extension(extension)
}

#[derive(Debug, Clone)]
pub struct GenerativeModel {
    version: i32,
    n_training_iterations: i32,
    n_initialization_iterations: i32,
    n_hidden_layer_units: i32,
    learning_rate: f32,
    dropout: f32,
    data_source: DataSource,
    trained_model: TrainedModel,
}

impl GenerativeModel {
    pub fn new(data_source: DataSource) -> Self {
        Self {
            version: VERSION,
            n_training_iterations: 0,
            n_initialization_iterations: 0,
            n_hidden_layer_units: 0,
            learning_rate: 0.0,
            dropout: 0.0,
            data_source,
            trained_model: TrainedModel::default(),
        }
    }

    pub fn data_source(&self) -> &DataSource {
        &self.data_source
    }

    pub fn trained_model(&self) -> &TrainedModel {
        &self.trained_model
    }

    pub fn set_trained_model(&mut self, trained_model: TrainedModel) {
        self.trained_model = trained_model;
    }

    pub fn n_training_iterations(&self) -> i32 {
        self.n_training_iterations
    }

    pub fn set_n_training_iterations(&mut self, value: i32) {
        self.n_training_iterations = value;
    }

    pub fn n_initialization_iterations(&self) -> i32 {
        self.n_initialization_iterations
    }

    pub fn set_n_initialization_iterations(&mut self, value: i32) {
        self.n_initialization_iterations = value;
    }

    pub fn n_hidden_layer_units(&self) -> i32 {
        self.n_hidden_layer_units
    }

    pub fn set_n_hidden_layer_units(&mut self, value: i32) {
        self.n_hidden_layer_units = value;
    }

    pub fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    pub fn set_learning_rate(&mut self, value: f32) {
        self.learning_rate = value;
    }

    pub fn dropout(&self) -> f32 {
        self.dropout
    }

    pub fn set_dropout(&mut self, value: f32) {
        self.dropout = value;
    }

    /// Writes the full record (hyperparameters, data source, and the two
    /// trained-model blobs) to `w`.
    pub fn write<W: IoWrite>(&self, w: &mut W) -> Result<()> {
        let mut writer = Writer::new(w);
        writer.write_string(TYPE_ID)?;
        writer.write_i32(self.version)?;
        writer.write_i32(self.n_training_iterations)?;
        writer.write_i32(self.n_initialization_iterations)?;
        writer.write_i32(self.n_hidden_layer_units)?;
        writer.write_f32(self.learning_rate)?;
        writer.write_f32(self.dropout)?;
        self.data_source.write_body(&mut writer)?;
        self.trained_model.write_sync(&mut writer)?;
        Ok(())
    }

    /// Reads the full record from `r`, then writes the two trained-model
    /// blobs back out to sibling files named after `model_name` for the
    /// external trainer to pick up.
    pub async fn read<R: IoRead>(r: &mut R, model_name: &str) -> Result<Self> {
        let mut reader = Reader::new(r);
        let type_id = reader.read_string()?;
        if type_id != TYPE_ID {
            return Err(Error::invalid_type_id(TYPE_ID, type_id));
        }
        let version = reader.read_i32()?;
        let n_training_iterations = reader.read_i32()?;
        let n_initialization_iterations = reader.read_i32()?;
        let n_hidden_layer_units = reader.read_i32()?;
        let learning_rate = reader.read_f32()?;
        let dropout = reader.read_f32()?;
        let data_source = DataSource::read_body(&mut reader)?;
        let trained_model = TrainedModel::read_sync(&mut reader)?;

        trained_model.write_vectors(model_name).await?;

        Ok(Self {
            version,
            n_training_iterations,
            n_initialization_iterations,
            n_hidden_layer_units,
            learning_rate,
            dropout,
            data_source,
            trained_model,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ColumnType;

    #[test]
    fn build_file_name_strips_existing_extension() {
        assert_eq!(
            build_file_name("model.v2", DATA_FILE_EXTENSION).to_string_lossy(),
            "model.data-00000-of-00001"
        );
        assert_eq!(
            build_file_name("model", INDEX_FILE_EXTENSION).to_string_lossy(),
            "model.index"
        );
    }

    #[tokio::test]
    async fn model_record_round_trip_writes_sibling_files() {
        let dir = tempfile::tempdir().unwrap();
        let model_path = dir.path().join("mymodel");
        let model_name = model_path.to_string_lossy().into_owned();

        let ds = DataSource::new(&[ColumnType::Numerical], &["a".to_string()]);
        let mut model = GenerativeModel::new(ds);
        model.set_trained_model(TrainedModel::new(vec![1, 2, 3], vec![4, 5]));
        model.set_learning_rate(0.01);

        let mut buf = Vec::new();
        model.write(&mut buf).unwrap();

        let mut cursor = std::io::Cursor::new(buf);
        let back = GenerativeModel::read(&mut cursor, &model_name).await.unwrap();
        assert_eq!(back.learning_rate(), 0.01);
        assert_eq!(back.trained_model().data(), &[1, 2, 3]);

        assert!(dir.path().join("mymodel.data-00000-of-00001").exists());
        assert!(dir.path().join("mymodel.index").exists());
    }
}
