//! Generative data and generative models: the synthetic-row half of the
//! engine, fed by an externally trained generator that this crate does
//! not train.

pub mod data;
pub mod model;

pub use data::GenerativeData;
pub use model::{GenerativeModel, TrainedModel};
