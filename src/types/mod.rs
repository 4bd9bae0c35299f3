//! Public request/response types for the scoring API.

mod model;
mod predict;

pub use model::{ModelBlock, ModelInfo, SCHEMA_VERSION};
pub use predict::{
    DEFAULT_CHANNEL, ErrorResponse, Features, InputItem, PredictRequest, PredictResponse,
    Prediction,
};
