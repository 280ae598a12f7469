pub mod classifier;
pub mod config;
pub mod error;
pub mod evaluate;
pub mod flowchart;
pub mod lemmatize;
pub mod llm;
pub mod normalize;
pub mod pipeline;
pub mod records;
pub mod rooms;
pub mod tokenize;
pub mod types;
pub mod vectorize;

pub use error::{CoreError, CoreResult};
pub use types::*;
