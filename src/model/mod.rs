pub mod candle;
pub mod generator;
pub mod slot;
pub mod text_pipeline;

pub use generator::{GenerationOptions, ModelHandle, ModelLoader, TextGenerator};
pub use slot::ModelSlot;
