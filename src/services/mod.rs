pub mod encoder;
pub mod image_processor;
pub mod prompt_client;

pub use encoder::FileEncoder;
pub use image_processor::ImageProcessor;
pub use prompt_client::{GeminiClient, PromptModel};
