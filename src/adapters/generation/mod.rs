//! Image generation adapters.

pub mod openai_images;

pub use openai_images::OpenAiImageGenerator;
