pub mod image;
pub mod openai;

pub use image::*;
pub use openai::*;
