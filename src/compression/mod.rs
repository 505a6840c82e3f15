pub mod extractive;

pub use extractive::{compress_extractive, split_sentences};
