mod settings;

pub use settings::{DatabaseConfig, GenerationConfig, MemoryConfig, Settings};
