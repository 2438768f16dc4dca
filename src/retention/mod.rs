mod engine;

pub use engine::RetentionEngine;
