mod fine_engine;

pub use fine_engine::FineEngine;
