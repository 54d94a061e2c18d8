pub mod engine;
pub mod fields;

pub use engine::EngineConfig;
pub use fields::{DocumentFields, FieldRuleSet};
