//! Rule-based container health diagnosis.

pub mod causes;
pub mod engine;
pub mod thresholds;
pub mod types;
