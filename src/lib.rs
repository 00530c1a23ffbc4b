pub mod attack;
pub mod convergence;
pub mod distinguishers;
pub mod error;
pub mod leakage_model;
pub mod ranking;
pub mod shared;
pub mod util;

pub use error::{Error, Result};
