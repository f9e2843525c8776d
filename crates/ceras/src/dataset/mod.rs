//! Datasets - Loaders for Standard Benchmarks
//!
//! @version 0.1.0
//! @author Ceras Development Team

pub mod mnist;

pub use mnist::MnistData;
