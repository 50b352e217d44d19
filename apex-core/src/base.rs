//! Core functionalities.
mod env;
mod experience;
mod model;
use anyhow::Result;
pub use env::{EnvStep, Environment};
pub use experience::Experience;
pub use model::{TrainOutput, TrainableModel, WeightSnapshot};
use serde::de::DeserializeOwned;
use std::path::Path;

/// An object that can be built from a configuration.
///
/// The configuration can also be loaded from a YAML file, which is how
/// training runs are usually parameterized.
pub trait Configurable: Sized {
    /// Configuration.
    type Config: Clone + DeserializeOwned;

    /// Builds the object.
    fn build(config: Self::Config) -> Self;

    /// Builds the object with the configuration in the YAML file of the given path.
    fn build_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let rdr = std::io::BufReader::new(file);
        let config = serde_yaml::from_reader(rdr)?;
        Ok(Self::build(config))
    }
}
