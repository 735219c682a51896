use envburden::error::EnvBurdenError;
use polars::error::PolarsError;

#[derive(thiserror::Error, Debug)]
pub enum EnvBurdenCliError {
    #[error("Anyhow error: {0:#}")]
    Anyhow(#[from] anyhow::Error),
    #[error("envburden error: {0}")]
    EnvBurdenError(#[from] EnvBurdenError),
    #[error("polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("Invalid TOML in config file: {0}")]
    TomlError(#[from] toml::de::Error),
    #[error("std IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("No data for country '{0}' in the dataset")]
    UnknownCountry(String),
}

pub type EnvBurdenCliResult<T> = Result<T, EnvBurdenCliError>;
