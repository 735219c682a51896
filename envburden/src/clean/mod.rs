//! Per-source cleaners turning a raw extract into a table keyed by (country, year).

use enum_dispatch::enum_dispatch;
use polars::prelude::*;

use crate::config::Config;
use crate::error::Result;
use crate::mapping::NameMappings;
use crate::resolver::CountryCodeResolver;
use crate::Source;

mod burden;
mod environment;
mod health;

pub use burden::EnvBurdenCleaner;
pub use environment::EnvExpCleaner;
pub use health::HealthExpCleaner;

/// Lookup tables shared by every cleaner of a run
#[derive(Clone, Copy)]
pub struct CleaningContext<'a> {
    pub mappings: &'a NameMappings,
    pub resolver: &'a dyn CountryCodeResolver,
}

#[enum_dispatch]
pub trait Clean {
    fn source(&self) -> Source;
    /// Cleans a raw extract. The input is consumed and the output is sorted by (country, year)
    /// so that the same input always produces the same table.
    fn clean(&self, raw: DataFrame, ctx: &CleaningContext<'_>) -> Result<DataFrame>;
}

#[enum_dispatch(Clean)]
#[derive(Debug, Clone)]
pub enum SourceCleaner {
    Health(HealthExpCleaner),
    Environment(EnvExpCleaner),
    Burden(EnvBurdenCleaner),
}

impl SourceCleaner {
    pub fn from_config(source: Source, config: &Config) -> Self {
        match source {
            Source::Health => HealthExpCleaner::new(config.years, config.health.clone()).into(),
            Source::Environment => {
                EnvExpCleaner::new(config.years, config.environment.clone()).into()
            }
            Source::Burden => EnvBurdenCleaner::new(config.burden.clone()).into(),
        }
    }
}

/// Sort expressions putting rows in (country, year) order
pub(crate) fn by_country_year() -> Vec<Expr> {
    vec![col(crate::COL::COUNTRY), col(crate::COL::YEAR)]
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::HashMap;

    use crate::mapping::NameMappings;

    pub fn resolver(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(name, code)| (name.to_string(), code.to_string()))
            .collect()
    }

    pub fn mappings(countries: &[(&str, &str)], variables: &[(&str, &str)]) -> NameMappings {
        let to_map = |pairs: &[(&str, &str)]| {
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect()
        };
        NameMappings::new(to_map(countries), to_map(variables))
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn cleaner_matches_its_source() {
        let config = Config::default();
        for source in Source::iter() {
            assert_eq!(SourceCleaner::from_config(source, &config).source(), source);
        }
    }
}
