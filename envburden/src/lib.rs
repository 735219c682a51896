use anyhow::{Context, Result};
use log::{debug, info};
use polars::frame::DataFrame;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

use crate::clean::{Clean, CleaningContext, SourceCleaner};
use crate::config::Config;
use crate::mapping::NameMappings;
use crate::merge::{merge_sources, MergeReport};
use crate::resolver::Iso3166;

// Re-exports
pub use column_names as COL;

// Modules
pub mod clean;
pub mod column_names;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod mapping;
pub mod merge;
pub mod reshape;
pub mod resolver;
pub mod sources;
pub mod summary;

/// The three upstream datasets joined into the canonical dataset
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    AsRefStr,
    Display,
    EnumIter,
    EnumString,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Source {
    /// World Bank health expenditure (% of GDP)
    Health,
    /// IMF environmental protection expenditure (% of GDP)
    Environment,
    /// IHME environmental burden of disease (DALYs per 100,000)
    Burden,
}

impl Source {
    /// File name of the cleaned snapshot in the processed data folder
    pub fn checkpoint_file(&self) -> &'static str {
        match self {
            Source::Health => "health_exp_clean.csv",
            Source::Environment => "env_exp_clean.csv",
            Source::Burden => "env_burden_clean.csv",
        }
    }
}

/// Entry point to the pipeline: configuration plus the lookup tables loaded once per run
pub struct EnvBurden {
    pub config: Config,
    pub mappings: NameMappings,
    resolver: Iso3166,
}

impl EnvBurden {
    /// Setup with default configuration
    pub fn new() -> Result<Self> {
        Self::new_with_config(Config::default())
    }

    /// Setup with custom configuration, loading the name mappings it points to
    pub fn new_with_config(config: Config) -> Result<Self> {
        debug!("config: {config:?}");
        let mappings =
            NameMappings::from_files(&config.country_mapping_path, &config.variable_mapping_path)
                .context("Failed to load name mappings")?;
        Self::new_with_mappings(config, mappings)
    }

    /// Setup with custom configuration and already loaded name mappings
    pub fn new_with_mappings(config: Config, mappings: NameMappings) -> Result<Self> {
        let resolver = Iso3166::new().context("Failed to load ISO 3166-1 table")?;
        Ok(Self {
            config,
            mappings,
            resolver,
        })
    }

    pub fn context(&self) -> CleaningContext<'_> {
        CleaningContext {
            mappings: &self.mappings,
            resolver: &self.resolver,
        }
    }

    /// Loads the raw extract of `source` from its upstream location
    pub async fn load_raw(&self, source: Source) -> Result<DataFrame> {
        let raw = match source {
            Source::Health => sources::load_health_exp(&self.config),
            Source::Environment => sources::fetch_env_exp(&self.config).await,
            Source::Burden => sources::load_env_burden(&self.config),
        }
        .with_context(|| format!("Failed to load raw {source} data"))?;
        info!("Loaded raw {source} data with shape: {:?}", raw.shape());
        Ok(raw)
    }

    /// Cleans a raw extract and writes the cleaned snapshot to the processed data folder
    pub fn clean(&self, source: Source, raw: DataFrame) -> Result<DataFrame> {
        let cleaner = SourceCleaner::from_config(source, &self.config);
        let mut cleaned = cleaner
            .clean(raw, &self.context())
            .with_context(|| format!("Failed to clean {source} data"))?;
        let path = self.config.processed_dir.join(source.checkpoint_file());
        sources::write_checkpoint(&mut cleaned, &path)?;
        info!(
            "Cleaned {source} data with shape {:?} saved to {}",
            cleaned.shape(),
            path.display()
        );
        Ok(cleaned)
    }

    /// Loads, cleans and checkpoints a single source
    pub async fn clean_source(&self, source: Source) -> Result<DataFrame> {
        let raw = self.load_raw(source).await?;
        self.clean(source, raw)
    }

    /// Joins the three cleaned tables and writes the canonical dataset
    pub fn merge(
        &self,
        health: &DataFrame,
        environment: &DataFrame,
        burden: &DataFrame,
    ) -> Result<(DataFrame, MergeReport)> {
        let (mut dataset, report) = merge_sources(health, environment, burden)?;
        sources::write_checkpoint(&mut dataset, &self.config.dataset_path)?;
        info!(
            "Merged dataset with shape {:?} saved to {}",
            dataset.shape(),
            self.config.dataset_path.display()
        );
        Ok((dataset, report))
    }

    /// Joins the cleaned snapshots previously written by `clean`
    pub fn merge_checkpoints(&self) -> Result<(DataFrame, MergeReport)> {
        let read = |source: Source| {
            let path = self.config.processed_dir.join(source.checkpoint_file());
            sources::read_checkpoint(&path)
                .with_context(|| format!("Failed to read cleaned {source} data"))
        };
        let health = read(Source::Health)?;
        let environment = read(Source::Environment)?;
        let burden = read(Source::Burden)?;
        self.merge(&health, &environment, &burden)
    }

    /// Recomputes the canonical dataset from the raw extracts. Sources are processed one after
    /// the other and any failure aborts the run.
    pub async fn run(&self) -> Result<(DataFrame, MergeReport)> {
        let health = self.clean_source(Source::Health).await?;
        let environment = self.clean_source(Source::Environment).await?;
        let burden = self.clean_source(Source::Burden).await?;
        self.merge(&health, &environment, &burden)
    }

    /// Reads the canonical dataset written by `merge`
    pub fn load_dataset(&self) -> Result<DataFrame> {
        sources::read_checkpoint(&self.config.dataset_path).with_context(|| {
            format!(
                "Failed to read dataset from {}",
                self.config.dataset_path.display()
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::str::FromStr;

    use httpmock::prelude::*;
    use itertools::Itertools;
    use tempfile::TempDir;

    use super::*;
    use crate::reshape::column_names;

    const YEARS: std::ops::RangeInclusive<i64> = 2010..=2019;

    #[test]
    fn source_should_parse_case_insensitively() {
        assert_eq!(Source::from_str("health").unwrap(), Source::Health);
        assert_eq!(Source::from_str("Environment").unwrap(), Source::Environment);
        assert_eq!(Source::from_str("BURDEN").unwrap(), Source::Burden);
        assert!(Source::from_str("weather").is_err());
        assert_eq!(Source::Environment.to_string(), "environment");
        assert_eq!(Source::Burden.as_ref(), "burden");
    }

    fn health_csv() -> String {
        let mut csv = format!("Country Name,{},Unnamed: 11\n", YEARS.clone().join(","));
        for (country, gap) in [("Korea, Rep.", false), ("Viet Nam", false), ("Chad", true)] {
            let values = YEARS
                .clone()
                .map(|year| match year {
                    2015 if gap => "..".to_string(),
                    _ => format!("{}.5", year - 2005),
                })
                .join(",");
            csv.push_str(&format!("\"{country}\",{values},\n"));
        }
        csv.push_str("Data from database: World Development Indicators,,,,,,,,,,,\n");
        csv
    }

    fn imf_csv(mappings: &NameMappings) -> String {
        let categories = mappings
            .variables
            .iter()
            .filter(|(_, name)| name.starts_with("ENV_EXP_"))
            .map(|(category, _)| category.clone())
            .sorted()
            .collect_vec();
        let mut csv = format!(
            "ObjectId,Country,ISO3,Unit,CTS_Name,{}\n",
            YEARS.clone().map(|year| format!("F{year}")).join(",")
        );
        for (country, iso3) in [("Korea, Rep. of", "KOR"), ("Viet Nam", "VNM")] {
            for (unit, value) in [("Percent of GDP", "0.1"), ("Domestic Currency", "900")] {
                for category in &categories {
                    let values = YEARS.clone().map(|_| value).join(",");
                    csv.push_str(&format!(
                        "1,\"{country}\",{iso3},{unit},{category},{values}\n"
                    ));
                }
            }
        }
        csv
    }

    fn burden_csv(config: &Config) -> String {
        let metadata = &config.burden.columns_to_remove;
        let mut csv = format!(
            "{},location_name,rei_name,year,val\n",
            metadata.iter().join(",")
        );
        for country in ["Republic of Korea", "Viet Nam", "Chad"] {
            for year in YEARS {
                for (sex, rei) in [
                    ("Both", "Lead exposure"),
                    ("Male", "Lead exposure"),
                    ("Both", "Residential radon"),
                    ("Both", "Non-optimal temperature"),
                ] {
                    let fields = metadata
                        .iter()
                        .map(|name| if name == "sex_name" { sex } else { "1" })
                        .join(",");
                    csv.push_str(&format!("{fields},{country},{rei},{year},{year}.25\n"));
                }
            }
        }
        csv
    }

    async fn setup(dir: &TempDir, server: &MockServer) -> anyhow::Result<EnvBurden> {
        let mut config = Config::default().with_data_root(dir.path());
        let mappings_dir = concat!(env!("CARGO_MANIFEST_DIR"), "/../data/mappings");
        config.country_mapping_path = format!("{mappings_dir}/country_name_mapping.json").into();
        config.variable_mapping_path = format!("{mappings_dir}/variable_name_mapping.json").into();
        config.environment.url = server.url("/imf.csv");
        let envburden = EnvBurden::new_with_config(config)?;

        let config = &envburden.config;
        fs::create_dir_all(&config.raw_dir)?;
        fs::create_dir_all(&config.interim_dir)?;
        fs::write(config.raw_dir.join(&config.health.raw_file), health_csv())?;
        fs::write(
            config.interim_dir.join("IHME-GBD_2019_DATA-1.csv"),
            burden_csv(config),
        )?;
        let body = imf_csv(&envburden.mappings);
        server
            .mock_async(|when, then| {
                when.method(GET).path("/imf.csv");
                then.status(200).body(body);
            })
            .await;
        Ok(envburden)
    }

    #[tokio::test]
    async fn test_run_pipeline() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let server = MockServer::start_async().await;
        let envburden = setup(&dir, &server).await?;

        let (dataset, report) = envburden.run().await?;
        assert_eq!(
            column_names(&dataset),
            [
                COL::COUNTRY,
                COL::YEAR,
                COL::ISO3,
                COL::HEALTH_EXP,
                COL::ENV_EXP_TOTAL,
                "DALY_LEAD_EXPOSURE",
                "DALY_RESIDENTIAL_RADON"
            ]
        );
        assert_eq!(dataset.height(), 20);
        assert_eq!(report.merged_rows, 20);
        assert_eq!((report.health_rows, report.environment_rows), (20, 20));
        assert_eq!(report.burden_rows, 30);
        let countries = dataset
            .column(COL::COUNTRY)?
            .str()?
            .into_iter()
            .flatten()
            .unique()
            .collect_vec();
        assert_eq!(countries, ["South Korea", "Vietnam"]);
        let codes = dataset
            .column(COL::ISO3)?
            .str()?
            .into_iter()
            .flatten()
            .unique()
            .collect_vec();
        assert_eq!(codes, ["KOR", "VNM"]);
        for total in dataset.column(COL::ENV_EXP_TOTAL)?.f64()?.into_iter() {
            assert!((total.unwrap() - 0.7).abs() < 1e-9);
        }

        assert_eq!(envburden.load_dataset()?, dataset);
        let (from_checkpoints, _) = envburden.merge_checkpoints()?;
        assert_eq!(from_checkpoints, dataset);
        Ok(())
    }

    #[tokio::test]
    async fn test_cleaning_is_idempotent() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let server = MockServer::start_async().await;
        let envburden = setup(&dir, &server).await?;

        for source in [Source::Health, Source::Environment, Source::Burden] {
            let path = envburden.config.processed_dir.join(source.checkpoint_file());
            envburden.clean_source(source).await?;
            let first = fs::read(&path)?;
            envburden.clean_source(source).await?;
            assert_eq!(first, fs::read(&path)?, "{source} checkpoint changed");
        }
        Ok(())
    }
}
