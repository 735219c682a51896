use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Inclusive range of years retained by the expenditure cleaners
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearSpan {
    pub start: i64,
    pub end: i64,
}

impl YearSpan {
    pub fn contains(&self, year: i64) -> bool {
        (self.start..=self.end).contains(&year)
    }

    pub fn years(&self) -> impl Iterator<Item = i64> {
        self.start..=self.end
    }
}

impl Default for YearSpan {
    fn default() -> Self {
        YearSpan {
            start: 2010,
            end: 2019,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct HealthConfig {
    /// Non-data columns present in the World Bank extract
    pub stray_columns: Vec<String>,
    pub raw_file: String,
    pub interim_file: String,
}

impl Default for HealthConfig {
    fn default() -> Self {
        HealthConfig {
            stray_columns: vec!["Unnamed: 11".into()],
            raw_file: "Data_Extract_From_World_Development_Indicators.csv".into(),
            interim_file: "WorldBank-DataBank_HealthExpenditure_Global_1990_2022.csv".into(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct EnvironmentConfig {
    pub url: String,
    pub raw_file: String,
    /// The only unit kept from the IMF extract
    pub unit: String,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        EnvironmentConfig {
            url: "https://opendata.arcgis.com/datasets/d22a6decd9b147fd9040f793082b219b_0.csv"
                .into(),
            raw_file: "IMF-CCD_EnvironmentalExpenditures_Global_1995_2022.csv".into(),
            unit: "Percent of GDP".into(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct BurdenConfig {
    pub file_prefix: String,
    pub num_extracts: usize,
    pub columns_to_remove: Vec<String>,
    /// Composite indicators already represented by their components
    pub indicators_to_remove: Vec<String>,
}

impl Default for BurdenConfig {
    fn default() -> Self {
        BurdenConfig {
            file_prefix: "IHME-GBD".into(),
            num_extracts: 2,
            columns_to_remove: [
                "measure_id",
                "measure_name",
                "location_id",
                "sex_id",
                "sex_name",
                "age_id",
                "age_name",
                "cause_id",
                "cause_name",
                "rei_id",
                "metric_id",
                "metric_name",
                "upper",
                "lower",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            indicators_to_remove: vec![
                "Unsafe water, sanitation, and handwashing".into(),
                "Non-optimal temperature".into(),
            ],
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub raw_dir: PathBuf,
    pub interim_dir: PathBuf,
    pub processed_dir: PathBuf,
    pub dataset_path: PathBuf,
    pub country_mapping_path: PathBuf,
    pub variable_mapping_path: PathBuf,
    pub years: YearSpan,
    pub health: HealthConfig,
    pub environment: EnvironmentConfig,
    pub burden: BurdenConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            raw_dir: "data/raw".into(),
            interim_dir: "data/interim".into(),
            processed_dir: "data/processed".into(),
            dataset_path: "data/datasets/env_burden_data.csv".into(),
            country_mapping_path: "data/mappings/country_name_mapping.json".into(),
            variable_mapping_path: "data/mappings/variable_name_mapping.json".into(),
            years: YearSpan::default(),
            health: HealthConfig::default(),
            environment: EnvironmentConfig::default(),
            burden: BurdenConfig::default(),
        }
    }
}

impl Config {
    /// Re-roots every relative path of the configuration under `root`
    pub fn with_data_root<P: Into<PathBuf>>(mut self, root: P) -> Self {
        let root = root.into();
        for path in [
            &mut self.raw_dir,
            &mut self.interim_dir,
            &mut self.processed_dir,
            &mut self.dataset_path,
            &mut self.country_mapping_path,
            &mut self.variable_mapping_path,
        ] {
            if path.is_relative() {
                *path = root.join(&*path);
            }
        }
        self
    }
}
