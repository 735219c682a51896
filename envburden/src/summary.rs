use polars::prelude::*;
use serde::Serialize;

use crate::error::Result;
use crate::reshape::{column_names, require_columns};

pub const DALY_UNIT: &str = "DALY per 100,000";
const DALY_PREFIX: &str = "DALY_";

/// Descriptive statistics of one indicator over every country-year of the dataset
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorSummary {
    pub indicator: String,
    pub count: usize,
    pub mean: Option<f64>,
    pub median: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub unit: &'static str,
}

/// Burden of disease indicator columns of the canonical dataset
pub fn daly_indicators(dataset: &DataFrame) -> Vec<String> {
    column_names(dataset)
        .into_iter()
        .filter(|name| name.starts_with(DALY_PREFIX))
        .collect()
}

pub fn summary_statistics<S: AsRef<str>>(
    dataset: &DataFrame,
    indicators: &[S],
) -> Result<Vec<IndicatorSummary>> {
    require_columns(dataset, indicators, "dataset")?;
    indicators
        .iter()
        .map(|indicator| {
            let name = indicator.as_ref();
            let value = col(name).cast(DataType::Float64);
            let stats = dataset
                .clone()
                .lazy()
                .select([
                    value.clone().mean().alias("mean"),
                    value.clone().median().alias("median"),
                    value.clone().std(1).alias("std"),
                    value.clone().min().alias("min"),
                    value.max().alias("max"),
                ])
                .collect()?;
            let get = |stat: &str| -> Result<Option<f64>> {
                Ok(stats.column(stat)?.cast(&DataType::Float64)?.f64()?.get(0))
            };
            let column = dataset.column(name)?;
            Ok(IndicatorSummary {
                indicator: name.to_string(),
                count: column.len() - column.null_count(),
                mean: get("mean")?,
                median: get("median")?,
                std: get("std")?,
                min: get("min")?,
                max: get("max")?,
                unit: DALY_UNIT,
            })
        })
        .collect()
}
