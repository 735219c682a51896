//! Read-only view of the canonical dataset prepared for the dashboard charts.

use itertools::Itertools;
use log::debug;
use polars::prelude::*;

use crate::error::{EnvBurdenError, Result};
use crate::reshape::{column_names, require_columns, unpivot};
use crate::COL;

const TABLE: &str = "dashboard";

/// Canonical feature name to the label shown on the dashboard
pub const DISPLAY_NAMES: [(&str, &str); 12] = [
    (COL::HEALTH_EXP, COL::DISPLAY_HEALTH),
    (COL::ENV_EXP_TOTAL, COL::DISPLAY_ENVIRONMENT),
    ("DALY_OZONE_POLLUTION", "Ozone Pollution"),
    ("DALY_HIGH_TEMP", "High Temperature"),
    ("DALY_LEAD_EXPOSURE", "Lead Exposure"),
    ("DALY_LOW_TEMP", "Low Temperature"),
    (
        "DALY_NO_ACCESS_HANDWASHING",
        "No Access to Handwashing Facilities",
    ),
    (
        "DALY_PARTICULATE_MATTER_POLLUTION",
        "Particulate Matter Pollution",
    ),
    ("DALY_RESIDENTIAL_RADON", "Residential Radon"),
    ("DALY_UNSAFE_SANITATION", "Unsafe Sanitation Facilities"),
    ("DALY_UNSAFE_WATER_SOURCE", "Unsafe Water Sources"),
    (COL::ISO3, COL::DISPLAY_ISO3),
];

/// Display label of a canonical feature; features without a label keep their name
pub fn display_name(feature: &str) -> &str {
    DISPLAY_NAMES
        .iter()
        .find(|(name, _)| *name == feature)
        .map(|(_, label)| *label)
        .unwrap_or(feature)
}

/// The canonical dataset under display names plus the long expenditure table and the
/// selectable countries, years and indicators. Built once and never modified.
#[derive(Debug, Clone)]
pub struct DisplayDataset {
    pub global: DataFrame,
    /// `country, year, exp_type, exp_value` with `exp_type` one of Health, Environment or Other
    pub expenditures: DataFrame,
    pub indicators: Vec<String>,
    pub countries: Vec<String>,
    pub years: Vec<i64>,
}

pub fn build_dashboard_dataset(canonical: &DataFrame) -> Result<DisplayDataset> {
    require_columns(
        canonical,
        &[
            COL::COUNTRY,
            COL::YEAR,
            COL::ISO3,
            COL::HEALTH_EXP,
            COL::ENV_EXP_TOTAL,
        ],
        TABLE,
    )?;

    let mut global = canonical.clone();
    for name in column_names(canonical) {
        let label = display_name(&name);
        if label != name {
            global.rename(&name, label)?;
        }
    }

    let fixed = [
        COL::COUNTRY,
        COL::YEAR,
        COL::DISPLAY_ISO3,
        COL::DISPLAY_HEALTH,
        COL::DISPLAY_ENVIRONMENT,
    ];
    let indicators: Vec<String> = column_names(&global)
        .into_iter()
        .filter(|name| !fixed.contains(&name.as_str()))
        .collect();
    let countries: Vec<String> = global
        .column(COL::COUNTRY)?
        .str()?
        .into_iter()
        .flatten()
        .unique()
        .sorted()
        .map(String::from)
        .collect();
    let years: Vec<i64> = global
        .column(COL::YEAR)?
        .i64()?
        .into_iter()
        .flatten()
        .unique()
        .sorted()
        .collect();

    let other = lit(100.0) - (col(COL::DISPLAY_HEALTH) + col(COL::DISPLAY_ENVIRONMENT));
    let shares = global.clone().lazy().with_column(other.alias(COL::DISPLAY_OTHER));
    let on = [
        (COL::DISPLAY_HEALTH.to_string(), lit("Health")),
        (COL::DISPLAY_ENVIRONMENT.to_string(), lit("Environment")),
        (COL::DISPLAY_OTHER.to_string(), lit(COL::DISPLAY_OTHER)),
    ];
    let expenditures = unpivot(
        &shares,
        &[COL::COUNTRY, COL::YEAR],
        &on,
        COL::EXP_TYPE,
        COL::EXP_VALUE,
    )?
    .collect()?;

    debug!(
        "Dashboard dataset: {} countries, {} years, {} indicators",
        countries.len(),
        years.len(),
        indicators.len()
    );
    Ok(DisplayDataset {
        global,
        expenditures,
        indicators,
        countries,
        years,
    })
}

/// Pearson correlation over the pairs where both values are present. `None` when fewer than two
/// pairs remain or either side is constant.
fn pearson(xs: &[Option<f64>], ys: &[Option<f64>]) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = xs
        .iter()
        .zip(ys)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .collect();
    if pairs.len() < 2 {
        return None;
    }
    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|(_, y)| y).sum::<f64>() / n;
    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (x, y) in &pairs {
        cov += (x - mean_x) * (y - mean_y);
        var_x += (x - mean_x).powi(2);
        var_y += (y - mean_y).powi(2);
    }
    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    Some(cov / (var_x * var_y).sqrt())
}

impl DisplayDataset {
    fn require_indicator(&self, indicator: &str) -> Result<()> {
        if self.indicators.iter().any(|name| name == indicator) {
            Ok(())
        } else {
            Err(EnvBurdenError::SchemaDrift {
                table: TABLE.to_string(),
                column: indicator.to_string(),
            })
        }
    }

    fn values(df: &DataFrame, column: &str) -> Result<Vec<Option<f64>>> {
        Ok(df
            .column(column)?
            .cast(&DataType::Float64)?
            .f64()?
            .into_iter()
            .collect())
    }

    /// Health, environment and other expenditure shares of a country-year (pie chart)
    pub fn expenditure_composition(&self, country: &str, year: i64) -> Result<DataFrame> {
        Ok(self
            .expenditures
            .clone()
            .lazy()
            .filter(col(COL::COUNTRY).eq(lit(country)).and(col(COL::YEAR).eq(lit(year))))
            .select([col(COL::EXP_TYPE), col(COL::EXP_VALUE)])
            .collect()?)
    }

    /// Correlation of each indicator with both expenditure columns across the years of a
    /// country (heatmap)
    pub fn expense_correlations<S: AsRef<str>>(
        &self,
        country: &str,
        indicators: &[S],
    ) -> Result<DataFrame> {
        for indicator in indicators {
            self.require_indicator(indicator.as_ref())?;
        }
        let rows = self
            .global
            .clone()
            .lazy()
            .filter(col(COL::COUNTRY).eq(lit(country)))
            .collect()?;
        let health = Self::values(&rows, COL::DISPLAY_HEALTH)?;
        let environment = Self::values(&rows, COL::DISPLAY_ENVIRONMENT)?;

        let mut with_health = vec![];
        let mut with_environment = vec![];
        for indicator in indicators {
            let values = Self::values(&rows, indicator.as_ref())?;
            with_health.push(pearson(&values, &health));
            with_environment.push(pearson(&values, &environment));
        }
        let names: Vec<&str> = indicators.iter().map(|name| name.as_ref()).collect();
        Ok(DataFrame::new(vec![
            Series::new(COL::INDICATOR, names),
            Series::new(COL::DISPLAY_HEALTH, with_health),
            Series::new(COL::DISPLAY_ENVIRONMENT, with_environment),
        ])?)
    }

    /// `country, iso3_code, value` of one indicator for every country in a year (choropleth)
    pub fn indicator_map(&self, year: i64, indicator: &str) -> Result<DataFrame> {
        self.require_indicator(indicator)?;
        Ok(self
            .global
            .clone()
            .lazy()
            .filter(col(COL::YEAR).eq(lit(year)))
            .select([
                col(COL::COUNTRY),
                col(COL::DISPLAY_ISO3),
                col(indicator).alias(COL::VALUE),
            ])
            .collect()?)
    }

    /// `year, value` of one indicator for a country (line chart)
    pub fn indicator_trend(&self, country: &str, indicator: &str) -> Result<DataFrame> {
        self.require_indicator(indicator)?;
        Ok(self
            .global
            .clone()
            .lazy()
            .filter(col(COL::COUNTRY).eq(lit(country)))
            .select([col(COL::YEAR), col(indicator).alias(COL::VALUE)])
            .sort_by_exprs(vec![col(COL::YEAR)], SortMultipleOptions::default())
            .collect()?)
    }
}
