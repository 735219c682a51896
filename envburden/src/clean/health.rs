use log::{debug, info, warn};
use polars::prelude::*;

use super::{by_country_year, Clean, CleaningContext};
use crate::config::{HealthConfig, YearSpan};
use crate::error::{EnvBurdenError, Result};
use crate::reshape::{
    column_names, complete_cases, drop_last_row, ensure_unique, parse_numeric_with_placeholders,
    unpivot, year_columns,
};
use crate::resolver::add_iso3_column;
use crate::{Source, COL};

/// Cleaner for the World Bank health expenditure extract: one row per country, one column per
/// year, a source attribution footer and stray export columns.
#[derive(Debug, Clone)]
pub struct HealthExpCleaner {
    years: YearSpan,
    config: HealthConfig,
}

impl HealthExpCleaner {
    pub fn new(years: YearSpan, config: HealthConfig) -> Self {
        Self { years, config }
    }

    fn drop_stray_columns(&self, df: DataFrame) -> DataFrame {
        let present = column_names(&df);
        let (found, absent): (Vec<&String>, Vec<&String>) = self
            .config
            .stray_columns
            .iter()
            .partition(|column| present.contains(column));
        if !absent.is_empty() {
            debug!("Stray columns not present in health extract: {absent:?}");
        }
        df.drop_many(found.as_slice())
    }
}

impl Clean for HealthExpCleaner {
    fn source(&self) -> Source {
        Source::Health
    }

    fn clean(&self, raw: DataFrame, ctx: &CleaningContext<'_>) -> Result<DataFrame> {
        let table = self.source();
        let mut df = self.drop_stray_columns(drop_last_row(&raw));

        let first_column = column_names(&df)
            .into_iter()
            .next()
            .ok_or_else(|| EnvBurdenError::SchemaDrift {
                table: table.to_string(),
                column: COL::COUNTRY.to_string(),
            })?;
        df.rename(&first_column, COL::COUNTRY)?;
        ctx.mappings.apply_country_mapping(&mut df, COL::COUNTRY)?;

        let all_years = year_columns(&df, "");
        if let Some(missing) = self
            .years
            .years()
            .find(|year| !all_years.iter().any(|(_, found)| found == year))
        {
            return Err(EnvBurdenError::SchemaDrift {
                table: table.to_string(),
                column: missing.to_string(),
            });
        }
        let ignored: Vec<String> = column_names(&df)
            .into_iter()
            .filter(|name| name != COL::COUNTRY && !all_years.iter().any(|(c, _)| c == name))
            .collect();
        if !ignored.is_empty() {
            warn!("Ignoring unexpected columns in health extract: {ignored:?}");
        }
        let year_columns: Vec<(String, i64)> = all_years
            .into_iter()
            .filter(|(_, year)| self.years.contains(*year))
            .collect();

        let span_columns: Vec<&str> = year_columns.iter().map(|(name, _)| name.as_str()).collect();
        let mut parsed = vec![col(COL::COUNTRY)];
        parsed.extend(span_columns.iter().map(|name| parse_numeric_with_placeholders(name)));
        let countries = df.height();
        let complete = df
            .lazy()
            .select(parsed)
            .filter(complete_cases(&span_columns))
            .collect()?;
        if complete.height() < countries {
            warn!(
                "{} countries dropped for missing health expenditure in {}-{}",
                countries - complete.height(),
                self.years.start,
                self.years.end
            );
        }

        let on: Vec<(String, Expr)> = year_columns
            .iter()
            .map(|(name, year)| (name.clone(), lit(*year).cast(DataType::Int64)))
            .collect();
        let mut long = unpivot(&complete.lazy(), &[COL::COUNTRY], &on, COL::YEAR, COL::HEALTH_EXP)?
            .filter(
                col(COL::YEAR)
                    .gt_eq(lit(self.years.start))
                    .and(col(COL::YEAR).lt_eq(lit(self.years.end))),
            )
            .collect()?;
        ensure_unique(&long, &[COL::COUNTRY, COL::YEAR], table.as_ref())?;

        add_iso3_column(&mut long, COL::COUNTRY, COL::ISO3, ctx.resolver)?;
        let cleaned = long
            .lazy()
            .select([
                col(COL::COUNTRY),
                col(COL::YEAR),
                col(COL::ISO3),
                col(COL::HEALTH_EXP),
            ])
            .sort_by_exprs(by_country_year(), SortMultipleOptions::default())
            .collect()?;
        info!(
            "Health expenditure cleaned: {} countries over {}-{}",
            cleaned.height() / self.years.years().count().max(1),
            self.years.start,
            self.years.end
        );
        Ok(cleaned)
    }
}
