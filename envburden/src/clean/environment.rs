use log::{info, warn};
use polars::prelude::*;

use super::{by_country_year, Clean, CleaningContext};
use crate::config::{EnvironmentConfig, YearSpan};
use crate::error::{EnvBurdenError, Result};
use crate::reshape::{
    complete_cases, ensure_unique, parse_numeric_with_placeholders, pivot_unique,
    require_columns, unpivot, year_columns,
};
use crate::{Source, COL};

/// Cleaner for the IMF environmental protection expenditure extract, where expenditure
/// categories are rows and years are `F`-prefixed columns.
#[derive(Debug, Clone)]
pub struct EnvExpCleaner {
    years: YearSpan,
    config: EnvironmentConfig,
}

impl EnvExpCleaner {
    pub fn new(years: YearSpan, config: EnvironmentConfig) -> Self {
        Self { years, config }
    }

    /// Year columns inside the span, failing if any year of the span is absent
    fn span_columns(&self, df: &DataFrame) -> Result<Vec<(String, i64)>> {
        let found = year_columns(df, COL::IMF_YEAR_PREFIX);
        if let Some(missing) = self
            .years
            .years()
            .find(|year| !found.iter().any(|(_, found)| found == year))
        {
            return Err(EnvBurdenError::SchemaDrift {
                table: self.source().to_string(),
                column: format!("{}{missing}", COL::IMF_YEAR_PREFIX),
            });
        }
        Ok(found
            .into_iter()
            .filter(|(_, year)| self.years.contains(*year))
            .collect())
    }

    /// Categories as rows and years as columns to one row per (country, year) with one
    /// column per category.
    fn categories_to_columns(&self, raw: DataFrame) -> Result<DataFrame> {
        let table = self.source();
        let span = self.span_columns(&raw)?;
        let names: Vec<&str> = span.iter().map(|(name, _)| name.as_str()).collect();

        let mut selected = vec![
            col(COL::IMF_COUNTRY),
            col(COL::IMF_ISO3),
            col(COL::IMF_CTS_NAME).alias(COL::IMF_EXPENDITURE_ID),
        ];
        selected.extend(names.iter().map(|name| parse_numeric_with_placeholders(name)));
        let percent_of_gdp = raw
            .lazy()
            .filter(col(COL::IMF_UNIT).eq(lit(self.config.unit.as_str())))
            .select(selected)
            .collect()?;
        let complete = percent_of_gdp
            .clone()
            .lazy()
            .filter(complete_cases(&names))
            .collect()?;
        if complete.height() < percent_of_gdp.height() {
            warn!(
                "{} expenditure rows dropped for missing values in {}-{}",
                percent_of_gdp.height() - complete.height(),
                self.years.start,
                self.years.end
            );
        }

        let on: Vec<(String, Expr)> = span
            .iter()
            .map(|(name, year)| (name.clone(), lit(*year).cast(DataType::Int64)))
            .collect();
        let long = unpivot(
            &complete.lazy(),
            &[COL::IMF_COUNTRY, COL::IMF_ISO3, COL::IMF_EXPENDITURE_ID],
            &on,
            COL::YEAR,
            COL::IMF_VALUE,
        )?
        .collect()?;

        pivot_unique(
            &long,
            &[COL::IMF_COUNTRY, COL::IMF_ISO3, COL::YEAR],
            COL::IMF_EXPENDITURE_ID,
            COL::IMF_VALUE,
            table.as_ref(),
        )
    }
}

/// Sum of the expenditure sub-categories, a missing sub-category counting as zero
fn total_expenditure() -> Expr {
    COL::ENV_EXP_COMPONENTS
        .iter()
        .map(|component| col(component).fill_null(lit(0.0)))
        .reduce(|acc, expr| acc + expr)
        .unwrap_or(lit(0.0))
        .alias(COL::ENV_EXP_TOTAL)
}

impl Clean for EnvExpCleaner {
    fn source(&self) -> Source {
        Source::Environment
    }

    fn clean(&self, raw: DataFrame, ctx: &CleaningContext<'_>) -> Result<DataFrame> {
        let table = self.source();
        require_columns(
            &raw,
            &[COL::IMF_COUNTRY, COL::IMF_ISO3, COL::IMF_CTS_NAME, COL::IMF_UNIT],
            table.as_ref(),
        )?;

        let mut wide = self.categories_to_columns(raw)?;
        ctx.mappings.apply_variable_mapping(&mut wide)?;
        require_columns(&wide, &COL::ENV_EXP_COMPONENTS, table.as_ref())?;

        let gaps: usize = COL::ENV_EXP_COMPONENTS
            .iter()
            .map(|component| wide.column(component).map(|s| s.null_count()))
            .sum::<PolarsResult<usize>>()?;
        if gaps > 0 {
            warn!("{gaps} missing expenditure sub-category values counted as zero in totals");
        }

        let mut totals = wide
            .lazy()
            .select([
                col(COL::IMF_COUNTRY).alias(COL::COUNTRY),
                col(COL::YEAR),
                col(COL::IMF_ISO3).alias(COL::ISO3),
                total_expenditure(),
            ])
            .collect()?;
        ctx.mappings.apply_country_mapping(&mut totals, COL::COUNTRY)?;

        let cleaned = totals
            .lazy()
            .filter(
                col(COL::YEAR)
                    .gt_eq(lit(self.years.start))
                    .and(col(COL::YEAR).lt_eq(lit(self.years.end))),
            )
            .sort_by_exprs(by_country_year(), SortMultipleOptions::default())
            .collect()?;
        ensure_unique(&cleaned, &[COL::COUNTRY, COL::YEAR], table.as_ref())?;
        info!(
            "Environmental expenditure cleaned: {} country-years",
            cleaned.height()
        );
        Ok(cleaned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clean::test_support::{mappings, resolver};
    use crate::reshape::column_names;

    const CATEGORIES: [(&str, &str); 7] = [
        ("Expenditure on environment protection", COL::ENV_EXP_PROT),
        ("Expenditure on biodiversity and landscape protection", COL::ENV_EXP_BIODIV),
        ("Expenditure on environmental protection n.e.c.", COL::ENV_EXP_OTHER),
        ("Expenditure on environmental protection R&D", COL::ENV_EXP_RES_DEV),
        ("Expenditure on pollution abatement", COL::ENV_EXP_POLLUTION),
        ("Expenditure on waste management", COL::ENV_EXP_WASTE),
        ("Expenditure on waste water management", COL::ENV_EXP_WASTEWATER),
    ];

    /// IMF style extract: one row per (country, category, unit) and `F`-prefixed year columns.
    /// Category `i` of a country holds `base + i` in every year.
    fn raw_extract(rows: &[(&str, &str, &str, usize, f64)]) -> anyhow::Result<DataFrame> {
        let mut columns = vec![
            Series::new("ObjectId", (1..=rows.len() as i64).collect::<Vec<_>>()),
            Series::new(COL::IMF_COUNTRY, rows.iter().map(|r| r.0).collect::<Vec<_>>()),
            Series::new(COL::IMF_ISO3, rows.iter().map(|r| r.1).collect::<Vec<_>>()),
            Series::new(COL::IMF_UNIT, rows.iter().map(|r| r.2).collect::<Vec<_>>()),
            Series::new(
                COL::IMF_CTS_NAME,
                rows.iter().map(|r| CATEGORIES[r.3].0).collect::<Vec<_>>(),
            ),
        ];
        for year in 2008..=2021 {
            let values: Vec<String> = rows
                .iter()
                .map(|r| (r.4 + r.3 as f64).to_string())
                .collect();
            columns.push(Series::new(&format!("F{year}"), values));
        }
        Ok(DataFrame::new(columns)?)
    }

    fn country_rows<'a>(
        country: &'a str,
        iso3: &'a str,
        unit: &'a str,
        base: f64,
    ) -> Vec<(&'a str, &'a str, &'a str, usize, f64)> {
        (0..CATEGORIES.len())
            .map(|i| (country, iso3, unit, i, base))
            .collect()
    }

    fn clean(raw: DataFrame) -> Result<DataFrame> {
        let mappings = mappings(&[("Netherlands, The", "Netherlands")], &CATEGORIES);
        let resolver = resolver(&[]);
        let ctx = CleaningContext {
            mappings: &mappings,
            resolver: &resolver,
        };
        EnvExpCleaner::new(YearSpan::default(), EnvironmentConfig::default()).clean(raw, &ctx)
    }

    #[test]
    fn test_total_is_sum_of_components() -> anyhow::Result<()> {
        let rows = country_rows("Netherlands, The", "NLD", "Percent of GDP", 0.1);
        let cleaned = clean(raw_extract(&rows)?)?;

        assert_eq!(
            column_names(&cleaned),
            [COL::COUNTRY, COL::YEAR, COL::ISO3, COL::ENV_EXP_TOTAL]
        );
        assert_eq!(cleaned.height(), 10);
        let years: Vec<Option<i64>> = cleaned.column(COL::YEAR)?.i64()?.into_iter().collect();
        assert_eq!(years, (2010..=2019).map(Some).collect::<Vec<_>>());
        assert_eq!(cleaned.column(COL::COUNTRY)?.str()?.get(0), Some("Netherlands"));
        assert_eq!(cleaned.column(COL::ISO3)?.str()?.get(0), Some("NLD"));
        let expected: f64 = (0..7).map(|i| 0.1 + i as f64).sum();
        for total in cleaned.column(COL::ENV_EXP_TOTAL)?.f64()?.into_iter() {
            assert!((total.unwrap() - expected).abs() < 1e-9);
        }
        Ok(())
    }

    #[test]
    fn test_absolute_unit_rows_are_excluded() -> anyhow::Result<()> {
        let mut rows = country_rows("Norway", "NOR", "Percent of GDP", 0.2);
        rows.extend(country_rows("Norway", "NOR", "Domestic currency", 1000.0));
        rows.extend(country_rows("Chile", "CHL", "Domestic currency", 1000.0));
        let cleaned = clean(raw_extract(&rows)?)?;

        assert_eq!(cleaned.height(), 10);
        let expected: f64 = (0..7).map(|i| 0.2 + i as f64).sum();
        let totals: Vec<f64> = cleaned
            .column(COL::ENV_EXP_TOTAL)?
            .f64()?
            .into_iter()
            .flatten()
            .collect();
        assert!(totals.iter().all(|total| (total - expected).abs() < 1e-9));
        Ok(())
    }

    #[test]
    fn test_names_mapped_to_one_country_are_rejected() -> anyhow::Result<()> {
        let mut rows = country_rows("Congo, Rep.", "COG", "Percent of GDP", 0.3);
        rows.extend(country_rows("Congo, Rep. of", "COG", "Percent of GDP", 0.3));
        let mappings = mappings(
            &[("Congo, Rep.", "Congo"), ("Congo, Rep. of", "Congo")],
            &CATEGORIES,
        );
        let resolver = resolver(&[]);
        let ctx = CleaningContext {
            mappings: &mappings,
            resolver: &resolver,
        };
        let err = EnvExpCleaner::new(YearSpan::default(), EnvironmentConfig::default())
            .clean(raw_extract(&rows)?, &ctx)
            .unwrap_err();
        assert!(matches!(err, EnvBurdenError::DuplicateKey { count: 10, .. }));
        Ok(())
    }

    #[test]
    fn test_missing_component_is_schema_drift() -> anyhow::Result<()> {
        let rows: Vec<_> = country_rows("Norway", "NOR", "Percent of GDP", 0.2)
            .into_iter()
            .filter(|row| row.3 != 5)
            .collect();
        let err = clean(raw_extract(&rows)?).unwrap_err();
        assert!(matches!(
            err,
            EnvBurdenError::SchemaDrift { ref column, .. } if column == COL::ENV_EXP_WASTE
        ));
        Ok(())
    }

    #[test]
    fn test_incomplete_category_counts_as_zero() -> anyhow::Result<()> {
        let mut rows = country_rows("Chile", "CHL", "Percent of GDP", 0.5);
        rows.extend(country_rows("Norway", "NOR", "Percent of GDP", 0.2));
        let mut raw = raw_extract(&rows)?;
        let mut gap: Vec<String> = (0..7).map(|i| (0.5 + i as f64).to_string()).collect();
        gap.push("..".to_string());
        gap.extend((1..7).map(|i| (0.2 + i as f64).to_string()));
        raw.with_column(Series::new("F2014", gap))?;
        let cleaned = clean(raw)?;

        assert_eq!(cleaned.height(), 20);
        let norway = cleaned
            .lazy()
            .filter(col(COL::COUNTRY).eq(lit("Norway")))
            .collect()?;
        assert_eq!(norway.height(), 10);
        let expected: f64 = (1..7).map(|i| 0.2 + i as f64).sum();
        let total = norway.column(COL::ENV_EXP_TOTAL)?.f64()?.get(0).unwrap();
        assert!((total - expected).abs() < 1e-9);
        Ok(())
    }
}
