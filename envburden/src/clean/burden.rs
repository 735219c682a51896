use log::info;
use polars::prelude::*;

use super::{by_country_year, Clean, CleaningContext};
use crate::config::BurdenConfig;
use crate::error::Result;
use crate::reshape::{
    column_names, ensure_unique, parse_numeric_with_placeholders, pivot_unique, require_columns,
};
use crate::resolver::add_iso3_column;
use crate::{Source, COL};

/// Cleaner for the IHME Global Burden of Disease extract: a long table with one row per
/// (location, year, sex, age, cause, risk factor, metric).
#[derive(Debug, Clone)]
pub struct EnvBurdenCleaner {
    config: BurdenConfig,
}

impl EnvBurdenCleaner {
    pub fn new(config: BurdenConfig) -> Self {
        Self { config }
    }
}

impl Clean for EnvBurdenCleaner {
    fn source(&self) -> Source {
        Source::Burden
    }

    fn clean(&self, raw: DataFrame, ctx: &CleaningContext<'_>) -> Result<DataFrame> {
        let table = self.source();
        let mut expected = vec![
            COL::IHME_SEX_NAME,
            COL::IHME_LOCATION_NAME,
            COL::IHME_REI_NAME,
            COL::IHME_YEAR,
            COL::IHME_VALUE,
        ];
        expected.extend(self.config.columns_to_remove.iter().map(String::as_str));
        require_columns(&raw, &expected, table.as_ref())?;

        let excluded = Series::new("excluded", self.config.indicators_to_remove.as_slice());
        let both_sexes = raw
            .lazy()
            .filter(col(COL::IHME_SEX_NAME).eq(lit(COL::IHME_SEX_BOTH)))
            .collect()?
            .drop_many(self.config.columns_to_remove.as_slice())
            .lazy()
            .filter(col(COL::IHME_REI_NAME).is_in(lit(excluded)).not())
            .select([
                col(COL::IHME_LOCATION_NAME).alias(COL::COUNTRY),
                col(COL::IHME_YEAR).strict_cast(DataType::Int64).alias(COL::YEAR),
                col(COL::IHME_REI_NAME),
                parse_numeric_with_placeholders(COL::IHME_VALUE),
            ])
            .collect()?;

        let mut wide = pivot_unique(
            &both_sexes,
            &[COL::COUNTRY, COL::YEAR],
            COL::IHME_REI_NAME,
            COL::IHME_VALUE,
            table.as_ref(),
        )?;
        ctx.mappings.apply_variable_mapping(&mut wide)?;
        ctx.mappings.apply_country_mapping(&mut wide, COL::COUNTRY)?;
        ensure_unique(&wide, &[COL::COUNTRY, COL::YEAR], table.as_ref())?;
        add_iso3_column(&mut wide, COL::COUNTRY, COL::ISO3, ctx.resolver)?;

        let mut order = vec![col(COL::COUNTRY), col(COL::YEAR), col(COL::ISO3)];
        order.extend(
            column_names(&wide)
                .iter()
                .filter(|name| ![COL::COUNTRY, COL::YEAR, COL::ISO3].contains(&name.as_str()))
                .map(|name| col(name)),
        );
        let cleaned = wide
            .lazy()
            .select(order)
            .sort_by_exprs(by_country_year(), SortMultipleOptions::default())
            .collect()?;
        info!(
            "Burden of disease cleaned: {} country-years, {} indicators",
            cleaned.height(),
            cleaned.width() - 3
        );
        Ok(cleaned)
    }
}
