//! Three way inner join of the cleaned tables into the canonical dataset.

use std::collections::BTreeSet;

use log::{info, warn};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::reshape::{column_names, require_columns};
use crate::{Source, COL};

const KEYS: [&str; 3] = [COL::COUNTRY, COL::YEAR, COL::ISO3];

/// Rows of one source whose country could not be resolved to an ISO3 code. Those rows can never
/// match on the join key and are absent from the canonical dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnresolvedCountries {
    pub source: Source,
    pub rows: usize,
    pub countries: Vec<String>,
}

/// Row counts observed while merging
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeReport {
    pub health_rows: usize,
    pub environment_rows: usize,
    pub burden_rows: usize,
    pub merged_rows: usize,
    pub unresolved: Vec<UnresolvedCountries>,
}

impl MergeReport {
    pub fn unresolved_rows(&self) -> usize {
        self.unresolved.iter().map(|u| u.rows).sum()
    }
}

fn unresolved_countries(df: &DataFrame, source: Source) -> Result<Option<UnresolvedCountries>> {
    let unresolved = df
        .clone()
        .lazy()
        .filter(col(COL::ISO3).is_null())
        .select([col(COL::COUNTRY)])
        .collect()?;
    if unresolved.height() == 0 {
        return Ok(None);
    }
    let countries: BTreeSet<String> = unresolved
        .column(COL::COUNTRY)?
        .str()?
        .into_iter()
        .flatten()
        .map(String::from)
        .collect();
    warn!(
        "{source}: {} rows for {} countries without ISO3 code are dropped by the merge: {:?}",
        unresolved.height(),
        countries.len(),
        countries
    );
    Ok(Some(UnresolvedCountries {
        source,
        rows: unresolved.height(),
        countries: countries.into_iter().collect(),
    }))
}

fn join_on_keys(left: LazyFrame, right: LazyFrame) -> LazyFrame {
    let keys: Vec<Expr> = KEYS.iter().map(|key| col(key)).collect();
    left.join(right, &keys, &keys, JoinArgs::new(JoinType::Inner))
}

/// Inner joins health and environmental expenditure then the burden of disease table on
/// (country, year, ISO3). Only country-years present in all three survive; rows without an ISO3
/// code never match and are reported instead.
pub fn merge_sources(
    health: &DataFrame,
    environment: &DataFrame,
    burden: &DataFrame,
) -> Result<(DataFrame, MergeReport)> {
    require_columns(
        health,
        &[COL::COUNTRY, COL::YEAR, COL::ISO3, COL::HEALTH_EXP],
        Source::Health.as_ref(),
    )?;
    require_columns(
        environment,
        &[COL::COUNTRY, COL::YEAR, COL::ISO3, COL::ENV_EXP_TOTAL],
        Source::Environment.as_ref(),
    )?;
    require_columns(burden, &KEYS, Source::Burden.as_ref())?;

    let mut unresolved = vec![];
    for (df, source) in [
        (health, Source::Health),
        (environment, Source::Environment),
        (burden, Source::Burden),
    ] {
        unresolved.extend(unresolved_countries(df, source)?);
    }

    let mut order: Vec<Expr> = KEYS.iter().map(|key| col(key)).collect();
    order.push(col(COL::HEALTH_EXP));
    order.push(col(COL::ENV_EXP_TOTAL));
    order.extend(
        column_names(burden)
            .iter()
            .filter(|name| !KEYS.contains(&name.as_str()))
            .map(|name| col(name)),
    );

    let expenditure = join_on_keys(
        health
            .clone()
            .lazy()
            .select([col(COL::COUNTRY), col(COL::YEAR), col(COL::ISO3), col(COL::HEALTH_EXP)]),
        environment.clone().lazy().select([
            col(COL::COUNTRY),
            col(COL::YEAR),
            col(COL::ISO3),
            col(COL::ENV_EXP_TOTAL),
        ]),
    );
    let dataset = join_on_keys(expenditure, burden.clone().lazy())
        .select(order)
        .sort_by_exprs(
            vec![col(COL::COUNTRY), col(COL::YEAR)],
            SortMultipleOptions::default(),
        )
        .collect()?;

    let report = MergeReport {
        health_rows: health.height(),
        environment_rows: environment.height(),
        burden_rows: burden.height(),
        merged_rows: dataset.height(),
        unresolved,
    };
    info!("Merge report: {report:?}");
    Ok((dataset, report))
}
