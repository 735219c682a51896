//! Table reshaping helpers shared by the cleaners: wide/long conversion, pivoting with an
//! explicit uniqueness check, missing value policy and schema checks.

use std::collections::BTreeSet;

use itertools::Itertools;
use log::{debug, warn};
use polars::prelude::*;
use regex::Regex;

use crate::error::{EnvBurdenError, Result};

const ROW_COUNT: &str = "__row_count";

/// Combine multiple expressions with AND. If there are no expressions in the input list, returns
/// None.
pub fn combine_exprs_with_and(exprs: Vec<Expr>) -> Option<Expr> {
    let mut query: Option<Expr> = None;
    for expr in exprs {
        query = if let Some(partial_query) = query {
            Some(partial_query.and(expr))
        } else {
            Some(expr)
        };
    }
    query
}

fn key_exprs(keys: &[&str]) -> Vec<Expr> {
    keys.iter().map(|key| col(key)).collect()
}

pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_columns()
        .iter()
        .map(|s| s.name().to_string())
        .collect()
}

/// Fails with `SchemaDrift` naming the first of `columns` absent from `df`
pub fn require_columns<S: AsRef<str>>(df: &DataFrame, columns: &[S], table: &str) -> Result<()> {
    let present = column_names(df);
    match columns
        .iter()
        .find(|column| !present.iter().any(|name| name == column.as_ref()))
    {
        Some(missing) => Err(EnvBurdenError::SchemaDrift {
            table: table.to_string(),
            column: missing.as_ref().to_string(),
        }),
        None => Ok(()),
    }
}

/// Drops the final row, which in World Bank extracts holds the source attribution
pub fn drop_last_row(df: &DataFrame) -> DataFrame {
    df.slice(0, df.height().saturating_sub(1))
}

/// Finds the columns whose label is a year, optionally prefixed (e.g. `F2010`). World Bank
/// DataBank labels such as `2010 [YR2010]` are also recognised. Returned in column order.
pub fn year_columns(df: &DataFrame, prefix: &str) -> Vec<(String, i64)> {
    let pattern = format!(r"^{}(\d{{4}})(?: \[YR\d{{4}}\])?$", regex::escape(prefix));
    // Unwrap: the pattern is built from an escaped literal and always compiles
    let re = Regex::new(&pattern).unwrap();
    column_names(df)
        .into_iter()
        .filter_map(|name| {
            let year = re.captures(&name)?.get(1)?.as_str().parse::<i64>().ok()?;
            Some((name, year))
        })
        .collect()
}

/// Converts a text column holding numbers to `Float64`, with the placeholder tokens used by the
/// publishers for missing values (`..`, `...`) becoming null. Any other unparseable value is an
/// error.
pub fn parse_numeric_with_placeholders(column: &str) -> Expr {
    let text = col(column).cast(DataType::String);
    when(text.clone().eq(lit("..")).or(text.clone().eq(lit("..."))))
        .then(lit(NULL).cast(DataType::String))
        .otherwise(text)
        .strict_cast(DataType::Float64)
        .alias(column)
}

/// Predicate keeping rows without a missing value in any of `columns`
pub fn complete_cases<S: AsRef<str>>(columns: &[S]) -> Expr {
    combine_exprs_with_and(
        columns
            .iter()
            .map(|column| col(column.as_ref()).is_not_null())
            .collect(),
    )
    .unwrap_or(lit(true))
}

/// Wide to long: every column of `on` becomes a block of rows carrying the `index` columns, the
/// column's label (as given with it) under `variable`, and the column's values under `value`.
pub fn unpivot(
    lf: &LazyFrame,
    index: &[&str],
    on: &[(String, Expr)],
    variable: &str,
    value: &str,
) -> PolarsResult<LazyFrame> {
    let blocks: Vec<LazyFrame> = on
        .iter()
        .map(|(column, label)| {
            let mut exprs = key_exprs(index);
            exprs.push(label.clone().alias(variable));
            exprs.push(col(column).alias(value));
            lf.clone().select(exprs)
        })
        .collect();
    concat(blocks, UnionArgs::default())
}

/// Fails with `DuplicateKey` if any combination of `keys` occurs on more than one row
pub fn ensure_unique(df: &DataFrame, keys: &[&str], table: &str) -> Result<()> {
    let duplicates = df
        .clone()
        .lazy()
        .group_by(key_exprs(keys))
        .agg([len().alias(ROW_COUNT)])
        .filter(col(ROW_COUNT).gt(lit(1)))
        .sort_by_exprs(key_exprs(keys), SortMultipleOptions::default())
        .collect()?;
    if duplicates.height() == 0 {
        return Ok(());
    }
    let example = duplicates
        .get(0)
        .map(|row| row.iter().take(keys.len()).map(|v| v.to_string()).join(", "))
        .unwrap_or_default();
    Err(EnvBurdenError::DuplicateKey {
        table: table.to_string(),
        count: duplicates.height(),
        example,
    })
}

/// Long to wide: one row per `index` combination and one column per distinct value of `on`
/// (sorted by name), filled from `values`. Each (index, on) combination must be unique; a
/// duplicate is reported instead of being aggregated. Rows without an `on` value have no column
/// to land in and are dropped with a warning.
pub fn pivot_unique(
    df: &DataFrame,
    index: &[&str],
    on: &str,
    values: &str,
    table: &str,
) -> Result<DataFrame> {
    let unnamed = df.column(on)?.null_count();
    let df = if unnamed > 0 {
        warn!("{table}: {unnamed} rows without a '{on}' value dropped before pivoting");
        df.clone().lazy().filter(col(on).is_not_null()).collect()?
    } else {
        df.clone()
    };

    let mut keys = index.to_vec();
    keys.push(on);
    ensure_unique(&df, &keys, table)?;

    let names: BTreeSet<String> = df
        .column(on)?
        .str()?
        .into_iter()
        .flatten()
        .map(String::from)
        .collect();
    debug!("Pivoting {} values of '{on}' into columns", names.len());

    let aggs: Vec<Expr> = names
        .iter()
        .map(|name| {
            col(values)
                .filter(col(on).eq(lit(name.as_str())))
                .first()
                .alias(name)
        })
        .collect();
    Ok(df
        .lazy()
        .group_by(key_exprs(index))
        .agg(aggs)
        .sort_by_exprs(key_exprs(index), SortMultipleOptions::default())
        .collect()?)
}
