//! Country code resolution: country name to ISO 3166-1 alpha-3 code.

use std::collections::HashMap;
use std::io::Cursor;

use itertools::izip;
use log::debug;
use polars::prelude::*;

use crate::error::Result;

const ISO3166_TABLE: &[u8] = include_bytes!("../data/iso3166.csv");

/// Resolves a country name to its ISO 3166-1 alpha-3 code. Unknown names resolve to `None` and
/// are never an error.
pub trait CountryCodeResolver {
    fn resolve(&self, name: &str) -> Option<String>;
}

/// Resolver backed by a static name-to-code table, mainly useful as a test double
impl CountryCodeResolver for HashMap<String, String> {
    fn resolve(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

/// Resolver over the embedded ISO 3166-1 table. Lookups are case-insensitive and match the
/// alpha-2 code, alpha-3 code, short name, official name or common name of a country.
#[derive(Debug, Clone)]
pub struct Iso3166 {
    lookup: HashMap<String, String>,
}

impl Iso3166 {
    pub fn new() -> Result<Self> {
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .into_reader_with_file_handle(Cursor::new(ISO3166_TABLE))
            .finish()?;

        let mut lookup = HashMap::new();
        for (alpha_2, alpha_3, name, official_name, common_name) in izip!(
            df.column("alpha_2")?.str()?,
            df.column("alpha_3")?.str()?,
            df.column("name")?.str()?,
            df.column("official_name")?.str()?,
            df.column("common_name")?.str()?,
        ) {
            let Some(alpha_3) = alpha_3 else { continue };
            for key in [alpha_2, Some(alpha_3), name, official_name, common_name]
                .into_iter()
                .flatten()
                .filter(|key| !key.is_empty())
            {
                lookup
                    .entry(key.to_lowercase())
                    .or_insert_with(|| alpha_3.to_string());
            }
        }
        debug!("Loaded ISO 3166-1 table with {} lookup keys", lookup.len());
        Ok(Self { lookup })
    }
}

impl CountryCodeResolver for Iso3166 {
    fn resolve(&self, name: &str) -> Option<String> {
        self.lookup.get(&name.trim().to_lowercase()).cloned()
    }
}

/// Adds an ISO3 column resolved from the country names in `country_column`
pub fn add_iso3_column(
    df: &mut DataFrame,
    country_column: &str,
    iso3_column: &str,
    resolver: &dyn CountryCodeResolver,
) -> PolarsResult<()> {
    let codes: StringChunked = df
        .column(country_column)?
        .str()?
        .into_iter()
        .map(|opt_name| opt_name.and_then(|name| resolver.resolve(name)))
        .collect();
    df.with_column(codes.with_name(iso3_column).into_series())?;
    Ok(())
}
