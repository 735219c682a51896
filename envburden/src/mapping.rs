//! Static lookup tables canonicalising country names and indicator/expenditure names.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use log::debug;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{EnvBurdenError, Result};

/// The two name mappings consumed by every cleaner. Loaded once per run and never mutated.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct NameMappings {
    pub countries: HashMap<String, String>,
    pub variables: HashMap<String, String>,
}

fn read_json_map<P: AsRef<Path>>(path: P) -> Result<HashMap<String, String>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(EnvBurdenError::io(path))?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

impl NameMappings {
    pub fn new(countries: HashMap<String, String>, variables: HashMap<String, String>) -> Self {
        Self {
            countries,
            variables,
        }
    }

    pub fn from_files<P: AsRef<Path>, Q: AsRef<Path>>(
        country_mapping: P,
        variable_mapping: Q,
    ) -> Result<Self> {
        let countries = read_json_map(country_mapping)?;
        let variables = read_json_map(variable_mapping)?;
        debug!(
            "Loaded {} country and {} variable name mappings",
            countries.len(),
            variables.len()
        );
        Ok(Self::new(countries, variables))
    }

    /// Canonical country name; unmapped names pass through unchanged
    pub fn map_country<'a>(&'a self, name: &'a str) -> &'a str {
        self.countries.get(name).map(String::as_str).unwrap_or(name)
    }

    /// Canonical indicator or expenditure name; unmapped names pass through unchanged
    pub fn map_variable<'a>(&'a self, name: &'a str) -> &'a str {
        self.variables.get(name).map(String::as_str).unwrap_or(name)
    }

    /// Replaces the values of the string column `column` with their canonical country name
    pub fn apply_country_mapping(&self, df: &mut DataFrame, column: &str) -> PolarsResult<()> {
        let mapped: StringChunked = df
            .column(column)?
            .str()?
            .into_iter()
            .map(|opt_name| opt_name.map(|name| self.map_country(name)))
            .collect();
        df.with_column(mapped.with_name(column).into_series())?;
        Ok(())
    }

    /// Renames every column found in the variable mapping, leaving the others untouched
    pub fn apply_variable_mapping(&self, df: &mut DataFrame) -> PolarsResult<()> {
        let renames: Vec<(String, String)> = df
            .get_columns()
            .iter()
            .map(|s| s.name().to_string())
            .filter_map(|name| {
                self.variables
                    .get(&name)
                    .map(|new_name| (name, new_name.clone()))
            })
            .collect();
        for (old_name, new_name) in renames {
            df.rename(&old_name, &new_name)?;
        }
        Ok(())
    }
}
