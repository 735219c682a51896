//! Delivery of the raw extracts and persistence of the cleaned tables as CSV checkpoints.

use std::fs::{self, File};
use std::io::Cursor;
use std::path::{Path, PathBuf};

use log::{debug, info};
use polars::io::mmap::MmapBytesReader;
use polars::prelude::*;

use crate::config::Config;
use crate::error::{EnvBurdenError, Result};
use crate::reshape::column_names;
use crate::COL;

fn read_csv_all_text<R: MmapBytesReader>(reader: R) -> PolarsResult<DataFrame> {
    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .into_reader_with_file_handle(reader)
        .finish()
}

/// Reads a raw extract with every column as text, so that placeholder tokens survive until the
/// cleaners decide what they mean.
pub fn read_raw_csv<P: AsRef<Path>>(path: P) -> Result<DataFrame> {
    let path = path.as_ref();
    let file = File::open(path).map_err(EnvBurdenError::io(path))?;
    let df = read_csv_all_text(file)?;
    debug!("Read {} with shape {:?}", path.display(), df.shape());
    Ok(df)
}

/// Copies the World Bank extract into the interim folder and reads it from there
pub fn load_health_exp(config: &Config) -> Result<DataFrame> {
    let raw = config.raw_dir.join(&config.health.raw_file);
    let interim = config.interim_dir.join(&config.health.interim_file);
    fs::create_dir_all(&config.interim_dir).map_err(EnvBurdenError::io(&config.interim_dir))?;
    fs::copy(&raw, &interim).map_err(EnvBurdenError::io(&raw))?;
    info!("Copied {} to {}", raw.display(), interim.display());
    read_raw_csv(&interim)
}

/// Downloads the IMF extract, keeps a copy in the raw folder and parses it
pub async fn fetch_env_exp(config: &Config) -> Result<DataFrame> {
    let url = &config.environment.url;
    info!("Fetching environmental expenditure from {url}");
    let response = reqwest::Client::new().get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(EnvBurdenError::FetchFailed {
            url: url.clone(),
            status: status.as_u16(),
        });
    }
    let bytes = response.bytes().await?;

    let raw = config.raw_dir.join(&config.environment.raw_file);
    fs::create_dir_all(&config.raw_dir).map_err(EnvBurdenError::io(&config.raw_dir))?;
    fs::write(&raw, &bytes).map_err(EnvBurdenError::io(&raw))?;
    debug!("Saved {} bytes to {}", bytes.len(), raw.display());

    Ok(read_csv_all_text(Cursor::new(bytes))?)
}

/// The first `num_extracts` IHME extracts in the interim folder, in file name order
fn burden_extracts(config: &Config) -> Result<Vec<PathBuf>> {
    let dir = &config.interim_dir;
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(EnvBurdenError::io(dir))?
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .filter(|path| {
            let name = path.file_name().and_then(|name| name.to_str()).unwrap_or("");
            name.starts_with(&config.burden.file_prefix) && name.ends_with(".csv")
        })
        .collect();
    paths.sort();
    paths.truncate(config.burden.num_extracts);
    if paths.is_empty() {
        return Err(EnvBurdenError::MissingInput(dir.clone()));
    }
    Ok(paths)
}

/// Reads and stacks the extracted IHME CSV files
pub fn load_env_burden(config: &Config) -> Result<DataFrame> {
    let frames = burden_extracts(config)?
        .iter()
        .map(|path| read_raw_csv(path).map(IntoLazy::lazy))
        .collect::<Result<Vec<_>>>()?;
    info!("Stacking {} burden of disease extracts", frames.len());
    Ok(concat(frames, UnionArgs::default())?.collect()?)
}

/// Writes `df` as a CSV file with a header row, creating the parent folder if needed
pub fn write_checkpoint<P: AsRef<Path>>(df: &mut DataFrame, path: P) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(EnvBurdenError::io(parent))?;
    }
    let file = File::create(path).map_err(EnvBurdenError::io(path))?;
    CsvWriter::new(file).include_header(true).finish(df)?;
    Ok(())
}

/// Reads a checkpoint back with the canonical types: text keys, integer year and every other
/// column as a float.
pub fn read_checkpoint<P: AsRef<Path>>(path: P) -> Result<DataFrame> {
    let df = read_raw_csv(path)?;
    let casts: Vec<Expr> = column_names(&df)
        .iter()
        .map(|name| match name.as_str() {
            COL::COUNTRY | COL::ISO3 => col(name),
            COL::YEAR => col(name).strict_cast(DataType::Int64),
            _ => col(name).strict_cast(DataType::Float64),
        })
        .collect();
    Ok(df.lazy().select(casts).collect()?)
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use polars::df;
    use tempfile::TempDir;

    use super::*;

    const IMF_CSV: &str = "ObjectId,Country,ISO3,Unit,CTS_Name,F2010\n\
                           1,Norway,NOR,Percent of GDP,Expenditure on waste management,0.4\n";

    fn config_in(dir: &TempDir) -> Config {
        Config::default().with_data_root(dir.path())
    }

    #[tokio::test]
    async fn test_fetch_env_exp() -> anyhow::Result<()> {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/imf.csv");
                then.status(200).body(IMF_CSV);
            })
            .await;
        let dir = TempDir::new()?;
        let mut config = config_in(&dir);
        config.environment.url = server.url("/imf.csv");

        let df = fetch_env_exp(&config).await?;
        mock.assert_async().await;
        assert_eq!(df.shape(), (1, 6));
        assert_eq!(df.column("F2010")?.str()?.get(0), Some("0.4"));
        assert!(config.raw_dir.join(&config.environment.raw_file).exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_fetch_env_exp_fails_on_error_status() -> anyhow::Result<()> {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/imf.csv");
                then.status(503);
            })
            .await;
        let dir = TempDir::new()?;
        let mut config = config_in(&dir);
        config.environment.url = server.url("/imf.csv");

        let err = fetch_env_exp(&config).await.unwrap_err();
        assert!(matches!(err, EnvBurdenError::FetchFailed { status: 503, .. }));
        Ok(())
    }

    #[test]
    fn test_load_health_exp_copies_to_interim() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let config = config_in(&dir);
        fs::create_dir_all(&config.raw_dir)?;
        fs::write(
            config.raw_dir.join(&config.health.raw_file),
            "Country Name,2010 [YR2010]\nFrance,..\nLast Updated: 2023,\n",
        )?;

        let df = load_health_exp(&config)?;
        assert_eq!(df.shape(), (2, 2));
        assert_eq!(df.column("2010 [YR2010]")?.str()?.get(0), Some(".."));
        assert!(config.interim_dir.join(&config.health.interim_file).exists());
        Ok(())
    }

    #[test]
    fn test_missing_health_extract_reports_path() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let config = config_in(&dir);
        let err = load_health_exp(&config).unwrap_err();
        assert!(matches!(
            err,
            EnvBurdenError::Io { ref path, .. } if path.ends_with(&config.health.raw_file)
        ));
        Ok(())
    }

    #[test]
    fn test_load_env_burden_stacks_extracts() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let config = config_in(&dir);
        fs::create_dir_all(&config.interim_dir)?;
        let header = "location_name,year,val\n";
        fs::write(
            config.interim_dir.join("IHME-GBD_2019_DATA-1.csv"),
            format!("{header}Chad,2019,1.0\n"),
        )?;
        fs::write(
            config.interim_dir.join("IHME-GBD_2019_DATA-2.csv"),
            format!("{header}Chad,2018,2.0\n"),
        )?;
        fs::write(
            config.interim_dir.join("IHME-GBD_2019_DATA-3.csv"),
            format!("{header}Chad,2017,3.0\n"),
        )?;
        fs::write(config.interim_dir.join("notes.txt"), "ignored")?;

        let df = load_env_burden(&config)?;
        let years: Vec<Option<&str>> = df.column("year")?.str()?.into_iter().collect();
        assert_eq!(years, [Some("2019"), Some("2018")]);
        Ok(())
    }

    #[test]
    fn test_load_env_burden_without_extracts() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let config = config_in(&dir);
        fs::create_dir_all(&config.interim_dir)?;
        let err = load_env_burden(&config).unwrap_err();
        assert!(matches!(err, EnvBurdenError::MissingInput(_)));
        Ok(())
    }

    #[test]
    fn test_checkpoint_keeps_canonical_types() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("processed").join("health_exp_clean.csv");
        let mut df = df!(
            COL::COUNTRY => &["Atlantis", "France"],
            COL::YEAR => &[2010i64, 2010],
            COL::ISO3 => &[None, Some("FRA")],
            COL::HEALTH_EXP => &[1.5, 11.2]
        )?;
        write_checkpoint(&mut df, &path)?;
        let read = read_checkpoint(&path)?;
        assert_eq!(read, df);
        Ok(())
    }
}
