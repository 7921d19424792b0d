use crate::renderers::error::RenderError;
use crate::renderers::format_coordinate;
use crate::types::provider::Provider;
use polars::prelude::*;
use std::path::PathBuf;
use tokio::task;

/// Combined CSV holding every row of the table.
pub const TABLE_FILE_NAME: &str = "climgrid-table.csv";

const CSV_DECIMALS: usize = 2;

/// `<lat>-<lon>.<provider>.csv`
pub fn file_name(lat: f64, lon: f64, provider: Provider) -> String {
    format!(
        "{}-{}.{}.csv",
        format_coordinate(lat),
        format_coordinate(lon),
        provider.name()
    )
}

/// Writes `frame` with a header row and two decimals per value, on a blocking thread.
pub async fn write_csv(mut frame: DataFrame, path: PathBuf) -> Result<PathBuf, RenderError> {
    task::spawn_blocking(move || {
        let mut file =
            std::fs::File::create(&path).map_err(|e| RenderError::Write(path.clone(), e))?;
        CsvWriter::new(&mut file)
            .include_header(true)
            .with_float_precision(Some(CSV_DECIMALS))
            .finish(&mut frame)
            .map_err(|e| RenderError::Csv(path.clone(), e))?;
        log::debug!("Wrote {} rows to {}", frame.height(), path.display());
        Ok::<PathBuf, RenderError>(path)
    })
    .await?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_include_provider() {
        assert_eq!(file_name(-41.15, 145.5, Provider::Silo), "-41.15-145.5.silo.csv");
        assert_eq!(
            file_name(-35.0, 148.0, Provider::NasaPower),
            "-35.0-148.0.nasapower.csv"
        );
    }

    #[tokio::test]
    async fn writes_two_decimals() {
        let dir = tempfile::tempdir().unwrap();
        let frame = df!("lon" => [148.0], "rain" => [1.234]).unwrap();
        let path = write_csv(frame, dir.path().join("out.csv")).await.unwrap();
        let text = std::fs::read_to_string(path).unwrap();
        assert_eq!(text, "lon,rain\n148.00,1.23\n");
    }
}
