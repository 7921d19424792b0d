use std::io;
use std::path::{Path, PathBuf};

const CACHE_DIR_NAME: &str = "climgrid";

/// Default destination for downloaded archive grids (`<user cache>/climgrid/silo`).
pub fn default_download_dir() -> io::Result<PathBuf> {
    dirs::cache_dir()
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                "Could not determine system cache directory",
            )
        })
        .map(|p| p.join(CACHE_DIR_NAME).join("silo"))
}

pub async fn ensure_dir_exists(path: &Path) -> io::Result<()> {
    match tokio::fs::metadata(path).await {
        Ok(metadata) => {
            if !metadata.is_dir() {
                return Err(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!("Path exists but is not a directory: {}", path.display()),
                ));
            }
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log::info!("Creating directory: {}", path.display());
            tokio::fs::create_dir_all(path).await
        }
        Err(e) => Err(e),
    }
}

/// Gregorian leap year rule.
pub fn is_leap_year(year: i32) -> bool {
    year % 400 == 0 || (year % 4 == 0 && year % 100 != 0)
}

pub fn days_in_year(year: i32) -> usize {
    if is_leap_year(year) {
        366
    } else {
        365
    }
}

/// Rounds half away from zero to `decimals` places. NaN stays NaN.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leap_years_follow_gregorian_rule() {
        for year in 1800..2200 {
            let expected = (year % 400 == 0) || (year % 4 == 0 && year % 100 != 0);
            assert_eq!(is_leap_year(year), expected, "year {}", year);
        }
        assert!(is_leap_year(2000));
        assert!(!is_leap_year(1900));
        assert!(is_leap_year(2020));
        assert!(!is_leap_year(2010));
    }

    #[test]
    fn day_counts() {
        assert_eq!(days_in_year(2020), 366);
        assert_eq!(days_in_year(2019), 365);
        assert_eq!(days_in_year(2100), 365);
    }

    #[test]
    fn rounding_keeps_one_decimal() {
        assert_eq!(round_to(12.345, 1), 12.3);
        assert_eq!(round_to(-0.05, 1), -0.1);
        assert_eq!(round_to(148.049999, 2), 148.05);
        assert!(round_to(f64::NAN, 1).is_nan());
    }

    #[tokio::test]
    async fn ensure_dir_creates_nested_directories() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("a").join("b");
        ensure_dir_exists(&nested).await.unwrap();
        assert!(nested.is_dir());
        // Second call is a no-op.
        ensure_dir_exists(&nested).await.unwrap();
    }

    #[tokio::test]
    async fn ensure_dir_rejects_files() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(ensure_dir_exists(file.path()).await.is_err());
    }
}
