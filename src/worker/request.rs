use std::fmt;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

pub const THRESHOLD_RANGE: RangeInclusive<f64> = 0.1..=1.0;
pub const MOSAIC_SIZE_RANGE: RangeInclusive<u32> = 5..=50;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    #[default]
    Blur,
    Mosaic,
    Solid,
}

impl Method {
    pub const ALL: [Method; 3] = [Method::Blur, Method::Mosaic, Method::Solid];

    pub fn as_str(self) -> &'static str {
        match self {
            Method::Blur => "blur",
            Method::Mosaic => "mosaic",
            Method::Solid => "solid",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "blur" => Some(Method::Blur),
            "mosaic" => Some(Method::Mosaic),
            "solid" => Some(Method::Solid),
            _ => None,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters of one anonymization run. Built per submission and never
/// mutated after it reaches the worker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunRequest {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub method: Method,
    pub keep_audio: bool,
    pub preview: bool,
    pub detection_threshold: f64,
    pub mosaic_block_size: u32,
}

impl RunRequest {
    pub fn validate(&self) -> AppResult<()> {
        if self.input_path.as_os_str().is_empty() {
            return Err(AppError::InvalidRequest("input path is empty".to_owned()));
        }
        if self.output_path.as_os_str().is_empty() {
            return Err(AppError::InvalidRequest("output path is empty".to_owned()));
        }
        check_threshold(self.detection_threshold).map_err(AppError::InvalidRequest)?;
        check_mosaic_size(self.mosaic_block_size).map_err(AppError::InvalidRequest)?;
        Ok(())
    }
}

pub fn check_threshold(value: f64) -> Result<(), String> {
    if THRESHOLD_RANGE.contains(&value) {
        Ok(())
    } else {
        Err(format!(
            "detection threshold {value} outside {}..={}",
            THRESHOLD_RANGE.start(),
            THRESHOLD_RANGE.end()
        ))
    }
}

pub fn check_mosaic_size(value: u32) -> Result<(), String> {
    if MOSAIC_SIZE_RANGE.contains(&value) {
        Ok(())
    } else {
        Err(format!(
            "mosaic block size {value} outside {}..={}",
            MOSAIC_SIZE_RANGE.start(),
            MOSAIC_SIZE_RANGE.end()
        ))
    }
}

/// Output path proposed for `input` when the user gives none.
///
/// Files keep their extension after the suffix (`clip.mp4` ->
/// `clip_anonymized.mp4`); anything else gets the suffix appended verbatim.
pub fn suggest_output_path(input: &Path, suffix: &str) -> PathBuf {
    if input.is_file() {
        if let Some(stem) = input.file_stem() {
            let mut name = stem.to_os_string();
            name.push(suffix);
            if let Some(ext) = input.extension() {
                name.push(".");
                name.push(ext);
            }
            return input.with_file_name(name);
        }
    }

    let mut raw = input.as_os_str().to_os_string();
    raw.push(suffix);
    PathBuf::from(raw)
}

/// Appends the input's extension to `output` when the latter has none.
pub fn complete_output_extension(output: PathBuf, input: &Path) -> PathBuf {
    if output.extension().is_some() {
        return output;
    }
    match input.extension() {
        Some(ext) => {
            let mut raw = output.into_os_string();
            raw.push(".");
            raw.push(ext);
            PathBuf::from(raw)
        }
        None => output,
    }
}

#[cfg(test)]
mod tests {
    use super::{
        check_mosaic_size, check_threshold, complete_output_extension, suggest_output_path, Method,
        RunRequest,
    };
    use crate::error::AppError;
    use std::path::{Path, PathBuf};

    fn sample_request() -> RunRequest {
        RunRequest {
            input_path: PathBuf::from("/tmp/a.mp4"),
            output_path: PathBuf::from("/tmp/a_out.mp4"),
            method: Method::Blur,
            keep_audio: true,
            preview: false,
            detection_threshold: 0.2,
            mosaic_block_size: 20,
        }
    }

    #[test]
    fn method_labels_round_trip() {
        for method in Method::ALL {
            assert_eq!(Method::parse(method.as_str()), Some(method));
        }
        assert_eq!(Method::parse(" MOSAIC "), Some(Method::Mosaic));
        assert_eq!(Method::parse("pixelate"), None);
        assert_eq!(Method::Solid.to_string(), "solid");
    }

    #[test]
    fn validate_accepts_range_bounds() {
        let mut request = sample_request();
        request.detection_threshold = 0.1;
        request.mosaic_block_size = 5;
        request.validate().expect("lower bounds");

        request.detection_threshold = 1.0;
        request.mosaic_block_size = 50;
        request.validate().expect("upper bounds");
    }

    #[test]
    fn validate_rejects_out_of_range_parameters() {
        let mut request = sample_request();
        request.detection_threshold = 0.05;
        assert!(matches!(
            request.validate(),
            Err(AppError::InvalidRequest(message)) if message.contains("threshold")
        ));

        let mut request = sample_request();
        request.mosaic_block_size = 51;
        assert!(matches!(
            request.validate(),
            Err(AppError::InvalidRequest(message)) if message.contains("mosaic")
        ));

        let mut request = sample_request();
        request.output_path = PathBuf::new();
        assert!(request.validate().is_err());
    }

    #[test]
    fn range_checks_report_value() {
        assert!(check_threshold(1.5).expect_err("too high").contains("1.5"));
        assert!(check_mosaic_size(4).expect_err("too small").contains('4'));
    }

    #[test]
    fn suggestion_keeps_extension_for_existing_files() {
        let temp = tempfile::TempDir::new().expect("tempdir");
        let input = temp.path().join("holiday.mp4");
        std::fs::write(&input, b"data").expect("write input");

        let suggested = suggest_output_path(&input, "_anonymized");
        assert_eq!(suggested, temp.path().join("holiday_anonymized.mp4"));
    }

    #[test]
    fn suggestion_appends_suffix_for_directories_and_missing_paths() {
        let temp = tempfile::TempDir::new().expect("tempdir");
        let suggested = suggest_output_path(temp.path(), "_anonymized");
        let mut expected = temp.path().as_os_str().to_os_string();
        expected.push("_anonymized");
        assert_eq!(suggested, PathBuf::from(expected));

        let missing = Path::new("/nonexistent/frames");
        assert_eq!(
            suggest_output_path(missing, "_x"),
            PathBuf::from("/nonexistent/frames_x")
        );
    }

    #[test]
    fn output_without_extension_borrows_input_extension() {
        let input = Path::new("/tmp/photo.jpg");
        assert_eq!(
            complete_output_extension(PathBuf::from("/tmp/result"), input),
            PathBuf::from("/tmp/result.jpg")
        );
        assert_eq!(
            complete_output_extension(PathBuf::from("/tmp/result.png"), input),
            PathBuf::from("/tmp/result.png")
        );
        assert_eq!(
            complete_output_extension(PathBuf::from("/tmp/result"), Path::new("/tmp/frames")),
            PathBuf::from("/tmp/result")
        );
    }
}
