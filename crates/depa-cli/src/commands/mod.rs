pub mod extract;
pub mod securities;
pub mod tables;

use std::path::Path;
use std::time::Duration;

use depa_core::error::ExtractError;
use depa_core::model::{DocumentFormat, ExtractionResult};
use depa_core::ExtractOptions;

/// Shared loader: read the input and run the engine, honoring an explicit
/// format override and an optional timeout.
pub(crate) fn load(
    input_file: &Path,
    format: Option<&str>,
    timeout: Option<u64>,
) -> Result<ExtractionResult, ExtractError> {
    let mut options = ExtractOptions::default();
    if let Some(seconds) = timeout {
        options.timeout = Some(Duration::from_secs(seconds));
    }

    match format {
        Some(name) => {
            let format =
                DocumentFormat::from_extension(name).ok_or(ExtractError::UnsupportedFormat {
                    extension: name.to_string(),
                })?;
            let bytes = std::fs::read(input_file)?;
            depa_core::extract(&bytes, format, &options)
        }
        None => depa_core::extract_file(input_file, &options),
    }
}
