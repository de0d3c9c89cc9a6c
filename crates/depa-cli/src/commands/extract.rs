use std::path::PathBuf;

use depa_core::error::ExtractError;

use crate::output;

pub fn run(
    input_file: PathBuf,
    output_format: &str,
    output_file: Option<PathBuf>,
    format: Option<&str>,
    timeout: Option<u64>,
) -> Result<(), ExtractError> {
    let result = super::load(&input_file, format, timeout)?;

    match output_file {
        Some(path) => {
            // Always write JSON when saving to file
            let json = output::json::pretty(&result)?;
            std::fs::write(&path, json)?;
            eprintln!(
                "Extracted {} unit(s), {} table(s), {} securit{}, written to {}",
                result.units.len(),
                result.tables.len(),
                result.securities.len(),
                if result.securities.len() == 1 { "y" } else { "ies" },
                path.display()
            );
            for w in &result.metadata.warnings {
                eprintln!("  warning: {w}");
            }
        }
        None => {
            let output_str = match output_format {
                "json" => output::json::pretty(&result)?,
                _ => output::table::summary(&result),
            };
            println!("{output_str}");
        }
    }

    Ok(())
}
