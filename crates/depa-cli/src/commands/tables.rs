use std::path::PathBuf;

use depa_core::error::ExtractError;

use crate::output;

pub fn run(input_file: PathBuf, output_format: &str) -> Result<(), ExtractError> {
    let result = super::load(&input_file, None, None)?;

    let output_str = match output_format {
        "json" => output::json::pretty(&result.tables)?,
        _ => output::table::tables(&result),
    };
    println!("{output_str}");

    Ok(())
}
