//! Fallback command - print the simplified text document for a record.

use std::path::PathBuf;

use docgate::classify::create_fallback;
use docgate::document::DocumentType;

use super::common::{read_record, OptionArgs};
use crate::error::CliError;

/// Arguments for the fallback command.
pub struct FallbackCommandArgs {
    pub document_type: DocumentType,
    pub record: PathBuf,
    pub output: Option<PathBuf>,
    pub options: OptionArgs,
}

/// Run the fallback command.
pub fn run(args: FallbackCommandArgs) -> Result<(), CliError> {
    let record = read_record(&args.record)?;
    let bytes = create_fallback(
        args.document_type,
        &record,
        &args.options.to_render_options(),
    );

    match args.output {
        Some(path) => {
            std::fs::write(&path, &bytes).map_err(|e| CliError::FileWrite {
                path: path.clone(),
                error: e,
            })?;
            println!("Saved simplified document: {}", path.display());
        }
        None => print!("{}", String::from_utf8_lossy(&bytes)),
    }
    Ok(())
}
