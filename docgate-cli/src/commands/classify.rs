//! Classify command - show how a failure message would be classified.

use docgate::classify::ErrorClassifier;

use crate::error::CliError;

/// Run the classify command.
pub fn run(message: &str, json: bool) -> Result<(), CliError> {
    let info = ErrorClassifier::default().classify(message);

    if json {
        let text = serde_json::to_string_pretty(&info)
            .map_err(|e| CliError::Config(format!("Failed to encode result: {}", e)))?;
        println!("{}", text);
        return Ok(());
    }

    println!("Kind:              {}", info.kind);
    println!("Severity:          {}", info.severity);
    println!("Retryable:         {}", yes_no(info.retryable));
    println!("Fallback eligible: {}", yes_no(info.fallback_eligible));
    println!("User message:      {}", info.user_message);
    println!("Detail:            {}", info.technical_detail);
    Ok(())
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}
