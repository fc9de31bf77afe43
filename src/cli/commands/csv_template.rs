use serde_json::json;

use crate::cli::OutputFormat;
use crate::scheme::{csv, lookup};

pub async fn handle(model: &str, output_format: OutputFormat) -> anyhow::Result<()> {
    let schema = lookup(model)?;
    let template = csv::template(schema)?;
    match output_format {
        OutputFormat::Json => {
            let header = template.trim_end().to_string();
            println!("{}", serde_json::to_string_pretty(&json!({ "model": schema.name, "header": header }))?);
        }
        OutputFormat::Text => print!("{}", template),
    }
    Ok(())
}
