use crate::cli::OutputFormat;
use crate::scheme::postman::{generate, PostmanOptions};

/// The collection itself is the output, so both formats print JSON
pub async fn handle(
    base_url: Option<String>,
    models: Vec<String>,
    name: Option<String>,
    _output_format: OutputFormat,
) -> anyhow::Result<()> {
    let options = PostmanOptions {
        name,
        base_url,
        models: (!models.is_empty()).then_some(models),
    };
    let collection = generate(&options)?;
    println!("{}", serde_json::to_string_pretty(&collection)?);
    Ok(())
}
