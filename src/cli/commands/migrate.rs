use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::database::DatabaseManager;

pub async fn handle(output_format: OutputFormat) -> anyhow::Result<()> {
    DatabaseManager::migrate().await?;
    DatabaseManager::close_all().await;
    output_success(&output_format, "Migrations applied", None)
}
