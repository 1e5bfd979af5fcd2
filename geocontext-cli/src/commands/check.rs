//! Service health check command.

use geocontext::context::ServiceStatus;

use crate::error::CliError;
use crate::runner::CliRunner;

/// Probe one service, or every service with a test point, and print the
/// statuses as JSON.
///
/// Fails with [`CliError::ServicesOffline`] when any probe misses its
/// expected value.
pub async fn run(runner: &CliRunner, key: Option<String>) -> Result<(), CliError> {
    let context = runner.context().await?;

    let statuses = match key {
        Some(key) => vec![context.check_service(&key).await?],
        None => context.check_all().await?,
    };

    println!("{}", serde_json::to_string_pretty(&statuses)?);

    match count_offline(&statuses) {
        0 => Ok(()),
        offline => Err(CliError::ServicesOffline(offline)),
    }
}

fn count_offline(statuses: &[ServiceStatus]) -> usize {
    statuses.iter().filter(|status| !status.online).count()
}
