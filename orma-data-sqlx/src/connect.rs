use std::sync::Arc;

use orma_core::DatabaseConfig;
use orma_data::{DataError, Database, DatabaseOptions, DiagnosticSink, TracingSink};

use crate::driver::SqlxDriver;

/// Open a [`Database`] as described by `config`, reporting to `tracing`.
pub async fn connect(config: &DatabaseConfig) -> Result<Database, DataError> {
    connect_with_sink(config, Arc::new(TracingSink)).await
}

/// Open a [`Database`] reporting to `sink`.
///
/// A connection failure is reported as `fatal` and returned; whether the
/// process stops is the caller's decision.
pub async fn connect_with_sink(
    config: &DatabaseConfig,
    sink: Arc<dyn DiagnosticSink>,
) -> Result<Database, DataError> {
    let target = config.target_name();
    let driver = match SqlxDriver::connect(&config.url).await {
        Ok(driver) => driver.with_target(target.clone()),
        Err(err) => {
            sink.fatal(&format!("cannot connect to {target}: {err}"));
            return Err(err);
        }
    };
    tracing::info!(target = %target, "database connected");
    Ok(Database::new(driver)
        .with_options(DatabaseOptions {
            log_statements: config.log_statements,
            time_statements: config.time_statements,
            strict_schema: config.strict_schema,
        })
        .with_sink(sink))
}
