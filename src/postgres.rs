//! `PostgreSQL` data source built on `tokio-postgres`.

use std::pin::pin;

use async_trait::async_trait;
use futures_util::StreamExt as _;
use futures_util::stream;
use log::{debug, warn};
use tokio::task::JoinHandle;
use tokio_postgres::error::SqlState;
use tokio_postgres::{AsyncMessage, Client, Config, NoTls, SimpleQueryMessage};

use crate::source::{DataSource, Record, Warning, WarningBuffer};
use crate::{InspectError, InspectResult};

/// Connection parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Server host name
    pub host: String,
    /// Server port
    pub port: u16,
    /// Database name
    pub dbname: String,
    /// User name
    pub user: String,
    /// Password
    pub password: String,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            dbname: "openmaptiles".to_string(),
            user: "openmaptiles".to_string(),
            password: "openmaptiles".to_string(),
        }
    }
}

impl ConnectionConfig {
    fn to_pg_config(&self) -> Config {
        let mut config = Config::new();
        config
            .host(&self.host)
            .port(self.port)
            .dbname(&self.dbname)
            .user(&self.user)
            .password(&self.password)
            .application_name("mvt-inspect");
        config
    }
}

/// A single database connection held for the whole run.
///
/// Server notices are collected and returned by [`DataSource::drain_warnings`].
/// The connection is closed when the source is dropped.
pub struct PgSource {
    client: Client,
    warnings: WarningBuffer,
    connection: JoinHandle<()>,
}

impl PgSource {
    /// Connects to the database. Must be called within a tokio runtime.
    pub async fn connect(config: &ConnectionConfig) -> InspectResult<Self> {
        debug!(
            "Connecting to postgres://{}@{}:{}/{}",
            config.user, config.host, config.port, config.dbname
        );
        let (client, mut connection) = config.to_pg_config().connect(NoTls).await?;

        let warnings = WarningBuffer::default();
        let sink = warnings.clone();
        let connection = tokio::spawn(async move {
            let mut messages = pin!(stream::poll_fn(move |cx| connection.poll_message(cx)));
            while let Some(message) = messages.next().await {
                match message {
                    Ok(AsyncMessage::Notice(notice)) => sink.push(Warning::Notice {
                        severity: notice.severity().to_string(),
                        message: notice.message().to_string(),
                    }),
                    Ok(_) => {}
                    Err(e) => {
                        warn!("Database connection failed: {e}");
                        break;
                    }
                }
            }
        });

        Ok(Self {
            client,
            warnings,
            connection,
        })
    }
}

impl Drop for PgSource {
    fn drop(&mut self) {
        self.connection.abort();
    }
}

fn map_query_error(err: tokio_postgres::Error) -> InspectError {
    if err.code() == Some(&SqlState::UNDEFINED_COLUMN) {
        let message = err
            .as_db_error()
            .map_or_else(|| err.to_string(), |db| db.message().to_string());
        InspectError::ColumnNotFound(message)
    } else {
        InspectError::Postgres(err)
    }
}

#[async_trait]
impl DataSource for PgSource {
    async fn query(&self, sql: &str) -> InspectResult<Vec<Record>> {
        let messages = self.client.simple_query(sql).await.map_err(map_query_error)?;

        let mut records = Vec::new();
        for message in messages {
            if let SimpleQueryMessage::Row(row) = message {
                let mut fields = Vec::with_capacity(row.len());
                for (idx, column) in row.columns().iter().enumerate() {
                    fields.push((
                        column.name().to_string(),
                        row.try_get(idx)?.map(str::to_string),
                    ));
                }
                records.push(Record::new(fields));
            }
        }
        Ok(records)
    }

    fn drain_warnings(&self) -> Vec<Warning> {
        self.warnings.drain()
    }
}
