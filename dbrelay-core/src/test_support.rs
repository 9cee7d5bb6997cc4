//! In-memory connection doubles for unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::adapters::{ConnectionConfig, ConnectionFactory, DatabaseConnection};
use crate::models::{ColumnInfo, Driver, ExecutionSummary, IndexInfo, Row};
use crate::security::Credentials;
use crate::{DbRelayError, Result};

/// Scripted connection that records every statement it receives.
#[derive(Debug)]
pub(crate) struct MockConnection {
    driver: Driver,
    columns: HashMap<String, Vec<ColumnInfo>>,
    indexes: Vec<IndexInfo>,
    rows: Vec<Row>,
    summary: ExecutionSummary,
    delay: Option<Duration>,
    failure: Option<String>,
    describe_calls: AtomicUsize,
    statements: Mutex<Vec<(String, Vec<Value>)>>,
    closed: AtomicBool,
}

impl MockConnection {
    pub(crate) fn new() -> Self {
        Self {
            driver: Driver::Mysql,
            columns: HashMap::new(),
            indexes: Vec::new(),
            rows: Vec::new(),
            summary: ExecutionSummary::default(),
            delay: None,
            failure: None,
            describe_calls: AtomicUsize::new(0),
            statements: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        }
    }

    pub(crate) fn with_driver(mut self, driver: Driver) -> Self {
        self.driver = driver;
        self
    }

    pub(crate) fn with_columns(mut self, table: &str, columns: Vec<ColumnInfo>) -> Self {
        self.columns.insert(table.to_string(), columns);
        self
    }

    pub(crate) fn with_indexes(mut self, indexes: Vec<IndexInfo>) -> Self {
        self.indexes = indexes;
        self
    }

    pub(crate) fn with_rows(mut self, rows: Vec<Row>) -> Self {
        self.rows = rows;
        self
    }

    pub(crate) fn with_summary(mut self, summary: ExecutionSummary) -> Self {
        self.summary = summary;
        self
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn failing(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }

    pub(crate) fn describe_calls(&self) -> usize {
        self.describe_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn statements(&self) -> Vec<(String, Vec<Value>)> {
        self.statements.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    async fn run(&self, sql: &str, params: &[Value]) -> Result<()> {
        if let Ok(mut statements) = self.statements.lock() {
            statements.push((sql.to_string(), params.to_vec()));
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.failure {
            Some(message) => Err(DbRelayError::driver_message(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl DatabaseConnection for MockConnection {
    fn driver(&self) -> Driver {
        self.driver
    }

    async fn fetch_rows(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        self.run(sql, params).await?;
        Ok(self.rows.clone())
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> Result<ExecutionSummary> {
        self.run(sql, params).await?;
        Ok(self.summary)
    }

    async fn describe_table(&self, table: &str) -> Result<Vec<ColumnInfo>> {
        self.describe_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.columns.get(table).cloned().unwrap_or_default())
    }

    async fn table_indexes(&self, _table: &str) -> Result<Vec<IndexInfo>> {
        Ok(self.indexes.clone())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Factory handing out fresh [`MockConnection`]s and remembering them.
#[derive(Debug, Default)]
pub(crate) struct MockFactory {
    opened: Mutex<Vec<(ConnectionConfig, Arc<MockConnection>)>>,
    refuse_database: Option<String>,
    serving: Option<Arc<MockConnection>>,
}

impl MockFactory {
    pub(crate) fn refusing(database: &str) -> Self {
        Self {
            refuse_database: Some(database.to_string()),
            ..Self::default()
        }
    }

    /// Hands out `connection` for every connect call.
    pub(crate) fn serving(connection: Arc<MockConnection>) -> Self {
        Self {
            serving: Some(connection),
            ..Self::default()
        }
    }

    pub(crate) fn opened(&self) -> Vec<(ConnectionConfig, Arc<MockConnection>)> {
        self.opened.lock().map(|o| o.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ConnectionFactory for MockFactory {
    async fn connect(
        &self,
        config: &ConnectionConfig,
        _credentials: &Credentials,
    ) -> Result<Arc<dyn DatabaseConnection>> {
        if self.refuse_database.as_deref() == Some(config.database.as_str()) {
            return Err(DbRelayError::connection_failed(
                config.to_string(),
                std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "connection refused"),
            ));
        }
        let connection = self.serving.as_ref().map_or_else(
            || Arc::new(MockConnection::new().with_driver(config.driver)),
            Arc::clone,
        );
        if let Ok(mut opened) = self.opened.lock() {
            opened.push((config.clone(), Arc::clone(&connection)));
        }
        Ok(connection)
    }
}
