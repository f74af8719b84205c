// services/user-registry/src/orchestrator.rs
//
// Orchestrator - runs one pass of the registry pipeline
// connect -> keyspace -> table -> inserts -> full scan -> point lookup -> close
//

use std::io::Write;

use futures::StreamExt;
use tracing::{error, info, warn};

use svckit::{
    database::{Connector, CqlSession},
    errors::DataError,
    types::{TableDefinition, UserId, UserRecord},
};

use crate::config::UserRegistryConfig;
use crate::reader::RecordReader;
use crate::report::Report;
use crate::schema::SchemaBootstrapper;
use crate::writer::RecordWriter;

/// Pipeline position; only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Disconnected,
    Connected,
    KeyspaceReady,
    TableReady,
    InsertsAttempted,
    Listed,
    Queried,
    Closed,
}

/// What a run accomplished.
#[derive(Debug)]
pub struct RunSummary {
    pub stage: Stage,
    pub inserted: Vec<UserId>,
    pub listed: Vec<UserId>,
    pub looked_up: Option<UserRecord>,
    pub failures: Vec<DataError>,
}

impl RunSummary {
    pub(crate) fn new() -> Self {
        Self {
            stage: Stage::Disconnected,
            inserted: Vec::new(),
            listed: Vec::new(),
            looked_up: None,
            failures: Vec::new(),
        }
    }

    fn advance(&mut self, next: Stage) {
        debug_assert!(next > self.stage, "stage {:?} after {:?}", next, self.stage);
        info!("Stage {:?} -> {:?}", self.stage, next);
        self.stage = next;
    }

    /// True when no insert or read failed.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct Orchestrator<'a, C, W: Write> {
    connector: &'a C,
    config: &'a UserRegistryConfig,
    report: Report<W>,
}

impl<'a, C: Connector, W: Write> Orchestrator<'a, C, W> {
    pub fn new(connector: &'a C, config: &'a UserRegistryConfig, out: W) -> Self {
        Self {
            connector,
            config,
            report: Report::new(out),
        }
    }

    /// Run the pipeline once.
    ///
    /// Connection, schema and output failures are fatal and returned as
    /// `Err`; insert and read failures are reported and collected in the
    /// summary. Once connected, the session is shut down exactly once on
    /// every path.
    pub async fn run(mut self) -> Result<RunSummary, DataError> {
        self.report.banner()?;

        let session = match self.connector.connect(&self.config.database).await {
            Ok(session) => session,
            Err(e) => {
                error!("Connection failed: {}", e);
                self.report.connection_failed(&e)?;
                return Err(e);
            }
        };

        let mut summary = RunSummary::new();
        summary.advance(Stage::Connected);

        let outcome = self.drive(&session, &mut summary).await;

        session.shutdown().await;
        summary.advance(Stage::Closed);

        match outcome {
            Ok(()) => {
                self.report.completed(summary.failures.len())?;
                self.report.closed()?;
                Ok(summary)
            }
            Err(e) => {
                error!("Run aborted at stage {:?}: {}", summary.stage, e);
                self.report.aborted(&e)?;
                self.report.closed()?;
                Err(e)
            }
        }
    }

    async fn drive<S: CqlSession>(
        &mut self,
        session: &S,
        summary: &mut RunSummary,
    ) -> Result<(), DataError> {
        let config = self.config;
        let schema = &config.schema;
        self.report.connected(&config.database.contact_points())?;

        let bootstrapper = SchemaBootstrapper::new(session);
        bootstrapper
            .ensure_keyspace(&schema.keyspace, &schema.replication)
            .await?;
        self.report.keyspace_ready(&schema.keyspace)?;
        summary.advance(Stage::KeyspaceReady);

        bootstrapper
            .ensure_table(&TableDefinition::users(&schema.table))
            .await?;
        self.report.table_ready(&schema.table)?;
        summary.advance(Stage::TableReady);

        self.insert_seed_users(session, summary).await?;
        summary.advance(Stage::InsertsAttempted);

        let reader = RecordReader::new(session, &schema.table);
        self.list_users(&reader, summary).await?;
        summary.advance(Stage::Listed);

        match summary.inserted.first().copied() {
            Some(user_id) => self.lookup_user(&reader, user_id, summary).await?,
            None => self.report.lookup_skipped()?,
        }
        summary.advance(Stage::Queried);

        Ok(())
    }

    async fn insert_seed_users<S: CqlSession>(
        &mut self,
        session: &S,
        summary: &mut RunSummary,
    ) -> Result<(), DataError> {
        let config = self.config;
        let writer = RecordWriter::new(session, &config.schema.table);
        self.report.inserting()?;

        for seed in &config.seed_users.0 {
            match writer.insert_user(&seed.username, &seed.email).await {
                Ok(user_id) => {
                    self.report.user_inserted(&seed.username, user_id)?;
                    summary.inserted.push(user_id);
                }
                Err(e) => {
                    self.report.failure(&e)?;
                    summary.failures.push(e);
                }
            }
        }

        info!(
            "Inserted {}/{} users",
            summary.inserted.len(),
            config.seed_users.0.len()
        );
        Ok(())
    }

    async fn list_users<S: CqlSession>(
        &mut self,
        reader: &RecordReader<'_, S>,
        summary: &mut RunSummary,
    ) -> Result<(), DataError> {
        let mut rows = match reader.list_all_users().await {
            Ok(rows) => rows,
            Err(e) => {
                self.report.failure(&e)?;
                summary.failures.push(e);
                return Ok(());
            }
        };

        self.report.users_header()?;
        while let Some(row) = rows.next().await {
            match row {
                Ok(user) => {
                    self.report.user_listed(&user)?;
                    summary.listed.push(user.user_id);
                }
                Err(e) => {
                    warn!("Skipping unreadable row: {}", e);
                    self.report.failure(&e)?;
                    summary.failures.push(e);
                }
            }
        }
        self.report.users_footer(summary.listed.len())?;

        Ok(())
    }

    async fn lookup_user<S: CqlSession>(
        &mut self,
        reader: &RecordReader<'_, S>,
        user_id: UserId,
        summary: &mut RunSummary,
    ) -> Result<(), DataError> {
        match reader.get_user_by_id(user_id).await {
            Ok(Some(user)) => {
                self.report.user_found(&user)?;
                summary.looked_up = Some(user);
            }
            Ok(None) => self.report.user_not_found(user_id)?,
            Err(e) => {
                self.report.failure(&e)?;
                summary.failures.push(e);
            }
        }
        Ok(())
    }
}
