use std::time::Instant;
use tracing::{debug, info, warn};

use svckit::{database::CqlSession, errors::DataError, types::UserId};

pub struct RecordWriter<'a, S> {
    session: &'a S,
    table: &'a str,
}

impl<'a, S: CqlSession> RecordWriter<'a, S> {
    pub fn new(session: &'a S, table: &'a str) -> Self {
        Self { session, table }
    }

    /// Insert one user under a freshly generated id and return that id.
    ///
    /// No retry and no rollback: a failed insert leaves nothing behind for
    /// the caller to clean up.
    pub async fn insert_user(&self, username: &str, email: &str) -> Result<UserId, DataError> {
        let user_id = UserId::generate();
        let start = Instant::now();

        self.session
            .insert_user(self.table, user_id, username, email)
            .await
            .map_err(|e| {
                warn!("Insert of user {} failed: {}", username, e);
                DataError::WriteError(format!("inserting user '{}' failed: {}", username, e))
            })?;

        debug!("Insert took {:?}", start.elapsed());
        info!("Inserted user {} with id {}", username, user_id);
        Ok(user_id)
    }
}
