use std::io::{self, Write};

use svckit::{
    errors::DataError,
    types::{UserId, UserRecord},
};

const WIDTH: usize = 80;

/// Human-readable progress written to stdout (or any writer in tests).
pub struct Report<W: Write> {
    out: W,
}

impl<W: Write> Report<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn banner(&mut self) -> io::Result<()> {
        writeln!(self.out, "{}", "=".repeat(WIDTH))?;
        writeln!(self.out, "User Registry")?;
        writeln!(self.out, "{}", "=".repeat(WIDTH))
    }

    pub fn connected(&mut self, contact_points: &[String]) -> io::Result<()> {
        writeln!(self.out, "Connected to {}", contact_points.join(", "))
    }

    pub fn connection_failed(&mut self, err: &DataError) -> io::Result<()> {
        writeln!(self.out, "{}", err)?;
        writeln!(self.out, "Failed to connect. Exiting...")
    }

    pub fn keyspace_ready(&mut self, keyspace: &str) -> io::Result<()> {
        writeln!(self.out, "Keyspace '{}' ready", keyspace)
    }

    pub fn table_ready(&mut self, table: &str) -> io::Result<()> {
        writeln!(self.out, "Table '{}' ready", table)
    }

    pub fn inserting(&mut self) -> io::Result<()> {
        writeln!(self.out, "\nInserting sample users...")
    }

    pub fn user_inserted(&mut self, username: &str, user_id: UserId) -> io::Result<()> {
        writeln!(self.out, "User '{}' inserted ({})", username, user_id)
    }

    pub fn user_listed(&mut self, user: &UserRecord) -> io::Result<()> {
        writeln!(
            self.out,
            "ID: {} | Username: {} | Email: {} | Created: {}",
            user.user_id,
            user.username,
            user.email,
            user.created_at.format("%Y-%m-%d %H:%M:%S%.3f UTC")
        )
    }

    pub fn users_header(&mut self) -> io::Result<()> {
        writeln!(self.out, "\nUsers in database:")?;
        writeln!(self.out, "{}", "-".repeat(WIDTH))
    }

    pub fn users_footer(&mut self, count: usize) -> io::Result<()> {
        writeln!(self.out, "{}", "-".repeat(WIDTH))?;
        writeln!(self.out, "{} user(s) listed", count)
    }

    pub fn user_found(&mut self, user: &UserRecord) -> io::Result<()> {
        writeln!(self.out, "\nFound user: {} ({})", user.username, user.email)
    }

    pub fn user_not_found(&mut self, user_id: UserId) -> io::Result<()> {
        writeln!(self.out, "\nNo user found with ID: {}", user_id)
    }

    pub fn lookup_skipped(&mut self) -> io::Result<()> {
        writeln!(self.out, "\nNo user was inserted; skipping lookup")
    }

    /// Non-fatal failure of one insert, row or query.
    pub fn failure(&mut self, err: &DataError) -> io::Result<()> {
        writeln!(self.out, "{}", err)
    }

    pub fn completed(&mut self, failures: usize) -> io::Result<()> {
        writeln!(self.out, "\n{}", "=".repeat(WIDTH))?;
        if failures == 0 {
            writeln!(self.out, "Data management operations completed successfully!")?;
        } else {
            writeln!(
                self.out,
                "Data management operations completed with {} error(s)",
                failures
            )?;
        }
        writeln!(self.out, "{}", "=".repeat(WIDTH))
    }

    pub fn aborted(&mut self, err: &DataError) -> io::Result<()> {
        writeln!(self.out, "An error occurred: {}", err)
    }

    pub fn closed(&mut self) -> io::Result<()> {
        writeln!(self.out, "\nConnection closed.")
    }
}
