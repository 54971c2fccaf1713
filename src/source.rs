//! Boundary to whatever delivers mail: an IMAP server in production, an
//! in-memory mailbox in tests.

use chrono::{Months, NaiveDate};
use std::ops::{Deref, DerefMut};
use tracing::{info, warn};

use crate::error::ScanError;
use crate::message::RawMessage;

pub trait MailSource {
    type Connection: MailConnection;

    fn connect(&self) -> Result<Self::Connection, ScanError>;
}

pub trait MailConnection {
    /// Messages in `mailbox` dated on or after `cutoff`, oldest first. The
    /// total is known before the first message is read.
    fn list_since(
        &mut self,
        mailbox: &str,
        cutoff: NaiveDate,
    ) -> Result<MessageListing<'_>, ScanError>;

    fn release(&mut self) -> Result<(), ScanError>;
}

pub struct MessageListing<'a> {
    pub total: usize,
    pub messages: Box<dyn Iterator<Item = Result<RawMessage, ScanError>> + 'a>,
}

impl<'a> MessageListing<'a> {
    pub fn empty() -> Self {
        Self {
            total: 0,
            messages: Box::new(std::iter::empty()),
        }
    }
}

/// Holds a connection and releases it exactly once: through
/// [`ConnectionGuard::release`], or on drop if that never happened.
pub struct ConnectionGuard<C: MailConnection> {
    connection: C,
    released: bool,
}

impl<C: MailConnection> ConnectionGuard<C> {
    pub fn new(connection: C) -> Self {
        Self {
            connection,
            released: false,
        }
    }

    pub fn release(mut self) -> Result<(), ScanError> {
        self.released = true;
        self.connection.release()
    }
}

impl<C: MailConnection> Deref for ConnectionGuard<C> {
    type Target = C;

    fn deref(&self) -> &C {
        &self.connection
    }
}

impl<C: MailConnection> DerefMut for ConnectionGuard<C> {
    fn deref_mut(&mut self) -> &mut C {
        &mut self.connection
    }
}

impl<C: MailConnection> Drop for ConnectionGuard<C> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        info!(action = "release", component = "connection", "Releasing connection on drop");
        if let Err(e) = self.connection.release() {
            warn!(action = "release", component = "connection", error = %e, "Failed to release connection");
        }
    }
}

/// First day of the scan window: `months` calendar months before `today`.
/// Days past the end of the target month clamp to its last day.
pub fn cutoff_date(today: NaiveDate, months: u32) -> NaiveDate {
    today
        .checked_sub_months(Months::new(months))
        .unwrap_or(NaiveDate::MIN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    struct CountingConnection {
        releases: Rc<Cell<u32>>,
    }

    impl MailConnection for CountingConnection {
        fn list_since(
            &mut self,
            _mailbox: &str,
            _cutoff: NaiveDate,
        ) -> Result<MessageListing<'_>, ScanError> {
            Ok(MessageListing::empty())
        }

        fn release(&mut self) -> Result<(), ScanError> {
            self.releases.set(self.releases.get() + 1);
            Ok(())
        }
    }

    fn guard(releases: &Rc<Cell<u32>>) -> ConnectionGuard<CountingConnection> {
        ConnectionGuard::new(CountingConnection {
            releases: Rc::clone(releases),
        })
    }

    #[test]
    fn explicit_release_is_not_repeated_on_drop() {
        let releases = Rc::new(Cell::new(0));
        guard(&releases).release().unwrap();
        assert_eq!(releases.get(), 1);
    }

    #[test]
    fn dropping_an_unreleased_guard_releases() {
        let releases = Rc::new(Cell::new(0));
        {
            let mut held = guard(&releases);
            let listing = held.list_since("INBOX", NaiveDate::MIN).unwrap();
            assert_eq!(listing.total, 0);
        }
        assert_eq!(releases.get(), 1);
    }

    #[test]
    fn cutoff_goes_back_whole_months() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        assert_eq!(cutoff_date(today, 3), NaiveDate::from_ymd_opt(2026, 7, 18).unwrap());
        assert_eq!(cutoff_date(today, 12), NaiveDate::from_ymd_opt(2025, 10, 18).unwrap());
    }

    #[test]
    fn cutoff_clamps_to_month_end() {
        let today = NaiveDate::from_ymd_opt(2026, 5, 31).unwrap();
        assert_eq!(cutoff_date(today, 3), NaiveDate::from_ymd_opt(2026, 2, 28).unwrap());
    }
}
