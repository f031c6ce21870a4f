//! Integration tests for albumsync-sync
//!
//! Drives the reconciliation engine end to end against in-memory fakes of
//! the remote service, web sharing, authentication and mount ports.

mod common;

mod test_personal;
mod test_sharing;
mod test_waiter;
