//! Integration tests for albumsync-dsm
//!
//! Exercises the DSM adapters against a wiremock emulation of
//! `/webapi/entry.cgi`.

mod common;

mod test_albums;
mod test_auth;
mod test_folder_index;
mod test_web_sharing;
