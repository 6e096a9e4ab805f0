#![allow(missing_docs)]

pub(crate) mod database;
pub(crate) mod http;
pub(crate) mod notifier;

pub(crate) use database::{get_test_connection, get_test_connection_with_user};
pub(crate) use http::{assert_content_type, parse_json_body};
pub(crate) use notifier::{FailingNotifier, RecordingNotifier, SlowNotifier};
