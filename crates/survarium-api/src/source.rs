//! Optional dump of parsed responses to disk.
//!
//! Each response is appended, pretty-printed, to
//! `{prefix}{path}_{query}{unix_seconds}.json`. Dumps run in the background and
//! never affect the request result.

use std::io;
use std::path::PathBuf;

use log::{debug, warn};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::Value;
use tokio::io::AsyncWriteExt;

use crate::handlers::QueryDescriptor;

/// Dump file name for a descriptor at `timestamp` (unix seconds).
pub fn file_name(descriptor: &QueryDescriptor, timestamp: i64) -> String {
    format!(
        "{}_{}{}.json",
        descriptor.path,
        descriptor.query_string().replacen('&', "_", 1),
        timestamp
    )
}

fn to_pretty(value: &Value) -> serde_json::Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(b"    "));
    value.serialize(&mut serializer)?;
    Ok(out)
}

/// Append `value` to the dump file of `descriptor` under `prefix`.
pub async fn append(prefix: &str, descriptor: &QueryDescriptor, value: &Value) -> io::Result<PathBuf> {
    let destination = PathBuf::from(format!(
        "{}{}",
        prefix,
        file_name(descriptor, chrono::Utc::now().timestamp())
    ));
    let body = to_pretty(value).map_err(io::Error::other)?;

    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&destination)
        .await?;
    file.write_all(&body).await?;
    file.flush().await?;

    Ok(destination)
}

/// Append in a background task. Failures are logged only.
pub fn spawn_save(prefix: String, descriptor: QueryDescriptor, value: Value) {
    tokio::spawn(async move {
        match append(&prefix, &descriptor, &value).await {
            Ok(destination) => debug!("source saved {}", destination.display()),
            Err(e) => warn!("cannot save source {}{}: {}", prefix, descriptor.path, e),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_file_name_replaces_first_ampersand() {
        let descriptor = QueryDescriptor::new("getclans")
            .with("amount", 10u64)
            .with("offset", 0u64);
        assert_eq!(
            file_name(&descriptor, 1451037600),
            "getclans_amount=10_offset=01451037600.json"
        );

        let descriptor = QueryDescriptor::new("getnewmatches")
            .with("timestamp", "1")
            .with("limit", 50u64)
            .with("offset", 0u64);
        assert_eq!(
            file_name(&descriptor, 7),
            "getnewmatches_timestamp=1_limit=50&offset=07.json"
        );
    }

    #[test]
    fn test_file_name_without_query() {
        assert_eq!(
            file_name(&QueryDescriptor::new("getmaxmatchid"), 42),
            "getmaxmatchid_42.json"
        );
    }

    #[tokio::test]
    async fn test_append_writes_pretty_json() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = format!("{}/", dir.path().display());
        let descriptor = QueryDescriptor::new("getclansamount");
        let value = json!({ "amount": 3 });

        let destination = append(&prefix, &descriptor, &value).await.unwrap();
        let written = std::fs::read_to_string(&destination).unwrap();

        assert_eq!(written, "{\n    \"amount\": 3\n}");
        assert!(destination.starts_with(dir.path()));
    }

    #[tokio::test]
    async fn test_append_reports_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = format!("{}/missing/", dir.path().display());
        let result = append(&prefix, &QueryDescriptor::new("getclansamount"), &json!({})).await;
        assert!(result.is_err());
    }
}
