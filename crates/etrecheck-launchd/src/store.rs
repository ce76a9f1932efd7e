//! Descriptor parsing via the `plist` crate.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::io::Cursor;
use std::path::Path;
use std::time::SystemTime;

use etrecheck_core::{Descriptor, LaunchdError, PlistValue, Result};

use crate::services::DescriptorStore;

/// Reads XML or binary property lists from disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlistDescriptorStore;

#[async_trait]
impl DescriptorStore for PlistDescriptorStore {
    async fn read(&self, path: &Path) -> Result<Descriptor> {
        let unreadable = |reason: String| LaunchdError::DescriptorUnreadable {
            path: path.display().to_string(),
            reason,
        };
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| unreadable(e.to_string()))?;
        parse_descriptor(&bytes).map_err(unreadable)
    }
}

/// Parse descriptor bytes; the top level must be a dictionary.
pub fn parse_descriptor(bytes: &[u8]) -> std::result::Result<Descriptor, String> {
    let value = plist::Value::from_reader(Cursor::new(bytes)).map_err(|e| e.to_string())?;
    match value {
        plist::Value::Dictionary(dict) => Ok(Descriptor::new(convert_dictionary(dict))),
        _ => Err("top level is not a dictionary".to_string()),
    }
}

fn convert_dictionary(dict: plist::Dictionary) -> BTreeMap<String, PlistValue> {
    dict.into_iter()
        .filter_map(|(key, value)| convert(value).map(|v| (key, v)))
        .collect()
}

/// Convert a `plist::Value`; values with no typed counterpart are dropped.
fn convert(value: plist::Value) -> Option<PlistValue> {
    match value {
        plist::Value::String(s) => Some(PlistValue::String(s)),
        plist::Value::Boolean(b) => Some(PlistValue::Boolean(b)),
        plist::Value::Integer(i) => i
            .as_signed()
            .or_else(|| i.as_unsigned().and_then(|u| i64::try_from(u).ok()))
            .map(PlistValue::Integer),
        plist::Value::Real(r) => Some(PlistValue::Real(r)),
        plist::Value::Date(d) => Some(PlistValue::Date(DateTime::<Utc>::from(SystemTime::from(d)))),
        plist::Value::Data(bytes) => Some(PlistValue::Data(bytes)),
        plist::Value::Array(items) => Some(PlistValue::Array(
            items.into_iter().filter_map(convert).collect(),
        )),
        plist::Value::Dictionary(dict) => Some(PlistValue::Dictionary(convert_dictionary(dict))),
        plist::Value::Uid(uid) => i64::try_from(uid.get()).ok().map(PlistValue::Integer),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const AGENT_PLIST: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
    <key>Label</key>
    <string>com.example.agent</string>
    <key>ProgramArguments</key>
    <array>
        <string>/usr/local/bin/agent</string>
        <string>--daemon</string>
    </array>
    <key>RunAtLoad</key>
    <true/>
    <key>StartInterval</key>
    <integer>3600</integer>
    <key>KeepAlive</key>
    <dict>
        <key>SuccessfulExit</key>
        <false/>
    </dict>
</dict>
</plist>"#;

    #[test]
    fn parses_agent_plist() {
        let d = parse_descriptor(AGENT_PLIST.as_bytes()).unwrap();
        assert_eq!(d.label(), Some("com.example.agent"));
        assert_eq!(d.executable(), Some("/usr/local/bin/agent"));
        assert!(d.run_at_load());
        assert!(d.keep_alive());
        assert_eq!(d.get("StartInterval"), Some(&PlistValue::Integer(3600)));
    }

    #[test]
    fn rejects_non_dictionary() {
        let array = r#"<?xml version="1.0" encoding="UTF-8"?>
<plist version="1.0"><array><string>x</string></array></plist>"#;
        assert!(parse_descriptor(array.as_bytes()).is_err());
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_descriptor(b"not a plist at all").is_err());
        assert!(parse_descriptor(b"").is_err());
    }

    #[tokio::test]
    async fn read_reports_unreadable_descriptors() {
        let missing = PlistDescriptorStore
            .read(Path::new("/nonexistent/Library/LaunchAgents/x.plist"))
            .await
            .unwrap_err();
        assert!(matches!(missing, LaunchdError::DescriptorUnreadable { .. }));

        let mut corrupt = NamedTempFile::new().unwrap();
        write!(corrupt, "<plist><dict><key>Label</key>").unwrap();
        corrupt.flush().unwrap();
        let err = PlistDescriptorStore.read(corrupt.path()).await.unwrap_err();
        assert!(matches!(err, LaunchdError::DescriptorUnreadable { .. }));
    }

    #[tokio::test]
    async fn read_parses_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(AGENT_PLIST.as_bytes()).unwrap();
        file.flush().unwrap();
        let d = PlistDescriptorStore.read(file.path()).await.unwrap();
        assert_eq!(d.program_arguments(), vec!["/usr/local/bin/agent", "--daemon"]);
    }
}
