//! Procedure entries and legacy payload decoding.
//!
//! The remote store carries the procedure cell in two shapes: current rows
//! hold a JSON list of entries, legacy rows hold a flat procedure name with a
//! slot-level regulated flag. [`ProcedurePayload::decode`] is the single
//! place that interprets the shape; everything else works on the canonical
//! entry list.

use serde::{Deserialize, Deserializer, Serialize};

/// Classification of a non-regulated (internal) procedure entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InternalType {
    Emergency,
    ScheduledProject,
}

/// One procedure attached to a booking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcedureEntry {
    /// Procedure name as shown to the operator
    pub name: String,
    /// Whether this entry counts toward the regulated quota bucket
    #[serde(default, deserialize_with = "truthy_flag")]
    pub regulated: bool,
    /// Internal classification; meaningful only when not regulated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internal_type: Option<InternalType>,
}

impl ProcedureEntry {
    /// Create a regulated entry.
    pub fn regulated(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            regulated: true,
            internal_type: None,
        }
    }

    /// Create an internal entry with its classification.
    pub fn internal(name: impl Into<String>, internal_type: InternalType) -> Self {
        Self {
            name: name.into(),
            regulated: false,
            internal_type: Some(internal_type),
        }
    }
}

/// Raw procedure cell as stored remotely.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcedurePayload {
    /// Legacy flat procedure name; the slot-level regulated flag applies.
    Legacy(String),
    /// Current JSON list of entries.
    Entries(Vec<ProcedureEntry>),
}

impl ProcedurePayload {
    /// Classify a raw wire cell without interpreting it.
    pub fn from_wire(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Self::Entries(Vec::new());
        }
        match serde_json::from_str::<Vec<ProcedureEntry>>(trimmed) {
            Ok(entries) => Self::Entries(entries),
            Err(_) => Self::Legacy(trimmed.to_string()),
        }
    }

    /// Decode into the canonical entry list. A legacy name becomes a
    /// list-of-one carrying the slot-level regulated flag.
    pub fn decode(self, legacy_regulated: bool) -> Vec<ProcedureEntry> {
        match self {
            Self::Legacy(name) => vec![ProcedureEntry {
                name,
                regulated: legacy_regulated,
                internal_type: None,
            }],
            Self::Entries(entries) => entries,
        }
    }
}

/// Serialize an entry list back to the wire cell format.
pub fn procedures_to_wire(entries: &[ProcedureEntry]) -> String {
    if entries.is_empty() {
        return String::new();
    }
    serde_json::to_string(entries).unwrap_or_default()
}

/// Accepts the remote store's boolean spellings: `true`, `"TRUE"`, `"YES"`.
/// Anything else (including null) reads as false.
pub(crate) fn truthy_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Bool(bool),
        Text(String),
        Null(Option<()>),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Bool(b) => b,
        Raw::Text(s) => matches!(s.trim().to_uppercase().as_str(), "TRUE" | "YES"),
        Raw::Null(_) => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_and_json_decode_to_same_list() {
        let legacy = ProcedurePayload::from_wire("Trabeculectomia").decode(true);
        let json = ProcedurePayload::from_wire(r#"[{"name":"Trabeculectomia","regulated":true}]"#)
            .decode(false);
        assert_eq!(legacy, json);
        assert_eq!(legacy.len(), 1);
        assert!(legacy[0].regulated);
    }

    #[test]
    fn test_empty_cell_decodes_to_no_entries() {
        assert!(ProcedurePayload::from_wire("").decode(true).is_empty());
        assert!(ProcedurePayload::from_wire("  ").decode(false).is_empty());
    }

    #[test]
    fn test_truthy_regulated_spellings() {
        let entries: Vec<ProcedureEntry> =
            serde_json::from_str(r#"[{"name":"a","regulated":"TRUE"},{"name":"b","regulated":"YES"},{"name":"c","regulated":"no"},{"name":"d","regulated":null}]"#)
                .unwrap();
        assert!(entries[0].regulated);
        assert!(entries[1].regulated);
        assert!(!entries[2].regulated);
        assert!(!entries[3].regulated);
    }

    #[test]
    fn test_internal_type_roundtrip() {
        let entry = ProcedureEntry::internal("Panfoto", InternalType::Emergency);
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"emergency\""));
        let back: ProcedureEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, entry);
    }

    #[test]
    fn test_wire_roundtrip_preserves_order() {
        let entries = vec![
            ProcedureEntry::regulated("Faco"),
            ProcedureEntry::internal("Lio", InternalType::ScheduledProject),
        ];
        let wire = procedures_to_wire(&entries);
        let back = ProcedurePayload::from_wire(&wire).decode(false);
        assert_eq!(back, entries);
    }
}
