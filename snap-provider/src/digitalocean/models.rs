//! Droplets, snapshots and actions as DigitalOcean reports them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DropletStatus {
    New,
    Active,
    Off,
    Archive,
    #[serde(other)]
    Unknown,
}

impl fmt::Display for DropletStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::New => "new",
            Self::Active => "active",
            Self::Off => "off",
            Self::Archive => "archive",
            Self::Unknown => "unknown",
        };
        f.write_str(label)
    }
}

/// A stored disk image of a droplet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: u64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Droplet {
    pub id: u64,
    pub name: String,
    pub status: DropletStatus,

    #[serde(default)]
    pub snapshot_ids: Vec<u64>,

    /// Newest first. Only filled in when the droplet was fetched by id.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub snapshots: Vec<Snapshot>,
}

impl Droplet {
    pub fn is_active(&self) -> bool {
        self.status == DropletStatus::Active
    }

    pub fn is_off(&self) -> bool {
        self.status == DropletStatus::Off
    }

    pub fn snapshot_count(&self) -> usize {
        self.snapshot_ids.len().max(self.snapshots.len())
    }

    /// Order snapshots newest first. Equal timestamps keep their order.
    pub fn sort_snapshots(&mut self) {
        self.snapshots
            .sort_by(|a, b| b.created_at.cmp(&a.created_at));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionStatus {
    InProgress,
    Completed,
    Errored,
    #[serde(other)]
    Unknown,
}

impl fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::InProgress => "in-progress",
            Self::Completed => "completed",
            Self::Errored => "errored",
            Self::Unknown => "unknown",
        };
        f.write_str(label)
    }
}

/// An asynchronous job DigitalOcean runs on a droplet (shutdown, snapshot...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub id: u64,
    pub status: ActionStatus,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub resource_id: Option<u64>,
}

impl Action {
    pub fn message(&self) -> String {
        match self.resource_id {
            Some(droplet_id) => format!(
                "Action {} ({}) for droplet {} {}",
                self.id, self.kind, droplet_id, self.status
            ),
            None => format!("Action {} ({}) {}", self.id, self.kind, self.status),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_droplet_from_api_json() {
        let droplet: Droplet = serde_json::from_str(
            r#"{
                "id": 100823,
                "name": "mrcr.ru",
                "memory": 512,
                "status": "active",
                "snapshot_ids": [5019770, 5019903],
                "features": ["backups"]
            }"#,
        )
        .unwrap();

        assert_eq!(droplet.id, 100823);
        assert!(droplet.is_active());
        assert_eq!(droplet.snapshot_count(), 2);
        assert!(droplet.snapshots.is_empty());
    }

    #[test]
    fn test_unknown_status_is_tolerated() {
        let status: DropletStatus = serde_json::from_str(r#""resizing""#).unwrap();
        assert_eq!(status, DropletStatus::Unknown);
        assert_eq!(DropletStatus::Off.to_string(), "off");
    }

    #[test]
    fn test_sort_snapshots_newest_first() {
        let at = |day| Utc.with_ymd_and_hms(2014, 7, day, 12, 0, 0).unwrap();
        let mut droplet = Droplet {
            id: 1,
            name: "mrcr.ru".to_string(),
            status: DropletStatus::Off,
            snapshot_ids: vec![],
            snapshots: vec![
                Snapshot { id: 17, name: "a".to_string(), created_at: at(17) },
                Snapshot { id: 21, name: "c".to_string(), created_at: at(21) },
                Snapshot { id: 19, name: "b".to_string(), created_at: at(19) },
            ],
        };

        droplet.sort_snapshots();

        let ids: Vec<u64> = droplet.snapshots.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![21, 19, 17]);
    }

    #[test]
    fn test_action_status_and_message() {
        let action: Action = serde_json::from_str(
            r#"{"id": 36804636, "status": "errored", "type": "snapshot", "resource_id": 100823}"#,
        )
        .unwrap();

        assert_eq!(action.status, ActionStatus::Errored);
        assert_eq!(
            action.message(),
            "Action 36804636 (snapshot) for droplet 100823 errored"
        );
    }
}
