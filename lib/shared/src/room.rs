use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Profile of a room member.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Member {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct ProcessingStatus {
    #[serde(default)]
    pub total_to_process: u32,
    #[serde(default)]
    pub already_processed: u32,
    #[serde(default)]
    pub started: bool,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub checkpoint_time: Option<DateTime<Utc>>,
    /// `None` while the job is running, then the outcome.
    #[serde(default)]
    pub success: Option<bool>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct SharedMusicLibrary {
    #[serde(default)]
    pub total_users: u32,
    pub processing_status: ProcessingStatus,
}

/// Room descriptor returned by `GET /rooms/{roomId}`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Room {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub owner: Option<Member>,
    #[serde(default)]
    pub users: Vec<Member>,
    #[serde(default)]
    pub creation_time: Option<DateTime<Utc>>,
    // The backend stores the flag as a nullable pointer.
    #[serde(default, deserialize_with = "deserialize_locked")]
    pub locked: bool,
    #[serde(default)]
    pub shared_music_library: Option<SharedMusicLibrary>,
    #[serde(default)]
    pub is_owner: bool,
}

impl Room {
    pub fn job_status(&self) -> JobStatus {
        JobStatus::from_library(self.shared_music_library.as_ref())
    }

    pub fn member_ids(&self) -> Vec<&str> {
        self.users.iter().map(|m| m.id.as_str()).collect()
    }
}

/// Body of `POST /rooms`. An empty name lets the backend pick `Room #<id>`.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct NewRoom {
    #[serde(default)]
    pub room_name: String,
}

/// Answer of `POST /rooms`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct CreatedRoom {
    pub room_id: String,
}

fn deserialize_locked<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
}

/// State of the room's "find common music" job.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum JobStatus {
    #[default]
    NotStarted,
    InProgress {
        processed: u32,
        total: u32,
    },
    Done {
        success: bool,
    },
}

impl JobStatus {
    pub fn from_library(library: Option<&SharedMusicLibrary>) -> Self {
        match library {
            None => JobStatus::NotStarted,
            Some(lib) => match lib.processing_status.success {
                None => JobStatus::InProgress {
                    processed: lib.processing_status.already_processed,
                    total: lib.processing_status.total_to_process,
                },
                Some(success) => JobStatus::Done { success },
            },
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done { .. })
    }

    /// Percentage of processed libraries, floored. A zero total reads as 0%.
    pub fn progress_percent(&self) -> u8 {
        match *self {
            JobStatus::NotStarted => 0,
            JobStatus::InProgress { total: 0, .. } => 0,
            JobStatus::InProgress { processed, total } => {
                let percent = u64::from(processed) * 100 / u64::from(total);
                percent.min(100) as u8
            }
            JobStatus::Done { success: true } => 100,
            JobStatus::Done { success: false } => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_status_from_library() {
        assert_eq!(JobStatus::from_library(None), JobStatus::NotStarted);

        let mut library = SharedMusicLibrary {
            total_users: 3,
            processing_status: ProcessingStatus {
                total_to_process: 50,
                already_processed: 13,
                started: true,
                ..Default::default()
            },
        };
        assert_eq!(
            JobStatus::from_library(Some(&library)),
            JobStatus::InProgress {
                processed: 13,
                total: 50
            }
        );

        library.processing_status.success = Some(false);
        assert_eq!(
            JobStatus::from_library(Some(&library)),
            JobStatus::Done { success: false }
        );
    }

    #[test]
    fn progress_percent_floors() {
        let status = JobStatus::InProgress {
            processed: 13,
            total: 50,
        };
        assert_eq!(status.progress_percent(), 26);

        let status = JobStatus::InProgress {
            processed: 2,
            total: 3,
        };
        assert_eq!(status.progress_percent(), 66);
    }

    #[test]
    fn progress_percent_zero_total() {
        let status = JobStatus::InProgress {
            processed: 0,
            total: 0,
        };
        assert_eq!(status.progress_percent(), 0);
    }

    #[test]
    fn parses_room_with_null_lock() {
        let room: Room = serde_json::from_str(
            r#"{
                "id": "abc123",
                "name": "Road trip",
                "users": [{"id": "u1", "name": "alice", "image": ""}],
                "locked": null,
                "shared_music_library": null
            }"#,
        )
        .unwrap();
        assert!(!room.locked);
        assert_eq!(room.job_status(), JobStatus::NotStarted);
        assert_eq!(room.member_ids(), vec!["u1"]);
    }

    #[test]
    fn parses_room_in_progress() {
        let room: Room = serde_json::from_str(
            r#"{
                "id": "abc123",
                "name": "Road trip",
                "users": [],
                "locked": true,
                "shared_music_library": {
                    "total_users": 2,
                    "processing_status": {
                        "total_to_process": 4,
                        "already_processed": 1,
                        "started": true,
                        "started_at": "2021-01-09T15:04:05Z",
                        "checkpoint_time": "2021-01-09T15:05:05Z",
                        "success": null
                    }
                }
            }"#,
        )
        .unwrap();
        assert!(room.locked);
        assert_eq!(room.job_status().progress_percent(), 25);
    }

    #[test]
    fn room_creation_bodies() {
        assert_eq!(
            serde_json::to_string(&NewRoom::default()).unwrap(),
            r#"{"room_name":""}"#
        );
        let created: CreatedRoom = serde_json::from_str(r#"{"room_id": "f00d"}"#).unwrap();
        assert_eq!(created.room_id, "f00d");
    }

    #[test]
    fn parses_room_list_entry_without_owner_flag() {
        let rooms: Vec<Room> = serde_json::from_str(
            r#"[{"id": "r1", "name": "Room #r1", "owner": {"id": "u1", "name": "alice"}, "users": [{"id": "u1", "name": "alice"}], "locked": null, "shared_music_library": null}]"#,
        )
        .unwrap();
        assert_eq!(rooms.len(), 1);
        assert!(!rooms[0].is_owner);
        assert_eq!(rooms[0].owner.as_ref().map(|o| o.name.as_str()), Some("alice"));
    }
}
