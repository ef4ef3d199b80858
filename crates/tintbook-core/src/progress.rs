//! Progress records and their wire shapes.
//!
//! A progress record is the server-canonical list of actions for one
//! (user, coloring image) pair, guarded by an optimistic version number the
//! server assigns and clients only echo back.

use crate::action::ActionRecord;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Body of a save request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRequest {
    pub coloring_image_id: String,
    pub actions: Vec<ActionRecord>,
    /// Last version this client observed.
    pub version: u64,
    pub canvas_width: f64,
    pub canvas_height: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_data_url: Option<String>,
}

/// Successful save.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveResponse {
    pub version: u64,
}

/// Body of a 409 response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictResponse {
    pub current_version: u64,
}

/// Body of any other failed response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Successful load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadResponse {
    pub actions: Vec<ActionRecord>,
    pub version: u64,
    pub canvas_width: f64,
    pub canvas_height: f64,
}

/// Server-side stored record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    pub actions: Vec<ActionRecord>,
    pub version: u64,
    pub canvas_width: f64,
    pub canvas_height: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_data_url: Option<String>,
    /// Unix milliseconds of the last accepted save.
    pub updated_at: u64,
}

impl ProgressRecord {
    pub fn to_load_response(&self) -> LoadResponse {
        LoadResponse {
            actions: self.actions.clone(),
            version: self.version,
            canvas_width: self.canvas_width,
            canvas_height: self.canvas_height,
        }
    }
}

/// Why a save was not applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SaveRejected {
    /// The save carried a stale version.
    #[error("Version conflict, record is at {current_version}")]
    Conflict { current_version: u64 },
    /// The save's version has no successor.
    #[error("Version {version} cannot be advanced")]
    VersionOverflow { version: u64 },
}

/// Apply a save to the stored record under the optimistic version lock.
///
/// An absent record accepts any version and stores `version + 1`. An
/// existing record accepts only its own version and is bumped by one. A
/// replay of the save that produced the stored version (same target
/// version, same content) is acknowledged without writing, which makes
/// at-least-once delivery safe. Returns the stored version.
pub fn apply_save(slot: &mut Option<ProgressRecord>, request: SaveRequest, now: u64) -> Result<u64, SaveRejected> {
    if let Some(existing) = slot.as_ref() {
        if request.version != existing.version {
            if is_replay(existing, &request) {
                return Ok(existing.version);
            }
            return Err(SaveRejected::Conflict {
                current_version: existing.version,
            });
        }
    }

    let version = request
        .version
        .checked_add(1)
        .ok_or(SaveRejected::VersionOverflow {
            version: request.version,
        })?;
    *slot = Some(ProgressRecord {
        actions: request.actions,
        version,
        canvas_width: request.canvas_width,
        canvas_height: request.canvas_height,
        preview_data_url: request.preview_data_url,
        updated_at: now,
    });
    Ok(version)
}

fn is_replay(existing: &ProgressRecord, request: &SaveRequest) -> bool {
    request.version.checked_add(1) == Some(existing.version)
        && request.actions == existing.actions
        && request.canvas_width == existing.canvas_width
        && request.canvas_height == existing.canvas_height
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(version: u64, actions: usize) -> SaveRequest {
        SaveRequest {
            coloring_image_id: "unicorn".to_string(),
            actions: (0..actions)
                .map(|i| ActionRecord {
                    id: format!("a{i}"),
                    kind: "fill".to_string(),
                    timestamp: i as u64,
                    data: serde_json::json!({}),
                })
                .collect(),
            version,
            canvas_width: 1024.0,
            canvas_height: 768.0,
            preview_data_url: None,
        }
    }

    #[test]
    fn test_first_save_creates_version_one() {
        let mut slot = None;
        assert_eq!(apply_save(&mut slot, request(0, 1), 5), Ok(1));
        let record = slot.unwrap();
        assert_eq!(record.version, 1);
        assert_eq!(record.updated_at, 5);
    }

    #[test]
    fn test_conflict_then_retry() {
        let mut slot = None;
        for v in 0..7 {
            apply_save(&mut slot, request(v, v as usize + 1), 0).unwrap();
        }
        // Server at 7, client still at 3.
        assert_eq!(
            apply_save(&mut slot, request(3, 20), 0),
            Err(SaveRejected::Conflict { current_version: 7 })
        );
        assert_eq!(apply_save(&mut slot, request(7, 20), 0), Ok(8));
        assert_eq!(slot.unwrap().actions.len(), 20);
    }

    #[test]
    fn test_replayed_save_is_idempotent() {
        let mut slot = None;
        apply_save(&mut slot, request(0, 2), 1).unwrap();
        assert_eq!(apply_save(&mut slot, request(0, 2), 2), Ok(1));
        assert_eq!(slot.as_ref().unwrap().updated_at, 1);

        // Different content under the same stale version still conflicts.
        assert_eq!(
            apply_save(&mut slot, request(0, 3), 3),
            Err(SaveRejected::Conflict { current_version: 1 })
        );
    }

    #[test]
    fn test_unadvanceable_version_is_rejected() {
        let mut slot = None;
        assert_eq!(
            apply_save(&mut slot, request(u64::MAX, 1), 0),
            Err(SaveRejected::VersionOverflow { version: u64::MAX })
        );
        assert!(slot.is_none());

        // A record already at the top stays put.
        let mut slot = None;
        apply_save(&mut slot, request(u64::MAX - 1, 1), 0).unwrap();
        assert_eq!(slot.as_ref().unwrap().version, u64::MAX);
        assert_eq!(
            apply_save(&mut slot, request(u64::MAX, 2), 9),
            Err(SaveRejected::VersionOverflow { version: u64::MAX })
        );
        // Stale saves against it still conflict rather than wrap.
        assert_eq!(
            apply_save(&mut slot, request(3, 2), 9),
            Err(SaveRejected::Conflict { current_version: u64::MAX })
        );
        let record = slot.unwrap();
        assert_eq!((record.version, record.actions.len(), record.updated_at), (u64::MAX, 1, 0));
    }

    #[test]
    fn test_wire_names() {
        let value = serde_json::to_value(request(4, 0)).unwrap();
        assert_eq!(value["coloringImageId"], "unicorn");
        assert_eq!(value["canvasWidth"], 1024.0);
        assert!(value.get("previewDataUrl").is_none());

        let conflict: ConflictResponse = serde_json::from_str(r#"{"currentVersion": 9}"#).unwrap();
        assert_eq!(conflict.current_version, 9);
    }
}
