//! JSON response shapes
//!
//! Every structured reply carries an `error` discriminant: 1 with a
//! message for rejections, 0 with a payload for successes. Rejections
//! go out with HTTP 200; only unrecovered faults use failure codes.

use serde::Serialize;

use crate::db::CoverageRecord;

/// Structured rejection
#[derive(Debug, Serialize)]
pub struct Rejection {
    pub error: u8,
    pub msg: String,
}

impl Rejection {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            error: 1,
            msg: msg.into(),
        }
    }
}

/// Coverage listing success
#[derive(Debug, Serialize)]
pub struct CoverageReply {
    pub error: u8,
    pub msg: Vec<CoverageRecord>,
}

impl CoverageReply {
    pub fn new(msg: Vec<CoverageRecord>) -> Self {
        Self { error: 0, msg }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_shape() {
        let json = serde_json::to_value(Rejection::new("Both lat and lon need to be defined"))
            .unwrap();
        assert_eq!(json["error"], 1);
        assert_eq!(json["msg"], "Both lat and lon need to be defined");
    }

    #[test]
    fn test_coverage_reply_shape() {
        let json = serde_json::to_value(CoverageReply::new(Vec::new())).unwrap();
        assert_eq!(json["error"], 0);
        assert!(json["msg"].as_array().unwrap().is_empty());
    }
}
