//! Session start parameters and their validation.

use serde::{Deserialize, Serialize};

use super::state::RoleLabels;

/// Rounds used when the caller omits `rounds` or sends something unparseable.
pub const DEFAULT_ROUNDS: u32 = 3;

/// Raw start parameters as they arrive on the query string.
///
/// Everything is optional here; [`DebateRequest::validate`] decides what is
/// actually missing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DebateRequest {
    pub topic: Option<String>,
    pub proposer: Option<String>,
    pub challenger: Option<String>,
    pub arbitrator: Option<String>,
    pub rounds: Option<String>,
}

/// Start parameters that passed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebateParams {
    pub topic: String,
    pub labels: RoleLabels,
    pub rounds: u32,
}

impl DebateRequest {
    /// Check required fields and parse the round count.
    ///
    /// Blank strings count as missing. On failure the names of every missing
    /// field are returned in declaration order.
    pub fn validate(&self) -> Result<DebateParams, Vec<&'static str>> {
        let fields = [
            ("topic", &self.topic),
            ("proposer", &self.proposer),
            ("challenger", &self.challenger),
            ("arbitrator", &self.arbitrator),
        ];
        let missing: Vec<&'static str> = fields
            .iter()
            .filter(|(_, value)| present(value).is_none())
            .map(|(name, _)| *name)
            .collect();
        if !missing.is_empty() {
            return Err(missing);
        }

        // All four are present past this point.
        let take = |value: &Option<String>| present(value).unwrap_or_default().to_string();
        let label = |value: &Option<String>| present(value).unwrap_or_default().trim().to_string();

        Ok(DebateParams {
            topic: take(&self.topic),
            labels: RoleLabels {
                proposer: label(&self.proposer),
                challenger: label(&self.challenger),
                arbitrator: label(&self.arbitrator),
            },
            rounds: parse_rounds(self.rounds.as_deref()),
        })
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

/// Parse a round count: absent or unparseable gives the default, negatives clamp to zero.
pub fn parse_rounds(raw: Option<&str>) -> u32 {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => DEFAULT_ROUNDS,
        Some(s) => match s.parse::<i64>() {
            Ok(n) if n < 0 => 0,
            Ok(n) => u32::try_from(n).unwrap_or(u32::MAX),
            Err(_) => DEFAULT_ROUNDS,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_request() -> DebateRequest {
        DebateRequest {
            topic: Some("renewable energy storage".into()),
            proposer: Some("deepseek".into()),
            challenger: Some("qwen".into()),
            arbitrator: Some("kimi".into()),
            rounds: None,
        }
    }

    #[test]
    fn test_valid_request_defaults_rounds() {
        let params = full_request().validate().unwrap();
        assert_eq!(params.topic, "renewable energy storage");
        assert_eq!(params.labels.arbitrator, "kimi");
        assert_eq!(params.rounds, DEFAULT_ROUNDS);
    }

    #[test]
    fn test_missing_fields_reported_in_order() {
        let request = DebateRequest {
            topic: None,
            challenger: Some("   ".into()),
            ..full_request()
        };
        assert_eq!(request.validate().unwrap_err(), vec!["topic", "challenger"]);
    }

    #[test]
    fn test_labels_are_trimmed() {
        let request = DebateRequest {
            proposer: Some("  deepseek".into()),
            arbitrator: Some(" kimi \t".into()),
            ..full_request()
        };
        let labels = request.validate().unwrap().labels;
        assert_eq!(labels.proposer, "deepseek");
        assert_eq!(labels.challenger, "qwen");
        assert_eq!(labels.arbitrator, "kimi");
    }

    #[test]
    fn test_parse_rounds() {
        assert_eq!(parse_rounds(None), 3);
        assert_eq!(parse_rounds(Some("")), 3);
        assert_eq!(parse_rounds(Some("five")), 3);
        assert_eq!(parse_rounds(Some("0")), 0);
        assert_eq!(parse_rounds(Some("-2")), 0);
        assert_eq!(parse_rounds(Some(" 7 ")), 7);
    }

    #[test]
    fn test_explicit_rounds_carried_through() {
        let request = DebateRequest {
            rounds: Some("1".into()),
            ..full_request()
        };
        assert_eq!(request.validate().unwrap().rounds, 1);
    }
}
