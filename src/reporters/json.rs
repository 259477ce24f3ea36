//! JSON reporter
//!
//! Outputs results as pretty-printed JSON for piping to jq or storing
//! alongside pipeline runs.

use anyhow::Result;
use serde::Serialize;

/// Render any result type as JSON
pub fn render<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporters::tests::{test_chain_report, test_result};

    #[test]
    fn test_calibration_json() {
        let json_str = render(&test_result()).expect("render JSON");
        let parsed: serde_json::Value = serde_json::from_str(&json_str).expect("parse JSON");
        assert_eq!(parsed["method_id"], "Reporter.render");
        assert_eq!(parsed["role"], "REPORT");
        assert_eq!(parsed["layer_scores"]["chain"], 0.3);
        assert_eq!(parsed["metadata"]["quality_band"], "insufficient");
        assert_eq!(parsed["metadata"]["layer_details"]["chain"]["kind"], "chain");
        assert_eq!(
            parsed["metadata"]["layer_details"]["base"]["provenance"],
            "table"
        );
    }

    #[test]
    fn test_chain_json() {
        let json_str = render(&test_chain_report()).expect("render JSON");
        let parsed: serde_json::Value = serde_json::from_str(&json_str).expect("parse JSON");
        assert_eq!(parsed["weakest_link"], "Parse.doc");
        assert_eq!(parsed["method_scores"].as_array().expect("array").len(), 2);
    }

    #[test]
    fn test_json_is_deterministic() {
        let a = render(&test_result()).unwrap();
        let b = render(&test_result()).unwrap();
        assert_eq!(a, b);
    }
}
