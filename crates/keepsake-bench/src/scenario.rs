//! Scenario files and probe scoring.
//!
//! A scenario is a scripted conversation. Some user turns carry a probe:
//! strings the assistant's reply must contain for the turn to count as
//! remembered.
//!
//! ```json
//! {
//!   "name": "travel-kyoto",
//!   "description": "Trip planning with a mid-conversation hotel change",
//!   "turns": [
//!     { "user": "Kenji's phone is 090-8765-4321." },
//!     { "user": "What was Kenji's number?", "probe": { "expected": ["090-8765-4321"] } }
//!   ]
//! }
//! ```

use keepsake::{KeepsakeError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Scenario {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub turns: Vec<Turn>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Turn {
    pub user: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probe: Option<Probe>,
}

/// Strings the reply must contain, matched case-insensitively.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Probe {
    pub expected: Vec<String>,
}

impl Probe {
    /// Fraction of expected strings found in `reply`. An empty probe scores 1.
    pub fn score(&self, reply: &str) -> f64 {
        if self.expected.is_empty() {
            return 1.0;
        }
        let reply = reply.to_lowercase();
        let found = self
            .expected
            .iter()
            .filter(|e| reply.contains(&e.to_lowercase()))
            .count();
        found as f64 / self.expected.len() as f64
    }

    pub fn passed(&self, reply: &str) -> bool {
        self.score(reply) >= 1.0
    }
}

impl Scenario {
    pub fn probe_count(&self) -> usize {
        self.turns.iter().filter(|t| t.probe.is_some()).count()
    }

    fn validate(&self, source: &Path) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(KeepsakeError::Scenario(format!(
                "{}: scenario name is empty",
                source.display()
            )));
        }
        if self.turns.is_empty() {
            return Err(KeepsakeError::Scenario(format!(
                "{}: scenario '{}' has no turns",
                source.display(),
                self.name
            )));
        }
        Ok(())
    }
}

/// Load one scenario file, or every `*.json` file in a directory in
/// file-name order. Scenario names must be unique.
pub fn load_scenarios(path: &Path) -> Result<Vec<Scenario>> {
    let files = if path.is_dir() {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(path)? {
            let file = entry?.path();
            if file.is_file() && file.extension().is_some_and(|ext| ext == "json") {
                files.push(file);
            }
        }
        files.sort();
        files
    } else {
        vec![path.to_path_buf()]
    };

    let mut scenarios = Vec::with_capacity(files.len());
    let mut names = HashSet::new();
    for file in files {
        let text = std::fs::read_to_string(&file).map_err(|e| {
            KeepsakeError::Scenario(format!("failed to read {}: {e}", file.display()))
        })?;
        let scenario: Scenario = serde_json::from_str(&text).map_err(|e| {
            KeepsakeError::Scenario(format!("failed to parse {}: {e}", file.display()))
        })?;
        scenario.validate(&file)?;
        if !names.insert(scenario.name.clone()) {
            return Err(KeepsakeError::Scenario(format!(
                "duplicate scenario name '{}' in {}",
                scenario.name,
                file.display()
            )));
        }
        debug!(
            "Loaded scenario '{}' ({} turns) from {}",
            scenario.name,
            scenario.turns.len(),
            file.display()
        );
        scenarios.push(scenario);
    }

    if scenarios.is_empty() {
        return Err(KeepsakeError::Scenario(format!(
            "no scenarios found at {}",
            path.display()
        )));
    }
    Ok(scenarios)
}

#[cfg(test)]
mod tests {
    use super::*;

    const KYOTO: &str = r#"{
        "name": "travel-kyoto",
        "turns": [
            { "user": "Kenji's phone is 090-8765-4321." },
            { "user": "What was Kenji's number?", "probe": { "expected": ["090-8765-4321"] } }
        ]
    }"#;

    #[test]
    fn probe_scoring_is_case_insensitive_fraction() {
        let probe = Probe {
            expected: vec!["Hilton Garden Inn".into(), "May 3".into()],
        };
        assert_eq!(probe.score("You are at the hilton garden inn."), 0.5);
        assert!(!probe.passed("You are at the hilton garden inn."));
        assert!(probe.passed("Hilton Garden Inn, arriving May 3."));
        assert_eq!(Probe { expected: vec![] }.score("anything"), 1.0);
    }

    #[test]
    fn parses_scenario_json() {
        let scenario: Scenario = serde_json::from_str(KYOTO).unwrap();
        assert_eq!(scenario.name, "travel-kyoto");
        assert_eq!(scenario.turns.len(), 2);
        assert_eq!(scenario.probe_count(), 1);
        assert!(scenario.description.is_none());
    }

    #[test]
    fn loads_directory_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.json"), KYOTO).unwrap();
        std::fs::write(
            dir.path().join("a.json"),
            r#"{"name": "alpha", "turns": [{"user": "hi"}]}"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let scenarios = load_scenarios(dir.path()).unwrap();
        let names: Vec<_> = scenarios.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["alpha", "travel-kyoto"]);
    }

    #[test]
    fn loads_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("kyoto.json");
        std::fs::write(&file, KYOTO).unwrap();
        assert_eq!(load_scenarios(&file).unwrap().len(), 1);
    }

    #[test]
    fn rejects_duplicates_and_empty() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.json"), KYOTO).unwrap();
        std::fs::write(dir.path().join("b.json"), KYOTO).unwrap();
        assert!(matches!(
            load_scenarios(dir.path()),
            Err(KeepsakeError::Scenario(_))
        ));

        let empty = tempfile::tempdir().unwrap();
        assert!(load_scenarios(empty.path()).is_err());

        let no_turns = tempfile::tempdir().unwrap();
        std::fs::write(
            no_turns.path().join("x.json"),
            r#"{"name": "x", "turns": []}"#,
        )
        .unwrap();
        assert!(load_scenarios(no_turns.path()).is_err());
    }
}
