use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Serialize, Deserialize, Debug)]
pub struct Health {
    pub status: &'static str,
}

/// Typed client-side view of the collection document.
///
/// The server stores whatever JSON it is given; this is the shape the roster
/// page works with. Unknown top-level fields ride along in `extra` so a
/// fetch-modify-save cycle does not drop them.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Roster {
    #[serde(default)]
    pub students: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Roster {
    pub fn new<I, S>(students: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { students: students.into_iter().map(Into::into).collect(), extra: Map::new() }
    }

    /// Append a student; blank names are ignored. Returns whether it was added.
    pub fn add_student(&mut self, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() {
            return false;
        }
        self.students.push(name.to_string());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn roster_keeps_unknown_fields() {
        let doc = json!({"students": ["Alice"], "teacher": "Ms. Frizzle"});
        let mut roster: Roster = serde_json::from_value(doc).expect("roster");
        assert!(roster.add_student("  Bob "));
        assert!(!roster.add_student("   "));
        let back = serde_json::to_value(&roster).expect("value");
        assert_eq!(back, json!({"students": ["Alice", "Bob"], "teacher": "Ms. Frizzle"}));
    }

    #[test]
    fn missing_students_field_defaults_to_empty() {
        let roster: Roster = serde_json::from_value(json!({})).expect("roster");
        assert!(roster.students.is_empty());
        assert_eq!(Roster::new(["A", "B"]).students, vec!["A", "B"]);
    }
}
