use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Identifier of the external subject a flow is bound to, e.g. one physical
/// device or one wallet session. Events carrying a different subject are
/// ignored by the flow.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubjectId(String);

impl SubjectId {
    pub fn new(id: String) -> Self {
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl Display for SubjectId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SubjectId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SubjectId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subject_id_from_str() {
        let id: SubjectId = "hww-3f2a".into();
        assert_eq!(id.as_str(), "hww-3f2a");
        assert_eq!(id.to_string(), "hww-3f2a");
    }
}
