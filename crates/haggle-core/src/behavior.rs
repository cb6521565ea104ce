use serde::{Deserialize, Serialize};

/// Bargaining behavior tag attached to a configuration record.
///
/// The tag is opaque to the reconciliation engine — it is validated against
/// this closed set on the way in and consumed downstream by the storefront
/// widget. Unknown tags are rejected at deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BargainBehavior {
    Lenient,
    Moderate,
    Firm,
}

impl BargainBehavior {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            BargainBehavior::Lenient => "lenient",
            BargainBehavior::Moderate => "moderate",
            BargainBehavior::Firm => "firm",
        }
    }

    /// Parses a stored tag back into the closed set.
    ///
    /// Returns `None` for unknown tags so a stale store value degrades to
    /// "no behavior" instead of failing the read path.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "lenient" => Some(BargainBehavior::Lenient),
            "moderate" => Some(BargainBehavior::Moderate),
            "firm" => Some(BargainBehavior::Firm),
            _ => None,
        }
    }
}

impl std::fmt::Display for BargainBehavior {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
