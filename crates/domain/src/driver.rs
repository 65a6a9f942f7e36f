//! Driver capabilities: which optional operation groups a driver implements.

use std::fmt;

use serde::{Deserialize, Serialize, Serializer};

use crate::id::DriverId;

/// An optional operation group of the driver contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Capability {
    Discovery,
    Authentication,
    Commands,
    Events,
}

impl Capability {
    pub const ALL: [Self; 4] = [
        Self::Discovery,
        Self::Authentication,
        Self::Commands,
        Self::Events,
    ];

    fn bit(self) -> u8 {
        match self {
            Self::Discovery => 1,
            Self::Authentication => 1 << 1,
            Self::Commands => 1 << 2,
            Self::Events => 1 << 3,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Discovery => "discovery",
            Self::Authentication => "authentication",
            Self::Commands => "commands",
            Self::Events => "events",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The set of capabilities a driver declares.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Capabilities(u8);

impl Capabilities {
    #[must_use]
    pub fn none() -> Self {
        Self(0)
    }

    #[must_use]
    pub fn all() -> Self {
        Capability::ALL.into_iter().collect()
    }

    #[must_use]
    pub fn with(self, capability: Capability) -> Self {
        Self(self.0 | capability.bit())
    }

    #[must_use]
    pub fn contains(self, capability: Capability) -> bool {
        self.0 & capability.bit() != 0
    }

    pub fn iter(self) -> impl Iterator<Item = Capability> {
        Capability::ALL
            .into_iter()
            .filter(move |capability| self.contains(*capability))
    }
}

impl FromIterator<Capability> for Capabilities {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        iter.into_iter().fold(Self::none(), Self::with)
    }
}

impl Serialize for Capabilities {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

/// Introspection record for a loaded driver.
#[derive(Debug, Clone, Serialize)]
pub struct DriverSummary {
    pub id: DriverId,
    pub capabilities: Capabilities,
    /// Number of devices currently owned by the driver.
    pub devices: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_contain_only_added_capabilities() {
        let caps = Capabilities::none()
            .with(Capability::Authentication)
            .with(Capability::Commands);
        assert!(caps.contains(Capability::Authentication));
        assert!(caps.contains(Capability::Commands));
        assert!(!caps.contains(Capability::Discovery));
        assert!(!caps.contains(Capability::Events));
    }

    #[test]
    fn should_contain_everything_when_all() {
        let caps = Capabilities::all();
        assert!(Capability::ALL.iter().all(|c| caps.contains(*c)));
    }

    #[test]
    fn should_serialize_as_list_of_names() {
        let caps: Capabilities = [Capability::Events, Capability::Discovery]
            .into_iter()
            .collect();
        let json = serde_json::to_string(&caps).unwrap();
        assert_eq!(json, r#"["discovery","events"]"#);
    }
}
