use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Cow;
use std::collections::BTreeSet;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use crate::api::models::SensorReading;

/// Machine filter chosen in the dashboard; `"all"` keeps every reading.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum MachineSelection {
    #[default]
    All,
    Machine(String),
}

impl FromStr for MachineSelection {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim() {
            "" | "all" => Self::All,
            id => Self::Machine(id.to_string()),
        })
    }
}

impl fmt::Display for MachineSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::Machine(id) => f.write_str(id),
        }
    }
}

impl Serialize for MachineSelection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MachineSelection {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(raw.parse().unwrap_or_default())
    }
}

/// Distinct machine ids present in `readings`.
#[must_use]
pub fn machines(readings: &[SensorReading]) -> BTreeSet<String> {
    readings.iter().map(|r| r.machine_id.clone()).collect()
}

/// Readings matching `selection`. `All` borrows the input unchanged.
#[must_use]
pub fn filter<'a>(
    readings: &'a [SensorReading],
    selection: &MachineSelection,
) -> Cow<'a, [SensorReading]> {
    match selection {
        MachineSelection::All => Cow::Borrowed(readings),
        MachineSelection::Machine(id) => Cow::Owned(
            readings
                .iter()
                .filter(|r| &r.machine_id == id)
                .cloned()
                .collect(),
        ),
    }
}
