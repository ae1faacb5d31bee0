//! Monotone `Created -> IsOpen -> Finished` state shared by events and
//! voting sessions.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Created,
    IsOpen,
    Finished,
}

impl LifecycleState {
    /// Stable storage value.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::IsOpen => "is_open",
            Self::Finished => "finished",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "created" => Some(Self::Created),
            "is_open" => Some(Self::IsOpen),
            "finished" => Some(Self::Finished),
            _ => None,
        }
    }

    /// The only state reachable from `self`, if any.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Created => Some(Self::IsOpen),
            Self::IsOpen => Some(Self::Finished),
            Self::Finished => None,
        }
    }

    pub fn can_advance_to(self, target: Self) -> bool {
        self.next() == Some(target)
    }
}

#[cfg(test)]
mod tests {
    use super::LifecycleState::{self, Created, Finished, IsOpen};

    #[test]
    fn transitions_are_forward_only_and_single_step() {
        assert!(Created.can_advance_to(IsOpen));
        assert!(IsOpen.can_advance_to(Finished));
        assert!(!Created.can_advance_to(Finished));
        assert!(!IsOpen.can_advance_to(Created));
        assert!(!Finished.can_advance_to(IsOpen));
        assert_eq!(Finished.next(), None);
    }

    #[test]
    fn storage_values_parse_back() {
        for state in [Created, IsOpen, Finished] {
            assert_eq!(LifecycleState::parse(state.as_str()), Some(state));
        }
        assert_eq!(LifecycleState::parse("open"), None);
    }
}
