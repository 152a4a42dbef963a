use serde::{Deserialize, Serialize};

/// Message priority levels for queue ordering (higher values = higher priority)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessagePriority {
    /// Low priority messages (processed last)
    Low = 1,

    /// Medium priority messages (default)
    Medium = 2,

    /// High priority messages (processed first)
    High = 3,

    /// Urgent messages (processed immediately, short default TTL)
    Urgent = 4,
}

// Dequeue ordering: entries.sort_by_key(|e| (Reverse(e.priority), e.scheduled_for))
// Higher priority first, then ascending schedule time within a class.

impl Default for MessagePriority {
    fn default() -> Self {
        Self::Medium
    }
}

impl MessagePriority {
    /// Get all priority levels in order (low to high)
    pub fn all() -> &'static [MessagePriority] {
        &[Self::Low, Self::Medium, Self::High, Self::Urgent]
    }

    /// Get the numeric value for ordering
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Create from numeric value
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Low),
            2 => Some(Self::Medium),
            3 => Some(Self::High),
            4 => Some(Self::Urgent),
            _ => None,
        }
    }

    /// Multiplier applied to the base processing window when estimating
    /// delivery time at enqueue
    pub fn delivery_multiplier(self) -> f64 {
        match self {
            Self::Urgent => 0.5,
            Self::High => 0.7,
            Self::Medium => 1.0,
            Self::Low => 1.5,
        }
    }

    /// Get human-readable name
    pub fn name(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }
}

impl std::fmt::Display for MessagePriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for MessagePriority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "urgent" => Ok(Self::Urgent),
            _ => Err(format!("Invalid priority: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_ordering() {
        assert!(MessagePriority::Urgent > MessagePriority::High);
        assert!(MessagePriority::High > MessagePriority::Medium);
        assert!(MessagePriority::Medium > MessagePriority::Low);
    }

    #[test]
    fn test_delivery_multipliers() {
        assert_eq!(MessagePriority::Urgent.delivery_multiplier(), 0.5);
        assert_eq!(MessagePriority::High.delivery_multiplier(), 0.7);
        assert_eq!(MessagePriority::Medium.delivery_multiplier(), 1.0);
        assert_eq!(MessagePriority::Low.delivery_multiplier(), 1.5);
    }

    #[test]
    fn test_round_trip_names() {
        for p in MessagePriority::all() {
            assert_eq!(p.name().parse::<MessagePriority>().unwrap(), *p);
        }
    }
}
