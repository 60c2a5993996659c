//! Train identifiers and names.

use std::fmt;

/// Simulator train id.
///
/// Stable for the whole simulation session. Unrelated to the train number
/// that appears in the train's display name.
///
/// # Examples
///
/// ```
/// use dispo_server::domain::TrainId;
///
/// let id = TrainId(8123);
/// assert_eq!(id.to_string(), "8123");
/// assert!(TrainId(1) < TrainId(2));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrainId(pub u32);

impl fmt::Display for TrainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for TrainId {
    fn from(value: u32) -> Self {
        TrainId(value)
    }
}

/// Train category from a display name.
///
/// The category is the leading word of a multi-word name, e.g. "ICE" in
/// "ICE 1234". Single-word names have no category.
///
/// ```
/// use dispo_server::domain::train_category;
///
/// assert_eq!(train_category("ICE 1234"), Some("ICE"));
/// assert_eq!(train_category("S8 8376 RF"), Some("S8"));
/// assert_eq!(train_category("12345"), None);
/// ```
pub fn train_category(name: &str) -> Option<&str> {
    let mut words = name.split_whitespace();
    let first = words.next()?;
    words.next().map(|_| first)
}

/// Train number from a display name: the last numeric word.
///
/// ```
/// use dispo_server::domain::train_number;
///
/// assert_eq!(train_number("S8 8376 RF"), Some(8376));
/// assert_eq!(train_number("RE 10"), Some(10));
/// assert_eq!(train_number("Lok"), None);
/// ```
pub fn train_number(name: &str) -> Option<u32> {
    name.split_whitespace()
        .rev()
        .find_map(|word| word.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_edge_cases() {
        assert_eq!(train_category(""), None);
        assert_eq!(train_category("   "), None);
        assert_eq!(train_category("  RB   55 "), Some("RB"));
    }

    #[test]
    fn number_edge_cases() {
        assert_eq!(train_number(""), None);
        assert_eq!(train_number("IC 2 3"), Some(3));
    }

    #[test]
    fn id_conversions() {
        let id: TrainId = 7.into();
        assert_eq!(id, TrainId(7));
    }
}
