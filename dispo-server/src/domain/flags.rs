//! Schedule line flags.
//!
//! The simulator annotates each schedule line with a compact flag string
//! such as `"E(8123)"`, `"DR"` or `"W[4][7]K2(912)"`. Each flag is one
//! uppercase letter, optionally followed by digits and by parenthesised or
//! bracketed arguments. Only the flags that matter for delay planning are
//! decoded; everything else is kept verbatim in `raw`.

use super::TrainId;

/// Decoded schedule line flags.
///
/// # Examples
///
/// ```
/// use dispo_server::domain::{StopFlags, TrainId};
///
/// let flags = StopFlags::parse("RE(8123)");
/// assert!(flags.reversal);
/// assert_eq!(flags.replacement, Some(TrainId(8123)));
/// assert!(flags.has_link());
///
/// let flags = StopFlags::parse("D");
/// assert!(flags.through_pass);
/// assert!(!flags.has_link());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StopFlags {
    /// `E(id)`: train `id` continues this service under a new number.
    pub replacement: Option<TrainId>,
    /// `K(id)`: this train couples into train `id`.
    pub coupling: Option<TrainId>,
    /// `F(id)`: train `id` splits off here.
    pub split_off: Option<TrainId>,
    /// `D`: the train passes without stopping.
    pub through_pass: bool,
    /// `R`: direction reversal.
    pub reversal: bool,
    /// `L`: locomotive runs round the train.
    pub loco_cycle: bool,
    /// `W`: locomotive change.
    pub loco_change: bool,
    /// The flag string as received.
    pub raw: String,
}

impl StopFlags {
    /// Decode a flag string. Never fails; unknown flags are ignored and a
    /// link flag whose argument is not a number yields no link.
    pub fn parse(raw: &str) -> Self {
        let mut flags = StopFlags {
            raw: raw.to_string(),
            ..Default::default()
        };

        let mut chars = raw.chars().peekable();
        while let Some(c) = chars.next() {
            if !c.is_ascii_uppercase() {
                continue;
            }

            // optional variant digits, e.g. "K2(912)"
            while chars.peek().is_some_and(|d| d.is_ascii_digit()) {
                chars.next();
            }

            // parenthesised or bracketed arguments; the first one counts
            let mut argument: Option<String> = None;
            while let Some(&open) = chars.peek() {
                let close = match open {
                    '(' => ')',
                    '[' => ']',
                    _ => break,
                };
                chars.next();
                let mut value = String::new();
                for inner in chars.by_ref() {
                    if inner == close {
                        break;
                    }
                    value.push(inner);
                }
                if argument.is_none() && open == '(' {
                    argument = Some(value);
                }
            }

            let target = || {
                argument
                    .as_deref()
                    .and_then(|a| a.trim().parse::<u32>().ok())
                    .map(TrainId)
            };

            match c {
                'E' => flags.replacement = target(),
                'K' => flags.coupling = target(),
                'F' => flags.split_off = target(),
                'D' => flags.through_pass = true,
                'R' => flags.reversal = true,
                'L' => flags.loco_cycle = true,
                'W' => flags.loco_change = true,
                _ => {}
            }
        }

        flags
    }

    /// Returns true if any replacement, coupling or splitting target is set.
    pub fn has_link(&self) -> bool {
        self.replacement.is_some() || self.coupling.is_some() || self.split_off.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_string() {
        let flags = StopFlags::parse("");
        assert_eq!(flags, StopFlags::default());
    }

    #[test]
    fn link_flags() {
        let flags = StopFlags::parse("E(1)K(2)F(3)");
        assert_eq!(flags.replacement, Some(TrainId(1)));
        assert_eq!(flags.coupling, Some(TrainId(2)));
        assert_eq!(flags.split_off, Some(TrainId(3)));
    }

    #[test]
    fn variant_digits_before_argument() {
        let flags = StopFlags::parse("K2(912)");
        assert_eq!(flags.coupling, Some(TrainId(912)));
    }

    #[test]
    fn loco_change_with_brackets() {
        let flags = StopFlags::parse("W[4][7]E(55)");
        assert!(flags.loco_change);
        assert_eq!(flags.replacement, Some(TrainId(55)));
    }

    #[test]
    fn bad_argument_yields_no_link() {
        let flags = StopFlags::parse("E(abc)F()");
        assert_eq!(flags.replacement, None);
        assert_eq!(flags.split_off, None);
        assert!(!flags.has_link());
    }

    #[test]
    fn unclosed_argument() {
        let flags = StopFlags::parse("F(12");
        assert_eq!(flags.split_off, Some(TrainId(12)));
    }

    #[test]
    fn simple_flags() {
        let flags = StopFlags::parse("A DLR");
        assert!(flags.through_pass);
        assert!(flags.loco_cycle);
        assert!(flags.reversal);
        assert!(!flags.loco_change);
        assert_eq!(flags.raw, "A DLR");
    }

    #[test]
    fn lowercase_is_ignored() {
        let flags = StopFlags::parse("e(12)d");
        assert_eq!(flags.replacement, None);
        assert!(!flags.through_pass);
    }
}
