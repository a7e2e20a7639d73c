use chrono::Weekday;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    ops::{BitAnd, BitOr, BitOrAssign},
    str::FromStr,
};

/// The days of the week a schedule entry meets on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct DaySet(u8);

impl DaySet {
    pub const MONDAY: Self = DaySet(1 << 0);
    pub const TUESDAY: Self = DaySet(1 << 1);
    pub const WEDNESDAY: Self = DaySet(1 << 2);
    pub const THURSDAY: Self = DaySet(1 << 3);
    pub const FRIDAY: Self = DaySet(1 << 4);
    pub const SATURDAY: Self = DaySet(1 << 5);
    pub const SUNDAY: Self = DaySet(1 << 6);

    pub const NONE: Self = DaySet(0);
    pub const ALL: Self = DaySet(0b111_1111);

    /// Monday-first ordering used by both the letter and the mask notation.
    const DAY_CHARS: [(Self, char, Weekday); 7] = [
        (Self::MONDAY, 'M', Weekday::Mon),
        (Self::TUESDAY, 'T', Weekday::Tue),
        (Self::WEDNESDAY, 'W', Weekday::Wed),
        (Self::THURSDAY, 'R', Weekday::Thu),
        (Self::FRIDAY, 'F', Weekday::Fri),
        (Self::SATURDAY, 'S', Weekday::Sat),
        (Self::SUNDAY, 'U', Weekday::Sun),
    ];

    pub fn new() -> Self {
        Self::NONE
    }

    pub fn contains(self, day: Self) -> bool {
        (self & day) == day
    }

    pub fn intersects(self, other: Self) -> bool {
        (self & other).0 != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn add(&mut self, day: Self) {
        *self |= day;
    }

    pub fn from_weekday(day: Weekday) -> Self {
        DaySet(1 << day.num_days_from_monday())
    }

    /// Iterates the contained days, Monday first.
    pub fn iter(self) -> impl Iterator<Item = Weekday> {
        Self::DAY_CHARS
            .into_iter()
            .filter(move |(day, _, _)| self.contains(*day))
            .map(|(_, _, weekday)| weekday)
    }

    /// Parses the positional notation `"M-W-F--"`, where each of the seven
    /// slots is a day (Monday first) and `-` or a space marks its absence.
    pub fn from_mask(mask: &str) -> Option<Self> {
        if mask.chars().count() != 7 {
            return None;
        }

        let mut result = Self::NONE;
        for (c, (day, _, _)) in mask.chars().zip(Self::DAY_CHARS) {
            if c != '-' && c != ' ' {
                result |= day;
            }
        }

        Some(result)
    }

    /// Whether `raw` reads as a positional mask: seven slots, each a day
    /// letter or an absence marker.
    fn looks_like_mask(raw: &str) -> bool {
        raw.chars().count() == 7
            && raw.chars().all(|c| {
                matches!(c.to_ascii_uppercase(), '-' | ' ' | 'M' | 'T' | 'W' | 'R' | 'F' | 'S' | 'U')
            })
    }

    /// The positional notation, e.g. `"M-W-F--"`.
    pub fn to_mask(self) -> String {
        Self::DAY_CHARS
            .iter()
            .map(|&(day, day_char, _)| if self.contains(day) { day_char } else { '-' })
            .collect()
    }
}

impl FromStr for DaySet {
    type Err = ();

    /// Accepts either the positional mask (`"M-W----"`, `"MTWRFSS"`) or a
    /// letter set (`"MWF"`, `"TR"`). Any seven-character string of day letters
    /// and `-` is read as a mask. Unknown characters are ignored.
    fn from_str(days: &str) -> Result<Self, Self::Err> {
        if Self::looks_like_mask(days) {
            if let Some(set) = Self::from_mask(days) {
                return Ok(set);
            }
        }
        let days = days.trim();

        let mut result = Self::NONE;
        for c in days.chars() {
            for &(day, day_char, _) in &Self::DAY_CHARS {
                if c.to_ascii_uppercase() == day_char {
                    result |= day;
                    break;
                }
            }
        }

        Ok(result)
    }
}

impl Display for DaySet {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let mut result = String::new();

        for &(day, day_char, _) in &Self::DAY_CHARS {
            if self.contains(day) {
                result.push(day_char);
            }
        }

        write!(f, "{result}")
    }
}

impl BitOr for DaySet {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        DaySet(self.0 | rhs.0)
    }
}

impl BitAnd for DaySet {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self::Output {
        DaySet(self.0 & rhs.0)
    }
}

impl BitOrAssign for DaySet {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl Serialize for DaySet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_mask())
    }
}

impl<'de> Deserialize<'de> for DaySet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(DaySet::from_str(&raw).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_day_set_from_letters() {
        let days = DaySet::from_str("MWF").unwrap();
        assert!(days.contains(DaySet::MONDAY));
        assert!(!days.contains(DaySet::TUESDAY));
        assert!(days.contains(DaySet::WEDNESDAY));
        assert!(days.contains(DaySet::FRIDAY));
        assert_eq!(days.len(), 3);
    }

    #[test]
    fn test_day_set_from_mask() {
        let days = DaySet::from_str("-T-R---").unwrap();
        assert_eq!(days, DaySet::TUESDAY | DaySet::THURSDAY);

        // position decides the day, not the letter
        let weekend = DaySet::from_str("-----SS").unwrap();
        assert_eq!(weekend, DaySet::SATURDAY | DaySet::SUNDAY);

        assert!(DaySet::from_str("-------").unwrap().is_empty());

        // a full week has no absence markers but is still positional
        assert_eq!(DaySet::from_str("MTWRFSS").unwrap(), DaySet::ALL);
        assert_eq!(DaySet::from_str("MTWRFS ").unwrap().len(), 6);
    }

    #[test]
    fn test_day_set_display_and_iter() {
        let mwf = DaySet::MONDAY | DaySet::WEDNESDAY | DaySet::FRIDAY;
        assert_eq!(mwf.to_string(), "MWF");
        assert_eq!(
            mwf.iter().collect::<Vec<_>>(),
            vec![Weekday::Mon, Weekday::Wed, Weekday::Fri]
        );
    }

    #[test]
    fn test_day_set_intersects() {
        let mw = DaySet::MONDAY | DaySet::WEDNESDAY;
        let tr = DaySet::TUESDAY | DaySet::THURSDAY;
        assert!(!mw.intersects(tr));
        assert!(mw.intersects(DaySet::WEDNESDAY | DaySet::FRIDAY));
        assert!(!DaySet::NONE.intersects(DaySet::ALL));
    }

    #[test]
    fn test_day_set_serde() {
        let json = serde_json::to_string(&(DaySet::TUESDAY | DaySet::THURSDAY)).unwrap();
        assert_eq!(json, "\"-T-R---\"");
        let parsed: DaySet = serde_json::from_str("\"M-W----\"").unwrap();
        assert_eq!(parsed, DaySet::MONDAY | DaySet::WEDNESDAY);
    }
}
