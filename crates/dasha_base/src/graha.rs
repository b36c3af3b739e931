//! Vedic planet (graha) enum and name resolution.
//!
//! Backends spell planets in many ways: two-letter codes (`Ju`), three-letter
//! abbreviations (`Jup`), English names (`Jupiter`) or Sanskrit names
//! (`Guru`). [`Graha::parse`] accepts all of them case-insensitively.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// The 9 Vedic grahas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Graha {
    Surya,
    Chandra,
    Mangal,
    Buddh,
    Guru,
    Shukra,
    Shani,
    Rahu,
    Ketu,
}

/// All 9 grahas in traditional order.
pub const ALL_GRAHAS: [Graha; 9] = [
    Graha::Surya,
    Graha::Chandra,
    Graha::Mangal,
    Graha::Buddh,
    Graha::Guru,
    Graha::Shukra,
    Graha::Shani,
    Graha::Rahu,
    Graha::Ketu,
];

impl Graha {
    /// Sanskrit name of the graha.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Surya => "Surya",
            Self::Chandra => "Chandra",
            Self::Mangal => "Mangal",
            Self::Buddh => "Buddh",
            Self::Guru => "Guru",
            Self::Shukra => "Shukra",
            Self::Shani => "Shani",
            Self::Rahu => "Rahu",
            Self::Ketu => "Ketu",
        }
    }

    /// English name of the graha.
    pub const fn english_name(self) -> &'static str {
        match self {
            Self::Surya => "Sun",
            Self::Chandra => "Moon",
            Self::Mangal => "Mars",
            Self::Buddh => "Mercury",
            Self::Guru => "Jupiter",
            Self::Shukra => "Venus",
            Self::Shani => "Saturn",
            Self::Rahu => "Rahu",
            Self::Ketu => "Ketu",
        }
    }

    /// Two-letter code used in node ids and compact displays.
    pub const fn code(self) -> &'static str {
        match self {
            Self::Surya => "Su",
            Self::Chandra => "Mo",
            Self::Mangal => "Ma",
            Self::Buddh => "Me",
            Self::Guru => "Ju",
            Self::Shukra => "Ve",
            Self::Shani => "Sa",
            Self::Rahu => "Ra",
            Self::Ketu => "Ke",
        }
    }

    /// 0-based index into ALL_GRAHAS.
    pub const fn index(self) -> u8 {
        match self {
            Self::Surya => 0,
            Self::Chandra => 1,
            Self::Mangal => 2,
            Self::Buddh => 3,
            Self::Guru => 4,
            Self::Shukra => 5,
            Self::Shani => 6,
            Self::Rahu => 7,
            Self::Ketu => 8,
        }
    }

    /// Resolve a backend planet identifier.
    ///
    /// Accepts two-letter codes, three-letter abbreviations, English and
    /// Sanskrit names (with a few common transliteration variants).
    /// Returns None for anything else.
    pub fn parse(s: &str) -> Option<Self> {
        let key = s.trim().to_ascii_lowercase();
        let g = match key.as_str() {
            "su" | "sun" | "surya" | "soorya" => Self::Surya,
            "mo" | "mon" | "moon" | "chandra" | "chandr" => Self::Chandra,
            "ma" | "mar" | "mars" | "mangal" | "mangala" | "kuja" => Self::Mangal,
            "me" | "mer" | "mercury" | "buddh" | "budh" | "budha" => Self::Buddh,
            "ju" | "jup" | "jupiter" | "guru" | "brihaspati" => Self::Guru,
            "ve" | "ven" | "venus" | "shukra" | "sukra" => Self::Shukra,
            "sa" | "sat" | "saturn" | "shani" | "sani" => Self::Shani,
            "ra" | "rah" | "rahu" => Self::Rahu,
            "ke" | "ket" | "ketu" => Self::Ketu,
            _ => return None,
        };
        Some(g)
    }
}

impl Display for Graha {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.english_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_grahas_count() {
        assert_eq!(ALL_GRAHAS.len(), 9);
    }

    #[test]
    fn graha_indices_sequential() {
        for (i, g) in ALL_GRAHAS.iter().enumerate() {
            assert_eq!(g.index() as usize, i);
        }
    }

    #[test]
    fn parse_round_trips_every_spelling() {
        for g in ALL_GRAHAS {
            assert_eq!(Graha::parse(g.code()), Some(g));
            assert_eq!(Graha::parse(g.english_name()), Some(g));
            assert_eq!(Graha::parse(g.name()), Some(g));
            assert_eq!(Graha::parse(&g.english_name().to_uppercase()), Some(g));
        }
    }

    #[test]
    fn parse_abbreviations() {
        assert_eq!(Graha::parse("Jup"), Some(Graha::Guru));
        assert_eq!(Graha::parse(" sat "), Some(Graha::Shani));
        assert_eq!(Graha::parse("Ket"), Some(Graha::Ketu));
    }

    #[test]
    fn parse_unknown() {
        assert_eq!(Graha::parse("Pluto"), None);
        assert_eq!(Graha::parse(""), None);
    }

    #[test]
    fn display_uses_english() {
        assert_eq!(Graha::Guru.to_string(), "Jupiter");
    }
}
