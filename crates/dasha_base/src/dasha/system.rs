//! Calendar systems and their per-system display profiles.
//!
//! Each system defines a graha sequence with full-cycle period lengths, how
//! many times that cycle repeats across a displayed lifetime, and the
//! handful of quirks the engine has to honor (truncation, fixed durations,
//! balance heuristic).
//!
//! Provenance: BPHS chapters on nakshatra dasha systems.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use crate::error::DashaError;
use crate::graha::Graha;

use super::balance::BalancePolicy;
use super::cycle::StopAtPlanet;
use super::types::DAYS_PER_YEAR;

/// Supported calendar systems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DashaSystem {
    Vimshottari = 0,
    Kp = 1,
    Tribhagi = 2,
    Ashtottari = 3,
    Shodashottari = 4,
    Dwadashottari = 5,
    Panchottari = 6,
    Shatabdika = 7,
    Chaturashiti = 8,
    DwisaptatiSama = 9,
    ShattrimshatSama = 10,
    Shashtihayani = 11,
}

/// All systems in order.
pub const ALL_DASHA_SYSTEMS: [DashaSystem; 12] = [
    DashaSystem::Vimshottari,
    DashaSystem::Kp,
    DashaSystem::Tribhagi,
    DashaSystem::Ashtottari,
    DashaSystem::Shodashottari,
    DashaSystem::Dwadashottari,
    DashaSystem::Panchottari,
    DashaSystem::Shatabdika,
    DashaSystem::Chaturashiti,
    DashaSystem::DwisaptatiSama,
    DashaSystem::ShattrimshatSama,
    DashaSystem::Shashtihayani,
];

impl DashaSystem {
    /// Create from repr(u8) value.
    pub fn from_u8(v: u8) -> Option<Self> {
        ALL_DASHA_SYSTEMS.get(v as usize).copied()
    }

    /// Human-readable name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Vimshottari => "Vimshottari",
            Self::Kp => "KP",
            Self::Tribhagi => "Tribhagi",
            Self::Ashtottari => "Ashtottari",
            Self::Shodashottari => "Shodashottari",
            Self::Dwadashottari => "Dwadashottari",
            Self::Panchottari => "Panchottari",
            Self::Shatabdika => "Shatabdika",
            Self::Chaturashiti => "Chaturashiti Sama",
            Self::DwisaptatiSama => "Dwisaptati Sama",
            Self::ShattrimshatSama => "Shattrimshat Sama",
            Self::Shashtihayani => "Shashtihayani",
        }
    }

    /// Identifier sent to the calculation service.
    pub const fn service_id(self) -> &'static str {
        match self {
            Self::Vimshottari => "vimshottari",
            Self::Kp => "kp",
            Self::Tribhagi => "tribhagi",
            Self::Ashtottari => "ashtottari",
            Self::Shodashottari => "shodashottari",
            Self::Dwadashottari => "dwadashottari",
            Self::Panchottari => "panchottari",
            Self::Shatabdika => "shatabdika",
            Self::Chaturashiti => "chaturashiti-sama",
            Self::DwisaptatiSama => "dwisaptati-sama",
            Self::ShattrimshatSama => "shattrimshat-sama",
            Self::Shashtihayani => "shashtihayani",
        }
    }

    /// Display profile for this system.
    pub fn profile(self) -> SystemProfile {
        match self {
            Self::Vimshottari => SystemProfile::new(self, &VIMSHOTTARI),
            Self::Kp => SystemProfile::new(self, &VIMSHOTTARI),
            Self::Tribhagi => SystemProfile {
                year_scale: 1.0 / 3.0,
                cycle_count: 3,
                ..SystemProfile::new(self, &VIMSHOTTARI)
            },
            Self::Ashtottari => SystemProfile::new(self, &ASHTOTTARI),
            Self::Shodashottari => SystemProfile::new(self, &SHODASHOTTARI),
            Self::Dwadashottari => SystemProfile::new(self, &DWADASHOTTARI),
            Self::Panchottari => SystemProfile::new(self, &PANCHOTTARI),
            Self::Shatabdika => SystemProfile::new(self, &SHATABDIKA),
            Self::Chaturashiti => SystemProfile {
                cycle_count: 2,
                ..SystemProfile::new(self, &CHATURASHITI)
            },
            Self::DwisaptatiSama => SystemProfile {
                cycle_count: 2,
                ..SystemProfile::new(self, &DWISAPTATI)
            },
            Self::ShattrimshatSama => SystemProfile {
                cycle_count: 3,
                ..SystemProfile::new(self, &SHATTRIMSHAT)
            },
            Self::Shashtihayani => SystemProfile {
                cycle_count: 2,
                stop_at: Some(StopAtPlanet::new(Graha::Chandra, 2)),
                fixed_durations: true,
                ..SystemProfile::new(self, &SHASHTIHAYANI)
            },
        }
    }
}

impl Display for DashaSystem {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DashaSystem {
    type Err = DashaError;

    /// Accepts service ids plus the spellings backends commonly use.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .to_ascii_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        let system = match key.as_str() {
            "vimshottari" | "vimsottari" => Self::Vimshottari,
            "kp" | "krishnamurti" => Self::Kp,
            "tribhagi" => Self::Tribhagi,
            "ashtottari" => Self::Ashtottari,
            "shodashottari" | "shodsottari" | "shodasottari" => Self::Shodashottari,
            "dwadashottari" => Self::Dwadashottari,
            "panchottari" => Self::Panchottari,
            "shatabdika" => Self::Shatabdika,
            "chaturashiti" | "chaturashitisama" => Self::Chaturashiti,
            "dwisaptati" | "dwisaptatisama" => Self::DwisaptatiSama,
            "shattrimshat" | "shattrimshatsama" | "shattrimshasama" => Self::ShattrimshatSama,
            "shashtihayani" => Self::Shashtihayani,
            _ => return Err(DashaError::UnknownSystem(s.to_string())),
        };
        Ok(system)
    }
}

/// Per-system rules the engine needs for display and grouping.
#[derive(Debug, Clone, PartialEq)]
pub struct SystemProfile {
    /// Which system this profile is for.
    pub system: DashaSystem,
    /// Graha sequence in dasha order with full-cycle periods in years.
    pub sequence: &'static [(Graha, f64)],
    /// Multiplier applied to `sequence` years (Tribhagi runs at a third).
    pub year_scale: f64,
    /// How many times the full cycle repeats in a displayed lifetime.
    pub cycle_count: u8,
    /// Balance heuristic when the backend sends no explicit flag.
    pub balance_policy: BalancePolicy,
    /// Stop emitting top-level periods at this planet, if set.
    pub stop_at: Option<StopAtPlanet>,
    /// If true, period durations are the sequence years regardless of the
    /// computed span.
    pub fixed_durations: bool,
}

impl SystemProfile {
    fn new(system: DashaSystem, sequence: &'static [(Graha, f64)]) -> Self {
        Self {
            system,
            sequence,
            year_scale: 1.0,
            cycle_count: 1,
            balance_policy: BalancePolicy::FirstPosition,
            stop_at: None,
            fixed_durations: false,
        }
    }

    /// Planets per cycle.
    pub fn periods_per_cycle(&self) -> usize {
        self.sequence.len()
    }

    /// Length of one full cycle in years.
    pub fn cycle_years(&self) -> f64 {
        self.sequence.iter().map(|(_, y)| y).sum::<f64>() * self.year_scale
    }

    /// Length of one full cycle in days.
    pub fn cycle_days(&self) -> f64 {
        self.cycle_years() * DAYS_PER_YEAR
    }

    /// Whether the top-level timeline is grouped into cycles.
    pub fn is_cyclic(&self) -> bool {
        self.cycle_count > 1
    }

    /// Full mahadasha period for a graha in this system.
    pub fn full_period_years(&self, graha: Graha) -> Option<f64> {
        self.sequence
            .iter()
            .find(|(g, _)| *g == graha)
            .map(|(_, y)| y * self.year_scale)
    }

    /// Fixed duration that overrides the computed span, if this system has one.
    pub fn fixed_years(&self, graha: Graha) -> Option<f64> {
        if self.fixed_durations {
            self.full_period_years(graha)
        } else {
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Sequences (years per graha, dasha order)
// ---------------------------------------------------------------------------

/// Vimshottari (120 years). Also used by KP and, scaled, by Tribhagi.
const VIMSHOTTARI: [(Graha, f64); 9] = [
    (Graha::Ketu, 7.0),
    (Graha::Shukra, 20.0),
    (Graha::Surya, 6.0),
    (Graha::Chandra, 10.0),
    (Graha::Mangal, 7.0),
    (Graha::Rahu, 18.0),
    (Graha::Guru, 16.0),
    (Graha::Shani, 19.0),
    (Graha::Buddh, 17.0),
];

/// Ashtottari (108 years, no Ketu).
const ASHTOTTARI: [(Graha, f64); 8] = [
    (Graha::Surya, 6.0),
    (Graha::Chandra, 15.0),
    (Graha::Mangal, 8.0),
    (Graha::Buddh, 17.0),
    (Graha::Shani, 10.0),
    (Graha::Guru, 19.0),
    (Graha::Rahu, 12.0),
    (Graha::Shukra, 21.0),
];

/// Shodashottari (116 years).
const SHODASHOTTARI: [(Graha, f64); 8] = [
    (Graha::Surya, 11.0),
    (Graha::Mangal, 12.0),
    (Graha::Guru, 13.0),
    (Graha::Shani, 14.0),
    (Graha::Ketu, 15.0),
    (Graha::Chandra, 16.0),
    (Graha::Buddh, 17.0),
    (Graha::Shukra, 18.0),
];

/// Dwadashottari (112 years).
const DWADASHOTTARI: [(Graha, f64); 8] = [
    (Graha::Surya, 7.0),
    (Graha::Guru, 9.0),
    (Graha::Ketu, 11.0),
    (Graha::Buddh, 13.0),
    (Graha::Rahu, 15.0),
    (Graha::Mangal, 17.0),
    (Graha::Shani, 19.0),
    (Graha::Chandra, 21.0),
];

/// Panchottari (105 years).
const PANCHOTTARI: [(Graha, f64); 7] = [
    (Graha::Surya, 12.0),
    (Graha::Buddh, 13.0),
    (Graha::Shani, 14.0),
    (Graha::Mangal, 15.0),
    (Graha::Shukra, 16.0),
    (Graha::Chandra, 17.0),
    (Graha::Guru, 18.0),
];

/// Shatabdika (100 years).
const SHATABDIKA: [(Graha, f64); 7] = [
    (Graha::Surya, 5.0),
    (Graha::Chandra, 5.0),
    (Graha::Shukra, 10.0),
    (Graha::Buddh, 10.0),
    (Graha::Guru, 20.0),
    (Graha::Mangal, 20.0),
    (Graha::Shani, 30.0),
];

/// Chaturashiti Sama (84 years, equal 12y periods).
const CHATURASHITI: [(Graha, f64); 7] = [
    (Graha::Surya, 12.0),
    (Graha::Chandra, 12.0),
    (Graha::Mangal, 12.0),
    (Graha::Buddh, 12.0),
    (Graha::Guru, 12.0),
    (Graha::Shukra, 12.0),
    (Graha::Shani, 12.0),
];

/// Dwisaptati Sama (72 years, equal 9y periods).
const DWISAPTATI: [(Graha, f64); 8] = [
    (Graha::Surya, 9.0),
    (Graha::Chandra, 9.0),
    (Graha::Mangal, 9.0),
    (Graha::Buddh, 9.0),
    (Graha::Guru, 9.0),
    (Graha::Shukra, 9.0),
    (Graha::Shani, 9.0),
    (Graha::Rahu, 9.0),
];

/// Shattrimshat Sama (36 years, arithmetic 1-8y).
const SHATTRIMSHAT: [(Graha, f64); 8] = [
    (Graha::Chandra, 1.0),
    (Graha::Surya, 2.0),
    (Graha::Guru, 3.0),
    (Graha::Mangal, 4.0),
    (Graha::Buddh, 5.0),
    (Graha::Shani, 6.0),
    (Graha::Shukra, 7.0),
    (Graha::Rahu, 8.0),
];

/// Shashtihayani (60 years).
const SHASHTIHAYANI: [(Graha, f64); 8] = [
    (Graha::Guru, 10.0),
    (Graha::Surya, 10.0),
    (Graha::Mangal, 10.0),
    (Graha::Chandra, 6.0),
    (Graha::Buddh, 6.0),
    (Graha::Shukra, 6.0),
    (Graha::Shani, 6.0),
    (Graha::Rahu, 6.0),
];
