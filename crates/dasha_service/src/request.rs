//! Request body for the calculation service.
//!
//! ```json
//! {"subjectId": "...", "level": "antardasha", "system": "vimshottari",
//!  "context": {"mahaLord": "Jupiter"}}
//! ```
//!
//! `context` is omitted for the root request and grows by one ancestor lord
//! per level below it.

use serde::{Deserialize, Serialize};

use dasha_base::DashaError;
use dasha_base::dasha::{DashaLevel, DashaLord, DashaSystem};

/// Lords chosen at each ancestor depth.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LordContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maha_lord: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub antar_lord: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pratyantar_lord: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sookshma_lord: Option<String>,
}

impl LordContext {
    /// Context for the given ancestor lords, outermost first.
    ///
    /// `None` for an empty chain; lords past the fourth are ignored.
    pub fn from_lords(lords: &[DashaLord]) -> Option<Self> {
        if lords.is_empty() {
            return None;
        }
        let name = |i: usize| lords.get(i).map(lord_name);
        Some(Self {
            maha_lord: name(0),
            antar_lord: name(1),
            pratyantar_lord: name(2),
            sookshma_lord: name(3),
        })
    }

    /// Number of ancestor lords present.
    pub fn depth(&self) -> usize {
        [
            &self.maha_lord,
            &self.antar_lord,
            &self.pratyantar_lord,
            &self.sookshma_lord,
        ]
        .iter()
        .take_while(|l| l.is_some())
        .count()
    }
}

/// Name sent to the service: the English name, or the raw text for unknown lords.
fn lord_name(lord: &DashaLord) -> String {
    match lord {
        DashaLord::Graha(g) => g.english_name().to_string(),
        DashaLord::Unknown(raw) => raw.clone(),
    }
}

/// One "give me this level" request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashaRequest {
    pub subject_id: String,
    pub level: DashaLevel,
    #[serde(with = "system_id")]
    pub system: DashaSystem,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub context: Option<LordContext>,
}

impl DashaRequest {
    /// Request for the top-level mahadasha list.
    pub fn root(subject_id: impl Into<String>, system: DashaSystem) -> Self {
        Self {
            subject_id: subject_id.into(),
            level: DashaLevel::Mahadasha,
            system,
            context: None,
        }
    }

    /// Request for the level below the given ancestor chain.
    ///
    /// Fails with `UnsupportedDepth` when the chain already ends at Prana.
    pub fn for_child(
        subject_id: impl Into<String>,
        system: DashaSystem,
        ancestors: &[DashaLord],
    ) -> Result<Self, DashaError> {
        let level = u8::try_from(ancestors.len())
            .ok()
            .and_then(DashaLevel::from_u8)
            .ok_or(DashaError::UnsupportedDepth(DashaLevel::Prana))?;
        Ok(Self {
            subject_id: subject_id.into(),
            level,
            system,
            context: LordContext::from_lords(ancestors),
        })
    }
}

mod system_id {
    use dasha_base::dasha::DashaSystem;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(system: &DashaSystem, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(system.service_id())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DashaSystem, D::Error> {
        let raw = String::deserialize(d)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
