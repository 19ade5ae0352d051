//! Client protocol generations and patch-level comparison.

use serde::Deserialize;

/// Language edition of a historical game client build.
///
/// `Invariant` acts as a wildcard on the registration side: a binding
/// registered with it matches clients of any language.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq, Hash)]
pub enum ClientLanguage {
    Invariant,
    English,
    Japanese,
    Vietnamese,
    Filipino,
    Chinese,
    Korean,
    Thai,
}

/// Identifies a protocol generation: a historical client build and the
/// binary dialect it speaks.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq, Hash)]
pub struct ClientVersion {
    pub season: u8,
    pub episode: u8,
    pub language: ClientLanguage,
}

impl ClientVersion {
    #[must_use]
    pub const fn new(season: u8, episode: u8, language: ClientLanguage) -> Self {
        Self {
            season,
            episode,
            language,
        }
    }

    /// Whether a binding registered under `self` serves a client declaring
    /// `declared`.
    ///
    /// The rule is asymmetric: an `Invariant`-language registration matches
    /// any client language, while two different concrete languages never
    /// match.
    #[must_use]
    pub fn compatible_with(&self, declared: &ClientVersion) -> bool {
        self.season == declared.season
            && self.episode == declared.episode
            && (self.language == ClientLanguage::Invariant || self.language == declared.language)
    }
}

impl core::fmt::Display for ClientVersion {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "season {} episode {} ({:?})",
            self.season, self.episode, self.language
        )
    }
}

/// Three-byte patch level reported by clients and configured on the gateway.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
pub struct PatchVersion(pub [u8; 3]);

/// Outcome of comparing an expected patch level against a client-reported
/// one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VersionCompareResult {
    /// Client is exactly at the expected level.
    Match,
    /// Client is behind and needs the patch.
    TooLow,
    /// Client reports a newer level than the gateway expects.
    Higher,
}

impl PatchVersion {
    /// Byte-wise, most-significant-first comparison. The first differing
    /// byte decides; later bytes are not inspected.
    #[must_use]
    pub fn compare_to(&self, actual: &PatchVersion) -> VersionCompareResult {
        for (expected, actual) in self.0.iter().zip(actual.0.iter()) {
            if expected > actual {
                return VersionCompareResult::TooLow;
            }
            if expected < actual {
                return VersionCompareResult::Higher;
            }
        }
        VersionCompareResult::Match
    }

    /// The least significant byte, carried in the patch-download packet.
    #[must_use]
    pub const fn patch_byte(&self) -> u8 {
        self.0[2]
    }
}
