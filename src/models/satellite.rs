//! Satellite platform identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// AVHRR-carrying polar orbiters present in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Satellite {
    Noaa15,
    Noaa16,
    Noaa17,
    Noaa18,
    Noaa19,
    MetopA,
    MetopB,
    MetopC,
}

impl Satellite {
    /// Every platform the catalog tracks, in launch order.
    pub const ALL: [Satellite; 8] = [
        Satellite::Noaa15,
        Satellite::Noaa16,
        Satellite::Noaa17,
        Satellite::Noaa18,
        Satellite::Noaa19,
        Satellite::MetopA,
        Satellite::MetopB,
        Satellite::MetopC,
    ];

    /// Scan cadence in scan lines per second.
    ///
    /// All platforms currently in the catalog carry AVHRR operated at the
    /// GAC cadence of 2 lines per second. A platform with a different
    /// cadence only needs a new match arm here.
    pub fn scan_rate(&self) -> f64 {
        2.0
    }

    /// Canonical platform name as stored in the catalog.
    pub fn as_str(&self) -> &'static str {
        match self {
            Satellite::Noaa15 => "NOAA-15",
            Satellite::Noaa16 => "NOAA-16",
            Satellite::Noaa17 => "NOAA-17",
            Satellite::Noaa18 => "NOAA-18",
            Satellite::Noaa19 => "NOAA-19",
            Satellite::MetopA => "Metop-A",
            Satellite::MetopB => "Metop-B",
            Satellite::MetopC => "Metop-C",
        }
    }
}

impl fmt::Display for Satellite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Satellite {
    type Err = String;

    /// Parse a platform name. Accepts the canonical form ("NOAA-18") as well
    /// as the compact form ("noaa18"), case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        match normalized.as_str() {
            "noaa15" => Ok(Satellite::Noaa15),
            "noaa16" => Ok(Satellite::Noaa16),
            "noaa17" => Ok(Satellite::Noaa17),
            "noaa18" => Ok(Satellite::Noaa18),
            "noaa19" => Ok(Satellite::Noaa19),
            "metopa" => Ok(Satellite::MetopA),
            "metopb" => Ok(Satellite::MetopB),
            "metopc" => Ok(Satellite::MetopC),
            _ => Err(format!("Unknown satellite: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Satellite;
    use std::str::FromStr;

    #[test]
    fn test_parse_canonical_name() {
        assert_eq!(Satellite::from_str("NOAA-18").unwrap(), Satellite::Noaa18);
        assert_eq!(Satellite::from_str("Metop-B").unwrap(), Satellite::MetopB);
    }

    #[test]
    fn test_parse_compact_name() {
        assert_eq!(Satellite::from_str("noaa15").unwrap(), Satellite::Noaa15);
        assert_eq!(Satellite::from_str("METOPC").unwrap(), Satellite::MetopC);
    }

    #[test]
    fn test_parse_unknown_name() {
        assert!(Satellite::from_str("NOAA-99").is_err());
    }

    #[test]
    fn test_display_roundtrip() {
        for sat in Satellite::ALL {
            assert_eq!(Satellite::from_str(&sat.to_string()).unwrap(), sat);
        }
    }

    #[test]
    fn test_gac_scan_rate() {
        assert_eq!(Satellite::Noaa19.scan_rate(), 2.0);
    }
}
