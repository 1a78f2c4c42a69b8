//! Marker dictionaries.

use calib_labeler_core::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(thiserror::Error, Debug)]
pub enum DictionaryIoError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Names accepted by [`Dictionary::builtin`].
pub const BUILTIN_DICTIONARIES: &[&str] = &["DICT_ARUCO_ORIGINAL", "ARUCO_ORIGINAL"];

/// An ArUco-style dictionary.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dictionary {
    pub name: String,
    /// Inner bits per marker side.
    pub marker_size: usize,
    pub max_correction_bits: u8,
    /// One code per marker id, inner bits row-major (`idx = y * N + x`),
    /// **black = 1**.
    pub codes: Vec<u64>,
}

impl Dictionary {
    #[inline]
    pub fn bit_count(&self) -> usize {
        self.marker_size * self.marker_size
    }

    pub fn builtin(name: &str) -> Option<Dictionary> {
        match name {
            "DICT_ARUCO_ORIGINAL" | "ARUCO_ORIGINAL" => Some(Self::aruco_original()),
            _ => None,
        }
    }

    /// The 1024-marker dictionary of the original ArUco library.
    ///
    /// Each of the five rows encodes two id bits (most significant first)
    /// as one of four 5-bit words; the word bits are white = 1.
    pub fn aruco_original() -> Dictionary {
        const WORDS: [u8; 4] = [0b10000, 0b10111, 0b01001, 0b01110];
        let codes = (0..1024u64)
            .map(|id| {
                let mut code = 0u64;
                for y in 0..5 {
                    let word = WORDS[((id >> (2 * (4 - y))) & 3) as usize];
                    for x in 0..5 {
                        let white = (word >> (4 - x)) & 1 == 1;
                        if !white {
                            code |= 1 << (y * 5 + x);
                        }
                    }
                }
                code
            })
            .collect();
        Dictionary {
            name: "DICT_ARUCO_ORIGINAL".to_string(),
            marker_size: 5,
            max_correction_bits: 0,
            codes,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.marker_size == 0 || self.bit_count() > 64 {
            return Err(ConfigError::InvalidParameter {
                name: "marker_size",
                reason: format!("{} bits per side does not fit a 64-bit code", self.marker_size),
            });
        }
        if self.codes.is_empty() {
            return Err(ConfigError::InvalidParameter {
                name: "codes",
                reason: format!("dictionary '{}' has no codes", self.name),
            });
        }
        Ok(())
    }

    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, DictionaryIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), DictionaryIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aruco_original_first_marker_rows() {
        let dict = Dictionary::aruco_original();
        assert_eq!(dict.codes.len(), 1024);
        // id 0: every row is word 10000 -> white, black, black, black, black
        let row = 0b11110u64;
        let expected = (0..5).fold(0u64, |acc, y| acc | (row << (5 * y)));
        assert_eq!(dict.codes[0], expected);
    }

    #[test]
    fn aruco_original_codes_are_unique() {
        let dict = Dictionary::aruco_original();
        let mut codes = dict.codes.clone();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), 1024);
    }

    #[test]
    fn builtin_lookup_accepts_both_names() {
        for name in BUILTIN_DICTIONARIES {
            assert!(Dictionary::builtin(name).is_some(), "{name}");
        }
        assert!(Dictionary::builtin("DICT_4X4_50").is_none());
    }

    #[test]
    fn json_round_trip() {
        let dict = Dictionary {
            name: "tiny".to_string(),
            marker_size: 3,
            max_correction_bits: 0,
            codes: vec![0b101_010_101, 0b111_000_001],
        };
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("tiny.json");
        dict.write_json(&path).expect("write");
        let back = Dictionary::load_json(&path).expect("load");
        assert_eq!(back, dict);
    }

    #[test]
    fn oversized_marker_fails_validation() {
        let dict = Dictionary {
            name: "huge".to_string(),
            marker_size: 9,
            max_correction_bits: 0,
            codes: vec![1],
        };
        assert!(dict.validate().is_err());
    }
}
