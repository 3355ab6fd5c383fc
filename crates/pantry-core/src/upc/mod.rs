//! UPC candidate extraction and UPC-A validation.
//!
//! Extraction scans free text for digit runs that could plausibly be a
//! product code (UPC-E through GTIN-14), tolerating hyphen and space
//! separators inside a run. Validation recomputes the UPC-A check digit:
//! sum of odd positions times three plus sum of even positions, with
//! `check = (10 - total % 10) % 10`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{PantryError, Result};

const MIN_CANDIDATE_DIGITS: usize = 8;
const MAX_CANDIDATE_DIGITS: usize = 14;
const UPC_A_DIGITS: usize = 12;

/// Digit runs, optionally separated by single hyphens or spaces.
static DIGIT_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+(?:[\- ]\d+)*").expect("digit run pattern is valid"));

/// Why a code failed UPC-A validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UpcInvalidReason {
    /// Digit-normalized input was not exactly 12 digits.
    InvalidLength { got: usize },
    /// The recomputed check digit disagrees with the last digit.
    ChecksumMismatch { expected: u8, found: u8 },
}

impl std::fmt::Display for UpcInvalidReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidLength { got } => {
                write!(f, "expected 12 digits, got {got}")
            }
            Self::ChecksumMismatch { expected, found } => {
                write!(f, "expected check digit {expected}, got {found}")
            }
        }
    }
}

/// Structured outcome of a UPC-A validation. Never an error: malformed
/// input produces `valid == false` with a reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpcValidation {
    pub valid: bool,
    /// The 12-digit normalized code when validation succeeded.
    pub normalized: Option<String>,
    pub reason: Option<UpcInvalidReason>,
}

impl UpcValidation {
    fn ok(normalized: String) -> Self {
        Self {
            valid: true,
            normalized: Some(normalized),
            reason: None,
        }
    }

    fn invalid(reason: UpcInvalidReason) -> Self {
        Self {
            valid: false,
            normalized: None,
            reason: Some(reason),
        }
    }
}

/// Iterator over candidate codes extracted from free text.
///
/// Finite and consumed once; candidates are ordered most-plausible-first.
pub struct CandidateIter {
    inner: std::vec::IntoIter<String>,
}

impl Iterator for CandidateIter {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        self.inner.next()
    }
}

/// Extracts candidate product codes from free text.
///
/// A candidate is a run of 8-14 digits after stripping separators. Exact
/// 12-digit candidates rank first, then longer candidates before shorter,
/// then document order. A separator-joined run whose total length falls
/// outside the range is broken back into its plain digit groups so that
/// adjacent but unrelated numbers are not lost.
pub fn extract_candidates(text: &str) -> CandidateIter {
    let mut ranked: Vec<(usize, usize, String)> = Vec::new();
    let mut seen = std::collections::HashSet::new();

    let mut push = |digits: String, position: usize, ranked: &mut Vec<(usize, usize, String)>| {
        let len = digits.len();
        if (MIN_CANDIDATE_DIGITS..=MAX_CANDIDATE_DIGITS).contains(&len)
            && seen.insert(digits.clone())
        {
            let plausibility = if len == UPC_A_DIGITS { 0 } else { 1 };
            ranked.push((plausibility, position, digits));
        }
    };

    for (position, run) in DIGIT_RUN.find_iter(text).enumerate() {
        let joined: String = run.as_str().chars().filter(char::is_ascii_digit).collect();
        let joined_len = joined.len();
        push(joined, position, &mut ranked);

        // A run like "12345678 90123456" may join into something too long
        // while each group is a candidate on its own.
        if joined_len > MAX_CANDIDATE_DIGITS {
            for group in run.as_str().split(['-', ' ']) {
                push(group.to_string(), position, &mut ranked);
            }
        }
    }

    ranked.sort_by(|a, b| {
        a.0.cmp(&b.0)
            .then(b.2.len().cmp(&a.2.len()))
            .then(a.1.cmp(&b.1))
    });

    CandidateIter {
        inner: ranked
            .into_iter()
            .map(|(_, _, digits)| digits)
            .collect::<Vec<_>>()
            .into_iter(),
    }
}

/// Validates a UPC-A code, tolerating separators in the input.
pub fn validate_upc_a(code: &str) -> UpcValidation {
    let digits: Vec<u8> = code
        .chars()
        .filter(char::is_ascii_digit)
        .map(|c| c as u8 - b'0')
        .collect();

    if digits.len() != UPC_A_DIGITS {
        return UpcValidation::invalid(UpcInvalidReason::InvalidLength { got: digits.len() });
    }

    let expected = check_digit(&digits[..11]);
    let found = digits[11];
    if expected == found {
        let normalized: String = digits.iter().map(|d| (d + b'0') as char).collect();
        UpcValidation::ok(normalized)
    } else {
        UpcValidation::invalid(UpcInvalidReason::ChecksumMismatch { expected, found })
    }
}

/// Completes a partial code into a valid 12-digit UPC-A.
///
/// Input with 11 or fewer digits is zero-padded to 11 and the check digit
/// appended. A 12-digit input has its check digit recomputed from the
/// first 11. Longer input is rejected.
pub fn complete_check_digit(code: &str) -> Result<String> {
    let digits: Vec<u8> = code
        .chars()
        .filter(char::is_ascii_digit)
        .map(|c| c as u8 - b'0')
        .collect();

    if digits.is_empty() {
        return Err(PantryError::validation("no digits to complete"));
    }
    if digits.len() > UPC_A_DIGITS {
        return Err(PantryError::validation(format!(
            "cannot complete a code longer than 12 digits (got {})",
            digits.len()
        )));
    }

    let mut body: Vec<u8> = if digits.len() == UPC_A_DIGITS {
        digits[..11].to_vec()
    } else {
        let mut padded = vec![0u8; 11 - digits.len().min(11)];
        padded.extend_from_slice(&digits[..digits.len().min(11)]);
        padded
    };
    let check = check_digit(&body);
    body.push(check);

    Ok(body.iter().map(|d| (d + b'0') as char).collect())
}

/// UPC-A check digit over the first 11 digits.
fn check_digit(body: &[u8]) -> u8 {
    debug_assert_eq!(body.len(), 11);
    let odd_sum: u32 = body.iter().step_by(2).map(|&d| d as u32).sum();
    let even_sum: u32 = body.iter().skip(1).step_by(2).map(|&d| d as u32).sum();
    let total = odd_sum * 3 + even_sum;
    ((10 - (total % 10)) % 10) as u8
}
