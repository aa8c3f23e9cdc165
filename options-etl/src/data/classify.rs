//! Side classification from vendor contract identifiers.
//!
//! The provider hands back calls and puts in separate lists, but the side of a
//! contract is decided from its identifier alone so that a vendor with a
//! different naming convention only needs a new [`SideClassifier`].

use super::types::OptionSide;

/// Number of strike digits at the end of an OCC symbol (price * 1000).
const OCC_STRIKE_DIGITS: usize = 8;

/// Number of date digits (YYMMDD) before the side marker.
const OCC_DATE_DIGITS: usize = 6;

/// Maps a contract identifier to a side.
pub trait SideClassifier {
    fn classify(&self, contract_symbol: &str) -> OptionSide;
}

/// OCC-style identifiers: `ROOT` + `YYMMDD` + `C|P` + 8-digit strike.
///
/// `NVDA240101C00100000` is a call and `NVDA240101P00100000` a put. Anything
/// that does not have that layout falls back to [`SuffixClassifier`].
#[derive(Debug, Clone, Copy, Default)]
pub struct OccSymbolClassifier;

impl SideClassifier for OccSymbolClassifier {
    fn classify(&self, contract_symbol: &str) -> OptionSide {
        occ_side_marker(contract_symbol.trim())
            .unwrap_or_else(|| SuffixClassifier.classify(contract_symbol))
    }
}

/// Call iff the identifier ends with `C`, otherwise put.
#[derive(Debug, Clone, Copy, Default)]
pub struct SuffixClassifier;

impl SideClassifier for SuffixClassifier {
    fn classify(&self, contract_symbol: &str) -> OptionSide {
        if contract_symbol.trim_end().ends_with('C') {
            OptionSide::Call
        } else {
            OptionSide::Put
        }
    }
}

/// Read the side marker of an OCC symbol, if the symbol has that layout.
fn occ_side_marker(symbol: &str) -> Option<OptionSide> {
    let bytes = symbol.as_bytes();
    // At least a one-character root.
    if bytes.len() < OCC_STRIKE_DIGITS + 1 + OCC_DATE_DIGITS + 1 {
        return None;
    }

    let marker_idx = bytes.len() - OCC_STRIKE_DIGITS - 1;
    let strike = &bytes[marker_idx + 1..];
    let date = &bytes[marker_idx - OCC_DATE_DIGITS..marker_idx];

    if !strike.iter().all(u8::is_ascii_digit) || !date.iter().all(u8::is_ascii_digit) {
        return None;
    }

    match bytes[marker_idx] {
        b'C' => Some(OptionSide::Call),
        b'P' => Some(OptionSide::Put),
        _ => None,
    }
}
