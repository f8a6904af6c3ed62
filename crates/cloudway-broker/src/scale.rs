// SPDX-FileCopyrightText: 2026 Cloudway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Caller-facing scale requests: `N`, `+N`, or `-N`.

use std::fmt;
use std::str::FromStr;

use cloudway_core::CloudwayError;

/// An absolute replica count or a delta against the live count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleRequest {
    To(u32),
    Up(u32),
    Down(u32),
}

impl ScaleRequest {
    pub fn parse(input: &str) -> Result<Self, CloudwayError> {
        let input = input.trim();
        let invalid = || CloudwayError::Validation(format!("invalid scale value `{input}`"));

        let (ctor, digits): (fn(u32) -> ScaleRequest, &str) = match input.as_bytes().first() {
            Some(b'+') => (ScaleRequest::Up, &input[1..]),
            Some(b'-') => (ScaleRequest::Down, &input[1..]),
            _ => (ScaleRequest::To, input),
        };
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        digits.parse::<u32>().map(ctor).map_err(|_| invalid())
    }

    /// Target replica count given the current one. Results below one are
    /// rejected.
    pub fn target(self, current: usize) -> Result<u32, CloudwayError> {
        let current = i64::try_from(current).unwrap_or(i64::MAX);
        let target = match self {
            ScaleRequest::To(n) => i64::from(n),
            ScaleRequest::Up(n) => current.saturating_add(i64::from(n)),
            ScaleRequest::Down(n) => current - i64::from(n),
        };
        if target < 1 {
            return Err(CloudwayError::Validation(format!(
                "scale target must be at least 1, got {target}"
            )));
        }
        u32::try_from(target)
            .map_err(|_| CloudwayError::Validation(format!("scale target {target} is too large")))
    }
}

impl FromStr for ScaleRequest {
    type Err = CloudwayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ScaleRequest::parse(s)
    }
}

impl fmt::Display for ScaleRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScaleRequest::To(n) => write!(f, "{n}"),
            ScaleRequest::Up(n) => write!(f, "+{n}"),
            ScaleRequest::Down(n) => write!(f, "-{n}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_absolute_and_deltas() {
        assert_eq!(ScaleRequest::parse("3").unwrap(), ScaleRequest::To(3));
        assert_eq!(ScaleRequest::parse("+2").unwrap(), ScaleRequest::Up(2));
        assert_eq!(ScaleRequest::parse(" -1 ").unwrap(), ScaleRequest::Down(1));
        for bad in ["", "+", "-", "x", "1.5", "+-1", "99999999999"] {
            assert!(ScaleRequest::parse(bad).is_err(), "{bad:?} should fail");
        }
    }

    #[test]
    fn computes_targets() {
        assert_eq!(ScaleRequest::To(4).target(1).unwrap(), 4);
        assert_eq!(ScaleRequest::Up(2).target(3).unwrap(), 5);
        assert_eq!(ScaleRequest::Down(2).target(3).unwrap(), 1);
    }

    #[test]
    fn rejects_targets_below_one() {
        assert!(ScaleRequest::Down(3).target(3).is_err());
        assert!(ScaleRequest::To(0).target(5).is_err());
    }

    #[test]
    fn display_round_trips() {
        for s in ["7", "+1", "-2"] {
            assert_eq!(ScaleRequest::parse(s).unwrap().to_string(), s);
        }
    }
}
