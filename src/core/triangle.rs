//! Triangle definitions for triangular arbitrage
//!
//! A triangle `(A/C, B/A, B/C)` starts and ends in quote currency `C`:
//! buy `A` with `C`, convert `A` into `B` through the cross pair, sell `B`
//! back for `C`.

use std::collections::{BTreeSet, HashSet};

use crate::error::AppError;

/// Split a unified `BASE/QUOTE` symbol into its two currencies
pub fn split_symbol(symbol: &str) -> Option<(&str, &str)> {
    let (base, quote) = symbol.split_once('/')?;
    if base.is_empty() || quote.is_empty() || quote.contains('/') {
        return None;
    }
    Some((base, quote))
}

/// Three currency-consistent symbols scanned as one cycle
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Triangle {
    /// `A/C`: bought at its ask
    pub first: String,
    /// `B/A`: converted at its ask
    pub second: String,
    /// `B/C`: sold at its bid
    pub third: String,
}

impl Triangle {
    /// Build a triangle, checking the currencies line up as `A/C, B/A, B/C`.
    pub fn new(first: &str, second: &str, third: &str) -> Result<Self, AppError> {
        fn parse(symbol: &str) -> Result<(&str, &str), AppError> {
            split_symbol(symbol).ok_or_else(|| {
                AppError::Config(format!("Triangle symbol '{}' must look like BASE/QUOTE", symbol))
            })
        }

        let (a, c) = parse(first)?;
        let (b, a2) = parse(second)?;
        let (b2, c2) = parse(third)?;

        if a != a2 || b != b2 || c != c2 || a == b || a == c || b == c {
            return Err(AppError::Config(format!(
                "Triangle [{}, {}, {}] is not of the form [A/C, B/A, B/C]",
                first, second, third
            )));
        }

        Ok(Self {
            first: first.to_string(),
            second: second.to_string(),
            third: third.to_string(),
        })
    }

    pub fn symbols(&self) -> [&str; 3] {
        [&self.first, &self.second, &self.third]
    }

    /// `[A/C, B/A, B/C]` as owned strings (opportunity path)
    pub fn path(&self) -> [String; 3] {
        [self.first.clone(), self.second.clone(), self.third.clone()]
    }
}

/// Enumerate every `(A/C, B/A, B/C)` triangle available in `symbols`.
///
/// Output is sorted so repeated calls over the same universe scan in the
/// same order.
pub fn discover_triangles(symbols: &[String]) -> Vec<Triangle> {
    let available: HashSet<&str> = symbols.iter().map(String::as_str).collect();
    let mut found = BTreeSet::new();

    for first in symbols {
        let Some((a, c)) = split_symbol(first) else {
            continue;
        };
        for second in symbols {
            let Some((b, quote)) = split_symbol(second) else {
                continue;
            };
            if quote != a || b == c {
                continue;
            }
            let third = format!("{}/{}", b, c);
            if available.contains(third.as_str()) {
                if let Ok(triangle) = Triangle::new(first, second, &third) {
                    found.insert(triangle);
                }
            }
        }
    }

    found.into_iter().collect()
}
