use std::cmp::Ordering;
use std::fmt;

/// A decimal number kept in its textual form.
///
/// DynamoDB transmits numbers as strings, so the text is the source of
/// truth. Comparisons are exact for integers that fit in `i128` and fall
/// back to `f64` otherwise.
#[derive(Debug, Clone)]
pub struct Number(String);

impl Number {
    /// Parses a number from text, returning `None` if it is not numeric.
    ///
    /// Surrounding whitespace is ignored. `NaN` and infinities are rejected
    /// because the backing store cannot represent them.
    pub fn parse(text: &str) -> Option<Self> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return None;
        }
        if trimmed.parse::<i128>().is_ok() {
            return Some(Self(trimmed.to_string()));
        }
        match trimmed.parse::<f64>() {
            Ok(f) if f.is_finite() && looks_decimal(trimmed) => Some(Self(trimmed.to_string())),
            _ => None,
        }
    }

    /// Returns the textual representation.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the value as `f64` (lossy for very large or precise values).
    pub fn as_f64(&self) -> f64 {
        self.0.parse().unwrap_or(f64::NAN)
    }

    /// Returns the value as `i128` if it is integral (`25`, `25.0`).
    pub fn as_i128(&self) -> Option<i128> {
        if let Ok(n) = self.0.parse() {
            return Some(n);
        }
        let (int, frac) = self.0.split_once('.')?;
        if frac.chars().all(|c| c == '0') {
            int.parse().ok()
        } else {
            None
        }
    }

    /// One spelling per numeric value: `25`, `25.0` and `2.5e1` all give `25`.
    pub fn canonical(&self) -> String {
        if let Some(n) = self.as_i128() {
            return n.to_string();
        }
        let f = self.as_f64();
        if f.fract() == 0.0 && f.abs() < 1e38 {
            return (f as i128).to_string();
        }
        f.to_string()
    }

    /// Compares two numbers by value.
    pub fn compare(&self, other: &Number) -> Option<Ordering> {
        match (self.as_i128(), other.as_i128()) {
            (Some(a), Some(b)) => Some(a.cmp(&b)),
            _ => self.as_f64().partial_cmp(&other.as_f64()),
        }
    }
}

/// Rejects spellings `f64::from_str` accepts but a decimal literal should not
/// (`inf`, `NaN`, `infinity`).
fn looks_decimal(text: &str) -> bool {
    text.chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'))
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        self.compare(other) == Some(Ordering::Equal)
    }
}

impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.compare(other)
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

macro_rules! impl_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Number {
                fn from(n: $t) -> Self {
                    Self(n.to_string())
                }
            }
        )*
    };
}

impl_from_int!(i8, i16, i32, i64, i128, u8, u16, u32, u64, usize);

impl TryFrom<f64> for Number {
    type Error = f64;

    /// Fails for `NaN` and infinities.
    fn try_from(n: f64) -> Result<Self, Self::Error> {
        if n.is_finite() {
            Ok(Self(n.to_string()))
        } else {
            Err(n)
        }
    }
}

impl From<&serde_json::Number> for Number {
    fn from(n: &serde_json::Number) -> Self {
        Self(n.to_string())
    }
}
