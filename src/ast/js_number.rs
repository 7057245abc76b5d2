use std::cmp::Ordering;
use std::fmt;
use std::fmt::Display;
use std::fmt::Formatter;
use std::hash::Hash;
use std::hash::Hasher;

use serde::Serialize;
use serde::Serializer;

/// An ECMAScript number. Wraps `f64` to provide `Eq`/`Ord`/`Hash` with NaN
/// treated as equal to itself, so numbers can live in maps and in `PartialEq`
/// AST comparisons.
#[derive(Copy, Clone, Debug)]
pub struct JsNumber(pub f64);

impl JsNumber {
    /// `Number::toString(x, 10)` as specified by ECMA-262: shortest digit
    /// string that round-trips, decimal notation for exponents in
    /// `(-7, 21]`, exponential notation with an explicit sign otherwise.
    pub fn to_js_string(&self) -> String {
        let x = self.0;
        if x.is_nan() {
            return "NaN".to_string();
        }
        if x == 0.0 {
            return "0".to_string();
        }
        if x < 0.0 {
            return format!("-{}", JsNumber(-x).to_js_string());
        }
        if x.is_infinite() {
            return "Infinity".to_string();
        }

        // `{:e}` prints the shortest mantissa that uniquely identifies the
        // value, as `d[.ddd]e<exp>`. Split it into the digit string `s` and
        // the position `n` of the decimal point relative to those digits,
        // then lay the digits out the way the ECMA-262 branches do.
        let sci = format!("{:e}", x);
        let (mantissa, exp) = sci
            .split_once('e')
            .unwrap_or((sci.as_str(), "0"));
        let exp: i32 = exp.parse().unwrap_or(0);
        let s: String = mantissa.chars().filter(|c| *c != '.').collect();
        let k = s.len() as i32;
        let n = exp + 1;

        if k <= n && n <= 21 {
            let mut out = s;
            out.extend(std::iter::repeat('0').take((n - k) as usize));
            out
        } else if 0 < n && n <= 21 {
            format!("{}.{}", &s[..n as usize], &s[n as usize..])
        } else if -6 < n && n <= 0 {
            let zeros: String = std::iter::repeat('0').take((-n) as usize).collect();
            format!("0.{}{}", zeros, s)
        } else if k == 1 {
            format!("{}e{}{}", s, if n - 1 >= 0 { "+" } else { "-" }, (n - 1).abs())
        } else {
            format!(
                "{}.{}e{}{}",
                &s[..1],
                &s[1..],
                if n - 1 >= 0 { "+" } else { "-" },
                (n - 1).abs()
            )
        }
    }

    /// ToBoolean.
    pub fn is_truthy(&self) -> bool {
        !(self.0 == 0.0 || self.0.is_nan())
    }
}

impl From<f64> for JsNumber {
    fn from(v: f64) -> Self {
        JsNumber(v)
    }
}

impl Display for JsNumber {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl PartialEq for JsNumber {
    fn eq(&self, other: &Self) -> bool {
        if self.0.is_nan() {
            return other.0.is_nan();
        };
        self.0.eq(&other.0)
    }
}

impl Eq for JsNumber {}

impl Ord for JsNumber {
    fn cmp(&self, other: &Self) -> Ordering {
        // Only NaNs cannot be compared, and we treat them as equal.
        self.0.partial_cmp(&other.0).unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for JsNumber {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Hash for JsNumber {
    fn hash<H: Hasher>(&self, state: &mut H) {
        if !self.0.is_nan() {
            self.0.to_bits().hash(state);
        };
    }
}

impl Serialize for JsNumber {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.0)
    }
}
