use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, Mul, Neg, Sub, SubAssign},
    str::FromStr,
};

use serde::{
    de::{value::MapAccessDeserializer, MapAccess, Visitor},
    Deserialize,
    Deserializer,
    Serialize,
    Serializer,
};
use sqlx::Type;
use thiserror::Error;

//--------------------------------------       Kopek         ---------------------------------------------------------
/// A count of kopeks, the minor unit of the loyalty currency (1/100 of a point).
///
/// All arithmetic is integer arithmetic. On the wire a `Kopek` is a JSON number
/// with at most two fractional digits: `100`, `100.5` or `100.05`. Decoding
/// additionally accepts the same forms wrapped in a string.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd)]
#[sqlx(transparent)]
pub struct Kopek(i64);

impl Add for Kopek {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Kopek {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl SubAssign for Kopek {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

impl Neg for Kopek {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self(-self.0)
    }
}

impl Mul<i64> for Kopek {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self::from(self.value() * rhs)
    }
}

impl Sum for Kopek {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented in kopeks: {0}")]
pub struct KopekParseError(String);

impl From<i64> for Kopek {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl PartialEq for Kopek {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Kopek {}

impl TryFrom<u64> for Kopek {
    type Error = KopekParseError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value > i64::MAX as u64 {
            Err(KopekParseError(format!("Value {} is too large to convert to Kopek", value)))
        } else {
            #[allow(clippy::cast_possible_wrap)]
            Ok(Self(value as i64))
        }
    }
}

impl Display for Kopek {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let (units, frac) = (abs / 100, abs % 100);
        match frac {
            0 => write!(f, "{sign}{units}"),
            fr if fr % 10 == 0 => write!(f, "{sign}{units}.{}", fr / 10),
            fr => write!(f, "{sign}{units}.{fr:02}"),
        }
    }
}

impl Kopek {
    pub fn value(&self) -> i64 {
        self.0
    }

    /// Whole points expressed in kopeks.
    pub fn from_points(points: i64) -> Self {
        Self(points * 100)
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }
}

impl FromStr for Kopek {
    type Err = KopekParseError;

    /// Parses a decimal amount of points (`3`, `1.5`, `729.98`) into kopeks.
    /// One fractional digit is right-padded (`1.5` -> 150). More than two
    /// fractional digits, or any non-digit character, is an error.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || KopekParseError(s.to_string());
        let (sign, digits) = match s.strip_prefix('-') {
            Some(rest) => (-1i64, rest),
            None => (1i64, s),
        };
        let parse_digits = |part: &str| -> Result<i64, KopekParseError> {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(err());
            }
            part.parse::<i64>().map_err(|_| err())
        };
        let parts: Vec<&str> = digits.split('.').collect();
        let kopeks = match parts.as_slice() {
            [units] => parse_digits(units)?.checked_mul(100),
            [units, frac] if frac.len() == 1 || frac.len() == 2 => {
                let mut fr = parse_digits(frac)?;
                if frac.len() == 1 {
                    fr *= 10;
                }
                parse_digits(units)?.checked_mul(100).and_then(|u| u.checked_add(fr))
            },
            _ => return Err(err()),
        }
        .ok_or_else(err)?;
        Ok(Self(sign * kopeks))
    }
}

impl Serialize for Kopek {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.0 % 100 == 0 {
            serializer.serialize_i64(self.0 / 100)
        } else {
            // fractional amounts go out as an arbitrary-precision number built
            // from the same integer decomposition Display uses, so every i64
            // renders its exact kopeks
            let number = serde_json::Number::from_str(&self.to_string()).map_err(serde::ser::Error::custom)?;
            number.serialize(serializer)
        }
    }
}

struct KopekVisitor;

impl<'de> Visitor<'de> for KopekVisitor {
    type Value = Kopek;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("a decimal number with at most two fractional digits")
    }

    fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<Self::Value, E> {
        i64::try_from(v)
            .ok()
            .and_then(|units| units.checked_mul(100))
            .map(Kopek)
            .ok_or_else(|| E::custom(format!("amount out of range: {v}")))
    }

    fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<Self::Value, E> {
        v.checked_mul(100).map(Kopek).ok_or_else(|| E::custom(format!("amount out of range: {v}")))
    }

    fn visit_f64<E: serde::de::Error>(self, v: f64) -> Result<Self::Value, E> {
        format!("{v}").parse().map_err(E::custom)
    }

    fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<Self::Value, E> {
        v.trim().parse().map_err(E::custom)
    }

    // serde_json with arbitrary precision hands numbers over as a one-entry map
    fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<Self::Value, A::Error> {
        let number = serde_json::Number::deserialize(MapAccessDeserializer::new(map))?;
        number.to_string().parse().map_err(serde::de::Error::custom)
    }
}

impl<'de> Deserialize<'de> for Kopek {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(KopekVisitor)
    }
}

#[cfg(test)]
mod test {
    use super::Kopek;

    #[test]
    fn renders_whole_amounts_without_fraction() {
        assert_eq!(serde_json::to_string(&Kopek::from(10000)).unwrap(), "100");
        assert_eq!(serde_json::to_string(&Kopek::from(0)).unwrap(), "0");
        assert_eq!(serde_json::to_string(&Kopek::from(50000)).unwrap(), "500");
    }

    #[test]
    fn renders_tens_of_kopeks_with_one_digit() {
        assert_eq!(serde_json::to_string(&Kopek::from(10050)).unwrap(), "100.5");
        assert_eq!(serde_json::to_string(&Kopek::from(30)).unwrap(), "0.3");
    }

    #[test]
    fn renders_kopeks_with_two_digits() {
        assert_eq!(serde_json::to_string(&Kopek::from(10005)).unwrap(), "100.05");
        assert_eq!(serde_json::to_string(&Kopek::from(72998)).unwrap(), "729.98");
        assert_eq!(serde_json::to_string(&Kopek::from(1)).unwrap(), "0.01");
    }

    #[test]
    fn rendering_is_exact_beyond_float_precision() {
        // 2^53 + 7 kopeks: a float round-trip would drop the trailing digits
        let k = Kopek::from(9_007_199_254_740_999);
        assert_eq!(serde_json::to_string(&k).unwrap(), "90071992547409.99");
        assert_eq!(serde_json::to_string(&-k).unwrap(), "-90071992547409.99");
    }

    #[test]
    fn decodes_integer_and_fractional_forms() {
        assert_eq!(serde_json::from_str::<Kopek>("3").unwrap(), Kopek::from(300));
        assert_eq!(serde_json::from_str::<Kopek>("1.5").unwrap(), Kopek::from(150));
        assert_eq!(serde_json::from_str::<Kopek>("729.98").unwrap(), Kopek::from(72998));
        assert_eq!(serde_json::from_str::<Kopek>("0.01").unwrap(), Kopek::from(1));
    }

    #[test]
    fn decodes_string_wrapped_amounts() {
        assert_eq!(serde_json::from_str::<Kopek>("\"3\"").unwrap(), Kopek::from(300));
        assert_eq!(serde_json::from_str::<Kopek>("\"100.05\"").unwrap(), Kopek::from(10005));
    }

    #[test]
    fn decodes_negative_amounts() {
        assert_eq!(serde_json::from_str::<Kopek>("-1.5").unwrap(), Kopek::from(-150));
        assert_eq!(serde_json::from_str::<Kopek>("\"-0.05\"").unwrap(), Kopek::from(-5));
    }

    #[test]
    fn rejects_malformed_amounts() {
        assert!(serde_json::from_str::<Kopek>("\"1.005\"").is_err());
        assert!(serde_json::from_str::<Kopek>("\"1.2.3\"").is_err());
        assert!(serde_json::from_str::<Kopek>("\"abc\"").is_err());
        assert!(serde_json::from_str::<Kopek>("\"\"").is_err());
        assert!(serde_json::from_str::<Kopek>("\"1.\"").is_err());
    }

    #[test]
    fn round_trips_through_json() {
        for kopeks in [0i64, 1, 10, 99, 100, 150, 10005, 10050, 72998, 123_456_789, 9_007_199_254_740_999] {
            let k = Kopek::from(kopeks);
            let encoded = serde_json::to_string(&k).unwrap();
            let decoded: Kopek = serde_json::from_str(&encoded).unwrap();
            assert_eq!(decoded, k, "{kopeks} did not survive the round trip ({encoded})");
        }
    }

    #[test]
    fn display_matches_wire_form() {
        assert_eq!(Kopek::from(10005).to_string(), "100.05");
        assert_eq!(Kopek::from(10050).to_string(), "100.5");
        assert_eq!(Kopek::from(10000).to_string(), "100");
        assert_eq!(Kopek::from(-150).to_string(), "-1.5");
    }

    #[test]
    fn integer_arithmetic() {
        let balance = Kopek::from_points(500) - Kopek::from(300);
        assert_eq!(balance, Kopek::from(49700));
        assert_eq!([Kopek::from(100), Kopek::from(50)].into_iter().sum::<Kopek>(), Kopek::from(150));
    }
}
