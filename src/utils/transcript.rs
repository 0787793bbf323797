use crate::{
    error::{ProtocolError, Result},
    gadgets::{
        bits::{TokenBits, TOKEN_BITS},
        curve::{BabyJubjub, Point, PointRepr},
    },
};
use num::BigUint;

fn malformed(line: usize, reason: impl std::fmt::Display) -> ProtocolError {
    ProtocolError::MalformedPeerData(format!("line {}: {reason}", line + 1))
}

/**
 * Parse the point listing printed by external witness generators
 * @dev one "x y" pair of decimal coordinates per line, blank lines are skipped
 *
 * @param curve - curve every point must lie on
 * @param text - generator output
 * @return - points in listing order
 */
pub fn parse_points(curve: &BabyJubjub, text: &str) -> Result<Vec<Point>> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(number, line)| {
            let coordinates: Vec<&str> = line.split_whitespace().collect();
            let [x, y] = coordinates.as_slice() else {
                return Err(malformed(
                    number,
                    format!("expected 2 coordinates, got {}", coordinates.len()),
                ));
            };
            curve
                .decode(&PointRepr(x.to_string(), y.to_string()))
                .map_err(|e| malformed(number, e))
        })
        .collect()
}

/// Inverse of `parse_points`.
pub fn render_points(points: &[Point]) -> String {
    points
        .iter()
        .map(PointRepr::from)
        .map(|PointRepr(x, y)| format!("{x} {y}\n"))
        .collect()
}

/// Longest decimal form of a u64.
const MAX_DECIMAL_DIGITS: usize = 20;

/**
 * Decode one debug token: 64 msb-first characters of 0/1, or a decimal u64
 * @dev decimals must be written without leading zeros, so no token is both forms
 *
 * @param token - token text
 * @return - msb-first 64-bit vector
 */
pub fn parse_token(token: &str) -> Result<TokenBits> {
    if token.len() == TOKEN_BITS && token.bytes().all(|c| c == b'0' || c == b'1') {
        let raw: Vec<u8> = token.bytes().map(|c| c - b'0').collect();
        return TokenBits::from_slice(&raw);
    }
    let bad_token = || ProtocolError::MalformedPeerData(format!("bad token {token:?}"));
    if token.len() > MAX_DECIMAL_DIGITS || (token.len() > 1 && token.starts_with('0')) {
        return Err(bad_token());
    }
    let value = BigUint::parse_bytes(token.as_bytes(), 10).ok_or_else(bad_token)?;
    TokenBits::to_bits(&value)
}

/// Decode every whitespace-separated token of each line.
pub fn parse_token_rows(text: &str) -> Result<Vec<Vec<TokenBits>>> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(number, line)| {
            line.split_whitespace()
                .map(|token| parse_token(token).map_err(|e| malformed(number, e)))
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProtocolConfig;

    #[test]
    fn test_points_listing() {
        let curve = BabyJubjub::new(&ProtocolConfig::standard().unwrap());
        let base = curve.base8();
        let double = curve.add(&base, &base);
        let text = render_points(&[base, double]);
        assert_eq!(parse_points(&curve, &format!("\n{text}\n")).unwrap(), vec![base, double]);

        let err = parse_points(&curve, "1 2 3\n").unwrap_err();
        assert!(err.to_string().contains("line 1"));
        assert!(parse_points(&curve, "1 1\n").is_err());
    }

    #[test]
    fn test_tokens_are_msb_first() {
        let mut bits = "0".repeat(63);
        bits.push('1');
        let rows = parse_token_rows(&format!("{bits} 5\n\n18446744073709551615\n")).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][0], TokenBits::from_u64(1));
        assert_eq!(rows[0][1], TokenBits::from_u64(5));
        assert_eq!(rows[1][0].from_bits(), BigUint::from(u64::MAX));
        // first character is the most significant bit
        assert_eq!(rows[0][1].as_slice()[63], 1);

        assert!(parse_token("18446744073709551616").is_err());
        assert!(parse_token("x1").is_err());
        assert_eq!(parse_token("0").unwrap(), TokenBits::from_u64(0));
    }

    #[test]
    fn test_token_forms_do_not_overlap() {
        // 64 binary digits are always bits, 1 followed by 63 zeros is 2^63
        let mut bits = "1".to_string();
        bits.push_str(&"0".repeat(63));
        assert_eq!(parse_token(&bits).unwrap(), TokenBits::from_u64(1 << 63));

        // padded decimals are refused instead of being read in another base
        assert!(parse_token("010").is_err());
        assert!(parse_token(&format!("{}10", "0".repeat(18))).is_err());
        assert_eq!(parse_token("10").unwrap(), TokenBits::from_u64(10));
    }
}
