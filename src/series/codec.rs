//! Field encoding for series rows.
//!
//! A row is `<timestamp>,"[p0, p1, ..., pN-1]"`. Floats use Rust's shortest
//! round-trip representation, so decoding an encoded value yields the same bits.

use crate::constants::series::LIST_SEPARATOR;

/// Encode a float so that parsing it back is exact (`1.0`, `12.5`, `1760000000.25`).
pub fn encode_float(value: f64) -> String {
    format!("{:?}", value)
}

/// Encode per-core percentages as a bracketed, comma-space separated list.
pub fn encode_per_core(values: &[f64]) -> String {
    let mut out = String::with_capacity(values.len() * 6 + 2);
    out.push('[');
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            out.push_str(LIST_SEPARATOR);
        }
        out.push_str(&encode_float(*value));
    }
    out.push(']');
    out
}

pub fn decode_timestamp(field: &str) -> Result<f64, String> {
    field
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("invalid timestamp {:?}: {}", field, e))
}

/// Decode a bracketed per-core list. `[]` yields an empty vector.
pub fn decode_per_core(field: &str) -> Result<Vec<f64>, String> {
    let inner = field
        .trim()
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .ok_or_else(|| format!("per-core list {:?} is not bracketed", field))?;

    if inner.trim().is_empty() {
        return Ok(Vec::new());
    }

    inner
        .split(LIST_SEPARATOR.trim_end())
        .map(|part| {
            part.trim()
                .parse::<f64>()
                .map_err(|e| format!("invalid percentage {:?}: {}", part, e))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_matches_sink_layout() {
        assert_eq!(encode_per_core(&[0.0, 12.5, 100.0]), "[0.0, 12.5, 100.0]");
        assert_eq!(encode_per_core(&[]), "[]");
        assert_eq!(encode_float(1760000000.25), "1760000000.25");
    }

    #[test]
    fn test_decode_is_exact() {
        let values = vec![3.3, 0.1 + 0.2, 99.99999999999, 0.0];
        let decoded = decode_per_core(&encode_per_core(&values)).unwrap();
        assert_eq!(decoded, values);

        let ts = 1760612345.123_456_7_f64;
        assert_eq!(decode_timestamp(&encode_float(ts)).unwrap(), ts);
    }

    #[test]
    fn test_decode_accepts_python_style_lists() {
        assert_eq!(
            decode_per_core("[5.9, 100.0, 2.0, 0.0]").unwrap(),
            vec![5.9, 100.0, 2.0, 0.0]
        );
        assert_eq!(decode_per_core("[]").unwrap(), Vec::<f64>::new());
    }

    #[test]
    fn test_decode_rejects_torn_fields() {
        assert!(decode_per_core("[1.0, 2.").is_err());
        assert!(decode_per_core("1.0, 2.0").is_err());
        assert!(decode_per_core("[1.0, abc]").is_err());
        assert!(decode_timestamp("17600000x").is_err());
    }
}
