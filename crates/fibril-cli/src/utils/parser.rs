use std::ops::RangeInclusive;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Invalid segment '{0}'. Expected 'START-END' (e.g., '0-35').")]
    InvalidSegmentFormat(String),

    #[error("Segment '{0}' ends before it starts.")]
    ReversedSegment(String),

    #[error("Invalid --set format: '{0}'. Expected KEY=VALUE.")]
    InvalidKeyValue(String),

    #[error("Component '{component}' cannot be empty in '{input}'.")]
    EmptyComponent {
        component: &'static str,
        input: String,
    },
}

/// Parses an inclusive bead index range written as `START-END`.
pub fn parse_segment(input: &str) -> Result<RangeInclusive<usize>, ParseError> {
    let (start, end) = input
        .split_once('-')
        .ok_or_else(|| ParseError::InvalidSegmentFormat(input.to_string()))?;
    let parse = |component: &'static str, value: &str| {
        let value = value.trim();
        if value.is_empty() {
            return Err(ParseError::EmptyComponent {
                component,
                input: input.to_string(),
            });
        }
        value
            .parse::<usize>()
            .map_err(|_| ParseError::InvalidSegmentFormat(input.to_string()))
    };
    let (start, end) = (parse("start", start)?, parse("end", end)?);
    if end < start {
        return Err(ParseError::ReversedSegment(input.to_string()));
    }
    Ok(start..=end)
}

/// Splits a `-S` override into its key and raw value.
pub fn parse_key_value(input: &str) -> Result<(&str, &str), ParseError> {
    let (key, value) = input
        .split_once('=')
        .ok_or_else(|| ParseError::InvalidKeyValue(input.to_string()))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(ParseError::EmptyComponent {
            component: "key",
            input: input.to_string(),
        });
    }
    Ok((key, value.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segments_parse_as_inclusive_ranges() {
        assert_eq!(parse_segment("0-35"), Ok(0..=35));
        assert_eq!(parse_segment(" 4 - 4 "), Ok(4..=4));
    }

    #[test]
    fn malformed_segments_are_rejected() {
        assert_eq!(
            parse_segment("12"),
            Err(ParseError::InvalidSegmentFormat("12".into()))
        );
        assert_eq!(
            parse_segment("a-3"),
            Err(ParseError::InvalidSegmentFormat("a-3".into()))
        );
        assert_eq!(
            parse_segment("-3"),
            Err(ParseError::EmptyComponent {
                component: "start",
                input: "-3".into()
            })
        );
        assert_eq!(
            parse_segment("9-2"),
            Err(ParseError::ReversedSegment("9-2".into()))
        );
    }

    #[test]
    fn key_value_splits_on_first_equals() {
        assert_eq!(
            parse_key_value("unit.anchors=a=b"),
            Ok(("unit.anchors", "a=b"))
        );
        assert_eq!(
            parse_key_value("novalue"),
            Err(ParseError::InvalidKeyValue("novalue".into()))
        );
        assert!(matches!(
            parse_key_value("=1"),
            Err(ParseError::EmptyComponent { component: "key", .. })
        ));
    }
}
