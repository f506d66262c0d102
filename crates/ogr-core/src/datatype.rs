//! Lexical validity checks for typed literals.

use chrono::NaiveDateTime;

/// Whether `lexical` is a valid value of the named XSD datatype.
/// Unknown datatypes are accepted; only the numeric and temporal types the
/// pipeline actually repairs are checked.
#[must_use]
pub fn valid_lexical(datatype: &str, lexical: &str) -> bool {
    match datatype {
        "xsd:integer" | "xsd:int" | "xsd:long" => lexical.parse::<i64>().is_ok(),
        "xsd:decimal" | "xsd:double" | "xsd:float" => {
            lexical.parse::<f64>().map_or(false, |v| v.is_finite())
                && lexical
                    .chars()
                    .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'))
        }
        "xsd:boolean" => matches!(lexical, "true" | "false" | "0" | "1"),
        "xsd:dateTime" => NaiveDateTime::parse_from_str(lexical, "%Y-%m-%dT%H:%M:%S").is_ok()
            || NaiveDateTime::parse_from_str(lexical, "%Y-%m-%dT%H:%M:%S%.f").is_ok(),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_lexicals() {
        assert!(valid_lexical("xsd:decimal", "100.00"));
        assert!(valid_lexical("xsd:integer", "-42"));
        assert!(!valid_lexical("xsd:decimal", "amount"));
        assert!(!valid_lexical("xsd:decimal", "NaN"));
        assert!(!valid_lexical("xsd:integer", "4.2"));
    }

    #[test]
    fn datetime_lexicals() {
        assert!(valid_lexical("xsd:dateTime", "2024-01-01T00:00:00"));
        assert!(valid_lexical("xsd:dateTime", "2024-01-01T00:00:00.500"));
        assert!(!valid_lexical("xsd:dateTime", "yesterday"));
    }

    #[test]
    fn unknown_datatypes_pass() {
        assert!(valid_lexical("xsd:string", "anything"));
        assert!(valid_lexical("atm:Custom", "anything"));
    }
}
