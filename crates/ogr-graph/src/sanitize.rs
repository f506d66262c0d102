//! Generator-output sanitizer.
//!
//! Text-generation backends routinely wrap Turtle in markdown fences, leak
//! `b'…'` byte-buffer reprs, emit control characters, or forget prefix
//! declarations. Each repair rule here is independent and idempotent; input
//! may need zero, one, or all of them. If the text still fails to parse after
//! every rule, the caller gets a distinct unrecoverable error instead of a
//! partially merged graph.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::SanitizeError;
use crate::triple::{Triple, STANDARD_PREFIXES};
use crate::turtle::{self, ParsedDocument};

fn bare_number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?P<pre>^|[\s,;(])(?P<num>[+-]?\d+(?:\.\d+)?)\^\^").expect("static regex")
    })
}

fn spurious_marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?P<pre>^|[\s,;(])(?:b['"]|\?)(?P<name>[A-Za-z][\w-]*:[A-Za-z_][\w-]*)"#)
            .expect("static regex")
    })
}

fn qname_prefix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // a qname can also follow a `^^` datatype marker
    RE.get_or_init(|| {
        Regex::new(r"(?:^|[\s,;(\[]|\^\^)(?P<prefix>[A-Za-z][\w-]*):[A-Za-z_]")
            .expect("static regex")
    })
}

/// Repairs raw generator text into parseable Turtle.
#[derive(Debug, Clone)]
pub struct Sanitizer {
    base_prefix: String,
    base_iri: String,
}

impl Sanitizer {
    /// Sanitizer that can synthesize a declaration for the project's base
    /// namespace in addition to the standard vocabularies.
    #[inline]
    #[must_use]
    pub fn new(base_prefix: impl Into<String>, base_iri: impl Into<String>) -> Self {
        Self {
            base_prefix: base_prefix.into(),
            base_iri: base_iri.into(),
        }
    }

    /// Apply every repair rule in order and return the cleaned text.
    ///
    /// Applying `repair` to its own output yields the same text.
    #[must_use]
    pub fn repair(&self, raw: &str) -> String {
        let text = strip_code_fences(raw);
        let text = unwrap_bytes_repr(&text);
        let text = strip_control_chars(&text);
        let text = comment_negation_lines(&text);
        let text = quote_bare_numbers(&text);
        let text = strip_spurious_markers(&text);
        self.declare_missing_prefixes(&text)
    }

    /// Repair and parse; the only way generator output enters the graph.
    ///
    /// # Errors
    ///
    /// [`SanitizeError::Unrecoverable`] carrying the raw input when no
    /// combination of repairs produces parseable text.
    pub fn repair_and_parse(&self, raw: &str) -> Result<Vec<Triple>, SanitizeError> {
        let cleaned = self.repair(raw);
        match turtle::parse(&cleaned) {
            Ok(ParsedDocument { triples, .. }) => Ok(triples),
            Err(reason) => {
                tracing::error!(line = reason.line(), %reason, "generator output unrecoverable");
                Err(SanitizeError::Unrecoverable {
                    raw: raw.to_string(),
                    reason,
                })
            }
        }
    }

    /// Rule (g): declare every referenced prefix the body forgot, when the
    /// prefix belongs to a standard vocabulary or the configured base.
    fn declare_missing_prefixes(&self, text: &str) -> String {
        let mut declared: Vec<&str> = Vec::new();
        for line in text.lines() {
            if let Some(rest) = line.trim_start().strip_prefix("@prefix") {
                if let Some((name, _)) = rest.trim_start().split_once(':') {
                    declared.push(name.trim());
                }
            }
        }

        let mut header = String::new();
        let mut synthesized: Vec<&str> = Vec::new();
        // Scan with literals and IRIs blanked so `http://…` colons and quoted
        // text cannot masquerade as qname prefixes.
        let scannable = blank_quoted_regions(text);
        for caps in qname_prefix_re().captures_iter(&scannable) {
            let prefix = caps.name("prefix").map_or("", |m| m.as_str());
            if declared.contains(&prefix) || synthesized.contains(&prefix) {
                continue;
            }
            let iri = if prefix == self.base_prefix {
                Some(self.base_iri.as_str())
            } else {
                STANDARD_PREFIXES
                    .iter()
                    .find(|(p, _)| *p == prefix)
                    .map(|(_, iri)| *iri)
            };
            if let Some(iri) = iri {
                header.push_str(&format!("@prefix {prefix}: <{iri}> .\n"));
                synthesized.push(prefix);
            }
        }

        if header.is_empty() {
            text.to_string()
        } else {
            tracing::debug!(prefixes = ?synthesized, "synthesized missing prefix declarations");
            format!("{header}{text}")
        }
    }
}

/// Rule (a): strip markdown code-fence lines (```` ```turtle ```` and the
/// closing ```` ``` ````), keeping the fenced body.
fn strip_code_fences(text: &str) -> String {
    if !text.contains("```") {
        return text.to_string();
    }
    // split('\n') keeps empty trailing segments, so the rebuild is exact;
    // lines() would swallow one final newline per pass
    text.split('\n')
        .filter(|line| !line.trim_start().starts_with("```"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Rule (b): unwrap `b'…'` / `b"…"` byte-buffer string artifacts, decoding
/// the escape sequences the repr carries. Applied to fixpoint so a doubly
/// wrapped repr unwraps fully.
fn unwrap_bytes_repr(text: &str) -> String {
    let mut current = text.to_string();
    loop {
        let next = unwrap_bytes_repr_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn unwrap_bytes_repr_once(text: &str) -> String {
    let trimmed = text.trim();
    let inner = if let Some(rest) = trimmed.strip_prefix("b'") {
        rest.strip_suffix('\'')
    } else if let Some(rest) = trimmed.strip_prefix("b\"") {
        rest.strip_suffix('"')
    } else {
        None
    };
    let Some(inner) = inner else {
        return text.to_string();
    };
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('\'') => out.push('\''),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Rule (c): drop non-printable control characters, keeping `\n` and `\t`.
fn strip_control_chars(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect()
}

/// Rule (d): a line opening with a bare negation keyword is prose, not
/// Turtle; keep it as a comment rather than dropping it silently.
fn comment_negation_lines(text: &str) -> String {
    text.split('\n')
        .map(|line| {
            let trimmed = line.trim_start();
            let first = trimmed.split_whitespace().next().unwrap_or("");
            if matches!(first, "No" | "Not" | "None" | "no" | "not" | "none") {
                format!("# {line}")
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Rule (e): quote bare numerals that carry a `^^` datatype marker;
/// `100.00^^xsd:decimal` becomes `"100.00"^^xsd:decimal`. Digits inside an
/// already-quoted literal are left alone.
fn quote_bare_numbers(text: &str) -> String {
    replace_outside_quotes(text, bare_number_re(), "${pre}\"${num}\"^^")
}

/// Rule (f): remove spurious `b'` / `?` markers prepended to an otherwise
/// valid qualified name.
fn strip_spurious_markers(text: &str) -> String {
    replace_outside_quotes(text, spurious_marker_re(), "${pre}${name}")
}

/// Whole-text regex replacement would corrupt quoted literals, so the
/// replacement runs segment-wise outside quotes.
fn replace_outside_quotes(text: &str, re: &Regex, replacement: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut segment = String::new();
    let mut in_quotes = false;
    for c in text.chars() {
        if c == '"' {
            if !in_quotes {
                out.push_str(&re.replace_all(&segment, replacement));
                segment.clear();
            }
            out.push(c);
            in_quotes = !in_quotes;
        } else if in_quotes {
            out.push(c);
        } else {
            segment.push(c);
        }
    }
    out.push_str(&re.replace_all(&segment, replacement));
    out
}

/// Replace quoted literals and IRI references with spaces, preserving
/// length, so prefix scanning cannot match inside them.
fn blank_quoted_regions(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_quotes = false;
    let mut in_iri = false;
    for c in text.chars() {
        match c {
            '"' if !in_iri => {
                in_quotes = !in_quotes;
                out.push(' ');
            }
            '<' if !in_quotes => {
                in_iri = true;
                out.push(' ');
            }
            '>' if in_iri => {
                in_iri = false;
                out.push(' ');
            }
            '\n' => out.push('\n'),
            _ if in_quotes || in_iri => out.push(' '),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::triple::Term;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn sanitizer() -> Sanitizer {
        Sanitizer::new("atm", "http://example.com/atm#")
    }

    #[test]
    fn strips_code_fences() {
        let raw = "```turtle\natm:Card1 a atm:CashCard .\n```";
        let cleaned = sanitizer().repair(raw);
        assert!(!cleaned.contains("```"));
        assert!(cleaned.contains("atm:Card1 a atm:CashCard ."));
    }

    #[test]
    fn unwraps_bytes_repr_and_quotes_decimals() {
        let raw = "b'@prefix ex: <http://x#> .\\natm:Response atm:rejects 100.00^^xsd:decimal .'";
        let triples = sanitizer().repair_and_parse(raw).unwrap();
        assert_eq!(triples.len(), 1);
        assert_eq!(triples[0].object, Term::typed("100.00", "xsd:decimal"));
    }

    #[test]
    fn declares_prefix_referenced_only_as_datatype() {
        let raw = "atm:Response atm:rejects \"100.00\"^^xsd:decimal .";
        let cleaned = sanitizer().repair(raw);
        assert!(cleaned.contains("@prefix xsd: <http://www.w3.org/2001/XMLSchema#> ."));
        let triples = sanitizer().repair_and_parse(raw).unwrap();
        assert_eq!(triples[0].object, Term::typed("100.00", "xsd:decimal"));
    }

    #[test]
    fn quoted_literals_keep_embedded_datatype_markers() {
        let raw = "@prefix atm: <http://example.com/atm#> .\n\
                   atm:Card1 atm:note \"rate 5^^xsd:int applies\" .";
        assert_eq!(sanitizer().repair(raw), raw);
        let triples = sanitizer().repair_and_parse(raw).unwrap();
        assert_eq!(
            triples[0].object,
            Term::literal("rate 5^^xsd:int applies")
        );
    }

    #[test]
    fn comments_out_negation_lines() {
        let raw = "atm:Card1 a atm:CashCard .\nNo additional triples are required.";
        let cleaned = sanitizer().repair(raw);
        assert!(cleaned.contains("# No additional triples are required."));
        sanitizer().repair_and_parse(raw).unwrap();
    }

    #[test]
    fn strips_spurious_markers_outside_quotes() {
        let raw = "atm:Card1 atm:hasOwner b'atm:Person .\natm:Card1 atm:note \"keep b'atm:raw\" .";
        let cleaned = sanitizer().repair(raw);
        assert!(cleaned.contains("atm:hasOwner atm:Person ."));
        assert!(cleaned.contains("\"keep b'atm:raw\""));
    }

    #[test]
    fn strips_variable_markers() {
        let raw = "atm:Card1 atm:hasOwner ?atm:Person .";
        let triples = sanitizer().repair_and_parse(raw).unwrap();
        assert_eq!(triples[0].object, Term::named("atm:Person"));
    }

    #[test]
    fn synthesizes_standard_prefixes() {
        let raw = "atm:Card1 a owl:Thing ;\n    rdfs:label \"card\" .";
        let cleaned = sanitizer().repair(raw);
        assert!(cleaned.contains("@prefix atm: <http://example.com/atm#> ."));
        assert!(cleaned.contains("@prefix owl: <http://www.w3.org/2002/07/owl#> ."));
        assert!(cleaned.contains("@prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> ."));
        sanitizer().repair_and_parse(raw).unwrap();
    }

    #[test]
    fn does_not_redeclare_present_prefixes() {
        let raw = "@prefix atm: <http://example.com/atm#> .\natm:Card1 a atm:CashCard .";
        let cleaned = sanitizer().repair(raw);
        assert_eq!(cleaned.matches("@prefix atm:").count(), 1);
    }

    #[test]
    fn unknown_prefix_is_unrecoverable() {
        let raw = "foaf:Person foaf:knows foaf:Agent .";
        let err = sanitizer().repair_and_parse(raw).unwrap_err();
        assert_eq!(err.raw(), raw);
    }

    #[test]
    fn clean_input_passes_through() {
        let raw = "@prefix atm: <http://example.com/atm#> .\natm:Card1 a atm:CashCard .";
        assert_eq!(sanitizer().repair(raw), raw);
    }

    #[test]
    fn repair_is_idempotent_on_scenario_inputs() {
        let inputs = [
            "```turtle\natm:Card1 a atm:CashCard .\n```",
            "b'@prefix ex: <http://x#> .\\natm:Response atm:rejects 100.00^^xsd:decimal .'",
            "No triples.\natm:Card1 atm:amount 5.5^^xsd:decimal .",
            "atm:Card1 atm:hasOwner ?atm:Person .",
            "\n\n",
            "atm:Card1 a atm:CashCard .\n\n\n",
        ];
        let s = sanitizer();
        for input in inputs {
            let once = s.repair(input);
            assert_eq!(s.repair(&once), once, "not idempotent for {input:?}");
        }
    }

    proptest! {
        // Idempotence holds for arbitrary printable input, not just the
        // curated artifacts.
        #[test]
        fn repair_idempotent(input in "[ -~\n\t]{0,200}") {
            let s = sanitizer();
            let once = s.repair(&input);
            prop_assert_eq!(s.repair(&once), once.clone());
        }

        #[test]
        fn repair_never_panics(input in any::<String>()) {
            let _ = sanitizer().repair(&input);
        }
    }
}
