//! Competency checks.
//!
//! Boolean `ASK` queries expressing what the finished ontology must be able
//! to answer. Queries live in a plain-text file, one block per query,
//! delimited by blank lines; blocks are tracked with balanced-brace counting
//! so nested brace groups inside a body do not split a query. Evaluation is
//! a conjunctive triple-pattern interpreter over the expanded graph; a query
//! that fails to parse or evaluate records a failed outcome with the message
//! and never aborts the remaining queries.

use serde::{Deserialize, Serialize};

use ogr_graph::{DraftGraph, Term, RDF_TYPE};

/// Outcome of one competency query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetencyOutcome {
    /// The query text as loaded
    pub query: String,
    /// Whether the check passed
    pub success: bool,
    /// The boolean answer, absent when evaluation failed
    pub answer: Option<bool>,
    /// Failure message, empty on success
    pub message: String,
}

/// Fraction of passing outcomes; 0.0 for an empty list.
#[must_use]
pub fn pass_rate(outcomes: &[CompetencyOutcome]) -> f64 {
    if outcomes.is_empty() {
        return 0.0;
    }
    let passed = outcomes.iter().filter(|o| o.success).count();
    passed as f64 / outcomes.len() as f64
}

/// Split a query file into individual query blocks.
///
/// Leading comments and blank lines before each query are skipped. A block
/// ends at a blank line only when its braces are balanced. Non-`ASK`
/// blocks are dropped.
#[must_use]
pub fn load_queries(content: &str) -> Vec<String> {
    let mut queries = Vec::new();
    let mut buffer: Vec<&str> = Vec::new();
    let mut depth: i64 = 0;

    let mut flush = |buffer: &mut Vec<&str>, queries: &mut Vec<String>| {
        let query = buffer.join("\n").trim().to_string();
        if !query.is_empty() {
            queries.push(query);
        }
        buffer.clear();
    };

    for line in content.lines() {
        let stripped = line.trim();
        if buffer.is_empty() && (stripped.starts_with('#') || stripped.is_empty()) {
            continue;
        }
        buffer.push(line);
        depth += line.matches('{').count() as i64 - line.matches('}').count() as i64;
        if depth == 0 && stripped.is_empty() {
            flush(&mut buffer, &mut queries);
        }
    }
    if !buffer.is_empty() {
        flush(&mut buffer, &mut queries);
    }

    queries
        .into_iter()
        .filter(|q| q.to_uppercase().contains("ASK"))
        .collect()
}

/// One slot of a triple pattern.
#[derive(Debug, Clone, PartialEq)]
enum PatternTerm {
    Variable(String),
    Named(String),
    Literal(String),
}

impl PatternTerm {
    /// Match against a concrete value, extending `bindings` when an unbound
    /// variable is seen. The caller truncates `bindings` on backtrack.
    fn bind(&self, value: &str, bindings: &mut Vec<(String, String)>) -> bool {
        match self {
            Self::Named(name) => name == value,
            Self::Literal(lexical) => lexical == value,
            Self::Variable(var) => match bindings.iter().find(|(v, _)| v == var) {
                Some((_, bound)) => bound == value,
                None => {
                    bindings.push((var.clone(), value.to_string()));
                    true
                }
            },
        }
    }
}

type TriplePattern = (PatternTerm, PatternTerm, PatternTerm);

/// Parse the body of an `ASK { ... }` query into triple patterns.
fn parse_patterns(query: &str) -> Result<Vec<TriplePattern>, String> {
    let open = query.find('{').ok_or("query has no pattern block")?;
    let close = query.rfind('}').ok_or("query has no closing brace")?;
    if close < open {
        return Err("mismatched braces".to_string());
    }
    let body = &query[open + 1..close];

    let mut tokens: Vec<String> = Vec::new();
    for raw_line in body.lines() {
        let line = raw_line.trim();
        if line.starts_with('#') {
            continue;
        }
        let mut chars = line.chars().peekable();
        while let Some(&c) = chars.peek() {
            if c.is_whitespace() {
                chars.next();
            } else if c == '"' {
                chars.next();
                let mut lexical = String::from("\"");
                for inner in chars.by_ref() {
                    lexical.push(inner);
                    if inner == '"' {
                        break;
                    }
                }
                // swallow a datatype annotation if present
                while chars.peek().is_some_and(|&n| !n.is_whitespace()) {
                    if let Some(n) = chars.next() {
                        lexical.push(n);
                    }
                }
                tokens.push(lexical);
            } else {
                let mut word = String::new();
                while chars.peek().is_some_and(|&n| !n.is_whitespace()) {
                    if let Some(n) = chars.next() {
                        word.push(n);
                    }
                }
                tokens.push(word);
            }
        }
    }

    let mut patterns = Vec::new();
    let mut slot: Vec<PatternTerm> = Vec::new();
    for token in tokens {
        if token == "." {
            continue;
        }
        let token = token.strip_suffix('.').unwrap_or(&token);
        if token.is_empty() {
            continue;
        }
        let term = if let Some(var) = token.strip_prefix('?') {
            PatternTerm::Variable(var.to_string())
        } else if token == "a" {
            PatternTerm::Named(RDF_TYPE.to_string())
        } else if token.starts_with('"') {
            let inner = token
                .trim_start_matches('"')
                .split('"')
                .next()
                .unwrap_or_default();
            PatternTerm::Literal(inner.to_string())
        } else if token.contains(':') {
            PatternTerm::Named(token.to_string())
        } else {
            return Err(format!("unsupported token '{token}'"));
        };
        slot.push(term);
        if slot.len() == 3 {
            let object = slot.pop().unwrap_or(PatternTerm::Literal(String::new()));
            let predicate = slot.pop().unwrap_or(PatternTerm::Literal(String::new()));
            let subject = slot.pop().unwrap_or(PatternTerm::Literal(String::new()));
            patterns.push((subject, predicate, object));
        }
    }
    if !slot.is_empty() {
        return Err("pattern block has a dangling partial triple".to_string());
    }
    if patterns.is_empty() {
        return Err("pattern block contains no triple patterns".to_string());
    }
    Ok(patterns)
}

fn object_value(term: &Term) -> String {
    match term {
        Term::Named(name) => name.clone(),
        Term::Literal(literal) => literal.lexical.clone(),
    }
}

/// Depth-first conjunctive matching with backtracking.
fn matches_patterns(
    graph: &DraftGraph,
    patterns: &[TriplePattern],
    bindings: &mut Vec<(String, String)>,
) -> bool {
    let Some((subject, predicate, object)) = patterns.first() else {
        return true;
    };
    for triple in graph.iter() {
        let depth = bindings.len();
        if subject.bind(&triple.subject, bindings)
            && predicate.bind(&triple.predicate, bindings)
            && object.bind(&object_value(&triple.object), bindings)
            && matches_patterns(graph, &patterns[1..], bindings)
        {
            return true;
        }
        bindings.truncate(depth);
    }
    false
}

/// Runs a loaded query set against a graph.
#[derive(Debug, Clone, Default)]
pub struct CompetencyRunner {
    queries: Vec<String>,
}

impl CompetencyRunner {
    /// Runner over the queries in `content`.
    #[must_use]
    pub fn from_source(content: &str) -> Self {
        let queries = load_queries(content);
        tracing::debug!(count = queries.len(), "loaded competency queries");
        Self { queries }
    }

    /// Number of loaded queries.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.queries.len()
    }

    /// Whether no queries were loaded.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    /// Evaluate every query. Per-query failures are isolated.
    #[must_use]
    pub fn run(&self, graph: &DraftGraph) -> Vec<CompetencyOutcome> {
        self.queries
            .iter()
            .map(|query| match parse_patterns(query) {
                Ok(patterns) => {
                    let answer = matches_patterns(graph, &patterns, &mut Vec::new());
                    CompetencyOutcome {
                        query: query.clone(),
                        success: answer,
                        answer: Some(answer),
                        message: String::new(),
                    }
                }
                Err(message) => CompetencyOutcome {
                    query: query.clone(),
                    success: false,
                    answer: None,
                    message,
                },
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ogr_graph::Triple;

    fn sample_graph() -> DraftGraph {
        let mut graph = DraftGraph::with_base("atm", "http://example.com/atm#");
        graph.insert(Triple::new("atm:Card1", RDF_TYPE, Term::named("atm:CashCard")));
        graph.insert(Triple::new(
            "atm:Card1",
            "atm:hasOwner",
            Term::named("atm:P1"),
        ));
        graph.insert(Triple::new("atm:P1", RDF_TYPE, Term::named("atm:Person")));
        graph
    }

    #[test]
    fn loader_tolerates_nested_braces() {
        let source = "# leading comment\n\nASK {\n  ?c a atm:CashCard .\n  { ?c atm:hasOwner ?o . }\n}\n\nASK {\n  ?p a atm:Person .\n}\n";
        let queries = load_queries(source);
        assert_eq!(queries.len(), 2);
        assert!(queries[0].contains("hasOwner"));
    }

    #[test]
    fn loader_drops_non_ask_blocks() {
        let source = "SELECT ?x WHERE { ?x a atm:CashCard . }\n\nASK { ?x a atm:CashCard . }\n";
        let queries = load_queries(source);
        assert_eq!(queries.len(), 1);
    }

    #[test]
    fn conjunctive_patterns_share_bindings() {
        let runner = CompetencyRunner::from_source(
            "ASK { ?card a atm:CashCard . ?card atm:hasOwner ?owner . ?owner a atm:Person . }\n",
        );
        let outcomes = runner.run(&sample_graph());
        assert!(outcomes[0].success);
        assert_eq!(outcomes[0].answer, Some(true));
    }

    #[test]
    fn unbound_pattern_fails() {
        let runner =
            CompetencyRunner::from_source("ASK { ?card a atm:CashCard . ?card atm:issuedBy ?b . }\n");
        let outcomes = runner.run(&sample_graph());
        assert!(!outcomes[0].success);
        assert_eq!(outcomes[0].answer, Some(false));
    }

    #[test]
    fn malformed_query_is_isolated() {
        let source = "ASK { ?x a }\n\nASK { ?x a atm:Person . }\n";
        let runner = CompetencyRunner::from_source(source);
        let outcomes = runner.run(&sample_graph());
        assert_eq!(outcomes.len(), 2);
        assert!(!outcomes[0].success);
        assert!(outcomes[0].answer.is_none());
        assert!(!outcomes[0].message.is_empty());
        assert!(outcomes[1].success);
    }

    #[test]
    fn literal_objects_match() {
        let mut graph = sample_graph();
        graph.insert(Triple::new(
            "atm:Card1",
            "atm:pin",
            Term::typed("1234", "xsd:string"),
        ));
        let runner = CompetencyRunner::from_source("ASK { atm:Card1 atm:pin \"1234\" . }\n");
        assert!(runner.run(&graph)[0].success);
    }

    #[test]
    fn pass_rate_handles_empty() {
        assert_eq!(pass_rate(&[]), 0.0);
    }
}
