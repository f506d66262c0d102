//! Triple model and the draft graph.
//!
//! A [`DraftGraph`] is the cumulative set of statements under construction.
//! It is owned exclusively by the repair orchestrator for the duration of a
//! run, grows monotonically except for explicit retraction during merge, and
//! never contains duplicate triples.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

/// A literal value with optional datatype or language tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Literal {
    /// Lexical form, unescaped
    pub lexical: String,
    /// Datatype as a qualified name, e.g. `xsd:decimal`
    pub datatype: Option<String>,
    /// Language tag, e.g. `en`
    pub language: Option<String>,
}

/// One node of a triple: a named entity or a literal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Term {
    /// Qualified name (`atm:Card1`), full IRI (`<http://…>`), or blank
    /// node label (`_:b0`)
    Named(String),
    /// Literal value
    Literal(Literal),
}

impl Term {
    /// Named term from a qualified name or IRI.
    #[inline]
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    /// Plain string literal.
    #[inline]
    pub fn literal(lexical: impl Into<String>) -> Self {
        Self::Literal(Literal {
            lexical: lexical.into(),
            datatype: None,
            language: None,
        })
    }

    /// Typed literal, e.g. `"100.00"^^xsd:decimal`.
    #[inline]
    pub fn typed(lexical: impl Into<String>, datatype: impl Into<String>) -> Self {
        Self::Literal(Literal {
            lexical: lexical.into(),
            datatype: Some(datatype.into()),
            language: None,
        })
    }

    /// Name of a named term, `None` for literals.
    #[inline]
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Named(name) => Some(name),
            Self::Literal(_) => None,
        }
    }

    /// Literal payload, `None` for named terms.
    #[inline]
    #[must_use]
    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Self::Named(_) => None,
            Self::Literal(lit) => Some(lit),
        }
    }
}

impl std::fmt::Display for Term {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Named(name) => write!(f, "{name}"),
            Self::Literal(lit) => {
                write!(f, "\"{}\"", escape_literal(&lit.lexical))?;
                if let Some(dt) = &lit.datatype {
                    write!(f, "^^{dt}")?;
                } else if let Some(lang) = &lit.language {
                    write!(f, "@{lang}")?;
                }
                Ok(())
            }
        }
    }
}

fn escape_literal(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\t', "\\t")
}

/// A (subject, predicate, object) statement; the atomic unit of the graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Triple {
    /// Subject entity
    pub subject: String,
    /// Predicate, always a named relation
    pub predicate: String,
    /// Object entity or literal
    pub object: Term,
}

impl Triple {
    /// Build a triple.
    #[inline]
    pub fn new(subject: impl Into<String>, predicate: impl Into<String>, object: Term) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object,
        }
    }
}

impl std::fmt::Display for Triple {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {} .", self.subject, self.predicate, self.object)
    }
}

/// The `rdf:type` predicate, written `a` in Turtle.
pub const RDF_TYPE: &str = "rdf:type";

/// Standard vocabulary prefixes the serializer and sanitizer know how to
/// declare without being told.
pub const STANDARD_PREFIXES: &[(&str, &str)] = &[
    ("rdf", "http://www.w3.org/1999/02/22-rdf-syntax-ns#"),
    ("rdfs", "http://www.w3.org/2000/01/rdf-schema#"),
    ("owl", "http://www.w3.org/2002/07/owl#"),
    ("xsd", "http://www.w3.org/2001/XMLSchema#"),
    ("sh", "http://www.w3.org/ns/shacl#"),
    ("skos", "http://www.w3.org/2004/02/skos/core#"),
];

/// The cumulative, mutable draft graph.
#[derive(Debug, Clone, Default)]
pub struct DraftGraph {
    triples: IndexSet<Triple>,
    prefixes: IndexMap<String, String>,
}

impl DraftGraph {
    /// Empty graph with no prefix declarations.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty graph pre-declaring the standard vocabulary prefixes plus a
    /// base namespace.
    #[must_use]
    pub fn with_base(base_prefix: &str, base_iri: &str) -> Self {
        let mut graph = Self::new();
        graph.declare_prefix(base_prefix, base_iri);
        for (prefix, iri) in STANDARD_PREFIXES {
            graph.declare_prefix(*prefix, *iri);
        }
        graph
    }

    /// Declare (or overwrite) a namespace prefix.
    pub fn declare_prefix(&mut self, prefix: impl Into<String>, iri: impl Into<String>) {
        self.prefixes.insert(prefix.into(), iri.into());
    }

    /// Declared prefixes in declaration order.
    #[inline]
    pub fn prefixes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.prefixes.iter().map(|(p, i)| (p.as_str(), i.as_str()))
    }

    /// Insert a triple; returns `false` if it was already present.
    #[inline]
    pub fn insert(&mut self, triple: Triple) -> bool {
        self.triples.insert(triple)
    }

    /// Remove a triple; returns `true` if it was present.
    ///
    /// Uses a shifting removal so iteration order stays first-seen.
    #[inline]
    pub fn remove(&mut self, triple: &Triple) -> bool {
        self.triples.shift_remove(triple)
    }

    /// Whether the exact triple is present.
    #[inline]
    #[must_use]
    pub fn contains(&self, triple: &Triple) -> bool {
        self.triples.contains(triple)
    }

    /// Number of triples.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.triples.len()
    }

    /// Whether the graph holds no triples.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }

    /// All triples in first-seen order.
    ///
    /// The iterator is `Clone` so it can feed the two-pass serializer.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Triple> + Clone {
        self.triples.iter()
    }

    /// Triples whose subject is `entity`.
    pub fn outgoing<'a>(&'a self, entity: &'a str) -> impl Iterator<Item = &'a Triple> {
        self.triples.iter().filter(move |t| t.subject == entity)
    }

    /// Triples whose object is the named entity `entity`.
    pub fn incoming<'a>(&'a self, entity: &'a str) -> impl Iterator<Item = &'a Triple> {
        self.triples
            .iter()
            .filter(move |t| t.object.name() == Some(entity))
    }

    /// Objects of `(subject, predicate, ?)` statements.
    pub fn objects<'a>(&'a self, subject: &'a str, predicate: &'a str) -> impl Iterator<Item = &'a Term> {
        self.triples
            .iter()
            .filter(move |t| t.subject == subject && t.predicate == predicate)
            .map(|t| &t.object)
    }

    /// Subjects of `(?, predicate, object)` statements with a named object.
    pub fn subjects_with<'a>(
        &'a self,
        predicate: &'a str,
        object: &'a str,
    ) -> impl Iterator<Item = &'a str> {
        self.triples
            .iter()
            .filter(move |t| t.predicate == predicate && t.object.name() == Some(object))
            .map(|t| t.subject.as_str())
    }

    /// Whether the entity appears as a subject or named object anywhere.
    #[must_use]
    pub fn knows_entity(&self, entity: &str) -> bool {
        self.triples
            .iter()
            .any(|t| t.subject == entity || t.object.name() == Some(entity))
    }

    /// Replace the triple set wholesale, keeping prefix declarations.
    pub fn replace_triples(&mut self, triples: impl IntoIterator<Item = Triple>) {
        self.triples = triples.into_iter().collect();
    }
}

impl Extend<Triple> for DraftGraph {
    fn extend<I: IntoIterator<Item = Triple>>(&mut self, iter: I) {
        for triple in iter {
            self.insert(triple);
        }
    }
}
