//! Vocabulary registry derived from the draft graph.
//!
//! The registry is recomputed from the full graph after every merge. It is
//! derivable state, never hand-maintained incrementally, so it cannot drift
//! from what the graph actually contains.

use indexmap::{IndexMap, IndexSet};

use crate::triple::{DraftGraph, Term, RDF_TYPE};

const CLASS_TYPES: &[&str] = &["owl:Class", "rdfs:Class"];
const PROPERTY_TYPES: &[&str] = &[
    "owl:ObjectProperty",
    "owl:DatatypeProperty",
    "owl:AnnotationProperty",
    "rdf:Property",
];

/// Known classes, properties, domain/range hints, and synonym mappings.
#[derive(Debug, Clone, Default)]
pub struct TermRegistry {
    classes: IndexSet<String>,
    properties: IndexSet<String>,
    domains: IndexMap<String, String>,
    ranges: IndexMap<String, String>,
    synonyms: IndexMap<String, String>,
}

impl TermRegistry {
    /// Recompute the registry from the graph's current contents.
    #[must_use]
    pub fn from_graph(graph: &DraftGraph) -> Self {
        let mut registry = Self::default();
        for triple in graph.iter() {
            match triple.predicate.as_str() {
                RDF_TYPE => {
                    if let Some(object) = triple.object.name() {
                        if CLASS_TYPES.contains(&object) {
                            registry.classes.insert(triple.subject.clone());
                        } else if PROPERTY_TYPES.contains(&object) {
                            registry.properties.insert(triple.subject.clone());
                        } else {
                            // instance assertion: the object names a class
                            registry.classes.insert(object.to_string());
                        }
                    }
                }
                "rdfs:subClassOf" => {
                    registry.classes.insert(triple.subject.clone());
                    if let Some(object) = triple.object.name() {
                        if !object.starts_with("_:") {
                            registry.classes.insert(object.to_string());
                        }
                    }
                }
                "rdfs:domain" => {
                    registry.properties.insert(triple.subject.clone());
                    if let Some(object) = triple.object.name() {
                        registry
                            .domains
                            .insert(triple.subject.clone(), object.to_string());
                        registry.classes.insert(object.to_string());
                    }
                }
                "rdfs:range" => {
                    registry.properties.insert(triple.subject.clone());
                    if let Some(object) = triple.object.name() {
                        registry
                            .ranges
                            .insert(triple.subject.clone(), object.to_string());
                        // datatype ranges (xsd:*) are not classes
                        if !object.starts_with("xsd:") {
                            registry.classes.insert(object.to_string());
                        }
                    }
                }
                "owl:equivalentClass" => {
                    registry.classes.insert(triple.subject.clone());
                    if let Some(object) = triple.object.name() {
                        registry.classes.insert(object.to_string());
                        registry
                            .synonyms
                            .insert(object.to_string(), triple.subject.clone());
                    }
                }
                "skos:altLabel" => {
                    if let Term::Literal(lit) = &triple.object {
                        registry
                            .synonyms
                            .insert(lit.lexical.clone(), triple.subject.clone());
                    }
                }
                _ => {}
            }
            // every predicate in use is a known property
            if triple.predicate != RDF_TYPE {
                registry.properties.insert(triple.predicate.clone());
            }
        }
        registry
    }

    /// Whether `name` is a registered class.
    #[inline]
    #[must_use]
    pub fn is_class(&self, name: &str) -> bool {
        self.classes.contains(name)
    }

    /// Whether `name` is a registered property.
    #[inline]
    #[must_use]
    pub fn is_property(&self, name: &str) -> bool {
        self.properties.contains(name)
    }

    /// Canonical form of a name, following one synonym hop if registered.
    #[must_use]
    pub fn canonical<'a>(&'a self, name: &'a str) -> &'a str {
        self.synonyms.get(name).map_or(name, String::as_str)
    }

    /// Whether `name` is a synonym of some canonical class.
    #[inline]
    #[must_use]
    pub fn is_synonym(&self, name: &str) -> bool {
        self.synonyms.contains_key(name)
    }

    /// Registered classes in first-seen order.
    #[inline]
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.classes.iter().map(String::as_str)
    }

    /// Registered properties in first-seen order.
    #[inline]
    pub fn properties(&self) -> impl Iterator<Item = &str> {
        self.properties.iter().map(String::as_str)
    }

    /// Declared domain of a property, if any.
    #[inline]
    #[must_use]
    pub fn domain_of(&self, property: &str) -> Option<&str> {
        self.domains.get(property).map(String::as_str)
    }

    /// Declared range of a property, if any.
    #[inline]
    #[must_use]
    pub fn range_of(&self, property: &str) -> Option<&str> {
        self.ranges.get(property).map(String::as_str)
    }

    /// `(property, domain)` hint pairs.
    pub fn domain_hints(&self) -> impl Iterator<Item = (&str, &str)> {
        self.domains.iter().map(|(p, c)| (p.as_str(), c.as_str()))
    }

    /// `(property, range)` hint pairs.
    pub fn range_hints(&self) -> impl Iterator<Item = (&str, &str)> {
        self.ranges.iter().map(|(p, c)| (p.as_str(), c.as_str()))
    }

    /// `(synonym, canonical)` pairs.
    pub fn synonym_hints(&self) -> impl Iterator<Item = (&str, &str)> {
        self.synonyms.iter().map(|(s, c)| (s.as_str(), c.as_str()))
    }

    /// Every vocabulary token the registry knows, classes first.
    pub fn vocabulary(&self) -> impl Iterator<Item = &str> {
        self.classes
            .iter()
            .chain(self.properties.iter())
            .map(String::as_str)
    }
}
