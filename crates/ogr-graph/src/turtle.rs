//! Turtle-subset parser and serializer.
//!
//! Covers the fragment generators actually emit: `@prefix` declarations,
//! qualified names, `<IRI>` references, string literals with `^^` datatypes
//! or `@lang` tags, bare numerals and booleans, the `a` keyword, `;`/`,`
//! continuation, `#` comments, blank node labels and anonymous `[ … ]`
//! property lists. Collections and multi-line strings are out of the subset;
//! they surface as syntax errors with a line number.

use indexmap::IndexMap;

use crate::error::ParseError;
use crate::triple::{Literal, Term, Triple, RDF_TYPE};

/// Result of parsing one document.
#[derive(Debug, Clone, Default)]
pub struct ParsedDocument {
    /// Prefix declarations in document order
    pub prefixes: IndexMap<String, String>,
    /// Statements in document order
    pub triples: Vec<Triple>,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Iri(String),
    QName(String),
    A,
    PrefixDecl,
    Literal(Literal),
    Dot,
    Semicolon,
    Comma,
    OpenBracket,
    CloseBracket,
}

#[derive(Debug, Clone)]
struct Spanned {
    token: Token,
    line: usize,
}

struct Tokenizer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: usize,
}

impl<'a> Tokenizer<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
            line: 1,
        }
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next();
        if c == Some('\n') {
            self.line += 1;
        }
        c
    }

    fn tokenize(mut self) -> Result<Vec<Spanned>, ParseError> {
        let mut out = Vec::new();
        while let Some(&c) = self.chars.peek() {
            match c {
                ' ' | '\t' | '\r' | '\n' => {
                    self.bump();
                }
                '#' => {
                    while let Some(&n) = self.chars.peek() {
                        if n == '\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                '<' => out.push(self.read_iri()?),
                '"' => out.push(self.read_string()?),
                '.' => {
                    self.bump();
                    out.push(self.spanned(Token::Dot));
                }
                ';' => {
                    self.bump();
                    out.push(self.spanned(Token::Semicolon));
                }
                ',' => {
                    self.bump();
                    out.push(self.spanned(Token::Comma));
                }
                '[' => {
                    self.bump();
                    out.push(self.spanned(Token::OpenBracket));
                }
                ']' => {
                    self.bump();
                    out.push(self.spanned(Token::CloseBracket));
                }
                '@' => out.push(self.read_at_keyword()?),
                c if c.is_ascii_digit() || c == '+' || c == '-' => out.push(self.read_number()?),
                c if is_name_start(c) => out.push(self.read_name()?),
                other => {
                    let line = self.line;
                    return Err(ParseError::Syntax {
                        line,
                        message: format!("unexpected character '{other}'"),
                    });
                }
            }
        }
        Ok(out)
    }

    fn spanned(&self, token: Token) -> Spanned {
        Spanned {
            token,
            line: self.line,
        }
    }

    fn read_iri(&mut self) -> Result<Spanned, ParseError> {
        let start = self.line;
        self.bump(); // '<'
        let mut iri = String::new();
        loop {
            match self.bump() {
                Some('>') => break,
                Some('\n') | None => return Err(ParseError::UnterminatedIri { line: start }),
                Some(c) => iri.push(c),
            }
        }
        Ok(Spanned {
            token: Token::Iri(format!("<{iri}>")),
            line: start,
        })
    }

    fn read_string(&mut self) -> Result<Spanned, ParseError> {
        let start = self.line;
        self.bump(); // '"'
        let mut value = String::new();
        loop {
            match self.bump() {
                Some('"') => break,
                Some('\\') => match self.bump() {
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some('r') => value.push('\r'),
                    Some('"') => value.push('"'),
                    Some('\'') => value.push('\''),
                    Some('\\') => value.push('\\'),
                    Some(other) => {
                        value.push('\\');
                        value.push(other);
                    }
                    None => return Err(ParseError::UnterminatedString { line: start }),
                },
                Some('\n') | None => return Err(ParseError::UnterminatedString { line: start }),
                Some(c) => value.push(c),
            }
        }

        let mut literal = Literal {
            lexical: value,
            datatype: None,
            language: None,
        };
        if self.chars.peek() == Some(&'^') {
            self.bump();
            if self.bump() != Some('^') {
                return Err(ParseError::Syntax {
                    line: start,
                    message: "expected '^^' after literal".to_string(),
                });
            }
            literal.datatype = Some(self.read_raw_name(start)?);
        } else if self.chars.peek() == Some(&'@') {
            self.bump();
            let mut lang = String::new();
            while let Some(&c) = self.chars.peek() {
                if c.is_ascii_alphanumeric() || c == '-' {
                    lang.push(c);
                    self.bump();
                } else {
                    break;
                }
            }
            literal.language = Some(lang);
        }
        Ok(Spanned {
            token: Token::Literal(literal),
            line: start,
        })
    }

    fn read_at_keyword(&mut self) -> Result<Spanned, ParseError> {
        let start = self.line;
        self.bump(); // '@'
        let mut word = String::new();
        while let Some(&c) = self.chars.peek() {
            if c.is_ascii_alphabetic() {
                word.push(c);
                self.bump();
            } else {
                break;
            }
        }
        if word == "prefix" {
            Ok(Spanned {
                token: Token::PrefixDecl,
                line: start,
            })
        } else {
            Err(ParseError::Syntax {
                line: start,
                message: format!("unsupported directive '@{word}'"),
            })
        }
    }

    fn read_number(&mut self) -> Result<Spanned, ParseError> {
        let start = self.line;
        let mut text = String::new();
        while let Some(&c) = self.chars.peek() {
            if c.is_ascii_digit() || c == '.' || c == '+' || c == '-' || c == 'e' || c == 'E' {
                // A '.' followed by non-digit is the statement terminator.
                if c == '.' {
                    let mut lookahead = self.chars.clone();
                    lookahead.next();
                    match lookahead.peek() {
                        Some(d) if d.is_ascii_digit() => {}
                        _ => break,
                    }
                }
                text.push(c);
                self.bump();
            } else {
                break;
            }
        }
        // A typed marker directly after a bare numeral is the malformed
        // `100.00^^xsd:decimal` artifact; the sanitizer quotes it.
        if self.chars.peek() == Some(&'^') {
            return Err(ParseError::UnquotedTypedNumber { line: start });
        }
        let datatype = if text.contains('.') || text.contains('e') || text.contains('E') {
            "xsd:decimal"
        } else {
            "xsd:integer"
        };
        Ok(Spanned {
            token: Token::Literal(Literal {
                lexical: text,
                datatype: Some(datatype.to_string()),
                language: None,
            }),
            line: start,
        })
    }

    fn read_name(&mut self) -> Result<Spanned, ParseError> {
        let start = self.line;
        let name = self.read_raw_name(start)?;
        let token = match name.as_str() {
            "a" => Token::A,
            "true" | "false" => Token::Literal(Literal {
                lexical: name,
                datatype: Some("xsd:boolean".to_string()),
                language: None,
            }),
            _ => Token::QName(name),
        };
        Ok(Spanned { token, line: start })
    }

    fn read_raw_name(&mut self, line: usize) -> Result<String, ParseError> {
        if self.chars.peek() == Some(&'<') {
            return match self.read_iri()? {
                Spanned {
                    token: Token::Iri(iri),
                    ..
                } => Ok(iri),
                _ => unreachable!(),
            };
        }
        let mut name = String::new();
        while let Some(&c) = self.chars.peek() {
            if is_name_char(c) {
                name.push(c);
                self.bump();
            } else {
                break;
            }
        }
        if name.is_empty() {
            return Err(ParseError::Syntax {
                line,
                message: "expected a name".to_string(),
            });
        }
        Ok(name)
    }
}

fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == ':'
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | ':')
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    prefixes: IndexMap<String, String>,
    triples: Vec<Triple>,
    blank_counter: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Spanned> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Spanned> {
        let t = self.tokens.get(self.pos).cloned();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn line(&self) -> usize {
        self.peek()
            .or_else(|| self.tokens.last())
            .map_or(1, |t| t.line)
    }

    fn expect_dot(&mut self) -> Result<(), ParseError> {
        match self.next() {
            Some(Spanned {
                token: Token::Dot, ..
            }) => Ok(()),
            Some(other) => Err(ParseError::Syntax {
                line: other.line,
                message: "expected '.'".to_string(),
            }),
            None => Err(ParseError::Syntax {
                line: self.line(),
                message: "unexpected end of input, expected '.'".to_string(),
            }),
        }
    }

    fn check_qname(&self, name: &str, line: usize) -> Result<(), ParseError> {
        if name.starts_with('<') {
            return Ok(());
        }
        if let Some((prefix, _)) = name.split_once(':') {
            // `_` is the blank node namespace and needs no declaration.
            if prefix == "_" || self.prefixes.contains_key(prefix) {
                return Ok(());
            }
            return Err(ParseError::UndeclaredPrefix {
                line,
                prefix: prefix.to_string(),
            });
        }
        Err(ParseError::Syntax {
            line,
            message: format!("'{name}' is not a qualified name or IRI"),
        })
    }

    fn fresh_blank(&mut self) -> String {
        let label = format!("_:b{}", self.blank_counter);
        self.blank_counter += 1;
        label
    }

    fn parse_document(&mut self) -> Result<(), ParseError> {
        while let Some(spanned) = self.peek() {
            match &spanned.token {
                Token::PrefixDecl => self.parse_prefix_decl()?,
                _ => self.parse_statement()?,
            }
        }
        Ok(())
    }

    fn parse_prefix_decl(&mut self) -> Result<(), ParseError> {
        self.next(); // @prefix
        let (prefix, line) = match self.next() {
            Some(Spanned {
                token: Token::QName(name),
                line,
            }) => (name, line),
            other => {
                let line = other.map_or_else(|| self.line(), |t| t.line);
                return Err(ParseError::Syntax {
                    line,
                    message: "expected prefix name after @prefix".to_string(),
                });
            }
        };
        let prefix = prefix.strip_suffix(':').map(str::to_string).ok_or_else(|| {
            ParseError::Syntax {
                line,
                message: "prefix name must end with ':'".to_string(),
            }
        })?;
        let iri = match self.next() {
            Some(Spanned {
                token: Token::Iri(iri),
                ..
            }) => iri,
            other => {
                let line = other.map_or_else(|| self.line(), |t| t.line);
                return Err(ParseError::Syntax {
                    line,
                    message: "expected '<IRI>' in @prefix declaration".to_string(),
                });
            }
        };
        self.expect_dot()?;
        self.prefixes
            .insert(prefix, iri.trim_matches(['<', '>']).to_string());
        Ok(())
    }

    fn parse_statement(&mut self) -> Result<(), ParseError> {
        let subject = self.parse_subject()?;
        self.parse_predicate_object_list(&subject, Token::Dot)?;
        self.expect_dot()?;
        Ok(())
    }

    fn parse_subject(&mut self) -> Result<String, ParseError> {
        match self.next() {
            Some(Spanned {
                token: Token::QName(name),
                line,
            })
            | Some(Spanned {
                token: Token::Iri(name),
                line,
            }) => {
                self.check_qname(&name, line)?;
                Ok(name)
            }
            Some(Spanned {
                token: Token::OpenBracket,
                ..
            }) => {
                let label = self.fresh_blank();
                self.parse_predicate_object_list(&label, Token::CloseBracket)?;
                self.expect_close_bracket()?;
                Ok(label)
            }
            other => {
                let line = other.map_or_else(|| self.line(), |t| t.line);
                Err(ParseError::Syntax {
                    line,
                    message: "expected a subject".to_string(),
                })
            }
        }
    }

    fn expect_close_bracket(&mut self) -> Result<(), ParseError> {
        match self.next() {
            Some(Spanned {
                token: Token::CloseBracket,
                ..
            }) => Ok(()),
            other => {
                let line = other.map_or_else(|| self.line(), |t| t.line);
                Err(ParseError::Syntax {
                    line,
                    message: "expected ']'".to_string(),
                })
            }
        }
    }

    fn parse_predicate_object_list(
        &mut self,
        subject: &str,
        terminator: Token,
    ) -> Result<(), ParseError> {
        loop {
            // Tolerate a trailing ';' before the terminator.
            if let Some(spanned) = self.peek() {
                if spanned.token == terminator {
                    return Ok(());
                }
            }
            let predicate = self.parse_predicate()?;
            self.parse_object_list(subject, &predicate)?;
            match self.peek().map(|t| t.token.clone()) {
                Some(Token::Semicolon) => {
                    self.next();
                }
                _ => return Ok(()),
            }
        }
    }

    fn parse_predicate(&mut self) -> Result<String, ParseError> {
        match self.next() {
            Some(Spanned { token: Token::A, .. }) => Ok(RDF_TYPE.to_string()),
            Some(Spanned {
                token: Token::QName(name),
                line,
            })
            | Some(Spanned {
                token: Token::Iri(name),
                line,
            }) => {
                self.check_qname(&name, line)?;
                Ok(name)
            }
            other => {
                let line = other.map_or_else(|| self.line(), |t| t.line);
                Err(ParseError::Syntax {
                    line,
                    message: "expected a predicate".to_string(),
                })
            }
        }
    }

    fn parse_object_list(&mut self, subject: &str, predicate: &str) -> Result<(), ParseError> {
        loop {
            let object = self.parse_object()?;
            self.triples
                .push(Triple::new(subject, predicate, object));
            match self.peek().map(|t| t.token.clone()) {
                Some(Token::Comma) => {
                    self.next();
                }
                _ => return Ok(()),
            }
        }
    }

    fn parse_object(&mut self) -> Result<Term, ParseError> {
        match self.next() {
            Some(Spanned {
                token: Token::QName(name),
                line,
            })
            | Some(Spanned {
                token: Token::Iri(name),
                line,
            }) => {
                self.check_qname(&name, line)?;
                Ok(Term::Named(name))
            }
            Some(Spanned {
                token: Token::Literal(lit),
                line,
            }) => {
                if let Some(dt) = &lit.datatype {
                    self.check_qname(dt, line)?;
                }
                Ok(Term::Literal(lit))
            }
            Some(Spanned {
                token: Token::OpenBracket,
                ..
            }) => {
                let label = self.fresh_blank();
                self.parse_predicate_object_list(&label, Token::CloseBracket)?;
                self.expect_close_bracket()?;
                Ok(Term::Named(label))
            }
            other => {
                let line = other.map_or_else(|| self.line(), |t| t.line);
                Err(ParseError::Syntax {
                    line,
                    message: "expected an object".to_string(),
                })
            }
        }
    }
}

/// Parse a Turtle-subset document into prefixes and triples.
///
/// # Errors
///
/// Returns a [`ParseError`] with the offending line on any deviation from
/// the subset grammar, including qualified names whose prefix was never
/// declared.
pub fn parse(input: &str) -> Result<ParsedDocument, ParseError> {
    let tokens = Tokenizer::new(input).tokenize()?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        prefixes: IndexMap::new(),
        triples: Vec::new(),
        blank_counter: 0,
    };
    parser.parse_document()?;
    Ok(ParsedDocument {
        prefixes: parser.prefixes,
        triples: parser.triples,
    })
}

/// Serialize prefixes and triples back to Turtle, grouping statements by
/// subject with `;` continuation, subjects in first-seen order.
#[must_use]
pub fn serialize<'a>(
    prefixes: impl Iterator<Item = (&'a str, &'a str)>,
    triples: impl Iterator<Item = &'a Triple> + Clone,
) -> String {
    let mut out = String::new();
    for (prefix, iri) in prefixes {
        out.push_str(&format!("@prefix {prefix}: <{iri}> .\n"));
    }
    if !out.is_empty() {
        out.push('\n');
    }

    let mut subjects: Vec<&str> = Vec::new();
    for triple in triples.clone() {
        if !subjects.contains(&triple.subject.as_str()) {
            subjects.push(&triple.subject);
        }
    }
    for subject in subjects {
        let statements: Vec<&Triple> = triples.clone().filter(|t| t.subject == subject).collect();
        out.push_str(subject);
        for (i, triple) in statements.iter().enumerate() {
            let predicate = if triple.predicate == RDF_TYPE {
                "a"
            } else {
                &triple.predicate
            };
            if i == 0 {
                out.push_str(&format!(" {predicate} {}", triple.object));
            } else {
                out.push_str(&format!(" ;\n    {predicate} {}", triple.object));
            }
        }
        out.push_str(" .\n");
    }
    out
}
