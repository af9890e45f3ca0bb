//! Compact textual form for blueprints.
//!
//! ```text
//! pattern   := choice
//! choice    := seq ("|" seq)*
//! seq       := postfix ("," postfix)*
//! postfix   := annotated ("*" | "+" | "?")?
//! annotated := ("@" ("error"|"warn"|"info") "(" code "," message ")")? primary
//! primary   := "empty" | "space" | "word" | "any"
//!            | '"' text '"'                      # this exact word
//!            | "/" expr "/"                      # word matching a regex
//!            | "element" nameclass ("{" pattern "}")?
//!            | "(" pattern ")"
//! nameclass := "*" | name ("|" name)*
//! ```
//!
//! `#` starts a line comment. An element without braces places no constraint
//! on its content. Note that `|` binds to the nameclass first: write
//! `(element a) | (element b)` when a choice of elements is meant rather
//! than `element a|b`, which is one element with two admissible names.

use crate::alias::AliasTable;
use crate::blueprint::{Blueprint, Report, Severity};
use crate::checks::{self, BlueprintError};
use crate::predicate::Predicate;
use lazy_static::lazy_static;
use nom::branch::alt;
use nom::bytes::complete::{is_not, take_while1};
use nom::character::complete::{char, multispace1, one_of};
use nom::combinator::{all_consuming, cut, map, opt, value, verify};
use nom::multi::{many0, separated_list1};
use nom::sequence::{delimited, pair, preceded, terminated};
use nom::{IResult, Parser};
use nom_locate::LocatedSpan;
use regex::Regex;
use std::collections::HashSet;
use std::fmt;

type Input<'a> = LocatedSpan<&'a str>;

lazy_static! {
    static ref KEYWORDS: HashSet<&'static str> =
        ["element", "empty", "space", "word", "any"].iter().copied().collect();
}

#[derive(Clone, Debug, PartialEq)]
enum NameSet {
    Any,
    Names(Vec<String>),
}

#[derive(Clone, Debug, PartialEq)]
enum Ast {
    Seq(Vec<Ast>),
    Alt(Vec<Ast>),
    Repeat(Box<Ast>),
    Plus(Box<Ast>),
    Optional(Box<Ast>),
    Element {
        names: NameSet,
        content: Option<Box<Ast>>,
    },
    WordAny,
    WordLit(String),
    WordRe {
        pattern: String,
        start: usize,
        end: usize,
    },
    Space,
    Empty,
    Any,
    Flagged {
        severity: Severity,
        code: String,
        message: String,
        inner: Box<Ast>,
    },
}

fn sp(input: Input<'_>) -> IResult<Input<'_>, ()> {
    value(
        (),
        many0(alt((
            value((), multispace1),
            value((), pair(char('#'), opt(is_not("\n")))),
        ))),
    )
    .parse(input)
}

fn ident(input: Input<'_>) -> IResult<Input<'_>, Input<'_>> {
    preceded(
        sp,
        take_while1(|c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.'),
    )
    .parse(input)
}

fn keyword<'a>(
    k: &'static str,
) -> impl Parser<Input<'a>, Output = Input<'a>, Error = nom::error::Error<Input<'a>>> {
    verify(ident, move |s| *s.fragment() == k)
}

fn name(input: Input<'_>) -> IResult<Input<'_>, String> {
    map(
        verify(ident, |s| !KEYWORDS.contains(*s.fragment())),
        |s: Input<'_>| (*s.fragment()).to_string(),
    )
    .parse(input)
}

fn string_lit(input: Input<'_>) -> IResult<Input<'_>, String> {
    map(
        preceded(
            sp,
            delimited(char('"'), take_while1(|c: char| c != '"'), char('"')),
        ),
        |s: Input<'_>| (*s.fragment()).to_string(),
    )
    .parse(input)
}

fn regex_lit(input: Input<'_>) -> IResult<Input<'_>, Ast> {
    let (rest, _) = preceded(sp, char('/')).parse(input)?;
    let (rest, body) = take_while1(|c: char| c != '/').parse(rest)?;
    let (rest, _) = char('/').parse(rest)?;
    let start = body.location_offset();
    Ok((
        rest,
        Ast::WordRe {
            pattern: (*body.fragment()).to_string(),
            start,
            end: start + body.fragment().len(),
        },
    ))
}

fn nameclass(input: Input<'_>) -> IResult<Input<'_>, NameSet> {
    alt((
        value(NameSet::Any, preceded(sp, char('*'))),
        map(
            separated_list1(preceded(sp, char('|')), name),
            NameSet::Names,
        ),
    ))
    .parse(input)
}

fn element_expr(input: Input<'_>) -> IResult<Input<'_>, Ast> {
    let (rest, _) = keyword("element").parse(input)?;
    let (rest, names) = cut(nameclass).parse(rest)?;
    let (rest, content) = opt(delimited(
        preceded(sp, char('{')),
        pattern,
        cut(preceded(sp, char('}'))),
    ))
    .parse(rest)?;
    Ok((
        rest,
        Ast::Element {
            names,
            content: content.map(Box::new),
        },
    ))
}

fn primary(input: Input<'_>) -> IResult<Input<'_>, Ast> {
    alt((
        value(Ast::Empty, keyword("empty")),
        value(Ast::Space, keyword("space")),
        value(Ast::WordAny, keyword("word")),
        value(Ast::Any, keyword("any")),
        map(string_lit, Ast::WordLit),
        regex_lit,
        element_expr,
        delimited(
            preceded(sp, char('(')),
            pattern,
            cut(preceded(sp, char(')'))),
        ),
    ))
    .parse(input)
}

fn annotation(input: Input<'_>) -> IResult<Input<'_>, (Severity, String, String)> {
    let (rest, _) = preceded(sp, char('@')).parse(input)?;
    let (rest, sev) = cut(verify(ident, |s| {
        matches!(*s.fragment(), "error" | "warn" | "info")
    }))
    .parse(rest)?;
    let severity = match *sev.fragment() {
        "error" => Severity::Error,
        "warn" => Severity::Warning,
        _ => Severity::Information,
    };
    let (rest, (code, message)) = cut(delimited(
        preceded(sp, char('(')),
        pair(string_lit, preceded(preceded(sp, char(',')), string_lit)),
        preceded(sp, char(')')),
    ))
    .parse(rest)?;
    Ok((rest, (severity, code, message)))
}

fn annotated(input: Input<'_>) -> IResult<Input<'_>, Ast> {
    let (rest, note) = opt(annotation).parse(input)?;
    let (rest, inner) = primary(rest)?;
    let ast = match note {
        Some((severity, code, message)) => Ast::Flagged {
            severity,
            code,
            message,
            inner: Box::new(inner),
        },
        None => inner,
    };
    Ok((rest, ast))
}

fn postfix_expr(input: Input<'_>) -> IResult<Input<'_>, Ast> {
    let (rest, inner) = annotated(input)?;
    let (rest, suffix) = opt(preceded(sp, one_of("*+?"))).parse(rest)?;
    let ast = match suffix {
        Some('*') => Ast::Repeat(Box::new(inner)),
        Some('+') => Ast::Plus(Box::new(inner)),
        Some('?') => Ast::Optional(Box::new(inner)),
        _ => inner,
    };
    Ok((rest, ast))
}

fn seq_expr(input: Input<'_>) -> IResult<Input<'_>, Ast> {
    map(
        separated_list1(preceded(sp, char(',')), postfix_expr),
        |mut parts| {
            if parts.len() == 1 {
                parts.remove(0)
            } else {
                Ast::Seq(parts)
            }
        },
    )
    .parse(input)
}

fn pattern(input: Input<'_>) -> IResult<Input<'_>, Ast> {
    map(
        separated_list1(preceded(sp, char('|')), seq_expr),
        |mut branches| {
            if branches.len() == 1 {
                branches.remove(0)
            } else {
                Ast::Alt(branches)
            }
        },
    )
    .parse(input)
}

fn parse_text(source: &str) -> Result<Ast, (usize, String)> {
    match all_consuming(terminated(pattern, sp)).parse(Input::new(source)) {
        Ok((_, ast)) => Ok(ast),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
            let offset = e.input.location_offset();
            Err((offset, format!("blueprint syntax error ({:?})", e.code)))
        }
        Err(nom::Err::Incomplete(_)) => {
            Err((source.len(), "unexpected end of input".to_string()))
        }
    }
}

#[derive(Debug)]
pub enum BlueprintSourceError {
    Parse {
        span: codemap::Span,
        message: String,
    },
    BadRegex {
        span: codemap::Span,
        message: String,
    },
    Invalid(BlueprintError),
}

impl fmt::Display for BlueprintSourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlueprintSourceError::Parse { message, .. }
            | BlueprintSourceError::BadRegex { message, .. } => f.write_str(message),
            BlueprintSourceError::Invalid(err) => write!(f, "{}", err),
        }
    }
}

/// Compiles compact blueprint text into a [`Blueprint`], interning every tag
/// name it meets into its alias table. The same table is then handed to the
/// lexer so that document and blueprint agree on ids.
pub struct BlueprintCompiler {
    map: codemap::CodeMap,
    aliases: AliasTable,
}

impl Default for BlueprintCompiler {
    fn default() -> BlueprintCompiler {
        BlueprintCompiler::new()
    }
}

impl BlueprintCompiler {
    pub fn new() -> BlueprintCompiler {
        BlueprintCompiler::with_aliases(AliasTable::new())
    }

    pub fn with_aliases(aliases: AliasTable) -> BlueprintCompiler {
        BlueprintCompiler {
            map: codemap::CodeMap::new(),
            aliases,
        }
    }

    pub fn compile(&mut self, name: &str, source: &str) -> Result<Blueprint, BlueprintSourceError> {
        let file = self.map.add_file(name.to_string(), source.to_string());
        let ast = parse_text(source).map_err(|(offset, message)| {
            let end = (offset + 1).min(source.len()).max(offset);
            BlueprintSourceError::Parse {
                span: file.span.subspan(offset as u64, end as u64),
                message,
            }
        })?;
        let blueprint = self.bind(ast, &file)?;
        checks::check_blueprint(&blueprint).map_err(BlueprintSourceError::Invalid)?;
        Ok(blueprint)
    }

    fn bind(
        &mut self,
        ast: Ast,
        file: &codemap::File,
    ) -> Result<Blueprint, BlueprintSourceError> {
        Ok(match ast {
            Ast::Seq(parts) => Blueprint::Sequence(
                parts
                    .into_iter()
                    .map(|p| self.bind(p, file))
                    .collect::<Result<_, _>>()?,
            ),
            Ast::Alt(branches) => Blueprint::Choice(
                branches
                    .into_iter()
                    .map(|b| self.bind(b, file))
                    .collect::<Result<_, _>>()?,
            ),
            Ast::Repeat(body) => Blueprint::Repeat(Box::new(self.bind(*body, file)?)),
            Ast::Plus(body) => Blueprint::one_or_more(self.bind(*body, file)?),
            Ast::Optional(body) => Blueprint::optional(self.bind(*body, file)?),
            Ast::Element { names, content } => {
                let tag = match names {
                    NameSet::Any => Predicate::Anything,
                    NameSet::Names(names) if names.len() == 1 => {
                        Predicate::Only(self.aliases.intern(&names[0]))
                    }
                    NameSet::Names(names) => {
                        Predicate::Any(names.iter().map(|n| self.aliases.intern(n)).collect())
                    }
                };
                let content = match content {
                    Some(inner) => Some(Box::new(self.bind(*inner, file)?)),
                    None => None,
                };
                Blueprint::Element(tag, content)
            }
            Ast::WordAny => Blueprint::Word(Predicate::Anything),
            Ast::WordLit(text) => Blueprint::Word(Predicate::Only(text)),
            Ast::WordRe {
                pattern,
                start,
                end,
            } => {
                let re = Regex::new(&pattern).map_err(|e| BlueprintSourceError::BadRegex {
                    span: file.span.subspan(start as u64, end as u64),
                    message: e.to_string(),
                })?;
                Blueprint::Word(Predicate::Match(re))
            }
            Ast::Space => Blueprint::Space,
            Ast::Empty => Blueprint::Empty,
            Ast::Any => Blueprint::Element(Predicate::Anything, None),
            Ast::Flagged {
                severity,
                code,
                message,
                inner,
            } => Blueprint::Flagged(
                Report {
                    severity,
                    code,
                    message,
                },
                Box::new(self.bind(*inner, file)?),
            ),
        })
    }

    pub fn diagnostic(&self, err: &BlueprintSourceError) -> codemap_diagnostic::Diagnostic {
        let spans = match err {
            BlueprintSourceError::Parse { span, .. }
            | BlueprintSourceError::BadRegex { span, .. } => vec![codemap_diagnostic::SpanLabel {
                span: *span,
                label: None,
                style: codemap_diagnostic::SpanStyle::Primary,
            }],
            BlueprintSourceError::Invalid(_) => vec![],
        };
        codemap_diagnostic::Diagnostic {
            level: codemap_diagnostic::Level::Error,
            message: err.to_string(),
            code: None,
            spans,
        }
    }

    pub fn dump_diagnostic(&self, err: &BlueprintSourceError) {
        let mut emitter = codemap_diagnostic::Emitter::stderr(
            codemap_diagnostic::ColorConfig::Auto,
            Some(&self.map),
        );
        emitter.emit(&[self.diagnostic(err)]);
    }

    pub fn aliases(&self) -> &AliasTable {
        &self.aliases
    }

    pub fn aliases_mut(&mut self) -> &mut AliasTable {
        &mut self.aliases
    }

    pub fn into_aliases(self) -> AliasTable {
        self.aliases
    }
}
