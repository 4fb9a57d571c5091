//! Minimal CSS selector engine for [`MemoryPage`](super::MemoryPage).
//!
//! Supported grammar, which covers every selector the page contract uses:
//!
//! ```text
//! selector := compound (WS compound)*        descendant combinator only
//! compound := (tag | '*')? part*
//! part     := '#' ident | '.' ident | '[' ident ('=' value)? ']'
//! value    := ident | '"' ... '"' | '\'' ... '\''
//! ```

use super::NodeId;
use crate::error::{FolioError, Result};

/// One compound selector such as `button.primary[type="submit"]`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Compound {
    pub tag: Option<String>,
    pub id: Option<String>,
    pub classes: Vec<String>,
    /// `(name, Some(value))` for `[name=value]`, `(name, None)` for `[name]`.
    pub attributes: Vec<(String, Option<String>)>,
}

/// A chain of compounds joined by descendant combinators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    pub compounds: Vec<Compound>,
}

/// Tree access needed to evaluate a selector.
pub trait ElementTree {
    fn tag_name(&self, node: NodeId) -> &str;
    fn has_class(&self, node: NodeId, class: &str) -> bool;
    fn attribute_value(&self, node: NodeId, name: &str) -> Option<&str>;
    fn parent_of(&self, node: NodeId) -> Option<NodeId>;
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

struct Cursor<'a> {
    source: &'a str,
    chars: std::iter::Peekable<std::str::Chars<'a>>,
}

impl<'a> Cursor<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.chars().peekable(),
        }
    }

    fn error(&self, reason: impl Into<String>) -> FolioError {
        FolioError::InvalidSelector {
            selector: self.source.to_string(),
            reason: reason.into(),
        }
    }

    fn ident(&mut self) -> Result<String> {
        let mut out = String::new();
        while let Some(&c) = self.chars.peek() {
            if !is_ident_char(c) {
                break;
            }
            out.push(c);
            self.chars.next();
        }
        if out.is_empty() {
            Err(self.error("expected identifier"))
        } else {
            Ok(out)
        }
    }

    fn attribute(&mut self) -> Result<(String, Option<String>)> {
        let name = self.ident()?;
        match self.chars.next() {
            Some(']') => Ok((name, None)),
            Some('=') => {
                let value = match self.chars.peek().copied() {
                    Some(quote @ ('"' | '\'')) => {
                        self.chars.next();
                        let mut out = String::new();
                        loop {
                            match self.chars.next() {
                                Some(c) if c == quote => break,
                                Some(c) => out.push(c),
                                None => return Err(self.error("unterminated string")),
                            }
                        }
                        out
                    }
                    _ => self.ident()?,
                };
                match self.chars.next() {
                    Some(']') => Ok((name, Some(value))),
                    _ => Err(self.error("expected `]`")),
                }
            }
            _ => Err(self.error("expected `]` or `=`")),
        }
    }

    fn compound(&mut self) -> Result<Compound> {
        let mut compound = Compound::default();
        match self.chars.peek().copied() {
            Some('*') => {
                self.chars.next();
            }
            Some(c) if is_ident_char(c) => compound.tag = Some(self.ident()?.to_ascii_lowercase()),
            _ => {}
        }
        while let Some(&c) = self.chars.peek() {
            match c {
                '#' => {
                    self.chars.next();
                    compound.id = Some(self.ident()?);
                }
                '.' => {
                    self.chars.next();
                    compound.classes.push(self.ident()?);
                }
                '[' => {
                    self.chars.next();
                    compound.attributes.push(self.attribute()?);
                }
                c if c.is_whitespace() => break,
                other => return Err(self.error(format!("unexpected `{other}`"))),
            }
        }
        Ok(compound)
    }
}

impl Compound {
    /// Parse a single compound, e.g. `div#main.card`.
    pub fn parse(source: &str) -> Result<Self> {
        let selector = Selector::parse(source)?;
        match <[Compound; 1]>::try_from(selector.compounds) {
            Ok([compound]) => Ok(compound),
            Err(_) => Err(FolioError::InvalidSelector {
                selector: source.to_string(),
                reason: "expected a single compound".to_string(),
            }),
        }
    }

    pub fn matches(&self, tree: &impl ElementTree, node: NodeId) -> bool {
        if let Some(tag) = &self.tag
            && !tree.tag_name(node).eq_ignore_ascii_case(tag)
        {
            return false;
        }
        if let Some(id) = &self.id
            && tree.attribute_value(node, "id") != Some(id.as_str())
        {
            return false;
        }
        if !self.classes.iter().all(|c| tree.has_class(node, c)) {
            return false;
        }
        self.attributes.iter().all(|(name, expected)| {
            match (tree.attribute_value(node, name), expected) {
                (Some(actual), Some(expected)) => actual == expected,
                (Some(_), None) => true,
                (None, _) => false,
            }
        })
    }
}

impl Selector {
    pub fn parse(source: &str) -> Result<Self> {
        let mut cursor = Cursor::new(source);
        let mut compounds = Vec::new();
        loop {
            while cursor.chars.peek().is_some_and(|c| c.is_whitespace()) {
                cursor.chars.next();
            }
            if cursor.chars.peek().is_none() {
                break;
            }
            let start = cursor.chars.peek().copied();
            let compound = cursor.compound()?;
            if compound == Compound::default() && start != Some('*') {
                return Err(cursor.error("empty compound"));
            }
            compounds.push(compound);
        }
        if compounds.is_empty() {
            return Err(cursor.error("empty selector"));
        }
        Ok(Self { compounds })
    }

    /// Right-to-left match with descendant combinators. Greedy ancestor
    /// matching is exact when every combinator is a descendant combinator.
    pub fn matches(&self, tree: &impl ElementTree, node: NodeId) -> bool {
        let mut remaining = self.compounds.iter().rev();
        let Some(last) = remaining.next() else {
            return false;
        };
        if !last.matches(tree, node) {
            return false;
        }
        let mut ancestor = tree.parent_of(node);
        for compound in remaining {
            loop {
                let Some(candidate) = ancestor else {
                    return false;
                };
                ancestor = tree.parent_of(candidate);
                if compound.matches(tree, candidate) {
                    break;
                }
            }
        }
        true
    }
}
