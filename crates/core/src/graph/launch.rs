//! Parser for gst-launch-style graph descriptions.
//!
//! ```text
//! ( videotestsrc num-buffers=300 ! x264enc ! rtph264pay name=pay0 pt=96
//!   audiotestsrc ! audioconvert ! rtpL16pay name=pay1 )
//! ```
//!
//! Elements are linked with `!`. An element that is not preceded by `!`
//! starts a new chain. `key=value` words attach a property to the element
//! before them; values may be double-quoted. A word such as
//! `video/x-raw,width=320` is a caps filter. Parentheses group a bin and
//! must balance; they carry no other meaning here.

use crate::error::{GraphBuildErrorKind, MediaError, Result};

/// One element instance in a description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementSpec {
    pub factory: String,
    pub properties: Vec<(String, String)>,
}

impl ElementSpec {
    fn new(factory: &str) -> Self {
        Self {
            factory: factory.to_string(),
            properties: Vec::new(),
        }
    }

    /// Last value set for `key`, matching gst-launch's override order.
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// The `name` property, if set.
    pub fn name(&self) -> Option<&str> {
        self.property("name")
    }
}

/// A parsed description: linked chains of elements, in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchDescription {
    pub chains: Vec<Vec<ElementSpec>>,
}

impl LaunchDescription {
    /// All elements across all chains, in source order.
    pub fn elements(&self) -> impl Iterator<Item = &ElementSpec> {
        self.chains.iter().flatten()
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Token {
    Open,
    Close,
    Link,
    Word(String),
}

fn syntax(detail: &str) -> MediaError {
    MediaError::graph(GraphBuildErrorKind::Syntax(detail.to_string()))
}

fn tokenize(description: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut word = String::new();
    let mut quoted = false;

    let flush = |word: &mut String, tokens: &mut Vec<Token>| {
        if !word.is_empty() {
            tokens.push(Token::Word(std::mem::take(word)));
        }
    };

    for c in description.chars() {
        if quoted {
            if c == '"' {
                quoted = false;
            } else {
                word.push(c);
            }
            continue;
        }
        match c {
            '"' => quoted = true,
            '(' | ')' | '!' => {
                flush(&mut word, &mut tokens);
                tokens.push(match c {
                    '(' => Token::Open,
                    ')' => Token::Close,
                    _ => Token::Link,
                });
            }
            c if c.is_whitespace() => flush(&mut word, &mut tokens),
            c => word.push(c),
        }
    }

    if quoted {
        return Err(syntax("unterminated quote"));
    }
    flush(&mut word, &mut tokens);
    Ok(tokens)
}

/// Caps words look like `media/type[,field=value...]`.
fn is_caps(word: &str) -> bool {
    let head = word.split(',').next().unwrap_or(word);
    head.contains('/') && !head.contains('=')
}

/// Parse a description into chains of element specs.
///
/// Only structure is checked here; element names are resolved by the builder.
pub fn parse(description: &str) -> Result<LaunchDescription> {
    let mut chains: Vec<Vec<ElementSpec>> = Vec::new();
    let mut depth = 0usize;
    let mut linked = false;

    for token in tokenize(description)? {
        match token {
            Token::Open => depth += 1,
            Token::Close => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| syntax("unbalanced parentheses"))?;
            }
            Token::Link => {
                if linked || chains.last().is_none_or(|chain| chain.is_empty()) {
                    return Err(syntax("link without source element"));
                }
                linked = true;
            }
            Token::Word(word) if is_caps(&word) => {
                let mut caps = ElementSpec::new("capsfilter");
                caps.properties.push(("caps".to_string(), word));
                push_element(&mut chains, caps, linked);
                linked = false;
            }
            Token::Word(word) => match word.split_once('=') {
                Some((key, value)) => {
                    if linked {
                        return Err(syntax("property after link"));
                    }
                    let element = chains
                        .last_mut()
                        .and_then(|chain| chain.last_mut())
                        .ok_or_else(|| syntax("property without element"))?;
                    if key.is_empty() {
                        return Err(syntax("empty property name"));
                    }
                    element
                        .properties
                        .push((key.to_string(), value.to_string()));
                }
                None => {
                    push_element(&mut chains, ElementSpec::new(&word), linked);
                    linked = false;
                }
            },
        }
    }

    if depth != 0 {
        return Err(syntax("unbalanced parentheses"));
    }
    if linked {
        return Err(syntax("link without sink element"));
    }
    if chains.is_empty() {
        return Err(MediaError::graph(GraphBuildErrorKind::Empty));
    }

    Ok(LaunchDescription { chains })
}

fn push_element(chains: &mut Vec<Vec<ElementSpec>>, element: ElementSpec, linked: bool) {
    match chains.last_mut() {
        Some(chain) if linked => chain.push(element),
        _ => chains.push(vec![element]),
    }
}
