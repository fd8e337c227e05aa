//! Re-resolution of generated selectors against a document.
//!
//! This is not a general XPath/CSS engine: it parses and evaluates exactly
//! the dialects the selector chain emits, and the two sides are kept in
//! lock-step. The descendant axis (`//`) pierces open shadow roots to the
//! same depth bound the scanner uses, so selectors captured inside shadow
//! trees remain resolvable.

use crate::document::Document;
use crate::errors::EngineError;
use crate::node::DomNode;
use crate::selector::Selector;
use std::collections::HashSet;

/// Shadow boundaries the descendant axis crosses, matching the scanner's
/// traversal bound.
pub(crate) const MAX_SHADOW_PIERCE: usize = 2;

/// Resolve a raw selector string to its first match.
///
/// Dialect is inferred from the prefix, the same way the strings are
/// produced: `/`-prefixed strings are XPath, a lone `#name` is an id
/// lookup, everything else is a CSS path.
pub fn resolve(doc: &Document, raw: &str) -> Result<DomNode, EngineError> {
    resolve_all(doc, raw)?
        .into_iter()
        .next()
        .ok_or_else(|| EngineError::ElementNotFound(raw.to_string()))
}

/// Resolve a structured selector record.
pub fn resolve_selector(doc: &Document, selector: &Selector) -> Result<DomNode, EngineError> {
    resolve(doc, &selector.value)
}

/// All matches for a raw selector string, in document order.
pub fn resolve_all(doc: &Document, raw: &str) -> Result<Vec<DomNode>, EngineError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(EngineError::InvalidSelector("empty selector".to_string()));
    }

    if let Some(id) = raw.strip_prefix('#') {
        if !id.contains([' ', '>', '.', ':']) {
            return Ok(doc.element_by_id(id).into_iter().collect());
        }
    }

    if raw.starts_with('/') {
        let steps = parse_xpath(raw)?;
        Ok(eval_xpath(doc, &steps))
    } else {
        let parts = parse_css(raw)?;
        Ok(eval_css(doc, &parts))
    }
}

// ---------------------------------------------------------------------------
// XPath subset
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Predicate {
    Attr { name: String, value: String },
    ClassContains(String),
    TextContains(String),
    Position(usize),
}

#[derive(Debug, Clone, PartialEq)]
struct Step {
    descendant: bool,
    name: String,
    predicates: Vec<Predicate>,
}

fn parse_xpath(input: &str) -> Result<Vec<Step>, EngineError> {
    let invalid = |msg: &str| EngineError::InvalidSelector(format!("{msg}: {input}"));
    let chars: Vec<char> = input.chars().collect();
    let mut steps = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let descendant = if chars[i..].starts_with(&['/', '/']) {
            i += 2;
            true
        } else if chars[i] == '/' {
            i += 1;
            false
        } else {
            return Err(invalid("expected axis"));
        };

        let start = i;
        while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '-' || chars[i] == '*')
        {
            i += 1;
        }
        let name: String = chars[start..i].iter().collect();
        if name.is_empty() {
            return Err(invalid("expected node name"));
        }

        let mut predicates = Vec::new();
        while i < chars.len() && chars[i] == '[' {
            let (predicate, next) = parse_predicate(&chars, i + 1, input)?;
            predicates.push(predicate);
            i = next;
        }

        steps.push(Step {
            descendant,
            name,
            predicates,
        });
    }

    if steps.is_empty() {
        return Err(invalid("empty path"));
    }
    Ok(steps)
}

/// Parse one `[...]` predicate starting just past the bracket; returns the
/// predicate and the index just past the closing bracket.
fn parse_predicate(
    chars: &[char],
    start: usize,
    input: &str,
) -> Result<(Predicate, usize), EngineError> {
    let invalid = |msg: &str| EngineError::InvalidSelector(format!("{msg}: {input}"));

    // Scan to the matching close bracket, ignoring brackets inside quotes.
    let mut i = start;
    let mut quote: Option<char> = None;
    while i < chars.len() {
        match (quote, chars[i]) {
            (Some(q), c) if c == q => quote = None,
            (None, '"') => quote = Some('"'),
            (None, '\'') => quote = Some('\''),
            (None, ']') => break,
            _ => {}
        }
        i += 1;
    }
    if i >= chars.len() {
        return Err(invalid("unterminated predicate"));
    }
    let body: String = chars[start..i].iter().collect();
    let body = body.trim();

    let predicate = if let Some(rest) = body.strip_prefix('@') {
        let (name, value) = rest
            .split_once('=')
            .ok_or_else(|| invalid("attribute predicate without value"))?;
        Predicate::Attr {
            name: name.trim().to_string(),
            value: unquote(value.trim()).ok_or_else(|| invalid("unquoted attribute value"))?,
        }
    } else if let Some(rest) = body.strip_prefix("contains(@class,") {
        let value = rest.trim_end_matches(')').trim();
        Predicate::ClassContains(unquote(value).ok_or_else(|| invalid("unquoted class"))?)
    } else if let Some(rest) = body.strip_prefix("contains(.,") {
        let value = rest.trim_end_matches(')').trim();
        Predicate::TextContains(unquote(value).ok_or_else(|| invalid("unquoted text"))?)
    } else if let Ok(position) = body.parse::<usize>() {
        if position == 0 {
            return Err(invalid("positions are 1-based"));
        }
        Predicate::Position(position)
    } else {
        return Err(invalid("unsupported predicate"));
    };

    Ok((predicate, i + 1))
}

fn unquote(value: &str) -> Option<String> {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() >= 2 {
        let (first, last) = (chars[0], chars[chars.len() - 1]);
        if (first == '"' && last == '"') || (first == '\'' && last == '\'') {
            return Some(chars[1..chars.len() - 1].iter().collect());
        }
    }
    None
}

fn eval_xpath(doc: &Document, steps: &[Step]) -> Vec<DomNode> {
    let root = doc.root();
    let mut current: Vec<DomNode> = Vec::new();

    for (index, step) in steps.iter().enumerate() {
        let candidates: Vec<DomNode> = if index == 0 {
            if step.descendant {
                let mut all = vec![root.clone()];
                all.extend(root.descendants_piercing(MAX_SHADOW_PIERCE));
                all
            } else {
                vec![root.clone()]
            }
        } else if step.descendant {
            current
                .iter()
                .flat_map(|c| c.descendants_piercing(MAX_SHADOW_PIERCE))
                .collect()
        } else {
            current.iter().flat_map(|c| c.element_children()).collect()
        };

        let mut matched: Vec<DomNode> = Vec::new();
        let mut seen: HashSet<usize> = HashSet::new();
        for candidate in candidates {
            if step.name != "*" && candidate.tag() != step.name {
                continue;
            }
            if !step
                .predicates
                .iter()
                .all(|p| matches_value_predicate(&candidate, p))
            {
                continue;
            }
            if seen.insert(candidate.object_id()) {
                matched.push(candidate);
            }
        }

        // Positional predicates index into the filtered match list, in
        // document order across all contexts (the generator computes its
        // ordinals the same way).
        for predicate in &step.predicates {
            if let Predicate::Position(position) = predicate {
                matched = matched
                    .into_iter()
                    .nth(position - 1)
                    .into_iter()
                    .collect();
            }
        }

        if matched.is_empty() {
            return Vec::new();
        }
        current = matched;
    }

    current
}

fn matches_value_predicate(node: &DomNode, predicate: &Predicate) -> bool {
    match predicate {
        Predicate::Attr { name, value } => node.attribute(name).as_deref() == Some(value.as_str()),
        Predicate::ClassContains(fragment) => node.has_class_fragment(fragment),
        Predicate::TextContains(text) => node.text_content().contains(text.as_str()),
        Predicate::Position(_) => true,
    }
}

// ---------------------------------------------------------------------------
// CSS subset
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Default)]
struct SimplePart {
    id: Option<String>,
    tag: Option<String>,
    classes: Vec<String>,
    nth_of_type: Option<usize>,
}

fn parse_css(input: &str) -> Result<Vec<SimplePart>, EngineError> {
    let invalid = |msg: &str| EngineError::InvalidSelector(format!("{msg}: {input}"));
    let mut parts = Vec::new();

    for raw_part in input.split('>') {
        let raw_part = raw_part.trim();
        if raw_part.is_empty() {
            return Err(invalid("empty combinator operand"));
        }
        let mut part = SimplePart::default();

        if let Some(id) = raw_part.strip_prefix('#') {
            part.id = Some(id.to_string());
            parts.push(part);
            continue;
        }

        let (head, nth) = match raw_part.split_once(":nth-of-type(") {
            Some((head, rest)) => {
                let digits = rest.trim_end_matches(')');
                let n: usize = digits
                    .parse()
                    .map_err(|_| invalid("bad nth-of-type index"))?;
                (head, Some(n))
            }
            None => (raw_part, None),
        };
        part.nth_of_type = nth;

        let mut pieces = head.split('.');
        let tag = pieces.next().unwrap_or_default();
        if tag.is_empty() {
            return Err(invalid("class-only selectors are not emitted"));
        }
        part.tag = Some(tag.to_string());
        part.classes = pieces.map(|c| c.to_string()).collect();
        parts.push(part);
    }

    Ok(parts)
}

fn eval_css(doc: &Document, parts: &[SimplePart]) -> Vec<DomNode> {
    let root = doc.root();
    let mut current: Vec<DomNode> = Vec::new();

    for (index, part) in parts.iter().enumerate() {
        let candidates: Vec<DomNode> = if index == 0 {
            let mut all = vec![root.clone()];
            all.extend(root.descendants());
            all
        } else {
            current.iter().flat_map(|c| c.element_children()).collect()
        };

        current = candidates
            .into_iter()
            .filter(|c| matches_simple_part(c, part))
            .collect();
        if current.is_empty() {
            return Vec::new();
        }
    }

    current
}

fn matches_simple_part(node: &DomNode, part: &SimplePart) -> bool {
    if let Some(id) = &part.id {
        return node.id().as_deref() == Some(id.as_str());
    }
    if let Some(tag) = &part.tag {
        if node.tag() != *tag {
            return false;
        }
    }
    if !part.classes.iter().all(|c| node.has_class(c)) {
        return false;
    }
    if let Some(n) = part.nth_of_type {
        if node.same_tag_ordinal() != n {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{NodeBuilder, SnapshotDocument};

    fn doc() -> Document {
        SnapshotDocument::build(
            NodeBuilder::new("html").child(
                NodeBuilder::new("body").children(vec![
                    NodeBuilder::new("div").class("panel left").children(vec![
                        NodeBuilder::new("input").id("first").attr("placeholder", "one"),
                        NodeBuilder::new("input").attr("placeholder", "two"),
                    ]),
                    NodeBuilder::new("div").class("panel right").child(
                        NodeBuilder::new("table").id("t").children(vec![
                            NodeBuilder::new("tr").children(vec![
                                NodeBuilder::new("td").text("h1"),
                                NodeBuilder::new("td").text("h2"),
                            ]),
                            NodeBuilder::new("tr").children(vec![
                                NodeBuilder::new("td").child(NodeBuilder::new("input")),
                                NodeBuilder::new("td")
                                    .child(NodeBuilder::new("input").attr("name", "cell")),
                            ]),
                        ]),
                    ),
                ]),
            ),
        )
        .as_document()
    }

    #[test]
    fn resolves_id_lookup() {
        let doc = doc();
        assert_eq!(resolve(&doc, "#first").unwrap().id().as_deref(), Some("first"));
    }

    #[test]
    fn resolves_attribute_xpath() {
        let doc = doc();
        let node = resolve(&doc, "//input[@placeholder=\"two\"]").unwrap();
        assert_eq!(node.attr_or_empty("placeholder"), "two");
    }

    #[test]
    fn resolves_absolute_positional_path() {
        let doc = doc();
        let node = resolve(&doc, "/html/body/div[1]/input[2]").unwrap();
        assert_eq!(node.attr_or_empty("placeholder"), "two");
    }

    #[test]
    fn resolves_table_position_path() {
        let doc = doc();
        let node = resolve(&doc, "//table[@id=\"t\"]//tr[2]/td[2]//input").unwrap();
        assert_eq!(node.attr_or_empty("name"), "cell");
    }

    #[test]
    fn resolves_class_and_text_predicates() {
        let doc = doc();
        let node = resolve(&doc, "//*[contains(@class,\"panel\")][contains(.,\"h2\")]//input[2]")
            .unwrap();
        assert_eq!(node.attr_or_empty("name"), "cell");
    }

    #[test]
    fn resolves_css_chain_with_nth_of_type() {
        let doc = doc();
        let node = resolve(&doc, "html > body > div.panel:nth-of-type(1) > input:nth-of-type(2)")
            .unwrap();
        assert_eq!(node.attr_or_empty("placeholder"), "two");
    }

    #[test]
    fn css_id_anchor_matches_anywhere() {
        let doc = doc();
        let node = resolve(&doc, "#t > tr:nth-of-type(2) > td:nth-of-type(2) > input").unwrap();
        assert_eq!(node.attr_or_empty("name"), "cell");
    }

    #[test]
    fn descendant_axis_pierces_shadow_roots() {
        let doc = SnapshotDocument::build(
            NodeBuilder::new("html").child(
                NodeBuilder::new("body").children(vec![
                    NodeBuilder::new("input").id("light"),
                    NodeBuilder::new("custom-widget")
                        .shadow(vec![NodeBuilder::new("input").attr("placeholder", "inner")]),
                ]),
            ),
        )
        .as_document();
        let node = resolve(&doc, "//input[2]").unwrap();
        assert_eq!(node.attr_or_empty("placeholder"), "inner");
    }

    #[test]
    fn missing_element_is_not_found() {
        let doc = doc();
        assert!(matches!(
            resolve(&doc, "//select"),
            Err(EngineError::ElementNotFound(_))
        ));
    }

    #[test]
    fn malformed_xpath_is_invalid() {
        let doc = doc();
        assert!(matches!(
            resolve(&doc, "//input[@placeholder=two]"),
            Err(EngineError::InvalidSelector(_))
        ));
    }
}
