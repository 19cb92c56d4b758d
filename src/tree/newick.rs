use super::model::{NodeId, Tree};
use anyhow::{bail, Result};
use std::fs;
use std::path::Path;

/// Read a newick tree from a file. Underscores in labels are preserved.
pub fn read_tree<P: AsRef<Path>>(path: P) -> Result<Tree> {
    let text = fs::read_to_string(&path)?;
    parse(&text)
}

/// Parse a newick string into an arena tree.
pub fn parse(text: &str) -> Result<Tree> {
    let mut parser = Parser {
        bytes: text.as_bytes(),
        pos: 0,
    };
    parser.skip_filler();
    if parser.peek() != Some(b'(') {
        bail!("newick input must start with '('");
    }

    let mut tree = Tree::new(None);
    let root = tree.root();
    parser.parse_children(&mut tree, root)?;
    let (label, length) = parser.parse_annotation()?;
    tree.node_mut(root).label = label;
    tree.node_mut(root).length = length;

    parser.skip_filler();
    if parser.peek() != Some(b';') {
        bail!("newick input must end with ';'");
    }
    Ok(tree)
}

struct Parser<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        Some(b)
    }

    /// Skip whitespace and bracketed comments.
    fn skip_filler(&mut self) {
        loop {
            match self.peek() {
                Some(b) if b.is_ascii_whitespace() => {
                    self.pos += 1;
                }
                Some(b'[') => {
                    while let Some(b) = self.bump() {
                        if b == b']' {
                            break;
                        }
                    }
                }
                _ => return,
            }
        }
    }

    /// Parse `( subtree, subtree, ... )` under `parent`. Assumes the
    /// opening parenthesis is the next byte.
    fn parse_children(&mut self, tree: &mut Tree, parent: NodeId) -> Result<()> {
        self.bump(); // '('
        loop {
            self.skip_filler();
            self.parse_subtree(tree, parent)?;
            self.skip_filler();
            match self.bump() {
                Some(b',') => continue,
                Some(b')') => return Ok(()),
                Some(b) => bail!("unexpected '{}' in newick input", b as char),
                None => bail!("unbalanced parentheses in newick input"),
            }
        }
    }

    fn parse_subtree(&mut self, tree: &mut Tree, parent: NodeId) -> Result<()> {
        if self.peek() == Some(b'(') {
            let node = tree.add_child(parent, None, None);
            self.parse_children(tree, node)?;
            let (label, length) = self.parse_annotation()?;
            tree.node_mut(node).label = label;
            tree.node_mut(node).length = length;
        } else {
            let (label, length) = self.parse_annotation()?;
            if label.is_none() && length.is_none() {
                bail!("empty leaf in newick input");
            }
            tree.add_child(parent, label, length);
        }
        Ok(())
    }

    /// Parse the `label:length` annotation that follows a leaf or a
    /// closing parenthesis. Both parts are optional.
    fn parse_annotation(&mut self) -> Result<(Option<String>, Option<f64>)> {
        self.skip_filler();
        let label = if self.peek() == Some(b'\'') {
            Some(self.parse_quoted()?)
        } else {
            let raw = self.parse_unquoted();
            if raw.is_empty() {
                None
            } else {
                Some(raw)
            }
        };

        self.skip_filler();
        let length = if self.peek() == Some(b':') {
            self.bump();
            self.skip_filler();
            let raw = self.parse_unquoted();
            match raw.parse::<f64>() {
                Ok(v) => Some(v),
                Err(_) => bail!("invalid branch length '{}'", raw),
            }
        } else {
            None
        };

        Ok((label, length))
    }

    fn parse_quoted(&mut self) -> Result<String> {
        self.bump(); // opening quote
        let mut out = Vec::new();
        loop {
            match self.bump() {
                Some(b'\'') => {
                    // doubled quote is an escaped quote
                    if self.peek() == Some(b'\'') {
                        self.bump();
                        out.push(b'\'');
                    } else {
                        return Ok(String::from_utf8_lossy(&out).into_owned());
                    }
                }
                Some(b) => out.push(b),
                None => bail!("unterminated quoted label"),
            }
        }
    }

    fn parse_unquoted(&mut self) -> String {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if matches!(b, b'(' | b')' | b',' | b':' | b';' | b'[') || b.is_ascii_whitespace() {
                break;
            }
            self.pos += 1;
        }
        String::from_utf8_lossy(&self.bytes[start..self.pos]).into_owned()
    }
}

/// Serialize the tree back to newick, root last, with branch lengths
/// where present.
pub fn to_newick(tree: &Tree) -> String {
    let mut out = String::new();
    write_node(tree, tree.root(), &mut out);
    out.push(';');
    out
}

pub fn write_tree<P: AsRef<Path>>(tree: &Tree, path: P) -> Result<()> {
    let mut text = to_newick(tree);
    text.push('\n');
    fs::write(path, text)?;
    Ok(())
}

fn write_node(tree: &Tree, id: NodeId, out: &mut String) {
    if !tree.is_leaf(id) {
        out.push('(');
        for (i, &child) in tree.children(id).iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            write_node(tree, child, out);
        }
        out.push(')');
    }
    if let Some(label) = tree.label(id) {
        out.push_str(&quote_if_needed(label));
    }
    if let Some(length) = tree.length(id) {
        out.push(':');
        out.push_str(&format_length(length));
    }
}

fn quote_if_needed(label: &str) -> String {
    let needs_quotes = label
        .chars()
        .any(|c| matches!(c, '(' | ')' | ',' | ':' | ';' | '[' | ']' | '\'' | ' '));
    if needs_quotes {
        format!("'{}'", label.replace('\'', "''"))
    } else {
        label.to_string()
    }
}

fn format_length(length: f64) -> String {
    // keep integral lengths compact, matching common newick output
    if length.fract() == 0.0 && length.abs() < 1e15 {
        format!("{}", length as i64)
    } else {
        format!("{}", length)
    }
}
