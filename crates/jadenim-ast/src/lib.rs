//! Parsed Jade template tree, as handed over by the external parser.
//!
//! Nodes are plain data. The compiler only ever borrows them.

use serde::{Deserialize, Deserializer};

/// Source position carried by every node for diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    #[serde(default)]
    pub line: Option<usize>,
    #[serde(default)]
    pub column: Option<usize>,
    #[serde(default)]
    pub filename: Option<String>,
}

impl Location {
    pub fn at_line(line: usize) -> Self {
        Self {
            line: Some(line),
            ..Self::default()
        }
    }
}

/// An ordered sequence of child nodes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(flatten)]
    pub location: Location,
}

impl Block {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self {
            nodes,
            location: Location::default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type")]
pub enum Node {
    Block(Block),
    Tag(Tag),
    Text(Text),
    Code(Code),
    Each(Each),
    Case(Case),
    When(When),
    Mixin(Mixin),
    MixinBlock(MixinBlock),
    Doctype(Doctype),
    Comment(Comment),
    BlockComment(BlockComment),
    Filter(Filter),
    Literal(Literal),
}

impl Node {
    /// Kind name, matching the `type` tag of the serialized tree.
    pub fn kind(&self) -> &'static str {
        match self {
            Node::Block(_) => "Block",
            Node::Tag(_) => "Tag",
            Node::Text(_) => "Text",
            Node::Code(_) => "Code",
            Node::Each(_) => "Each",
            Node::Case(_) => "Case",
            Node::When(_) => "When",
            Node::Mixin(_) => "Mixin",
            Node::MixinBlock(_) => "MixinBlock",
            Node::Doctype(_) => "Doctype",
            Node::Comment(_) => "Comment",
            Node::BlockComment(_) => "BlockComment",
            Node::Filter(_) => "Filter",
            Node::Literal(_) => "Literal",
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Node::Text(_))
    }

    pub fn location(&self) -> &Location {
        match self {
            Node::Block(n) => &n.location,
            Node::Tag(n) => &n.location,
            Node::Text(n) => &n.location,
            Node::Code(n) => &n.location,
            Node::Each(n) => &n.location,
            Node::Case(n) => &n.location,
            Node::When(n) => &n.location,
            Node::Mixin(n) => &n.location,
            Node::MixinBlock(n) => &n.location,
            Node::Doctype(n) => &n.location,
            Node::Comment(n) => &n.location,
            Node::BlockComment(n) => &n.location,
            Node::Filter(n) => &n.location,
            Node::Literal(n) => &n.location,
        }
    }
}

/// A single `name=value` pair on a tag, mixin call or filter.
///
/// `val` is source-expression text. Bare boolean attributes (`checked`)
/// arrive from the parser as `true` and are kept as the text `true`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attribute {
    pub name: String,
    #[serde(deserialize_with = "expression_text")]
    pub val: String,
    #[serde(default = "default_escaped")]
    pub escaped: bool,
}

impl Attribute {
    pub fn new(name: impl Into<String>, val: impl Into<String>, escaped: bool) -> Self {
        Self {
            name: name.into(),
            val: val.into(),
            escaped,
        }
    }
}

fn default_escaped() -> bool {
    true
}

fn expression_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Flag(bool),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(text) => text,
        Raw::Flag(flag) => flag.to_string(),
    })
}

/// The attribute holder shared by tags and mixin calls: static
/// attributes plus `&attributes(...)` blocks merged in at render time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attributes {
    #[serde(default)]
    pub attrs: Vec<Attribute>,
    #[serde(default)]
    pub attribute_blocks: Vec<String>,
}

impl Attributes {
    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty() && self.attribute_blocks.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub name: String,
    #[serde(flatten)]
    pub attributes: Attributes,
    #[serde(default)]
    pub block: Block,
    #[serde(default)]
    pub code: Option<Code>,
    #[serde(default)]
    pub self_closing: bool,
    /// The name is an interpolated expression (`#{expr}`), not literal text.
    #[serde(default)]
    pub buffer: bool,
    #[serde(flatten)]
    pub location: Location,
}

impl Tag {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Attributes::default(),
            block: Block::default(),
            code: None,
            self_closing: false,
            buffer: false,
            location: Location::default(),
        }
    }

    pub fn with_attr(mut self, attr: Attribute) -> Self {
        self.attributes.attrs.push(attr);
        self
    }

    pub fn with_children(mut self, nodes: Vec<Node>) -> Self {
        self.block.nodes = nodes;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Text {
    pub val: String,
    #[serde(flatten)]
    pub location: Location,
}

/// Inline code: `- stmt` (unbuffered), `= expr` (escaped), `!= expr` (raw).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Code {
    pub val: String,
    #[serde(default)]
    pub buffer: bool,
    #[serde(default)]
    pub escape: bool,
    #[serde(default)]
    pub block: Option<Block>,
    #[serde(flatten)]
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Each {
    pub obj: String,
    pub val: String,
    /// Loop key; the parser writes `$index` when none was given.
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub block: Block,
    #[serde(default)]
    pub alternative: Option<Block>,
    #[serde(flatten)]
    pub location: Location,
}

impl Each {
    /// The explicit key variable, if the source named one.
    pub fn key_name(&self) -> Option<&str> {
        match self.key.as_deref() {
            None | Some("$index") | Some("") => None,
            Some(key) => Some(key),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Case {
    pub expr: String,
    #[serde(default)]
    pub block: Block,
    #[serde(flatten)]
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct When {
    pub expr: String,
    #[serde(default)]
    pub block: Option<Block>,
    #[serde(flatten)]
    pub location: Location,
}

impl When {
    pub fn is_default(&self) -> bool {
        self.expr == "default"
    }
}

/// Mixin definition (`mixin name(args)`) or call site (`+name(args)`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mixin {
    pub name: String,
    #[serde(default)]
    pub args: Option<String>,
    #[serde(default)]
    pub block: Option<Block>,
    #[serde(flatten)]
    pub attributes: Attributes,
    #[serde(default)]
    pub call: bool,
    #[serde(flatten)]
    pub location: Location,
}

impl Mixin {
    /// Dynamic names look like `#{expr}` and are resolved at render time.
    pub fn is_dynamic(&self) -> bool {
        self.name.starts_with('#')
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MixinBlock {
    #[serde(flatten)]
    pub location: Location,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Doctype {
    #[serde(default)]
    pub val: Option<String>,
    #[serde(flatten)]
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub val: String,
    #[serde(default)]
    pub buffer: bool,
    #[serde(flatten)]
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockComment {
    pub val: String,
    #[serde(default)]
    pub block: Block,
    #[serde(default)]
    pub buffer: bool,
    #[serde(flatten)]
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Filter {
    pub name: String,
    #[serde(default)]
    pub block: Block,
    #[serde(default)]
    pub attrs: Vec<Attribute>,
    #[serde(flatten)]
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Literal {
    pub str: String,
    #[serde(flatten)]
    pub location: Location,
}

impl Node {
    pub fn text(val: impl Into<String>) -> Self {
        Node::Text(Text {
            val: val.into(),
            location: Location::default(),
        })
    }

    pub fn literal(str: impl Into<String>) -> Self {
        Node::Literal(Literal {
            str: str.into(),
            location: Location::default(),
        })
    }

    pub fn code(val: impl Into<String>, buffer: bool, escape: bool) -> Self {
        Node::Code(Code {
            val: val.into(),
            buffer,
            escape,
            block: None,
            location: Location::default(),
        })
    }

    pub fn block(nodes: Vec<Node>) -> Self {
        Node::Block(Block::new(nodes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_tag_tree() {
        let json = r#"{
            "type": "Block",
            "nodes": [{
                "type": "Tag",
                "name": "div",
                "selfClosing": false,
                "buffer": false,
                "attrs": [{"name": "id", "val": "'x'", "escaped": true},
                          {"name": "checked", "val": true, "escaped": true}],
                "attributeBlocks": [],
                "block": {"type": "Block", "nodes": [{"type": "Text", "val": "hi", "line": 2}]},
                "line": 1
            }]
        }"#;
        let node: Node = serde_json::from_str(json).unwrap();
        let Node::Block(block) = node else {
            panic!("expected block");
        };
        let Node::Tag(tag) = &block.nodes[0] else {
            panic!("expected tag");
        };
        assert_eq!(tag.name, "div");
        assert_eq!(tag.attributes.attrs[0].val, "'x'");
        assert_eq!(tag.attributes.attrs[1].val, "true");
        assert_eq!(tag.location.line, Some(1));
        assert!(tag.block.nodes[0].is_text());
    }

    #[test]
    fn test_unknown_node_type_is_rejected() {
        let json = r#"{"type": "Include", "path": "x.jade"}"#;
        assert!(serde_json::from_str::<Node>(json).is_err());
    }

    #[test]
    fn test_each_index_key_means_no_key() {
        let json = r#"{"type": "Each", "obj": "items", "val": "item", "key": "$index",
                       "block": {"type": "Block", "nodes": []}}"#;
        let Node::Each(each) = serde_json::from_str::<Node>(json).unwrap() else {
            panic!("expected each");
        };
        assert_eq!(each.key_name(), None);
    }
}
