use super::path::NodePath;
use indexmap::IndexMap;
use serde_yaml::Value;
use std::borrow::Cow;

pub type Mapping = IndexMap<String, Node>;

/// Parsed YAML tree with string keys.
///
/// Keys are normalised to text so that unquoted response codes (`200:`) and
/// quoted ones (`'200':`) look the same to the rules.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Mapping(Mapping),
    Sequence(Vec<Node>),
    Scalar(Scalar),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Number(serde_yaml::Number),
    String(String),
}

/// Returned by a [`walk`] visitor to control descent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    Descend,
    Skip,
}

impl From<Value> for Node {
    // Nesting depth is bounded by the YAML parser's recursion limit.
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Node::Scalar(Scalar::Null),
            Value::Bool(b) => Node::Scalar(Scalar::Bool(b)),
            Value::Number(n) => Node::Scalar(Scalar::Number(n)),
            Value::String(s) => Node::Scalar(Scalar::String(s)),
            Value::Sequence(items) => Node::Sequence(items.into_iter().map(Node::from).collect()),
            Value::Mapping(map) => Node::Mapping(
                map.into_iter()
                    .map(|(key, value)| (key_text(key), Node::from(value)))
                    .collect(),
            ),
            Value::Tagged(tagged) => Node::from(tagged.value),
        }
    }
}

fn key_text(key: Value) -> String {
    match key {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Tagged(tagged) => key_text(tagged.value),
        other => serde_yaml::to_string(&other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

impl Node {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Node::Mapping(_) => "mapping",
            Node::Sequence(_) => "sequence",
            Node::Scalar(Scalar::Null) => "null",
            Node::Scalar(Scalar::Bool(_)) => "boolean",
            Node::Scalar(Scalar::Number(_)) => "number",
            Node::Scalar(Scalar::String(_)) => "string",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Node::Scalar(Scalar::Null))
    }

    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Node::Mapping(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[Node]> {
        match self {
            Node::Sequence(items) => Some(items),
            _ => None,
        }
    }

    /// String scalars only.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Node::Scalar(Scalar::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Any non-null scalar rendered as text (`0.6` stays `"0.6"`).
    pub fn as_text(&self) -> Option<Cow<'_, str>> {
        match self {
            Node::Scalar(Scalar::String(s)) => Some(Cow::Borrowed(s)),
            Node::Scalar(Scalar::Number(n)) => Some(Cow::Owned(n.to_string())),
            Node::Scalar(Scalar::Bool(b)) => Some(Cow::Owned(b.to_string())),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Node> {
        self.as_mapping().and_then(|map| map.get(key))
    }

    pub fn lookup(&self, keys: &[&str]) -> Option<&Node> {
        keys.iter().try_fold(self, |node, key| node.get(key))
    }

    pub fn str_at(&self, keys: &[&str]) -> Option<&str> {
        self.lookup(keys).and_then(Node::as_str)
    }

    /// Resolve a local JSON pointer reference such as
    /// `#/components/schemas/ErrorInfo`.
    pub fn resolve_ref(&self, reference: &str) -> Option<&Node> {
        let pointer = reference.strip_prefix("#/")?;
        pointer.split('/').try_fold(self, |node, raw| {
            let segment = raw.replace("~1", "/").replace("~0", "~");
            match node {
                Node::Mapping(map) => map.get(segment.as_str()),
                Node::Sequence(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
                Node::Scalar(_) => None,
            }
        })
    }

    /// True if any key or string scalar in the subtree contains `needle`
    /// (compared case-insensitively).
    pub fn contains_text(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        let mut found = false;
        walk(self, NodePath::root(), |_, node| {
            if found {
                return Visit::Skip;
            }
            match node {
                Node::Mapping(map) => {
                    found = map.keys().any(|k| k.to_lowercase().contains(&needle));
                }
                Node::Scalar(Scalar::String(s)) => {
                    found = s.to_lowercase().contains(&needle);
                }
                _ => {}
            }
            Visit::Descend
        });
        found
    }
}

/// Pre-order traversal with an explicit work stack.
///
/// Children are visited in document order. The visitor may return
/// [`Visit::Skip`] to prune the subtree below the current node.
pub fn walk<'a, F>(root: &'a Node, base: NodePath, mut visit: F)
where
    F: FnMut(&NodePath, &'a Node) -> Visit,
{
    let mut stack: Vec<(NodePath, &'a Node)> = vec![(base, root)];

    while let Some((path, node)) = stack.pop() {
        if visit(&path, node) == Visit::Skip {
            continue;
        }
        match node {
            Node::Mapping(map) => {
                for (key, child) in map.iter().rev() {
                    stack.push((path.child_key(key), child));
                }
            }
            Node::Sequence(items) => {
                for (index, child) in items.iter().enumerate().rev() {
                    stack.push((path.child_index(index), child));
                }
            }
            Node::Scalar(_) => {}
        }
    }
}

/// Collect every node in the subtree for which `predicate` holds.
pub fn find_all<'a, P>(root: &'a Node, base: NodePath, predicate: P) -> Vec<(NodePath, &'a Node)>
where
    P: Fn(&NodePath, &Node) -> bool,
{
    let mut matches = Vec::new();
    walk(root, base, |path, node| {
        if predicate(path, node) {
            matches.push((path.clone(), node));
        }
        Visit::Descend
    });
    matches
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> Node {
        Node::from(serde_yaml::from_str::<Value>(yaml).unwrap())
    }

    #[test]
    fn test_numeric_keys_become_strings() {
        let node = parse("responses:\n  200:\n    description: OK\n  '404':\n    description: NF\n");
        assert!(node.lookup(&["responses", "200"]).is_some());
        assert!(node.lookup(&["responses", "404"]).is_some());
    }

    #[test]
    fn test_number_scalars_render_as_text() {
        let node = parse("info:\n  x-camara-commonalities: 0.6\n");
        let text = node.lookup(&["info", "x-camara-commonalities"]).and_then(Node::as_text);
        assert_eq!(text.as_deref(), Some("0.6"));
    }

    #[test]
    fn test_resolve_ref_with_escaped_segments() {
        let node = parse(
            "components:\n  schemas:\n    Foo:\n      type: string\npaths:\n  /a/b:\n    get: {}\n",
        );
        assert!(node.resolve_ref("#/components/schemas/Foo").is_some());
        assert!(node.resolve_ref("#/paths/~1a~1b/get").is_some());
        assert!(node.resolve_ref("#/components/schemas/Bar").is_none());
        assert!(node.resolve_ref("other.yaml#/Foo").is_none());
    }

    #[test]
    fn test_walk_visits_in_document_order() {
        let node = parse("a:\n  - x\n  - y\nb: z\n");
        let mut seen = Vec::new();
        walk(&node, NodePath::root(), |path, _| {
            seen.push(path.to_string());
            Visit::Descend
        });
        assert_eq!(seen, vec!["(root)", "a", "a[0]", "a[1]", "b"]);
    }

    #[test]
    fn test_walk_handles_deep_nesting_without_recursion() {
        let mut node = Node::Scalar(Scalar::String("leaf".into()));
        for _ in 0..5_000 {
            let mut map = Mapping::new();
            map.insert("n".to_string(), node);
            node = Node::Mapping(map);
        }
        let leaves = find_all(&node, NodePath::root(), |_, n| n.as_str() == Some("leaf"));
        assert_eq!(leaves.len(), 1);
        // Dropping a deeply nested tree is recursive; unwind it by hand.
        let mut current = node;
        while let Node::Mapping(mut map) = current {
            current = map.swap_remove("n").unwrap_or(Node::Scalar(Scalar::Null));
        }
    }

    #[test]
    fn test_contains_text_checks_keys_and_values() {
        let node = parse("schema:\n  $ref: '#/components/schemas/CloudEvent'\n");
        assert!(node.contains_text("event"));
        assert!(!node.contains_text("webhook"));
    }
}
