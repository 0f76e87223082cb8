//! Plaintext unit documents.
//!
//! A generic, untyped view of the text format: a document is a list of
//! blocks, a block is a class name, a unit id, and its properties in file
//! order.  The parser is line oriented and deliberately forgiving; lines it
//! cannot interpret are skipped so a partially hand-edited file still loads.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("missing SiiNunit header")]
    MissingHeader,
    #[error("missing opening brace after header")]
    MissingBrace,
}

/// One `type : name { ... }` block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Block {
    pub kind: String,
    pub name: String,
    /// Properties in file order.  A key maps to every value written under
    /// it, so repeated lines (array elements included) stay intact.
    props: Vec<(String, Vec<String>)>,
}

impl Block {
    pub fn new(kind: impl Into<String>, name: impl Into<String>) -> Block {
        Block { kind: kind.into(), name: name.into(), props: Vec::new() }
    }

    /// First value recorded under `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.props
            .iter()
            .find(|(k, _)| k == key)
            .and_then(|(_, vals)| vals.first())
            .map(String::as_str)
    }

    /// Every value recorded under `key`, in file order.
    pub fn get_all(&self, key: &str) -> &[String] {
        self.props
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, vals)| vals.as_slice())
            .unwrap_or(&[])
    }

    /// Replace the values under `key`, or append the key if absent.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.set_all(key, vec![value.into()]);
    }

    pub fn set_all(&mut self, key: &str, values: Vec<String>) {
        match self.props.iter_mut().find(|(k, _)| k == key) {
            Some((_, vals)) => *vals = values,
            None => self.props.push((key.to_string(), values)),
        }
    }

    /// Append one more value under `key`, preserving existing ones.
    pub fn push(&mut self, key: &str, value: impl Into<String>) {
        match self.props.iter_mut().find(|(k, _)| k == key) {
            Some((_, vals)) => vals.push(value.into()),
            None => self.props.push((key.to_string(), vec![value.into()])),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.props.iter().map(|(k, _)| k.as_str())
    }

    /// Read an array property via its `key` count entry and `key[i]`
    /// indexed entries.
    pub fn get_array(&self, key: &str) -> Vec<&str> {
        let count = self
            .get(key)
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(0);
        (0..count).filter_map(|i| self.get(&format!("{key}[{i}]"))).collect()
    }

    /// Rewrite an array property as a whole: the count entry and every
    /// indexed entry together, dropping stale indexes left over from a
    /// previously longer array.
    pub fn set_array(&mut self, key: &str, values: &[String]) {
        self.set(key, values.len().to_string());
        for (i, v) in values.iter().enumerate() {
            self.set(&format!("{key}[{i}]"), v.clone());
        }
        let mut i = values.len();
        loop {
            let indexed = format!("{key}[{i}]");
            let before = self.props.len();
            self.props.retain(|(k, _)| k != &indexed);
            if self.props.len() == before {
                break;
            }
            i += 1;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub blocks: Vec<Block>,
}

impl Document {
    /// First block of the given class, if any.
    pub fn block_of_kind(&self, kind: &str) -> Option<&Block> {
        self.blocks.iter().find(|b| b.kind == kind)
    }

    pub fn block_of_kind_mut(&mut self, kind: &str) -> Option<&mut Block> {
        self.blocks.iter_mut().find(|b| b.kind == kind)
    }

    /// Block with the given unit id, if any.
    pub fn block_named(&self, name: &str) -> Option<&Block> {
        self.blocks.iter().find(|b| b.name == name)
    }

    pub fn block_named_mut(&mut self, name: &str) -> Option<&mut Block> {
        self.blocks.iter_mut().find(|b| b.name == name)
    }
}

/// Parse unit text into a [`Document`].
pub fn parse(input: &str) -> Result<Document, ParseError> {
    let lines: Vec<&str> = input.lines().collect();
    if lines.is_empty() || !lines[0].trim().starts_with("SiiNunit") {
        return Err(ParseError::MissingHeader);
    }

    let mut i = 1;
    while i < lines.len() && lines[i].trim() != "{" {
        i += 1;
    }
    if i == lines.len() {
        return Err(ParseError::MissingBrace);
    }
    i += 1;

    let mut blocks = Vec::new();
    while i < lines.len() {
        let line = lines[i].trim();
        if line.is_empty() || line == "}" {
            i += 1;
            continue;
        }

        // Block opener: "type : name {".
        if let Some((kind, rest)) = line.split_once(':') {
            if rest.contains('{') {
                let name = rest.split('{').next().unwrap_or("").trim();
                let mut block = Block::new(kind.trim(), name);
                i += 1;
                while i < lines.len() {
                    let body = lines[i].trim();
                    i += 1;
                    if body == "}" {
                        break;
                    }
                    if body.is_empty() || body == "{" {
                        continue;
                    }
                    if let Some((key, value)) = body.split_once(':') {
                        block.push(key.trim(), value.trim());
                    }
                }
                blocks.push(block);
                continue;
            }
        }

        i += 1;
    }

    Ok(Document { blocks })
}

/// Write a [`Document`] back to unit text.
pub fn write(doc: &Document) -> String {
    let mut out = String::from("SiiNunit\n{\n");
    for block in &doc.blocks {
        out.push_str(&format!("{} : {} {{\n", block.kind, block.name));
        for (key, values) in &block.props {
            for value in values {
                out.push_str(&format!(" {key}: {value}\n"));
            }
        }
        out.push_str("}\n");
    }
    out.push_str("}\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "SiiNunit\n{\neconomy : economy {\n game_time: 100\n bank: _nameless.1a.2b\n visited_cities: 2\n visited_cities[0]: city.berlin\n visited_cities[1]: city.prague\n}\n}\n";

    #[test]
    fn parses_blocks_and_properties() {
        let doc = parse(SAMPLE).unwrap();
        assert_eq!(doc.blocks.len(), 1);
        let eco = doc.block_of_kind("economy").unwrap();
        assert_eq!(eco.name, "economy");
        assert_eq!(eco.get("game_time"), Some("100"));
        assert_eq!(eco.get_all("visited_cities[0]"), ["city.berlin"]);
    }

    #[test]
    fn missing_header_is_an_error() {
        assert_eq!(parse("economy : x {\n}\n"), Err(ParseError::MissingHeader));
        assert_eq!(parse(""), Err(ParseError::MissingHeader));
    }

    #[test]
    fn missing_brace_is_an_error() {
        assert_eq!(parse("SiiNunit\n"), Err(ParseError::MissingBrace));
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let doc = parse("SiiNunit\n{\neconomy : economy {\n no colon here\n game_time: 5\n}\n}\n").unwrap();
        let eco = doc.block_of_kind("economy").unwrap();
        assert_eq!(eco.get("no colon here"), None);
        assert_eq!(eco.get("game_time"), Some("5"));
    }

    #[test]
    fn set_replaces_and_keeps_order() {
        let mut doc = parse(SAMPLE).unwrap();
        let eco = doc.block_of_kind_mut("economy").unwrap();
        eco.set("game_time", "200");
        assert_eq!(eco.get("game_time"), Some("200"));
        let keys: Vec<&str> = eco.keys().collect();
        assert_eq!(keys[0], "game_time");
        assert_eq!(keys[1], "bank");
    }

    #[test]
    fn array_helpers_keep_count_and_indexes_consistent() {
        let mut doc = parse(SAMPLE).unwrap();
        let eco = doc.block_of_kind_mut("economy").unwrap();
        assert_eq!(eco.get_array("visited_cities"), ["city.berlin", "city.prague"]);

        eco.set_array("visited_cities", &["city.wien".to_string()]);
        assert_eq!(eco.get("visited_cities"), Some("1"));
        assert_eq!(eco.get_array("visited_cities"), ["city.wien"]);
        assert_eq!(eco.get("visited_cities[1]"), None);
    }

    #[test]
    fn write_then_parse_is_stable() {
        let doc = parse(SAMPLE).unwrap();
        let text = write(&doc);
        assert_eq!(parse(&text).unwrap(), doc);
    }
}
