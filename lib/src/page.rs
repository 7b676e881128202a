//! The page format: optional TOML front matter between `+++` lines followed by
//! named blocks.
//!
//! ```text
//! +++
//! title = "Home"
//! +++
//! Text before any header is the `content` block.
//! --- name:sidebar pipeline:markdown,blocks
//! The `sidebar` block.
//! ```

use std::sync::Arc;

use crate::error::Result;
use crate::value::{Dict, Mapper, Sink, Toml, Value};

/// The block a page's leading text belongs to.
pub const CONTENT: &str = "content";

const FRONT_MATTER_DELIM: &str = "+++";
const HEADER_PREFIX: &str = "--- ";

/// A named piece of page content and the processors it is rendered with.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub name: Arc<str>,
    /// The pipeline given in the block's header, if any.
    pub pipeline: Option<Vec<Arc<str>>>,
    pub content: Arc<str>,
    /// 1-based line of the page source the content starts on.
    pub line: usize,
}

/// The blocks of a page, in source order.
#[derive(Debug, Clone, Default, PartialEq, derive_more::Deref)]
pub struct Blocks(Vec<Block>);

impl Blocks {
    pub fn get(&self, name: &str) -> Option<&Block> {
        self.0.iter().find(|b| &*b.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|b| &*b.name)
    }
}

impl FromIterator<Block> for Blocks {
    fn from_iter<T: IntoIterator<Item = Block>>(iter: T) -> Self {
        Blocks(iter.into_iter().collect())
    }
}

/// Splits `input` into its front matter, if any, and the rest. The third
/// value is the number of lines the front matter occupied.
pub fn split_front_matter(input: &str) -> (Option<&str>, &str, usize) {
    let Some(rest) = input.strip_prefix(FRONT_MATTER_DELIM)
        .and_then(|rest| rest.strip_prefix('\n').or_else(|| rest.strip_prefix("\r\n")))
    else {
        return (None, input, 0);
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == FRONT_MATTER_DELIM {
            let front_matter = &rest[..offset];
            let body = &rest[offset + line.len()..];
            let lines = input.len() - body.len();
            return (Some(front_matter), body, crate::util::line_at(input, lines) - 1);
        }

        offset += line.len();
    }

    (None, input, 0)
}

/// Reads the front matter of `input` with `mapper` into `meta` and returns
/// the page's blocks.
pub fn parse_with<M: Mapper, S: Sink>(mapper: &M, input: &str, meta: S) -> Result<Blocks> {
    let (front_matter, body, lines) = split_front_matter(input);
    if let Some(front_matter) = front_matter {
        mapper.map_copy(front_matter.to_string(), &meta)
            .map_err(|e| e.chain(error!("invalid page front matter")))?;
    }

    parse_blocks_at(body, lines + 1)
}

/// Parses a page with TOML front matter, returning the front matter and the
/// blocks.
pub fn parse(input: &str) -> Result<(Dict, Blocks)> {
    let (front_matter, body, lines) = split_front_matter(input);
    let dict = match front_matter {
        Some(front_matter) => Toml.map(front_matter.to_string())
            .map_err(|e| e.chain(error!("invalid page front matter")))?
            .into_dict()
            .map(|dict| Arc::unwrap_or_clone(dict))
            .map_err(|v| error!("front matter must be a table", "found" => v.kind()))?,
        None => Dict::new(),
    };

    Ok((dict, parse_blocks_at(body, lines + 1)?))
}

/// Parses the blocks of a page body without front matter.
pub fn parse_blocks(body: &str) -> Result<Blocks> {
    parse_blocks_at(body, 1)
}

struct Header {
    name: Option<Arc<str>>,
    pipeline: Option<Vec<Arc<str>>>,
}

/// A block header is `--- ` followed only by `key:value` options. A value
/// may continue in the next word after a comma, as in
/// `pipeline:markdown, blocks`.
fn parse_header(line: &str) -> Option<Result<Header>> {
    let line = line.trim_end();
    let mut options: Vec<(&str, String)> = vec![];
    for word in line.strip_prefix(HEADER_PREFIX)?.split_whitespace() {
        if let Some((key, value)) = word.split_once(':') {
            options.push((key, value.to_string()));
            continue;
        }

        match options.last_mut() {
            Some((_, value)) if value.ends_with(',') || word.starts_with(',') => value.push_str(word),
            Some(_) => return Some(err! {
                "malformed block header option",
                "option" => word,
                "header" => line,
            }),
            None => return None,
        }
    }

    let mut header = Header { name: None, pipeline: None };
    for (key, value) in &options {
        match *key {
            "name" => header.name = Some(value.as_str().into()),
            "pipeline" => header.pipeline = Some(parse_pipeline(value)),
            _ => return Some(err! {
                "unknown block header option",
                "option" => key,
                "header" => line,
            }),
        }
    }

    (!options.is_empty()).then_some(Ok(header))
}

/// Splits a comma separated list of processor names.
pub fn parse_pipeline(value: &str) -> Vec<Arc<str>> {
    value.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(Arc::from)
        .collect()
}

/// Reads a pipeline from meta info: a comma separated string or an array of
/// strings.
pub fn pipeline_from_value(value: &Value) -> Option<Vec<Arc<str>>> {
    match value {
        Value::String(s) => Some(parse_pipeline(s)),
        Value::Array(items) => items.iter()
            .map(|v| v.as_str().map(Arc::from))
            .collect(),
        _ => None,
    }
}

fn parse_blocks_at(body: &str, first_line: usize) -> Result<Blocks> {
    fn finish(blocks: &mut Vec<Block>, header: Header, content: &str, line: usize) -> Result<()> {
        let content = content.strip_suffix('\n').unwrap_or(content);
        let content = content.strip_suffix('\r').unwrap_or(content);
        let name = header.name.unwrap_or_else(|| match blocks.len() {
            0 => CONTENT.into(),
            n => format!("block{}", n + 1).into(),
        });

        if blocks.iter().any(|b| b.name == name) {
            return err!("duplicate block name", "name" => name, "line" => line);
        }

        blocks.push(Block { name, pipeline: header.pipeline, content: content.into(), line });
        Ok(())
    }

    let mut blocks = vec![];
    let mut current = Header { name: None, pipeline: None };
    let mut start = 0;
    let mut start_line = first_line;
    let mut leading = true;
    let mut offset = 0;
    let mut line_no = first_line;

    for line in body.split_inclusive('\n') {
        if let Some(header) = parse_header(line) {
            let header = header?;
            let content = &body[start..offset];
            if !(leading && content.trim().is_empty()) {
                finish(&mut blocks, current, content, start_line)?;
            }

            leading = false;
            current = header;
            start = offset + line.len();
            start_line = line_no + 1;
        }

        offset += line.len();
        line_no += 1;
    }

    finish(&mut blocks, current, &body[start..], start_line)?;

    Ok(Blocks(blocks))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::value::Metadata;

    #[test]
    fn blocks_with_headers() {
        let blocks = parse_blocks("--- name:content pipeline:erb\ndata\n--- name:other\nother").unwrap();
        assert_eq!(blocks.names().collect::<Vec<_>>(), ["content", "other"]);

        let content = blocks.get("content").unwrap();
        assert_eq!(&*content.content, "data");
        assert_eq!(content.pipeline, Some(vec![Arc::from("erb")]));
        assert_eq!(content.line, 2);

        let other = blocks.get("other").unwrap();
        assert_eq!(&*other.content, "other");
        assert_eq!(other.pipeline, None);
        assert_eq!(other.line, 4);
    }

    #[test]
    fn leading_text_is_content() {
        let blocks = parse_blocks("hello\n\n--- name:aside pipeline:markdown, blocks\nside\n").unwrap();
        assert_eq!(&*blocks.get("content").unwrap().content, "hello\n");
        let aside = blocks.get("aside").unwrap();
        assert_eq!(&*aside.content, "side");
        assert_eq!(aside.pipeline.as_ref().unwrap().len(), 2);

        let blocks = parse_blocks("--- name:side pipeline:a ,b, c\nx").unwrap();
        let pipeline = blocks.get("side").unwrap().pipeline.clone().unwrap();
        assert_eq!(pipeline.iter().map(|p| &**p).collect::<Vec<_>>(), ["a", "b", "c"]);

        let blocks = parse_blocks("just text\n").unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(&*blocks.get("content").unwrap().content, "just text");

        let blocks = parse_blocks("").unwrap();
        assert_eq!(&*blocks.get("content").unwrap().content, "");
    }

    #[test]
    fn rules_are_not_headers() {
        let blocks = parse_blocks("a\n---\nb\n--- not a header\n").unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(&*blocks[0].content, "a\n---\nb\n--- not a header");
    }

    #[test]
    fn duplicate_and_unnamed_blocks() {
        assert!(parse_blocks("--- name:a\nx\n--- name:a\ny").is_err());
        assert!(parse_blocks("--- name:a colour:red\nx").is_err());
        assert!(parse_blocks("--- name:a stray\nx").is_err());

        let blocks = parse_blocks("--- pipeline:markdown\nx\n--- pipeline:blocks\ny").unwrap();
        assert_eq!(blocks.names().collect::<Vec<_>>(), ["content", "block2"]);
    }

    #[test]
    fn front_matter() {
        let source = "+++\ntitle = \"Home\"\n[blocks.content]\npipeline = \"markdown\"\n+++\nbody\n--- name:b\nx";
        let (meta, blocks) = parse(source).unwrap();
        assert_eq!(meta["title"], Value::from("Home"));
        assert_eq!(&*blocks.get("content").unwrap().content, "body");
        assert_eq!(blocks.get("content").unwrap().line, 6);
        assert_eq!(blocks.get("b").unwrap().line, 8);

        let (meta, blocks) = parse("+++\n+++\nonly").unwrap();
        assert!(meta.is_empty());
        assert_eq!(&*blocks.get("content").unwrap().content, "only");

        let unterminated = "+++\ntitle = 1\nbody";
        let (meta, blocks) = parse(unterminated).unwrap();
        assert!(meta.is_empty());
        assert_eq!(&*blocks.get("content").unwrap().content, unterminated);

        assert!(parse("+++\nnot toml =\n+++\n").is_err());
    }

    #[test]
    fn front_matter_into_sink() {
        let meta = Metadata::new();
        let blocks = parse_with(&Toml, "+++\nlang = \"de\"\n+++\nHallo", &meta).unwrap();
        assert_eq!(meta.get_raw("lang"), Some(Value::from("de")));
        assert_eq!(&*blocks.get("content").unwrap().content, "Hallo");
    }

    #[test]
    fn pipelines_from_values() {
        let value = Value::from("markdown, blocks");
        assert_eq!(pipeline_from_value(&value).unwrap().len(), 2);

        let value: Value = vec![Value::from("tidy")].into();
        assert_eq!(pipeline_from_value(&value).unwrap(), vec![Arc::from("tidy")]);
        assert_eq!(pipeline_from_value(&Value::Int(1)), None);
    }
}
