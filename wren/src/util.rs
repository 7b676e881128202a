use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use kestrel::{error, Node, Observer, Tree};
use kestrel::error::Error;
use kestrel::value::{MetaKey, Value};
use pulldown_cmark_escape::escape_html;

use crate::SourcePath;

pub trait ValueExt {
    fn type_err<K: MetaKey, C: Display>(&self, k: K, context: C) -> Error;
}

impl ValueExt for Value {
    fn type_err<K: MetaKey, C: Display>(&self, _: K, context: C) -> Error {
        error! {
            "invalid meta info value type",
            "key" => K::KEY,
            "expected type" => std::any::type_name::<K::Value>(),
            "found value type" => self.kind(),
            "context" => context,
        }
    }
}

/// `text` escaped for HTML text and quoted attribute values.
pub fn escaped(text: &str) -> String {
    let mut html = String::with_capacity(text.len());
    // Writing to a `String` can't fail.
    let _ = escape_html(&mut html, text);
    html
}

/// Where `node` is written to under `output`.
pub fn output_path(output: &Path, node: &Node) -> PathBuf {
    let path = node.absolute_path().split('#').next().unwrap_or_default();
    output.join(path.trim_start_matches('/'))
}

pub fn modified(path: &Path) -> Option<SystemTime> {
    path.metadata().and_then(|m| m.modified()).ok()
}

/// Considers a node changed if its source file was modified after `since`.
#[derive(Debug)]
pub struct ModifiedSince {
    pub since: SystemTime,
}

impl Observer for ModifiedSince {
    fn node_changed(&self, _: &Tree, node: &Node) -> Option<bool> {
        let source = node.meta().get(SourcePath)?.ok()?;
        match modified(Path::new(&*source)) {
            Some(time) => Some(time >= self.since),
            None => Some(true),
        }
    }
}

/// Removes what a previous run wrote for nodes that are deleted.
#[derive(Debug)]
pub struct StaleOutput {
    pub output: PathBuf,
}

impl Observer for StaleOutput {
    fn before_node_deleted(&self, _: &Tree, node: &Node) {
        if !node.is_file() {
            return;
        }

        let path = output_path(&self.output, node);
        if path.is_file() {
            match std::fs::remove_file(&path) {
                Ok(()) => tracing::info!(path = %path.display(), "removed stale output"),
                Err(e) => tracing::warn!(path = %path.display(), "failed to remove stale output: {e}"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes() {
        assert_eq!(escaped("a <b> & \"c\" 'd'"), "a &lt;b&gt; &amp; &quot;c&quot; &#39;d&#39;");
        assert_eq!(escaped("plain"), "plain");
        assert_eq!(escaped("Æ <ü>"), "Æ &lt;ü&gt;");
    }
}
