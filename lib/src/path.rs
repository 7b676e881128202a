use std::fmt;
use std::sync::Arc;

use crate::value::{Dict, Metadata, Lang};

/// One addressable source or virtual path: the path as authored, its
/// language and free-form meta info.
///
/// The path is classified by pure predicates with fixed precedence: a
/// trailing `/` makes a directory, otherwise a leading `#` makes a fragment,
/// otherwise it is a file.
#[derive(Debug, Clone)]
pub struct SitePath {
    path: Arc<str>,
    lang: Option<Arc<str>>,
    meta: Dict,
}

/// The parts of a source file name: `basename[.lang][.ext]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedName {
    pub basename: Arc<str>,
    pub lang: Option<Arc<str>>,
    pub ext: Option<Arc<str>>,
}

impl SitePath {
    pub fn new<P: Into<Arc<str>>>(path: P) -> Self {
        SitePath { path: path.into(), lang: None, meta: Dict::new() }
    }

    pub fn with_lang<L: Into<Arc<str>>>(mut self, lang: L) -> Self {
        self.lang = Some(lang.into());
        self
    }

    pub fn with_meta(mut self, meta: Dict) -> Self {
        self.meta = meta;
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn lang(&self) -> Option<&str> {
        self.lang.as_deref()
    }

    pub fn meta(&self) -> &Dict {
        &self.meta
    }

    pub fn is_directory(&self) -> bool {
        is_directory(&self.path)
    }

    pub fn is_fragment(&self) -> bool {
        is_fragment(&self.path)
    }

    pub fn is_file(&self) -> bool {
        is_file(&self.path)
    }

    pub fn is_absolute_url(&self) -> bool {
        crate::util::is_absolute_url(&self.path)
    }

    /// The meta info a node built from this path starts with. The language,
    /// if any, is stored under [`Lang`] so construction picks it up.
    pub fn to_meta(&self) -> Metadata {
        let meta = Metadata::from(self.meta.clone());
        if let Some(lang) = &self.lang {
            meta.insert(Lang, lang.clone());
        }

        meta
    }

    /// Splits the last segment of `path` into basename, language and
    /// extension. A middle segment is a language only when it is two or
    /// three lowercase ASCII letters.
    ///
    /// ```rust
    /// use kestrel::path::SitePath;
    ///
    /// let name = SitePath::parse("dir/index.en.page");
    /// assert_eq!(&*name.basename, "index");
    /// assert_eq!(name.lang.as_deref(), Some("en"));
    /// assert_eq!(name.ext.as_deref(), Some("page"));
    ///
    /// let name = SitePath::parse("notes.2024.txt");
    /// assert_eq!(&*name.basename, "notes.2024");
    /// assert_eq!(name.lang, None);
    ///
    /// let name = SitePath::parse(".htaccess");
    /// assert_eq!(&*name.basename, ".htaccess");
    /// assert_eq!(name.ext, None);
    /// ```
    pub fn parse(path: &str) -> ParsedName {
        let name = path.trim_end_matches('/');
        let name = name.rsplit('/').next().unwrap_or(name);
        let (hidden, rest) = match name.strip_prefix('.') {
            Some(rest) => (true, rest),
            None => (false, name),
        };

        let mut segments: Vec<&str> = rest.split('.').collect();
        let ext = match segments.len() {
            1 => None,
            _ => segments.pop(),
        };

        let lang = match segments.len() {
            1 => None,
            _ if segments.last().map_or(false, |s| is_lang(s)) => segments.pop(),
            _ => None,
        };

        let basename = segments.join(".");
        let basename = if hidden { format!(".{basename}") } else { basename };
        ParsedName {
            basename: basename.into(),
            lang: lang.map(Arc::from),
            ext: ext.map(Arc::from),
        }
    }
}

impl ParsedName {
    /// The canonical name with the extension replaced by `ext`, or kept.
    pub fn canonical_name(&self, ext: Option<&str>) -> String {
        match ext.or(self.ext.as_deref()) {
            Some(ext) if !ext.is_empty() => format!("{}.{}", self.basename, ext),
            _ => self.basename.to_string(),
        }
    }
}

impl From<&str> for SitePath {
    fn from(path: &str) -> Self {
        SitePath::new(path)
    }
}

impl fmt::Display for SitePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.path.fmt(f)
    }
}

pub fn is_directory(path: &str) -> bool {
    path.ends_with('/')
}

pub fn is_fragment(path: &str) -> bool {
    !is_directory(path) && path.starts_with('#')
}

pub fn is_file(path: &str) -> bool {
    !is_directory(path) && !is_fragment(path)
}

fn is_lang(segment: &str) -> bool {
    (2..=3).contains(&segment.len()) && segment.bytes().all(|b| b.is_ascii_lowercase())
}

/// The localized canonical name: `lang` appended to `cn` as a last
/// segment. The canonical name is never re-parsed.
///
/// ```rust
/// use kestrel::path::lcn;
///
/// assert_eq!(lcn("file.html", None), "file.html");
/// assert_eq!(lcn("file.html", Some("en")), "file.html.en");
/// assert_eq!(lcn("file", Some("de")), "file.de");
/// assert_eq!(lcn(".htaccess", Some("en")), ".htaccess.en");
/// ```
pub fn lcn(cn: &str, lang: Option<&str>) -> String {
    match lang {
        Some(lang) => format!("{cn}.{lang}"),
        None => cn.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn classification_precedence() {
        assert!(SitePath::new("/dir/").is_directory());
        assert!(SitePath::new("#frag/").is_directory());
        assert!(!SitePath::new("#frag/").is_fragment());
        assert!(SitePath::new("#frag").is_fragment());
        assert!(SitePath::new("file.html#frag").is_file());
        assert!(SitePath::new("file.html").is_file());
        assert!(SitePath::new("http://example.com/").is_absolute_url());
    }

    #[test]
    fn parse_names() {
        let name = SitePath::parse("index.page");
        assert_eq!(name.canonical_name(Some("html")), "index.html");
        assert_eq!(name.lang, None);

        let name = SitePath::parse("about.de.md");
        assert_eq!(name.canonical_name(Some("html")), "about.html");
        assert_eq!(name.lang.as_deref(), Some("de"));

        let name = SitePath::parse("style.scss");
        assert_eq!(name.canonical_name(None), "style.scss");

        let name = SitePath::parse("images/");
        assert_eq!(&*name.basename, "images");
        assert_eq!(name.canonical_name(None), "images");

        let name = SitePath::parse("photo.JPG");
        assert_eq!(name.ext.as_deref(), Some("JPG"));
        assert_eq!(&*name.basename, "photo");
    }

    #[test]
    fn lang_becomes_meta() {
        let path = SitePath::new("about.html")
            .with_lang("en")
            .with_meta(crate::dict! { "title" => "About" });

        let meta = path.to_meta();
        assert_eq!(meta.get_raw("lang"), Some(Value::from("en")));
        assert_eq!(meta.get_raw("title"), Some(Value::from("About")));
        assert_eq!(path.lang(), Some("en"));
    }

    #[test]
    fn lcn_is_a_plain_join() {
        assert_eq!(lcn("file.tar.gz", Some("en")), "file.tar.gz.en");
        assert_eq!(lcn("about.de.html", Some("de")), "about.de.html.de");
        assert_eq!(lcn("dir", Some("fr")), "dir.fr");
    }
}
