#[cfg(feature = "sass")]
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::{ErrorDetail, Result};
use crate::value::{Value, Source, Sink};

pub trait Mapper {
    type Output: Into<Value> + 'static;

    fn map<I: Source>(&self, input: I) -> Result<Self::Output>;

    fn map_copy<I: Source, O: Sink>(&self, input: I, output: O) -> Result<()> {
        output.write(self.map(input)?)
    }
}

/// A serde data format.
pub trait Format: Sized {
    /// The data format's error type.
    type Error: serde::de::Error + ErrorDetail + 'static;

    /// Parses `string` in this format as a `T`.
    fn from_str<T: serde::de::DeserializeOwned>(string: &str) -> Result<T, Self::Error>;

    fn read<I: Source, T: serde::de::DeserializeOwned>(input: I) -> Result<T> {
        let input = input.try_read::<Arc<str>>()?;
        Ok(Self::from_str(&input)?)
    }
}

impl<F: Format> Mapper for F {
    type Output = Value;

    fn map<I: Source>(&self, input: I) -> Result<Self::Output> {
        Self::read(input)
    }
}

macro_rules! impl_format {
    ($name:ident : $func:expr, $E:ty) => (
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $name;

        impl Format for $name {
            type Error = $E;

            fn from_str<T: serde::de::DeserializeOwned>(s: &str) -> Result<T, $E> {
                $func(s)
            }
        }
    );
}

impl_format!(Toml: toml::from_str, toml::de::Error);
impl_format!(Json: serde_json::from_str, serde_json::error::Error);

/// Compiles SCSS to CSS.
///
/// Compiler options are built from these settings for each stylesheet.
#[cfg(feature = "sass")]
#[derive(Debug, Clone)]
pub struct Grass {
    pub load_paths: Vec<PathBuf>,
    pub style: grass::OutputStyle,
}

#[cfg(feature = "sass")]
impl Default for Grass {
    fn default() -> Self {
        Grass { load_paths: vec![], style: grass::OutputStyle::Expanded }
    }
}

#[cfg(feature = "sass")]
impl Grass {
    pub fn new(style: grass::OutputStyle) -> Self {
        Grass { style, ..Grass::default() }
    }

    /// Adds a directory `@import`s are looked up in after the importing
    /// file's own.
    pub fn load_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.load_paths.push(path.into());
        self
    }

    fn options(&self) -> grass::Options<'_> {
        grass::Options::default()
            .style(self.style)
            .load_paths(&self.load_paths)
    }
}

#[cfg(feature = "sass")]
impl Mapper for Grass {
    type Output = String;

    fn map<I: Source>(&self, input: I) -> Result<Self::Output> {
        let options = self.options();
        let result = match input.path() {
            Some(path) => grass::from_path(path, &options),
            None => input.try_read::<Arc<str>>()
                .map(|string| grass::from_string(&*string, &options))?,
        };

        result.map_err(|e| error!("failed to render sass as css", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Dict;

    #[test]
    fn formats_map_to_values() {
        let value = Toml.map("a = 1\n[b]\nc = 'd'").unwrap();
        assert_eq!(value.get_path("b.c"), Some(&Value::from("d")));

        let value = Json.map(r#"{"a": [1, true, null]}"#).unwrap();
        assert_eq!(value.get_path("a").and_then(|v| v.as_slice()).map(|v| v.len()), Some(3));

        let dict: Dict = Toml::read("x = 'y'").unwrap();
        assert_eq!(dict["x"], Value::from("y"));
        assert!(Toml.map("not = = toml").is_err());
    }

    #[cfg(feature = "sass")]
    #[test]
    fn grass_compiles_strings() {
        let css = Grass::default().map("$c: red;\na { b { color: $c; } }").unwrap();
        assert!(css.contains("a b"));
        assert!(css.contains("color: red"));

        let css = Grass::new(grass::OutputStyle::Compressed).map("a { b { color: red; } }").unwrap();
        assert_eq!(css.trim_end(), "a b{color:red}");
    }
}
