use std::fmt;
use std::borrow::Borrow;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::value::{Source, Sink, Dict, Value};
use crate::error::Result;

type Hasher = std::hash::BuildHasherDefault<rustc_hash::FxHasher>;

/// A well-known meta info key with a typed value.
pub trait MetaKey: 'static {
    const KEY: &'static str;

    type Value: TryFrom<Value> + Into<Value> + fmt::Debug;
}

#[macro_export]
macro_rules! define_meta_key {
    ($($(#[$attr:meta])* $v:vis $T:ident : $key:literal => $V:ty),+ $(,)?) => {
        $(
            $(#[$attr])*
            #[derive(Debug, Clone, Copy)]
            $v struct $T;

            impl $crate::value::MetaKey for $T {
                const KEY: &'static str = $key;
                type Value = $V;
            }
        )+
    }
}

define_meta_key! {
    /// The language of a node. Removed from the meta info at construction.
    pub Lang: "lang" => Arc<str>,
    /// The template a page is rendered into.
    pub Template: "template" => Arc<str>,
    pub Title: "title" => Arc<str>,
    /// The output path of a node, relative to its parent.
    pub DestPath: "dest_path" => Arc<str>,
    /// Ordering hint among siblings.
    pub SortInfo: "sort_info" => i64,
    /// Marks nodes that are used while rendering but never written.
    pub NoOutput: "no_output" => bool,
    /// Lists a node in menus and site maps.
    pub InMenu: "in_menu" => bool,
}

/// A view of a single meta info entry usable as a [`Source`] or [`Sink`].
#[derive(Clone)]
pub struct Key<'m, 'k, V> {
    map: &'m Metadata,
    key: &'k str,
    _value: PhantomData<fn() -> V>,
}

/// Free-form string keys to values. Interior mutability lets meta info be
/// updated while the owning node is shared.
#[derive(Debug, Default)]
pub struct Metadata {
    map: dashmap::DashMap<Arc<str>, Value, Hasher>,
}

impl Metadata {
    #[inline(always)]
    pub fn new() -> Self {
        Metadata::default()
    }

    #[inline(always)]
    pub fn get_raw(&self, key: &str) -> Option<Value> {
        self.map.get(key).map(|v| v.clone())
    }

    /// Looks up `path` with `.` descending into nested dictionaries.
    pub fn get_path(&self, path: &str) -> Option<Value> {
        let (head, rest) = match path.split_once('.') {
            Some((head, rest)) => (head, Some(rest)),
            None => (path, None),
        };

        let value = self.map.get(head)?;
        match rest {
            Some(rest) => value.get_path(rest).cloned(),
            None => Some(value.clone()),
        }
    }

    #[inline(always)]
    pub fn contains_key(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    #[inline(always)]
    pub fn keys(&self) -> impl Iterator<Item = Arc<str>> + '_ {
        self.map.iter().map(|r| r.key().clone())
    }

    pub fn insert_raw<K, V>(&self, key: K, value: V) -> Option<Value>
        where K: Into<Arc<str>> + Borrow<str>, V: Into<Value>
    {
        let mut value = value.into();
        if let Some(mut existing) = self.map.get_mut(key.borrow()) {
            std::mem::swap(&mut *existing, &mut value);
            Some(value)
        } else {
            self.map.insert(key.into(), value)
        }
    }

    #[inline]
    pub fn get<K: MetaKey>(&self, _: K) -> Option<Result<K::Value, Value>> {
        let value = self.get_raw(K::KEY)?;
        Some(value.clone().try_into().map_err(|_| value))
    }

    #[inline(always)]
    pub fn contains<K: MetaKey>(&self, _: K) -> bool {
        self.contains_key(K::KEY)
    }

    #[inline(always)]
    pub fn key<'k>(&self, key: &'k str) -> Key<'_, 'k, Value> {
        Key { map: self, key, _value: PhantomData }
    }

    #[inline(always)]
    pub fn metakey<K: MetaKey>(&self, _: K) -> Key<'_, 'static, K::Value> {
        Key { map: self, key: K::KEY, _value: PhantomData }
    }

    /// Insert if no value for key exists.
    pub fn get_or_insert_raw_with<K, V, F>(&self, key: K, f: F) -> Value
        where K: Into<Arc<str>> + Borrow<str>, V: Into<Value>, F: FnOnce() -> V,
    {
        self.map.entry(key.into())
            .or_insert_with(|| f().into())
            .value()
            .clone()
    }

    pub fn insert<K, V>(&self, _: K, value: V) -> Option<Value>
        where K: MetaKey, V: Into<K::Value>
    {
        self.insert_raw(K::KEY, value.into().into())
    }

    pub fn remove<K: MetaKey>(&self, _: K) -> Option<Value> {
        self.map.remove(K::KEY).map(|(_, v)| v)
    }

    pub fn remove_raw<K: Borrow<str>>(&self, key: K) -> Option<Value> {
        self.map.remove(key.borrow()).map(|(_, v)| v)
    }

    #[inline(always)]
    pub fn append_all(&self, dict: &Dict) {
        for (k, v) in dict {
            self.insert_raw(k.clone(), v.clone());
        }
    }

    /// A sorted snapshot of every entry.
    pub fn to_dict(&self) -> Dict {
        self.map.iter()
            .map(|r| (r.key().clone(), r.value().clone()))
            .collect()
    }
}

impl Clone for Metadata {
    /// Copies the entries: the clone doesn't observe later writes to `self`.
    fn clone(&self) -> Self {
        Metadata { map: self.map.clone() }
    }
}

impl From<Dict> for Metadata {
    fn from(dict: Dict) -> Self {
        let meta = Metadata::new();
        meta.append_all(&dict);
        meta
    }
}

impl serde::Serialize for Metadata {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_dict().serialize(serializer)
    }
}

impl<V> fmt::Debug for Key<'_, '_, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Key")
            .field("map", &self.map)
            .field("key", &self.key)
            .finish()
    }
}

impl fmt::Display for Metadata {
    #[inline(always)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#?}", self.to_dict())
    }
}

impl<V: TryFrom<Value> + Into<Value> + 'static> Source for Key<'_, '_, V> {
    type Value = V;

    fn read(self) -> Result<Self::Value> {
        let value = self.map.get_raw(self.key)
            .ok_or_else(|| error! {
                "attempted to read nonexistent meta info key",
                "key" => self.key,
            })?;

        let kind = value.kind();
        V::try_from(value)
            .map_err(|_| error! {
                "unexpected meta info value type",
                "key" => self.key,
                "expected" => std::any::type_name::<V>(),
                "actual type" => kind,
            })
    }
}

impl<V: TryFrom<Value> + Into<Value> + 'static> Sink for Key<'_, '_, V> {
    fn write_value(&self, value: Value) -> Result<()> {
        let kind = value.kind();
        if V::try_from(value.clone()).is_err() {
            return err! {
                "unexpected value type for meta info",
                "key" => self.key,
                "expected" => std::any::type_name::<V>(),
                "actual type" => kind,
            };
        }

        self.map.insert_raw(self.key, value);
        Ok(())
    }
}

impl Sink for Metadata {
    fn write_value(&self, value: Value) -> Result<()> {
        if let Value::Dict(dict) = value {
            self.append_all(&dict);
            return Ok(());
        }

        err!(format!("expected value to be a dictionary, found {}", value.kind()))
    }
}
