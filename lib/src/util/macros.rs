#[doc(hidden)]
#[macro_export]
macro_rules! dict {
    ($($key:expr => $value:expr),* $(,)?) => ({
        #[allow(unused_mut)]
        let mut dict: $crate::value::Dict = $crate::value::Dict::new();
        $(dict.insert($key.into(), $value.into());)*
        dict
    });
}

#[doc(hidden)]
#[macro_export]
macro_rules! meta {
    ($($key:expr => $value:expr),* $(,)?) => ({
        let meta = $crate::value::Metadata::new();
        $(meta.insert_raw($key, $value);)*
        meta
    });
}

pub use {dict, meta};
