use std::{fs, io};
use std::path::Path;
use std::fmt::Debug;

use either::Either;

use crate::error::{Result, Chainable};
use crate::value::{Value, Sink};

pub trait Source: Debug {
    type Value: Into<Value> + 'static;

    fn read(self) -> Result<Self::Value>;

    fn try_read<T: TryFrom<Value>>(self) -> Result<T> where Self: Sized {
        let value: Value = self.read()?.into();
        let kind = value.kind();
        T::try_from(value)
            .map_err(|_| error! {
                "invalid input value type",
                "expected" => std::any::type_name::<T>(),
                "actual type" => kind,
            })
    }

    fn path(&self) -> Option<&Path> {
        None
    }

    #[inline]
    fn read_to<S: Sink>(self, sink: S) -> Result<()> where Self: Sized {
        sink.write(self.read()?)
    }
}

impl Source for Value {
    type Value = Self;

    fn read(self) -> Result<Self::Value> {
        Ok(self)
    }
}

impl Source for String {
    type Value = String;

    fn read(self) -> Result<Self> {
        Ok(self)
    }
}

impl Source for &str {
    type Value = String;

    fn read(self) -> Result<String> {
        Ok(self.to_string())
    }
}

impl Source for &fs::File {
    type Value = Either<String, Vec<u8>>;

    fn read(self) -> Result<Self::Value> {
        use io::Read;

        let mut data = Vec::new();
        let mut file = io::BufReader::new(self);
        file.read_to_end(&mut data)?;

        let value = String::from_utf8(data)
            .map(Either::Left)
            .unwrap_or_else(|e| Either::Right(e.into_bytes()));

        Ok(value)
    }
}

impl Source for &Path {
    type Value = <&'static fs::File as Source>::Value;

    fn read(self) -> Result<Self::Value> {
        let file = fs::File::open(self).chain(error! {
            "failed to open file for reading",
            "file path" => self.display()
        })?;

        (&file).read()
    }

    fn path(&self) -> Option<&Path> {
        Some(self)
    }
}
