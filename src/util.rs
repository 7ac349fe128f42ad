use std::borrow::Cow;
use std::fmt::{self, Debug, Display};

use byte_string::ByteStr;
use serde::{Serialize, Serializer};

#[macro_export]
macro_rules! try_match {
    ($e:expr, $(|)? $pattern:pat $( if $guard:expr )? $(,)? => $v:expr) => {
        match $e {
            $pattern $( if $guard )? => Some($v),
            _ => None,
        }
    }
}

/// Displays a byte string as (lossily decoded) UTF-8 text.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SliceFormatter<'a>(&'a [u8]);

pub fn slice_formatter(slice: &[u8]) -> SliceFormatter<'_> {
    SliceFormatter(slice)
}

impl Display for SliceFormatter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(self.0))
    }
}

impl Debug for SliceFormatter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", ByteStr::new(self.0))
    }
}

impl Serialize for SliceFormatter<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// For use with `#[serde(serialize_with = "...")]` on byte-string fields.
pub fn serialize_bytes_as_string<S, B>(bytes: &B, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    B: AsRef<[u8]> + ?Sized,
{
    slice_formatter(bytes.as_ref()).serialize(serializer)
}

/// Produces an owned copy of a value, detaching it from the source buffer.
pub trait CloneStatic<T: 'static> {
    fn clone_static(&self) -> T;
}

impl<T: ToOwned + ?Sized + 'static> CloneStatic<Cow<'static, T>> for Cow<'_, T> {
    fn clone_static(&self) -> Cow<'static, T> {
        Cow::Owned(self.as_ref().to_owned())
    }
}

impl<T: CloneStatic<U>, U: 'static> CloneStatic<Box<U>> for Box<T> {
    fn clone_static(&self) -> Box<U> {
        Box::new(self.as_ref().clone_static())
    }
}

impl<T: CloneStatic<U>, U: 'static> CloneStatic<Vec<U>> for Vec<T> {
    fn clone_static(&self) -> Vec<U> {
        self.iter().map(CloneStatic::clone_static).collect()
    }
}
