//! Implementations of `Archive` for standard Rust types.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use crate::archive::{Archive, Bytes, Identity};
use crate::error::RefcodeError;
use crate::graph::{Archiver, Indexer, SlotId};
use crate::primitive::Primitive;

macro_rules! impl_integer_archive {
    ($($t:ty),*) => {
        $(
            impl Archive for $t {
                fn archive(&self, out: &mut Archiver<'_>) {
                    out.integer(*self);
                }
            }
        )*
    };
}

impl_integer_archive!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl Archive for f32 {
    fn archive(&self, out: &mut Archiver<'_>) {
        out.float(*self);
    }
}

impl Archive for f64 {
    fn archive(&self, out: &mut Archiver<'_>) {
        out.float(*self);
    }
}

impl Archive for bool {
    fn archive(&self, out: &mut Archiver<'_>) {
        out.boolean(*self);
    }
}

impl Archive for () {
    fn archive(&self, out: &mut Archiver<'_>) {
        out.nil();
    }
}

impl Archive for str {
    fn archive(&self, out: &mut Archiver<'_>) {
        out.string(self);
    }

    fn identity(&self) -> Identity<'_> {
        Identity::Text(self)
    }
}

impl Archive for String {
    fn archive(&self, out: &mut Archiver<'_>) {
        out.string(self);
    }

    fn identity(&self) -> Identity<'_> {
        Identity::Text(self)
    }
}

impl Archive for Bytes {
    fn archive(&self, out: &mut Archiver<'_>) {
        out.data(&self.0);
    }
}

impl Archive for Primitive {
    fn archive(&self, out: &mut Archiver<'_>) {
        out.primitive(self.clone());
    }
}

impl<T: Archive> Archive for [T] {
    fn archive(&self, out: &mut Archiver<'_>) {
        out.array(self.iter());
    }
}

impl<T: Archive> Archive for Vec<T> {
    fn archive(&self, out: &mut Archiver<'_>) {
        out.array(self.iter());
    }
}

/// `Some(v)` is written exactly as `v`; `None` as nil.
impl<T: Archive> Archive for Option<T> {
    fn archive(&self, out: &mut Archiver<'_>) {
        match self {
            Some(v) => v.archive(out),
            None => out.nil(),
        }
    }

    fn identity(&self) -> Identity<'_> {
        self.as_ref().map_or(Identity::None, Archive::identity)
    }

    fn type_identifier(&self) -> Option<&'static str> {
        self.as_ref().and_then(Archive::type_identifier)
    }

    fn index(&self, indexer: &mut Indexer) -> SlotId {
        match self {
            Some(v) => v.index(indexer),
            None => indexer.index(&()),
        }
    }
}

impl<K: Archive, V: Archive, S> Archive for HashMap<K, V, S> {
    fn archive(&self, out: &mut Archiver<'_>) {
        out.map(self.iter());
    }
}

impl<K: Archive, V: Archive> Archive for BTreeMap<K, V> {
    fn archive(&self, out: &mut Archiver<'_>) {
        out.map(self.iter());
    }
}

// Transparent wrappers: the inner value is indexed as if it stood alone.
macro_rules! impl_transparent_archive {
    ($($wrapper:ty),*) => {
        $(
            impl<T: Archive + ?Sized> Archive for $wrapper {
                fn archive(&self, out: &mut Archiver<'_>) {
                    (**self).archive(out);
                }

                fn identity(&self) -> Identity<'_> {
                    (**self).identity()
                }

                fn type_identifier(&self) -> Option<&'static str> {
                    (**self).type_identifier()
                }

                fn index(&self, indexer: &mut Indexer) -> SlotId {
                    (**self).index(indexer)
                }
            }
        )*
    };
}

impl_transparent_archive!(&T, Box<T>);

/// Shared, mutable objects: the only values that can form cycles.
impl<T: Archive + ?Sized> Archive for Rc<RefCell<T>> {
    fn archive(&self, out: &mut Archiver<'_>) {
        match self.try_borrow() {
            Ok(inner) => inner.archive(out),
            Err(_) => out.fail(RefcodeError::Internal(format!(
                "{} is mutably borrowed during serialization",
                std::any::type_name::<T>()
            ))),
        }
    }

    fn identity(&self) -> Identity<'_> {
        Identity::Address(Rc::as_ptr(self).cast::<()>() as usize)
    }

    fn type_identifier(&self) -> Option<&'static str> {
        self.try_borrow().ok().and_then(|inner| inner.type_identifier())
    }
}
