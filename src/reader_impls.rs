//! Implementations of `Unarchive` for standard Rust types.

use std::any::type_name;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::rc::Rc;

use crate::archive::Bytes;
use crate::error::{RefcodeError, Result};
use crate::primitive::Primitive;
use crate::reader::{Fields, Populate, Unarchive, Value};

macro_rules! impl_integer_unarchive {
    ($($t:ty),*) => {
        $(
            impl Unarchive for $t {
                fn unarchive(value: &mut Value<'_, '_>) -> Result<Self> {
                    value.integer()
                }
            }
        )*
    };
}

impl_integer_unarchive!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl Unarchive for f32 {
    fn unarchive(value: &mut Value<'_, '_>) -> Result<Self> {
        value.float()
    }
}

impl Unarchive for f64 {
    fn unarchive(value: &mut Value<'_, '_>) -> Result<Self> {
        value.float()
    }
}

impl Unarchive for bool {
    fn unarchive(value: &mut Value<'_, '_>) -> Result<Self> {
        value.boolean()
    }
}

impl Unarchive for () {
    fn unarchive(value: &mut Value<'_, '_>) -> Result<Self> {
        value.nil()
    }
}

impl Unarchive for String {
    fn unarchive(value: &mut Value<'_, '_>) -> Result<Self> {
        value.string()
    }
}

impl Unarchive for Bytes {
    fn unarchive(value: &mut Value<'_, '_>) -> Result<Self> {
        value.data().map(Bytes::from)
    }
}

impl Unarchive for Primitive {
    fn unarchive(value: &mut Value<'_, '_>) -> Result<Self> {
        Ok(value.raw().clone())
    }
}

impl<T: Unarchive> Unarchive for Vec<T> {
    fn unarchive(value: &mut Value<'_, '_>) -> Result<Self> {
        value.array()
    }
}

/// Nil reads as `None`; anything else is read as `T` from the same slot.
impl<T: Unarchive> Unarchive for Option<T> {
    fn unarchive(value: &mut Value<'_, '_>) -> Result<Self> {
        if value.is_nil() {
            value.nil()?;
            Ok(None)
        } else {
            value.decode().map(Some)
        }
    }
}

impl<T: Unarchive> Unarchive for Box<T> {
    fn unarchive(value: &mut Value<'_, '_>) -> Result<Self> {
        value.decode().map(Box::new)
    }
}

impl<K: Unarchive + Eq + Hash, V: Unarchive> Unarchive for HashMap<K, V> {
    fn unarchive(value: &mut Value<'_, '_>) -> Result<Self> {
        Ok(value.entries()?.into_iter().collect())
    }
}

impl<K: Unarchive + Ord, V: Unarchive> Unarchive for BTreeMap<K, V> {
    fn unarchive(value: &mut Value<'_, '_>) -> Result<Self> {
        Ok(value.entries()?.into_iter().collect())
    }
}

/// Shell first, then fields: the shell is memoized before any field is read.
impl<T: Populate> Unarchive for Rc<RefCell<T>> {
    fn unarchive(value: &mut Value<'_, '_>) -> Result<Self> {
        let shell = Rc::new(RefCell::new(T::default()));
        value.register(Rc::clone(&shell));

        let mut fields = Fields::new(value, type_name::<T>());
        {
            let mut inner = shell.try_borrow_mut().map_err(|_| {
                RefcodeError::Internal(format!("{} shell is already borrowed", type_name::<T>()))
            })?;
            inner.populate(&mut fields);
        }
        fields.finish()?;
        Ok(shell)
    }
}
