//! Polymorphic values and the type registry.
//!
//! A value stored behind a trait object cannot be rebuilt from its fields
//! alone: the reader must know which concrete type to create. Such values are
//! written type-identified, tagged with the string their type declares through
//! [`Identified`], and read back through a [`TypeRegistry`] that maps that
//! string to a decoding function for the requested handle type.
//!
//! ```rust
//! use std::{cell::RefCell, rc::Rc};
//! use refcode::{Poly, Refcode, RefcodeObject, TypeRegistry};
//!
//! trait Shape: refcode::Archive {
//!     fn area(&self) -> f64;
//! }
//!
//! #[derive(Default, RefcodeObject)]
//! #[refcode(type_id = "Square")]
//! struct Square {
//!     side: f64,
//! }
//!
//! impl Shape for Square {
//!     fn area(&self) -> f64 {
//!         self.side * self.side
//!     }
//! }
//!
//! let square: Rc<RefCell<dyn Shape>> = Rc::new(RefCell::new(Square { side: 2.0 }));
//! let shapes = vec![Poly::new(square)];
//! let bytes = Refcode::to_vec(&shapes)?;
//!
//! let mut registry = TypeRegistry::new();
//! registry.register_poly::<dyn Shape, Square>(|s| s as Rc<RefCell<dyn Shape>>);
//! let back: Vec<Poly<dyn Shape>> = Refcode::builder().registry(registry).from_slice(&bytes)?;
//! assert_eq!(back[0].borrow().area(), 4.0);
//! # Ok::<(), refcode::RefcodeError>(())
//! ```

use std::any::{type_name, Any, TypeId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::ops::Deref;
use std::rc::Rc;

use tracing::trace;

use crate::archive::{Archive, Identity};
use crate::error::{contract_violation, RefcodeError, Result};
use crate::graph::{Archiver, Indexer, SlotId};
use crate::primitive::Primitive;
use crate::reader::{Deserializer, Populate, Unarchive, Value};

/// A type that declares a stable identifier for polymorphic storage.
pub trait Identified {
    /// The identifier written in front of type-identified values.
    const TYPE_ID: &'static str;
}

impl<T: Identified + ?Sized> Identified for Rc<RefCell<T>> {
    const TYPE_ID: &'static str = T::TYPE_ID;
}

/// Decodes the inner value of a type-identified primitive as handle `H`.
pub type DecodeFn<H> = dyn for<'a> Fn(&mut Deserializer<'a>, &'a Primitive) -> Result<H>;

/// Maps (type identifier, handle type) to a decoding function.
///
/// One identifier can be registered for several handle types, for example
/// both `Poly<dyn Shape>` and `Poly<dyn Drawable>`.
#[derive(Default)]
pub struct TypeRegistry {
    // handle type -> identifier -> Box<Box<DecodeFn<H>>>
    entries: HashMap<TypeId, HashMap<String, Box<dyn Any>>>,
}

impl TypeRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `T` under its identifier for reads of handle type `H`.
    ///
    /// # Panics
    ///
    /// Panics if the identifier is already registered for `H`.
    pub fn register<H, T>(&mut self, upcast: impl Fn(T) -> H + 'static) -> &mut Self
    where
        H: 'static,
        T: Unarchive + Identified,
    {
        let decode = boxed_decoder(move |de, inner| {
            let concrete: T = de.resolve(None, inner)?;
            Ok(upcast(concrete))
        });
        let by_name = self.entries.entry(TypeId::of::<H>()).or_default();
        if by_name.contains_key(T::TYPE_ID) {
            contract_violation(&format!(
                "type identifier '{}' registered twice for {}",
                T::TYPE_ID,
                type_name::<H>()
            ));
        }
        trace!(type_id = T::TYPE_ID, handle = type_name::<H>(), "type registered");
        by_name.insert(T::TYPE_ID.to_owned(), Box::new(decode));
        self
    }

    /// Registers reference-like `T` for reads of `Poly<D>`.
    pub fn register_poly<D, T>(&mut self, upcast: fn(Rc<RefCell<T>>) -> Rc<RefCell<D>>) -> &mut Self
    where
        D: ?Sized + 'static,
        T: Populate + Identified,
    {
        self.register::<Poly<D>, Rc<RefCell<T>>>(move |concrete| Poly(upcast(concrete)))
    }

    /// Whether `type_id` is registered for handle type `H`.
    pub fn contains<H: 'static>(&self, type_id: &str) -> bool {
        self.decoder::<H>(type_id).is_some()
    }

    pub(crate) fn decoder<H: 'static>(&self, type_id: &str) -> Option<&DecodeFn<H>> {
        self.entries
            .get(&TypeId::of::<H>())?
            .get(type_id)?
            .downcast_ref::<Box<DecodeFn<H>>>()
            .map(|decode| &**decode)
    }
}

// Passing the closure through an explicit higher-ranked bound makes it
// generic over the table lifetime.
fn boxed_decoder<H, F>(f: F) -> Box<DecodeFn<H>>
where
    F: for<'a> Fn(&mut Deserializer<'a>, &'a Primitive) -> Result<H> + 'static,
{
    Box::new(f)
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self
            .entries
            .values()
            .flat_map(|by_name| by_name.keys().map(String::as_str))
            .collect();
        names.sort_unstable();
        f.debug_struct("TypeRegistry").field("type_ids", &names).finish()
    }
}

/// A shared handle to a polymorphic object, typically `Poly<dyn Trait>`.
///
/// Written type-identified; read back only through the [`TypeRegistry`].
pub struct Poly<T: ?Sized>(pub Rc<RefCell<T>>);

impl<T: ?Sized> Poly<T> {
    /// Wraps a shared object.
    pub fn new(inner: Rc<RefCell<T>>) -> Self {
        Self(inner)
    }

    /// Unwraps the shared handle.
    pub fn into_inner(self) -> Rc<RefCell<T>> {
        self.0
    }

    /// Whether two handles point at the same object.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl<T: ?Sized> Clone for Poly<T> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<T: ?Sized> Deref for Poly<T> {
    type Target = RefCell<T>;

    fn deref(&self) -> &RefCell<T> {
        &self.0
    }
}

impl<T: ?Sized> From<Rc<RefCell<T>>> for Poly<T> {
    fn from(inner: Rc<RefCell<T>>) -> Self {
        Self(inner)
    }
}

impl<T: ?Sized> fmt::Debug for Poly<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Poly<{}>({:p})", type_name::<T>(), Rc::as_ptr(&self.0).cast::<()>())
    }
}

impl<T: Archive + ?Sized> Archive for Poly<T> {
    fn archive(&self, out: &mut Archiver<'_>) {
        out.identified(&self.0);
    }

    // No identity of its own: the wrapped object is shared through its own
    // slot, and the wrapper slot through the identified index.
    fn identity(&self) -> Identity<'_> {
        Identity::None
    }

    fn type_identifier(&self) -> Option<&'static str> {
        self.0.type_identifier()
    }

    fn index(&self, indexer: &mut Indexer) -> SlotId {
        indexer.index_identified(&self.0)
    }
}

/// Reached only when the registry had no entry for the slot.
impl<T: ?Sized + 'static> Unarchive for Poly<T> {
    fn unarchive(value: &mut Value<'_, '_>) -> Result<Self> {
        match value.unregistered_type_id() {
            Some(name) => Err(RefcodeError::UnknownTypeId(name.to_owned())),
            None => Err(RefcodeError::UnidentifiableType(type_name::<Self>())),
        }
    }
}
