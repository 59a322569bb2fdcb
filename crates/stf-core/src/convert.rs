//! Encode/decode dispatch over the closed set of convertible kinds.
//!
//! Every value that can be written by the codec is a boolean, an integer, a
//! text string, or a [`SerializableObject`]. [`convert`] and [`deconvert`]
//! are the only places that branch on that set; element types plug in through
//! the [`Element`] trait.

use std::fmt;

use crate::buffer::ByteBuffer;
use crate::config::ConvertOptions;
use crate::error::{StfError, StfResult};
use crate::object::SerializableObject;

/// Tag naming one of the convertible kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Kind {
    Bool,
    Int,
    Text,
    Object,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Bool => "boolean",
            Self::Int => "integer",
            Self::Text => "text",
            Self::Object => "object",
        };
        f.write_str(name)
    }
}

/// Borrowed view of a value about to be encoded.
#[derive(Debug)]
pub enum Convertible<'a, O> {
    Bool(bool),
    Int(i128),
    Text(&'a str),
    Object(&'a O),
}

impl<O> Convertible<'_, O> {
    pub fn kind(&self) -> Kind {
        match self {
            Self::Bool(_) => Kind::Bool,
            Self::Int(_) => Kind::Int,
            Self::Text(_) => Kind::Text,
            Self::Object(_) => Kind::Object,
        }
    }
}

/// A value produced by [`deconvert`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Decoded<O> {
    Bool(bool),
    Int(i128),
    Text(String),
    Object(O),
}

impl<O> Decoded<O> {
    pub fn kind(&self) -> Kind {
        match self {
            Self::Bool(_) => Kind::Bool,
            Self::Int(_) => Kind::Int,
            Self::Text(_) => Kind::Text,
            Self::Object(_) => Kind::Object,
        }
    }
}

/// Encode one value.
///
/// Objects serialize themselves (header included when they require one);
/// scalars use the buffer writer selected by `options`.
pub fn convert<O: SerializableObject>(
    item: Convertible<'_, O>,
    options: &ConvertOptions,
) -> StfResult<ByteBuffer> {
    let mut out = ByteBuffer::new();
    match item {
        Convertible::Object(object) => return object.serialize(),
        Convertible::Int(value) => out.write_int(value, options.int)?,
        Convertible::Text(text) => out.write_text(text, options.text)?,
        Convertible::Bool(value) => out.write_bool(value)?,
    }
    Ok(out)
}

/// Decode one value of the requested kind from the cursor.
///
/// The caller chooses `kind`; nothing in the bytes identifies it.
pub fn deconvert<O: SerializableObject>(
    buffer: &mut ByteBuffer,
    kind: Kind,
    options: &ConvertOptions,
) -> StfResult<Decoded<O>> {
    Ok(match kind {
        Kind::Object => Decoded::Object(O::deserialize(buffer)?),
        Kind::Int => Decoded::Int(buffer.read_int(options.int)?),
        Kind::Text => Decoded::Text(buffer.read_text(options.text)?),
        Kind::Bool => Decoded::Bool(buffer.read_bool()?),
    })
}

/// Placeholder object type for scalar conversions.
///
/// It has no values, so it can never be encoded, and decoding it always
/// fails with [`StfError::InvalidType`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoObject {}

impl SerializableObject for NoObject {
    fn data(&self) -> StfResult<ByteBuffer> {
        match *self {}
    }

    fn deserialize(_buffer: &mut ByteBuffer) -> StfResult<Self> {
        Err(StfError::InvalidType(
            "no object type to decode into".into(),
        ))
    }
}

/// A type that maps onto exactly one convertible kind.
///
/// Implemented for `bool`, the fixed-size integers up to 64 bits, `String`
/// and every [`SerializableObject`]. Homogeneous arrays are generic over it.
pub trait Element: Sized {
    /// Object type decoded for [`Kind::Object`]; [`NoObject`] for scalars.
    type Object: SerializableObject;

    const KIND: Kind;

    /// Integer elements of a signed type are always encoded two's complement,
    /// whatever the caller's options say.
    const SIGNED: bool = false;

    fn to_convertible(&self) -> Convertible<'_, Self::Object>;

    /// Rebuild a value, rejecting a decoded value of another kind.
    fn from_decoded(value: Decoded<Self::Object>) -> StfResult<Self>;
}

fn mismatch(expected: Kind, found: Kind) -> StfError {
    StfError::InvalidType(format!("expected {expected}, found {found}"))
}

impl Element for bool {
    type Object = NoObject;
    const KIND: Kind = Kind::Bool;

    fn to_convertible(&self) -> Convertible<'_, NoObject> {
        Convertible::Bool(*self)
    }

    fn from_decoded(value: Decoded<NoObject>) -> StfResult<Self> {
        match value {
            Decoded::Bool(value) => Ok(value),
            other => Err(mismatch(Kind::Bool, other.kind())),
        }
    }
}

macro_rules! int_element {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Element for $ty {
                type Object = NoObject;
                const KIND: Kind = Kind::Int;
                const SIGNED: bool = <$ty>::MIN != 0;

                fn to_convertible(&self) -> Convertible<'_, NoObject> {
                    Convertible::Int(i128::from(*self))
                }

                fn from_decoded(value: Decoded<NoObject>) -> StfResult<Self> {
                    match value {
                        Decoded::Int(value) => {
                            <$ty>::try_from(value).map_err(|_| StfError::IntegerOverflow {
                                value,
                                width: std::mem::size_of::<$ty>(),
                                signed: Self::SIGNED,
                            })
                        }
                        other => Err(mismatch(Kind::Int, other.kind())),
                    }
                }
            }
        )*
    };
}

int_element!(u8, u16, u32, u64, i8, i16, i32, i64);

impl Element for String {
    type Object = NoObject;
    const KIND: Kind = Kind::Text;

    fn to_convertible(&self) -> Convertible<'_, NoObject> {
        Convertible::Text(self)
    }

    fn from_decoded(value: Decoded<NoObject>) -> StfResult<Self> {
        match value {
            Decoded::Text(text) => Ok(text),
            other => Err(mismatch(Kind::Text, other.kind())),
        }
    }
}

impl<T: SerializableObject> Element for T {
    type Object = T;
    const KIND: Kind = Kind::Object;

    fn to_convertible(&self) -> Convertible<'_, T> {
        Convertible::Object(self)
    }

    fn from_decoded(value: Decoded<T>) -> StfResult<Self> {
        match value {
            Decoded::Object(object) => Ok(object),
            other => Err(mismatch(Kind::Object, other.kind())),
        }
    }
}

impl ByteBuffer {
    /// Append the encoding of `item`.
    pub fn add_obj<E: Element>(&mut self, item: &E, options: &ConvertOptions) -> StfResult<()> {
        let encoded = convert(item.to_convertible(), &element_options::<E>(options))?;
        self.write(encoded.as_bytes());
        Ok(())
    }

    /// Decode an `E` from the cursor.
    pub fn read_obj<E: Element>(&mut self, options: &ConvertOptions) -> StfResult<E> {
        E::from_decoded(deconvert(self, E::KIND, &element_options::<E>(options))?)
    }
}

fn element_options<E: Element>(options: &ConvertOptions) -> ConvertOptions {
    let mut options = *options;
    options.int.signed |= E::SIGNED;
    options
}
