use std::fmt;
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};

use tracing::debug;

use crate::buffer::ByteBuffer;
use crate::config::{ConvertOptions, HeaderLayout};
use crate::convert::Element;
use crate::error::StfResult;
use crate::object::SerializableObject;

/// Type-level encoding parameters of a [`HomogeneousArray`].
///
/// Every item has a default, so a custom layout only overrides what differs:
///
/// ```
/// use stf_core::{ArrayLayout, ConvertOptions};
///
/// struct ByteInts;
///
/// impl ArrayLayout for ByteInts {
///     const ELEMENT: ConvertOptions = ConvertOptions::int_width(1);
/// }
/// ```
pub trait ArrayLayout {
    /// Header field widths of the array.
    ///
    /// The metadata block always carries the element count, so
    /// `has_metadata` is forced on whatever this says.
    const HEADER: HeaderLayout = HeaderLayout::STANDARD;
    /// Width of the element count stored in the header metadata.
    const COUNT_WIDTH: usize = crate::config::COUNT_WIDTH;
    /// Options used to encode and decode scalar elements.
    const ELEMENT: ConvertOptions = ConvertOptions::DEFAULT;
}

/// Default array layout: standard header, 2-byte count, 8-byte integers,
/// zero-terminated text.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StandardArray;

impl ArrayLayout for StandardArray {}

/// Ordered sequence of elements of a single convertible kind.
///
/// The element count travels in the header metadata and the elements are
/// concatenated in order as the data. Decoding trusts the count: it reads
/// exactly that many elements from the shared cursor.
///
/// The layout parameter `L` fixes widths and element encoding per array
/// type, so two arrays with different layouts are different types.
pub struct HomogeneousArray<T, L = StandardArray> {
    items: Vec<T>,
    layout: PhantomData<fn() -> L>,
}

impl<T, L> HomogeneousArray<T, L> {
    pub fn new() -> Self {
        Self::from(Vec::new())
    }

    pub fn push(&mut self, item: T) {
        self.items.push(item);
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn into_inner(self) -> Vec<T> {
        self.items
    }
}

impl<T, L> SerializableObject for HomogeneousArray<T, L>
where
    T: Element,
    L: ArrayLayout,
{
    const LAYOUT: HeaderLayout = HeaderLayout {
        has_metadata: true,
        ..L::HEADER
    };

    fn data(&self) -> StfResult<ByteBuffer> {
        let mut out = ByteBuffer::new();
        for item in &self.items {
            out.add_obj(item, &L::ELEMENT)?;
        }
        Ok(out)
    }

    fn metadata(&self) -> StfResult<ByteBuffer> {
        let mut out = ByteBuffer::new();
        out.write_uint(self.items.len() as u64, L::COUNT_WIDTH)?;
        Ok(out)
    }

    fn deserialize(buffer: &mut ByteBuffer) -> StfResult<Self> {
        let mut header = Self::read_header(buffer)?;
        let count = header.metadata.read_uint(L::COUNT_WIDTH)?;
        debug!(count, size = header.content_size, kind = %T::KIND, "decoding array");

        let capacity = usize::try_from(count)
            .unwrap_or(usize::MAX)
            .min(buffer.remaining_len());
        let mut items = Vec::with_capacity(capacity);
        for _ in 0..count {
            items.push(buffer.read_obj::<T>(&L::ELEMENT)?);
        }
        Ok(Self::from(items))
    }
}

impl<T, L> Default for HomogeneousArray<T, L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone, L> Clone for HomogeneousArray<T, L> {
    fn clone(&self) -> Self {
        Self::from(self.items.clone())
    }
}

impl<T: fmt::Debug, L> fmt::Debug for HomogeneousArray<T, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.items).finish()
    }
}

impl<T: PartialEq, L> PartialEq for HomogeneousArray<T, L> {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

impl<T: Eq, L> Eq for HomogeneousArray<T, L> {}

impl<T, L> Deref for HomogeneousArray<T, L> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.items
    }
}

impl<T, L> DerefMut for HomogeneousArray<T, L> {
    fn deref_mut(&mut self) -> &mut [T] {
        &mut self.items
    }
}

impl<T, L> From<Vec<T>> for HomogeneousArray<T, L> {
    fn from(items: Vec<T>) -> Self {
        Self {
            items,
            layout: PhantomData,
        }
    }
}

impl<T, L> FromIterator<T> for HomogeneousArray<T, L> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from(iter.into_iter().collect::<Vec<_>>())
    }
}

impl<T, L> IntoIterator for HomogeneousArray<T, L> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a, T, L> IntoIterator for &'a HomogeneousArray<T, L> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<T, L> Extend<T> for HomogeneousArray<T, L> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        self.items.extend(iter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{IntFormat, TextFormat};
    use crate::error::StfError;

    struct ByteInts;

    impl ArrayLayout for ByteInts {
        const ELEMENT: ConvertOptions = ConvertOptions::int_width(1);
    }

    /// Every size field one byte wide.
    struct Narrow;

    impl ArrayLayout for Narrow {
        const HEADER: HeaderLayout = HeaderLayout::narrow(1);
        const COUNT_WIDTH: usize = 1;
        const ELEMENT: ConvertOptions = ConvertOptions::int_width(1);
    }

    struct SignedPairs;

    impl ArrayLayout for SignedPairs {
        const ELEMENT: ConvertOptions = ConvertOptions {
            int: IntFormat::signed(2),
            text: TextFormat::ZeroTerminated,
        };
    }

    type Bytes = HomogeneousArray<u8, ByteInts>;

    #[test]
    fn count_lives_in_metadata() {
        let array: Bytes = vec![10, 20, 30].into();
        assert_eq!(array.metadata().unwrap().as_bytes(), &[0x00, 0x03]);
        assert_eq!(array.data().unwrap().as_bytes(), &[0x0A, 0x14, 0x1E]);
    }

    #[test]
    fn wire_layout() {
        let array: Bytes = vec![10, 20, 30].into();
        let bytes = array.serialize().unwrap();
        let hash = ByteBuffer::from(vec![0x0A, 0x14, 0x1E]).hash();

        let mut expected = hash.to_be_bytes().to_vec();
        expected.extend_from_slice(&[0, 0, 0, 3]);
        expected.extend_from_slice(&[0, 0, 2]);
        expected.extend_from_slice(&[0, 3]);
        expected.extend_from_slice(&[0x0A, 0x14, 0x1E]);
        assert_eq!(bytes.as_bytes(), expected.as_slice());
    }

    #[test]
    fn int_roundtrip_preserves_order() {
        let array: Bytes = vec![30, 10, 20].into();
        let mut buf = array.serialize().unwrap();
        let decoded = Bytes::deserialize(&mut buf).unwrap();
        assert_eq!(decoded.as_slice(), &[30, 10, 20]);
        assert_eq!(buf.remaining_len(), 0);
    }

    #[test]
    fn default_layout_uses_eight_byte_ints() {
        let array: HomogeneousArray<u64> = vec![1, u64::MAX].into();
        let buf = array.serialize().unwrap();
        assert_eq!(buf.len(), 8 + 4 + 3 + 2 + 16);
        let decoded = HomogeneousArray::<u64>::deserialize(&mut buf.clone()).unwrap();
        assert_eq!(decoded, array);
    }

    #[test]
    fn signed_elements() {
        let array: HomogeneousArray<i16, SignedPairs> = vec![-300, 0, 300].into();
        let mut buf = array.serialize().unwrap();
        assert_eq!(&buf.as_bytes()[17..19], &[0xFE, 0xD4]);
        let decoded = HomogeneousArray::<i16, SignedPairs>::deserialize(&mut buf).unwrap();
        assert_eq!(decoded, array);
    }

    #[test]
    fn text_and_bool_elements() {
        let words: HomogeneousArray<String> =
            ["ace", "", "king"].iter().map(|s| s.to_string()).collect();
        let mut buf = words.serialize().unwrap();
        let decoded = HomogeneousArray::<String>::deserialize(&mut buf).unwrap();
        assert_eq!(decoded, words);

        let flags: HomogeneousArray<bool> = vec![true, false, true].into();
        let mut buf = flags.serialize().unwrap();
        let decoded = HomogeneousArray::<bool>::deserialize(&mut buf).unwrap();
        assert_eq!(decoded, flags);
    }

    #[test]
    fn empty_array() {
        let array = Bytes::new();
        let mut buf = array.serialize().unwrap();
        assert_eq!(buf.len(), 8 + 4 + 3 + 2);
        let decoded = Bytes::deserialize(&mut buf).unwrap();
        assert!(decoded.is_empty());
    }

    #[test]
    fn nested_arrays_share_one_cursor() {
        let rows: HomogeneousArray<Bytes> = vec![
            Bytes::from(vec![1, 2]),
            Bytes::new(),
            Bytes::from(vec![3]),
        ]
        .into();
        let mut buf = rows.serialize().unwrap();
        buf.write(&[0xEE]);

        let decoded = HomogeneousArray::<Bytes>::deserialize(&mut buf).unwrap();
        assert_eq!(decoded, rows);
        assert_eq!(buf.remaining(), &[0xEE]);
    }

    #[test]
    fn outer_size_counts_full_inner_encoding() {
        let inner = Bytes::from(vec![7]);
        let inner_len = inner.serialize().unwrap().len() as u64;
        let rows: HomogeneousArray<Bytes> = vec![inner].into();
        let mut buf = rows.serialize().unwrap();
        let header = HomogeneousArray::<Bytes>::read_header(&mut buf).unwrap();
        assert_eq!(header.content_size, inner_len);
    }

    #[test]
    fn count_survives_layout_without_metadata() {
        struct Bare;

        impl ArrayLayout for Bare {
            const HEADER: HeaderLayout = HeaderLayout::WITHOUT_METADATA;
        }

        let array: HomogeneousArray<u64, Bare> = vec![1, 2].into();
        let mut buf = array.serialize().unwrap();
        assert_eq!(&buf.as_bytes()[12..17], &[0, 0, 2, 0, 2]);
        let decoded = HomogeneousArray::<u64, Bare>::deserialize(&mut buf).unwrap();
        assert_eq!(decoded, array);
    }

    #[test]
    fn signed_elements_with_default_layout() {
        let array: HomogeneousArray<i64> = vec![-1, i64::MIN, 5].into();
        let mut buf = array.serialize().unwrap();
        assert_eq!(&buf.as_bytes()[17..25], &[0xFF; 8]);
        let decoded = HomogeneousArray::<i64>::deserialize(&mut buf).unwrap();
        assert_eq!(decoded, array);

        let small: HomogeneousArray<i8, ByteInts> = vec![-128, 127].into();
        let mut buf = small.serialize().unwrap();
        assert_eq!(&buf.as_bytes()[17..], &[0x80, 0x7F]);
        assert_eq!(
            HomogeneousArray::<i8, ByteInts>::deserialize(&mut buf).unwrap(),
            small
        );
    }

    #[test]
    fn narrow_layout() {
        let array: HomogeneousArray<u8, Narrow> = vec![1, 2, 3].into();
        let buf = array.serialize().unwrap();
        assert_eq!(&buf.as_bytes()[8..], &[3, 1, 3, 1, 2, 3]);
    }

    #[test]
    fn count_at_field_maximum() {
        let array: Bytes = vec![0u8; 65_535].into();
        let mut buf = array.serialize().unwrap();
        assert_eq!(&buf.as_bytes()[15..17], &[0xFF, 0xFF]);
        assert_eq!(Bytes::deserialize(&mut buf).unwrap().len(), 65_535);
    }

    #[test]
    fn count_past_field_maximum_is_rejected() {
        let array: Bytes = vec![0u8; 65_536].into();
        assert!(matches!(
            array.serialize(),
            Err(StfError::IntegerOverflow {
                value: 65_536,
                width: 2,
                signed: false
            })
        ));
    }

    #[test]
    fn element_overflow_is_rejected() {
        let array: HomogeneousArray<u16, ByteInts> = vec![256].into();
        assert!(matches!(
            array.serialize(),
            Err(StfError::IntegerOverflow { width: 1, .. })
        ));
    }

    #[test]
    fn inflated_count_over_reads() {
        let array: Bytes = vec![1, 2].into();
        let mut raw = array.serialize().unwrap().into_vec();
        raw[16] = 5;
        let mut buf = ByteBuffer::from(raw);
        assert!(matches!(
            Bytes::deserialize(&mut buf),
            Err(StfError::OverRead { .. })
        ));
    }

    #[test]
    fn deflated_count_under_consumes() {
        let array: Bytes = vec![1, 2].into();
        let mut raw = array.serialize().unwrap().into_vec();
        raw[16] = 1;
        let mut buf = ByteBuffer::from(raw);
        let decoded = Bytes::deserialize(&mut buf).unwrap();
        assert_eq!(decoded.as_slice(), &[1]);
        assert_eq!(buf.remaining(), &[2]);
    }

    #[test]
    fn collection_helpers() {
        let mut array = Bytes::default();
        array.push(1);
        array.extend([2, 3]);
        array[0] = 9;
        assert_eq!(array.iter().copied().sum::<u8>(), 14);
        assert_eq!(format!("{array:?}"), "[9, 2, 3]");
        assert_eq!(array.clone().into_inner(), vec![9, 2, 3]);
        let collected: Vec<u8> = array.into_iter().collect();
        assert_eq!(collected, vec![9, 2, 3]);
    }
}
