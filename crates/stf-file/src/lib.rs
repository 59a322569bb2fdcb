//! Serialized Tree Format files.
//!
//! A tree file stores exactly one root object behind a small envelope:
//!
//! ```text
//! [4 bytes: magic 0xDEADBEEF]
//! [4 bytes: format version]
//! [N bytes: root object serialization]
//! ```
//!
//! Reading checks the magic first, then requires an exact version match,
//! then hands the remaining bytes to the root type's decoder.
//! [`TreeFile`] wraps this in a session that holds the file handle for its
//! lifetime and releases it on every exit path.

pub mod envelope;
pub mod error;
pub mod session;

pub use envelope::{Envelope, EnvelopeConfig, PREFIX_LEN};
pub use error::{FileError, FileResult};
pub use session::{read_tree, read_tree_with, write_tree, OpenMode, TreeFile};

#[cfg(test)]
mod tests {
    use super::*;
    use stf_core::util::{pack_nibbles, unpack_nibbles};
    use stf_core::{
        content_hash, ArrayLayout, ByteBuffer, ConvertOptions, HeaderLayout, HomogeneousArray,
        SerializableObject, StfError, StfResult,
    };
    use tempfile::TempDir;

    struct ByteInts;

    impl ArrayLayout for ByteInts {
        const ELEMENT: ConvertOptions = ConvertOptions::int_width(1);
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    struct Card {
        suit: u8,
        rank: u8,
    }

    impl SerializableObject for Card {
        const REQUIRES_HEADER: bool = false;

        fn data(&self) -> StfResult<ByteBuffer> {
            let mut out = ByteBuffer::new();
            out.add_obj(
                &pack_nibbles(self.suit, self.rank),
                &ConvertOptions::int_width(1),
            )?;
            Ok(out)
        }

        fn deserialize(buffer: &mut ByteBuffer) -> StfResult<Self> {
            let (suit, rank) = unpack_nibbles(buffer.read_obj(&ConvertOptions::int_width(1))?);
            if suit > 3 || rank > 12 {
                return Err(StfError::InvalidType(format!("card {suit}/{rank}")));
            }
            Ok(Self { suit, rank })
        }
    }

    struct DeckLayout;

    impl ArrayLayout for DeckLayout {
        const HEADER: HeaderLayout = HeaderLayout::narrow(1);
        const COUNT_WIDTH: usize = 1;
        const ELEMENT: ConvertOptions = ConvertOptions::int_width(1);
    }

    type Deck = HomogeneousArray<Card, DeckLayout>;

    fn full_deck() -> Deck {
        (0..4)
            .flat_map(|suit| (0..13).map(move |rank| Card { suit, rank }))
            .collect()
    }

    #[test]
    fn byte_ints_file_layout() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ints.stf");
        let root: HomogeneousArray<u8, ByteInts> = vec![10, 20, 30].into();
        write_tree(&path, &root).unwrap();

        let raw = std::fs::read(&path).unwrap();
        let mut expected = vec![0xDE, 0xAD, 0xBE, 0xEF, 0x00, 0x00, 0x00, 0x04];
        expected.extend_from_slice(&content_hash(&[10, 20, 30]).to_be_bytes());
        expected.extend_from_slice(&[0x00, 0x00, 0x00, 0x03]);
        expected.extend_from_slice(&[0x00, 0x00, 0x02]);
        expected.extend_from_slice(&[0x00, 0x03]);
        expected.extend_from_slice(&[0x0A, 0x14, 0x1E]);
        assert_eq!(raw, expected);

        let decoded: HomogeneousArray<u8, ByteInts> = read_tree(&path).unwrap();
        assert_eq!(decoded.as_slice(), &[10, 20, 30]);
    }

    #[test]
    fn deck_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("deck.stf");
        let deck = full_deck();
        assert_eq!(deck.len(), 52);

        write_tree(&path, &deck).unwrap();
        let raw = std::fs::read(&path).unwrap();
        // envelope + hash + size(1) + metadata size(1) + count(1) + one byte per card
        assert_eq!(raw.len(), PREFIX_LEN + 8 + 1 + 1 + 1 + 52);
        assert_eq!(&raw[PREFIX_LEN + 8..PREFIX_LEN + 11], &[52, 1, 52]);

        let decoded: Deck = read_tree(&path).unwrap();
        assert_eq!(decoded, deck);
    }

    #[test]
    fn shuffled_deck_keeps_order() {
        let mut cards = full_deck().into_inner();
        cards.reverse();
        cards.swap(0, 30);
        let deck = Deck::from(cards.clone());

        let bytes = Envelope::encode(&deck, &EnvelopeConfig::default()).unwrap();
        let decoded: Deck = Envelope::decode(bytes, &EnvelopeConfig::verified()).unwrap();
        assert_eq!(decoded.into_inner(), cards);
    }

    #[test]
    fn nested_tree_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("hands.stf");
        let hands: HomogeneousArray<Deck> = vec![
            full_deck().iter().take(5).copied().collect(),
            Deck::new(),
            full_deck().iter().skip(47).copied().collect(),
        ]
        .into();

        let mut file = TreeFile::open_with(&path, OpenMode::Write, EnvelopeConfig::verified())
            .unwrap();
        file.write(&hands).unwrap();
        file.close().unwrap();

        let mut file = TreeFile::open_with(&path, OpenMode::Read, EnvelopeConfig::verified())
            .unwrap();
        let decoded: HomogeneousArray<Deck> = file.read().unwrap();
        assert_eq!(decoded, hands);
        assert!(decoded[1].is_empty());
        assert_eq!(decoded[2].len(), 5);
    }

    #[test]
    fn bad_magic_on_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("junk.stf");
        std::fs::write(&path, [0x00, 0x01, 0x02, 0x03, 0x00, 0x00, 0x00, 0x04]).unwrap();

        let err = read_tree::<Deck>(&path).unwrap_err();
        assert!(matches!(
            err.as_format(),
            Some(StfError::InvalidMagic {
                actual: 0x0001_0203,
                ..
            })
        ));
        assert!(err.severity() == stf_core::Severity::Critical);
    }

    #[test]
    fn truncated_file_is_an_over_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("short.stf");
        write_tree(&path, &full_deck()).unwrap();
        let raw = std::fs::read(&path).unwrap();
        std::fs::write(&path, &raw[..raw.len() - 10]).unwrap();

        let err = read_tree::<Deck>(&path).unwrap_err();
        assert!(matches!(err.as_format(), Some(StfError::OverRead { .. })));
    }

    #[test]
    fn corrupted_card_detected_only_when_verifying() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tampered.stf");
        write_tree(&path, &full_deck()).unwrap();
        let mut raw = std::fs::read(&path).unwrap();
        let last = raw.len() - 1;
        raw[last] = 0x3B;
        std::fs::write(&path, &raw).unwrap();

        let lenient: Deck = read_tree(&path).unwrap();
        assert_eq!(lenient[51], Card { suit: 3, rank: 11 });

        let mut file = TreeFile::open_with(&path, OpenMode::Read, EnvelopeConfig::verified())
            .unwrap();
        let err = file.read::<Deck>().unwrap_err();
        assert!(matches!(
            err.as_format(),
            Some(StfError::HashMismatch { .. })
        ));
    }
}
