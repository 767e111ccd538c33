//! Byte-level CSV grammar: separators, escape character and ignored bytes

/// A set of byte values, one bit per possible byte
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct ByteSet([u64; 4]);

impl ByteSet {
    /// The empty set
    pub const fn new() -> Self {
        Self([0; 4])
    }

    /// Build a set from a list of bytes
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut set = Self::new();
        for &byte in bytes {
            set.insert(byte);
        }
        set
    }

    #[inline]
    pub fn insert(&mut self, byte: u8) {
        self.0[(byte >> 6) as usize] |= 1u64 << (byte & 63);
    }

    #[inline(always)]
    pub fn contains(&self, byte: u8) -> bool {
        self.0[(byte >> 6) as usize] & (1u64 << (byte & 63)) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|&word| word == 0)
    }

    /// Members in ascending byte order
    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        (0..=u8::MAX).filter(move |&byte| self.contains(byte))
    }
}

impl std::fmt::Debug for ByteSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Immutable description of the CSV grammar consumed by the tokenizer and
/// the record splitter.
///
/// The default dialect separates records with `\n`, fields with `,`, escapes
/// with `"` and discards tabs that appear outside of an escaped run. Tabs
/// inside an escaped run are kept verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dialect {
    record_separator: u8,
    field_separator: u8,
    escape_character: u8,
    ignore_characters: ByteSet,
}

impl Default for Dialect {
    fn default() -> Self {
        Self {
            record_separator: b'\n',
            field_separator: b',',
            escape_character: b'"',
            ignore_characters: ByteSet::from_bytes(b"\t"),
        }
    }
}

impl Dialect {
    pub fn with_record_separator(mut self, byte: u8) -> Self {
        self.record_separator = byte;
        self
    }

    pub fn with_field_separator(mut self, byte: u8) -> Self {
        self.field_separator = byte;
        self
    }

    pub fn with_escape_character(mut self, byte: u8) -> Self {
        self.escape_character = byte;
        self
    }

    /// Replace the ignored-character set
    pub fn with_ignore_characters(mut self, bytes: &[u8]) -> Self {
        self.ignore_characters = ByteSet::from_bytes(bytes);
        self
    }

    #[inline(always)]
    pub fn record_separator(&self) -> u8 {
        self.record_separator
    }

    #[inline(always)]
    pub fn field_separator(&self) -> u8 {
        self.field_separator
    }

    #[inline(always)]
    pub fn escape_character(&self) -> u8 {
        self.escape_character
    }

    pub fn ignore_characters(&self) -> &ByteSet {
        &self.ignore_characters
    }

    #[inline(always)]
    pub fn is_record_separator(&self, byte: u8) -> bool {
        byte == self.record_separator
    }

    #[inline(always)]
    pub fn is_field_separator(&self, byte: u8) -> bool {
        byte == self.field_separator
    }

    #[inline(always)]
    pub fn is_escape_character(&self, byte: u8) -> bool {
        byte == self.escape_character
    }

    #[inline(always)]
    pub fn is_ignore_character(&self, byte: u8) -> bool {
        self.ignore_characters.contains(byte)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_dialect() {
        let dialect = Dialect::default();

        assert_eq!(dialect.record_separator(), b'\n');
        assert!(dialect.is_record_separator(b'\n'));
        assert_eq!(dialect.field_separator(), b',');
        assert!(dialect.is_field_separator(b','));
        assert_eq!(dialect.escape_character(), b'"');
        assert!(dialect.is_escape_character(b'"'));
        assert!(dialect.is_ignore_character(b'\t'));
        assert_eq!(dialect.ignore_characters().iter().collect::<Vec<_>>(), vec![b'\t']);
    }

    #[test]
    fn test_custom_dialect() {
        let dialect = Dialect::default()
            .with_record_separator(b';')
            .with_field_separator(b'|')
            .with_escape_character(b'\'')
            .with_ignore_characters(b"\r ");

        assert!(dialect.is_record_separator(b';'));
        assert!(!dialect.is_record_separator(b'\n'));
        assert!(dialect.is_field_separator(b'|'));
        assert!(dialect.is_escape_character(b'\''));
        assert!(dialect.is_ignore_character(b'\r'));
        assert!(dialect.is_ignore_character(b' '));
        assert!(!dialect.is_ignore_character(b'\t'));
    }

    #[test]
    fn test_byte_set_edges() {
        let set = ByteSet::from_bytes(&[0, 63, 64, 127, 128, 255]);

        for byte in [0u8, 63, 64, 127, 128, 255] {
            assert!(set.contains(byte), "missing {}", byte);
        }
        assert!(!set.contains(1));
        assert!(!set.contains(254));
        assert_eq!(set.iter().count(), 6);
        assert!(ByteSet::new().is_empty());
        assert!(!set.is_empty());
    }

    #[test]
    fn test_no_ignore_characters() {
        let dialect = Dialect::default().with_ignore_characters(&[]);
        assert!(dialect.ignore_characters().is_empty());
        assert!(!dialect.is_ignore_character(b'\t'));
    }
}
