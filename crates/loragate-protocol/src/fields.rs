use loragate_core::constants::{FIELD_DELIMITER, KEY_VALUE_SEPARATOR};

/// Ordered `key=value` fields of one protocol token.
///
/// Keys are lowercased and both sides are trimmed. A key that appears more
/// than once keeps its first position and takes the value of its last
/// occurrence (ordered overwrite).
///
/// # Example
/// ```
/// use loragate_protocol::ParsedFields;
///
/// let fields = ParsedFields::parse("node=12;SEQ=3;ev=occupied;seq=4");
/// assert_eq!(fields.get("seq"), Some("4"));
/// assert_eq!(fields.keys().collect::<Vec<_>>(), vec!["node", "seq", "ev"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedFields {
    entries: Vec<(String, String)>,
}

impl ParsedFields {
    /// Create an empty field set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Split a protocol token on `;` then on the first `=`.
    ///
    /// Segments without `=` are skipped; they carry no field.
    pub fn parse(token: &str) -> Self {
        let mut fields = Self::new();

        for segment in token.split(FIELD_DELIMITER) {
            if let Some((key, value)) = segment.split_once(KEY_VALUE_SEPARATOR) {
                fields.insert(key, value);
            }
        }

        fields
    }

    /// Insert a field, normalizing the key and trimming the value.
    ///
    /// Returns the previous value when the key was already present.
    pub fn insert(&mut self, key: &str, value: &str) -> Option<String> {
        let key = key.trim().to_lowercase();
        let value = value.trim().to_string();

        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => Some(std::mem::replace(existing, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    /// Look up a field by its (lowercase) key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Keys in first-seen order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
