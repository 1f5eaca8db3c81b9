use serde_json::Value;

pub const DEFAULT_CREATOR_NAMES: &str = "creatorNames";
pub const DEFAULT_FAMILY_NAMES: &str = "familyNames";
pub const DEFAULT_GIVEN_NAMES: &str = "givenNames";

/// Attribute names of the three parallel name-variant sequences that make up
/// an author entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorKeys {
    pub creator_names: String,
    pub family_names: String,
    pub given_names: String,
}

impl Default for AuthorKeys {
    fn default() -> Self {
        Self {
            creator_names: DEFAULT_CREATOR_NAMES.to_string(),
            family_names: DEFAULT_FAMILY_NAMES.to_string(),
            given_names: DEFAULT_GIVEN_NAMES.to_string(),
        }
    }
}

impl AuthorKeys {
    pub fn all(&self) -> [&str; 3] {
        [
            self.creator_names.as_str(),
            self.family_names.as_str(),
            self.given_names.as_str(),
        ]
    }
}

/// Whether a list slot is free for the next selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Empty,
    Filled,
}

impl SlotState {
    pub fn label(self) -> &'static str {
        match self {
            SlotState::Empty => "empty",
            SlotState::Filled => "filled",
        }
    }
}

/// An author entry is empty when the first element of each name-variant
/// sequence is an object with no keys. Anything that does not have that shape
/// counts as filled.
pub fn is_empty_author_entry(entry: &Value, keys: &AuthorKeys) -> bool {
    keys.all().iter().all(|key| first_variant_is_blank(entry, key))
}

fn first_variant_is_blank(entry: &Value, key: &str) -> bool {
    entry
        .get(key)
        .and_then(Value::as_array)
        .and_then(|variants| variants.first())
        .and_then(Value::as_object)
        .map(|first| first.is_empty())
        .unwrap_or(false)
}

pub fn classify(entry: &Value, keys: &AuthorKeys) -> SlotState {
    if is_empty_author_entry(entry, keys) {
        SlotState::Empty
    } else {
        SlotState::Filled
    }
}

/// Best-effort human-readable name for an entry: the first string value found
/// in the creator-name variants, then family + given names.
pub fn display_name(entry: &Value, keys: &AuthorKeys) -> Option<String> {
    if let Some(name) = first_string(entry, &keys.creator_names) {
        return Some(name);
    }

    let family = first_string(entry, &keys.family_names);
    let given = first_string(entry, &keys.given_names);
    match (family, given) {
        (Some(family), Some(given)) => Some(format!("{family}, {given}")),
        (Some(family), None) => Some(family),
        (None, Some(given)) => Some(given),
        (None, None) => None,
    }
}

fn first_string(entry: &Value, key: &str) -> Option<String> {
    entry
        .get(key)?
        .as_array()?
        .iter()
        .filter_map(Value::as_object)
        .flat_map(|variant| variant.values())
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|value| !value.is_empty())
        .map(str::to_string)
}
