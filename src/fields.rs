use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// User-supplied key/value pairs attached to an event.
pub type Fields = BTreeMap<String, Value>;

#[derive(Debug, Clone, PartialEq)]
enum Slot {
    Value(Value),
    /// The value could not be turned into JSON; holds the serializer error text.
    Invalid(String),
}

/// Field set owned by a single [`Logger`](crate::Logger).
///
/// Every merge produces a new, independently owned map. A record never
/// shares its map with the record it was derived from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldSet {
    slots: BTreeMap<String, Slot>,
}

impl FieldSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of `self` with `additions` merged in. Keys already present keep
    /// their value.
    pub fn merged(&self, additions: Fields) -> Self {
        let mut slots = self.slots.clone();
        for (key, value) in additions {
            slots.entry(key).or_insert(Slot::Value(value));
        }
        Self { slots }
    }

    /// Copy of `self` with a single serializable value merged in under the
    /// same "existing key wins" rule.
    pub fn merged_one<V: Serialize + ?Sized>(&self, key: &str, value: &V) -> Self {
        let mut slots = self.slots.clone();
        if !slots.contains_key(key) {
            let slot = match serde_json::to_value(value) {
                Ok(value) => Slot::Value(value),
                Err(e) => Slot::Invalid(e.to_string()),
            };
            slots.insert(key.to_string(), slot);
        }
        Self { slots }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        match self.slots.get(key) {
            Some(Slot::Value(value)) => Some(value),
            _ => None,
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.slots.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Valid entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.slots.iter().filter_map(|(k, slot)| match slot {
            Slot::Value(v) => Some((k.as_str(), v)),
            Slot::Invalid(_) => None,
        })
    }

    /// First entry whose value failed to serialize, with the error text.
    pub(crate) fn first_invalid(&self) -> Option<(&str, &str)> {
        self.slots.iter().find_map(|(k, slot)| match slot {
            Slot::Invalid(reason) => Some((k.as_str(), reason.as_str())),
            Slot::Value(_) => None,
        })
    }
}

impl From<Fields> for FieldSet {
    fn from(fields: Fields) -> Self {
        FieldSet::new().merged(fields)
    }
}
