//! Lossless object reading for the document model.
//!
//! Typed fields are read leniently. Any input the typed reading cannot
//! reproduce exactly (wrong types, list elements of the wrong shape, table
//! entries that do not parse) stays in the record's `extra` map under its
//! original key. On write the original is kept unless the typed value has
//! changed since it was read; lists and tables merge so unreadable entries
//! keep their place.

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

pub(crate) type Object = Map<String, Value>;

pub(crate) fn read<T: DeserializeOwned>(value: &Value) -> Option<T> {
    T::deserialize(value).ok()
}

fn read_list<T: DeserializeOwned>(value: &Value) -> Vec<T> {
    value
        .as_array()
        .map(|items| items.iter().filter_map(read).collect())
        .unwrap_or_default()
}

fn read_table<V: DeserializeOwned>(value: &Value) -> IndexMap<String, V> {
    value
        .as_object()
        .map(|entries| {
            entries
                .iter()
                .filter_map(|(k, v)| read(v).map(|v| (k.clone(), v)))
                .collect()
        })
        .unwrap_or_default()
}

/// Whether writing `typed` back reproduces `raw`. Objects that read at all
/// are records or maps, which carry their own unknown keys.
fn faithful<T: Serialize>(typed: &T, raw: &Value) -> bool {
    raw.is_object() || serde_json::to_value(typed).is_ok_and(|v| same(&v, raw))
}

/// Value equality with numbers compared by magnitude, so `1` and `1.0` match.
fn same(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x == y || x.as_f64() == y.as_f64(),
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(a, b)| same(a, b))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len() && x.iter().all(|(k, a)| y.get(k).is_some_and(|b| same(a, b)))
        }
        _ => a == b,
    }
}

// ============================================================================
// Reader
// ============================================================================

pub(crate) struct Reader {
    rest: Object,
}

impl Reader {
    /// `None` when `value` is not an object.
    pub fn new(value: Value) -> Option<Self> {
        match value {
            Value::Object(rest) => Some(Self { rest }),
            _ => None,
        }
    }

    /// Drops `key` from the leftovers once its typed form is known to be
    /// lossless.
    fn settle(&mut self, key: &str, lossless: bool) {
        if lossless {
            self.rest.shift_remove(key);
        }
    }

    pub fn field<T>(&mut self, key: &str) -> T
    where
        T: DeserializeOwned + Serialize + Default,
    {
        self.optional(key).unwrap_or_default()
    }

    pub fn field_with<T>(&mut self, key: &str, parse: fn(&Value) -> Option<T>) -> T
    where
        T: Serialize + Default,
    {
        let Some(raw) = self.rest.get(key) else {
            return T::default();
        };
        let typed = parse(raw);
        let lossless = typed
            .as_ref()
            .is_some_and(|t| serde_json::to_value(t).is_ok_and(|v| same(&v, raw)));
        self.settle(key, lossless);
        typed.unwrap_or_default()
    }

    /// Absent keys and unreadable values are `None`; an unreadable value
    /// (including `null`) is kept as written.
    pub fn optional<T>(&mut self, key: &str) -> Option<T>
    where
        T: DeserializeOwned + Serialize,
    {
        let raw = self.rest.get(key)?;
        let typed: Option<T> = read(raw);
        let lossless = typed.as_ref().is_some_and(|t| faithful(t, raw));
        self.settle(key, lossless);
        typed
    }

    /// Elements that read as `T`, in order.
    pub fn list<T>(&mut self, key: &str) -> Vec<T>
    where
        T: DeserializeOwned + Serialize,
    {
        let Some(raw) = self.rest.get(key) else {
            return Vec::new();
        };
        let Value::Array(entries) = raw else {
            return Vec::new();
        };
        let mut lossless = true;
        let items = entries
            .iter()
            .filter_map(|entry| {
                let item = read::<T>(entry);
                lossless &= item.as_ref().is_some_and(|t| faithful(t, entry));
                item
            })
            .collect();
        self.settle(key, lossless);
        items
    }

    /// Entries that read as `V`, in order.
    pub fn table<V>(&mut self, key: &str) -> IndexMap<String, V>
    where
        V: DeserializeOwned + Serialize,
    {
        let Some(raw) = self.rest.get(key) else {
            return IndexMap::new();
        };
        let Value::Object(entries) = raw else {
            return IndexMap::new();
        };
        let mut lossless = true;
        let table = entries
            .iter()
            .filter_map(|(k, v)| {
                let value = read::<V>(v);
                lossless &= value.as_ref().is_some_and(|t| faithful(t, v));
                value.map(|value| (k.clone(), value))
            })
            .collect();
        self.settle(key, lossless);
        table
    }

    pub fn finish(self) -> Object {
        self.rest
    }
}

// ============================================================================
// Writer
// ============================================================================

pub(crate) struct Writer<'a> {
    raw: &'a Object,
    out: Object,
}

impl<'a> Writer<'a> {
    pub fn new(extra: &'a Object) -> Self {
        Self {
            raw: extra,
            out: extra.clone(),
        }
    }

    fn put<T: Serialize + PartialEq>(
        &mut self,
        key: &str,
        value: &T,
        reread: impl FnOnce(&Value) -> T,
    ) -> serde_json::Result<()> {
        if let Some(raw) = self.raw.get(key) {
            if reread(raw) == *value {
                return Ok(());
            }
        }
        self.out.insert(key.to_string(), serde_json::to_value(value)?);
        Ok(())
    }

    pub fn field<T>(&mut self, key: &str, value: &T) -> serde_json::Result<()>
    where
        T: DeserializeOwned + Serialize + Default + PartialEq,
    {
        self.put(key, value, |raw| read(raw).unwrap_or_default())
    }

    pub fn field_with<T>(
        &mut self,
        key: &str,
        value: &T,
        parse: fn(&Value) -> Option<T>,
    ) -> serde_json::Result<()>
    where
        T: Serialize + Default + PartialEq,
    {
        self.put(key, value, |raw| parse(raw).unwrap_or_default())
    }

    pub fn optional<T>(&mut self, key: &str, value: &Option<T>) -> serde_json::Result<()>
    where
        T: DeserializeOwned + Serialize + PartialEq,
    {
        if let Some(raw) = self.raw.get(key) {
            if read::<T>(raw).as_ref() == value.as_ref() {
                return Ok(());
            }
        }
        match value {
            Some(v) => {
                self.out.insert(key.to_string(), serde_json::to_value(v)?);
            }
            None => {
                self.out.shift_remove(key);
            }
        }
        Ok(())
    }

    pub fn list<T>(&mut self, key: &str, items: &[T]) -> serde_json::Result<()>
    where
        T: DeserializeOwned + Serialize + PartialEq,
    {
        let merged = match self.raw.get(key) {
            Some(raw) if read_list::<T>(raw).as_slice() == items => return Ok(()),
            Some(Value::Array(raw)) => merge_list(raw, items)?,
            _ => serde_json::to_value(items)?,
        };
        self.out.insert(key.to_string(), merged);
        Ok(())
    }

    pub fn table<V>(&mut self, key: &str, table: &IndexMap<String, V>) -> serde_json::Result<()>
    where
        V: DeserializeOwned + Serialize + PartialEq,
    {
        let merged = match self.raw.get(key) {
            Some(raw) if read_table::<V>(raw) == *table => return Ok(()),
            Some(Value::Object(raw)) => merge_table(raw, table)?,
            _ => serde_json::to_value(table)?,
        };
        self.out.insert(key.to_string(), merged);
        Ok(())
    }

    pub fn finish(self) -> Object {
        self.out
    }
}

/// Unreadable elements keep their position; readable slots take the typed
/// items in order and any remaining items are appended.
fn merge_list<T>(raw: &[Value], items: &[T]) -> serde_json::Result<Value>
where
    T: DeserializeOwned + Serialize,
{
    let mut typed = items.iter();
    let mut out = Vec::with_capacity(raw.len().max(items.len()));
    for entry in raw {
        if read::<T>(entry).is_none() {
            out.push(entry.clone());
        } else if let Some(item) = typed.next() {
            out.push(serde_json::to_value(item)?);
        }
    }
    for item in typed {
        out.push(serde_json::to_value(item)?);
    }
    Ok(Value::Array(out))
}

/// Unreadable entries survive unless the typed table now has the key.
fn merge_table<V>(raw: &Object, table: &IndexMap<String, V>) -> serde_json::Result<Value>
where
    V: DeserializeOwned + Serialize,
{
    let mut out = Object::new();
    for (k, v) in raw {
        if read::<V>(v).is_none() {
            out.insert(k.clone(), v.clone());
        }
    }
    for (k, v) in table {
        out.insert(k.clone(), serde_json::to_value(v)?);
    }
    Ok(Value::Object(out))
}
