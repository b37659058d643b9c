//! The full, ordered set of entries being watched.

use crate::{error::Error, Entry, EntryValue, ProcessMemory, RefId};
use hashbrown::HashSet;
use std::slice;

/// An immutable collection of entries, indexed by their reference id.
#[derive(Debug, Clone, Default)]
pub struct Entries {
    entries: Vec<Entry>,
}

impl Entries {
    /// Construct a new collection of entries.
    ///
    /// This validates that every reference points to an existing entry, and
    /// that no chain of references loops back onto itself.
    pub fn new(entries: Vec<Entry>) -> Result<Self, Error> {
        let entries = Self { entries };
        entries.validate()?;
        Ok(entries)
    }

    /// Parse every argument as an entry, in order.
    pub fn parse<I>(args: I) -> Result<Self, Error>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut entries = Vec::new();

        for arg in args {
            let arg = arg.as_ref();
            let entry = Entry::parse(arg).map_err(|e| Error::Parse(arg.to_string(), e))?;
            entries.push(entry);
        }

        log::debug!("processing done, found {} addresses", entries.len());
        Self::new(entries)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Test if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get the entry with the given reference id.
    pub fn get(&self, id: RefId) -> Option<&Entry> {
        self.entries.get(id.index())
    }

    /// Iterate over all entries in reference id order.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            iter: self.entries.iter().enumerate(),
        }
    }

    /// Read the current value of the entry with the given id.
    ///
    /// The entry is resolved and read on demand, so this always observes the
    /// memory as it is right now.
    pub fn current_value<M>(&self, id: RefId, memory: &M) -> Result<i64, Error>
    where
        M: ?Sized + ProcessMemory,
    {
        let entry = self
            .get(id)
            .ok_or_else(|| Error::ReferenceOutOfRange(id, id, self.len()))?;

        let (_, value) = entry.read(memory)?;
        Ok(value)
    }

    /// Compute the value that should be written to the given entry.
    ///
    /// Returns `None` for entries which are only monitored.
    pub fn value_to_write<M>(&self, entry: &Entry, memory: &M) -> Result<Option<i64>, Error>
    where
        M: ?Sized + ProcessMemory,
    {
        match entry.value {
            None => Ok(None),
            Some(EntryValue::Literal(value)) => Ok(Some(value)),
            Some(EntryValue::Reference(id)) => {
                let value = self.current_value(id, memory)?;
                log::debug!("reference {} has the value {}", id, value);
                Ok(Some(value))
            }
        }
    }

    fn validate(&self) -> Result<(), Error> {
        for (id, entry) in self.iter() {
            if let Some(reference) = entry.reference() {
                if self.get(reference).is_none() {
                    return Err(Error::ReferenceOutOfRange(id, reference, self.len()));
                }
            }
        }

        let mut visited = HashSet::new();

        for (id, _) in self.iter() {
            visited.clear();
            let mut current = id;

            while let Some(next) = self.get(current).and_then(Entry::reference) {
                visited.insert(current);

                if next == id || visited.contains(&next) {
                    return Err(Error::ReferenceCycle(id));
                }

                current = next;
            }
        }

        Ok(())
    }
}

impl<'a> IntoIterator for &'a Entries {
    type Item = (RefId, &'a Entry);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over entries and their reference ids.
pub struct Iter<'a> {
    iter: std::iter::Enumerate<slice::Iter<'a, Entry>>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (RefId, &'a Entry);

    fn next(&mut self) -> Option<Self::Item> {
        let (index, entry) = self.iter.next()?;
        Some((RefId::from_index(index), entry))
    }
}
