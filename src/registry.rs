//! Record cache, stable identifiers and named definitions.
//!
//! The [`Registry`] is the explicit owner of state that lives longer than a single test:
//!
//! - materialized records keyed by [`Fingerprint`], dropped at every test boundary;
//! - fingerprint → identifier assignments, kept for the registry's lifetime so repeated
//!   runs of a test see the same ids;
//! - per-backing-type id sequences, which only ever count up;
//! - named definitions, created or updated by [`Registry::define`].
//!
//! Execution is single-threaded, so interior mutability is plain `RefCell`.

use std::{
    cell::RefCell,
    collections::HashMap,
    fmt::{self, Write as _},
    rc::Rc,
};

use indexmap::IndexMap;
use sha2::{Digest, Sha256};

use crate::{
    attribute::Attributes,
    config::Config,
    definition::Definition,
    error::{config::ConfigError, internal::InternalError, StubError},
    record::Record,
};

/// Structural key identifying one materialized record.
///
/// The digest covers the definition instance, backing type, stub global key and the
/// effective attributes after overrides. The canonical text is kept so cache hits can be verified.
#[derive(Clone)]
pub struct Fingerprint {
    digest: [u8; 32],
    canonical: String,
}

impl Fingerprint {
    pub fn of(
        definition: u64,
        backing: &str,
        global_key: &str,
        attributes: &Attributes,
    ) -> Result<Self, StubError> {
        let mut value = serde_json::to_value((definition, backing, global_key, attributes))
            .map_err(InternalError::Serialize)?;
        value.sort_all_objects();
        let canonical = value.to_string();

        let digest = Sha256::digest(canonical.as_bytes()).into();

        Ok(Self { digest, canonical })
    }

    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    pub fn to_hex(&self) -> String {
        self.digest.iter().fold(String::with_capacity(64), |mut hex, byte| {
            let _ = write!(hex, "{byte:02x}");
            hex
        })
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.to_hex())
    }
}

struct CachedRecord {
    canonical: String,
    record: Rc<Record>,
}

pub struct Registry {
    id_base: i64,
    definitions: IndexMap<String, Definition>,
    records: RefCell<HashMap<[u8; 32], CachedRecord>>,
    ids: RefCell<HashMap<[u8; 32], i64>>,
    sequences: RefCell<HashMap<String, i64>>,
    config: Config,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        Self {
            id_base: config.id_base,
            definitions: IndexMap::new(),
            records: RefCell::new(HashMap::new()),
            ids: RefCell::new(HashMap::new()),
            sequences: RefCell::new(HashMap::new()),
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Creates or updates the definition named `name`, then runs the declaration block on it.
    ///
    /// Later calls with the same name modify the same definition, so declarations can be
    /// split across several blocks.
    ///
    /// # Arguments
    /// - `name` - Definition name
    /// - `declare` - Declaration block adding models, stubs and the stubbed time
    ///
    /// # Returns
    /// - `Ok(&mut Definition)` - The created or updated definition
    /// - `Err(StubError)` - Error raised by the declaration block
    pub fn define<F>(&mut self, name: &str, declare: F) -> Result<&mut Definition, StubError>
    where
        F: FnOnce(&mut Definition) -> Result<(), StubError>,
    {
        let options = self.config.options.clone();
        let definition = self
            .definitions
            .entry(name.to_string())
            .or_insert_with(|| Definition::named(name).with_options(options));

        declare(definition)?;

        Ok(definition)
    }

    /// Declares `name` as a copy of `parent` with further declarations applied.
    ///
    /// The copy shares no state with `parent`; changes to either leave the other intact.
    ///
    /// # Returns
    /// - `Ok(&mut Definition)` - The new definition
    /// - `Err(StubError::Config)` - No definition named `parent` exists
    pub fn extend<F>(
        &mut self,
        name: &str,
        parent: &str,
        declare: F,
    ) -> Result<&mut Definition, StubError>
    where
        F: FnOnce(&mut Definition) -> Result<(), StubError>,
    {
        let mut definition = self
            .definitions
            .get(parent)
            .ok_or_else(|| ConfigError::UnknownDefinition(parent.to_string()))?
            .dup();
        definition.rename(name);
        declare(&mut definition)?;

        let (index, _) = self.definitions.insert_full(name.to_string(), definition);
        Ok(&mut self.definitions[index])
    }

    pub fn definition(&self, name: &str) -> Option<&Definition> {
        self.definitions.get(name)
    }

    pub fn definitions(&self) -> impl Iterator<Item = (&str, &Definition)> {
        self.definitions
            .iter()
            .map(|(name, definition)| (name.as_str(), definition))
    }

    /// Returns the cached record for `fingerprint`, if any.
    ///
    /// # Returns
    /// - `Ok(Some(record))` - Previously cached record
    /// - `Ok(None)` - Nothing cached under this fingerprint
    /// - `Err(StubError::Internal)` - The cached entry was built from different attributes
    pub fn cached(&self, fingerprint: &Fingerprint) -> Result<Option<Rc<Record>>, StubError> {
        let records = self.records.borrow();
        let Some(entry) = records.get(&fingerprint.digest) else {
            return Ok(None);
        };

        if entry.canonical != fingerprint.canonical {
            return Err(InternalError::CacheConsistency {
                fingerprint: fingerprint.to_hex(),
                cached: entry.canonical.clone(),
                requested: fingerprint.canonical.clone(),
            }
            .into());
        }

        tracing::trace!("Record cache hit for {}", entry.record.stub());
        Ok(Some(Rc::clone(&entry.record)))
    }

    pub fn cache(&self, fingerprint: &Fingerprint, record: Rc<Record>) {
        self.records.borrow_mut().insert(
            fingerprint.digest,
            CachedRecord {
                canonical: fingerprint.canonical.clone(),
                record,
            },
        );
    }

    /// Identifier for `fingerprint`, assigned from `backing`'s sequence on first use.
    pub fn stable_id(&self, fingerprint: &Fingerprint, backing: &str) -> i64 {
        if let Some(id) = self.ids.borrow().get(&fingerprint.digest) {
            return *id;
        }

        let id = self.next_id(backing);
        self.ids.borrow_mut().insert(fingerprint.digest, id);
        id
    }

    /// Next identifier of `backing`'s sequence. Sequences never hand out an id twice.
    pub fn next_id(&self, backing: &str) -> i64 {
        let mut sequences = self.sequences.borrow_mut();
        let current = sequences.entry(backing.to_string()).or_insert(self.id_base);
        *current += 1;

        tracing::trace!("Assigned id {} to {}", current, backing);
        *current
    }

    /// Drops every cached record. Identifier assignments are kept.
    pub fn clear_records(&self) {
        self.records.borrow_mut().clear();
    }

    /// Forgets fingerprint → id assignments. Sequences keep counting, so ids are not reused.
    pub fn reset_ids(&self) {
        self.ids.borrow_mut().clear();
    }

    pub fn cached_len(&self) -> usize {
        self.records.borrow().len()
    }
}
