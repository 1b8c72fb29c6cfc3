//! Tag name resolution and reverse lookup of valid identifiers.
//!
//! # Responsibility
//! - Hold the current tag definition source and allow it to be replaced.
//! - Resolve tags and enumerated field values to display names.
//!
//! # Invariants
//! - Caches are keyed by source identity (`Arc::ptr_eq`), never by content.
//! - Rebuilds swap in a fully built map; readers never see a partial map.
//! - A resolve answers from the map built for the source it loaded, even when
//!   another registry swaps the cache concurrently.
//! - Name resolution never fails: unknown values fall back to their text.

use crate::physical::element::Tag;
use crate::registry::definitions::{Identifier, TagDefinition, TagDefinitionResult, TagDefinitions};
use arc_swap::ArcSwap;
use log::{debug, error, warn};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fmt::Display;
use std::hash::Hash;
use std::str::FromStr;
use std::sync::Arc;

static SHARED_REGISTRY: Lazy<TagRegistry> = Lazy::new(|| {
    TagRegistry::with_builtin().unwrap_or_else(|err| {
        error!("event=registry_init module=registry status=error error={err}");
        TagRegistry::new(TagDefinitions::default())
    })
});

/// Replaceable tag definition source.
pub struct TagRegistry {
    source: ArcSwap<TagDefinitions>,
}

impl TagRegistry {
    pub fn new(definitions: TagDefinitions) -> Self {
        Self {
            source: ArcSwap::from_pointee(definitions),
        }
    }

    pub fn with_builtin() -> TagDefinitionResult<Self> {
        Ok(Self::new(TagDefinitions::builtin()?))
    }

    /// Process-wide registry over the embedded definitions, built on first use.
    pub fn shared() -> &'static TagRegistry {
        &SHARED_REGISTRY
    }

    /// Current source. Its identity changes whenever the source is replaced.
    pub fn source(&self) -> Arc<TagDefinitions> {
        self.source.load_full()
    }

    /// Installs a new source and returns it.
    pub fn replace_source(&self, definitions: TagDefinitions) -> Arc<TagDefinitions> {
        let replacement = Arc::new(definitions);
        debug!(
            "event=registry_replace module=registry status=ok tags={}",
            replacement.len()
        );
        self.source.store(Arc::clone(&replacement));
        replacement
    }

    pub fn resolve(&self, tag: Tag) -> Option<TagDefinition> {
        self.source.load().get(tag).cloned()
    }

    /// Tag name, or the tag's canonical text when unknown.
    pub fn display_name(&self, tag: Tag) -> String {
        match self.source.load().get(tag) {
            Some(definition) => definition.name.clone(),
            None => tag.to_string(),
        }
    }
}

struct LookupCache<K> {
    source: Option<Arc<TagDefinitions>>,
    identifiers: HashMap<K, Identifier>,
}

/// Reverse lookup from a field value to its named valid identifier.
///
/// `K` is the field's value type, e.g. `Uuid` for id-valued tags or `u32`
/// for integer enumerations.
pub struct IdentifierLookup<K> {
    key_tag: Tag,
    cache: ArcSwap<LookupCache<K>>,
}

impl<K> IdentifierLookup<K>
where
    K: FromStr + Eq + Hash,
{
    pub fn new(key_tag: Tag) -> Self {
        Self {
            key_tag,
            cache: ArcSwap::from_pointee(LookupCache {
                source: None,
                identifiers: HashMap::new(),
            }),
        }
    }

    pub fn key_tag(&self) -> Tag {
        self.key_tag
    }

    /// Rebuilds the lookup when `source` is not the one it was built from.
    ///
    /// Returns `true` when a rebuild happened.
    pub fn refresh_if_source_changed(&self, source: &Arc<TagDefinitions>) -> bool {
        self.cache_for(source).1
    }

    pub fn resolve(&self, registry: &TagRegistry, value: &K) -> Option<Identifier> {
        let (cache, _) = self.cache_for(&registry.source());
        cache.identifiers.get(value).cloned()
    }

    /// Cache built from `source`, plus whether it had to be rebuilt.
    fn cache_for(&self, source: &Arc<TagDefinitions>) -> (Arc<LookupCache<K>>, bool) {
        let current = self.cache.load_full();
        if current
            .source
            .as_ref()
            .is_some_and(|built_from| Arc::ptr_eq(built_from, source))
        {
            return (current, false);
        }

        let identifiers = self.build(source);
        debug!(
            "event=identifier_lookup_rebuild module=registry key_tag={} identifiers={}",
            self.key_tag,
            identifiers.len()
        );
        let rebuilt = Arc::new(LookupCache {
            source: Some(Arc::clone(source)),
            identifiers,
        });
        self.cache.store(Arc::clone(&rebuilt));
        (rebuilt, true)
    }

    /// Identifier name, or the value's text when it is not a valid identifier.
    pub fn display_name(&self, registry: &TagRegistry, value: &K) -> String
    where
        K: Display,
    {
        self.resolve(registry, value)
            .map(|identifier| identifier.name)
            .unwrap_or_else(|| value.to_string())
    }

    fn build(&self, source: &TagDefinitions) -> HashMap<K, Identifier> {
        let Some(definition) = source.get(self.key_tag) else {
            return HashMap::new();
        };

        let mut identifiers = HashMap::with_capacity(definition.valid_identifiers.len());
        for identifier in &definition.valid_identifiers {
            match identifier.value.trim().parse::<K>() {
                Ok(key) => {
                    identifiers.insert(key, identifier.clone());
                }
                Err(_) => warn!(
                    "event=identifier_skipped module=registry key_tag={} name={} value={}",
                    self.key_tag, identifier.name, identifier.value
                ),
            }
        }
        identifiers
    }
}
