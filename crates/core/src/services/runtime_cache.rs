//! Runtime spec cache.
//!
//! Fetches versioned runtime metadata on demand, decodes it once and keeps
//! it for the lifetime of the process. Concrete versions are immutable on
//! chain, so a cached entry is never refetched. `latest` is a moving
//! target and always goes to the backend.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, instrument, trace};

use crate::error::{DataError, DataResult, DomainError};
use crate::metrics::{record_cache_hits, record_cache_misses, record_metadata_decode};
use crate::models::{NeedsRuntimeSpec, RuntimeSpec, SpecVersion};
use crate::ports::{ItemsResponse, MetadataDecoder, RawRuntimeSpec, RuntimeSpecSource};

/// Process-wide store of decoded runtime specs, keyed by concrete version.
///
/// There is no eviction. A chain only ever has a few dozen spec versions,
/// so the map stays small.
pub struct RuntimeSpecCache {
    source: Arc<dyn RuntimeSpecSource>,
    decoder: Arc<dyn MetadataDecoder>,
    specs: RwLock<HashMap<u32, Arc<RuntimeSpec>>>,
}

impl RuntimeSpecCache {
    pub fn new(source: Arc<dyn RuntimeSpecSource>, decoder: Arc<dyn MetadataDecoder>) -> Self {
        Self {
            source,
            decoder,
            specs: RwLock::new(HashMap::new()),
        }
    }

    /// Concrete versions currently cached, ascending.
    pub fn cached_versions(&self) -> Vec<u32> {
        let specs = self.specs.read().unwrap_or_else(PoisonError::into_inner);
        let mut versions: Vec<u32> = specs.keys().copied().collect();
        versions.sort_unstable();
        versions
    }

    /// Resolve a single spec version.
    pub async fn get_spec(&self, version: SpecVersion) -> DataResult<Arc<RuntimeSpec>> {
        let mut specs = self.get_specs(&[version]).await?;
        specs
            .remove(&version)
            .ok_or_else(|| DomainError::SpecNotFound(version).into())
    }

    /// Resolve several spec versions at once.
    ///
    /// Cached versions are served locally; every other concrete version is
    /// fetched in a single batched query, concurrently with `latest` when
    /// it is requested. Any version the backend does not return, or any
    /// payload that fails to decode, fails the whole call.
    #[instrument(skip_all, fields(requested = versions.len()))]
    pub async fn get_specs(
        &self,
        versions: &[SpecVersion],
    ) -> DataResult<HashMap<SpecVersion, Arc<RuntimeSpec>>> {
        let wanted: BTreeSet<SpecVersion> = versions.iter().copied().collect();
        let wants_latest = wanted.contains(&SpecVersion::Latest);

        let mut resolved = HashMap::with_capacity(wanted.len());
        let mut missing = Vec::new();
        {
            let specs = self.specs.read().unwrap_or_else(PoisonError::into_inner);
            for version in wanted.iter().filter_map(SpecVersion::as_concrete) {
                match specs.get(&version) {
                    Some(spec) => {
                        resolved.insert(SpecVersion::Version(version), Arc::clone(spec));
                    }
                    None => missing.push(version),
                }
            }
        }

        record_cache_hits(resolved.len() as u64);
        record_cache_misses(missing.len() as u64);
        trace!(hits = resolved.len(), misses = missing.len(), wants_latest, "Spec cache lookup");

        let latest = async {
            if wants_latest {
                self.fetch_latest().await.map(Some)
            } else {
                Ok(None)
            }
        };
        let batch = async {
            if missing.is_empty() {
                Ok(Vec::new())
            } else {
                self.fetch_batch(&missing).await
            }
        };
        let (latest, fetched) = futures::try_join!(latest, batch)?;

        if let Some(spec) = latest {
            resolved.insert(SpecVersion::Latest, spec);
        }
        for (version, spec) in fetched {
            resolved.insert(SpecVersion::Version(version), spec);
        }

        Ok(resolved)
    }

    /// Attach the matching runtime spec to every item, keeping input order.
    pub async fn attach_specs<T: NeedsRuntimeSpec>(&self, mut items: Vec<T>) -> DataResult<Vec<T>> {
        if items.is_empty() {
            return Ok(items);
        }

        let versions: Vec<SpecVersion> = items.iter().map(NeedsRuntimeSpec::spec_version).collect();
        let specs = self.get_specs(&versions).await?;

        for item in &mut items {
            let version = item.spec_version();
            let spec = specs
                .get(&version)
                .cloned()
                .ok_or(DomainError::SpecNotFound(version))?;
            item.set_runtime_spec(spec);
        }

        Ok(items)
    }

    /// Attach the matching runtime spec to a single item.
    pub async fn attach_spec<T: NeedsRuntimeSpec>(&self, mut item: T) -> DataResult<T> {
        let spec = self.get_spec(item.spec_version()).await?;
        item.set_runtime_spec(spec);
        Ok(item)
    }

    /// Attach runtime specs to every item of a page.
    pub async fn attach_page<T: NeedsRuntimeSpec>(
        &self,
        page: ItemsResponse<T>,
    ) -> DataResult<ItemsResponse<T>> {
        let ItemsResponse { data, pagination } = page;
        let data = self.attach_specs(data).await?;
        Ok(ItemsResponse { data, pagination })
    }

    /// Every spec version known to the backend, newest first.
    pub async fn spec_versions(&self) -> DataResult<Vec<u32>> {
        self.source.spec_versions().await
    }

    async fn fetch_latest(&self) -> DataResult<Arc<RuntimeSpec>> {
        let raw = self.source.latest_spec().await?;
        debug!(version = raw.spec_version, "Fetched latest runtime spec");
        Ok(Arc::new(self.decode(raw)?))
    }

    async fn fetch_batch(&self, versions: &[u32]) -> DataResult<Vec<(u32, Arc<RuntimeSpec>)>> {
        debug!(?versions, "Fetching runtime specs");
        let raws = self.source.specs(versions).await?;
        let mut by_version: HashMap<u32, RawRuntimeSpec> =
            raws.into_iter().map(|raw| (raw.spec_version, raw)).collect();

        let mut fetched = Vec::with_capacity(versions.len());
        for &version in versions {
            let raw = by_version
                .remove(&version)
                .ok_or(DomainError::SpecNotFound(SpecVersion::Version(version)))?;
            let spec = self.decode(raw)?;
            fetched.push((version, self.insert(spec)));
        }
        Ok(fetched)
    }

    fn decode(&self, raw: RawRuntimeSpec) -> DataResult<RuntimeSpec> {
        let metadata = self
            .decoder
            .decode(&raw.hex)
            .map_err(|source| DataError::Metadata {
                version: raw.spec_version,
                source,
            })?;
        record_metadata_decode();

        Ok(RuntimeSpec {
            id: raw.id,
            spec_name: raw.spec_name,
            spec_version: raw.spec_version,
            block_height: raw.block_height,
            block_hash: raw.block_hash,
            metadata,
        })
    }

    /// Store a decoded spec. A concurrent miss may have stored the same
    /// version first; the existing entry is kept.
    fn insert(&self, spec: RuntimeSpec) -> Arc<RuntimeSpec> {
        let mut specs = self.specs.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(
            specs
                .entry(spec.spec_version)
                .or_insert_with(|| Arc::new(spec)),
        )
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::error::{MetadataError, MetadataResult};
    use crate::models::{DecodedMetadata, PalletDef};

    #[derive(Default)]
    struct CountingSource {
        known: Vec<u32>,
        latest: u32,
        batches: Mutex<Vec<Vec<u32>>>,
        latest_calls: Mutex<u32>,
    }

    impl CountingSource {
        fn new(known: &[u32], latest: u32) -> Self {
            Self {
                known: known.to_vec(),
                latest,
                ..Default::default()
            }
        }

        fn raw(version: u32) -> RawRuntimeSpec {
            RawRuntimeSpec {
                id: format!("spec-{version}"),
                spec_name: Some("node".into()),
                spec_version: version,
                block_height: u64::from(version) * 1000,
                block_hash: None,
                hex: if version == 13 { "bad".into() } else { format!("0x{version:02x}") },
            }
        }

        fn batches(&self) -> Vec<Vec<u32>> {
            self.batches.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl RuntimeSpecSource for CountingSource {
        async fn latest_spec(&self) -> DataResult<RawRuntimeSpec> {
            *self.latest_calls.lock().unwrap() += 1;
            Ok(Self::raw(self.latest))
        }

        async fn specs(&self, versions: &[u32]) -> DataResult<Vec<RawRuntimeSpec>> {
            self.batches.lock().unwrap().push(versions.to_vec());
            Ok(versions
                .iter()
                .filter(|v| self.known.contains(v))
                .map(|v| Self::raw(*v))
                .collect())
        }

        async fn spec_versions(&self) -> DataResult<Vec<u32>> {
            let mut versions = self.known.clone();
            versions.sort_unstable_by(|a, b| b.cmp(a));
            Ok(versions)
        }
    }

    struct FakeDecoder;

    impl MetadataDecoder for FakeDecoder {
        fn decode(&self, hex: &str) -> MetadataResult<DecodedMetadata> {
            if !hex.starts_with("0x") {
                return Err(MetadataError::Hex(hex.to_string()));
            }
            Ok(DecodedMetadata {
                pallets: vec![PalletDef {
                    name: format!("Pallet{hex}"),
                    calls: vec![],
                    events: vec![],
                }],
            })
        }
    }

    struct Item {
        version: SpecVersion,
        spec: Option<Arc<RuntimeSpec>>,
    }

    impl NeedsRuntimeSpec for Item {
        fn spec_version(&self) -> SpecVersion {
            self.version
        }

        fn set_runtime_spec(&mut self, spec: Arc<RuntimeSpec>) {
            self.spec = Some(spec);
        }
    }

    fn cache(source: &Arc<CountingSource>) -> RuntimeSpecCache {
        RuntimeSpecCache::new(source.clone(), Arc::new(FakeDecoder))
    }

    // Test critique: 100 items sur 3 versions = un seul fetch groupé
    #[tokio::test]
    async fn attach_specs_issues_one_batched_fetch() {
        let source = Arc::new(CountingSource::new(&[1, 2, 3], 3));
        let cache = cache(&source);
        let items: Vec<Item> = (0..100)
            .map(|i| Item {
                version: SpecVersion::Version(i % 3 + 1),
                spec: None,
            })
            .collect();

        let items = cache.attach_specs(items).await.unwrap();

        let batches = source.batches();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 3);
        for (i, item) in items.iter().enumerate() {
            let spec = item.spec.as_ref().unwrap();
            assert_eq!(spec.spec_version, i as u32 % 3 + 1);
        }
    }

    #[tokio::test]
    async fn cached_versions_are_never_refetched() {
        let source = Arc::new(CountingSource::new(&[7, 8], 8));
        let cache = cache(&source);

        let first = cache.get_spec(SpecVersion::Version(7)).await.unwrap();
        let again = cache.get_spec(SpecVersion::Version(7)).await.unwrap();
        assert!(Arc::ptr_eq(&first, &again));

        cache
            .get_specs(&[SpecVersion::Version(7), SpecVersion::Version(8)])
            .await
            .unwrap();

        assert_eq!(source.batches(), vec![vec![7], vec![8]]);
        assert_eq!(cache.cached_versions(), vec![7, 8]);
    }

    // Test critique: "latest" n'occupe jamais le slot d'une version concrète
    #[tokio::test]
    async fn latest_is_fetched_fresh_and_never_cached() {
        let source = Arc::new(CountingSource::new(&[5], 5));
        let cache = cache(&source);

        let specs = cache
            .get_specs(&[SpecVersion::Latest, SpecVersion::Latest])
            .await
            .unwrap();
        assert_eq!(specs.len(), 1);
        cache.get_spec(SpecVersion::Latest).await.unwrap();

        assert_eq!(*source.latest_calls.lock().unwrap(), 2);
        assert!(cache.cached_versions().is_empty());

        // The concrete slot is filled by its own fetch.
        let specs = cache
            .get_specs(&[SpecVersion::Latest, SpecVersion::Version(5)])
            .await
            .unwrap();
        assert_eq!(specs.len(), 2);
        assert_eq!(source.batches(), vec![vec![5]]);
        assert_eq!(cache.cached_versions(), vec![5]);
    }

    #[tokio::test]
    async fn missing_version_fails_the_batch() {
        let source = Arc::new(CountingSource::new(&[1], 1));
        let cache = cache(&source);

        let err = cache
            .get_specs(&[SpecVersion::Version(1), SpecVersion::Version(99)])
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DataError::Domain(DomainError::SpecNotFound(SpecVersion::Version(99)))
        ));
    }

    #[tokio::test]
    async fn decode_failure_reports_the_version() {
        let source = Arc::new(CountingSource::new(&[13], 13));
        let cache = cache(&source);

        let err = cache.get_spec(SpecVersion::Version(13)).await.unwrap_err();

        assert!(matches!(err, DataError::Metadata { version: 13, .. }));
        assert!(cache.cached_versions().is_empty());
    }

    #[tokio::test]
    async fn empty_input_makes_no_request() {
        let source = Arc::new(CountingSource::new(&[1], 1));
        let cache = cache(&source);

        let items: Vec<Item> = cache.attach_specs(Vec::new()).await.unwrap();

        assert!(items.is_empty());
        assert!(source.batches().is_empty());
        assert_eq!(*source.latest_calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn spec_versions_passthrough() {
        let source = Arc::new(CountingSource::new(&[1, 3, 2], 3));
        let cache = cache(&source);

        assert_eq!(cache.spec_versions().await.unwrap(), vec![3, 2, 1]);
    }
}
