//! Loading review configuration per project scope.
//!
//! [`RepositoryConfigurationLoader`] reads the configuration file from the
//! versioned repository under the system identity. [`CachingConfigurationLoader`]
//! wraps any loader and keeps the first successful result per scope for its
//! own lifetime.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use codereview_models::ProjectId;
use tracing::{debug, error, info};

use crate::config::{ReviewConfiguration, CONFIG_PATH};
use crate::context::{RepositoryReader, ScopeLocator, SystemAccess};
use crate::error::{Result, ReviewError};
use crate::properties::Properties;

/// Loads the review configuration of a project scope.
pub trait ConfigurationLoader: Send + Sync {
    /// Returns the configuration of `scope`.
    fn load(&self, scope: &ProjectId) -> Result<Arc<ReviewConfiguration>>;
}

impl<L: ConfigurationLoader + ?Sized> ConfigurationLoader for Arc<L> {
    fn load(&self, scope: &ProjectId) -> Result<Arc<ReviewConfiguration>> {
        (**self).load(scope)
    }
}

/// Reads `.polarion/codereview/codereview.properties` below the scope root.
///
/// This loader is the only holder of the [`SystemAccess`] capability: the
/// configuration is readable regardless of the requesting user's rights.
pub struct RepositoryConfigurationLoader {
    locator: Arc<dyn ScopeLocator>,
    reader: Arc<dyn RepositoryReader>,
    system: Arc<dyn SystemAccess>,
}

impl RepositoryConfigurationLoader {
    /// Creates a loader from its collaborators.
    pub fn new(
        locator: Arc<dyn ScopeLocator>,
        reader: Arc<dyn RepositoryReader>,
        system: Arc<dyn SystemAccess>,
    ) -> Self {
        Self {
            locator,
            reader,
            system,
        }
    }
}

impl ConfigurationLoader for RepositoryConfigurationLoader {
    fn load(&self, scope: &ProjectId) -> Result<Arc<ReviewConfiguration>> {
        let location = self.locator.scope_root(scope)?.append(CONFIG_PATH);

        let reader = &self.reader;
        let content = self
            .system
            .run_as_system(&mut || reader.read(&location))
            .map_err(|e| {
                error!(location = %location, error = %e, "unexpected error while reading review configuration");
                if matches!(e, ReviewError::ConfigurationRead { .. }) {
                    return e;
                }
                ReviewError::ConfigurationRead {
                    location: location.clone(),
                    message: e.to_string(),
                }
            })?;

        let configuration = Properties::from_latin1(&content)
            .and_then(|properties| ReviewConfiguration::from_properties(&properties))
            .map_err(|e| {
                error!(location = %location, error = %e, "invalid review configuration");
                e
            })?;

        info!(scope = %scope, location = %location, "loaded review configuration");
        Ok(Arc::new(configuration))
    }
}

/// Memoizes a loader per project scope.
///
/// # Concurrency Pattern: `RwLock<HashMap>`
///
/// Lookups take the read lock; a miss loads without holding any lock and
/// then inserts under the write lock. Two threads missing the same scope
/// concurrently both load, and the first insert wins. Failed loads are not
/// cached. Entries are never invalidated.
pub struct CachingConfigurationLoader<L> {
    inner: L,
    cache: RwLock<HashMap<ProjectId, Arc<ReviewConfiguration>>>,
}

impl<L: ConfigurationLoader> CachingConfigurationLoader<L> {
    /// Wraps `inner` with a per-scope cache.
    pub fn new(inner: L) -> Self {
        Self {
            inner,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the number of cached scopes.
    pub fn cached_scopes(&self) -> usize {
        self.cache.read().map(|c| c.len()).unwrap_or(0)
    }
}

impl<L: ConfigurationLoader> ConfigurationLoader for CachingConfigurationLoader<L> {
    fn load(&self, scope: &ProjectId) -> Result<Arc<ReviewConfiguration>> {
        {
            let cache = self
                .cache
                .read()
                .map_err(|e| ReviewError::LockPoisoned(e.to_string()))?;
            if let Some(configuration) = cache.get(scope) {
                debug!(scope = %scope, "review configuration cache hit");
                return Ok(configuration.clone());
            }
        }

        debug!(scope = %scope, "review configuration cache miss");
        let loaded = self.inner.load(scope)?;

        let mut cache = self
            .cache
            .write()
            .map_err(|e| ReviewError::LockPoisoned(e.to_string()))?;
        Ok(cache.entry(scope.clone()).or_insert(loaded).clone())
    }
}

/// Wraps `loader` with a per-scope cache.
pub fn caching<L: ConfigurationLoader>(loader: L) -> CachingConfigurationLoader<L> {
    CachingConfigurationLoader::new(loader)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Location;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::thread;

    /// Repository double that only serves content while elevated.
    struct GuardedRepository {
        files: HashMap<String, Vec<u8>>,
        elevated: Arc<AtomicBool>,
        reads: AtomicUsize,
    }

    impl RepositoryReader for GuardedRepository {
        fn read(&self, location: &Location) -> Result<Vec<u8>> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            if !self.elevated.load(Ordering::SeqCst) {
                return Err(ReviewError::Security("permission denied".to_string()));
            }
            self.files
                .get(location.as_str())
                .cloned()
                .ok_or_else(|| ReviewError::ItemStore(format!("no such location {}", location)))
        }
    }

    struct Elevation {
        elevated: Arc<AtomicBool>,
    }

    impl SystemAccess for Elevation {
        fn run_as_system(&self, action: &mut dyn FnMut() -> Result<Vec<u8>>) -> Result<Vec<u8>> {
            self.elevated.store(true, Ordering::SeqCst);
            let result = action();
            self.elevated.store(false, Ordering::SeqCst);
            result
        }
    }

    struct RootPerProject;

    impl ScopeLocator for RootPerProject {
        fn scope_root(&self, scope: &ProjectId) -> Result<Location> {
            Ok(Location::new(format!("/{}", scope)))
        }
    }

    fn loader(files: &[(&str, &str)]) -> (RepositoryConfigurationLoader, Arc<GuardedRepository>) {
        let elevated = Arc::new(AtomicBool::new(false));
        let repository = Arc::new(GuardedRepository {
            files: files
                .iter()
                .map(|(k, v)| (k.to_string(), v.as_bytes().to_vec()))
                .collect(),
            elevated: elevated.clone(),
            reads: AtomicUsize::new(0),
        });
        let loader = RepositoryConfigurationLoader::new(
            Arc::new(RootPerProject),
            repository.clone(),
            Arc::new(Elevation { elevated }),
        );
        (loader, repository)
    }

    #[test]
    fn test_loads_under_system_identity() {
        let (loader, _) = loader(&[(
            "/elibrary/.polarion/codereview/codereview.properties",
            "reviewerRole=reviewer\nfastTrackPermittedLocationPattern=.*\n",
        )]);

        let config = loader.load(&"elibrary".into()).unwrap();
        assert_eq!(config.reviewer_role(), Some("reviewer"));
    }

    #[test]
    fn test_missing_file_is_configuration_read_error() {
        let (loader, _) = loader(&[]);
        let result = loader.load(&"elibrary".into());
        assert!(matches!(result, Err(ReviewError::ConfigurationRead { .. })));
    }

    #[test]
    fn test_missing_pattern_propagates() {
        let (loader, _) = loader(&[(
            "/elibrary/.polarion/codereview/codereview.properties",
            "reviewerRole=reviewer\n",
        )]);
        let result = loader.load(&"elibrary".into());
        assert!(matches!(result, Err(ReviewError::MissingFastTrackPattern)));
    }

    /// Loader double counting calls and failing for scopes named `broken`.
    struct CountingLoader {
        calls: Mutex<Vec<ProjectId>>,
    }

    impl ConfigurationLoader for CountingLoader {
        fn load(&self, scope: &ProjectId) -> Result<Arc<ReviewConfiguration>> {
            self.calls.lock().unwrap().push(scope.clone());
            if scope.as_str() == "broken" {
                return Err(ReviewError::MissingFastTrackPattern);
            }
            Ok(Arc::new(
                ReviewConfiguration::parse(&format!(
                    "reviewerRole={}\nfastTrackPermittedLocationPattern=.*",
                    scope
                ))
                .unwrap(),
            ))
        }
    }

    #[test]
    fn test_caching_loads_once_per_scope() {
        let cached = caching(CountingLoader {
            calls: Mutex::new(Vec::new()),
        });

        let a1 = cached.load(&"a".into()).unwrap();
        let a2 = cached.load(&"a".into()).unwrap();
        let b = cached.load(&"b".into()).unwrap();

        assert!(Arc::ptr_eq(&a1, &a2));
        assert_eq!(b.reviewer_role(), Some("b"));
        assert_eq!(cached.inner.calls.lock().unwrap().len(), 2);
        assert_eq!(cached.cached_scopes(), 2);
    }

    #[test]
    fn test_caching_does_not_keep_failures() {
        let cached = caching(CountingLoader {
            calls: Mutex::new(Vec::new()),
        });

        assert!(cached.load(&"broken".into()).is_err());
        assert!(cached.load(&"broken".into()).is_err());

        assert_eq!(cached.inner.calls.lock().unwrap().len(), 2);
        assert_eq!(cached.cached_scopes(), 0);
    }

    #[test]
    fn test_caching_is_thread_safe() {
        let cached = Arc::new(caching(CountingLoader {
            calls: Mutex::new(Vec::new()),
        }));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let c = cached.clone();
                thread::spawn(move || {
                    let scope = ProjectId::from(format!("p{}", i % 2));
                    c.load(&scope).unwrap().reviewer_role().map(str::to_string)
                })
            })
            .collect();

        for handle in handles {
            assert!(handle.join().unwrap().is_some());
        }
        assert_eq!(cached.cached_scopes(), 2);
    }

    #[test]
    fn test_repository_is_only_read_while_elevated() {
        let (loader, repository) = loader(&[(
            "/elibrary/.polarion/codereview/codereview.properties",
            "fastTrackPermittedLocationPattern=.*\n",
        )]);
        loader.load(&"elibrary".into()).unwrap();

        assert_eq!(repository.reads.load(Ordering::SeqCst), 1);
        assert!(repository.read(&Location::new("/elibrary/x")).is_err());
    }
}
