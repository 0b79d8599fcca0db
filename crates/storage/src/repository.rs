use async_trait::async_trait;
use cardak_core::model::{
    ForumPost, NewPhoto, NewPost, Photo, PhotoId, PostId, ResultId, Test, TestId, TestResult,
    ValidatedTest,
};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use url::Url;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("invalid asset path: {0}")]
    InvalidAssetPath(String),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Header of a stored test, used for listings without loading questions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestListing {
    pub id: TestId,
    pub title: String,
    pub description: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub question_count: u32,
}

impl TestListing {
    #[must_use]
    pub fn from_test(test: &Test) -> Self {
        Self {
            id: test.id(),
            title: test.title().to_owned(),
            description: test.description().to_owned(),
            created_by: test.created_by().to_owned(),
            created_at: test.created_at(),
            question_count: u32::try_from(test.questions().len()).unwrap_or(u32::MAX),
        }
    }
}

/// A persisted result with its storage id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestResultRow {
    pub id: ResultId,
    pub result: TestResult,
}

//
// ─── REPOSITORY CONTRACTS ──────────────────────────────────────────────────────
//

#[async_trait]
pub trait TestRepository: Send + Sync {
    /// Store a validated test with its questions and options, in order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the test cannot be stored.
    async fn insert_test(&self, test: &ValidatedTest) -> Result<TestId, StorageError>;

    /// Fetch a test with all of its questions.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_test(&self, id: TestId) -> Result<Test, StorageError>;

    /// Newest tests first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_tests(&self, limit: u32) -> Result<Vec<TestListing>, StorageError>;
}

#[async_trait]
pub trait ResultRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the result cannot be stored.
    async fn append_result(&self, result: &TestResult) -> Result<ResultId, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_result(&self, id: ResultId) -> Result<TestResult, StorageError>;

    /// Results for one test, most recently completed first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_results(
        &self,
        test_id: TestId,
        limit: u32,
    ) -> Result<Vec<TestResultRow>, StorageError>;
}

#[async_trait]
pub trait PhotoRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the photo metadata cannot be stored.
    async fn insert_photo(&self, photo: &NewPhoto) -> Result<PhotoId, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_photo(&self, id: PhotoId) -> Result<Photo, StorageError>;

    /// Newest uploads first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_photos(&self, limit: u32) -> Result<Vec<Photo>, StorageError>;

    /// Atomically add one like and return the new count.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the photo does not exist.
    async fn like_photo(&self, id: PhotoId) -> Result<u32, StorageError>;
}

#[async_trait]
pub trait ForumRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the post cannot be stored.
    async fn insert_post(&self, post: &NewPost) -> Result<PostId, StorageError>;

    /// Newest posts first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_posts(&self, limit: u32) -> Result<Vec<ForumPost>, StorageError>;
}

/// Blob storage addressed by `bucket/path`, served under a public base url.
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Store bytes at `bucket/path` and return the public url.
    ///
    /// Uploads never overwrite.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the key exists and
    /// `StorageError::InvalidAssetPath` for malformed keys.
    async fn upload_asset(&self, bucket: &str, path: &str, bytes: &[u8])
    -> Result<Url, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if no asset is stored at the key.
    async fn fetch_asset(&self, bucket: &str, path: &str) -> Result<Vec<u8>, StorageError>;
}

/// The full persistence capability set the application relies on.
///
/// Any backend implementing every repository contract is a gateway.
pub trait Gateway:
    TestRepository + ResultRepository + PhotoRepository + ForumRepository + AssetStore
{
}

impl<T> Gateway for T where
    T: TestRepository + ResultRepository + PhotoRepository + ForumRepository + AssetStore
{
}

//
// ─── ASSET KEYS ────────────────────────────────────────────────────────────────
//

pub(crate) fn asset_key(bucket: &str, path: &str) -> Result<String, StorageError> {
    let valid_segment = |s: &str| !s.is_empty() && s != "." && s != ".." && !s.contains('\\');
    if !valid_segment(bucket) || bucket.contains('/') {
        return Err(StorageError::InvalidAssetPath(bucket.to_owned()));
    }
    if !path.split('/').all(valid_segment) {
        return Err(StorageError::InvalidAssetPath(path.to_owned()));
    }
    Ok(format!("{bucket}/{path}"))
}

pub(crate) fn public_url(base: &Url, key: &str) -> Result<Url, StorageError> {
    base.join(key)
        .map_err(|e| StorageError::Serialization(e.to_string()))
}

/// Makes `base` usable with `Url::join` by ensuring a trailing slash.
#[must_use]
pub fn normalize_asset_base(mut base: Url) -> Url {
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base
}

//
// ─── IN-MEMORY BACKEND ─────────────────────────────────────────────────────────
//

/// Simple in-memory gateway for testing and prototyping.
#[derive(Clone)]
pub struct InMemoryRepository {
    tests: Arc<Mutex<BTreeMap<TestId, Test>>>,
    results: Arc<Mutex<BTreeMap<ResultId, TestResult>>>,
    photos: Arc<Mutex<BTreeMap<PhotoId, Photo>>>,
    posts: Arc<Mutex<BTreeMap<PostId, ForumPost>>>,
    assets: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    asset_base: Url,
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRepository {
    /// # Panics
    ///
    /// Never in practice; the built-in asset base is a valid url.
    #[must_use]
    pub fn new() -> Self {
        Self::with_asset_base(Url::parse("memory://assets/").expect("static url is valid"))
    }

    #[must_use]
    pub fn with_asset_base(asset_base: Url) -> Self {
        Self {
            tests: Arc::default(),
            results: Arc::default(),
            photos: Arc::default(),
            posts: Arc::default(),
            assets: Arc::default(),
            asset_base: normalize_asset_base(asset_base),
        }
    }
}

fn lock<T>(m: &Mutex<T>) -> Result<std::sync::MutexGuard<'_, T>, StorageError> {
    m.lock().map_err(|e| StorageError::Connection(e.to_string()))
}

fn next_key<K: Copy, V>(map: &BTreeMap<K, V>, value: impl Fn(K) -> u64) -> u64 {
    map.keys().next_back().map_or(1, |k| value(*k) + 1)
}

fn take_limit<T>(items: impl Iterator<Item = T>, limit: u32) -> Vec<T> {
    items
        .take(usize::try_from(limit).unwrap_or(usize::MAX))
        .collect()
}

#[async_trait]
impl TestRepository for InMemoryRepository {
    async fn insert_test(&self, test: &ValidatedTest) -> Result<TestId, StorageError> {
        let mut guard = lock(&self.tests)?;
        let id = TestId::new(next_key(&guard, |k: TestId| k.value()));
        guard.insert(id, test.clone().assign_id(id));
        Ok(id)
    }

    async fn get_test(&self, id: TestId) -> Result<Test, StorageError> {
        let guard = lock(&self.tests)?;
        guard.get(&id).cloned().ok_or(StorageError::NotFound)
    }

    async fn list_tests(&self, limit: u32) -> Result<Vec<TestListing>, StorageError> {
        let guard = lock(&self.tests)?;
        let mut tests: Vec<&Test> = guard.values().collect();
        tests.sort_by(|a, b| {
            b.created_at()
                .cmp(&a.created_at())
                .then_with(|| b.id().cmp(&a.id()))
        });
        Ok(take_limit(
            tests.into_iter().map(TestListing::from_test),
            limit,
        ))
    }
}

#[async_trait]
impl ResultRepository for InMemoryRepository {
    async fn append_result(&self, result: &TestResult) -> Result<ResultId, StorageError> {
        let mut guard = lock(&self.results)?;
        let id = ResultId::new(next_key(&guard, |k: ResultId| k.value()));
        guard.insert(id, result.clone());
        Ok(id)
    }

    async fn get_result(&self, id: ResultId) -> Result<TestResult, StorageError> {
        let guard = lock(&self.results)?;
        guard.get(&id).cloned().ok_or(StorageError::NotFound)
    }

    async fn list_results(
        &self,
        test_id: TestId,
        limit: u32,
    ) -> Result<Vec<TestResultRow>, StorageError> {
        let guard = lock(&self.results)?;
        let mut rows: Vec<TestResultRow> = guard
            .iter()
            .filter(|(_, r)| r.test_id() == test_id)
            .map(|(id, r)| TestResultRow {
                id: *id,
                result: r.clone(),
            })
            .collect();
        rows.sort_by(|a, b| {
            b.result
                .completed_at()
                .cmp(&a.result.completed_at())
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(take_limit(rows.into_iter(), limit))
    }
}

#[async_trait]
impl PhotoRepository for InMemoryRepository {
    async fn insert_photo(&self, photo: &NewPhoto) -> Result<PhotoId, StorageError> {
        let mut guard = lock(&self.photos)?;
        let id = PhotoId::new(next_key(&guard, |k: PhotoId| k.value()));
        guard.insert(id, photo.clone().assign_id(id));
        Ok(id)
    }

    async fn get_photo(&self, id: PhotoId) -> Result<Photo, StorageError> {
        let guard = lock(&self.photos)?;
        guard.get(&id).cloned().ok_or(StorageError::NotFound)
    }

    async fn list_photos(&self, limit: u32) -> Result<Vec<Photo>, StorageError> {
        let guard = lock(&self.photos)?;
        let mut photos: Vec<Photo> = guard.values().cloned().collect();
        photos.sort_by(|a, b| {
            b.uploaded_at
                .cmp(&a.uploaded_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(take_limit(photos.into_iter(), limit))
    }

    async fn like_photo(&self, id: PhotoId) -> Result<u32, StorageError> {
        let mut guard = lock(&self.photos)?;
        let photo = guard.get_mut(&id).ok_or(StorageError::NotFound)?;
        photo.like();
        Ok(photo.likes)
    }
}

#[async_trait]
impl ForumRepository for InMemoryRepository {
    async fn insert_post(&self, post: &NewPost) -> Result<PostId, StorageError> {
        let mut guard = lock(&self.posts)?;
        let id = PostId::new(next_key(&guard, |k: PostId| k.value()));
        guard.insert(id, post.clone().assign_id(id));
        Ok(id)
    }

    async fn list_posts(&self, limit: u32) -> Result<Vec<ForumPost>, StorageError> {
        let guard = lock(&self.posts)?;
        let mut posts: Vec<ForumPost> = guard.values().cloned().collect();
        posts.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(take_limit(posts.into_iter(), limit))
    }
}

#[async_trait]
impl AssetStore for InMemoryRepository {
    async fn upload_asset(
        &self,
        bucket: &str,
        path: &str,
        bytes: &[u8],
    ) -> Result<Url, StorageError> {
        let key = asset_key(bucket, path)?;
        let url = public_url(&self.asset_base, &key)?;
        let mut guard = lock(&self.assets)?;
        if guard.contains_key(&key) {
            return Err(StorageError::Conflict);
        }
        guard.insert(key, bytes.to_vec());
        Ok(url)
    }

    async fn fetch_asset(&self, bucket: &str, path: &str) -> Result<Vec<u8>, StorageError> {
        let key = asset_key(bucket, path)?;
        let guard = lock(&self.assets)?;
        guard.get(&key).cloned().ok_or(StorageError::NotFound)
    }
}

//
// ─── AGGREGATE ─────────────────────────────────────────────────────────────────
//

/// Repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub tests: Arc<dyn TestRepository>,
    pub results: Arc<dyn ResultRepository>,
    pub photos: Arc<dyn PhotoRepository>,
    pub forum: Arc<dyn ForumRepository>,
    pub assets: Arc<dyn AssetStore>,
}

impl Storage {
    /// Split one gateway into the per-concern handles services take.
    #[must_use]
    pub fn from_gateway<G>(gateway: G) -> Self
    where
        G: Gateway + 'static,
    {
        let gateway = Arc::new(gateway);
        let tests: Arc<dyn TestRepository> = gateway.clone();
        let results: Arc<dyn ResultRepository> = gateway.clone();
        let photos: Arc<dyn PhotoRepository> = gateway.clone();
        let forum: Arc<dyn ForumRepository> = gateway.clone();
        let assets: Arc<dyn AssetStore> = gateway;
        Self {
            tests,
            results,
            photos,
            forum,
            assets,
        }
    }

    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_gateway(InMemoryRepository::new())
    }
}
