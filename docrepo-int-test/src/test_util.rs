use crate::recording_store::RecordingStore;
use docrepo::errors::RepoResult;
use docrepo::repository::{Entity, Repository, RepositoryBuilder};
use docrepo::store::{MemoryStore, StoreClient};
use std::backtrace::Backtrace;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

pub const TEST_DATABASE: &str = "integration";

/// Runs an async test on its own runtime, with setup and teardown.
///
/// `after` runs even when the test fails. A failure anywhere panics with
/// the error and a captured backtrace.
pub fn run_async_test<B, T, Fut, A>(before: B, test: T, after: A)
where
    B: FnOnce() -> RepoResult<TestContext>,
    T: FnOnce(TestContext) -> Fut,
    Fut: Future<Output = RepoResult<()>>,
    A: FnOnce(TestContext) -> RepoResult<()>,
{
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(4)
        .enable_all()
        .build()
        .expect("failed to build test runtime");

    let start_time = Instant::now();
    let ctx = match before() {
        Ok(ctx) => ctx,
        Err(e) => panic!("Before run failed: {:?}", e),
    };

    let backtrace = Backtrace::capture();
    let result = runtime.block_on(test(ctx.clone()));
    let after_result = after(ctx);

    if let Err(e) = result {
        eprintln!("\n==================== TEST FAILED ====================");
        eprintln!("Error: {}", e);
        if !backtrace.to_string().contains("disabled") {
            eprintln!("\nBacktrace:\n{}", backtrace);
        }
        eprintln!("=====================================================\n");
        panic!("Test failed after {:?}: {:?}", start_time.elapsed(), e);
    }
    if let Err(e) = after_result {
        panic!("After run failed: {:?}", e);
    }
}

/// A private `memory://` store, its recording front and a client over it.
#[derive(Clone)]
pub struct TestContext {
    endpoint: String,
    store: MemoryStore,
    recording: RecordingStore,
    client: StoreClient,
}

impl TestContext {
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    pub fn recording(&self) -> &RecordingStore {
        &self.recording
    }

    pub fn client(&self) -> StoreClient {
        self.client.clone()
    }

    /// A repository in [TEST_DATABASE] whose commands are recorded.
    pub fn repository<E: Entity>(&self) -> RepoResult<Repository<E>> {
        RepositoryBuilder::new()
            .database(TEST_DATABASE)
            .open_with::<E>(self.client())
    }

    /// A repository on a second client over the same endpoint, bypassing
    /// the recording.
    pub fn second_repository<E: Entity>(&self) -> RepoResult<Repository<E>> {
        RepositoryBuilder::new()
            .endpoint(&self.endpoint)
            .database(TEST_DATABASE)
            .open::<E>()
    }
}

pub fn random_endpoint() -> String {
    format!("memory://{}", uuid::Uuid::new_v4())
}

pub fn create_test_context() -> RepoResult<TestContext> {
    let endpoint = random_endpoint();
    let store = StoreClient::memory_store(&endpoint)?;
    let recording = RecordingStore::new(Arc::new(store.clone()));
    let client = StoreClient::new(&endpoint, Arc::new(recording.clone()));
    Ok(TestContext {
        endpoint,
        store,
        recording,
        client,
    })
}

pub fn cleanup(ctx: TestContext) -> RepoResult<()> {
    ctx.recording.reset();
    ctx.store.clear();
    Ok(())
}
