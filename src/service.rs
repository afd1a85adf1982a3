use std::{sync::Arc, time::Duration};

use serde_json::Value;

use crate::{
    config::Config,
    error::StoreResult,
    filter::Condition,
    store::{DeleteOutcome, Member, ResourceStore},
};

/// Async handle for request handlers. Cloning is cheap; every clone talks to
/// the same store. Each call runs on tokio's blocking pool since mutations
/// touch the disk.
#[derive(Clone)]
pub struct StoreService {
    store: Arc<ResourceStore>,
}

impl StoreService {
    pub fn new(store: Arc<ResourceStore>) -> Self {
        StoreService { store }
    }

    /// Open the store on the blocking pool, since loading may create or
    /// rewrite the data file.
    pub async fn open(config: Config) -> Self {
        let store = tokio::task::spawn_blocking(move || ResourceStore::open(&config))
            .await
            .unwrap_or_else(|e| std::panic::resume_unwind(e.into_panic()));
        StoreService::new(Arc::new(store))
    }

    pub fn store(&self) -> &Arc<ResourceStore> {
        &self.store
    }

    async fn run<T, F>(&self, f: F) -> T
    where
        F: FnOnce(&ResourceStore) -> T + Send + 'static,
        T: Send + 'static,
    {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || f(&store))
            .await
            .unwrap_or_else(|e| std::panic::resume_unwind(e.into_panic()))
    }

    pub async fn get_resource(&self, pattern: String) -> StoreResult<Vec<Member>> {
        self.run(move |store| store.get_resource(&pattern)).await
    }

    pub async fn list_resources(&self) -> Vec<String> {
        self.run(|store| store.list_resources()).await
    }

    pub async fn create_resource(&self, key: String) -> StoreResult<()> {
        self.run(move |store| store.create_resource(&key)).await
    }

    pub async fn delete_resource(&self, key: String) -> StoreResult<()> {
        self.run(move |store| store.delete_resource(&key)).await
    }

    pub async fn check_resource(&self, key: String) -> StoreResult<bool> {
        self.run(move |store| store.check_resource(&key)).await
    }

    pub async fn get_member(&self, key: String, id: String) -> StoreResult<Option<Member>> {
        self.run(move |store| store.get_member(&key, &id)).await
    }

    pub async fn put_member(
        &self,
        key: String,
        member: Member,
        expire_in: Option<Duration>,
    ) -> StoreResult<Member> {
        self.run(move |store| store.put_member(&key, member, expire_in))
            .await
    }

    pub async fn update_member(
        &self,
        key: String,
        id: Value,
        member: Member,
        expire_in: Option<Duration>,
    ) -> StoreResult<Member> {
        self.run(move |store| store.update_member(&key, id, member, expire_in))
            .await
    }

    pub async fn delete_member(&self, key: String, id: Value) -> StoreResult<DeleteOutcome> {
        self.run(move |store| store.delete_member(&key, id)).await
    }

    pub async fn check_member(&self, key: String, id: Value) -> StoreResult<bool> {
        self.run(move |store| store.check_member(&key, id)).await
    }

    pub async fn get_member_by_field_value(
        &self,
        key: String,
        field: String,
        pattern: String,
    ) -> StoreResult<Vec<Member>> {
        self.run(move |store| store.get_member_by_field_value(&key, &field, &pattern))
            .await
    }

    pub async fn get_member_by_value(
        &self,
        key: String,
        pattern: String,
    ) -> StoreResult<Vec<Member>> {
        self.run(move |store| store.get_member_by_value(&key, &pattern))
            .await
    }

    pub async fn multiple_filter_member(
        &self,
        key: String,
        filters: Vec<Value>,
        condition: Condition,
    ) -> StoreResult<Vec<Member>> {
        self.run(move |store| store.multiple_filter_member(&key, &filters, condition))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::StoreService;
    use std::sync::Arc;
    use crate::{config::Config, error::StoreError, filter::Condition, store::DeleteOutcome};
    use serde_json::json;
    use tempfile::TempDir;

    fn config(dir: &TempDir) -> Config {
        Config::default().with_dir(dir.path()).with_test_mode(true)
    }

    #[tokio::test]
    async fn operations_round_trip() {
        let dir = TempDir::new().unwrap();
        let service = StoreService::open(config(&dir)).await;

        service.create_resource("users".into()).await.unwrap();
        let member = json!({"id": "1", "name": "Ann"}).as_object().unwrap().clone();
        service
            .put_member("users".into(), member, None)
            .await
            .unwrap();

        let found = service
            .get_member("users".into(), "1".into())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found["name"], "Ann");
        assert!(service.check_member("users".into(), "1".into()).await.unwrap());
        assert_eq!(
            service
                .get_member_by_field_value("users".into(), "name".into(), "A*".into())
                .await
                .unwrap()
                .len(),
            1
        );
        assert_eq!(
            service
                .multiple_filter_member(
                    "users".into(),
                    vec![json!({"field": "name", "value": "Ann"})],
                    Condition::And
                )
                .await
                .unwrap()
                .len(),
            1
        );
        assert_eq!(
            service.delete_member("users".into(), "1".into()).await,
            Ok(DeleteOutcome::Deleted)
        );
        assert_eq!(
            service.delete_resource("missing".into()).await,
            Err(StoreError::ResourceNotFound)
        );
        assert_eq!(service.list_resources().await, ["users"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_handlers_share_one_store() {
        let dir = TempDir::new().unwrap();
        let service = StoreService::open(config(&dir)).await;

        let tasks = (0..16)
            .map(|i| {
                let service = service.clone();
                tokio::spawn(async move {
                    let member = json!({"id": i % 4, "writer": i}).as_object().unwrap().clone();
                    service.put_member("jobs".into(), member, None).await
                })
            })
            .collect::<Vec<_>>();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(service.get_resource("jobs".into()).await.unwrap().len(), 4);
        assert!(service.check_member("jobs".into(), json!(3)).await.unwrap());
        assert!(!service.check_member("jobs".into(), "3".into()).await.unwrap());

        let handle = service.clone();
        assert!(Arc::ptr_eq(service.store(), handle.store()));
        assert_eq!(handle.store().list_resources(), ["jobs"]);
        let reopened = StoreService::open(config(&dir)).await;
        assert_eq!(
            reopened.get_resource("j*".into()).await.unwrap(),
            service.get_resource("jobs".into()).await.unwrap()
        );
    }
}
