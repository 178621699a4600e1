//! Recording and failure-injecting doubles for migration tests.
//!
//! Every double appends to a shared [`CallLog`] so tests can assert which
//! backend was touched and in what order.

#![allow(clippy::duplicate_mod)]

use async_trait::async_trait;
use secretshift::errors::{Error, Result};
use secretshift::kvstore::{KvKey, KvStore, ALL_ORGANIZATIONS};
use secretshift::secrets::{
    DeleteSecretRequest, GetSecretRequest, GetSecretResponse, Item, ListSecretsRequest,
    ListSecretsResponse, LocalSecretsStore, LocalStoreFactory, PluginResponse,
    RemoteSecretsPluginCheck, RenameSecretRequest, SecretKey, SecretString, SecretsKvStore,
    SecretsManagerPlugin, SetSecretRequest,
};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Local,
    Remote,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Get(Backend, SecretKey),
    Set(Backend, SecretKey),
    Del(Backend, SecretKey),
    Keys(Backend),
    Rename(Backend),
    GetAll,
    ListPlugin,
    StartPlugin,
}

impl Call {
    pub fn backend(&self) -> Option<Backend> {
        match self {
            Call::Get(b, _) | Call::Set(b, _) | Call::Del(b, _) | Call::Keys(b) | Call::Rename(b) => {
                Some(*b)
            }
            Call::GetAll => Some(Backend::Local),
            Call::ListPlugin | Call::StartPlugin => Some(Backend::Remote),
        }
    }
}

/// Ordered record of every backend call.
#[derive(Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<Call>>>);

impl CallLog {
    pub fn push(&self, call: Call) {
        self.0.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.0.lock().unwrap().clone()
    }

    pub fn position(&self, call: &Call) -> Option<usize> {
        self.0.lock().unwrap().iter().position(|c| c == call)
    }

    pub fn touched(&self, backend: Backend) -> bool {
        self.0.lock().unwrap().iter().any(|c| c.backend() == Some(backend))
    }

    pub fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.0.lock().unwrap().iter().filter(|c| predicate(c)).count()
    }
}

pub type SecretMap = Arc<Mutex<BTreeMap<SecretKey, SecretString>>>;

pub fn secret_map(entries: &[(SecretKey, &str)]) -> SecretMap {
    Arc::new(Mutex::new(
        entries.iter().map(|(k, v)| (k.clone(), SecretString::new(*v))).collect(),
    ))
}

pub fn keys_of(map: &SecretMap) -> Vec<SecretKey> {
    map.lock().unwrap().keys().cloned().collect()
}

/// Injected failures for a [`MemorySecretsStore`].
#[derive(Debug, Clone, Default)]
pub struct Faults {
    pub fail_get: HashSet<SecretKey>,
    pub fail_set: HashSet<SecretKey>,
    pub fail_get_all: bool,
    /// Fail the n-th delete (0-based) issued to one store instance.
    pub fail_delete_at: Option<usize>,
}

/// Secret store over a shared map, usable as either backend.
pub struct MemorySecretsStore {
    backend: Backend,
    data: SecretMap,
    log: CallLog,
    faults: Faults,
    deletes: AtomicUsize,
}

impl MemorySecretsStore {
    pub fn new(backend: Backend, data: SecretMap, log: CallLog, faults: Faults) -> Self {
        Self { backend, data, log, faults, deletes: AtomicUsize::new(0) }
    }
}

#[async_trait]
impl SecretsKvStore for MemorySecretsStore {
    async fn get(
        &self,
        org_id: i64,
        namespace: &str,
        secret_type: &str,
    ) -> Result<Option<SecretString>> {
        let key = SecretKey::new(org_id, namespace, secret_type);
        self.log.push(Call::Get(self.backend, key.clone()));
        if self.faults.fail_get.contains(&key) {
            return Err(Error::plugin(format!("injected get failure for {}", key)));
        }
        Ok(self.data.lock().unwrap().get(&key).cloned())
    }

    async fn set(
        &self,
        org_id: i64,
        namespace: &str,
        secret_type: &str,
        value: &SecretString,
    ) -> Result<()> {
        let key = SecretKey::new(org_id, namespace, secret_type);
        self.log.push(Call::Set(self.backend, key.clone()));
        if self.faults.fail_set.contains(&key) {
            return Err(Error::plugin(format!("injected set failure for {}", key)));
        }
        self.data.lock().unwrap().insert(key, value.clone());
        Ok(())
    }

    async fn del(&self, org_id: i64, namespace: &str, secret_type: &str) -> Result<()> {
        let key = SecretKey::new(org_id, namespace, secret_type);
        self.log.push(Call::Del(self.backend, key.clone()));
        let index = self.deletes.fetch_add(1, Ordering::SeqCst);
        if self.faults.fail_delete_at == Some(index) {
            return Err(Error::internal(format!("injected delete failure for {}", key)));
        }
        self.data.lock().unwrap().remove(&key);
        Ok(())
    }

    async fn keys(
        &self,
        org_id: i64,
        namespace: Option<&str>,
        secret_type: Option<&str>,
    ) -> Result<Vec<SecretKey>> {
        self.log.push(Call::Keys(self.backend));
        Ok(self
            .data
            .lock()
            .unwrap()
            .keys()
            .filter(|k| org_id == ALL_ORGANIZATIONS || k.org_id == org_id)
            .filter(|k| namespace.map_or(true, |ns| k.namespace == ns))
            .filter(|k| secret_type.map_or(true, |t| k.secret_type == t))
            .cloned()
            .collect())
    }

    async fn rename(&self, org_id: i64, namespace: &str, new_namespace: &str) -> Result<()> {
        self.log.push(Call::Rename(self.backend));
        let mut data = self.data.lock().unwrap();
        let moved: Vec<SecretKey> = data
            .keys()
            .filter(|k| k.org_id == org_id && k.namespace == namespace)
            .cloned()
            .collect();
        for key in moved {
            if let Some(value) = data.remove(&key) {
                data.insert(SecretKey::new(org_id, new_namespace, &key.secret_type), value);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl LocalSecretsStore for MemorySecretsStore {
    async fn get_all(&self) -> Result<Vec<Item>> {
        self.log.push(Call::GetAll);
        if self.faults.fail_get_all {
            return Err(Error::internal("injected get_all failure"));
        }
        Ok(self
            .data
            .lock()
            .unwrap()
            .iter()
            .map(|(k, v)| Item::new(k.clone(), v.clone()))
            .collect())
    }
}

/// Hands out fresh local stores over one shared map.
pub struct MemoryLocalFactory {
    pub data: SecretMap,
    log: CallLog,
    faults: Faults,
    created: AtomicUsize,
}

impl MemoryLocalFactory {
    pub fn new(data: SecretMap, log: CallLog, faults: Faults) -> Self {
        Self { data, log, faults, created: AtomicUsize::new(0) }
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

impl LocalStoreFactory for MemoryLocalFactory {
    fn create_local_store(&self) -> Box<dyn LocalSecretsStore> {
        self.created.fetch_add(1, Ordering::SeqCst);
        Box::new(MemorySecretsStore::new(
            Backend::Local,
            self.data.clone(),
            self.log.clone(),
            self.faults.clone(),
        ))
    }
}

/// Wraps a real local store and fails the n-th delete of each instance.
pub struct FaultyLocalStore {
    inner: Box<dyn LocalSecretsStore>,
    fail_delete_at: Option<usize>,
    deletes: AtomicUsize,
}

#[async_trait]
impl SecretsKvStore for FaultyLocalStore {
    async fn get(&self, org_id: i64, ns: &str, t: &str) -> Result<Option<SecretString>> {
        self.inner.get(org_id, ns, t).await
    }

    async fn set(&self, org_id: i64, ns: &str, t: &str, value: &SecretString) -> Result<()> {
        self.inner.set(org_id, ns, t, value).await
    }

    async fn del(&self, org_id: i64, ns: &str, t: &str) -> Result<()> {
        let index = self.deletes.fetch_add(1, Ordering::SeqCst);
        if self.fail_delete_at == Some(index) {
            return Err(Error::internal("injected delete failure"));
        }
        self.inner.del(org_id, ns, t).await
    }

    async fn keys(&self, org_id: i64, ns: Option<&str>, t: Option<&str>) -> Result<Vec<SecretKey>> {
        self.inner.keys(org_id, ns, t).await
    }

    async fn rename(&self, org_id: i64, ns: &str, new_ns: &str) -> Result<()> {
        self.inner.rename(org_id, ns, new_ns).await
    }
}

#[async_trait]
impl LocalSecretsStore for FaultyLocalStore {
    async fn get_all(&self) -> Result<Vec<Item>> {
        self.inner.get_all().await
    }
}

pub struct FaultyLocalFactory {
    inner: Arc<dyn LocalStoreFactory>,
    pub fail_delete_at: Mutex<Option<usize>>,
}

impl FaultyLocalFactory {
    pub fn new(inner: Arc<dyn LocalStoreFactory>, fail_delete_at: Option<usize>) -> Self {
        Self { inner, fail_delete_at: Mutex::new(fail_delete_at) }
    }

    pub fn heal(&self) {
        *self.fail_delete_at.lock().unwrap() = None;
    }
}

impl LocalStoreFactory for FaultyLocalFactory {
    fn create_local_store(&self) -> Box<dyn LocalSecretsStore> {
        Box::new(FaultyLocalStore {
            inner: self.inner.create_local_store(),
            fail_delete_at: *self.fail_delete_at.lock().unwrap(),
            deletes: AtomicUsize::new(0),
        })
    }
}

/// Plugin client over a shared map.
pub struct MemoryPlugin {
    data: SecretMap,
    log: CallLog,
    pub fail_list: bool,
}

impl MemoryPlugin {
    pub fn new(data: SecretMap, log: CallLog) -> Self {
        Self { data, log, fail_list: false }
    }
}

#[async_trait]
impl SecretsManagerPlugin for MemoryPlugin {
    async fn get_secret(&self, request: GetSecretRequest) -> Result<GetSecretResponse> {
        self.log.push(Call::Get(Backend::Remote, request.key.clone()));
        Ok(GetSecretResponse {
            value: self.data.lock().unwrap().get(&request.key).cloned(),
            user_friendly_error: String::new(),
        })
    }

    async fn set_secret(&self, request: SetSecretRequest) -> Result<PluginResponse> {
        self.log.push(Call::Set(Backend::Remote, request.key.clone()));
        self.data.lock().unwrap().insert(request.key, request.value);
        Ok(PluginResponse::default())
    }

    async fn delete_secret(&self, request: DeleteSecretRequest) -> Result<PluginResponse> {
        self.log.push(Call::Del(Backend::Remote, request.key.clone()));
        self.data.lock().unwrap().remove(&request.key);
        Ok(PluginResponse::default())
    }

    async fn list_secrets(&self, request: ListSecretsRequest) -> Result<ListSecretsResponse> {
        self.log.push(Call::ListPlugin);
        if self.fail_list {
            return Ok(ListSecretsResponse {
                keys: Vec::new(),
                user_friendly_error: "listing is unavailable".to_string(),
            });
        }
        let keys = self
            .data
            .lock()
            .unwrap()
            .keys()
            .filter(|k| request.all_keys || k.org_id == request.org_id)
            .cloned()
            .collect();
        Ok(ListSecretsResponse { keys, user_friendly_error: String::new() })
    }

    async fn rename_secret(&self, _request: RenameSecretRequest) -> Result<PluginResponse> {
        self.log.push(Call::Rename(Backend::Remote));
        Ok(PluginResponse::default())
    }
}

/// Availability check with a fixed answer.
pub struct StaticCheck {
    use_remote: bool,
    plugin: Option<Arc<dyn SecretsManagerPlugin>>,
    log: CallLog,
}

impl StaticCheck {
    pub fn new(use_remote: bool, plugin: Option<Arc<dyn SecretsManagerPlugin>>, log: CallLog) -> Self {
        Self { use_remote, plugin, log }
    }
}

#[async_trait]
impl RemoteSecretsPluginCheck for StaticCheck {
    fn should_use_remote_secrets_plugin(&self) -> bool {
        self.use_remote
    }

    async fn start_and_return_plugin(&self) -> Result<Arc<dyn SecretsManagerPlugin>> {
        self.log.push(Call::StartPlugin);
        self.plugin.clone().ok_or_else(|| Error::plugin("plugin failed to start"))
    }
}

/// In-memory key-value area that counts writes.
#[derive(Default)]
pub struct MemoryKvStore {
    data: Mutex<HashMap<(i64, String, String), String>>,
    writes: AtomicUsize,
    pub fail_get: bool,
}

impl MemoryKvStore {
    pub fn failing_reads() -> Self {
        Self { fail_get: true, ..Default::default() }
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, org_id: i64, namespace: &str, key: &str) -> Result<Option<String>> {
        if self.fail_get {
            return Err(Error::internal("injected kv read failure"));
        }
        Ok(self
            .data
            .lock()
            .unwrap()
            .get(&(org_id, namespace.to_string(), key.to_string()))
            .cloned())
    }

    async fn set(&self, org_id: i64, namespace: &str, key: &str, value: &str) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.data
            .lock()
            .unwrap()
            .insert((org_id, namespace.to_string(), key.to_string()), value.to_string());
        Ok(())
    }

    async fn del(&self, org_id: i64, namespace: &str, key: &str) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.data.lock().unwrap().remove(&(org_id, namespace.to_string(), key.to_string()));
        Ok(())
    }

    async fn keys(&self, org_id: i64, namespace: &str, key_prefix: &str) -> Result<Vec<KvKey>> {
        Ok(self
            .data
            .lock()
            .unwrap()
            .keys()
            .filter(|(o, ns, k)| *o == org_id && ns == namespace && k.starts_with(key_prefix))
            .map(|(o, ns, k)| KvKey { org_id: *o, namespace: ns.clone(), key: k.clone() })
            .collect())
    }
}

/// Identity cipher for tests that use the real SQL store.
pub struct PlainSecretsService;

#[async_trait]
impl secretshift::secrets::SecretsService for PlainSecretsService {
    async fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        Ok(plaintext.to_vec())
    }

    async fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        Ok(ciphertext.to_vec())
    }
}
