use std::time::Duration;

use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock, RwLockWriteGuard};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::{
    config::Config,
    error::{StoreError, StoreResult},
    expiry::{self, now_millis},
    filter::{self, Condition},
    persistence::{self, Persistence},
    wildcard::Pattern,
};

pub const ID_FIELD: &str = "id";
pub const CREATED_AT_FIELD: &str = "created_at";
pub const EXPIRY_TIME_FIELD: &str = "expiry_time";

/// A schema-less record. Always carries `id`, and once stored also
/// `created_at` and `expiry_time` (unix millis, `0` for never).
pub type Member = Map<String, Value>;

/// Resource key to members, both in insertion order.
pub type Resources = IndexMap<String, Vec<Member>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
}

#[derive(Default)]
struct State {
    resources: Resources,
    /// Bumped on every mutation, used to order flushes.
    generation: u64,
}

/// The store engine. Every mutation runs under the write lock and is then
/// flushed to disk; flush failures are logged and the in-memory state stays
/// authoritative.
pub struct ResourceStore {
    state: RwLock<State>,
    persistence: Persistence,
    /// Generation of the snapshot currently on disk.
    flushed: Mutex<u64>,
}

fn require(values: &[&str]) -> StoreResult<()> {
    if values.iter().any(|v| v.is_empty()) {
        Err(StoreError::EmptyParameter)
    } else {
        Ok(())
    }
}

fn require_id(id: &Value) -> StoreResult<()> {
    match id {
        Value::Null => Err(StoreError::EmptyParameter),
        Value::String(s) if s.is_empty() => Err(StoreError::EmptyParameter),
        _ => Ok(()),
    }
}

/// Ids are compared by exact JSON value, so `1` and `"1"` are distinct.
fn id_matches(member: &Member, id: &Value) -> bool {
    member.get(ID_FIELD) == Some(id)
}

impl ResourceStore {
    pub fn open(config: &Config) -> Self {
        let persistence = Persistence::new(config);
        let resources = persistence.load();
        ResourceStore {
            state: RwLock::new(State {
                resources,
                generation: 0,
            }),
            persistence,
            flushed: Mutex::new(0),
        }
    }

    fn commit(&self, mut state: RwLockWriteGuard<'_, State>) {
        state.generation += 1;
        let generation = state.generation;
        let encoded = persistence::encode(&state.resources);
        drop(state);

        let data = match encoded {
            Ok(data) => data,
            Err(e) => {
                warn!(error = %e, "can't encode store, waiting for next operation");
                return;
            }
        };
        let mut flushed = self.flushed.lock();
        if *flushed >= generation {
            // A newer snapshot is already on disk
            return;
        }
        match self.persistence.write(&data) {
            Ok(()) => *flushed = generation,
            Err(e) => warn!(
                error = %e,
                generation,
                "data can't be written, waiting for next operation"
            ),
        }
    }

    /// Members of every resource whose key matches `pattern`, in resource
    /// then member insertion order.
    pub fn get_resource(&self, pattern: &str) -> StoreResult<Vec<Member>> {
        require(&[pattern])?;
        let pattern = Pattern::new(pattern);
        let state = self.state.read();
        Ok(state
            .resources
            .iter()
            .filter(|(key, _)| pattern.matches(key))
            .flat_map(|(_, members)| members.iter().cloned())
            .collect())
    }

    pub fn list_resources(&self) -> Vec<String> {
        self.state.read().resources.keys().cloned().collect()
    }

    /// Create `key` as an empty resource, discarding anything stored under it.
    pub fn create_resource(&self, key: &str) -> StoreResult<()> {
        require(&[key])?;
        let mut state = self.state.write();
        state.resources.insert(key.to_string(), Vec::new());
        debug!(key, "created resource");
        self.commit(state);
        Ok(())
    }

    pub fn delete_resource(&self, key: &str) -> StoreResult<()> {
        require(&[key])?;
        let mut state = self.state.write();
        if state.resources.shift_remove(key).is_none() {
            return Err(StoreError::ResourceNotFound);
        }
        debug!(key, "deleted resource");
        self.commit(state);
        Ok(())
    }

    pub fn check_resource(&self, key: &str) -> StoreResult<bool> {
        require(&[key])?;
        Ok(self.state.read().resources.contains_key(key))
    }

    /// First unexpired member of `key` whose id matches `id`, which may
    /// contain wildcards.
    pub fn get_member(&self, key: &str, id: &str) -> StoreResult<Option<Member>> {
        require(&[key, id])?;
        let state = self.state.read();
        let members = state
            .resources
            .get(key)
            .ok_or(StoreError::ResourceNotFound)?;
        if !filter::field_exists(members, ID_FIELD) {
            return Ok(None);
        }
        Ok(filter::by_field(members, ID_FIELD, id, now_millis())?
            .into_iter()
            .next())
    }

    /// Insert `member` into `key`, or merge it into the member with the same
    /// id. The resource is created if needed.
    pub fn put_member(
        &self,
        key: &str,
        member: Member,
        expire_in: Option<Duration>,
    ) -> StoreResult<Member> {
        require(&[key])?;
        if member.is_empty() {
            return Err(StoreError::EmptyParameter);
        }
        if !member.contains_key(ID_FIELD) {
            return Err(StoreError::IdNotFound);
        }

        let mut state = self.state.write();
        let result = upsert(&mut state.resources, key, member, expire_in, now_millis());
        self.commit(state);
        Ok(result)
    }

    /// Like [`put_member`](Self::put_member) but against an existing
    /// resource, with the id named explicitly. The payload id must agree.
    pub fn update_member(
        &self,
        key: &str,
        id: impl Into<Value>,
        member: Member,
        expire_in: Option<Duration>,
    ) -> StoreResult<Member> {
        let id = id.into();
        require(&[key])?;
        require_id(&id)?;
        if member.is_empty() {
            return Err(StoreError::EmptyParameter);
        }

        let mut state = self.state.write();
        if !state.resources.contains_key(key) {
            return Err(StoreError::ResourceNotFound);
        }
        if !member.contains_key(ID_FIELD) {
            return Err(StoreError::IdNotFound);
        }
        if !id_matches(&member, &id) {
            return Err(StoreError::MismatchId);
        }
        let result = upsert(&mut state.resources, key, member, expire_in, now_millis());
        self.commit(state);
        Ok(result)
    }

    pub fn delete_member(
        &self,
        key: &str,
        id: impl Into<Value>,
    ) -> StoreResult<DeleteOutcome> {
        let id = id.into();
        require(&[key])?;
        require_id(&id)?;
        let mut state = self.state.write();
        let members = state
            .resources
            .get_mut(key)
            .ok_or(StoreError::ResourceNotFound)?;
        match members.iter().position(|m| id_matches(m, &id)) {
            Some(index) => {
                members.remove(index);
                debug!(key, %id, "deleted member");
                self.commit(state);
                Ok(DeleteOutcome::Deleted)
            }
            None => Ok(DeleteOutcome::NotFound),
        }
    }

    /// Whether a member with exactly `id` exists, expired or not.
    pub fn check_member(&self, key: &str, id: impl Into<Value>) -> StoreResult<bool> {
        let id = id.into();
        require(&[key])?;
        require_id(&id)?;
        let state = self.state.read();
        let members = state
            .resources
            .get(key)
            .ok_or(StoreError::ResourceNotFound)?;
        Ok(members.iter().any(|m| id_matches(m, &id)))
    }

    pub fn get_member_by_field_value(
        &self,
        key: &str,
        field: &str,
        pattern: &str,
    ) -> StoreResult<Vec<Member>> {
        require(&[key, field, pattern])?;
        let state = self.state.read();
        let members = state
            .resources
            .get(key)
            .ok_or(StoreError::ResourceNotFound)?;
        filter::by_field(members, field, pattern, now_millis())
    }

    pub fn get_member_by_value(&self, key: &str, pattern: &str) -> StoreResult<Vec<Member>> {
        require(&[key, pattern])?;
        let state = self.state.read();
        let members = state
            .resources
            .get(key)
            .ok_or(StoreError::ResourceNotFound)?;
        Ok(filter::by_value(members, pattern))
    }

    pub fn multiple_filter_member(
        &self,
        key: &str,
        filters: &[Value],
        condition: Condition,
    ) -> StoreResult<Vec<Member>> {
        require(&[key])?;
        if filters.is_empty() {
            return Err(StoreError::EmptyParameter);
        }
        let state = self.state.read();
        let members = state
            .resources
            .get(key)
            .ok_or(StoreError::ResourceNotFound)?;
        filter::multi(members, filters, condition)
    }

    /// Remove the backing file. The in-memory state is left alone.
    pub fn teardown(&self) -> anyhow::Result<()> {
        self.persistence.teardown()
    }
}

fn upsert(
    resources: &mut Resources,
    key: &str,
    mut member: Member,
    expire_in: Option<Duration>,
    now: i64,
) -> Member {
    let members = resources.entry(key.to_string()).or_default();
    let existing = members
        .iter()
        .position(|m| m.get(ID_FIELD) == member.get(ID_FIELD));

    match existing {
        Some(index) => {
            let target = &mut members[index];
            let created_at = target
                .get(CREATED_AT_FIELD)
                .and_then(Value::as_i64)
                .unwrap_or(now);
            member.insert(CREATED_AT_FIELD.to_string(), created_at.into());
            member.insert(
                EXPIRY_TIME_FIELD.to_string(),
                expiry::expiry_time(created_at, expire_in).into(),
            );
            for (field, value) in member {
                target.insert(field, value);
            }
            debug!(key, id = ?target.get(ID_FIELD), "updated member");
            target.clone()
        }
        None => {
            member.insert(CREATED_AT_FIELD.to_string(), now.into());
            member.insert(
                EXPIRY_TIME_FIELD.to_string(),
                expiry::expiry_time(now, expire_in).into(),
            );
            debug!(key, id = ?member.get(ID_FIELD), "created member");
            members.push(member.clone());
            member
        }
    }
}
