//! In-memory repositories for tests
//!
//! One store backs all three repository traits so role deletion can see
//! which users still reference a role, like the foreign keys do in Postgres.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::models::{Role, RoleRight, RoleRightCreate, RoleRightUpdate, User};

use super::{
    NewUser, RepoError, RepoResult, RoleRepository, RoleRightRepository, UserCredentials,
    UserRepository,
};
use crate::auth::permission::Action;
use crate::util::hash_password;

#[derive(Default)]
struct Inner {
    users: BTreeMap<i64, UserCredentials>,
    roles: BTreeMap<i64, Role>,
    rights: BTreeMap<i64, RoleRight>,
    next_id: i64,
}

impl Inner {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn role_name(&self, role_id: i64) -> Option<String> {
        self.roles.get(&role_id).map(|r| r.name.clone())
    }

    /// Users carry the role name as of the read, like the LEFT JOIN
    fn resolved(&self, user: &User) -> User {
        User {
            role_name: self.role_name(user.role_id),
            ..user.clone()
        }
    }
}

fn flag_set(right: &RoleRight, action: Action) -> bool {
    match action {
        Action::Create => right.r_create,
        Action::Read => right.r_read,
        Action::Update => right.r_update,
        Action::Delete => right.r_delete,
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
    unavailable: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                next_id: 100,
                ..Inner::default()
            })),
            unavailable: Arc::default(),
        }
    }

    /// Make every repository call fail as if the database were down
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn lock(&self) -> RepoResult<MutexGuard<'_, Inner>> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RepoError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(self.inner.lock().unwrap())
    }

    pub fn seed_role(&self, id: i64, name: &str) -> Role {
        let now = Utc::now();
        let role = Role {
            id,
            name: name.to_string(),
            created_at: now,
            updated_at: now,
        };
        self.inner.lock().unwrap().roles.insert(id, role.clone());
        role
    }

    pub fn seed_user(&self, id: i64, role_id: i64, name: &str, email: &str, password: &str) -> User {
        let now = Utc::now();
        let mut inner = self.inner.lock().unwrap();
        let user = User {
            id,
            role_id,
            role_name: inner.role_name(role_id),
            name: name.to_string(),
            email: email.to_string(),
            last_access: None,
            created_at: now,
            updated_at: now,
        };
        inner.users.insert(
            id,
            UserCredentials {
                user: user.clone(),
                password_hash: hash_password(password).unwrap(),
            },
        );
        user
    }

    pub fn seed_right(&self, role_id: i64, route: &str, flags: [bool; 4]) -> RoleRight {
        let now = Utc::now();
        let mut inner = self.inner.lock().unwrap();
        let id = inner.next_id();
        let right = RoleRight {
            id,
            role_id,
            section: shared::models::SECTION_BACKEND.to_string(),
            route: route.to_string(),
            r_create: flags[0],
            r_read: flags[1],
            r_update: flags[2],
            r_delete: flags[3],
            created_at: now,
            updated_at: now,
        };
        inner.rights.insert(id, right.clone());
        right
    }

    pub fn remove_user(&self, id: i64) {
        self.inner.lock().unwrap().users.remove(&id);
    }

    pub fn last_access(&self, id: i64) -> Option<DateTime<Utc>> {
        self.inner
            .lock()
            .unwrap()
            .users
            .get(&id)
            .and_then(|c| c.user.last_access)
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn find_credentials(&self, email: &str) -> RepoResult<Option<UserCredentials>> {
        let inner = self.lock()?;
        Ok(inner
            .users
            .values()
            .find(|c| c.user.email == email)
            .map(|c| UserCredentials {
                user: inner.resolved(&c.user),
                password_hash: c.password_hash.clone(),
            }))
    }

    async fn find_by_id(&self, id: i64) -> RepoResult<Option<User>> {
        let inner = self.lock()?;
        Ok(inner.users.get(&id).map(|c| inner.resolved(&c.user)))
    }

    async fn list(&self) -> RepoResult<Vec<User>> {
        let inner = self.lock()?;
        Ok(inner.users.values().map(|c| inner.resolved(&c.user)).collect())
    }

    async fn create(&self, new: NewUser) -> RepoResult<User> {
        let mut inner = self.lock()?;
        if inner.users.values().any(|c| c.user.email == new.email) {
            return Err(RepoError::Conflict("users_email_key".into()));
        }
        if !inner.roles.contains_key(&new.role_id) {
            return Err(RepoError::ForeignKey("users_role_id_fkey".into()));
        }
        let now = Utc::now();
        let id = inner.next_id();
        let user = User {
            id,
            role_id: new.role_id,
            role_name: inner.role_name(new.role_id),
            name: new.name,
            email: new.email,
            last_access: None,
            created_at: now,
            updated_at: now,
        };
        inner.users.insert(
            id,
            UserCredentials {
                user: user.clone(),
                password_hash: new.password_hash,
            },
        );
        Ok(user)
    }

    async fn update_name(&self, id: i64, name: &str) -> RepoResult<Option<User>> {
        let mut inner = self.lock()?;
        let Some(creds) = inner.users.get_mut(&id) else {
            return Ok(None);
        };
        creds.user.name = name.to_string();
        creds.user.updated_at = Utc::now();
        let user = creds.user.clone();
        Ok(Some(inner.resolved(&user)))
    }

    async fn ids_with_role(&self, role_id: i64) -> RepoResult<Vec<i64>> {
        let inner = self.lock()?;
        Ok(inner
            .users
            .values()
            .filter(|c| c.user.role_id == role_id)
            .map(|c| c.user.id)
            .collect())
    }

    async fn touch_last_access(&self, id: i64) -> RepoResult<()> {
        let mut inner = self.lock()?;
        if let Some(creds) = inner.users.get_mut(&id) {
            creds.user.last_access = Some(Utc::now());
        }
        Ok(())
    }

    async fn delete(&self, id: i64) -> RepoResult<bool> {
        Ok(self.lock()?.users.remove(&id).is_some())
    }
}

#[async_trait]
impl RoleRepository for MemoryStore {
    async fn list(&self) -> RepoResult<Vec<Role>> {
        Ok(self.lock()?.roles.values().cloned().collect())
    }

    async fn find_by_id(&self, id: i64) -> RepoResult<Option<Role>> {
        Ok(self.lock()?.roles.get(&id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> RepoResult<Option<Role>> {
        Ok(self.lock()?.roles.values().find(|r| r.name == name).cloned())
    }

    async fn create(&self, name: &str) -> RepoResult<Role> {
        let mut inner = self.lock()?;
        if inner.roles.values().any(|r| r.name == name) {
            return Err(RepoError::Conflict("roles_name_key".into()));
        }
        let now = Utc::now();
        let id = inner.next_id();
        let role = Role {
            id,
            name: name.to_string(),
            created_at: now,
            updated_at: now,
        };
        inner.roles.insert(id, role.clone());
        Ok(role)
    }

    async fn update(&self, id: i64, name: &str) -> RepoResult<Option<Role>> {
        let mut inner = self.lock()?;
        if inner.roles.values().any(|r| r.name == name && r.id != id) {
            return Err(RepoError::Conflict("roles_name_key".into()));
        }
        let Some(role) = inner.roles.get_mut(&id) else {
            return Ok(None);
        };
        role.name = name.to_string();
        role.updated_at = Utc::now();
        Ok(Some(role.clone()))
    }

    async fn count_users(&self, id: i64) -> RepoResult<i64> {
        let inner = self.lock()?;
        Ok(inner.users.values().filter(|c| c.user.role_id == id).count() as i64)
    }

    async fn delete(&self, id: i64) -> RepoResult<bool> {
        let mut inner = self.lock()?;
        if inner.users.values().any(|c| c.user.role_id == id) {
            return Err(RepoError::ForeignKey("users_role_id_fkey".into()));
        }
        if inner.roles.remove(&id).is_none() {
            return Ok(false);
        }
        inner.rights.retain(|_, r| r.role_id != id);
        Ok(true)
    }
}

#[async_trait]
impl RoleRightRepository for MemoryStore {
    async fn is_granted(
        &self,
        role_id: i64,
        section: &str,
        route: &str,
        action: Action,
    ) -> RepoResult<bool> {
        Ok(self.lock()?.rights.values().any(|r| {
            r.role_id == role_id && r.section == section && r.route == route && flag_set(r, action)
        }))
    }

    async fn list_for_role(&self, role_id: i64) -> RepoResult<Vec<RoleRight>> {
        Ok(self
            .lock()?
            .rights
            .values()
            .filter(|r| r.role_id == role_id)
            .cloned()
            .collect())
    }

    async fn create(&self, role_id: i64, data: &RoleRightCreate) -> RepoResult<RoleRight> {
        let mut inner = self.lock()?;
        if !inner.roles.contains_key(&role_id) {
            return Err(RepoError::ForeignKey("role_rights_role_id_fkey".into()));
        }
        if inner
            .rights
            .values()
            .any(|r| r.role_id == role_id && r.section == data.section && r.route == data.route)
        {
            return Err(RepoError::Conflict(
                "role_rights_role_section_route_key".into(),
            ));
        }
        let now = Utc::now();
        let id = inner.next_id();
        let right = RoleRight {
            id,
            role_id,
            section: data.section.clone(),
            route: data.route.clone(),
            r_create: data.r_create,
            r_read: data.r_read,
            r_update: data.r_update,
            r_delete: data.r_delete,
            created_at: now,
            updated_at: now,
        };
        inner.rights.insert(id, right.clone());
        Ok(right)
    }

    async fn update(
        &self,
        role_id: i64,
        right_id: i64,
        data: &RoleRightUpdate,
    ) -> RepoResult<Option<RoleRight>> {
        let mut inner = self.lock()?;
        let Some(right) = inner
            .rights
            .get_mut(&right_id)
            .filter(|r| r.role_id == role_id)
        else {
            return Ok(None);
        };
        if let Some(v) = data.r_create {
            right.r_create = v;
        }
        if let Some(v) = data.r_read {
            right.r_read = v;
        }
        if let Some(v) = data.r_update {
            right.r_update = v;
        }
        if let Some(v) = data.r_delete {
            right.r_delete = v;
        }
        right.updated_at = Utc::now();
        Ok(Some(right.clone()))
    }

    async fn delete(&self, role_id: i64, right_id: i64) -> RepoResult<bool> {
        let mut inner = self.lock()?;
        if inner
            .rights
            .get(&right_id)
            .is_some_and(|r| r.role_id == role_id)
        {
            inner.rights.remove(&right_id);
            return Ok(true);
        }
        Ok(false)
    }
}
