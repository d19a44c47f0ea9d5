//! CRUD Operations
//!
//! [`CrudService`] is the one place where an incoming request (already parsed by the
//! HTTP layer) turns into entity calls. Every step is provided; implementors supply the
//! executor and may override the [`CrudService::after_read`] and
//! [`CrudService::perform_delete`] hooks.
//!
//! ```rust,ignore
//! struct NoteService { connection: Connection }
//!
//! #[async_trait]
//! impl CrudService for NoteService {
//!     type Resource = Note;
//!
//!     fn executor(&self) -> &dyn Executor {
//!         &self.connection
//!     }
//! }
//!
//! let page = service.index(&Request::new().param("search", "api")).await;
//! ```

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::marker::PhantomData;
use tracing::debug;

use crate::database::{Connection, Executor};
use crate::entity::Entity;
use crate::filtering::Filters;
use crate::pagination::PaginatedResult;

const LIMIT_PARAM: &str = "limit";
const PAGE_PARAM: &str = "page";

/// A request as the service sees it: target id, query/body parameters, caller privilege
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Request {
    pub id: Option<String>,
    pub params: BTreeMap<String, JsonValue>,
    pub authenticated: bool,
}

impl Request {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn param(mut self, name: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn params(mut self, params: BTreeMap<String, JsonValue>) -> Self {
        self.params.extend(params);
        self
    }

    #[must_use]
    pub const fn authenticated(mut self, authenticated: bool) -> Self {
        self.authenticated = authenticated;
        self
    }

    /// A non-negative integer parameter given as a number or a numeric string
    #[must_use]
    pub fn param_u64(&self, name: &str) -> Option<u64> {
        match self.params.get(name)? {
            JsonValue::Number(number) => number.as_u64(),
            JsonValue::String(text) => text.trim().parse().ok(),
            _ => None,
        }
    }
}

/// Result of a single-entity operation
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Success(T),
    /// Rejected by validation; the entity carries the field errors
    Invalid(T),
    /// The write did not happen; the entity's identifier is absent
    Failed(T),
    NotFound,
    Unauthorized,
}

impl<T> Outcome<T> {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// The entity, whatever happened to it
    #[must_use]
    pub fn into_inner(self) -> Option<T> {
        match self {
            Self::Success(entity) | Self::Invalid(entity) | Self::Failed(entity) => Some(entity),
            Self::NotFound | Self::Unauthorized => None,
        }
    }

    /// The entity when the operation succeeded
    #[must_use]
    pub fn success(self) -> Option<T> {
        match self {
            Self::Success(entity) => Some(entity),
            _ => None,
        }
    }
}

#[async_trait]
pub trait CrudService: Send + Sync {
    type Resource: Entity + Clone;

    fn executor(&self) -> &dyn Executor;

    /// Filters, page size and page for a list request.
    ///
    /// The schema's default page size is used when none is requested and caps any
    /// larger request.
    fn list_params(&self, request: &Request) -> (Filters, u64, u64) {
        let default_limit = <Self::Resource as Entity>::schema().default_limit;
        let limit = request
            .param_u64(LIMIT_PARAM)
            .filter(|limit| *limit > 0)
            .map_or(default_limit, |limit| limit.min(default_limit));
        let page = request.param_u64(PAGE_PARAM).unwrap_or(1).max(1);
        (Filters::from_params(&request.params), limit, page)
    }

    /// Runs on every entity handed out by `read`
    async fn after_read(&self, _entity: &mut Self::Resource) {}

    async fn perform_delete(&self, entity: &mut Self::Resource) -> bool {
        entity.delete(self.executor()).await
    }

    async fn index(&self, request: &Request) -> PaginatedResult<Self::Resource> {
        let (filters, limit, page) = self.list_params(request);
        Self::Resource::get_by_params(self.executor(), &filters, Some(limit), Some(page)).await
    }

    async fn create(&self, request: &Request) -> Outcome<Self::Resource> {
        if !request.authenticated {
            return Outcome::Unauthorized;
        }

        let mut entity = Self::Resource::from_values(
            request
                .params
                .iter()
                .map(|(name, value)| (name.as_str(), value.clone())),
        );
        if !entity.record_mut().validate_required() {
            debug!(
                resource = <Self::Resource as Entity>::RESOURCE_NAME_SINGULAR,
                errors = ?entity.record().error_map(),
                "Create rejected"
            );
            return Outcome::Invalid(entity);
        }

        if entity.save(self.executor()).await {
            Outcome::Success(entity)
        } else {
            Outcome::Failed(entity)
        }
    }

    async fn read(&self, request: &Request) -> Outcome<Self::Resource> {
        let Some(mut entity) = self.load(request).await else {
            return Outcome::NotFound;
        };
        self.after_read(&mut entity).await;
        Outcome::Success(entity)
    }

    async fn update(&self, request: &Request) -> Outcome<Self::Resource> {
        if !request.authenticated {
            return Outcome::Unauthorized;
        }
        let Some(mut entity) = self.load(request).await else {
            return Outcome::NotFound;
        };

        entity.record_mut().fill(
            request
                .params
                .iter()
                .map(|(name, value)| (name.as_str(), value.clone())),
        );
        if !entity.record_mut().validate_required() {
            return Outcome::Invalid(entity);
        }

        if entity.save(self.executor()).await {
            Outcome::Success(entity)
        } else {
            Outcome::Failed(entity)
        }
    }

    /// Delete and report the entity as it was before deletion
    async fn delete(&self, request: &Request) -> Outcome<Self::Resource> {
        if !request.authenticated {
            return Outcome::Unauthorized;
        }
        let Some(mut entity) = self.load(request).await else {
            return Outcome::NotFound;
        };

        self.after_read(&mut entity).await;
        let snapshot = entity.clone();
        if self.perform_delete(&mut entity).await {
            Outcome::Success(snapshot)
        } else {
            Outcome::Failed(snapshot)
        }
    }

    /// The entity the request's id refers to
    async fn load(&self, request: &Request) -> Option<Self::Resource> {
        let id = request.id.as_deref()?;
        Self::Resource::get_by_id(self.executor(), id).await
    }
}

/// A service with no hooks, for entities that need nothing beyond the defaults
pub struct DefaultCrudService<T> {
    connection: Connection,
    resource: PhantomData<fn() -> T>,
}

impl<T> DefaultCrudService<T> {
    #[must_use]
    pub const fn new(connection: Connection) -> Self {
        Self {
            connection,
            resource: PhantomData,
        }
    }
}

#[async_trait]
impl<T> CrudService for DefaultCrudService<T>
where
    T: Entity + Clone + 'static,
{
    type Resource = T;

    fn executor(&self) -> &dyn Executor {
        &self.connection
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_param_u64_accepts_numbers_and_numeric_strings() {
        let request = Request::new()
            .param("limit", 25)
            .param("page", "3")
            .param("bad", "x")
            .param("negative", -1);
        assert_eq!(request.param_u64("limit"), Some(25));
        assert_eq!(request.param_u64("page"), Some(3));
        assert_eq!(request.param_u64("bad"), None);
        assert_eq!(request.param_u64("negative"), None);
        assert_eq!(request.param_u64("missing"), None);
    }

    #[test]
    fn test_request_builder() {
        let request = Request::new()
            .with_id("9")
            .authenticated(true)
            .params(BTreeMap::from([("name".to_string(), json!("Foo"))]));
        assert_eq!(request.id.as_deref(), Some("9"));
        assert!(request.authenticated);
        assert_eq!(request.params["name"], json!("Foo"));
    }

    #[test]
    fn test_outcome_accessors() {
        assert!(Outcome::Success(1).is_success());
        assert_eq!(Outcome::Invalid(2).into_inner(), Some(2));
        assert_eq!(Outcome::Failed(3).success(), None);
        assert_eq!(Outcome::<u8>::NotFound.into_inner(), None);
        assert_eq!(Outcome::<u8>::Unauthorized.success(), None);
    }
}
