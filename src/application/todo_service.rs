use crate::application::context::{ContextError, RequestContext};
use crate::application::error::{Outcome, Rejection, ServiceError, ServiceResult};
use crate::domain::repository::TodoRepository;
use crate::domain::todo::{CreateTodo, PageRequest, Todo, TodoId, UpdateTodo};
use anyhow::anyhow;
use async_trait::async_trait;
use tracing::{debug, error, warn};

pub const DEFAULT_PAGE_SIZE: u32 = 5;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Page size policy for `list`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    pub default_size: u32,
    pub max_size: u32,
}

impl Default for PageLimits {
    fn default() -> Self { Self { default_size: DEFAULT_PAGE_SIZE, max_size: MAX_PAGE_SIZE } }
}

impl PageLimits {
    /// Zero selects the default size; anything above the cap is clamped to it.
    pub fn effective(self, requested: u32) -> u32 {
        let size = if requested == 0 { self.default_size } else { requested };
        size.clamp(1, self.max_size.max(1))
    }
}

#[async_trait]
pub trait TodoService: Send + Sync + 'static {
    async fn create(&self, ctx: &RequestContext, input: CreateTodo) -> ServiceResult<Outcome>;
    async fn list(&self, ctx: &RequestContext, page: PageRequest) -> ServiceResult<Vec<Todo>>;
    async fn update(&self, ctx: &RequestContext, input: UpdateTodo) -> ServiceResult<Outcome>;
    async fn delete(&self, ctx: &RequestContext, ids: &[TodoId]) -> ServiceResult<()>;
}

#[derive(Clone)]
pub struct TodoServiceImpl<R: TodoRepository> {
    repo: R,
    limits: PageLimits,
}

impl<R: TodoRepository> TodoServiceImpl<R> {
    pub fn new(repo: R) -> Self { Self { repo, limits: PageLimits::default() } }

    pub fn with_page_limits(mut self, limits: PageLimits) -> Self {
        self.limits = limits;
        self
    }
}

/// The context ended before the store answered, as opposed to the store failing.
pub(crate) fn interruption(e: &anyhow::Error) -> Option<ContextError> {
    e.downcast_ref::<ContextError>().copied()
}

fn internal(op: &'static str) -> impl FnOnce(anyhow::Error) -> ServiceError {
    move |e| {
        match interruption(&e) {
            Some(reason) => warn!(operation = op, %reason, "request interrupted"),
            None => error!(operation = op, error = %format!("{e:#}"), "store failure"),
        }
        ServiceError::Internal(e.context(op))
    }
}

#[async_trait]
impl<R: TodoRepository> TodoService for TodoServiceImpl<R> {
    async fn create(&self, ctx: &RequestContext, input: CreateTodo) -> ServiceResult<Outcome> {
        if input.subject.is_empty() {
            debug!("create rejected: empty subject");
            return Ok(Outcome::Rejected(Rejection::EmptySubject));
        }

        let id = ctx
            .run(self.repo.insert(&input.subject, &input.description))
            .await
            .map_err(internal("insert todo"))?;

        // Timestamps are stamped by the store, so read back what it kept.
        let todo = ctx
            .run(self.repo.find(id))
            .await
            .map_err(internal("confirm inserted todo"))?
            .ok_or_else(|| internal("confirm inserted todo")(anyhow!("todo {id} missing right after insert")))?;

        debug!(%id, "todo created");
        Ok(Outcome::Persisted(todo))
    }

    async fn list(&self, ctx: &RequestContext, page: PageRequest) -> ServiceResult<Vec<Todo>> {
        let limit = self.limits.effective(page.size);
        let prev_id = page.prev_id.max(0);
        let todos = ctx
            .run(self.repo.list_before(prev_id, limit))
            .await
            .map_err(internal("list todos"))?;
        debug!(prev_id, limit, returned = todos.len(), "todos listed");
        Ok(todos)
    }

    async fn update(&self, ctx: &RequestContext, input: UpdateTodo) -> ServiceResult<Outcome> {
        if input.id.is_zero() {
            debug!("update rejected: zero id");
            return Ok(Outcome::Rejected(Rejection::MissingId));
        }
        if input.subject.is_empty() {
            debug!(id = %input.id, "update rejected: empty subject");
            return Ok(Outcome::Rejected(Rejection::EmptySubject));
        }

        let matched = ctx
            .run(self.repo.update(input.id, &input.subject, &input.description))
            .await
            .map_err(internal("update todo"))?;
        if matched == 0 {
            debug!(id = %input.id, "update matched no row");
            return Err(ServiceError::NotFound(input.id));
        }

        let todo = ctx
            .run(self.repo.find(input.id))
            .await
            .map_err(internal("confirm updated todo"))?
            .ok_or(ServiceError::NotFound(input.id))?;

        debug!(id = %todo.id, "todo updated");
        Ok(Outcome::Persisted(todo))
    }

    async fn delete(&self, ctx: &RequestContext, ids: &[TodoId]) -> ServiceResult<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let removed = ctx
            .run(self.repo.delete_many(ids))
            .await
            .map_err(internal("delete todos"))?;
        debug!(requested = ids.len(), removed, "todos deleted");
        Ok(())
    }
}
