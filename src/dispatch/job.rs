use async_trait::async_trait;

use super::context::LoadContext;

/// A named unit of work wrapped by a [`TaskNode`](super::TaskNode).
///
/// `load_data` has no return value: a job reports its own failures. `name`
/// should stay stable for the lifetime of the node so name lookups are meaningful.
#[async_trait]
pub trait Job: Send + Sync {
    fn name(&self) -> String;

    async fn load_data(&self, ctx: &LoadContext);
}
