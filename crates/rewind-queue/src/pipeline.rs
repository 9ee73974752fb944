//! Async plumbing: activity lookup off the mutation context, world changes on it
//!
//! Lookups can block on storage, so [`ActivityFetcher`] runs them on the
//! blocking pool. Everything that touches the world or the service is sent
//! as a [`MutationJob`] to the single [`MutationContext`], which handles jobs
//! one at a time and never awaits in the middle of one. Each job answers on
//! its own oneshot channel.

use crate::error::{Error, Result};
use crate::queue::{Mode, QueueKind};
use crate::result::ModificationQueueResult;
use crate::ruleset::ModificationRuleset;
use crate::service::ModificationQueueService;
use rewind_core::{Activity, ActivityQuery, ActivitySource, Owner, WorldAccess};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

/// A rollback or restore asked for by `owner`
#[derive(Debug, Clone)]
pub struct ModificationRequest {
    pub kind: QueueKind,
    pub owner: Owner,
    pub query: ActivityQuery,
    pub ruleset: ModificationRuleset,
    pub mode: Mode,
}

type Reply<T> = oneshot::Sender<Result<T>>;

/// Work for the mutation context
#[derive(Debug)]
pub enum MutationJob {
    /// Build a queue from already fetched activities and apply it
    Modify {
        request: ModificationRequest,
        activities: Vec<Activity>,
        reply: Reply<Arc<ModificationQueueResult>>,
    },
    ConfirmPreview {
        owner: Owner,
        reply: Reply<Arc<ModificationQueueResult>>,
    },
    ClearOwner {
        owner: Owner,
        reply: Reply<()>,
    },
}

/// Owns the service and the world; the only place mutations happen
pub struct MutationContext<W> {
    service: ModificationQueueService,
    world: W,
    jobs: mpsc::Receiver<MutationJob>,
}

impl<W: WorldAccess> MutationContext<W> {
    /// Create the context and a handle for submitting jobs to it
    ///
    /// `capacity` bounds how many jobs may wait before senders are
    /// suspended.
    pub fn new(
        service: ModificationQueueService,
        world: W,
        capacity: usize,
    ) -> (Self, MutationHandle) {
        let (tx, rx) = mpsc::channel(capacity);
        let context = Self {
            service,
            world,
            jobs: rx,
        };
        (context, MutationHandle { jobs: tx })
    }

    /// Process jobs until every handle is dropped
    ///
    /// Returns the service and world so callers can inspect final state.
    pub async fn run(mut self) -> (ModificationQueueService, W) {
        info!("mutation context started");
        while let Some(job) = self.jobs.recv().await {
            self.handle(job);
        }
        info!("mutation context stopped");
        (self.service, self.world)
    }

    fn handle(&mut self, job: MutationJob) {
        match job {
            MutationJob::Modify {
                request,
                activities,
                reply,
            } => {
                let result = self.modify(request, activities);
                let _ = reply.send(result);
            }
            MutationJob::ConfirmPreview { owner, reply } => {
                let result = self.service.confirm_preview(&owner, &mut self.world);
                let _ = reply.send(result);
            }
            MutationJob::ClearOwner { owner, reply } => {
                self.service.clear_everything_for_owner(&owner, &mut self.world);
                let _ = reply.send(Ok(()));
            }
        }
    }

    fn modify(
        &mut self,
        request: ModificationRequest,
        activities: Vec<Activity>,
    ) -> Result<Arc<ModificationQueueResult>> {
        let ModificationRequest {
            kind,
            owner,
            query,
            ruleset,
            mode,
        } = request;
        match kind {
            QueueKind::Rollback => {
                self.service
                    .new_rollback_queue(ruleset, owner, query, activities)?;
            }
            QueueKind::Restore => {
                self.service
                    .new_restore_queue(ruleset, owner, query, activities)?;
            }
        }
        self.service.apply_current(&mut self.world, mode)
    }
}

/// Cloneable sender side of the mutation context
#[derive(Debug, Clone)]
pub struct MutationHandle {
    jobs: mpsc::Sender<MutationJob>,
}

impl MutationHandle {
    /// Apply a request over activities that were already fetched
    pub async fn modify(
        &self,
        request: ModificationRequest,
        activities: Vec<Activity>,
    ) -> Result<Arc<ModificationQueueResult>> {
        self.call(|reply| MutationJob::Modify {
            request,
            activities,
            reply,
        })
        .await
    }

    pub async fn confirm_preview(&self, owner: Owner) -> Result<Arc<ModificationQueueResult>> {
        self.call(|reply| MutationJob::ConfirmPreview { owner, reply })
            .await
    }

    pub async fn clear_owner(&self, owner: Owner) -> Result<()> {
        self.call(|reply| MutationJob::ClearOwner { owner, reply })
            .await
    }

    async fn call<T>(&self, job: impl FnOnce(Reply<T>) -> MutationJob) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.jobs
            .send(job(tx))
            .await
            .map_err(|_| Error::PipelineClosed)?;
        rx.await.map_err(|_| Error::PipelineClosed)?
    }
}

/// Looks activities up on the blocking pool and forwards them for applying
pub struct ActivityFetcher<S> {
    source: Arc<S>,
    handle: MutationHandle,
}

impl<S> ActivityFetcher<S>
where
    S: ActivitySource + Send + Sync + 'static,
{
    pub fn new(source: S, handle: MutationHandle) -> Self {
        Self {
            source: Arc::new(source),
            handle,
        }
    }

    /// Run the query without blocking the async executor
    pub async fn fetch(&self, query: ActivityQuery) -> Result<Vec<Activity>> {
        let source = Arc::clone(&self.source);
        let activities = tokio::task::spawn_blocking(move || source.query(&query))
            .await
            .map_err(|e| Error::FetchTask(e.to_string()))??;
        debug!(count = activities.len(), "activities fetched");
        Ok(activities)
    }

    /// Fetch the request's activities, then apply them on the mutation context
    pub async fn modify(
        &self,
        request: ModificationRequest,
    ) -> Result<Arc<ModificationQueueResult>> {
        let activities = self.fetch(request.query.clone()).await?;
        self.handle.modify(request, activities).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use chrono::{TimeZone, Utc};
    use rewind_core::{
        ActionData, ActionType, Actor, BlockState, InMemoryWorld, Location, MemoryActivitySource,
    };

    fn loc() -> Location {
        Location::new("world", 0, 64, 0)
    }

    fn block(action: ActionType, prior: &str, new: &str, secs: i64) -> Activity {
        Activity::new(
            action,
            Utc.timestamp_opt(secs, 0).unwrap(),
            loc(),
            Actor::player(2, "griefer"),
            ActionData::Block {
                prior: BlockState::new(prior),
                new: BlockState::new(new),
            },
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_fetch_preview_confirm() {
        let owner = Owner::player(1);
        let source = MemoryActivitySource::new(vec![
            block(ActionType::BlockBreak, "stone", "air", 1),
            block(ActionType::BlockPlace, "air", "dirt", 2),
        ]);
        let mut world = InMemoryWorld::new();
        world.put_block(loc(), BlockState::new("dirt"));

        let config = EngineConfig::default();
        let service = ModificationQueueService::from_config(&config);
        let (context, handle) = MutationContext::new(service, world, config.channel_capacity);
        let task = tokio::spawn(context.run());

        let fetcher = ActivityFetcher::new(source, handle.clone());
        let preview = fetcher
            .modify(ModificationRequest {
                kind: QueueKind::Rollback,
                owner,
                query: ActivityQuery::for_modification().near(loc(), 10),
                ruleset: ModificationRuleset::from_config(&config),
                mode: Mode::Planning,
            })
            .await
            .unwrap();
        assert_eq!(preview.planned(), 2);

        let confirmed = handle.confirm_preview(owner).await.unwrap();
        assert_eq!(confirmed.applied(), 2);
        handle.clear_owner(owner).await.unwrap();

        drop(fetcher);
        drop(handle);
        let (service, world) = task.await.unwrap();
        assert!(service.queue_available());
        assert!(service.queue_result_for_owner(&owner).is_none());
        assert_eq!(world.block_at(&loc()), BlockState::new("stone"));
    }

    #[tokio::test]
    async fn test_closed_context() {
        let service = ModificationQueueService::from_config(&EngineConfig::default());
        let (context, handle) = MutationContext::new(service, InMemoryWorld::new(), 1);
        drop(context);

        assert!(matches!(
            handle.clear_owner(Owner::Console).await,
            Err(Error::PipelineClosed)
        ));
    }
}
