//! Grief rollback walkthrough
//!
//! Replays a small griefing incident against an in-memory world: a moderator
//! previews a rollback, confirms it, and the console then restores the
//! incident again to show the other direction.
//!
//! Usage: `grief_rollback [config.ron]`. Set `RUST_LOG=debug` to see every
//! skipped activity and cache eviction.

use chrono::{DateTime, Duration, Utc};
use rewind_core::{
    ActionData, ActionType, Activity, ActivityQuery, Actor, BlockState, EntitySnapshot,
    InMemoryWorld, ItemStack, Location, MemoryActivitySource, Owner, WorldAccess,
};
use rewind_queue::{
    ActivityFetcher, EngineConfig, Mode, ModificationQueueResult, ModificationQueueService,
    ModificationRequest, ModificationRuleset, MutationContext, QueueKind, QueueReport,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn load_config() -> rewind_queue::Result<EngineConfig> {
    match std::env::args().nth(1) {
        Some(path) => {
            println!("Loading configuration from: {}", path);
            EngineConfig::load(&path)
        }
        None => Ok(EngineConfig::default()),
    }
}

fn wall(x: i32) -> Location {
    Location::new("world", x, 64, 0)
}

fn block_change(
    action: ActionType,
    at: DateTime<Utc>,
    location: Location,
    prior: BlockState,
    new: BlockState,
) -> rewind_core::Result<Activity> {
    Activity::new(
        action,
        at,
        location,
        Actor::player(2, "griefer"),
        ActionData::Block { prior, new },
    )
}

/// What the griefer did, oldest first
fn incident(start: DateTime<Utc>) -> rewind_core::Result<Vec<Activity>> {
    let at = |minutes: i64| start + Duration::minutes(minutes);
    let griefer = || Actor::player(2, "griefer");
    let stone = || BlockState::new("stone");

    let mut activities = Vec::new();
    for (minute, x) in [(1, 1), (2, 2), (3, 3)] {
        activities.push(block_change(
            ActionType::BlockBreak,
            at(minute),
            wall(x),
            stone(),
            BlockState::air(),
        )?);
    }
    activities.push(block_change(
        ActionType::BlockPlace,
        at(4),
        wall(2),
        BlockState::air(),
        BlockState::new("tnt"),
    )?);
    activities.push(Activity::new(
        ActionType::EntityKill,
        at(5),
        Location::new("world", 0, 65, 2),
        griefer(),
        ActionData::Entity {
            entity: EntitySnapshot::new("sheep").with_data("color", "white"),
        },
    )?);
    activities.push(Activity::new(
        ActionType::ItemDrop,
        at(6),
        Location::new("world", 5, 64, 0),
        griefer(),
        ActionData::Item {
            item: ItemStack::new("cobblestone", 4),
        },
    )?);
    activities.push(
        Activity::new(ActionType::PlayerChat, at(7), wall(0), griefer(), ActionData::Generic)?
            .with_descriptor("lol"),
    );
    activities.push(block_change(
        ActionType::BlockPlace,
        at(8),
        Location::new("world", 3, 64, 1),
        BlockState::air(),
        BlockState::new("lava"),
    )?);
    Ok(activities)
}

/// The world as the griefer left it
fn griefed_world() -> InMemoryWorld {
    let mut world = InMemoryWorld::new();
    world.put_block(wall(0), BlockState::new("stone"));
    world.put_block(wall(2), BlockState::new("tnt"));
    world.put_block(wall(4), BlockState::new("stone"));
    world.put_block(Location::new("world", 3, 64, 1), BlockState::new("lava"));
    world
}

fn print_world(label: &str, world: &InMemoryWorld) {
    let row: Vec<String> = (0..5)
        .map(|x| world.block_at(&wall(x)).material.to_string())
        .collect();
    println!("{}: wall = [{}]", label, row.join(", "));
    println!(
        "  {} blocks, {} entities, {} dropped stacks",
        world.block_count(),
        world.entity_count(),
        world.drop_count()
    );
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let config = load_config()?;

    let start = Utc::now() - Duration::minutes(30);
    let source = MemoryActivitySource::new(incident(start)?);
    let world = griefed_world();
    print_world("Before", &world);

    let (tx, mut completed) = mpsc::unbounded_channel();
    let mut service = ModificationQueueService::from_config(&config);
    service.set_completion_sink(move |result: Arc<ModificationQueueResult>| {
        let _ = tx.send(result);
    });

    let (context, handle) = MutationContext::new(service, world, config.channel_capacity);
    let context = tokio::spawn(context.run());
    let fetcher = ActivityFetcher::new(source, handle.clone());

    let moderator = Owner::player(1);
    let query = ActivityQuery::for_modification()
        .near(wall(2), 16)
        .by_actor("griefer");
    let ruleset = ModificationRuleset::from_config(&config).with_remove_drops(true, 3);

    let preview = fetcher
        .modify(ModificationRequest {
            kind: QueueKind::Rollback,
            owner: moderator,
            query: query.clone(),
            ruleset: ruleset.clone(),
            mode: Mode::Planning,
        })
        .await?;
    println!("\n{}", QueueReport::from_result(&preview));

    let rollback = handle.confirm_preview(moderator).await?;
    println!("{}", QueueReport::from_result(&rollback));

    let restore = fetcher
        .modify(ModificationRequest {
            kind: QueueKind::Restore,
            owner: Owner::Console,
            query,
            ruleset,
            mode: Mode::Completing,
        })
        .await?;
    println!("{}", QueueReport::from_result(&restore));

    handle.clear_owner(moderator).await?;
    drop(fetcher);
    drop(handle);

    let (_service, world) = context.await?;
    print_world("After restore", &world);

    while let Ok(result) = completed.try_recv() {
        info!(
            queue = %result.queue().id,
            kind = %result.queue().kind,
            mode = ?result.mode(),
            completed_at = %result.completed_at(),
            "completion received"
        );
    }

    Ok(())
}
