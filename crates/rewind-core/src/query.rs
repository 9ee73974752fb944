//! Activity lookup: query descriptors and the source interface
//!
//! Storage is not part of this crate. The engine only needs something that
//! can turn an [`ActivityQuery`] into a finite list of activities before a
//! queue is built; [`MemoryActivitySource`] is the in-process implementation
//! used by tests and demos.

use crate::error::Result;
use crate::{ActionType, Activity, Location};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Filter criteria for activity lookup
///
/// All criteria are combined with AND; empty lists mean "any".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivityQuery {
    /// Center of the searched area
    pub reference: Option<Location>,
    /// Radius around `reference`, in blocks
    pub radius: Option<u32>,
    /// Restrict to one world
    pub world: Option<String>,
    /// Earliest timestamp (inclusive)
    pub after: Option<DateTime<Utc>>,
    /// Latest timestamp (inclusive)
    pub before: Option<DateTime<Utc>>,
    /// Actor names
    pub actors: Vec<String>,
    /// Action types
    pub action_types: Vec<ActionType>,
    /// Only action types the engine can reverse
    pub reversible_only: bool,
    /// Keep at most this many of the most recent matches
    pub limit: Option<usize>,
}

impl ActivityQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Query suitable for rollback and restore: reversible actions only
    pub fn for_modification() -> Self {
        Self {
            reversible_only: true,
            ..Default::default()
        }
    }

    pub fn near(mut self, reference: Location, radius: u32) -> Self {
        self.world = Some(reference.world.clone());
        self.reference = Some(reference);
        self.radius = Some(radius);
        self
    }

    pub fn in_world(mut self, world: impl Into<String>) -> Self {
        self.world = Some(world.into());
        self
    }

    pub fn after(mut self, after: DateTime<Utc>) -> Self {
        self.after = Some(after);
        self
    }

    pub fn before(mut self, before: DateTime<Utc>) -> Self {
        self.before = Some(before);
        self
    }

    pub fn by_actor(mut self, name: impl Into<String>) -> Self {
        self.actors.push(name.into());
        self
    }

    pub fn with_action(mut self, action: ActionType) -> Self {
        self.action_types.push(action);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Check if an activity satisfies every criterion except `limit`
    pub fn matches(&self, activity: &Activity) -> bool {
        let location = activity.location();

        if let Some(world) = &self.world {
            if &location.world != world {
                return false;
            }
        }

        if let (Some(reference), Some(radius)) = (&self.reference, self.radius) {
            if !reference.is_within(location, radius) {
                return false;
            }
        }

        if let Some(after) = self.after {
            if activity.timestamp() < after {
                return false;
            }
        }
        if let Some(before) = self.before {
            if activity.timestamp() > before {
                return false;
            }
        }

        if !self.actors.is_empty()
            && !self
                .actors
                .iter()
                .any(|name| name.eq_ignore_ascii_case(activity.actor().name()))
        {
            return false;
        }

        if !self.action_types.is_empty() && !self.action_types.contains(&activity.action_type())
        {
            return false;
        }

        if self.reversible_only && !activity.action_type().is_reversible() {
            return false;
        }

        true
    }
}

/// Anything that can look up recorded activities
///
/// Implementations may block on I/O; callers run them off the mutation
/// context. Results are returned oldest first.
pub trait ActivitySource {
    fn query(&self, query: &ActivityQuery) -> Result<Vec<Activity>>;
}

/// Activity source backed by a vector
#[derive(Debug, Clone, Default)]
pub struct MemoryActivitySource {
    activities: Vec<Activity>,
}

impl MemoryActivitySource {
    pub fn new(activities: Vec<Activity>) -> Self {
        Self { activities }
    }

    /// Add a recorded activity
    pub fn record(&mut self, activity: Activity) {
        self.activities.push(activity);
    }

    pub fn len(&self) -> usize {
        self.activities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.activities.is_empty()
    }
}

impl ActivitySource for MemoryActivitySource {
    fn query(&self, query: &ActivityQuery) -> Result<Vec<Activity>> {
        let mut matches: Vec<Activity> = Vec::new();
        for activity in &self.activities {
            if query.matches(activity) {
                activity.validate()?;
                matches.push(activity.clone());
            }
        }

        matches.sort_by_key(|a| a.timestamp());

        if let Some(limit) = query.limit {
            let skip = matches.len().saturating_sub(limit);
            matches.drain(..skip);
        }

        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ActionData, Actor, BlockState};
    use chrono::TimeZone;

    fn break_at(secs: i64, x: i32, actor: &str) -> Activity {
        Activity::new(
            ActionType::BlockBreak,
            Utc.timestamp_opt(secs, 0).unwrap(),
            Location::new("world", x, 64, 0),
            Actor::player(1, actor),
            ActionData::Block {
                prior: BlockState::new("stone"),
                new: BlockState::air(),
            },
        )
        .unwrap()
    }

    fn chat_at(secs: i64) -> Activity {
        Activity::new(
            ActionType::PlayerChat,
            Utc.timestamp_opt(secs, 0).unwrap(),
            Location::new("world", 0, 64, 0),
            Actor::player(1, "alex"),
            ActionData::Generic,
        )
        .unwrap()
        .with_descriptor("hello")
    }

    #[test]
    fn test_results_are_oldest_first() {
        let source = MemoryActivitySource::new(vec![
            break_at(30, 0, "alex"),
            break_at(10, 1, "alex"),
            break_at(20, 2, "alex"),
        ]);

        let found = source.query(&ActivityQuery::new()).unwrap();
        let secs: Vec<i64> = found.iter().map(|a| a.timestamp().timestamp()).collect();
        assert_eq!(secs, vec![10, 20, 30]);
    }

    #[test]
    fn test_radius_and_actor_filters() {
        let source = MemoryActivitySource::new(vec![
            break_at(10, 0, "alex"),
            break_at(20, 50, "alex"),
            break_at(30, 1, "steve"),
        ]);

        let query = ActivityQuery::new()
            .near(Location::new("world", 0, 64, 0), 5)
            .by_actor("ALEX");
        let found = source.query(&query).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].location().x, 0);
    }

    #[test]
    fn test_time_range_is_inclusive() {
        let source = MemoryActivitySource::new(vec![
            break_at(10, 0, "alex"),
            break_at(20, 0, "alex"),
            break_at(30, 0, "alex"),
        ]);

        let query = ActivityQuery::new()
            .after(Utc.timestamp_opt(20, 0).unwrap())
            .before(Utc.timestamp_opt(30, 0).unwrap());
        assert_eq!(source.query(&query).unwrap().len(), 2);
    }

    #[test]
    fn test_limit_keeps_most_recent() {
        let source = MemoryActivitySource::new(vec![
            break_at(10, 0, "alex"),
            break_at(20, 0, "alex"),
            break_at(30, 0, "alex"),
        ]);

        let found = source.query(&ActivityQuery::new().limit(2)).unwrap();
        let secs: Vec<i64> = found.iter().map(|a| a.timestamp().timestamp()).collect();
        assert_eq!(secs, vec![20, 30]);
    }

    #[test]
    fn test_modification_query_skips_generic_actions() {
        let source = MemoryActivitySource::new(vec![break_at(10, 0, "alex"), chat_at(20)]);

        assert_eq!(source.query(&ActivityQuery::new()).unwrap().len(), 2);
        let found = source.query(&ActivityQuery::for_modification()).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].action_type(), ActionType::BlockBreak);
    }
}
