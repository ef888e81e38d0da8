//! Demo population for the starting town.
//!
//! Five residents placed around the plaza. The simulation driver only
//! needs them placed; the engine driver also gets a fixed daily routine
//! per resident since it has no decision provider.

use hamlet_core::clock::Clock;
use hamlet_core::simulation::SimulationError;
use hamlet_core::{Engine, Simulation};
use hamlet_types::{AgentId, ScheduledEvent};
use hamlet_world::StartingTownIds;
use tracing::{info, warn};

/// A seed resident.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resident {
    /// Agent id.
    pub id: u64,
    /// Display name.
    pub name: &'static str,
    /// Starting x coordinate.
    pub x: f64,
    /// Starting y coordinate.
    pub y: f64,
}

/// The five demo residents.
pub const DEMO_RESIDENTS: [Resident; 5] = [
    Resident { id: 1, name: "Ming", x: 210.0, y: 220.0 },
    Resident { id: 2, name: "Hong", x: 115.0, y: 165.0 },
    Resident { id: 3, name: "Hua", x: 320.0, y: 120.0 },
    Resident { id: 4, name: "Li", x: 380.0, y: 280.0 },
    Resident { id: 5, name: "Wang", x: 130.0, y: 370.0 },
];

/// Fallback walking time when the world cannot estimate one.
const DEFAULT_WALK_MINUTES: u64 = 20;

/// Add every demo resident to the simulation.
///
/// A resident whose starting point falls inside a location is placed in it.
///
/// # Errors
///
/// Returns the first [`SimulationError`] from adding a resident.
pub fn populate_simulation(sim: &mut Simulation) -> Result<usize, SimulationError> {
    for resident in &DEMO_RESIDENTS {
        let location = sim.world().location_at(resident.x, resident.y);
        sim.add_agent(
            AgentId::new(resident.id),
            resident.name,
            resident.x,
            resident.y,
            location,
        )?;
    }
    info!(count = DEMO_RESIDENTS.len(), "Demo residents added");
    Ok(DEMO_RESIDENTS.len())
}

/// Place every demo resident in the engine's world and schedule one day
/// of routine for each.
///
/// Work starts are staggered by a quarter hour per resident. Events that
/// conflict with something already queued are skipped with a warning.
///
/// # Errors
///
/// Returns a [`hamlet_world::WorldError`] if a resident cannot be placed.
pub fn populate_engine(
    engine: &mut Engine,
    town: &StartingTownIds,
) -> Result<usize, hamlet_world::WorldError> {
    let day = engine.clock().day();
    let at = |hour: u64, minute: u64| Clock::from_day_hour_minute(day, hour, minute).total_minutes();
    let plaza = engine
        .world()
        .location(town.plaza)
        .map(|loc| (loc.x, loc.y));

    let mut scheduled = 0_usize;
    for (offset, resident) in (0_u64..).zip(DEMO_RESIDENTS.iter()) {
        let agent = AgentId::new(resident.id);
        let location = engine.world().location_at(resident.x, resident.y);
        engine
            .world_mut()
            .place_agent(agent, resident.x, resident.y, location)?;

        let stagger = offset.saturating_mul(15);
        let mut routine = vec![
            ScheduledEvent::work(agent, at(9, stagger), 150, "day shift"),
            ScheduledEvent::use_phone(agent, at(12, 30), 30, &["browse_feed"]),
        ];
        if let Some(target) = plaza {
            let walk = engine
                .world()
                .movement_minutes(agent, target.0, target.1)
                .unwrap_or(DEFAULT_WALK_MINUTES)
                .max(1);
            routine.push(ScheduledEvent::move_to(
                agent,
                at(17, 0),
                walk,
                target,
                Some(town.plaza),
            ));
        }
        routine.push(ScheduledEvent::sleep(agent, at(22, 0), 540));

        for event in routine {
            let kind = event.kind;
            match engine.schedule(event) {
                Ok(_) => scheduled = scheduled.saturating_add(1),
                Err(e) => warn!(agent = %agent, kind = ?kind, error = %e, "Routine event skipped"),
            }
        }
    }

    info!(
        residents = DEMO_RESIDENTS.len(),
        events = scheduled,
        "Demo routines scheduled"
    );
    Ok(scheduled)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use hamlet_core::config::{EngineConfig, SimulationConfig};
    use hamlet_core::decision::FixedDecisionProvider;
    use hamlet_core::handler::HandlerRegistry;
    use hamlet_types::EventKind;
    use hamlet_world::{World, create_starting_town};

    use super::*;

    fn town() -> (World, StartingTownIds) {
        let mut world = World::default();
        let ids = create_starting_town(&mut world).unwrap();
        (world, ids)
    }

    #[test]
    fn residents_start_inside_locations() {
        let (world, ids) = town();
        let mut sim = Simulation::new(
            SimulationConfig::default(),
            world,
            Arc::new(FixedDecisionProvider::default()),
        );

        assert_eq!(populate_simulation(&mut sim).unwrap(), 5);
        assert_eq!(sim.agent_count(), 5);
        let ming = sim.world().position(AgentId::new(1)).unwrap();
        assert_eq!(ming.location_id, Some(ids.plaza));
        assert!(populate_simulation(&mut sim).is_err());
    }

    #[test]
    fn engine_gets_a_routine_per_resident() {
        let (world, ids) = town();
        let mut engine = Engine::new(
            EngineConfig::default(),
            world,
            HandlerRegistry::with_builtin_handlers(),
        );

        let scheduled = populate_engine(&mut engine, &ids).unwrap();
        assert_eq!(scheduled, 20);
        assert_eq!(engine.queue().len(), 20);

        let ming = engine.get_schedule(AgentId::new(1), None, None);
        let kinds: Vec<_> = ming.iter().map(|event| event.kind).collect();
        assert_eq!(
            kinds,
            vec![EventKind::Work, EventKind::UsePhone, EventKind::Move, EventKind::Sleep]
        );
    }
}
