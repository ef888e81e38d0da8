//! Default starting town: ten locations around a central plaza.

use hamlet_types::{LocationId, LocationKind};

use crate::error::WorldError;
use crate::location::Location;
use crate::world::World;

/// Ids of the starting town's locations, for seeding agents.
#[derive(Debug, Clone, Copy)]
pub struct StartingTownIds {
    /// Central plaza (outdoor, public).
    pub plaza: LocationId,
    /// Cafe.
    pub cafe: LocationId,
    /// Library.
    pub library: LocationId,
    /// Park (outdoor).
    pub park: LocationId,
    /// Hospital.
    pub hospital: LocationId,
    /// Town hall.
    pub town_hall: LocationId,
    /// First residential block.
    pub residence_a: LocationId,
    /// Second residential block.
    pub residence_b: LocationId,
    /// Supermarket.
    pub supermarket: LocationId,
    /// Office building.
    pub office: LocationId,
}

/// Populate `world` with the starting town.
pub fn create_starting_town(world: &mut World) -> Result<StartingTownIds, WorldError> {
    let ids = StartingTownIds {
        plaza: LocationId::new(1),
        cafe: LocationId::new(2),
        library: LocationId::new(3),
        park: LocationId::new(4),
        hospital: LocationId::new(5),
        town_hall: LocationId::new(6),
        residence_a: LocationId::new(7),
        residence_b: LocationId::new(8),
        supermarket: LocationId::new(9),
        office: LocationId::new(10),
    };

    let locations = [
        Location::new(ids.plaza, "Central Plaza", LocationKind::Public, 200.0, 200.0)
            .with_size(60.0, 60.0)
            .outdoor(),
        Location::new(ids.cafe, "Cafe", LocationKind::Commercial, 100.0, 150.0)
            .with_size(30.0, 25.0)
            .with_hours(7, 22)
            .with_capacity(20),
        Location::new(ids.library, "Library", LocationKind::Education, 300.0, 100.0)
            .with_size(50.0, 40.0)
            .with_hours(8, 20),
        Location::new(ids.park, "Park", LocationKind::Recreation, 350.0, 250.0)
            .with_size(80.0, 60.0)
            .outdoor(),
        Location::new(ids.hospital, "Hospital", LocationKind::Medical, 50.0, 300.0)
            .with_size(40.0, 50.0),
        Location::new(ids.town_hall, "Town Hall", LocationKind::Government, 200.0, 50.0)
            .with_size(45.0, 35.0)
            .with_hours(9, 17),
        Location::new(ids.residence_a, "Residence A", LocationKind::Residential, 100.0, 350.0)
            .with_size(60.0, 50.0),
        Location::new(ids.residence_b, "Residence B", LocationKind::Residential, 300.0, 350.0)
            .with_size(60.0, 50.0),
        Location::new(ids.supermarket, "Supermarket", LocationKind::Commercial, 150.0, 280.0)
            .with_size(35.0, 30.0)
            .with_hours(7, 23),
        Location::new(ids.office, "Office Tower", LocationKind::Workplace, 380.0, 150.0)
            .with_size(40.0, 60.0)
            .with_hours(8, 20),
    ];

    for location in locations {
        world.add_location(location)?;
    }

    Ok(ids)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn town_has_ten_locations() {
        let mut world = World::default();
        let ids = create_starting_town(&mut world).unwrap();
        assert_eq!(world.locations().count(), 10);
        assert!(!world.location(ids.park).unwrap().is_indoor);
        assert!(world.location(ids.cafe).unwrap().is_indoor);
    }

    #[test]
    fn town_cannot_be_created_twice() {
        let mut world = World::default();
        create_starting_town(&mut world).unwrap();
        assert!(create_starting_town(&mut world).is_err());
    }
}
