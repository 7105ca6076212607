use dashmap::DashMap;
use uuid::Uuid;

use crate::models::driver::Driver;
use crate::models::vehicle::Vehicle;

#[derive(Default)]
pub struct ResourceRegistry {
    drivers: DashMap<Uuid, Driver>,
    vehicles: DashMap<Uuid, Vehicle>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_driver(&self, name: &str, phone: &str) -> Driver {
        let driver = Driver {
            id: Uuid::new_v4(),
            name: name.to_string(),
            phone: phone.to_string(),
        };
        self.drivers.insert(driver.id, driver.clone());
        driver
    }

    pub fn add_vehicle(&self, plate: &str, capacity: u32) -> Vehicle {
        let vehicle = Vehicle {
            id: Uuid::new_v4(),
            plate: plate.to_string(),
            capacity,
        };
        self.vehicles.insert(vehicle.id, vehicle.clone());
        vehicle
    }

    pub fn seed_defaults(&self) {
        for (name, phone) in [
            ("Alice Perera", "0711111111"),
            ("Bimal Silva", "0722222222"),
            ("Chamari Dias", "0733333333"),
        ] {
            self.add_driver(name, phone);
        }

        for (plate, capacity) in [("SP-1234", 12), ("WP-5678", 20), ("CP-9101", 40)] {
            self.add_vehicle(plate, capacity);
        }
    }

    pub fn driver(&self, id: &Uuid) -> Option<Driver> {
        self.drivers.get(id).map(|entry| entry.value().clone())
    }

    pub fn vehicle(&self, id: &Uuid) -> Option<Vehicle> {
        self.vehicles.get(id).map(|entry| entry.value().clone())
    }

    pub fn drivers(&self) -> Vec<Driver> {
        let mut drivers: Vec<Driver> = self
            .drivers
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        drivers.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        drivers
    }

    pub fn vehicles(&self) -> Vec<Vehicle> {
        let mut vehicles: Vec<Vehicle> = self
            .vehicles
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        vehicles.sort_by(|a, b| a.plate.cmp(&b.plate).then(a.id.cmp(&b.id)));
        vehicles
    }

    pub fn driver_count(&self) -> usize {
        self.drivers.len()
    }

    pub fn vehicle_count(&self) -> usize {
        self.vehicles.len()
    }
}
