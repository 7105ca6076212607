use crate::access::{Caller, Operation};
use crate::engine::gate;
use crate::error::AppError;
use crate::models::driver::Driver;
use crate::models::vehicle::Vehicle;
use crate::state::AppState;

pub fn list_drivers(state: &AppState, caller: &Caller) -> Result<Vec<Driver>, AppError> {
    gate(state, caller, Operation::ListDrivers)?;
    Ok(state.registry.drivers())
}

pub fn list_vehicles(state: &AppState, caller: &Caller) -> Result<Vec<Vehicle>, AppError> {
    gate(state, caller, Operation::ListVehicles)?;
    Ok(state.registry.vehicles())
}
