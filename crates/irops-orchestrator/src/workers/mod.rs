//! The five airline workers.

pub mod aircraft_maintenance;
pub mod airport_resource;
pub mod crew_scheduling;
pub mod customer_communication;
pub mod passenger_rebooking;

pub use aircraft_maintenance::AircraftMaintenanceWorker;
pub use airport_resource::AirportResourceWorker;
pub use crew_scheduling::CrewSchedulingWorker;
pub use customer_communication::CustomerCommunicationWorker;
pub use passenger_rebooking::PassengerRebookingWorker;

use crate::worker::{Worker, WorkerDeps};
use std::sync::Arc;

/// Registry order of the airline workers.
pub fn airline_workers(deps: &WorkerDeps) -> Vec<Arc<dyn Worker>> {
    vec![
        Arc::new(AircraftMaintenanceWorker::new(deps.clone())),
        Arc::new(CrewSchedulingWorker::new(deps.clone())),
        Arc::new(AirportResourceWorker::new(deps.clone())),
        Arc::new(PassengerRebookingWorker::new(deps.clone())),
        Arc::new(CustomerCommunicationWorker::new(deps.clone())),
    ]
}
