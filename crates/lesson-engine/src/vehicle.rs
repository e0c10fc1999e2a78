//! Vehicle auto-assignment.
//!
//! When an instructor is picked for a lesson, the vehicles assigned to that
//! instructor decide what happens to the vehicle field:
//!
//! | Vehicles | Resolution | Effect |
//! |----------|------------|--------|
//! | 0 | [`VehicleResolution::None`] | lesson proceeds without a vehicle (informational) |
//! | 1 | [`VehicleResolution::Single`] | vehicle auto-filled |
//! | >1 | [`VehicleResolution::Ambiguous`] | user must choose; the resolver never guesses |

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result, StoreError};
use crate::model::{InstructorId, Vehicle, VehicleId};

/// Fleet lookup, implemented by the surrounding system.
pub trait VehicleDirectory {
    fn find_vehicles_by_instructor(&self, instructor: InstructorId)
        -> std::result::Result<Vec<Vehicle>, StoreError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "resolution", content = "vehicles", rename_all = "snake_case")]
pub enum VehicleResolution {
    None,
    Single(VehicleId),
    Ambiguous(Vec<VehicleId>),
}

impl VehicleResolution {
    /// The vehicle to pre-fill, if exactly one is eligible.
    pub fn auto_fill(&self) -> Option<VehicleId> {
        match self {
            VehicleResolution::Single(id) => Some(*id),
            _ => None,
        }
    }
}

/// Classify the vehicles assigned to `instructor`.
pub fn resolve_vehicle<D: VehicleDirectory + ?Sized>(
    directory: &D,
    instructor: InstructorId,
) -> Result<VehicleResolution> {
    let vehicles = directory.find_vehicles_by_instructor(instructor)?;
    let mut ids: Vec<VehicleId> = vehicles.iter().map(|v| v.id).collect();
    ids.sort();
    ids.dedup();

    let resolution = match ids.as_slice() {
        [] => VehicleResolution::None,
        [only] => VehicleResolution::Single(*only),
        _ => VehicleResolution::Ambiguous(ids),
    };
    tracing::debug!(instructor = %instructor, ?resolution, "vehicle resolved");
    Ok(resolution)
}

/// Vehicle field state of a booking form.
///
/// Re-resolves on every instructor change and clears whatever vehicle the
/// previous instructor produced.
#[derive(Debug, Clone, Default)]
pub struct VehicleSelection {
    instructor: Option<InstructorId>,
    resolution: Option<VehicleResolution>,
    vehicle: Option<VehicleId>,
    auto_assigned: bool,
    allow_override: bool,
}

impl VehicleSelection {
    /// `allow_override` lets the caller replace an auto-filled vehicle.
    pub fn new(allow_override: bool) -> Self {
        Self {
            allow_override,
            ..Self::default()
        }
    }

    pub fn instructor(&self) -> Option<InstructorId> {
        self.instructor
    }

    pub fn vehicle(&self) -> Option<VehicleId> {
        self.vehicle
    }

    pub fn is_auto_assigned(&self) -> bool {
        self.auto_assigned
    }

    pub fn resolution(&self) -> Option<&VehicleResolution> {
        self.resolution.as_ref()
    }

    /// React to the instructor field changing. Setting the same instructor again is a no-op.
    pub fn set_instructor<D: VehicleDirectory + ?Sized>(
        &mut self,
        directory: &D,
        instructor: Option<InstructorId>,
    ) -> Result<Option<&VehicleResolution>> {
        if instructor == self.instructor && self.resolution.is_some() {
            return Ok(self.resolution.as_ref());
        }

        self.instructor = instructor;
        self.vehicle = None;
        self.auto_assigned = false;
        self.resolution = None;

        if let Some(id) = instructor {
            let resolution = resolve_vehicle(directory, id)?;
            if let Some(vehicle) = resolution.auto_fill() {
                self.vehicle = Some(vehicle);
                self.auto_assigned = true;
            }
            self.resolution = Some(resolution);
        }
        Ok(self.resolution.as_ref())
    }

    /// Manually pick a vehicle.
    ///
    /// Without override permission only one of the ambiguous candidates is
    /// accepted; an auto-filled vehicle stays locked.
    pub fn choose(&mut self, vehicle: VehicleId) -> Result<()> {
        let allowed = self.allow_override
            || matches!(&self.resolution, Some(VehicleResolution::Ambiguous(c)) if c.contains(&vehicle))
            || matches!(&self.resolution, Some(VehicleResolution::Single(v)) if *v == vehicle);
        if !allowed {
            return Err(EngineError::InvalidVehicleSelection(vehicle));
        }
        self.auto_assigned = self.resolution.as_ref().and_then(|r| r.auto_fill()) == Some(vehicle);
        self.vehicle = Some(vehicle);
        Ok(())
    }

    /// The vehicle to submit with the booking.
    ///
    /// # Errors
    ///
    /// [`EngineError::AmbiguousVehicle`] when several vehicles are eligible and none was chosen.
    pub fn finalize(&self) -> Result<Option<VehicleId>> {
        match (&self.resolution, self.vehicle) {
            (Some(VehicleResolution::Ambiguous(candidates)), None) => {
                Err(EngineError::AmbiguousVehicle(candidates.clone()))
            }
            (_, vehicle) => Ok(vehicle),
        }
    }
}
