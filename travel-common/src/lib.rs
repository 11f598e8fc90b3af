//! Travel Planner Common Types
//!
//! Shared types used by the backend and its clients: directory records,
//! trip itineraries and the role gate.

pub mod gate;
pub mod trip;
pub mod user;

pub use gate::{Access, AccessDecision, RoutePolicy};
pub use trip::{Activity, DayPlan, GeneratedTrip, Trip, TripCriteria, TripLocation, TripRecord, TripsPage};
pub use user::{NewUser, Principal, StatusResponse, UserRecord, UserStatus, UsersPage};
