pub mod activity;
pub mod availability;
pub mod booking;
pub mod generator;
pub mod maintenance;

pub use activity::ActivityLogService;
pub use availability::SlotAvailabilityService;
pub use booking::SlotBookingService;
pub use generator::SlotGeneratorService;
pub use maintenance::SlotMaintenanceService;
