pub mod rating;
pub mod reservation;
pub mod screening;

pub use rating::RatingAggregator;
pub use reservation::ReservationEngine;
pub use screening::ScreeningManager;
