pub mod booking;
pub mod hall;
pub mod rating;
pub mod screening;
pub mod ticket;

pub use booking::{BookingReceipt, BookingRequest, Requester};
pub use hall::{HallGeometry, HallSeat};
pub use rating::{MovieRating, MovieRatingDetails, MovieRatingStats, RatingBaseline, RatingInput, WeightedRating};
pub use screening::{NewScreening, Screening, ScreeningUpdate};
pub use ticket::{NewTicket, ReservedSeat, SeatReservation, Ticket};
