pub mod distance;
pub mod doctor;
pub mod geo;
pub mod gnss;
pub mod map;
pub mod nmea;
pub mod pps;
