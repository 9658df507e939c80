pub mod aggregation;
pub mod department;
pub mod employee;
pub mod resignation;
pub mod roster;
pub mod statistics;
