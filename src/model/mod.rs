pub mod department;
pub mod employee;
pub mod resignation;
pub mod role;
pub mod salary;
pub mod user;
