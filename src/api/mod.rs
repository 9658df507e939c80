pub mod department;
pub mod employee;
pub mod me;
pub mod resignation;
pub mod salary;
pub mod statistics;

/// Calendar date on the server, used as "today" by the employee and resignation handlers.
pub(crate) fn today() -> chrono::NaiveDate {
    chrono::Local::now().date_naive()
}
