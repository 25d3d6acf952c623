pub mod balances;
pub mod clients;
pub mod generation;
pub mod health;
pub mod invoices;
pub mod meters;
pub mod payments;
pub mod readings;
pub mod tariffs;
