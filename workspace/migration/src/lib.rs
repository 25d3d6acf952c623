pub use sea_orm_migration::prelude::*;

mod m20240115_000001_create_registry;
mod m20240220_000001_create_billing;
mod m20240310_000001_create_payment_ledger;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240115_000001_create_registry::Migration),
            Box::new(m20240220_000001_create_billing::Migration),
            Box::new(m20240310_000001_create_payment_ledger::Migration),
        ]
    }
}
