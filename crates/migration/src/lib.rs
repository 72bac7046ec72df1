pub use sea_orm_migration::prelude::*;

mod m001_rule_schema;
mod m002_audit_logs;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m001_rule_schema::Migration),
            Box::new(m002_audit_logs::Migration),
        ]
    }
}
