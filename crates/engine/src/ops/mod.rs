use sea_orm::DatabaseConnection;
use tokio::sync::{Mutex, MutexGuard};

use crate::ResultEngine;

mod accounts;
mod allocations;
mod expenses;
mod fuel;
mod guard;
mod ledger;
mod maintenance;
mod purchase_orders;
mod rentals;
mod reports;
mod vehicles;
mod work_orders;

pub use allocations::AllocationFilter;
pub use guard::GuardDecision;

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

/// Entry point of the ledger engine.
///
/// Every write that can move an executed amount holds the write gate for the
/// whole transaction, so guard checks and recomputations never interleave.
#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
    write_gate: Mutex<()>,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    async fn write_gate(&self) -> MutexGuard<'_, ()> {
        self.write_gate.lock().await
    }
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        Ok(Engine {
            database: self.database,
            write_gate: Mutex::new(()),
        })
    }
}
