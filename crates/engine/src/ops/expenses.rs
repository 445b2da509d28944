use sea_orm::TransactionTrait;

use crate::{ExpenseCommand, ExpenseReceipt, ResultEngine};

use super::{Engine, fuel, maintenance, purchase_orders, rentals, with_tx};

impl Engine {
    /// Applies an expense command and recomputes the affected allocations in
    /// the same transaction.
    ///
    /// Nothing is persisted when the command, the overspend guard or the
    /// recomputation fails.
    pub async fn submit_expense(&self, cmd: ExpenseCommand) -> ResultEngine<ExpenseReceipt> {
        let _gate = self.write_gate().await;
        with_tx!(self, |db_tx| {
            match cmd {
                ExpenseCommand::CreateMaintenance(cmd) => maintenance::create(&db_tx, cmd).await,
                ExpenseCommand::UpdateMaintenance(cmd) => maintenance::update(&db_tx, cmd).await,
                ExpenseCommand::TransitionMaintenance(cmd) => {
                    maintenance::transition(&db_tx, cmd).await
                }
                ExpenseCommand::DeleteMaintenance { id } => maintenance::delete(&db_tx, id).await,
                ExpenseCommand::CreateFuel(cmd) => fuel::create(&db_tx, cmd).await,
                ExpenseCommand::UpdateFuel(cmd) => fuel::update(&db_tx, cmd).await,
                ExpenseCommand::DeleteFuel { id } => fuel::delete(&db_tx, id).await,
                ExpenseCommand::CreateRental(cmd) => rentals::create(&db_tx, cmd).await,
                ExpenseCommand::UpdateRental(cmd) => rentals::update(&db_tx, cmd).await,
                ExpenseCommand::FinalizeRental { id, end_date } => {
                    rentals::finalize(&db_tx, id, end_date).await
                }
                ExpenseCommand::DeleteRental { id } => rentals::delete(&db_tx, id).await,
                ExpenseCommand::CreatePurchaseOrder(cmd) => {
                    purchase_orders::create(&db_tx, cmd).await
                }
                ExpenseCommand::UpdatePurchaseOrder(cmd) => {
                    purchase_orders::update(&db_tx, cmd).await
                }
                ExpenseCommand::TransitionPurchaseOrder { id, to } => {
                    purchase_orders::transition(&db_tx, id, to).await
                }
                ExpenseCommand::DeletePurchaseOrder { id } => {
                    purchase_orders::delete(&db_tx, id).await
                }
            }
        })
    }
}
