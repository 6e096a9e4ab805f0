//! Transactions and the routes for managing them.
//!
//! Creating a transaction goes through [crate::BudgetEnforcer] so that every
//! new expense is checked against its category's budget limit. Reading and
//! deleting transactions only touch the database.

mod core;
mod create_endpoint;
mod delete_endpoint;
mod view_endpoints;

pub use core::{
    Transaction, TransactionType, create_transaction, create_transaction_table,
    delete_transaction, get_transaction, get_transactions, sum_expenses,
};
pub use create_endpoint::create_transaction_endpoint;
pub use delete_endpoint::{TransactionState, delete_transaction_endpoint};
pub use view_endpoints::{get_transaction_endpoint, get_transactions_endpoint};

#[cfg(test)]
pub use core::count_transactions;
