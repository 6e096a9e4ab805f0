//! Budget limits per user and category.

mod db;
mod endpoints;

pub use db::{
    BudgetLimit, clear_breach_notified, create_budget_limit_table, get_budget_limit,
    get_budget_limits, mark_breach_notified, upsert_budget_limit,
};
pub use endpoints::{get_limit_endpoint, get_limits_endpoint, set_limit_endpoint};
