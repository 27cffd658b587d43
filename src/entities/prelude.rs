pub use super::activity_logs::Entity as ActivityLogs;
pub use super::investment_snapshots::Entity as InvestmentSnapshots;
pub use super::operators::Entity as Operators;
pub use super::settings::Entity as Settings;
pub use super::transactions::Entity as Transactions;
pub use super::users::Entity as Users;
pub use super::withdrawal_requests::Entity as WithdrawalRequests;
