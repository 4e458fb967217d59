//! Storage adapters implementing `crate::ports`.

pub mod memory;
pub mod postgres_transaction_repository;
pub mod postgres_waitlist_repository;
pub mod postgres_withdrawal_repository;

pub use memory::InMemoryStore;
pub use postgres_transaction_repository::PostgresTransactionRepository;
pub use postgres_waitlist_repository::PostgresWaitlistRepository;
pub use postgres_withdrawal_repository::PostgresWithdrawalRepository;
