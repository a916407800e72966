mod mocks;
mod prepare_env;

pub use mocks::{seed_verified_payment, tx_ref, ScriptedScorer, StaticChainReader, TEST_ADMIN_WALLET};
pub use prepare_env::{create_database, new_test_database, prepare_test_env, random_db_path, run_migrations};
