// Connections, transactions and named-parameter statements

pub mod connection;
pub mod statement;

pub use connection::{Connection, ExecOutcome, Executor, Row, SessionState, Transaction, abandon};
pub use statement::{Params, bind_named};

pub(crate) use connection::get_i64;
