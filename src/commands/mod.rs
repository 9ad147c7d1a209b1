pub mod check;
pub mod inspect;
pub mod serve;

pub use check::{CheckArgs, execute_check};
pub use inspect::execute_inspect;
pub use serve::execute_serve;
