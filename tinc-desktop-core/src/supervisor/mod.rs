//! Privilege-separated worker supervisor
//!
//! Spawns one worker per network, either in-process or as an elevated
//! sub-process, and keeps track of it until it terminates.

pub mod completion;
pub mod event;
pub mod manager;
pub mod port;
pub mod retry;
pub mod same_process;
pub mod spawner;
pub mod sub_process;

pub use completion::Completion;
pub use event::WorkerEvent;
pub use manager::Manager;
pub use port::{Port, Worker};
pub use retry::{retry_transport, RetryPolicyError, StartupRetry};
pub use same_process::SameProcessSpawner;
pub use spawner::{select_spawner, validate_network_name, Spawner};
pub use sub_process::{worker_command, SubProcessSpawner};
