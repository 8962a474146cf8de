pub use self::output::{averages_file_name, snapshot_file_name, states_file_name, write_averages, write_snapshot, write_states, StatesGrid};
pub use self::restart::{read_restart, write_restart, RestartData, RestartParticle};

pub mod output;
pub mod restart;
