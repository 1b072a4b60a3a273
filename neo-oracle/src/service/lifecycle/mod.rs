mod run;
mod state;

pub use run::spawn_relay;
