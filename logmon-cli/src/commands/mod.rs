mod doctor;
mod init;

pub use doctor::run_doctor;
pub use init::run_init;
