mod demo;
mod redis;

pub use self::demo::DemoBus;
pub use self::redis::RedisBus;
