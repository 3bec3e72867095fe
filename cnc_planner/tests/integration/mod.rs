mod command_dwell;
mod concurrent;
mod flush;
mod pool_properties;
mod position_sync;
