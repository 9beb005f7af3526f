pub mod args;
pub mod audio_in;
pub mod audio_out;
pub mod command;
pub mod config;
