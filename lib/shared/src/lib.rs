pub mod music;
pub mod playlist;
pub mod room;
